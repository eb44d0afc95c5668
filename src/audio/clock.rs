use std::time::Instant;

/// Monotonic time source for anchor arithmetic, in seconds from an arbitrary origin.
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// Wall-clock time measured from the moment the clock was created.
///
/// Copies share the same origin, so the engine thread and its handle agree on
/// every reading.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
