use tokio::sync::mpsc;

use crate::audio::{EventBus, EventKind, Subscription};

/// Turns the engine's `ended` event into something an async loop can await.
pub struct EndedSignal {
    rx: mpsc::UnboundedReceiver<()>,
    _subscription: Subscription,
}

impl EndedSignal {
    pub fn attach(events: &EventBus) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = events.subscribe(EventKind::Ended, move |_| {
            let _ = tx.send(());
        });
        Self {
            rx,
            _subscription: subscription,
        }
    }

    /// Wait for the next natural end of a track.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Drop notifications already queued, returning how many there were.
    ///
    /// Call after a user command replaced the track, so an end reported for
    /// the old one does not advance past the new one.
    pub fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
