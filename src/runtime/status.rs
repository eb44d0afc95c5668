use std::io::Write;

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

use crate::audio::EngineEvent;
use crate::coordinator::PlaybackModes;

/// What the one-line status shows. Fed from engine events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusView {
    pub title: Option<String>,
    pub state: &'static str,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f32,
    pub modes: PlaybackModes,
    pub error: Option<String>,
}

impl StatusView {
    pub fn new(volume: f32) -> Self {
        Self {
            state: "stopped",
            volume,
            ..Self::default()
        }
    }

    pub fn observe(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Loading(true) => self.state = "loading",
            EngineEvent::Loading(false) => {}
            EngineEvent::Loaded { duration } => self.duration = *duration,
            EngineEvent::Play(p) => {
                self.state = "playing";
                self.current_time = p.current_time;
                self.duration = p.duration;
            }
            EngineEvent::Pause(p) => {
                self.state = "paused";
                self.current_time = p.current_time;
            }
            EngineEvent::Stop | EngineEvent::Ended => {
                self.state = "stopped";
                self.current_time = 0.0;
            }
            EngineEvent::TimeUpdate(p) => {
                self.current_time = p.current_time;
                self.duration = p.duration;
            }
            EngineEvent::VolumeChange(v) => self.volume = *v,
            EngineEvent::Error(msg) => self.error = Some(msg.clone()),
            EngineEvent::ClearError => self.error = None,
        }
    }
}

/// `m:ss` for a position in seconds.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn status_line(view: &StatusView) -> String {
    let mut line = format!(
        "[{}] {} {}/{} vol {:>3}%",
        view.state,
        view.title.as_deref().unwrap_or("-"),
        format_time(view.current_time),
        format_time(view.duration),
        (view.volume * 100.0).round() as i32,
    );
    if view.modes.shuffle {
        line.push_str(" shuffle");
    }
    if view.modes.repeat {
        line.push_str(" repeat");
    }
    if let Some(err) = view.error.as_deref() {
        line.push_str(" | error: ");
        line.push_str(err);
    }
    line
}

pub fn render(out: &mut impl Write, view: &StatusView) -> std::io::Result<()> {
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(status_line(view))
    )?;
    out.flush()
}
