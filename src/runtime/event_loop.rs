use std::io;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::audio::{EngineError, EngineEvent};
use crate::config;
use crate::coordinator::{EndedSignal, PlaybackCoordinator, Player};

use super::status::{self, StatusView};

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    TogglePause,
    Next,
    Previous,
    ToggleShuffle,
    ToggleRepeat,
    SeekBy(f64),
    VolumeBy(f32),
    ToggleMute,
    Stop,
    ClearQueue,
    Quit,
}

impl Command {
    /// Whether running this command can replace or restart the playing source.
    pub fn moves_playback(self) -> bool {
        matches!(
            self,
            Command::TogglePause
                | Command::Next
                | Command::Previous
                | Command::SeekBy(_)
                | Command::Stop
        )
    }
}

pub fn command_for_key(key: KeyEvent, controls: &config::ControlsSettings) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let scrub = controls.scrub_seconds as f64;
    let cmd = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Command::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
        KeyCode::Char(' ') | KeyCode::Char('p') => Command::TogglePause,
        KeyCode::Char('l') | KeyCode::Right => Command::Next,
        KeyCode::Char('h') | KeyCode::Left => Command::Previous,
        KeyCode::Char('L') => Command::SeekBy(scrub),
        KeyCode::Char('H') => Command::SeekBy(-scrub),
        KeyCode::Char('s') => Command::ToggleShuffle,
        KeyCode::Char('r') => Command::ToggleRepeat,
        KeyCode::Char('+') | KeyCode::Char('=') => Command::VolumeBy(controls.volume_step),
        KeyCode::Char('-') => Command::VolumeBy(-controls.volume_step),
        KeyCode::Char('m') => Command::ToggleMute,
        KeyCode::Char('x') => Command::Stop,
        KeyCode::Char('c') => Command::ClearQueue,
        _ => return None,
    };
    Some(cmd)
}

async fn execute<P: Player>(
    coordinator: &mut PlaybackCoordinator<P>,
    cmd: Command,
) -> Result<(), EngineError> {
    match cmd {
        Command::TogglePause => coordinator.toggle_pause().await,
        Command::Next => coordinator.play_next().await,
        Command::Previous => coordinator.play_previous().await,
        Command::ToggleShuffle => {
            coordinator.toggle_shuffle();
            Ok(())
        }
        Command::ToggleRepeat => {
            coordinator.toggle_repeat();
            Ok(())
        }
        Command::SeekBy(delta) => coordinator.seek_by(delta).await,
        Command::VolumeBy(delta) => {
            let volume = coordinator.player().volume() + delta;
            coordinator.set_volume(volume).await
        }
        Command::ToggleMute => coordinator.toggle_mute().await.map(|_| ()),
        Command::Stop => coordinator.stop().await,
        Command::ClearQueue => {
            coordinator.clear_queue();
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

/// Drive the coordinator from key presses and engine events until quit.
pub async fn run<P: Player>(
    coordinator: &mut PlaybackCoordinator<P>,
    controls: &config::ControlsSettings,
    mut keys: mpsc::UnboundedReceiver<KeyEvent>,
    mut ended: EndedSignal,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
) -> io::Result<()> {
    let mut view = StatusView::new(coordinator.player().volume());
    let mut stdout = io::stdout();

    loop {
        tokio::select! {
            key = keys.recv() => {
                let Some(key) = key else {
                    debug!("key reader closed");
                    break;
                };
                let Some(cmd) = command_for_key(key, controls) else {
                    continue;
                };
                if cmd == Command::Quit {
                    break;
                }
                if let Err(e) = execute(coordinator, cmd).await {
                    warn!(?cmd, "command failed: {e}");
                }
                if cmd.moves_playback() {
                    let dropped = ended.discard_pending();
                    if dropped > 0 {
                        debug!(?cmd, dropped, "ignoring end of replaced track");
                    }
                }
            }
            Some(()) = ended.recv() => {
                if let Err(e) = coordinator.handle_ended().await {
                    warn!("auto-advance failed: {e}");
                }
            }
            Some(event) = events.recv() => view.observe(&event),
        }

        view.title = coordinator.current_track().map(|t| t.display());
        view.modes = coordinator.modes();
        status::render(&mut stdout, &view)?;
    }
    Ok(())
}
