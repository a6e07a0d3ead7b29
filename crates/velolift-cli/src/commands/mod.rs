pub mod config;
pub mod live;
pub mod replay;
pub mod simulate;

use std::io::Write;

use velolift_core::{Config, Event, LiftSession};

/// Session built from the user's config file.
pub fn session_from(config: &Config) -> LiftSession {
    LiftSession::new(config.tracker.clone(), config.fatigue.clone())
        .with_default_set(config.set.clone())
}

/// Write events as JSON lines; frames only when asked for.
pub fn emit(events: &[Event], frames: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in events.iter().filter(|e| frames || !e.is_frame()) {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }
    Ok(())
}
