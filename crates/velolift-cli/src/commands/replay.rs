use std::io::Read;

use clap::Args;
use velolift_core::{now_ms, Config, SessionCommand, ValidationError};

use super::{emit, session_from};

#[derive(Args)]
pub struct ReplayArgs {
    /// File with one velocity (m/s) per line, or "-" for stdin
    pub input: String,
    /// Spacing between samples in milliseconds (defaults to stream.tick_ms)
    #[arg(long)]
    pub tick_ms: Option<u64>,
    /// Also print a frame event for every sample
    #[arg(long)]
    pub frames: bool,
}

/// Parse one velocity per line. Blank lines and `#` comments are skipped.
pub fn parse_samples(text: &str) -> Result<Vec<f64>, ValidationError> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            line.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ValidationError::InvalidValue {
                    field: format!("line {number}"),
                    message: format!("not a velocity: '{line}'"),
                })
        })
        .collect()
}

pub fn run(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let text = if args.input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.input)?
    };
    let samples = parse_samples(&text)?;
    let tick_ms = args.tick_ms.unwrap_or(config.stream.tick_ms).max(1);
    tracing::info!(samples = samples.len(), tick_ms, "replaying samples");

    let mut session = session_from(&config);
    let events = session.replay(&samples, now_ms(), tick_ms);
    emit(&events, args.frames)?;
    emit(&session.handle(SessionCommand::GetSummary), false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_blanks() {
        let samples = parse_samples("# header\n0.1\n\n  -0.25 \n# done\n").unwrap();
        assert_eq!(samples, vec![0.1, -0.25]);
    }

    #[test]
    fn parse_reports_line_number() {
        let err = parse_samples("0.1\nfast\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_samples("NaN\n").is_err());
    }
}
