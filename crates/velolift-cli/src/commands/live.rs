use std::io::BufRead;
use std::time::Duration;

use clap::Args;
use tokio::sync::{mpsc, oneshot};
use velolift_core::stream::{run_stream, spawn_reader};
use velolift_core::{Config, LatestSample, SessionCommand, SimulatedSource};

use super::simulate::SimulationArgs;
use super::{emit, session_from};

#[derive(Args)]
pub struct LiveArgs {
    #[command(flatten)]
    pub sim: SimulationArgs,
    /// Producer cadence in milliseconds (defaults to stream.tick_ms)
    #[arg(long)]
    pub sample_ms: Option<u64>,
    /// Stop after this many seconds even if the source is not exhausted
    #[arg(long)]
    pub max_secs: Option<u64>,
    /// Read JSON session commands from stdin, one per line
    #[arg(long)]
    pub stdin_commands: bool,
    /// Also print a frame event for every sample
    #[arg(long)]
    pub frames: bool,
}

pub fn run(args: LiveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let tick = config.stream.tick();
    let sample_ms = args.sample_ms.unwrap_or(config.stream.tick_ms).max(1);

    let (sample, pump) = LatestSample::channel(config.stream.dedupe);
    let source = SimulatedSource::new(args.sim.to_config(sample_ms)?);
    let reader = spawn_reader(source, sample, Duration::from_millis(sample_ms));

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let (command_tx, command_rx) = mpsc::channel(16);
    if args.stdin_commands {
        spawn_command_reader(command_tx);
    } else {
        drop(command_tx);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let mut session = session_from(&config);
    let frames = args.frames;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let max_secs = args.max_secs;

    let stats = runtime.block_on(async {
        // The sender lives in this task, so without a deadline the stream
        // only ends when the source is exhausted.
        tokio::spawn(async move {
            match max_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
            let _ = shutdown_tx.send(());
        });

        let printer = async {
            while let Some(event) = event_rx.recv().await {
                if let Err(e) = emit(std::slice::from_ref(&event), frames) {
                    tracing::warn!("failed to write event: {e}");
                }
            }
        };
        let (stats, ()) = tokio::join!(
            run_stream(&mut session, pump, tick, event_tx, command_rx, shutdown_rx),
            printer
        );
        stats
    });

    if reader.is_finished() {
        reader.join()?;
    }
    emit(&session.handle(SessionCommand::GetSummary), false)?;
    tracing::debug!(?stats, "live run finished");
    Ok(())
}

/// Forward stdin lines as session commands until stdin closes.
fn spawn_command_reader(commands: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match SessionCommand::parse(&line) {
                Ok(command) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("ignoring command: {e}"),
            }
        }
    });
}
