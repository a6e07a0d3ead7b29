//! Live stream boundary between a sample producer and the session.
//!
//! A producer thread publishes readings at the sensor's cadence into a
//! latest-value cell; the consumer loop polls that cell at its own tick and
//! feeds the session. Readings are copied whole out of the cell, so a consumer
//! never observes a half-written sample.
//!
//! ```text
//! SampleSource --(reader thread)--> LatestSample --(StreamPump)--> run_stream --> LiftSession
//!                                                                     ^   |
//!                                                     SessionCommand -+   +-> Event (mpsc)
//! ```

use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::error::{ConfigError, CoreError};
use crate::events::Event;
use crate::session::{LiftSession, SessionCommand};

/// Consumer-side stream settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Consumer cadence in milliseconds (20 = 50 Hz).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Skip readings that were already consumed.
    #[serde(default)]
    pub dedupe: bool,
}

fn default_tick_ms() -> u64 {
    20
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            dedupe: false,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "stream.tick_ms".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// One published sample with its producer sequence number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub seq: u64,
    pub velocity: f64,
}

/// Producer half of the latest-value cell.
#[derive(Debug)]
pub struct LatestSample {
    tx: watch::Sender<Option<Reading>>,
    next_seq: u64,
}

impl LatestSample {
    /// Create the cell and its consumer.
    pub fn channel(dedupe: bool) -> (LatestSample, StreamPump) {
        let (tx, rx) = watch::channel(None);
        (
            LatestSample { tx, next_seq: 0 },
            StreamPump {
                rx,
                dedupe,
                last_seq: None,
            },
        )
    }

    /// Replace the stored reading. Never blocks; a slow consumer simply misses
    /// intermediate samples.
    pub fn publish(&mut self, velocity: f64) -> Reading {
        let reading = Reading {
            seq: self.next_seq,
            velocity,
        };
        self.next_seq += 1;
        self.tx.send_replace(Some(reading));
        reading
    }
}

/// Result of one consumer poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Poll {
    Sample(f64),
    /// Nothing published yet.
    Empty,
    /// Latest reading already consumed (dedupe only).
    Stale,
    /// Producer gone and its last reading delivered.
    Closed,
}

/// Consumer half of the latest-value cell.
#[derive(Debug)]
pub struct StreamPump {
    rx: watch::Receiver<Option<Reading>>,
    dedupe: bool,
    last_seq: Option<u64>,
}

impl StreamPump {
    pub fn poll(&mut self) -> Poll {
        let closed = self.rx.has_changed().is_err();
        let reading = *self.rx.borrow_and_update();
        match reading {
            None if closed => Poll::Closed,
            None => Poll::Empty,
            Some(r) if self.last_seq == Some(r.seq) && closed => Poll::Closed,
            Some(r) if self.last_seq == Some(r.seq) && self.dedupe => Poll::Stale,
            Some(r) => {
                self.last_seq = Some(r.seq);
                Poll::Sample(r.velocity)
            }
        }
    }
}

/// Anything that yields velocity samples in order.
pub trait SampleSource: Send {
    /// Next sample, or `None` once the source is exhausted.
    fn next_velocity(&mut self) -> Option<f64>;
}

/// Plays back a fixed list of samples.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: std::vec::IntoIter<f64>,
}

impl ReplaySource {
    pub fn new(samples: Vec<f64>) -> Self {
        Self {
            samples: samples.into_iter(),
        }
    }
}

impl SampleSource for ReplaySource {
    fn next_velocity(&mut self) -> Option<f64> {
        self.samples.next()
    }
}

/// Handle on a producer thread started by [`spawn_reader`].
#[derive(Debug)]
pub struct ReaderHandle {
    handle: JoinHandle<u64>,
}

impl ReaderHandle {
    /// Wait for the reader and return how many samples it published.
    pub fn join(self) -> Result<u64, CoreError> {
        self.handle
            .join()
            .map_err(|_| CoreError::Stream("reader thread panicked".into()))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Drain `source` on a background thread, one sample per `interval`.
/// Dropping the producer at the end closes the stream.
pub fn spawn_reader<S>(mut source: S, mut sample: LatestSample, interval: Duration) -> ReaderHandle
where
    S: SampleSource + 'static,
{
    let handle = std::thread::spawn(move || {
        let mut published = 0;
        while let Some(velocity) = source.next_velocity() {
            sample.publish(velocity);
            published += 1;
            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
        tracing::debug!(published, "sample source exhausted");
        published
    });
    ReaderHandle { handle }
}

/// Counters returned when the consumer loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub ticks: u64,
    pub samples: u64,
    pub stale: u64,
    pub commands: u64,
}

/// Consumer loop: every `tick`, apply pending commands, then feed the latest
/// sample to the session and forward the resulting events.
///
/// Stops when the producer is closed, when `shutdown` fires or its sender is
/// dropped, or when the event receiver is dropped.
pub async fn run_stream(
    session: &mut LiftSession,
    mut pump: StreamPump,
    tick: Duration,
    events: mpsc::Sender<Event>,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut shutdown: oneshot::Receiver<()>,
) -> StreamStats {
    let mut stats = StreamStats::default();
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(tick_ms = tick.as_millis() as u64, "stream started");

    'ticks: loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("stream shutdown requested");
                break;
            }
            _ = interval.tick() => {}
        }
        stats.ticks += 1;

        while let Ok(command) = commands.try_recv() {
            stats.commands += 1;
            for event in session.handle(command) {
                if events.send(event).await.is_err() {
                    break 'ticks;
                }
            }
        }

        match pump.poll() {
            Poll::Sample(velocity) => {
                stats.samples += 1;
                for event in session.process(velocity) {
                    if events.send(event).await.is_err() {
                        break 'ticks;
                    }
                }
            }
            Poll::Stale => stats.stale += 1,
            Poll::Empty => {}
            Poll::Closed => break,
        }
    }

    tracing::info!(
        ticks = stats.ticks,
        samples = stats.samples,
        commands = stats.commands,
        "stream stopped"
    );
    stats
}
