use clap::Args;
use velolift_core::{
    now_ms, Config, LiftPattern, SessionCommand, SimulationConfig, ValidationError, VelocitySimulator,
};

use super::{emit, session_from};

/// Shape of the synthetic set, shared with `live`.
#[derive(Args, Clone)]
pub struct SimulationArgs {
    /// Movement pattern: squat (down first) or deadlift (up first)
    #[arg(long, default_value = "squat")]
    pub pattern: LiftPattern,
    /// Number of reps
    #[arg(long, default_value = "5")]
    pub reps: u32,
    /// Concentric peak velocity of the first rep (m/s)
    #[arg(long, default_value = "0.8")]
    pub peak: f64,
    /// Fraction of the first peak lost per rep
    #[arg(long, default_value = "0.0")]
    pub loss: f64,
    /// Uniform noise amplitude (m/s)
    #[arg(long, default_value = "0.005")]
    pub noise: f64,
    /// Constant sensor bias (m/s)
    #[arg(long, default_value = "0.0")]
    pub bias: f64,
    /// Random seed; omit for a different stream every run
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SimulationArgs {
    pub fn to_config(&self, tick_ms: u64) -> Result<SimulationConfig, ValidationError> {
        let config = SimulationConfig {
            pattern: self.pattern,
            reps: self.reps,
            peak_velocity: self.peak,
            velocity_loss: self.loss,
            noise: self.noise,
            bias: self.bias,
            seed: self.seed,
            tick_ms,
            ..SimulationConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub sim: SimulationArgs,
    /// Also print a frame event for every sample
    #[arg(long)]
    pub frames: bool,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let tick_ms = config.stream.tick_ms.max(1);
    let samples = VelocitySimulator::new(args.sim.to_config(tick_ms)?).generate();
    tracing::info!(
        pattern = ?args.sim.pattern,
        reps = args.sim.reps,
        samples = samples.len(),
        "simulating set"
    );

    let mut session = session_from(&config);
    let events = session.replay(&samples, now_ms(), tick_ms);
    emit(&events, args.frames)?;
    emit(&session.handle(SessionCommand::GetSummary), false)?;
    Ok(())
}
