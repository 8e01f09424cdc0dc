use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "endurosim",
    about = "A time-discrete endurance race simulator with driver rotation and strategy advisories"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing (only for non-realtime mode)
    #[clap(short, long)]
    pub debug: bool,

    /// Simulate the race in real time and stream dashboard updates to the console
    #[clap(long)]
    pub realtime: bool,

    /// Disable the strategy advisory boundary entirely
    #[clap(long)]
    pub no_advisory: bool,

    /// Print race event notifications while simulating (only for non-realtime mode)
    #[clap(long)]
    pub print_events: bool,

    /// Skip the results plot export
    #[clap(long)]
    pub no_plot: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the simulation parameter file (OPTIONAL: if not set, uses the built-in
    /// three driver 24h scenario)
    #[clap(short, long)]
    pub parfile_path: Option<PathBuf>,

    /// Set path to a telemetry snapshot file to source the driver lineup from (overrides the
    /// drivers of the parameter file)
    #[clap(short, long)]
    pub telemetry_path: Option<PathBuf>,

    /// Set real-time factor (only relevant in realtime mode)
    #[clap(short, long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set the advisory call timeout in seconds
    #[clap(short, long, default_value = "2.0")]
    pub advisory_timeout: f64,

    /// Set the RNG seed for a reproducible race (overrides the parameter file)
    #[clap(short, long)]
    pub seed: Option<u64>,
}
