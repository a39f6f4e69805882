use clap::Args;
use std::path::PathBuf;

/// SimOpts contains the command line options of a race simulation.
#[derive(Debug, Args, Clone)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing
    #[clap(short, long)]
    pub debug: bool,

    /// Print the lap state of the first run after every lap
    #[clap(long)]
    pub progress: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the simulation parameter file
    #[clap(short, long)]
    pub parfile_path: PathBuf,

    /// Set path to a simulation constants file (OPTIONAL: defaults are used if not set)
    #[clap(short, long)]
    pub constants_path: Option<PathBuf>,

    /// Set path to a track file (metrics JSON or generated track), overrides the track of the
    /// parameter file
    #[clap(short, long)]
    pub track_path: Option<PathBuf>,

    /// Set the random seed, overrides the seed of the parameter file
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Set number of simulation runs, runs are seeded with seed, seed + 1, ...
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Write the race result of the first run as JSON to this path
    #[clap(short, long)]
    pub json_output: Option<PathBuf>,

    /// Write the lap times of the first run as CSV to this path
    #[clap(long)]
    pub csv_output: Option<PathBuf>,
}
