use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use racesim::core::track::TrackPars;
use racesim::interfaces::lap_interface::LapState;
use racesim::pre::read_sim_pars::{read_sim_constants, read_sim_pars, read_track_pars, SimPars};
use racesim::pre::sim_opts::SimOpts;
use racesim::{RaceResult, SimConstants};
use rayon::prelude::*;
use rldriver::{train_in_race, AgentPars, RlDriver};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use trackgen::pre::read_elements::read_track_elements;
use trackgen::{generate_track, DesignerConfig, GeneratedTrack, TargetMetric, TrackMetrics};

#[derive(Debug, Parser)]
#[clap(name = "racesim-cli", version, about = "Race simulator, track designer and RL driver")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate one or more races
    Simulate(SimOpts),
    /// Evolve a track with the genetic algorithm or score an existing element list
    Design(DesignOpts),
    /// Train a Q-learning driver against the drivers of a parameter file
    Train(TrainOpts),
}

#[derive(Debug, Args)]
struct DesignOpts {
    /// Metric to optimize for (overtakes, speed, difficulty, safety, balanced)
    #[clap(short, long, default_value = "balanced")]
    target: TargetMetric,

    /// Target value of the difficulty target
    #[clap(long)]
    target_value: Option<f64>,

    /// Number of tracks per generation
    #[clap(long, default_value = "20")]
    population: usize,

    /// Number of generations
    #[clap(short, long, default_value = "50")]
    generations: usize,

    /// Per-element mutation probability
    #[clap(short, long, default_value = "0.2")]
    mutation_rate: f64,

    /// Set the random seed
    #[clap(short, long)]
    seed: Option<u64>,

    /// Write the generated track as JSON to this path
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Score the element list of this CSV file instead of evolving a track
    #[clap(short, long)]
    elements_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TrainOpts {
    /// Set path to the simulation parameter file with the opponents
    #[clap(short, long)]
    parfile_path: PathBuf,

    /// Set path to a simulation constants file (OPTIONAL: defaults are used if not set)
    #[clap(short, long)]
    constants_path: Option<PathBuf>,

    /// Agent name, used if no model is loaded
    #[clap(short, long, default_value = "AI Driver")]
    name: String,

    /// Number of training races
    #[clap(short, long, default_value = "10")]
    races: u32,

    /// Set the random seed, races are seeded with seed, seed + 1, ...
    #[clap(short, long)]
    seed: Option<u64>,

    /// Continue training a saved agent
    #[clap(short, long)]
    model_path: Option<PathBuf>,

    /// Save the trained agent to this path
    #[clap(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let debug = matches!(&cli.command, Command::Simulate(opts) if opts.debug);
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if debug { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Command::Simulate(opts) => simulate(&opts),
        Command::Design(opts) => design(&opts),
        Command::Train(opts) => train(&opts),
    }
}

// -------------------------------------------------------------------------------------------------
// SIMULATE ----------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

fn simulate(sim_opts: &SimOpts) -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    log::info!("Reading simulation parameters from {}", sim_opts.parfile_path.display());
    let mut sim_pars = read_sim_pars(&sim_opts.parfile_path)?;

    let sim_consts = match &sim_opts.constants_path {
        Some(path) => read_sim_constants(path)?,
        None => SimConstants::default(),
    };

    if let Some(track_path) = &sim_opts.track_path {
        sim_pars.track_pars = load_track(track_path)?;
    }
    if sim_opts.seed.is_some() {
        sim_pars.race_pars.seed = sim_opts.seed;
    }

    anyhow::ensure!(sim_opts.no_sim_runs > 0, "Number of simulation runs must be positive!");

    log::info!(
        "Simulating {} run(s) of {} laps on {}",
        sim_opts.no_sim_runs,
        sim_pars.race_pars.tot_no_laps,
        sim_pars.track_pars.name
    );

    // EXECUTION -----------------------------------------------------------------------------------
    let t_start = Instant::now();

    let first_result = if sim_opts.progress {
        run_with_progress(&sim_pars, &sim_consts)?
    } else {
        racesim::handle_race(&sim_pars, &sim_consts, None)?
    };

    let other_results: Vec<RaceResult> = (1..sim_opts.no_sim_runs)
        .into_par_iter()
        .map(|i| racesim::handle_race(&run_pars(&sim_pars, i), &sim_consts, None))
        .collect::<anyhow::Result<Vec<RaceResult>>>()?;

    log::info!("Execution time: {}ms", t_start.elapsed().as_millis());

    // POST-PROCESSING -----------------------------------------------------------------------------
    first_result.print_lap_and_race_times()?;

    if !other_results.is_empty() {
        let mut all_results = vec![first_result.clone()];
        all_results.extend(other_results);
        print_multi_run_summary(&all_results);
    }

    if let Some(path) = &sim_opts.json_output {
        let fh = File::create(path)
            .context(format!("Failed to create result file {}!", path.display()))?;
        serde_json::to_writer_pretty(fh, &first_result)
            .context(format!("Failed to write result file {}!", path.display()))?;
        log::info!("Race result written to {}", path.display());
    }

    if let Some(path) = &sim_opts.csv_output {
        first_result.write_lap_times_csv(path)?;
        log::info!("Lap times written to {}", path.display());
    }

    Ok(())
}

/// run_pars returns the parameters of run `i`, seeded with seed + i if a seed is set.
fn run_pars(sim_pars: &SimPars, i: u32) -> SimPars {
    let mut pars = sim_pars.to_owned();
    pars.race_pars.seed = sim_pars.race_pars.seed.map(|s| s + i as u64);
    pars
}

/// run_with_progress simulates the race in a separate thread and prints the received lap states.
fn run_with_progress(sim_pars: &SimPars, sim_consts: &SimConstants) -> anyhow::Result<RaceResult> {
    let (tx, rx) = flume::unbounded::<LapState>();

    let sim_pars_thread = sim_pars.to_owned();
    let sim_consts_thread = sim_consts.to_owned();
    let handle =
        thread::spawn(move || racesim::handle_race(&sim_pars_thread, &sim_consts_thread, Some(&tx)));

    for lap_state in rx.iter() {
        print_lap_state(&lap_state);
    }

    handle
        .join()
        .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))?
}

fn print_lap_state(lap_state: &LapState) {
    println!(
        "LAP {:3}/{} flag: {:?} weather: {}",
        lap_state.lap, lap_state.tot_no_laps, lap_state.flag_state, lap_state.weather
    );
    for car in lap_state.car_states.iter() {
        let status = if car.retired { " (retired)" } else { "" };
        println!(
            "  P{:<2} #{:<3} {:<20} +{:8.3}s {} ({} laps, {:.2}){}",
            car.position,
            car.car_no,
            car.driver_name,
            car.gap_to_leader,
            car.compound,
            car.tire_age,
            car.tire_condition,
            status
        );
    }
}

fn print_multi_run_summary(results: &[RaceResult]) {
    let mut wins: BTreeMap<&str, u32> = BTreeMap::new();
    for winner in results.iter().filter_map(|res| res.winner.as_deref()) {
        *wins.entry(winner).or_insert(0) += 1;
    }

    let finishers: Vec<f64> = results.iter().map(|res| res.finishers as f64).collect();
    let sc_periods: Vec<f64> = results
        .iter()
        .map(|res| res.safety_car_periods as f64)
        .collect();

    println!("RESULT: Summary of {} runs", results.len());
    for (driver, count) in wins.iter() {
        println!(
            "RESULT: {:<20} {:3} wins ({:.1}%)",
            driver,
            count,
            *count as f64 / results.len() as f64 * 100.0
        );
    }
    println!(
        "RESULT: Mean finishers {:.2}, mean safety car periods {:.2}",
        helpers::general::mean(&finishers),
        helpers::general::mean(&sc_periods)
    );
}

/// load_track reads either a track exported by the designer or plain track metrics.
fn load_track(path: &Path) -> anyhow::Result<TrackPars> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read track file {}!", path.display()))?;

    match serde_json::from_str::<GeneratedTrack>(&content) {
        Ok(track) => Ok(TrackPars {
            name: track.name,
            total_length: track.metrics.total_length,
            estimated_lap_time: track.metrics.estimated_lap_time,
            difficulty_score: track.metrics.difficulty_score,
            possible_overtakes: track.metrics.possible_overtakes,
        }),
        Err(_) => read_track_pars(path),
    }
}

// -------------------------------------------------------------------------------------------------
// DESIGN ------------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

fn design(opts: &DesignOpts) -> anyhow::Result<()> {
    if let Some(path) = &opts.elements_path {
        let elements = read_track_elements(path)?;
        let metrics = TrackMetrics::calculate(&elements);
        println!("RESULT: {} elements from {}", elements.len(), path.display());
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    let config = DesignerConfig {
        target: opts.target,
        target_value: opts.target_value,
        population_size: opts.population,
        generations: opts.generations,
        mutation_rate: opts.mutation_rate,
        seed: opts.seed,
        ..DesignerConfig::default()
    };

    log::info!(
        "Evolving a track for target {} ({} generations of {} tracks)",
        config.target,
        config.generations,
        config.population_size
    );
    let t_start = Instant::now();
    let track = generate_track(&config).context("Failed to generate track!")?;
    log::info!("Execution time: {}ms", t_start.elapsed().as_millis());

    track.print_summary();

    if let Some(path) = &opts.output {
        track.write_json(path)?;
        log::info!("Track written to {}", path.display());
    }

    Ok(())
}

// -------------------------------------------------------------------------------------------------
// TRAIN -------------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

fn train(opts: &TrainOpts) -> anyhow::Result<()> {
    let sim_pars = read_sim_pars(&opts.parfile_path)?;
    let sim_consts = match &opts.constants_path {
        Some(path) => read_sim_constants(path)?,
        None => SimConstants::default(),
    };

    let mut agent = match &opts.model_path {
        Some(path) => {
            log::info!("Loading agent from {}", path.display());
            RlDriver::load_model(path, opts.seed)?
        }
        None => RlDriver::new(&AgentPars {
            name: opts.name.to_owned(),
            seed: opts.seed,
            ..AgentPars::default()
        }),
    };

    let t_start = Instant::now();
    for i in 0..opts.races {
        let seed = opts.seed.map(|s| s + i as u64);
        let summary = train_in_race(&mut agent, &sim_pars, &sim_consts, seed)?;
        println!(
            "RESULT: Race {:3} P{:<2} reward {:8.1} pit requests {}{}",
            agent.races_completed,
            summary.final_position,
            summary.total_reward,
            summary.pit_requests,
            if summary.dnf { " DNF" } else { "" }
        );
    }
    log::info!("Execution time: {}ms", t_start.elapsed().as_millis());

    println!(
        "RESULT: {}",
        serde_json::to_string_pretty(&agent.statistics())?
    );

    if let Some(path) = &opts.output {
        agent.save_model(path)?;
    }

    Ok(())
}
