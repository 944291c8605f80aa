use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wf_app::{AppResult, RunConfig, analysis, config, optimize, tuning};

#[derive(Parser)]
#[command(name = "wf")]
#[command(about = "WaterFlow CLI - water distribution network tuning tool", long_about = None)]
struct Cli {
    /// YAML run configuration; the network argument overrides its `network`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for written files (defaults to the network's directory)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report parse defects, source mapping, isolated junctions and baseline pressures
    Analyze {
        /// Network description file
        network: Option<PathBuf>,
    },
    /// List junctions with no path to a source or tank
    Connectivity {
        /// Network description file
        network: Option<PathBuf>,
    },
    /// Raise source heads until the minimum junction pressure meets the target
    Calibrate {
        /// Network description file
        network: Option<PathBuf>,
        /// Target minimum pressure in metres
        #[arg(long)]
        target: Option<f64>,
        /// Maximum solver evaluations
        #[arg(long)]
        max_iterations: Option<usize>,
    },
    /// Set each source head to its junction's elevation plus a target pressure
    AssignHeads {
        /// Network description file
        network: Option<PathBuf>,
        /// Target pressure in metres
        #[arg(long)]
        target: f64,
    },
    /// Multiply every junction demand by a factor
    ScaleDemands {
        /// Network description file
        network: Option<PathBuf>,
        /// Scale factor
        #[arg(long)]
        factor: f64,
    },
    /// Search pipe diameters for the lowest sizing cost
    Optimize {
        /// Network description file
        network: Option<PathBuf>,
        /// Number of generations
        #[arg(long)]
        generations: Option<usize>,
        /// Population size
        #[arg(long)]
        population: Option<usize>,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Calibrate every candidate before scoring it
        #[arg(long)]
        repair: bool,
    },
    /// Write a run configuration with every default filled in
    InitConfig {
        /// Network description file
        network: PathBuf,
        /// Output YAML path
        path: PathBuf,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { network } => {
            cmd_analyze(&resolve(cli.config.as_deref(), network, cli.output)?)
        }
        Commands::Connectivity { network } => {
            cmd_connectivity(&resolve(cli.config.as_deref(), network, cli.output)?)
        }
        Commands::Calibrate {
            network,
            target,
            max_iterations,
        } => {
            let mut cfg = resolve(cli.config.as_deref(), network, cli.output)?;
            if let Some(target) = target {
                cfg.calibration.target_pressure_m = target;
            }
            if let Some(max) = max_iterations {
                cfg.calibration.max_iterations = max;
            }
            cmd_calibrate(&cfg)
        }
        Commands::AssignHeads { network, target } => {
            cmd_assign_heads(&resolve(cli.config.as_deref(), network, cli.output)?, target)
        }
        Commands::ScaleDemands { network, factor } => {
            cmd_scale_demands(&resolve(cli.config.as_deref(), network, cli.output)?, factor)
        }
        Commands::Optimize {
            network,
            generations,
            population,
            seed,
            repair,
        } => {
            let mut cfg = resolve(cli.config.as_deref(), network, cli.output)?;
            if let Some(g) = generations {
                cfg.search.generations = g;
            }
            if let Some(p) = population {
                cfg.search.population_size = p;
            }
            if seed.is_some() {
                cfg.search.seed = seed;
            }
            cfg.repair |= repair;
            cmd_optimize(&cfg)
        }
        Commands::InitConfig { network, path } => {
            let mut cfg = RunConfig::for_network(network);
            cfg.output = cli.output;
            config::save_config(&path, &cfg)?;
            println!("✓ Wrote run configuration to {}", path.display());
            Ok(())
        }
    }
}

/// Merge the optional YAML file with command-line overrides.
fn resolve(
    config_path: Option<&Path>,
    network: Option<PathBuf>,
    output: Option<PathBuf>,
) -> AppResult<RunConfig> {
    let mut cfg = match config_path {
        Some(path) => config::load_config(path)?,
        None => RunConfig::default(),
    };
    if let Some(network) = network {
        cfg.network = network;
    }
    if output.is_some() {
        cfg.output = output;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_analyze(cfg: &RunConfig) -> AppResult<()> {
    println!("Analyzing network: {}", cfg.network.display());
    let report = analysis::analyze(cfg)?;

    println!(
        "  {} nodes ({} junctions, {} sources), {} links",
        report.nodes, report.junctions, report.sources, report.links
    );
    if report.defects.is_empty() {
        println!("✓ No skipped lines");
    } else {
        println!("Skipped lines ({}):", report.defects.len());
        for defect in &report.defects {
            println!("  {}", defect);
        }
    }

    println!("Source → junction mapping:");
    for row in &report.mapping {
        println!(
            "  {} → {} via {}",
            row.source,
            row.junction,
            row.link.as_deref().unwrap_or("?")
        );
    }
    for gap in &report.gaps {
        println!("  {} → (no adjacent junction)", gap);
    }
    print_disconnected(&report.disconnected);

    match (&report.solver_error, report.min_pressure_m) {
        (Some(err), _) => println!("✗ Baseline solve failed: {}", err),
        (None, Some(p)) => {
            println!(
                "Minimum pressure: {:.3} m at {}",
                p,
                report.min_pressure_junction.as_deref().unwrap_or("?")
            );
            if !report.negative_pressure_junctions.is_empty() {
                println!(
                    "Negative pressure at {} junction(s): {}",
                    report.negative_pressure_junctions.len(),
                    report.negative_pressure_junctions.join(", ")
                );
            }
        }
        (None, None) => println!("No junctions to check"),
    }
    Ok(())
}

fn cmd_connectivity(cfg: &RunConfig) -> AppResult<()> {
    let report = analysis::connectivity(cfg)?;
    println!("{} junction(s) checked", report.junctions);
    print_disconnected(&report.disconnected);
    Ok(())
}

fn print_disconnected(disconnected: &[String]) {
    if disconnected.is_empty() {
        println!("✓ Every junction reaches a source or tank");
    } else {
        println!("Disconnected junctions ({}):", disconnected.len());
        for name in disconnected {
            println!("  {}", name);
        }
    }
}

fn cmd_calibrate(cfg: &RunConfig) -> AppResult<()> {
    println!(
        "Calibrating {} to {:.2} m minimum pressure (max {} iterations)",
        cfg.network.display(),
        cfg.calibration.target_pressure_m,
        cfg.calibration.max_iterations
    );
    let report = tuning::run_calibration(cfg)?;

    for record in &report.state.history {
        match record.min_pressure {
            Some(p) => println!(
                "  iter {:>3}: min pressure {:>10.3} m, step {:.3} m",
                record.iteration, p, record.step_m
            ),
            None => println!(
                "  iter {:>3}: solver diverged, step {:.3} m",
                record.iteration, record.step_m
            ),
        }
    }
    if report.feasible {
        println!("✓ {}", report.summary);
    } else {
        println!("✗ {}", report.summary);
    }
    println!("Wrote {} ({} field(s) changed)", report.output.display(), report.changed_fields);
    Ok(())
}

fn cmd_assign_heads(cfg: &RunConfig, target: f64) -> AppResult<()> {
    let report = tuning::assign_heads(cfg, target)?;
    for (source, junction, head) in &report.assignment.assigned {
        println!("  {} head {:.3} m (from {})", source, head, junction);
    }
    for source in &report.assignment.unmapped {
        println!("  {} unchanged (no mapped junction)", source);
    }
    println!("✓ Wrote {}", report.output.display());
    Ok(())
}

fn cmd_scale_demands(cfg: &RunConfig, factor: f64) -> AppResult<()> {
    let report = tuning::scale_network_demands(cfg, factor)?;
    println!("Scaled {} demand(s) by {}", report.scaled, report.factor);
    println!("✓ Wrote {}", report.output.display());
    Ok(())
}

fn cmd_optimize(cfg: &RunConfig) -> AppResult<()> {
    println!(
        "Optimizing {} ({} generations, population {})",
        cfg.network.display(),
        cfg.search.generations,
        cfg.search.population_size
    );
    let report = optimize::run_optimize(cfg)?;

    for (i, cost) in report.outcome.best_history.iter().enumerate() {
        println!("  generation {:>3}: best cost {:.3}", i + 1, cost);
    }
    println!("{}", report.summary);
    for (pipe, d) in &report.diameters_mm {
        println!("  {} = {:.0} mm", pipe, d);
    }
    for (name, value) in &report.diagnostics {
        println!("  {}: {:.3}", name, value);
    }
    println!("✓ Wrote {}", report.output.display());
    Ok(())
}
