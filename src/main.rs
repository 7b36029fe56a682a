use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use glam::DVec2;
use serde::Serialize;

use terrain_toss::error::SolveError;
use terrain_toss::geo::AngleGuess;
use terrain_toss::io::{load_requests, load_solver_config, load_surface_from_json};
use terrain_toss::physics::trajectory::TerminalStatus;
use terrain_toss::solver::{AngleSolver, Solution, SolverConfig, ThrowRequest};
use terrain_toss::terrain::Surface;
use terrain_toss::tosser::Tosser;

#[derive(Parser)]
#[command(name = "terrain-toss")]
#[command(about = "Find the launch angles that land a bouncing ball on a receiver")]
struct Cli {
    /// Mesh JSON with `verts` and `tri` arrays
    #[arg(short, long)]
    mesh: PathBuf,

    /// Solver configuration JSON (every field optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve for azimuth and elevation
    Solve {
        /// Launch point as "x,y" (on the surface) or "x,y,z"
        #[arg(long, value_parser = parse_coords, allow_hyphen_values = true)]
        launch: Coords,
        /// Receiver as "x,y"
        #[arg(long, value_parser = parse_coords, allow_hyphen_values = true)]
        receiver: Coords,
        #[arg(long)]
        speed: f64,
        #[arg(long, default_value_t = 1)]
        bounces: usize,
        /// Starting guess as "azimuth_deg,elevation_deg"; repeatable
        #[arg(long = "guess", value_parser = parse_guess, allow_hyphen_values = true)]
        guesses: Vec<AngleGuess>,
    },

    /// Throw once and print every bounce
    Throw {
        #[arg(long, value_parser = parse_coords, allow_hyphen_values = true)]
        launch: Coords,
        /// Degrees, counter-clockwise from +x
        #[arg(long, allow_hyphen_values = true)]
        azimuth: f64,
        /// Degrees above the horizon
        #[arg(long, allow_hyphen_values = true)]
        elevation: f64,
        #[arg(long)]
        speed: f64,
        #[arg(long, default_value_t = 1)]
        bounces: usize,
    },

    /// Solve every request listed in a JSON file
    Batch {
        #[arg(long)]
        requests: PathBuf,
    },
}

#[derive(Clone, Debug)]
struct Coords(Vec<f64>);

impl Coords {
    fn planar(&self) -> DVec2 {
        DVec2::new(self.0[0], self.0[1])
    }

    fn height(&self) -> Option<f64> {
        self.0.get(2).copied()
    }
}

fn parse_coords(value: &str) -> Result<Coords, String> {
    let coords = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid coordinate '{part}' in '{value}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    match coords.len() {
        2 | 3 => Ok(Coords(coords)),
        n => Err(format!("Expected 2 or 3 comma-separated numbers, got {n}")),
    }
}

fn parse_guess(value: &str) -> Result<AngleGuess, String> {
    let Coords(parts) = parse_coords(value)?;
    match parts.as_slice() {
        [azimuth, elevation] => Ok(AngleGuess::from_degrees(*azimuth, *elevation)),
        _ => Err(format!("Expected 'azimuth_deg,elevation_deg', got '{value}'")),
    }
}

#[derive(Serialize)]
struct SolveReport<'a> {
    request: &'a ThrowRequest,
    solution: Option<&'a Solution>,
    error: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every requested solve succeeded.
fn run() -> Result<bool> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_solver_config(path)?,
        None => SolverConfig::default(),
    };
    let surface = load_surface_from_json(&cli.mesh)?.with_tolerances(config.tolerances);

    match cli.command {
        Commands::Solve { launch, receiver, speed, bounces, guesses } => {
            let request = ThrowRequest {
                launch: launch.planar(),
                launch_height: launch.height(),
                receiver: receiver.planar(),
                speed,
                bounces,
            };
            solve_and_report(&surface, &config, &request, &guesses, cli.json)
        }
        Commands::Throw { launch, azimuth, elevation, speed, bounces } => {
            throw_and_report(&surface, &config, &launch, AngleGuess::from_degrees(azimuth, elevation), speed, bounces, cli.json)?;
            Ok(true)
        }
        Commands::Batch { requests } => {
            let mut all_solved = true;
            for request in load_requests(&requests)? {
                all_solved &= solve_and_report(&surface, &config, &request, &[], cli.json)?;
            }
            Ok(all_solved)
        }
    }
}

fn solve_and_report(
    surface: &Surface,
    config: &SolverConfig,
    request: &ThrowRequest,
    guesses: &[AngleGuess],
    json: bool,
) -> Result<bool> {
    let solver = AngleSolver::new(surface, config.clone());
    let outcome = solver.solve(request, guesses);

    // Bad input is an error; an unsolvable configuration is a result.
    if let Err(err @ (SolveError::InvalidRequest(_) | SolveError::Launch(_))) = &outcome {
        bail!("{err}");
    }

    if json {
        let report = SolveReport {
            request,
            solution: outcome.as_ref().ok(),
            error: outcome.as_ref().err().map(ToString::to_string),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(outcome.is_ok());
    }

    match &outcome {
        Ok(solution) => {
            println!("Azimuth:   {:.6} deg", solution.angles.azimuth_deg());
            println!("Elevation: {:.6} deg", solution.angles.elevation_deg());
            println!("Miss:      {:.6} m (tolerance {:.6} m)", solution.miss, solution.tolerance);
            println!(
                "Landing:   ({:.4}, {:.4}, {:.4}) after {} bounces",
                solution.landing.x, solution.landing.y, solution.landing.z, solution.bounces
            );
            println!("Evaluations: {} ({:?} stage)", solution.evaluations, solution.stage);
        }
        Err(err) => println!("No solution found: {err}"),
    }
    Ok(outcome.is_ok())
}

fn throw_and_report(
    surface: &Surface,
    config: &SolverConfig,
    launch: &Coords,
    angles: AngleGuess,
    speed: f64,
    bounces: usize,
    json: bool,
) -> Result<()> {
    let launch_xy = launch.planar();
    let tosser = Tosser::new(surface, launch_xy.x, launch_xy.y, launch.height())?.with_physics(config.physics);
    let trajectory = tosser.throw(speed, bounces, angles.azimuth, angles.elevation)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&trajectory.bounces)?);
        return Ok(());
    }

    println!(
        "Launch at ({:.4}, {:.4}, {:.4})",
        tosser.position().x,
        tosser.position().y,
        tosser.position().z
    );
    for (i, bounce) in trajectory.bounces.iter().enumerate() {
        println!(
            "Bounce {}: ({:.4}, {:.4}, {:.4}) on triangle {} after {:.4} s",
            i + 1,
            bounce.position.x,
            bounce.position.y,
            bounce.position.z,
            bounce.triangle,
            bounce.flight_time
        );
    }
    match &trajectory.status {
        TerminalStatus::Completed => println!("Completed {} bounces", trajectory.bounces.len()),
        TerminalStatus::Escaped => println!("Escaped the surface after {} bounces", trajectory.bounces.len()),
        TerminalStatus::Grounded => println!("Slid along the surface after {} bounces", trajectory.bounces.len()),
        TerminalStatus::Failed(err) => println!("Stopped after {} bounces: {err}", trajectory.bounces.len()),
    }
    Ok(())
}
