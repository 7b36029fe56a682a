pub mod line_search;
pub mod nelder_mead;
pub mod objective;

use std::borrow::Cow;
use std::f64::consts::FRAC_PI_2;

use glam::{DVec2, DVec3};
use itertools::{iproduct, Itertools};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SolveError;
use crate::geo::{linspace, wrap_angle, AngleGuess};
use crate::physics::ballistics::PhysicsParams;
use crate::terrain::{Surface, Tolerances};
use crate::tosser::Tosser;

use line_search::{bisect, golden_section};
use nelder_mead::SimplexOptions;
use objective::{Miss, Objective};

/// Solver knobs. Angles are in radians.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Floor on the accepted miss distance, in meters.
    pub absolute_tolerance: f64,
    /// Accepted miss as a fraction of the launch-to-receiver distance.
    pub relative_tolerance: f64,
    pub min_elevation: f64,
    pub max_elevation: f64,
    /// Elevations swept along the bearing.
    pub elevation_samples: usize,
    /// Iteration cap for each bisection / golden-section search.
    pub line_iterations: usize,
    /// Angular resolution at which line and simplex searches stop.
    pub angle_tolerance: f64,
    /// Half-width of the azimuth band searched around the bearing.
    pub azimuth_window: f64,
    pub azimuth_samples: usize,
    pub grid_elevation_samples: usize,
    /// Number of grid points used to seed simplex runs.
    pub seeds: usize,
    pub simplex_step: f64,
    /// Total simplex iterations across all seeds.
    pub max_iterations: usize,
    /// Cost of a throw that fails to complete its bounces.
    pub invalid_penalty: f64,
    pub physics: PhysicsParams,
    /// Surface query policy used for every throw this solver makes.
    pub tolerances: Tolerances,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            absolute_tolerance: 1e-3,
            relative_tolerance: 1e-4,
            min_elevation: 0.0,
            max_elevation: FRAC_PI_2 - 1e-3,
            elevation_samples: 90,
            line_iterations: 200,
            angle_tolerance: 1e-10,
            azimuth_window: 0.6,
            azimuth_samples: 13,
            grid_elevation_samples: 30,
            seeds: 4,
            simplex_step: 0.02,
            max_iterations: 2000,
            invalid_penalty: 1e6,
            physics: PhysicsParams::default(),
            tolerances: Tolerances::default(),
        }
    }
}

impl SolverConfig {
    /// Accepted miss distance for a receiver `separation` meters away.
    pub fn tolerance_for(&self, separation: f64) -> f64 {
        self.absolute_tolerance.max(self.relative_tolerance * separation)
    }

    fn validate(&self) -> Result<(), SolveError> {
        let invalid = |msg: &str| Err(SolveError::InvalidRequest(msg.to_string()));
        if !self.physics.is_valid() {
            return invalid("gravity must be finite and positive");
        }
        if !(self.absolute_tolerance > 0.0) || !(self.relative_tolerance >= 0.0) {
            return invalid("tolerances must be positive");
        }
        if !(self.min_elevation < self.max_elevation)
            || self.min_elevation < -FRAC_PI_2
            || self.max_elevation > FRAC_PI_2
        {
            return invalid("elevation range must be increasing and within [-pi/2, pi/2]");
        }
        if self.elevation_samples < 2 || self.azimuth_samples < 1 || self.grid_elevation_samples < 2 {
            return invalid("sample counts are too small");
        }
        if !self.invalid_penalty.is_finite() || self.invalid_penalty <= 0.0 {
            return invalid("invalid_penalty must be finite and positive");
        }
        if !self.tolerances.is_valid() {
            return invalid("surface tolerances must be finite and non-negative");
        }
        Ok(())
    }
}

/// What the caller asks for: throw from `launch`, land on `receiver` after `bounces` bounces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrowRequest {
    pub launch: DVec2,
    /// Launch height; defaults to the surface under `launch`.
    #[serde(default)]
    pub launch_height: Option<f64>,
    pub receiver: DVec2,
    pub speed: f64,
    pub bounces: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchStage {
    InitialGuess,
    Bearing,
    Simplex,
}

#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub angles: AngleGuess,
    pub miss: f64,
    pub tolerance: f64,
    pub bounces: usize,
    pub landing: DVec3,
    pub evaluations: usize,
    pub stage: SearchStage,
}

pub struct AngleSolver<'a> {
    surface: &'a Surface,
    config: SolverConfig,
}

impl<'a> AngleSolver<'a> {
    pub fn new(surface: &'a Surface, config: SolverConfig) -> Self {
        Self { surface, config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn solve(&self, request: &ThrowRequest, initial_guesses: &[AngleGuess]) -> Result<Solution, SolveError> {
        self.config.validate()?;
        validate_request(request)?;

        let surface = self.surface_with_tolerances();
        let tosser = Tosser::new(&surface, request.launch.x, request.launch.y, request.launch_height)?
            .with_physics(self.config.physics);

        if !surface.contains_xy(request.receiver.x, request.receiver.y) {
            info!(receiver = %request.receiver, "receiver is off the surface");
            return Err(SolveError::Unreachable {
                reason: "receiver lies outside the surface footprint".to_string(),
                evaluations: 0,
            });
        }

        let objective = Objective::new(tosser, request.receiver, request.speed, request.bounces);
        let tolerance = self.config.tolerance_for(objective.separation());
        let mut search = Search::new(&objective, tolerance);

        info!(
            launch = %tosser.position(),
            receiver = %request.receiver,
            speed = request.speed,
            bounces = request.bounces,
            tolerance,
            "solving launch angles"
        );

        if !initial_guesses.is_empty() {
            search.evaluate_many(initial_guesses.to_vec());
            if let Some(solution) = search.solution(SearchStage::InitialGuess) {
                return Ok(solution);
            }
        }

        self.bearing_stage(&mut search);
        if let Some(solution) = search.solution(SearchStage::Bearing) {
            return Ok(solution);
        }

        debug!(best = ?search.best.map(|c| c.distance), "bearing stage did not converge, escalating");
        self.simplex_stage(&mut search, initial_guesses);
        if let Some(solution) = search.solution(SearchStage::Simplex) {
            return Ok(solution);
        }

        match search.best {
            None => {
                info!(evaluations = search.evaluations, "no throw completed its bounces");
                Err(SolveError::Unreachable {
                    reason: format!("no sampled angle completes {} bounces on the surface", request.bounces),
                    evaluations: search.evaluations,
                })
            }
            Some(best) => {
                info!(evaluations = search.evaluations, best_miss = best.distance, "iteration budget exhausted");
                Err(SolveError::IterationLimit {
                    evaluations: search.evaluations,
                    best_miss: best.distance,
                    azimuth: wrap_angle(best.guess.azimuth),
                    elevation: best.guess.elevation,
                })
            }
        }
    }

    fn surface_with_tolerances(&self) -> Cow<'a, Surface> {
        if *self.surface.tolerances() == self.config.tolerances {
            Cow::Borrowed(self.surface)
        } else {
            Cow::Owned(self.surface.clone().with_tolerances(self.config.tolerances))
        }
    }

    /// Azimuth pinned to the bearing; root-find, then minimize, over elevation.
    fn bearing_stage(&self, search: &mut Search<'_, '_>) {
        let objective = search.objective;
        let azimuth = objective.bearing();
        let cfg = &self.config;

        let sweep = search.evaluate_many(
            linspace(cfg.min_elevation, cfg.max_elevation, cfg.elevation_samples)
                .into_iter()
                .map(|e| AngleGuess::new(azimuth, e))
                .collect(),
        );

        let brackets: Vec<(f64, f64, f64, f64)> = sweep
            .iter()
            .tuple_windows()
            .filter_map(|((g0, m0), (g1, m1))| match (m0, m1) {
                (Miss::Landed { landing: l0, .. }, Miss::Landed { landing: l1, .. }) => {
                    let s0 = objective.signed_range_error(*l0);
                    let s1 = objective.signed_range_error(*l1);
                    (s0.signum() != s1.signum()).then_some((g0.elevation, s0, g1.elevation, s1))
                }
                _ => None,
            })
            .collect();

        debug!(azimuth, brackets = brackets.len(), "elevation sweep along bearing");

        for (lo, f_lo, hi, f_hi) in brackets {
            bisect(
                |e| match search.evaluate(AngleGuess::new(azimuth, e)) {
                    Miss::Landed { landing, .. } => Some(objective.signed_range_error(landing)),
                    Miss::Invalid { .. } => None,
                },
                lo,
                f_lo,
                hi,
                f_hi,
                cfg.angle_tolerance,
                cfg.line_iterations,
            );
            if search.converged().is_some() {
                return;
            }
        }

        // Tangent solutions (e.g. the 45 degree flat-ground throw) never change sign.
        let best_sample = sweep
            .iter()
            .enumerate()
            .filter_map(|(i, (_, miss))| miss.distance().map(|d| (i, d)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((i, _)) = best_sample {
            let lo = sweep[i.saturating_sub(1)].0.elevation;
            let hi = sweep[(i + 1).min(sweep.len() - 1)].0.elevation;
            let penalty = cfg.invalid_penalty;
            golden_section(
                |e| search.evaluate(AngleGuess::new(azimuth, e)).value(penalty),
                lo,
                hi,
                cfg.angle_tolerance,
                cfg.line_iterations,
            );
        }
    }

    /// Both angles free: coarse parallel grid, then Nelder-Mead from the best points.
    fn simplex_stage(&self, search: &mut Search<'_, '_>, initial_guesses: &[AngleGuess]) {
        let cfg = &self.config;
        let bearing = search.objective.bearing();

        let azimuths = linspace(bearing - cfg.azimuth_window, bearing + cfg.azimuth_window, cfg.azimuth_samples);
        let elevations = linspace(cfg.min_elevation, cfg.max_elevation, cfg.grid_elevation_samples);
        let grid = search.evaluate_many(
            iproduct!(azimuths, elevations)
                .map(|(a, e)| AngleGuess::new(a, e))
                .collect(),
        );

        if search.valid == 0 {
            return;
        }

        let seeds: Vec<AngleGuess> = search
            .best
            .map(|c| c.guess)
            .into_iter()
            .chain(initial_guesses.iter().copied())
            .chain(
                grid.iter()
                    .filter_map(|(g, miss)| miss.distance().map(|d| (*g, d)))
                    .sorted_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(g, _)| g)
                    .take(cfg.seeds),
            )
            .unique_by(|g| (g.azimuth.to_bits(), g.elevation.to_bits()))
            .collect();

        let penalty = cfg.invalid_penalty;
        let (min_e, max_e) = (cfg.min_elevation, cfg.max_elevation);
        let mut budget = cfg.max_iterations;

        for seed in seeds {
            if budget == 0 {
                break;
            }
            let options = SimplexOptions {
                step: cfg.simplex_step,
                x_tol: cfg.angle_tolerance,
                f_tol: 0.0,
                target: 0.01 * search.tolerance,
                max_iterations: budget,
            };
            let result = nelder_mead::minimize(
                |p| {
                    search
                        .evaluate(AngleGuess::new(p.x, p.y.clamp(min_e, max_e)))
                        .value(penalty)
                },
                DVec2::new(seed.azimuth, seed.elevation),
                options,
            );
            budget = budget.saturating_sub(result.iterations);
            debug!(
                seed = ?seed,
                value = result.value,
                iterations = result.iterations,
                converged = result.converged,
                "simplex run finished"
            );
            if search.converged().is_some() {
                return;
            }
        }
    }
}

fn validate_request(request: &ThrowRequest) -> Result<(), SolveError> {
    let invalid = |msg: &str| Err(SolveError::InvalidRequest(msg.to_string()));
    if !request.speed.is_finite() || request.speed <= 0.0 {
        return invalid("speed must be finite and positive");
    }
    if request.bounces == 0 {
        return invalid("bounce count must be at least 1");
    }
    if !request.launch.is_finite() || !request.receiver.is_finite() {
        return invalid("launch and receiver must be finite");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    guess: AngleGuess,
    distance: f64,
    landing: DVec3,
}

/// Bookkeeping for one solve. The objective itself stays stateless.
struct Search<'o, 'a> {
    objective: &'o Objective<'a>,
    bounces: usize,
    tolerance: f64,
    evaluations: usize,
    valid: usize,
    best: Option<Candidate>,
}

impl<'o, 'a> Search<'o, 'a> {
    fn new(objective: &'o Objective<'a>, tolerance: f64) -> Self {
        Self {
            objective,
            bounces: objective.bounces(),
            tolerance,
            evaluations: 0,
            valid: 0,
            best: None,
        }
    }

    fn record(&mut self, guess: AngleGuess, miss: Miss) -> Miss {
        self.evaluations += 1;
        if let Miss::Landed { distance, landing } = miss {
            self.valid += 1;
            if self.best.is_none_or(|best| distance < best.distance) {
                self.best = Some(Candidate { guess, distance, landing });
            }
        }
        miss
    }

    fn evaluate(&mut self, guess: AngleGuess) -> Miss {
        let miss = self.objective.evaluate(guess);
        self.record(guess, miss)
    }

    /// Evaluations are independent, so they run on the rayon pool.
    fn evaluate_many(&mut self, guesses: Vec<AngleGuess>) -> Vec<(AngleGuess, Miss)> {
        let objective = self.objective;
        let results: Vec<(AngleGuess, Miss)> = guesses
            .into_par_iter()
            .map(|guess| (guess, objective.evaluate(guess)))
            .collect();
        for &(guess, miss) in &results {
            self.record(guess, miss);
        }
        results
    }

    fn converged(&self) -> Option<Candidate> {
        self.best.filter(|best| best.distance < self.tolerance)
    }

    fn solution(&self, stage: SearchStage) -> Option<Solution> {
        let best = self.converged()?;
        info!(
            azimuth_deg = wrap_angle(best.guess.azimuth).to_degrees(),
            elevation_deg = best.guess.elevation.to_degrees(),
            miss = best.distance,
            evaluations = self.evaluations,
            ?stage,
            "solution found"
        );
        Some(Solution {
            angles: AngleGuess::new(wrap_angle(best.guess.azimuth), best.guess.elevation),
            miss: best.distance,
            tolerance: self.tolerance,
            bounces: self.bounces,
            landing: best.landing,
            evaluations: self.evaluations,
            stage,
        })
    }
}
