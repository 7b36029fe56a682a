use glam::{DVec2, DVec3};

use crate::error::LaunchError;
use crate::geo::{bearing, AngleGuess};
use crate::physics::ballistics::PhysicsParams;
use crate::physics::trajectory::Trajectory;
use crate::terrain::Surface;
use crate::tosser::Tosser;

/// Outcome of one objective evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Miss {
    /// All bounces happened; `distance` is planar, from the last bounce to the receiver.
    Landed { distance: f64, landing: DVec3 },
    /// The ball escaped or hit unresolvable geometry after `bounces` bounces.
    Invalid { bounces: usize },
}

impl Miss {
    pub fn distance(&self) -> Option<f64> {
        match self {
            Miss::Landed { distance, .. } => Some(*distance),
            Miss::Invalid { .. } => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Miss::Landed { .. })
    }

    /// Scalar for minimization; invalid outcomes cost `penalty`.
    pub fn value(&self, penalty: f64) -> f64 {
        self.distance().unwrap_or(penalty)
    }
}

/// Miss distance as a function of the launch angles, everything else fixed.
#[derive(Debug, Clone, Copy)]
pub struct Objective<'a> {
    tosser: Tosser<'a>,
    receiver: DVec2,
    speed: f64,
    bounces: usize,
}

impl<'a> Objective<'a> {
    pub fn new(tosser: Tosser<'a>, receiver: DVec2, speed: f64, bounces: usize) -> Self {
        Self { tosser, receiver, speed, bounces }
    }

    pub fn tosser(&self) -> &Tosser<'a> {
        &self.tosser
    }

    pub fn receiver(&self) -> DVec2 {
        self.receiver
    }

    pub fn bounces(&self) -> usize {
        self.bounces
    }

    /// Bearing from the launch point to the receiver.
    pub fn bearing(&self) -> f64 {
        bearing(self.tosser.position().truncate(), self.receiver)
    }

    /// Planar launch-to-receiver distance.
    pub fn separation(&self) -> f64 {
        self.tosser.position().truncate().distance(self.receiver)
    }

    pub fn evaluate(&self, guess: AngleGuess) -> Miss {
        self.score(&self.trajectory(guess))
    }

    pub fn trajectory(&self, guess: AngleGuess) -> Trajectory {
        self.tosser
            .throw_unchecked(self.speed, self.bounces, guess.azimuth, guess.elevation)
    }

    pub fn score(&self, trajectory: &Trajectory) -> Miss {
        match trajectory.landing() {
            Some(bounce) if trajectory.is_complete() && trajectory.bounces.len() == self.bounces => Miss::Landed {
                distance: bounce.position.truncate().distance(self.receiver),
                landing: bounce.position,
            },
            _ => Miss::Invalid { bounces: trajectory.bounces.len() },
        }
    }

    /// Landing error projected on the launch-to-receiver bearing.
    /// Negative when the ball falls short.
    pub fn signed_range_error(&self, landing: DVec3) -> f64 {
        let (sin_b, cos_b) = self.bearing().sin_cos();
        let offset = landing.truncate() - self.receiver;
        offset.dot(DVec2::new(cos_b, sin_b))
    }
}

/// One-shot miss distance for a throw from `launch` toward `receiver`.
#[allow(clippy::too_many_arguments)]
pub fn miss(
    azimuth: f64,
    elevation: f64,
    speed: f64,
    bounces: usize,
    launch: DVec3,
    receiver: DVec2,
    surface: &Surface,
    physics: PhysicsParams,
) -> Result<Miss, LaunchError> {
    if !speed.is_finite() || speed < 0.0 {
        return Err(LaunchError::InvalidSpeed(speed));
    }
    let tosser = Tosser::new(surface, launch.x, launch.y, Some(launch.z))?.with_physics(physics);
    Ok(Objective::new(tosser, receiver, speed, bounces).evaluate(AngleGuess::new(azimuth, elevation)))
}
