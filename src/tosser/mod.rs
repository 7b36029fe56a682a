use glam::DVec3;
use tracing::trace;

use crate::error::LaunchError;
use crate::geo::launch_direction;
use crate::physics::ballistics::PhysicsParams;
use crate::physics::trajectory::{simulate, Trajectory};
use crate::terrain::Surface;

/// A thrower standing on a surface.
#[derive(Debug, Clone, Copy)]
pub struct Tosser<'a> {
    surface: &'a Surface,
    position: DVec3,
    physics: PhysicsParams,
}

impl<'a> Tosser<'a> {
    /// Place the tosser at `(x, y)`. Without `z` it stands on the surface;
    /// an explicit `z` may be above the surface but never below it.
    pub fn new(surface: &'a Surface, x: f64, y: f64, z: Option<f64>) -> Result<Self, LaunchError> {
        let surface_z = surface
            .probe(x, y)?
            .map(|contact| contact.height)
            .ok_or(LaunchError::Outside { x, y })?;

        let z = match z {
            None => surface_z,
            Some(z) if z >= surface_z - surface.tolerances().contact => z.max(surface_z),
            Some(z) => return Err(LaunchError::BelowSurface { z, surface_z }),
        };

        Ok(Self {
            surface,
            position: DVec3::new(x, y, z),
            physics: PhysicsParams::default(),
        })
    }

    pub fn with_physics(mut self, physics: PhysicsParams) -> Self {
        self.physics = physics;
        self
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn surface(&self) -> &'a Surface {
        self.surface
    }

    pub fn physics(&self) -> PhysicsParams {
        self.physics
    }

    /// Throw at `speed` along (azimuth, elevation) and follow it for `bounces` bounces.
    /// The last bounce is where the ball sticks.
    pub fn throw(&self, speed: f64, bounces: usize, azimuth: f64, elevation: f64) -> Result<Trajectory, LaunchError> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(LaunchError::InvalidSpeed(speed));
        }
        Ok(self.throw_unchecked(speed, bounces, azimuth, elevation))
    }

    pub(crate) fn throw_unchecked(&self, speed: f64, bounces: usize, azimuth: f64, elevation: f64) -> Trajectory {
        let velocity = speed * launch_direction(azimuth, elevation);
        let trajectory = simulate(self.position, velocity, self.surface, bounces, self.physics);
        trace!(
            azimuth,
            elevation,
            bounces = trajectory.bounces.len(),
            status = ?trajectory.status,
            "throw"
        );
        trajectory
    }
}
