use glam::DVec3;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::GeometryError;
use crate::physics::ballistics::{Flight, PhysicsParams};
use crate::physics::reflect::reflect;
use crate::terrain::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BouncePoint {
    pub position: DVec3,
    pub triangle: usize,
    /// Normal the velocity was reflected about.
    pub normal: DVec3,
    /// Duration of the flight segment ending at this bounce.
    pub flight_time: f64,
    pub impact_velocity: DVec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalStatus {
    /// Every requested bounce happened.
    Completed,
    /// The flight left the mesh footprint before the last bounce.
    Escaped,
    /// The ball skims along the surface and never leaves it.
    Grounded,
    /// A surface query could not be resolved.
    Failed(GeometryError),
}

#[derive(Debug, Clone)]
pub struct Trajectory {
    pub launch: DVec3,
    pub launch_velocity: DVec3,
    pub bounces: Vec<BouncePoint>,
    pub status: TerminalStatus,
    /// Velocity leaving the last bounce (the launch velocity if none).
    pub final_velocity: DVec3,
    physics: PhysicsParams,
}

impl Trajectory {
    pub fn is_complete(&self) -> bool {
        self.status == TerminalStatus::Completed
    }

    pub fn landing(&self) -> Option<&BouncePoint> {
        self.bounces.last()
    }

    /// Positions along every recorded segment, `samples_per_segment + 1` each.
    /// The trailing segment of an escaped run is not included.
    pub fn sample_path(&self, samples_per_segment: usize) -> Vec<DVec3> {
        let steps = samples_per_segment.max(1);
        let mut origin = self.launch;
        let mut velocity = self.launch_velocity;
        let mut path = vec![origin];

        for bounce in &self.bounces {
            let flight = Flight::new(origin, velocity, self.physics);
            path.extend((1..=steps).map(|i| {
                let t = bounce.flight_time * i as f64 / steps as f64;
                flight.position_at(t)
            }));
            origin = bounce.position;
            velocity = reflect(bounce.impact_velocity, bounce.normal);
        }

        path
    }
}

/// Fly from `launch` and bounce off `surface` up to `max_bounces` times.
pub fn simulate(
    launch: DVec3,
    velocity: DVec3,
    surface: &Surface,
    max_bounces: usize,
    physics: PhysicsParams,
) -> Trajectory {
    let mut trajectory = Trajectory {
        launch,
        launch_velocity: velocity,
        bounces: Vec::with_capacity(max_bounces),
        status: TerminalStatus::Completed,
        final_velocity: velocity,
        physics,
    };

    let mut position = launch;
    let mut velocity = velocity;

    while trajectory.bounces.len() < max_bounces {
        let flight = Flight::new(position, velocity, physics);

        let bounce = match next_bounce(surface, &flight) {
            Ok(Step::Bounce(bounce)) => bounce,
            Ok(Step::Escaped) => {
                debug!(bounces = trajectory.bounces.len(), "trajectory escaped the surface");
                trajectory.status = TerminalStatus::Escaped;
                break;
            }
            Ok(Step::Grounded) => {
                debug!(bounces = trajectory.bounces.len(), "ball slides along the surface");
                trajectory.status = TerminalStatus::Grounded;
                break;
            }
            Err(err) => {
                warn!(%err, "surface query failed mid-trajectory");
                trajectory.status = TerminalStatus::Failed(err);
                break;
            }
        };

        position = bounce.position;
        velocity = reflect(bounce.impact_velocity, bounce.normal);
        trajectory.bounces.push(bounce);
    }

    trajectory.final_velocity = velocity;
    trajectory
}

enum Step {
    Bounce(BouncePoint),
    Escaped,
    Grounded,
}

fn next_bounce(surface: &Surface, flight: &Flight) -> Result<Step, GeometryError> {
    let tol = surface.tolerances();

    // Resting on the surface without enough normal speed to leave it.
    if let Some(contact) = surface.probe(flight.origin.x, flight.origin.y)? {
        let gap = flight.origin.z - contact.height;
        if gap.abs() <= tol.contact && flight.return_time(contact.normal) <= tol.epsilon {
            let n = contact.normal;
            let tangential = flight.velocity - flight.velocity.dot(n) * n;
            if tangential.length() > tol.epsilon {
                return Ok(Step::Grounded);
            }
            return Ok(Step::Bounce(BouncePoint {
                position: flight.origin.truncate().extend(contact.height),
                triangle: contact.triangle,
                normal: n,
                flight_time: 0.0,
                impact_velocity: flight.velocity,
            }));
        }
    }

    let Some(hit) = surface.intersect_flight(flight)? else {
        return Ok(Step::Escaped);
    };

    // Snap onto the struck plane so the next segment starts on the surface.
    let struck = &surface.triangles()[hit.triangle];
    let position = hit.point.truncate().extend(struck.height_at(hit.point.truncate()));

    Ok(Step::Bounce(BouncePoint {
        position,
        triangle: hit.triangle,
        normal: hit.normal,
        flight_time: hit.t,
        impact_velocity: flight.velocity_at(hit.t),
    }))
}
