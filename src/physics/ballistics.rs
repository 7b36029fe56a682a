use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Tosser gravity: a flat 10 m/s^2, not 9.81.
pub const DEFAULT_GRAVITY_MPS2: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    pub gravity_mps2: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self { gravity_mps2: DEFAULT_GRAVITY_MPS2 }
    }
}

impl PhysicsParams {
    pub fn acceleration(&self) -> DVec3 {
        DVec3::new(0.0, 0.0, -self.gravity_mps2)
    }

    pub fn is_valid(&self) -> bool {
        self.gravity_mps2.is_finite() && self.gravity_mps2 > 0.0
    }

    /// Flat-ground range of a launch at `speed` and `elevation`.
    pub fn flat_range(&self, speed: f64, elevation: f64) -> f64 {
        speed * speed * (2.0 * elevation).sin() / self.gravity_mps2
    }
}

/// One ballistic segment: constant acceleration from `origin` at time 0.
#[derive(Clone, Copy, Debug)]
pub struct Flight {
    pub origin: DVec3,
    pub velocity: DVec3,
    pub acceleration: DVec3,
}

impl Flight {
    pub fn new(origin: DVec3, velocity: DVec3, physics: PhysicsParams) -> Self {
        Self {
            origin,
            velocity,
            acceleration: physics.acceleration(),
        }
    }

    pub fn position_at(&self, t: f64) -> DVec3 {
        self.origin + self.velocity * t + 0.5 * self.acceleration * t * t
    }

    pub fn velocity_at(&self, t: f64) -> DVec3 {
        self.velocity + self.acceleration * t
    }

    /// Earliest `t > min_time` at which the path reaches the plane `n·x = offset`
    /// while moving toward its back side.
    pub fn descending_crossing(&self, normal: DVec3, offset: f64, min_time: f64) -> Option<f64> {
        let a = 0.5 * normal.dot(self.acceleration);
        let b = normal.dot(self.velocity);
        let c = normal.dot(self.origin) - offset;

        let (t0, t1) = solve_quadratic(a, b, c)?;
        [t0, t1]
            .into_iter()
            .find(|&t| t > min_time && normal.dot(self.velocity_at(t)) <= 0.0)
    }

    /// Time until the path returns to the plane through `origin` with the given normal.
    /// Infinite when the acceleration never pulls it back.
    pub fn return_time(&self, normal: DVec3) -> f64 {
        let pull = normal.dot(self.acceleration);
        if pull >= 0.0 {
            return f64::INFINITY;
        }
        (-2.0 * normal.dot(self.velocity) / pull).max(0.0)
    }
}

/// Real roots of `a t^2 + b t + c`, ascending. Uses the cancellation-free form.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    if a == 0.0 {
        if b == 0.0 {
            return None;
        }
        let t = -c / b;
        return Some((t, t));
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }

    let q = -0.5 * (b + b.signum() * disc.sqrt());
    if q == 0.0 {
        // b == 0 and c == 0
        return Some((0.0, 0.0));
    }

    let r0 = q / a;
    let r1 = c / q;
    Some(if r0 <= r1 { (r0, r1) } else { (r1, r0) })
}
