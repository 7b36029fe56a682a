use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Launch angles in radians.
/// Azimuth is counter-clockwise from +x, elevation is above the x-y plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleGuess {
    pub azimuth: f64,
    pub elevation: f64,
}

impl AngleGuess {
    pub fn new(azimuth: f64, elevation: f64) -> Self {
        Self { azimuth, elevation }
    }

    pub fn from_degrees(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            azimuth: azimuth_deg.to_radians(),
            elevation: elevation_deg.to_radians(),
        }
    }

    pub fn direction(&self) -> DVec3 {
        launch_direction(self.azimuth, self.elevation)
    }

    /// Azimuth folded into (-180, 180] degrees, for display.
    pub fn azimuth_deg(&self) -> f64 {
        wrap_angle(self.azimuth).to_degrees()
    }

    pub fn elevation_deg(&self) -> f64 {
        self.elevation.to_degrees()
    }
}

/// Unit vector for a launch at the given azimuth and elevation.
pub fn launch_direction(azimuth: f64, elevation: f64) -> DVec3 {
    let (sin_e, cos_e) = elevation.sin_cos();
    let (sin_a, cos_a) = azimuth.sin_cos();
    DVec3::new(cos_e * cos_a, cos_e * sin_a, sin_e)
}

/// Planar bearing from `from` to `to`, counter-clockwise from +x.
/// Coincident points give 0.
pub fn bearing(from: DVec2, to: DVec2) -> f64 {
    let d = to - from;
    if d.length_squared() == 0.0 {
        return 0.0;
    }
    d.y.atan2(d.x)
}

/// Distance between two points ignoring height.
pub fn planar_distance(a: DVec3, b: DVec3) -> f64 {
    a.truncate().distance(b.truncate())
}

/// Fold an angle into (-pi, pi].
pub fn wrap_angle(angle: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let wrapped = angle.rem_euclid(tau);
    if wrapped > std::f64::consts::PI {
        wrapped - tau
    } else {
        wrapped
    }
}

/// `count` evenly spaced values covering `[start, end]`.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![0.5 * (start + end)],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}
