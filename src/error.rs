use thiserror::Error;

/// Malformed mesh input. Reported before any simulation runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("mesh has no vertices or no triangles")]
    Empty,

    #[error("triangle {triangle} references vertex {index}, but only {vertex_count} vertices exist")]
    DanglingIndex {
        triangle: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("vertices {first} and {second} share the footprint ({x}, {y})")]
    DuplicateFootprint {
        first: usize,
        second: usize,
        x: f64,
        y: f64,
    },

    #[error("triangle {triangle} has a zero-area footprint")]
    DegenerateTriangle { triangle: usize },

    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteVertex { index: usize },
}

/// A surface query that cannot be resolved.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("triangles {first} and {second} both contain the hit at t={t} in their interiors")]
    AmbiguousHit { first: usize, second: usize, t: f64 },

    #[error("point ({x}, {y}) is outside the surface footprint")]
    OutsideFootprint { x: f64, y: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LaunchError {
    #[error("tosser at ({x}, {y}) is outside of the landscape")]
    Outside { x: f64, y: f64 },

    #[error("tosser height {z} is below the landscape ({surface_z})")]
    BelowSurface { z: f64, surface_z: f64 },

    #[error("launch speed must be finite and non-negative, got {0}")]
    InvalidSpeed(f64),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Why the angle solver gave up. None of these are crashes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("unreachable: {reason} ({evaluations} evaluations)")]
    Unreachable { reason: String, evaluations: usize },

    #[error("iteration limit reached after {evaluations} evaluations, best miss {best_miss:.6} m")]
    IterationLimit {
        evaluations: usize,
        best_miss: f64,
        azimuth: f64,
        elevation: f64,
    },
}

impl SolveError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SolveError::Unreachable { .. })
    }
}
