use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::solver::{SolverConfig, ThrowRequest};
use crate::terrain::Surface;

/// On-disk mesh layout:
/// `{ "verts": [[x, y, z], ...], "tri": [[v1, v2, v3], ...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshFile {
    pub verts: Vec<[f64; 3]>,
    pub tri: Vec<[usize; 3]>,
}

impl MeshFile {
    pub fn into_surface(self) -> Result<Surface> {
        let vertices = self.verts.into_iter().map(DVec3::from_array).collect();
        Ok(Surface::new(vertices, self.tri)?)
    }
}

pub fn parse_surface(json: &str) -> Result<Surface> {
    let mesh: MeshFile = serde_json::from_str(json).context("malformed mesh JSON")?;
    mesh.into_surface()
}

pub fn load_surface_from_json(path: impl AsRef<Path>) -> Result<Surface> {
    let path = path.as_ref();
    let mesh: MeshFile = read_json(path)?;
    mesh.into_surface()
        .with_context(|| format!("invalid mesh in {:?}", path))
}

pub fn load_solver_config(path: impl AsRef<Path>) -> Result<SolverConfig> {
    read_json(path.as_ref())
}

pub fn load_requests(path: impl AsRef<Path>) -> Result<Vec<ThrowRequest>> {
    read_json(path.as_ref())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| format!("Failed to parse {:?}", path))
}
