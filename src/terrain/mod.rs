use std::collections::HashMap;

use glam::{DMat2, DVec2, DVec3};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeometryError, MeshError};
use crate::physics::ballistics::Flight;

/// Numerical policy shared by every surface query and the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Hits at a path parameter at or below this are the query's own origin.
    pub epsilon: f64,
    /// Barycentric slack; a point this far outside a footprint still counts as on its edge.
    pub footprint: f64,
    /// Hits whose parameters differ by no more than this are the same hit.
    pub tie: f64,
    /// Height difference under which a point rests on the surface.
    pub contact: f64,
}

impl Tolerances {
    pub fn is_valid(&self) -> bool {
        [self.epsilon, self.footprint, self.tie, self.contact]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            epsilon: 1e-9,
            footprint: 1e-9,
            tie: 1e-9,
            contact: 1e-7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Triangle {
    pub indices: [usize; 3],
    /// Unit normal pointing away from the solid side (`normal.z > 0`).
    pub normal: DVec3,
    /// Plane offset: `normal · p == offset` on the plane.
    pub offset: f64,
    anchor: DVec2,
    to_barycentric: DMat2,
    min: DVec2,
    max: DVec2,
}

impl Triangle {
    fn new(id: usize, indices: [usize; 3], vertices: &[DVec3]) -> Result<Self, MeshError> {
        for &index in &indices {
            if index >= vertices.len() {
                return Err(MeshError::DanglingIndex {
                    triangle: id,
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }

        let [a, b, c] = indices.map(|i| vertices[i]);
        let e1 = (b - a).truncate();
        let e2 = (c - a).truncate();
        let footprint = DMat2::from_cols(e1, e2);
        let det = footprint.determinant();
        if det.abs() <= f64::EPSILON * e1.length() * e2.length() {
            return Err(MeshError::DegenerateTriangle { triangle: id });
        }

        let mut normal = (b - a).cross(c - a).normalize();
        if normal.z < 0.0 {
            normal = -normal;
        }

        let (a2, b2, c2) = (a.truncate(), b.truncate(), c.truncate());
        Ok(Self {
            indices,
            normal,
            offset: normal.dot(a),
            anchor: a2,
            to_barycentric: footprint.inverse(),
            min: a2.min(b2).min(c2),
            max: a2.max(b2).max(c2),
        })
    }

    /// Smallest barycentric coordinate of `p`. Negative outside the footprint.
    pub fn footprint_margin(&self, p: DVec2) -> f64 {
        let uv = self.to_barycentric * (p - self.anchor);
        uv.x.min(uv.y).min(1.0 - uv.x - uv.y)
    }

    pub fn contains_xy(&self, p: DVec2, tolerance: f64) -> bool {
        let pad = (self.max - self.min).max_element() * tolerance;
        if p.x < self.min.x - pad || p.y < self.min.y - pad || p.x > self.max.x + pad || p.y > self.max.y + pad {
            return false;
        }
        self.footprint_margin(p) >= -tolerance
    }

    pub fn height_at(&self, p: DVec2) -> f64 {
        (self.offset - self.normal.x * p.x - self.normal.y * p.y) / self.normal.z
    }

    /// Distance of `point` above the plane along the normal.
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.offset
    }
}

/// Height and orientation of the surface under a planar point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub triangle: usize,
    pub height: f64,
    pub normal: DVec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Path parameter of the hit (ray length units, or seconds for a flight).
    pub t: f64,
    pub point: DVec3,
    pub triangle: usize,
    /// Reflection normal; averaged over triangles when the hit is on a shared edge.
    pub normal: DVec3,
}

/// Immutable triangulated height-field.
#[derive(Debug, Clone)]
pub struct Surface {
    vertices: Vec<DVec3>,
    triangles: Vec<Triangle>,
    tolerances: Tolerances,
    min: DVec2,
    max: DVec2,
}

impl Surface {
    pub fn new(vertices: Vec<DVec3>, triangles: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        if vertices.is_empty() || triangles.is_empty() {
            return Err(MeshError::Empty);
        }

        let mut seen: HashMap<(u64, u64), usize> = HashMap::with_capacity(vertices.len());
        for (index, v) in vertices.iter().enumerate() {
            if !v.is_finite() {
                return Err(MeshError::NonFiniteVertex { index });
            }
            // +0.0 folds -0.0 into the same key
            let key = ((v.x + 0.0).to_bits(), (v.y + 0.0).to_bits());
            if let Some(&first) = seen.get(&key) {
                return Err(MeshError::DuplicateFootprint { first, second: index, x: v.x, y: v.y });
            }
            seen.insert(key, index);
        }

        let triangles = triangles
            .into_iter()
            .enumerate()
            .map(|(id, indices)| Triangle::new(id, indices, &vertices))
            .collect::<Result<Vec<_>, _>>()?;

        let (min, max) = vertices.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(lo, hi), v| (lo.min(v.truncate()), hi.max(v.truncate())),
        );

        debug!(vertices = vertices.len(), triangles = triangles.len(), "surface built");

        Ok(Self {
            vertices,
            triangles,
            tolerances: Tolerances::default(),
            min,
            max,
        })
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Planar bounding box of all vertices.
    pub fn bounds(&self) -> (DVec2, DVec2) {
        (self.min, self.max)
    }

    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        let p = DVec2::new(x, y);
        self.triangles
            .iter()
            .any(|tri| tri.contains_xy(p, self.tolerances.footprint))
    }

    /// Surface height and normal under `(x, y)`, or `None` off the mesh.
    pub fn probe(&self, x: f64, y: f64) -> Result<Option<Contact>, GeometryError> {
        let p = DVec2::new(x, y);
        let containing: Vec<usize> = self
            .triangles
            .iter()
            .positions(|tri| tri.contains_xy(p, self.tolerances.footprint))
            .collect();

        if containing.is_empty() {
            return Ok(None);
        }

        let (triangle, normal) = self.merge(p, &containing, 0.0)?;
        Ok(Some(Contact {
            triangle,
            height: self.triangles[triangle].height_at(p),
            normal,
        }))
    }

    pub fn height_at(&self, x: f64, y: f64) -> Result<f64, GeometryError> {
        self.probe(x, y)?
            .map(|contact| contact.height)
            .ok_or(GeometryError::OutsideFootprint { x, y })
    }

    /// Nearest hit of the ray `origin + t * direction` for `t > epsilon`.
    pub fn intersect(&self, origin: DVec3, direction: DVec3) -> Result<Option<SurfaceHit>, GeometryError> {
        let eps = self.tolerances.epsilon;
        let candidates = self
            .triangles
            .iter()
            .enumerate()
            .filter_map(|(id, tri)| {
                let denom = tri.normal.dot(direction);
                if denom == 0.0 {
                    return None;
                }
                let t = (tri.offset - tri.normal.dot(origin)) / denom;
                if t <= eps {
                    return None;
                }
                let point = origin + direction * t;
                tri.contains_xy(point.truncate(), self.tolerances.footprint)
                    .then_some((t, id))
            })
            .collect();

        self.nearest(candidates, |t| origin + direction * t)
    }

    /// First place a ballistic flight comes down onto the surface.
    pub fn intersect_flight(&self, flight: &Flight) -> Result<Option<SurfaceHit>, GeometryError> {
        let eps = self.tolerances.epsilon;
        let candidates = self
            .triangles
            .iter()
            .enumerate()
            .filter_map(|(id, tri)| {
                let t = flight.descending_crossing(tri.normal, tri.offset, eps)?;
                let point = flight.position_at(t);
                tri.contains_xy(point.truncate(), self.tolerances.footprint)
                    .then_some((t, id))
            })
            .collect();

        self.nearest(candidates, |t| flight.position_at(t))
    }

    fn nearest(
        &self,
        candidates: Vec<(f64, usize)>,
        position_at: impl Fn(f64) -> DVec3,
    ) -> Result<Option<SurfaceHit>, GeometryError> {
        let Some(t) = candidates.iter().map(|&(t, _)| t).min_by(f64::total_cmp) else {
            return Ok(None);
        };

        let tied: Vec<usize> = candidates
            .iter()
            .filter(|&&(ti, _)| ti - t <= self.tolerances.tie)
            .map(|&(_, id)| id)
            .sorted_unstable()
            .collect();

        let point = position_at(t);
        let (triangle, normal) = self.merge(point.truncate(), &tied, t)?;
        Ok(Some(SurfaceHit { t, point, triangle, normal }))
    }

    /// Resolve a point claimed by several triangles. Two interiors means the
    /// footprints overlap; otherwise the point sits on a shared edge or vertex
    /// and the normals are averaged.
    fn merge(&self, p: DVec2, ids: &[usize], t: f64) -> Result<(usize, DVec3), GeometryError> {
        let tol = self.tolerances.footprint;
        let interior: Vec<usize> = ids
            .iter()
            .copied()
            .filter(|&id| self.triangles[id].footprint_margin(p) > tol)
            .collect();

        match interior.as_slice() {
            [first, second, ..] => Err(GeometryError::AmbiguousHit { first: *first, second: *second, t }),
            [only] => Ok((*only, self.triangles[*only].normal)),
            [] => {
                let normal = ids
                    .iter()
                    .map(|&id| self.triangles[id].normal)
                    .fold(DVec3::ZERO, |acc, n| acc + n)
                    .normalize();
                if ids.len() > 1 {
                    debug!(triangles = ?ids, "hit on shared edge, averaging normals");
                }
                Ok((ids[0], normal))
            }
        }
    }
}
