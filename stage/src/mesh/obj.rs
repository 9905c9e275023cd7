//! Importer for a restricted Wavefront OBJ dialect.
//!
//! Only `v`, `vt`, `vn` and `f` records are understood, everything else is
//! skipped. Numbers go through a small fixed-point parser that knows nothing
//! about exponents and reads malformed tokens as zero. Polygons are fan
//! triangulated from their first corner, and identical
//! `position/tex_coord/normal` reference triples share one vertex slot,
//! numbered in the order they first appear.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use arrayvec::ArrayVec;
use log::{debug, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::math::*;
use crate::mesh::*;

/// One face corner as written in the source: 1-based indices, 0 when the component is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VertexRef {
    pub position: u32,
    pub tex_coord: u32,
    pub normal: u32,
}

impl VertexRef {
    pub const fn new(position: u32, tex_coord: u32, normal: u32) -> Self {
        Self { position, tex_coord, normal }
    }
}

/// A triangle corner after fan expansion, with the source line it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    pub key: VertexRef,
    pub line: usize,
}

/// Attribute tables and triangle corners, before deduplication.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawGeometry {
    pub positions: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    /// Three entries per triangle.
    pub corners: Vec<Corner>,
}

impl RawGeometry {
    fn resolve(&self, corner: &Corner) -> Result<Vertex> {
        let malformed = |what: &str, index: u32, len: usize| Error::MalformedGeometry {
            line: corner.line,
            reason: format!("{what} index {index} out of range (1..={len})"),
        };

        let key = corner.key;
        let position = lookup(&self.positions, key.position)
            .flatten()
            .ok_or_else(|| malformed("position", key.position, self.positions.len()))?;
        let tex_coord = lookup(&self.tex_coords, key.tex_coord)
            .ok_or_else(|| malformed("tex coord", key.tex_coord, self.tex_coords.len()))?
            .unwrap_or_default();
        let normal = lookup(&self.normals, key.normal)
            .ok_or_else(|| malformed("normal", key.normal, self.normals.len()))?
            .unwrap_or_default();

        Ok(Vertex::new(position, tex_coord, normal))
    }
}

// None: out of range, Some(None): absent (index 0), Some(Some(v)): found
fn lookup<T: Copy>(table: &[T], index: u32) -> Option<Option<T>> {
    match index {
        0 => Some(None),
        i => table.get(i as usize - 1).map(|&v| Some(v)),
    }
}

/// Fixed-point decimal parser: an optional leading `-`, digits and at most one `.`.
/// Anything else, exponents included, makes the whole token read as 0.
pub fn parse_decimal(token: &str) -> f32 {
    let bytes = token.as_bytes();
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, bytes),
    };

    let mut value = 0.0f32;
    let mut factor = 1.0f32;
    let mut fraction = false;
    for &b in digits {
        match b {
            b'0'..=b'9' => {
                let digit = (b - b'0') as f32;
                if fraction {
                    factor *= 0.1;
                    value += digit * factor;
                } else {
                    value = value * 10.0 + digit;
                }
            }
            b'.' if !fraction => fraction = true,
            _ => return 0.0,
        }
    }

    if negative && value != 0.0 { -value } else { value }
}

/// Unsigned decimal integer. Empty, malformed or overflowing tokens read as 0.
pub fn parse_index(token: &str) -> u32 {
    let mut value = 0u32;
    for &b in token.as_bytes() {
        if !b.is_ascii_digit() {
            return 0;
        }
        match value.checked_mul(10).and_then(|v| v.checked_add((b - b'0') as u32)) {
            Some(v) => value = v,
            None => return 0,
        }
    }
    value
}

fn parse_vertex_ref(term: &str, line: usize) -> Result<VertexRef> {
    let mut components = ArrayVec::<u32, 3>::new();
    for component in term.split('/') {
        components.try_push(parse_index(component)).map_err(|_| Error::MalformedGeometry {
            line,
            reason: format!("face reference '{term}' has more than 3 components"),
        })?;
    }
    let at = |i: usize| components.get(i).copied().unwrap_or(0);
    Ok(VertexRef::new(at(0), at(1), at(2)))
}

fn parse_face<'a>(terms: impl Iterator<Item = &'a str>, line: usize, corners: &mut Vec<Corner>) -> Result<()> {
    let refs = terms.map(|term| parse_vertex_ref(term, line)).collect::<Result<Vec<_>>>()?;
    if refs.len() < 3 {
        return Err(Error::MalformedGeometry { line, reason: format!("face has {} corners, need at least 3", refs.len()) });
    }

    let pivot = refs[0];
    for pair in refs[1..].windows(2) {
        for key in [pivot, pair[0], pair[1]] {
            corners.push(Corner { key, line });
        }
    }
    Ok(())
}

// lenient: missing components read as 0
fn parse_components<'a, const N: usize>(terms: impl Iterator<Item = &'a str>, line: usize) -> [f32; N] {
    let values: ArrayVec<f32, N> = terms.take(N).map(parse_decimal).collect();
    if values.len() < N {
        warn!("line {}: expected {} components, found {}", line, N, values.len());
    }
    let mut out = [0.0; N];
    out[..values.len()].copy_from_slice(&values);
    out
}

fn parse_vec3<'a>(terms: impl Iterator<Item = &'a str>, line: usize) -> Vec3 {
    let [x, y, z] = parse_components(terms, line);
    Vec3::new(x, y, z)
}

fn parse_vec2<'a>(terms: impl Iterator<Item = &'a str>, line: usize) -> Vec2 {
    let [u, v] = parse_components(terms, line);
    Vec2::new(u, v)
}

/// Splits the source into attribute tables and fan-expanded triangle corners.
pub fn scan(source: &str) -> Result<RawGeometry> {
    let mut raw = RawGeometry::default();

    for (line_index, line) in source.lines().enumerate() {
        let line_number = line_index + 1;
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('#') {
            continue;
        }

        // Runs of spaces count as one separator. Strict single-space splitting
        // would read `v  1 2 3` as (0, 1, 2).
        let mut terms = line.split(' ').filter(|t| !t.is_empty());
        match terms.next() {
            Some("v") => raw.positions.push(parse_vec3(terms, line_number)),
            Some("vt") => raw.tex_coords.push(parse_vec2(terms, line_number)),
            Some("vn") => raw.normals.push(parse_vec3(terms, line_number)),
            Some("f") => parse_face(terms, line_number, &mut raw.corners)?,
            _ => {}
        }
    }

    Ok(raw)
}

/// Assigns every distinct reference triple a compact vertex slot, in first-occurrence order.
pub fn deduplicate(raw: &RawGeometry) -> Result<Mesh> {
    let mut slots: HashMap<VertexRef, u32> = HashMap::with_capacity(raw.corners.len());
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(raw.corners.len());

    for corner in &raw.corners {
        let slot = match slots.entry(corner.key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                vertices.push(raw.resolve(corner)?);
                *entry.insert((vertices.len() - 1) as u32)
            }
        };
        indices.push(slot);
    }

    Mesh::new(vertices, indices)
}

/// Parses `source` into a deduplicated mesh.
pub fn import(source: &str) -> Result<Mesh> {
    let raw = scan(source)?;
    let mesh = deduplicate(&raw)?;
    debug!(
        "imported mesh: {} positions, {} tex coords, {} normals -> {} vertices, {} triangles ({} corners)",
        raw.positions.len(),
        raw.tex_coords.len(),
        raw.normals.len(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        raw.corners.len()
    );
    Ok(mesh)
}

/// Imports independent sources on the rayon pool. Results are in input order.
pub fn import_all<S: AsRef<str> + Sync>(sources: &[S]) -> Vec<Result<Mesh>> {
    sources.par_iter().map(|source| import(source.as_ref())).collect()
}
