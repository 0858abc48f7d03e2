// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// What is known about where a vertex came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecord {
    /// The vertex of the mesh the model was built from that this vertex
    /// derives from. Vertices synthesized from scratch have none.
    pub origin: Option<VertexId>,
    /// Number of cut edges around the vertex when it was last split.
    pub seam_valence: u32,
}

/// One [`SplitRecord`] per vertex of the current mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexSplitMap {
    records: Vec<SplitRecord>,
}

impl VertexSplitMap {
    /// Every vertex is its own origin
    pub fn identity(num_vertices: usize) -> Self {
        Self {
            records: (0..num_vertices)
                .map(|v| SplitRecord {
                    origin: Some(VertexId::from(v)),
                    seam_valence: 0,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SplitRecord] {
        &self.records
    }

    pub fn record(&self, v: VertexId) -> Option<&SplitRecord> {
        self.records.get(v.idx())
    }

    pub fn origin(&self, v: VertexId) -> Option<VertexId> {
        self.record(v).and_then(|r| r.origin)
    }

    pub fn seam_valence(&self, v: VertexId) -> u32 {
        self.record(v).map(|r| r.seam_valence).unwrap_or(0)
    }

    pub fn push(&mut self, record: SplitRecord) {
        self.records.push(record);
    }

    pub fn set_seam_valence(&mut self, v: VertexId, valence: u32) {
        if let Some(r) = self.records.get_mut(v.idx()) {
            r.seam_valence = valence;
        }
    }

    /// Extends the map for `parents.len()` new vertices, each one inheriting
    /// the origin of its parent.
    pub fn extend_from_parents(&mut self, parents: &[VertexId]) {
        for &parent in parents {
            let origin = self.origin(parent);
            self.records.push(SplitRecord {
                origin,
                seam_valence: 0,
            });
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }
}

/// The outcome of splitting a mesh along a set of cut edges.
#[derive(Debug)]
pub struct Detached {
    pub mesh: PolyMesh,
    /// The vertex each new vertex was split from, for the vertex ids that
    /// follow the ones of the input mesh.
    pub parents: Vec<VertexId>,
    /// Seam valence of every vertex that took part in a split, both the
    /// original ones and their duplicates.
    pub seam_valence: BTreeMap<VertexId, u32>,
}

impl Detached {
    /// The vertex of the input mesh that `v` comes from
    pub fn parent(&self, v: VertexId, num_old_vertices: usize) -> VertexId {
        if v.idx() < num_old_vertices {
            v
        } else {
            self.parents[v.idx() - num_old_vertices]
        }
    }
}

/// Splits the vertices of `mesh` along `cut` so the faces on each side of a
/// cut edge no longer share vertices.
///
/// Around each vertex, faces are visited in fan order starting right after
/// the first cut edge, or from the first boundary edge on the boundary. The
/// first stretch of faces keeps the vertex. Each further cut edge starts a
/// new stretch with a fresh duplicate. Interior vertices touching a single
/// cut edge are left alone, there's nothing to separate.
///
/// New vertices are appended in the order of the vertices they split from.
/// Point positions and UVs are copied, face-vertex normals follow the
/// corners they were set on.
#[profiling::function]
pub fn detach(mesh: &PolyMesh, cut: &BTreeSet<EdgeId>) -> MeshResult<Detached> {
    for &e in cut {
        mesh.check_edge(e)?;
    }

    let mut points = mesh.points().to_vec();
    let mut polygons = mesh.polygons().to_vec();
    let mut parents = vec![];
    let mut seam_valence = BTreeMap::new();
    let mut rewired = vec![];

    for v in (0..mesh.num_vertices()).map(VertexId::from) {
        let fan = mesh.vertex_fan(v)?;
        let n = fan.valence();
        let is_cut = |slot: usize| cut.contains(&fan.edges[slot]);

        let num_splits = (0..n).filter(|&s| is_cut(s)).count();
        if num_splits == 0 || (num_splits == 1 && !fan.on_boundary) {
            continue;
        }
        let start = if fan.on_boundary {
            0
        } else {
            (0..n).find(|&s| is_cut(s)).unwrap_or(0)
        };

        seam_valence.insert(v, num_splits as u32);
        let num_faces = fan.faces.len();
        let mut current = v;
        for f in 0..num_faces {
            let slot = (start + f) % n;
            if f != 0 && is_cut(slot) {
                current = VertexId::from(points.len());
                points.push(points[v.idx()]);
                parents.push(v);
                seam_valence.insert(current, num_splits as u32);
            }
            if current != v {
                let face = fan.faces[slot % num_faces];
                for corner in polygons[face.idx()].iter_mut() {
                    if *corner == v {
                        *corner = current;
                    }
                }
                rewired.push((face, v, current));
            }
        }
    }

    let mut detached = mesh.with_topology(points, polygons, mesh.uvs().clone())?;
    for (face, old, new) in rewired {
        if let Some(normal) = mesh.face_vertex_normal(face, old) {
            detached.set_face_vertex_normal(face, new, normal)?;
        }
    }

    log::debug!(
        "Detached {} edges, {} new vertices",
        cut.len(),
        parents.len()
    );
    Ok(Detached {
        mesh: detached,
        parents,
        seam_valence,
    })
}
