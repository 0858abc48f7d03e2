// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use atomic_float::AtomicF32;
use nonmax::NonMaxU32;
use std::sync::atomic::Ordering;

use crate::error::bail_failure;
use crate::prelude::*;

/// A HalfEdge representation storing the halfedge pointers in contiguous
/// arrays. For each of the main arrays, at position `h` there is the data for
/// halfedge with index `h`.
///
/// Unlike [`MeshConnectivity`], boundary halfedges are not stored: a halfedge
/// on the boundary simply has no twin (encoded as u32::MAX, via NonMaxU32).
///
/// Vertex indices are the [`VertexId`]s of the mesh this was built from, face
/// indices its [`FaceId`]s and edge indices its [`EdgeId`]s. After one level of
/// subdivision, the parent vertices keep their indices, face points follow, and
/// then there is one edge point per parent edge.
///
/// The const parameter `Subdivided` tells whether this mesh is the result of a
/// subdivision. In that case the next, prev and face pointers follow from the
/// halfedge index and are not stored.
#[derive(Debug)]
#[allow(non_upper_case_globals)]
pub struct CompactMesh<const Subdivided: bool> {
    pub twin: Vec<Option<NonMaxU32>>,
    pub next: Vec<u32>,
    pub prev: Vec<u32>,
    pub vert: Vec<u32>,
    pub edge: Vec<u32>,
    pub face: Vec<u32>,
    /// The UV at the corner where each halfedge starts. Empty when the source
    /// mesh had unmapped faces.
    pub uv: Vec<Vec2>,
    pub vertex_positions: Vec<Vec3>,
    pub counts: MeshCounts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshCounts {
    /// The number of vertices
    pub num_vertices: usize,
    /// The number of halfedges. Boundary edges only have a single halfedge, so
    /// this is not twice the number of edges.
    pub num_halfedges: usize,
    /// The number of edges.
    pub num_edges: usize,
    /// The number of faces
    pub num_faces: usize,
}

impl MeshCounts {
    /// Counts after one subdivision step. Every halfedge becomes a quad.
    pub fn after_subdivision(&self) -> Self {
        MeshCounts {
            num_vertices: self.num_vertices + self.num_faces + self.num_edges,
            num_halfedges: 4 * self.num_halfedges,
            num_edges: 2 * self.num_edges + self.num_halfedges,
            num_faces: self.num_halfedges,
        }
    }
}

impl CompactMesh<false> {
    #[profiling::function]
    pub fn from_poly_mesh(mesh: &PolyMesh) -> MeshResult<Self> {
        let conn = mesh.connectivity();

        // Boundary halfedges are skipped, so halfedge ids need remapping.
        let mut h_id_to_idx = vec![None; conn.num_halfedges()];
        conn.iter_halfedges()
            .filter(|(_, h)| h.face.is_some())
            .enumerate()
            .for_each(|(idx, (id, _))| h_id_to_idx[id.idx()] = Some(idx as u32));
        let to_idx = |h: HalfEdgeId| {
            h_id_to_idx[h.idx()].ok_or_else(|| MeshError::failure(format!("{h} is on the boundary")))
        };

        let num_halfedges = h_id_to_idx.iter().flatten().count();
        let mut twin = Vec::with_capacity(num_halfedges);
        let mut next = Vec::with_capacity(num_halfedges);
        let mut prev = vec![0; num_halfedges];
        let mut vert = Vec::with_capacity(num_halfedges);
        let mut edge = Vec::with_capacity(num_halfedges);
        let mut face = Vec::with_capacity(num_halfedges);
        let mapped = (0..mesh.num_faces()).all(|f| mesh.uvs().is_mapped(FaceId::from(f)));
        let mut uv = Vec::with_capacity(if mapped { num_halfedges } else { 0 });

        for (h_id, _) in conn.iter_halfedges().filter(|(_, h)| h.face.is_some()) {
            let traversal = conn.at_halfedge(h_id);
            let idx = to_idx(h_id)?;
            let next_idx = to_idx(traversal.next().try_end()?)?;
            let f = traversal.face().try_end()?;
            let v = traversal.vertex().try_end()?;

            twin.push(match traversal.twin().face().try_end() {
                Ok(_) => NonMaxU32::new(to_idx(traversal.twin().try_end()?)?),
                Err(_) => None,
            });
            next.push(next_idx);
            prev[next_idx as usize] = idx;
            vert.push(v.0);
            edge.push(traversal.edge_id()?.0);
            face.push(f.0);

            if mapped {
                let corner = mesh
                    .polygon(f)?
                    .iter()
                    .position(|&c| c == v)
                    .ok_or_else(|| MeshError::failure(format!("{v} is not a corner of {f}")))?;
                let corner_uvs = mesh
                    .uvs()
                    .corner_uvs(f)
                    .ok_or_else(|| MeshError::failure(format!("Face {f} has no UVs")))?;
                uv.push(corner_uvs[corner]);
            }
        }

        Ok(CompactMesh {
            twin,
            next,
            prev,
            vert,
            edge,
            face,
            uv,
            vertex_positions: mesh.points().to_vec(),
            counts: MeshCounts {
                num_halfedges,
                num_vertices: mesh.num_vertices(),
                num_faces: mesh.num_faces(),
                num_edges: mesh.num_edges(),
            },
        })
    }
}

#[allow(non_upper_case_globals)]
impl<const Subdivided: bool> CompactMesh<Subdivided> {
    #[profiling::function]
    pub fn to_poly_mesh(&self) -> MeshResult<PolyMesh> {
        let mut face_start = vec![None; self.counts.num_faces];
        for h in 0..self.counts.num_halfedges {
            face_start[self.get_face(h)].get_or_insert(h);
        }

        let mut polygons = Vec::with_capacity(self.counts.num_faces);
        let mut uvs = UvSet::default();
        for (f, h0) in face_start.into_iter().enumerate() {
            let h0 = match h0 {
                Some(h0) => h0,
                None => bail_failure!("Face {f} has no halfedges"),
            };
            let mut halfedges = SVec::new();
            let mut h = h0;
            loop {
                halfedges.push(h);
                h = self.get_next(h);
                if h == h0 {
                    break;
                }
                if halfedges.len() > MAX_LOOP_ITERATIONS {
                    bail_failure!("Face {f} does not form a closed loop")
                }
            }
            polygons.push(
                halfedges
                    .iter()
                    .map(|&h| VertexId(self.vert[h]))
                    .collect_svec(),
            );
            if self.uv.is_empty() {
                uvs.add_unmapped();
            } else {
                uvs.add_polygon(halfedges.iter().map(|&h| self.uv[h]));
            }
        }

        PolyMesh::new(self.vertex_positions.clone(), polygons, Some(uvs))
    }

    /// For each edge, the vertex a subdivision step places on it, keyed by
    /// the edge's vertex pair in both orientations.
    pub fn edge_point_lookup(&self) -> HashMap<(VertexId, VertexId), VertexId> {
        let offset = (self.counts.num_vertices + self.counts.num_faces) as u32;
        let mut lookup = HashMap::with_capacity(self.counts.num_halfedges * 2);
        for h in 0..self.counts.num_halfedges {
            let a = VertexId(self.vert[h]);
            let b = VertexId(self.vert[self.get_next(h)]);
            let mid = VertexId(offset + self.edge[h]);
            lookup.insert((a, b), mid);
            lookup.insert((b, a), mid);
        }
        lookup
    }

    /// Writes the connectivity of the 4 halfedges `4h..4h + 4` that halfedge
    /// `h` turns into. Child 0 starts at the source of `h`, child 1 at the
    /// edge point of `h`, child 2 at the face point and child 3 at the edge
    /// point of the previous halfedge.
    fn refine_halfedge(&self, h: usize, twin: &mut [Option<NonMaxU32>], vert: &mut [u32], edge: &mut [u32]) {
        let num_vertices = self.counts.num_vertices as u32;
        let face_points = num_vertices;
        let edge_points = num_vertices + self.counts.num_faces as u32;
        let num_edges = self.counts.num_edges as u32;
        let prev = self.get_prev(h);
        let next = self.get_next(h);
        let child = |parent: usize, i: usize| NonMaxU32::new((4 * parent + i) as u32);

        twin[0] = self.twin[h].and_then(|t| child(self.get_next(t.get() as usize), 3));
        twin[1] = child(next, 2);
        twin[2] = child(prev, 1);
        twin[3] = self.twin[prev].and_then(|t| child(t.get() as usize, 0));

        vert[0] = self.vert[h];
        vert[1] = edge_points + self.edge[h];
        vert[2] = face_points + self.get_face(h) as u32;
        vert[3] = edge_points + self.edge[prev];

        // Each parent edge splits in two halves. The halfedge with the lowest
        // index of the pair (or the only one, on the boundary) picks the
        // first half for the child leaving its source.
        let is_first = |h: usize| self.twin[h].map(|t| (h as u32) < t.get()).unwrap_or(true);
        edge[0] = 2 * self.edge[h] + u32::from(!is_first(h));
        edge[1] = 2 * num_edges + h as u32;
        edge[2] = 2 * num_edges + prev as u32;
        edge[3] = 2 * self.edge[prev] + u32::from(is_first(prev));
    }

    /// Corner UVs of the 4 children of `h`, interpolated linearly. `centroid`
    /// is the UV centroid of the face of `h`.
    fn refine_uvs(&self, h: usize, centroid: Vec2, uv: &mut [Vec2]) {
        let at = |h: usize| self.uv[h];
        uv[0] = at(h);
        uv[1] = at(h).lerp(at(self.get_next(h)), 0.5);
        uv[2] = centroid;
        uv[3] = at(self.get_prev(h)).lerp(at(h), 0.5);
    }

    /// Returns the next of a given halfedge h. This will use an analytical
    /// expression if the mesh has been subdivided at least once.
    pub fn get_next(&self, h: usize) -> usize {
        if Subdivided {
            if h % 4 == 3 {
                h - 3
            } else {
                h + 1
            }
        } else {
            self.next[h] as usize
        }
    }

    /// Returns the prev of a given halfedge h. This will use an analytical
    /// expression if the mesh has been subdivided at least once.
    pub fn get_prev(&self, h: usize) -> usize {
        if Subdivided {
            if h % 4 == 0 {
                h + 3
            } else {
                h - 1
            }
        } else {
            self.prev[h] as usize
        }
    }

    /// Returns the face of a given halfedge h. This will use an analytical
    /// expression if the mesh has been subdivided at least once.
    pub fn get_face(&self, h: usize) -> usize {
        if Subdivided {
            h / 4
        } else {
            self.face[h] as usize
        }
    }

    /// Number of halfedges in the face loop of `h`
    fn cycle_length(&self, h: usize) -> u32 {
        if Subdivided {
            return 4;
        }
        let mut cycle_len = 1;
        let mut hh = self.get_next(h);
        while hh != h {
            cycle_len += 1;
            hh = self.get_next(hh);
            if cycle_len > MAX_LOOP_ITERATIONS {
                break;
            }
        }
        cycle_len as u32
    }

    /// Valence of the source vertex of `h`, or `None` when it's on the
    /// boundary.
    fn valence(&self, h: usize) -> Option<NonMaxU32> {
        let mut valence = 1;
        let mut it = self.get_next(self.twin[h]?.get() as usize);
        while it != h {
            valence += 1;
            it = self.get_next(self.twin[it]?.get() as usize);
            if valence > MAX_LOOP_ITERATIONS {
                break;
            }
        }
        NonMaxU32::new(valence as u32)
    }

    /// Positions after one subdivision step: the original vertices first,
    /// then face points, then edge points.
    ///
    /// Every pass adds one contribution per halfedge from many threads, so
    /// the sums go through atomics.
    fn refine_positions(&self, num_new_vertices: usize, catmull_clark: bool) -> Vec<Vec3> {
        use rayon::prelude::*;

        // SAFETY: Vec3 and AtomicVec3 have the exact same memory layout
        let acc = unsafe { transmute_vec::<Vec3, AtomicVec3>(vec![Vec3::ZERO; num_new_vertices]) };
        let pos = &self.vertex_positions;
        let face_point = |h: usize| self.counts.num_vertices + self.get_face(h);
        let edge_point =
            |h: usize| self.counts.num_vertices + self.counts.num_faces + self.edge[h] as usize;
        let halfedges = || (0..self.counts.num_halfedges).into_par_iter();

        // Face points: centroid of the corners
        halfedges().for_each(|h| {
            let corner = pos[self.vert[h] as usize];
            acc[face_point(h)].fetch_add(corner / self.cycle_length(h) as f32, Ordering::Relaxed);
        });

        // Edge points. Boundary edges, and every edge in linear mode, sit at
        // the midpoint.
        halfedges().for_each(|h| {
            let src = pos[self.vert[h] as usize];
            if catmull_clark && self.twin[h].is_some() {
                let f = acc[face_point(h)].load(Ordering::Relaxed);
                acc[edge_point(h)].fetch_add((src + f) / 4.0, Ordering::Relaxed);
            } else {
                let dst = pos[self.vert[self.get_next(h)] as usize];
                acc[edge_point(h)].store(src.lerp(dst, 0.5), Ordering::Relaxed);
            }
        });

        // Vertex points. Boundary vertices stay where they are.
        halfedges().for_each(|h| {
            let v = self.vert[h] as usize;
            match self.valence(h) {
                Some(n) if catmull_clark => {
                    let n = n.get() as f32;
                    let e = acc[edge_point(h)].load(Ordering::Relaxed);
                    let f = acc[face_point(h)].load(Ordering::Relaxed);
                    acc[v].fetch_add((4.0 * e - f + (n - 3.0) * pos[v]) / (n * n), Ordering::Relaxed);
                }
                _ => acc[v].store(pos[v], Ordering::Relaxed),
            }
        });

        // SAFETY: Same layout, as above
        unsafe { transmute_vec::<AtomicVec3, Vec3>(acc) }
    }

    /// See "A HalfEdge Refinement Rule for Parallel Catmull-Clark"
    /// https://onrendering.com/data/papers/catmark/HalfedgeCatmullClark.pdf
    ///
    /// If `catmull_clark` is set to true, smooth subdivision using the Catmull
    /// Clark algorithm is performed, otherwise linear subdivision is performed.
    /// UVs, when present, are always interpolated linearly.
    #[profiling::function]
    pub fn subdivide(&self, catmull_clark: bool) -> CompactMesh<true> {
        use rayon::prelude::*;

        let new_counts = self.counts.after_subdivision();

        let mut new_twin: Vec<Option<NonMaxU32>> = vec![None; new_counts.num_halfedges];
        let mut new_vert = vec![0u32; new_counts.num_halfedges];
        let mut new_edge = vec![0u32; new_counts.num_halfedges];

        // Chunk `h` holds the children of halfedge `h`
        (
            new_twin.par_chunks_mut(4),
            new_vert.par_chunks_mut(4),
            new_edge.par_chunks_mut(4),
        )
            .into_par_iter()
            .enumerate()
            .for_each(|(h, (twin, vert, edge))| self.refine_halfedge(h, twin, vert, edge));

        let mut new_uv = vec![];
        if !self.uv.is_empty() {
            let mut uv_sums = vec![Vec2::ZERO; self.counts.num_faces];
            for h in 0..self.counts.num_halfedges {
                uv_sums[self.get_face(h)] += self.uv[h] / self.cycle_length(h) as f32;
            }
            new_uv = vec![Vec2::ZERO; new_counts.num_halfedges];
            new_uv
                .par_chunks_mut(4)
                .enumerate()
                .for_each(|(h, uv)| {
                    self.refine_uvs(h, uv_sums[self.get_face(h)], uv)
                });
        }

        let new_vertex_positions = self.refine_positions(new_counts.num_vertices, catmull_clark);

        CompactMesh {
            twin: new_twin,
            // NOTE: Empty vecs represent analytically computed properties
            prev: vec![],
            next: vec![],
            vert: new_vert,
            edge: new_edge,
            face: vec![],
            uv: new_uv,
            vertex_positions: new_vertex_positions,
            counts: new_counts,
        }
    }
}

impl PolyMesh {
    /// Subdivides the mesh `iterations` times. Face-vertex normals are not
    /// carried over.
    pub fn subdivide(&self, iterations: usize, catmull_clark: bool) -> MeshResult<PolyMesh> {
        if iterations == 0 {
            return Ok(self.clone());
        }
        let mut subdivided = CompactMesh::from_poly_mesh(self)?.subdivide(catmull_clark);
        for _ in 1..iterations {
            subdivided = subdivided.subdivide(catmull_clark);
        }
        subdivided.to_poly_mesh()
    }
}

/// A counterpart to `glam::Vec3` with atomics in its `x`, `y`, `z` fields.
#[repr(C)]
struct AtomicVec3 {
    pub x: AtomicF32,
    pub y: AtomicF32,
    pub z: AtomicF32,
}

impl AtomicVec3 {
    /// Calls `fetch_add` on each of the inner atomic values internally. Note
    /// that there is one atomic operation per dimension.
    pub fn fetch_add(&self, v: Vec3, order: Ordering) {
        self.x.fetch_add(v.x, order);
        self.y.fetch_add(v.y, order);
        self.z.fetch_add(v.z, order);
    }

    pub fn store(&self, v: Vec3, order: Ordering) {
        self.x.store(v.x, order);
        self.y.store(v.y, order);
        self.z.store(v.z, order);
    }

    pub fn load(&self, order: Ordering) -> Vec3 {
        Vec3::new(self.x.load(order), self.y.load(order), self.z.load(order))
    }
}
