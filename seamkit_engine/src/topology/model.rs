// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use slotmap::DenseSlotMap;

use crate::error::{bail_failure, bail_invalid};
use crate::mesh::compact_mesh::CompactMesh;
use crate::prelude::*;
use crate::topology::*;

slotmap::new_key_type! { pub struct LoopId; }

/// Corner UVs given to every quad built from scratch
pub(crate) const UNIT_SQUARE_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmoothOptions {
    /// Number of subdivision steps. Each one doubles the edges of a loop.
    pub divisions: u32,
    /// Linear subdivision when false
    pub catmull_clark: bool,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            divisions: 1,
            catmull_clark: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtrudeOptions {
    /// Total distance swept against the vertex normals
    pub thickness: f32,
    /// Intermediate rows of vertices. Zero gives a single row of quads.
    pub divisions: u32,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            thickness: 0.1,
            divisions: 0,
        }
    }
}

/// Owns a mesh and everything that has to be kept in sync with it while it
/// is edited: where each vertex came from, a normal per vertex that edits
/// can set independently of the geometry, and the set of active edge loops.
///
/// Every edit builds the new state on the side and swaps it in at the end,
/// so a failed edit leaves the model as it was.
#[derive(Clone, Debug, Default)]
pub struct MeshTopologyModel {
    mesh: Option<PolyMesh>,
    split_map: VertexSplitMap,
    normals: Vec<Vec3>,
    loops: DenseSlotMap<LoopId, EdgeLoop>,
}

impl EdgeTopology for MeshTopologyModel {
    fn edge_endpoints(&self, edge: EdgeId) -> MeshResult<(VertexId, VertexId)> {
        self.mesh()?.edge_vertices(edge)
    }

    fn vertex_position(&self, vertex: VertexId) -> MeshResult<Vec3> {
        self.mesh()?.point(vertex)
    }
}

impl MeshTopologyModel {
    /// Takes ownership of `mesh`. The normal overlay starts as the smooth
    /// vertex normals of the mesh.
    pub fn new(mesh: PolyMesh) -> MeshResult<Self> {
        let normals = mesh.vertex_normals()?;
        Ok(Self {
            split_map: VertexSplitMap::identity(mesh.num_vertices()),
            normals,
            mesh: Some(mesh),
            loops: DenseSlotMap::with_key(),
        })
    }

    /// Builds a model over a copy of `mesh`
    pub fn from_mesh(mesh: &PolyMesh) -> MeshResult<Self> {
        Self::new(mesh.clone())
    }

    pub fn mesh(&self) -> MeshResult<&PolyMesh> {
        match &self.mesh {
            Some(mesh) => Ok(mesh),
            None => bail_failure!("No mesh bound to the model"),
        }
    }

    pub(crate) fn mesh_mut(&mut self) -> MeshResult<&mut PolyMesh> {
        match &mut self.mesh {
            Some(mesh) => Ok(mesh),
            None => bail_failure!("No mesh bound to the model"),
        }
    }

    pub fn into_mesh(self) -> Option<PolyMesh> {
        self.mesh
    }

    pub fn vertex_split_map(&self) -> &VertexSplitMap {
        &self.split_map
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Replaces the normal overlay. There must be exactly one normal per
    /// vertex.
    pub fn set_normals(&mut self, normals: Vec<Vec3>) -> MeshResult<()> {
        let num_vertices = self.mesh()?.num_vertices();
        if normals.len() != num_vertices {
            bail_invalid!("Got {} normals for {num_vertices} vertices", normals.len())
        }
        self.normals = normals;
        Ok(())
    }

    fn overlay_normal(&self, v: VertexId) -> Vec3 {
        self.normals.get(v.idx()).copied().unwrap_or(Vec3::ZERO)
    }

    /// Swaps in the result of an edit. The split map and the normal overlay
    /// must already describe the vertices of `mesh`.
    pub(crate) fn commit(&mut self, mesh: PolyMesh, split_map: VertexSplitMap, normals: Vec<Vec3>) {
        debug_assert_eq!(mesh.num_vertices(), split_map.len());
        debug_assert_eq!(mesh.num_vertices(), normals.len());
        self.mesh = Some(mesh);
        self.split_map = split_map;
        self.normals = normals;
    }

    /* ============== */
    /*  Active loops  */
    /* ============== */

    /// Traces `edges` into loops, replacing the active loops. Nothing changes
    /// if any edge is out of range.
    pub fn set_active_edges(&mut self, edges: &[EdgeId]) -> MeshResult<()> {
        let loops = trace_edge_loops(self.mesh()?, edges)?;
        self.replace_loops(loops);
        Ok(())
    }

    pub(crate) fn replace_loops(&mut self, loops: Vec<EdgeLoop>) {
        self.loops.clear();
        for edge_loop in loops {
            self.loops.insert(edge_loop);
        }
    }

    pub fn active_loops(&self) -> impl Iterator<Item = (LoopId, &EdgeLoop)> + '_ {
        self.loops.iter()
    }

    pub fn active_loop(&self, id: LoopId) -> Option<&EdgeLoop> {
        self.loops.get(id)
    }

    pub fn loop_ids(&self) -> Vec<LoopId> {
        self.loops.keys().collect()
    }

    pub fn num_active_loops(&self) -> usize {
        self.loops.len()
    }

    pub(crate) fn loops_mut(&mut self) -> &mut DenseSlotMap<LoopId, EdgeLoop> {
        &mut self.loops
    }

    /// Every edge of every active loop, in loop order
    pub fn active_edges(&self) -> Vec<EdgeId> {
        self.loops.values().flat_map(|l| l.edges()).collect()
    }

    /* ========= */
    /*  Queries  */
    /* ========= */

    /// The distinct vertices touched by `edges`, sorted
    pub fn edge_vertices(&self, edges: &[EdgeId]) -> MeshResult<Vec<VertexId>> {
        let mesh = self.mesh()?;
        let mut vertices = BTreeSet::new();
        for &e in edges {
            let (a, b) = mesh.edge_vertices(e)?;
            vertices.insert(a);
            vertices.insert(b);
        }
        Ok(vertices.into_iter().collect())
    }

    pub fn edge_vector(&self, edge: EdgeId, from: VertexId) -> MeshResult<Vec3> {
        self.mesh()?.edge_vector(edge, from)
    }

    pub fn boundary_edges(&self) -> MeshResult<Vec<EdgeId>> {
        self.mesh()?.boundary_edges()
    }

    pub fn group_connected_components(
        &self,
        selection: &ComponentSelection,
    ) -> MeshResult<Vec<ComponentSelection>> {
        group_connected_components(self.mesh()?, selection)
    }

    /* ======= */
    /*  Edits  */
    /* ======= */

    /// Splits the mesh along `edges`. Duplicated vertices inherit the origin
    /// and overlay normal of the vertex they were split from.
    ///
    /// Active loops are carried over to the split mesh. Both copies of a
    /// detached edge stay active, so a loop along the cut becomes one loop on
    /// each side.
    pub fn detach_edges(&mut self, edges: &[EdgeId]) -> MeshResult<()> {
        let mesh = self.mesh()?;
        let num_old = mesh.num_vertices();
        let cut: BTreeSet<EdgeId> = edges.iter().copied().collect();
        let detached = detach(mesh, &cut)?;

        let mut split_map = self.split_map.clone();
        split_map.extend_from_parents(&detached.parents);
        for (&v, &valence) in &detached.seam_valence {
            split_map.set_seam_valence(v, valence);
        }

        let mut normals = self.normals.clone();
        normals.extend(detached.parents.iter().map(|&p| self.overlay_normal(p)));

        let active_pairs = self
            .active_edges()
            .into_iter()
            .map(|e| mesh.edge_vertices(e).map(|(a, b)| sorted_pair(a, b)))
            .collect::<MeshResult<BTreeSet<_>>>()?;
        let loops = if active_pairs.is_empty() {
            vec![]
        } else {
            let mut selected = vec![];
            for e in (0..detached.mesh.num_edges()).map(EdgeId::from) {
                let (a, b) = detached.mesh.edge_vertices(e)?;
                let parents = sorted_pair(detached.parent(a, num_old), detached.parent(b, num_old));
                if active_pairs.contains(&parents) {
                    selected.push(e);
                }
            }
            trace_edge_loops(&detached.mesh, &selected)?
        };

        self.commit(detached.mesh, split_map, normals);
        self.replace_loops(loops);
        Ok(())
    }

    /// Sweeps each edge against the overlay normals of its vertices, adding
    /// `divisions + 1` rows of quads. The first row hangs from the edge
    /// itself, and each further row from the new vertices of the previous
    /// one. Every new quad gets the unit square as UVs.
    ///
    /// Only boundary edges can be extruded; anything else would leave the
    /// mesh non-manifold and fails.
    #[profiling::function]
    pub fn extrude_edges(&mut self, edges: &[EdgeId], options: &ExtrudeOptions) -> MeshResult<()> {
        let mesh = self.mesh()?;
        let edges = edges.iter().copied().unique().collect_vec();
        let mut endpoints = Vec::with_capacity(edges.len());
        for &e in &edges {
            endpoints.push(mesh.edge_vertices(e)?);
        }
        let distinct = endpoints
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect_vec();

        let num_old = mesh.num_vertices();
        let segments = options.divisions as usize + 1;
        let mut points = mesh.points().to_vec();
        let mut normals = self.normals.clone();
        let mut split_map = self.split_map.clone();

        for d in 0..segments {
            let depth = (d + 1) as f32 * options.thickness / segments as f32;
            for &v in &distinct {
                let normal = self.overlay_normal(v);
                points.push(points[v.idx()] - depth * normal);
                normals.push(normal);
                split_map.push(SplitRecord::default());
            }
        }

        // The vertex of row `d` swept from `v`
        let swept = |d: usize, v: VertexId| -> MeshResult<VertexId> {
            match distinct.binary_search(&v) {
                Ok(i) => Ok(VertexId::from(num_old + d * distinct.len() + i)),
                Err(_) => bail_failure!("Vertex {v} is not part of the extrusion"),
            }
        };
        let base = |d: usize, v: VertexId| -> MeshResult<VertexId> {
            if d == 0 {
                Ok(v)
            } else {
                swept(d - 1, v)
            }
        };

        let mut polygons = mesh.polygons().to_vec();
        let mut uvs = mesh.uvs().clone();
        for &(v0, v1) in &endpoints {
            for d in 0..segments {
                let quad = [base(d, v1)?, base(d, v0)?, swept(d, v0)?, swept(d, v1)?];
                polygons.push(quad.into_iter().collect());
                uvs.add_polygon(UNIT_SQUARE_UVS);
            }
        }

        let extruded = mesh
            .with_topology(points, polygons, uvs)
            .map_err(|err| MeshError::failure(format!("Extrusion gives an invalid mesh: {err}")))?;

        log::debug!(
            "Extruded {} edges into {} quads",
            edges.len(),
            edges.len() * segments
        );
        self.commit(extruded, split_map, normals);
        Ok(())
    }

    /// Moves each of `vertices` by `distance` along its overlay normal.
    /// Repeated ids only move once.
    pub fn pull_vertices(&mut self, vertices: &[VertexId], distance: f32) -> MeshResult<()> {
        let mesh = self.mesh()?;
        for &v in vertices {
            mesh.check_vertex(v)?;
        }
        let distinct: BTreeSet<VertexId> = vertices.iter().copied().collect();
        let offsets = distinct
            .iter()
            .map(|&v| (v, distance * self.overlay_normal(v)))
            .collect_vec();

        let mesh = self.mesh_mut()?;
        for (v, offset) in offsets {
            let p = mesh.point(v)?;
            mesh.set_point(v, p + offset)?;
        }
        Ok(())
    }

    /// Copies positions and smooth normals from `source` into every vertex
    /// that has an origin. Vertices created from scratch are left alone.
    pub fn update_mesh(&mut self, source: &PolyMesh) -> MeshResult<()> {
        let mesh = self.mesh()?;
        let source_normals = source.vertex_normals()?;
        let mut updated = mesh.clone();
        let mut normals = self.normals.clone();

        for v in (0..mesh.num_vertices()).map(VertexId::from) {
            let origin = match self.split_map.origin(v) {
                Some(origin) => origin,
                None => continue,
            };
            if origin.idx() >= source.num_vertices() {
                bail_failure!(
                    "Vertex {v} comes from {origin}, but the source mesh has {} vertices",
                    source.num_vertices()
                )
            }
            updated.set_point(v, source.points()[origin.idx()])?;
            normals[v.idx()] = source_normals[origin.idx()];
        }

        let split_map = self.split_map.clone();
        self.commit(updated, split_map, normals);
        Ok(())
    }

    /// Subdivides the mesh and re-threads the active loops onto the new
    /// edges. Each loop edge is replaced by the edges it was split into,
    /// keeping loop order and orientation.
    #[profiling::function]
    pub fn smooth_mesh(&mut self, options: &SmoothOptions) -> MeshResult<()> {
        if options.divisions == 0 {
            return Ok(());
        }
        let mesh = self.mesh()?;
        let num_old = mesh.num_vertices();

        let mut paths = vec![];
        for (id, edge_loop) in self.loops.iter() {
            let pairs = (0..edge_loop.len())
                .map(|i| edge_loop.edge_vertices(i, mesh))
                .collect::<MeshResult<Vec<_>>>()?;
            paths.push((id, pairs));
        }

        let compact = CompactMesh::from_poly_mesh(mesh)?;
        refine_paths(&mut paths, &compact.edge_point_lookup())?;
        let mut subdivided = compact.subdivide(options.catmull_clark);
        for _ in 1..options.divisions {
            refine_paths(&mut paths, &subdivided.edge_point_lookup())?;
            subdivided = subdivided.subdivide(options.catmull_clark);
        }
        let smooth = subdivided.to_poly_mesh()?;

        let mut loops = vec![];
        for (id, pairs) in paths {
            let mut edge_loop = EdgeLoop::new();
            for (a, b) in pairs {
                let e = match smooth.find_edge(a, b) {
                    Some(e) => e,
                    None => bail_failure!("Loop {id:?} has no edge between {a} and {b} after smoothing"),
                };
                let (src, _) = smooth.edge_vertices(e)?;
                edge_loop.push_back(e, src != a);
            }
            loops.push((id, edge_loop));
        }

        let mut split_map = self.split_map.clone();
        split_map.truncate(num_old);
        let host_normals = smooth.vertex_normals()?;
        let mut normals = self.normals.clone();
        normals.truncate(num_old);
        for v in num_old..smooth.num_vertices() {
            split_map.push(SplitRecord::default());
            normals.push(host_normals[v]);
        }

        log::debug!(
            "Smoothed mesh to {} vertices and {} faces",
            smooth.num_vertices(),
            smooth.num_faces()
        );
        self.commit(smooth, split_map, normals);
        for (id, edge_loop) in loops {
            if let Some(l) = self.loops.get_mut(id) {
                *l = edge_loop;
            }
        }
        Ok(())
    }
}

fn sorted_pair(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Replaces each oriented vertex pair by the two halves a subdivision step
/// splits it into.
fn refine_paths(
    paths: &mut [(LoopId, Vec<(VertexId, VertexId)>)],
    edge_points: &HashMap<(VertexId, VertexId), VertexId>,
) -> MeshResult<()> {
    for (_, pairs) in paths.iter_mut() {
        let mut refined = Vec::with_capacity(pairs.len() * 2);
        for &(a, b) in pairs.iter() {
            let mid = match edge_points.get(&(a, b)) {
                Some(&mid) => mid,
                None => bail_failure!("No edge between {a} and {b} to subdivide"),
            };
            refined.push((a, mid));
            refined.push((mid, b));
        }
        *pairs = refined;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::primitives::{Cylinder, Grid};

    fn edges_between(mesh: &PolyMesh, vertices: &[u32]) -> Vec<EdgeId> {
        vertices
            .iter()
            .tuple_windows()
            .map(|(&a, &b)| mesh.find_edge(VertexId(a), VertexId(b)).unwrap())
            .collect()
    }

    fn assert_is_path(model: &MeshTopologyModel, edge_loop: &EdgeLoop) {
        for i in 1..edge_loop.len() {
            let (_, dst) = edge_loop.edge_vertices(i - 1, model).unwrap();
            let (src, _) = edge_loop.edge_vertices(i, model).unwrap();
            assert_eq!(dst, src);
        }
    }

    #[test]
    pub fn unbound_model_fails() {
        let mut model = MeshTopologyModel::default();
        assert!(model.mesh().unwrap_err().is_failure());
        assert!(model.set_active_edges(&[EdgeId(0)]).unwrap_err().is_failure());
        assert!(model.detach_edges(&[]).unwrap_err().is_failure());
        assert!(model.set_normals(vec![]).unwrap_err().is_failure());
        assert!(model
            .smooth_mesh(&SmoothOptions::default())
            .unwrap_err()
            .is_failure());

        // Loop queries go through the model, so they fail the same way
        let mut edge_loop = EdgeLoop::new();
        assert!(edge_loop.add(EdgeId(0), &model).unwrap_err().is_failure());
        edge_loop.push_back(EdgeId(0), false);
        assert!(edge_loop.vertices(&model).unwrap_err().is_failure());
        assert!(edge_loop.length(&model).unwrap_err().is_failure());
    }

    #[test]
    pub fn active_edges() {
        // 0 - 1 - 2 - 3
        // |   |   |   |
        // 4 - 5 - 6 - 7
        // |   |   |   |
        // 8 - 9 - 10- 11
        let mesh = Grid::build(3, 2, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let row = edges_between(&mesh, &[4, 5, 6, 7]);
        model.set_active_edges(&row).unwrap();
        assert_eq!(model.num_active_loops(), 1);
        let mut active = model.active_edges();
        active.sort();
        let mut expected = row.clone();
        expected.sort();
        assert_eq!(active, expected);

        // A bad id leaves the loops untouched
        let err = model.set_active_edges(&[EdgeId(17)]).unwrap_err();
        assert!(err.is_invalid_parameter());
        assert_eq!(model.num_active_loops(), 1);

        model.set_active_edges(&[]).unwrap();
        assert_eq!(model.num_active_loops(), 0);

        assert_eq!(
            model.edge_vertices(&row).unwrap(),
            [4, 5, 6, 7].map(VertexId).to_vec()
        );
        assert_eq!(model.boundary_edges().unwrap().len(), 10);
    }

    #[test]
    pub fn normals_must_match_vertices() {
        let mesh = Grid::build(1, 1, 1.0).unwrap();
        let mut model = MeshTopologyModel::new(mesh).unwrap();
        assert_eq!(model.normals().len(), 4);
        assert!(model
            .set_normals(vec![Vec3::X; 3])
            .unwrap_err()
            .is_invalid_parameter());
        model.set_normals(vec![Vec3::X; 4]).unwrap();
        assert_eq!(model.normals()[2], Vec3::X);
    }

    #[test]
    pub fn detach_ring_keeps_both_sides_active() {
        let mesh = Cylinder::build(8, 2, 1.0, 2.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let ring = edges_between(&mesh, &(8..16).chain([8]).collect_vec());
        model.set_active_edges(&ring).unwrap();
        model.detach_edges(&model.active_edges()).unwrap();

        let split = model.mesh().unwrap();
        assert_eq!(split.num_vertices(), 32);
        assert_eq!(split.num_edges(), 48);
        assert_eq!(model.normals().len(), 32);

        let map = model.vertex_split_map();
        for v in 24..32 {
            assert_eq!(map.origin(VertexId(v)), Some(VertexId(v - 16)));
            assert_eq!(map.seam_valence(VertexId(v)), 2);
            assert_eq!(model.normals()[v as usize], model.normals()[v as usize - 16]);
        }

        assert_eq!(model.num_active_loops(), 2);
        for (_, edge_loop) in model.active_loops() {
            assert_eq!(edge_loop.len(), 8);
            assert!(edge_loop.is_closed(&model).unwrap());
        }
    }

    #[test]
    pub fn single_interior_edge_detach_keeps_vertex_count() {
        let mesh = Grid::build(3, 2, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        model
            .detach_edges(&edges_between(&mesh, &[5, 6]))
            .unwrap();
        assert_eq!(model.mesh().unwrap().num_vertices(), 12);
    }

    #[test]
    pub fn extrude_without_divisions() {
        // 0 - 1 - 2 - 3
        // |   |   |   |
        // 4 - 5 - 6 - 7
        let mesh = Grid::build(3, 1, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let edges = edges_between(&mesh, &[0, 1, 2, 3]);
        let options = ExtrudeOptions {
            thickness: 0.5,
            divisions: 0,
        };
        model.extrude_edges(&edges, &options).unwrap();

        let extruded = model.mesh().unwrap();
        assert_eq!(extruded.num_faces(), 3 + 3);
        // One row of swept vertices per segment: the edge itself is the
        // first side of each quad, so a single row doubles the seam vertices.
        assert_eq!(extruded.num_vertices(), 8 + 4);
        for v in 8..12 {
            let p = extruded.points()[v];
            assert!((p.y + 0.5).abs() < 1e-6);
            assert_eq!(model.vertex_split_map().origin(VertexId(v as u32)), None);
        }
        for f in 3..6 {
            let uvs = extruded.uvs().corner_uvs(FaceId(f)).unwrap();
            assert_eq!(uvs.as_slice(), &[Vec2::ZERO, Vec2::Y, Vec2::ONE, Vec2::X]);
        }
        // Existing edges keep their ids
        assert_eq!(extruded.edge_vertices(edges[0]).unwrap(), mesh.edge_vertices(edges[0]).unwrap());
    }

    #[test]
    pub fn extrude_with_divisions() {
        let mesh = Grid::build(1, 1, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let edge = edges_between(&mesh, &[0, 1]);
        let options = ExtrudeOptions {
            thickness: 1.0,
            divisions: 2,
        };
        model.extrude_edges(&edge, &options).unwrap();

        let extruded = model.mesh().unwrap();
        assert_eq!(extruded.num_faces(), 1 + 3);
        assert_eq!(extruded.num_vertices(), 4 + 6);
        let depths = (4..10).map(|v| extruded.points()[v].y).collect_vec();
        for (depth, expected) in depths.iter().zip([1.0, 1.0, 2.0, 2.0, 3.0, 3.0]) {
            assert!((depth + expected / 3.0).abs() < 1e-6);
        }
        assert!(extruded.boundary_edges().unwrap().len() > 4);
    }

    #[test]
    pub fn extruding_interior_edges_fails() {
        let mesh = Grid::build(3, 2, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let err = model
            .extrude_edges(&edges_between(&mesh, &[5, 6]), &ExtrudeOptions::default())
            .unwrap_err();
        assert!(err.is_failure());
        assert!(model.mesh().unwrap().is_equivalent(&mesh));
    }

    #[test]
    pub fn pull_vertices_moves_along_normals() {
        let mesh = Grid::build(1, 1, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        model
            .pull_vertices(&[VertexId(0), VertexId(0), VertexId(3)], 2.0)
            .unwrap();
        let pulled = model.mesh().unwrap();
        assert!(pulled.points()[0].abs_diff_eq(mesh.points()[0] + 2.0 * Vec3::Y, 1e-6));
        assert!(pulled.points()[3].abs_diff_eq(mesh.points()[3] + 2.0 * Vec3::Y, 1e-6));
        assert_eq!(pulled.points()[1], mesh.points()[1]);

        let err = model.pull_vertices(&[VertexId(1), VertexId(4)], 1.0).unwrap_err();
        assert!(err.is_invalid_parameter());
        assert_eq!(model.mesh().unwrap().points()[1], mesh.points()[1]);
    }

    #[test]
    pub fn update_follows_the_source() {
        let mesh = Cylinder::build(8, 2, 1.0, 2.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let ring = edges_between(&mesh, &(8..16).chain([8]).collect_vec());
        model.detach_edges(&ring).unwrap();

        let lifted = PolyMesh::new(
            mesh.points().iter().map(|p| *p + Vec3::Y).collect(),
            mesh.polygons().to_vec(),
            None,
        )
        .unwrap();
        model.update_mesh(&lifted).unwrap();
        let updated = model.mesh().unwrap();
        for v in 0..32u32 {
            let origin = model.vertex_split_map().origin(VertexId(v)).unwrap();
            assert_eq!(updated.points()[v as usize], lifted.points()[origin.idx()]);
        }

        let small = Grid::build(1, 1, 1.0).unwrap();
        assert!(model.update_mesh(&small).unwrap_err().is_failure());
    }

    #[test]
    pub fn smoothing_rethreads_loops() {
        let mesh = Grid::build(3, 2, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        model
            .set_active_edges(&edges_between(&mesh, &[4, 5, 6, 7]))
            .unwrap();

        model
            .smooth_mesh(&SmoothOptions {
                divisions: 0,
                catmull_clark: true,
            })
            .unwrap();
        assert!(model.mesh().unwrap().is_equivalent(&mesh));

        model
            .smooth_mesh(&SmoothOptions {
                divisions: 2,
                catmull_clark: true,
            })
            .unwrap();
        let smooth = model.mesh().unwrap();
        assert_eq!(smooth.num_faces(), 6 * 16);
        assert_eq!(model.normals().len(), smooth.num_vertices());
        assert_eq!(model.vertex_split_map().len(), smooth.num_vertices());
        assert_eq!(model.vertex_split_map().origin(VertexId(5)), Some(VertexId(5)));
        assert_eq!(model.vertex_split_map().origin(VertexId(12)), None);

        let (_, edge_loop) = model.active_loops().next().unwrap();
        assert_eq!(edge_loop.len(), 12);
        assert_is_path(&model, edge_loop);
        let (a, b) = edge_loop.end_vertices(&model).unwrap();
        let mut ends = [a, b];
        ends.sort();
        assert_eq!(ends, [VertexId(4), VertexId(7)]);
    }
}
