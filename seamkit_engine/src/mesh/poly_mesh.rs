// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::bail_invalid;
use crate::prelude::*;

/// A single UV set. Each face either has one UV index per corner, or none at
/// all.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UvSet {
    pub uvs: Vec<Vec2>,
    pub face_uvs: Vec<SVec<u32>>,
}

impl UvSet {
    /// A UV set with `num_faces` unmapped faces
    pub fn unmapped(num_faces: usize) -> Self {
        Self {
            uvs: vec![],
            face_uvs: vec![SVec::new(); num_faces],
        }
    }

    /// Appends the given corner coordinates and maps a new face to them.
    pub fn add_polygon(&mut self, corners: impl IntoIterator<Item = Vec2>) {
        let start = self.uvs.len() as u32;
        self.uvs.extend(corners);
        let end = self.uvs.len() as u32;
        self.face_uvs.push((start..end).collect());
    }

    /// Adds a face without UVs
    pub fn add_unmapped(&mut self) {
        self.face_uvs.push(SVec::new());
    }

    pub fn is_mapped(&self, face: FaceId) -> bool {
        self.face_uvs
            .get(face.idx())
            .map(|f| !f.is_empty())
            .unwrap_or(false)
    }

    /// The uv coordinate at each corner of `face`, if it is mapped
    pub fn corner_uvs(&self, face: FaceId) -> Option<SVec<Vec2>> {
        let indices = self.face_uvs.get(face.idx())?;
        if indices.is_empty() {
            return None;
        }
        indices
            .iter()
            .map(|&i| self.uvs.get(i as usize).copied())
            .collect()
    }

    fn validate(&self, polygons: &[SVec<VertexId>]) -> MeshResult<()> {
        if self.face_uvs.len() != polygons.len() {
            bail_invalid!(
                "UV set describes {} faces, but the mesh has {}",
                self.face_uvs.len(),
                polygons.len()
            )
        }
        for (f, (indices, polygon)) in self.face_uvs.iter().zip(polygons).enumerate() {
            if !indices.is_empty() && indices.len() != polygon.len() {
                bail_invalid!("Face {f} has {} UVs for {} corners", indices.len(), polygon.len())
            }
            if let Some(&i) = indices.iter().find(|&&i| i as usize >= self.uvs.len()) {
                bail_invalid!("Face {f} references UV {i}, but there are only {}", self.uvs.len())
            }
        }
        Ok(())
    }
}

/// The polygon mesh everything else operates on. Topology is immutable:
/// edits produce a new mesh through [`PolyMesh::with_topology`], which only
/// replaces the current one after the new connectivity validated.
#[derive(Clone, Debug)]
pub struct PolyMesh {
    points: Vec<Vec3>,
    polygons: Vec<SVec<VertexId>>,
    uvs: UvSet,
    face_vertex_normals: BTreeMap<(FaceId, VertexId), Vec3>,
    conn: MeshConnectivity,
}

impl PolyMesh {
    pub fn new(
        points: Vec<Vec3>,
        polygons: Vec<SVec<VertexId>>,
        uvs: Option<UvSet>,
    ) -> MeshResult<Self> {
        let uvs = uvs.unwrap_or_else(|| UvSet::unmapped(polygons.len()));
        uvs.validate(&polygons)?;
        let conn = MeshConnectivity::build(points.len(), &polygons)?;
        Ok(PolyMesh {
            points,
            polygons,
            uvs,
            face_vertex_normals: BTreeMap::new(),
            conn,
        })
    }

    /// Builds a mesh from a list of positions and a list of polygons indexing
    /// into it, with no UVs.
    pub fn from_polygons<Index, Polygon>(positions: &[Vec3], polygons: &[Polygon]) -> MeshResult<Self>
    where
        Index: num_traits::AsPrimitive<usize> + 'static + Copy,
        Polygon: AsRef<[Index]>,
    {
        let polygons = polygons
            .iter()
            .map(|p| {
                p.as_ref()
                    .iter()
                    .map(|i| VertexId::from(i.as_()))
                    .collect_svec()
            })
            .collect();
        Self::new(positions.to_vec(), polygons, None)
    }

    /// Returns a new mesh with the given topology. Face-vertex normals whose
    /// face still has the same vertex at one of its corners are carried over.
    pub fn with_topology(
        &self,
        points: Vec<Vec3>,
        polygons: Vec<SVec<VertexId>>,
        uvs: UvSet,
    ) -> MeshResult<Self> {
        let mut mesh = Self::new(points, polygons, Some(uvs))?;
        mesh.face_vertex_normals = self
            .face_vertex_normals
            .iter()
            .filter(|((f, v), _)| {
                mesh.polygons
                    .get(f.idx())
                    .map(|p| p.contains(v))
                    .unwrap_or(false)
            })
            .map(|(k, n)| (*k, *n))
            .collect();
        Ok(mesh)
    }

    pub fn num_vertices(&self) -> usize {
        self.points.len()
    }

    pub fn num_edges(&self) -> usize {
        self.conn.num_edges()
    }

    pub fn num_faces(&self) -> usize {
        self.polygons.len()
    }

    pub fn connectivity(&self) -> &MeshConnectivity {
        &self.conn
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn polygons(&self) -> &[SVec<VertexId>] {
        &self.polygons
    }

    pub fn uvs(&self) -> &UvSet {
        &self.uvs
    }

    pub fn check_vertex(&self, v: VertexId) -> MeshResult<()> {
        if v.idx() >= self.num_vertices() {
            bail_invalid!("Vertex {v} out of range ({} vertices)", self.num_vertices())
        }
        Ok(())
    }

    pub fn check_edge(&self, e: EdgeId) -> MeshResult<()> {
        if e.idx() >= self.num_edges() {
            bail_invalid!("Edge {e} out of range ({} edges)", self.num_edges())
        }
        Ok(())
    }

    pub fn check_face(&self, f: FaceId) -> MeshResult<()> {
        if f.idx() >= self.num_faces() {
            bail_invalid!("Face {f} out of range ({} faces)", self.num_faces())
        }
        Ok(())
    }

    pub fn point(&self, v: VertexId) -> MeshResult<Vec3> {
        self.check_vertex(v)?;
        Ok(self.points[v.idx()])
    }

    pub fn set_point(&mut self, v: VertexId, position: Vec3) -> MeshResult<()> {
        self.check_vertex(v)?;
        self.points[v.idx()] = position;
        Ok(())
    }

    pub fn polygon(&self, f: FaceId) -> MeshResult<&[VertexId]> {
        self.check_face(f)?;
        Ok(&self.polygons[f.idx()])
    }

    /// The two vertices of `e`, in the edge's natural orientation
    pub fn edge_vertices(&self, e: EdgeId) -> MeshResult<(VertexId, VertexId)> {
        self.check_edge(e)?;
        Ok(self.conn.edge_endpoints(e)?)
    }

    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        if a.idx() >= self.num_vertices() || b.idx() >= self.num_vertices() {
            return None;
        }
        self.conn.find_edge(a, b)
    }

    pub fn edge_length(&self, e: EdgeId) -> MeshResult<f32> {
        let (a, b) = self.edge_vertices(e)?;
        Ok(self.points[a.idx()].distance(self.points[b.idx()]))
    }

    /// The vector along `e` pointing away from `from`.
    pub fn edge_vector(&self, e: EdgeId, from: VertexId) -> MeshResult<Vec3> {
        let (a, b) = self.edge_vertices(e)?;
        let (src, dst) = if from == a {
            (a, b)
        } else if from == b {
            (b, a)
        } else {
            bail_invalid!("Vertex {from} is not an endpoint of {e}")
        };
        Ok(self.points[dst.idx()] - self.points[src.idx()])
    }

    /// The faces on each side of `e`. Boundary edges have a single face.
    pub fn edge_faces(&self, e: EdgeId) -> MeshResult<SVec<FaceId>> {
        self.check_edge(e)?;
        Ok(self.conn.edge_faces(e)?)
    }

    pub fn vertex_fan(&self, v: VertexId) -> MeshResult<VertexFan> {
        self.check_vertex(v)?;
        Ok(self.conn.vertex_fan(v)?)
    }

    /// The vertices joined to `v` by an edge, in fan order.
    pub fn connected_vertices(&self, v: VertexId) -> MeshResult<SVec<VertexId>> {
        let fan = self.vertex_fan(v)?;
        Ok(fan
            .halfedges
            .iter()
            .map(|&h| self.conn.at_halfedge(h).dst_vertex().try_end())
            .collect::<Result<SVec<_>, _>>()?)
    }

    /// The faces sharing an edge with `f`.
    pub fn face_neighbours(&self, f: FaceId) -> MeshResult<SVec<FaceId>> {
        self.check_face(f)?;
        let mut neighbours = SVec::new();
        for h in self.conn.face_halfedges(f)? {
            if let Some(other) = self.conn.at_halfedge(h).twin().face().try_end().ok() {
                if !neighbours.contains(&other) {
                    neighbours.push(other);
                }
            }
        }
        Ok(neighbours)
    }

    pub fn is_boundary_vertex(&self, v: VertexId) -> MeshResult<bool> {
        self.check_vertex(v)?;
        Ok(self.conn.is_boundary_vertex(v)?)
    }

    pub fn is_boundary_edge(&self, e: EdgeId) -> MeshResult<bool> {
        self.check_edge(e)?;
        Ok(self.conn.is_boundary_edge(e)?)
    }

    pub fn boundary_edges(&self) -> MeshResult<Vec<EdgeId>> {
        let mut edges = vec![];
        for e in (0..self.num_edges()).map(EdgeId::from) {
            if self.conn.is_boundary_edge(e)? {
                edges.push(e);
            }
        }
        Ok(edges)
    }

    /// Flat normal of a face, or zero for degenerate faces.
    pub fn face_normal(&self, f: FaceId) -> MeshResult<Vec3> {
        let verts = self.polygon(f)?;
        let p = |i: usize| self.points[verts[i].idx()];
        let v01 = p(0) - p(1);
        let v12 = p(1) - p(2);
        Ok(v01.cross(v12).normalize_or_zero())
    }

    /// Smooth per-vertex normals, averaging the normals of adjacent faces.
    pub fn vertex_normals(&self) -> MeshResult<Vec<Vec3>> {
        let face_normals = (0..self.num_faces())
            .map(|f| self.face_normal(FaceId::from(f)))
            .collect::<MeshResult<Vec<_>>>()?;
        let mut normals = vec![Vec3::ZERO; self.num_vertices()];
        for (polygon, normal) in self.polygons.iter().zip(face_normals) {
            for v in polygon {
                normals[v.idx()] += normal;
            }
        }
        Ok(normals.into_iter().map(|n| n.normalize_or_zero()).collect())
    }

    pub fn face_vertex_normal(&self, f: FaceId, v: VertexId) -> Option<Vec3> {
        self.face_vertex_normals.get(&(f, v)).copied()
    }

    pub fn set_face_vertex_normal(&mut self, f: FaceId, v: VertexId, n: Vec3) -> MeshResult<()> {
        if !self.polygon(f)?.contains(&v) {
            bail_invalid!("Vertex {v} is not a corner of face {f}")
        }
        self.face_vertex_normals.insert((f, v), n);
        Ok(())
    }

    /// Appends all the meshes into a single one, offsetting indices. No
    /// connectivity is generated between them.
    pub fn combine(meshes: &[&PolyMesh]) -> MeshResult<PolyMesh> {
        if meshes.is_empty() {
            bail_invalid!("Cannot combine an empty list of meshes")
        }

        let mut points = vec![];
        let mut polygons = vec![];
        let mut uvs = UvSet::default();
        let mut face_vertex_normals = BTreeMap::new();

        for mesh in meshes {
            let v_offset = points.len() as u32;
            let f_offset = polygons.len() as u32;
            let uv_offset = uvs.uvs.len() as u32;

            points.extend_from_slice(&mesh.points);
            polygons.extend(
                mesh.polygons
                    .iter()
                    .map(|p| p.iter().map(|v| VertexId(v.0 + v_offset)).collect_svec()),
            );
            uvs.uvs.extend_from_slice(&mesh.uvs.uvs);
            uvs.face_uvs.extend(
                mesh.uvs
                    .face_uvs
                    .iter()
                    .map(|f| f.iter().map(|i| i + uv_offset).collect_svec()),
            );
            face_vertex_normals.extend(
                mesh.face_vertex_normals
                    .iter()
                    .map(|((f, v), n)| ((FaceId(f.0 + f_offset), VertexId(v.0 + v_offset)), *n)),
            );
        }

        let mut combined = PolyMesh::new(points, polygons, Some(uvs))?;
        combined.face_vertex_normals = face_vertex_normals;
        Ok(combined)
    }

    /// Whether both meshes have the same counts and polygon lists. Positions
    /// are not compared.
    pub fn is_equivalent(&self, other: &PolyMesh) -> bool {
        self.num_vertices() == other.num_vertices()
            && self.num_edges() == other.num_edges()
            && self.num_faces() == other.num_faces()
            && self.polygons.iter().flatten().eq(other.polygons.iter().flatten())
    }
}
