// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::f32::consts::PI;

use crate::prelude::*;
use crate::seam::SeamMeshEditor;

/// Angle between the two faces of `e`, measured inside the surface. Flat
/// neighbourhoods give PI.
fn dihedral_angle(mesh: &PolyMesh, e: EdgeId) -> MeshResult<Option<f32>> {
    let faces = mesh.edge_faces(e)?;
    if faces.len() != 2 {
        return Ok(None);
    }
    let (a, b) = (mesh.face_normal(faces[0])?, mesh.face_normal(faces[1])?);
    Ok(Some(PI - a.dot(b).clamp(-1.0, 1.0).acos()))
}

impl<'a> SeamMeshEditor<'a> {
    /// Gives the corners around hard edges their own face-vertex normals.
    ///
    /// An edge of `edges` is hard when it has two faces meeting at an angle
    /// of at most `threshold` radians. Around each vertex, the hard edges
    /// split the faces into groups, and every corner in a group gets the
    /// normalized sum of the normals of the faces in the group. Vertices
    /// with no hard edge, or inner vertices with a single one, keep their
    /// smooth normal.
    #[profiling::function]
    pub fn set_hard_edges(&mut self, edges: &[EdgeId], threshold: f32) -> MeshResult<()> {
        let mesh = self.model.mesh()?;
        let mut hard = BTreeSet::new();
        for &e in edges {
            if let Some(angle) = dihedral_angle(mesh, e)? {
                if angle <= threshold {
                    hard.insert(e);
                }
            }
        }
        if hard.is_empty() {
            return Ok(());
        }

        let mut vertices = BTreeSet::new();
        for &e in &hard {
            let (a, b) = mesh.edge_vertices(e)?;
            vertices.insert(a);
            vertices.insert(b);
        }

        let mut corner_normals = vec![];
        for v in vertices {
            let fan = mesh.vertex_fan(v)?;
            let n = fan.valence();
            let is_hard = |slot: usize| hard.contains(&fan.edges[slot]);
            let num_hard = (0..n).filter(|&s| is_hard(s)).count();
            if num_hard == 0 || (num_hard == 1 && !fan.on_boundary) {
                continue;
            }
            let start = if fan.on_boundary {
                0
            } else {
                (0..n).find(|&s| is_hard(s)).unwrap_or(0)
            };

            let num_faces = fan.faces.len();
            let mut group: SVec<FaceId> = SVec::new();
            let mut flush = |group: &mut SVec<FaceId>| -> MeshResult<()> {
                let mut normal = Vec3::ZERO;
                for &f in group.iter() {
                    normal += mesh.face_normal(f)?;
                }
                let normal = normal.normalize_or_zero();
                corner_normals.extend(group.drain(..).map(|f| (f, v, normal)));
                Ok(())
            };
            for f in 0..num_faces {
                let slot = (start + f) % n;
                if f != 0 && is_hard(slot) {
                    flush(&mut group)?;
                }
                group.push(fan.faces[slot % num_faces]);
            }
            flush(&mut group)?;
        }

        log::debug!(
            "{} hard edges of {}, {} corner normals",
            hard.len(),
            edges.len(),
            corner_normals.len()
        );
        let mesh = self.model.mesh_mut()?;
        for (f, v, normal) in corner_normals {
            mesh.set_face_vertex_normal(f, v, normal)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::primitives::{Box, Grid};
    use crate::topology::MeshTopologyModel;

    fn cube() -> PolyMesh {
        Box::build(Vec3::ZERO, Vec3::ONE).unwrap()
    }

    fn all_edges(mesh: &PolyMesh) -> Vec<EdgeId> {
        (0..mesh.num_edges()).map(EdgeId::from).collect()
    }

    #[test]
    pub fn cube_corners_get_face_normals() {
        let mesh = cube();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        SeamMeshEditor::new(&mut model)
            .set_hard_edges(&all_edges(&mesh), PI / 2.0 + 0.01)
            .unwrap();

        let hard = model.mesh().unwrap();
        for f in (0..6).map(FaceId) {
            let expected = hard.face_normal(f).unwrap();
            for &v in hard.polygon(f).unwrap() {
                let normal = hard.face_vertex_normal(f, v).unwrap();
                assert!(normal.abs_diff_eq(expected, 1e-5));
            }
        }
    }

    #[test]
    pub fn soft_edges_are_left_alone() {
        let mesh = cube();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        SeamMeshEditor::new(&mut model)
            .set_hard_edges(&all_edges(&mesh), 1.0)
            .unwrap();
        let soft = model.mesh().unwrap();
        for f in (0..6).map(FaceId) {
            for &v in soft.polygon(f).unwrap() {
                assert_eq!(soft.face_vertex_normal(f, v), None);
            }
        }

        // Flat edges are never hard
        let grid = Grid::build(2, 2, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&grid).unwrap();
        SeamMeshEditor::new(&mut model)
            .set_hard_edges(&all_edges(&grid), PI / 2.0)
            .unwrap();
        assert!(model.mesh().unwrap().is_equivalent(&grid));
        assert_eq!(model.mesh().unwrap().face_vertex_normal(FaceId(0), VertexId(4)), None);
    }

    #[test]
    pub fn two_hard_edges_split_a_corner() {
        let mesh = cube();
        let e01 = mesh.find_edge(VertexId(0), VertexId(1)).unwrap();
        let e03 = mesh.find_edge(VertexId(0), VertexId(3)).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        SeamMeshEditor::new(&mut model)
            .set_hard_edges(&[e01, e03], PI / 2.0 + 0.01)
            .unwrap();

        let hard = model.mesh().unwrap();
        // Face 0 lies between the two hard edges, faces 2 and 4 on the other
        // side of both.
        let n0 = hard.face_vertex_normal(FaceId(0), VertexId(0)).unwrap();
        assert!(n0.abs_diff_eq(hard.face_normal(FaceId(0)).unwrap(), 1e-5));
        let n2 = hard.face_vertex_normal(FaceId(2), VertexId(0)).unwrap();
        let n4 = hard.face_vertex_normal(FaceId(4), VertexId(0)).unwrap();
        assert_eq!(n2, n4);
        let expected =
            (hard.face_normal(FaceId(2)).unwrap() + hard.face_normal(FaceId(4)).unwrap()).normalize();
        assert!(n2.abs_diff_eq(expected, 1e-5));

        // The other ends only touch one hard edge
        for f in (0..6).map(FaceId) {
            assert_eq!(hard.face_vertex_normal(f, VertexId(1)), None);
            assert_eq!(hard.face_vertex_normal(f, VertexId(3)), None);
        }
    }

    #[test]
    pub fn out_of_range_edges() {
        let mesh = cube();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let err = SeamMeshEditor::new(&mut model)
            .set_hard_edges(&[EdgeId(12)], 1.0)
            .unwrap_err();
        assert!(err.is_invalid_parameter());
    }
}
