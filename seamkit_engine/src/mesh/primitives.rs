// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::f32::consts::PI;

use crate::prelude::*;

pub struct Box;

impl Box {
    pub fn build(center: Vec3, size: Vec3) -> MeshResult<PolyMesh> {
        let hsize = size * 0.5;

        let v1 = center + Vec3::new(-hsize.x, -hsize.y, -hsize.z);
        let v2 = center + Vec3::new(hsize.x, -hsize.y, -hsize.z);
        let v3 = center + Vec3::new(hsize.x, -hsize.y, hsize.z);
        let v4 = center + Vec3::new(-hsize.x, -hsize.y, hsize.z);

        let v5 = center + Vec3::new(-hsize.x, hsize.y, -hsize.z);
        let v6 = center + Vec3::new(-hsize.x, hsize.y, hsize.z);
        let v7 = center + Vec3::new(hsize.x, hsize.y, hsize.z);
        let v8 = center + Vec3::new(hsize.x, hsize.y, -hsize.z);

        PolyMesh::from_polygons(
            &[v1, v2, v3, v4, v5, v6, v7, v8],
            &[
                [0u32, 1, 2, 3],
                [4, 5, 6, 7],
                [4, 7, 1, 0],
                [3, 2, 6, 5],
                [5, 4, 0, 3],
                [6, 2, 1, 7],
            ],
        )
    }
}

/// A flat grid of `cols` x `rows` quads on the XZ plane, facing +Y, with
/// planar UVs. Vertex `(i, j)` has index `j * (cols + 1) + i`.
pub struct Grid;

impl Grid {
    pub fn build(cols: u32, rows: u32, spacing: f32) -> MeshResult<PolyMesh> {
        let idx = |i: u32, j: u32| j * (cols + 1) + i;

        let mut points = vec![];
        let mut uvs = UvSet::default();
        for j in 0..=rows {
            for i in 0..=cols {
                points.push(Vec3::new(i as f32, 0.0, j as f32) * spacing);
                uvs.uvs
                    .push(Vec2::new(i as f32 / cols as f32, j as f32 / rows as f32));
            }
        }

        let mut polygons = vec![];
        for j in 0..rows {
            for i in 0..cols {
                let quad = [idx(i, j), idx(i, j + 1), idx(i + 1, j + 1), idx(i + 1, j)];
                polygons.push(quad.iter().map(|&v| VertexId(v)).collect_svec());
                uvs.face_uvs.push(quad.iter().copied().collect_svec());
            }
        }

        PolyMesh::new(points, polygons, Some(uvs))
    }
}

/// An open tube around the Y axis with `segments` vertices per ring and
/// `rows` quad rows. Vertex `(s, r)` has index `r * segments + s`.
pub struct Cylinder;

impl Cylinder {
    pub fn build(segments: u32, rows: u32, radius: f32, height: f32) -> MeshResult<PolyMesh> {
        let idx = |s: u32, r: u32| r * segments + (s % segments);
        let angle_delta = 2.0 * PI / segments as f32;

        let points = (0..=rows)
            .flat_map(|r| {
                (0..segments).map(move |s| {
                    let theta = angle_delta * s as f32;
                    Vec3::new(
                        radius * theta.cos(),
                        height * r as f32 / rows as f32,
                        radius * theta.sin(),
                    )
                })
            })
            .collect_vec();

        let polygons = (0..rows)
            .flat_map(|r| {
                (0..segments).map(move |s| {
                    [idx(s, r), idx(s, r + 1), idx(s + 1, r + 1), idx(s + 1, r)]
                })
            })
            .collect_vec();

        PolyMesh::from_polygons(&points, &polygons)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn counts() {
        let cube = Box::build(Vec3::ZERO, Vec3::ONE).unwrap();
        assert_eq!(
            (cube.num_vertices(), cube.num_edges(), cube.num_faces()),
            (8, 12, 6)
        );
        assert!(cube.boundary_edges().unwrap().is_empty());

        let grid = Grid::build(3, 2, 1.0).unwrap();
        assert_eq!(
            (grid.num_vertices(), grid.num_edges(), grid.num_faces()),
            (12, 17, 6)
        );

        let tube = Cylinder::build(8, 2, 1.0, 2.0).unwrap();
        assert_eq!(
            (tube.num_vertices(), tube.num_edges(), tube.num_faces()),
            (24, 40, 16)
        );
        assert_eq!(tube.boundary_edges().unwrap().len(), 16);
    }

    #[test]
    pub fn cylinder_faces_outwards() {
        let tube = Cylinder::build(8, 1, 1.0, 1.0).unwrap();
        let n = tube.face_normal(FaceId(0)).unwrap();
        let center = tube
            .polygon(FaceId(0))
            .unwrap()
            .iter()
            .map(|&v| tube.point(v).unwrap())
            .fold(Vec3::ZERO, |a, b| a + b);
        assert!(n.dot(center * Vec3::new(1.0, 0.0, 1.0)) > 0.0);
    }
}
