// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::error::{bail_failure, bail_invalid};
use crate::prelude::*;
use crate::seam::SeamMeshEditor;
use crate::topology::{EdgeLoop, LoopId, SplitRecord, UNIT_SQUARE_UVS};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffsetOptions {
    /// Signed distance each seam vertex travels
    pub distance: f32,
    /// Whether to bridge the old and new seam positions with quads. When
    /// false, vertices are only moved.
    pub create_polygons: bool,
}

impl Default for OffsetOptions {
    fn default() -> Self {
        Self {
            distance: 0.1,
            create_polygons: true,
        }
    }
}

/// How the two ends of a loop meet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopEnds {
    Open,
    /// Closed through a vertex with more edges than the two loop edges. That
    /// vertex is offset like any other.
    Closed,
    /// Closed through a boundary corner. The corner needs one more quad.
    Crossed,
}

/// The normalized vector along `e` leaving `from`
fn direction(mesh: &PolyMesh, e: EdgeId, from: VertexId) -> MeshResult<Vec3> {
    Ok(mesh.edge_vector(e, from)?.normalize_or_zero())
}

/// Open loop ends slide along the boundary edge that is not part of the loop.
fn end_direction(
    mesh: &PolyMesh,
    fan: &VertexFan,
    v: VertexId,
    loop_edge: EdgeId,
) -> MeshResult<(Vec3, Option<EdgeId>)> {
    let n = fan.valence();
    match [fan.edges[0], fan.edges[n - 1]]
        .into_iter()
        .find(|&e| e != loop_edge)
    {
        Some(e) => Ok((direction(mesh, e, v)?, Some(e))),
        None => Ok((Vec3::ZERO, None)),
    }
}

/// Other loop vertices move along the average of their non boundary edges.
fn inner_direction(mesh: &PolyMesh, fan: &VertexFan, v: VertexId) -> MeshResult<Vec3> {
    let n = fan.valence();
    let mut dir = Vec3::ZERO;
    for &e in fan.edges.iter().take(n.saturating_sub(1)).skip(1) {
        dir += direction(mesh, e, v)?;
    }
    Ok(dir.normalize_or_zero())
}

impl<'a> SeamMeshEditor<'a> {
    /// Offsets every active loop, one after the other. If a loop fails, the
    /// loops offset before it stay offset.
    pub fn offset_edgeloops(&mut self, options: &OffsetOptions) -> MeshResult<()> {
        let ids = self.model.loop_ids();
        for (i, id) in ids.iter().enumerate() {
            if let Err(err) = self.offset_edgeloop(*id, options.distance, options.create_polygons) {
                log::warn!(
                    "Offset stopped at loop {} of {}, earlier loops were kept: {err}",
                    i + 1,
                    ids.len()
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// Moves the vertices of a seam loop by `distance`. Every vertex of the
    /// loop must be on the boundary. Ends of open loops slide along the
    /// boundary, the rest of the vertices move along the average of their
    /// inner edges.
    ///
    /// With `create_polygons`, each loop vertex leaves a duplicate behind at
    /// its old position, a quad per loop edge bridges the old and new seam,
    /// and the loop moves on to the duplicates, which now form the boundary.
    /// The edges joining the ends of an open loop to their duplicates are
    /// appended to other active loops ending there.
    #[profiling::function]
    pub fn offset_edgeloop(
        &mut self,
        id: LoopId,
        distance: f32,
        create_polygons: bool,
    ) -> MeshResult<()> {
        let edge_loop = match self.model.active_loop(id) {
            Some(edge_loop) => edge_loop.clone(),
            None => bail_invalid!("There is no active loop {id:?}"),
        };
        if edge_loop.is_empty() {
            return Ok(());
        }
        let mesh = self.model.mesh()?;
        let num_old = mesh.num_vertices();
        let len = edge_loop.len();

        // path[i] is the start of edge i, and path[len] the end of the last
        let mut path = Vec::with_capacity(len + 1);
        for i in 0..len {
            let (src, dst) = edge_loop.edge_vertices(i, mesh)?;
            if i == 0 {
                path.push(src);
            }
            path.push(dst);
        }
        let fans = path
            .iter()
            .map(|&v| mesh.vertex_fan(v))
            .collect::<MeshResult<Vec<_>>>()?;
        if let Some((v, _)) = path.iter().zip(&fans).find(|(_, fan)| !fan.on_boundary) {
            bail_failure!("Loop vertex {v} is not on the boundary")
        }

        let first_edge = edge_loop.edge(0)?.edge;
        let last_edge = edge_loop.edge(len - 1)?.edge;
        let ends = if !edge_loop.is_closed(mesh)? {
            LoopEnds::Open
        } else if fans[0].valence() == 2 {
            LoopEnds::Crossed
        } else {
            LoopEnds::Closed
        };

        // Offsets, per path position. Closed loops move their first vertex
        // once, for both ends.
        let mut offsets = vec![Vec3::ZERO; len + 1];
        let mut rungs = [None, None];
        match ends {
            LoopEnds::Open => {
                let (dir, rung) = end_direction(mesh, &fans[0], path[0], first_edge)?;
                offsets[0] = distance * dir;
                rungs[0] = rung;
                let (dir, rung) = end_direction(mesh, &fans[len], path[len], last_edge)?;
                offsets[len] = distance * dir;
                rungs[1] = rung;
            }
            LoopEnds::Closed => {
                offsets[0] = distance * inner_direction(mesh, &fans[0], path[0])?;
            }
            LoopEnds::Crossed => {
                offsets[0] = distance
                    * (direction(mesh, first_edge, path[0])?
                        + direction(mesh, last_edge, path[0])?);
            }
        }
        for i in 1..len {
            offsets[i] = distance * inner_direction(mesh, &fans[i], path[i])?;
        }

        let mut points = mesh.points().to_vec();
        let num_moved = if ends == LoopEnds::Open { len + 1 } else { len };
        for i in 0..num_moved {
            points[path[i].idx()] += offsets[i];
        }

        if !create_polygons {
            let mut moved = mesh.clone();
            for i in 0..num_moved {
                moved.set_point(path[i], points[path[i].idx()])?;
            }
            let split_map = self.model.vertex_split_map().clone();
            let normals = self.model.normals().to_vec();
            self.model.commit(moved, split_map, normals);
            return Ok(());
        }

        // Duplicates stay at the old seam position. The crossed corner gets
        // one duplicate per loop edge it touches, pulled along that edge, and
        // an extra one on the old corner.
        let old_points = mesh.points();
        let num_duplicates = if ends == LoopEnds::Closed { len } else { len + 1 };
        let duplicate = |i: usize| VertexId::from(num_old + i % num_duplicates);
        let mut normals = self.model.normals().to_vec();
        let mut split_map = self.model.vertex_split_map().clone();
        for (i, &v) in path.iter().enumerate().take(num_duplicates) {
            let mut p = old_points[v.idx()];
            if ends == LoopEnds::Crossed && i == 0 {
                p += distance * direction(mesh, first_edge, v)?;
            } else if ends == LoopEnds::Crossed && i == len {
                p += distance * direction(mesh, last_edge, v)?;
            }
            points.push(p);
            normals.push(normals[v.idx()]);
            split_map.push(SplitRecord {
                origin: split_map.origin(v),
                seam_valence: 0,
            });
        }

        let mut polygons = mesh.polygons().to_vec();
        let mut uvs = mesh.uvs().clone();
        for (i, loop_edge) in edge_loop.iter().enumerate() {
            let (a, b) = (path[i], path[i + 1]);
            let (na, nb) = (duplicate(i), duplicate(i + 1));
            let quad = if loop_edge.flipped {
                [b, nb, na, a]
            } else {
                [a, na, nb, b]
            };
            polygons.push(quad.into_iter().collect());
            uvs.add_polygon(UNIT_SQUARE_UVS);
        }

        let corner = if ends == LoopEnds::Crossed {
            let c = path[0];
            let extra = VertexId::from(points.len());
            points.push(old_points[c.idx()]);
            normals.push(normals[c.idx()]);
            split_map.push(SplitRecord {
                origin: split_map.origin(c),
                seam_valence: 0,
            });
            let quad = [duplicate(len), extra, duplicate(0), c];
            let quad = if edge_loop.is_flipped(0)? {
                [quad[3], quad[2], quad[1], quad[0]]
            } else {
                quad
            };
            polygons.push(quad.into_iter().collect());
            uvs.add_polygon(UNIT_SQUARE_UVS);
            Some(extra)
        } else {
            None
        };

        let offset_mesh = mesh
            .with_topology(points, polygons, uvs)
            .map_err(|err| MeshError::failure(format!("Offset gives an invalid mesh: {err}")))?;

        // The loop follows the duplicates, in the same direction as before.
        let oriented_edge = |a: VertexId, b: VertexId| -> MeshResult<(EdgeId, bool)> {
            match offset_mesh.find_edge(a, b) {
                Some(e) => {
                    let (src, _) = offset_mesh.edge_vertices(e)?;
                    Ok((e, src != a))
                }
                None => bail_failure!("No edge between {a} and {b} after the offset"),
            }
        };
        let mut new_loop = EdgeLoop::new();
        for i in 0..len {
            let (e, flipped) = oriented_edge(duplicate(i), duplicate(i + 1))?;
            new_loop.push_back(e, flipped);
        }
        if let Some(extra) = corner {
            let (e, flipped) = oriented_edge(extra, duplicate(0))?;
            new_loop.push_front(e, flipped);
            let (e, flipped) = oriented_edge(duplicate(len), extra)?;
            new_loop.push_back(e, flipped);
        }

        let mut updated_loops = vec![(id, new_loop)];
        for (end, boundary_edge) in [(0, rungs[0]), (len, rungs[1])] {
            let boundary_edge = match boundary_edge {
                Some(e) => e,
                None => continue,
            };
            let (rung, _) = oriented_edge(path[end], duplicate(end))?;
            for (other_id, other) in self.model.active_loops() {
                if other_id == id || !other.contains(boundary_edge) {
                    continue;
                }
                let mut other = match updated_loops.iter().find(|(i, _)| *i == other_id) {
                    Some((_, l)) => l.clone(),
                    None => other.clone(),
                };
                other.add(rung, &offset_mesh)?;
                updated_loops.retain(|(i, _)| *i != other_id);
                updated_loops.push((other_id, other));
            }
        }

        log::debug!(
            "Offset loop of {len} edges by {distance}, {} new vertices",
            offset_mesh.num_vertices() - num_old
        );
        self.model.commit(offset_mesh, split_map, normals);
        let loops = self.model.loops_mut();
        for (loop_id, edge_loop) in updated_loops {
            if let Some(l) = loops.get_mut(loop_id) {
                *l = edge_loop;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::primitives::{Cylinder, Grid};
    use crate::topology::MeshTopologyModel;

    fn edges_between(mesh: &PolyMesh, vertices: &[u32]) -> Vec<EdgeId> {
        vertices
            .iter()
            .tuple_windows()
            .map(|(&a, &b)| mesh.find_edge(VertexId(a), VertexId(b)).unwrap())
            .collect()
    }

    fn detached_cylinder() -> MeshTopologyModel {
        let mesh = Cylinder::build(8, 2, 1.0, 2.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let ring = edges_between(&mesh, &(8..16).chain([8]).collect_vec());
        model.set_active_edges(&ring).unwrap();
        model.detach_edges(&ring).unwrap();
        model
    }

    #[test]
    pub fn zero_offset_only_adds_bridges() {
        let mut model = detached_cylinder();
        let before = model.mesh().unwrap().clone();
        assert_eq!(model.num_active_loops(), 2);

        SeamMeshEditor::new(&mut model)
            .offset_edgeloops(&OffsetOptions {
                distance: 0.0,
                create_polygons: true,
            })
            .unwrap();

        let after = model.mesh().unwrap();
        assert_eq!(after.num_faces(), before.num_faces() + 16);
        assert_eq!(after.num_vertices(), before.num_vertices() + 16);
        for (p, q) in before.points().iter().zip(after.points()) {
            assert!(p.abs_diff_eq(*q, 1e-6));
        }
        assert_eq!(model.normals().len(), after.num_vertices());
        assert_eq!(model.vertex_split_map().len(), after.num_vertices());

        for (_, edge_loop) in model.active_loops() {
            assert_eq!(edge_loop.len(), 8);
            assert!(edge_loop.is_closed(&model).unwrap());
            for v in edge_loop.vertices(&model).unwrap() {
                assert!(v.idx() >= before.num_vertices());
                assert!(after.is_boundary_vertex(v).unwrap());
            }
        }
    }

    #[test]
    pub fn closed_loops_move_along_inner_edges() {
        let mut model = detached_cylinder();
        let before = model.mesh().unwrap().clone();
        SeamMeshEditor::new(&mut model)
            .offset_edgeloops(&OffsetOptions {
                distance: 0.25,
                create_polygons: false,
            })
            .unwrap();
        let after = model.mesh().unwrap();
        assert!(after.is_equivalent(&before));
        // The ring sat at y = 1. Each side moves away from it, into its own
        // row of faces.
        for v in 8..16 {
            let (a, b) = (after.points()[v].y, after.points()[v + 16].y);
            let (low, high) = if a < b { (a, b) } else { (b, a) };
            assert!((low - 0.75).abs() < 1e-5);
            assert!((high - 1.25).abs() < 1e-5);
        }
    }

    #[test]
    pub fn open_loop_offset() {
        // 0 - 1 - 2 - 3
        // |   |   |   |
        // 4 - 5 - 6 - 7
        let mesh = Grid::build(3, 1, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        model
            .set_active_edges(&edges_between(&mesh, &[0, 1, 2, 3]))
            .unwrap();
        SeamMeshEditor::new(&mut model)
            .offset_edgeloops(&OffsetOptions {
                distance: 0.5,
                create_polygons: true,
            })
            .unwrap();

        let after = model.mesh().unwrap();
        assert_eq!(after.num_vertices(), 12);
        assert_eq!(after.num_faces(), 6);
        for v in 0..4 {
            let expected = mesh.points()[v] + Vec3::new(0.0, 0.0, 0.5);
            assert!(after.points()[v].abs_diff_eq(expected, 1e-6));
        }

        let (_, edge_loop) = model.active_loops().next().unwrap();
        assert_eq!(edge_loop.len(), 3);
        let mut points = edge_loop.points(&model).unwrap();
        if points[0].x > points[3].x {
            points.reverse();
        }
        for (v, p) in points.iter().enumerate() {
            assert!(p.abs_diff_eq(mesh.points()[v], 1e-6));
        }
    }

    #[test]
    pub fn rungs_extend_adjacent_loops() {
        // 0 - 1 - 2
        // |   |   |
        // 3 - 4 - 5
        // |   |   |
        // 6 - 7 - 8
        let mesh = Grid::build(2, 2, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let top = edges_between(&mesh, &[0, 1, 2]);
        let right = edges_between(&mesh, &[2, 5, 8]);
        model
            .set_active_edges(&top.iter().chain(&right).copied().collect_vec())
            .unwrap();
        assert_eq!(model.num_active_loops(), 2);

        let top_id = model
            .active_loops()
            .find(|(_, l)| l.contains(top[0]))
            .map(|(id, _)| id)
            .unwrap();
        SeamMeshEditor::new(&mut model)
            .offset_edgeloop(top_id, 0.25, true)
            .unwrap();

        let (_, right_loop) = model.active_loops().find(|(id, _)| *id != top_id).unwrap();
        assert_eq!(right_loop.len(), 3);
        for i in 1..right_loop.len() {
            let (_, dst) = right_loop.edge_vertices(i - 1, &model).unwrap();
            let (src, _) = right_loop.edge_vertices(i, &model).unwrap();
            assert_eq!(dst, src);
        }
    }

    #[test]
    pub fn crossed_corner_gets_an_extra_quad() {
        // 0 - 1
        // |   |
        // 2 - 3
        let mesh = Grid::build(1, 1, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        let mut square = EdgeLoop::new();
        for e in edges_between(&mesh, &[0, 2, 3, 1, 0]) {
            let (src, _) = mesh.edge_vertices(e).unwrap();
            let flipped = !square.is_empty()
                && square.edge_vertices(square.len() - 1, &mesh).unwrap().1 != src;
            square.push_back(e, flipped);
        }
        assert!(square.is_closed(&mesh).unwrap());
        let id = model.loops_mut().insert(square);

        SeamMeshEditor::new(&mut model)
            .offset_edgeloop(id, 0.25, true)
            .unwrap();
        let after = model.mesh().unwrap();
        assert_eq!(after.num_vertices(), 4 + 5 + 1);
        assert_eq!(after.num_faces(), 1 + 4 + 1);
        let corner = after.points()[0];
        assert!(corner.abs_diff_eq(Vec3::new(0.25, 0.0, 0.25), 1e-6));
        // The extra vertex sits on the old corner
        assert!(after.points()[9].abs_diff_eq(Vec3::ZERO, 1e-6));

        let edge_loop = model.active_loop(id).unwrap();
        assert_eq!(edge_loop.len(), 6);
        assert!(edge_loop.is_closed(&model).unwrap());
    }

    #[test]
    pub fn interior_loops_cannot_be_offset() {
        let mesh = Grid::build(3, 2, 1.0).unwrap();
        let mut model = MeshTopologyModel::from_mesh(&mesh).unwrap();
        model
            .set_active_edges(&edges_between(&mesh, &[4, 5, 6, 7]))
            .unwrap();
        let err = SeamMeshEditor::new(&mut model)
            .offset_edgeloops(&OffsetOptions::default())
            .unwrap_err();
        assert!(err.is_failure());
        assert!(model.mesh().unwrap().is_equivalent(&mesh));
        assert_eq!(model.mesh().unwrap().points(), mesh.points());
    }
}
