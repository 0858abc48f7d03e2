// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;
use crate::topology::EdgeLoop;

/// The edge that continues a loop arriving at `vertex` through `incoming`,
/// if the loop can go on through this vertex.
///
/// Interior vertices need four edges, the loop leaves through the edge
/// opposite to the incoming one. On the boundary, loops can only run along
/// the boundary itself, and corners (two edges) end them.
pub fn loop_continuation(
    mesh: &PolyMesh,
    vertex: VertexId,
    incoming: EdgeId,
) -> MeshResult<Option<EdgeId>> {
    let fan = mesh.vertex_fan(vertex)?;
    let n = fan.valence();
    let slot = match fan.slot_of(incoming) {
        Some(slot) => slot,
        None => return Ok(None),
    };

    Ok(if fan.on_boundary {
        if n == 2 {
            None
        } else if slot == 0 {
            Some(fan.edges[n - 1])
        } else if slot == n - 1 {
            Some(fan.edges[0])
        } else {
            None
        }
    } else if n == 4 {
        Some(fan.edges[(slot + 2) % 4])
    } else {
        None
    })
}

/// Extends `edge_loop` starting at `vertex`, which was reached through
/// `incoming`. Every edge taken is removed from `remaining`, and the walk
/// stops as soon as the continuation is not a remaining edge.
fn walk(
    mesh: &PolyMesh,
    remaining: &mut BTreeSet<EdgeId>,
    edge_loop: &mut EdgeLoop,
    mut vertex: VertexId,
    mut incoming: EdgeId,
) -> MeshResult<()> {
    while let Some(next) = loop_continuation(mesh, vertex, incoming)? {
        if !remaining.remove(&next) {
            break;
        }
        edge_loop.add(next, mesh)?;
        let (a, b) = mesh.edge_vertices(next)?;
        vertex = if a == vertex { b } else { a };
        incoming = next;
    }
    Ok(())
}

/// Partitions `edges` into maximal edge loops.
///
/// Vertices are visited in id order, and the edges around each one in fan
/// order. Each edge still unvisited seeds a new loop, which grows away from
/// the seed vertex and then, if the seed vertex lets loops through, in the
/// opposite direction. Duplicate ids are ignored.
#[profiling::function]
pub fn trace_edge_loops(mesh: &PolyMesh, edges: &[EdgeId]) -> MeshResult<Vec<EdgeLoop>> {
    for &e in edges {
        mesh.check_edge(e)?;
    }
    let mut remaining: BTreeSet<EdgeId> = edges.iter().copied().collect();
    let mut loops = vec![];

    for v in (0..mesh.num_vertices()).map(VertexId::from) {
        if remaining.is_empty() {
            break;
        }
        let fan = mesh.vertex_fan(v)?;
        for &seed in &fan.edges {
            if !remaining.remove(&seed) {
                continue;
            }
            let mut edge_loop = EdgeLoop::new();
            edge_loop.add(seed, mesh)?;

            let (a, b) = mesh.edge_vertices(seed)?;
            let other = if a == v { b } else { a };
            walk(mesh, &mut remaining, &mut edge_loop, other, seed)?;
            walk(mesh, &mut remaining, &mut edge_loop, v, seed)?;

            if !edge_loop.is_empty() {
                loops.push(edge_loop);
            }
        }
    }

    log::debug!(
        "Traced {} edges into {} loops",
        loops.iter().map(|l| l.len()).sum::<usize>(),
        loops.len()
    );
    Ok(loops)
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

    #[test]
    pub fn open_row_on_a_grid() {
        // 0 - 1 - 2 - 3
        // |   |   |   |
        // 4 - 5 - 6 - 7
        // |   |   |   |
        // 8 - 9 - 10- 11
        let mesh = Grid::build(3, 2, 1.0).unwrap();
        let row = [4, 5, 6, 7];
        // Shuffled on purpose, with a duplicate
        let mut edges = edges_between(&mesh, &row);
        edges.reverse();
        edges.push(edges[0]);

        let loops = trace_edge_loops(&mesh, &edges).unwrap();
        assert_eq!(loops.len(), 1);
        let edge_loop = &loops[0];
        assert_eq!(edge_loop.len(), 3);
        assert!(!edge_loop.is_closed(&mesh).unwrap());

        let mut vertices = edge_loop.vertices(&mesh).unwrap();
        if vertices[0] != VertexId(4) {
            vertices.reverse();
        }
        assert_eq!(vertices, row.map(VertexId));

        let (a, b) = edge_loop.end_vertices(&mesh).unwrap();
        let mut ends = [a, b];
        ends.sort();
        assert_eq!(ends, [VertexId(4), VertexId(7)]);
        assert!(mesh.is_boundary_vertex(a).unwrap());
        assert!(mesh.is_boundary_vertex(b).unwrap());
    }

    #[test]
    pub fn ring_around_a_cylinder() {
        let mesh = Cylinder::build(8, 2, 1.0, 2.0).unwrap();
        let ring = (8..16).chain([8]).collect_vec();
        let edges = edges_between(&mesh, &ring);

        let loops = trace_edge_loops(&mesh, &edges).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 8);
        assert!(loops[0].is_closed(&mesh).unwrap());
        let (a, b) = loops[0].end_vertices(&mesh).unwrap();
        assert_eq!(a, b);
        assert_eq!(loops[0].vertices(&mesh).unwrap().len(), 8);
    }

    #[test]
    pub fn boundary_rings_run_along_the_boundary() {
        let mesh = Cylinder::build(6, 1, 1.0, 1.0).unwrap();
        let ring = (0..6).chain([0]).collect_vec();
        let loops = trace_edge_loops(&mesh, &edges_between(&mesh, &ring)).unwrap();
        assert_eq!(loops.len(), 1);
        assert!(loops[0].is_closed(&mesh).unwrap());
    }

    #[test]
    pub fn loops_break_at_irregular_vertices() {
        let mesh = Grid::build(3, 2, 1.0).unwrap();
        // An L shape turning at the interior vertex 5
        let edges = edges_between(&mesh, &[4, 5, 1]);
        let loops = trace_edge_loops(&mesh, &edges).unwrap();
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.len() == 1));

        // Corners end boundary loops
        let edges = edges_between(&mesh, &[1, 0, 4]);
        let loops = trace_edge_loops(&mesh, &edges).unwrap();
        assert_eq!(loops.len(), 2);
    }

    #[test]
    pub fn out_of_range_edges() {
        let mesh = Grid::build(1, 1, 1.0).unwrap();
        let err = trace_edge_loops(&mesh, &[EdgeId(0), EdgeId(4)]).unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(trace_edge_loops(&mesh, &[]).unwrap().is_empty());
    }
}
