// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::bail_invalid;
use crate::prelude::*;

#[derive(Debug, Default, Clone)]
pub struct HalfEdge {
    pub(crate) twin: Option<HalfEdgeId>,
    pub(crate) next: Option<HalfEdgeId>,
    pub(crate) vertex: Option<VertexId>,
    pub(crate) face: Option<FaceId>,
    pub(crate) edge: Option<EdgeId>,
}

#[derive(Debug, Default, Clone)]
pub struct Vertex {
    pub(crate) halfedge: Option<HalfEdgeId>,
}

#[derive(Debug, Default, Clone)]
pub struct Face {
    pub(crate) halfedge: Option<HalfEdgeId>,
}

/// An edge is stored as the halfedge that introduced it. The direction of that
/// halfedge is the natural orientation of the edge.
#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) halfedge: HalfEdgeId,
}

/// Index-based halfedge graph. Element ids are positions in the arrays, so
/// they are dense and stable for as long as the polygon list they were built
/// from doesn't change.
///
/// The boundary is represented with halfedges pointing to a `None` face, so
/// every halfedge has a twin after [`MeshConnectivity::build`] succeeds.
#[derive(Debug, Default, Clone)]
pub struct MeshConnectivity {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) faces: Vec<Face>,
    pub(crate) halfedges: Vec<HalfEdge>,
    pub(crate) edges: Vec<Edge>,
}

/// The edges and faces around a vertex, in cyclic order.
///
/// Slots are enumerated rotating `twin -> next` from a start halfedge. On the
/// boundary, the start is the outgoing boundary halfedge, so the first and last
/// slots hold the two boundary edges. Otherwise, the start is the outgoing
/// halfedge with the lowest edge id.
///
/// `faces[j]` always lies between `edges[j]` and `edges[j + 1]`. Interior fans
/// wrap around, so they have as many faces as edges. Boundary fans have one
/// face less.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexFan {
    pub halfedges: SVec<HalfEdgeId>,
    pub edges: SVec<EdgeId>,
    pub faces: SVec<FaceId>,
    pub on_boundary: bool,
}

impl VertexFan {
    pub fn valence(&self) -> usize {
        self.edges.len()
    }

    pub fn slot_of(&self, edge: EdgeId) -> Option<usize> {
        self.edges.iter().position(|&e| e == edge)
    }
}

impl MeshConnectivity {
    /// Builds the halfedge graph for a list of polygons over `num_vertices`
    /// vertices. Fails for anything that is not an oriented manifold surface
    /// with boundary.
    #[profiling::function]
    pub fn build(num_vertices: usize, polygons: &[SVec<VertexId>]) -> MeshResult<Self> {
        let mut conn = MeshConnectivity {
            vertices: vec![Vertex::default(); num_vertices],
            ..Default::default()
        };

        // Used to compute the degree of a vertex. Useful to do some sanity
        // checks.
        let mut vertex_degree = vec![0u32; num_vertices];

        for (f, polygon) in polygons.iter().enumerate() {
            if polygon.len() < 3 {
                bail_invalid!("Polygon {f} has less than three vertices.")
            }
            if polygon.iter().duplicates().next().is_some() {
                bail_invalid!("Polygon {f} has duplicate vertices.")
            }
            for v in polygon {
                if v.idx() >= num_vertices {
                    bail_invalid!("Out-of-bounds index in polygon {f}: {v}")
                }
                vertex_degree[v.idx()] += 1;
            }
        }

        // Maps pairs of vertices to mesh halfedges
        let mut pair_to_halfedge = HashMap::<(VertexId, VertexId), HalfEdgeId>::new();

        for (f, polygon) in polygons.iter().enumerate() {
            let face = FaceId::from(f);
            conn.faces.push(Face::default());

            // Cyclically ordered list of the half edge ids of this face.
            let mut half_edges_in_face = SVec::new();

            for (&a, &b) in polygon.iter().circular_tuple_windows() {
                if pair_to_halfedge.contains_key(&(a, b)) {
                    bail_invalid!(
                        "Found multiple oriented edges from {a} to {b}. This means either \
                         (i) surface is non-manifold or (ii) faces are not oriented in \
                         the same direction"
                    )
                }

                let h = conn.alloc_halfedge(HalfEdge {
                    vertex: Some(a),
                    face: Some(face),
                    ..Default::default()
                });
                conn[face].halfedge = Some(h);
                conn[a].halfedge = Some(h);
                half_edges_in_face.push(h);
                pair_to_halfedge.insert((a, b), h);

                if let Some(&other) = pair_to_halfedge.get(&(b, a)) {
                    conn[h].twin = Some(other);
                    conn[other].twin = Some(h);
                    conn[h].edge = conn[other].edge;
                } else {
                    let e = EdgeId::from(conn.edges.len());
                    conn.edges.push(Edge { halfedge: h });
                    conn[h].edge = Some(e);
                }
            }

            for (&h1, &h2) in half_edges_in_face.iter().circular_tuple_windows() {
                conn[h1].next = Some(h2);
            }
        }

        conn.add_boundary_halfedges()?;

        for v in 0..num_vertices {
            let v = VertexId::from(v);
            if conn[v].halfedge.is_none() {
                bail_invalid!("Vertex {v} is disconnected from any polygon");
            }

            // The number of faces found by cycling around the vertex must
            // match the number of polygons that reference it. Otherwise the
            // vertex is not a polygon fan but some other nonmanifold structure.
            let num_faces = conn.at_vertex(v).fan_faces()?.len();
            if num_faces as u32 != vertex_degree[v.idx()] {
                bail_invalid!("Vertex {v} is not a polygon fan, but some other nonmanifold structure")
            }
        }

        Ok(conn)
    }

    fn alloc_halfedge(&mut self, h: HalfEdge) -> HalfEdgeId {
        self.halfedges.push(h);
        HalfEdgeId::from(self.halfedges.len() - 1)
    }

    /// Right after the faces are linked, halfedges on the boundary have no
    /// twin. This adds twin halfedges with a `None` face forming a loop around
    /// each hole, so traversals can always rely on twins existing.
    fn add_boundary_halfedges(&mut self) -> MeshResult<()> {
        let num_interior = self.halfedges.len();

        for h0 in (0..num_interior).map(HalfEdgeId::from) {
            if self[h0].twin.is_some() {
                continue;
            }
            let mut boundary_halfedges = Vec::<HalfEdgeId>::new();
            let mut h_it = h0;
            loop {
                let dst = self.at_halfedge(h_it).dst_vertex().try_end()?;
                let t = self.alloc_halfedge(HalfEdge {
                    twin: Some(h_it),
                    vertex: Some(dst),
                    edge: self[h_it].edge,
                    ..Default::default()
                });
                boundary_halfedges.push(t);
                self[h_it].twin = Some(t);

                // Look for the next outgoing halfedge for this vertex that's
                // in the boundary
                h_it = self.at_halfedge(h_it).next().try_end()?;
                let mut count = 0;
                while h_it != h0 && self[h_it].twin.is_some() {
                    h_it = self.at_halfedge(h_it).next_in_fan().try_end()?;
                    count += 1;
                    if count > MAX_LOOP_ITERATIONS {
                        bail_invalid!("Could not close the boundary loop starting at {h0}")
                    }
                }

                if h_it == h0 {
                    break;
                }
            }

            for (&b_h, &b_h_next) in boundary_halfedges.iter().rev().circular_tuple_windows() {
                self[b_h].next = Some(b_h_next);
            }
        }
        Ok(())
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    pub fn iter_halfedges(&self) -> impl Iterator<Item = (HalfEdgeId, &HalfEdge)> {
        self.halfedges
            .iter()
            .enumerate()
            .map(|(i, h)| (HalfEdgeId::from(i), h))
    }

    /// The halfedge giving the natural orientation of `edge`
    pub fn edge_halfedge(&self, edge: EdgeId) -> HalfEdgeId {
        self.edges[edge.idx()].halfedge
    }

    /// Source and destination of `edge` in its natural orientation
    pub fn edge_endpoints(&self, edge: EdgeId) -> Result<(VertexId, VertexId), TraversalError> {
        self.at_halfedge(self.edge_halfedge(edge)).endpoints()
    }

    /// The faces on either side of `edge`. The second one is `None` on the
    /// boundary.
    pub fn edge_faces(&self, edge: EdgeId) -> Result<SVec<FaceId>, TraversalError> {
        let h = self.edge_halfedge(edge);
        let twin = self.at_halfedge(h).twin().try_end()?;
        Ok([h, twin]
            .iter()
            .filter_map(|&h| self[h].face)
            .collect_svec())
    }

    pub fn is_boundary_edge(&self, edge: EdgeId) -> Result<bool, TraversalError> {
        Ok(self.edge_faces(edge)?.len() < 2)
    }

    pub fn is_boundary_vertex(&self, v: VertexId) -> Result<bool, TraversalError> {
        for h in self.at_vertex(v).fan_halfedges()? {
            if self.at_halfedge(h).is_boundary()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns the edge joining `a` and `b`, if any
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.at_vertex(a)
            .halfedge_to(b)
            .try_end()
            .ok()
            .and_then(|h| self[h].edge)
    }

    pub fn vertex_fan(&self, v: VertexId) -> Result<VertexFan, TraversalError> {
        let outgoing = self.at_vertex(v).fan_halfedges()?;
        let n = outgoing.len();

        let boundary_slot = outgoing.iter().position(|&h| self[h].face.is_none());
        let start = match boundary_slot {
            Some(slot) => slot,
            None => outgoing
                .iter()
                .position_min_by_key(|&&h| self[h].edge)
                .unwrap_or(0),
        };

        let halfedges = rotate_iter(outgoing.iter_cpy(), start, n).collect_svec();
        let edges = halfedges
            .iter()
            .map(|&h| self.at_halfedge(h).edge_id())
            .collect::<Result<SVec<_>, _>>()?;
        let on_boundary = boundary_slot.is_some();
        let faces = halfedges
            .iter_cpy()
            .skip(1)
            .chain(halfedges.first().copied().filter(|_| !on_boundary))
            .map(|h| self.at_halfedge(h).face().try_end())
            .collect::<Result<SVec<_>, _>>()?;

        Ok(VertexFan {
            halfedges,
            edges,
            faces,
            on_boundary,
        })
    }

    /// The halfedges of the polygon at `face`, starting at the first corner.
    pub fn face_halfedges(&self, face: FaceId) -> Result<SVec<HalfEdgeId>, TraversalError> {
        self.at_face(face).polygon_halfedges()
    }
}

macro_rules! impl_index_traits {
    ($id_type:ty, $output_type:ty, $arena:ident) => {
        impl std::ops::Index<$id_type> for MeshConnectivity {
            type Output = $output_type;

            fn index(&self, index: $id_type) -> &Self::Output {
                self.$arena.get(index.idx()).unwrap_or_else(|| {
                    panic!(
                        "{} index error for {}. Is it out of range?",
                        stringify!($id_type),
                        index
                    )
                })
            }
        }

        impl std::ops::IndexMut<$id_type> for MeshConnectivity {
            fn index_mut(&mut self, index: $id_type) -> &mut Self::Output {
                self.$arena.get_mut(index.idx()).unwrap_or_else(|| {
                    panic!(
                        "{} index error for {}. Is it out of range?",
                        stringify!($id_type),
                        index
                    )
                })
            }
        }
    };
}

impl_index_traits!(VertexId, Vertex, vertices);
impl_index_traits!(FaceId, Face, faces);
impl_index_traits!(HalfEdgeId, HalfEdge, halfedges);

#[cfg(test)]
mod test {
    use super::*;

    fn quad_strip() -> Vec<SVec<VertexId>> {
        // 0 - 1 - 2
        // |   |   |
        // 3 - 4 - 5
        [[0u32, 3, 4, 1], [1, 4, 5, 2]]
            .iter()
            .map(|p| p.iter().map(|&i| VertexId(i)).collect_svec())
            .collect()
    }

    #[test]
    pub fn edges_are_numbered_in_order_of_appearance() {
        let conn = MeshConnectivity::build(6, &quad_strip()).unwrap();
        assert_eq!(conn.num_edges(), 7);
        assert_eq!(
            conn.edge_endpoints(EdgeId(0)).unwrap(),
            (VertexId(0), VertexId(3))
        );
        // The shared edge keeps the orientation of the first face.
        assert_eq!(
            conn.edge_endpoints(EdgeId(2)).unwrap(),
            (VertexId(4), VertexId(1))
        );
        assert_eq!(conn.find_edge(VertexId(4), VertexId(1)), Some(EdgeId(2)));
        assert_eq!(conn.edge_faces(EdgeId(2)).unwrap().len(), 2);
        assert!(conn.is_boundary_edge(EdgeId(0)).unwrap());
        assert!(!conn.is_boundary_edge(EdgeId(2)).unwrap());
    }

    #[test]
    pub fn boundary_fans_start_and_end_on_the_boundary() {
        let conn = MeshConnectivity::build(6, &quad_strip()).unwrap();
        let fan = conn.vertex_fan(VertexId(4)).unwrap();
        assert!(fan.on_boundary);
        assert_eq!(fan.valence(), 3);
        assert_eq!(fan.faces.len(), 2);
        for slot in [0, fan.valence() - 1] {
            assert!(conn.is_boundary_edge(fan.edges[slot]).unwrap());
        }
        assert!(!conn.is_boundary_edge(fan.edges[1]).unwrap());
    }

    #[test]
    pub fn rejects_nonmanifold_input() {
        let flipped: Vec<SVec<VertexId>> = [[0u32, 1, 2], [0, 1, 3]]
            .iter()
            .map(|p| p.iter().map(|&i| VertexId(i)).collect_svec())
            .collect();
        assert!(MeshConnectivity::build(4, &flipped)
            .unwrap_err()
            .is_invalid_parameter());

        let degenerate: Vec<SVec<VertexId>> = vec![[VertexId(0), VertexId(1)].into_iter().collect()];
        assert!(MeshConnectivity::build(2, &degenerate).is_err());

        // Vertex 6 is never referenced
        assert!(MeshConnectivity::build(7, &quad_strip()).is_err());
    }
}
