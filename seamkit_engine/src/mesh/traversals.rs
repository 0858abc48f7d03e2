// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;

pub trait Location: Copy {}

impl Location for VertexId {}
impl Location for FaceId {}
impl Location for HalfEdgeId {}

/// A pointer that should be there according to the halfedge invariants, but
/// isn't.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraversalError {
    VertexHasNoHalfedge(VertexId),
    FaceHasNoHalfedge(FaceId),
    HalfEdgeHasNoNext(HalfEdgeId),
    HalfEdgeHasNoTwin(HalfEdgeId),
    HalfEdgeHasNoVertex(HalfEdgeId),
    HalfEdgeHasNoFace(HalfEdgeId),
    HalfEdgeHasNoEdge(HalfEdgeId),
    NoHalfedgeBetween(VertexId, VertexId),
    /// A walk around a face or a fan didn't come back to where it started
    UnclosedCycle(HalfEdgeId),
}

impl std::fmt::Display for TraversalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalError::VertexHasNoHalfedge(v) => write!(f, "{v} has no halfedge"),
            TraversalError::FaceHasNoHalfedge(face) => write!(f, "{face} has no halfedge"),
            TraversalError::HalfEdgeHasNoNext(h) => write!(f, "{h} has no next"),
            TraversalError::HalfEdgeHasNoTwin(h) => write!(f, "{h} has no twin"),
            TraversalError::HalfEdgeHasNoVertex(h) => write!(f, "{h} has no vertex"),
            TraversalError::HalfEdgeHasNoFace(h) => write!(f, "{h} has no face"),
            TraversalError::HalfEdgeHasNoEdge(h) => write!(f, "{h} has no edge"),
            TraversalError::NoHalfedgeBetween(a, b) => write!(f, "No halfedge from {a} to {b}"),
            TraversalError::UnclosedCycle(h) => write!(f, "Cycle starting at {h} never closes"),
        }
    }
}
impl std::error::Error for TraversalError {}

/// A position in the connectivity graph. Traversals are chained through
/// `Result`, so a missing pointer anywhere along a chain surfaces as a
/// [`TraversalError`] at the end of it.
#[derive(Clone, Copy)]
pub struct ValidTraversal<'a, L: Location> {
    conn: &'a MeshConnectivity,
    location: L,
}

pub type Traversal<'a, L> = Result<ValidTraversal<'a, L>, TraversalError>;

/// Follows the optional `$field` pointer of the current location.
macro_rules! follow {
    ($self:ident, $field:ident, $err:ident) => {
        $self.and_then(|valid| {
            Ok(ValidTraversal {
                conn: valid.conn,
                location: valid.conn[valid.location]
                    .$field
                    .ok_or(TraversalError::$err(valid.location))?,
            })
        })
    };
}

/// Collects the halfedges visited by repeatedly applying `step` from `h0`
/// until it comes back to `h0`.
fn collect_cycle(
    conn: &MeshConnectivity,
    h0: HalfEdgeId,
    step: impl Fn(Traversal<'_, HalfEdgeId>) -> Result<HalfEdgeId, TraversalError>,
) -> Result<SVec<HalfEdgeId>, TraversalError> {
    let mut cycle = SVec::new();
    let mut h = h0;
    loop {
        cycle.push(h);
        h = step(conn.at_halfedge(h))?;
        if h == h0 {
            return Ok(cycle);
        }
        if cycle.len() > MAX_LOOP_ITERATIONS {
            return Err(TraversalError::UnclosedCycle(h0));
        }
    }
}

impl MeshConnectivity {
    pub fn at_halfedge(&self, h: HalfEdgeId) -> Traversal<'_, HalfEdgeId> {
        Ok(ValidTraversal {
            conn: self,
            location: h,
        })
    }

    pub fn at_face(&self, f: FaceId) -> Traversal<'_, FaceId> {
        Ok(ValidTraversal {
            conn: self,
            location: f,
        })
    }

    pub fn at_vertex(&self, v: VertexId) -> Traversal<'_, VertexId> {
        Ok(ValidTraversal {
            conn: self,
            location: v,
        })
    }
}

pub trait AnyTraversal<L> {
    fn try_end(&self) -> Result<L, TraversalError>;
}

impl<'a, L: Location> AnyTraversal<L> for Traversal<'a, L> {
    fn try_end(&self) -> Result<L, TraversalError> {
        self.map(|valid| valid.location)
    }
}

/* ========== */
/*  Vertices  */
/* ========== */

pub trait VertexTraversal<'a> {
    fn halfedge(&self) -> Traversal<'a, HalfEdgeId>;
    /// Outgoing halfedges in fan order, boundary ones included. Empty for
    /// isolated vertices.
    fn fan_halfedges(&self) -> Result<SVec<HalfEdgeId>, TraversalError>;
    /// Faces around the vertex, in fan order
    fn fan_faces(&self) -> Result<SVec<FaceId>, TraversalError>;
    fn halfedge_to(&self, other: VertexId) -> Traversal<'a, HalfEdgeId>;
}

impl<'a> VertexTraversal<'a> for Traversal<'a, VertexId> {
    fn halfedge(&self) -> Traversal<'a, HalfEdgeId> {
        follow!(self, halfedge, VertexHasNoHalfedge)
    }

    fn fan_halfedges(&self) -> Result<SVec<HalfEdgeId>, TraversalError> {
        self.and_then(|valid| match valid.conn[valid.location].halfedge {
            Some(h0) => collect_cycle(valid.conn, h0, |t| t.next_in_fan().try_end()),
            None => Ok(SVec::new()),
        })
    }

    fn fan_faces(&self) -> Result<SVec<FaceId>, TraversalError> {
        self.and_then(|valid| {
            Ok(self
                .fan_halfedges()?
                .into_iter()
                .filter_map(|h| valid.conn[h].face)
                .collect())
        })
    }

    fn halfedge_to(&self, other: VertexId) -> Traversal<'a, HalfEdgeId> {
        self.and_then(|valid| {
            let from = valid.location;
            for h in self.fan_halfedges()? {
                if valid.conn.at_halfedge(h).dst_vertex().try_end()? == other {
                    return valid.conn.at_halfedge(h);
                }
            }
            Err(TraversalError::NoHalfedgeBetween(from, other))
        })
    }
}

/* ======= */
/*  Faces  */
/* ======= */

pub trait FaceTraversal<'a> {
    fn halfedge(&self) -> Traversal<'a, HalfEdgeId>;
    /// The halfedges around the face, following `next`
    fn polygon_halfedges(&self) -> Result<SVec<HalfEdgeId>, TraversalError>;
}

impl<'a> FaceTraversal<'a> for Traversal<'a, FaceId> {
    fn halfedge(&self) -> Traversal<'a, HalfEdgeId> {
        follow!(self, halfedge, FaceHasNoHalfedge)
    }

    fn polygon_halfedges(&self) -> Result<SVec<HalfEdgeId>, TraversalError> {
        let h0 = self.halfedge().try_end()?;
        self.and_then(|valid| collect_cycle(valid.conn, h0, |t| t.next().try_end()))
    }
}

/* =========== */
/*  Halfedges  */
/* =========== */

pub trait HalfEdgeTraversal<'a> {
    fn twin(&self) -> Traversal<'a, HalfEdgeId>;
    fn next(&self) -> Traversal<'a, HalfEdgeId>;
    fn face(&self) -> Traversal<'a, FaceId>;
    fn vertex(&self) -> Traversal<'a, VertexId>;
    fn edge_id(&self) -> Result<EdgeId, TraversalError>;
    /// The next outgoing halfedge around the source vertex
    fn next_in_fan(&self) -> Traversal<'a, HalfEdgeId>;
    fn dst_vertex(&self) -> Traversal<'a, VertexId>;
    fn endpoints(&self) -> Result<(VertexId, VertexId), TraversalError>;
    fn is_boundary(&self) -> Result<bool, TraversalError>;
}

impl<'a> HalfEdgeTraversal<'a> for Traversal<'a, HalfEdgeId> {
    fn twin(&self) -> Traversal<'a, HalfEdgeId> {
        follow!(self, twin, HalfEdgeHasNoTwin)
    }

    fn next(&self) -> Traversal<'a, HalfEdgeId> {
        follow!(self, next, HalfEdgeHasNoNext)
    }

    fn face(&self) -> Traversal<'a, FaceId> {
        follow!(self, face, HalfEdgeHasNoFace)
    }

    fn vertex(&self) -> Traversal<'a, VertexId> {
        follow!(self, vertex, HalfEdgeHasNoVertex)
    }

    fn edge_id(&self) -> Result<EdgeId, TraversalError> {
        self.and_then(|valid| {
            valid.conn[valid.location]
                .edge
                .ok_or(TraversalError::HalfEdgeHasNoEdge(valid.location))
        })
    }

    fn next_in_fan(&self) -> Traversal<'a, HalfEdgeId> {
        self.twin().next()
    }

    fn dst_vertex(&self) -> Traversal<'a, VertexId> {
        self.next().vertex()
    }

    fn endpoints(&self) -> Result<(VertexId, VertexId), TraversalError> {
        Ok((self.vertex().try_end()?, self.dst_vertex().try_end()?))
    }

    fn is_boundary(&self) -> Result<bool, TraversalError> {
        self.map(|valid| valid.conn[valid.location].face.is_none())
    }
}
