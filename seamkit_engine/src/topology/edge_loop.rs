// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{bail_failure, bail_invalid};
use crate::prelude::*;

/// The queries an edge loop needs from the mesh it lives on. Loops don't hold
/// on to a mesh, every query goes through whoever owns them.
pub trait EdgeTopology {
    /// Endpoints of `edge` in its natural orientation
    fn edge_endpoints(&self, edge: EdgeId) -> MeshResult<(VertexId, VertexId)>;
    fn vertex_position(&self, vertex: VertexId) -> MeshResult<Vec3>;
}

impl EdgeTopology for PolyMesh {
    fn edge_endpoints(&self, edge: EdgeId) -> MeshResult<(VertexId, VertexId)> {
        self.edge_vertices(edge)
    }

    fn vertex_position(&self, vertex: VertexId) -> MeshResult<Vec3> {
        self.point(vertex)
    }
}

/// One edge of a loop. When `flipped` is set, the loop walks the edge
/// against its natural orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopEdge {
    pub edge: EdgeId,
    pub flipped: bool,
}

/// An ordered path of edges where consecutive edges share a vertex. Walking
/// the edges front to back, each in its loop orientation, gives a directed
/// path. A loop is closed when that path ends where it started.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeLoop {
    edges: VecDeque<LoopEdge>,
}

impl EdgeLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a loop adding the given edges one by one, see [`EdgeLoop::add`].
    pub fn from_edges(
        edges: impl IntoIterator<Item = EdgeId>,
        topo: &impl EdgeTopology,
    ) -> MeshResult<Self> {
        let mut edge_loop = Self::new();
        for edge in edges {
            edge_loop.add(edge, topo)?;
        }
        Ok(edge_loop)
    }

    /// Inserts `edge` at whichever end of the loop it connects to, flipping
    /// it when its natural orientation runs against the loop. The front is
    /// tried first. An edge that touches neither end is appended as is, and
    /// the loop is no longer guaranteed to be a path.
    ///
    /// Returns false when the edge was already part of the loop.
    pub fn add(&mut self, edge: EdgeId, topo: &impl EdgeTopology) -> MeshResult<bool> {
        let (src, dst) = topo.edge_endpoints(edge)?;
        if self.edges.is_empty() {
            return Ok(self.push_back(edge, false));
        }

        let (first_src, _) = self.edge_vertices(0, topo)?;
        if first_src == dst {
            return Ok(self.push_front(edge, false));
        }
        if first_src == src {
            return Ok(self.push_front(edge, true));
        }

        let (_, last_dst) = self.edge_vertices(self.len() - 1, topo)?;
        if last_dst == src {
            Ok(self.push_back(edge, false))
        } else if last_dst == dst {
            Ok(self.push_back(edge, true))
        } else {
            log::warn!("Edge {edge} does not connect to either end of the loop, appending it");
            Ok(self.push_back(edge, false))
        }
    }

    pub fn push_front(&mut self, edge: EdgeId, flipped: bool) -> bool {
        if self.contains(edge) {
            return false;
        }
        self.edges.push_front(LoopEdge { edge, flipped });
        true
    }

    pub fn push_back(&mut self, edge: EdgeId, flipped: bool) -> bool {
        if self.contains(edge) {
            return false;
        }
        self.edges.push_back(LoopEdge { edge, flipped });
        true
    }

    pub fn contains(&self, edge: EdgeId) -> bool {
        self.edges.iter().any(|e| e.edge == edge)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LoopEdge> + '_ {
        self.edges.iter()
    }

    /// The edge ids, in loop order
    pub fn edges(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|e| e.edge).collect()
    }

    pub fn edge(&self, index: usize) -> MeshResult<LoopEdge> {
        match self.edges.get(index) {
            Some(e) => Ok(*e),
            None => bail_invalid!("Loop index {index} out of range ({} edges)", self.len()),
        }
    }

    pub fn is_flipped(&self, index: usize) -> MeshResult<bool> {
        Ok(self.edge(index)?.flipped)
    }

    /// Endpoints of the edge at `index`, in loop orientation.
    pub fn edge_vertices(
        &self,
        index: usize,
        topo: &impl EdgeTopology,
    ) -> MeshResult<(VertexId, VertexId)> {
        let loop_edge = self.edge(index)?;
        let (src, dst) = topo.edge_endpoints(loop_edge.edge)?;
        Ok(if loop_edge.flipped { (dst, src) } else { (src, dst) })
    }

    /// Replaces the edge at `index`, keeping its position in the loop.
    pub fn set_edge(&mut self, index: usize, loop_edge: LoopEdge) -> MeshResult<()> {
        match self.edges.get_mut(index) {
            Some(e) => *e = loop_edge,
            None => bail_invalid!("Loop index {index} out of range ({} edges)", self.len()),
        }
        Ok(())
    }

    /// Walks the loop in reverse order, which also flips every edge.
    pub fn reverse(&mut self) {
        self.edges = self
            .edges
            .iter()
            .rev()
            .map(|e| LoopEdge {
                edge: e.edge,
                flipped: !e.flipped,
            })
            .collect();
    }

    pub fn is_closed(&self, topo: &impl EdgeTopology) -> MeshResult<bool> {
        if self.len() < 2 {
            return Ok(false);
        }
        let (first, _) = self.edge_vertices(0, topo)?;
        let (_, last) = self.edge_vertices(self.len() - 1, topo)?;
        Ok(first == last)
    }

    /// The vertices visited by the loop, in order. Open loops have one more
    /// vertex than edges. Closed loops don't repeat their first vertex.
    pub fn vertices(&self, topo: &impl EdgeTopology) -> MeshResult<Vec<VertexId>> {
        let mut vertices = Vec::with_capacity(self.len() + 1);
        for i in 0..self.len() {
            let (src, dst) = self.edge_vertices(i, topo)?;
            if i == 0 {
                vertices.push(src);
            }
            vertices.push(dst);
        }
        if self.is_closed(topo)? {
            vertices.pop();
        }
        Ok(vertices)
    }

    /// Start and end vertex of the loop. They are the same for closed loops.
    pub fn end_vertices(&self, topo: &impl EdgeTopology) -> MeshResult<(VertexId, VertexId)> {
        if self.is_empty() {
            bail_failure!("An empty loop has no end vertices")
        }
        let (first, _) = self.edge_vertices(0, topo)?;
        let (_, last) = self.edge_vertices(self.len() - 1, topo)?;
        Ok((first, last))
    }

    /// Sum of the geometric lengths of every edge
    pub fn length(&self, topo: &impl EdgeTopology) -> MeshResult<f32> {
        let mut length = 0.0;
        for e in &self.edges {
            let (a, b) = topo.edge_endpoints(e.edge)?;
            length += topo.vertex_position(a)?.distance(topo.vertex_position(b)?);
        }
        Ok(length)
    }

    /// Positions of [`EdgeLoop::vertices`]
    pub fn points(&self, topo: &impl EdgeTopology) -> MeshResult<Vec<Vec3>> {
        self.vertices(topo)?
            .into_iter()
            .map(|v| topo.vertex_position(v))
            .collect()
    }
}

impl std::fmt::Display for EdgeLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.edges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if e.flipped {
                write!(f, "-")?;
            }
            write!(f, "{}", e.edge)?;
        }
        write!(f, "]")
    }
}
