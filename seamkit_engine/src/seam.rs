// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;
use crate::topology::MeshTopologyModel;

/// Moving seam loops inwards and bridging the gap with new quads
pub mod offset;
pub use offset::*;

/// Face-vertex normals that keep sharp seams hard
pub mod hard_edges;

/// Seam edits over a [`MeshTopologyModel`]. The editor only borrows the
/// model, all the state lives there.
pub struct SeamMeshEditor<'a> {
    model: &'a mut MeshTopologyModel,
}

impl<'a> SeamMeshEditor<'a> {
    pub fn new(model: &'a mut MeshTopologyModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &MeshTopologyModel {
        &*self.model
    }

    /// Selects the seam given by `edges` on `source` in the model's mesh,
    /// and makes it the active loops.
    ///
    /// An edge of the model is part of the seam when the origins of its two
    /// vertices are the two vertices of a seam edge. After a detach, this
    /// picks the edges on both sides of the cut.
    pub fn transfer_edges(&mut self, source: &PolyMesh, edges: &[EdgeId]) -> MeshResult<()> {
        let mut seam = BTreeSet::new();
        for &e in edges {
            let (a, b) = source.edge_vertices(e)?;
            seam.insert(if a <= b { (a, b) } else { (b, a) });
        }

        let mesh = self.model.mesh()?;
        let split_map = self.model.vertex_split_map();
        let mut selected = vec![];
        for e in (0..mesh.num_edges()).map(EdgeId::from) {
            let (a, b) = mesh.edge_vertices(e)?;
            if let (Some(oa), Some(ob)) = (split_map.origin(a), split_map.origin(b)) {
                if seam.contains(&if oa <= ob { (oa, ob) } else { (ob, oa) }) {
                    selected.push(e);
                }
            }
        }

        log::debug!(
            "Transferred {} seam edges onto {} edges",
            seam.len(),
            selected.len()
        );
        self.model.set_active_edges(&selected)
    }
}
