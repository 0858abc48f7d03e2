// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::topology::trace_edge_loops;

/// A set of mesh elements of a single kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentSelection {
    Vertices(Vec<VertexId>),
    Edges(Vec<EdgeId>),
    Faces(Vec<FaceId>),
}

impl ComponentSelection {
    pub fn len(&self) -> usize {
        match self {
            ComponentSelection::Vertices(v) => v.len(),
            ComponentSelection::Edges(e) => e.len(),
            ComponentSelection::Faces(f) => f.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flood fills `ids` starting from the lowest remaining id each time, moving
/// to the neighbours returned by `neighbours` that are part of the selection.
/// Each group is returned sorted.
fn flood_fill<Id, F>(ids: &[Id], mut neighbours: F) -> MeshResult<Vec<Vec<Id>>>
where
    Id: Copy + Ord,
    F: FnMut(Id) -> MeshResult<SVec<Id>>,
{
    let mut remaining: BTreeSet<Id> = ids.iter().copied().collect();
    let mut groups = vec![];

    loop {
        let seed = match remaining.iter().next() {
            Some(&seed) => seed,
            None => break,
        };
        remaining.remove(&seed);
        let mut group = vec![seed];
        let mut stack = vec![seed];
        while let Some(id) = stack.pop() {
            for next in neighbours(id)? {
                if remaining.remove(&next) {
                    group.push(next);
                    stack.push(next);
                }
            }
        }
        group.sort();
        groups.push(group);
    }

    Ok(groups)
}

/// Partitions a selection into connected subsets. Vertices connect through
/// edges and faces through shared edges. Edges are grouped into the loops
/// the loop tracer finds for them.
pub fn group_connected_components(
    mesh: &PolyMesh,
    selection: &ComponentSelection,
) -> MeshResult<Vec<ComponentSelection>> {
    let groups = match selection {
        ComponentSelection::Vertices(vertices) => {
            for &v in vertices {
                mesh.check_vertex(v)?;
            }
            flood_fill(vertices, |v| mesh.connected_vertices(v))?
                .into_iter()
                .map(ComponentSelection::Vertices)
                .collect()
        }
        ComponentSelection::Faces(faces) => {
            for &f in faces {
                mesh.check_face(f)?;
            }
            flood_fill(faces, |f| mesh.face_neighbours(f))?
                .into_iter()
                .map(ComponentSelection::Faces)
                .collect()
        }
        ComponentSelection::Edges(edges) => trace_edge_loops(mesh, edges)?
            .into_iter()
            .map(|l| ComponentSelection::Edges(l.edges()))
            .collect(),
    };
    Ok(groups)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::primitives::Grid;

    // 0 - 1 - 2 - 3
    // |   |   |   |
    // 4 - 5 - 6 - 7
    // |   |   |   |
    // 8 - 9 - 10- 11
    fn grid() -> PolyMesh {
        Grid::build(3, 2, 1.0).unwrap()
    }

    #[test]
    pub fn vertex_groups() {
        let mesh = grid();
        let selection = ComponentSelection::Vertices([11, 0, 1, 5, 3, 7].map(VertexId).to_vec());
        let groups = group_connected_components(&mesh, &selection).unwrap();
        assert_eq!(
            groups,
            vec![
                ComponentSelection::Vertices([0, 1, 5].map(VertexId).to_vec()),
                ComponentSelection::Vertices([3, 7, 11].map(VertexId).to_vec()),
            ]
        );
    }

    #[test]
    pub fn face_groups() {
        // Faces are laid out row by row: 0 1 2 / 3 4 5
        let mesh = grid();
        let selection = ComponentSelection::Faces([0, 2, 5, 3].map(FaceId).to_vec());
        let groups = group_connected_components(&mesh, &selection).unwrap();
        assert_eq!(
            groups,
            vec![
                ComponentSelection::Faces([0, 3].map(FaceId).to_vec()),
                ComponentSelection::Faces([2, 5].map(FaceId).to_vec()),
            ]
        );
    }

    #[test]
    pub fn edge_groups_follow_loops() {
        let mesh = grid();
        let e = |a, b| mesh.find_edge(VertexId(a), VertexId(b)).unwrap();
        let selection = ComponentSelection::Edges(vec![e(4, 5), e(5, 6), e(2, 3)]);
        let groups = group_connected_components(&mesh, &selection).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), 3);
    }

    #[test]
    pub fn out_of_range() {
        let mesh = grid();
        let selection = ComponentSelection::Faces(vec![FaceId(6)]);
        assert!(group_connected_components(&mesh, &selection)
            .unwrap_err()
            .is_invalid_parameter());
    }
}
