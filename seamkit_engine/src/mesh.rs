// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Type-safe integer ids for vertices, edges, faces and halfedges
pub mod id_types;
pub use id_types::*;

/// The halfedge adjacency graph built from a polygon list
pub mod connectivity;
pub use connectivity::*;

/// An API to represent type-safe and error-handled graph traversals over a mesh
pub mod traversals;
pub use traversals::*;

/// The polygon mesh: points, polygons, UVs, normals and derived connectivity
pub mod poly_mesh;
pub use poly_mesh::*;

/// A compact halfedge graph used for smooth subdivision
pub mod compact_mesh;

/// Procedural test and demo shapes: grids, cylinders and boxes
pub mod primitives;

/// Text expressions selecting a subset of vertices, edges or faces
pub mod selection;

/// Halfedge meshes are linked lists, so a malformed mesh could make a walk
/// loop forever. Walks give up with an error after this many steps.
pub const MAX_LOOP_ITERATIONS: usize = 8196;
