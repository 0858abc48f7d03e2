// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Ordered, oriented sequences of edges
pub mod edge_loop;
pub use edge_loop::*;

/// Turns an unordered edge selection into maximal edge loops
pub mod tracer;
pub use tracer::*;

/// Vertex splitting along seams, and the bookkeeping it leaves behind
pub mod split;
pub use split::*;

/// Partitions of vertex, edge and face selections into connected subsets
pub mod grouping;
pub use grouping::*;

/// The mesh, its split bookkeeping, the normal overlay and the active loops
pub mod model;
pub use model::*;
