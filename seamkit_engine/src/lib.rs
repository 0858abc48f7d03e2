// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Some useful re-exports
pub mod prelude;

/// The status codes returned across the model boundary
pub mod error;

/// The polygon mesh kernel: storage, connectivity and geometric queries
pub mod mesh;

/// Edge loops, the loop tracer, vertex splitting and the topology model
pub mod topology;

/// Seam specific edits layered on top of the topology model
pub mod seam;
