// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use anyhow::{bail, Result};

/// Batch jobs: a list of seam edits read from a RON file
mod job;

/// Reading and writing Wavefront OBJ meshes
mod obj_io;

fn main() -> Result<()> {
    // Setup logging
    env_logger::init();

    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => bail!("Usage: seamkit <job.ron>"),
    };
    let job = job::Job::load(&path)?;
    job.run()
}
