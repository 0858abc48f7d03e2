// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use seamkit_engine::mesh::selection::{SelectionExpression, SelectionGroups};
use seamkit_engine::prelude::*;
use seamkit_engine::seam::{OffsetOptions, SeamMeshEditor};
use seamkit_engine::topology::{
    ComponentSelection, EdgeLoop, ExtrudeOptions, MeshTopologyModel, SmoothOptions, VertexSplitMap,
};

use crate::obj_io;

/// A single edit. Selections use the selection expression syntax, e.g.
/// `"0..4, 7, @seam"`. Where a selection is optional, leaving it out means
/// the edges of the active loops.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Step {
    SetActiveEdges { edges: String },
    /// Selects the seam given by edges of the input mesh, on both sides of
    /// every cut made so far.
    TransferSeam { edges: String },
    Detach { edges: Option<String> },
    Offset(OffsetOptions),
    Extrude {
        edges: Option<String>,
        #[serde(default)]
        options: ExtrudeOptions,
    },
    Smooth(SmoothOptions),
    HardEdges { edges: Option<String>, threshold: f32 },
    Pull { vertices: String, distance: f32 },
    /// Copies positions back from the input mesh, following vertex origins.
    Update,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::SetActiveEdges { .. } => "SetActiveEdges",
            Step::TransferSeam { .. } => "TransferSeam",
            Step::Detach { .. } => "Detach",
            Step::Offset(_) => "Offset",
            Step::Extrude { .. } => "Extrude",
            Step::Smooth(_) => "Smooth",
            Step::HardEdges { .. } => "HardEdges",
            Step::Pull { .. } => "Pull",
            Step::Update => "Update",
        }
    }
}

/// A batch of edits over an OBJ mesh, read from a RON file. Relative paths
/// are relative to the job file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Where to dump the active loops and the vertex origins once all the
    /// steps ran
    #[serde(default)]
    pub loops: Option<PathBuf>,
    #[serde(default)]
    pub groups: SelectionGroups,
    pub steps: Vec<Step>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// What gets written to the loops dump
#[derive(Serialize)]
struct LoopsDump<'a> {
    loops: Vec<&'a EdgeLoop>,
    /// The active edges, grouped into connected runs
    groups: Vec<ComponentSelection>,
    origins: &'a VertexSplitMap,
}

impl Job {
    pub fn load(path: &Path) -> Result<Job> {
        let reader = std::io::BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Opening job file {}", path.display()))?,
        );
        let mut job: Job = ron::de::from_reader(reader)
            .with_context(|| format!("Parsing job file {}", path.display()))?;
        job.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(job)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    fn select<Id>(&self, expression: &str, count: usize) -> Result<Vec<Id>>
    where
        Id: From<usize> + Ord,
    {
        let expression = SelectionExpression::parse(expression)?;
        Ok(expression.resolve(count, &self.groups)?)
    }

    fn select_edges(&self, model: &MeshTopologyModel, edges: &Option<String>) -> Result<Vec<EdgeId>> {
        match edges {
            Some(expression) => self.select(expression, model.mesh()?.num_edges()),
            None => Ok(model.active_edges()),
        }
    }

    pub fn run(&self) -> Result<()> {
        let source = obj_io::load(&self.resolve(&self.input))?;
        let mut model = MeshTopologyModel::from_mesh(&source)?;

        for (i, step) in self.steps.iter().enumerate() {
            log::info!("Step {}: {}", i + 1, step.name());
            self.run_step(&source, &mut model, step)
                .with_context(|| format!("Running step {} ({})", i + 1, step.name()))?;
        }

        let mesh = model.mesh()?;
        log::info!(
            "Result has {} vertices, {} faces and {} active loops",
            mesh.num_vertices(),
            mesh.num_faces(),
            model.num_active_loops()
        );
        obj_io::save(mesh, model.normals(), &self.resolve(&self.output))?;

        if let Some(loops) = &self.loops {
            let path = self.resolve(loops);
            let dump = LoopsDump {
                loops: model.active_loops().map(|(_, l)| l).collect(),
                groups: model
                    .group_connected_components(&ComponentSelection::Edges(model.active_edges()))?,
                origins: model.vertex_split_map(),
            };
            let text = ron::ser::to_string_pretty(&dump, ron::ser::PrettyConfig::default())?;
            let mut file = std::fs::File::create(&path)
                .with_context(|| format!("Creating {}", path.display()))?;
            file.write_all(text.as_bytes())?;
        }
        Ok(())
    }

    fn run_step(&self, source: &PolyMesh, model: &mut MeshTopologyModel, step: &Step) -> Result<()> {
        match step {
            Step::SetActiveEdges { edges } => {
                let edges = self.select(edges, model.mesh()?.num_edges())?;
                model.set_active_edges(&edges)?;
            }
            Step::TransferSeam { edges } => {
                let edges = self.select(edges, source.num_edges())?;
                SeamMeshEditor::new(model).transfer_edges(source, &edges)?;
            }
            Step::Detach { edges } => {
                let edges = self.select_edges(model, edges)?;
                model.detach_edges(&edges)?;
            }
            Step::Offset(options) => {
                SeamMeshEditor::new(model).offset_edgeloops(options)?;
            }
            Step::Extrude { edges, options } => {
                let edges = self.select_edges(model, edges)?;
                model.extrude_edges(&edges, options)?;
            }
            Step::Smooth(options) => {
                model.smooth_mesh(options)?;
            }
            Step::HardEdges { edges, threshold } => {
                let edges = self.select_edges(model, edges)?;
                SeamMeshEditor::new(model).set_hard_edges(&edges, *threshold)?;
            }
            Step::Pull { vertices, distance } => {
                let vertices: Vec<VertexId> = self.select(vertices, model.mesh()?.num_vertices())?;
                model.pull_vertices(&vertices, *distance)?;
            }
            Step::Update => {
                model.update_mesh(source)?;
            }
        }
        Ok(())
    }
}
