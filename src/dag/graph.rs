// src/dag/graph.rs

use std::collections::HashSet;

use thiserror::Error;

use crate::tasks::{Registry, TaskId, TaskKind};

/// Tasks started together; the next stage waits for all of them.
pub type Stage = Vec<TaskId>;

/// Ordered list of stages.
///
/// Built once from static declarations and never mutated. The same type
/// describes the full `build` sequence and the per-rule watch pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildGraph {
    stages: Vec<Stage>,
}

/// Problems found by [`BuildGraph::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("stage {0} is empty")]
    EmptyStage(usize),

    #[error("task '{0}' appears more than once")]
    DuplicateTask(TaskId),

    #[error("destructive task '{task}' must run alone, but stage {stage} has other tasks")]
    DestructiveNotAlone { stage: usize, task: TaskId },

    #[error("tasks '{first}' and '{second}' in stage {stage} write to overlapping outputs")]
    OverlappingOutputs {
        stage: usize,
        first: TaskId,
        second: TaskId,
    },
}

impl BuildGraph {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// The one-shot build: clean, then sources and assets, then images,
    /// then the compiled bundles.
    pub fn build() -> Self {
        Self::new(vec![
            vec![TaskId::ClearOutput],
            vec![
                TaskId::WriteManifests,
                TaskId::CopyStaticAssets,
                TaskId::GenerateIconSprite,
                TaskId::CompileTemplates,
            ],
            vec![TaskId::CopyImages],
            vec![TaskId::CompileStyles, TaskId::BundleScripts],
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// All tasks in execution order.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.stages.iter().flatten().copied()
    }

    /// Check the static invariants of the graph against the declared task
    /// outputs:
    /// - no empty stages and no task listed twice
    /// - destructive tasks have a stage to themselves
    /// - tasks sharing a stage have disjoint outputs
    pub fn validate(&self, registry: &Registry) -> Result<(), GraphError> {
        let mut seen = HashSet::new();

        for (index, stage) in self.stages.iter().enumerate() {
            if stage.is_empty() {
                return Err(GraphError::EmptyStage(index));
            }

            for &task in stage {
                if !seen.insert(task) {
                    return Err(GraphError::DuplicateTask(task));
                }
                if task.kind() == TaskKind::Destructive && stage.len() > 1 {
                    return Err(GraphError::DestructiveNotAlone { stage: index, task });
                }
            }

            for (i, &first) in stage.iter().enumerate() {
                for &second in &stage[i + 1..] {
                    let a = &registry.get(first).outputs;
                    let b = &registry.get(second).outputs;
                    if a.iter().any(|x| b.iter().any(|y| x.overlaps(y))) {
                        return Err(GraphError::OverlappingOutputs { stage: index, first, second });
                    }
                }
            }
        }

        Ok(())
    }
}
