// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

/// Rules waiting for the next run.
///
/// There is only ever one pending batch: every trigger that arrives before
/// the batch is drained is merged into it. Rules are identified by their
/// declaration index, so draining yields them in declaration order and each
/// rule at most once.
#[derive(Debug, Default, Clone)]
pub struct PendingRules {
    rules: BTreeSet<usize>,
}

impl PendingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Merge a triggered rule into the pending batch.
    pub fn record(&mut self, rule: usize) {
        let inserted = self.rules.insert(rule);
        debug!(rule, inserted, pending = self.rules.len(), "recorded rule trigger");
    }

    /// Take the whole batch, in declaration order.
    pub fn drain(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.rules).into_iter().collect()
    }
}
