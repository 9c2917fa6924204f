// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Rejoin barrier for dynamically spawned branches.
//!
//! A fan-out element declares the branch ids it is about to spawn; every
//! branch reports its result under its id; the rejoin element observes the
//! set on each invocation. Completion is declared exactly once, on the first
//! observation where the reported ids equal the expected ids. Nothing ever
//! waits on the set: an incomplete observation simply returns and the rejoin
//! element is invoked again when the next branch reports.
//!
//! A `BranchSet` lives in [`StreamVariables`](crate::engine::StreamVariables),
//! so every access happens under the stream's variables lock and concurrent
//! branch reports can't race.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub enum BranchObservation {
    /// Some expected branches have not reported yet
    Pending { missing: Vec<String> },
    /// Every expected branch has reported; results keyed by branch id
    Complete(BTreeMap<String, Value>),
    /// Completion was already declared by an earlier observation
    AlreadyComplete,
}

#[derive(Debug, Clone, Default)]
pub struct BranchSet {
    expected: BTreeSet<String>,
    reported: BTreeMap<String, Value>,
    completed: bool,
}

impl BranchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fan-out, discarding results of any previous one.
    pub fn expect<I, S>(&mut self, branch_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected = branch_ids.into_iter().map(Into::into).collect();
        self.reported.clear();
        self.completed = false;
    }

    /// Record a branch result. A repeated report replaces the earlier value.
    pub fn report(&mut self, branch_id: impl Into<String>, result: Value) {
        self.reported.insert(branch_id.into(), result);
    }

    pub fn expected(&self) -> &BTreeSet<String> {
        &self.expected
    }

    pub fn reported(&self) -> &BTreeMap<String, Value> {
        &self.reported
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Compare reported ids with expected ids.
    pub fn observe(&mut self) -> BranchObservation {
        if self.completed {
            return BranchObservation::AlreadyComplete;
        }

        let reported: BTreeSet<&String> = self.reported.keys().collect();
        let expected: BTreeSet<&String> = self.expected.iter().collect();
        if reported == expected {
            self.completed = true;
            BranchObservation::Complete(self.reported.clone())
        } else {
            let missing = self
                .expected
                .iter()
                .filter(|id| !self.reported.contains_key(*id))
                .cloned()
                .collect();
            BranchObservation::Pending { missing }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_then_complete() {
        let mut branches = BranchSet::new();
        branches.expect(["pe_x", "pe_y"]);

        branches.report("pe_x", json!("x"));
        assert_eq!(
            branches.observe(),
            BranchObservation::Pending {
                missing: vec!["pe_y".to_string()]
            }
        );

        branches.report("pe_y", json!("y"));
        match branches.observe() {
            BranchObservation::Complete(results) => {
                assert_eq!(results.get("pe_x"), Some(&json!("x")));
                assert_eq!(results.get("pe_y"), Some(&json!("y")));
            }
            other => panic!("Expected completion, got {:?}", other),
        }
        assert_eq!(branches.observe(), BranchObservation::AlreadyComplete);
    }

    #[test]
    fn test_arrival_order_does_not_change_results() {
        let mut forward = BranchSet::new();
        forward.expect(["a", "b", "c"]);
        for id in ["a", "b", "c"] {
            forward.report(id, json!(id));
        }

        let mut backward = BranchSet::new();
        backward.expect(["a", "b", "c"]);
        for id in ["c", "b", "a"] {
            backward.report(id, json!(id));
        }

        assert_eq!(forward.observe(), backward.observe());
    }

    #[test]
    fn test_unexpected_report_prevents_completion() {
        let mut branches = BranchSet::new();
        branches.expect(["a"]);
        branches.report("a", json!(1));
        branches.report("stray", json!(2));
        assert!(matches!(
            branches.observe(),
            BranchObservation::Pending { .. }
        ));
        assert!(!branches.is_complete());
    }

    #[test]
    fn test_expect_resets_previous_fan_out() {
        let mut branches = BranchSet::new();
        branches.expect(["a"]);
        branches.report("a", json!(1));
        assert!(matches!(branches.observe(), BranchObservation::Complete(_)));

        branches.expect(["b"]);
        assert!(branches.reported().is_empty());
        assert!(matches!(
            branches.observe(),
            BranchObservation::Pending { .. }
        ));
    }

    #[test]
    fn test_empty_fan_out_completes_immediately() {
        let mut branches = BranchSet::new();
        branches.expect(Vec::<String>::new());
        assert_eq!(
            branches.observe(),
            BranchObservation::Complete(BTreeMap::new())
        );
    }
}
