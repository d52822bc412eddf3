// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures and proptest strategies for other crates' tests.

use crate::task::{Task, TaskStatus};

/// A small fixed backlog: N open tasks with no dependencies between them,
/// used as the seed for the happy-path scenario.
pub fn linear_backlog(n: usize) -> Vec<Task> {
    (1..=n)
        .map(|i| Task::new(format!("t{i}"), format!("task {i}"), TaskStatus::Open))
        .collect()
}

/// A backlog where task 2 depends on task 1, used to exercise dependency
/// gating in task selection.
pub fn chained_backlog() -> Vec<Task> {
    let t1 = Task::new("t1", "first", TaskStatus::Open);
    let t2 = Task::new("t2", "second", TaskStatus::Open).deps(vec![t1.id.clone()]);
    vec![t1, t2]
}

#[cfg(feature = "proptest")]
pub mod strategies {
    use crate::task::{Task, TaskId, TaskStatus};
    use proptest::prelude::*;

    pub fn task_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Open),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Blocked),
            Just(TaskStatus::Completed),
            Just(TaskStatus::Cancelled),
        ]
    }

    pub fn task() -> impl Strategy<Value = Task> {
        ("[a-z]{3,8}", "[a-z ]{3,20}", task_status()).prop_map(|(id, title, status)| {
            Task::new(TaskId::from_string(id), title, status)
        })
    }
}
