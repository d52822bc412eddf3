use crate::prelude::*;

#[test]
fn stops_at_max_iterations_and_keeps_the_session_resumable() {
    let project = Project::empty();
    project.seed_tasks(1);
    let agent = project.script("agent.sh", "cat >/dev/null");

    project
        .ralph()
        .args(&["run", "--agent", agent.to_str().unwrap(), "--max-iterations", "3"])
        .passes()
        .stdout_has("stopped (max_iterations) after 3 iteration(s), 0 completed");

    assert!(project.has_session(), "a budget-stopped run must leave a resumable session file");
    let session = project.session();
    assert_eq!(session["status"], "running");
    assert_eq!(session["current_iteration"], 3);
    assert_eq!(session["tasks_completed"], 0);
}

#[test]
fn an_incomplete_budget_stop_still_exits_zero() {
    // A budget stop is not a failure: the engine met its contract (run N
    // iterations), it just didn't finish the backlog in that span.
    let project = Project::empty();
    project.seed_tasks(2);
    let agent = project.script("agent.sh", "cat >/dev/null");

    project
        .ralph()
        .args(&["run", "--agent", agent.to_str().unwrap(), "--max-iterations", "1"])
        .passes()
        .code_eq(0);
}
