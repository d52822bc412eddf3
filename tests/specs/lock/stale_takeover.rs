use crate::prelude::*;

#[test]
fn run_takes_over_a_stale_lock_without_force() {
    let project = Project::empty();
    project.seed_tasks(1);
    project.write_stale_lock();
    let agent = project.script("agent.sh", "cat >/dev/null");

    project
        .ralph()
        .args(&["run", "--agent", agent.to_str().unwrap(), "--max-iterations", "1"])
        .passes()
        .stdout_has("starting run with 1 task");
}

#[test]
fn stop_against_a_stale_lock_reports_nothing_to_signal() {
    let project = Project::empty();
    project.write_stale_lock();

    project.ralph().args(&["stop"]).passes().stdout_has("stale lock");
}
