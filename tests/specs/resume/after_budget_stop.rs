use crate::prelude::*;

#[test]
fn resume_continues_the_iteration_count_from_where_it_stopped() {
    let project = Project::empty();
    project.seed_tasks(1);
    let agent = project.script("agent.sh", "cat >/dev/null");

    project
        .ralph()
        .args(&["run", "--agent", agent.to_str().unwrap(), "--max-iterations", "2"])
        .passes();
    assert!(project.has_session());
    assert_eq!(project.session()["current_iteration"], 2);

    project
        .ralph()
        .args(&["resume", "--agent", agent.to_str().unwrap(), "--max-iterations", "4"])
        .passes()
        .stdout_has("iteration 2, 0/1 tasks completed")
        .stdout_has("stopped (max_iterations) after 4 iteration(s)");

    assert!(project.has_session(), "still incomplete, so still resumable");
    assert_eq!(project.session()["current_iteration"], 4);
}

#[test]
fn resume_without_force_does_not_conflict_with_its_own_prior_lock() {
    // The first run's `LockGuard` releases the lock on a clean process exit,
    // so a follow-up `resume` against the same directory never needs
    // `--force` in the first place.
    let project = Project::empty();
    project.seed_tasks(1);
    let agent = project.script("agent.sh", "cat >/dev/null");

    project.ralph().args(&["run", "--agent", agent.to_str().unwrap(), "--max-iterations", "1"]).passes();
    assert!(!project.lock_path().is_file(), "the lock must be released when the process exits cleanly");

    project.ralph().args(&["resume", "--agent", agent.to_str().unwrap(), "--max-iterations", "2"]).passes();
}
