use crate::prelude::*;

#[test]
fn run_against_a_live_lock_fails_without_force() {
    let project = Project::empty();
    project.seed_tasks(1);
    project.write_live_lock();
    let agent = project.script("agent.sh", "cat >/dev/null");

    project
        .ralph()
        .args(&["run", "--agent", agent.to_str().unwrap(), "--max-iterations", "1"])
        .fails()
        .stderr_has("lock held by pid");
}

#[test]
fn force_takes_over_a_live_lock() {
    let project = Project::empty();
    project.seed_tasks(1);
    project.write_live_lock();
    let agent = project.script("agent.sh", "cat >/dev/null");

    project
        .ralph()
        .args(&["run", "--agent", agent.to_str().unwrap(), "--max-iterations", "1", "--force"])
        .passes();
}

#[test]
fn stop_signals_the_recorded_pid() {
    let project = Project::empty();
    // A real, otherwise-idle child process stands in for the run `stop`
    // should reach — never the test process's own pid, which a stray
    // SIGTERM would take down along with the rest of the suite.
    let mut holder = std::process::Command::new("sleep").arg("30").spawn().expect("spawn sleep holder");
    project.write_lock(holder.id(), &ralph_storage::current_host());

    project.ralph().args(&["stop"]).passes().stdout_has("sent SIGTERM to pid");

    let status = holder.wait().expect("wait on signalled holder");
    assert!(!status.success(), "SIGTERM should have ended the holder process");
}
