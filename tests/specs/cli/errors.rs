use crate::prelude::*;

#[test]
fn run_without_tracker_file_fails_with_a_clear_message() {
    let project = Project::empty();

    project.ralph().args(&["run", "--agent", "true"]).fails().stderr_has("tracker file not found");
}

#[test]
fn resume_without_a_persisted_session_fails() {
    let project = Project::empty();
    project.seed_tasks(1);

    project.ralph().args(&["resume", "--agent", "true"]).fails().stderr_has("no persisted session found");
}

#[test]
fn stop_without_a_live_holder_fails() {
    let project = Project::empty();

    project.ralph().args(&["stop"]).fails().stderr_has("no run is holding");
}
