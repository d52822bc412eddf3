use crate::prelude::*;

/// A failing agent classifies as a transient error (see
/// `ralph_engine::agent_runner::classify_agent_error`), which the execution
/// engine retries with backoff up to `--retry-max-attempts` times. Once a
/// task's retries are exhausted the engine gives up on that task alone and
/// moves on, rather than aborting the whole run over one flaky task. With
/// nothing else left in the backlog the run just goes idle. Keep the backoff
/// knobs tiny so the retries don't slow the suite down.
#[test]
fn exhausting_retries_gives_up_on_the_task_and_goes_idle() {
    let project = Project::empty();
    project.seed_tasks(1);
    let agent = project.script("agent.sh", "cat >/dev/null; exit 7");

    project
        .ralph()
        .args(&[
            "run",
            "--agent",
            agent.to_str().unwrap(),
            "--retry-max-attempts",
            "2",
            "--retry-initial-delay-ms",
            "1",
            "--retry-backoff-cap-ms",
            "5",
        ])
        .passes()
        .stdout_has("retrying (1/2)")
        .stdout_has("retrying (2/2)")
        .stdout_has("stopped (idle)");

    assert!(project.has_session(), "an idle stop must leave the session behind for inspection");
    let session = project.session();
    assert_eq!(session["status"], "running");
    assert_eq!(session["tasks_completed"], 0);
}
