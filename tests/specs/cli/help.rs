use crate::prelude::*;

#[test]
fn top_level_help_lists_subcommands() {
    ralph()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("resume")
        .stdout_has("stop");
}

#[test]
fn run_help_lists_agent_flag() {
    ralph().args(&["run", "--help"]).passes().stdout_has("--agent");
}

#[test]
fn version_flag_prints_a_version() {
    ralph().args(&["--version"]).passes().stdout_has("ralph");
}
