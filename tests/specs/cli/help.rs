//! CLI help output specs

use crate::prelude::*;

#[test]
fn cmt_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn cmt_help_lists_subcommands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("plan")
        .stdout_has("configure")
        .stdout_has("build")
        .stdout_has("model");
}

#[test]
fn cmt_plan_help_shows_format_option() {
    cli().args(&["plan", "--help"]).passes().stdout_has("--format");
}

#[test]
fn cmt_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    cli().args(&["frobnicate"]).exits_with(2).stderr_has("Usage:");
}
