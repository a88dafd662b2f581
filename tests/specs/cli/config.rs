//! Specs for configuration loading errors.

use crate::prelude::*;

#[test]
fn missing_config_exits_with_config_code() {
    let ws = Workspace::empty();
    ws.cmt().args(&["plan", "app"]).exits_with(2).stderr_has("cmt.toml");
}

#[test]
fn invalid_toml_exits_with_config_code() {
    let ws = Workspace::with_config("[[dependency]\nproject = ");
    ws.cmt().args(&["plan", "app"]).exits_with(2).stderr_has("invalid config");
}

#[test]
fn duplicate_project_exits_with_config_code() {
    let ws = Workspace::with_config(
        r#"
[[project]]
name = "app"
source_directory = "app"

[[project]]
name = "app"
source_directory = "other"
"#,
    );
    ws.cmt().args(&["plan", "app"]).exits_with(2).stderr_has("duplicate project: app");
}

#[test]
fn model_for_unknown_project_exits_with_config_code() {
    let ws = Workspace::with_config(
        r#"
[[project]]
name = "app"
source_directory = "app"
"#,
    );
    ws.cmt().args(&["model", "nope"]).exits_with(2).stderr_has("unknown project: nope");
}
