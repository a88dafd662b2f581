//! Specs for `cmt plan`.

use crate::prelude::*;

const LAYERED: &str = r#"
[[dependency]]
project = "app"
dependencies = [{ project = "lib" }, { project = "base" }]

[[dependency]]
project = "lib"
dependencies = [{ project = "base" }]
"#;

#[test]
fn plan_prints_one_heading_per_step() {
    let ws = Workspace::with_config(LAYERED);
    ws.cmt()
        .args(&["plan", "app"])
        .passes()
        .stdout_eq("Step 1\n  base\nStep 2\n  lib\nStep 3\n  app\n");
}

#[test]
fn plan_reads_config_from_explicit_path() {
    let ws = Workspace::with_config(LAYERED);
    let config = ws.config_path();
    cli()
        .args(&["--config", &config.display().to_string(), "plan", "lib"])
        .passes()
        .stdout_eq("Step 1\n  base\nStep 2\n  lib\n");
}

#[test]
fn plan_json_lists_steps_in_order() {
    let ws = Workspace::with_config(LAYERED);
    let run = ws.cmt().args(&["plan", "app", "--format", "json"]).passes();
    let json = run.stdout_json();
    let steps = json["steps"].as_array().cloned().unwrap_or_default();
    let projects: Vec<Vec<String>> = steps
        .iter()
        .map(|step| {
            step["dependencies"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|d| d["project"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .collect();
    assert_eq!(projects, vec![vec!["base"], vec!["lib"], vec!["app"]]);
}

#[test]
fn plan_only_includes_what_the_request_reaches() {
    let ws = Workspace::with_config(
        r#"
[[dependency]]
project = "app"
dependencies = [{ project = "lib" }]

[[dependency]]
project = "tool"
dependencies = [{ project = "other" }]
"#,
    );
    ws.cmt().args(&["plan", "app"]).passes().stdout_eq("Step 1\n  lib\nStep 2\n  app\n");
}

#[test]
fn plan_for_target_names_project_and_target() {
    let ws = Workspace::with_config(
        r#"
[[dependency]]
project = "app"
target = "gui"
dependencies = [{ project = "lib", target = "core" }]
"#,
    );
    ws.cmt()
        .args(&["plan", "app", "--target", "gui"])
        .passes()
        .stdout_eq("Step 1\n  lib:core\nStep 2\n  app:gui\n");
}

#[test]
fn undeclared_project_plans_as_a_single_step() {
    let ws = Workspace::with_config(LAYERED);
    ws.cmt().args(&["plan", "standalone"]).passes().stdout_eq("Step 1\n  standalone\n");
}

#[test]
fn cycle_exits_with_cycle_code() {
    let ws = Workspace::with_config(
        r#"
[[dependency]]
project = "a"
dependencies = [{ project = "b" }]

[[dependency]]
project = "b"
dependencies = [{ project = "a" }]
"#,
    );
    ws.cmt().args(&["plan", "a"]).exits_with(3).stderr_has("circular dependency");
}
