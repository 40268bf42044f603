#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for running pipelines.
//!
//! Each test builds a throwaway project on disk, loads its `jsforge.toml`,
//! and runs tasks through the orchestrator with the built-in transforms.

mod common;

use common::{ENTRY, ProjectBuilder};
use jsforge::error::{ConfigError, ResolutionError};
use jsforge::orchestrator::{RunFailure, RunState, TaskOutcome};
use jsforge::tasks::graph;

// ---------------------------------------------------------------------------
// Snapshot: resolved build pipeline
// ---------------------------------------------------------------------------

/// `build` resolves to lint, bundle, minify regardless of declaration order.
#[test]
fn build_resolution() {
    let project = ProjectBuilder::pipeline().build();
    let config = project.load();
    let names: Vec<&str> = graph::resolve(&config, &["build"])
        .unwrap()
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    insta::assert_snapshot!("build_resolution", names.join("\n"));
}

// ---------------------------------------------------------------------------
// Successful runs
// ---------------------------------------------------------------------------

#[test]
fn build_runs_end_to_end() {
    let project = ProjectBuilder::pipeline().build();
    let report = project.run(&["build"], false);

    assert!(report.succeeded(), "state: {:?}", report.state);
    assert_eq!(
        report.task_names().collect::<Vec<_>>(),
        vec!["lint", "bundle", "minify"]
    );
    assert!(
        report
            .entries
            .iter()
            .all(|(_, outcome)| matches!(outcome, TaskOutcome::Succeeded { .. }))
    );

    let minified = project.read("build/picogl.min.js");
    assert!(minified.starts_with("/* v1.2.3*/"), "got: {minified}");
    assert!(!minified.contains("Double a number"), "comments are stripped");

    let bundled = project.read("build/picogl.js");
    assert!(bundled.contains("exports.version = \"1.2.3\";"));
    let util = bundled.find("modules[\"src/util.js\"]").unwrap();
    let entry = bundled.find("modules[\"src/picogl.js\"]").unwrap();
    assert!(util < entry, "dependency is defined before its dependent");
}

#[test]
fn default_alias_runs_build() {
    let project = ProjectBuilder::pipeline().build();
    let report = project.run(&["default"], false);
    assert!(report.succeeded());
    assert_eq!(report.entries.len(), 3);
    assert!(project.exists("build/picogl.min.js"));
}

#[test]
fn docs_task_writes_pages_and_index() {
    let project = ProjectBuilder::pipeline().build();
    let report = project.run(&["docs"], false);
    assert!(report.succeeded(), "state: {:?}", report.state);

    let index = project.read("docs/index.md");
    assert!(index.contains("[src/picogl.js](picogl.md)"));
    assert!(index.contains("[src/util.js](util.md)"));
    assert!(project.read("docs/util.md").contains("Double a number."));
}

#[test]
fn dry_run_writes_nothing() {
    let project = ProjectBuilder::pipeline().build();
    // minify reads bundle's output, so run bundle alone
    let report = project.run(&["lint", "bundle"], true);
    assert!(report.succeeded());
    assert!(
        report
            .entries
            .iter()
            .all(|(_, outcome)| matches!(outcome, TaskOutcome::DryRun { .. }))
    );
    assert!(!project.exists("build"));
    assert!(
        project
            .log
            .lines()
            .iter()
            .any(|l| l.starts_with("dry_run: would write build/picogl.js"))
    );
}

#[test]
fn rerun_replaces_outputs() {
    let project = ProjectBuilder::pipeline().build();
    assert!(project.run(&["build"], false).succeeded());
    let first = project.read("build/picogl.min.js");
    assert!(project.run(&["build"], false).succeeded());
    assert_eq!(project.read("build/picogl.min.js"), first);
    assert!(!project.exists("build/picogl.min.js.jsforge.tmp"));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn lint_failure_stops_the_pipeline() {
    let project = ProjectBuilder::pipeline()
        .with_file(
            "src/util.js",
            "\"use strict\";\nexports.isOne = function (x) { return x == 1; };\n",
        )
        .build();
    let report = project.run(&["build"], false);

    assert_eq!(report.entries.len(), 1);
    let (name, outcome) = &report.entries[0];
    assert_eq!(name, "lint");
    match outcome {
        TaskOutcome::Failed { cause } => assert!(cause.contains("src/util.js:2"), "{cause}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.not_run, vec!["bundle", "minify"]);
    assert!(!project.exists("build"));
}

#[test]
fn every_lint_violation_is_reported() {
    let project = ProjectBuilder::pipeline()
        .with_file("src/util.js", "exports.a = function (x) { return x == 1; };\n")
        .build();
    let report = project.run(&["lint"], false);
    let TaskOutcome::Failed { cause } = &report.entries[0].1 else {
        panic!("lint should fail");
    };
    assert!(cause.starts_with("2 lint violation(s)"), "{cause}");
    assert!(cause.contains("[strict]"));
    assert!(cause.contains("[eqeqeq]"));
}

#[test]
fn unknown_task_fails_resolution() {
    let project = ProjectBuilder::pipeline().build();
    let report = project.run(&["nonexistent"], false);
    assert!(report.entries.is_empty());
    assert!(matches!(
        report.state,
        RunState::Failed(RunFailure::Resolution(ResolutionError::UnknownName(ref n)))
            if n == "nonexistent"
    ));
}

#[test]
fn minify_without_bundle_names_the_producer() {
    let project = ProjectBuilder::pipeline().build();
    let report = project.run(&["minify"], false);
    let TaskOutcome::Failed { cause } = &report.entries[0].1 else {
        panic!("minify should fail");
    };
    assert!(cause.contains("task 'bundle'"), "{cause}");
}

#[test]
fn missing_module_fails_bundle_and_keeps_lint_result() {
    let project = ProjectBuilder::pipeline()
        .with_file(
            "src/picogl.js",
            &ENTRY.replace("require(\"./util\")", "require(\"./missing\")"),
        )
        .build();
    let report = project.run(&["build"], false);
    assert_eq!(report.entries.len(), 2);
    assert!(matches!(report.entries[0].1, TaskOutcome::Succeeded { .. }));
    assert!(matches!(report.entries[1].1, TaskOutcome::Failed { .. }));
    assert!(!project.exists("build/picogl.js"));
}

// ---------------------------------------------------------------------------
// Load-time errors
// ---------------------------------------------------------------------------

#[test]
fn alias_cycle_rejected_at_load() {
    let project = ProjectBuilder::pipeline()
        .with_config(&format!("{}\n[aliases]\na = [\"b\"]\nb = [\"a\"]\n", common::PIPELINE))
        .build();
    let err = project.try_load().unwrap_err();
    assert!(matches!(err, ConfigError::AliasCycle(_)));
    assert_eq!(err.to_string(), "Alias cycle detected: a → b → a");
}

#[test]
fn duplicate_destination_rejected_at_load() {
    let project = ProjectBuilder::pipeline()
        .with_config(&format!(
            "{}\n[tasks.copy]\ntransform = \"bundle\"\nsources = \"src/util.js\"\ndestination = \"build/picogl.js\"\n",
            common::PIPELINE
        ))
        .build();
    assert!(matches!(
        project.try_load().unwrap_err(),
        ConfigError::DuplicateDestination { .. }
    ));
}

#[test]
fn json_config_is_equivalent() {
    let project = ProjectBuilder::new()
        .with_file(
            "jsforge.json",
            r#"{
                "package": { "name": "picogl", "version": "1.2.3" },
                "tasks": {
                    "bundle": { "sources": ["src/picogl.js"], "destination": "build/picogl.js" },
                    "minify": {
                        "sources": "build/picogl.js",
                        "destination": "build/picogl.min.js",
                        "options": { "banner": "/* v%%VERSION%%*/" }
                    }
                }
            }"#,
        )
        .with_file("src/picogl.js", common::ENTRY)
        .with_file("src/util.js", common::UTIL)
        .build();
    let config = jsforge::config::Config::load(
        &project.path().join("jsforge.json"),
        project.path(),
        &jsforge::transforms::TransformRegistry::with_builtins(),
    )
    .unwrap();
    assert_eq!(config.alias("build").unwrap().steps, vec!["bundle", "minify"]);
}
