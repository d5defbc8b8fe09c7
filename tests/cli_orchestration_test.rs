use fw_release::cli::{
    run_publish_workflow, run_stamp_workflow, BuildTarget, PublishWorkflowArgs,
};
use fw_release::config::Settings;
use fw_release::env_file::EnvMap;
use fw_release::git::MockRepository;
use fw_release::process::RecordingRunner;
use fw_release::resolver::PublishMode;
use fw_release::skip::SkipReason;
use fw_release::tagger::TagOutcome;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project(version: &str, counter: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("VERSION"), version).unwrap();
    fs::write(dir.path().join(".buildnumber"), counter).unwrap();
    fs::create_dir_all(dir.path().join("tools")).unwrap();
    fs::write(dir.path().join("tools/publish-firmware.ps1"), "").unwrap();
    fs::write(dir.path().join("tools/publish-http.ps1"), "").unwrap();
    dir
}

fn target(root: &Path, environment_name: &str) -> BuildTarget {
    BuildTarget {
        project_root: root.to_path_buf(),
        environment_name: environment_name.to_string(),
    }
}

fn publish_args(root: &Path, environment_name: &str) -> PublishWorkflowArgs {
    PublishWorkflowArgs {
        target: target(root, environment_name),
        build_dir: None,
        dry_run: false,
    }
}

fn env(pairs: &[(&str, &str)]) -> EnvMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Simulates the host build producing the stamped artifact.
fn write_artifact(settings: &Settings, root: &Path, environment_name: &str, file_name: &str) {
    let build_dir = settings.build_dir(root, environment_name);
    fs::create_dir_all(&build_dir).unwrap();
    fs::write(build_dir.join(file_name), b"\x7fFW").unwrap();
}

#[test]
fn test_release_build_end_to_end() {
    let dir = project("01.02", "124");
    let settings = Settings::default();
    let repo = MockRepository::new().with_branch("main");
    let env_name = "esp01_1m_release";

    let strings =
        run_stamp_workflow(&target(dir.path(), env_name), &settings, Some(&repo)).unwrap();
    assert_eq!(strings.short, "01.02.125");
    assert_eq!(strings.long, "01.02.main:125");
    assert_eq!(strings.artifact_file_name(), "esp01_1m_release-01.02.125.bin");
    write_artifact(&settings, dir.path(), env_name, &strings.artifact_file_name());

    let runner = RecordingRunner::new();
    let result = run_publish_workflow(
        &publish_args(dir.path(), env_name),
        &settings,
        EnvMap::new(),
        &runner,
        Some(&repo),
    );

    assert!(result.published());
    assert_eq!(result.version_short, "01.02.125");
    assert_eq!(result.config.mode, PublishMode::Ftp);
    assert!(result.config.stable_only);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].value_of("-Version"), Some("01.02.125"));
    assert!(calls[0].has_flag("-StableOnly"));

    // tagging was not requested
    assert!(matches!(
        result.tag,
        Some(TagOutcome::Skipped(SkipReason::TaggingDisabled))
    ));
    assert!(repo.created_tags().is_empty());
}

#[test]
fn test_non_release_build_has_no_side_effects() {
    let dir = project("01.02", "9");
    let settings = Settings::default();
    let runner = RecordingRunner::new();
    let repo = MockRepository::new();

    let result = run_publish_workflow(
        &publish_args(dir.path(), "esp01_1m"),
        &settings,
        env(&[("GIT_TAG_ON_RELEASE", "1")]),
        &runner,
        Some(&repo),
    );

    assert!(matches!(result.skipped, Some(SkipReason::NotEligible { .. })));
    assert!(result.publish.is_none());
    assert!(runner.calls().is_empty());
    assert!(repo.created_tags().is_empty());
    assert_eq!(
        fs::read_to_string(dir.path().join(".buildnumber")).unwrap(),
        "9"
    );
}

#[test]
fn test_publish_then_tag() {
    let dir = project("1.2", "10");
    let settings = Settings::default();
    let repo = MockRepository::new().with_branch("main");
    let env_name = "env";

    let strings =
        run_stamp_workflow(&target(dir.path(), env_name), &settings, Some(&repo)).unwrap();
    write_artifact(&settings, dir.path(), env_name, &strings.artifact_file_name());

    let runner = RecordingRunner::new();
    let result = run_publish_workflow(
        &publish_args(dir.path(), env_name),
        &settings,
        env(&[("FTP_AUTO_PUBLISH", "1"), ("GIT_TAG_ON_RELEASE", "1")]),
        &runner,
        Some(&repo),
    );

    assert!(result.published());
    match result.tag {
        Some(TagOutcome::Tagged { ref tag, .. }) => assert_eq!(tag, "v01.02.11"),
        ref other => panic!("unexpected tag outcome: {:?}", other),
    }
    assert_eq!(
        repo.pushes(),
        vec![("origin".to_string(), vec!["v01.02.11".to_string()])]
    );
}

#[test]
fn test_failed_publish_is_reported_and_not_tagged() {
    let dir = project("01.02", "1");
    let settings = Settings::default();
    let repo = MockRepository::new();
    let runner = RecordingRunner::new().then_exit(2, "connection refused");

    let result = run_publish_workflow(
        &publish_args(dir.path(), "esp01_1m_release"),
        &settings,
        env(&[("GIT_TAG_ON_RELEASE", "1")]),
        &runner,
        Some(&repo),
    );

    let outcome = result.publish.as_ref().unwrap();
    assert!(!outcome.success);
    assert!(outcome
        .error
        .as_ref()
        .unwrap()
        .to_string()
        .contains("connection refused"));
    assert_eq!(runner.calls().len(), 1);
    assert!(matches!(
        result.tag,
        Some(TagOutcome::Skipped(SkipReason::PublishFailed))
    ));
    assert!(repo.created_tags().is_empty());
}

#[test]
fn test_http_mode_without_url_executes_nothing() {
    let dir = project("01.02", "1");
    let settings = Settings::default();
    let runner = RecordingRunner::new();

    let result = run_publish_workflow(
        &publish_args(dir.path(), "esp01_1m_release"),
        &settings,
        env(&[("PUBLISH_MODE", "http")]),
        &runner,
        None,
    );

    let outcome = result.publish.as_ref().unwrap();
    assert_eq!(outcome.transport, PublishMode::Http);
    assert!(outcome.is_configuration_error());
    assert!(runner.calls().is_empty());
}

#[test]
fn test_dry_run_executes_nothing() {
    let dir = project("01.02", "1");
    let settings = Settings::default();
    let runner = RecordingRunner::new();
    let repo = MockRepository::new();

    let mut args = publish_args(dir.path(), "esp01_1m_release");
    args.dry_run = true;
    let result = run_publish_workflow(
        &args,
        &settings,
        env(&[("GIT_TAG_ON_RELEASE", "1")]),
        &runner,
        Some(&repo),
    );

    assert_eq!(result.skipped, Some(SkipReason::DryRun));
    assert!(runner.calls().is_empty());
    assert!(repo.created_tags().is_empty());
}

#[test]
fn test_counter_advances_even_without_publish() {
    let dir = project("01.02", "41");
    let settings = Settings::default();

    run_stamp_workflow(&target(dir.path(), "esp01_1m"), &settings, None).unwrap();
    let second = run_stamp_workflow(&target(dir.path(), "esp01_1m"), &settings, None).unwrap();

    assert_eq!(second.short, "01.02.43");
    assert_eq!(second.long, "01.02.local:43");
    assert_eq!(
        fs::read_to_string(dir.path().join(".buildnumber")).unwrap(),
        "43"
    );
}
