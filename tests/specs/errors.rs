//! Specs for CLI-level error behavior.

use crate::prelude::*;

#[test]
fn no_arguments_prints_usage() {
    let project = Project::new();
    let output = project.osiris(&[]);
    assert_eq!(exit_code(&output), 2);
    assert!(stderr(&output).contains("Usage"));
}

#[test]
fn unknown_subcommand_fails() {
    let project = Project::new();
    let output = project.osiris(&["frobnicate"]);
    assert_eq!(exit_code(&output), 2);
}

#[test]
fn missing_oml_file_is_an_io_error() {
    let project = Project::new();
    let output = project.osiris(&["compile", "missing.yaml"]);
    assert_eq!(exit_code(&output), 1);
    assert!(!stderr(&output).is_empty());
}

#[test]
fn invalid_compile_mode_is_rejected() {
    let project = Project::with_csv_pipeline();
    let output = project.osiris(&["compile", "pipeline.yaml", "--compile", "sometimes"]);
    assert_eq!(exit_code(&output), 2);
    assert!(stderr(&output).contains("sometimes"));
}

#[test]
fn compile_without_components_dir_reports_unknown_component() {
    let project = Project::with_csv_pipeline();
    std::fs::remove_dir_all(project.root.join("components")).unwrap();

    let output = project.osiris(&["compile", "pipeline.yaml"]);
    assert_eq!(exit_code(&output), 2);
    assert!(stderr(&output).contains("filesystem.csv_extractor"));
}
