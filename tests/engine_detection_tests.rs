//! Integration tests for engine detection on extracted packages
//!
//! These tests verify:
//! - Detection against real directories (DiskTree)
//! - Only a top-level marker directory counts
//! - The detection stage reports the engine name

use camino::Utf8PathBuf;
use scorm_processor::EngineVariant;
use scorm_processor::progress::{EventKind, ProgressReporter};
use scorm_processor::services::{detect_engine_stage, detect_engine_variant};
use scorm_processor::tree::{DiskTree, PackageTree};
use std::fs;
use tempfile::TempDir;

fn disk_tree(temp: &TempDir) -> DiskTree {
    DiskTree::new(Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap())
}

#[test]
fn test_detect_variant_a_on_disk() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("scorm")).unwrap();
    fs::write(temp.path().join("imsmanifest.xml"), "<manifest/>").unwrap();

    assert_eq!(detect_engine_variant(&disk_tree(&temp)), EngineVariant::VariantA);
}

#[test]
fn test_empty_marker_directory_still_counts() {
    let temp = TempDir::new().unwrap();
    let mut tree = disk_tree(&temp);
    tree.create_dir_all("scorm").unwrap();

    assert_eq!(detect_engine_variant(&tree), EngineVariant::VariantA);
}

#[test]
fn test_detect_variant_b_on_disk() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("xmls")).unwrap();
    fs::create_dir_all(temp.path().join("content/scorm")).unwrap();
    fs::write(temp.path().join("scorm.js"), "//").unwrap();

    assert_eq!(detect_engine_variant(&disk_tree(&temp)), EngineVariant::VariantB);
}

#[test]
fn test_detection_stage_reports_engine() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("scorm")).unwrap();
    let tree = disk_tree(&temp);

    let mut events = Vec::new();
    let mut progress = ProgressReporter::new(&mut events);
    let variant = detect_engine_stage(&tree, &mut progress);
    drop(progress);

    assert_eq!(variant, EngineVariant::VariantA);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Action);
    assert_eq!(events[0].text, "Engine Type detected: iengine5");
}
