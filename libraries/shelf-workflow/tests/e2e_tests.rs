//! End-to-end tests for plan, apply, and rollback
//!
//! Tags come from `ContentProbe`, so no external probe is needed.

use shelf_workflow::{
    LibraryCleaner, LibraryMerge, MovePlan, RawOptions, Workflow, WorkflowContext, WorkflowError,
    WorkflowRunner,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use test_helpers::{init_logging, options, write_tagged, ContentProbe};

fn ctx() -> WorkflowContext {
    init_logging();
    WorkflowContext::new(Box::new(ContentProbe))
}

fn destinations(plan: &MovePlan) -> Vec<PathBuf> {
    plan.moves.iter().map(|m| m.destination.clone()).collect()
}

#[test]
fn test_muse_scenario_plan_and_apply() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let original = root.join("track01.mp3");
    write_tagged(&original, "Muse", "Origin of Symmetry", "New Born", "1");

    let ctx = ctx();
    let raw = options(&[("library_path", root)]);
    let plan = LibraryCleaner.build_plan(&raw, &ctx).unwrap();

    let expected = root
        .join("Muse")
        .join("Origin of Symmetry")
        .join("01 - New Born.mp3");
    assert_eq!(destinations(&plan), vec![expected.clone()]);
    assert_eq!(plan.moves[0].source, original);

    let preview = LibraryCleaner.preview(&plan, &ctx);
    let relative = Path::new("Muse")
        .join("Origin of Symmetry")
        .join("01 - New Born.mp3");
    assert!(preview.contains(&(
        "Move: track01.mp3".to_string(),
        relative.display().to_string()
    )));

    let result = LibraryCleaner.apply(&raw, plan, &ctx).unwrap();
    assert!(result.success);
    assert!(expected.exists());
    assert!(!original.exists());

    let script = result.rollback_script.clone().unwrap();
    assert!(script.starts_with(root.join(".library_cleaner")));
    assert!(result.rollback_powershell_script.is_none());
    assert!(result
        .summary_items
        .contains(&("Moves completed".to_string(), "1".to_string())));
}

#[cfg(unix)]
#[test]
fn test_muse_scenario_rollback_restores_original() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let original = root.join("track01.mp3");
    write_tagged(&original, "Muse", "Origin of Symmetry", "New Born", "1");
    let before = fs::read(&original).unwrap();

    let ctx = ctx();
    let raw = options(&[("library_path", root)]);
    let plan = Workflow::Cleaner.build_plan(&raw, &ctx).unwrap();
    let result = Workflow::Cleaner.apply(&raw, plan, &ctx).unwrap();
    let script = result.rollback_script_for_host().unwrap().to_path_buf();

    let rollback = Workflow::Cleaner.rollback(&script).unwrap();
    assert!(rollback.success, "{:?}", rollback.summary_items);
    assert_eq!(fs::read(&original).unwrap(), before);
    assert!(!root
        .join("Muse")
        .join("Origin of Symmetry")
        .join("01 - New Born.mp3")
        .exists());

    // Guards turn a second run into a no-op
    let again = Workflow::Cleaner.rollback(&script).unwrap();
    assert!(again.success);
    assert_eq!(fs::read(&original).unwrap(), before);
}

#[test]
fn test_plan_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_tagged(&root.join("a.mp3"), "Muse", "Showbiz", "Sunburn", "1");
    write_tagged(&root.join("b.mp3"), "Muse", "Showbiz", "Sunburn", "1");
    write_tagged(&root.join("c.flac"), "Muse", "Showbiz", "Muscle Museum", "2");

    let ctx = ctx();
    let raw = options(&[("library_path", root)]);
    let first = LibraryCleaner.build_plan(&raw, &ctx).unwrap();
    let second = LibraryCleaner.build_plan(&raw, &ctx).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.moves.len(), 3);
}

#[test]
fn test_second_plan_after_apply_is_empty() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_tagged(&root.join("a.mp3"), "Muse", "Showbiz", "Sunburn", "1");
    write_tagged(&root.join("dup").join("a.mp3"), "Muse", "Showbiz", "Sunburn", "1");
    write_tagged(&root.join("x").join("y").join("z.ogg"), "", "", "", "");

    let ctx = ctx();
    let raw = options(&[("library_path", root)]);
    let plan = LibraryCleaner.build_plan(&raw, &ctx).unwrap();
    assert_eq!(plan.moves.len(), 3);
    LibraryCleaner.apply(&raw, plan, &ctx).unwrap();

    let replan = LibraryCleaner.build_plan(&raw, &ctx).unwrap();
    assert!(replan.is_empty(), "{:?}", replan.moves);
    assert_eq!(replan.skipped.len(), 3);
}

#[test]
fn test_second_plan_without_probe_is_empty() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("Muse - Showbiz - 01 - Sunburn.mp3"), b"x").unwrap();
    fs::write(root.join("Hysteria.mp3"), b"y").unwrap();

    let no_probe = WorkflowContext::new(Box::new(shelf_metadata::NoProbe));
    let raw = options(&[("library_path", root)]);
    let plan = LibraryCleaner.build_plan(&raw, &no_probe).unwrap();
    assert_eq!(plan.moves.len(), 2);
    LibraryCleaner.apply(&raw, plan, &no_probe).unwrap();

    assert!(root.join("Muse").join("Showbiz").join("01 - Sunburn.mp3").exists());
    assert!(root
        .join("Unknown Artist")
        .join("Unknown Album")
        .join("00 - Hysteria.mp3")
        .exists());

    let replan = LibraryCleaner.build_plan(&raw, &no_probe).unwrap();
    assert!(replan.is_empty(), "{:?}", replan.moves);
}

#[test]
fn test_custom_template_without_probe_reaches_fixpoint() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("Muse - Hysteria.mp3"), b"x").unwrap();
    fs::write(root.join("Absolution - Sing for Absolution.mp3"), b"y").unwrap();

    let no_probe = WorkflowContext::new(Box::new(shelf_metadata::NoProbe));
    let mut raw = options(&[("library_path", root)]);
    raw.insert("template".to_string(), "{artist}/{title}".to_string());

    let plan = LibraryCleaner.build_plan(&raw, &no_probe).unwrap();
    assert_eq!(plan.moves.len(), 2);
    assert!(LibraryCleaner.apply(&raw, plan, &no_probe).unwrap().success);

    let organized = root.join("Muse").join("Hysteria.mp3");
    assert!(organized.exists());
    assert!(root
        .join("Absolution")
        .join("Sing for Absolution.mp3")
        .exists());

    let replan = LibraryCleaner.build_plan(&raw, &no_probe).unwrap();
    assert!(replan.is_empty(), "{:?}", replan.moves);
    assert_eq!(replan.skipped.len(), 2);
}

#[test]
fn test_collisions_get_numbered_suffixes() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let target = root.join("Muse").join("Showbiz").join("01 - Sunburn.mp3");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, b"already here, no tags").unwrap();

    write_tagged(&root.join("in").join("a.mp3"), "Muse", "Showbiz", "Sunburn", "1");
    write_tagged(&root.join("in").join("b.mp3"), "Muse", "Showbiz", "Sunburn", "1");

    let ctx = ctx();
    let raw = options(&[("library_path", root), ("destination_root", root)]);
    let plan = LibraryCleaner.build_plan(&raw, &ctx).unwrap();

    let album = root.join("Muse").join("Showbiz");
    let planned: Vec<PathBuf> = plan
        .moves
        .iter()
        .filter(|m| m.source.starts_with(root.join("in")))
        .map(|m| m.destination.clone())
        .collect();
    assert_eq!(
        planned,
        vec![
            album.join("01 - Sunburn (1).mp3"),
            album.join("01 - Sunburn (2).mp3"),
        ]
    );
    assert!(plan
        .moves
        .iter()
        .filter(|m| m.source.starts_with(root.join("in")))
        .all(|m| m.collision));
}

#[test]
fn test_partial_failure_is_isolated() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_tagged(&root.join("1.mp3"), "A", "X", "One", "1");
    write_tagged(&root.join("2.mp3"), "A", "X", "Two", "2");
    write_tagged(&root.join("3.mp3"), "A", "X", "Three", "3");

    let ctx = ctx();
    let raw = options(&[("library_path", root)]);
    let plan = LibraryCleaner.build_plan(&raw, &ctx).unwrap();
    assert_eq!(plan.moves.len(), 3);

    // Something else takes the second destination between plan and apply
    let blocked = plan.moves[1].destination.clone();
    fs::create_dir_all(blocked.parent().unwrap()).unwrap();
    fs::write(&blocked, b"intruder").unwrap();

    let result = LibraryCleaner.apply(&raw, plan, &ctx).unwrap();
    assert!(!result.success);
    assert!(result.summary_items.contains(&("Moves attempted".to_string(), "3".to_string())));
    assert!(result.summary_items.contains(&("Moves completed".to_string(), "2".to_string())));
    assert!(result.summary_items.contains(&("Errors".to_string(), "1".to_string())));

    assert_eq!(fs::read(&blocked).unwrap(), b"intruder");
    assert!(root.join("2.mp3").exists());
    assert!(root.join("A").join("X").join("01 - One.mp3").exists());
    assert!(root.join("A").join("X").join("03 - Three.mp3").exists());

    let script = result.rollback_script.unwrap();
    let text = fs::read_to_string(&script).unwrap();
    assert!(text.contains("undo_2()"));
    assert!(!text.contains("undo_3()"));

    #[cfg(unix)]
    {
        let rollback = Workflow::Cleaner.rollback(&script).unwrap();
        assert!(rollback.success);
        assert!(root.join("1.mp3").exists());
        assert!(root.join("3.mp3").exists());
        assert_eq!(fs::read(&blocked).unwrap(), b"intruder");
    }
}

#[test]
fn test_apply_log_records_every_outcome() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_tagged(&root.join("1.mp3"), "A", "X", "One", "1");

    let ctx = ctx();
    let raw = options(&[("library_path", root)]);
    let plan = LibraryCleaner.build_plan(&raw, &ctx).unwrap();
    let result = LibraryCleaner.apply(&raw, plan, &ctx).unwrap();

    let log_path = result
        .summary_items
        .iter()
        .find(|(label, _)| label == "Log file")
        .map(|(_, value)| PathBuf::from(value))
        .unwrap();
    let log: serde_json::Value = serde_json::from_str(&fs::read_to_string(log_path).unwrap()).unwrap();

    assert_eq!(log["workflow"], "library_cleaner");
    assert_eq!(log["complete"], true);
    assert_eq!(log["options"]["use_ffprobe"], "auto");
    assert_eq!(log["results"][0]["status"], "moved");
    assert_eq!(log["results"][0]["collision"], false);
    assert!(log["timestamp"].as_str().unwrap().contains('T'));
}

#[test]
fn test_merge_moves_and_writes_both_scripts() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("old");
    let destination = temp.path().join("new");
    fs::create_dir_all(source.join("Muse").join("Showbiz")).unwrap();
    fs::create_dir_all(&destination).unwrap();
    fs::write(source.join("Muse").join("Showbiz").join("01 - Sunburn.mp3"), b"a").unwrap();
    fs::write(source.join("notes.txt"), b"not audio").unwrap();

    let ctx = ctx();
    let raw = options(&[
        ("source_library_path", source.as_path()),
        ("destination_library_path", destination.as_path()),
    ]);
    let plan = LibraryMerge.build_plan(&raw, &ctx).unwrap();
    assert_eq!(plan.files_scanned, 1);

    let result = LibraryMerge.apply(&raw, plan, &ctx).unwrap();
    let moved = destination.join("Muse").join("Showbiz").join("01 - Sunburn.mp3");
    assert!(moved.exists());
    assert!(source.join("notes.txt").exists());

    let sh = result.rollback_script.clone().unwrap();
    let ps1 = result.rollback_powershell_script.clone().unwrap();
    assert!(sh.starts_with(destination.join(".library_merge")));
    assert_eq!(ps1.extension().unwrap(), "ps1");
    assert!(result
        .summary_items
        .iter()
        .any(|(label, _)| label == "Rollback script (PowerShell)"));

    #[cfg(unix)]
    {
        let rollback = Workflow::Merge.rollback(&sh).unwrap();
        assert!(rollback.success);
        assert!(source.join("Muse").join("Showbiz").join("01 - Sunburn.mp3").exists());
        assert!(!moved.exists());
    }
}

#[test]
fn test_validation_errors_come_back_together() {
    let mut raw = RawOptions::new();
    raw.insert("extensions".to_string(), ",".to_string());
    raw.insert("template".to_string(), "{artist".to_string());

    let err = Workflow::Cleaner.build_plan(&raw, &ctx()).unwrap_err();
    match err {
        WorkflowError::Validation(errors) => {
            assert_eq!(errors.len(), 3);
            assert!(errors.mentions("library_path"));
        }
        other => panic!("expected validation errors, got {other}"),
    }
}

#[test]
fn test_dedup_groups_identical_content() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("a.mp3"), b"same content").unwrap();
    fs::create_dir(root.join("b")).unwrap();
    fs::write(root.join("b").join("renamed.flac"), b"same content").unwrap();
    fs::write(root.join("c.mp3"), b"same contenT").unwrap();

    let ctx = ctx();
    let mut raw = options(&[("library_path", root)]);
    raw.insert("use_ffprobe".to_string(), "false".to_string());

    let plan = Workflow::Dedup.build_plan(&raw, &ctx).unwrap();
    let preview = Workflow::Dedup.preview(&plan, &ctx).unwrap();

    assert!(preview.contains(&("Files scanned".to_string(), "3".to_string())));
    assert!(preview.contains(&("Duplicate groups".to_string(), "1".to_string())));
    // Equal bitrate and rate; lossless wins on format
    assert!(preview
        .iter()
        .any(|(label, value)| label == "Keep: renamed.flac" && value.starts_with("Discard 1 duplicates")));
}
