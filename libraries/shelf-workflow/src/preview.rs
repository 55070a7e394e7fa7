//! Label/value summaries shown before and after a run

use crate::apply::{ApplyReport, ApplySummary};
use crate::dedup::DedupPlan;
use crate::journal::ScriptDialect;
use crate::plan::MovePlan;

/// One `(label, value)` line
pub type PreviewItem = (String, String);

/// Characters of the signature shown in dedup previews
const SIGNATURE_PREFIX_LEN: usize = 10;

fn item(label: impl Into<String>, value: impl ToString) -> PreviewItem {
    (label.into(), value.to_string())
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Preview a move plan
///
/// `skipped_label` names files that need no move ("Already organized",
/// "Already merged"). At most `limit` moves are listed individually.
pub fn move_preview(plan: &MovePlan, limit: usize, skipped_label: &str) -> Vec<PreviewItem> {
    let mut items = vec![
        item("Files scanned", plan.files_scanned),
        item("Moves planned", plan.moves.len()),
        item(skipped_label, plan.skipped.len()),
    ];

    let collisions = plan.collisions();
    if collisions > 0 {
        items.push(item("Collisions resolved", collisions));
    }

    for action in plan.moves.iter().take(limit) {
        let relative = action
            .destination
            .strip_prefix(&plan.destination_root)
            .unwrap_or(&action.destination);
        let mut value = relative.display().to_string();
        if action.collision {
            value.push_str(" (renamed)");
        }
        items.push((format!("Move: {}", file_name(&action.source)), value));
    }

    if plan.moves.len() > limit {
        items.push(item("Additional moves", plan.moves.len() - limit));
    }
    items
}

/// Preview a dedup plan
pub fn dedup_preview(plan: &DedupPlan, limit: usize) -> Vec<PreviewItem> {
    let mut items = vec![
        item("Files scanned", plan.files_scanned),
        item("Files skipped", plan.skipped.len()),
        item("Duplicate groups", plan.duplicates.len()),
    ];

    for group in plan.duplicates.iter().take(limit) {
        let prefix: String = group.signature.chars().take(SIGNATURE_PREFIX_LEN).collect();
        items.push((
            format!("Keep: {}", file_name(&group.best().path)),
            format!(
                "Discard {} duplicates for signature {}...",
                group.candidates.len() - 1,
                prefix
            ),
        ));
    }

    if plan.duplicates.len() > limit {
        items.push(item("Additional duplicate groups", plan.duplicates.len() - limit));
    }
    items
}

/// Summarize an apply run
pub fn apply_summary(report: &ApplyReport, skipped_label: &str) -> Vec<PreviewItem> {
    let ApplySummary {
        attempted,
        moved,
        errors,
        skipped,
    } = report.summary;

    let mut items = vec![
        item("Moves attempted", attempted),
        item("Moves completed", moved),
        item("Errors", errors),
        item(skipped_label, skipped),
        item("Log file", report.log_path.display()),
    ];

    if let Some(script) = report.rollback_script(ScriptDialect::Posix) {
        items.push(item("Rollback script", script.display()));
    }
    if let Some(script) = report.rollback_script(ScriptDialect::PowerShell) {
        items.push(item("Rollback script (PowerShell)", script.display()));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::{AudioCandidate, DuplicateGroup};
    use crate::plan::MoveAction;
    use std::path::PathBuf;

    fn plan_with(moves: usize) -> MovePlan {
        let root = PathBuf::from("/music");
        MovePlan {
            source_root: root.clone(),
            destination_root: root.clone(),
            template: None,
            files_scanned: moves + 1,
            moves: (0..moves)
                .map(|i| MoveAction {
                    source: root.join(format!("track{:02}.mp3", i)),
                    destination: root.join("Muse").join(format!("{:02} - Song.mp3", i)),
                    collision: i == 0,
                })
                .collect(),
            skipped: vec![root.join("done.mp3")],
        }
    }

    #[test]
    fn test_move_preview_lists_counts_then_moves() {
        let items = move_preview(&plan_with(2), 8, "Already organized");
        assert_eq!(
            items,
            vec![
                item("Files scanned", 3),
                item("Moves planned", 2),
                item("Already organized", 1),
                item("Collisions resolved", 1),
                item("Move: track00.mp3", "Muse/00 - Song.mp3 (renamed)"),
                item("Move: track01.mp3", "Muse/01 - Song.mp3"),
            ]
        );
    }

    #[test]
    fn test_move_preview_truncates() {
        let items = move_preview(&plan_with(10), 8, "Already merged");
        assert_eq!(items.iter().filter(|(label, _)| label.starts_with("Move: ")).count(), 8);
        assert_eq!(items.last(), Some(&item("Additional moves", 2)));
    }

    #[test]
    fn test_dedup_preview() {
        let candidate = |path: &str| AudioCandidate {
            path: PathBuf::from(path),
            signature: "0123456789abcdef".to_string(),
            bitrate: None,
            sample_rate: None,
            format_name: None,
            size_bytes: 1,
        };
        let plan = DedupPlan {
            library_root: PathBuf::from("/music"),
            files_scanned: 4,
            duplicates: vec![DuplicateGroup {
                signature: "0123456789abcdef".to_string(),
                candidates: vec![candidate("/music/a.mp3"), candidate("/music/b/a.mp3")],
                best: 1,
            }],
            skipped: Vec::new(),
        };

        let items = dedup_preview(&plan, 8);
        assert_eq!(items[2], item("Duplicate groups", 1));
        assert_eq!(
            items[3],
            item("Keep: a.mp3", "Discard 1 duplicates for signature 0123456789...")
        );
    }
}
