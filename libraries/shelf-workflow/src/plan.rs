//! Move planning for the cleaner and merge workflows
//!
//! Planning only reads the filesystem. Files are visited in sorted order and
//! each destination is run through the collision resolver against everything
//! already claimed in this plan.

use crate::collision::{resolve_for, ClaimedSet};
use crate::options::{CleanerOptions, MergeOptions};
use crate::scanner::FileScanner;
use crate::Result;
use serde::Serialize;
use shelf_metadata::{MediaProbe, TagExtractor};
use std::path::{Path, PathBuf};

/// One planned move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveAction {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Destination was renamed to avoid a collision
    pub collision: bool,
}

/// Ordered moves for one run
///
/// Destinations are pairwise distinct and were free when the plan was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePlan {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    /// Template text for cleaner plans, `None` for merges
    pub template: Option<String>,
    pub files_scanned: usize,
    pub moves: Vec<MoveAction>,
    /// Files already at their destination
    pub skipped: Vec<PathBuf>,
}

impl MovePlan {
    /// Number of moves whose destination was renamed
    pub fn collisions(&self) -> usize {
        self.moves.iter().filter(|action| action.collision).count()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Accumulates moves while tracking claimed destinations
struct PlanBuilder {
    claimed: ClaimedSet,
    moves: Vec<MoveAction>,
    skipped: Vec<PathBuf>,
}

impl PlanBuilder {
    fn new() -> Self {
        Self {
            claimed: ClaimedSet::new(),
            moves: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn add(&mut self, source: PathBuf, desired: PathBuf) {
        if desired == source && !self.claimed.contains(&desired) {
            tracing::debug!("Already in place: {}", source.display());
            self.claimed.claim(desired);
            self.skipped.push(source);
            return;
        }

        let (destination, collision) = resolve_for(Some(&source), &desired, &self.claimed);
        self.claimed.claim(destination.clone());

        if destination == source {
            tracing::debug!("Already in place after renaming: {}", source.display());
            self.skipped.push(source);
            return;
        }

        if collision {
            tracing::debug!(
                "Collision at {}, using {}",
                desired.display(),
                destination.display()
            );
        }

        self.moves.push(MoveAction {
            source,
            destination,
            collision,
        });
    }

    fn finish(
        self,
        source_root: &Path,
        destination_root: &Path,
        template: Option<String>,
        files_scanned: usize,
    ) -> MovePlan {
        let plan = MovePlan {
            source_root: source_root.to_path_buf(),
            destination_root: destination_root.to_path_buf(),
            template,
            files_scanned,
            moves: self.moves,
            skipped: self.skipped,
        };

        tracing::info!(
            "Planned {} moves from {} ({} already in place, {} collisions)",
            plan.moves.len(),
            source_root.display(),
            plan.skipped.len(),
            plan.collisions()
        );
        plan
    }
}

/// Plan moving every library file to its templated destination
pub fn plan_cleaner(options: &CleanerOptions, probe: &dyn MediaProbe) -> Result<MovePlan> {
    let files = FileScanner::new().scan(&options.library_path, &options.extensions)?;
    let prefer_probe = options.use_ffprobe.resolve(probe);
    let extractor = TagExtractor::new(probe);
    let layout = options.template.hint_layout();

    let mut builder = PlanBuilder::new();
    for source in &files {
        // Folder hints come from the tree the file is organized under
        let hint_root = if source.starts_with(&options.destination_root) {
            &options.destination_root
        } else {
            &options.library_path
        };

        let tags = extractor.extract_in_layout(hint_root, source, &layout, prefer_probe);
        let extension = source.extension().and_then(|ext| ext.to_str());
        let desired = options
            .destination_root
            .join(options.template.render(&tags, extension));

        builder.add(source.clone(), desired);
    }

    Ok(builder.finish(
        &options.library_path,
        &options.destination_root,
        Some(options.template.to_string()),
        files.len(),
    ))
}

/// Plan mirroring the source library layout into the destination library
pub fn plan_merge(options: &MergeOptions) -> Result<MovePlan> {
    let files = FileScanner::new().scan(&options.source_library_path, &options.extensions)?;

    let mut builder = PlanBuilder::new();
    for source in &files {
        let Ok(relative) = source.strip_prefix(&options.source_library_path) else {
            tracing::warn!("Skipping file outside the source library: {}", source.display());
            continue;
        };
        let desired = options.destination_library_path.join(relative);
        builder.add(source.clone(), desired);
    }

    Ok(builder.finish(
        &options.source_library_path,
        &options.destination_library_path,
        None,
        files.len(),
    ))
}
