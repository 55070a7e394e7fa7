//! Property-based tests for collision resolution, planning, and fingerprints

use proptest::prelude::*;
use shelf_workflow::{
    fingerprint, group_duplicates, resolve, AudioCandidate, ClaimedSet, LibraryCleaner,
    WorkflowContext, WorkflowRunner,
};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use test_helpers::{options, write_tagged, ContentProbe};

// ===== Helpers =====

fn arbitrary_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[ab]{1,2}\\.(mp3|flac)", 1..30)
}

fn arbitrary_tags() -> impl Strategy<Value = Vec<(String, String, u8)>> {
    prop::collection::vec(("[AB]", "[xy]", 0u8..3), 1..12)
}

// ===== Property Tests =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: resolved destinations are pairwise distinct and never land on an existing file
    #[test]
    fn resolved_destinations_are_unique(
        requests in arbitrary_names(),
        existing in prop::collection::vec("[ab]{1,2}\\.(mp3|flac)", 0..4),
    ) {
        let temp = TempDir::new().unwrap();
        let on_disk: HashSet<PathBuf> =
            existing.iter().map(|name| temp.path().join(name)).collect();
        for path in &on_disk {
            fs::write(path, b"x").unwrap();
        }

        let mut claimed = ClaimedSet::new();
        for name in &requests {
            let desired = temp.path().join(name);
            let (destination, collision) = resolve(&desired, &claimed);

            prop_assert_eq!(collision, destination != desired);
            prop_assert!(!on_disk.contains(&destination));
            prop_assert!(claimed.claim(destination.clone()), "{:?} handed out twice", destination);
        }

        prop_assert_eq!(claimed.len(), requests.len());
    }

    /// Property: the n-th request for a taken name gets suffix (n)
    #[test]
    fn suffixes_count_up_from_one(count in 2usize..8) {
        let temp = TempDir::new().unwrap();
        let desired = temp.path().join("A.mp3");
        fs::write(&desired, b"x").unwrap();

        let mut claimed = ClaimedSet::new();
        claimed.claim(desired.clone());
        for n in 1..count {
            let (destination, collision) = resolve(&desired, &claimed);
            prop_assert!(collision);
            prop_assert_eq!(destination.clone(), temp.path().join(format!("A ({}).mp3", n)));
            claimed.claim(destination);
        }
    }

    /// Property: planning twice gives the same plan, and applying it reaches a fixpoint
    #[test]
    fn cleaner_plan_is_idempotent_and_converges(tags in arbitrary_tags()) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for (index, (artist, album, track)) in tags.iter().enumerate() {
            let title = if index % 2 == 0 { "Song" } else { "Other" };
            let path = root.join(format!("{:02}.mp3", index));
            write_tagged(&path, artist, album, title, &track.to_string());
        }

        let ctx = WorkflowContext::new(Box::new(ContentProbe));
        let raw = options(&[("library_path", root)]);
        let first = LibraryCleaner.build_plan(&raw, &ctx).unwrap();
        let second = LibraryCleaner.build_plan(&raw, &ctx).unwrap();
        prop_assert_eq!(&first, &second);

        let destinations: HashSet<&PathBuf> = first.moves.iter().map(|m| &m.destination).collect();
        prop_assert_eq!(destinations.len(), first.moves.len());

        let result = LibraryCleaner.apply(&raw, first, &ctx).unwrap();
        prop_assert!(result.success);

        let replan = LibraryCleaner.build_plan(&raw, &ctx).unwrap();
        prop_assert!(replan.is_empty(), "{:?}", replan.moves);
    }

    /// Property: identical bytes share a group; one changed byte splits it
    #[test]
    fn fingerprint_tracks_every_byte(
        content in prop::collection::vec(any::<u8>(), 1..2048),
        flip in any::<prop::sample::Index>(),
    ) {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.mp3");
        let b = temp.path().join("sub_b.flac");
        let c = temp.path().join("c.mp3");

        let mut changed = content.clone();
        let at = flip.index(changed.len());
        changed[at] ^= 0x01;

        fs::write(&a, &content).unwrap();
        fs::write(&b, &content).unwrap();
        fs::write(&c, &changed).unwrap();

        let candidate = |path: &PathBuf| AudioCandidate {
            path: path.clone(),
            signature: fingerprint(path).unwrap(),
            bitrate: None,
            sample_rate: None,
            format_name: None,
            size_bytes: content.len() as u64,
        };

        let groups = group_duplicates(vec![candidate(&a), candidate(&b), candidate(&c)]);
        prop_assert_eq!(groups.len(), 1);
        let members: Vec<&PathBuf> = groups[0].candidates.iter().map(|m| &m.path).collect();
        prop_assert_eq!(members, vec![&a, &b]);
    }
}
