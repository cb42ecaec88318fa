//! End-to-end scenarios over the bicinium fixture.
//!
//! tests/fixtures/bicinium.json has three parts of eight quarter notes each.
//! The Bassus holds a two-note chord on beat 3 and rests on beat 5.

use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use vis_analysis::{
    available_display_modes, extract, resolve, run_experiment, AnalysisIndex, AnalysisStatus,
    AnalyzeError, Analyzer, DisplayMode, ExperimentRequest, Experimenter, ExtractParams,
    ExtractionError, ObjectKind, OffsetGrid, PartCombination, Piece, ResultSet,
};

fn fixture() -> Piece {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("bicinium.json");
    let json = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    Piece::from_json(&json).expect("fixture parses")
}

fn pair() -> PartCombination {
    PartCombination::new([0, 1])
}

fn request(kind: ObjectKind, mode: DisplayMode, parts: PartCombination) -> ExperimentRequest {
    ExperimentRequest {
        object_kind: Some(kind),
        display_mode: Some(mode),
        part_combination: Some(parts),
        ..Default::default()
    }
}

fn list_counts(result: &ResultSet) -> Vec<(String, usize)> {
    match result {
        ResultSet::Frequencies(entries) => entries.iter().map(|e| (e.label.clone(), e.count)).collect(),
        other => panic!("expected a frequency table, got {other:?}"),
    }
}

#[test]
fn fixture_shape() {
    let piece = fixture();
    assert_eq!(piece.part_names(), vec!["Superius", "Tenor", "Bassus"]);
    assert_eq!(piece.duration, 8 * 480);
}

#[test]
fn scenario_a_one_point_per_event() {
    let piece = fixture();
    let grid = OffsetGrid::new(1.0, piece.ticks_per_quarter).unwrap();
    let index = AnalysisIndex::build(&piece, &pair(), grid).unwrap();
    for timeline in index.timelines() {
        assert_eq!(timeline.len(), 8);
    }

    let intervals = extract(&index, ObjectKind::Interval, &ExtractParams::default()).unwrap();
    assert_eq!(intervals.len(), 8);
    let labels: Vec<&str> = intervals.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["m10", "m10", "M10", "m10", "M10", "m10", "m10", "M10"]);

    let params = ExtractParams {
        n: 2,
        ..Default::default()
    };
    let bigrams = extract(&index, ObjectKind::IntervalNGram, &params).unwrap();
    assert_eq!(bigrams.len(), 7);
    assert_eq!(bigrams[0].label, "m10 m10");
}

#[test]
fn scenario_b_interval_longer_than_piece() {
    let piece = fixture();
    let grid = OffsetGrid::new(20.0, piece.ticks_per_quarter).unwrap();
    let index = AnalysisIndex::build(&piece, &PartCombination::new([0, 1, 2]), grid).unwrap();
    for timeline in index.timelines() {
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].offset, 0);
    }
}

#[test]
fn scenario_c_stale_fields_after_kind_switch() {
    let mut exp = Experimenter::new(Arc::new(fixture()), Arc::new(Analyzer::new()));
    exp.set_object_kind(ObjectKind::IntervalNGram);
    exp.set_display_mode(DisplayMode::Score);
    exp.set_part_combination(pair());
    exp.set_n(Some(3));
    exp.set_top_k(Some(2));
    assert!(exp.run_current().is_ok());

    exp.set_object_kind(ObjectKind::Note);
    exp.set_part_combination(PartCombination::new([0]));
    let err = exp.resolve().unwrap_err();
    assert_eq!(err.field(), "n");

    exp.set_n(None);
    assert_eq!(exp.resolve().unwrap_err().field(), "top_k");

    exp.set_top_k(None);
    assert!(exp.run_current().is_ok());
}

#[test]
fn scenario_d_interval_needs_exactly_two_parts() {
    let piece = fixture();
    let grid = OffsetGrid::new(1.0, piece.ticks_per_quarter).unwrap();
    let index = AnalysisIndex::build(&piece, &PartCombination::new([0, 1, 2]), grid).unwrap();
    let err = extract(&index, ObjectKind::Interval, &ExtractParams::default()).unwrap_err();
    assert!(matches!(err, ExtractionError::Arity { actual: 3, .. }));
}

#[test]
fn rests_and_chords_in_the_bass() {
    let piece = fixture();
    let analyzer = Analyzer::new();
    let index = analyzer.analyze(&piece, &PartCombination::new([1, 2]), 1.0).unwrap();
    let labels: Vec<String> = extract(&index, ObjectKind::Interval, &ExtractParams::default())
        .unwrap()
        .into_iter()
        .map(|o| o.label)
        .collect();
    // Beat 3: the Bassus chord A2+E3 contributes E3 under the Tenor's C4.
    assert_eq!(labels[2], "m6");
    assert_eq!(labels[4], "Rest");

    let trio = analyzer.analyze(&piece, &PartCombination::new([0, 1, 2]), 1.0).unwrap();
    let chords = extract(&trio, ObjectKind::Chord, &ExtractParams::default()).unwrap();
    assert_eq!(chords[2].label, "A2 E3 C4 E5");
    assert_eq!(chords[4].label, "C4 E5");
}

#[test]
fn list_counts_sum_to_object_count() {
    let piece = fixture();
    let analyzer = Analyzer::new();
    let cases = [
        (ObjectKind::Note, PartCombination::new([2])),
        (ObjectKind::Interval, pair()),
        (ObjectKind::IntervalNGram, PartCombination::new([0, 2])),
        (ObjectKind::Chord, PartCombination::new([0, 1, 2])),
    ];
    for interval in [0.25, 0.5, 1.0, 1.5, 3.0, 10.0] {
        for (kind, parts) in &cases {
            let mut req = request(*kind, DisplayMode::List, parts.clone());
            req.offset_interval = Some(interval);
            if *kind == ObjectKind::IntervalNGram {
                req.n = Some(2);
            }
            let config = resolve(&req, Some(&piece)).unwrap();
            let index = analyzer.analyze(&piece, parts, interval).unwrap();
            let objects = extract(&index, *kind, &config.extract_params()).unwrap();
            let total: usize = list_counts(&run_experiment(&config, &objects))
                .iter()
                .map(|(_, c)| c)
                .sum();
            assert_eq!(total, objects.len(), "{kind} at interval {interval}");
        }
    }
}

#[test]
fn summary_top_k_bound() {
    let piece = fixture();
    let analyzer = Analyzer::new();
    let index = analyzer.analyze(&piece, &pair(), 0.5).unwrap();

    for n in 1..=3 {
        let mut list = request(ObjectKind::IntervalNGram, DisplayMode::List, pair());
        list.n = Some(n);
        let list = resolve(&list, Some(&piece)).unwrap();
        let objects = extract(&index, ObjectKind::IntervalNGram, &list.extract_params()).unwrap();
        let all = list_counts(&run_experiment(&list, &objects));

        for k in 1..=10 {
            let mut score = request(ObjectKind::IntervalNGram, DisplayMode::Score, pair());
            score.n = Some(n);
            score.top_k = Some(k);
            let score = resolve(&score, Some(&piece)).unwrap();
            let ResultSet::Summary(entries) = run_experiment(&score, &objects) else {
                panic!("expected a summary");
            };
            assert_eq!(entries.len(), k.min(all.len()), "n={n} k={k}");

            let min_included = entries.iter().map(|e| e.count).min().unwrap_or(usize::MAX);
            for (label, count) in &all {
                if !entries.iter().any(|e| &e.label == label) {
                    assert!(*count <= min_included, "n={n} k={k}: excluded {label} x{count}");
                }
            }
        }
    }
}

#[test]
fn resolve_is_idempotent_for_every_valid_mode() {
    let piece = fixture();
    for kind in ObjectKind::ALL {
        for mode in available_display_modes(kind) {
            let parts = match kind {
                ObjectKind::Note => PartCombination::new([1]),
                ObjectKind::Chord => PartCombination::new([0, 1, 2]),
                _ => pair(),
            };
            let mut req = request(kind, mode, parts);
            if kind == ObjectKind::IntervalNGram {
                req.n = Some(4);
                if mode == DisplayMode::Score {
                    req.top_k = Some(5);
                }
            }
            let once = resolve(&req, Some(&piece)).unwrap();
            let twice = resolve(&ExperimentRequest::from(&once), Some(&piece)).unwrap();
            assert_eq!(once, twice, "{kind} {mode}");
        }
    }
}

#[test]
fn chord_is_list_only() {
    assert_eq!(available_display_modes(ObjectKind::Chord), vec![DisplayMode::List]);
    let modes = available_display_modes(ObjectKind::IntervalNGram);
    assert!(modes.contains(&DisplayMode::List));
    assert!(modes.contains(&DisplayMode::Score));
}

#[tokio::test]
async fn cached_index_is_shared() {
    let analyzer = Arc::new(Analyzer::new());
    let piece = Arc::new(fixture());

    let first = analyzer
        .spawn_analysis(Arc::clone(&piece), pair(), 1.0)
        .wait()
        .await
        .unwrap();
    let second = analyzer
        .spawn_analysis(Arc::clone(&piece), pair(), 1.0)
        .wait()
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &analyzer.analyze(&piece, &pair(), 1.0).unwrap()));
}

#[tokio::test]
async fn cancelled_analysis_leaves_cache_empty() {
    let analyzer = Arc::new(Analyzer::new());
    let shutdown = CancellationToken::new();
    let handle = analyzer.spawn_analysis_with(Arc::new(fixture()), pair(), 0.25, shutdown.child_token());
    shutdown.cancel();

    // Sampling may or may not have finished; either way the outcome is all or nothing.
    match handle.wait().await {
        Err(AnalyzeError::Cancelled) => assert!(analyzer.is_empty()),
        Ok(index) => {
            assert_eq!(analyzer.len(), 1);
            assert_eq!(index.point_count(), 32);
        }
        Err(other) => panic!("unexpected error: {other}"),
    }

    let token = CancellationToken::new();
    token.cancel();
    let fresh = Arc::new(Analyzer::new());
    let handle = fresh.spawn_analysis_with(Arc::new(fixture()), pair(), 1.0, token);
    let status = handle.subscribe();
    assert_eq!(handle.wait().await, Err(AnalyzeError::Cancelled));
    assert_eq!(*status.borrow(), AnalysisStatus::Cancelled);
    assert!(fresh.is_empty());
}
