use super::*;
use serde_json::json;
use shared::domain::{DirType, Dock, Line, LineMode};

fn line(name: &str, stations: &[&str]) -> Line {
    Line::new(name, LineMode::Linear, DirType::Up).with_stations(stations.iter().copied())
}

fn names(line: &Line) -> Vec<&str> {
    line.stations.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn mid_line_through_station_drops_both_far_branches() {
    let a = line("A", &["A1", "A2", "Hub", "A4", "A5"]);
    let b = line("B", &["B1", "B2", "Hub", "B4", "B5"]);

    let merged = merge(
        &[ThroughSegment::new(a), ThroughSegment::new(b)],
        ThroughDirection::Up,
    )
    .expect("merge");

    assert_eq!(names(&merged), ["A1", "A2", "Hub", "B4", "B5"]);
}

#[test]
fn two_five_station_lines_sharing_a_terminal_yield_nine() {
    let a = line("A", &["A1", "A2", "A3", "A4", "X"]);
    let b = line("B", &["X", "B2", "B3", "B4", "B5"]);

    let merged = merge(
        &[ThroughSegment::new(a), ThroughSegment::new(b)],
        ThroughDirection::Up,
    )
    .expect("merge");

    assert_eq!(merged.len(), 9);
    assert_eq!(
        names(&merged),
        ["A1", "A2", "A3", "A4", "X", "B2", "B3", "B4", "B5"]
    );
}

#[test]
fn ambiguous_pair_without_choice_is_an_error() {
    let a = line("A", &["A1", "P", "Q", "A4"]);
    let b = line("B", &["Q", "B2", "P", "B4"]);

    let err = merge(
        &[ThroughSegment::new(a.clone()), ThroughSegment::new(b.clone())],
        ThroughDirection::Up,
    )
    .expect_err("two candidates");
    assert_eq!(
        err,
        MergeError::AmbiguousThroughStation {
            left: 0,
            right: 1,
            candidates: vec!["P".into(), "Q".into()],
        }
    );

    let merged = merge(
        &[ThroughSegment::through(a, "Q"), ThroughSegment::new(b)],
        ThroughDirection::Up,
    )
    .expect("explicit choice resolves");
    assert_eq!(names(&merged), ["A1", "P", "Q", "B2", "P", "B4"]);
}

#[test]
fn disjoint_lines_report_no_common_station() {
    let err = merge(
        &[
            ThroughSegment::new(line("A", &["A1", "A2"])),
            ThroughSegment::new(line("B", &["B1", "B2"])),
        ],
        ThroughDirection::Up,
    )
    .expect_err("nothing shared");
    assert_eq!(err, MergeError::NoCommonStation { left: 0, right: 1 });
}

#[test]
fn explicit_choice_must_be_shared() {
    let err = merge(
        &[
            ThroughSegment::through(line("A", &["A1", "Hub"]), "A1"),
            ThroughSegment::new(line("B", &["Hub", "B2"])),
        ],
        ThroughDirection::Up,
    )
    .expect_err("A1 is not on B");
    assert!(matches!(
        err,
        MergeError::ThroughStationNotShared { ref name, .. } if name == "A1"
    ));
}

#[test]
fn matching_ignores_inline_markup() {
    let a = line("A", &["A1", "<color=#f00>Hub</color>"]);
    let b = line("B", &["Hub", "B2"]);

    let merged = merge(
        &[ThroughSegment::new(a), ThroughSegment::new(b)],
        ThroughDirection::Down,
    )
    .expect("merge");
    assert_eq!(names(&merged), ["A1", "<color=#f00>Hub</color>", "B2"]);
    assert_eq!(merged.meta.dir_type, DirType::Down);
}

#[test]
fn three_segments_chain_in_order() {
    let a = line("A", &["A1", "X", "A3"]);
    let b = line("B", &["B1", "X", "B3", "Y", "B5"]);
    let c = line("C", &["Y", "C2"]);

    let merged = merge(
        &[
            ThroughSegment::new(a),
            ThroughSegment::new(b),
            ThroughSegment::new(c),
        ],
        ThroughDirection::Up,
    )
    .expect("merge");
    assert_eq!(names(&merged), ["A1", "X", "B3", "Y", "C2"]);
    assert_eq!(merged.meta.line_name, "A-B-C");
}

#[test]
fn middle_segment_exit_must_follow_its_entry() {
    // "A1" is on both B and C but sits before B's entry station.
    let a = line("A", &["A1", "X"]);
    let b = line("B", &["A1", "X", "B3"]);
    let c = line("C", &["A1", "C2"]);

    let err = merge(
        &[
            ThroughSegment::through(a, "X"),
            ThroughSegment::new(b),
            ThroughSegment::new(c),
        ],
        ThroughDirection::Up,
    )
    .expect_err("no exit after entry");
    assert_eq!(err, MergeError::NoCommonStation { left: 1, right: 2 });
}

#[test]
fn merged_meta_is_reset_for_through_operation() {
    let mut a = line("A", &["A1", "Hub"]);
    a.meta.mode = LineMode::Loop;
    a.meta.dir_type = DirType::Inner;
    a.meta.start_idx = 1;
    a.meta.term_idx = 1;
    a.meta.extra.insert("themeColor".into(), json!("#123456"));
    a.meta.through_line_segments = Some(vec![]);
    let mut b = line("B", &["Hub", "B2"]);
    b.stations[1] = b.stations[1].clone().docked(Dock::Down).skipped();

    let merged = merge(
        &[ThroughSegment::new(a), ThroughSegment::new(b)],
        ThroughDirection::Up,
    )
    .expect("merge");

    assert_eq!(merged.meta.mode, LineMode::Linear);
    assert_eq!(merged.meta.dir_type, DirType::Up);
    assert_eq!(merged.meta.start_idx, -1);
    assert_eq!(merged.meta.term_idx, -1);
    assert_eq!(merged.meta.through_line_segments, None);
    assert_eq!(merged.meta.extra["themeColor"], "#123456");
    assert!(merged.stations[2].skip);
    assert_eq!(merged.stations[2].dock, Dock::Down);
}

#[test]
fn merge_is_deterministic() {
    let segments = [
        ThroughSegment::through(line("A", &["A1", "P", "Q"]), "P"),
        ThroughSegment::new(line("B", &["Q", "P", "B3"])),
    ];
    let first = merge(&segments, ThroughDirection::Up).expect("first");
    let second = merge(&segments, ThroughDirection::Up).expect("second");
    assert_eq!(
        serde_json::to_string(&first).expect("json"),
        serde_json::to_string(&second).expect("json")
    );
}

#[test]
fn rejects_degenerate_inputs() {
    assert_eq!(
        merge(&[ThroughSegment::new(line("A", &["A1"]))], ThroughDirection::Up),
        Err(MergeError::TooFewSegments { count: 1 })
    );
    assert_eq!(
        merge(
            &[
                ThroughSegment::new(line("A", &["A1"])),
                ThroughSegment::new(line("B", &[])),
            ],
            ThroughDirection::Up,
        ),
        Err(MergeError::EmptySegment { segment: 1 })
    );
}

#[test]
fn candidates_are_listed_for_disambiguation() {
    let a = line("A", &["P", "Q", "P"]);
    let b = line("B", &["Q", "P"]);
    assert_eq!(through_candidates(&a, &b), ["P", "Q"]);
}
