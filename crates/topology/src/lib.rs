//! Splices independently authored line definitions into one through-operation
//! line at shared stations.
//!
//! The merge itself never guesses: when two adjacent segments share more than
//! one station name the caller must name the through-station explicitly.
//! [`through_candidates`] lists the choices for whoever does the picking.

use shared::domain::{DirType, Line, LineMode, Station, UNBOUNDED_IDX};
use thiserror::Error;

mod markup;

pub use markup::strip_markup;

/// Separator placed between segment line names in the merged name.
pub const THROUGH_NAME_SEPARATOR: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("through-operation needs at least two segments, got {count}")]
    TooFewSegments { count: usize },
    #[error("segment {segment} has no stations")]
    EmptySegment { segment: usize },
    #[error("segments {left} and {right} share no station")]
    NoCommonStation { left: usize, right: usize },
    #[error("segments {left} and {right} share several stations ({}); pick one", .candidates.join(", "))]
    AmbiguousThroughStation {
        left: usize,
        right: usize,
        candidates: Vec<String>,
    },
    #[error("station '{name}' is not shared by segments {left} and {right}")]
    ThroughStationNotShared {
        left: usize,
        right: usize,
        name: String,
    },
}

/// One leg of a through-operation. `through_station_name` binds this segment
/// to the next one and is ignored on the last segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughSegment {
    pub line: Line,
    pub through_station_name: Option<String>,
}

impl ThroughSegment {
    pub fn new(line: Line) -> Self {
        Self {
            line,
            through_station_name: None,
        }
    }

    pub fn through(line: Line, station: impl Into<String>) -> Self {
        Self {
            line,
            through_station_name: Some(station.into()),
        }
    }
}

/// Through-operation is linear only, so only the linear directions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThroughDirection {
    #[default]
    Up,
    Down,
}

impl From<ThroughDirection> for DirType {
    fn from(value: ThroughDirection) -> Self {
        match value {
            ThroughDirection::Up => DirType::Up,
            ThroughDirection::Down => DirType::Down,
        }
    }
}

/// Markup-stripped station names present in both lines, in `left` order,
/// without duplicates.
pub fn through_candidates(left: &Line, right: &Line) -> Vec<String> {
    candidates_between(&left.stations, &right.stations)
}

fn candidates_between(left: &[Station], right: &[Station]) -> Vec<String> {
    let right_names: Vec<String> = right.iter().map(|s| strip_markup(&s.name)).collect();
    let mut out: Vec<String> = Vec::new();
    for station in left {
        let name = strip_markup(&station.name);
        if right_names.contains(&name) && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn position_from_tail(stations: &[Station], name: &str) -> Option<usize> {
    stations.iter().rposition(|s| strip_markup(&s.name) == name)
}

fn position_from_head(stations: &[Station], name: &str) -> Option<usize> {
    stations.iter().position(|s| strip_markup(&s.name) == name)
}

fn resolve_through_name(
    left_idx: usize,
    left: &[Station],
    right: &[Station],
    explicit: Option<&str>,
) -> Result<String, MergeError> {
    let right_idx = left_idx + 1;
    let mut candidates = candidates_between(left, right);
    if candidates.is_empty() {
        return Err(MergeError::NoCommonStation {
            left: left_idx,
            right: right_idx,
        });
    }

    match explicit {
        Some(raw) => {
            let name = strip_markup(raw);
            if candidates.contains(&name) {
                Ok(name)
            } else {
                Err(MergeError::ThroughStationNotShared {
                    left: left_idx,
                    right: right_idx,
                    name,
                })
            }
        }
        None if candidates.len() == 1 => Ok(candidates.swap_remove(0)),
        None => Err(MergeError::AmbiguousThroughStation {
            left: left_idx,
            right: right_idx,
            candidates,
        }),
    }
}

/// Splices `segments` into one linear line travelling in `direction`.
///
/// Each through-station appears once, contributed by the earlier segment.
/// The result starts from the first segment's metadata, so cosmetic fields
/// carry over; the short-turn range is reset to the full line.
pub fn merge(segments: &[ThroughSegment], direction: ThroughDirection) -> Result<Line, MergeError> {
    if segments.len() < 2 {
        return Err(MergeError::TooFewSegments {
            count: segments.len(),
        });
    }
    if let Some(segment) = segments.iter().position(|s| s.line.is_empty()) {
        return Err(MergeError::EmptySegment { segment });
    }

    let mut stations: Vec<Station> = Vec::new();
    // Index in the current segment where the train entered it.
    let mut entry: Option<usize> = None;

    for (i, pair) in segments.windows(2).enumerate() {
        let (left, right) = (&pair[0], &pair[1]);
        let from = entry.map_or(0, |idx| idx + 1);
        let left_tail = &left.line.stations[from..];

        let name = resolve_through_name(
            i,
            left_tail,
            &right.line.stations,
            left.through_station_name.as_deref(),
        )?;
        let exit = position_from_tail(left_tail, &name).map(|offset| from + offset);
        let next_entry = position_from_head(&right.line.stations, &name);
        let (Some(exit), Some(next_entry)) = (exit, next_entry) else {
            return Err(MergeError::NoCommonStation {
                left: i,
                right: i + 1,
            });
        };

        stations.extend_from_slice(&left.line.stations[from..=exit]);
        entry = Some(next_entry);
    }

    if let (Some(last), Some(entry)) = (segments.last(), entry) {
        stations.extend_from_slice(&last.line.stations[entry + 1..]);
    }

    let mut meta = segments[0].line.meta.clone();
    meta.line_name = segments
        .iter()
        .map(|s| s.line.meta.line_name.as_str())
        .collect::<Vec<_>>()
        .join(THROUGH_NAME_SEPARATOR);
    meta.mode = LineMode::Linear;
    meta.dir_type = direction.into();
    meta.start_idx = UNBOUNDED_IDX;
    meta.term_idx = UNBOUNDED_IDX;
    meta.through_line_segments = None;

    tracing::debug!(
        segments = segments.len(),
        stations = stations.len(),
        line = %meta.line_name,
        "merged through-operation line"
    );

    Ok(Line { meta, stations })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
