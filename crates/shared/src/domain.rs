use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModelError;

/// Fields the core does not interpret. Kept so a line survives a
/// decode/encode cycle byte-for-byte in meaning.
pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Door {
    Left,
    Right,
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dock {
    Up,
    Down,
    #[default]
    Both,
}

impl Dock {
    /// Whether a train travelling in `dir` may stop here.
    pub fn serves(self, dir: DirType) -> bool {
        match self {
            Dock::Both => true,
            Dock::Up => dir.is_forward(),
            Dock::Down => !dir.is_forward(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turnback {
    #[default]
    None,
    Pre,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineMode {
    Loop,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirType {
    #[default]
    Up,
    Down,
    Outer,
    Inner,
}

impl DirType {
    /// `up` and `outer` are the "forward" half of their pair.
    pub fn is_forward(self) -> bool {
        matches!(self, DirType::Up | DirType::Outer)
    }

    pub fn reversed(self) -> Self {
        match self {
            DirType::Up => DirType::Down,
            DirType::Down => DirType::Up,
            DirType::Outer => DirType::Inner,
            DirType::Inner => DirType::Outer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(default)]
    pub line: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub exit_transfer: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Display name. May carry inline markup; opaque to the core.
    pub name: String,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub door: Door,
    #[serde(default)]
    pub dock: Dock,
    #[serde(default)]
    pub turnback: Turnback,
    #[serde(default)]
    pub express_stop: bool,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Station {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skip: false,
            door: Door::default(),
            dock: Dock::default(),
            turnback: Turnback::default(),
            express_stop: false,
            transfers: Vec::new(),
            extra: Extra::new(),
        }
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn docked(mut self, dock: Dock) -> Self {
        self.dock = dock;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughLineSegment {
    pub line_name: String,
    pub through_station_name: String,
}

/// Sentinel for an unbounded short-turn index.
pub const UNBOUNDED_IDX: i64 = -1;

fn unbounded() -> i64 {
    UNBOUNDED_IDX
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineMeta {
    #[serde(default)]
    pub line_name: String,
    #[serde(default)]
    pub mode: LineMode,
    #[serde(default)]
    pub dir_type: DirType,
    #[serde(default = "unbounded")]
    pub start_idx: i64,
    #[serde(default = "unbounded")]
    pub term_idx: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through_line_segments: Option<Vec<ThroughLineSegment>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for LineMeta {
    fn default() -> Self {
        Self {
            line_name: String::new(),
            mode: LineMode::default(),
            dir_type: DirType::default(),
            start_idx: UNBOUNDED_IDX,
            term_idx: UNBOUNDED_IDX,
            through_line_segments: None,
            extra: Extra::new(),
        }
    }
}

/// A line definition as exchanged with editors and displays.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    pub meta: LineMeta,
    pub stations: Vec<Station>,
}

impl Line {
    pub fn new(name: impl Into<String>, mode: LineMode, dir_type: DirType) -> Self {
        Self {
            meta: LineMeta {
                line_name: name.into(),
                mode,
                dir_type,
                ..LineMeta::default()
            },
            stations: Vec::new(),
        }
    }

    pub fn with_stations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stations.extend(names.into_iter().map(Station::new));
        self
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn last_idx(&self) -> Option<usize> {
        self.stations.len().checked_sub(1)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.stations.is_empty() {
            return Err(ModelError::EmptyLine);
        }
        Ok(())
    }

    pub fn check_index(&self, idx: usize) -> Result<(), ModelError> {
        if idx >= self.stations.len() {
            return Err(ModelError::InvalidIndex {
                idx,
                len: self.stations.len(),
            });
        }
        Ok(())
    }

    /// Resolves a short-turn index, treating the sentinel and anything out of
    /// range as unbounded.
    pub fn resolve_bound(&self, raw: i64) -> Option<usize> {
        usize::try_from(raw).ok().filter(|idx| *idx < self.stations.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    #[default]
    Arrived,
    Departed,
}

impl From<Phase> for u8 {
    fn from(value: Phase) -> Self {
        match value {
            Phase::Arrived => 0,
            Phase::Departed => 1,
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Phase::Arrived),
            1 => Ok(Phase::Departed),
            other => Err(format!("unknown runtime phase {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RuntimeState {
    pub idx: usize,
    pub state: Phase,
}

impl RuntimeState {
    pub fn arrived_at(idx: usize) -> Self {
        Self {
            idx,
            state: Phase::Arrived,
        }
    }
}
