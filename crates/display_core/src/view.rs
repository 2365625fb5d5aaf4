use position::PositionMachine;
use shared::{
    domain::{Line, RuntimeState, Station},
    protocol::{DisplaySettings, PidsMessage},
};
use tracing::debug;

/// What a display renders from. Rebuilt wholesale from every SYNC, so
/// applying the same payload again changes nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayView {
    line: Option<Line>,
    runtime: RuntimeState,
    settings: Option<DisplaySettings>,
}

impl DisplayView {
    /// Applies a SYNC. Returns whether anything visible changed; every other
    /// message kind, and any payload that could not be rendered, is ignored.
    pub fn apply(&mut self, message: &PidsMessage) -> bool {
        let PidsMessage::Sync(payload) = message else {
            return false;
        };
        if let Err(error) = payload.validate() {
            debug!(%error, "dropping unrenderable SYNC");
            return false;
        }

        let changed = self.line.as_ref() != Some(&payload.d)
            || self.runtime != payload.r
            || self.settings != payload.settings;
        self.line = Some(payload.d.clone());
        self.runtime = payload.r;
        self.settings = payload.settings.clone();
        changed
    }

    pub fn is_synced(&self) -> bool {
        self.line.is_some()
    }

    pub fn line(&self) -> Option<&Line> {
        self.line.as_ref()
    }

    pub fn runtime(&self) -> RuntimeState {
        self.runtime
    }

    pub fn settings(&self) -> Option<&DisplaySettings> {
        self.settings.as_ref()
    }

    pub fn current_station(&self) -> Option<&Station> {
        self.line.as_ref()?.stations.get(self.runtime.idx)
    }

    /// The stop the train will arrive at next, as the controller would
    /// compute it. `None` at a terminal or before the first SYNC.
    pub fn upcoming_station(&self) -> Option<&Station> {
        let line = self.line.as_ref()?;
        let machine = PositionMachine::new(line.clone()).ok()?;
        let next = machine.next_valid_index(self.runtime.idx, machine.step());
        if next == self.runtime.idx {
            return None;
        }
        line.stations.get(next)
    }
}
