//! The controller task: sole owner of the position state machine.
//!
//! Local operator calls arrive through [`ControllerHandle`], remote requests
//! through the bus. Both are drained by one task, so no two mutations ever
//! overlap. Every mutation ends with a SYNC publish.

use std::{sync::Arc, time::Duration};

use position::PositionMachine;
use shared::{
    bus::{Subscription, SyncChannel},
    domain::{DirType, Line, RuntimeState},
    error::ModelError,
    protocol::{CommandSource, DisplaySettings, PidsMessage, SyncPayload, UiCommand},
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use topology::{MergeError, ThroughDirection, ThroughSegment};
use tracing::{debug, info};

use crate::{autoplay::Autoplay, keymap::RemoteKey};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller task has stopped")]
    Stopped,
    #[error("autoplay period must be non-zero")]
    ZeroAutoplayPeriod,
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Things the controller tells its own collaborators (window chrome,
/// operator UI) rather than the displays.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Published(RuntimeState),
    Window(UiCommand),
    AutoplayStarted { period: Duration },
    AutoplayStopped,
}

pub(crate) enum Command {
    Next,
    Move(i64),
    MoveSteps(i64),
    JumpTo(usize),
    SetArrived,
    SetDeparted,
    SetDirection(DirType),
    LoadLine(Line, oneshot::Sender<Result<(), ModelError>>),
    MergeAndLoad {
        segments: Vec<ThroughSegment>,
        direction: ThroughDirection,
        reply: oneshot::Sender<Result<(), ControllerError>>,
    },
    SetSettings(Option<DisplaySettings>),
    Snapshot(oneshot::Sender<SyncPayload>),
    Step(oneshot::Sender<i64>),
    StartAutoplay(Duration),
    StopAutoplay,
    AutoplayTick(u64),
    Shutdown,
}

/// Cloneable front door to the controller task. Fire-and-forget commands
/// return as soon as they are queued.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ControllerHandle {
    fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.commands
            .send(command)
            .map_err(|_| ControllerError::Stopped)
    }

    pub fn next(&self) -> Result<(), ControllerError> {
        self.send(Command::Next)
    }

    /// Manual move by `delta` stops in index order.
    pub fn move_by(&self, delta: i64) -> Result<(), ControllerError> {
        self.send(Command::Move(delta))
    }

    /// Manual move by `steps` stops along the travel direction
    /// (`move_by(steps * step)`, resolved inside the task).
    pub fn move_steps(&self, steps: i64) -> Result<(), ControllerError> {
        self.send(Command::MoveSteps(steps))
    }

    /// Panics inside the controller task if `idx` is past the end of the line.
    pub fn jump_to(&self, idx: usize) -> Result<(), ControllerError> {
        self.send(Command::JumpTo(idx))
    }

    pub fn set_arrived(&self) -> Result<(), ControllerError> {
        self.send(Command::SetArrived)
    }

    pub fn set_departed(&self) -> Result<(), ControllerError> {
        self.send(Command::SetDeparted)
    }

    pub fn set_direction(&self, dir: DirType) -> Result<(), ControllerError> {
        self.send(Command::SetDirection(dir))
    }

    pub fn set_settings(&self, settings: Option<DisplaySettings>) -> Result<(), ControllerError> {
        self.send(Command::SetSettings(settings))
    }

    pub async fn load_line(&self, line: Line) -> Result<(), ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::LoadLine(line, reply))?;
        rx.await.map_err(|_| ControllerError::Stopped)??;
        Ok(())
    }

    /// Merges `segments` and makes the result the active line. On a merge
    /// error the active line is left alone.
    pub async fn merge_and_load(
        &self,
        segments: Vec<ThroughSegment>,
        direction: ThroughDirection,
    ) -> Result<(), ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::MergeAndLoad {
            segments,
            direction,
            reply,
        })?;
        rx.await.map_err(|_| ControllerError::Stopped)??;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<SyncPayload, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    pub async fn step(&self) -> Result<i64, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Step(reply))?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    pub fn start_autoplay(&self, period: Duration) -> Result<(), ControllerError> {
        if period.is_zero() {
            return Err(ControllerError::ZeroAutoplayPeriod);
        }
        self.send(Command::StartAutoplay(period))
    }

    pub fn stop_autoplay(&self) -> Result<(), ControllerError> {
        self.send(Command::StopAutoplay)
    }

    pub fn shutdown(&self) -> Result<(), ControllerError> {
        self.send(Command::Shutdown)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }
}

struct Controller {
    machine: PositionMachine,
    settings: Option<DisplaySettings>,
    bus: Arc<dyn SyncChannel>,
    events: broadcast::Sender<ControllerEvent>,
    commands: mpsc::WeakUnboundedSender<Command>,
    autoplay: Option<Autoplay>,
    autoplay_generation: u64,
}

/// Starts the controller task on `line` and announces the initial state.
pub fn spawn_controller(
    line: Line,
    settings: Option<DisplaySettings>,
    bus: Arc<dyn SyncChannel>,
) -> Result<(ControllerHandle, JoinHandle<()>), ModelError> {
    let machine = PositionMachine::new(line)?;
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    let inbound = bus.subscribe();
    let controller = Controller {
        machine,
        settings,
        bus,
        events: events.clone(),
        commands: commands_tx.downgrade(),
        autoplay: None,
        autoplay_generation: 0,
    };
    controller.publish();
    let task = tokio::spawn(controller.run(commands_rx, inbound));

    Ok((
        ControllerHandle {
            commands: commands_tx,
            events,
        },
        task,
    ))
}

impl Controller {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut inbound: Subscription,
    ) {
        let mut bus_open = true;
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command) {
                        break;
                    }
                }
                message = inbound.recv(), if bus_open => match message {
                    Some(message) => self.handle_message(message),
                    None => bus_open = false,
                },
            }
        }
        self.stop_autoplay();
        info!("controller stopped");
    }

    /// Returns `false` when the task should exit.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Next => self.mutate(PositionMachine::next),
            Command::Move(delta) => self.mutate(|m| m.move_by(delta)),
            Command::MoveSteps(steps) => self.mutate(|m| {
                let delta = steps * m.step();
                m.move_by(delta);
            }),
            Command::JumpTo(idx) => self.mutate(|m| m.jump_to(idx)),
            Command::SetArrived => self.mutate(PositionMachine::set_arrived),
            Command::SetDeparted => self.mutate(PositionMachine::set_departed),
            Command::SetDirection(dir) => self.mutate(|m| m.set_direction(dir)),
            Command::LoadLine(line, reply) => {
                let result = self.load(line);
                let _ = reply.send(result);
            }
            Command::MergeAndLoad {
                segments,
                direction,
                reply,
            } => {
                let result = topology::merge(&segments, direction)
                    .map_err(ControllerError::from)
                    .and_then(|line| self.load(line).map_err(ControllerError::from));
                let _ = reply.send(result);
            }
            Command::SetSettings(settings) => {
                self.settings = settings;
                self.publish();
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.payload());
            }
            Command::Step(reply) => {
                let _ = reply.send(self.machine.step());
            }
            Command::StartAutoplay(period) => self.start_autoplay(period),
            Command::StopAutoplay => self.stop_autoplay(),
            Command::AutoplayTick(generation) => self.autoplay_tick(generation),
            Command::Shutdown => return false,
        }
        true
    }

    fn handle_message(&mut self, message: PidsMessage) {
        match message {
            // Our own echo, or a stray writer. Either way not ours to apply.
            PidsMessage::Sync(_) => {}
            PidsMessage::RequestState => self.publish(),
            PidsMessage::RemoteKey { code } => match RemoteKey::from_code(&code) {
                Some(RemoteKey::Next) => self.mutate(PositionMachine::next),
                Some(RemoteKey::Forward) => self.mutate(|m| m.move_by(m.step())),
                Some(RemoteKey::Back) => self.mutate(|m| m.move_by(-m.step())),
                None => debug!(%code, "ignoring unknown remote key"),
            },
            PidsMessage::UiCommand { cmd, src } => match src {
                CommandSource::Display => {
                    debug!(?cmd, "ignoring window command from a display");
                }
                CommandSource::Controller => {
                    let _ = self.events.send(ControllerEvent::Window(cmd));
                }
            },
        }
    }

    fn mutate(&mut self, op: impl FnOnce(&mut PositionMachine)) {
        op(&mut self.machine);
        self.publish();
    }

    fn load(&mut self, line: Line) -> Result<(), ModelError> {
        self.machine.set_line(line)?;
        self.stop_autoplay();
        info!(
            line = %self.machine.line().meta.line_name,
            stations = self.machine.line().len(),
            "active line loaded"
        );
        self.publish();
        Ok(())
    }

    fn payload(&self) -> SyncPayload {
        SyncPayload {
            d: self.machine.line().clone(),
            r: self.machine.state(),
            settings: self.settings.clone(),
        }
    }

    fn publish(&self) {
        let payload = self.payload();
        let state = payload.r;
        self.bus.publish(PidsMessage::Sync(payload));
        let _ = self.events.send(ControllerEvent::Published(state));
    }

    fn start_autoplay(&mut self, period: Duration) {
        self.stop_autoplay();
        self.autoplay_generation += 1;
        self.autoplay = Some(Autoplay::start(
            period,
            self.autoplay_generation,
            self.commands.clone(),
        ));
        info!(period_ms = period.as_millis() as u64, "autoplay started");
        let _ = self.events.send(ControllerEvent::AutoplayStarted { period });
    }

    fn stop_autoplay(&mut self) {
        if let Some(autoplay) = self.autoplay.take() {
            autoplay.cancel();
            info!("autoplay stopped");
            let _ = self.events.send(ControllerEvent::AutoplayStopped);
        }
    }

    fn autoplay_tick(&mut self, generation: u64) {
        let current = self.autoplay.as_ref().map(|a| a.generation);
        if current != Some(generation) {
            debug!(generation, "dropping stale autoplay tick");
            return;
        }
        self.mutate(PositionMachine::next);
        if self.machine.at_terminal() {
            self.stop_autoplay();
        }
    }
}

#[cfg(test)]
#[path = "tests/actor_tests.rs"]
mod tests;
