use anyhow::Result;
use shared::protocol::{CommandSource, PidsMessage, UiCommand};
use tracing::{debug, info};

pub mod transport;
mod view;

pub use transport::{BusTransport, DisplayTransport, WsTransport};
pub use view::DisplayView;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// The rendered state changed; read it from [`DisplayClient::view`].
    StateChanged,
    /// The controller asked this window to change.
    Window(UiCommand),
}

/// Passive mirror of the controller. Holds no state machine of its own and
/// never answers state requests.
pub struct DisplayClient<T> {
    transport: T,
    view: DisplayView,
}

impl<T: DisplayTransport> DisplayClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            view: DisplayView::default(),
        }
    }

    /// Announces this display so the controller pushes the current state.
    pub async fn attach(&mut self) -> Result<()> {
        info!("display attached, requesting state");
        self.transport.send(PidsMessage::RequestState).await
    }

    pub fn view(&self) -> &DisplayView {
        &self.view
    }

    /// Waits for the next thing a renderer should react to. Redundant SYNCs
    /// and traffic meant for the controller are swallowed.
    pub async fn next_event(&mut self) -> Option<DisplayEvent> {
        loop {
            let message = self.transport.recv().await?;
            match &message {
                PidsMessage::Sync(_) => {
                    if self.view.apply(&message) {
                        return Some(DisplayEvent::StateChanged);
                    }
                }
                PidsMessage::UiCommand {
                    cmd,
                    src: CommandSource::Controller,
                } => return Some(DisplayEvent::Window(*cmd)),
                other => debug!(kind = other.kind(), "display ignoring message"),
            }
        }
    }

    /// Forwards a remote-control key press to the controller.
    pub async fn send_key(&mut self, code: impl Into<String>) -> Result<()> {
        self.transport
            .send(PidsMessage::RemoteKey { code: code.into() })
            .await
    }

    pub async fn send_ui_command(&mut self, cmd: UiCommand) -> Result<()> {
        self.transport
            .send(PidsMessage::UiCommand {
                cmd,
                src: CommandSource::Display,
            })
            .await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
