//! PIDS controller: owns the position state machine for the active line and
//! keeps every attached display in sync over the shared bus.

mod actor;
mod autoplay;
pub mod config;
pub mod keymap;
pub mod ws;

pub use actor::{spawn_controller, ControllerError, ControllerEvent, ControllerHandle};
