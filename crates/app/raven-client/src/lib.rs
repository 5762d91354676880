//! Core of the Raven client add-on.
//!
//! [`Bootstrap::start`] finishes any update staged by the previous run, then
//! brings up the license gate and the update supervisor. Results the host has
//! to react to arrive on a [`CallbackQueue`] that the host drains once per
//! tick; [`GatePresenter`] and [`UpdateNotifier`] decide when to show the
//! license prompt and the update notification.

mod callbacks;
mod host;
pub mod logging;
mod startup;

pub use callbacks::{CallbackQueue, CallbackSender};
pub use host::{GatePresenter, HostAction, HostFrame, Screen, UpdateNotifier};
pub use startup::{Bootstrap, ClientCore, HostEvent, StartupError};

/// Version of the running client, used when settings do not override it.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
