//! Launches, supervises, and retires the bundled Node server that backs the
//! desktop shell.
//!
//! The shell calls [`launch::launch`] once at startup and gets back a URL it
//! can always load: `http://host:port` when the server came up, an inline
//! diagnostic page when it did not. Alongside the URL it receives the
//! [`supervisor::ServerProcess`] handle, whose `shutdown` (or, failing
//! that, `Drop`) guarantees the server never outlives the shell.

pub mod launch;
pub mod layout;
pub mod locator;
pub mod port;
pub mod ready;
pub mod supervisor;

pub use launch::{launch, Launch, LaunchConfig, LaunchInfo};
pub use layout::InstallLayout;
pub use supervisor::ServerProcess;
