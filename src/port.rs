use std::net::TcpListener;

use log::warn;

pub const DEFAULT_PORT_RANGE_START: u16 = 3000;
pub const DEFAULT_PORT_RANGE_SIZE: u16 = 10;

/// Whether a loopback bind on `port` currently succeeds.
///
/// The listener is dropped immediately, so this is inherently racy: another
/// process can claim the port between our release and the server's own
/// bind. Accepted limitation; there is no way to reserve a port for a
/// process we have not spawned yet.
pub fn is_port_available(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Lowest free port in `[range_start, range_start + range_size)`.
///
/// An exhausted range falls back to `range_start` with a warning instead of
/// failing: the spawn that follows will fail to bind either way, and that
/// failure produces a better diagnostic than aborting here.
pub fn find_available_port(range_start: u16, range_size: u16) -> u16 {
    for port in range_start..range_start.saturating_add(range_size) {
        if is_port_available(port) {
            return port;
        }
    }
    warn!(
        "no free port in {}..{}, falling back to {}",
        range_start,
        range_start.saturating_add(range_size),
        range_start
    );
    range_start
}
