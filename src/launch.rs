use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use serde::Serialize;

use crate::layout::InstallLayout;
use crate::locator::{self, DEFAULT_RUNTIME_NAMES};
use crate::port::{self, DEFAULT_PORT_RANGE_SIZE, DEFAULT_PORT_RANGE_START};
use crate::ready;
use crate::supervisor::{self, ServerProcess};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_DEV_URL: &str = "http://localhost:5173";
pub const DEFAULT_ENTRYPOINT: &str = "dist-node/index.js";
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the launch sequence needs. Constructed by the shell once at
/// startup; the defaults match the packaged app, tests override freely.
pub struct LaunchConfig {
    pub layout: InstallLayout,
    pub host: String,
    pub port_range_start: u16,
    pub port_range_size: u16,
    /// Accepted runtime executable names, in preference order.
    pub runtime_names: Vec<String>,
    /// Server entry script, relative to the installation root.
    pub entrypoint: PathBuf,
    pub ready_timeout: Duration,
    /// Where to point the shell in development mode.
    pub dev_url: String,
}

impl LaunchConfig {
    pub fn new(layout: InstallLayout) -> Self {
        Self {
            layout,
            host: DEFAULT_HOST.to_string(),
            port_range_start: DEFAULT_PORT_RANGE_START,
            port_range_size: DEFAULT_PORT_RANGE_SIZE,
            runtime_names: DEFAULT_RUNTIME_NAMES.iter().map(|s| s.to_string()).collect(),
            entrypoint: PathBuf::from(DEFAULT_ENTRYPOINT),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            dev_url: DEFAULT_DEV_URL.to_string(),
        }
    }
}

/// Outcome of a launch attempt. `url` is always present and loadable —
/// on failure it is an inline diagnostic page, not an error.
pub struct Launch {
    pub url: String,
    /// The supervised server, when one was spawned and became ready.
    pub server: Option<ServerProcess>,
}

/// Shell-facing summary of a launch, serialized across the bridge.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchInfo {
    pub url: String,
    pub port: Option<u16>,
    pub pid: Option<u32>,
    pub packaged: bool,
}

impl Launch {
    pub fn info(&self, packaged: bool) -> LaunchInfo {
        LaunchInfo {
            url: self.url.clone(),
            port: self.server.as_ref().map(|s| s.port()),
            pid: self.server.as_ref().and_then(|s| s.pid()),
            packaged,
        }
    }
}

/// Acquire a working base URL for the shell.
///
/// Development mode points at the separately-run dev server and spawns
/// nothing. Packaged mode runs the full sequence: negotiate a port, locate
/// the runtime, spawn the server, wait for readiness. Any failure anywhere
/// is converted into an inline diagnostic page — the shell always gets a
/// window, even if all it shows is the reason the server is not there.
pub async fn launch(config: &LaunchConfig) -> Launch {
    if !config.layout.is_packaged() {
        info!("development mode, using dev server at {}", config.dev_url);
        return Launch {
            url: config.dev_url.clone(),
            server: None,
        };
    }

    let port = port::find_available_port(config.port_range_start, config.port_range_size);
    info!("starting server on port {port}");

    match start_server(config, port).await {
        Ok(server) => Launch {
            url: format!("http://{}:{}", config.host, port),
            server: Some(server),
        },
        Err(e) => {
            error!("server launch failed: {e:#}");
            Launch {
                url: diagnostic_page(&format!("{e:#}")),
                server: None,
            }
        }
    }
}

/// The fallible part of the packaged-mode sequence. Errors bubble to
/// `launch`, which renders them.
async fn start_server(config: &LaunchConfig, port: u16) -> Result<ServerProcess> {
    let names: Vec<&str> = config.runtime_names.iter().map(String::as_str).collect();
    let exe = locator::locate(&config.layout, &names).ok_or_else(|| {
        anyhow!(
            "server runtime not found (looked for {:?} in the bundle, on PATH, and in common install locations)",
            config.runtime_names
        )
    })?;

    let entry = config.layout.resolve(&config.entrypoint);
    let mut server = supervisor::spawn(
        &exe,
        &[entry.as_os_str()],
        &config.host,
        port,
        config.layout.root(),
    )
    .context("server spawn failed")?;

    if !ready::wait_until_ready(&config.host, port, config.ready_timeout).await {
        // The process may be wedged or crashing in a loop; reap it before
        // reporting, the diagnostic page replaces it.
        server.shutdown().await;
        anyhow::bail!(
            "server did not start listening on {}:{} within {:?}",
            config.host,
            port,
            config.ready_timeout
        );
    }

    Ok(server)
}

/// Self-contained fallback page carrying the failure reason.
pub fn diagnostic_page(message: &str) -> String {
    format!(
        "data:text/html,<h1>Could not start the app server</h1><p>{}</p>",
        escape_html(message)
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
