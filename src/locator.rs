use std::path::{Path, PathBuf};

use log::info;

use crate::layout::InstallLayout;

/// Executable names accepted for the server runtime, in preference order.
pub const DEFAULT_RUNTIME_NAMES: &[&str] = &["node", "nodejs"];

/// Find a usable server-runtime executable.
///
/// Search order, first match wins:
/// 1. packaged builds: bundled candidates under the installation root
/// 2. the PATH, for each accepted name
/// 3. well-known install prefixes, including version-manager layouts
///
/// Returns None when nothing qualifies. The check is best-effort: a path
/// that qualifies here can still fail to exec, and that failure belongs to
/// the spawn, not to discovery.
pub fn locate(layout: &InstallLayout, names: &[&str]) -> Option<PathBuf> {
    let primary = *names.first()?;

    if layout.is_packaged() {
        // Covers the layouts our bundler has shipped: a flat runtime/
        // folder, a full Node distribution, and a plain bin/ folder.
        let bundled = [
            layout.resolve(format!("runtime/{primary}")),
            layout.resolve(format!("{primary}/bin/{primary}")),
            layout.resolve(format!("bin/{primary}")),
        ];
        for candidate in bundled {
            if is_executable(&candidate) {
                info!("found bundled runtime at {}", candidate.display());
                return Some(candidate);
            }
        }
    }

    for name in names {
        if let Ok(path) = which::which(name) {
            info!("found runtime '{}' on PATH at {}", name, path.display());
            return Some(path);
        }
    }

    let well_known = [
        PathBuf::from("/usr/local/bin").join(primary),
        PathBuf::from("/opt/homebrew/bin").join(primary),
        PathBuf::from("/usr/bin").join(primary),
        PathBuf::from("/usr/local/nodejs/bin").join(primary),
    ];
    for candidate in well_known {
        if is_executable(&candidate) {
            info!("found runtime at well-known path {}", candidate.display());
            return Some(candidate);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let pattern = home
            .join(format!(".nvm/versions/{primary}/*/bin/{primary}"))
            .to_string_lossy()
            .to_string();
        if let Some(path) = first_glob_match(&pattern) {
            info!("found version-manager runtime at {}", path.display());
            return Some(path);
        }
    }

    None
}

/// Expand a wildcard install pattern and pick one match deterministically.
/// Matches are sorted lexically and the first executable one is taken; note
/// this is a tie-break, not a version ordering (v1.10.x sorts before v1.2.x).
fn first_glob_match(pattern: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = glob::glob(pattern).ok()?.flatten().collect();
    matches.sort();
    matches.into_iter().find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
