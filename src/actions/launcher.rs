//! URL side-effect boundary
//!
//! Launching is fire-and-forget: the caller never waits on the opener and a
//! failure is only logged.

use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Opens URLs in the host's default viewer
pub trait UrlLauncher: Send + Sync {
    /// Request that `url` be opened; returns immediately
    fn launch(&self, url: &str);
}

/// Launcher that shells out to the platform opener
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    program: PathBuf,
    prefix_args: Vec<&'static str>,
}

impl SystemLauncher {
    /// Find the platform opener on `PATH`
    ///
    /// Returns `None` when no opener is installed (e.g. a headless server).
    #[must_use]
    pub fn detect() -> Option<Self> {
        if cfg!(target_os = "windows") {
            return Some(Self {
                program: PathBuf::from("cmd"),
                prefix_args: vec!["/C", "start", ""],
            });
        }

        let candidates: &[&str] = if cfg!(target_os = "macos") {
            &["open"]
        } else {
            &["xdg-open", "gio", "sensible-browser"]
        };

        candidates.iter().find_map(|name| {
            which::which(name).ok().map(|program| Self {
                prefix_args: if *name == "gio" { vec!["open"] } else { Vec::new() },
                program,
            })
        })
    }
}

impl UrlLauncher for SystemLauncher {
    fn launch(&self, url: &str) {
        let mut command = Command::new(&self.program);
        command
            .args(&self.prefix_args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let url = url.to_string();
        let program = self.program.clone();
        // Reap the child off the request path
        std::thread::spawn(move || match command.status() {
            Ok(status) if status.success() => {
                tracing::debug!(url = %url, "opened url");
            }
            Ok(status) => {
                tracing::warn!(url = %url, program = %program.display(), %status, "url opener exited with failure");
            }
            Err(e) => {
                tracing::warn!(url = %url, program = %program.display(), error = %e, "failed to launch url opener");
            }
        });
    }
}

/// Launcher that only logs, for headless hosts
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLauncher;

impl UrlLauncher for NoopLauncher {
    fn launch(&self, url: &str) {
        tracing::info!(url = %url, "url opening disabled, skipping");
    }
}
