//! Side effects triggered by resolved commands
//!
//! Actions are fire-and-forget: the launcher spawns the platform opener and
//! never reports success back to the assistant.

use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use url::Url;

use crate::{Error, Result};

/// A side effect requested by a resolved command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open a web page in the default browser
    OpenUrl(Url),
    /// Invoke a protocol handler (e.g. `vscode://`, `spotify:`)
    Launch(String),
}

impl Action {
    /// Target string handed to the platform opener
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::OpenUrl(url) => url.as_str(),
            Self::Launch(uri) => uri,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenUrl(url) => write!(f, "open {url}"),
            Self::Launch(uri) => write!(f, "launch {uri}"),
        }
    }
}

/// Executes [`Action`]s
pub trait ActionLauncher: Send + Sync {
    /// Fire the action; failures are logged, never surfaced
    fn launch(&self, action: &Action);
}

/// Launches actions through the operating system's URL opener
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    program: std::path::PathBuf,
    prefix_args: Vec<String>,
}

impl SystemLauncher {
    /// Locate the platform opener
    ///
    /// # Errors
    ///
    /// Returns error if no opener is installed
    pub fn detect() -> Result<Self> {
        let (name, prefix_args): (&str, &[&str]) = if cfg!(target_os = "macos") {
            ("open", &[])
        } else if cfg!(target_os = "windows") {
            ("cmd", &["/C", "start", ""])
        } else {
            ("xdg-open", &[])
        };

        let program = which::which(name)
            .map_err(|e| Error::Action(format!("{name} not found: {e}")))?;

        tracing::debug!(opener = %program.display(), "action launcher ready");

        Ok(Self {
            program,
            prefix_args: prefix_args.iter().map(ToString::to_string).collect(),
        })
    }
}

impl SystemLauncher {
    /// Spawn the opener and reap it on a background thread
    fn spawn_reaped(&self, action: &Action) -> std::io::Result<JoinHandle<()>> {
        let mut child = Command::new(&self.program)
            .args(&self.prefix_args)
            .arg(action.target())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let action = action.clone();
        Ok(std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                tracing::debug!(%action, %status, "opener exited with failure");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(%action, error = %e, "failed to wait for opener"),
        }))
    }
}

impl ActionLauncher for SystemLauncher {
    fn launch(&self, action: &Action) {
        match self.spawn_reaped(action) {
            Ok(_) => tracing::info!(%action, "action launched"),
            Err(e) => tracing::warn!(%action, error = %e, "failed to launch action"),
        }
    }
}

/// Logs actions without executing them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLauncher;

impl ActionLauncher for LogLauncher {
    fn launch(&self, action: &Action) {
        tracing::info!(%action, "action skipped (no opener available)");
    }
}

/// Records actions instead of executing them
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    launched: Arc<Mutex<Vec<Action>>>,
}

impl RecordingLauncher {
    /// Actions launched so far
    #[must_use]
    pub fn launched(&self) -> Vec<Action> {
        self.launched
            .lock()
            .map(|launched| launched.clone())
            .unwrap_or_default()
    }
}

impl ActionLauncher for RecordingLauncher {
    fn launch(&self, action: &Action) {
        if let Ok(mut launched) = self.launched.lock() {
            launched.push(action.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_target() {
        let url = Action::OpenUrl(Url::parse("https://youtube.com").unwrap());
        assert_eq!(url.target(), "https://youtube.com/");

        let launch = Action::Launch("spotify:".to_string());
        assert_eq!(launch.target(), "spotify:");
        assert_eq!(launch.to_string(), "launch spotify:");
    }

    #[test]
    fn test_recording_launcher() {
        let launcher = RecordingLauncher::default();
        launcher.launch(&Action::Launch("vscode://".to_string()));
        assert_eq!(launcher.launched(), vec![Action::Launch("vscode://".to_string())]);
    }

    #[cfg(unix)]
    #[test]
    fn test_opener_is_reaped() {
        let launcher = SystemLauncher {
            program: which::which("true").unwrap(),
            prefix_args: Vec::new(),
        };

        let reaper = launcher
            .spawn_reaped(&Action::Launch("spotify:".to_string()))
            .unwrap();

        // Joining returns only once the child has been waited on
        reaper.join().unwrap();
    }

    #[test]
    fn test_missing_opener_is_logged_not_raised() {
        let launcher = SystemLauncher {
            program: "/nonexistent/opener".into(),
            prefix_args: Vec::new(),
        };

        assert!(launcher.spawn_reaped(&Action::Launch("spotify:".to_string())).is_err());
        launcher.launch(&Action::Launch("spotify:".to_string()));
    }
}
