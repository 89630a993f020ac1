//! Best-effort browser launching.

use std::process::Command;

use tracing::warn;

/// Opens `url` in the user's default browser.
///
/// Failures are logged, never fatal; the URL is printed either way so
/// the user can open it by hand.
pub fn open(url: &str) {
    let mut command = match std::env::consts::OS {
        "linux" => {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
        "macos" => {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        }
        "windows" => {
            let mut cmd = Command::new("rundll32");
            cmd.arg("url.dll,FileProtocolHandler").arg(url);
            cmd
        }
        other => {
            warn!(os = other, url, "cannot auto-open browser on this platform");
            return;
        }
    };

    if let Err(e) = command.spawn() {
        warn!(error = %e, url, "failed to open browser");
    }
}
