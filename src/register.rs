//! Launch URL-scheme registration.
//!
//! When another user accepts an invite, the desktop peer launches the game
//! through the `discord-<app_id>://` scheme. Registration makes that scheme
//! resolve to this executable (or to the Steam launcher when a Steam game id
//! is configured). It runs once, when the client is built, and only ever
//! logs failures.
//!
//! | platform | steam id | action                                                          |
//! |----------|----------|-----------------------------------------------------------------|
//! | Linux    | any      | write `discord-<app>.desktop`, `xdg-mime default` it            |
//! | macOS    | set      | write `discord/games/<app>.json` under Application Support      |
//! | other    |          | nothing (logged)                                                |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Registers the launch scheme for an application id.
pub trait Registrar: Send + Sync {
    /// Register `app_id`, optionally launching through Steam game
    /// `platform_game_id`.
    fn register(&self, app_id: &str, platform_game_id: Option<&str>);
}

/// Registrar that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistrar;

impl Registrar for NoopRegistrar {
    fn register(&self, _app_id: &str, _platform_game_id: Option<&str>) {}
}

/// Registrar for the current desktop platform.
#[derive(Debug, Clone, Default)]
pub struct DesktopRegistrar {
    data_dir: Option<PathBuf>,
}

impl DesktopRegistrar {
    /// Registrar writing under the platform data directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrar writing under `data_dir` instead of the platform data
    /// directory.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
        }
    }

    fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir().context("Could not determine data directory"),
        }
    }

    #[cfg(target_os = "linux")]
    fn try_register(&self, app_id: &str, platform_game_id: Option<&str>) -> Result<()> {
        let exec = match platform_game_id {
            Some(game_id) => format!("xdg-open steam://rungameid/{game_id}"),
            None => std::env::current_exe()
                .context("resolve own executable")?
                .display()
                .to_string(),
        };

        let path = write_desktop_entry(&self.data_dir()?.join("applications"), app_id, &exec)?;
        log::debug!("[Register] Wrote {}", path.display());

        let status = std::process::Command::new("xdg-mime")
            .arg("default")
            .arg(desktop_file_name(app_id))
            .arg(format!("x-scheme-handler/discord-{app_id}"))
            .status()
            .context("run xdg-mime")?;
        anyhow::ensure!(status.success(), "xdg-mime exited with {status}");
        Ok(())
    }

    #[cfg(target_os = "macos")]
    fn try_register(&self, app_id: &str, platform_game_id: Option<&str>) -> Result<()> {
        let Some(game_id) = platform_game_id else {
            log::info!(
                "[Register] Declare the discord-{app_id} URL scheme in the bundle's Info.plist"
            );
            return Ok(());
        };

        let dir = self.data_dir()?.join("discord").join("games");
        let path = write_steam_manifest(&dir, app_id, game_id)?;
        log::debug!("[Register] Wrote {}", path.display());
        Ok(())
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    fn try_register(&self, app_id: &str, _platform_game_id: Option<&str>) -> Result<()> {
        log::info!("[Register] URL scheme registration for {app_id} is not supported on this platform");
        Ok(())
    }
}

impl Registrar for DesktopRegistrar {
    fn register(&self, app_id: &str, platform_game_id: Option<&str>) {
        if let Err(e) = self.try_register(app_id, platform_game_id) {
            log::warn!("[Register] URL scheme registration failed: {e:#}");
        }
    }
}

/// File name of the desktop entry for `app_id`.
pub fn desktop_file_name(app_id: &str) -> String {
    format!("discord-{app_id}.desktop")
}

/// Contents of the freedesktop entry that handles `discord-<app_id>://`.
pub fn desktop_entry(app_id: &str, exec: &str) -> String {
    format!(
        "[Desktop Entry]\n\
         Name=Game {app_id}\n\
         Exec={exec} %u\n\
         Type=Application\n\
         NoDisplay=true\n\
         Categories=Discord;Games;\n\
         MimeType=x-scheme-handler/discord-{app_id}\n"
    )
}

/// Write the desktop entry into `dir`, returning its path.
pub fn write_desktop_entry(dir: &Path, app_id: &str, exec: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(desktop_file_name(app_id));
    fs::write(&path, desktop_entry(app_id, exec))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Write the Steam launch manifest `<app_id>.json` into `dir`.
pub fn write_steam_manifest(dir: &Path, app_id: &str, game_id: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(format!("{app_id}.json"));
    let manifest = serde_json::json!({ "command": format!("steam://rungameid/{game_id}") });
    fs::write(&path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_entry_contents() {
        let entry = desktop_entry("1234", "/usr/bin/game");
        assert!(entry.starts_with("[Desktop Entry]\n"));
        assert!(entry.contains("Exec=/usr/bin/game %u\n"));
        assert!(entry.contains("MimeType=x-scheme-handler/discord-1234\n"));
        assert!(entry.contains("NoDisplay=true\n"));
    }

    #[test]
    fn test_write_desktop_entry() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("applications");

        let path = write_desktop_entry(&target, "55", "xdg-open steam://rungameid/10").unwrap();
        assert_eq!(path, target.join("discord-55.desktop"));
        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains("Exec=xdg-open steam://rungameid/10 %u"));
    }

    #[test]
    fn test_write_steam_manifest() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_steam_manifest(dir.path(), "55", "730").unwrap();
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(manifest["command"], "steam://rungameid/730");
    }
}
