use crate::domain::model::ApiStatus;
use crate::domain::ports::{Clipboard, Launcher, StatusSink};
use crate::utils::error::{ConsoleError, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// 使用作業系統預設程式開啟檔案
#[derive(Debug, Default, Clone)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, path: &Path) -> Result<()> {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", ""]);
            cmd
        } else {
            Command::new("xdg-open")
        };

        let status = command
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| ConsoleError::PopupBlockedError {
                message: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ConsoleError::PopupBlockedError {
                message: format!("launcher exited with {}", status),
            })
        }
    }
}

/// 系統剪貼簿，每次寫入時才連線
#[derive(Debug, Default, Clone)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| ConsoleError::ClipboardError {
            message: e.to_string(),
        })?;
        clipboard
            .set_text(text)
            .map_err(|e| ConsoleError::ClipboardError {
                message: e.to_string(),
            })?;
        tracing::debug!("📋 Copied {} chars to clipboard", text.len());
        Ok(())
    }
}

/// 預設的進度顯示：寫入日誌
#[derive(Debug, Default, Clone)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn update(&self, status_id: &str, status: ApiStatus) {
        match status {
            ApiStatus::Loading => tracing::info!("⏳ {}: Processing...", status_id),
            ApiStatus::Success(message) => tracing::info!("✅ {}: {}", status_id, message),
            ApiStatus::Error(message) => tracing::warn!("❌ {}: {}", status_id, message),
        }
    }
}
