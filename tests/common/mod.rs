#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use webhook_console::domain::model::ApiStatus;
use webhook_console::domain::ports::{Clipboard, Launcher, StatusSink};
use webhook_console::{ConsoleConfig, ConsoleError, HttpTransport, Result, Session};

#[derive(Default)]
pub struct RecordingStatus {
    pub events: Mutex<Vec<(String, ApiStatus)>>,
}

impl RecordingStatus {
    pub fn last(&self, status_id: &str) -> Option<ApiStatus> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| id == status_id)
            .map(|(_, status)| status.clone())
    }
}

impl StatusSink for RecordingStatus {
    fn update(&self, status_id: &str, status: ApiStatus) {
        self.events
            .lock()
            .unwrap()
            .push((status_id.to_string(), status));
    }
}

pub struct NoopLauncher;

impl Launcher for NoopLauncher {
    fn open(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// 記錄開啟過的檔案；blocked 時模擬瀏覽器被擋
#[derive(Default, Clone)]
pub struct RecordingLauncher {
    pub opened: Arc<Mutex<Vec<PathBuf>>>,
    pub blocked: bool,
}

impl Launcher for RecordingLauncher {
    fn open(&self, path: &Path) -> Result<()> {
        if self.blocked {
            return Err(ConsoleError::PopupBlockedError {
                message: "no display".to_string(),
            });
        }
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryClipboard {
    pub text: Mutex<Option<String>>,
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        *self.text.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

/// 所有網址都指向模擬伺服器的配置
pub fn mock_config(base: &str, download_dir: &str) -> ConsoleConfig {
    let mut config = ConsoleConfig::default();
    config.webhooks.processing = (1..=5)
        .map(|i| format!("{}/webhook/hook{}", base, i))
        .collect();
    config.webhooks.extraction = format!("{}/webhook/extraction", base);
    config.webhooks.dataset = Some(format!("{}/webhook/dataset", base));
    config.webhooks.calculation = format!("{}/webhook/ecalc", base);
    config.webhooks.emission_prompts = Some(format!("{}/webhook/prompts", base));
    config.webhooks.report = format!("{}/webhook/report", base);
    config.registry.base_url = base.to_string();
    config.verification.records_url = format!("{}/webhook/data-verification", base);
    config.verification.update_url = format!("{}/webhook/data-verification-update", base);
    config.output.download_dir = download_dir.to_string();
    config
}

pub fn session(config: ConsoleConfig, status: Arc<RecordingStatus>) -> Session {
    session_with_launcher(config, status, Box::new(NoopLauncher))
}

pub fn session_with_launcher(
    config: ConsoleConfig,
    status: Arc<RecordingStatus>,
    launcher: Box<dyn Launcher>,
) -> Session {
    Session::new(
        config,
        Arc::new(HttpTransport::new(None).unwrap()),
        status,
        launcher,
        Box::new(MemoryClipboard::default()),
    )
}
