use crate::config::cli::LocalStorage;
use crate::config::toml_config::ConsoleConfig;
use crate::core::table::TableView;
use crate::domain::model::{CustomAgent, ProcessingReport};
use crate::domain::ports::{Clipboard, Launcher, StatusSink, WebhookTransport};
use crate::utils::error::{ConsoleError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// 主控台一次執行期間的狀態，由每個動作明確取用
pub struct Session {
    pub config: ConsoleConfig,
    pub transport: Arc<dyn WebhookTransport>,
    pub status: Arc<dyn StatusSink>,
    pub launcher: Box<dyn Launcher>,
    pub clipboard: Box<dyn Clipboard>,
    /// 讀取上傳檔案
    pub inputs: LocalStorage,
    /// 寫入下載的報告
    pub downloads: LocalStorage,
    pub temp_dir: PathBuf,

    pub agents: Vec<CustomAgent>,
    pub selected_agents: Vec<String>,
    pub agent_contexts: HashMap<String, String>,
    pub last_report: Option<ProcessingReport>,
    pub table: Option<TableView>,
    pub dataset_stem: Option<String>,
}

impl Session {
    pub fn new(
        config: ConsoleConfig,
        transport: Arc<dyn WebhookTransport>,
        status: Arc<dyn StatusSink>,
        launcher: Box<dyn Launcher>,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        let downloads = LocalStorage::new(config.output.download_dir.clone());
        Self {
            config,
            transport,
            status,
            launcher,
            clipboard,
            inputs: LocalStorage::new(".".to_string()),
            downloads,
            temp_dir: std::env::temp_dir().join("webhook-console"),
            agents: Vec::new(),
            selected_agents: Vec::new(),
            agent_contexts: HashMap::new(),
            last_report: None,
            table: None,
            dataset_stem: None,
        }
    }

    /// 選取的自訂代理，依選取順序
    pub fn selected(&self) -> Vec<CustomAgent> {
        self.selected_agents
            .iter()
            .filter_map(|slug| self.agents.iter().find(|agent| &agent.slug == slug))
            .cloned()
            .collect()
    }

    pub fn select_agents(&mut self, slugs: &[String]) -> Result<()> {
        for slug in slugs {
            if !self.agents.iter().any(|agent| &agent.slug == slug) {
                return Err(ConsoleError::validation(format!(
                    "Unknown agent '{}'. Run 'agents' to refresh the list.",
                    slug
                )));
            }
        }
        self.selected_agents = slugs.to_vec();
        Ok(())
    }

    pub fn table_mut(&mut self) -> Result<&mut TableView> {
        self.table
            .as_mut()
            .ok_or_else(|| ConsoleError::validation("No records loaded. Run 'load' first."))
    }
}
