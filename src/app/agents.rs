use crate::config::toml_config::RegistryConfig;
use crate::domain::model::CustomAgent;
use crate::domain::ports::WebhookTransport;
use crate::utils::error::{ConsoleError, Result};
use crate::utils::validation::require_input;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const FALLBACK_COLUMNS: [&str; 4] = ["category", "date", "service_type", "fuel_type"];

pub const AGENT_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "text/csv",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
];

/// 小寫，非英數轉為 '-'，去掉頭尾的 '-'
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// 欄位名稱只保留 [a-z0-9_]
pub fn sanitize_column(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// 依出現順序合併，忽略空白與重複
pub fn merge_columns(base: &[String], extra: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for column in base.iter().chain(extra.iter()) {
        if !column.is_empty() && !merged.contains(column) {
            merged.push(column.clone());
        }
    }
    merged
}

/// 輸出格式 { "items": [ { col: null, ... } ] }
pub fn make_schema(columns: &[String]) -> Value {
    let item: Map<String, Value> = columns
        .iter()
        .map(|column| (column.clone(), Value::Null))
        .collect();
    json!({ "items": [Value::Object(item)] })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentDraft {
    pub name: String,
    pub path: Option<String>,
    pub document_prompt: String,
    pub system_message: String,
    pub user_message: String,
    /// 使用者新增的欄位，送出前會清理
    pub new_columns: Vec<String>,
    pub insert_to_db: bool,
}

#[derive(Debug, Deserialize)]
struct AgentSummary {
    slug: String,
    #[serde(default)]
    name: String,
}

/// 自訂代理登錄服務
pub struct AgentRegistry<'a> {
    transport: &'a dyn WebhookTransport,
    config: &'a RegistryConfig,
}

impl<'a> AgentRegistry<'a> {
    pub fn new(transport: &'a dyn WebhookTransport, config: &'a RegistryConfig) -> Self {
        Self { transport, config }
    }

    /// 取得已登錄的代理；失敗時記錄警告並回傳空清單
    pub async fn list(&self) -> Vec<CustomAgent> {
        match self.try_list().await {
            Ok(agents) => {
                tracing::info!("🤖 Loaded {} custom agent(s)", agents.len());
                agents
            }
            Err(e) => {
                tracing::warn!("Failed to load custom agents: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> Result<Vec<CustomAgent>> {
        let reply = self.transport.get(&self.config.agents_url(), None).await?;
        if !reply.is_success() {
            return Err(ConsoleError::HttpStatusError {
                status: reply.status,
                reason: reply.reason,
            });
        }
        if !reply.is_ok_flag() {
            return Err(ConsoleError::malformed("agent list response is not ok"));
        }

        let agents = match reply.json_field("agents") {
            Some(Value::Array(items)) => items.clone(),
            _ => return Err(ConsoleError::malformed("agent list is missing")),
        };

        Ok(agents
            .into_iter()
            .filter_map(|item| serde_json::from_value::<AgentSummary>(item).ok())
            .map(|summary| CustomAgent {
                invoke_url: self.config.invoke_url(&summary.slug),
                name: if summary.name.is_empty() {
                    summary.slug.clone()
                } else {
                    summary.name
                },
                slug: summary.slug,
            })
            .collect())
    }

    /// 資料表的欄位；任何失敗都改用預設欄位
    pub async fn table_columns(&self) -> Vec<String> {
        let url = format!(
            "{}/table-columns?table={}",
            self.config.agents_url(),
            urlencoding::encode(&self.config.table)
        );

        let fetched = match self.transport.get(&url, None).await {
            Ok(reply) if reply.is_success() && reply.is_ok_flag() => reply
                .json_field("columns")
                .and_then(Value::as_array)
                .map(|columns| {
                    columns
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                }),
            Ok(reply) => {
                tracing::debug!("Column lookup returned HTTP {}", reply.status);
                None
            }
            Err(e) => {
                tracing::debug!("Column lookup failed: {}", e);
                None
            }
        };

        fetched.unwrap_or_else(|| FALLBACK_COLUMNS.iter().map(|c| c.to_string()).collect())
    }

    /// 建立代理並回傳可呼叫的完整網址
    pub async fn create(&self, draft: &AgentDraft) -> Result<String> {
        let name = require_input(&draft.name, "Agent Name and Webhook Path are required")?;
        let path = match draft.path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => format!("custom-agents/{}", slugify(&name)),
        };
        let path = require_input(&path, "Agent Name and Webhook Path are required")?;

        let table_columns = self.table_columns().await;
        let sanitized: Vec<String> = draft
            .new_columns
            .iter()
            .map(|column| sanitize_column(column))
            .collect();
        // 只送出資料表尚未有的欄位
        let new_columns: Vec<String> = merge_columns(&[], &sanitized)
            .into_iter()
            .filter(|column| !table_columns.contains(column))
            .collect();
        let columns = merge_columns(&table_columns, &new_columns);
        let schema = serde_json::to_string_pretty(&make_schema(&columns))?;

        let body = json!({
            "name": name,
            "path": path,
            "mime_types": AGENT_MIME_TYPES,
            "document_prompt": draft.document_prompt.trim(),
            "system_message": draft.system_message.trim(),
            "user_message": draft.user_message.trim(),
            "json_schema": schema,
            "insert_to_db": draft.insert_to_db,
            "new_columns": new_columns,
        });

        let reply = self
            .transport
            .post_json(&self.config.agents_url(), &body, None)
            .await?;

        if !reply.is_success() || !reply.is_ok_flag() {
            let message = reply
                .json_field("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", reply.status));
            return Err(ConsoleError::RejectedError { message });
        }

        let invoke_path = reply
            .json_field("agent")
            .and_then(|agent| agent.get("invoke_url"))
            .and_then(Value::as_str)
            .ok_or_else(|| ConsoleError::malformed("agent.invoke_url missing in response"))?;

        let endpoint = format!("{}{}", self.config.base_url.trim_end_matches('/'), invoke_path);
        tracing::info!("🤖 Agent '{}' created: {}", name, endpoint);
        Ok(endpoint)
    }
}
