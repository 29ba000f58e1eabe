use crate::config::toml_config::VerificationConfig;
use crate::core::edit::{display_value, CellEdit, CommitDecision};
use crate::core::table::{parse_records, TableView};
use crate::domain::ports::WebhookTransport;
use crate::utils::error::{ConsoleError, Result};

/// 一次儲存的結果
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// 值沒有改變，沒有送出請求
    Unchanged,
    Saved { display: String },
}

/// 驗證資料的讀取與行內編輯
pub struct VerificationService<'a> {
    transport: &'a dyn WebhookTransport,
    config: &'a VerificationConfig,
}

impl<'a> VerificationService<'a> {
    pub fn new(transport: &'a dyn WebhookTransport, config: &'a VerificationConfig) -> Self {
        Self { transport, config }
    }

    pub async fn load(&self) -> Result<TableView> {
        tracing::info!("Connecting to database...");
        let reply = self
            .transport
            .get(&self.config.records_url, Some(&self.config.auth_token))
            .await?;

        if !reply.is_success() {
            return Err(ConsoleError::HttpStatusError {
                status: reply.status,
                reason: reply.reason,
            });
        }

        let value = match reply.body.as_json() {
            Some(value) => value.clone(),
            None => {
                return Err(ConsoleError::malformed(
                    "verification records must be JSON",
                ))
            }
        };

        let view = TableView::new(parse_records(value), self.config.page_size);
        tracing::info!("✅ Loaded {} records successfully", view.total_records());
        Ok(view)
    }

    /// 開始編輯一個儲存格；只允許設定中的可編輯欄位
    pub fn begin_edit(&self, view: &TableView, id: &str, column: &str) -> Result<CellEdit> {
        let rule = self
            .config
            .editable_columns
            .get(column)
            .cloned()
            .ok_or_else(|| {
                ConsoleError::validation(format!("Column '{}' is not editable", column))
            })?;
        let record = view
            .find(id)
            .ok_or_else(|| ConsoleError::validation(format!("Record {} not found", id)))?;

        Ok(CellEdit::begin(
            id,
            column,
            &record.display(column),
            record.updated_at(),
            rule,
        ))
    }

    /// 驗證並送出；驗證失敗或伺服器拒絕時儲存格回到原值
    pub async fn commit(
        &self,
        view: &mut TableView,
        edit: &mut CellEdit,
        raw: &str,
    ) -> Result<SaveOutcome> {
        let request = match edit.commit(raw) {
            CommitDecision::Unchanged => return Ok(SaveOutcome::Unchanged),
            CommitDecision::Invalid { message } => {
                tracing::warn!("Invalid value for {}: {}", edit.column(), message);
                return Err(ConsoleError::validation(message));
            }
            CommitDecision::Save(request) => request,
        };

        let body = serde_json::to_value(&request)?;
        let reply = match self
            .transport
            .post_json(&self.config.update_url, &body, Some(&self.config.auth_token))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                edit.finish(false);
                return Err(e);
            }
        };

        if !reply.is_success() || !reply.is_ok_flag() {
            edit.finish(false);
            let message = reply
                .json_field("error")
                .filter(|error| !error.is_null())
                .map(display_value)
                .unwrap_or_else(|| format!("Update failed ({})", reply.status));
            tracing::warn!("❌ Failed to save: {}", message);
            return Err(ConsoleError::RejectedError { message });
        }

        let display = edit.finish(true).to_string();
        view.apply_update(&request.id, &request.column, &request.new_value);
        tracing::info!("✅ Changes saved successfully");
        Ok(SaveOutcome::Saved { display })
    }
}

/// 指令列上的 id:column 形式
pub fn parse_cell_ref(value: &str) -> Option<(String, String)> {
    let (id, column) = value.split_once(':')?;
    let (id, column) = (id.trim(), column.trim());
    if id.is_empty() || column.is_empty() {
        return None;
    }
    Some((id.to_string(), column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(
            parse_cell_ref("12:consumption"),
            Some(("12".to_string(), "consumption".to_string()))
        );
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref(":site"), None);
    }
}
