use crate::core::fanout::{
    dispatch_all, request_extraction, AggregateOutcome, SubmissionContext, EXTRACTION_STATUS_ID,
};
use crate::domain::model::{
    ApiStatus, CustomAgent, Destination, ProcessingReport, SubmissionPayload,
};
use crate::domain::ports::{StatusSink, Storage, WebhookTransport};
use crate::utils::error::{ConsoleError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// 依副檔名推測上傳檔案的 MIME 類型
pub fn guess_content_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn display_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// 讀取選取的檔案與分類欄位，建立一次送出共用的內容
pub async fn collect_submission<S: Storage>(
    storage: &S,
    files: &[String],
    categories: &[(String, String)],
) -> Result<SubmissionContext> {
    if files.is_empty() {
        return Err(ConsoleError::validation("Please select at least one file"));
    }

    let mut payload = SubmissionPayload::new();
    let mut uploaded_filenames = Vec::with_capacity(files.len());

    for (index, path) in files.iter().enumerate() {
        let bytes = storage.read_file(path).await?;
        let filename = display_name(path);
        tracing::debug!("📄 Attached {} ({} bytes)", filename, bytes.len());

        payload = payload
            .file(
                format!("file_{}", index),
                filename.clone(),
                guess_content_type(&filename),
                bytes,
            )
            .text(format!("filename_{}", index), filename.clone());
        uploaded_filenames.push(filename);
    }

    let categories: Vec<(String, String)> = categories
        .iter()
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .collect();
    for (name, value) in &categories {
        payload = payload.text(name.clone(), value.clone());
    }

    payload = payload
        .text("file_count", files.len().to_string())
        .text("timestamp", chrono::Utc::now().to_rfc3339());

    Ok(SubmissionContext {
        payload,
        uploaded_filenames,
        categories,
    })
}

/// 處理 webhook 的目的地，依序編號 webhook1..webhookN，之後接上選取的自訂代理
pub fn build_destinations(
    processing_urls: &[String],
    agents: &[CustomAgent],
    contexts: &HashMap<String, String>,
) -> Vec<Destination> {
    let fixed = processing_urls
        .iter()
        .enumerate()
        .map(|(index, url)| Destination::new(format!("webhook{}", index + 1), url.clone()));

    let custom = agents.iter().map(|agent| {
        let destination =
            Destination::new(format!("custom_{}", agent.slug), agent.invoke_url.clone());
        match contexts.get(&agent.slug) {
            Some(context) => destination.with_context(context.clone()),
            None => destination,
        }
    });

    fixed.chain(custom).collect()
}

/// 送出、彙整、依閘門決定是否擷取
pub struct ProcessingEngine {
    transport: Arc<dyn WebhookTransport>,
    status: Arc<dyn StatusSink>,
    extraction_url: String,
}

impl ProcessingEngine {
    pub fn new(
        transport: Arc<dyn WebhookTransport>,
        status: Arc<dyn StatusSink>,
        extraction_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            status,
            extraction_url: extraction_url.into(),
        }
    }

    pub async fn run(
        &self,
        context: &SubmissionContext,
        destinations: &[Destination],
    ) -> ProcessingReport {
        tracing::info!(
            "Starting submission of {} file(s)...",
            context.uploaded_filenames.len()
        );

        let results = dispatch_all(
            self.transport.as_ref(),
            self.status.as_ref(),
            context,
            destinations,
        )
        .await;

        let outcome = AggregateOutcome::from_results(&results);
        tracing::info!(
            "📊 Processing results: {}/{} webhooks succeeded",
            outcome.succeeded,
            outcome.total
        );

        let extraction_result = if outcome.all_succeeded() {
            tracing::info!("🔎 All webhooks succeeded, requesting extraction");
            let result = request_extraction(
                self.transport.as_ref(),
                self.status.as_ref(),
                &self.extraction_url,
                context,
            )
            .await;
            if result.success {
                tracing::info!("✅ {}", result.message);
            } else {
                tracing::warn!(
                    "❌ {}: {}",
                    result.message,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            Some(result)
        } else {
            self.status.update(
                EXTRACTION_STATUS_ID,
                ApiStatus::Error("Skipped (not all webhooks successful)".to_string()),
            );
            None
        };

        ProcessingReport {
            uploaded_filenames: context.uploaded_filenames.clone(),
            webhook_responses: results,
            extraction_result,
        }
    }
}
