use crate::app::processing::guess_content_type;
use crate::core::render::{format_response, ResponseMeta};
use crate::domain::model::{HttpReply, ResponseBody, SubmissionPayload};
use crate::domain::ports::{Storage, WebhookTransport};
use crate::utils::error::{ConsoleError, Result};
use crate::utils::validation::require_input;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_REPORT_FILENAME: &str = "ESG_Report.html";

/// 一次呼叫的格式化結果
#[derive(Debug, Clone)]
pub struct FormattedResponse {
    pub data: Value,
    pub meta: ResponseMeta,
}

impl FormattedResponse {
    fn new(data: Value, started: Instant) -> Self {
        let meta = ResponseMeta::new(&data, started.elapsed());
        Self { data, meta }
    }

    fn failure(message: impl Into<String>, started: Instant) -> Self {
        Self::new(json!({ "success": false, "error": message.into() }), started)
    }

    pub fn render(&self) -> String {
        format!("{}\n{}", format_response(&self.data), self.meta)
    }
}

#[derive(Debug, Clone)]
pub struct DatasetUpload {
    /// 成功時為去掉副檔名的檔名，供排放計算使用
    pub stem: Option<String>,
    pub response: FormattedResponse,
}

/// 去掉最後一個副檔名
pub fn filename_stem(filename: &str) -> String {
    match filename.rfind('.') {
        Some(index) => filename[..index].to_string(),
        None => filename.to_string(),
    }
}

fn reply_value(reply: &HttpReply) -> Value {
    match &reply.body {
        ResponseBody::Json(value) => value.clone(),
        ResponseBody::Text(text) => Value::String(text.clone()),
    }
}

/// 上傳排放資料集
pub async fn upload_dataset<S, T>(
    storage: &S,
    transport: &T,
    url: &str,
    file: &str,
) -> Result<DatasetUpload>
where
    S: Storage,
    T: WebhookTransport + ?Sized,
{
    let bytes = storage.read_file(file).await?;
    let filename = Path::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    let payload = SubmissionPayload::new()
        .file("file_0", filename.clone(), guess_content_type(&filename), bytes)
        .text("filename_0", filename.clone())
        .text("file_count", "1")
        .text("filenames_json", serde_json::to_string(&[&filename])?);

    let started = Instant::now();
    tracing::info!("Uploading dataset {}...", filename);

    let reply = match transport.post_form(url, &payload).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("❌ Upload failed: {}", e);
            return Ok(DatasetUpload {
                stem: None,
                response: FormattedResponse::failure(e.to_string(), started),
            });
        }
    };

    let data = reply_value(&reply);
    let stored = reply
        .json_field("filename")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty());
    let accepted = reply.is_success()
        && reply.json_field("output").and_then(Value::as_str) == Some("success");

    match stored {
        Some(stored) if accepted => {
            let stem = filename_stem(stored);
            tracing::info!("✅ Dataset uploaded successfully. Ready for calculation ({})", stem);
            Ok(DatasetUpload {
                stem: Some(stem),
                response: FormattedResponse::new(data, started),
            })
        }
        _ => {
            let message = reply
                .json_field("message")
                .and_then(Value::as_str)
                .unwrap_or("Upload was not successful or filename missing in response.")
                .to_string();
            tracing::warn!("❌ Upload failed: {}", message);
            Ok(DatasetUpload {
                stem: None,
                response: FormattedResponse::failure(message, started),
            })
        }
    }
}

/// 以資料集檔名要求排放係數計算
pub async fn calculate_emission<T>(
    transport: &T,
    url: &str,
    stem: Option<&str>,
) -> Result<FormattedResponse>
where
    T: WebhookTransport + ?Sized,
{
    let stem = require_input(
        stem.unwrap_or_default(),
        "No valid dataset filename available for calculation.",
    )?;
    post_for_response(transport, url, &json!({ "input": stem })).await
}

/// 送出排放提示
pub async fn submit_prompts<T>(transport: &T, url: &str, prompts: &str) -> Result<FormattedResponse>
where
    T: WebhookTransport + ?Sized,
{
    let prompts = require_input(prompts, "Please enter prompts")?;
    post_for_response(transport, url, &json!({ "prompts": prompts })).await
}

async fn post_for_response<T>(transport: &T, url: &str, body: &Value) -> Result<FormattedResponse>
where
    T: WebhookTransport + ?Sized,
{
    let started = Instant::now();
    match transport.post_json(url, body, None).await {
        Ok(reply) if reply.is_success() => Ok(FormattedResponse::new(reply_value(&reply), started)),
        Ok(reply) => Ok(FormattedResponse::failure(
            format!("HTTP error! status: {}", reply.status),
            started,
        )),
        Err(e) => Ok(FormattedResponse::failure(e.to_string(), started)),
    }
}

/// 從 Content-Disposition 取出檔名，UTF-8 編碼優先
pub fn disposition_filename(header: &str) -> Option<String> {
    let re = regex::Regex::new(r#"(?i)filename\*=UTF-8''([^;]+)|filename="?([^";]+)"?"#).ok()?;
    let caps = re.captures(header)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
    let decoded = urlencoding::decode(raw)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    // 只保留檔名部分
    Path::new(&decoded)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub filename: String,
    pub content: String,
}

/// 產生永續報告
pub async fn generate_report<T>(transport: &T, url: &str) -> Result<Report>
where
    T: WebhookTransport + ?Sized,
{
    let url = require_input(url, "Please provide a valid Webhook URL")?;
    tracing::info!("Generating report...");

    let reply = transport.get(&url, None).await?;
    let content = reply.body.to_display_text();
    if !reply.is_success() {
        let excerpt: String = content.chars().take(200).collect();
        return Err(ConsoleError::RemoteError {
            status: reply.status,
            excerpt,
        });
    }

    let filename = reply
        .content_disposition
        .as_deref()
        .and_then(disposition_filename)
        .unwrap_or_else(|| DEFAULT_REPORT_FILENAME.to_string());

    tracing::info!("✅ Report ready: {}", filename);
    Ok(Report { filename, content })
}

pub async fn save_report<S: Storage>(storage: &S, report: &Report) -> Result<String> {
    storage
        .write_file(&report.filename, report.content.as_bytes())
        .await
}
