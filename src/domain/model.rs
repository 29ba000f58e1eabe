use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 表單欄位的值：文字或檔案
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    File {
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// 一次送出動作共用的 multipart 內容，建立後唯讀，每個目的地各自複製一份
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionPayload {
    fields: Vec<(String, FieldValue)>,
}

impl SubmissionPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), FieldValue::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.fields.push((
            name.into(),
            FieldValue::File {
                filename: filename.into(),
                content_type: content_type.into(),
                bytes,
            },
        ));
        self
    }

    /// 複製一份並附加一個文字欄位，原本的內容不會被修改
    pub fn with_text(&self, name: &str, value: &str) -> Self {
        self.clone().text(name, value)
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(key, value)| match value {
            FieldValue::Text(text) if key == name => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 回應內容：JSON 或純文字，依 Content-Type 決定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn to_pretty_json(&self) -> String {
        match self {
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Text(text) => {
                serde_json::to_string(text).unwrap_or_else(|_| text.clone())
            }
        }
    }

    /// 純文字直接回傳，JSON 則格式化輸出
    pub fn to_display_text(&self) -> String {
        match self {
            ResponseBody::Text(text) => text.clone(),
            ResponseBody::Json(Value::String(text)) => text.clone(),
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }
}

/// 傳輸層回覆：非 2xx 也會回傳，由呼叫端判斷
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub reason: String,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: ResponseBody,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// JSON 回覆中的欄位，非 JSON 時視為空物件
    pub fn json_field(&self, key: &str) -> Option<&Value> {
        self.body.as_json().and_then(|value| value.get(key))
    }

    pub fn is_ok_flag(&self) -> bool {
        self.json_field("ok").and_then(Value::as_bool).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// 進度顯示用的狀態識別碼，例如 webhook1 或 custom_{slug}
    pub id: String,
    pub url: String,
    pub context: Option<String>,
}

impl Destination {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DestinationOutcome {
    Delivered(ResponseBody),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationResult {
    pub destination_id: String,
    pub url: String,
    pub http_status: Option<u16>,
    pub outcome: DestinationOutcome,
}

impl DestinationResult {
    pub fn success(&self) -> bool {
        matches!(self.outcome, DestinationOutcome::Delivered(_))
    }

    pub fn data(&self) -> Option<&ResponseBody> {
        match &self.outcome {
            DestinationOutcome::Delivered(body) => Some(body),
            DestinationOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            DestinationOutcome::Delivered(_) => None,
            DestinationOutcome::Failed(message) => Some(message),
        }
    }

    /// URL 最後一段，用於摘要顯示
    pub fn endpoint_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub data: Option<ResponseBody>,
    pub error: Option<String>,
    pub message: String,
}

/// 一次送出的完整結果，隨請求建立，不放在全域狀態
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub uploaded_filenames: Vec<String>,
    pub webhook_responses: Vec<DestinationResult>,
    pub extraction_result: Option<ExtractionResult>,
}

impl ProcessingReport {
    /// 擷取成功時的回應，供 HTML 呈現使用
    pub fn html_source(&self) -> Option<&ResponseBody> {
        self.extraction_result
            .as_ref()
            .filter(|result| result.success)
            .and_then(|result| result.data.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAgent {
    pub slug: String,
    pub name: String,
    pub invoke_url: String,
}

/// 進度狀態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStatus {
    Loading,
    Success(String),
    Error(String),
}
