use crate::domain::model::{
    ApiStatus, Destination, DestinationOutcome, DestinationResult, ExtractionResult,
    SubmissionPayload,
};
use crate::domain::ports::{StatusSink, WebhookTransport};
use futures::future::join_all;

/// 擷取請求的狀態識別碼
pub const EXTRACTION_STATUS_ID: &str = "extraction";

/// 一次送出的請求範圍上下文，取代全域狀態，在 fan-out 與彙整之間明確傳遞
#[derive(Debug, Clone, Default)]
pub struct SubmissionContext {
    pub payload: SubmissionPayload,
    pub uploaded_filenames: Vec<String>,
    /// 非空白的分類文字欄位，依輸入順序
    pub categories: Vec<(String, String)>,
}

/// 彙整結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOutcome {
    pub succeeded: usize,
    pub total: usize,
}

impl AggregateOutcome {
    pub fn from_results(results: &[DestinationResult]) -> Self {
        Self {
            succeeded: results.iter().filter(|result| result.success()).count(),
            total: results.len(),
        }
    }

    /// 擷取步驟的閘門：全部成功才放行
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

/// 對單一目的地送出 multipart 請求，失敗時轉為失敗結果而非錯誤
pub async fn call_webhook<T>(
    transport: &T,
    status: &dyn StatusSink,
    destination: &Destination,
    payload: &SubmissionPayload,
) -> DestinationResult
where
    T: WebhookTransport + ?Sized,
{
    status.update(&destination.id, ApiStatus::Loading);

    let (http_status, outcome) = match transport.post_form(&destination.url, payload).await {
        Ok(reply) if reply.is_success() => {
            status.update(
                &destination.id,
                ApiStatus::Success(format!("Completed ({})", reply.status)),
            );
            (Some(reply.status), DestinationOutcome::Delivered(reply.body))
        }
        Ok(reply) => {
            let message = format!("HTTP {}: {}", reply.status, reply.reason);
            status.update(&destination.id, ApiStatus::Error(format!("Error: {}", message)));
            (Some(reply.status), DestinationOutcome::Failed(message))
        }
        Err(e) => {
            let message = e.to_string();
            status.update(&destination.id, ApiStatus::Error(format!("Error: {}", message)));
            (None, DestinationOutcome::Failed(message))
        }
    };

    DestinationResult {
        destination_id: destination.id.clone(),
        url: destination.url.clone(),
        http_status,
        outcome,
    }
}

/// 對每個目的地同時送出請求並等待全部完成，結果順序與目的地順序一致
pub async fn dispatch_all<T>(
    transport: &T,
    status: &dyn StatusSink,
    context: &SubmissionContext,
    destinations: &[Destination],
) -> Vec<DestinationResult>
where
    T: WebhookTransport + ?Sized,
{
    tracing::info!("🚀 Dispatching to {} destinations in parallel", destinations.len());

    let calls = destinations.iter().map(|destination| async move {
        let payload = match destination.context.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => context.payload.with_text("custom_context", extra),
            _ => context.payload.clone(),
        };
        call_webhook(transport, status, destination, &payload).await
    });

    join_all(calls).await
}

/// 建立擷取請求內容
pub fn extraction_payload(context: &SubmissionContext) -> SubmissionPayload {
    let filenames = serde_json::to_string(&context.uploaded_filenames)
        .unwrap_or_else(|_| "[]".to_string());
    let mut payload = SubmissionPayload::new()
        .text("filenames", filenames)
        .text("extraction_type", "advanced_processing");
    for (name, value) in &context.categories {
        if !value.is_empty() {
            payload = payload.text(name.clone(), value.clone());
        }
    }
    payload
}

/// 送出擷取請求；僅在閘門通過後呼叫
pub async fn request_extraction<T>(
    transport: &T,
    status: &dyn StatusSink,
    url: &str,
    context: &SubmissionContext,
) -> ExtractionResult
where
    T: WebhookTransport + ?Sized,
{
    status.update(EXTRACTION_STATUS_ID, ApiStatus::Loading);
    let payload = extraction_payload(context);

    let failure = |message: String| ExtractionResult {
        success: false,
        data: None,
        error: Some(message),
        message: "Extraction failed".to_string(),
    };

    match transport.post_form(url, &payload).await {
        Ok(reply) if reply.is_success() => {
            status.update(
                EXTRACTION_STATUS_ID,
                ApiStatus::Success("Extraction completed".to_string()),
            );
            ExtractionResult {
                success: true,
                data: Some(reply.body),
                error: None,
                message: "Extraction completed successfully".to_string(),
            }
        }
        Ok(reply) => {
            let message = format!("HTTP {}: {}", reply.status, reply.reason);
            status.update(EXTRACTION_STATUS_ID, ApiStatus::Error(format!("Error: {}", message)));
            failure(message)
        }
        Err(e) => {
            let message = e.to_string();
            status.update(EXTRACTION_STATUS_ID, ApiStatus::Error(format!("Error: {}", message)));
            failure(message)
        }
    }
}
