use crate::domain::model::{ProcessingReport, ResponseBody};
use serde_json::Value;
use std::time::Duration;

const SNIPPET_LIMIT: usize = 500;

/// 將送出結果轉為可讀文字
pub fn render_processing_summary(report: &ProcessingReport) -> String {
    let mut out = String::new();

    out.push_str("Uploaded Files\n");
    for filename in &report.uploaded_filenames {
        out.push_str(&format!("  📄 {}\n", filename));
    }

    out.push_str("\nProcessing Webhook Results\n");
    for (index, result) in report.webhook_responses.iter().enumerate() {
        let line = match (result.success(), result.error()) {
            (true, _) => format!(
                "  ✅ Webhook {} ({}): Success (Status: {})",
                index + 1,
                result.endpoint_name(),
                result
                    .http_status
                    .map(|status| status.to_string())
                    .unwrap_or_default()
            ),
            (false, error) => format!(
                "  ❌ Webhook {} ({}): Failed - {}",
                index + 1,
                result.endpoint_name(),
                error.unwrap_or("Unknown error")
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str("\nSmart Extraction Result\n");
    match &report.extraction_result {
        Some(extraction) if extraction.success => {
            out.push_str("  ✅ Extraction Successful\n");
            out.push_str("  HTML rendering options available: preview, open, download, copy\n");
            if let Some(data) = &extraction.data {
                out.push_str(&snippet(data));
                out.push('\n');
            }
        }
        Some(extraction) => {
            out.push_str("  ❌ Extraction Failed\n");
            out.push_str(&format!(
                "  {}\n",
                extraction.error.as_deref().unwrap_or("Unknown error")
            ));
        }
        None => {
            out.push_str("  ❌ Extraction not triggered (not all webhooks successful)\n");
        }
    }

    out
}

/// 完整結果的 JSON 形式
pub fn render_raw(report: &ProcessingReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// 文字取前 500 個字元，JSON 完整格式化
fn snippet(data: &ResponseBody) -> String {
    match data {
        ResponseBody::Text(text) => {
            let mut cut: String = text.chars().take(SNIPPET_LIMIT).collect();
            if text.chars().count() > SNIPPET_LIMIT {
                cut.push_str("...");
            }
            cut
        }
        ResponseBody::Json(_) => data.to_pretty_json(),
    }
}

/// 回應是否代表成功：success 為 true 或 output 為 "success"
pub fn is_success_response(data: &Value) -> bool {
    data.get("success").and_then(Value::as_bool) == Some(true)
        || data.get("output").and_then(Value::as_str) == Some("success")
}

/// 一般 webhook 回應的格式化輸出
pub fn format_response(data: &Value) -> String {
    if data.is_null() {
        return "No response data".to_string();
    }

    let mut out = String::new();
    out.push_str(if is_success_response(data) {
        "✅ Success\n"
    } else {
        "❌ Error\n"
    });
    if let Some(message) = data.get("message").filter(|m| !m.is_null()) {
        out.push_str(&format!("Message: {}\n", crate::core::edit::display_value(message)));
    }
    out.push_str(&serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()));
    out.push('\n');
    if let Some(error) = data.get("error").filter(|e| !e.is_null()) {
        out.push_str(&format!("Error: {}\n", crate::core::edit::display_value(error)));
    }
    out
}

/// 回應的中繼資訊：狀態、耗時與大小
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub success: bool,
    pub elapsed_ms: u128,
    pub size_bytes: usize,
}

impl ResponseMeta {
    pub fn new(data: &Value, elapsed: Duration) -> Self {
        Self {
            success: is_success_response(data),
            elapsed_ms: elapsed.as_millis(),
            size_bytes: data.to_string().len(),
        }
    }
}

impl std::fmt::Display for ResponseMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Status: {} | Time: {}ms | Type: application/json | Size: {} bytes",
            if self.success { "Success" } else { "Error" },
            self.elapsed_ms,
            self.size_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DestinationOutcome, DestinationResult, ExtractionResult};
    use serde_json::json;

    fn result(id: usize, success: bool) -> DestinationResult {
        DestinationResult {
            destination_id: format!("webhook{}", id),
            url: format!("http://localhost:5678/webhook/Hook_{}", id),
            http_status: success.then_some(200),
            outcome: if success {
                DestinationOutcome::Delivered(ResponseBody::Json(json!({"ok": true})))
            } else {
                DestinationOutcome::Failed("HTTP 500: Internal Server Error".to_string())
            },
        }
    }

    #[test]
    fn test_summary_with_extraction() {
        let report = ProcessingReport {
            uploaded_filenames: vec!["bill.pdf".to_string()],
            webhook_responses: vec![result(1, true), result(2, true)],
            extraction_result: Some(ExtractionResult {
                success: true,
                data: Some(ResponseBody::Text("x".repeat(600))),
                error: None,
                message: "Extraction completed successfully".to_string(),
            }),
        };

        let text = render_processing_summary(&report);
        assert!(text.contains("📄 bill.pdf"));
        assert!(text.contains("✅ Webhook 1 (Hook_1): Success (Status: 200)"));
        assert!(text.contains("✅ Extraction Successful"));
        assert!(text.contains(&format!("{}...", "x".repeat(500))));
        assert!(!text.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_summary_without_extraction() {
        let report = ProcessingReport {
            uploaded_filenames: vec![],
            webhook_responses: vec![result(1, true), result(2, false)],
            extraction_result: None,
        };

        let text = render_processing_summary(&report);
        assert!(text.contains("❌ Webhook 2 (Hook_2): Failed - HTTP 500: Internal Server Error"));
        assert!(text.contains("Extraction not triggered"));

        let raw = render_raw(&report);
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["webhook_responses"].as_array().unwrap().len(), 2);
        assert!(parsed["extraction_result"].is_null());
    }

    #[test]
    fn test_format_response() {
        let ok = format_response(&json!({"output": "success", "message": "stored"}));
        assert!(ok.starts_with("✅ Success"));
        assert!(ok.contains("Message: stored"));

        let failed = format_response(&json!({"success": false, "error": "bad file"}));
        assert!(failed.starts_with("❌ Error"));
        assert!(failed.contains("Error: bad file"));

        assert_eq!(format_response(&Value::Null), "No response data");
    }

    #[test]
    fn test_response_meta() {
        let data = json!({"success": true});
        let meta = ResponseMeta::new(&data, Duration::from_millis(42));
        assert!(meta.success);
        assert_eq!(meta.size_bytes, r#"{"success":true}"#.len());
        assert_eq!(
            meta.to_string(),
            "Status: Success | Time: 42ms | Type: application/json | Size: 16 bytes"
        );
    }
}
