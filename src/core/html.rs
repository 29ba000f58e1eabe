use crate::domain::model::ResponseBody;
use serde_json::Value;

/// HTML 文件標記，比對時不分大小寫
pub const DOCTYPE_MARKER: &str = "<!doctype html>";

/// 依序檢查的物件屬性
pub const HTML_PROPERTIES: [&str; 6] = ["html", "content", "data", "result", "output", "report"];

fn has_marker(text: &str) -> bool {
    text.trim().to_ascii_lowercase().contains(DOCTYPE_MARKER)
}

/// 從回應中找出 HTML 文件；找不到時回傳 None，由呼叫端改用文字呈現
pub fn extract_html_content(body: &ResponseBody) -> Option<&str> {
    match body {
        ResponseBody::Text(text) | ResponseBody::Json(Value::String(text)) => {
            has_marker(text).then_some(text.as_str())
        }
        ResponseBody::Json(Value::Object(map)) => HTML_PROPERTIES
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|candidate| has_marker(candidate)),
        ResponseBody::Json(_) => None,
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// 在新視窗開啟時使用的完整頁面
pub fn fallback_page(body: &ResponseBody) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Extraction Result</title>
    <style>
        body {{ font-family: Arial, sans-serif; padding: 20px; background: #f5f5f5; }}
        .container {{ background: white; padding: 20px; border-radius: 8px; }}
        pre {{ background: #f8f9fa; padding: 15px; border-radius: 4px; white-space: pre-wrap; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Extraction Result</h1>
        <pre>{}</pre>
    </div>
</body>
</html>
"#,
        escape_html(&body.to_display_text())
    )
}

/// 行內預覽時使用的片段
pub fn fallback_fragment(body: &ResponseBody) -> String {
    format!("<pre>{}</pre>", escape_html(&body.to_pretty_json()))
}

/// 下載時使用的精簡頁面
pub fn fallback_download(body: &ResponseBody) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n<html><head><title>Extraction Result</title></head>\n",
            "<body><pre>{}</pre></body></html>\n"
        ),
        escape_html(&body.to_pretty_json())
    )
}
