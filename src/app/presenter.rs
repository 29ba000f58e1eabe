use crate::core::html::{extract_html_content, fallback_download, fallback_fragment, fallback_page};
use crate::domain::model::{ProcessingReport, ResponseBody};
use crate::domain::ports::{Clipboard, Launcher, Storage};
use crate::utils::error::{ConsoleError, Result};
use std::path::{Path, PathBuf};

/// 擷取成功的回應；沒有時提示使用者先送出
pub fn html_source(report: Option<&ProcessingReport>) -> Result<&ResponseBody> {
    report
        .and_then(ProcessingReport::html_source)
        .ok_or_else(|| {
            ConsoleError::validation("No extraction result available. Run 'submit' first.")
        })
}

pub fn download_filename() -> String {
    format!("extraction_result_{}.html", chrono::Utc::now().timestamp_millis())
}

/// 行內預覽
pub fn preview(body: &ResponseBody) -> String {
    match extract_html_content(body) {
        Some(html) => html.to_string(),
        None => fallback_fragment(body),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presented {
    Opened(PathBuf),
    /// 無法開啟瀏覽器時改為行內預覽
    Preview(String),
}

/// 寫入暫存檔並交給系統瀏覽器開啟
pub async fn open_in_browser<L: Launcher + ?Sized>(
    launcher: &L,
    body: &ResponseBody,
    temp_dir: &Path,
) -> Result<PathBuf> {
    let document = match extract_html_content(body) {
        Some(html) => html.to_string(),
        None => fallback_page(body),
    };

    tokio::fs::create_dir_all(temp_dir).await?;
    let path = temp_dir.join(download_filename());
    tokio::fs::write(&path, document.as_bytes()).await?;

    launcher.open(&path)?;
    tracing::info!("🌐 HTML report opened: {}", path.display());
    Ok(path)
}

pub async fn open_or_preview<L: Launcher + ?Sized>(
    launcher: &L,
    body: &ResponseBody,
    temp_dir: &Path,
) -> Result<Presented> {
    match open_in_browser(launcher, body, temp_dir).await {
        Ok(path) => Ok(Presented::Opened(path)),
        Err(ConsoleError::PopupBlockedError { message }) => {
            tracing::warn!("Popup blocked or failed to open ({}), showing preview", message);
            Ok(Presented::Preview(preview(body)))
        }
        Err(e) => Err(e),
    }
}

/// 清掉先前執行留在暫存目錄的結果檔，回傳刪除數量
pub async fn clear_stale_documents(temp_dir: &Path) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(temp_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("extraction_result_") && name.ends_with(".html") {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::debug!("🧹 Removed {} stale result file(s)", removed);
    }
    Ok(removed)
}

/// 存成 extraction_result_{毫秒}.html，回傳完整路徑
pub async fn download<S: Storage>(storage: &S, body: &ResponseBody) -> Result<String> {
    let document = match extract_html_content(body) {
        Some(html) => html.to_string(),
        None => fallback_download(body),
    };
    let path = storage
        .write_file(&download_filename(), document.as_bytes())
        .await?;
    tracing::info!("💾 HTML file downloaded: {}", path);
    Ok(path)
}

pub fn copy<C: Clipboard + ?Sized>(clipboard: &C, body: &ResponseBody) -> Result<()> {
    let text = match extract_html_content(body) {
        Some(html) => html.to_string(),
        None => body.to_pretty_json(),
    };
    clipboard.write_text(&text)?;
    tracing::info!("📋 HTML content copied to clipboard");
    Ok(())
}
