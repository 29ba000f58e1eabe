use crate::domain::model::{ApiStatus, HttpReply, SubmissionPayload};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// 對外 HTTP 呼叫。傳輸失敗回傳 Err，非 2xx 狀態仍以 HttpReply 回傳
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_form(&self, url: &str, payload: &SubmissionPayload) -> Result<HttpReply>;

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        authorization: Option<&str>,
    ) -> Result<HttpReply>;

    async fn get(&self, url: &str, authorization: Option<&str>) -> Result<HttpReply>;
}

/// 進度顯示，只用於呈現，不影響流程
pub trait StatusSink: Send + Sync {
    fn update(&self, status_id: &str, status: ApiStatus);
}

/// 在系統瀏覽器開啟檔案
pub trait Launcher: Send + Sync {
    fn open(&self, path: &std::path::Path) -> Result<()>;
}

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}
