use crate::domain::model::{FieldValue, HttpReply, ResponseBody, SubmissionPayload};
use crate::domain::ports::WebhookTransport;
use crate::utils::error::{ConsoleError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// 以 reqwest 實作的傳輸層
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn build_form(payload: &SubmissionPayload) -> Result<Form> {
        let mut form = Form::new();
        for (name, value) in payload.fields() {
            form = match value {
                FieldValue::Text(text) => form.text(name.clone(), text.clone()),
                FieldValue::File {
                    filename,
                    content_type,
                    bytes,
                } => {
                    let part = Part::bytes(bytes.clone())
                        .file_name(filename.clone())
                        .mime_str(content_type)?;
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }

    fn with_authorization(request: RequestBuilder, authorization: Option<&str>) -> RequestBuilder {
        match authorization {
            Some(token) => request.header(AUTHORIZATION, token),
            None => request,
        }
    }

    /// application/json 解析為結構化資料，其餘視為文字
    async fn read_reply(response: Response) -> Result<HttpReply> {
        let status = response.status();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let content_disposition = header(CONTENT_DISPOSITION);

        let is_json = content_type
            .as_deref()
            .map(|value| value.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);

        let text = response.text().await?;
        let body = if is_json {
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                ConsoleError::malformed(format!(
                    "Invalid JSON body (HTTP {}): {}",
                    status.as_u16(),
                    e
                ))
            })?;
            ResponseBody::Json(value)
        } else {
            ResponseBody::Text(text)
        };

        tracing::debug!("Response status: {}, content type: {:?}", status, content_type);

        Ok(HttpReply {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            content_type,
            content_disposition,
            body,
        })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post_form(&self, url: &str, payload: &SubmissionPayload) -> Result<HttpReply> {
        tracing::debug!("POST (multipart, {} fields) {}", payload.len(), url);
        let form = Self::build_form(payload)?;
        let response = self.client.post(url).multipart(form).send().await?;
        Self::read_reply(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        authorization: Option<&str>,
    ) -> Result<HttpReply> {
        tracing::debug!("POST (json) {}", url);
        let request = Self::with_authorization(self.client.post(url).json(body), authorization);
        let response = request.send().await?;
        Self::read_reply(response).await
    }

    async fn get(&self, url: &str, authorization: Option<&str>) -> Result<HttpReply> {
        tracing::debug!("GET {}", url);
        let request = Self::with_authorization(self.client.get(url), authorization);
        let response = request.send().await?;
        Self::read_reply(response).await
    }
}
