use crate::core::query::QueryDocument;
use crate::domain::model::UpstreamResponse;
use crate::domain::ports::Upstream;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 解碼結果
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Value(serde_json::Value),
    Failed(DecodeFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    /// 原始內容不是 JSON
    NotJson,
    /// 外層是 JSON 字串，但字串內容不是 JSON
    InnerNotJson,
}

impl DecodeFailure {
    pub fn describe(&self) -> &'static str {
        match self {
            DecodeFailure::NotJson => "response body is not valid JSON",
            DecodeFailure::InnerNotJson => "double-encoded response body is not valid JSON",
        }
    }
}

impl Decoded {
    pub fn into_option(self) -> Option<serde_json::Value> {
        match self {
            Decoded::Value(value) => Some(value),
            Decoded::Failed(_) => None,
        }
    }
}

/// 上游有時會把 JSON 再包一層字串。最多解兩次：
/// 第一次得到字串時再解一次，第二次不論結果是什麼都直接採用。
pub fn decode_body(raw_text: &str) -> Decoded {
    let first: serde_json::Value = match serde_json::from_str(raw_text) {
        Ok(value) => value,
        Err(_) => return Decoded::Failed(DecodeFailure::NotJson),
    };

    match first {
        serde_json::Value::String(inner) => match serde_json::from_str(&inner) {
            Ok(value) => Decoded::Value(value),
            Err(_) => Decoded::Failed(DecodeFailure::InnerNotJson),
        },
        value => Decoded::Value(value),
    }
}

/// 以 reqwest 實作的上游客戶端，每次 `send` 只送出一個 POST
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpUpstream {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, document: &QueryDocument) -> UpstreamResponse {
        tracing::debug!(
            "Sending query document ({} bytes) to: {}",
            document.byte_len(),
            self.endpoint
        );

        let response = match self
            .client
            .post(&self.endpoint)
            .header("content-type", "text/xml")
            .timeout(self.timeout)
            .body(document.as_str().to_string())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("upstream request timed out after {:?}", self.timeout)
                } else {
                    format!("upstream transport error: {}", e.without_url())
                };
                tracing::warn!("❌ {}", reason);
                return UpstreamResponse::transport_failure(reason);
            }
        };

        let status = response.status();
        tracing::debug!("Upstream response status: {}", status);

        let raw_text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let reason = format!("failed to read response body: {}", e.without_url());
                tracing::warn!("❌ {}", reason);
                return UpstreamResponse {
                    http_ok: false,
                    http_status: status.as_u16(),
                    raw_text: String::new(),
                    decoded: None,
                    fault: Some(reason),
                };
            }
        };

        let (decoded, fault) = match decode_body(&raw_text) {
            Decoded::Value(value) => (Some(value), None),
            Decoded::Failed(failure) => {
                tracing::warn!(
                    "⚠️ Upstream returned status {} with undecodable body: {}",
                    status,
                    failure.describe()
                );
                (None, Some(failure.describe().to_string()))
            }
        };

        UpstreamResponse {
            http_ok: status.is_success(),
            http_status: status.as_u16(),
            raw_text,
            decoded,
            fault,
        }
    }
}
