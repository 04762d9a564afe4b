use crate::config::{GatewayConfig, ENV_API_KEY};
use crate::core::aggregator::ResultAggregator;
use crate::core::client::HttpUpstream;
use crate::domain::model::{GatewayRequest, GatewayResponse};
use crate::domain::ports::Upstream;
use crate::utils::error::{GatewayError, Result};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;

const PREFLIGHT_METHOD: &str = "OPTIONS";
const INTERNAL_ERROR_MESSAGE: &str = "Internal error while fetching ferry data";

/// 閘道入口：CORS 預檢、設定檢查、呼叫彙整器並組成回應
pub struct GatewayHandler<U = HttpUpstream> {
    config: GatewayConfig,
    upstream: U,
}

impl GatewayHandler<HttpUpstream> {
    pub fn new(config: GatewayConfig) -> Self {
        let upstream = HttpUpstream::new(config.endpoint.clone(), config.request_timeout());
        Self { config, upstream }
    }
}

impl<U: Upstream + Clone + 'static> GatewayHandler<U> {
    pub fn with_upstream(config: GatewayConfig, upstream: U) -> Self {
        Self { config, upstream }
    }

    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        if request.http_method.eq_ignore_ascii_case(PREFLIGHT_METHOD) {
            return self.respond(200, String::new());
        }

        let Some(credential) = self.config.credential() else {
            tracing::error!("❌ {} is missing from the environment", ENV_API_KEY);
            return self.error_response(500, &format!("Missing {} in environment", ENV_API_KEY));
        };

        let date = parse_date_hint(&request).unwrap_or_else(|| Utc::now().date_naive());
        tracing::info!("🚀 Fetching ferry data for {}", date);

        match self.combined_body(credential, date).await {
            Ok(body) => self.respond(200, body),
            Err(e) => {
                tracing::error!("❌ Gateway failed: {}", e);
                self.error_response(500, INTERNAL_ERROR_MESSAGE)
            }
        }
    }

    async fn combined_body(&self, credential: &str, date: NaiveDate) -> Result<String> {
        let aggregator = ResultAggregator::new(self.upstream.clone(), credential, &self.config);

        // 在獨立 task 中執行，panic 會變成 JoinError 而不是讓整個程序終止
        let result = tokio::spawn(async move { aggregator.aggregate(Some(date)).await })
            .await
            .map_err(|e| GatewayError::InternalError {
                message: format!("aggregation task failed: {}", e),
            })?;

        Ok(serde_json::to_string(&result.to_body())?)
    }

    fn respond(&self, status_code: u16, body: String) -> GatewayResponse {
        GatewayResponse {
            status_code,
            headers: self.headers(),
            body,
        }
    }

    fn error_response(&self, status_code: u16, message: &str) -> GatewayResponse {
        let body = serde_json::json!({ "error": message }).to_string();
        self.respond(status_code, body)
    }

    fn headers(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "Access-Control-Allow-Origin".to_string(),
                self.config.allowed_origin.clone(),
            ),
            (
                "Access-Control-Allow-Methods".to_string(),
                "POST, OPTIONS".to_string(),
            ),
            (
                "Access-Control-Allow-Headers".to_string(),
                "Content-Type".to_string(),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }
}

/// 從請求 body 取出 `{"date": "YYYY-MM-DD"}`；任何格式問題都回傳 `None`
pub fn parse_date_hint(request: &GatewayRequest) -> Option<NaiveDate> {
    if request.is_base64_encoded == Some(true) {
        tracing::debug!("Ignoring base64-encoded request body");
        return None;
    }

    let body = request.body.as_deref()?.trim();
    if body.is_empty() {
        return None;
    }

    let payload: serde_json::Value = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!("Malformed request body, using today's date: {}", e);
            return None;
        }
    };

    let raw = payload.get("date")?.as_str()?;
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            tracing::debug!("Unparseable date hint {:?}, using today's date", raw);
            None
        }
    }
}
