//! 維運用的探測：確認金鑰是否有效、查看航線物件的完整欄位。

use crate::config::{GatewayConfig, ENV_API_KEY};
use crate::core::aggregator::bounded_snippet;
use crate::core::query::{key_check_query, route_explore_query};
use crate::domain::model::UpstreamResponse;
use crate::domain::ports::Upstream;
use crate::utils::error::{GatewayError, Result};
use serde::Serialize;

const KEY_CHECK_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyCheckReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn check_key<U: Upstream>(upstream: &U, config: &GatewayConfig) -> KeyCheckReport {
    let Some(credential) = config.credential() else {
        return KeyCheckReport {
            ok: false,
            status: None,
            response: None,
            error: Some(format!("No {} in environment", ENV_API_KEY)),
        };
    };

    let document = key_check_query(&config.route_name)
        .with_schema_version(config.schema_version.clone())
        .render(credential);
    let response = upstream.send(&document).await;

    if response.http_status == 0 {
        return KeyCheckReport {
            ok: false,
            status: None,
            response: None,
            error: response.fault,
        };
    }

    KeyCheckReport {
        ok: response.http_ok,
        status: Some(response.http_status),
        response: Some(bounded_snippet(
            &response.raw_text,
            credential,
            KEY_CHECK_SNIPPET_CHARS,
        )),
        error: None,
    }
}

/// 不帶 INCLUDE 的航線查詢，原樣回傳上游的狀態與內容
pub async fn explore_route<U: Upstream>(
    upstream: &U,
    config: &GatewayConfig,
) -> Result<UpstreamResponse> {
    let credential = config
        .credential()
        .ok_or_else(|| GatewayError::MissingConfigError {
            field: ENV_API_KEY.to_string(),
        })?;

    let document = route_explore_query(&config.route_name)
        .with_schema_version(config.schema_version.clone())
        .render(credential);
    Ok(upstream.send(&document).await)
}
