#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_origin, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_API_KEY: &str = "TRV_API_KEY";
pub const ENV_ALLOW_ORIGIN: &str = "ALLOW_ORIGIN";
pub const ENV_ENDPOINT: &str = "TRV_URL";
pub const ENV_ROUTE_NAME: &str = "FERRY_ROUTE_NAME";
pub const ENV_TIMEOUT_SECS: &str = "UPSTREAM_TIMEOUT_SECS";
pub const ENV_ANNOUNCEMENT_POLICY: &str = "ANNOUNCEMENT_POLICY";
pub const ENV_ANNOUNCEMENT_DATE_FILTER: &str = "ANNOUNCEMENT_DATE_FILTER";

pub const DEFAULT_ENDPOINT: &str = "https://api.trafikinfo.trafikverket.se/v2/data.json";
pub const DEFAULT_ROUTE_NAME: &str = "Aspöleden";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";

/// 航線查詢失敗時，公告查詢要不要照送
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnouncementPolicy {
    /// 航線失敗就不查公告，兩個序列都回空
    #[default]
    SkipOnRouteFailure,
    /// 兩個查詢同時送出，各自獨立成敗
    AlwaysAttempt,
}

impl FromStr for AnnouncementPolicy {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip-on-route-failure" | "skip" => Ok(AnnouncementPolicy::SkipOnRouteFailure),
            "always-attempt" | "always" => Ok(AnnouncementPolicy::AlwaysAttempt),
            other => Err(GatewayError::InvalidConfigValueError {
                field: "announcement_policy".to_string(),
                value: other.to_string(),
                reason: "Expected 'skip-on-route-failure' or 'always-attempt'".to_string(),
            }),
        }
    }
}

/// 閘道設定，啟動時建立一次，之後不再變動
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub allowed_origin: String,
    pub upstream_credential: Option<String>,
    pub endpoint: String,
    pub route_name: String,
    pub schema_version: String,
    pub request_timeout_secs: u64,
    pub announcement_policy: AnnouncementPolicy,
    pub announcement_date_filter: bool,
    pub diagnostics_snippet_chars: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            upstream_credential: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            route_name: DEFAULT_ROUTE_NAME.to_string(),
            schema_version: crate::core::query::DEFAULT_SCHEMA_VERSION.to_string(),
            request_timeout_secs: 10,
            announcement_policy: AnnouncementPolicy::default(),
            announcement_date_filter: false,
            diagnostics_snippet_chars: 300,
        }
    }
}

// 不輸出金鑰
impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("allowed_origin", &self.allowed_origin)
            .field(
                "upstream_credential",
                &self.upstream_credential.as_ref().map(|_| "***"),
            )
            .field("endpoint", &self.endpoint)
            .field("route_name", &self.route_name)
            .field("schema_version", &self.schema_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("announcement_policy", &self.announcement_policy)
            .field("announcement_date_filter", &self.announcement_date_filter)
            .field("diagnostics_snippet_chars", &self.diagnostics_snippet_chars)
            .finish()
    }
}

impl GatewayConfig {
    /// 從環境變數載入設定
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 以任意查詢函式載入設定，未設定的欄位使用預設值
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let request_timeout_secs = match non_empty(ENV_TIMEOUT_SECS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| GatewayError::InvalidConfigValueError {
                    field: ENV_TIMEOUT_SECS.to_string(),
                    value: raw.clone(),
                    reason: "Expected a whole number of seconds".to_string(),
                })?,
            None => defaults.request_timeout_secs,
        };

        let announcement_policy = match non_empty(ENV_ANNOUNCEMENT_POLICY) {
            Some(raw) => raw.parse::<AnnouncementPolicy>()?,
            None => defaults.announcement_policy,
        };

        let announcement_date_filter = non_empty(ENV_ANNOUNCEMENT_DATE_FILTER)
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.announcement_date_filter);

        Ok(Self {
            allowed_origin: non_empty(ENV_ALLOW_ORIGIN).unwrap_or(defaults.allowed_origin),
            upstream_credential: non_empty(ENV_API_KEY),
            endpoint: non_empty(ENV_ENDPOINT).unwrap_or(defaults.endpoint),
            route_name: non_empty(ENV_ROUTE_NAME).unwrap_or(defaults.route_name),
            request_timeout_secs,
            announcement_policy,
            announcement_date_filter,
            ..defaults
        })
    }

    /// 空字串視同未設定
    pub fn credential(&self) -> Option<&str> {
        self.upstream_credential
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<()> {
        validate_url("endpoint", &self.endpoint)?;
        validate_origin("allowed_origin", &self.allowed_origin)?;
        validate_non_empty_string("route_name", &self.route_name)?;
        validate_non_empty_string("schema_version", &self.schema_version)?;
        validate_range("request_timeout_secs", self.request_timeout_secs, 1, 120)?;
        validate_range("diagnostics_snippet_chars", self.diagnostics_snippet_chars, 1, 4096)?;

        // 金鑰缺少不算設定錯誤，而是每個請求回 500
        if self.credential().is_none() {
            tracing::warn!("⚠️ {} is not set; requests will be rejected", ENV_API_KEY);
        }

        tracing::info!("✅ Gateway configuration validation passed");
        Ok(())
    }
}
