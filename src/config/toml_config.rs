use crate::config::GatewayConfig;
use crate::utils::error::{GatewayError, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::path::Path;

/// 設定檔格式：
///
/// ```toml
/// [gateway]
/// allowed_origin = "https://aspo-zeitplan.netlify.app"
/// upstream_credential = "${TRV_API_KEY}"
/// request_timeout_secs = 8
/// announcement_policy = "always-attempt"
/// ```
#[derive(Debug, Deserialize)]
struct GatewayFile {
    #[serde(default)]
    gateway: GatewayConfig,
}

impl GatewayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GatewayError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content, |name| std::env::var(name).ok())?;

        let file: GatewayFile =
            toml::from_str(&processed_content).map_err(|e| GatewayError::ConfigError {
                message: format!("TOML parsing error: {}", e),
            })?;

        let mut config = file.gateway;
        // 替換後為空字串的金鑰視同未設定
        if config.credential().is_none() {
            config.upstream_credential = None;
        }
        Ok(config)
    }
}

/// 替換環境變數 (例如 ${TRV_API_KEY})；找不到的變數換成空字串
fn substitute_env_vars<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
        GatewayError::InternalError {
            message: format!("invalid substitution pattern: {}", e),
        }
    })?;

    let result = re.replace_all(content, |caps: &Captures| {
        let var_name = &caps[1];
        lookup(var_name).unwrap_or_else(|| {
            tracing::warn!("⚠️ Environment variable {} referenced in config is not set", var_name);
            String::new()
        })
    });

    Ok(result.into_owned())
}
