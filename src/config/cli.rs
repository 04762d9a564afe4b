use crate::config::{GatewayConfig, ENV_API_KEY};
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// 與閘道相同的合併回應
    Combined,
    /// 確認金鑰是否被上游接受
    CheckKey,
    /// 輸出航線物件的完整原始內容
    ExploreRoute,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "ferry-gateway")]
#[command(about = "Ferry schedule and announcement gateway")]
pub struct CliConfig {
    #[arg(long, value_enum, default_value_t = Mode::Combined)]
    pub mode: Mode,

    #[arg(long, help = "Date hint in YYYY-MM-DD format (defaults to today)")]
    pub date: Option<String>,

    #[arg(long, help = "TOML config file (environment variables are used when omitted)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override the ferry route name")]
    pub route_name: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 組合出閘道設定：設定檔或環境變數，再套用命令列覆寫
    pub fn gateway_config(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = GatewayConfig::from_file(path)?;
                if config.credential().is_none() {
                    config.upstream_credential = std::env::var(ENV_API_KEY).ok();
                }
                config
            }
            None => GatewayConfig::from_env()?,
        };

        if let Some(route_name) = &self.route_name {
            config.route_name = route_name.clone();
        }
        Ok(config)
    }

    /// 模擬前端送出的 body
    pub fn request_body(&self) -> Option<String> {
        self.date
            .as_ref()
            .map(|date| serde_json::json!({ "date": date }).to_string())
    }
}
