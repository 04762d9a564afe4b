use clap::Parser;
use ferry_gateway::config::cli::Mode;
use ferry_gateway::core::probe::{check_key, explore_route};
use ferry_gateway::domain::model::GatewayRequest;
use ferry_gateway::utils::{logger, validation::Validate};
use ferry_gateway::{CliConfig, GatewayHandler, HttpUpstream};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting ferry-gateway CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.gateway_config().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e);
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    match cli.mode {
        Mode::Combined => {
            let handler = GatewayHandler::new(config);
            let request = GatewayRequest::new("POST", cli.request_body().as_deref());
            let response = handler.handle(request).await;

            tracing::info!("Gateway responded with status {}", response.status_code);
            println!("{}", pretty(&response.body));
            if response.status_code >= 500 {
                std::process::exit(1);
            }
        }
        Mode::CheckKey => {
            let upstream = HttpUpstream::new(config.endpoint.clone(), config.request_timeout());
            let report = check_key(&upstream, &config).await;

            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.ok {
                std::process::exit(2);
            }
        }
        Mode::ExploreRoute => {
            let upstream = HttpUpstream::new(config.endpoint.clone(), config.request_timeout());
            let response = match explore_route(&upstream, &config).await {
                Ok(response) => response,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
                    std::process::exit(1);
                }
            };

            tracing::info!("Upstream responded with status {}", response.http_status);
            match response.fault {
                Some(fault) if response.http_status == 0 => {
                    eprintln!("❌ {}", fault);
                    std::process::exit(1);
                }
                _ => println!("{}", response.raw_text),
            }
        }
    }

    Ok(())
}

fn pretty(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| body.to_string())
}
