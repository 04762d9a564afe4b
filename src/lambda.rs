#[cfg(feature = "lambda")]
use ferry_gateway::domain::model::{GatewayRequest, GatewayResponse};
#[cfg(feature = "lambda")]
use ferry_gateway::utils::{logger, validation::Validate};
#[cfg(feature = "lambda")]
use ferry_gateway::{GatewayConfig, GatewayHandler};
#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use std::sync::Arc;

#[cfg(feature = "lambda")]
async fn function_handler(
    handler: Arc<GatewayHandler>,
    event: LambdaEvent<GatewayRequest>,
) -> Result<GatewayResponse, Error> {
    tracing::info!(
        request_id = %event.context.request_id,
        method = %event.payload.http_method,
        "Handling gateway request"
    );

    // 上游失敗已經在 handler 內轉成 200 + debug，這裡永遠回傳 Ok
    let response = handler.handle(event.payload).await;

    tracing::info!(status = response.status_code, "Gateway request completed");
    Ok(response)
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    // 設定只在冷啟動時讀取一次
    let config = GatewayConfig::from_env()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
    config
        .validate()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

    let handler = Arc::new(GatewayHandler::new(config));

    run(service_fn(move |event: LambdaEvent<GatewayRequest>| {
        let handler = Arc::clone(&handler);
        async move { function_handler(handler, event).await }
    }))
    .await
}
