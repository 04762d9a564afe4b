use anyhow::Result;
use ferry_gateway::domain::model::GatewayRequest;
use ferry_gateway::{AnnouncementPolicy, GatewayConfig, GatewayHandler};
use httpmock::prelude::*;
use serde_json::json;

const ROUTE_MARKER: &str = r#"objecttype="FerryRoute""#;
const ANNOUNCEMENT_MARKER: &str = r#"objecttype="FerryAnnouncement""#;

fn config_for(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        upstream_credential: Some("integration-key".to_string()),
        endpoint: server.url("/v2/data.json"),
        request_timeout_secs: 5,
        ..Default::default()
    }
}

fn route_body() -> serde_json::Value {
    json!({"RESPONSE": {"RESULT": [{"FerryRoute": [
        {"Id": 1, "Name": "Aspöleden", "TimeTable": [{"Start": "06:15"}]},
        {"Id": 2, "Name": "Aspöleden", "TimeTable": [{"Start": "07:15"}]}
    ]}]}})
}

fn announcement_body() -> serde_json::Value {
    json!({"RESPONSE": {"RESULT": [{"FerryAnnouncement": [
        {"RouteName": "Aspöleden", "Message": "Reducerad turlista", "Priority": 2}
    ]}]}})
}

fn post(body: &str) -> GatewayRequest {
    GatewayRequest::new("POST", Some(body))
}

#[tokio::test]
async fn test_end_to_end_combined_response() -> Result<()> {
    let server = MockServer::start();

    let route_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v2/data.json")
            .header("content-type", "text/xml")
            .body_contains(ROUTE_MARKER)
            .body_contains(r#"<LOGIN authenticationkey="integration-key" />"#);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(route_body());
    });
    let announcement_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v2/data.json")
            .body_contains(ANNOUNCEMENT_MARKER)
            .body_contains(r#"value="%Aspöleden%""#);
        then.status(200).json_body(announcement_body());
    });

    let handler = GatewayHandler::new(config_for(&server));
    let response = handler.handle(post(r#"{"date":"2025-06-01"}"#)).await;

    route_mock.assert();
    announcement_mock.assert();
    assert_eq!(response.status_code, 200);

    let body: serde_json::Value = serde_json::from_str(&response.body)?;
    assert_eq!(body["RESPONSE"]["RESULT"][0]["FerryRoute"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["RESPONSE"]["RESULT"][1]["FerryAnnouncement"][0]["Message"],
        "Reducerad turlista"
    );
    assert!(body.get("debug").is_none());
    Ok(())
}

#[tokio::test]
async fn test_double_encoded_upstream_bodies_are_unwrapped() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).body_contains(ROUTE_MARKER);
        then.status(200)
            .body(serde_json::to_string(&route_body().to_string()).unwrap());
    });
    server.mock(|when, then| {
        when.method(POST).body_contains(ANNOUNCEMENT_MARKER);
        then.status(200)
            .body(serde_json::to_string(&announcement_body().to_string()).unwrap());
    });

    let handler = GatewayHandler::new(config_for(&server));
    let response = handler.handle(post("{}")).await;
    let body: serde_json::Value = serde_json::from_str(&response.body)?;

    assert_eq!(response.status_code, 200);
    assert_eq!(body["RESPONSE"]["RESULT"][0]["FerryRoute"][1]["Id"], 2);
    assert_eq!(body["RESPONSE"]["RESULT"][1]["FerryAnnouncement"][0]["Priority"], 2);
    assert!(body.get("debug").is_none());
    Ok(())
}

#[tokio::test]
async fn test_unexpected_route_shape_is_reported_not_empty() -> Result<()> {
    let server = MockServer::start();

    // 三層包裝：解兩次後仍是字串
    let triple = serde_json::to_string(&serde_json::to_string(&route_body().to_string())?)?;
    let route_mock = server.mock(|when, then| {
        when.method(POST).body_contains(ROUTE_MARKER);
        then.status(200).body(triple);
    });
    let announcement_mock = server.mock(|when, then| {
        when.method(POST).body_contains(ANNOUNCEMENT_MARKER);
        then.status(200).json_body(announcement_body());
    });

    let handler = GatewayHandler::new(config_for(&server));
    let response = handler.handle(post("{}")).await;
    let body: serde_json::Value = serde_json::from_str(&response.body)?;

    route_mock.assert();
    announcement_mock.assert_hits(0);
    assert_eq!(response.status_code, 200);
    assert_eq!(body["RESPONSE"]["RESULT"][0]["FerryRoute"], json!([]));
    assert_eq!(body["debug"]["route"]["status"], 200);
    assert!(body["debug"]["route"]["reason"].is_string());
    assert!(!body["debug"]["route"]["snippet"].as_str().unwrap().is_empty());
    assert_eq!(body["debug"]["announcementSkipped"], true);
    Ok(())
}

#[tokio::test]
async fn test_route_down_returns_200_with_diagnostics() -> Result<()> {
    let server = MockServer::start();

    let route_mock = server.mock(|when, then| {
        when.method(POST).body_contains(ROUTE_MARKER);
        then.status(503).body("Service Unavailable");
    });
    let announcement_mock = server.mock(|when, then| {
        when.method(POST).body_contains(ANNOUNCEMENT_MARKER);
        then.status(200).json_body(announcement_body());
    });

    let handler = GatewayHandler::new(config_for(&server));
    let response = handler.handle(post("not json at all")).await;
    let body: serde_json::Value = serde_json::from_str(&response.body)?;

    route_mock.assert();
    announcement_mock.assert_hits(0);
    assert_eq!(response.status_code, 200);
    assert_eq!(body["RESPONSE"]["RESULT"][0]["FerryRoute"], json!([]));
    assert_eq!(body["RESPONSE"]["RESULT"][1]["FerryAnnouncement"], json!([]));
    assert_eq!(body["debug"]["route"]["status"], 503);
    assert_eq!(body["debug"]["route"]["snippet"], "Service Unavailable");
    assert_eq!(body["debug"]["announcementSkipped"], true);
    Ok(())
}

#[tokio::test]
async fn test_route_down_with_always_attempt_policy() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).body_contains(ROUTE_MARKER);
        then.status(500).body("boom");
    });
    let announcement_mock = server.mock(|when, then| {
        when.method(POST).body_contains(ANNOUNCEMENT_MARKER);
        then.status(200).json_body(announcement_body());
    });

    let config = GatewayConfig {
        announcement_policy: AnnouncementPolicy::AlwaysAttempt,
        ..config_for(&server)
    };
    let handler = GatewayHandler::new(config);
    let response = handler.handle(post("{}")).await;
    let body: serde_json::Value = serde_json::from_str(&response.body)?;

    announcement_mock.assert();
    assert_eq!(response.status_code, 200);
    assert_eq!(body["RESPONSE"]["RESULT"][0]["FerryRoute"], json!([]));
    assert_eq!(
        body["RESPONSE"]["RESULT"][1]["FerryAnnouncement"].as_array().unwrap().len(),
        1
    );
    assert_eq!(body["debug"]["route"]["status"], 500);
    assert_eq!(body["debug"]["announcementSkipped"], false);
    Ok(())
}

#[tokio::test]
async fn test_announcement_down_keeps_route_list() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).body_contains(ROUTE_MARKER);
        then.status(200).json_body(route_body());
    });
    server.mock(|when, then| {
        when.method(POST).body_contains(ANNOUNCEMENT_MARKER);
        then.status(200).body("<html>upstream proxy error</html>");
    });

    let handler = GatewayHandler::new(config_for(&server));
    let response = handler.handle(post("{}")).await;
    let body: serde_json::Value = serde_json::from_str(&response.body)?;

    assert_eq!(response.status_code, 200);
    assert_eq!(body["RESPONSE"]["RESULT"][0]["FerryRoute"].as_array().unwrap().len(), 2);
    assert_eq!(body["RESPONSE"]["RESULT"][1]["FerryAnnouncement"], json!([]));
    assert!(body["debug"].get("route").is_none());
    assert_eq!(body["debug"]["announcement"]["snippet"], "<html>upstream proxy error</html>");
    Ok(())
}

#[tokio::test]
async fn test_missing_credential_makes_no_upstream_call() -> Result<()> {
    let server = MockServer::start();
    let any_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(route_body());
    });

    let config = GatewayConfig {
        upstream_credential: None,
        ..config_for(&server)
    };
    let handler = GatewayHandler::new(config);
    let response = handler.handle(post(r#"{"date":"2025-06-01"}"#)).await;
    let body: serde_json::Value = serde_json::from_str(&response.body)?;

    any_mock.assert_hits(0);
    assert_eq!(response.status_code, 500);
    assert!(body["error"].is_string());
    assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
    Ok(())
}

#[tokio::test]
async fn test_preflight_without_credential() {
    let server = MockServer::start();
    let any_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });

    let config = GatewayConfig {
        upstream_credential: None,
        allowed_origin: "https://aspo-zeitplan.netlify.app".to_string(),
        ..config_for(&server)
    };
    let handler = GatewayHandler::new(config);
    let response = handler
        .handle(GatewayRequest::new("OPTIONS", Some(r#"{"date":"x"}"#)))
        .await;

    any_mock.assert_hits(0);
    assert_eq!(response.status_code, 200);
    assert!(response.body.is_empty());
    assert_eq!(
        response.headers["Access-Control-Allow-Origin"],
        "https://aspo-zeitplan.netlify.app"
    );
    assert_eq!(response.headers["Access-Control-Allow-Methods"], "POST, OPTIONS");
    assert_eq!(response.headers["Access-Control-Allow-Headers"], "Content-Type");
}

#[tokio::test]
async fn test_unreachable_upstream_degrades_to_empty_lists() -> Result<()> {
    let config = GatewayConfig {
        upstream_credential: Some("k".to_string()),
        endpoint: "http://127.0.0.1:1/v2/data.json".to_string(),
        request_timeout_secs: 2,
        ..Default::default()
    };
    let handler = GatewayHandler::new(config);
    let response = handler.handle(post("{}")).await;
    let body: serde_json::Value = serde_json::from_str(&response.body)?;

    assert_eq!(response.status_code, 200);
    assert_eq!(body["RESPONSE"]["RESULT"][0]["FerryRoute"], json!([]));
    assert_eq!(body["RESPONSE"]["RESULT"][1]["FerryAnnouncement"], json!([]));
    assert_eq!(body["debug"]["route"]["status"], 0);
    assert!(body["debug"]["route"]["reason"].is_string());
    Ok(())
}
