use crate::core::client::decode_body;
use crate::core::query::QueryDocument;
use crate::domain::model::UpstreamResponse;
use crate::domain::ports::Upstream;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 依查詢的物件類型回傳預先準備好的回應，並記錄送出的文件
#[derive(Clone)]
pub struct ScriptedUpstream {
    route: UpstreamResponse,
    announcement: UpstreamResponse,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedUpstream {
    pub fn new(route: UpstreamResponse, announcement: UpstreamResponse) -> Self {
        Self {
            route,
            announcement,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn sent_documents(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn announcement_calls(&self) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|doc| doc.contains(r#"objecttype="FerryAnnouncement""#))
            .count()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn send(&self, document: &QueryDocument) -> UpstreamResponse {
        self.sent.lock().await.push(document.as_str().to_string());
        if document.as_str().contains(r#"objecttype="FerryAnnouncement""#) {
            self.announcement.clone()
        } else {
            self.route.clone()
        }
    }
}

pub fn clean_response(payload: serde_json::Value) -> UpstreamResponse {
    UpstreamResponse {
        http_ok: true,
        http_status: 200,
        raw_text: payload.to_string(),
        decoded: Some(payload),
        fault: None,
    }
}

pub fn failed_response(status: u16, raw_text: &str) -> UpstreamResponse {
    UpstreamResponse {
        http_ok: false,
        http_status: status,
        raw_text: raw_text.to_string(),
        decoded: decode_body(raw_text).into_option(),
        fault: None,
    }
}

pub fn route_payload() -> serde_json::Value {
    json!({"RESPONSE": {"RESULT": [{"FerryRoute": [{
        "Id": 12,
        "Name": "Aspöleden",
        "FromHarbour": {"Name": "Lökholmen"},
        "ToHarbour": {"Name": "Aspö"},
        "TimeTable": [{"Valid": [{"From": "2025-01-01T00:00:00"}]}]
    }]}]}})
}
