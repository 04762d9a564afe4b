use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 上游回傳的一筆項目（FerryRoute / FerryAnnouncement），內容原樣保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: serde_json::Value,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.data.get(field)
    }
}

pub type RouteRecord = Record;
pub type AnnouncementRecord = Record;

/// 單次上游呼叫的結果。HTTP 失敗與解碼失敗都以欄位表示，不是錯誤。
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub http_ok: bool,
    pub http_status: u16,
    pub raw_text: String,
    /// 任何一層解碼失敗時為 `None`
    pub decoded: Option<serde_json::Value>,
    /// 傳輸或解碼失敗的簡短原因，僅供診斷
    pub fault: Option<String>,
}

impl UpstreamResponse {
    /// DNS / 連線 / 逾時等傳輸層失敗
    pub fn transport_failure(reason: impl Into<String>) -> Self {
        Self {
            http_ok: false,
            http_status: 0,
            raw_text: String::new(),
            decoded: None,
            fault: Some(reason.into()),
        }
    }

    /// 傳輸與解碼都成功；內容結構是否符合預期由彙整器判斷
    pub fn is_clean(&self) -> bool {
        self.http_ok && self.decoded.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDiagnostics {
    pub ok: bool,
    pub status: u16,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<CallDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcement: Option<CallDiagnostics>,
    pub announcement_skipped: bool,
}

/// 合併後的結果；兩個序列永遠存在，失敗時為空
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    pub ferry_route: Vec<RouteRecord>,
    pub ferry_announcement: Vec<AnnouncementRecord>,
    pub diagnostics: Option<DebugInfo>,
}

impl AggregateResult {
    /// 前端預期的格式：
    /// `{ "RESPONSE": { "RESULT": [ {"FerryRoute": [...]}, {"FerryAnnouncement": [...]} ] }, "debug"?: {...} }`
    pub fn to_body(&self) -> CombinedBody<'_> {
        CombinedBody {
            response: CombinedResponse {
                result: (
                    RouteSection {
                        records: &self.ferry_route,
                    },
                    AnnouncementSection {
                        records: &self.ferry_announcement,
                    },
                ),
            },
            debug: self.diagnostics.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CombinedBody<'a> {
    #[serde(rename = "RESPONSE")]
    response: CombinedResponse<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<&'a DebugInfo>,
}

#[derive(Debug, Serialize)]
struct CombinedResponse<'a> {
    #[serde(rename = "RESULT")]
    result: (RouteSection<'a>, AnnouncementSection<'a>),
}

#[derive(Debug, Serialize)]
struct RouteSection<'a> {
    #[serde(rename = "FerryRoute")]
    records: &'a [RouteRecord],
}

#[derive(Debug, Serialize)]
struct AnnouncementSection<'a> {
    #[serde(rename = "FerryAnnouncement")]
    records: &'a [AnnouncementRecord],
}

/// 函式平台傳入的 HTTP 事件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub http_method: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: Option<bool>,
}

impl GatewayRequest {
    pub fn new(http_method: &str, body: Option<&str>) -> Self {
        Self {
            http_method: http_method.to_string(),
            body: body.map(str::to_string),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}
