use crate::config::{AnnouncementPolicy, GatewayConfig};
use crate::core::query::{
    announcement_query, escape_xml, route_query, ANNOUNCEMENT_OBJECT_TYPE, ROUTE_OBJECT_TYPE,
};
use crate::domain::model::{AggregateResult, CallDiagnostics, DebugInfo, Record, UpstreamResponse};
use crate::domain::ports::Upstream;
use chrono::NaiveDate;

/// 驅動航線與公告兩個上游查詢，並套用部分失敗策略
pub struct ResultAggregator<U: Upstream> {
    upstream: U,
    credential: String,
    route_name: String,
    schema_version: String,
    policy: AnnouncementPolicy,
    date_filter: bool,
    snippet_chars: usize,
}

impl<U: Upstream> ResultAggregator<U> {
    pub fn new(upstream: U, credential: impl Into<String>, config: &GatewayConfig) -> Self {
        Self {
            upstream,
            credential: credential.into(),
            route_name: config.route_name.clone(),
            schema_version: config.schema_version.clone(),
            policy: config.announcement_policy,
            date_filter: config.announcement_date_filter,
            snippet_chars: config.diagnostics_snippet_chars,
        }
    }

    pub async fn aggregate(&self, date_hint: Option<NaiveDate>) -> AggregateResult {
        match self.policy {
            AnnouncementPolicy::SkipOnRouteFailure => self.aggregate_sequential(date_hint).await,
            AnnouncementPolicy::AlwaysAttempt => self.aggregate_concurrent(date_hint).await,
        }
    }

    async fn aggregate_sequential(&self, date_hint: Option<NaiveDate>) -> AggregateResult {
        let mut route = self.evaluate(self.fetch_route().await, ROUTE_OBJECT_TYPE);

        if let Some(diagnostics) = route.failure.take() {
            tracing::warn!(
                "❌ Route query failed (status {}), skipping announcement query",
                diagnostics.status
            );
            return AggregateResult {
                ferry_route: Vec::new(),
                ferry_announcement: Vec::new(),
                diagnostics: Some(DebugInfo {
                    route: Some(diagnostics),
                    announcement: None,
                    announcement_skipped: true,
                }),
            };
        }

        let announcement = self.evaluate(
            self.fetch_announcement(date_hint).await,
            ANNOUNCEMENT_OBJECT_TYPE,
        );
        merge(route, announcement)
    }

    async fn aggregate_concurrent(&self, date_hint: Option<NaiveDate>) -> AggregateResult {
        let (route, announcement) =
            tokio::join!(self.fetch_route(), self.fetch_announcement(date_hint));
        merge(
            self.evaluate(route, ROUTE_OBJECT_TYPE),
            self.evaluate(announcement, ANNOUNCEMENT_OBJECT_TYPE),
        )
    }

    /// 傳輸失敗、解碼失敗、結構不符都算失敗，一律走診斷路徑
    fn evaluate(&self, response: UpstreamResponse, object_type: &str) -> CallOutcome {
        if !response.is_clean() {
            return CallOutcome::failed(self.diagnose(&response, None));
        }

        match extract_section(response.decoded.as_ref(), object_type) {
            Ok(records) => CallOutcome {
                records,
                failure: None,
            },
            Err(fault) => {
                tracing::warn!("⚠️ Unexpected {} response shape: {}", object_type, fault);
                CallOutcome::failed(self.diagnose(&response, Some(fault.describe())))
            }
        }
    }

    async fn fetch_route(&self) -> UpstreamResponse {
        let query = route_query(&self.route_name).with_schema_version(self.schema_version.clone());
        self.upstream.send(&query.render(&self.credential)).await
    }

    async fn fetch_announcement(&self, date_hint: Option<NaiveDate>) -> UpstreamResponse {
        let active_on = if self.date_filter { date_hint } else { None };
        let query = announcement_query(&self.route_name, active_on)
            .with_schema_version(self.schema_version.clone());
        self.upstream.send(&query.render(&self.credential)).await
    }

    fn diagnose(&self, response: &UpstreamResponse, shape_fault: Option<&str>) -> CallDiagnostics {
        CallDiagnostics {
            ok: response.http_ok,
            status: response.http_status,
            snippet: bounded_snippet(&response.raw_text, &self.credential, self.snippet_chars),
            reason: response
                .fault
                .as_deref()
                .or(shape_fault)
                .map(|fault| redact(fault, &self.credential)),
        }
    }
}

struct CallOutcome {
    records: Vec<Record>,
    failure: Option<CallDiagnostics>,
}

impl CallOutcome {
    fn failed(diagnostics: CallDiagnostics) -> Self {
        Self {
            records: Vec::new(),
            failure: Some(diagnostics),
        }
    }
}

fn merge(route: CallOutcome, announcement: CallOutcome) -> AggregateResult {
    if announcement.failure.is_some() {
        tracing::warn!("⚠️ Announcement query failed, returning empty announcements");
    }

    let diagnostics = if route.failure.is_none() && announcement.failure.is_none() {
        None
    } else {
        Some(DebugInfo {
            route: route.failure,
            announcement: announcement.failure,
            announcement_skipped: false,
        })
    };

    tracing::info!(
        "✅ Aggregated {} routes and {} announcements",
        route.records.len(),
        announcement.records.len()
    );

    AggregateResult {
        ferry_route: route.records,
        ferry_announcement: announcement.records,
        diagnostics,
    }
}

/// 上游回應的結構不符預期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFault {
    /// 找不到 `RESPONSE.RESULT` 陣列
    MissingResultArray,
    /// 區段存在但不是陣列
    SectionNotArray,
}

impl ShapeFault {
    pub fn describe(&self) -> &'static str {
        match self {
            ShapeFault::MissingResultArray => "response has no RESPONSE.RESULT array",
            ShapeFault::SectionNotArray => "result section is not an array",
        }
    }
}

impl std::fmt::Display for ShapeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// 在 `RESPONSE.RESULT[]` 中找出以 `object_type` 為鍵的區段。
/// `RESULT` 存在但沒有該區段代表當天沒有資料，回傳空序列；區段內的項目原樣保留。
pub fn extract_section(
    decoded: Option<&serde_json::Value>,
    object_type: &str,
) -> std::result::Result<Vec<Record>, ShapeFault> {
    let results = decoded
        .and_then(|value| value.get("RESPONSE"))
        .and_then(|response| response.get("RESULT"))
        .and_then(|result| result.as_array())
        .ok_or(ShapeFault::MissingResultArray)?;

    for entry in results {
        if let Some(error) = entry.get("ERROR") {
            tracing::warn!("⚠️ Upstream reported an error entry: {}", error);
        }
    }

    let Some(section) = results.iter().find_map(|entry| entry.get(object_type)) else {
        tracing::debug!("No {} section in upstream result", object_type);
        return Ok(Vec::new());
    };

    let items = section.as_array().ok_or(ShapeFault::SectionNotArray)?;
    Ok(items
        .iter()
        .map(|item| Record { data: item.clone() })
        .collect())
}

/// 先遮蔽金鑰再截斷，避免截斷點落在金鑰中間而洩漏部分內容
pub fn bounded_snippet(raw_text: &str, credential: &str, max_chars: usize) -> String {
    redact(raw_text, credential).chars().take(max_chars).collect()
}

/// 金鑰在查詢文件中是以 XML 跳脫後的形式出現，兩種寫法都要遮蔽
fn redact(text: &str, credential: &str) -> String {
    if credential.is_empty() {
        return text.to_string();
    }
    let redacted = text.replace(credential, "***");
    let escaped = escape_xml(credential);
    if escaped == credential {
        return redacted;
    }
    redacted.replace(escaped.as_ref(), "***")
}
