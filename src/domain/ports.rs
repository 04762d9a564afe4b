use crate::core::query::QueryDocument;
use crate::domain::model::UpstreamResponse;
use async_trait::async_trait;

/// 對上游查詢 API 送出一份查詢文件。
///
/// 實作不得因非 2xx 狀態或解碼失敗而回傳錯誤；所有失敗都放在
/// [`UpstreamResponse`] 的欄位中。
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, document: &QueryDocument) -> UpstreamResponse;
}
