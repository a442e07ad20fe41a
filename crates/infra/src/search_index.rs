//! # 検索インデックス
//!
//! 送信済みメールの登録と全文検索を担当する。
//!
//! - [`HttpSearchIndex`]: HTTP 検索バックエンド（本番用）
//! - [`NoopSearchIndex`]: 検索バックエンド未設定時の実装（ログ出力のみ）
//!
//! ## エンドポイント
//!
//! - `POST {base}/indexes/{index}/documents` - ドキュメント登録
//! - `GET {base}/indexes/{index}/search` - 検索（ハイライト有効、全フィールド取得）

use std::time::Duration;

use async_trait::async_trait;
use mailgate_domain::{email::IndexDocument, search::SearchQuery};
use serde_json::Value;

use crate::error::InfraError;

const SERVICE: &str = "search";

/// 検索インデックストレイト
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// ドキュメントを登録する
    async fn add_documents(&self, documents: &[IndexDocument]) -> Result<(), InfraError>;

    /// 検索を実行し、バックエンドの結果をそのまま返す
    async fn query(&self, query: &SearchQuery) -> Result<Value, InfraError>;
}

/// HTTP 検索バックエンドのクライアント実装
pub struct HttpSearchIndex {
    base_url:   String,
    index_name: String,
    api_key:    Option<String>,
    client:     reqwest::Client,
}

impl HttpSearchIndex {
    /// 新しい HttpSearchIndex を作成する
    ///
    /// `api_key` が指定された場合は Bearer トークンとして送る。
    pub fn new(
        base_url: &str,
        index_name: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            index_name: index_name.to_string(),
            api_key,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/indexes/{}/{}", self.base_url, self.index_name, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

impl std::fmt::Debug for HttpSearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSearchIndex")
            .field("base_url", &self.base_url)
            .field("index_name", &self.index_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    #[tracing::instrument(skip_all, level = "debug", fields(count = documents.len()))]
    async fn add_documents(&self, documents: &[IndexDocument]) -> Result<(), InfraError> {
        let request = self.client.post(self.endpoint("documents")).json(documents);
        let response = self.authorize(request).send().await?;

        ensure_success(response).await.map(|_| ())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn query(&self, query: &SearchQuery) -> Result<Value, InfraError> {
        let request = self
            .client
            .get(self.endpoint("search"))
            .query(&query_params(query));
        let response = self.authorize(request).send().await?;

        let response = ensure_success(response).await?;
        Ok(response.json::<Value>().await?)
    }
}

fn query_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("q", query.text.clone())];
    if query.highlight {
        params.push(("highlight", "true".to_string()));
    }
    if query.fetch_all_fields {
        params.push(("fields", "*".to_string()));
    }
    params
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, InfraError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(InfraError::upstream_status(SERVICE, status.as_u16(), body))
}

/// Noop 検索インデックス（ログ出力のみ）
///
/// 登録は成功扱い、検索は常に空の結果を返す。
#[derive(Debug, Clone)]
pub struct NoopSearchIndex;

#[async_trait]
impl SearchIndex for NoopSearchIndex {
    async fn add_documents(&self, documents: &[IndexDocument]) -> Result<(), InfraError> {
        tracing::info!(count = documents.len(), "Noop: インデックス登録をスキップ");
        Ok(())
    }

    async fn query(&self, query: &SearchQuery) -> Result<Value, InfraError> {
        tracing::info!(text = %query.text, "Noop: 検索をスキップ");
        Ok(serde_json::json!({ "hits": [] }))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_response(status: u16, body: &str) -> reqwest::Response {
        let http_resp = http::Response::builder()
            .status(status)
            .body(body.to_string())
            .unwrap();
        reqwest::Response::from(http_resp)
    }

    #[test]
    fn test_query_params_固定パラメータを付与する() {
        let params = query_params(&SearchQuery::new(Some("請求書".to_string())));

        assert_eq!(
            params,
            vec![
                ("q", "請求書".to_string()),
                ("highlight", "true".to_string()),
                ("fields", "*".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_params_テキスト欠落は空のqを送る() {
        let params = query_params(&SearchQuery::new(None));

        assert_eq!(params[0], ("q", String::new()));
    }

    #[tokio::test]
    async fn test_ensure_success_2xxはレスポンスを返す() {
        let result = ensure_success(make_response(202, "")).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_success_非2xxはupstream_statusを返す() {
        let err = ensure_success(make_response(404, "index not found"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(404));
        assert!(format!("{err}").contains("index not found"));
    }

    #[test]
    fn test_endpoint_インデックス名を含む() {
        let index =
            HttpSearchIndex::new("http://localhost:7700/", "emails", None, Duration::from_secs(5))
                .unwrap();

        assert_eq!(
            index.endpoint("documents"),
            "http://localhost:7700/indexes/emails/documents"
        );
    }

    #[test]
    fn test_debug_api_keyを出力しない() {
        let index = HttpSearchIndex::new(
            "http://localhost:7700",
            "emails",
            Some("master-key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(!format!("{index:?}").contains("master-key"));
    }

    #[tokio::test]
    async fn test_noop_登録はエラーを返さない() {
        let document = IndexDocument {
            title:      "件名".to_string(),
            sender:     "noreply@x.com".to_string(),
            recipients: vec!["alice@x.com".to_string()],
            content:    "<p>本文</p>".to_string(),
        };

        let result = NoopSearchIndex.add_documents(&[document]).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_noop_検索は空の結果を返す() {
        let result = NoopSearchIndex.query(&SearchQuery::new(None)).await.unwrap();

        assert_eq!(result, serde_json::json!({ "hits": [] }));
    }
}
