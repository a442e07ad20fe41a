//! # インデックス検索ユースケース

use std::sync::Arc;

use mailgate_domain::search::SearchQuery;
use mailgate_infra::SearchIndex;
use mailgate_shared::event_log::error;
use serde_json::Value;

use crate::error::GatewayError;

/// インデックス検索ユースケース
///
/// テキストを検証せず、そのまま検索バックエンドへ転送する。
pub struct SearchUseCaseImpl {
    index: Arc<dyn SearchIndex>,
}

impl SearchUseCaseImpl {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    pub async fn search(&self, text: Option<String>) -> Result<Value, GatewayError> {
        self.index
            .query(&SearchQuery::new(text))
            .await
            .map_err(|e| GatewayError::upstream(error::kind::SEARCH_INDEX, e))
    }
}
