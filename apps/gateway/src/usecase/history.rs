//! # 配信履歴ユースケース

use std::{collections::BTreeMap, sync::Arc};

use mailgate_domain::history::HistoryQuery;
use mailgate_infra::EmailProvider;
use mailgate_shared::event_log::error;
use serde_json::Value;

use crate::error::GatewayError;

/// 配信履歴ユースケース
///
/// `apikey` を取り除いたクエリをプロバイダの統計エンドポイントへ転送する。
pub struct HistoryUseCaseImpl {
    provider: Arc<dyn EmailProvider>,
}

impl HistoryUseCaseImpl {
    pub fn new(provider: Arc<dyn EmailProvider>) -> Self {
        Self { provider }
    }

    pub async fn history(&self, params: BTreeMap<String, String>) -> Result<Value, GatewayError> {
        let query = HistoryQuery::sanitize(params);

        self.provider
            .history(&query)
            .await
            .map_err(|e| GatewayError::upstream(error::kind::EMAIL_PROVIDER, e))
    }
}
