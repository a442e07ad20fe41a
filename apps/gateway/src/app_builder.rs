//! # アプリケーション構築
//!
//! 外部サービス実装の初期化（DI）とルーター構築を担当する。
//! `main.rs` は設定読み込みとサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use mailgate_infra::{
    EmailProvider,
    FilePermissionTreeSource,
    HttpPermissionTreeSource,
    HttpSearchIndex,
    InfraError,
    LocalAttachmentStore,
    MailgunEmailProvider,
    NoopSearchIndex,
    PermissionTreeSource,
    SearchIndex,
};
use mailgate_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    config::{GatewayConfig, PermissionTreeConfig},
    handler::{EmailState, get_history, health_check, search_emails, send_email},
    usecase::{HistoryUseCaseImpl, SearchUseCaseImpl, SendEmailUseCaseImpl, spawn_index_worker},
};

/// 送信エンドポイントのリクエストボディ上限（添付ファイル込み）
pub const MAX_SEND_BODY_BYTES: usize = 25 * 1024 * 1024;

/// 設定から外部サービス実装を組み立て、共有状態を作る
///
/// インデックス登録ワーカーを起動するため、tokio ランタイム上で呼び出すこと。
pub fn build_state(config: &GatewayConfig) -> Result<Arc<EmailState>, InfraError> {
    let provider: Arc<dyn EmailProvider> = Arc::new(MailgunEmailProvider::new(
        &config.mailgun.api_base,
        &config.mailgun.domain,
        &config.mailgun.api_key,
        config.http_timeout,
    )?);

    let permission_source: Arc<dyn PermissionTreeSource> = match &config.permission_tree {
        PermissionTreeConfig::Url(url) => {
            Arc::new(HttpPermissionTreeSource::new(url, config.http_timeout)?)
        }
        PermissionTreeConfig::File(path) => Arc::new(FilePermissionTreeSource::new(path.clone())),
    };

    let search_index: Arc<dyn SearchIndex> = match &config.search {
        Some(search) => Arc::new(HttpSearchIndex::new(
            &search.url,
            &search.index_name,
            search.api_key.clone(),
            config.http_timeout,
        )?),
        None => {
            tracing::info!("SEARCH_URL が未設定のため Noop 検索インデックスを使用します");
            Arc::new(NoopSearchIndex)
        }
    };

    let index_queue = spawn_index_worker(search_index.clone());

    Ok(Arc::new(EmailState {
        send_usecase:     SendEmailUseCaseImpl::new(
            provider.clone(),
            permission_source,
            index_queue,
        ),
        history_usecase:  HistoryUseCaseImpl::new(provider),
        search_usecase:   SearchUseCaseImpl::new(search_index),
        attachment_store: Arc::new(LocalAttachmentStore::new(config.upload_dir.clone())),
    }))
}

/// ルーターを構築する
pub fn build_app(state: Arc<EmailState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/v1/emails",
            post(send_email).layer(DefaultBodyLimit::max(MAX_SEND_BODY_BYTES)),
        )
        .route("/api/v1/emails/history", get(get_history))
        .route("/api/v1/emails/search", get(search_emails))
        .with_state(state)
        // Request ID レイヤー（下に書いたものが外側）
        // 1. SetRequestIdLayer（最外）: UUID v7 を生成（またはクライアント提供値を使用）
        // 2. TraceLayer: request_id をスパンに記録
        // 3. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
