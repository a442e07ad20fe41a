//! # ヘルスチェックハンドラ

use axum::Json;
use mailgate_shared::HealthResponse;

/// ヘルスチェックエンドポイント（常に `"healthy"` を返す）
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
