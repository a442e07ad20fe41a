//! # ゲートウェイエラー定義
//!
//! ユースケースが返すエラーと、HTTP レスポンスへの変換を定義する。
//!
//! | バリアント | ステータス | error type |
//! |---|---|---|
//! | `Validation` | 400 | `validation-error` |
//! | `Upstream` | 502 | `upstream-error` |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailgate_domain::DomainError;
use mailgate_infra::InfraError;
use mailgate_shared::{ErrorResponse, event_log::error};
use thiserror::Error;

/// ゲートウェイで発生するエラー
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 呼び出し元の入力が前提条件を満たさない
    ///
    /// 再試行しても結果は変わらない。
    #[error("{0}")]
    Validation(String),

    /// 外部サービスが失敗した、または成功以外を返した
    #[error("{context}: {detail}")]
    Upstream {
        /// 失敗した呼び出し（例: "email_provider"）
        context: &'static str,
        /// 上流のステータスとボディ、または通信エラーの内容
        detail:  String,
    },
}

impl GatewayError {
    /// インフラ層エラーを上流エラーに変換し、エラーコンテキスト付きでログ出力する
    ///
    /// `context` には [`error::kind`] の定数を渡す。
    pub fn upstream(context: &'static str, source: InfraError) -> Self {
        tracing::error!(
            error.category = error::category::EXTERNAL_SERVICE,
            error.kind = context,
            span_trace = %source.span_trace(),
            "外部サービス呼び出しに失敗: {}",
            source
        );
        Self::Upstream {
            context,
            detail: source.to_string(),
        }
    }
}

impl From<DomainError> for GatewayError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(reason) => Self::Validation(reason),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = match self {
            GatewayError::Validation(reason) => ErrorResponse::validation_error(reason),
            GatewayError::Upstream { detail, .. } => ErrorResponse::upstream_error(detail),
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn response_body(response: Response) -> ErrorResponse {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_from_domain_errorでvalidationになる() {
        let err: GatewayError = DomainError::validation("from required").into();

        assert!(matches!(err, GatewayError::Validation(reason) if reason == "from required"));
    }

    #[test]
    fn test_upstreamは上流の詳細を保持する() {
        let source = InfraError::upstream_status("mailgun", 401, "Forbidden");

        let err = GatewayError::upstream(error::kind::EMAIL_PROVIDER, source);

        match err {
            GatewayError::Upstream { context, detail } => {
                assert_eq!(context, "email_provider");
                assert!(detail.contains("401"));
                assert!(detail.contains("Forbidden"));
            }
            other => panic!("Upstream を期待したが {other:?} を受け取った"),
        }
    }

    #[tokio::test]
    async fn test_validationは400を返す() {
        let response = GatewayError::Validation("html required".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_body(response).await;
        assert_eq!(body.detail, "html required");
        assert_eq!(
            body.error_type,
            "https://mailgate.example.com/errors/validation-error"
        );
    }

    #[tokio::test]
    async fn test_upstreamは502を返す() {
        let response = GatewayError::Upstream {
            context: error::kind::PERMISSION_TREE,
            detail:  "permission-tree がステータス 500 を返しました: boom".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = response_body(response).await;
        assert_eq!(body.status, 502);
        assert!(body.detail.contains("boom"));
    }
}
