//! # メール API ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/emails` - メール送信（multipart/form-data）
//! - `GET /api/v1/emails/history` - 配信履歴
//! - `GET /api/v1/emails/search` - インデックス検索
//!
//! 送信フォームのテキストフィールドは `from`, `to`, `subject`, `html`, `toIndex`。
//! ファイル名を持つパートはすべて添付ファイルとしてステージングする。

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartError},
};
use mailgate_domain::email::RawSendInput;
use mailgate_infra::{AttachmentStore, StagedAttachments};
use mailgate_shared::event_log::error;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::GatewayError,
    usecase::{HistoryUseCaseImpl, SearchUseCaseImpl, SendEmailUseCaseImpl},
};

/// メール API の共有状態
pub struct EmailState {
    pub send_usecase:     SendEmailUseCaseImpl,
    pub history_usecase:  HistoryUseCaseImpl,
    pub search_usecase:   SearchUseCaseImpl,
    pub attachment_store: Arc<dyn AttachmentStore>,
}

/// 検索クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub text: Option<String>,
}

/// POST /api/v1/emails
///
/// フォームの読み取り中に失敗した場合も、それまでにステージングした
/// 添付ファイルはガードの破棄で解放される。
#[tracing::instrument(skip_all)]
pub async fn send_email(
    State(state): State<Arc<EmailState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, GatewayError> {
    let mut attachments = StagedAttachments::new(state.attachment_store.clone());
    let input = read_send_form(&mut multipart, &mut attachments).await?;

    let body = state.send_usecase.send(input, attachments).await?;
    Ok(Json(body))
}

/// GET /api/v1/emails/history
#[tracing::instrument(skip_all)]
pub async fn get_history(
    State(state): State<Arc<EmailState>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>, GatewayError> {
    let body = state.history_usecase.history(params).await?;
    Ok(Json(body))
}

/// GET /api/v1/emails/search
#[tracing::instrument(skip_all)]
pub async fn search_emails(
    State(state): State<Arc<EmailState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, GatewayError> {
    let body = state.search_usecase.search(params.text).await?;
    Ok(Json(body))
}

async fn read_send_form(
    multipart: &mut Multipart,
    attachments: &mut StagedAttachments,
) -> Result<RawSendInput, GatewayError> {
    let mut input = RawSendInput::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(str::to_string) {
            let content = field.bytes().await.map_err(invalid_multipart)?;
            attachments
                .stage(&filename, content)
                .await
                .map_err(|e| GatewayError::upstream(error::kind::ATTACHMENT, e))?;
            continue;
        }

        let value = field.text().await.map_err(invalid_multipart)?;
        match name.as_str() {
            "from" => input.from = Some(value),
            "to" => input.to = Some(value),
            "subject" => input.subject = Some(value),
            "html" => input.html = Some(value),
            "toIndex" => input.to_index = parse_flag(&value),
            other => tracing::debug!(field = other, "未知のフォームフィールドを無視"),
        }
    }

    Ok(input)
}

fn invalid_multipart(err: MultipartError) -> GatewayError {
    GatewayError::Validation(format!("invalid multipart body: {}", err.body_text()))
}

/// `"true"`（大文字小文字を区別しない）または `"1"` を真とする
fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case("True", true)]
    #[case("1", true)]
    #[case("false", false)]
    #[case("0", false)]
    #[case("yes", false)]
    #[case("", false)]
    fn test_parse_flag(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(parse_flag(value), expected);
    }
}
