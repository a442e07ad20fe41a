//! # メール送信プロバイダ
//!
//! Mailgun 互換の HTTP API を介してメールを送信し、配信統計を取得する。
//!
//! ## エンドポイント
//!
//! - `POST {base}/v3/{domain}/messages` - multipart でメール送信（成功は 200 のみ）
//! - `GET {base}/v3/{domain}/stats/total` - 配信統計
//!
//! 認証はいずれも Basic 認証（ユーザー名 `api`、パスワードに API キー）。

use std::time::Duration;

use async_trait::async_trait;
use mailgate_domain::{
    email::{AttachmentFile, EmailSendRequest},
    history::HistoryQuery,
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::InfraError;

const SERVICE: &str = "mailgun";

/// メール送信プロバイダトレイト
///
/// テスト時にはモックを使用できるようトレイトで定義。
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// 認可済み宛先へメールを送信し、プロバイダの受理レスポンスをそのまま返す
    async fn send(
        &self,
        request: &EmailSendRequest,
        attachments: &[AttachmentFile],
    ) -> Result<Value, InfraError>;

    /// 配信統計を取得する
    async fn history(&self, query: &HistoryQuery) -> Result<Value, InfraError>;
}

/// Mailgun API クライアント実装
pub struct MailgunEmailProvider {
    base_url: String,
    domain:   String,
    api_key:  String,
    client:   reqwest::Client,
}

impl MailgunEmailProvider {
    /// 新しい MailgunEmailProvider を作成する
    ///
    /// # 引数
    ///
    /// - `base_url`: API のベース URL（例: `https://api.mailgun.net`）
    /// - `domain`: 送信ドメイン
    /// - `api_key`: API キー
    /// - `timeout`: 各リクエストに適用するタイムアウト
    pub fn new(
        base_url: &str,
        domain: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            domain: domain.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v3/{}/{}", self.base_url, self.domain, path)
    }
}

impl std::fmt::Debug for MailgunEmailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunEmailProvider")
            .field("base_url", &self.base_url)
            .field("domain", &self.domain)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl EmailProvider for MailgunEmailProvider {
    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(recipients = request.recipients().len(), attachments = attachments.len())
    )]
    async fn send(
        &self,
        request: &EmailSendRequest,
        attachments: &[AttachmentFile],
    ) -> Result<Value, InfraError> {
        let form = build_send_form(request, attachments).await?;

        let response = self
            .client
            .post(self.endpoint("messages"))
            .basic_auth("api", Some(&self.api_key))
            .multipart(form)
            .send()
            .await?;

        handle_send_response(response).await
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn history(&self, query: &HistoryQuery) -> Result<Value, InfraError> {
        let mut url = self.endpoint("stats/total");
        if let Some(qs) = query.to_query_string() {
            url.push('?');
            url.push_str(&qs);
        }

        let response = self
            .client
            .get(&url)
            .basic_auth("api", Some(&self.api_key))
            .send()
            .await?;

        handle_history_response(response).await
    }
}

/// 送信用の multipart フォームを組み立てる
///
/// 宛先は 1 件ずつ `to` フィールドとして繰り返し、結合文字列にはしない。
/// 添付ファイルはステージング先から読み込み、元のファイル名を表示名にする。
async fn build_send_form(
    request: &EmailSendRequest,
    attachments: &[AttachmentFile],
) -> Result<Form, InfraError> {
    let mut form = Form::new()
        .text("from", request.sender().to_string())
        .text("subject", request.subject().to_string())
        .text("html", request.html().to_string());

    for recipient in request.recipients().iter() {
        form = form.text("to", recipient.clone());
    }

    for attachment in attachments {
        let bytes = tokio::fs::read(&attachment.path).await?;
        let part = Part::bytes(bytes).file_name(attachment.filename.clone());
        form = form.part("attachment", part);
    }

    Ok(form)
}

/// 送信レスポンスを処理する
///
/// 200 のみを受理とみなす。受理ボディが JSON でなければ `{"message": <本文>}` に包む。
async fn handle_send_response(response: reqwest::Response) -> Result<Value, InfraError> {
    let status = response.status();
    let body = response.text().await?;

    if status != reqwest::StatusCode::OK {
        return Err(InfraError::upstream_status(SERVICE, status.as_u16(), body));
    }

    Ok(serde_json::from_str(&body).unwrap_or_else(|_| serde_json::json!({ "message": body })))
}

/// 配信統計レスポンスを処理する
async fn handle_history_response(response: reqwest::Response) -> Result<Value, InfraError> {
    let status = response.status();

    if status.is_success() {
        let body = response.json::<Value>().await?;
        return Ok(body);
    }

    let body = response.text().await.unwrap_or_default();
    Err(InfraError::upstream_status(SERVICE, status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use mailgate_domain::{email::RawSendInput, recipient::PermissionTree};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::InfraErrorKind;

    fn make_response(status: u16, body: &str) -> reqwest::Response {
        let http_resp = http::Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(body.to_string())
            .unwrap();
        reqwest::Response::from(http_resp)
    }

    fn send_request() -> EmailSendRequest {
        let input = RawSendInput {
            from:     Some("noreply@x.com".to_string()),
            to:       Some(r#"{"teamA": ["alice@x.com"]}"#.to_string()),
            subject:  Some("件名".to_string()),
            html:     Some("<p>本文</p>".to_string()),
            to_index: false,
        };
        let tree = PermissionTree::from_iter([("teamA", vec!["alice@x.com"])]);
        EmailSendRequest::authorize(input.validate().unwrap(), &tree).unwrap()
    }

    // ===== handle_send_response =====

    #[tokio::test]
    async fn test_send_200のときjsonボディを返す() {
        let response = make_response(200, r#"{"id": "<m1@x.com>", "message": "Queued"}"#);

        let body = handle_send_response(response).await.unwrap();

        assert_eq!(body["id"], "<m1@x.com>");
        assert_eq!(body["message"], "Queued");
    }

    #[tokio::test]
    async fn test_send_200で非jsonのときmessageに包む() {
        let response = make_response(200, "Queued. Thank you.");

        let body = handle_send_response(response).await.unwrap();

        assert_eq!(body, serde_json::json!({ "message": "Queued. Thank you." }));
    }

    #[tokio::test]
    async fn test_send_202のときupstream_statusを返す() {
        let response = make_response(202, "{}");

        let err = handle_send_response(response).await.unwrap_err();

        assert_eq!(err.status_code(), Some(202));
    }

    #[tokio::test]
    async fn test_send_401のとき本文を保持したupstream_statusを返す() {
        let response = make_response(401, "Forbidden");

        let err = handle_send_response(response).await.unwrap_err();

        match err.kind() {
            InfraErrorKind::UpstreamStatus {
                service,
                status,
                body,
            } => {
                assert_eq!(service, "mailgun");
                assert_eq!(*status, 401);
                assert_eq!(body, "Forbidden");
            }
            other => panic!("UpstreamStatus を期待したが {other:?} を受け取った"),
        }
    }

    // ===== handle_history_response =====

    #[tokio::test]
    async fn test_history_2xxのときjsonボディを返す() {
        let response = make_response(200, r#"{"stats": []}"#);

        let body = handle_history_response(response).await.unwrap();

        assert_eq!(body, serde_json::json!({ "stats": [] }));
    }

    #[tokio::test]
    async fn test_history_500のときupstream_statusを返す() {
        let response = make_response(500, "server error");

        let err = handle_history_response(response).await.unwrap_err();

        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_history_成功だが不正なjsonのときhttpエラーを返す() {
        let response = make_response(200, "not json");

        let err = handle_history_response(response).await.unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Http(_)));
    }

    // ===== build_send_form =====

    #[tokio::test]
    async fn test_build_send_form_添付ファイルが読めないときioエラーを返す() {
        let dir = tempfile::tempdir().unwrap();
        let missing = AttachmentFile {
            filename: "report.pdf".to_string(),
            path:     dir.path().join("missing"),
        };

        let err = build_send_form(&send_request(), &[missing]).await.unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Io(_)));
    }

    #[tokio::test]
    async fn test_build_send_form_ステージング済みファイルを読み込める() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged");
        std::fs::write(&path, b"%PDF").unwrap();
        let attachment = AttachmentFile {
            filename: "report.pdf".to_string(),
            path,
        };

        let result = build_send_form(&send_request(), &[attachment]).await;

        assert!(result.is_ok());
    }

    // ===== MailgunEmailProvider =====

    #[test]
    fn test_new_末尾のスラッシュを取り除く() {
        let provider = MailgunEmailProvider::new(
            "https://api.mailgun.net/",
            "mg.x.com",
            "key-1",
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            provider.endpoint("messages"),
            "https://api.mailgun.net/v3/mg.x.com/messages"
        );
    }

    #[test]
    fn test_debug_api_keyを出力しない() {
        let provider = MailgunEmailProvider::new(
            "https://api.mailgun.net",
            "mg.x.com",
            "key-secret",
            Duration::from_secs(5),
        )
        .unwrap();

        let debug = format!("{provider:?}");

        assert!(!debug.contains("key-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
