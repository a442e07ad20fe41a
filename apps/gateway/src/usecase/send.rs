//! # メール送信ユースケース
//!
//! 入力検証 → 権限ツリー取得 → 宛先フィルタ → プロバイダ送信 → インデックス登録依頼
//! の順に処理する。
//!
//! 添付ファイルは [`StagedAttachments`] ごと受け取り、プロバイダ送信の直後に解放する。
//! どの経路で関数を抜けても、ガードの `Drop` が唯一の解放箇所になる。

use std::sync::Arc;

use mailgate_domain::{
    DomainError,
    email::{EmailSendRequest, IndexDocument, RawSendInput},
};
use mailgate_infra::{EmailProvider, PermissionTreeSource, StagedAttachments};
use mailgate_shared::{
    event_log::{error, event},
    log_business_event,
};
use serde_json::Value;

use super::indexing::IndexQueue;
use crate::error::GatewayError;

/// メール送信ユースケース
pub struct SendEmailUseCaseImpl {
    provider:          Arc<dyn EmailProvider>,
    permission_source: Arc<dyn PermissionTreeSource>,
    index_queue:       IndexQueue,
}

impl SendEmailUseCaseImpl {
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        permission_source: Arc<dyn PermissionTreeSource>,
        index_queue: IndexQueue,
    ) -> Self {
        Self {
            provider,
            permission_source,
            index_queue,
        }
    }

    /// メールを送信し、プロバイダの受理レスポンスをそのまま返す
    ///
    /// 1. 必須項目と宛先構造を検証（失敗時は外部呼び出しを行わない）
    /// 2. 権限ツリーを取得（失敗は上流エラー）
    /// 3. 宛先を絞り込み、空なら検証エラー
    /// 4. プロバイダへ送信
    /// 5. 成功かつ要求があればインデックス登録をキューに積む
    #[tracing::instrument(skip_all, fields(attachments = attachments.len()))]
    pub async fn send(
        &self,
        input: RawSendInput,
        attachments: StagedAttachments,
    ) -> Result<Value, GatewayError> {
        let validated = input.validate().map_err(rejected)?;

        let tree = self
            .permission_source
            .fetch()
            .await
            .map_err(|e| GatewayError::upstream(error::kind::PERMISSION_TREE, e))?;

        let request = EmailSendRequest::authorize(validated, &tree).map_err(rejected)?;

        let result = self.provider.send(&request, attachments.files()).await;
        drop(attachments);

        match result {
            Ok(body) => {
                log_business_event!(
                    event.category = event::category::EMAIL,
                    event.action = event::action::EMAIL_SENT,
                    event.result = event::result::SUCCESS,
                    email.recipients = request.recipients().len(),
                    email.indexed = request.index_requested(),
                    "メール送信成功"
                );

                if request.index_requested() {
                    self.index_queue.enqueue(IndexDocument::from_sent(&request));
                }
                Ok(body)
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::EMAIL,
                    event.action = event::action::EMAIL_SEND_FAILED,
                    event.result = event::result::FAILURE,
                    email.recipients = request.recipients().len(),
                    "メール送信失敗"
                );
                Err(GatewayError::upstream(error::kind::EMAIL_PROVIDER, e))
            }
        }
    }
}

fn rejected(err: DomainError) -> GatewayError {
    log_business_event!(
        event.category = event::category::EMAIL,
        event.action = event::action::EMAIL_REJECTED,
        event.result = event::result::FAILURE,
        reason = %err,
        "メール送信を拒否"
    );
    err.into()
}
