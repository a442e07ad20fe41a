//! # メール送信リクエスト
//!
//! 境界から届く未検証の入力を、プロバイダへ送ってよい送信単位に変換する。
//!
//! ```text
//! RawSendInput ──validate()──▶ ValidatedSendInput ──authorize(tree)──▶ EmailSendRequest
//!                                                                          │
//!                                                        (送信成功 + to_index)
//!                                                                          ▼
//!                                                                    IndexDocument
//! ```
//!
//! 検証は fail-fast で、最初に失敗した項目の理由だけを返す。
//! 検査順序（from → to → subject → html）はエラーメッセージを決定的にするため固定。

use std::path::PathBuf;

use serde::Serialize;

use crate::{
    DomainError,
    recipient::{FilteredRecipients, PermissionTree, RequestedRecipients, filter_recipients},
};

/// 境界から届いた送信入力（未検証）
///
/// トランスポートに依存しない形。各フィールドは受け取ったままの文字列。
#[derive(Debug, Clone, Default)]
pub struct RawSendInput {
    pub from:     Option<String>,
    /// グループ → メンバーリストの JSON 文字列
    pub to:       Option<String>,
    pub subject:  Option<String>,
    pub html:     Option<String>,
    /// 送信成功後に検索インデックスへ登録するか
    pub to_index: bool,
}

impl RawSendInput {
    /// 必須項目と宛先構造を検証する
    ///
    /// 1. `from` が空でない → `from required`
    /// 2. `to` が宛先構造としてパースできる → `invalid to field: <詳細>`
    /// 3. `subject` が空でない → `subject required`
    /// 4. `html` が空でない → `html required`
    pub fn validate(self) -> Result<ValidatedSendInput, DomainError> {
        let from = required(self.from, "from required")?;
        let requested = RequestedRecipients::parse(self.to.as_deref().unwrap_or_default())?;
        let subject = required(self.subject, "subject required")?;
        let html = required(self.html, "html required")?;

        Ok(ValidatedSendInput {
            from,
            requested,
            subject,
            html,
            to_index: self.to_index,
        })
    }
}

fn required(value: Option<String>, reason: &str) -> Result<String, DomainError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::validation(reason))
}

/// 項目検証を通過した送信入力
///
/// 宛先はまだ認可されていない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSendInput {
    pub from:      String,
    pub requested: RequestedRecipients,
    pub subject:   String,
    pub html:      String,
    pub to_index:  bool,
}

/// プロバイダへ送信する検証済みの送信単位
///
/// 不変条件: `to` は空でなく、すべての宛先が権限ツリーで認可されている。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSendRequest {
    from:     String,
    to:       FilteredRecipients,
    subject:  String,
    html:     String,
    to_index: bool,
}

impl EmailSendRequest {
    /// 要求宛先を権限ツリーで絞り込み、送信単位を組み立てる
    ///
    /// 認可済みの宛先が 1 件もなければ `at least 1 valid recipient required`。
    pub fn authorize(
        input: ValidatedSendInput,
        tree: &PermissionTree,
    ) -> Result<Self, DomainError> {
        let to = filter_recipients(&input.requested, tree);
        if to.is_empty() {
            return Err(DomainError::validation(
                "at least 1 valid recipient required",
            ));
        }

        Ok(Self {
            from: input.from,
            to,
            subject: input.subject,
            html: input.html,
            to_index: input.to_index,
        })
    }

    /// 送信元アドレス
    pub fn sender(&self) -> &str {
        &self.from
    }

    /// 認可済み宛先（空でない）
    pub fn recipients(&self) -> &FilteredRecipients {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// 送信成功後のインデックス登録が要求されているか
    pub fn index_requested(&self) -> bool {
        self.to_index
    }
}

/// ステージング済みの添付ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    /// アップロード時の元のファイル名（プロバイダへの表示名）
    pub filename: String,
    /// ステージング先のローカルパス
    pub path:     PathBuf,
}

/// 検索インデックスに登録するドキュメント
///
/// 送信成功が確認され、かつインデックス登録が要求された場合にのみ作る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDocument {
    pub title:      String,
    pub sender:     String,
    pub recipients: Vec<String>,
    pub content:    String,
}

impl IndexDocument {
    /// 送信済みのリクエストから作成する
    pub fn from_sent(request: &EmailSendRequest) -> Self {
        Self {
            title:      request.subject.clone(),
            sender:     request.from.clone(),
            recipients: request.to.as_slice().to_vec(),
            content:    request.html.clone(),
        }
    }
}
