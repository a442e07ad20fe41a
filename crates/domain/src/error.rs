//! # ドメイン層エラー定義
//!
//! 呼び出し元の入力がビジネスルールに違反した場合のエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 必須項目の欠落、宛先構造の不正、有効な宛先ゼロ |

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// ゲートウェイ層でこのエラーを受け取り、HTTP レスポンスに変換する。
/// 保持する文字列はそのまま呼び出し元への理由文字列（`detail`）になる。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// # 例
    ///
    /// - `from required`
    /// - `invalid to field: expected value at line 1 column 1`
    /// - `at least 1 valid recipient required`
    #[error("{0}")]
    Validation(String),
}

impl DomainError {
    /// バリデーションエラーを生成する
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// 呼び出し元に返す理由文字列
    pub fn reason(&self) -> &str {
        match self {
            Self::Validation(reason) => reason,
        }
    }
}
