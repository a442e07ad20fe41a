//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! `jq` で効率的に調査できるよう、ログフィールドの命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! `tracing::error!` に `error.category` + `error.kind` フィールドを直接追加する。
//! 定数は [`error`] モジュールで提供。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const EMAIL: &str = "email";
        pub const INDEXING: &str = "indexing";
    }

    /// イベントアクション
    pub mod action {
        // メール送信
        pub const EMAIL_SENT: &str = "email.sent";
        pub const EMAIL_SEND_FAILED: &str = "email.send_failed";
        pub const EMAIL_REJECTED: &str = "email.rejected";

        // インデックス登録
        pub const EMAIL_INDEXED: &str = "email.indexed";
        pub const EMAIL_INDEX_FAILED: &str = "email.index_failed";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（ファイルシステム）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（メール送信プロバイダ、検索バックエンド、権限ツリー取得元）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    /// エラー種別
    pub mod kind {
        pub const EMAIL_PROVIDER: &str = "email_provider";
        pub const PERMISSION_TREE: &str = "permission_tree";
        pub const SEARCH_INDEX: &str = "search_index";
        pub const ATTACHMENT: &str = "attachment";
    }
}

#[cfg(test)]
mod tests {
    use super::event;

    #[test]
    fn test_log_business_eventがコンパイルできる() {
        log_business_event!(
            event.category = event::category::EMAIL,
            event.action = event::action::EMAIL_SENT,
            event.result = event::result::SUCCESS,
            email.recipient_count = 2,
            "テストイベント"
        );
    }

    #[test]
    fn test_アクション名がカテゴリで始まる() {
        for action in [
            event::action::EMAIL_SENT,
            event::action::EMAIL_SEND_FAILED,
            event::action::EMAIL_REJECTED,
            event::action::EMAIL_INDEXED,
            event::action::EMAIL_INDEX_FAILED,
        ] {
            assert!(
                action.starts_with("email."),
                "アクション名は email. で始まること: {action}"
            );
        }
    }
}
