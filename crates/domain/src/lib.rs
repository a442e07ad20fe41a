//! # Mailgate ドメイン層
//!
//! メール送信ファサードのビジネスルールを定義する。
//!
//! ## 設計方針
//!
//! - 外部サービス（メール送信プロバイダ、検索バックエンド、権限ツリー取得元）には
//!   一切依存しない純粋な型と関数のみを置く
//! - 呼び出し元から届く未検証の入力は、検証済みの型へ変換してから扱う
//!
//! ## 依存関係の方向
//!
//! ```text
//! gateway → infra → domain
//!     ↘               ↑
//!       ──────────────
//! ```
//!
//! ## モジュール構成
//!
//! - [`recipient`] - 権限ツリーと宛先フィルタ（中核アルゴリズム）
//! - [`email`] - 送信リクエストの検証と送信単位
//! - [`history`] - 配信履歴クエリのサニタイズ
//! - [`search`] - インデックス検索クエリ
//! - [`error`] - ドメインエラー
//!
//! ## 使用例
//!
//! ```rust
//! use mailgate_domain::recipient::{PermissionTree, RequestedRecipients, filter_recipients};
//!
//! let tree = PermissionTree::from_json(r#"{"teamA": ["alice@x.com"]}"#).unwrap();
//! let requested = RequestedRecipients::parse(r#"{"teamA": ["alice@x.com", "eve@x.com"]}"#).unwrap();
//!
//! let filtered = filter_recipients(&requested, &tree);
//! assert_eq!(filtered.as_slice(), ["alice@x.com"]);
//! ```

pub mod email;
pub mod error;
pub mod history;
pub mod recipient;
pub mod search;

pub use error::DomainError;
