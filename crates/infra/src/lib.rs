//! # Mailgate インフラ層
//!
//! 外部サービスとの通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! 各外部サービスを `async_trait` のトレイトで抽象化し、HTTP 実装と
//! 代替実装（Noop、ファイル、モック）を差し替えられるようにする。
//! ユースケース層は `Arc<dyn Trait>` としてのみ扱う。
//!
//! ## 依存関係
//!
//! ```text
//! gateway → infra → domain
//!             ↓
//!           shared（ログフィールド定数）
//! ```
//!
//! ## モジュール構成
//!
//! - [`email_provider`] - メール送信プロバイダ（Mailgun 互換 API）
//! - [`search_index`] - 検索インデックス（HTTP / Noop）
//! - [`permission_tree`] - 権限ツリー取得元（HTTP / ファイル）
//! - [`attachment`] - 添付ファイルのステージングとスコープ解放
//! - [`error`] - インフラ層エラー定義
//! - `mock` - テスト用モック（`test-utils` feature）

pub mod attachment;
pub mod email_provider;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod permission_tree;
pub mod search_index;

pub use attachment::{AttachmentStore, LocalAttachmentStore, StagedAttachments};
pub use email_provider::{EmailProvider, MailgunEmailProvider};
pub use error::{InfraError, InfraErrorKind};
pub use permission_tree::{
    FilePermissionTreeSource,
    HttpPermissionTreeSource,
    PermissionTreeSource,
};
pub use search_index::{HttpSearchIndex, NoopSearchIndex, SearchIndex};
