//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//! ハンドラは薄く保ち、処理はユースケースに委譲する。
//!
//! ## ハンドラ一覧
//!
//! - `health`: ヘルスチェック
//! - `email`: メール送信、配信履歴、インデックス検索

pub mod email;
pub mod health;

pub use email::{EmailState, get_history, search_emails, send_email};
pub use health::health_check;
