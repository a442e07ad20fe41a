//! # Mailgate ゲートウェイ
//!
//! メール送信ファサードの HTTP サーバー。
//!
//! ## モジュール構成
//!
//! - `app_builder`: 外部サービス実装の初期化とルーター構築
//! - `config`: 環境変数からの設定読み込みと検証
//! - `error`: ゲートウェイエラーと HTTP レスポンスへの変換
//! - `handler`: HTTP ハンドラ
//! - `usecase`: 送信・配信履歴・検索・インデックス登録

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
