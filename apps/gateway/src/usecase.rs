//! # ユースケース層
//!
//! ## 設計方針
//!
//! - **依存性注入**: 外部サービスを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約

pub mod history;
pub mod indexing;
pub mod search;
pub mod send;

pub use history::HistoryUseCaseImpl;
pub use indexing::{IndexQueue, run_index_worker, spawn_index_worker};
pub use search::SearchUseCaseImpl;
pub use send::SendEmailUseCaseImpl;
