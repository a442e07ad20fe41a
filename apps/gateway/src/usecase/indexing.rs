//! # バックグラウンドのインデックス登録
//!
//! 送信成功後のインデックス登録を、リクエスト処理から切り離して実行する。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: [`IndexQueue::enqueue`] はブロックせず、エラーも返さない
//! - **呼び出し元への戻り経路なし**: 登録結果はログにのみ出力する
//! - **リトライなし**: 失敗したドキュメントは破棄する
//! - **上限付きキュー**: 検索バックエンドが遅くても滞留は [`INDEX_QUEUE_CAPACITY`] 件まで。
//!   満杯のときは新しいドキュメントを破棄して警告を出す

use std::sync::Arc;

use mailgate_domain::email::IndexDocument;
use mailgate_infra::SearchIndex;
use mailgate_shared::{
    event_log::{error, event},
    log_business_event,
};
use tokio::sync::mpsc;

/// 登録待ちドキュメントの上限
pub const INDEX_QUEUE_CAPACITY: usize = 1024;

/// インデックス登録キューの送信側
#[derive(Debug, Clone)]
pub struct IndexQueue {
    sender: mpsc::Sender<IndexDocument>,
}

impl IndexQueue {
    /// [`INDEX_QUEUE_CAPACITY`] 件まで積めるキューと受信側を作成する
    ///
    /// 受信側は [`run_index_worker`] に渡す。
    pub fn channel() -> (Self, mpsc::Receiver<IndexDocument>) {
        Self::with_capacity(INDEX_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<IndexDocument>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// ドキュメントを登録待ちに積む
    ///
    /// キューが満杯、またはワーカーが停止している場合はドキュメントを破棄して警告を出す。
    pub fn enqueue(&self, document: IndexDocument) {
        match self.sender.try_send(document) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(document)) => {
                tracing::warn!(
                    title = %document.title,
                    capacity = self.sender.max_capacity(),
                    "インデックス登録キューが満杯のため破棄"
                );
            }
            Err(mpsc::error::TrySendError::Closed(document)) => {
                tracing::warn!(
                    title = %document.title,
                    "インデックス登録ワーカーが停止しているため破棄"
                );
            }
        }
    }
}

/// インデックス登録ワーカーを起動し、キューを返す
pub fn spawn_index_worker(index: Arc<dyn SearchIndex>) -> IndexQueue {
    let (queue, receiver) = IndexQueue::channel();
    tokio::spawn(run_index_worker(receiver, index));
    queue
}

/// キューが閉じるまでドキュメントを 1 件ずつ登録する
pub async fn run_index_worker(
    mut receiver: mpsc::Receiver<IndexDocument>,
    index: Arc<dyn SearchIndex>,
) {
    while let Some(document) = receiver.recv().await {
        match index.add_documents(std::slice::from_ref(&document)).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::INDEXING,
                    event.action = event::action::EMAIL_INDEXED,
                    event.result = event::result::SUCCESS,
                    email.subject = %document.title,
                    email.recipients = document.recipients.len(),
                    "インデックス登録成功"
                );
            }
            Err(e) => {
                tracing::error!(
                    error.category = error::category::EXTERNAL_SERVICE,
                    error.kind = error::kind::SEARCH_INDEX,
                    "インデックス登録に失敗: {}",
                    e
                );
                log_business_event!(
                    event.category = event::category::INDEXING,
                    event.action = event::action::EMAIL_INDEX_FAILED,
                    event.result = event::result::FAILURE,
                    email.subject = %document.title,
                    error = %e,
                    "インデックス登録失敗"
                );
            }
        }
    }

    tracing::debug!("インデックス登録キューが閉じたためワーカーを終了");
}
