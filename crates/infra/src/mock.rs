//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリモック。呼び出しを記録し、
//! 失敗を注入できる。`test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! mailgate-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bytes::Bytes;
use mailgate_domain::{
    email::{AttachmentFile, EmailSendRequest, IndexDocument},
    history::HistoryQuery,
    recipient::PermissionTree,
    search::SearchQuery,
};
use serde_json::Value;

use crate::{
    attachment::AttachmentStore,
    email_provider::EmailProvider,
    error::InfraError,
    permission_tree::PermissionTreeSource,
    search_index::SearchIndex,
};

// ===== MockEmailProvider =====

/// 送信記録（リクエストと添付ファイル）
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub request:     EmailSendRequest,
    pub attachments: Vec<AttachmentFile>,
}

#[derive(Clone)]
pub struct MockEmailProvider {
    sent:        Arc<Mutex<Vec<SentEmail>>>,
    history_log: Arc<Mutex<Vec<HistoryQuery>>>,
    fail_status: Arc<Mutex<Option<u16>>>,
    response:    Value,
}

impl Default for MockEmailProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmailProvider {
    pub fn new() -> Self {
        Self {
            sent:        Arc::new(Mutex::new(Vec::new())),
            history_log: Arc::new(Mutex::new(Vec::new())),
            fail_status: Arc::new(Mutex::new(None)),
            response:    serde_json::json!({
                "id": "<mock@mailgate>",
                "message": "Queued. Thank you.",
            }),
        }
    }

    /// 以降の呼び出しを指定ステータスで失敗させる
    pub fn fail_with_status(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn history_queries(&self) -> Vec<HistoryQuery> {
        self.history_log.lock().unwrap().clone()
    }

    pub fn response(&self) -> &Value {
        &self.response
    }

    fn injected_failure(&self) -> Result<(), InfraError> {
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(InfraError::upstream_status("mailgun", status, "mock failure")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(
        &self,
        request: &EmailSendRequest,
        attachments: &[AttachmentFile],
    ) -> Result<Value, InfraError> {
        self.sent.lock().unwrap().push(SentEmail {
            request:     request.clone(),
            attachments: attachments.to_vec(),
        });
        self.injected_failure()?;
        Ok(self.response.clone())
    }

    async fn history(&self, query: &HistoryQuery) -> Result<Value, InfraError> {
        self.history_log.lock().unwrap().push(query.clone());
        self.injected_failure()?;
        Ok(serde_json::json!({ "stats": [], "query": query.to_query_string() }))
    }
}

// ===== MockSearchIndex =====

#[derive(Clone, Default)]
pub struct MockSearchIndex {
    documents: Arc<Mutex<Vec<IndexDocument>>>,
    attempts:  Arc<Mutex<usize>>,
    queries:   Arc<Mutex<Vec<SearchQuery>>>,
    failing:   Arc<Mutex<bool>>,
}

impl MockSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の呼び出しを失敗させる
    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    /// 登録に成功したドキュメント
    pub fn documents(&self) -> Vec<IndexDocument> {
        self.documents.lock().unwrap().clone()
    }

    /// 失敗したものも含めた `add_documents` の呼び出し回数
    pub fn add_attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn injected_failure(&self) -> Result<(), InfraError> {
        if *self.failing.lock().unwrap() {
            return Err(InfraError::upstream_status("search", 503, "mock failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn add_documents(&self, documents: &[IndexDocument]) -> Result<(), InfraError> {
        *self.attempts.lock().unwrap() += 1;
        self.injected_failure()?;
        self.documents.lock().unwrap().extend_from_slice(documents);
        Ok(())
    }

    async fn query(&self, query: &SearchQuery) -> Result<Value, InfraError> {
        self.queries.lock().unwrap().push(query.clone());
        self.injected_failure()?;
        Ok(serde_json::json!({ "hits": [], "query": query.text }))
    }
}

// ===== MockPermissionTreeSource =====

#[derive(Clone)]
pub struct MockPermissionTreeSource {
    tree:    Option<PermissionTree>,
    fetches: Arc<Mutex<usize>>,
}

impl MockPermissionTreeSource {
    /// 常に指定のツリーを返す
    pub fn with_tree(tree: PermissionTree) -> Self {
        Self {
            tree:    Some(tree),
            fetches: Arc::new(Mutex::new(0)),
        }
    }

    /// 常に取得に失敗する
    pub fn failing() -> Self {
        Self {
            tree:    None,
            fetches: Arc::new(Mutex::new(0)),
        }
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl PermissionTreeSource for MockPermissionTreeSource {
    async fn fetch(&self) -> Result<PermissionTree, InfraError> {
        *self.fetches.lock().unwrap() += 1;
        self.tree
            .clone()
            .ok_or_else(|| InfraError::upstream_status("permission-tree", 500, "mock failure"))
    }
}

// ===== MockAttachmentStore =====

/// ファイルシステムに触れない添付ファイル保管先
///
/// パスごとの解放回数を記録する。
#[derive(Clone, Default)]
pub struct MockAttachmentStore {
    staged:   Arc<Mutex<Vec<AttachmentFile>>>,
    releases: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl MockAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staged(&self) -> Vec<AttachmentFile> {
        self.staged.lock().unwrap().clone()
    }

    /// 指定パスが解放された回数
    pub fn release_count(&self, path: &std::path::Path) -> usize {
        self.releases.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// 全ファイルの解放回数の合計
    pub fn total_releases(&self) -> usize {
        self.releases.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl AttachmentStore for MockAttachmentStore {
    async fn stage(&self, filename: &str, _content: Bytes) -> Result<AttachmentFile, InfraError> {
        let mut staged = self.staged.lock().unwrap();
        let file = AttachmentFile {
            filename: filename.to_string(),
            path:     PathBuf::from(format!("/mock/uploads/{}", staged.len())),
        };
        staged.push(file.clone());
        Ok(file)
    }

    fn release(&self, file: &AttachmentFile) -> Result<(), InfraError> {
        *self
            .releases
            .lock()
            .unwrap()
            .entry(file.path.clone())
            .or_insert(0) += 1;
        Ok(())
    }
}
