//! # 添付ファイルのステージング
//!
//! アップロードされた添付ファイルを一時ディレクトリに保存し、
//! リクエスト終了時に必ず削除する。
//!
//! [`StagedAttachments`] がステージング済みファイルを所有し、`Drop` で
//! 各ファイルをちょうど 1 回解放する。成功・失敗・キャンセルのどの経路でも
//! 解放箇所はこの 1 か所だけになる。

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use mailgate_domain::email::AttachmentFile;
use mailgate_shared::event_log::error::{category, kind};
use uuid::Uuid;

use crate::error::InfraError;

/// 添付ファイル保管先トレイト
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// ファイルを保存し、元のファイル名と保存先パスを返す
    async fn stage(&self, filename: &str, content: Bytes) -> Result<AttachmentFile, InfraError>;

    /// 保存したファイルを削除する
    ///
    /// `Drop` から呼ばれるため同期関数。
    fn release(&self, file: &AttachmentFile) -> Result<(), InfraError>;
}

/// ローカルディレクトリへの保存実装
///
/// 保存名は UUID にし、元のファイル名はパスに使わない。
#[derive(Debug, Clone)]
pub struct LocalAttachmentStore {
    dir: PathBuf,
}

impl LocalAttachmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn stage(&self, filename: &str, content: Bytes) -> Result<AttachmentFile, InfraError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(Uuid::new_v4().to_string());
        let written = tokio::fs::write(&path, &content).await;
        discard_partial(&path, written).await?;

        tracing::debug!(filename, path = %path.display(), size = content.len(), "添付ファイルを保存");
        Ok(AttachmentFile {
            filename: filename.to_string(),
            path,
        })
    }

    fn release(&self, file: &AttachmentFile) -> Result<(), InfraError> {
        std::fs::remove_file(&file.path)?;
        Ok(())
    }
}

/// 書き込みに失敗した場合、途中まで書かれたファイルを削除して元のエラーを返す
///
/// パスがまだ [`StagedAttachments`] の管理下にないため、ここで消さないと残る。
async fn discard_partial(path: &Path, written: std::io::Result<()>) -> Result<(), InfraError> {
    let Err(e) = written else {
        return Ok(());
    };

    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(remove_err) if remove_err.kind() == std::io::ErrorKind::NotFound => {}
        Err(remove_err) => {
            tracing::warn!(
                error.category = category::INFRASTRUCTURE,
                error.kind = kind::ATTACHMENT,
                path = %path.display(),
                error = %remove_err,
                "書き込み途中の添付ファイルの削除に失敗"
            );
        }
    }
    Err(e.into())
}

/// ステージング済み添付ファイルのスコープガード
pub struct StagedAttachments {
    store: Arc<dyn AttachmentStore>,
    files: Vec<AttachmentFile>,
}

impl StagedAttachments {
    pub fn new(store: Arc<dyn AttachmentStore>) -> Self {
        Self {
            store,
            files: Vec::new(),
        }
    }

    /// ファイルを保存し、ガードの管理下に置く
    pub async fn stage(&mut self, filename: &str, content: Bytes) -> Result<(), InfraError> {
        let file = self.store.stage(filename, content).await?;
        self.files.push(file);
        Ok(())
    }

    pub fn files(&self) -> &[AttachmentFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl std::fmt::Debug for StagedAttachments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedAttachments")
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

impl Drop for StagedAttachments {
    fn drop(&mut self) {
        for file in self.files.drain(..) {
            if let Err(e) = self.store.release(&file) {
                tracing::warn!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::ATTACHMENT,
                    path = %file.path.display(),
                    error = %e,
                    "添付ファイルの削除に失敗"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::InfraErrorKind;

    #[tokio::test]
    async fn test_stage_uuid名で保存し元のファイル名を保持する() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAttachmentStore::new(dir.path().join("uploads"));

        let file = store
            .stage("../../etc/passwd", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        assert_eq!(file.filename, "../../etc/passwd");
        assert_eq!(file.path.parent(), Some(store.dir()));
        assert!(Uuid::parse_str(&file.path.file_name().unwrap().to_string_lossy()).is_ok());
        assert_eq!(std::fs::read(&file.path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_release_ファイルを削除する() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAttachmentStore::new(dir.path());
        let file = store.stage("a.txt", Bytes::from_static(b"a")).await.unwrap();

        store.release(&file).unwrap();

        assert!(!file.path.exists());
    }

    #[tokio::test]
    async fn test_release_存在しないファイルはioエラーを返す() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAttachmentStore::new(dir.path());
        let file = AttachmentFile {
            filename: "a.txt".to_string(),
            path:     dir.path().join("missing"),
        };

        assert!(store.release(&file).is_err());
    }

    #[tokio::test]
    async fn test_discard_partial_書き込み失敗時に途中のファイルを削除する() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial");
        std::fs::write(&path, vec![0u8; 65536]).unwrap();
        let written = Err(std::io::Error::new(
            std::io::ErrorKind::StorageFull,
            "no space left on device",
        ));

        let err = discard_partial(&path, written).await.unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Io(_)));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_discard_partial_ファイルが作られていなくても元のエラーを返す() {
        let dir = tempfile::tempdir().unwrap();
        let written = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        ));

        let err = discard_partial(&dir.path().join("never-created"), written)
            .await
            .unwrap_err();

        match err.kind() {
            InfraErrorKind::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            other => panic!("Io エラーを期待: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_discard_partial_書き込み成功ならファイルを残す() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("complete");
        std::fs::write(&path, b"ok").unwrap();

        discard_partial(&path, Ok(())).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_stage_失敗時にガード管理外のファイルを残さない() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("uploads");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = Arc::new(LocalAttachmentStore::new(&blocker));
        let mut staged = StagedAttachments::new(store);

        let result = staged.stage("a.txt", Bytes::from_static(b"a")).await;

        assert!(result.is_err());
        assert!(staged.is_empty());
        drop(staged);
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("uploads")]);
    }

    #[tokio::test]
    async fn test_staged_attachments_dropで全ファイルを削除する() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalAttachmentStore::new(dir.path()));
        let mut staged = StagedAttachments::new(store);
        staged.stage("a.txt", Bytes::from_static(b"a")).await.unwrap();
        staged.stage("b.txt", Bytes::from_static(b"b")).await.unwrap();
        let paths: Vec<PathBuf> = staged.files().iter().map(|f| f.path.clone()).collect();
        assert_eq!(staged.len(), 2);

        drop(staged);

        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn test_staged_attachments_削除失敗でもパニックしない() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalAttachmentStore::new(dir.path()));
        let mut staged = StagedAttachments::new(store);
        staged.stage("a.txt", Bytes::from_static(b"a")).await.unwrap();
        std::fs::remove_file(&staged.files()[0].path).unwrap();

        drop(staged);
    }
}
