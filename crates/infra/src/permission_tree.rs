//! # 権限ツリー取得元
//!
//! 送信リクエストごとに最新の権限ツリーを取得する。キャッシュはしない。
//!
//! - [`HttpPermissionTreeSource`]: HTTP エンドポイントから JSON を取得
//! - [`FilePermissionTreeSource`]: JSON ファイルを毎回読み直す

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use mailgate_domain::recipient::PermissionTree;

use crate::error::InfraError;

const SERVICE: &str = "permission-tree";

/// 権限ツリー取得元トレイト
#[async_trait]
pub trait PermissionTreeSource: Send + Sync {
    async fn fetch(&self) -> Result<PermissionTree, InfraError>;
}

/// HTTP エンドポイントから権限ツリーを取得する
#[derive(Debug, Clone)]
pub struct HttpPermissionTreeSource {
    url:    String,
    client: reqwest::Client,
}

impl HttpPermissionTreeSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl PermissionTreeSource for HttpPermissionTreeSource {
    #[tracing::instrument(skip_all, level = "debug", fields(url = %self.url))]
    async fn fetch(&self) -> Result<PermissionTree, InfraError> {
        let response = self.client.get(&self.url).send().await?;
        parse_tree_response(response).await
    }
}

async fn parse_tree_response(response: reqwest::Response) -> Result<PermissionTree, InfraError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(InfraError::upstream_status(SERVICE, status.as_u16(), body));
    }

    let body = response.text().await?;
    Ok(PermissionTree::from_json(&body)?)
}

/// JSON ファイルから権限ツリーを読み込む
///
/// ファイルは呼び出しごとに読み直すため、再起動なしで内容を差し替えられる。
#[derive(Debug, Clone)]
pub struct FilePermissionTreeSource {
    path: PathBuf,
}

impl FilePermissionTreeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PermissionTreeSource for FilePermissionTreeSource {
    #[tracing::instrument(skip_all, level = "debug", fields(path = %self.path.display()))]
    async fn fetch(&self) -> Result<PermissionTree, InfraError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(PermissionTree::from_json(&raw)?)
    }
}
