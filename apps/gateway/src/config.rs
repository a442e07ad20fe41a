//! # ゲートウェイ設定
//!
//! 環境変数からゲートウェイの設定を読み込み、起動時に検証する。
//! 必須項目の欠落や不正値は [`ConfigError`] として返し、`main` が起動を中止する。
//!
//! 空文字列は未設定として扱う。

use std::{fmt, path::PathBuf, time::Duration};

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 14000;
const DEFAULT_MAILGUN_API_BASE: &str = "https://api.mailgun.net";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// 設定エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が設定されていない
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値をパースできない
    #[error("{name} の値が不正です: {value:?}")]
    Invalid { name: &'static str, value: String },

    /// 権限ツリーの取得元が一意に決まらない
    #[error("PERMISSION_TREE_URL と PERMISSION_TREE_FILE のどちらか一方のみを設定してください")]
    AmbiguousPermissionTreeSource,
}

/// メール送信プロバイダの接続設定
#[derive(Clone)]
pub struct MailgunConfig {
    pub api_base: String,
    pub domain:   String,
    pub api_key:  String,
}

impl fmt::Debug for MailgunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunConfig")
            .field("api_base", &self.api_base)
            .field("domain", &self.domain)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// 権限ツリーの取得元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionTreeConfig {
    Url(String),
    File(PathBuf),
}

/// 検索バックエンドの接続設定
#[derive(Clone)]
pub struct SearchConfig {
    pub url:        String,
    pub index_name: String,
    pub api_key:    Option<String>,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("url", &self.url)
            .field("index_name", &self.index_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// ゲートウェイの設定
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// バインドアドレス
    pub host:            String,
    /// ポート番号
    pub port:            u16,
    pub mailgun:         MailgunConfig,
    pub permission_tree: PermissionTreeConfig,
    /// 未設定の場合、インデックス登録と検索は Noop 実装を使う
    pub search:          Option<SearchConfig>,
    /// 添付ファイルのステージング先
    pub upload_dir:      PathBuf,
    /// 外部 HTTP 呼び出しのタイムアウト
    pub http_timeout:    Duration,
}

impl GatewayConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// テストではプロセスの環境変数に触れずに検証するために使う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let port = match var("GATEWAY_PORT") {
            Some(v) => parse(&v, "GATEWAY_PORT")?,
            None => DEFAULT_PORT,
        };

        let http_timeout_secs = match var("HTTP_TIMEOUT_SECS") {
            Some(v) => parse(&v, "HTTP_TIMEOUT_SECS")?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let permission_tree = match (var("PERMISSION_TREE_URL"), var("PERMISSION_TREE_FILE")) {
            (Some(url), None) => PermissionTreeConfig::Url(url),
            (None, Some(path)) => PermissionTreeConfig::File(PathBuf::from(path)),
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousPermissionTreeSource),
            (None, None) => return Err(ConfigError::Missing("PERMISSION_TREE_URL")),
        };

        let search = match var("SEARCH_URL") {
            Some(url) => Some(SearchConfig {
                url,
                index_name: required("SEARCH_INDEX_NAME")?,
                api_key: var("SEARCH_API_KEY"),
            }),
            None => None,
        };

        Ok(Self {
            host: var("GATEWAY_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            mailgun: MailgunConfig {
                api_base: var("MAILGUN_API_BASE")
                    .unwrap_or_else(|| DEFAULT_MAILGUN_API_BASE.to_string()),
                domain:   required("MAILGUN_DOMAIN")?,
                api_key:  required("MAILGUN_API_KEY")?,
            },
            permission_tree,
            search,
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("mailgate-uploads")),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

fn parse<T: std::str::FromStr>(value: &str, name: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("MAILGUN_DOMAIN", "mg.x.com"),
        ("MAILGUN_API_KEY", "key-secret"),
        ("PERMISSION_TREE_FILE", "/etc/mailgate/tree.json"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut vars = MINIMAL.to_vec();
        vars.extend_from_slice(extra);
        vars
    }

    #[test]
    fn test_from_lookup_必須項目のみでデフォルト値が入る() {
        let config = load(MINIMAL).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 14000);
        assert_eq!(config.mailgun.api_base, "https://api.mailgun.net");
        assert_eq!(config.mailgun.domain, "mg.x.com");
        assert_eq!(
            config.permission_tree,
            PermissionTreeConfig::File(PathBuf::from("/etc/mailgate/tree.json"))
        );
        assert!(config.search.is_none());
        assert_eq!(config.upload_dir, std::env::temp_dir().join("mailgate-uploads"));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_api_key欠落はmissingを返す() {
        let result = load(&[
            ("MAILGUN_DOMAIN", "mg.x.com"),
            ("PERMISSION_TREE_URL", "http://perm/tree"),
        ]);

        assert_eq!(result.unwrap_err(), ConfigError::Missing("MAILGUN_API_KEY"));
    }

    #[test]
    fn test_from_lookup_空文字列は未設定として扱う() {
        let result = load(&with(&[("MAILGUN_API_KEY", "")]));

        assert_eq!(result.unwrap_err(), ConfigError::Missing("MAILGUN_API_KEY"));
    }

    #[test]
    fn test_from_lookup_不正なポートはinvalidを返す() {
        let result = load(&with(&[("GATEWAY_PORT", "70000")]));

        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                name:  "GATEWAY_PORT",
                value: "70000".to_string(),
            }
        );
    }

    #[test]
    fn test_from_lookup_権限ツリー取得元が両方あるとエラー() {
        let result = load(&with(&[("PERMISSION_TREE_URL", "http://perm/tree")]));

        assert_eq!(
            result.unwrap_err(),
            ConfigError::AmbiguousPermissionTreeSource
        );
    }

    #[test]
    fn test_from_lookup_権限ツリー取得元がないとエラー() {
        let result = load(&[("MAILGUN_DOMAIN", "mg.x.com"), ("MAILGUN_API_KEY", "k")]);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::Missing("PERMISSION_TREE_URL")
        );
    }

    #[test]
    fn test_from_lookup_search_urlがあればインデックス名が必須() {
        let result = load(&with(&[("SEARCH_URL", "http://search:7700")]));

        assert_eq!(
            result.unwrap_err(),
            ConfigError::Missing("SEARCH_INDEX_NAME")
        );
    }

    #[test]
    fn test_from_lookup_検索バックエンドを設定できる() {
        let config = load(&with(&[
            ("SEARCH_URL", "http://search:7700"),
            ("SEARCH_INDEX_NAME", "emails"),
            ("HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        let search = config.search.unwrap();
        assert_eq!(search.url, "http://search:7700");
        assert_eq!(search.index_name, "emails");
        assert_eq!(search.api_key, None);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_debug_秘密情報を出力しない() {
        let config = load(&with(&[
            ("SEARCH_URL", "http://search:7700"),
            ("SEARCH_INDEX_NAME", "emails"),
            ("SEARCH_API_KEY", "master-key"),
        ]))
        .unwrap();

        let debug = format!("{config:?}");

        assert!(!debug.contains("key-secret"));
        assert!(!debug.contains("master-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
