//! # 配信履歴クエリ
//!
//! 呼び出し元のクエリパラメータを、プロバイダの統計エンドポイントへそのまま
//! 転送できる形に整える。`apikey` はサーバー側の認証情報を上書き・漏洩させないよう
//! 必ず取り除く。

use std::collections::BTreeMap;

/// 転送前に取り除く認証情報パラメータ名（大文字小文字を区別しない）
pub const CREDENTIAL_PARAM: &str = "apikey";

/// サニタイズ済みの配信履歴クエリ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery(BTreeMap<String, String>);

impl HistoryQuery {
    /// `apikey` を除いたクエリを作る
    pub fn sanitize<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(k, _)| !k.eq_ignore_ascii_case(CREDENTIAL_PARAM))
                .collect(),
        )
    }

    /// URL クエリ文字列にシリアライズする
    ///
    /// パラメータが空の場合は `None`（URL に `?` を付けない）。
    pub fn to_query_string(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }

        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        Some(pairs.join("&"))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
