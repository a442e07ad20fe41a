//! # インデックス検索クエリ

/// 検索バックエンドへ渡すクエリ
///
/// テキスト以外のパラメータは固定（ハイライト有効、全フィールド取得）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text:             String,
    pub highlight:        bool,
    pub fetch_all_fields: bool,
}

impl SearchQuery {
    /// 検索テキストからクエリを作る
    ///
    /// `text` が無い場合は空のクエリとしてそのまま転送する。
    pub fn new(text: Option<String>) -> Self {
        Self {
            text:             text.unwrap_or_default(),
            highlight:        true,
            fetch_all_fields: true,
        }
    }
}
