//! # 宛先の認可とフィルタ
//!
//! 呼び出し元が指定した宛先構造（信頼しない）を、外部から取得した権限ツリー
//! （信頼する）と突き合わせ、送信してよい宛先だけを取り出す。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`PermissionTree`] | 権限ツリー | グループ（ストア）→ 認可済みメンバーの集合 |
//! | [`RequestedRecipients`] | 要求宛先 | グループ → 要求されたメンバーのリスト |
//! | [`FilteredRecipients`] | 認可済み宛先 | 両者の共通部分（順序付き） |
//!
//! ## フィルタの規則
//!
//! - グループ単位で厳密に照合する。別グループにのみ存在するメンバーは除外
//! - 権限ツリーに存在しないグループは丸ごと読み飛ばす（エラーにしない）
//! - 要求側の重複はそのまま残す（重複排除しない）
//! - 結果の順序はグループキーの昇順、その中では要求されたメンバーの順

use std::collections::{BTreeMap, HashMap, HashSet};

use derive_more::Deref;
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// 権限ツリー
///
/// グループキーから認可済みメンバー（メールアドレス）の集合への対応。
/// キーもメンバーも不透明な文字列として扱い、同じメンバーが複数グループに
/// 属してもよい。リクエストごとに取得し直し、フィルタ後は破棄する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PermissionTree(HashMap<String, HashSet<String>>);

impl PermissionTree {
    /// 空の権限ツリーを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// `{"group": ["member", ...]}` 形式の JSON からパースする
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// グループにメンバーを追加する
    pub fn insert(&mut self, group: impl Into<String>, member: impl Into<String>) {
        self.0.entry(group.into()).or_default().insert(member.into());
    }

    /// グループの認可済みメンバー集合を返す
    pub fn group(&self, group: &str) -> Option<&HashSet<String>> {
        self.0.get(group)
    }

    /// `member` が `group` の下で認可されているか
    pub fn is_authorized(&self, group: &str, member: &str) -> bool {
        self.group(group)
            .is_some_and(|members| members.contains(member))
    }

    /// グループ数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<G, I, M> FromIterator<(G, I)> for PermissionTree
where
    G: Into<String>,
    I: IntoIterator<Item = M>,
    M: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (G, I)>>(iter: T) -> Self {
        let mut tree = Self::new();
        for (group, members) in iter {
            let group = group.into();
            let entry = tree.0.entry(group).or_default();
            entry.extend(members.into_iter().map(Into::into));
        }
        tree
    }
}

/// 要求宛先
///
/// 呼び出し元が `to` フィールドに JSON で渡す、グループ → メンバーリストの構造。
/// 権限ツリーと同じ形をしているが信頼しない。形が合わない入力は
/// [`parse`](Self::parse) の時点で拒否する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestedRecipients(BTreeMap<String, Vec<String>>);

impl RequestedRecipients {
    /// `to` フィールドの JSON 文字列をパースする
    ///
    /// オブジェクトでない、値が文字列の配列でない、JSON として不正、の
    /// いずれも `invalid to field: <詳細>` のバリデーションエラーになる。
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw)
            .map_err(|e| DomainError::validation(format!("invalid to field: {e}")))
    }

    /// グループとメンバーリストを走査する（グループキー昇順）
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(group, members)| (group.as_str(), members.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<G, I, M> FromIterator<(G, I)> for RequestedRecipients
where
    G: Into<String>,
    I: IntoIterator<Item = M>,
    M: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (G, I)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(group, members)| {
                    (group.into(), members.into_iter().map(Into::into).collect())
                })
                .collect(),
        )
    }
}

/// 認可済み宛先
///
/// [`filter_recipients`] の出力。すべての要素は、要求されたのと同じグループの下で
/// 権限ツリーに存在する。空の場合は送信を拒否する（黙って何もしないのではない）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deref)]
#[serde(transparent)]
pub struct FilteredRecipients(Vec<String>);

/// 要求宛先を権限ツリーで絞り込む
///
/// 純粋関数。入力が同じなら結果も同じで、副作用はない。
pub fn filter_recipients(
    requested: &RequestedRecipients,
    tree: &PermissionTree,
) -> FilteredRecipients {
    let members = requested
        .groups()
        .filter_map(|(group, members)| tree.group(group).map(|authorized| (authorized, members)))
        .flat_map(|(authorized, members)| {
            members
                .iter()
                .filter(move |member| authorized.contains(member.as_str()))
        })
        .cloned()
        .collect();

    FilteredRecipients(members)
}
