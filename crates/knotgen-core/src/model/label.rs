//! ラベル定義

use serde::{Deserialize, Serialize};
use std::fmt;

/// インスタンスの表示・検索用タグ
///
/// 前後の空白を除いた空でない文字列。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// 空白のみ・空文字列の場合は None
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ホスト名に使える形式に変換
    ///
    /// ASCII英数字は小文字化して残し、それ以外は `-` に置き換える。
    /// 連続する `-` はまとめ、先頭・末尾の `-` は除去する。
    /// ASCII英数字を1つも含まない場合は None。
    pub fn host_slug(&self) -> Option<String> {
        let mut slug = String::with_capacity(self.0.len());
        for c in self.0.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }

        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            None
        } else {
            Some(slug.to_string())
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 読み込み済みのラベル列（常に1件以上）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    /// 空の場合は None
    pub fn new(labels: Vec<Label>) -> Option<Self> {
        if labels.is_empty() {
            None
        } else {
            Some(Self { labels })
        }
    }

    /// インスタンス `id` (1始まり) のラベル
    ///
    /// ラベル数が足りない場合は循環して再利用する:
    /// `label(i) = labels[(i - 1) mod len]`
    pub fn label_for(&self, id: u32) -> &Label {
        debug_assert!(id >= 1, "instance ids start at 1");
        let index = (id.saturating_sub(1) as usize) % self.labels.len();
        &self.labels[index]
    }

    /// インスタンス `id` のホスト名部分（ドメインを除く）
    ///
    /// スラッグを最初に使うインスタンスだけが素のスラッグを得る。
    /// 循環による再利用や、別ラベルと同じスラッグになる場合は `{slug}--{id}`、
    /// スラッグが空なら `instance--{id}`。スラッグは `--` を含まないため、
    /// 素のスラッグと接尾辞付きの名前は衝突しない。
    pub fn host_name_for(&self, id: u32) -> String {
        match self.label_for(id).host_slug() {
            Some(slug) if self.first_instance_with_slug(&slug) == Some(id) => slug,
            Some(slug) => format!("{}--{}", slug, id),
            None => format!("instance--{}", id),
        }
    }

    fn first_instance_with_slug(&self, slug: &str) -> Option<u32> {
        self.labels
            .iter()
            .position(|label| label.host_slug().as_deref() == Some(slug))
            .map(|index| index as u32 + 1)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_set(values: &[&str]) -> LabelSet {
        LabelSet::new(values.iter().filter_map(Label::new).collect()).unwrap()
    }

    #[test]
    fn test_label_trims_and_rejects_blank() {
        assert_eq!(Label::new("  chaoss \n").unwrap().as_str(), "chaoss");
        assert!(Label::new("").is_none());
        assert!(Label::new("   ").is_none());
    }

    #[test]
    fn test_host_slug() {
        let slug = |value: &str| Label::new(value).unwrap().host_slug();

        assert_eq!(slug("CHAOSS").as_deref(), Some("chaoss"));
        assert_eq!(slug("Red Hat").as_deref(), Some("red-hat"));
        assert_eq!(slug("a__b..c").as_deref(), Some("a-b-c"));
        assert_eq!(slug("-edge-").as_deref(), Some("edge"));
        assert_eq!(slug("a -- b").as_deref(), Some("a-b"));
        assert_eq!(slug("日本"), None);
    }

    #[test]
    fn test_cyclic_label_assignment() {
        let labels = label_set(&["a", "b", "c"]);

        assert_eq!(labels.label_for(1).as_str(), "a");
        assert_eq!(labels.label_for(3).as_str(), "c");
        assert_eq!(labels.label_for(4).as_str(), "a");
        assert_eq!(labels.label_for(5).as_str(), "b");
    }

    #[test]
    fn test_reused_label_gets_suffixed_host_name() {
        let labels = label_set(&["a", "b", "c"]);

        assert_eq!(labels.host_name_for(3), "c");
        assert_eq!(labels.host_name_for(4), "a--4");
        assert_eq!(labels.host_name_for(5), "b--5");
    }

    #[test]
    fn test_suffix_never_matches_another_label() {
        let labels = label_set(&["a", "a-3"]);

        assert_eq!(labels.host_name_for(1), "a");
        assert_eq!(labels.host_name_for(2), "a-3");
        assert_eq!(labels.host_name_for(3), "a--3");
    }

    #[test]
    fn test_labels_sharing_a_slug_get_distinct_host_names() {
        let labels = label_set(&["Red Hat", "red hat", "日本", "中国"]);

        assert_eq!(labels.host_name_for(1), "red-hat");
        assert_eq!(labels.host_name_for(2), "red-hat--2");
        assert_eq!(labels.host_name_for(3), "instance--3");
        assert_eq!(labels.host_name_for(4), "instance--4");
    }

    #[test]
    fn test_empty_label_set_rejected() {
        assert!(LabelSet::new(Vec::new()).is_none());
    }
}
