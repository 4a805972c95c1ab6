//! Group field helpers / 分组字段处理
//!
//! A group field holds tokens separated by `,` `;` `，` `；`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::cn_compare;

/// Synthetic bucket for rules without a group / 未分组
pub const UNGROUPED: &str = "未分组";

static SPLIT_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new("[,;，；]").expect("static regex"));

/// Split a group field into trimmed, non-blank tokens (order kept, duplicates dropped)
pub fn split_groups(group: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in SPLIT_GROUP.split(group) {
        let token = token.trim();
        if !token.is_empty() && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Join tokens back into a group field; no tokens means no group
pub fn join_groups(tokens: &[String]) -> Option<String> {
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(","))
    }
}

pub fn is_ungrouped(group: Option<&str>) -> bool {
    match group {
        None => true,
        Some(g) => g.trim().is_empty() || g.contains(UNGROUPED),
    }
}

pub fn has_group(group: Option<&str>, token: &str) -> bool {
    group
        .map(|g| split_groups(g).iter().any(|t| t == token))
        .unwrap_or(false)
}

/// Rename (or drop, when `new_group` is empty) one token / 修改分组
///
/// Returns `None` when the field does not carry `old_group` as a whole token.
pub fn rename_group(group: Option<&str>, old_group: &str, new_group: Option<&str>) -> Option<Option<String>> {
    let mut tokens = split_groups(group?);
    let position = tokens.iter().position(|t| t == old_group)?;
    tokens.remove(position);
    if let Some(new_group) = new_group.map(str::trim).filter(|g| !g.is_empty()) {
        if !tokens.iter().any(|t| t == new_group) {
            tokens.insert(position.min(tokens.len()), new_group.to_string());
        }
    }
    Some(join_groups(&tokens))
}

/// Append a token if missing / 添加分组
pub fn append_group(group: Option<&str>, new_group: &str) -> Option<String> {
    let mut tokens = group.map(split_groups).unwrap_or_default();
    let new_group = new_group.trim();
    if !new_group.is_empty() && !tokens.iter().any(|t| t == new_group) {
        tokens.push(new_group.to_string());
    }
    join_groups(&tokens)
}

/// Distinct tokens of all fields, pinyin-sorted / 汇总并排序分组
pub fn collect_groups<'a, I>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: Vec<String> = Vec::new();
    for field in fields {
        for token in split_groups(field) {
            if !groups.contains(&token) {
                groups.push(token);
            }
        }
    }
    groups.sort_by(|a, b| cn_compare(a, b));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_groups() {
        assert_eq!(split_groups("A, B；C;;A"), vec!["A", "B", "C"]);
        assert!(split_groups("  ").is_empty());
    }

    #[test]
    fn test_is_ungrouped() {
        assert!(is_ungrouped(None));
        assert!(is_ungrouped(Some("   ")));
        assert!(is_ungrouped(Some("未分组")));
        assert!(!is_ungrouped(Some("净化")));
    }

    #[test]
    fn test_rename_keeps_similar_tokens() {
        assert_eq!(rename_group(Some("A,B"), "A", None), Some(Some("B".to_string())));
        assert_eq!(rename_group(Some("AB"), "A", None), None);
        assert_eq!(rename_group(Some("A"), "A", None), Some(None));
        assert_eq!(
            rename_group(Some("A,AB,C"), "A", Some("Z")),
            Some(Some("Z,AB,C".to_string()))
        );
        // new name already present: just drop the old token
        assert_eq!(rename_group(Some("A,B"), "A", Some("B")), Some(Some("B".to_string())));
    }

    #[test]
    fn test_append_group() {
        assert_eq!(append_group(None, "净化"), Some("净化".to_string()));
        assert_eq!(append_group(Some("A"), "B"), Some("A,B".to_string()));
        assert_eq!(append_group(Some("A,B"), "A"), Some("A,B".to_string()));
    }

    #[test]
    fn test_collect_groups_sorted() {
        let groups = collect_groups(vec!["净化,广告", "广告", "默认；A"]);
        assert_eq!(groups, vec!["A", "广告", "净化", "默认"]);
    }
}
