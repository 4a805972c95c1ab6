//! Scope-based rule selection / 按作用范围筛选规则
//!
//! Pure functions: no storage access, callers pass the rows they loaded.

use super::rule::ReplaceRule;

/// Which part of a chapter a rule is applied to / 规则作用目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    Title,
    Content,
}

/// Substring test with ASCII case folding, the way SQLite `LIKE '%x%'` compares.
/// An empty needle is contained in every haystack.
fn contains_identifier(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// Scope test for one book / 判断规则是否作用于该书
///
/// Exclusion always wins over inclusion. Only a missing or empty scope is global.
pub fn is_in_scope(rule: &ReplaceRule, name: &str, origin: &str) -> bool {
    if let Some(exclude) = rule.exclude_scope.as_deref() {
        if contains_identifier(exclude, name) || contains_identifier(exclude, origin) {
            return false;
        }
    }
    match rule.scope.as_deref() {
        None | Some("") => true,
        Some(scope) => contains_identifier(scope, name) || contains_identifier(scope, origin),
    }
}

pub fn applies_to(rule: &ReplaceRule, target: RuleTarget) -> bool {
    match target {
        RuleTarget::Title => rule.scope_title,
        RuleTarget::Content => rule.scope_content,
    }
}

/// Enabled, in-scope rules for a target, ascending by order then id / 选出适用规则
pub fn select_rules(
    rules: &[ReplaceRule],
    name: &str,
    origin: &str,
    target: RuleTarget,
) -> Vec<ReplaceRule> {
    let mut selected: Vec<ReplaceRule> = rules
        .iter()
        .filter(|r| r.is_enabled && applies_to(r, target) && is_in_scope(r, name, origin))
        .cloned()
        .collect();
    selected.sort_by_key(|r| (r.order, r.id));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i64, order: i32) -> ReplaceRule {
        ReplaceRule {
            id,
            name: format!("rule{}", id),
            pattern: "x".to_string(),
            order,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_scope_applies_everywhere() {
        let mut r = rule(1, 0);
        assert!(is_in_scope(&r, "三体", "https://a.com"));
        r.scope = Some(String::new());
        assert!(is_in_scope(&r, "任何书", "origin"));
        assert!(is_in_scope(&r, "", ""));
    }

    #[test]
    fn test_blank_scope_is_not_global() {
        let mut r = rule(1, 0);
        r.scope = Some("  ".to_string());
        assert!(!is_in_scope(&r, "任何书", "origin"));
    }

    #[test]
    fn test_empty_identifiers_match_any_scope() {
        let mut r = rule(1, 0);
        r.scope = Some("三体".to_string());
        assert!(is_in_scope(&r, "", ""));

        r.scope = None;
        r.exclude_scope = Some("三体".to_string());
        assert!(!is_in_scope(&r, "", ""));
        assert!(is_in_scope(&r, "球状闪电", "https://b.com"));
    }

    #[test]
    fn test_scope_ignores_ascii_case() {
        let mut r = rule(1, 0);
        r.scope = Some("https://A.COM".to_string());
        assert!(is_in_scope(&r, "书", "https://a.com"));

        r.scope = None;
        r.exclude_scope = Some("Book".to_string());
        assert!(!is_in_scope(&r, "BOOK", "x"));
    }

    #[test]
    fn test_scope_matches_name_or_origin() {
        let mut r = rule(1, 0);
        r.scope = Some("三体,https://a.com".to_string());
        assert!(is_in_scope(&r, "三体", "other"));
        assert!(is_in_scope(&r, "other", "https://a.com"));
        assert!(!is_in_scope(&r, "球状闪电", "https://b.com"));
    }

    #[test]
    fn test_exclude_wins() {
        let mut r = rule(1, 0);
        r.scope = Some("三体".to_string());
        r.exclude_scope = Some("三体".to_string());
        assert!(!is_in_scope(&r, "三体", "x"));

        r.scope = None;
        r.exclude_scope = Some("https://a.com".to_string());
        assert!(!is_in_scope(&r, "任何书", "https://a.com"));
        assert!(is_in_scope(&r, "任何书", "https://b.com"));
    }

    #[test]
    fn test_select_filters_and_orders() {
        let mut disabled = rule(1, 0);
        disabled.is_enabled = false;
        let mut title_only = rule(2, 1);
        title_only.scope_title = true;
        title_only.scope_content = false;
        let late = rule(3, 9);
        let early = rule(4, -5);
        let tie_a = rule(5, 2);
        let tie_b = rule(6, 2);
        let rules = vec![disabled, title_only, late, tie_b.clone(), early, tie_a.clone()];

        let content: Vec<i64> = select_rules(&rules, "书", "源", RuleTarget::Content)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(content, vec![4, 5, 6, 3]);

        let title: Vec<i64> = select_rules(&rules, "书", "源", RuleTarget::Title)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(title, vec![2]);
    }
}
