//! Replace rule entity / 替换规则实体

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Order of a rule that has not been ranked yet / 未分配排序值
pub const UNASSIGNED_ORDER: i32 = i32::MIN;

/// Lowest order a stored rule may carry / 可存储的最小排序值
pub const MIN_ORDER: i32 = UNASSIGNED_ORDER + 1;

static DOLLAR_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\d+)").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplaceRule {
    pub id: i64,
    pub name: String,
    pub group: Option<String>,
    pub pattern: String,
    pub replacement: String,
    pub scope: Option<String>,
    pub scope_title: bool,
    pub scope_content: bool,
    pub exclude_scope: Option<String>,
    pub is_enabled: bool,
    pub is_regex: bool,
    pub timeout_millisecond: i64,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
}

impl Default for ReplaceRule {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            group: None,
            pattern: String::new(),
            replacement: String::new(),
            scope: None,
            scope_title: false,
            scope_content: true,
            exclude_scope: None,
            is_enabled: true,
            is_regex: true,
            timeout_millisecond: 3000,
            order: UNASSIGNED_ORDER,
        }
    }
}

impl ReplaceRule {
    /// Check that the rule can be applied / 检查规则是否有效
    pub fn check_valid(&self) -> Result<(), String> {
        if self.pattern.is_empty() {
            return Err("替换规则为空".to_string());
        }
        if self.is_regex {
            Regex::new(&self.pattern).map_err(|e| format!("正则表达式错误: {}", e))?;
            if ends_with_unescaped_bar(&self.pattern) {
                return Err("正则表达式以 | 结尾，会匹配空字符串".to_string());
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.check_valid().is_ok()
    }

    /// Display name, falling back to the pattern / 显示名称
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.pattern
        } else {
            &self.name
        }
    }
}

fn ends_with_unescaped_bar(pattern: &str) -> bool {
    if !pattern.ends_with('|') {
        return false;
    }
    let backslashes = pattern[..pattern.len() - 1]
        .chars()
        .rev()
        .take_while(|c| *c == '\\')
        .count();
    backslashes % 2 == 0
}

/// Convert a `$1abc` style template to the `${1}abc` form understood by `regex`
/// / 兼容 `$1abc` 写法
pub fn normalize_template(template: &str) -> Cow<'_, str> {
    if !template.contains('$') {
        return Cow::Borrowed(template);
    }
    // `\$` is a literal dollar sign
    let escaped = template.replace("\\$", "\u{0}");
    let grouped = DOLLAR_GROUP.replace_all(&escaped, "$${$1}");
    Cow::Owned(grouped.replace('\u{0}', "$$"))
}

/// A rule ready to run against text / 编译后的规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: i64,
    pub name: String,
    matcher: Matcher,
    replacement: String,
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Regex(Regex),
    Inert,
}

impl CompiledRule {
    pub fn compile(rule: &ReplaceRule) -> Self {
        let matcher = if rule.pattern.is_empty() {
            Matcher::Inert
        } else if rule.is_regex {
            match Regex::new(&rule.pattern) {
                Ok(regex) => Matcher::Regex(regex),
                Err(e) => {
                    tracing::warn!("Replace rule {} ({}) has invalid regex: {}", rule.id, rule.display_name(), e);
                    Matcher::Inert
                }
            }
        } else {
            Matcher::Literal(rule.pattern.clone())
        };

        let replacement = if rule.is_regex {
            normalize_template(&rule.replacement).into_owned()
        } else {
            rule.replacement.clone()
        };

        Self {
            id: rule.id,
            name: rule.display_name().to_string(),
            matcher,
            replacement,
        }
    }

    pub fn is_inert(&self) -> bool {
        matches!(self.matcher, Matcher::Inert)
    }

    /// Apply to text; an inert rule returns the input unchanged / 应用规则
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.matcher {
            Matcher::Literal(pattern) => {
                if text.contains(pattern.as_str()) {
                    Cow::Owned(text.replace(pattern.as_str(), &self.replacement))
                } else {
                    Cow::Borrowed(text)
                }
            }
            Matcher::Regex(regex) => regex.replace_all(text, self.replacement.as_str()),
            Matcher::Inert => Cow::Borrowed(text),
        }
    }
}
