//! Replace rules / 替换净化规则
//!
//! Storage, scope selection, group editing, application and import/export of
//! the rules that rewrite chapter titles and text.

pub mod groups;
pub mod import;
pub mod processor;
pub mod repository;
pub mod rule;
pub mod selector;

use serde::{Deserialize, Serialize};

use crate::text::cn_compare;

pub use import::{ImportItem, ImportOptions, ImportPlan, ImportStatus, SourcePolicy};
pub use processor::ContentProcessor;
pub use repository::ReplaceRuleRepository;
pub use rule::{CompiledRule, ReplaceRule};
pub use selector::RuleTarget;

/// Sort mode of rule lists / 规则列表排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    Asc,
    #[default]
    Desc,
    NameAsc,
    NameDesc,
}

impl From<&str> for SortMode {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "asc" => SortMode::Asc,
            "name_asc" => SortMode::NameAsc,
            "name_desc" => SortMode::NameDesc,
            _ => SortMode::Desc,
        }
    }
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Asc => "asc",
            SortMode::Desc => "desc",
            SortMode::NameAsc => "name_asc",
            SortMode::NameDesc => "name_desc",
        }
    }

    /// Whether the visual top holds the largest order
    pub fn is_desc(&self) -> bool {
        matches!(self, SortMode::Desc)
    }

    pub fn sort(&self, rules: &mut [ReplaceRule]) {
        match self {
            SortMode::Asc => rules.sort_by_key(|r| (r.order, r.id)),
            SortMode::Desc => rules.sort_by(|a, b| (b.order, b.id).cmp(&(a.order, a.id))),
            SortMode::NameAsc => rules.sort_by(|a, b| cn_compare(a.display_name(), b.display_name())),
            SortMode::NameDesc => rules.sort_by(|a, b| cn_compare(b.display_name(), a.display_name())),
        }
    }
}

/// Filter of a rule list view / 列表过滤条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleQuery {
    All,
    Ungrouped,
    Group(String),
    Search(String),
}

impl RuleQuery {
    /// `""` all, `未分组` ungrouped, `group:<name>` one group, anything else a keyword
    pub fn parse(key: Option<&str>) -> Self {
        let key = key.map(str::trim).unwrap_or_default();
        if key.is_empty() {
            RuleQuery::All
        } else if key == groups::UNGROUPED {
            RuleQuery::Ungrouped
        } else if let Some(group) = key.strip_prefix("group:") {
            RuleQuery::Group(group.trim().to_string())
        } else {
            RuleQuery::Search(key.to_string())
        }
    }
}
