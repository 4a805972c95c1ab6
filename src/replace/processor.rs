//! Apply the rules selected for one book / 正文与标题处理
use super::repository::ReplaceRuleRepository;
use super::rule::{CompiledRule, ReplaceRule};
use crate::error::Result;
use crate::text::ChineseConverter;

/// Rules compiled once per book and applied in order / 每本书的规则处理器
#[derive(Debug, Clone, Default)]
pub struct ContentProcessor {
    title_rules: Vec<CompiledRule>,
    content_rules: Vec<CompiledRule>,
    converter: ChineseConverter,
}

impl ContentProcessor {
    /// Rules must already be selected and ordered / 传入已筛选排序的规则
    pub fn from_rules(title_rules: &[ReplaceRule], content_rules: &[ReplaceRule]) -> Self {
        Self {
            title_rules: title_rules.iter().map(CompiledRule::compile).collect(),
            content_rules: content_rules.iter().map(CompiledRule::compile).collect(),
            converter: ChineseConverter::None,
        }
    }

    pub async fn load(repo: &ReplaceRuleRepository, name: &str, origin: &str) -> Result<Self> {
        let title_rules = repo.find_enabled_by_title_scope(name, origin).await?;
        let content_rules = repo.find_enabled_by_content_scope(name, origin).await?;
        tracing::debug!(
            "Loaded {} title rules, {} content rules for {}",
            title_rules.len(),
            content_rules.len(),
            name
        );
        Ok(Self::from_rules(&title_rules, &content_rules))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_converter(mut self, converter: ChineseConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn content_rule_count(&self) -> usize {
        self.content_rules.len()
    }

    /// Convert then run title rules / 处理标题
    pub fn process_title(&self, title: &str) -> String {
        let converted = self.converter.convert(title);
        apply_all(&self.title_rules, converted)
    }

    /// Run content rules when `use_replace` / 处理正文
    pub fn process_content(&self, content: &str, use_replace: bool) -> String {
        if !use_replace {
            return content.to_string();
        }
        apply_all(&self.content_rules, content.to_string())
    }
}

fn apply_all(rules: &[CompiledRule], text: String) -> String {
    rules.iter().fold(text, |text, rule| match rule.apply(&text) {
        std::borrow::Cow::Borrowed(_) => text,
        std::borrow::Cow::Owned(changed) => changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn rule(pattern: &str, replacement: &str, is_regex: bool, order: i32) -> ReplaceRule {
        ReplaceRule {
            id: order as i64,
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            is_regex,
            order,
            ..Default::default()
        }
    }

    #[test]
    fn test_rules_apply_sequentially() {
        let rules = vec![rule("foo", "bar", false, 1), rule("bar", "baz", false, 2)];
        let processor = ContentProcessor::from_rules(&[], &rules);
        assert_eq!(processor.process_content("foo", true), "baz");
        assert_eq!(processor.process_content("foo", false), "foo");
    }

    #[test]
    fn test_bad_rule_does_not_stop_others() {
        let rules = vec![rule("(broken", "x", true, 1), rule(r"\s+", " ", true, 2)];
        let processor = ContentProcessor::from_rules(&[], &rules);
        assert_eq!(processor.process_content("a  \n b", true), "a b");
    }

    #[test]
    fn test_title_conversion_before_rules() {
        let title_rules = vec![rule("第一章", "序章", false, 1)];
        let processor = ContentProcessor::from_rules(&title_rules, &[])
            .with_converter(ChineseConverter::TraditionalToSimplified);
        assert_eq!(processor.process_title("第一章 開始"), "序章 开始");
        assert_eq!(ContentProcessor::empty().process_title("標題"), "標題");
    }

    #[tokio::test]
    async fn test_load_from_repository() {
        let repo = ReplaceRuleRepository::new(memory_pool().await);
        let mut scoped = rule("foo", "bar", false, 0);
        scoped.id = 0;
        scoped.scope = Some("三体".to_string());
        repo.insert(&[scoped]).await.unwrap();

        let processor = ContentProcessor::load(&repo, "三体", "loc_book").await.unwrap();
        assert_eq!(processor.content_rule_count(), 1);
        assert_eq!(processor.process_content("foo", true), "bar");

        let other = ContentProcessor::load(&repo, "球状闪电", "loc_book").await.unwrap();
        assert_eq!(other.process_content("foo", true), "foo");
    }
}
