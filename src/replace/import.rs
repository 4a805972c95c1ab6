//! Rule import / export / 规则导入导出
//!
//! An import is two steps: build a plan that classifies every incoming rule
//! against the store, then save the items the user kept selected.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::groups;
use super::repository::ReplaceRuleRepository;
use super::rule::ReplaceRule;
use crate::config::AppConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// Id not in the store / 新增
    New,
    /// Same id, different matching behavior / 有更新
    Update,
    /// Same id, same behavior / 已存在
    Existing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    pub rule: ReplaceRule,
    pub status: ImportStatus,
    pub selected: bool,
    /// Stored rule with the same id, if any
    #[serde(default)]
    pub local: Option<ReplaceRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPlan {
    pub items: Vec<ImportItem>,
}

impl ImportPlan {
    pub fn count(&self, status: ImportStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|i| i.selected).count()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Keep the stored name, group and order of updated rules / 保留原名
    pub keep_original_name: bool,
    /// Group applied to every imported rule / 自定义分组
    pub custom_group: Option<String>,
    /// Append `custom_group` instead of replacing the group / 追加分组
    pub add_group: bool,
}

/// Where an import source may come from / 导入来源限制
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    /// Files are only read from inside this directory
    pub import_dir: PathBuf,
    pub allow_remote_url: bool,
}

impl SourcePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            import_dir: config.get_import_dir(),
            allow_remote_url: config.import.allow_remote_url,
        }
    }

    /// Canonical path of `source` if it names an existing file inside the import dir
    async fn local_file(&self, source: &str) -> Result<Option<PathBuf>> {
        let path = self.import_dir.join(source);
        let Ok(path) = tokio::fs::canonicalize(&path).await else {
            return Ok(None);
        };
        let root = tokio::fs::canonicalize(&self.import_dir)
            .await
            .map_err(|e| Error::InvalidInput(format!("导入目录不可用 {:?}: {}", self.import_dir, e)))?;
        if !path.starts_with(&root) {
            tracing::warn!("Rejected import file outside {:?}: {:?}", root, path);
            return Err(Error::InvalidInput("只能导入导入目录中的文件".to_string()));
        }
        Ok(path.is_file().then_some(path))
    }
}

/// Fetch the text of an import source: URL, file name or inline JSON / 读取导入源
///
/// File names resolve against the import directory; URLs need `allow_remote_url`.
pub async fn resolve_source(source: &str, policy: &SourcePolicy) -> Result<String> {
    let source = source.trim();
    if source.starts_with("http://") || source.starts_with("https://") {
        if !policy.allow_remote_url {
            return Err(Error::InvalidInput("未开启网络导入".to_string()));
        }
        tracing::info!("Fetching replace rules from {}", source);
        let text = reqwest::get(source).await?.error_for_status()?.text().await?;
        return Ok(text);
    }
    if source.starts_with('{') || source.starts_with('[') {
        return Ok(source.to_string());
    }
    match policy.local_file(source).await? {
        Some(path) => Ok(tokio::fs::read_to_string(path).await?),
        None => Ok(source.to_string()),
    }
}

/// Parse one rule object or an array of rules / 解析规则JSON
pub fn parse_rules(text: &str) -> Result<Vec<ReplaceRule>> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| Error::InvalidInput(format!("格式不对: {}", e)))?;
    let rules = match value {
        serde_json::Value::Object(_) => vec![serde_json::from_value::<ReplaceRule>(value)?],
        serde_json::Value::Array(_) => serde_json::from_value::<Vec<ReplaceRule>>(value)?,
        _ => return Err(Error::InvalidInput("格式不对".to_string())),
    };

    let total = rules.len();
    let rules: Vec<ReplaceRule> = rules.into_iter().filter(|r| !r.pattern.is_empty()).collect();
    if rules.len() < total {
        tracing::warn!("Skipped {} imported rules with empty pattern", total - rules.len());
    }
    Ok(rules)
}

/// Whether importing `incoming` would change how `local` matches
fn has_changed(incoming: &ReplaceRule, local: &ReplaceRule) -> bool {
    incoming.pattern != local.pattern
        || incoming.replacement != local.replacement
        || incoming.is_regex != local.is_regex
        || incoming.scope != local.scope
}

/// Classify incoming rules against the store / 生成导入计划
pub async fn plan_import(repo: &ReplaceRuleRepository, rules: Vec<ReplaceRule>) -> Result<ImportPlan> {
    let mut items = Vec::with_capacity(rules.len());
    for rule in rules {
        let local = if rule.id > 0 { repo.find_by_id(rule.id).await? } else { None };
        let status = match &local {
            None => ImportStatus::New,
            Some(local) if has_changed(&rule, local) => ImportStatus::Update,
            Some(_) => ImportStatus::Existing,
        };
        items.push(ImportItem {
            rule,
            status,
            selected: status != ImportStatus::Existing,
            local,
        });
    }
    let plan = ImportPlan { items };
    tracing::debug!(
        "Import plan: {} new, {} update, {} existing",
        plan.count(ImportStatus::New),
        plan.count(ImportStatus::Update),
        plan.count(ImportStatus::Existing)
    );
    Ok(plan)
}

/// Save the selected items of a plan; returns how many were written / 保存导入
pub async fn save_import(
    repo: &ReplaceRuleRepository,
    plan: &ImportPlan,
    options: &ImportOptions,
) -> Result<usize> {
    let custom_group = options
        .custom_group
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty());

    let rules: Vec<ReplaceRule> = plan
        .items
        .iter()
        .filter(|item| item.selected)
        .map(|item| {
            let mut rule = item.rule.clone();
            if options.keep_original_name {
                if let Some(local) = &item.local {
                    rule.name = local.name.clone();
                    rule.group = local.group.clone();
                    rule.order = local.order;
                }
            }
            if let Some(group) = custom_group {
                rule.group = if options.add_group {
                    groups::append_group(rule.group.as_deref(), group)
                } else {
                    Some(group.to_string())
                };
            }
            rule
        })
        .collect();

    repo.insert(&rules).await?;
    tracing::info!("Imported {} replace rules", rules.len());
    Ok(rules.len())
}

/// Serialize rules for sharing / 导出规则
pub fn export_rules(rules: &[ReplaceRule]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rules)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn rule(id: i64, pattern: &str) -> ReplaceRule {
        ReplaceRule {
            id,
            name: format!("rule{}", id),
            pattern: pattern.to_string(),
            is_regex: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_object_and_array() {
        let one = parse_rules(r#"{"id":1,"name":"a","pattern":"x"}"#).unwrap();
        assert_eq!(one.len(), 1);
        let many = parse_rules(r#"[{"id":1,"pattern":"x"},{"id":2,"pattern":""}]"#).unwrap();
        assert_eq!(many.len(), 1);
        assert!(matches!(parse_rules("42"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_rules("not json"), Err(Error::InvalidInput(_))));
    }

    fn policy(dir: &std::path::Path) -> SourcePolicy {
        SourcePolicy {
            import_dir: dir.to_path_buf(),
            allow_remote_url: false,
        }
    }

    #[tokio::test]
    async fn test_resolve_inline_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy(dir.path());
        let inline = resolve_source(r#" [{"pattern":"x"}] "#, &policy).await.unwrap();
        assert!(inline.starts_with('['));

        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"pattern":"y"}"#).unwrap();
        let text = resolve_source("rules.json", &policy).await.unwrap();
        assert_eq!(parse_rules(&text).unwrap()[0].pattern, "y");
        let text = resolve_source(path.to_str().unwrap(), &policy).await.unwrap();
        assert_eq!(parse_rules(&text).unwrap()[0].pattern, "y");
    }

    #[tokio::test]
    async fn test_resolve_rejects_files_outside_import_dir() {
        let root = tempfile::tempdir().unwrap();
        let import_dir = root.path().join("imports");
        std::fs::create_dir(&import_dir).unwrap();
        let secret = root.path().join("secret.json");
        std::fs::write(&secret, r#"{"pattern":"s"}"#).unwrap();
        let policy = policy(&import_dir);

        let absolute = resolve_source(secret.to_str().unwrap(), &policy).await;
        assert!(matches!(absolute, Err(Error::InvalidInput(_))));
        let relative = resolve_source("../secret.json", &policy).await;
        assert!(matches!(relative, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_resolve_url_needs_remote_switch() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_source("http://127.0.0.1:9/rules.json", &policy(dir.path())).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_plan_classifies_rules() {
        let repo = ReplaceRuleRepository::new(memory_pool().await);
        repo.insert(&[rule(1, "same"), rule(2, "old")]).await.unwrap();

        let incoming = vec![rule(1, "same"), rule(2, "new"), rule(3, "fresh")];
        let plan = plan_import(&repo, incoming).await.unwrap();
        let statuses: Vec<ImportStatus> = plan.items.iter().map(|i| i.status).collect();
        assert_eq!(statuses, vec![ImportStatus::Existing, ImportStatus::Update, ImportStatus::New]);
        assert_eq!(plan.selected_count(), 2);
        assert!(!plan.items[0].selected);
    }

    #[tokio::test]
    async fn test_save_with_options() {
        let repo = ReplaceRuleRepository::new(memory_pool().await);
        let mut local = rule(1, "old");
        local.name = "本地名称".to_string();
        local.group = Some("净化".to_string());
        repo.insert(&[local]).await.unwrap();

        let mut incoming = rule(1, "new");
        incoming.name = "远程名称".to_string();
        let plan = plan_import(&repo, vec![incoming, rule(2, "fresh")]).await.unwrap();
        let options = ImportOptions {
            keep_original_name: true,
            custom_group: Some("导入".to_string()),
            add_group: true,
        };
        assert_eq!(save_import(&repo, &plan, &options).await.unwrap(), 2);

        let updated = repo.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(updated.name, "本地名称");
        assert_eq!(updated.pattern, "new");
        assert_eq!(updated.group.as_deref(), Some("净化,导入"));
        let fresh = repo.find_by_id(2).await.unwrap().unwrap();
        assert_eq!(fresh.group.as_deref(), Some("导入"));

        let replace_group = ImportOptions { custom_group: Some("覆盖".to_string()), ..Default::default() };
        let plan = plan_import(&repo, vec![rule(2, "changed")]).await.unwrap();
        save_import(&repo, &plan, &replace_group).await.unwrap();
        assert_eq!(repo.find_by_id(2).await.unwrap().unwrap().group.as_deref(), Some("覆盖"));
    }

    #[test]
    fn test_export_roundtrips_field_names() {
        let json = export_rules(&[rule(7, "x")]).unwrap();
        assert!(json.contains("\"isRegex\": false"));
        assert!(json.contains("\"order\""));
    }
}
