//! Replace rule store / 替换规则存储
//!
//! Every bulk operation reads full rows, builds the modified values and writes
//! them back inside one transaction.

use sqlx::{Sqlite, SqlitePool, Transaction};

use super::groups::{self, UNGROUPED};
use super::rule::{ReplaceRule, MIN_ORDER, UNASSIGNED_ORDER};
use super::selector::{select_rules, RuleTarget};
use super::{RuleQuery, SortMode};
use crate::error::{Error, Result};

const RULE_COLUMNS: &str = r#"id, name, "group", pattern, replacement, scope, scope_title, scope_content,
    exclude_scope, is_enabled, is_regex, timeout_millisecond, sort_order"#;

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

#[derive(Clone)]
pub struct ReplaceRuleRepository {
    db: SqlitePool,
}

impl ReplaceRuleRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ---- queries ----

    /// All rules, ascending by order / 全部规则
    pub async fn all(&self) -> Result<Vec<ReplaceRule>> {
        let sql = format!("SELECT {} FROM replace_rules ORDER BY sort_order ASC, id ASC", RULE_COLUMNS);
        Ok(sqlx::query_as::<_, ReplaceRule>(&sql).fetch_all(&self.db).await?)
    }

    pub async fn all_enabled(&self) -> Result<Vec<ReplaceRule>> {
        let sql = format!(
            "SELECT {} FROM replace_rules WHERE is_enabled = 1 ORDER BY sort_order ASC, id ASC",
            RULE_COLUMNS
        );
        Ok(sqlx::query_as::<_, ReplaceRule>(&sql).fetch_all(&self.db).await?)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ReplaceRule>> {
        let sql = format!("SELECT {} FROM replace_rules WHERE id = ?", RULE_COLUMNS);
        Ok(sqlx::query_as::<_, ReplaceRule>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?)
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<ReplaceRule>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM replace_rules WHERE id IN ({}) ORDER BY sort_order ASC, id ASC",
            RULE_COLUMNS,
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, ReplaceRule>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        Ok(query.fetch_all(&self.db).await?)
    }

    /// List rules for a management view / 列表查询
    pub async fn list(&self, query: &RuleQuery, sort: SortMode) -> Result<Vec<ReplaceRule>> {
        let mut rules = match query {
            RuleQuery::All => self.all().await?,
            RuleQuery::Ungrouped => self.ungrouped().await?,
            RuleQuery::Group(key) => {
                let sql = format!(r#"SELECT {} FROM replace_rules WHERE "group" LIKE ? ORDER BY sort_order ASC, id ASC"#, RULE_COLUMNS);
                sqlx::query_as::<_, ReplaceRule>(&sql)
                    .bind(format!("%{}%", key))
                    .fetch_all(&self.db)
                    .await?
            }
            RuleQuery::Search(key) => {
                let sql = format!(
                    r#"SELECT {} FROM replace_rules
                    WHERE "group" LIKE ? OR name LIKE ? OR pattern LIKE ? OR replacement LIKE ? OR scope LIKE ?
                    ORDER BY sort_order ASC, id ASC"#,
                    RULE_COLUMNS
                );
                let like = format!("%{}%", key);
                sqlx::query_as::<_, ReplaceRule>(&sql)
                    .bind(&like)
                    .bind(&like)
                    .bind(&like)
                    .bind(&like)
                    .bind(&like)
                    .fetch_all(&self.db)
                    .await?
            }
        };
        sort.sort(&mut rules);
        Ok(rules)
    }

    /// Rules in the synthetic "ungrouped" bucket / 未分组规则
    pub async fn ungrouped(&self) -> Result<Vec<ReplaceRule>> {
        let sql = format!(
            r#"SELECT {} FROM replace_rules
            WHERE "group" IS NULL OR trim("group") = '' OR "group" LIKE ?
            ORDER BY sort_order ASC, id ASC"#,
            RULE_COLUMNS
        );
        Ok(sqlx::query_as::<_, ReplaceRule>(&sql)
            .bind(format!("%{}%", UNGROUPED))
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn min_order(&self) -> Result<i32> {
        let min: Option<i32> = sqlx::query_scalar("SELECT MIN(sort_order) FROM replace_rules")
            .fetch_one(&self.db)
            .await?;
        Ok(min.unwrap_or(0))
    }

    pub async fn max_order(&self) -> Result<i32> {
        let max: Option<i32> = sqlx::query_scalar("SELECT MAX(sort_order) FROM replace_rules")
            .fetch_one(&self.db)
            .await?;
        Ok(max.unwrap_or(0))
    }

    /// Number of disabled rules / 已禁用规则数
    pub async fn disabled_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) - COALESCE(SUM(is_enabled), 0) FROM replace_rules",
        )
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    /// Distinct group names, pinyin-sorted / 所有分组
    pub async fn all_groups(&self) -> Result<Vec<String>> {
        let fields: Vec<String> = sqlx::query_scalar(
            r#"SELECT DISTINCT "group" FROM replace_rules WHERE "group" IS NOT NULL AND trim("group") <> ''"#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(groups::collect_groups(fields.iter().map(String::as_str)))
    }

    pub async fn find_enabled_by_scope(
        &self,
        name: &str,
        origin: &str,
        target: RuleTarget,
    ) -> Result<Vec<ReplaceRule>> {
        let enabled = self.all_enabled().await?;
        Ok(select_rules(&enabled, name, origin, target))
    }

    /// Title rules for a book / 标题替换规则
    pub async fn find_enabled_by_title_scope(&self, name: &str, origin: &str) -> Result<Vec<ReplaceRule>> {
        self.find_enabled_by_scope(name, origin, RuleTarget::Title).await
    }

    /// Content rules for a book / 正文替换规则
    pub async fn find_enabled_by_content_scope(&self, name: &str, origin: &str) -> Result<Vec<ReplaceRule>> {
        self.find_enabled_by_scope(name, origin, RuleTarget::Content).await
    }

    // ---- writes ----

    /// Insert or replace rules; returns their ids / 插入（同id覆盖）
    ///
    /// Rules carrying `UNASSIGNED_ORDER` are appended after the current maximum.
    pub async fn insert(&self, rules: &[ReplaceRule]) -> Result<Vec<i64>> {
        let unassigned = rules.iter().filter(|r| r.order == UNASSIGNED_ORDER).count();
        let mut next_order = if unassigned > 0 {
            self.edge_start(unassigned, true).await?
        } else {
            0
        };

        let mut tx = self.db.begin().await?;
        let mut ids = Vec::with_capacity(rules.len());
        for rule in rules {
            let mut rule = rule.clone();
            if rule.order == UNASSIGNED_ORDER {
                rule.order = next_order;
                next_order = next_order.saturating_add(1);
            }
            ids.push(insert_row(&mut tx, &rule).await?);
        }

        tx.commit().await?;
        tracing::debug!("Inserted {} replace rules", ids.len());
        Ok(ids)
    }

    /// Validate then insert or update one rule / 保存单条规则
    pub async fn save(&self, rule: &ReplaceRule) -> Result<i64> {
        rule.check_valid().map_err(Error::InvalidInput)?;
        let ids = self.insert(std::slice::from_ref(rule)).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| Error::NotFound("inserted rule".to_string()))
    }

    /// Update full rows in one transaction / 批量更新
    pub async fn update(&self, rules: &[ReplaceRule]) -> Result<()> {
        if rules.is_empty() {
            return Ok(());
        }
        if rules.iter().any(|r| r.order == UNASSIGNED_ORDER) {
            return Err(Error::InvalidInput(format!("排序值不能小于 {}", MIN_ORDER)));
        }
        let mut tx = self.db.begin().await?;
        for rule in rules {
            update_row(&mut tx, rule).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!("DELETE FROM replace_rules WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let deleted = query.execute(&self.db).await?.rows_affected();
        tracing::info!("Deleted {} replace rules", deleted);
        Ok(deleted)
    }

    pub async fn update_enabled(&self, ids: &[i64], enabled: bool) -> Result<()> {
        let rules: Vec<ReplaceRule> = self
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|r| ReplaceRule { is_enabled: enabled, ..r })
            .collect();
        self.update(&rules).await
    }

    pub async fn enable_all(&self, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE replace_rules SET is_enabled = ?")
            .bind(enabled)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    // ---- ordering ----

    /// Move one rule to the visual top / 置顶
    pub async fn to_top(&self, id: i64, is_desc: bool) -> Result<()> {
        let rule = self.require(id).await?;
        let order = self.edge_start(1, is_desc).await?;
        self.update(&[ReplaceRule { order, ..rule }]).await
    }

    /// Move one rule to the visual bottom / 置底
    pub async fn to_bottom(&self, id: i64, is_desc: bool) -> Result<()> {
        let rule = self.require(id).await?;
        let order = self.edge_start(1, !is_desc).await?;
        self.update(&[ReplaceRule { order, ..rule }]).await
    }

    /// Move several rules to the visual top, keeping their relative order / 批量置顶
    pub async fn top_by_ids(&self, ids: &[i64], is_desc: bool) -> Result<()> {
        let rules = self.find_by_ids(ids).await?;
        if rules.is_empty() {
            return Ok(());
        }
        let start = self.edge_start(rules.len(), is_desc).await?;
        self.update(&renumber(rules, start)).await
    }

    /// Move several rules to the visual bottom, keeping their relative order / 批量置底
    pub async fn bottom_by_ids(&self, ids: &[i64], is_desc: bool) -> Result<()> {
        let rules = self.find_by_ids(ids).await?;
        if rules.is_empty() {
            return Ok(());
        }
        let start = self.edge_start(rules.len(), !is_desc).await?;
        self.update(&renumber(rules, start)).await
    }

    /// First of `count` consecutive orders above the maximum (`after_max`) or
    /// below the minimum. Compacts all orders once when the range is used up.
    async fn edge_start(&self, count: usize, after_max: bool) -> Result<i32> {
        if let Some(start) = self.try_edge_start(count, after_max).await? {
            return Ok(start);
        }
        tracing::info!("Replace rule orders reached the i32 range, compacting");
        self.compact_orders().await?;
        self.try_edge_start(count, after_max)
            .await?
            .ok_or_else(|| Error::InvalidInput(format!("无法为 {} 条规则分配排序值", count)))
    }

    async fn try_edge_start(&self, count: usize, after_max: bool) -> Result<Option<i32>> {
        let Ok(count) = i32::try_from(count) else {
            return Ok(None);
        };
        let start = if after_max {
            let max = self.max_order().await?;
            max.checked_add(count).map(|_| max + 1)
        } else {
            let min = self.min_order().await?;
            min.checked_sub(count).filter(|start| *start >= MIN_ORDER)
        };
        Ok(start)
    }

    /// Renumber every rule as 1..n, keeping the current order / 压缩排序值
    async fn compact_orders(&self) -> Result<()> {
        let rules = self.all().await?;
        self.update(&renumber(rules, 1)).await
    }

    /// Persist a manually arranged list (ids in visual order) / 保存拖动排序
    pub async fn move_order(&self, ids_in_view: &[i64], is_desc: bool) -> Result<()> {
        let size = ids_in_view.len() as i32;
        let mut by_id: std::collections::HashMap<i64, ReplaceRule> = self
            .find_by_ids(ids_in_view)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let updated: Vec<ReplaceRule> = ids_in_view
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                let rule = by_id.remove(id)?;
                let order = if is_desc { size - index as i32 } else { index as i32 + 1 };
                Some(ReplaceRule { order, ..rule })
            })
            .collect();
        self.update(&updated).await
    }

    /// Renumber non-negative orders as 1..n / 整理排序值
    pub async fn up_order(&self) -> Result<()> {
        let mut normal_order = 1;
        let rules: Vec<ReplaceRule> = self
            .all()
            .await?
            .into_iter()
            .map(|mut rule| {
                if rule.order >= 0 {
                    rule.order = normal_order;
                    normal_order += 1;
                }
                rule
            })
            .collect();
        self.update(&rules).await
    }

    // ---- groups ----

    /// Put every ungrouped rule into `group` / 未分组规则加入分组
    pub async fn add_group(&self, group: &str) -> Result<()> {
        let group = group.trim();
        if group.is_empty() {
            return Err(Error::InvalidInput("分组名称不能为空".to_string()));
        }
        let rules: Vec<ReplaceRule> = self
            .ungrouped()
            .await?
            .into_iter()
            .map(|r| ReplaceRule { group: Some(group.to_string()), ..r })
            .collect();
        self.update(&rules).await
    }

    /// Add a group token to the selected rules / 选中规则添加分组
    pub async fn add_group_to_ids(&self, ids: &[i64], group: &str) -> Result<()> {
        let rules: Vec<ReplaceRule> = self
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|r| {
                let field = groups::append_group(r.group.as_deref(), group);
                ReplaceRule { group: field, ..r }
            })
            .collect();
        self.update(&rules).await
    }

    /// Rename a group token, or remove it when `new_group` is empty / 修改分组
    pub async fn up_group(&self, old_group: &str, new_group: Option<&str>) -> Result<()> {
        let rules = self.rules_mentioning(old_group).await?;
        let updated: Vec<ReplaceRule> = rules
            .into_iter()
            .filter_map(|r| {
                let field = groups::rename_group(r.group.as_deref(), old_group, new_group)?;
                Some(ReplaceRule { group: field, ..r })
            })
            .collect();
        tracing::debug!("Group {} renamed on {} rules", old_group, updated.len());
        self.update(&updated).await
    }

    /// Remove a group token from every rule / 删除分组
    pub async fn del_group(&self, group: &str) -> Result<()> {
        self.up_group(group, None).await
    }

    async fn rules_mentioning(&self, group: &str) -> Result<Vec<ReplaceRule>> {
        let sql = format!(r#"SELECT {} FROM replace_rules WHERE "group" LIKE ?"#, RULE_COLUMNS);
        Ok(sqlx::query_as::<_, ReplaceRule>(&sql)
            .bind(format!("%{}%", group))
            .fetch_all(&self.db)
            .await?)
    }

    async fn require(&self, id: i64) -> Result<ReplaceRule> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("replace rule {}", id)))
    }
}

fn renumber(rules: Vec<ReplaceRule>, start: i32) -> Vec<ReplaceRule> {
    rules
        .into_iter()
        .enumerate()
        .map(|(i, r)| ReplaceRule { order: start + i as i32, ..r })
        .collect()
}

async fn insert_row(tx: &mut Transaction<'_, Sqlite>, rule: &ReplaceRule) -> Result<i64> {
    let id = if rule.id > 0 { Some(rule.id) } else { None };
    let result = sqlx::query(
        r#"INSERT OR REPLACE INTO replace_rules
        (id, name, "group", pattern, replacement, scope, scope_title, scope_content,
         exclude_scope, is_enabled, is_regex, timeout_millisecond, sort_order)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(id)
    .bind(&rule.name)
    .bind(&rule.group)
    .bind(&rule.pattern)
    .bind(&rule.replacement)
    .bind(&rule.scope)
    .bind(rule.scope_title)
    .bind(rule.scope_content)
    .bind(&rule.exclude_scope)
    .bind(rule.is_enabled)
    .bind(rule.is_regex)
    .bind(rule.timeout_millisecond)
    .bind(rule.order)
    .execute(&mut **tx)
    .await?;
    Ok(id.unwrap_or_else(|| result.last_insert_rowid()))
}

async fn update_row(tx: &mut Transaction<'_, Sqlite>, rule: &ReplaceRule) -> Result<()> {
    sqlx::query(
        r#"UPDATE replace_rules SET name = ?, "group" = ?, pattern = ?, replacement = ?, scope = ?,
        scope_title = ?, scope_content = ?, exclude_scope = ?, is_enabled = ?, is_regex = ?,
        timeout_millisecond = ?, sort_order = ? WHERE id = ?"#,
    )
    .bind(&rule.name)
    .bind(&rule.group)
    .bind(&rule.pattern)
    .bind(&rule.replacement)
    .bind(&rule.scope)
    .bind(rule.scope_title)
    .bind(rule.scope_content)
    .bind(&rule.exclude_scope)
    .bind(rule.is_enabled)
    .bind(rule.is_regex)
    .bind(rule.timeout_millisecond)
    .bind(rule.order)
    .bind(rule.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
