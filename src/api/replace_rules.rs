use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use yuedu_backend::replace::import::{self, ImportOptions, ImportPlan};
use yuedu_backend::replace::{ContentProcessor, ReplaceRule, RuleQuery, SortMode};
use yuedu_backend::Error;

use super::{respond, ApiResponse, ApiResult, IdsRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub key: Option<String>,
    pub sort: Option<String>,
}

pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ReplaceRule>> {
    let sort = query
        .sort
        .as_deref()
        .map(SortMode::from)
        .unwrap_or_else(|| state.config.default_sort_mode());
    respond(state.rules.list(&RuleQuery::parse(query.key.as_deref()), sort).await)
}

pub async fn list_groups(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    respond(state.rules.all_groups().await)
}

/// Insert or update one rule / 保存规则
pub async fn save_rule(
    State(state): State<Arc<AppState>>,
    Json(rule): Json<ReplaceRule>,
) -> ApiResult<i64> {
    respond(state.rules.save(&rule).await)
}

pub async fn delete_rules(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IdsRequest>,
) -> ApiResult<u64> {
    respond(state.rules.delete_by_ids(&req.ids).await)
}

#[derive(Debug, Deserialize)]
pub struct EnableRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
    pub enabled: bool,
    /// Apply to every rule / 全部启用或禁用
    #[serde(default)]
    pub all: bool,
}

pub async fn enable_rules(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnableRequest>,
) -> ApiResult<()> {
    if req.all {
        respond(state.rules.enable_all(req.enabled).await)
    } else {
        respond(state.rules.update_enabled(&req.ids, req.enabled).await)
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
    /// Direction of the list the user is looking at; defaults to the configured sort
    pub is_desc: Option<bool>,
}

fn is_desc(state: &AppState, req: &OrderRequest) -> bool {
    req.is_desc.unwrap_or_else(|| state.config.default_sort_mode().is_desc())
}

pub async fn top_rules(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<()> {
    let desc = is_desc(&state, &req);
    match req.ids.as_slice() {
        [id] => respond(state.rules.to_top(*id, desc).await),
        ids => respond(state.rules.top_by_ids(ids, desc).await),
    }
}

pub async fn bottom_rules(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<()> {
    let desc = is_desc(&state, &req);
    match req.ids.as_slice() {
        [id] => respond(state.rules.to_bottom(*id, desc).await),
        ids => respond(state.rules.bottom_by_ids(ids, desc).await),
    }
}

/// Persist a drag-sorted list / 保存拖动排序
pub async fn move_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<()> {
    let desc = is_desc(&state, &req);
    respond(state.rules.move_order(&req.ids, desc).await)
}

pub async fn up_order(State(state): State<Arc<AppState>>) -> ApiResult<()> {
    respond(state.rules.up_order().await)
}

#[derive(Debug, Deserialize)]
pub struct GroupRequest {
    pub group: String,
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RenameGroupRequest {
    pub old_group: String,
    pub new_group: Option<String>,
}

pub async fn add_group(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GroupRequest>,
) -> ApiResult<()> {
    respond(state.rules.add_group(&req.group).await)
}

pub async fn assign_group(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GroupRequest>,
) -> ApiResult<()> {
    respond(state.rules.add_group_to_ids(&req.ids, &req.group).await)
}

pub async fn rename_group(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenameGroupRequest>,
) -> ApiResult<()> {
    respond(state.rules.up_group(&req.old_group, req.new_group.as_deref()).await)
}

pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GroupRequest>,
) -> ApiResult<()> {
    respond(state.rules.del_group(&req.group).await)
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// URL, file path or JSON text / 导入源
    pub source: String,
}

pub async fn import_plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> ApiResult<ImportPlan> {
    let result = async {
        let text = import::resolve_source(&req.source, &import::SourcePolicy::from_config(&state.config)).await?;
        let rules = import::parse_rules(&text)?;
        import::plan_import(&state.rules, rules).await
    }
    .await;
    respond(result)
}

#[derive(Debug, Deserialize)]
pub struct ImportSaveRequest {
    pub plan: ImportPlan,
    #[serde(default)]
    pub options: ImportOptions,
}

pub async fn import_save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportSaveRequest>,
) -> ApiResult<usize> {
    respond(import::save_import(&state.rules, &req.plan, &req.options).await)
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Comma separated ids; empty exports everything
    pub ids: Option<String>,
}

pub async fn export_rules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> axum::response::Response {
    let ids: Vec<i64> = query
        .ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let result = async {
        let rules = if ids.is_empty() {
            state.rules.all().await?
        } else {
            state.rules.find_by_ids(&ids).await?
        };
        import::export_rules(&rules)
    }
    .await;

    match result {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"replaceRule.json\""),
            ],
            body,
        )
            .into_response(),
        Err(e) => Json(ApiResponse::<()>::from_error(&e)).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub book_name: String,
    pub origin: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub title: String,
    pub content: String,
}

/// Run the rules of a book over sample text / 预览替换效果
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<PreviewResponse> {
    if req.book_name.trim().is_empty() && req.origin.trim().is_empty() {
        return Json(ApiResponse::from_error(&Error::InvalidInput("书名和来源不能同时为空".to_string())));
    }
    let result = ContentProcessor::load(&state.rules, &req.book_name, &req.origin)
        .await
        .map(|processor| processor.with_converter(state.config.chinese_converter()))
        .map(|processor| PreviewResponse {
            title: processor.process_title(&req.title),
            content: processor.process_content(&req.content, true),
        });
    respond(result)
}
