use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use state::AppState;
use yuedu_backend::{config, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yuedu_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("yuedu-backend {} (built {})", env!("CARGO_PKG_VERSION"), env!("BUILD_TIME"));

    // Load configuration / 加载配置
    let app_config = config::load_config(&config::get_config_path()).map_err(anyhow::Error::msg)?;
    tracing::info!("Server will listen on {}", app_config.get_bind_address());

    // Create data directories / 创建数据目录
    for dir in [app_config.get_data_dir(), app_config.get_book_cache_dir(), app_config.get_import_dir()] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            tracing::info!("Created directory: {:?}", dir);
        }
    }

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());
    let pool = db::connect(&database_url).await?;
    db::run_migrations(&pool).await?;

    let state = Arc::new(AppState::new(pool, app_config.clone()));
    let rule_count = state.rules.all().await?.len();
    tracing::info!("Loaded {} replace rules", rule_count);

    let app = Router::new()
        .route("/api/health", get(api::health))
        // 替换规则
        .route("/api/replace_rules", get(api::replace_rules::list_rules))
        .route("/api/replace_rules", post(api::replace_rules::save_rule))
        .route("/api/replace_rules/groups", get(api::replace_rules::list_groups))
        .route("/api/replace_rules/delete", post(api::replace_rules::delete_rules))
        .route("/api/replace_rules/enable", post(api::replace_rules::enable_rules))
        .route("/api/replace_rules/top", post(api::replace_rules::top_rules))
        .route("/api/replace_rules/bottom", post(api::replace_rules::bottom_rules))
        .route("/api/replace_rules/order", post(api::replace_rules::move_order))
        .route("/api/replace_rules/up_order", post(api::replace_rules::up_order))
        .route("/api/replace_rules/group/add", post(api::replace_rules::add_group))
        .route("/api/replace_rules/group/rename", post(api::replace_rules::rename_group))
        .route("/api/replace_rules/group/delete", post(api::replace_rules::delete_group))
        .route("/api/replace_rules/group/assign", post(api::replace_rules::assign_group))
        .route("/api/replace_rules/import", post(api::replace_rules::import_plan))
        .route("/api/replace_rules/import/save", post(api::replace_rules::import_save))
        .route("/api/replace_rules/export", get(api::replace_rules::export_rules))
        .route("/api/replace_rules/preview", post(api::replace_rules::preview))
        // 书籍与缓存
        .route("/api/books", get(api::books::list_books))
        .route("/api/books", post(api::books::upsert_book))
        .route("/api/books/delete", post(api::books::delete_book))
        .route("/api/books/chapters", get(api::books::list_chapters))
        .route("/api/books/chapters", post(api::books::replace_chapters))
        .route("/api/books/content", post(api::books::put_content))
        // 正文搜索
        .route("/api/search", post(api::search::search))
        .route("/api/search/ws", get(api::search::search_ws))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
