use sqlx::SqlitePool;
use std::sync::Arc;

use yuedu_backend::book::{BookCache, BookRepository, Library};
use yuedu_backend::config::AppConfig;
use yuedu_backend::replace::ReplaceRuleRepository;
use yuedu_backend::search::{SearchContentEngine, SearchSettings};

/// Shared services of the HTTP layer / 共享服务
pub struct AppState {
    pub config: AppConfig,
    pub rules: ReplaceRuleRepository,
    pub library: Library,
    pub search: Arc<SearchContentEngine>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let rules = ReplaceRuleRepository::new(db.clone());
        let library = Library::new(BookRepository::new(db.clone()), BookCache::new(config.get_book_cache_dir()));
        let search = Arc::new(SearchContentEngine::new(
            Arc::new(library.clone()),
            rules.clone(),
            SearchSettings::from_config(&config),
        ));
        Self {
            config,
            rules,
            library,
            search,
        }
    }
}
