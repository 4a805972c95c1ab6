//! Single-flight search session / 单任务搜索会话
//!
//! One session per consumer; starting a scan cancels the one before it.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::engine::{SearchContentEngine, SearchHandle};
use super::schema::SearchRequest;
use crate::models::Book;

pub struct SearchSession {
    engine: Arc<SearchContentEngine>,
    current: Mutex<Option<(u64, CancellationToken)>>,
}

impl SearchSession {
    pub fn new(engine: Arc<SearchContentEngine>) -> Self {
        Self {
            engine,
            current: Mutex::new(None),
        }
    }

    /// Cancel the running scan and start a new one / 开始新搜索
    ///
    /// A blank query only clears the session.
    pub fn start(&self, book: Book, request: SearchRequest) -> Option<SearchHandle> {
        let mut current = self.current.lock();
        if let Some((id, token)) = current.take() {
            tracing::debug!("Search {} replaced", id);
            token.cancel();
        }
        if request.query.trim().is_empty() {
            return None;
        }
        let handle = self.engine.search(book, request);
        *current = Some((handle.id, handle.token()));
        Some(handle)
    }

    /// Cancel the running scan, if any / 停止搜索
    pub fn stop(&self) {
        if let Some((id, token)) = self.current.lock().take() {
            tracing::debug!("Search {} stopped", id);
            token.cancel();
        }
    }

    pub fn current_id(&self) -> Option<u64> {
        self.current.lock().as_ref().map(|(id, _)| *id)
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookCache, BookRepository, Library};
    use crate::db::memory_pool;
    use crate::replace::ReplaceRuleRepository;
    use crate::search::engine::SearchSettings;

    async fn session() -> SearchSession {
        let pool = memory_pool().await;
        let library = Library::new(BookRepository::new(pool.clone()), BookCache::new("unused-cache"));
        let engine = SearchContentEngine::new(
            Arc::new(library),
            ReplaceRuleRepository::new(pool),
            SearchSettings::default(),
        );
        SearchSession::new(Arc::new(engine))
    }

    fn book() -> Book {
        Book {
            book_url: "b".to_string(),
            name: "书".to_string(),
            author: String::new(),
            origin: "loc_book".to_string(),
            origin_name: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn request(query: &str) -> SearchRequest {
        SearchRequest { query: query.to_string(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_new_search_cancels_previous() {
        let session = session().await;
        let first = session.start(book(), request("a")).unwrap();
        let second = session.start(book(), request("b")).unwrap();

        assert!(first.token().is_cancelled());
        assert!(!second.token().is_cancelled());
        assert_eq!(session.current_id(), Some(second.id));

        session.stop();
        assert!(second.token().is_cancelled());
        assert_eq!(session.current_id(), None);
    }

    #[tokio::test]
    async fn test_blank_query_clears() {
        let session = session().await;
        let first = session.start(book(), request("a")).unwrap();
        assert!(session.start(book(), request("  ")).is_none());
        assert!(first.token().is_cancelled());
        assert_eq!(session.current_id(), None);
    }
}
