//! Content search engine / 正文搜索引擎
//!
//! A scan walks the chapters of one book in index order on a spawned task and
//! pushes the accumulated result list through a bounded channel. Matching runs
//! on the blocking pool; cancellation is checked before every chapter.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::matcher::QueryMatcher;
use super::schema::{SearchEvent, SearchRequest, SearchResult};
use crate::book::ChapterProvider;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::models::Book;
use crate::replace::{ContentProcessor, ReplaceRuleRepository};
use crate::text::ChineseConverter;

const CHANNEL_CAPACITY: usize = 16;

/// Tunables of a scan / 搜索参数
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub emit_interval: Duration,
    pub converter: ChineseConverter,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            emit_interval: Duration::from_millis(350),
            converter: ChineseConverter::None,
        }
    }
}

impl SearchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            emit_interval: config.emit_interval(),
            converter: config.chinese_converter(),
        }
    }
}

/// Consumer side of a running scan / 搜索句柄
pub struct SearchHandle {
    pub id: u64,
    token: CancellationToken,
    rx: mpsc::Receiver<SearchEvent>,
}

impl SearchHandle {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Next event; `None` once the scan has finished or was cancelled
    pub async fn recv(&mut self) -> Option<SearchEvent> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> ReceiverStream<SearchEvent> {
        ReceiverStream::new(self.rx)
    }

    /// Wait for the final batch / 等待最终结果
    ///
    /// A cancelled scan yields the last batch it delivered.
    pub async fn collect_final(mut self) -> Result<Vec<SearchResult>> {
        let mut last = Vec::new();
        while let Some(event) = self.rx.recv().await {
            match event {
                SearchEvent::Batch { results, is_final, .. } => {
                    if is_final {
                        return Ok(results);
                    }
                    last = results;
                }
                SearchEvent::Failed { error, .. } => return Err(Error::Search(error)),
            }
        }
        Ok(last)
    }
}

pub struct SearchContentEngine {
    provider: Arc<dyn ChapterProvider>,
    rules: ReplaceRuleRepository,
    settings: SearchSettings,
    next_id: AtomicU64,
}

impl SearchContentEngine {
    pub fn new(provider: Arc<dyn ChapterProvider>, rules: ReplaceRuleRepository, settings: SearchSettings) -> Self {
        Self {
            provider,
            rules,
            settings,
            next_id: AtomicU64::new(1),
        }
    }

    /// Start a scan / 开始搜索
    pub fn search(&self, book: Book, request: SearchRequest) -> SearchHandle {
        self.search_with_token(book, request, CancellationToken::new())
    }

    pub fn search_with_token(&self, book: Book, request: SearchRequest, token: CancellationToken) -> SearchHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let scan = Scan {
            id,
            provider: self.provider.clone(),
            rules: self.rules.clone(),
            settings: self.settings.clone(),
            token: token.clone(),
            tx,
        };

        tracing::debug!("Search {} started: {:?} in {}", id, request.query, book.name);
        tokio::spawn(async move {
            let started = Instant::now();
            let tx = scan.tx.clone();
            match scan.run(book, request).await {
                Ok(count) => tracing::debug!("Search {} done: {} results in {:?}", id, count, started.elapsed()),
                Err(e) => {
                    tracing::warn!("Search {} failed: {}", id, e);
                    let _ = tx.send(SearchEvent::Failed { search_id: id, error: e.to_string() }).await;
                }
            }
        });

        SearchHandle { id, token, rx }
    }
}

struct Scan {
    id: u64,
    provider: Arc<dyn ChapterProvider>,
    rules: ReplaceRuleRepository,
    settings: SearchSettings,
    token: CancellationToken,
    tx: mpsc::Sender<SearchEvent>,
}

impl Scan {
    async fn emit(&self, results: &[SearchResult], is_final: bool) -> bool {
        let event = SearchEvent::Batch {
            search_id: self.id,
            results: results.to_vec(),
            is_final,
        };
        self.tx.send(event).await.is_ok()
    }

    /// Returns the number of results, or early with what was found when stopped
    async fn run(&self, book: Book, request: SearchRequest) -> Result<usize> {
        let mut all_results: Vec<SearchResult> = Vec::new();
        if request.query.is_empty() {
            self.emit(&all_results, true).await;
            return Ok(0);
        }

        let chapters = self.provider.chapter_list(&book).await?;
        let total = chapters.len();
        let processor = if request.replace_enabled {
            ContentProcessor::load(&self.rules, &book.name, &book.origin).await?
        } else {
            ContentProcessor::empty()
        };
        let processor = Arc::new(processor);
        let matcher = Arc::new(QueryMatcher::new(&request.query, request.regex));
        let cached: Option<HashSet<String>> = if book.is_local() {
            None
        } else {
            Some(self.provider.cached_chapter_files(&book).await?)
        };

        let mut last_emit = Instant::now();
        for chapter in chapters {
            if self.token.is_cancelled() || self.tx.is_closed() {
                tracing::debug!("Search {} stopped at chapter {}", self.id, chapter.index);
                return Ok(all_results.len());
            }
            if let Some(cached) = &cached {
                if !cached.contains(&chapter.file_name()) {
                    continue;
                }
            }

            let content = match self.provider.content(&book, &chapter).await {
                Ok(Some(content)) => content,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Skip chapter {} of {}: {}", chapter.index, book.name, e);
                    continue;
                }
            };

            let replace_enabled = request.replace_enabled;
            let (processor, matcher) = (processor.clone(), matcher.clone());
            let matches = tokio::task::spawn_blocking(move || {
                let text = processor.process_content(&content, replace_enabled);
                matcher.search_chapter(&text)
            })
            .await;
            let matches = match matches {
                Ok(matches) => matches,
                Err(e) => {
                    tracing::warn!("Matching chapter {} of {} panicked: {}", chapter.index, book.name, e);
                    continue;
                }
            };
            if matches.is_empty() {
                continue;
            }

            let title = self.settings.converter.convert(&chapter.title);
            let progress_percent = if total > 0 {
                (chapter.index + 1) as f32 / total as f32 * 100.0
            } else {
                0.0
            };
            all_results.extend(matches.into_iter().enumerate().map(|(ordinal, m)| SearchResult {
                result_count_within_chapter: ordinal,
                result_text: m.window,
                chapter_title: title.clone(),
                query: request.query.clone(),
                chapter_index: chapter.index,
                query_index_in_result: m.index_in_window,
                query_index_in_chapter: m.position,
                is_regex: request.regex,
                progress_percent,
            }));

            if last_emit.elapsed() > self.settings.emit_interval {
                if !self.emit(&all_results, false).await {
                    return Ok(all_results.len());
                }
                last_emit = Instant::now();
            }
        }

        if !self.token.is_cancelled() {
            self.emit(&all_results, true).await;
        }
        Ok(all_results.len())
    }
}
