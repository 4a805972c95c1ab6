//! Content search module / 正文搜索模块
//!
//! - matcher: match positions and context windows (pure, blocking-safe)
//! - engine: chapter scan with batched delivery and cancellation
//! - session: one running scan per consumer

pub mod engine;
pub mod matcher;
pub mod schema;
pub mod session;

pub use engine::{SearchContentEngine, SearchHandle, SearchSettings};
pub use schema::{SearchEvent, SearchRequest, SearchResult};
pub use session::SearchSession;
