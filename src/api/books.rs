use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use yuedu_backend::models::{Book, BookChapter};
use yuedu_backend::{Error, Result};

use super::{respond, ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn list_books(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Book>> {
    respond(state.library.books.list_books().await)
}

pub async fn upsert_book(
    State(state): State<Arc<AppState>>,
    Json(book): Json<Book>,
) -> ApiResult<Book> {
    if book.book_url.trim().is_empty() || book.name.trim().is_empty() {
        return Json(ApiResponse::error("book_url 和 name 不能为空"));
    }
    respond(state.library.books.upsert_book(&book).await)
}

#[derive(Debug, Deserialize)]
pub struct BookUrlRequest {
    pub book_url: String,
}

pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookUrlRequest>,
) -> ApiResult<bool> {
    respond(state.library.remove_book(&req.book_url).await)
}

async fn require_book(state: &AppState, book_url: &str) -> Result<Book> {
    state
        .library
        .books
        .get_book(book_url)
        .await?
        .ok_or_else(|| Error::NotFound(format!("book {}", book_url)))
}

pub async fn list_chapters(
    State(state): State<Arc<AppState>>,
    Query(req): Query<BookUrlRequest>,
) -> ApiResult<Vec<BookChapter>> {
    respond(state.library.books.chapter_list(&req.book_url).await)
}

#[derive(Debug, Deserialize)]
pub struct ChaptersRequest {
    pub book_url: String,
    pub chapters: Vec<BookChapter>,
}

/// Replace the chapter list of a book / 更新目录
pub async fn replace_chapters(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChaptersRequest>,
) -> ApiResult<usize> {
    let result: Result<usize> = async {
        require_book(&state, &req.book_url).await?;
        state.library.books.replace_chapters(&req.book_url, &req.chapters).await?;
        let stored = state.library.books.chapter_count(&req.book_url).await?;
        Ok(stored as usize)
    }
    .await;
    respond(result)
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub book_url: String,
    pub index: i64,
    pub content: String,
}

/// Store downloaded chapter text in the cache / 写入章节缓存
pub async fn put_content(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContentRequest>,
) -> ApiResult<()> {
    let result = async {
        let book = require_book(&state, &req.book_url).await?;
        let chapter = state
            .library
            .books
            .chapter_list(&req.book_url)
            .await?
            .into_iter()
            .find(|c| c.index == req.index)
            .ok_or_else(|| Error::NotFound(format!("chapter {} of {}", req.index, req.book_url)))?;
        state.library.cache.put_content(&book, &chapter, &req.content).await
    }
    .await;
    respond(result)
}
