//! Books, chapter lists and cached chapter text / 书籍、目录与正文缓存
pub mod cache;
pub mod repository;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::models::{Book, BookChapter};

pub use cache::BookCache;
pub use repository::BookRepository;

/// Source of chapters and their text for content search / 章节数据来源
#[async_trait]
pub trait ChapterProvider: Send + Sync {
    /// Chapters of a book, ascending index / 章节目录
    async fn chapter_list(&self, book: &Book) -> Result<Vec<BookChapter>>;

    /// File names of chapters already cached / 已缓存章节文件名
    async fn cached_chapter_files(&self, book: &Book) -> Result<HashSet<String>>;

    /// Chapter text, `None` when unavailable / 章节正文
    async fn content(&self, book: &Book, chapter: &BookChapter) -> Result<Option<String>>;
}

/// Book store plus disk cache / 书架
#[derive(Clone)]
pub struct Library {
    pub books: BookRepository,
    pub cache: BookCache,
}

impl Library {
    pub fn new(books: BookRepository, cache: BookCache) -> Self {
        Self { books, cache }
    }

    /// Drop a book with its chapter list and cached text / 删除书籍
    pub async fn remove_book(&self, book_url: &str) -> Result<bool> {
        if let Some(book) = self.books.get_book(book_url).await? {
            self.cache.del(&book).await?;
        }
        self.books.delete_book(book_url).await
    }
}

#[async_trait]
impl ChapterProvider for Library {
    async fn chapter_list(&self, book: &Book) -> Result<Vec<BookChapter>> {
        self.books.chapter_list(&book.book_url).await
    }

    async fn cached_chapter_files(&self, book: &Book) -> Result<HashSet<String>> {
        self.cache.chapter_files(book).await
    }

    async fn content(&self, book: &Book, chapter: &BookChapter) -> Result<Option<String>> {
        self.cache.get_content(book, chapter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn test_library_provides_cached_chapters() {
        let dir = tempfile::tempdir().unwrap();
        let library = Library::new(BookRepository::new(memory_pool().await), BookCache::new(dir.path()));

        let book = library
            .books
            .upsert_book(&Book {
                book_url: "b1".to_string(),
                name: "三体".to_string(),
                author: String::new(),
                origin: "https://a.com".to_string(),
                origin_name: String::new(),
                created_at: String::new(),
                updated_at: String::new(),
            })
            .await
            .unwrap();
        let chapter = BookChapter {
            book_url: "b1".to_string(),
            index: 0,
            url: String::new(),
            title: "第一章".to_string(),
            is_volume: false,
        };
        library.books.replace_chapters("b1", &[chapter.clone()]).await.unwrap();
        library.cache.put_content(&book, &chapter, "内容").await.unwrap();

        assert_eq!(library.chapter_list(&book).await.unwrap().len(), 1);
        assert!(library.cached_chapter_files(&book).await.unwrap().contains(&chapter.file_name()));
        assert_eq!(library.content(&book, &chapter).await.unwrap().as_deref(), Some("内容"));

        assert!(library.remove_book("b1").await.unwrap());
        assert!(library.cached_chapter_files(&book).await.unwrap().is_empty());
    }
}
