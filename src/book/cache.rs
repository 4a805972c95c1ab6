//! On-disk chapter cache / 章节正文缓存
//!
//! Layout: `<root>/<book folder>/<chapter file>`.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::{Book, BookChapter};

#[derive(Debug, Clone)]
pub struct BookCache {
    root: PathBuf,
}

impl BookCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn book_dir(&self, book: &Book) -> PathBuf {
        self.root.join(book.folder_name())
    }

    fn chapter_path(&self, book: &Book, chapter: &BookChapter) -> PathBuf {
        self.book_dir(book).join(chapter.file_name())
    }

    /// Write chapter text / 写入章节缓存
    pub async fn put_content(&self, book: &Book, chapter: &BookChapter, content: &str) -> Result<()> {
        let dir = self.book_dir(book);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(chapter.file_name()), content).await?;
        Ok(())
    }

    /// Cached text, `None` when the chapter was never downloaded / 读取章节缓存
    pub async fn get_content(&self, book: &Book, chapter: &BookChapter) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.chapter_path(book, chapter)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// File names present in the book folder / 已缓存文件名集合
    pub async fn chapter_files(&self, book: &Book) -> Result<HashSet<String>> {
        let mut files = HashSet::new();
        let mut entries = match tokio::fs::read_dir(self.book_dir(book)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                files.insert(name.to_string());
            }
        }
        Ok(files)
    }

    /// Remove the whole book folder / 删除书籍缓存
    pub async fn del(&self, book: &Book) -> Result<()> {
        match tokio::fs::remove_dir_all(self.book_dir(book)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book {
            book_url: "https://a.com/book/1".to_string(),
            name: "三体".to_string(),
            author: String::new(),
            origin: "https://a.com".to_string(),
            origin_name: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn chapter(index: i64) -> BookChapter {
        BookChapter {
            book_url: "https://a.com/book/1".to_string(),
            index,
            url: String::new(),
            title: format!("第{}章", index + 1),
            is_volume: false,
        }
    }

    #[tokio::test]
    async fn test_put_get_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BookCache::new(dir.path());
        let book = book();

        assert!(cache.chapter_files(&book).await.unwrap().is_empty());
        assert_eq!(cache.get_content(&book, &chapter(0)).await.unwrap(), None);

        cache.put_content(&book, &chapter(0), "正文").await.unwrap();
        assert_eq!(cache.get_content(&book, &chapter(0)).await.unwrap().as_deref(), Some("正文"));

        let files = cache.chapter_files(&book).await.unwrap();
        assert!(files.contains(&chapter(0).file_name()));
        assert!(!files.contains(&chapter(1).file_name()));

        cache.del(&book).await.unwrap();
        assert!(cache.chapter_files(&book).await.unwrap().is_empty());
    }
}
