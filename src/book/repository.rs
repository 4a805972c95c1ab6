//! Book and chapter-list store / 书籍与目录存储
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{Book, BookChapter};

#[derive(Clone)]
pub struct BookRepository {
    db: SqlitePool,
}

impl BookRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert or update a book, keeping its creation time / 保存书籍
    pub async fn upsert_book(&self, book: &Book) -> Result<Book> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"INSERT INTO books (book_url, name, author, origin, origin_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(book_url) DO UPDATE SET
                name = excluded.name,
                author = excluded.author,
                origin = excluded.origin,
                origin_name = excluded.origin_name,
                updated_at = excluded.updated_at"#,
        )
        .bind(&book.book_url)
        .bind(&book.name)
        .bind(&book.author)
        .bind(&book.origin)
        .bind(&book.origin_name)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        tracing::debug!("Saved book {} ({})", book.name, book.book_url);
        self.get_book(&book.book_url)
            .await?
            .ok_or_else(|| crate::Error::NotFound(book.book_url.clone()))
    }

    pub async fn get_book(&self, book_url: &str) -> Result<Option<Book>> {
        Ok(sqlx::query_as::<_, Book>("SELECT * FROM books WHERE book_url = ?")
            .bind(book_url)
            .fetch_optional(&self.db)
            .await?)
    }

    pub async fn list_books(&self) -> Result<Vec<Book>> {
        Ok(sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY updated_at DESC")
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn delete_book(&self, book_url: &str) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM book_chapters WHERE book_url = ?")
            .bind(book_url)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM books WHERE book_url = ?")
            .bind(book_url)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }

    /// Chapters in ascending index / 章节目录
    pub async fn chapter_list(&self, book_url: &str) -> Result<Vec<BookChapter>> {
        Ok(sqlx::query_as::<_, BookChapter>(
            "SELECT book_url, chapter_index, url, title, is_volume FROM book_chapters
             WHERE book_url = ? ORDER BY chapter_index ASC",
        )
        .bind(book_url)
        .fetch_all(&self.db)
        .await?)
    }

    pub async fn chapter_count(&self, book_url: &str) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM book_chapters WHERE book_url = ?")
            .bind(book_url)
            .fetch_one(&self.db)
            .await?)
    }

    /// Replace the whole chapter list of a book / 更新目录
    pub async fn replace_chapters(&self, book_url: &str, chapters: &[BookChapter]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM book_chapters WHERE book_url = ?")
            .bind(book_url)
            .execute(&mut *tx)
            .await?;
        for chapter in chapters {
            sqlx::query(
                "INSERT INTO book_chapters (book_url, chapter_index, url, title, is_volume)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(book_url)
            .bind(chapter.index)
            .bind(&chapter.url)
            .bind(&chapter.title)
            .bind(chapter.is_volume)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        tracing::debug!("Saved {} chapters for {}", chapters.len(), book_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn book(url: &str, name: &str) -> Book {
        Book {
            book_url: url.to_string(),
            name: name.to_string(),
            author: "刘慈欣".to_string(),
            origin: "loc_book".to_string(),
            origin_name: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn chapter(index: i64, title: &str) -> BookChapter {
        BookChapter {
            book_url: String::new(),
            index,
            url: String::new(),
            title: title.to_string(),
            is_volume: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_created_at() {
        let repo = BookRepository::new(memory_pool().await);
        let first = repo.upsert_book(&book("b1", "三体")).await.unwrap();
        let second = repo.upsert_book(&book("b1", "三体 II")).await.unwrap();
        assert_eq!(second.name, "三体 II");
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(repo.list_books().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chapters_sorted_and_replaced() {
        let repo = BookRepository::new(memory_pool().await);
        repo.upsert_book(&book("b1", "三体")).await.unwrap();
        repo.replace_chapters("b1", &[chapter(1, "二"), chapter(0, "一")]).await.unwrap();

        let titles: Vec<String> = repo.chapter_list("b1").await.unwrap().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["一", "二"]);

        repo.replace_chapters("b1", &[chapter(0, "新")]).await.unwrap();
        assert_eq!(repo.chapter_count("b1").await.unwrap(), 1);
        assert_eq!(repo.chapter_list("b1").await.unwrap()[0].book_url, "b1");

        assert!(repo.delete_book("b1").await.unwrap());
        assert!(repo.get_book("b1").await.unwrap().is_none());
        assert_eq!(repo.chapter_count("b1").await.unwrap(), 0);
    }
}
