use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::Result;

/// Open the main database in WAL mode / 打开主数据库（WAL模式）
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(database_url)
        .await?;

    // 启用WAL模式，提高并发性能
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    // 设置busy_timeout，避免锁超时
    sqlx::query("PRAGMA busy_timeout=5000").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;

    tracing::info!("Database connected: {} (WAL mode)", database_url);
    Ok(pool)
}

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS replace_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL DEFAULT '',
            "group" TEXT,
            pattern TEXT NOT NULL DEFAULT '',
            replacement TEXT NOT NULL DEFAULT '',
            scope TEXT,
            scope_title INTEGER NOT NULL DEFAULT 0,
            scope_content INTEGER NOT NULL DEFAULT 1,
            exclude_scope TEXT,
            is_enabled INTEGER NOT NULL DEFAULT 1,
            is_regex INTEGER NOT NULL DEFAULT 1,
            timeout_millisecond INTEGER NOT NULL DEFAULT 3000,
            sort_order INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_replace_rules_order ON replace_rules(sort_order)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            book_url TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            author TEXT NOT NULL DEFAULT '',
            origin TEXT NOT NULL,
            origin_name TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_chapters (
            book_url TEXT NOT NULL,
            chapter_index INTEGER NOT NULL,
            url TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL,
            is_volume INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (book_url, chapter_index),
            FOREIGN KEY (book_url) REFERENCES books(book_url) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed");
    Ok(())
}

/// In-memory pool for tests / 测试用内存数据库
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
