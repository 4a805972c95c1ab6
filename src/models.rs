use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Origin marker of books imported from local files / 本地书籍来源
pub const LOCAL_BOOK_ORIGIN: &str = "loc_book";
/// Origin prefix of books synced from WebDAV / WebDAV书籍来源前缀
pub const WEBDAV_ORIGIN_PREFIX: &str = "webDav::";

static FILE_NAME_FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|.]"#).expect("static regex"));

/// 16-char md5 (middle of the 32-char digest) / 16位md5
pub fn md5_16(text: &str) -> String {
    let digest = format!("{:x}", md5::compute(text.as_bytes()));
    digest[8..24].to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub book_url: String,
    pub name: String,
    #[serde(default)]
    pub author: String,
    /// Source url, or `loc_book` for local files / 书源地址
    pub origin: String,
    #[serde(default)]
    pub origin_name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Book {
    /// Full content lives on the device / 本地书籍
    pub fn is_local(&self) -> bool {
        self.origin == LOCAL_BOOK_ORIGIN || self.origin.starts_with(WEBDAV_ORIGIN_PREFIX)
    }

    /// Chapter cache folder of this book / 缓存目录名
    pub fn folder_name(&self) -> String {
        let cleaned = FILE_NAME_FORBIDDEN.replace_all(&self.name, "");
        let prefix: String = cleaned.chars().take(9).collect();
        format!("{}{}", prefix, md5_16(&self.book_url))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookChapter {
    pub book_url: String,
    #[sqlx(rename = "chapter_index")]
    #[serde(rename = "index")]
    pub index: i64,
    #[serde(default)]
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub is_volume: bool,
}

impl BookChapter {
    /// Cache file name of this chapter / 章节缓存文件名
    pub fn file_name(&self) -> String {
        format!("{:05}-{}.nb", self.index, md5_16(&self.title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(name: &str, url: &str, origin: &str) -> Book {
        Book {
            book_url: url.to_string(),
            name: name.to_string(),
            author: String::new(),
            origin: origin.to_string(),
            origin_name: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_md5_16() {
        // md5("abc") = 900150983cd24fb0d6963f7d28e17f72
        assert_eq!(md5_16("abc"), "3cd24fb0d6963f7d");
    }

    #[test]
    fn test_is_local() {
        assert!(book("a", "/sdcard/a.txt", LOCAL_BOOK_ORIGIN).is_local());
        assert!(book("a", "dav/a.epub", "webDav::https://dav.example.com").is_local());
        assert!(!book("a", "https://example.com/book/1", "https://example.com").is_local());
    }

    #[test]
    fn test_folder_name_strips_forbidden_chars() {
        let b = book("斗.破:苍穹*第一部分续集", "https://example.com/1", "https://example.com");
        let folder = b.folder_name();
        assert!(folder.starts_with("斗破苍穹第一部分续"));
        assert_eq!(folder.chars().count(), 9 + 16);
    }

    #[test]
    fn test_chapter_file_name() {
        let chapter = BookChapter {
            book_url: "u".to_string(),
            index: 7,
            url: String::new(),
            title: "abc".to_string(),
            is_volume: false,
        };
        assert_eq!(chapter.file_name(), "00007-3cd24fb0d6963f7d.nb");
    }
}
