//! Content search types / 正文搜索数据结构

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::matcher::byte_to_char_offsets;

/// One match inside a chapter / 单条搜索结果
///
/// All offsets count Unicode scalar values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Ordinal of this match within its chapter / 章节内第几个匹配
    pub result_count_within_chapter: usize,
    /// Context window around the match / 上下文片段
    pub result_text: String,
    pub chapter_title: String,
    pub query: String,
    pub chapter_index: i64,
    pub query_index_in_result: usize,
    pub query_index_in_chapter: usize,
    pub is_regex: bool,
    pub progress_percent: f32,
}

impl SearchResult {
    /// Char ranges of `result_text` to highlight / 高亮区间
    ///
    /// Literal searches highlight every case-insensitive occurrence of the
    /// query; regex searches highlight every regex match, zero-width ones as
    /// empty ranges.
    pub fn highlight_ranges(&self) -> Vec<Range<usize>> {
        if self.query.trim().is_empty() {
            return Vec::new();
        }
        if self.is_regex {
            let Ok(regex) = Regex::new(&self.query) else {
                return Vec::new();
            };
            let spans: Vec<(usize, usize)> = regex
                .find_iter(&self.result_text)
                .map(|m| (m.start(), m.end()))
                .collect();
            let bytes: Vec<usize> = spans.iter().flat_map(|(s, e)| [*s, *e]).collect();
            let chars = byte_to_char_offsets(&self.result_text, &bytes);
            return chars.chunks(2).map(|pair| pair[0]..pair[1]).collect();
        }

        let text: Vec<char> = self.result_text.chars().collect();
        let query: Vec<char> = self.query.chars().collect();
        let mut ranges = Vec::new();
        let mut start = 0;
        while start + query.len() <= text.len() {
            let window = &text[start..start + query.len()];
            let hit = window
                .iter()
                .zip(query.iter())
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()));
            if hit {
                ranges.push(start..start + query.len());
                start += query.len();
            } else {
                start += 1;
            }
        }
        ranges
    }
}

/// Parameters of one scan / 搜索请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub book_url: String,
    pub query: String,
    /// Apply replace rules before matching / 搜索替换后的正文
    pub replace_enabled: bool,
    /// Interpret the query as a regex / 正则搜索
    pub regex: bool,
}

/// Message pushed to the consumer of a scan / 搜索事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SearchEvent {
    /// Every result found so far / 累积结果
    #[serde(rename_all = "camelCase")]
    Batch {
        search_id: u64,
        results: Vec<SearchResult>,
        is_final: bool,
    },
    /// The scan could not run / 搜索失败
    #[serde(rename_all = "camelCase")]
    Failed { search_id: u64, error: String },
}

impl SearchEvent {
    pub fn search_id(&self) -> u64 {
        match self {
            SearchEvent::Batch { search_id, .. } | SearchEvent::Failed { search_id, .. } => *search_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(text: &str, query: &str, is_regex: bool) -> SearchResult {
        SearchResult {
            result_count_within_chapter: 0,
            result_text: text.to_string(),
            chapter_title: String::new(),
            query: query.to_string(),
            chapter_index: 0,
            query_index_in_result: 0,
            query_index_in_chapter: 0,
            is_regex,
            progress_percent: 0.0,
        }
    }

    #[test]
    fn test_literal_highlight_ignores_case() {
        let r = result("Hello hello HELLO", "hello", false);
        assert_eq!(r.highlight_ranges(), vec![0..5, 6..11, 12..17]);
    }

    #[test]
    fn test_regex_highlight_uses_char_offsets() {
        let r = result("第12章和第3章", r"\d+章", true);
        assert_eq!(r.highlight_ranges(), vec![1..4, 6..8]);
        assert!(result("abc", "(", true).highlight_ranges().is_empty());
        assert_eq!(result("ab", "x*", true).highlight_ranges(), vec![0..0, 1..1, 2..2]);
    }

    #[test]
    fn test_event_json_shape() {
        let event = SearchEvent::Batch { search_id: 3, results: vec![], is_final: true };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch");
        assert_eq!(json["searchId"], 3);
        assert_eq!(json["isFinal"], true);
    }
}
