//! Match positions and context windows / 匹配定位与上下文截取
use regex::Regex;

/// A match found in one chapter / 章节内匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMatch {
    /// Char offset of the match in the chapter
    pub position: usize,
    /// Context window around the match
    pub window: String,
    /// Char offset of the match in `window`
    pub index_in_window: usize,
}

/// Convert ascending byte offsets of `text` to char offsets
pub fn byte_to_char_offsets(text: &str, byte_offsets: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(byte_offsets.len());
    let mut chars = text.char_indices().map(|(b, _)| b).enumerate().peekable();
    let total_chars = text.chars().count();

    for &target in byte_offsets {
        loop {
            match chars.peek() {
                Some(&(_, byte)) if byte < target => {
                    chars.next();
                }
                Some(&(index, _)) => {
                    result.push(index);
                    break;
                }
                None => {
                    result.push(total_chars);
                    break;
                }
            }
        }
    }
    result
}

/// Chars of context kept on each side of a match / 匹配两侧保留的字符数
pub const CONTEXT_RADIUS: usize = 12;

#[derive(Debug)]
enum Pattern {
    Literal(String),
    Regex(Regex),
    /// Empty query or a regex that does not compile
    Nothing,
}

/// A search query compiled once per scan / 编译后的搜索词
///
/// Literal search is case-sensitive and resumes after the previous match.
/// Regex search returns every non-overlapping match the `regex` crate finds,
/// zero-width ones included. An invalid regex or an empty query finds nothing.
#[derive(Debug)]
pub struct QueryMatcher {
    pattern: Pattern,
    query_len: usize,
}

impl QueryMatcher {
    pub fn new(query: &str, regex: bool) -> Self {
        let pattern = if query.is_empty() {
            Pattern::Nothing
        } else if regex {
            match Regex::new(query) {
                Ok(re) => Pattern::Regex(re),
                Err(e) => {
                    tracing::debug!("Invalid search regex {}: {}", query, e);
                    Pattern::Nothing
                }
            }
        } else {
            Pattern::Literal(query.to_string())
        };
        Self {
            pattern,
            query_len: query.chars().count(),
        }
    }

    /// Char offsets of every match / 查找全部匹配位置
    pub fn find_positions(&self, content: &str) -> Vec<usize> {
        let bytes: Vec<usize> = match &self.pattern {
            Pattern::Literal(query) => content.match_indices(query.as_str()).map(|(i, _)| i).collect(),
            Pattern::Regex(re) => re.find_iter(content).map(|m| m.start()).collect(),
            Pattern::Nothing => return Vec::new(),
        };
        byte_to_char_offsets(content, &bytes)
    }

    /// Find matches with their context windows / 搜索单章
    ///
    /// The window length uses the query's char length, in regex mode too.
    pub fn search_chapter(&self, content: &str) -> Vec<ChapterMatch> {
        let positions = self.find_positions(content);
        if positions.is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = content.chars().collect();
        positions
            .into_iter()
            .map(|position| {
                let (window, index_in_window) =
                    context_window(&chars, position, self.query_len, CONTEXT_RADIUS);
                ChapterMatch {
                    position,
                    window,
                    index_in_window,
                }
            })
            .collect()
    }
}

/// Window `[pos - radius, pos + query_len + radius)` clamped to the content
pub fn context_window(chars: &[char], position: usize, query_len: usize, radius: usize) -> (String, usize) {
    let start = position.saturating_sub(radius);
    let end = (position + query_len + radius).min(chars.len());
    let start = start.min(end);
    (chars[start..end].iter().collect(), position - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_positions(content: &str, query: &str, regex: bool) -> Vec<usize> {
        QueryMatcher::new(query, regex).find_positions(content)
    }

    fn search_chapter(content: &str, query: &str) -> Vec<ChapterMatch> {
        QueryMatcher::new(query, false).search_chapter(content)
    }

    #[test]
    fn test_literal_positions_non_overlapping() {
        assert_eq!(find_positions("hello world hello", "hello", false), vec![0, 12]);
        assert_eq!(find_positions("aaaa", "aa", false), vec![0, 2]);
        assert_eq!(find_positions("Hello", "hello", false), Vec::<usize>::new());
        assert!(find_positions("abc", "", false).is_empty());
    }

    #[test]
    fn test_positions_count_chars() {
        assert_eq!(find_positions("他说：你好，你好", "你好", false), vec![3, 6]);
        assert_eq!(find_positions("第1章 第22章", r"第\d+章", true), vec![0, 4]);
    }

    #[test]
    fn test_bad_regex_finds_nothing() {
        assert!(find_positions("(abc)", "(abc", true).is_empty());
        assert!(find_positions("abc", "", true).is_empty());
    }

    #[test]
    fn test_zero_width_regex_matches_are_kept() {
        assert_eq!(find_positions("abc", "x*", true), vec![0, 1, 2, 3]);
        assert_eq!(find_positions("一二", "^", true), vec![0]);

        let matches = QueryMatcher::new("x*", true).search_chapter("abc");
        assert_eq!(matches.len(), 4);
        assert_eq!(matches[3].position, 3);
        assert_eq!(matches[3].window, "abc");
        assert_eq!(matches[3].index_in_window, 3);
    }

    #[test]
    fn test_compiled_once_reused_across_chapters() {
        let matcher = QueryMatcher::new(r"第\d+章", true);
        assert_eq!(matcher.find_positions("第1章"), vec![0]);
        assert_eq!(matcher.find_positions("前言 第2章 第3章"), vec![3, 7]);
        assert!(matcher.find_positions("没有").is_empty());
    }

    #[test]
    fn test_window_clamped() {
        let text = "0123456789abcdefghijklmnopqrstuvwxyz";
        let matches = search_chapter(text, "k");
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.position, 20);
        assert_eq!(m.window, "89abcdefghijklmnopqrstuvw");
        assert_eq!(m.index_in_window, 12);

        let head = &search_chapter(text, "01")[0];
        assert_eq!(head.window, "0123456789abcd");
        assert_eq!(head.index_in_window, 0);
    }

    #[test]
    fn test_window_never_exceeds_query_plus_radius() {
        let text = "一二三四五六七八九十".repeat(20);
        for m in search_chapter(&text, "五六") {
            assert!(m.window.chars().count() <= 2 + 2 * CONTEXT_RADIUS);
            assert!(m.window.chars().skip(m.index_in_window).collect::<String>().starts_with("五六"));
        }
    }

    #[test]
    fn test_byte_to_char_offsets_end() {
        assert_eq!(byte_to_char_offsets("中文", &[0, 3, 6]), vec![0, 1, 2]);
    }
}
