use crate::util::unicode::{self, display_width};
use unicode_segmentation::UnicodeSegmentation;

/// Greedy word-wrap of `text` to `width` display cells.
///
/// Each logical line (split on `\n`) wraps independently; blank logical lines
/// survive as blank visual lines. Words are whitespace-delimited and rejoined
/// with single spaces. A word wider than `width` is hard-split into
/// `width`-cell chunks, and the last chunk stays open for following words.
/// A `width` of 0 disables wrapping.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for logical in text.split('\n') {
        wrap_logical_line(logical.trim_end_matches('\r'), width, &mut lines);
    }
    lines
}

fn wrap_logical_line(line: &str, width: usize, out: &mut Vec<String>) {
    let start = out.len();
    if width == 0 {
        out.push(line.to_string());
        return;
    }

    let mut current = String::new();
    let mut current_w = 0;

    for word in line.split_whitespace() {
        let word_w = display_width(word);
        let candidate_w = if current.is_empty() {
            word_w
        } else {
            current_w + 1 + word_w
        };

        if candidate_w <= width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_w = candidate_w;
            continue;
        }

        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }

        if word_w <= width {
            current.push_str(word);
            current_w = word_w;
        } else {
            let mut chunks = hard_split(word, width);
            current = chunks.pop().unwrap_or_default();
            current_w = display_width(&current);
            out.extend(chunks);
        }
    }

    if !current.is_empty() || out.len() == start {
        out.push(current);
    }
}

/// Split a single token into chunks of at most `width` cells, never breaking a
/// grapheme. A grapheme wider than `width` gets a chunk of its own.
fn hard_split(word: &str, width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut chunk_w = 0;
    for g in word.graphemes(true) {
        let gw = unicode::grapheme_display_width(g);
        if chunk_w + gw > width && !chunk.is_empty() {
            chunks.push(std::mem::take(&mut chunk));
            chunk_w = 0;
        }
        chunk.push_str(g);
        chunk_w += gw;
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

/// Exactly `height` lines: `lines[offset..offset + height]`, padded with blanks.
pub fn window(lines: &[String], offset: usize, height: usize) -> Vec<String> {
    let mut out: Vec<String> = lines.iter().skip(offset).take(height).cloned().collect();
    out.resize(height, String::new());
    out
}

/// Largest useful scroll offset for `line_count` wrapped lines in a window of `height`.
pub fn max_scroll(line_count: usize, height: usize) -> usize {
    line_count.saturating_sub(height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_wrap_needed() {
        assert_eq!(wrap("hello world", 80), vec!["hello world"]);
    }

    #[test]
    fn wrap_at_space() {
        assert_eq!(wrap("hello world", 7), vec!["hello", "world"]);
    }

    #[test]
    fn greedy_fill() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn exact_width_fits() {
        assert_eq!(wrap("abcde fghij", 11), vec!["abcde fghij"]);
        assert_eq!(wrap("abcde fghij", 10), vec!["abcde", "fghij"]);
    }

    #[test]
    fn long_token_hard_split() {
        let lines = wrap(
            "a very long single token of fifty characters xxxxxxxxxxxxxxxxxxxxxxxxx",
            10,
        );
        assert_eq!(
            lines,
            vec![
                "a very",
                "long",
                "single",
                "token of",
                "fifty",
                "characters",
                "xxxxxxxxxx",
                "xxxxxxxxxx",
                "xxxxx",
            ]
        );
        for line in &lines {
            assert!(display_width(line) <= 10);
        }
    }

    #[test]
    fn remainder_chunk_accepts_next_word() {
        assert_eq!(wrap("abcdefgh ij", 5), vec!["abcde", "fgh", "ij"]);
        assert_eq!(wrap("abcdefg hi", 5), vec!["abcde", "fg hi"]);
    }

    #[test]
    fn blank_lines_preserved() {
        assert_eq!(wrap("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn runs_of_whitespace_collapse() {
        assert_eq!(wrap("  a   b  ", 10), vec!["a b"]);
    }

    #[test]
    fn crlf_line_endings() {
        assert_eq!(wrap("a\r\nb", 10), vec!["a", "b"]);
    }

    #[test]
    fn zero_width_disables_wrapping() {
        assert_eq!(wrap("hello world", 0), vec!["hello world"]);
    }

    #[test]
    fn wrap_cjk() {
        // 8 cells, hard split at 5 keeps whole characters
        assert_eq!(wrap("你好世界", 5), vec!["你好", "世界"]);
    }

    #[test]
    fn wide_grapheme_wider_than_width() {
        assert_eq!(wrap("你好", 1), vec!["你", "好"]);
    }

    #[test]
    fn window_slices_and_pads() {
        let lines: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(window(&lines, 0, 2), vec!["a", "b"]);
        assert_eq!(window(&lines, 1, 2), vec!["b", "c"]);
        assert_eq!(window(&lines, 2, 3), vec!["c", "", ""]);
        assert_eq!(window(&lines, 5, 2), vec!["", ""]);
        assert_eq!(window(&lines, 0, 0), Vec::<String>::new());
    }

    #[test]
    fn scroll_bound() {
        assert_eq!(max_scroll(10, 4), 6);
        assert_eq!(max_scroll(3, 4), 0);
    }
}
