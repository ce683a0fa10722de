use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_EXCERPT_LENGTH: usize = 200;

const ELLIPSIS: &str = "...";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Summarize `content` in at most `max_length` characters.
///
/// HTML tags are dropped, then whole sentences (split on `.`) are taken while
/// they fit. When not even the first sentence fits, the text is cut at a word
/// boundary and `...` is appended, still within `max_length`.
pub fn extract_excerpt(content: &str, max_length: usize) -> String {
    let max_length = max_length.max(1);
    let clean = HTML_TAG.replace_all(content, "");

    let mut excerpt = String::new();
    let mut excerpt_len = 0;
    for sentence in clean.split_inclusive('.') {
        let len = sentence.chars().count();
        if excerpt_len + len > max_length {
            break;
        }
        excerpt.push_str(sentence);
        excerpt_len += len;
    }

    let excerpt = excerpt.trim();
    if !excerpt.is_empty() {
        return excerpt.to_string();
    }

    truncate_at_word(clean.trim(), max_length)
}

/// Shorten display text at a word boundary, appending `...` when cut
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let head = &text[..byte_index(text, max_length)];
    let head = match head.rfind(' ') {
        Some(i) => &head[..i],
        None => head,
    };
    format!("{}{}", head, ELLIPSIS)
}

fn truncate_at_word(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let budget = max_length.saturating_sub(ELLIPSIS.len());
    if budget == 0 {
        return text.chars().take(max_length).collect::<String>().trim().to_string();
    }

    let cut = byte_index(text, budget);
    let head = &text[..cut];
    let head = if text[cut..].starts_with(char::is_whitespace) {
        head
    } else {
        // Mid-word: back off to the previous word, unless the first word
        // alone is longer than the budget
        match head.rfind(char::is_whitespace) {
            Some(i) => &head[..i],
            None => head,
        }
    };

    format!("{}{}", head.trim_end(), ELLIPSIS)
}

/// Byte offset of the `chars`-th character, clamped to the end of `text`
fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Sentence Accumulation Tests ====================

    #[test]
    fn test_single_sentence_fits_then_stops() {
        assert_eq!(extract_excerpt("A. B. C.", 3), "A.");
    }

    #[test]
    fn test_takes_sentences_while_they_fit() {
        let content = "First sentence. Second sentence. Third sentence is much longer than the rest.";
        assert_eq!(extract_excerpt(content, 35), "First sentence. Second sentence.");
    }

    #[test]
    fn test_short_content_is_returned_whole() {
        assert_eq!(extract_excerpt("  Just one. Two.  ", 200), "Just one. Two.");
    }

    #[test]
    fn test_no_extra_delimiter_is_appended() {
        assert_eq!(extract_excerpt("One. Two.", 200), "One. Two.");
    }

    #[test]
    fn test_html_tags_are_removed() {
        let content = "<p>Hello <strong>world</strong>.</p>\n<img src=\"x.jpg\" alt=\"x\">\nMore.";
        assert_eq!(extract_excerpt(content, 200), "Hello world.\n\nMore.");
    }

    // ==================== Fallback Tests ====================

    #[test]
    fn test_long_first_sentence_is_cut_at_word_boundary() {
        let content = "alpha beta gamma delta epsilon zeta eta theta";
        let excerpt = extract_excerpt(content, 20);

        assert_eq!(excerpt, "alpha beta gamma...");
        assert!(excerpt.chars().count() <= 20);
    }

    #[test]
    fn test_single_long_word_is_hard_cut() {
        let content = "x".repeat(50);
        let excerpt = extract_excerpt(&content, 10);
        assert_eq!(excerpt, format!("{}...", "x".repeat(7)));
    }

    #[test]
    fn test_text_without_delimiter_that_fits_is_untouched() {
        assert_eq!(extract_excerpt("No delimiter here", 200), "No delimiter here");
    }

    #[test]
    fn test_multibyte_text_is_cut_on_char_boundary() {
        let content = "ééééé ééééé ééééé ééééé";
        let excerpt = extract_excerpt(content, 13);
        assert_eq!(excerpt, "ééééé...");
    }

    // ==================== Invariant Tests ====================

    #[test]
    fn test_length_never_exceeds_bound() {
        let inputs = [
            "A. B. C.",
            "Sentence one is here. Sentence two follows it. Sentence three ends.",
            "no delimiters at all in this reasonably long piece of text right here",
            "<h1>Heading</h1>\n\nParagraph one. Paragraph two.",
            "",
        ];
        for input in inputs {
            for max in [1, 3, 5, 12, 40, 200] {
                let excerpt = extract_excerpt(input, max);
                assert!(
                    excerpt.chars().count() <= max,
                    "{:?} at {} gave {:?}",
                    input,
                    max,
                    excerpt
                );
            }
        }
    }

    #[test]
    fn test_excerpt_is_idempotent() {
        let long_word = "y".repeat(300);
        let inputs: [&str; 5] = [
            "A. B. C.",
            "First sentence. Second sentence. Third sentence is much longer than the rest.",
            "alpha beta gamma delta epsilon zeta eta theta",
            long_word.as_str(),
            "<p>Tagged.</p> Trailing words without end",
        ];
        for input in inputs {
            for max in [3, 10, 20, 35, 200] {
                let once = extract_excerpt(input, max);
                let twice = extract_excerpt(&once, max);
                assert_eq!(once, twice, "input {:?} max {}", input, max);
            }
        }
    }

    // ==================== Truncate Tests ====================

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_text("short", 150), "short");
    }

    #[test]
    fn test_truncate_at_word() {
        assert_eq!(truncate_text("hello wonderful world", 12), "hello...");
    }
}
