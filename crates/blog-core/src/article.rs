/// Lines at least this long read as prose, not as a headline
const MAX_TITLE_LINE_CHARS: usize = 100;

const UNTITLED: &str = "Untitled";

/// Split generated article text into `(title, body)`.
///
/// Only the first non-blank line is considered. A markdown heading always
/// becomes the title; a short plain line does too. Anything else leaves the
/// whole text as body and keeps `fallback_title`.
pub fn split_title_body(raw: &str, fallback_title: &str) -> (String, String) {
    let fallback = match fallback_title.trim() {
        "" => UNTITLED.to_string(),
        trimmed => trimmed.to_string(),
    };

    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        offset += line.len();

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let rest = raw[offset..].trim().to_string();

        if line.starts_with('#') {
            let heading = strip_heading_markers(trimmed);
            let title = if heading.is_empty() {
                fallback
            } else {
                heading.to_string()
            };
            return (title, rest);
        }

        if trimmed.chars().count() < MAX_TITLE_LINE_CHARS {
            return (trimmed.to_string(), rest);
        }

        // First real line is body text; nothing is consumed
        break;
    }

    (fallback, raw.to_string())
}

/// `## Title ##` -> `Title`. A closing run only counts when separated by
/// whitespace, so `Learn C#` keeps its hash.
fn strip_heading_markers(line: &str) -> &str {
    let heading = line.trim_start_matches('#').trim();
    let without_closing = heading.trim_end_matches('#');
    if without_closing.len() != heading.len()
        && (without_closing.is_empty() || without_closing.ends_with(char::is_whitespace))
    {
        without_closing.trim()
    } else {
        heading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_becomes_title() {
        let raw = "# My Great Title\n\nFirst paragraph text here.\n\nSecond paragraph.";
        let (title, body) = split_title_body(raw, "ignored");

        assert_eq!(title, "My Great Title");
        assert_eq!(body, "First paragraph text here.\n\nSecond paragraph.");
    }

    #[test]
    fn test_all_heading_markers_are_stripped() {
        let (title, body) = split_title_body("### Deep Heading ###\nBody", "topic");
        assert_eq!(title, "Deep Heading");
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_trailing_hash_inside_word_is_kept() {
        let (title, _) = split_title_body("# Learn C#\nBody", "topic");
        assert_eq!(title, "Learn C#");
    }

    #[test]
    fn test_leading_blank_lines_are_skipped() {
        let (title, body) = split_title_body("\n\n   \n## Title\nBody line", "topic");
        assert_eq!(title, "Title");
        assert_eq!(body, "Body line");
    }

    #[test]
    fn test_short_plain_line_becomes_title() {
        let (title, body) = split_title_body("A Short Headline\n\nThe body.", "topic");
        assert_eq!(title, "A Short Headline");
        assert_eq!(body, "The body.");
    }

    #[test]
    fn test_long_first_line_keeps_fallback_and_whole_body() {
        let long_line = "word ".repeat(30);
        let raw = format!("{}\n\nShort line later", long_line);
        let (title, body) = split_title_body(&raw, "My Topic");

        assert_eq!(title, "My Topic");
        assert_eq!(body, raw);
    }

    #[test]
    fn test_line_of_exactly_threshold_is_not_a_title() {
        let line = "x".repeat(MAX_TITLE_LINE_CHARS);
        let (title, body) = split_title_body(&line, "fallback");
        assert_eq!(title, "fallback");
        assert_eq!(body, line);
    }

    #[test]
    fn test_indented_hash_is_not_a_heading() {
        let (title, _) = split_title_body("  # not a heading", "topic");
        // Short enough to be a plain title line, kept verbatim after trimming
        assert_eq!(title, "# not a heading");
    }

    #[test]
    fn test_empty_heading_keeps_fallback() {
        let (title, body) = split_title_body("#\nBody here", "Topic");
        assert_eq!(title, "Topic");
        assert_eq!(body, "Body here");
    }

    #[test]
    fn test_blank_input_returns_fallback() {
        let (title, body) = split_title_body("\n  \n", "Topic");
        assert_eq!(title, "Topic");
        assert_eq!(body, "\n  \n");
    }

    #[test]
    fn test_title_never_empty() {
        let long = "y".repeat(150);
        let (title, _) = split_title_body(&long, "   ");
        assert_eq!(title, "Untitled");
    }

    #[test]
    fn test_crlf_input() {
        let (title, body) = split_title_body("# Title\r\nBody\r\n", "t");
        assert_eq!(title, "Title");
        assert_eq!(body, "Body");
    }
}
