use regex::Regex;
use std::sync::LazyLock;

const MAX_SLUG_CHARS: usize = 50;
const EMPTY_SLUG: &str = "post";

static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATOR_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// URL-friendly post id derived from a title, e.g. `Hello, World!` -> `hello-world`
pub fn generate_post_id(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    let hyphenated = SEPARATOR_RUNS.replace_all(&stripped, "-");
    let slug: String = hyphenated
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// The id to store: a non-blank custom id wins, otherwise the title's slug
pub fn resolve_post_id(custom_id: Option<&str>, title: &str) -> String {
    match custom_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_post_id(title),
    }
}
