use std::collections::HashSet;

use crate::worker::escape_html;

const IMAGE_STYLE: &str =
    "width: 100%; max-width: 600px; height: auto; border-radius: 8px; margin: 1rem 0;";

/// Insert hotlinked images into `body` at paragraph boundaries.
///
/// A paragraph ends on a non-blank line followed by a blank line or the end
/// of the text. The first image goes after paragraph 1, later ones after
/// paragraphs 3, 6, 9 and so on. Each URL is used at most once, in order;
/// URLs left over when the paragraphs run out are dropped.
pub fn insert_images(body: &str, image_urls: &[String], alt_text: &str) -> String {
    let mut seen = HashSet::new();
    let urls: Vec<&str> = image_urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty() && seen.insert(*u))
        .collect();

    if urls.is_empty() {
        return body.to_string();
    }

    let lines: Vec<&str> = body.split('\n').collect();
    let mut output: Vec<String> = Vec::with_capacity(lines.len() + urls.len() * 3);
    let mut next_url = urls.into_iter();
    let mut paragraph_count = 0;

    for (i, line) in lines.iter().enumerate() {
        output.push(line.to_string());

        let ends_paragraph = !line.trim().is_empty()
            && lines.get(i + 1).map_or(true, |next| next.trim().is_empty());
        if !ends_paragraph {
            continue;
        }

        paragraph_count += 1;
        if !is_image_slot(paragraph_count) {
            continue;
        }

        let Some(url) = next_url.next() else {
            copy_remaining(&lines[i + 1..], &mut output);
            return output.join("\n");
        };

        output.push(String::new());
        output.push(image_tag(url, alt_text));
        output.push(String::new());
    }

    output.join("\n")
}

fn is_image_slot(paragraph: usize) -> bool {
    paragraph == 1 || paragraph % 3 == 0
}

/// URLs are exhausted: copy the untouched tail
fn copy_remaining(rest: &[&str], output: &mut Vec<String>) {
    output.extend(rest.iter().map(|line| line.to_string()));
}

fn image_tag(url: &str, alt_text: &str) -> String {
    format!(
        "<img src=\"{}\" alt=\"{}\" style=\"{}\">",
        escape_html(url),
        escape_html(alt_text),
        IMAGE_STYLE
    )
}
