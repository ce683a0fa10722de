use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SiteSettings;
use crate::models::Post;

pub struct WorkerScript;

/// A category or tag with the URL segment its listing page is served under
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Term {
    pub name: String,
    pub slug: String,
    pub count: usize,
}

/// Categories and tags of a post set. Names that differ only in case or
/// spacing share one slug and one listing page.
///
/// The slug tables are `(name, slug)` pairs, loaded into a `Map` by the
/// runtime so arbitrary names never touch object prototypes.
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub categories: Vec<Term>,
    pub tags: Vec<Term>,
    pub category_slugs: Vec<(String, String)>,
    pub tag_slugs: Vec<(String, String)>,
}

impl Taxonomy {
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut categories = Vec::new();
        let mut tags = Vec::new();
        let mut category_slugs = BTreeMap::new();
        let mut tag_slugs = BTreeMap::new();

        for post in posts {
            if let Some(category) = post.category.as_deref() {
                if let Some(slug) = record_name(&mut category_slugs, category) {
                    count_term(&mut categories, category, slug);
                }
            }

            let mut seen = HashSet::new();
            for tag in &post.tags {
                if let Some(slug) = record_name(&mut tag_slugs, tag) {
                    if seen.insert(slug.clone()) {
                        count_term(&mut tags, tag, slug);
                    }
                }
            }
        }

        Self {
            categories,
            tags,
            category_slugs: category_slugs.into_iter().collect(),
            tag_slugs: tag_slugs.into_iter().collect(),
        }
    }
}

/// URL segment for a category or tag: `" Tips  And Tricks"` -> `tips-and-tricks`
pub fn route_slug(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

fn record_name(slugs: &mut BTreeMap<String, String>, name: &str) -> Option<String> {
    let slug = route_slug(name);
    if slug.is_empty() {
        return None;
    }
    slugs.insert(name.to_string(), slug.clone());
    Some(slug)
}

fn count_term(terms: &mut Vec<Term>, name: &str, slug: String) {
    match terms.iter_mut().find(|term| term.slug == slug) {
        Some(term) => term.count += 1,
        None => terms.push(Term {
            name: name.trim().to_string(),
            slug,
            count: 1,
        }),
    }
}

impl WorkerScript {
    /// Render a self-contained Cloudflare worker (service-worker syntax)
    /// serving `posts` as a small site.
    pub fn render(posts: &[Post], site: &SiteSettings) -> Result<String> {
        let posts_json =
            serde_json::to_string_pretty(posts).context("Failed to serialize posts for worker")?;
        let config_json =
            serde_json::to_string_pretty(site).context("Failed to serialize site settings")?;
        let taxonomy_json = serde_json::to_string_pretty(&Taxonomy::from_posts(posts))
            .context("Failed to serialize categories and tags")?;

        let mut script = String::with_capacity(posts_json.len() + WORKER_RUNTIME.len() + 512);

        script.push_str("// Blog worker for Cloudflare Workers\n");
        script.push_str(&format!(
            "// {} post(s). Regenerate with publish-blog instead of editing by hand.\n\n",
            posts.len()
        ));
        script.push_str("addEventListener('fetch', event => {\n");
        script.push_str("  event.respondWith(handleRequest(event.request));\n");
        script.push_str("});\n\n");
        script.push_str(&format!("const posts = {};\n\n", Self::js_literal(&posts_json)));
        script.push_str(&format!(
            "const BLOG_CONFIG = {};\n\n",
            Self::js_literal(&config_json)
        ));
        script.push_str(&format!(
            "const TAXONOMY = {};\n\n",
            Self::js_literal(&taxonomy_json)
        ));
        script.push_str(WORKER_RUNTIME);

        Ok(script)
    }

    pub fn save(content: &str, path: &Path) -> Result<PathBuf> {
        fs::write(path, content)
            .with_context(|| format!("Failed to write worker script: {}", path.display()))?;
        Ok(path.to_path_buf())
    }

    /// JSON is valid JavaScript except for raw line/paragraph separators in
    /// strings on older engines
    fn js_literal(json: &str) -> String {
        json.replace('\u{2028}', "\\u2028")
            .replace('\u{2029}', "\\u2029")
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const WORKER_RUNTIME: &str = r##"const STYLES = `
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif; line-height: 1.6; color: #333; background: #f8f9fa; }
  a { color: #667eea; }
  .container { max-width: 1200px; margin: 0 auto; padding: 0 20px; }
  .header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 1rem 0; box-shadow: 0 2px 10px rgba(0,0,0,0.1); position: sticky; top: 0; z-index: 1000; }
  .header-content { display: flex; justify-content: space-between; align-items: center; }
  .logo { font-size: 1.8rem; font-weight: 700; text-decoration: none; color: white; }
  .nav-menu { display: flex; list-style: none; gap: 2rem; }
  .nav-menu a { color: white; text-decoration: none; font-weight: 500; }
  .hero { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; text-align: center; padding: 4rem 0; }
  .hero h1 { font-size: 3rem; font-weight: 700; margin-bottom: 1rem; }
  .hero p { font-size: 1.2rem; opacity: 0.9; }
  .layout { display: grid; grid-template-columns: 2fr 1fr; gap: 3rem; margin: 3rem auto; }
  .post-card { background: white; border-radius: 12px; padding: 2rem; margin-bottom: 2rem; box-shadow: 0 4px 20px rgba(0,0,0,0.08); }
  .post-title { font-size: 1.5rem; font-weight: 600; margin-bottom: 0.5rem; color: #2d3748; }
  .post-title a { color: inherit; text-decoration: none; }
  .post-meta { color: #718096; font-size: 0.9rem; margin-bottom: 1rem; }
  .post-content { color: #4a5568; line-height: 1.8; }
  .post-content h2, .post-content h3, .post-content h4 { color: #2d3748; margin: 1.5rem 0 0.75rem; }
  .post-content p, .post-content ul, .post-content ol { margin-bottom: 1rem; }
  .post-content ul, .post-content ol { padding-left: 1.5rem; }
  .post-content img { display: block; }
  .tags { margin-top: 1rem; }
  .tag { display: inline-block; background: #edf2f7; color: #4a5568; padding: 0.2rem 0.7rem; border-radius: 999px; font-size: 0.8rem; margin: 0 0.4rem 0.4rem 0; text-decoration: none; }
  .read-more { display: inline-block; margin-top: 1rem; font-weight: 500; text-decoration: none; }
  .back-link { display: inline-block; margin-bottom: 2rem; font-weight: 500; text-decoration: none; }
  .sidebar .widget { background: white; border-radius: 12px; padding: 1.5rem; margin-bottom: 2rem; box-shadow: 0 4px 20px rgba(0,0,0,0.08); }
  .sidebar h3 { margin-bottom: 1rem; color: #2d3748; }
  .sidebar ul { list-style: none; }
  .sidebar li { margin-bottom: 0.5rem; }
  .share { margin-top: 2rem; display: flex; gap: 1rem; }
  .empty { text-align: center; color: #718096; }
  footer { text-align: center; color: #718096; padding: 2rem 0; border-top: 1px solid #e2e8f0; }
  @media (max-width: 768px) {
    .layout { grid-template-columns: 1fr; }
    .hero h1 { font-size: 2rem; }
    .nav-menu { gap: 1rem; }
    .post-card { padding: 1.5rem; }
  }
`;

function escapeHtml(value) {
  return String(value ?? '')
    .replace(/&/g, '&amp;')
    .replace(/</g, '&lt;')
    .replace(/>/g, '&gt;')
    .replace(/"/g, '&quot;')
    .replace(/'/g, '&#39;');
}

function renderInline(text) {
  return text
    .replace(/\*\*(.+?)\*\*/g, '<strong>$1</strong>')
    .replace(/(^|[^*])\*([^*\s][^*]*?)\*/g, '$1<em>$2</em>');
}

const LIST_ITEM = /^\s*([-*•]|\d+[.)])\s+/;

function renderContent(content) {
  return String(content ?? '')
    .split(/\n\s*\n/)
    .map(block => {
      const text = block.trim();
      if (!text) return '';
      if (text.startsWith('<')) return text;

      const lines = text.split('\n');
      const heading = lines[0].match(/^(#{1,6})\s+(.*)$/);
      if (heading) {
        const level = Math.min(heading[1].length + 1, 6);
        const rest = lines.slice(1).join('\n');
        return `<h${level}>${renderInline(heading[2])}</h${level}>` + (rest.trim() ? renderContent(rest) : '');
      }

      if (lines.every(line => LIST_ITEM.test(line))) {
        const ordered = /^\s*\d/.test(lines[0]);
        const items = lines.map(line => `<li>${renderInline(line.replace(LIST_ITEM, ''))}</li>`).join('');
        return ordered ? `<ol>${items}</ol>` : `<ul>${items}</ul>`;
      }

      return `<p>${lines.map(renderInline).join('<br>')}</p>`;
    })
    .join('\n');
}

const CATEGORY_SLUGS = new Map(TAXONOMY.categorySlugs);
const TAG_SLUGS = new Map(TAXONOMY.tagSlugs);

function categorySlug(name) {
  return name ? CATEGORY_SLUGS.get(name) : undefined;
}

function tagSlug(name) {
  return name ? TAG_SLUGS.get(name) : undefined;
}

function renderTags(post) {
  const tags = (post.tags || []).filter(tagSlug);
  if (tags.length === 0) return '';
  const links = tags
    .map(tag => `<a href="/tag/${encodeURIComponent(tagSlug(tag))}" class="tag">${escapeHtml(tag)}</a>`)
    .join('');
  return `<div class="tags">${links}</div>`;
}

function renderMeta(post) {
  const slug = categorySlug(post.category);
  const category = slug
    ? ` | <a href="/category/${encodeURIComponent(slug)}">${escapeHtml(post.category)}</a>`
    : '';
  return `<div class="post-meta">${escapeHtml(post.date)} | ${escapeHtml(post.author)}${category}</div>`;
}

function renderCard(post) {
  return `
    <article class="post-card">
      <h2 class="post-title"><a href="/post/${encodeURIComponent(post.id)}">${escapeHtml(post.title)}</a></h2>
      ${renderMeta(post)}
      <div class="post-content">${escapeHtml(post.excerpt)}</div>
      ${renderTags(post)}
      <a href="/post/${encodeURIComponent(post.id)}" class="read-more">Read more &rarr;</a>
    </article>`;
}

function renderSidebar() {
  const recent = posts
    .slice(-5)
    .reverse()
    .map(post => `<li><a href="/post/${encodeURIComponent(post.id)}">${escapeHtml(post.title)}</a></li>`)
    .join('');
  const categoryLinks = TAXONOMY.categories
    .map(term => `<li><a href="/category/${encodeURIComponent(term.slug)}">${escapeHtml(term.name)} (${term.count})</a></li>`)
    .join('');
  const tagLinks = TAXONOMY.tags
    .map(term => `<a href="/tag/${encodeURIComponent(term.slug)}" class="tag">${escapeHtml(term.name)}</a>`)
    .join('');

  return `
    <aside class="sidebar">
      <div class="widget"><h3>Recent Posts</h3><ul>${recent || '<li>No posts yet</li>'}</ul></div>
      ${categoryLinks ? `<div class="widget"><h3>Categories</h3><ul>${categoryLinks}</ul></div>` : ''}
      ${tagLinks ? `<div class="widget"><h3>Tags</h3><div class="tags">${tagLinks}</div></div>` : ''}
    </aside>`;
}

function renderPage({ title, description, url, body }) {
  return `<!DOCTYPE html>
<html lang="${escapeHtml(BLOG_CONFIG.language)}">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>${escapeHtml(title)}</title>
  <meta name="description" content="${escapeHtml(description)}">
  <meta name="author" content="${escapeHtml(BLOG_CONFIG.author)}">
  <meta property="og:title" content="${escapeHtml(title)}">
  <meta property="og:description" content="${escapeHtml(description)}">
  <meta property="og:type" content="website">
  <meta property="og:url" content="${escapeHtml(url)}">
  <meta name="twitter:card" content="summary_large_image">
  <meta name="twitter:title" content="${escapeHtml(title)}">
  <meta name="twitter:description" content="${escapeHtml(description)}">
  <style>${STYLES}</style>
</head>
<body>
  <header class="header">
    <div class="container header-content">
      <a href="/" class="logo">${escapeHtml(BLOG_CONFIG.title)}</a>
      <ul class="nav-menu"><li><a href="/">Home</a></li><li><a href="/api/posts">API</a></li></ul>
    </div>
  </header>
  ${body}
  <footer><p>&copy; ${new Date().getFullYear()} ${escapeHtml(BLOG_CONFIG.title)}</p></footer>
</body>
</html>`;
}

function renderListing(heading, subheading, list) {
  const cards = list.length
    ? list.map(renderCard).join('')
    : '<div class="post-card empty">No posts found.</div>';
  return `
    <section class="hero"><div class="container"><h1>${escapeHtml(heading)}</h1><p>${escapeHtml(subheading)}</p></div></section>
    <div class="container layout"><main>${cards}</main>${renderSidebar()}</div>`;
}

function getHomePage(origin) {
  return renderPage({
    title: BLOG_CONFIG.title,
    description: BLOG_CONFIG.description,
    url: origin + '/',
    body: renderListing(BLOG_CONFIG.title, BLOG_CONFIG.subtitle, posts),
  });
}

function getPostPage(post, origin) {
  const url = `${origin}/post/${encodeURIComponent(post.id)}`;
  const share = encodeURIComponent(url);
  const body = `
    <div class="container layout">
      <main>
        <a href="/" class="back-link">&larr; Back to home</a>
        <article class="post-card">
          <h1 class="post-title">${escapeHtml(post.title)}</h1>
          ${renderMeta(post)}
          <div class="post-content">${renderContent(post.content)}</div>
          ${renderTags(post)}
          <div class="share">
            <a href="https://www.facebook.com/sharer/sharer.php?u=${share}" target="_blank" rel="noopener">Facebook</a>
            <a href="https://twitter.com/intent/tweet?text=${encodeURIComponent(post.title)}&url=${share}" target="_blank" rel="noopener">Twitter</a>
            <a href="https://wa.me/?text=${encodeURIComponent(post.title + ' - ' + url)}" target="_blank" rel="noopener">WhatsApp</a>
          </div>
        </article>
      </main>
      ${renderSidebar()}
    </div>`;
  return renderPage({ title: `${post.title} - ${BLOG_CONFIG.title}`, description: post.excerpt, url, body });
}

function getCategoryPage(slug, origin) {
  const key = slug.toLowerCase();
  const term = TAXONOMY.categories.find(t => t.slug === key);
  const list = term ? posts.filter(post => categorySlug(post.category) === term.slug) : [];
  const label = term ? term.name : slug;
  return renderPage({
    title: `${label} - ${BLOG_CONFIG.title}`,
    description: `Posts in ${label}`,
    url: `${origin}/category/${encodeURIComponent(key)}`,
    body: renderListing(label, `Category: ${list.length} post(s)`, list),
  });
}

function getTagPage(slug, origin) {
  const key = slug.toLowerCase();
  const term = TAXONOMY.tags.find(t => t.slug === key);
  const list = term ? posts.filter(post => (post.tags || []).some(tag => tagSlug(tag) === term.slug)) : [];
  const label = term ? term.name : slug;
  return renderPage({
    title: `#${label} - ${BLOG_CONFIG.title}`,
    description: `Posts tagged ${label}`,
    url: `${origin}/tag/${encodeURIComponent(key)}`,
    body: renderListing(`#${label}`, `Tag: ${list.length} post(s)`, list),
  });
}

function getNotFoundPage(origin) {
  return renderPage({
    title: `404 Not Found - ${BLOG_CONFIG.title}`,
    description: 'Page not found',
    url: origin,
    body: `
      <section class="hero"><div class="container"><h1>404</h1><p>Post not found</p></div></section>
      <div class="container layout"><main><div class="post-card"><a href="/" class="back-link">&larr; Back to home</a></div></main></div>`,
  });
}

function html(body, status = 200) {
  return new Response(body, { status, headers: { 'Content-Type': 'text/html; charset=utf-8' } });
}

async function handleRequest(request) {
  const url = new URL(request.url);
  let path;
  try {
    path = decodeURIComponent(url.pathname);
  } catch (e) {
    return html(getNotFoundPage(url.origin), 404);
  }
  if (path.length > 1 && path.endsWith('/')) path = path.slice(0, -1);

  if (path === '/') {
    return html(getHomePage(url.origin));
  }

  if (path === '/api/posts') {
    return new Response(JSON.stringify(posts), {
      headers: { 'Content-Type': 'application/json; charset=utf-8', 'Access-Control-Allow-Origin': '*' },
    });
  }

  if (path.startsWith('/post/')) {
    const post = posts.find(p => p.id === path.slice('/post/'.length));
    return post ? html(getPostPage(post, url.origin)) : html(getNotFoundPage(url.origin), 404);
  }

  if (path.startsWith('/category/')) {
    return html(getCategoryPage(path.slice('/category/'.length), url.origin));
  }

  if (path.startsWith('/tag/')) {
    return html(getTagPage(path.slice('/tag/'.length), url.origin));
  }

  return html(getNotFoundPage(url.origin), 404);
}
"##;
