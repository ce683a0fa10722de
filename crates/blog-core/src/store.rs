use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config;
use crate::models::{Post, PostCollection};

const POSTS_FILE: &str = "posts.json";

/// Get the default location of the post collection
pub fn default_posts_path() -> Result<PathBuf> {
    let data_dir = config::data_dir()?;

    fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join(POSTS_FILE))
}

/// Load the collection; a file that does not exist yet is an empty collection
pub fn load_posts(path: &Path) -> Result<PostCollection> {
    if !path.exists() {
        debug!(path = %path.display(), "no posts file yet");
        return Ok(PostCollection::new());
    }

    let posts = read_post_array(path)?;
    Ok(PostCollection::from_posts(posts))
}

pub fn save_posts(posts: &PostCollection, path: &Path) -> Result<PathBuf> {
    write_post_array(posts.list(), path)
}

/// Write the collection to an arbitrary file as a JSON array
pub fn export_posts(posts: &PostCollection, path: &Path) -> Result<PathBuf> {
    write_post_array(posts.list(), path)
}

/// Read posts previously written by `export_posts`
pub fn import_posts(path: &Path) -> Result<Vec<Post>> {
    if !path.exists() {
        anyhow::bail!("Import file not found: {}", path.display());
    }

    read_post_array(path)
}

fn write_post_array(posts: &[Post], path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(posts).context("Failed to serialize posts")?;

    fs::write(path, json)
        .with_context(|| format!("Failed to write posts file: {}", path.display()))?;

    Ok(path.to_path_buf())
}

fn read_post_array(path: &Path) -> Result<Vec<Post>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read posts file: {}", path.display()))?;

    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    if !value.is_array() {
        anyhow::bail!("{} is not a JSON array of posts", path.display());
    }

    let posts: Vec<Post> = serde_json::from_value(value).with_context(|| {
        format!(
            "Failed to parse posts from {}. Every post needs id, title, author, date, excerpt and content.",
            path.display()
        )
    })?;

    Ok(posts)
}
