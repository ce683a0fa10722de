use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CollectionError;

/// Language an article is generated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Id,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Id => "id",
            Language::En => "en",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Id => "Indonesian",
            Language::En => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" => Ok(Language::Id),
            "en" => Ok(Language::En),
            other => anyhow::bail!("Unsupported language: {}. Use 'id' or 'en'", other),
        }
    }
}

/// A single blog post, serialized with the exact field names the worker script reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub author: String,
    pub date: String,
    pub excerpt: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Post {
    /// Build a hand-written post. Line breaks in `content` become `<br>` so
    /// the worker renders them as typed.
    pub fn manual(
        id: &str,
        title: &str,
        author: &str,
        date: chrono::NaiveDate,
        excerpt: &str,
        content: &str,
    ) -> anyhow::Result<Self> {
        if title.trim().is_empty() || id.trim().is_empty() || content.trim().is_empty() {
            anyhow::bail!("Title, id and content are required");
        }

        Ok(Self {
            id: id.trim().to_string(),
            title: title.trim().to_string(),
            author: author.trim().to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            excerpt: excerpt.trim().to_string(),
            content: content.replace("\r\n", "\n").replace('\n', "<br>"),
            generated_by: None,
            keyword: None,
            language: None,
            category: None,
            tags: Vec::new(),
        })
    }

    pub fn is_generated(&self) -> bool {
        self.generated_by.is_some()
    }
}

/// Ordered set of posts owned by whoever loaded it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostCollection {
    posts: Vec<Post>,
}

impl PostCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_posts(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    /// Append a post, keeping ids unique
    pub fn push(&mut self, post: Post) -> Result<(), CollectionError> {
        if self.contains_id(&post.id) {
            return Err(CollectionError::DuplicateId(post.id));
        }
        self.posts.push(post);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Post, CollectionError> {
        if index >= self.posts.len() {
            return Err(CollectionError::IndexOutOfRange {
                index,
                len: self.posts.len(),
            });
        }
        Ok(self.posts.remove(index))
    }

    /// Import semantics: the previous contents are discarded, nothing is merged
    pub fn replace_all(&mut self, posts: Vec<Post>) {
        self.posts = posts;
    }

    pub fn get(&self, index: usize) -> Option<&Post> {
        self.posts.get(index)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.posts.iter().any(|p| p.id == id)
    }

    pub fn list(&self) -> &[Post] {
        &self.posts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Post> {
        self.posts.iter()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
