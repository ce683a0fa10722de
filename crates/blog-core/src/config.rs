use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::Language;

const APP_DIR: &str = "blog-publisher";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_WORKER_NAME: &str = "blog";
const API_KEY_FILE: &str = "apikey.txt";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn from_env() -> Result<Self> {
        try_load_dotenv();

        let api_key = match env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => find_api_key_file().context(
                "GEMINI_API_KEY not found.\n\n\
                To fix this, create ~/.config/blog-publisher/.env with:\n  \
                GEMINI_API_KEY=your_key_here\n\n\
                or put the key on the first line of apikey.txt in the current directory.\n\n\
                Get your Gemini API key from: https://aistudio.google.com/app/apikey",
            )?,
        };

        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());

        Ok(Self { api_key, model })
    }
}

#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub account_id: String,
    pub api_token: String,
    pub worker_name: String,
}

impl CloudflareConfig {
    pub fn from_env() -> Result<Self> {
        try_load_dotenv();

        let account_id = env::var("CLOUDFLARE_ACCOUNT_ID").context(
            "CLOUDFLARE_ACCOUNT_ID not found.\n\n\
            To fix this, create ~/.config/blog-publisher/.env with:\n  \
            CLOUDFLARE_ACCOUNT_ID=your_account_id\n  \
            CLOUDFLARE_API_TOKEN=your_token_here\n\n\
            The account id is shown on the right-hand side of the Cloudflare dashboard",
        )?;

        let api_token = env::var("CLOUDFLARE_API_TOKEN").context(
            "CLOUDFLARE_API_TOKEN not found.\n\n\
            To fix this, create ~/.config/blog-publisher/.env with:\n  \
            CLOUDFLARE_ACCOUNT_ID=your_account_id\n  \
            CLOUDFLARE_API_TOKEN=your_token_here\n\n\
            Create a token with Workers:Edit permission at: https://dash.cloudflare.com/profile/api-tokens",
        )?;

        let worker_name = env::var("CLOUDFLARE_WORKER_NAME")
            .unwrap_or_else(|_| DEFAULT_WORKER_NAME.to_string());

        Ok(Self {
            account_id,
            api_token,
            worker_name,
        })
    }
}

/// Model tuning and pipeline limits for AI-generated posts
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub min_article_chars: usize,
    pub excerpt_chars: usize,
    pub max_images: usize,
    pub default_language: Language,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            min_article_chars: 200,
            excerpt_chars: crate::excerpt::DEFAULT_EXCERPT_LENGTH,
            max_images: 3,
            default_language: Language::Id,
        }
    }
}

/// Site-wide text baked into the worker script
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SiteSettings {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            subtitle: "Thoughts, tutorials and experiences".to_string(),
            description: "A personal blog about technology, tutorials and everyday life".to_string(),
            author: "Admin".to_string(),
            language: Language::default().code().to_string(),
        }
    }
}

impl SiteSettings {
    pub fn from_env() -> Self {
        try_load_dotenv();

        let defaults = Self::default();
        Self {
            title: env::var("BLOG_TITLE").unwrap_or(defaults.title),
            subtitle: env::var("BLOG_SUBTITLE").unwrap_or(defaults.subtitle),
            description: env::var("BLOG_DESCRIPTION").unwrap_or(defaults.description),
            author: env::var("BLOG_AUTHOR").unwrap_or(defaults.author),
            language: env::var("BLOG_LANGUAGE").unwrap_or(defaults.language),
        }
    }
}

fn try_load_dotenv() {
    // Try locations in order of preference:

    // 1. Current directory (for development)
    if dotenvy::dotenv().is_ok() {
        return;
    }

    // 2. ~/.config/blog-publisher/.env (standard config location)
    if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(APP_DIR).join(".env");
        if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
            return;
        }
    }

    // 3. ~/.env (home directory)
    if let Some(home_dir) = dirs::home_dir() {
        let home_path = home_dir.join(".env");
        if home_path.exists() {
            let _ = dotenvy::from_path(&home_path);
        }
    }
}

/// Key from `apikey.txt` in the current directory or the config directory
fn find_api_key_file() -> Option<String> {
    let mut candidates = vec![PathBuf::from(API_KEY_FILE)];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join(APP_DIR).join(API_KEY_FILE));
    }

    candidates.iter().find_map(|path| {
        let key = read_api_key_file(path)?;
        info!(path = %path.display(), "using Gemini API key from file");
        Some(key)
    })
}

/// First non-blank line that is not a `#` comment
fn read_api_key_file(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

/// Directory for locally stored data, e.g. the post collection
pub fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join(APP_DIR);
    Ok(dir)
}
