// Public modules
pub mod article;
pub mod bing;
pub mod builder;
pub mod cloudflare;
pub mod config;
pub mod error;
pub mod excerpt;
pub mod gemini;
pub mod images;
pub mod logging;
pub mod models;
pub mod slug;
pub mod store;
pub mod worker;

// Re-export commonly used types
pub use article::split_title_body;
pub use bing::BingImageClient;
pub use builder::{ArticleGenerator, ImageSource, PostBuilder, PostComposer, PostRequest};
pub use cloudflare::{CloudflareClient, Connection};
pub use config::{CloudflareConfig, GeminiConfig, GenerationSettings, SiteSettings};
pub use error::{BuildError, CollectionError, GenerationError};
pub use excerpt::{extract_excerpt, truncate_text};
pub use gemini::GeminiClient;
pub use images::insert_images;
pub use models::{Language, Post, PostCollection};
pub use slug::generate_post_id;
pub use store::{default_posts_path, export_posts, import_posts, load_posts, save_posts};
pub use worker::WorkerScript;
