use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::article::split_title_body;
use crate::config::GenerationSettings;
use crate::error::{BuildError, GenerationError};
use crate::excerpt::extract_excerpt;
use crate::images::insert_images;
use crate::models::{Language, Post};
use crate::slug::resolve_post_id;

const GENERATED_BY: &str = "AI";

/// Produces article text for a topic
#[async_trait]
pub trait ArticleGenerator: Send + Sync {
    async fn generate(&self, topic: &str, language: Language) -> Result<String, GenerationError>;
}

/// Finds hotlinkable image URLs. No results is an empty list, not an error.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn search_images(&self, query: &str, max_count: usize) -> anyhow::Result<Vec<String>>;
}

/// What the operator asked for
#[derive(Debug, Clone)]
pub struct PostRequest {
    pub topic: String,
    pub author: String,
    pub language: Language,
    pub custom_id: Option<String>,
    pub max_images: usize,
    pub image_query: Option<String>,
}

impl PostRequest {
    pub fn new(topic: impl Into<String>, author: impl Into<String>, language: Language) -> Self {
        Self {
            topic: topic.into(),
            author: author.into(),
            language,
            custom_id: None,
            max_images: 0,
            image_query: None,
        }
    }

    /// Search terms for images: the explicit query if given, else the topic
    pub fn image_query(&self) -> &str {
        match self.image_query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => query,
            _ => self.topic.trim(),
        }
    }
}

/// Turns generated text and image URLs into a finished post
#[derive(Debug, Clone)]
pub struct PostBuilder {
    min_article_chars: usize,
    excerpt_chars: usize,
}

impl Default for PostBuilder {
    fn default() -> Self {
        Self::new(&GenerationSettings::default())
    }
}

impl PostBuilder {
    pub fn new(settings: &GenerationSettings) -> Self {
        Self {
            min_article_chars: settings.min_article_chars,
            excerpt_chars: settings.excerpt_chars,
        }
    }

    pub fn build(
        &self,
        request: &PostRequest,
        raw_article: &str,
        image_urls: &[String],
    ) -> Result<Post, BuildError> {
        self.build_on(request, raw_article, image_urls, Local::now().date_naive())
    }

    pub fn build_on(
        &self,
        request: &PostRequest,
        raw_article: &str,
        image_urls: &[String],
        date: NaiveDate,
    ) -> Result<Post, BuildError> {
        let article = raw_article.trim();
        if article.is_empty() {
            return Err(BuildError::GenerationEmpty);
        }
        let length = article.chars().count();
        if length < self.min_article_chars {
            return Err(BuildError::GenerationTooShort {
                length,
                minimum: self.min_article_chars,
            });
        }

        let (title, body) = split_title_body(article, &request.topic);

        let content = if image_urls.is_empty() {
            body
        } else {
            insert_images(&body, image_urls, &request.topic)
        };

        let excerpt = extract_excerpt(&content, self.excerpt_chars);
        let id = resolve_post_id(request.custom_id.as_deref(), &title);

        Ok(Post {
            id,
            title,
            author: request.author.clone(),
            date: date.format("%Y-%m-%d").to_string(),
            excerpt,
            content,
            generated_by: Some(GENERATED_BY.to_string()),
            keyword: Some(request.topic.clone()),
            language: Some(request.language.code().to_string()),
            category: None,
            tags: Vec::new(),
        })
    }
}

/// Calls the optional collaborators, then the builder.
///
/// A generation failure aborts; an image search failure only drops the images.
pub struct PostComposer {
    generator: Option<Box<dyn ArticleGenerator>>,
    image_source: Option<Box<dyn ImageSource>>,
    builder: PostBuilder,
}

impl PostComposer {
    pub fn new(builder: PostBuilder) -> Self {
        Self {
            generator: None,
            image_source: None,
            builder,
        }
    }

    pub fn with_generator(mut self, generator: impl ArticleGenerator + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    pub fn with_image_source(mut self, source: impl ImageSource + 'static) -> Self {
        self.image_source = Some(Box::new(source));
        self
    }

    pub async fn compose(&self, request: &PostRequest) -> Result<Post, BuildError> {
        let generator = self
            .generator
            .as_deref()
            .ok_or(BuildError::GeneratorUnavailable)?;

        let article = generator.generate(&request.topic, request.language).await?;
        info!(chars = article.len(), topic = %request.topic, "article generated");

        let image_urls = self.find_images(request).await;

        self.builder.build(request, &article, &image_urls)
    }

    async fn find_images(&self, request: &PostRequest) -> Vec<String> {
        if request.max_images == 0 {
            return Vec::new();
        }
        let Some(source) = self.image_source.as_deref() else {
            warn!("image search requested but no image source is configured");
            return Vec::new();
        };

        let query = request.image_query();
        match source.search_images(query, request.max_images).await {
            Ok(urls) if urls.is_empty() => {
                warn!(query, "no images found, continuing without images");
                Vec::new()
            }
            Ok(mut urls) => {
                urls.truncate(request.max_images);
                info!(count = urls.len(), query, "images found");
                urls
            }
            Err(e) => {
                warn!(query, error = %e, "image search failed, continuing without images");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn article() -> String {
        let mut text = String::from("# My Great Title\n\n");
        for i in 1..=6 {
            text.push_str(&format!(
                "Paragraph {} talks about the topic at some length. It has two sentences.\n\n",
                i
            ));
        }
        text
    }

    fn request() -> PostRequest {
        PostRequest::new("rust tips", "AI Assistant", Language::En)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    struct FixedGenerator(String);

    #[async_trait]
    impl ArticleGenerator for FixedGenerator {
        async fn generate(&self, _topic: &str, _language: Language) -> Result<String, GenerationError> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ArticleGenerator for FailingGenerator {
        async fn generate(&self, _topic: &str, _language: Language) -> Result<String, GenerationError> {
            Err(GenerationError::Api {
                status: 429,
                message: "quota exceeded".to_string(),
            })
        }
    }

    struct FixedImages {
        urls: Vec<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ImageSource for FixedImages {
        async fn search_images(&self, _query: &str, _max_count: usize) -> anyhow::Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.urls.clone())
        }
    }

    struct BrokenImages;

    #[async_trait]
    impl ImageSource for BrokenImages {
        async fn search_images(&self, _query: &str, _max_count: usize) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("connection reset")
        }
    }

    // ==================== Builder Tests ====================

    #[test]
    fn test_build_assembles_post() {
        let post = PostBuilder::default()
            .build_on(&request(), &article(), &[], date())
            .unwrap();

        assert_eq!(post.title, "My Great Title");
        assert_eq!(post.id, "my-great-title");
        assert_eq!(post.author, "AI Assistant");
        assert_eq!(post.date, "2024-03-09");
        assert!(post.content.starts_with("Paragraph 1"));
        assert!(!post.content.contains("My Great Title"));
        assert_eq!(post.generated_by.as_deref(), Some("AI"));
        assert_eq!(post.keyword.as_deref(), Some("rust tips"));
        assert_eq!(post.language.as_deref(), Some("en"));
        assert!(post.excerpt.chars().count() <= 200);
        assert!(post.excerpt.starts_with("Paragraph 1 talks"));
    }

    #[test]
    fn test_build_inserts_images_before_excerpt() {
        let urls = vec!["https://img.example.com/1.jpg".to_string()];
        let post = PostBuilder::default()
            .build_on(&request(), &article(), &urls, date())
            .unwrap();

        assert!(post.content.contains("src=\"https://img.example.com/1.jpg\""));
        assert!(post.content.contains("alt=\"rust tips\""));
        assert!(!post.excerpt.contains("<img"));
    }

    #[test]
    fn test_build_uses_custom_id() {
        let mut req = request();
        req.custom_id = Some("hand-picked".to_string());
        let post = PostBuilder::default().build_on(&req, &article(), &[], date()).unwrap();
        assert_eq!(post.id, "hand-picked");
    }

    #[test]
    fn test_build_ignores_blank_custom_id() {
        let mut req = request();
        req.custom_id = Some("   ".to_string());
        let post = PostBuilder::default().build_on(&req, &article(), &[], date()).unwrap();
        assert_eq!(post.id, "my-great-title");
    }

    #[test]
    fn test_build_rejects_short_article() {
        let text = "x".repeat(150);
        let err = PostBuilder::default()
            .build_on(&request(), &text, &[], date())
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::GenerationTooShort {
                length: 150,
                minimum: 200
            }
        ));
    }

    /// Heading plus body, exactly `chars` characters long (multi-byte body)
    fn article_of_length(chars: usize) -> String {
        format!("# T\n\n{}", "é".repeat(chars - 5))
    }

    #[test]
    fn test_build_accepts_minimum_length() {
        let text = article_of_length(200);
        assert_eq!(text.chars().count(), 200);

        let post = PostBuilder::default()
            .build_on(&request(), &text, &[], date())
            .unwrap();
        assert_eq!(post.title, "T");
    }

    #[test]
    fn test_build_rejects_one_below_minimum() {
        let err = PostBuilder::default()
            .build_on(&request(), &article_of_length(199), &[], date())
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::GenerationTooShort {
                length: 199,
                minimum: 200
            }
        ));
    }

    #[test]
    fn test_build_counts_length_after_trimming() {
        let padded = format!("\n\n   {}   \n\n", article_of_length(200));
        assert!(PostBuilder::default()
            .build_on(&request(), &padded, &[], date())
            .is_ok());

        let padded_short = format!("{}{}{}", " ".repeat(20), article_of_length(199), "\n".repeat(20));
        let err = PostBuilder::default()
            .build_on(&request(), &padded_short, &[], date())
            .unwrap_err();
        assert!(matches!(err, BuildError::GenerationTooShort { length: 199, .. }));
    }

    #[test]
    fn test_build_rejects_empty_article() {
        let err = PostBuilder::default()
            .build_on(&request(), "   \n\n ", &[], date())
            .unwrap_err();
        assert!(matches!(err, BuildError::GenerationEmpty));
    }

    #[test]
    fn test_build_falls_back_to_topic_title() {
        let text = "word ".repeat(60);
        let post = PostBuilder::default().build_on(&request(), &text, &[], date()).unwrap();

        assert_eq!(post.title, "rust tips");
        assert_eq!(post.id, "rust-tips");
        assert_eq!(post.content, text.trim());
    }

    // ==================== Composer Tests ====================

    #[tokio::test]
    async fn test_compose_without_generator_fails() {
        let composer = PostComposer::new(PostBuilder::default());
        let err = composer.compose(&request()).await.unwrap_err();
        assert!(matches!(err, BuildError::GeneratorUnavailable));
    }

    #[tokio::test]
    async fn test_compose_propagates_generation_failure() {
        let composer = PostComposer::new(PostBuilder::default()).with_generator(FailingGenerator);
        let err = composer.compose(&request()).await.unwrap_err();
        assert!(matches!(err, BuildError::Generation(GenerationError::Api { status: 429, .. })));
    }

    #[tokio::test]
    async fn test_compose_aborts_on_short_generation() {
        let composer = PostComposer::new(PostBuilder::default())
            .with_generator(FixedGenerator("too short".to_string()));
        let err = composer.compose(&request()).await.unwrap_err();
        assert!(matches!(err, BuildError::GenerationTooShort { .. }));
    }

    #[tokio::test]
    async fn test_compose_with_images() {
        let calls = Arc::new(AtomicUsize::new(0));
        let composer = PostComposer::new(PostBuilder::default())
            .with_generator(FixedGenerator(article()))
            .with_image_source(FixedImages {
                urls: vec![
                    "https://a.example.com/1.jpg".to_string(),
                    "https://a.example.com/2.jpg".to_string(),
                    "https://a.example.com/3.jpg".to_string(),
                ],
                calls: calls.clone(),
            });

        let mut req = request();
        req.max_images = 2;
        let post = composer.compose(&req).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(post.content.contains("1.jpg"));
        assert!(post.content.contains("2.jpg"));
        assert!(!post.content.contains("3.jpg"));
    }

    #[tokio::test]
    async fn test_compose_skips_search_when_no_images_requested() {
        let calls = Arc::new(AtomicUsize::new(0));
        let composer = PostComposer::new(PostBuilder::default())
            .with_generator(FixedGenerator(article()))
            .with_image_source(FixedImages {
                urls: vec!["https://a.example.com/1.jpg".to_string()],
                calls: calls.clone(),
            });

        let post = composer.compose(&request()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!post.content.contains("<img"));
    }

    #[tokio::test]
    async fn test_compose_degrades_when_image_search_fails() {
        let composer = PostComposer::new(PostBuilder::default())
            .with_generator(FixedGenerator(article()))
            .with_image_source(BrokenImages);

        let mut req = request();
        req.max_images = 3;
        let post = composer.compose(&req).await.unwrap();

        assert_eq!(post.title, "My Great Title");
        assert!(!post.content.contains("<img"));
    }

    #[tokio::test]
    async fn test_compose_degrades_without_image_source() {
        let composer =
            PostComposer::new(PostBuilder::default()).with_generator(FixedGenerator(article()));

        let mut req = request();
        req.max_images = 3;
        let post = composer.compose(&req).await.unwrap();
        assert!(!post.content.contains("<img"));
    }

    #[test]
    fn test_image_query_defaults_to_topic() {
        let mut req = request();
        assert_eq!(req.image_query(), "rust tips");
        req.image_query = Some("  ".to_string());
        assert_eq!(req.image_query(), "rust tips");
        req.image_query = Some("ferris crab".to_string());
        assert_eq!(req.image_query(), "ferris crab");
    }
}
