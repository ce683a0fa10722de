use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builder::ArticleGenerator;
use crate::config::{GeminiConfig, GenerationSettings};
use crate::error::GenerationError;
use crate::models::Language;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MAX_ATTEMPTS: u32 = 3;
const MAX_TITLE_CHARS: usize = 60;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Article generator backed by the Gemini `generateContent` REST API
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    settings: GenerationSettings,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, settings: &GenerationSettings) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Config("GEMINI_API_KEY is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| GenerationError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            settings: settings.clone(),
        })
    }

    /// A short catchy title for `topic`; the topic itself if generation fails
    pub async fn generate_title(&self, topic: &str, language: Language) -> String {
        let prompt = title_prompt(topic, language);
        match self.generate_text(&prompt).await {
            Ok(text) => {
                let title = clean_title(&text);
                if title.is_empty() {
                    topic.to_string()
                } else {
                    info!(%title, "generated title");
                    title
                }
            }
            Err(e) => {
                warn!(error = %e, "title generation failed, using topic");
                topic.to_string()
            }
        }
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < MAX_ATTEMPTS && is_transient(&e) => {
                    let backoff = std::time::Duration::from_millis(1000 * 2_u64.pow(attempt - 1));
                    warn!(attempt, error = %e, "Gemini request failed, retrying in {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                top_p: self.settings.top_p,
                top_k: self.settings.top_k,
                max_output_tokens: self.settings.max_output_tokens,
                response_mime_type: "text/plain",
            },
        };

        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        debug!(model = %self.model, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        parse_response_text(&body)
    }
}

#[async_trait]
impl ArticleGenerator for GeminiClient {
    async fn generate(&self, topic: &str, language: Language) -> Result<String, GenerationError> {
        let title = self.generate_title(topic, language).await;
        let prompt = article_prompt(&title, language);

        let article = self.generate_text(&prompt).await?;
        info!(chars = article.chars().count(), "generated article");
        Ok(article)
    }
}

/// Connection failures, 429 and 5xx responses
fn is_transient(error: &GenerationError) -> bool {
    match error {
        GenerationError::Network(_) => true,
        GenerationError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

fn parse_response_text(body: &str) -> Result<String, GenerationError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Parse(e.to_string()))?;
    response.text().ok_or(GenerationError::EmptyResponse)
}

/// Strip quoting and markdown emphasis the model likes to wrap titles in
fn clean_title(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .replace('"', "")
        .replace("**", "")
        .replace("##", "");
    let first_line = cleaned.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    first_line.trim_start_matches('#').trim().to_string()
}

fn title_prompt(topic: &str, language: Language) -> String {
    format!(
        "Forget previous instructions. You are a professional blog title writer in {}. \
        Come up with 1 unique, emotional, and curiosity-driven blog title for the topic: \"{}\". \
        The title must be under {} characters, avoid clichés, and spark reader curiosity. \
        Use metaphor, emotion, or an unexpected twist. Do not repeat the topic word exactly. \
        Reply with the title only.",
        language.display_name(),
        topic,
        MAX_TITLE_CHARS
    )
}

fn article_prompt(title: &str, language: Language) -> String {
    match language {
        Language::Id => format!(
            r#"Buatkan artikel lengkap tentang "{}" dalam bahasa Indonesia dengan struktur sebagai berikut:

1. Judul yang menarik dan SEO-friendly
2. Pendahuluan yang engaging (100-150 kata)
3. Isi artikel yang informatif dengan beberapa subheading (minimal 5 subheading)
4. Kesimpulan yang kuat dan actionable (100-150 kata)
5. Panjang total minimal 1000 kata

Pastikan artikel:
- Berkualitas tinggi dan informatif
- Menggunakan gaya penulisan yang profesional namun mudah dipahami
- Terstruktur dengan baik menggunakan heading dan subheading
- Menggunakan bullet points atau numbered lists jika perlu

Gunakan format markdown untuk heading dan formatting. Baris pertama harus berupa judul."#,
            title
        ),
        Language::En => format!(
            r#"Write a comprehensive article about "{}" in English with the following structure:

1. Engaging and SEO-friendly title
2. Compelling introduction (100-150 words)
3. Informative content with multiple subheadings (minimum 5 subheadings)
4. Strong and actionable conclusion (100-150 words)
5. Total length minimum 1000 words

Ensure the article:
- Is high-quality and informative
- Uses a professional yet accessible writing style
- Is well-structured with proper headings and subheadings
- Uses bullet points or numbered lists when appropriate

Use markdown format for headings and formatting. The first line must be the title."#,
            title
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Title Cleanup Tests ====================

    #[test]
    fn test_clean_title_strips_quotes_and_markdown() {
        assert_eq!(clean_title("\"**Rust Without Fear**\""), "Rust Without Fear");
        assert_eq!(clean_title("## The Quiet Power of Tea"), "The Quiet Power of Tea");
    }

    #[test]
    fn test_clean_title_takes_first_line() {
        assert_eq!(clean_title("\n  Title One\nTitle Two\n"), "Title One");
    }

    #[test]
    fn test_clean_title_empty() {
        assert_eq!(clean_title("  \"\"  "), "");
    }

    // ==================== Response Parsing Tests ====================

    #[test]
    fn test_parse_response_joins_parts() {
        let body = r##"{
            "candidates": [
                {"content": {"parts": [{"text": "# Title\n\n"}, {"text": "Body text."}], "role": "model"}}
            ]
        }"##;
        assert_eq!(parse_response_text(body).unwrap(), "# Title\n\nBody text.");
    }

    #[test]
    fn test_parse_response_without_candidates_is_empty() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert!(matches!(
            parse_response_text(body),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_response_blank_text_is_empty() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "   "}]}}]}"#;
        assert!(matches!(
            parse_response_text(body),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_response_invalid_json() {
        assert!(matches!(
            parse_response_text("<html>"),
            Err(GenerationError::Parse(_))
        ));
    }

    // ==================== Request Tests ====================

    #[test]
    fn test_request_uses_camel_case_fields() {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: "hi".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.9,
                top_p: 0.95,
                top_k: 64,
                max_output_tokens: 8192,
                response_mime_type: "text/plain",
            },
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["topK"], 64);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(json["generationConfig"]["responseMimeType"], "text/plain");
    }

    #[test]
    fn test_article_prompt_language() {
        assert!(article_prompt("Judul", Language::Id).contains("bahasa Indonesia"));
        assert!(article_prompt("Title", Language::En).contains("in English"));
        assert!(article_prompt("Title", Language::En).contains("\"Title\""));
    }

    #[test]
    fn test_network_errors_retry() {
        assert!(is_transient(&GenerationError::Network("timeout".into())));
        assert!(!is_transient(&GenerationError::EmptyResponse));
        assert!(!is_transient(&GenerationError::Parse("bad".into())));
    }

    #[test]
    fn test_rate_limit_and_server_errors_retry() {
        for status in [429, 500, 502, 503] {
            let error = GenerationError::Api {
                status,
                message: "try later".to_string(),
            };
            assert!(is_transient(&error), "status {} should retry", status);
        }
    }

    #[test]
    fn test_client_errors_do_not_retry() {
        for status in [400, 401, 403, 404] {
            let error = GenerationError::Api {
                status,
                message: "rejected".to_string(),
            };
            assert!(!is_transient(&error), "status {} should not retry", status);
        }
    }

    #[test]
    fn test_new_rejects_blank_key() {
        let config = GeminiConfig {
            api_key: "  ".to_string(),
            model: "gemini-1.5-flash".to_string(),
        };
        assert!(matches!(
            GeminiClient::new(&config, &GenerationSettings::default()),
            Err(GenerationError::Config(_))
        ));
    }
}
