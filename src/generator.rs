//! Turns a topic into a markdown article plus derived metadata.

use crate::{
    db::posts::ContentType,
    error::ProviderError,
    extract,
    prompts,
    providers::{GenerationRequest, TextProvider, Usage},
    text,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const EXCERPT_CHARS: usize = 160;
pub const KEYWORD_LIMIT: usize = 10;
const TOPIC_MAX_TOKENS: u32 = 100;
const SEO_MAX_TOKENS: u32 = 500;
const SEO_CONTENT_CHARS: usize = 3000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub keywords: Vec<String>,
    pub meta_description: String,
    pub content_type: ContentType,
    pub usage: Usage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeoMetadata {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    meta_description: String,
}

pub struct ArticleGenerator {
    provider: Arc<dyn TextProvider>,
    temperature: f32,
    max_tokens: u32,
    seo_via_llm: bool,
}

impl ArticleGenerator {
    pub fn new(provider: Arc<dyn TextProvider>) -> ArticleGenerator {
        ArticleGenerator {
            provider,
            temperature: 0.7,
            max_tokens: 4096,
            seo_via_llm: false,
        }
    }

    pub fn with_seo_via_llm(mut self, enabled: bool) -> Self {
        self.seo_via_llm = enabled;
        self
    }

    /// Provider failures are returned as-is; retrying is up to the caller.
    pub fn generate_article(
        &self,
        content_type: ContentType,
        topic: &str,
        context: Option<&str>,
    ) -> Result<GeneratedArticle, ProviderError> {
        let request = GenerationRequest::new(prompts::article_prompt(content_type, topic, context))
            .with_system(prompts::system_prompt(content_type))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        let generation = self.provider.generate(&request)?;

        let mut article = parse_article(&generation.text, topic, content_type);
        article.usage = generation.usage;

        if self.seo_via_llm {
            self.apply_llm_seo(&mut article)?;
        }
        Ok(article)
    }

    /// One concrete topic for `category`; falls back to a generic topic when
    /// the reply is empty.
    pub fn suggest_topic(
        &self,
        category: &str,
        content_type: ContentType,
    ) -> Result<(String, Usage), ProviderError> {
        let request = GenerationRequest::new(prompts::topic_prompt(category, content_type))
            .with_system(prompts::TOPIC_SYSTEM)
            .with_temperature(0.9)
            .with_max_tokens(TOPIC_MAX_TOKENS);
        let generation = self.provider.generate(&request)?;
        let topic = clean_topic(&generation.text)
            .unwrap_or_else(|| format!("Latest developments in {}", category));
        Ok((topic, generation.usage))
    }

    fn apply_llm_seo(&self, article: &mut GeneratedArticle) -> Result<(), ProviderError> {
        let request = GenerationRequest::new(prompts::seo_prompt(
            &article.title,
            text::prefix_chars(&article.content, SEO_CONTENT_CHARS),
        ))
        .with_system(prompts::SEO_SYSTEM)
        .with_temperature(0.3)
        .with_max_tokens(SEO_MAX_TOKENS);
        let generation = self.provider.generate(&request)?;
        article.usage.absorb(generation.usage);

        if let Some(seo) = extract::parse_first::<SeoMetadata>(&generation.text) {
            let keywords: Vec<String> = seo
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .take(KEYWORD_LIMIT)
                .collect();
            if !keywords.is_empty() {
                article.keywords = keywords;
            }
            let meta = seo.meta_description.trim();
            if !meta.is_empty() {
                article.meta_description = meta.to_string();
            }
        } else {
            log::debug!("Keeping heuristic SEO metadata for {}", article.slug);
        }
        Ok(())
    }
}

fn clean_topic(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
    let unquote = |s: &str| s.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string();
    let line = unquote(line.trim_start_matches(|c: char| c == '#' || c == '-' || c == '*'));
    let line = unquote(line.trim_start_matches("Topic:"));
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Derives title, excerpt, slug and keywords from raw model output. Never
/// fails: a missing heading falls back to `topic`.
pub fn parse_article(raw: &str, topic: &str, content_type: ContentType) -> GeneratedArticle {
    let content = raw.trim().to_string();
    let (title, body_start) = match text::extract_title(&content) {
        Some((line, title)) => (title, line + 1),
        None => (topic.to_string(), 0),
    };
    let excerpt = text::derive_excerpt(&content, body_start, EXCERPT_CHARS);

    let mut slug = text::slugify(&title);
    if slug.is_empty() {
        slug = text::slugify(topic);
    }
    if slug.is_empty() {
        slug = "article".to_string();
    }

    let keywords = text::extract_keywords(
        &format!("{} {} {}", topic, title, content),
        KEYWORD_LIMIT,
    );

    GeneratedArticle {
        meta_description: excerpt.clone(),
        title,
        content,
        excerpt,
        slug,
        keywords,
        content_type,
        usage: Usage::default(),
    }
}
