//! Similar-article retrieval used to ground generation prompts.

use crate::{
    db::{embeddings::ArticleEmbedding, posts::Post},
    error::PipelineError,
    providers::EmbeddingProvider,
    store::VectorStore,
    text,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_TOP_K: usize = 3;
const DEFAULT_CANDIDATE_LIMIT: i64 = 200;
const SNIPPET_CHARS: usize = 600;
const STORED_CONTENT_CHARS: usize = 2000;
const EMBEDDED_CONTENT_CHARS: usize = 1500;

/// Cosine similarity of two vectors. Mismatched lengths and zero vectors
/// score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

#[derive(Debug, Clone)]
pub struct ScoredArticle {
    pub article: ArticleEmbedding,
    pub similarity: f32,
}

pub struct ContextRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
    candidate_limit: i64,
}

impl ContextRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> ContextRetriever {
        ContextRetriever {
            embedder,
            store,
            top_k: DEFAULT_TOP_K,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// The `top_k` stored articles closest to `query`, best first.
    pub fn similar_articles(
        &self,
        query: &str,
        category: Option<&str>,
    ) -> Result<Vec<ScoredArticle>, PipelineError> {
        let candidates = self.store.candidates(category, self.candidate_limit)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed(query)?;

        let mut scored: Vec<ScoredArticle> = candidates
            .into_iter()
            .map(|article| ScoredArticle {
                similarity: cosine_similarity(&query, &article.embedding),
                article,
            })
            .collect();
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.top_k);
        Ok(scored)
    }

    /// Prompt-ready grounding for `topic`. Empty when nothing similar is
    /// stored or retrieval fails; generation goes ahead without it.
    pub fn get_rag_context(&self, topic: &str, category: Option<&str>) -> String {
        match self.similar_articles(topic, category) {
            Ok(articles) => format_context(&articles),
            Err(e) => {
                log::warn!("No grounding for \"{}\": {}", topic, e);
                String::new()
            }
        }
    }

    /// Stores the embedding of a persisted post so later runs can retrieve it.
    pub fn index_post(&self, post: &Post, category: Option<&str>) -> Result<(), PipelineError> {
        let document = format!(
            "{}\n\n{}\n\n{}",
            post.title,
            post.excerpt,
            text::prefix_chars(&post.content, EMBEDDED_CONTENT_CHARS)
        );
        let embedding = self.embedder.embed(&document)?;
        self.store.store_embedding(&ArticleEmbedding {
            id: Uuid::new_v4(),
            post: Some(post.id),
            category: category.map(str::to_string),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            content: text::prefix_chars(&post.content, STORED_CONTENT_CHARS).to_string(),
            embedding,
            created_at: Utc::now().naive_utc(),
        })?;
        log::debug!("Indexed post {} for retrieval", post.slug);
        Ok(())
    }
}

pub fn format_context(articles: &[ScoredArticle]) -> String {
    articles
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            let article = &scored.article;
            format!(
                "[Reference {}] {}\nSummary: {}\nExcerpt: {}",
                i + 1,
                article.title,
                article.excerpt,
                text::truncate_chars(&article.content, SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
