//! Fakes and builders shared by unit tests. Nothing here touches the network
//! or a database.

use crate::{
    db::{
        categories::Category,
        posts::{ContentType, Post, PostStatus},
        quotas::DailyQuota,
        tags::Tag,
    },
    error::{ProviderError, StoreError},
    prompts,
    providers::{EmbeddingProvider, Generation, GenerationRequest, ImageProvider, TextProvider, Usage},
    store::{memory::MemoryStore, ArticleStore, QuotaStore},
    text,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use uuid::Uuid;

type Script = Box<dyn Fn(&GenerationRequest) -> Result<String, ProviderError> + Send + Sync>;

/// Text provider that answers from a closure and remembers every request.
pub struct ScriptedProvider {
    script: Script,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new<F>(script: F) -> ScriptedProvider
    where
        F: Fn(&GenerationRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        ScriptedProvider {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `article` to article prompts, a fixed topic to topic
    /// prompts, a 90-point fact check, and prose (no JSON) to SEO prompts.
    pub fn articles(article: &str) -> ScriptedProvider {
        let article = article.to_string();
        ScriptedProvider::new(move |request| match request.system_prompt.as_deref() {
            Some(prompts::TOPIC_SYSTEM) => Ok("Advanced chip packaging capacity".to_string()),
            Some(prompts::FACT_CHECK_SYSTEM) => Ok(
                "{\"claims\": [{\"claim\": \"TSMC leads packaging\", \"type\": \"FACT\", \
                 \"hasSource\": true, \"confidence\": \"HIGH\"}], \"accuracyScore\": 90}"
                    .to_string(),
            ),
            Some(prompts::SEO_SYSTEM) => Ok("I would suggest some keywords.".to_string()),
            _ => Ok(article.clone()),
        })
    }

    pub fn failing<F>(error: F) -> ScriptedProvider
    where
        F: Fn() -> ProviderError + Send + Sync + 'static,
    {
        ScriptedProvider::new(move |_| Err(error()))
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl TextProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let text = (self.script)(request)?;
        Ok(Generation {
            usage: Usage {
                input_tokens: text::word_count(&request.prompt) as u32,
                output_tokens: text::word_count(&text) as u32,
            },
            text,
        })
    }
}

/// One dimension per keyword, 1.0 when the lowercased text contains it.
pub struct KeywordEmbedder {
    keywords: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> KeywordEmbedder {
        KeywordEmbedder {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl EmbeddingProvider for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let text = text.to_lowercase();
        Ok(self
            .keywords
            .iter()
            .map(|k| if text.contains(k.as_str()) { 1.0 } else { 0.0 })
            .collect())
    }
}

pub struct FailingEmbedder;

impl EmbeddingProvider for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Timeout)
    }
}

pub struct StaticImages(pub &'static str);

impl ImageProvider for StaticImages {
    fn cover_image(&self, _query: &str) -> Result<Option<String>, ProviderError> {
        Ok(Some(self.0.to_string()))
    }
}

/// Store whose slug lookup never sees existing posts, so every collision
/// surfaces at insert time the way a concurrent writer would cause.
pub struct BlindSlugStore(pub Arc<MemoryStore>);

impl ArticleStore for BlindSlugStore {
    fn insert_post(&self, post: &Post) -> Result<Post, StoreError> {
        self.0.insert_post(post)
    }

    fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        self.0.get_post(id)
    }

    fn find_post_by_slug(&self, _slug: &str) -> Result<Option<Post>, StoreError> {
        Ok(None)
    }

    fn update_post(&self, post: &Post) -> Result<Post, StoreError> {
        self.0.update_post(post)
    }

    fn posts_with_status(&self, status: PostStatus, limit: i64) -> Result<Vec<Post>, StoreError> {
        self.0.posts_with_status(status, limit)
    }

    fn scheduled_due(&self, now: NaiveDateTime) -> Result<Vec<Post>, StoreError> {
        self.0.scheduled_due(now)
    }

    fn find_or_insert_category(&self, slug: &str, name: &str) -> Result<Category, StoreError> {
        self.0.find_or_insert_category(slug, name)
    }

    fn link_post_to_category(&self, post: Uuid, category: Uuid) -> Result<(), StoreError> {
        self.0.link_post_to_category(post, category)
    }

    fn categories_for_post(&self, post: Uuid) -> Result<Vec<Category>, StoreError> {
        self.0.categories_for_post(post)
    }

    fn find_or_insert_tag(&self, slug: &str, name: &str) -> Result<Tag, StoreError> {
        self.0.find_or_insert_tag(slug, name)
    }

    fn tag_post(&self, post: Uuid, tag: Uuid) -> Result<(), StoreError> {
        self.0.tag_post(post, tag)
    }

    fn tags_for_post(&self, post: Uuid) -> Result<Vec<Tag>, StoreError> {
        self.0.tags_for_post(post)
    }
}

/// Quota store that answers its first `healthy_calls` calls from the inner
/// store and fails every call after that.
pub struct FlakyQuotaStore {
    inner: Arc<MemoryStore>,
    calls: AtomicUsize,
    healthy_calls: usize,
}

impl FlakyQuotaStore {
    pub fn new(inner: Arc<MemoryStore>, healthy_calls: usize) -> FlakyQuotaStore {
        FlakyQuotaStore {
            inner,
            calls: AtomicUsize::new(0),
            healthy_calls,
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.healthy_calls {
            Ok(())
        } else {
            Err(StoreError::Poisoned)
        }
    }
}

impl QuotaStore for FlakyQuotaStore {
    fn quota(&self, day: NaiveDate, category: &str) -> Result<Option<DailyQuota>, StoreError> {
        self.check()?;
        self.inner.quota(day, category)
    }

    fn increment_generated(
        &self,
        day: NaiveDate,
        category: &str,
        default_target: i32,
    ) -> Result<DailyQuota, StoreError> {
        self.check()?;
        self.inner.increment_generated(day, category, default_target)
    }

    fn upsert_target(
        &self,
        day: NaiveDate,
        category: &str,
        target: i32,
    ) -> Result<DailyQuota, StoreError> {
        self.check()?;
        self.inner.upsert_target(day, category, target)
    }
}

/// Markdown article with `headings` level-1/2 headings (the title counts as
/// one), roughly `words` words in total, and an optional bullet list. The
/// opening paragraph is long enough to serve as a meta description.
pub fn markdown_article(title: &str, headings: usize, words: usize, lists: bool) -> String {
    let mut doc = format!(
        "# {}\n\nChipmakers are racing to add advanced packaging capacity as demand for \
         accelerators keeps outpacing supply, and suppliers across the region are expanding \
         their plants to keep up with orders.\n",
        title
    );
    for section in 1..headings {
        doc.push_str(&format!(
            "\n## Section {}\n\nAnalysts expect the capacity crunch to ease slowly.\n",
            section
        ));
    }
    if lists {
        doc.push_str("\n- Packaging lines are sold out\n- New plants open next spring\n");
    }
    let missing = words.saturating_sub(text::word_count(&doc));
    if missing > 0 {
        doc.push('\n');
        doc.push_str(&vec!["capacity"; missing].join(" "));
        doc.push('\n');
    }
    doc
}

pub fn post(slug: &str, title: &str) -> Post {
    let now = Utc::now().naive_utc();
    Post {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: title.to_string(),
        content: format!("# {}\n\nExport licences are getting harder to obtain.", title),
        excerpt: "Export licences are getting harder to obtain.".to_string(),
        content_type: ContentType::News,
        keywords: vec!["exports".to_string()],
        meta_description: "Export licences are getting harder to obtain.".to_string(),
        status: PostStatus::Draft,
        is_ai_generated: true,
        cover_image_url: None,
        quality_score: None,
        quality_notes: Vec::new(),
        created_at: now,
        updated_at: now,
        published_at: None,
        scheduled_for: None,
        last_refreshed_at: None,
    }
}
