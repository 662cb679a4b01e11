//! Daily generation run: picks categories by quota and takes each article
//! through retrieval, generation, the quality gate and publication.

use crate::{
    config::Config,
    db::posts::{ContentType, PostStatus},
    error::{PipelineError, StoreError},
    generator::ArticleGenerator,
    providers::{self, ImageProvider, Usage},
    publisher::Publisher,
    quality::{QualityGate, Recommendation},
    quota::{CategoryQuota, QuotaTracker},
    retriever::ContextRetriever,
    store::{ArticleStore, QuotaStore, VectorStore},
};
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunOptions {
    pub max_articles: usize,
    /// Explicit categories, in order. Empty means "whatever needs content".
    pub categories: Vec<String>,
    /// Fixed topic for every article; suggested per article when unset.
    pub topic: Option<String>,
    pub publish_immediately: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_articles: 5,
            categories: Vec::new(),
            topic: None,
            publish_immediately: false,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &Config) -> RunOptions {
        RunOptions {
            max_articles: config.max_articles_per_run,
            publish_immediately: config.publish_immediately,
            ..RunOptions::default()
        }
    }
}

/// Run request as posted to the API. Omitted fields fall back to the
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunRequest {
    pub max_articles: Option<usize>,
    pub categories: Option<Vec<String>>,
    pub topic: Option<String>,
    pub publish_immediately: Option<bool>,
}

impl RunRequest {
    pub fn into_options(self, defaults: &RunOptions) -> RunOptions {
        RunOptions {
            max_articles: self.max_articles.unwrap_or(defaults.max_articles),
            categories: self.categories.unwrap_or_else(|| defaults.categories.clone()),
            topic: self.topic.or_else(|| defaults.topic.clone()),
            publish_immediately: self
                .publish_immediately
                .unwrap_or(defaults.publish_immediately),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub per_category_cap: usize,
    pub delay: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Settings {
    pub fn from_config(config: &Config) -> Settings {
        Settings {
            per_category_cap: config.per_category_cap,
            delay: config.generation_delay,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleOutcome {
    pub category: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArticleOutcome {
    fn failed(category: &str, error: &PipelineError) -> ArticleOutcome {
        ArticleOutcome {
            category: category.to_string(),
            success: false,
            post_id: None,
            title: None,
            slug: None,
            status: None,
            recommendation: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub generated: usize,
    pub results: Vec<ArticleOutcome>,
    pub categories_processed: Vec<String>,
    pub quotas: Vec<CategoryQuota>,
    pub usage: Usage,
    pub cancelled: bool,
}

pub struct Orchestrator {
    generator: ArticleGenerator,
    gate: QualityGate,
    retriever: ContextRetriever,
    publisher: Publisher,
    quota: QuotaTracker,
    images: Option<Arc<dyn ImageProvider>>,
    settings: Settings,
    defaults: RunOptions,
    cancelled: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        generator: ArticleGenerator,
        gate: QualityGate,
        retriever: ContextRetriever,
        publisher: Publisher,
        quota: QuotaTracker,
        settings: Settings,
    ) -> Orchestrator {
        Orchestrator {
            generator,
            gate,
            retriever,
            publisher,
            quota,
            images: None,
            settings,
            defaults: RunOptions::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_images(mut self, images: Option<Arc<dyn ImageProvider>>) -> Self {
        self.images = images;
        self
    }

    pub fn with_defaults(mut self, defaults: RunOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Wires providers and one store implementing every storage seam.
    pub fn from_config<S>(config: &Config, store: Arc<S>) -> crate::Result<Orchestrator>
    where
        S: ArticleStore + QuotaStore + VectorStore + 'static,
    {
        let text = providers::text_provider(config)?;
        let embedder = providers::embedding_provider(config)?;
        let images = providers::image_provider(config)?;

        let orchestrator = Orchestrator::new(
            ArticleGenerator::new(text.clone()).with_seo_via_llm(config.seo_via_llm),
            QualityGate::new(text),
            ContextRetriever::new(embedder, store.clone()),
            Publisher::new(store.clone()),
            QuotaTracker::new(store, config.categories.clone(), config.daily_target),
            Settings::from_config(config),
        )
        .with_images(images)
        .with_defaults(RunOptions::from_config(config));
        Ok(orchestrator)
    }

    /// Setting the flag stops a run before its next article.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Options used for whatever a run request leaves out.
    pub fn default_options(&self) -> &RunOptions {
        &self.defaults
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Runs until `max_articles` succeed or the candidate categories are
    /// exhausted. Individual article failures are recorded, not returned. A
    /// quota read failure mid-run stops the loop and is recorded too; only a
    /// failure to pick the categories in the first place is an error. The
    /// cancel flag is cleared however the run ends.
    pub fn run(&self, options: &RunOptions) -> Result<RunReport, StoreError> {
        let report = self.run_categories(options);
        self.cancelled.store(false, Ordering::SeqCst);
        report
    }

    fn run_categories(&self, options: &RunOptions) -> Result<RunReport, StoreError> {
        let categories = if options.categories.is_empty() {
            self.quota.categories_needing_content()?
        } else {
            options.categories.clone()
        };
        log::info!(
            "Starting generation run: up to {} articles across {:?}",
            options.max_articles,
            categories
        );

        let mut generated = 0;
        let mut results = Vec::new();
        let mut processed = Vec::new();
        let mut usage = Usage::default();
        let mut cancelled = false;

        'categories: for category in &categories {
            if generated >= options.max_articles {
                break;
            }
            let remaining = match self.quota.remaining_quota(category) {
                Ok(quota) => quota.remaining,
                Err(e) => {
                    log::error!("[{}] could not read quota, stopping run: {}", category, e);
                    results.push(ArticleOutcome::failed(category, &PipelineError::Store(e)));
                    break;
                }
            };
            if remaining <= 0 {
                log::debug!("Skipping {}: daily quota reached", category);
                continue;
            }
            let batch = (remaining as usize)
                .min(options.max_articles - generated)
                .min(self.settings.per_category_cap);
            processed.push(category.clone());

            for _ in 0..batch {
                if self.cancelled.load(Ordering::SeqCst) {
                    cancelled = true;
                    break 'categories;
                }
                if !results.is_empty() && self.settings.delay > Duration::from_millis(0) {
                    thread::sleep(self.settings.delay);
                }

                let outcome = match self.generate_with_retry(category, options, &mut usage) {
                    Ok(outcome) => {
                        generated += 1;
                        log::info!(
                            "[{}] generated \"{}\"",
                            category,
                            outcome.title.as_deref().unwrap_or_default()
                        );
                        outcome
                    }
                    Err(e) => {
                        log::error!("[{}] article failed: {}", category, e);
                        ArticleOutcome::failed(category, &e)
                    }
                };
                results.push(outcome);
            }
        }

        let quotas = self.quota.all_category_quotas().unwrap_or_else(|e| {
            log::warn!("Could not read quotas for the run report: {}", e);
            Vec::new()
        });
        let report = RunReport {
            generated,
            results,
            categories_processed: processed,
            quotas,
            usage,
            cancelled,
        };
        log::info!(
            "Generation run finished: {} of {} attempted articles succeeded{}",
            report.generated,
            report.results.len(),
            if cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    fn generate_with_retry(
        &self,
        category: &str,
        options: &RunOptions,
        usage: &mut Usage,
    ) -> Result<ArticleOutcome, PipelineError> {
        let mut backoff = self.settings.retry_backoff;
        let mut attempt = 0;
        loop {
            match self.generate_one(category, options, usage) {
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    log::warn!(
                        "[{}] transient failure ({}), retry {} of {} in {:?}",
                        category,
                        e,
                        attempt,
                        self.settings.max_retries,
                        backoff
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                }
                result => return result,
            }
        }
    }

    fn generate_one(
        &self,
        category: &str,
        options: &RunOptions,
        usage: &mut Usage,
    ) -> Result<ArticleOutcome, PipelineError> {
        let content_type = ContentType::for_category(category);
        let topic = match options.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(topic) => topic.to_string(),
            None => {
                let (topic, spent) = self.generator.suggest_topic(category, content_type)?;
                usage.absorb(spent);
                topic
            }
        };

        let context = self.retriever.get_rag_context(&topic, Some(category));
        let context = Some(context.as_str()).filter(|c| !c.is_empty());
        let article = self.generator.generate_article(content_type, &topic, context)?;
        usage.absorb(article.usage);

        let (quality, spent) = self.gate.evaluate(
            &article.title,
            &article.content,
            Some(&article.meta_description),
        )?;
        usage.absorb(spent);

        let mut post = self.publisher.publish_generated(
            &article,
            &quality,
            category,
            options.publish_immediately,
        )?;
        self.quota.record_generation(category)?;

        if let Err(e) = self.retriever.index_post(&post, Some(category)) {
            log::warn!("Could not index {}: {}", post.slug, e);
        }
        if let Some(images) = &self.images {
            match images.cover_image(&post.title) {
                Ok(Some(url)) => match self.publisher.set_cover_image(post.id, &url) {
                    Ok(updated) => post = updated,
                    Err(e) => log::warn!("Could not store cover for {}: {}", post.slug, e),
                },
                Ok(None) => log::debug!("No cover image found for {}", post.slug),
                Err(e) => log::warn!("Cover image lookup failed for {}: {}", post.slug, e),
            }
        }

        Ok(ArticleOutcome {
            category: category.to_string(),
            success: true,
            post_id: Some(post.id),
            title: Some(post.title),
            slug: Some(post.slug),
            status: Some(post.status),
            recommendation: Some(quality.recommendation),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ProviderError,
        prompts,
        store::memory::MemoryStore,
        testing::{self, FlakyQuotaStore, KeywordEmbedder, ScriptedProvider, StaticImages},
    };
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;

    fn settings(cap: usize, max_retries: u32) -> Settings {
        Settings {
            per_category_cap: cap,
            delay: Duration::from_millis(0),
            max_retries,
            retry_backoff: Duration::from_millis(0),
        }
    }

    fn orchestrator(
        provider: Arc<ScriptedProvider>,
        store: Arc<MemoryStore>,
        categories: &[&str],
        settings: Settings,
    ) -> Orchestrator {
        Orchestrator::new(
            ArticleGenerator::new(provider.clone()),
            QualityGate::new(provider),
            ContextRetriever::new(Arc::new(KeywordEmbedder::new(&["chip", "phone"])), store.clone()),
            Publisher::new(store.clone()),
            QuotaTracker::new(store, categories.iter().map(|c| c.to_string()).collect(), 5)
                .with_clock(|| NaiveDate::from_ymd(2024, 3, 14)),
            settings,
        )
    }

    fn good_article() -> String {
        testing::markdown_article("Chipmakers Race to Build Advanced Packaging Capacity", 4, 900, true)
    }

    #[test]
    fn last_quota_slot_is_filled_then_category_drops_out() {
        let store = Arc::new(MemoryStore::new());
        let engine = orchestrator(
            Arc::new(ScriptedProvider::articles(&good_article())),
            store.clone(),
            &["NEWS", "REVIEW"],
            settings(2, 0),
        );
        for _ in 0..4 {
            engine.quota().record_generation("NEWS").unwrap();
        }
        assert_eq!(engine.quota().remaining_quota("NEWS").unwrap().remaining, 1);

        let report = engine
            .run(&RunOptions {
                max_articles: 1,
                categories: vec!["NEWS".to_string()],
                ..RunOptions::default()
            })
            .unwrap();

        assert_eq!(report.generated, 1);
        assert_eq!(report.categories_processed, vec!["NEWS"]);
        let news = engine.quota().remaining_quota("NEWS").unwrap();
        assert_eq!((news.generated, news.remaining), (5, 0));
        assert_eq!(engine.quota().categories_needing_content().unwrap(), vec!["REVIEW"]);
        assert_eq!(report.quotas[0].quota.remaining, 0);
    }

    #[test]
    fn caps_spread_articles_across_categories() {
        let store = Arc::new(MemoryStore::new());
        let engine = orchestrator(
            Arc::new(ScriptedProvider::articles(&good_article())),
            store.clone(),
            &["NEWS", "REVIEW", "GUIDE"],
            settings(2, 0),
        );
        let report = engine.run(&RunOptions::default()).unwrap();

        assert_eq!(report.generated, 5);
        let per_category: Vec<&str> = report.results.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(per_category, vec!["NEWS", "NEWS", "REVIEW", "REVIEW", "GUIDE"]);
        assert_eq!(report.categories_processed, vec!["NEWS", "REVIEW", "GUIDE"]);
        assert_eq!(store.post_count().unwrap(), 5);
        assert!(report.usage.output_tokens > 0);
    }

    #[test]
    fn exhausted_categories_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let engine = orchestrator(
            Arc::new(ScriptedProvider::articles(&good_article())),
            store,
            &["NEWS", "REVIEW"],
            settings(3, 0),
        );
        engine.quota().set_daily_target("NEWS", 1).unwrap();
        engine.quota().record_generation("NEWS").unwrap();

        let report = engine
            .run(&RunOptions {
                categories: vec!["NEWS".to_string(), "REVIEW".to_string()],
                ..RunOptions::default()
            })
            .unwrap();
        assert_eq!(report.categories_processed, vec!["REVIEW"]);
        assert_eq!(report.generated, 3);
    }

    #[test]
    fn one_failure_does_not_stop_the_run() {
        let article = good_article();
        let article_calls = AtomicUsize::new(0);
        let provider = Arc::new(ScriptedProvider::new(move |request| {
            match request.system_prompt.as_deref() {
                Some(prompts::TOPIC_SYSTEM) => Ok("Chip export controls".to_string()),
                Some(prompts::FACT_CHECK_SYSTEM) => Ok("{\"accuracyScore\": 90}".to_string()),
                _ => {
                    if article_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ProviderError::Auth { status: 401, body: "bad key".to_string() })
                    } else {
                        Ok(article.clone())
                    }
                }
            }
        }));
        let store = Arc::new(MemoryStore::new());
        let engine = orchestrator(provider, store.clone(), &["NEWS"], settings(3, 2));

        let report = engine.run(&RunOptions { max_articles: 3, ..RunOptions::default() }).unwrap();
        assert_eq!(report.results.len(), 3);
        assert!(!report.results[0].success);
        assert!(report.results[0].error.as_deref().unwrap_or_default().contains("credentials"));
        assert!(report.results[1].success && report.results[2].success);
        assert_eq!(report.generated, 2);
        assert_eq!(store.post_count().unwrap(), 2);
        assert_eq!(engine.quota().remaining_quota("NEWS").unwrap().generated, 2);
    }

    #[test]
    fn transient_failures_are_retried() {
        let article = good_article();
        let article_calls = AtomicUsize::new(0);
        let provider = Arc::new(ScriptedProvider::new(move |request| {
            match request.system_prompt.as_deref() {
                Some(prompts::FACT_CHECK_SYSTEM) => Ok("{\"accuracyScore\": 90}".to_string()),
                Some(prompts::TOPIC_SYSTEM) => Ok("Chip export controls".to_string()),
                _ => match article_calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(ProviderError::Timeout),
                    _ => Ok(article.clone()),
                },
            }
        }));
        let engine = orchestrator(provider, Arc::new(MemoryStore::new()), &["NEWS"], settings(1, 1));
        let report = engine.run(&RunOptions { max_articles: 1, ..RunOptions::default() }).unwrap();
        assert_eq!(report.generated, 1);
        assert!(report.results[0].success);
    }

    #[test]
    fn same_topic_twice_yields_two_distinct_slugs() {
        let store = Arc::new(MemoryStore::new());
        let engine = orchestrator(
            Arc::new(ScriptedProvider::articles(&good_article())),
            store.clone(),
            &["NEWS"],
            settings(2, 0),
        );
        let report = engine
            .run(&RunOptions {
                max_articles: 2,
                topic: Some("Advanced packaging".to_string()),
                ..RunOptions::default()
            })
            .unwrap();

        assert_eq!(report.generated, 2);
        let first = report.results[0].slug.clone().unwrap_or_default();
        let second = report.results[1].slug.clone().unwrap_or_default();
        assert_eq!(first, "chipmakers-race-to-build-advanced-packaging-capacity");
        assert_ne!(first, second);
        for outcome in &report.results {
            let id = outcome.post_id.unwrap();
            assert!(store.get_post(id).unwrap().is_some());
        }
    }

    #[test]
    fn strong_articles_publish_when_asked_and_get_covers() {
        let store = Arc::new(MemoryStore::new());
        let engine = orchestrator(
            Arc::new(ScriptedProvider::articles(&good_article())),
            store.clone(),
            &["NEWS"],
            settings(1, 0),
        )
        .with_images(Some(Arc::new(StaticImages("https://img/cover.jpg"))));
        let report = engine
            .run(&RunOptions {
                max_articles: 1,
                publish_immediately: true,
                ..RunOptions::default()
            })
            .unwrap();

        let outcome = &report.results[0];
        assert_eq!(outcome.recommendation, Some(Recommendation::Publish));
        assert_eq!(outcome.status, Some(PostStatus::Published));
        let post = store.get_post(outcome.post_id.unwrap()).unwrap().unwrap();
        assert!(post.published_at.is_some());
        assert_eq!(post.cover_image_url.as_deref(), Some("https://img/cover.jpg"));
        assert_eq!(store.candidates(Some("NEWS"), 10).unwrap().len(), 1);
    }

    #[test]
    fn cancelled_run_stops_before_next_article() {
        let engine = orchestrator(
            Arc::new(ScriptedProvider::articles(&good_article())),
            Arc::new(MemoryStore::new()),
            &["NEWS"],
            settings(2, 0),
        );
        engine.cancel_handle().store(true, Ordering::SeqCst);
        let report = engine.run(&RunOptions::default()).unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
        assert!(!engine.cancel_handle().load(Ordering::SeqCst));
    }

    #[test]
    fn quota_failure_mid_run_keeps_finished_articles() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::articles(&good_article()));
        // NEWS and REVIEW each read then bump their quota; the GUIDE read fails.
        let flaky = Arc::new(FlakyQuotaStore::new(store.clone(), 4));
        let engine = Orchestrator::new(
            ArticleGenerator::new(provider.clone()),
            QualityGate::new(provider),
            ContextRetriever::new(Arc::new(KeywordEmbedder::new(&["chip"])), store.clone()),
            Publisher::new(store.clone()),
            QuotaTracker::new(flaky, vec!["NEWS".to_string()], 5),
            settings(1, 0),
        );

        let report = engine
            .run(&RunOptions {
                categories: vec!["NEWS".to_string(), "REVIEW".to_string(), "GUIDE".to_string()],
                ..RunOptions::default()
            })
            .unwrap();

        assert_eq!(report.generated, 2);
        assert_eq!(report.categories_processed, vec!["NEWS", "REVIEW"]);
        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].success && report.results[1].success);
        assert_eq!(report.results[2].category, "GUIDE");
        assert!(!report.results[2].success);
        assert!(report.results[2].error.is_some());
        assert!(report.quotas.is_empty());
        assert_eq!(store.post_count().unwrap(), 2);
    }

    #[test]
    fn failed_category_lookup_still_clears_cancel() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::articles(&good_article()));
        let engine = Orchestrator::new(
            ArticleGenerator::new(provider.clone()),
            QualityGate::new(provider),
            ContextRetriever::new(Arc::new(KeywordEmbedder::new(&["chip"])), store.clone()),
            Publisher::new(store.clone()),
            QuotaTracker::new(Arc::new(FlakyQuotaStore::new(store, 0)), vec!["NEWS".to_string()], 5),
            settings(1, 0),
        );
        engine.cancel_handle().store(true, Ordering::SeqCst);

        assert!(engine.run(&RunOptions::default()).is_err());
        assert!(!engine.cancel_handle().load(Ordering::SeqCst));
    }

    #[test]
    fn run_request_fills_gaps_from_defaults() {
        let defaults = RunOptions {
            max_articles: 12,
            publish_immediately: true,
            ..RunOptions::default()
        };
        let request: RunRequest = serde_json::from_str(r#"{"categories": ["NEWS"]}"#).unwrap();
        assert_eq!(
            request.into_options(&defaults),
            RunOptions {
                max_articles: 12,
                categories: vec!["NEWS".to_string()],
                topic: None,
                publish_immediately: true,
            }
        );

        let request: RunRequest =
            serde_json::from_str(r#"{"maxArticles": 2, "publishImmediately": false, "topic": "Chips"}"#)
                .unwrap();
        let options = request.into_options(&defaults);
        assert_eq!(options.max_articles, 2);
        assert!(!options.publish_immediately);
        assert_eq!(options.topic.as_deref(), Some("Chips"));

        let engine = orchestrator(
            Arc::new(ScriptedProvider::articles(&good_article())),
            Arc::new(MemoryStore::new()),
            &["NEWS"],
            settings(1, 0),
        )
        .with_defaults(defaults.clone());
        assert_eq!(engine.default_options(), &defaults);
    }
}
