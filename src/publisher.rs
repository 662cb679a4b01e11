//! Persists generated articles and moves posts through the editorial
//! workflow.

use crate::{
    db::{
        categories::Category,
        posts::{Post, PostStatus},
        tags::Tag,
    },
    error::StoreError,
    generator::GeneratedArticle,
    quality::{QualityGateResult, Recommendation},
    store::ArticleStore,
    text,
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const MAX_SLUG_ATTEMPTS: usize = 3;

/// Initial status for a freshly generated post.
pub fn route_status(recommendation: Recommendation, publish_immediately: bool) -> PostStatus {
    match recommendation {
        Recommendation::Publish if publish_immediately => PostStatus::Published,
        Recommendation::NeedsRevision | Recommendation::Reject => PostStatus::InReview,
        _ => PostStatus::Draft,
    }
}

/// Moves `post` to `target`, keeping `published_at` and `scheduled_for`
/// consistent with the new status.
pub fn apply_transition(
    post: &mut Post,
    target: PostStatus,
    scheduled_for: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<(), StoreError> {
    if !post.status.can_transition_to(target) {
        return Err(StoreError::InvalidTransition {
            from: post.status,
            to: target,
        });
    }
    match target {
        PostStatus::Scheduled => match scheduled_for {
            Some(at) => post.scheduled_for = Some(at),
            None => {
                return Err(StoreError::Invalid(
                    "scheduling a post requires scheduledFor".to_string(),
                ))
            }
        },
        _ => post.scheduled_for = None,
    }
    post.published_at = match target {
        PostStatus::Published => Some(now),
        _ => None,
    };
    post.status = target;
    post.updated_at = now;
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEdit {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
}

pub struct Publisher {
    store: Arc<dyn ArticleStore>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ArticleStore>) -> Publisher {
        Publisher { store }
    }

    /// Stores a generated article with the status its quality result calls
    /// for and links it to `category`. Slug collisions are resolved by
    /// suffixing, never surfaced.
    pub fn publish_generated(
        &self,
        article: &GeneratedArticle,
        quality: &QualityGateResult,
        category: &str,
        publish_immediately: bool,
    ) -> Result<Post, StoreError> {
        let now = Utc::now().naive_utc();
        let status = route_status(quality.recommendation, publish_immediately);
        let mut notes = quality.issues.clone();
        notes.extend(quality.warnings.iter().cloned());

        let draft = Post {
            id: Uuid::new_v4(),
            slug: article.slug.clone(),
            title: article.title.clone(),
            content: article.content.clone(),
            excerpt: article.excerpt.clone(),
            content_type: article.content_type,
            keywords: article.keywords.clone(),
            meta_description: article.meta_description.clone(),
            status,
            is_ai_generated: true,
            cover_image_url: None,
            quality_score: Some(quality.overall_score),
            quality_notes: notes,
            created_at: now,
            updated_at: now,
            published_at: if status == PostStatus::Published {
                Some(now)
            } else {
                None
            },
            scheduled_for: None,
            last_refreshed_at: None,
        };
        let post = self.insert_with_unique_slug(draft)?;

        let slug = text::slugify(category);
        let slug = if slug.is_empty() { category.to_ascii_lowercase() } else { slug };
        let category = self.store.find_or_insert_category(&slug, category)?;
        self.store.link_post_to_category(post.id, category.id)?;

        log::info!(
            "Stored \"{}\" as {} ({}, score {})",
            post.title,
            post.slug,
            post.status,
            quality.overall_score
        );
        Ok(post)
    }

    fn insert_with_unique_slug(&self, mut post: Post) -> Result<Post, StoreError> {
        let base = post.slug.clone();
        let millis = post.created_at.timestamp_millis();
        if self.store.find_post_by_slug(&base)?.is_some() {
            post.slug = format!("{}-{}", base, millis);
            log::info!("Slug {} is taken, using {}", base, post.slug);
        }

        let mut attempt = 0;
        loop {
            match self.store.insert_post(&post) {
                Err(StoreError::SlugConflict(taken)) if attempt + 1 < MAX_SLUG_ATTEMPTS => {
                    attempt += 1;
                    post.slug = format!("{}-{}-{}", base, millis, attempt);
                    log::info!("Slug {} was claimed concurrently, retrying as {}", taken, post.slug);
                }
                result => return result,
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Result<Post, StoreError> {
        self.store
            .get_post(id)?
            .ok_or_else(|| StoreError::NotFound(format!("post {}", id)))
    }

    pub fn detail(&self, id: Uuid) -> Result<PostDetail, StoreError> {
        let post = self.get(id)?;
        Ok(PostDetail {
            categories: self.store.categories_for_post(id)?,
            tags: self.store.tags_for_post(id)?,
            post,
        })
    }

    pub fn review_queue(&self, status: PostStatus, limit: i64) -> Result<Vec<Post>, StoreError> {
        self.store.posts_with_status(status, limit)
    }

    pub fn transition(
        &self,
        id: Uuid,
        target: PostStatus,
        scheduled_for: Option<NaiveDateTime>,
    ) -> Result<Post, StoreError> {
        let mut post = self.get(id)?;
        let from = post.status;
        apply_transition(&mut post, target, scheduled_for, Utc::now().naive_utc())?;
        let post = self.store.update_post(&post)?;
        log::info!("Post {} moved from {} to {}", post.slug, from, post.status);
        Ok(post)
    }

    /// Publishes every scheduled post whose time has come.
    pub fn publish_due(&self, now: NaiveDateTime) -> Result<Vec<Post>, StoreError> {
        let mut published = Vec::new();
        for mut post in self.store.scheduled_due(now)? {
            apply_transition(&mut post, PostStatus::Published, None, now)?;
            let post = self.store.update_post(&post)?;
            log::info!("Published scheduled post {}", post.slug);
            published.push(post);
        }
        Ok(published)
    }

    pub fn edit(&self, id: Uuid, edit: PostEdit) -> Result<Post, StoreError> {
        let mut post = self.get(id)?;
        let now = Utc::now().naive_utc();

        if let Some(title) = edit.title {
            if title.trim().is_empty() {
                return Err(StoreError::Invalid("title cannot be empty".to_string()));
            }
            post.title = title;
        }
        if let Some(content) = edit.content {
            if content != post.content {
                post.content = content;
                post.last_refreshed_at = Some(now);
            }
        }
        if let Some(excerpt) = edit.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(keywords) = edit.keywords {
            post.keywords = keywords;
        }
        if let Some(meta_description) = edit.meta_description {
            post.meta_description = meta_description;
        }
        post.updated_at = now;
        self.store.update_post(&post)
    }

    /// Attaches tags by name, creating any that do not exist yet.
    pub fn tag(&self, id: Uuid, names: &[String]) -> Result<Vec<Tag>, StoreError> {
        let post = self.get(id)?;
        for name in names {
            let name = name.trim();
            let slug = text::slugify(name);
            if slug.is_empty() {
                continue;
            }
            let tag = self.store.find_or_insert_tag(&slug, name)?;
            self.store.tag_post(post.id, tag.id)?;
        }
        self.store.tags_for_post(post.id)
    }

    pub fn set_cover_image(&self, id: Uuid, url: &str) -> Result<Post, StoreError> {
        let mut post = self.get(id)?;
        post.cover_image_url = Some(url.to_string());
        post.updated_at = Utc::now().naive_utc();
        self.store.update_post(&post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::posts::ContentType,
        providers::Usage,
        quality::{combine, FactReport, SeoReport},
        store::memory::MemoryStore,
        testing,
    };
    use chrono::Duration;

    fn article(slug: &str) -> GeneratedArticle {
        GeneratedArticle {
            title: "Chip Exports Tighten Again Across the Region".to_string(),
            content: "# Chip Exports Tighten Again Across the Region\n\nBody.".to_string(),
            excerpt: "Body.".to_string(),
            slug: slug.to_string(),
            keywords: vec!["chip".to_string()],
            meta_description: "Body.".to_string(),
            content_type: ContentType::News,
            usage: Usage::default(),
        }
    }

    fn quality(seo: i32, fact: i32) -> QualityGateResult {
        combine(
            SeoReport { score: seo, issues: vec![] },
            FactReport { score: fact, claims: vec![] },
        )
    }

    #[test]
    fn routing_table() {
        use Recommendation::*;
        assert_eq!(route_status(Publish, true), PostStatus::Published);
        assert_eq!(route_status(Publish, false), PostStatus::Draft);
        assert_eq!(route_status(Review, true), PostStatus::Draft);
        assert_eq!(route_status(NeedsRevision, true), PostStatus::InReview);
        assert_eq!(route_status(Reject, false), PostStatus::InReview);
    }

    #[test]
    fn immediate_publish_sets_published_at() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Publisher::new(store.clone());
        let before = Utc::now().naive_utc();
        let post = publisher
            .publish_generated(&article("chip-exports"), &quality(100, 100), "NEWS", true)
            .unwrap();
        assert_eq!(post.status, PostStatus::Published);
        assert!(post.is_ai_generated);
        assert!(post.published_at.unwrap() >= before);
        assert_eq!(post.quality_score, Some(100));

        let categories = store.categories_for_post(post.id).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].slug, "news");
        assert_eq!(categories[0].name, "NEWS");
    }

    #[test]
    fn good_score_without_flag_stays_draft() {
        let publisher = Publisher::new(Arc::new(MemoryStore::new()));
        let post = publisher
            .publish_generated(&article("chip-exports"), &quality(100, 100), "NEWS", false)
            .unwrap();
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.published_at, None);
    }

    #[test]
    fn rejected_content_goes_to_review_with_notes() {
        let publisher = Publisher::new(Arc::new(MemoryStore::new()));
        let mut gate = quality(20, 20);
        gate.issues.push("Too few headings (1, minimum 3)".to_string());
        gate.warnings.push("Unsourced statistic: 40%".to_string());
        let post = publisher
            .publish_generated(&article("weak"), &gate, "NEWS", true)
            .unwrap();
        assert_eq!(post.status, PostStatus::InReview);
        assert_eq!(
            post.quality_notes,
            vec!["Too few headings (1, minimum 3)", "Unsourced statistic: 40%"]
        );
    }

    #[test]
    fn colliding_slug_is_suffixed() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Publisher::new(store.clone());
        let first = publisher
            .publish_generated(&article("chip-exports"), &quality(70, 70), "NEWS", false)
            .unwrap();
        let second = publisher
            .publish_generated(&article("chip-exports"), &quality(70, 70), "NEWS", false)
            .unwrap();
        assert_eq!(first.slug, "chip-exports");
        assert_ne!(second.slug, first.slug);
        assert!(second.slug.starts_with("chip-exports-"));
        assert_eq!(publisher.get(first.id).unwrap().slug, first.slug);
        assert_eq!(publisher.get(second.id).unwrap().slug, second.slug);
    }

    #[test]
    fn conflict_at_insert_time_is_retried() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Publisher::new(Arc::new(testing::BlindSlugStore(store.clone())));
        for _ in 0..3 {
            publisher
                .publish_generated(&article("race"), &quality(70, 70), "NEWS", false)
                .unwrap();
        }
        assert_eq!(store.post_count().unwrap(), 3);
    }

    #[test]
    fn transitions_keep_timestamps_consistent() {
        let publisher = Publisher::new(Arc::new(MemoryStore::new()));
        let post = publisher
            .publish_generated(&article("flow"), &quality(70, 70), "NEWS", false)
            .unwrap();
        assert!(matches!(
            publisher.transition(post.id, PostStatus::Scheduled, None),
            Err(StoreError::Invalid(_))
        ));

        let at = Utc::now().naive_utc() + Duration::hours(1);
        let scheduled = publisher
            .transition(post.id, PostStatus::Scheduled, Some(at))
            .unwrap();
        assert_eq!(scheduled.scheduled_for, Some(at));

        let published = publisher.transition(post.id, PostStatus::Published, None).unwrap();
        assert!(published.published_at.is_some());
        assert_eq!(published.scheduled_for, None);

        assert!(matches!(
            publisher.transition(post.id, PostStatus::Draft, None),
            Err(StoreError::InvalidTransition { .. })
        ));
        let archived = publisher.transition(post.id, PostStatus::Archived, None).unwrap();
        assert_eq!(archived.published_at, None);
    }

    #[test]
    fn sweep_publishes_only_due_posts() {
        let publisher = Publisher::new(Arc::new(MemoryStore::new()));
        let now = Utc::now().naive_utc();
        let due = publisher
            .publish_generated(&article("due"), &quality(70, 70), "NEWS", false)
            .unwrap();
        let later = publisher
            .publish_generated(&article("later"), &quality(70, 70), "NEWS", false)
            .unwrap();
        publisher
            .transition(due.id, PostStatus::Scheduled, Some(now - Duration::minutes(1)))
            .unwrap();
        publisher
            .transition(later.id, PostStatus::Scheduled, Some(now + Duration::days(1)))
            .unwrap();

        let published = publisher.publish_due(now).unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, due.id);
        assert_eq!(published[0].published_at, Some(now));
        assert_eq!(publisher.get(later.id).unwrap().status, PostStatus::Scheduled);
    }

    #[test]
    fn edits_and_tags() {
        let publisher = Publisher::new(Arc::new(MemoryStore::new()));
        let post = publisher
            .publish_generated(&article("edit-me"), &quality(70, 70), "NEWS", false)
            .unwrap();

        let edited = publisher
            .edit(
                post.id,
                PostEdit {
                    meta_description: Some("Sharper meta".to_string()),
                    ..PostEdit::default()
                },
            )
            .unwrap();
        assert_eq!(edited.meta_description, "Sharper meta");
        assert_eq!(edited.last_refreshed_at, None);

        let edited = publisher
            .edit(
                post.id,
                PostEdit {
                    content: Some("# New\n\nRewritten.".to_string()),
                    ..PostEdit::default()
                },
            )
            .unwrap();
        assert!(edited.last_refreshed_at.is_some());

        let tags = publisher
            .tag(post.id, &["Semiconductors".to_string(), " ".to_string(), "Semiconductors".to_string()])
            .unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "semiconductors");

        let detail = publisher.detail(post.id).unwrap();
        assert_eq!(detail.tags.len(), 1);
        assert_eq!(detail.categories.len(), 1);

        assert!(matches!(
            publisher.get(Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
    }
}
