use super::{ArticleStore, QuotaStore, VectorStore};
use crate::{
    db::{
        categories::Category,
        embeddings::ArticleEmbedding,
        posts::{Post, PostStatus},
        quotas::DailyQuota,
        tags::Tag,
    },
    error::StoreError,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

/// Process-local store. Every operation holds one lock for its whole
/// duration, which gives the same atomicity the database provides for slug
/// uniqueness and quota increments.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    posts: Vec<Post>,
    categories: Vec<Category>,
    post_categories: Vec<(Uuid, Uuid)>,
    tags: Vec<Tag>,
    tagged_posts: Vec<(Uuid, Uuid)>,
    quotas: HashMap<(NaiveDate, String), DailyQuota>,
    embeddings: Vec<ArticleEmbedding>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn post_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.posts.len())
    }
}

impl ArticleStore for MemoryStore {
    fn insert_post(&self, post: &Post) -> Result<Post, StoreError> {
        let mut inner = self.lock()?;
        if inner.posts.iter().any(|p| p.slug == post.slug) {
            return Err(StoreError::SlugConflict(post.slug.clone()));
        }
        inner.posts.push(post.clone());
        Ok(post.clone())
    }

    fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.lock()?.posts.iter().find(|p| p.id == id).cloned())
    }

    fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.lock()?.posts.iter().find(|p| p.slug == slug).cloned())
    }

    fn update_post(&self, post: &Post) -> Result<Post, StoreError> {
        let mut inner = self.lock()?;
        if inner
            .posts
            .iter()
            .any(|p| p.slug == post.slug && p.id != post.id)
        {
            return Err(StoreError::SlugConflict(post.slug.clone()));
        }
        match inner.posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(post.clone())
            }
            None => Err(StoreError::NotFound(post.id.to_string())),
        }
    }

    fn posts_with_status(
        &self,
        status: PostStatus,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError> {
        let inner = self.lock()?;
        let mut posts: Vec<Post> = inner
            .posts
            .iter()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }

    fn scheduled_due(&self, now: NaiveDateTime) -> Result<Vec<Post>, StoreError> {
        let inner = self.lock()?;
        let mut due: Vec<Post> = inner
            .posts
            .iter()
            .filter(|p| p.status == PostStatus::Scheduled)
            .filter(|p| p.scheduled_for.map_or(false, |at| at <= now))
            .cloned()
            .collect();
        due.sort_by_key(|p| p.scheduled_for);
        Ok(due)
    }

    fn find_or_insert_category(
        &self,
        slug: &str,
        name: &str,
    ) -> Result<Category, StoreError> {
        let mut inner = self.lock()?;
        if let Some(category) = inner.categories.iter().find(|c| c.slug == slug) {
            return Ok(category.clone());
        }
        let category = Category {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
        };
        inner.categories.push(category.clone());
        Ok(category)
    }

    fn link_post_to_category(&self, post: Uuid, category: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.post_categories.contains(&(post, category)) {
            inner.post_categories.push((post, category));
        }
        Ok(())
    }

    fn categories_for_post(&self, post: Uuid) -> Result<Vec<Category>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .post_categories
            .iter()
            .filter(|(p, _)| *p == post)
            .filter_map(|(_, c)| inner.categories.iter().find(|cat| cat.id == *c))
            .cloned()
            .collect())
    }

    fn find_or_insert_tag(&self, slug: &str, name: &str) -> Result<Tag, StoreError> {
        let mut inner = self.lock()?;
        if let Some(tag) = inner.tags.iter().find(|t| t.slug == slug) {
            return Ok(tag.clone());
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
        };
        inner.tags.push(tag.clone());
        Ok(tag)
    }

    fn tag_post(&self, post: Uuid, tag: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.tagged_posts.contains(&(post, tag)) {
            inner.tagged_posts.push((post, tag));
        }
        Ok(())
    }

    fn tags_for_post(&self, post: Uuid) -> Result<Vec<Tag>, StoreError> {
        let inner = self.lock()?;
        let mut tags: Vec<Tag> = inner
            .tagged_posts
            .iter()
            .filter(|(p, _)| *p == post)
            .filter_map(|(_, t)| inner.tags.iter().find(|tag| tag.id == *t))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

impl QuotaStore for MemoryStore {
    fn quota(&self, day: NaiveDate, category: &str) -> Result<Option<DailyQuota>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.quotas.get(&(day, category.to_string())).cloned())
    }

    fn increment_generated(
        &self,
        day: NaiveDate,
        category: &str,
        default_target: i32,
    ) -> Result<DailyQuota, StoreError> {
        let mut inner = self.lock()?;
        let quota = inner
            .quotas
            .entry((day, category.to_string()))
            .or_insert_with(|| DailyQuota {
                day,
                category: category.to_string(),
                generated: 0,
                target: default_target,
            });
        quota.generated += 1;
        Ok(quota.clone())
    }

    fn upsert_target(
        &self,
        day: NaiveDate,
        category: &str,
        target: i32,
    ) -> Result<DailyQuota, StoreError> {
        let mut inner = self.lock()?;
        let quota = inner
            .quotas
            .entry((day, category.to_string()))
            .or_insert_with(|| DailyQuota {
                day,
                category: category.to_string(),
                generated: 0,
                target,
            });
        quota.target = target;
        Ok(quota.clone())
    }
}

impl VectorStore for MemoryStore {
    fn store_embedding(&self, record: &ArticleEmbedding) -> Result<(), StoreError> {
        self.lock()?.embeddings.push(record.clone());
        Ok(())
    }

    fn candidates(
        &self,
        category: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ArticleEmbedding>, StoreError> {
        let inner = self.lock()?;
        let mut found: Vec<ArticleEmbedding> = inner
            .embeddings
            .iter()
            .filter(|e| category.map_or(true, |c| e.category.as_deref() == Some(c)))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd(2024, 3, 1)
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store.increment_generated(day(), "NEWS", 5).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let quota = store.quota(day(), "NEWS").unwrap().unwrap();
        assert_eq!(quota.generated, 200);
        assert_eq!(quota.target, 5);
    }

    #[test]
    fn upsert_target_keeps_generated() {
        let store = MemoryStore::new();
        store.increment_generated(day(), "REVIEW", 5).unwrap();
        store.increment_generated(day(), "REVIEW", 5).unwrap();
        let quota = store.upsert_target(day(), "REVIEW", 9).unwrap();
        assert_eq!(quota.generated, 2);
        assert_eq!(quota.target, 9);
    }

    #[test]
    fn category_links_are_idempotent() {
        let store = MemoryStore::new();
        let category = store.find_or_insert_category("news", "NEWS").unwrap();
        let again = store.find_or_insert_category("news", "News").unwrap();
        assert_eq!(category.id, again.id);

        let post = Uuid::new_v4();
        store.link_post_to_category(post, category.id).unwrap();
        store.link_post_to_category(post, category.id).unwrap();
        assert_eq!(store.categories_for_post(post).unwrap(), vec![category]);
    }
}
