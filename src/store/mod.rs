//! Storage seams used by the generation pipeline. `db::PgStore` is the
//! production implementation; `memory::MemoryStore` keeps everything in
//! process.

pub mod memory;

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
use uuid::Uuid;

pub trait ArticleStore: Send + Sync {
    /// Fails with `StoreError::SlugConflict` when the slug is taken, even if
    /// an earlier lookup said it was free.
    fn insert_post(&self, post: &Post) -> Result<Post, StoreError>;
    fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;
    fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError>;
    fn update_post(&self, post: &Post) -> Result<Post, StoreError>;
    fn posts_with_status(
        &self,
        status: PostStatus,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError>;
    /// SCHEDULED posts whose `scheduled_for` is at or before `now`.
    fn scheduled_due(&self, now: NaiveDateTime) -> Result<Vec<Post>, StoreError>;

    fn find_or_insert_category(
        &self,
        slug: &str,
        name: &str,
    ) -> Result<Category, StoreError>;
    fn link_post_to_category(&self, post: Uuid, category: Uuid) -> Result<(), StoreError>;
    fn categories_for_post(&self, post: Uuid) -> Result<Vec<Category>, StoreError>;

    fn find_or_insert_tag(&self, slug: &str, name: &str) -> Result<Tag, StoreError>;
    fn tag_post(&self, post: Uuid, tag: Uuid) -> Result<(), StoreError>;
    fn tags_for_post(&self, post: Uuid) -> Result<Vec<Tag>, StoreError>;
}

pub trait QuotaStore: Send + Sync {
    fn quota(&self, day: NaiveDate, category: &str) -> Result<Option<DailyQuota>, StoreError>;
    /// Atomically adds one to `generated`, creating the row with
    /// `default_target` if needed.
    fn increment_generated(
        &self,
        day: NaiveDate,
        category: &str,
        default_target: i32,
    ) -> Result<DailyQuota, StoreError>;
    fn upsert_target(
        &self,
        day: NaiveDate,
        category: &str,
        target: i32,
    ) -> Result<DailyQuota, StoreError>;
}

pub trait VectorStore: Send + Sync {
    fn store_embedding(&self, record: &ArticleEmbedding) -> Result<(), StoreError>;
    /// Bounded candidate set for in-process ranking, newest first.
    fn candidates(
        &self,
        category: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ArticleEmbedding>, StoreError>;
}
