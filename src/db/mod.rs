#[macro_use]
mod sql_text;

pub mod categories;
pub mod editors;
pub mod embeddings;
pub mod post_categories;
pub mod posts;
pub mod quotas;
pub mod tagged_posts;
pub mod tags;
pub mod tokens;

use crate::{
    error::StoreError,
    store::{ArticleStore, QuotaStore, VectorStore},
};
use categories::Category;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::{
    pg::PgConnection,
    result::{DatabaseErrorKind, Error as DieselError},
};
use embeddings::ArticleEmbedding;
use posts::{Post, PostStatus};
use quotas::DailyQuota;
use r2d2_diesel::ConnectionManager;
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
    Outcome, State,
};
use std::ops::Deref;
use tags::Tag;
use uuid::Uuid;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;
type PooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

pub fn init_pool(database_url: &str) -> Result<Pool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder().build(manager)
}

/// Request guard handing a route one pooled connection.
pub struct DbConn(pub PooledConnection);

impl<'a, 'r> FromRequest<'a, 'r> for DbConn {
    type Error = ();

    fn from_request(request: &'a Request<'r>) -> request::Outcome<DbConn, ()> {
        let pool = request.guard::<State<Pool>>()?;
        match pool.get() {
            Ok(conn) => Outcome::Success(DbConn(conn)),
            Err(e) => {
                log::error!("{}", e);
                Outcome::Failure((Status::ServiceUnavailable, ()))
            }
        }
    }
}

impl Deref for DbConn {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Postgres-backed article, quota and vector store.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> PgStore {
        PgStore { pool }
    }

    fn conn(&self) -> Result<PooledConnection, StoreError> {
        Ok(self.pool.get()?)
    }
}

impl ArticleStore for PgStore {
    fn insert_post(&self, post: &Post) -> Result<Post, StoreError> {
        let conn = self.conn()?;
        posts::insert(post, &conn).map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                StoreError::SlugConflict(post.slug.clone())
            }
            e => StoreError::Database(e),
        })
    }

    fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let conn = self.conn()?;
        match posts::get(id, &conn) {
            Ok(post) => Ok(Some(post)),
            Err(DieselError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let conn = self.conn()?;
        Ok(posts::find_by_slug(slug, &conn)?)
    }

    fn update_post(&self, post: &Post) -> Result<Post, StoreError> {
        let conn = self.conn()?;
        match posts::update(post, &conn) {
            Ok(post) => Ok(post),
            Err(DieselError::NotFound) => Err(StoreError::NotFound(post.id.to_string())),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(StoreError::SlugConflict(post.slug.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn posts_with_status(
        &self,
        status: PostStatus,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn()?;
        Ok(posts::all_with_status(status, limit, &conn)?)
    }

    fn scheduled_due(&self, now: NaiveDateTime) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn()?;
        Ok(posts::scheduled_due(now, &conn)?)
    }

    fn find_or_insert_category(
        &self,
        slug: &str,
        name: &str,
    ) -> Result<Category, StoreError> {
        let conn = self.conn()?;
        Ok(categories::find_or_insert(slug, name, &conn)?)
    }

    fn link_post_to_category(&self, post: Uuid, category: Uuid) -> Result<(), StoreError> {
        let conn = self.conn()?;
        post_categories::link(post, category, &conn)?;
        Ok(())
    }

    fn categories_for_post(&self, post: Uuid) -> Result<Vec<Category>, StoreError> {
        let conn = self.conn()?;
        Ok(categories::all_for_post(post, &conn)?)
    }

    fn find_or_insert_tag(&self, slug: &str, name: &str) -> Result<Tag, StoreError> {
        let conn = self.conn()?;
        Ok(tags::find_or_insert(slug, name, &conn)?)
    }

    fn tag_post(&self, post: Uuid, tag: Uuid) -> Result<(), StoreError> {
        let conn = self.conn()?;
        tagged_posts::link(tag, post, &conn)?;
        Ok(())
    }

    fn tags_for_post(&self, post: Uuid) -> Result<Vec<Tag>, StoreError> {
        let conn = self.conn()?;
        Ok(tags::all_for_post(post, &conn)?)
    }
}

impl QuotaStore for PgStore {
    fn quota(&self, day: NaiveDate, category: &str) -> Result<Option<DailyQuota>, StoreError> {
        let conn = self.conn()?;
        Ok(quotas::get(day, category, &conn)?)
    }

    fn increment_generated(
        &self,
        day: NaiveDate,
        category: &str,
        default_target: i32,
    ) -> Result<DailyQuota, StoreError> {
        let conn = self.conn()?;
        Ok(quotas::increment(day, category, default_target, &conn)?)
    }

    fn upsert_target(
        &self,
        day: NaiveDate,
        category: &str,
        target: i32,
    ) -> Result<DailyQuota, StoreError> {
        let conn = self.conn()?;
        Ok(quotas::set_target(day, category, target, &conn)?)
    }
}

impl VectorStore for PgStore {
    fn store_embedding(&self, record: &ArticleEmbedding) -> Result<(), StoreError> {
        let conn = self.conn()?;
        embeddings::insert(record, &conn)?;
        Ok(())
    }

    fn candidates(
        &self,
        category: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ArticleEmbedding>, StoreError> {
        let conn = self.conn()?;
        Ok(embeddings::recent(category, limit, &conn)?)
    }
}
