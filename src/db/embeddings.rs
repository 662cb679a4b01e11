use crate::schema::article_embeddings;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Queryable,
    Insertable,
    Identifiable,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
)]
#[table_name = "article_embeddings"]
pub struct ArticleEmbedding {
    pub id: Uuid,
    pub post: Option<Uuid>,
    pub category: Option<String>,
    pub title: String,
    pub excerpt: String,
    /// Leading slice of the article body, enough for a prompt snippet
    pub content: String,
    pub embedding: Vec<f32>,
    pub created_at: NaiveDateTime,
}

pub fn insert(
    record: &ArticleEmbedding,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::insert_into(article_embeddings::table)
        .values(record)
        .execute(connection)
}

/// Most recent embeddings, optionally restricted to one category. Ranking
/// happens in the caller.
pub fn recent(
    category: Option<&str>,
    limit: i64,
    connection: &PgConnection,
) -> QueryResult<Vec<ArticleEmbedding>> {
    let mut query = article_embeddings::table
        .order(article_embeddings::created_at.desc())
        .limit(limit)
        .into_boxed();
    if let Some(category) = category {
        query = query.filter(article_embeddings::category.eq(category));
    }
    query.load::<ArticleEmbedding>(connection)
}
