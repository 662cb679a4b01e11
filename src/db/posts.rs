use crate::schema::posts;
use chrono::NaiveDateTime;
use diesel::{prelude::*, sql_types::Text};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sql_type = "Text"]
pub enum ContentType {
    News,
    AiNews,
    Review,
    Guide,
    Comparison,
    Roundup,
    Article,
}

impl ContentType {
    pub const ALL: [ContentType; 7] = [
        ContentType::News,
        ContentType::AiNews,
        ContentType::Review,
        ContentType::Guide,
        ContentType::Comparison,
        ContentType::Roundup,
        ContentType::Article,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::News => "NEWS",
            ContentType::AiNews => "AI_NEWS",
            ContentType::Review => "REVIEW",
            ContentType::Guide => "GUIDE",
            ContentType::Comparison => "COMPARISON",
            ContentType::Roundup => "ROUNDUP",
            ContentType::Article => "ARTICLE",
        }
    }

    /// Categories named after a content type use it; anything else is a
    /// plain article.
    pub fn for_category(category: &str) -> ContentType {
        category.parse().unwrap_or(ContentType::Article)
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(&['-', ' '][..], "_");
        ContentType::ALL
            .iter()
            .find(|t| t.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown content type: {}", s))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_column!(ContentType);

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sql_type = "Text"]
pub enum PostStatus {
    Draft,
    InReview,
    Scheduled,
    Published,
    Archived,
}

impl PostStatus {
    pub const ALL: [PostStatus; 5] = [
        PostStatus::Draft,
        PostStatus::InReview,
        PostStatus::Scheduled,
        PostStatus::Published,
        PostStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "DRAFT",
            PostStatus::InReview => "IN_REVIEW",
            PostStatus::Scheduled => "SCHEDULED",
            PostStatus::Published => "PUBLISHED",
            PostStatus::Archived => "ARCHIVED",
        }
    }

    /// Editorial transitions. Staying in the same state is not a transition.
    pub fn can_transition_to(self, target: PostStatus) -> bool {
        use PostStatus::*;
        match (self, target) {
            (Draft, InReview) | (Draft, Scheduled) | (Draft, Published) | (Draft, Archived) => {
                true
            }
            (InReview, Draft)
            | (InReview, Scheduled)
            | (InReview, Published)
            | (InReview, Archived) => true,
            (Scheduled, Published) | (Scheduled, Draft) | (Scheduled, Archived) => true,
            (Published, Archived) => true,
            (Archived, Draft) => true,
            _ => false,
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(&['-', ' '][..], "_");
        PostStatus::ALL
            .iter()
            .find(|t| t.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown post status: {}", s))
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_column!(PostStatus);

#[derive(
    Queryable,
    Insertable,
    AsChangeset,
    Identifiable,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
)]
#[table_name = "posts"]
#[changeset_options(treat_none_as_null = "true")]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub content_type: ContentType,
    pub keywords: Vec<String>,
    pub meta_description: String,
    pub status: PostStatus,
    pub is_ai_generated: bool,
    pub cover_image_url: Option<String>,
    pub quality_score: Option<i32>,
    /// Quality gate issues followed by warnings
    pub quality_notes: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
    pub scheduled_for: Option<NaiveDateTime>,
    pub last_refreshed_at: Option<NaiveDateTime>,
}

pub fn get(id: Uuid, connection: &PgConnection) -> QueryResult<Post> {
    posts::table.find(id).get_result::<Post>(connection)
}

pub fn find_by_slug(
    slug: &str,
    connection: &PgConnection,
) -> QueryResult<Option<Post>> {
    posts::table
        .filter(posts::slug.eq(slug))
        .first::<Post>(connection)
        .optional()
}

pub fn all_with_status(
    status: PostStatus,
    limit: i64,
    connection: &PgConnection,
) -> QueryResult<Vec<Post>> {
    posts::table
        .filter(posts::status.eq(status))
        .order(posts::created_at.desc())
        .limit(limit)
        .load::<Post>(connection)
}

pub fn scheduled_due(
    now: NaiveDateTime,
    connection: &PgConnection,
) -> QueryResult<Vec<Post>> {
    posts::table
        .filter(posts::status.eq(PostStatus::Scheduled))
        .filter(posts::scheduled_for.le(now))
        .order(posts::scheduled_for.asc())
        .load::<Post>(connection)
}

pub fn insert(post: &Post, connection: &PgConnection) -> QueryResult<Post> {
    diesel::insert_into(posts::table)
        .values(post)
        .get_result(connection)
}

pub fn update(post: &Post, connection: &PgConnection) -> QueryResult<Post> {
    diesel::update(posts::table.find(post.id))
        .set(post)
        .get_result(connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_parse_loosely() {
        assert_eq!("ai-news".parse::<ContentType>(), Ok(ContentType::AiNews));
        assert_eq!("Review".parse::<ContentType>(), Ok(ContentType::Review));
        assert!("podcast".parse::<ContentType>().is_err());
        assert_eq!(ContentType::for_category("Gadgets"), ContentType::Article);
        assert_eq!(ContentType::for_category("ROUNDUP"), ContentType::Roundup);
    }

    #[test]
    fn status_names_round_trip_through_serde() {
        let json = serde_json::to_string(&PostStatus::InReview).unwrap();
        assert_eq!(json, "\"IN_REVIEW\"");
        assert_eq!("in review".parse::<PostStatus>(), Ok(PostStatus::InReview));
    }

    #[test]
    fn transition_table() {
        use PostStatus::*;
        assert!(Draft.can_transition_to(Published));
        assert!(Draft.can_transition_to(Archived));
        assert!(InReview.can_transition_to(Scheduled));
        assert!(Scheduled.can_transition_to(Published));
        assert!(Published.can_transition_to(Archived));
        assert!(Archived.can_transition_to(Draft));

        assert!(!Published.can_transition_to(Draft));
        assert!(!Archived.can_transition_to(Published));
        assert!(!Draft.can_transition_to(Draft));
        assert!(!Published.can_transition_to(Scheduled));
    }
}
