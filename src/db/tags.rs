use crate::schema::{tagged_posts, tags};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Queryable,
    AsChangeset,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
    Identifiable,
    Insertable,
)]
#[table_name = "tags"]
pub struct Tag {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

pub fn find_or_insert(
    slug: &str,
    name: &str,
    connection: &PgConnection,
) -> QueryResult<Tag> {
    diesel::insert_into(tags::table)
        .values(Tag {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
        })
        .on_conflict_do_nothing()
        .execute(connection)?;
    tags::table
        .filter(tags::slug.eq(slug))
        .first::<Tag>(connection)
}

pub fn all_for_post(
    post: Uuid,
    connection: &PgConnection,
) -> QueryResult<Vec<Tag>> {
    tagged_posts::table
        .filter(tagged_posts::post.eq(post))
        .inner_join(tags::table)
        .select(tags::all_columns)
        .order(tags::name.asc())
        .load::<Tag>(connection)
}
