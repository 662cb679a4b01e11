use crate::schema::{categories, post_categories};
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
#[table_name = "categories"]
pub struct Category {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

pub fn find_by_slug(
    slug: &str,
    connection: &PgConnection,
) -> QueryResult<Option<Category>> {
    categories::table
        .filter(categories::slug.eq(slug))
        .first::<Category>(connection)
        .optional()
}

/// Inserts the category unless another writer got there first, then reads
/// back whichever row owns the slug.
pub fn find_or_insert(
    slug: &str,
    name: &str,
    connection: &PgConnection,
) -> QueryResult<Category> {
    if let Some(category) = find_by_slug(slug, connection)? {
        return Ok(category);
    }
    diesel::insert_into(categories::table)
        .values(Category {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
        })
        .on_conflict_do_nothing()
        .execute(connection)?;
    categories::table
        .filter(categories::slug.eq(slug))
        .first::<Category>(connection)
}

pub fn all_for_post(
    post: Uuid,
    connection: &PgConnection,
) -> QueryResult<Vec<Category>> {
    post_categories::table
        .filter(post_categories::post.eq(post))
        .inner_join(categories::table)
        .select(categories::all_columns)
        .load::<Category>(connection)
}
