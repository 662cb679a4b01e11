use crate::{
    db::{categories::Category, posts::Post},
    schema::post_categories,
};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(
    Associations, Queryable, AsChangeset, Debug, Identifiable, Insertable,
)]
#[table_name = "post_categories"]
#[belongs_to(Category, foreign_key = "category")]
#[belongs_to(Post, foreign_key = "post")]
pub struct PostCategory {
    pub id: Uuid,
    pub post: Uuid,
    pub category: Uuid,
}

/// Linking twice is a no-op.
pub fn link(
    post: Uuid,
    category: Uuid,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::insert_into(post_categories::table)
        .values(PostCategory {
            id: Uuid::new_v4(),
            post,
            category,
        })
        .on_conflict_do_nothing()
        .execute(connection)
}
