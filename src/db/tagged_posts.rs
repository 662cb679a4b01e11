use crate::{
    db::{posts::Post, tags::Tag},
    schema::tagged_posts,
};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(
    Associations, Queryable, AsChangeset, Debug, Identifiable, Insertable,
)]
#[table_name = "tagged_posts"]
#[belongs_to(Tag, foreign_key = "tag")]
#[belongs_to(Post, foreign_key = "post")]
pub struct TaggedPost {
    pub id: Uuid,
    pub tag: Uuid,
    pub post: Uuid,
}

pub fn link(
    tag: Uuid,
    post: Uuid,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::insert_into(tagged_posts::table)
        .values(TaggedPost {
            id: Uuid::new_v4(),
            tag,
            post,
        })
        .on_conflict_do_nothing()
        .execute(connection)
}
