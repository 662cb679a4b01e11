use crate::db::editors::Editor;
use crate::schema::tokens;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

pub type TokenId = Uuid;

#[derive(Queryable, AsChangeset, Debug, Associations, Insertable)]
#[table_name = "tokens"]
#[belongs_to(Editor, foreign_key = "username")]
pub struct Token {
    pub id: TokenId,
    pub username: String,
    pub expires: NaiveDateTime,
}

pub fn get(id: Uuid, connection: &PgConnection) -> QueryResult<Token> {
    tokens::table.find(id).get_result::<Token>(connection)
}

pub fn insert(token: Token, connection: &PgConnection) -> QueryResult<Token> {
    diesel::insert_into(tokens::table)
        .values(token)
        .get_result(connection)
}

pub fn delete(id: Uuid, connection: &PgConnection) -> QueryResult<usize> {
    diesel::delete(tokens::table.find(id)).execute(connection)
}

pub fn delete_expired(
    now: NaiveDateTime,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::delete(tokens::table.filter(tokens::expires.lt(now)))
        .execute(connection)
}
