use crate::schema::editors;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Queryable,
    AsChangeset,
    Serialize,
    Deserialize,
    Debug,
    Identifiable,
    Insertable,
)]
#[table_name = "editors"]
#[primary_key("username")]
pub struct Editor {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

pub fn get(username: String, connection: &PgConnection) -> QueryResult<Editor> {
    editors::table.find(username).get_result::<Editor>(connection)
}

pub fn insert(editor: Editor, connection: &PgConnection) -> QueryResult<Editor> {
    diesel::insert_into(editors::table)
        .values(editor)
        .get_result(connection)
}

pub fn update(editor: Editor, connection: &PgConnection) -> QueryResult<Editor> {
    diesel::update(editors::table.find(editor.username.clone()))
        .set(editor)
        .get_result(connection)
}

pub fn delete(
    username: String,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::delete(editors::table.find(username)).execute(connection)
}
