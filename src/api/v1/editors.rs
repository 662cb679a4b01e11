use crate::{
    api::v1::{
        internal_err_resp, ok_resp, user_err_resp, ApiError, JSONResp,
        ValidToken,
    },
    db::{editors, editors::Editor, tokens, tokens::Token, DbConn},
    state::Environment,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rocket::{
    http::{Cookie, Cookies, Status},
    State,
};
use rocket_contrib::json::Json;
use uuid::Uuid;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiTokenResp {
    api_token: tokens::TokenId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditorLogin {
    username: String,
    password: String,
    persistent: bool,
}

#[post("/editor/login", data = "<login>")]
pub fn editor_login(
    mut cookies: Cookies<'_>,
    conn: DbConn,
    rocket_env: State<Environment>,
    login: Json<EditorLogin>,
) -> JSONResp<ApiTokenResp> {
    let editor = match editors::get(login.username.clone(), &conn) {
        Err(_) => {
            return user_err_resp(format!(
                "Editor {} not found",
                login.username
            ))
        }
        Ok(e) => e,
    };
    let passwords_match = verify(login.password.clone(), &editor.password)?;
    if !passwords_match {
        return user_err_resp("Invalid username/password.");
    }

    let removed = tokens::delete_expired(Utc::now().naive_utc(), &conn)?;
    if removed > 0 {
        log::debug!("Removed {} expired tokens", removed);
    }

    let api_token = Uuid::new_v4();
    let days = if login.persistent { 365 * 20 } else { 1 };
    let token = Token {
        id: api_token,
        username: editor.username,
        expires: Utc::now().naive_utc() + chrono::Duration::days(days),
    };
    let mut cookie = Cookie::new("api_token", api_token.to_string());
    cookie.set_secure(rocket_env.inner().0.is_prod());
    cookie.set_expires(time::now() + time::Duration::days(days));
    cookies.add_private(cookie);

    tokens::insert(token, &conn)?;
    ok_resp(ApiTokenResp { api_token })
}

/// Outside development, only a signed-in editor can add another.
#[post("/editor", data = "<editor>")]
pub fn editor_create(
    conn: DbConn,
    editor: Json<Editor>,
    rocket_env: State<Environment>,
    token: Option<ValidToken>,
) -> JSONResp<String> {
    if rocket_env.inner().0.is_prod() && token.is_none() {
        return Err(ApiError::new(
            Status::Unauthorized,
            "Sign in to create editors".into(),
        ));
    }
    let hashed_pass = hash(editor.password.clone(), DEFAULT_COST)?;

    let editor = Editor {
        username: editor.username.clone(),
        password: hashed_pass,
    };

    let username = editor.username.clone();
    match editors::insert(editor, &conn) {
        Ok(_) => ok_resp(format!("Created editor {}", username)),
        Err(e) => user_err_resp(format!("Could not create editor: {}", e)),
    }
}

#[put("/editor", data = "<editor>")]
pub fn editor_change_pass(
    conn: DbConn,
    editor: Json<Editor>,
    token: ValidToken,
) -> JSONResp<String> {
    if token.username != editor.username {
        return user_err_resp(format!(
            "Signed in as {}, cannot change password for {}",
            token.username, editor.username
        ));
    }

    let hashed_pass = hash(editor.password.clone(), DEFAULT_COST)?;
    let editor = Editor {
        username: editor.username.clone(),
        password: hashed_pass,
    };

    let username = editor.username.clone();
    editors::update(editor, &conn)?;

    ok_resp(format!("Updated password for {}", username))
}

#[post("/editor/logout")]
pub fn editor_logout(
    conn: DbConn,
    token: ValidToken,
    mut cookies: Cookies<'_>,
) -> JSONResp<&'static str> {
    cookies.remove_private(Cookie::named("api_token"));
    match tokens::delete(token.id, &conn) {
        Ok(_) => ok_resp("Successfully logged out"),
        Err(e) => {
            log::error!("Error removing valid DB token: {}", e);
            internal_err_resp("Could not log editor out")
        }
    }
}

#[delete("/editor")]
pub fn editor_delete(
    conn: DbConn,
    token: ValidToken,
    mut cookies: Cookies<'_>,
) -> JSONResp<String> {
    cookies.remove_private(Cookie::named("api_token"));
    tokens::delete(token.id, &conn)?;
    editors::delete(token.username.clone(), &conn)?;
    ok_resp(format!("Deleted editor {}", token.username))
}

#[get("/editor/index")]
pub fn editor_index(conn: DbConn, token: ValidToken) -> JSONResp<Editor> {
    ok_resp(editors::get(token.username, &conn)?)
}
