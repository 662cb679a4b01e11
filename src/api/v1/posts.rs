use crate::{
    api::v1::{ok_resp, parse_id, user_err_resp, JSONResp, ValidToken},
    db::{
        posts::{Post, PostStatus},
        tags::Tag,
    },
    orchestrator::Orchestrator,
    publisher::{PostDetail, PostEdit},
};
use chrono::{NaiveDateTime, Utc};
use rocket::State;
use rocket_contrib::json::Json;
use serde::Deserialize;

const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    status: PostStatus,
    scheduled_for: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    tags: Vec<String>,
}

/// Review queue. Defaults to posts waiting on an editor.
#[get("/posts?<status>&<limit>")]
pub fn posts_list(
    orchestrator: State<Orchestrator>,
    status: Option<String>,
    limit: Option<i64>,
    _token: ValidToken,
) -> JSONResp<Vec<Post>> {
    let status = match status.map(|s| s.parse::<PostStatus>()) {
        None => PostStatus::InReview,
        Some(Ok(status)) => status,
        Some(Err(e)) => return user_err_resp(e),
    };
    let limit = limit.unwrap_or(DEFAULT_LIMIT).max(1);
    ok_resp(orchestrator.publisher().review_queue(status, limit)?)
}

#[get("/posts/<id>")]
pub fn post_detail(
    orchestrator: State<Orchestrator>,
    id: String,
    _token: ValidToken,
) -> JSONResp<PostDetail> {
    ok_resp(orchestrator.publisher().detail(parse_id(&id)?)?)
}

#[put("/posts/<id>", data = "<edit>")]
pub fn post_edit(
    orchestrator: State<Orchestrator>,
    id: String,
    edit: Json<PostEdit>,
    token: ValidToken,
) -> JSONResp<Post> {
    let post = orchestrator
        .publisher()
        .edit(parse_id(&id)?, edit.into_inner())?;
    log::info!("{} edited post {}", token.username, post.slug);
    ok_resp(post)
}

#[post("/posts/<id>/status", data = "<change>")]
pub fn post_status(
    orchestrator: State<Orchestrator>,
    id: String,
    change: Json<StatusChange>,
    token: ValidToken,
) -> JSONResp<Post> {
    let post = orchestrator.publisher().transition(
        parse_id(&id)?,
        change.status,
        change.scheduled_for,
    )?;
    log::info!(
        "{} moved post {} to {}",
        token.username,
        post.slug,
        post.status
    );
    ok_resp(post)
}

#[post("/posts/<id>/tags", data = "<request>")]
pub fn post_tags(
    orchestrator: State<Orchestrator>,
    id: String,
    request: Json<TagRequest>,
    _token: ValidToken,
) -> JSONResp<Vec<Tag>> {
    ok_resp(orchestrator.publisher().tag(parse_id(&id)?, &request.tags)?)
}

#[post("/posts/publish-due")]
pub fn posts_publish_due(
    orchestrator: State<Orchestrator>,
    _token: ValidToken,
) -> JSONResp<Vec<Post>> {
    ok_resp(
        orchestrator
            .publisher()
            .publish_due(Utc::now().naive_utc())?,
    )
}
