use crate::{
    api::v1::{ok_resp, JSONResp, ValidToken},
    orchestrator::Orchestrator,
    quota::{CategoryQuota, Quota},
};
use rocket::State;
use rocket_contrib::json::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TargetChange {
    target: i32,
}

#[get("/quotas")]
pub fn quotas_list(
    orchestrator: State<Orchestrator>,
    _token: ValidToken,
) -> JSONResp<Vec<CategoryQuota>> {
    ok_resp(orchestrator.quota().all_category_quotas()?)
}

#[put("/quotas/<category>", data = "<change>")]
pub fn quota_set_target(
    orchestrator: State<Orchestrator>,
    category: String,
    change: Json<TargetChange>,
    token: ValidToken,
) -> JSONResp<Quota> {
    let quota = orchestrator
        .quota()
        .set_daily_target(&category, change.target)?;
    log::info!(
        "{} set the {} target to {}",
        token.username,
        category,
        change.target
    );
    ok_resp(quota)
}
