use crate::{
    api::v1::{ok_resp, JSONResp, ValidToken},
    orchestrator::{Orchestrator, RunReport, RunRequest},
};
use rocket::State;
use rocket_contrib::json::Json;

/// Runs a generation pass inline and returns its report. Fields the body
/// leaves out come from the configured run defaults.
#[post("/generation/run", data = "<request>")]
pub fn generation_run(
    orchestrator: State<Orchestrator>,
    request: Json<RunRequest>,
    token: ValidToken,
) -> JSONResp<RunReport> {
    log::info!("{} started a generation run", token.username);
    let options = request.into_inner().into_options(orchestrator.default_options());
    ok_resp(orchestrator.run(&options)?)
}
