use crate::{
    api::v1::{editors, generation, posts, quotas},
    config::Config,
    db::{self, PgStore},
    orchestrator::Orchestrator,
    state,
};
use std::sync::Arc;

use rocket::fairing::AdHoc;

pub fn setup_rocket(config: &Config) -> crate::Result<rocket::Rocket> {
    let pool = db::init_pool(config.require_database_url()?)?;
    let orchestrator =
        Orchestrator::from_config(config, Arc::new(PgStore::new(pool.clone())))?;

    Ok(rocket::ignite()
        .manage(pool)
        .manage(orchestrator)
        .mount(
            "/api/v1/",
            routes![
                editors::editor_create,
                editors::editor_login,
                editors::editor_change_pass,
                editors::editor_logout,
                editors::editor_delete,
                editors::editor_index,
                posts::posts_list,
                posts::post_detail,
                posts::post_edit,
                posts::post_status,
                posts::post_tags,
                posts::posts_publish_due,
                quotas::quotas_list,
                quotas::quota_set_target,
                generation::generation_run,
            ],
        )
        .attach(AdHoc::on_attach("Environment tracker", |rocket| {
            let env = rocket.config().environment;
            Ok(rocket.manage(state::Environment(env)))
        })))
}
