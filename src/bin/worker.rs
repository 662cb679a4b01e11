extern crate clokwerk;
extern crate newsdesk;

use chrono::Utc;
use clokwerk::{Scheduler, TimeUnits};
use newsdesk::{
    config::Config,
    db::{self, PgStore},
    logger,
    orchestrator::{Orchestrator, RunOptions},
};
use std::{sync::Arc, thread, time::Duration};

const POLL_INTERVAL: Duration = Duration::from_secs(10);

fn main() {
    dotenv::dotenv().ok();
    let config = Config::from_env().expect("invalid configuration");
    logger::setup_logging(config.log_level, config.log_file.as_deref())
        .expect("failed to initialize logging");

    let database_url = config
        .require_database_url()
        .expect("DATABASE_URL is required");
    let pool = db::init_pool(database_url).expect("failed to create pool");
    let orchestrator = Arc::new(
        Orchestrator::from_config(&config, Arc::new(PgStore::new(pool)))
            .expect("failed to set up generation pipeline"),
    );

    let mut scheduler = Scheduler::new();

    let daily = orchestrator.clone();
    let options = RunOptions::from_config(&config);
    scheduler
        .every(1.day())
        .at(&config.generation_time)
        .run(move || match daily.run(&options) {
            Ok(report) => log::info!(
                "Daily run generated {} articles in {:?}",
                report.generated,
                report.categories_processed
            ),
            Err(e) => log::error!("Daily run failed: {}", e),
        });

    let sweeper = orchestrator.clone();
    scheduler
        .every(config.sweep_interval_minutes.minutes())
        .run(move || {
            match sweeper.publisher().publish_due(Utc::now().naive_utc()) {
                Ok(posts) if !posts.is_empty() => {
                    log::info!("Published {} scheduled posts", posts.len())
                }
                Ok(_) => (),
                Err(e) => log::error!("Scheduled publish sweep failed: {}", e),
            }
        });

    log::info!(
        "Worker started: daily run at {}, sweep every {} minutes",
        config.generation_time,
        config.sweep_interval_minutes
    );
    loop {
        scheduler.run_pending();
        thread::sleep(POLL_INTERVAL);
    }
}
