extern crate newsdesk;

use newsdesk::{config::Config, logger, setup_rocket::setup_rocket};

fn main() {
    dotenv::dotenv().ok();
    let config = Config::from_env().expect("invalid configuration");
    logger::setup_logging(config.log_level, config.log_file.as_deref())
        .expect("failed to initialize logging");

    let rocket = setup_rocket(&config).expect("failed to set up server");
    let error = rocket.launch();
    log::error!("Server stopped: {}", error);
}
