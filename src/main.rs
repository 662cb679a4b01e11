use chrono::Utc;
use clap::{Parser, Subcommand};
use newsdesk::{
    config::Config,
    db::{self, PgStore},
    logger,
    orchestrator::{Orchestrator, RunOptions},
};
use serde::Serialize;
use std::{process, sync::Arc};

#[derive(Parser)]
#[command(name = "newsdesk", about = "Run the article pipeline from the shell")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate articles for categories that still have quota today
    Generate {
        /// Stop after this many successful articles
        #[arg(long)]
        max: Option<usize>,
        /// Restrict the run to these categories, in order
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Use this topic instead of asking for suggestions
        #[arg(long)]
        topic: Option<String>,
        /// Publish articles the quality gate approves outright
        #[arg(long)]
        publish: bool,
    },
    /// Show today's quota for every category
    Quotas,
    /// Change today's target for one category
    SetTarget { category: String, target: i32 },
    /// Publish scheduled posts whose time has passed
    PublishDue,
}

fn print_json<T: Serialize>(value: &T) -> newsdesk::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli, config: Config) -> newsdesk::Result<()> {
    let pool = db::init_pool(config.require_database_url()?)?;
    let orchestrator =
        Orchestrator::from_config(&config, Arc::new(PgStore::new(pool)))?;

    match cli.command {
        Command::Generate {
            max,
            categories,
            topic,
            publish,
        } => {
            let defaults = RunOptions::from_config(&config);
            let options = RunOptions {
                max_articles: max.unwrap_or(defaults.max_articles),
                categories,
                topic,
                publish_immediately: publish || defaults.publish_immediately,
            };
            print_json(&orchestrator.run(&options)?)
        }
        Command::Quotas => {
            print_json(&orchestrator.quota().all_category_quotas()?)
        }
        Command::SetTarget { category, target } => print_json(
            &orchestrator.quota().set_daily_target(&category, target)?,
        ),
        Command::PublishDue => print_json(
            &orchestrator
                .publisher()
                .publish_due(Utc::now().naive_utc())?,
        ),
    }
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };
    logger::setup_logging(config.log_level, config.log_file.as_deref())
        .expect("failed to initialize logging");

    if let Err(e) = run(cli, config) {
        log::error!("{}", e);
        process::exit(1);
    }
}
