#![feature(proc_macro_hygiene, decl_macro)]
extern crate chrono;

#[macro_use]
extern crate rocket;
extern crate bcrypt;
extern crate reqwest;
extern crate rocket_contrib;
extern crate time;
#[macro_use]
extern crate diesel;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod generator;
pub mod logger;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod publisher;
pub mod quality;
pub mod quota;
pub mod retriever;
pub mod schema;
pub mod setup_rocket;
pub mod state;
pub mod store;
pub mod text;

#[cfg(test)]
mod testing;

use std::{error::Error, result::Result as StdResult};
pub type Result<T> = StdResult<T, Box<dyn Error>>;
