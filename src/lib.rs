// src/lib.rs

//! shoutstat - SHOUTcast status page scraper library

pub mod error;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod utils;
