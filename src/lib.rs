pub mod config;
pub mod error;
pub mod models;
pub mod db;
pub mod text;
pub mod book;
pub mod replace;
pub mod search;

pub use error::{Error, Result};
