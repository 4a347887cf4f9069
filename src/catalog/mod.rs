//! Table registry and its on-disk catalog file.

mod database;
mod persistence;

pub use database::*;
pub use persistence::*;
