#[path = "../common/mod.rs"]
mod common;

mod update;
mod upsert_one;
