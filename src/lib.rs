pub mod error;
pub mod types;

pub mod canonical;
pub mod classify;
pub mod config;
pub mod infer;
pub mod patch;
pub mod revision;
pub mod storage;
