pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod global;
pub mod jobs;
pub mod media;
pub mod storage;
pub mod summary;
pub mod transcription;
