// src/lib.rs
//! Scholarship Hub: catalog filter engine, the HTTP service around it, and a
//! typed client with the view bindings that drive the engine locally.

use sqlx::SqlitePool;
use std::sync::Arc;

pub mod assistant;
pub mod auth;
pub mod auth_handlers;
pub mod catalog;
pub mod chat_handlers;
pub mod client;
pub mod community_handlers;
pub mod config;
pub mod db;
pub mod error;
pub mod guide_handlers;
pub mod handlers;
pub mod i18n;
pub mod models;
pub mod monitoring;
pub mod note_handlers;
pub mod optimistic;
pub mod routes;
pub mod scholarship_handlers;
pub mod translation_handlers;
pub mod views;

/// State shared by every worker.
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: config::Config,
    pub translator: i18n::Translator,
    pub assistant: Arc<dyn assistant::AssistantClient>,
}
