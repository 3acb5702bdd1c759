// src/translation_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use crate::auth::{require_permission, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::models::{is_valid_key, is_valid_locale, UpsertTranslationRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TranslationEntry {
    pub key: String,
    pub locale: String,
    pub value: String,
    /// False when the key had no entry and `value` is the key itself.
    pub translated: bool,
}

fn check_path(locale: &str, key: Option<&str>) -> ApiResult<()> {
    if !is_valid_locale(locale) {
        return Err(ApiError::bad_request(&format!("Invalid locale '{}'", locale)));
    }
    if let Some(key) = key {
        if !is_valid_key(key) {
            return Err(ApiError::bad_request(&format!("Invalid translation key '{}'", key)));
        }
    }
    Ok(())
}

pub async fn get_dictionary(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let locale = path.into_inner();
    check_path(&locale, None)?;

    let dictionary: BTreeMap<String, String> = app_state.translator.dictionary(&locale);
    Ok(HttpResponse::Ok().json(ApiResponse::success(dictionary)))
}

pub async fn get_translation(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (locale, key) = path.into_inner();
    check_path(&locale, Some(&key))?;

    let found = app_state.translator.lookup(&key, &locale);
    let entry = TranslationEntry {
        translated: found.is_some(),
        value: found.unwrap_or_else(|| key.clone()),
        key,
        locale,
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(entry)))
}

pub async fn upsert_translation(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    request: web::Json<UpsertTranslationRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, UserRole::can_manage_translations)?;
    let (locale, key) = path.into_inner();
    check_path(&locale, Some(&key))?;
    request.validate()?;

    sqlx::query(
        r#"INSERT INTO translations (key, locale, value, updated_at) VALUES (?, ?, ?, ?)
           ON CONFLICT(key, locale) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#
    )
    .bind(&key)
    .bind(&locale)
    .bind(&request.value)
    .bind(Utc::now())
    .execute(&app_state.db_pool)
    .await?;

    app_state.translator.set(key.clone(), locale.clone(), request.value.clone());
    info!("🌐 Translation set: {} [{}]", key, locale);

    let entry = TranslationEntry { key, locale, value: request.into_inner().value, translated: true };
    Ok(HttpResponse::Ok().json(ApiResponse::success(entry)))
}

pub async fn delete_translation(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, UserRole::can_manage_translations)?;
    let (locale, key) = path.into_inner();
    check_path(&locale, Some(&key))?;

    let result = sqlx::query("DELETE FROM translations WHERE key = ? AND locale = ?")
        .bind(&key)
        .bind(&locale)
        .execute(&app_state.db_pool)
        .await?;

    app_state.translator.remove(&key, &locale);
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Translation"));
    }

    info!("🌐 Translation removed: {} [{}]", key, locale);
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Translation deleted successfully".to_string(),
    )))
}
