// src/note_handlers.rs
//! Private notes. Every query is scoped to the caller, so another user's
//! note reads as not found.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::get_current_user;
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::models::{CreateNoteRequest, Note, UpdateNoteRequest};
use crate::AppState;

async fn find_note(pool: &SqlitePool, id: &str, user_id: &str) -> ApiResult<Note> {
    sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Note"))
}

pub async fn get_notes(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let notes: Vec<Note> = sqlx::query_as(
        "SELECT * FROM notes WHERE user_id = ? ORDER BY updated_at DESC, id ASC"
    )
    .bind(&claims.sub)
    .fetch_all(&app_state.db_pool)
    .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(notes)))
}

pub async fn get_note(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let note = find_note(&app_state.db_pool, &path.into_inner(), &claims.sub).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(note)))
}

pub async fn create_note(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<CreateNoteRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    request.validate()?;

    let now = Utc::now();
    let note = Note {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub,
        title: request.title.trim().to_string(),
        content: request.content.clone(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO notes (id, user_id, title, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(&note.id)
    .bind(&note.user_id)
    .bind(&note.title)
    .bind(&note.content)
    .bind(note.created_at)
    .bind(note.updated_at)
    .execute(&app_state.db_pool)
    .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(note)))
}

pub async fn update_note(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdateNoteRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    update.validate()?;

    let mut note = find_note(&app_state.db_pool, &path.into_inner(), &claims.sub).await?;
    let update = update.into_inner();
    if let Some(title) = update.title {
        note.title = title.trim().to_string();
    }
    if let Some(content) = update.content {
        note.content = content;
    }
    note.updated_at = Utc::now();

    sqlx::query("UPDATE notes SET title = ?, content = ?, updated_at = ? WHERE id = ? AND user_id = ?")
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.updated_at)
        .bind(&note.id)
        .bind(&note.user_id)
        .execute(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(note)))
}

pub async fn delete_note(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let result = sqlx::query("DELETE FROM notes WHERE id = ? AND user_id = ?")
        .bind(path.into_inner())
        .bind(&claims.sub)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Note"));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Note deleted successfully".to_string(),
    )))
}
