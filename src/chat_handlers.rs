// src/chat_handlers.rs
//! AI chat. The assistant is stateless; history lives in `chat_messages`.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::assistant::{AssistantError, AssistantRequest};
use crate::auth::get_current_user;
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::models::{ChatMessage, ChatMessageRow, ChatRequest, ChatRole};
use crate::scholarship_handlers::find_scholarship;
use crate::AppState;

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

/// Body of a successful chat turn.
#[derive(Debug, serde::Serialize)]
pub struct ChatTurn {
    pub response: String,
    pub messages: Vec<ChatMessage>,
}

pub async fn send_message(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<ChatRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    request.validate()?;
    let request = request.into_inner();

    if let Some(ref scholarship_id) = request.scholarship_id {
        find_scholarship(&app_state.db_pool, scholarship_id).await?;
    }

    let invocation = AssistantRequest {
        message: request.message.trim().to_string(),
        user_id: Some(claims.sub.clone()),
        scholarship_id: request.scholarship_id.clone(),
    };
    let reply = app_state.assistant.invoke(&invocation).await.map_err(|e| {
        warn!("🤖 Assistant call failed for {}: {}", claims.username, e);
        ApiError::from(e)
    })?;

    let asked_at = Utc::now();
    let messages = vec![
        ChatMessage {
            id: Uuid::new_v4().to_string(),
            user_id: claims.sub.clone(),
            scholarship_id: request.scholarship_id.clone(),
            role: ChatRole::User,
            content: invocation.message,
            created_at: asked_at,
        },
        ChatMessage {
            id: Uuid::new_v4().to_string(),
            user_id: claims.sub.clone(),
            scholarship_id: request.scholarship_id,
            role: ChatRole::Assistant,
            content: reply.response.clone(),
            created_at: Utc::now().max(asked_at),
        },
    ];

    let mut tx = app_state.db_pool.begin().await?;
    for message in &messages {
        sqlx::query(
            "INSERT INTO chat_messages (id, user_id, scholarship_id, role, content, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&message.id)
        .bind(&message.user_id)
        .bind(&message.scholarship_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("🤖 Chat turn stored for {}", claims.username);

    Ok(HttpResponse::Ok().json(ApiResponse::success(ChatTurn {
        response: reply.response,
        messages,
    })))
}

pub async fn get_history(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    // rowid keeps the user/assistant pair of one turn in insertion order
    let rows: Vec<ChatMessageRow> = sqlx::query_as(
        r#"SELECT id, user_id, scholarship_id, role, content, created_at
           FROM chat_messages WHERE user_id = ? ORDER BY created_at ASC, rowid ASC"#
    )
    .bind(&claims.sub)
    .fetch_all(&app_state.db_pool)
    .await?;

    let history: Vec<ChatMessage> = rows.into_iter().map(ChatMessage::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(history)))
}

pub async fn clear_history(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let result = sqlx::query("DELETE FROM chat_messages WHERE user_id = ?")
        .bind(&claims.sub)
        .execute(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        result.rows_affected(),
        "Chat history cleared".to_string(),
    )))
}
