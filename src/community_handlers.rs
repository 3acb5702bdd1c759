// src/community_handlers.rs
//! Community forum: posts, comments and like toggles.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{get_current_user, Claims};
use crate::catalog::sort::PostSort;
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::models::{
    Comment, CreateCommentRequest, CreatePostRequest, LikeState, Post, UpdatePostRequest,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub sort: Option<String>,
}

const POST_COLUMNS: &str = r#"
    p.id, p.user_id, COALESCE(u.full_name, u.username) AS author_name, p.title, p.content,
    p.likes_count,
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count,
    EXISTS(SELECT 1 FROM post_likes pl WHERE pl.post_id = p.id AND pl.user_id = ?) AS liked_by_me,
    p.created_at, p.updated_at
"#;

const COMMENT_COLUMNS: &str = r#"
    c.id, c.post_id, c.user_id, COALESCE(u.full_name, u.username) AS author_name, c.content,
    c.likes_count,
    EXISTS(SELECT 1 FROM comment_likes cl WHERE cl.comment_id = c.id AND cl.user_id = ?) AS liked_by_me,
    c.created_at
"#;

async fn find_post(pool: &SqlitePool, id: &str, viewer_id: &str) -> ApiResult<Post> {
    let sql = format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.user_id WHERE p.id = ?",
        POST_COLUMNS
    );
    sqlx::query_as::<_, Post>(&sql)
        .bind(viewer_id)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::post_not_found(id))
}

async fn find_comment(pool: &SqlitePool, id: &str, viewer_id: &str) -> ApiResult<Comment> {
    let sql = format!(
        "SELECT {} FROM comments c JOIN users u ON u.id = c.user_id WHERE c.id = ?",
        COMMENT_COLUMNS
    );
    sqlx::query_as::<_, Comment>(&sql)
        .bind(viewer_id)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))
}

fn ensure_owner_or_moderator(claims: &Claims, owner_id: &str, entity: &str) -> ApiResult<()> {
    if claims.sub == owner_id || claims.role.can_moderate() {
        Ok(())
    } else {
        Err(ApiError::not_owner(entity))
    }
}

// ==================== POSTS ====================

pub async fn get_posts(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PostQuery>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let sort = PostSort::parse(query.sort.as_deref());

    let sql = format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.user_id ORDER BY {}",
        POST_COLUMNS,
        sort.order_by()
    );
    let posts: Vec<Post> = sqlx::query_as(&sql)
        .bind(&claims.sub)
        .fetch_all(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(posts)))
}

pub async fn get_post(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let post = find_post(&app_state.db_pool, &path.into_inner(), &claims.sub).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(post)))
}

pub async fn create_post(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<CreatePostRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    request.validate()?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO posts (id, user_id, title, content, likes_count, created_at, updated_at) VALUES (?, ?, ?, ?, 0, ?, ?)"
    )
    .bind(&id)
    .bind(&claims.sub)
    .bind(request.title.trim())
    .bind(&request.content)
    .bind(now)
    .bind(now)
    .execute(&app_state.db_pool)
    .await?;

    let post = find_post(&app_state.db_pool, &id, &claims.sub).await?;
    info!("💬 {} created post {}", claims.username, post.id);

    Ok(HttpResponse::Created().json(ApiResponse::success(post)))
}

pub async fn update_post(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdatePostRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    update.validate()?;
    let post_id = path.into_inner();

    let existing = find_post(&app_state.db_pool, &post_id, &claims.sub).await?;
    ensure_owner_or_moderator(&claims, &existing.user_id, "posts")?;

    sqlx::query("UPDATE posts SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(update.title.as_deref().map(str::trim).unwrap_or(&existing.title))
        .bind(update.content.as_deref().unwrap_or(&existing.content))
        .bind(Utc::now())
        .bind(&post_id)
        .execute(&app_state.db_pool)
        .await?;

    let post = find_post(&app_state.db_pool, &post_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(post)))
}

pub async fn delete_post(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let post_id = path.into_inner();

    let existing = find_post(&app_state.db_pool, &post_id, &claims.sub).await?;
    ensure_owner_or_moderator(&claims, &existing.user_id, "posts")?;

    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(&post_id)
        .execute(&app_state.db_pool)
        .await?;

    info!("🗑️ {} deleted post {}", claims.username, post_id);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Post deleted successfully".to_string(),
    )))
}

// ==================== LIKES ====================

/// Flips the caller's like on one row of `likes_table` and adjusts the
/// counter on `target_table`, all inside one transaction.
async fn toggle_like(
    pool: &SqlitePool,
    target_table: &str,
    likes_table: &str,
    key_column: &str,
    target_id: &str,
    user_id: &str,
) -> ApiResult<Option<LikeState>> {
    let mut tx = pool.begin().await?;

    let exists: Option<(i64,)> = sqlx::query_as(&format!("SELECT likes_count FROM {} WHERE id = ?", target_table))
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }

    let removed = sqlx::query(&format!("DELETE FROM {} WHERE {} = ? AND user_id = ?", likes_table, key_column))
        .bind(target_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let liked = if removed == 0 {
        sqlx::query(&format!(
            "INSERT INTO {} ({}, user_id, created_at) VALUES (?, ?, ?)",
            likes_table, key_column
        ))
        .bind(target_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("UPDATE {} SET likes_count = likes_count + 1 WHERE id = ?", target_table))
            .bind(target_id)
            .execute(&mut *tx)
            .await?;
        true
    } else {
        sqlx::query(&format!("UPDATE {} SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?", target_table))
            .bind(target_id)
            .execute(&mut *tx)
            .await?;
        false
    };

    let (likes_count,): (i64,) = sqlx::query_as(&format!("SELECT likes_count FROM {} WHERE id = ?", target_table))
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(LikeState { liked, likes_count }))
}

pub async fn toggle_post_like(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let post_id = path.into_inner();

    let state = toggle_like(&app_state.db_pool, "posts", "post_likes", "post_id", &post_id, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::post_not_found(&post_id))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(state)))
}

pub async fn toggle_comment_like(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let comment_id = path.into_inner();

    let state = toggle_like(&app_state.db_pool, "comments", "comment_likes", "comment_id", &comment_id, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(state)))
}

// ==================== COMMENTS ====================

/// Comments of one post, oldest first.
pub async fn get_comments(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let post_id = path.into_inner();
    find_post(&app_state.db_pool, &post_id, &claims.sub).await?;

    let sql = format!(
        "SELECT {} FROM comments c JOIN users u ON u.id = c.user_id WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC",
        COMMENT_COLUMNS
    );
    let comments: Vec<Comment> = sqlx::query_as(&sql)
        .bind(&claims.sub)
        .bind(&post_id)
        .fetch_all(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(comments)))
}

pub async fn create_comment(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    request: web::Json<CreateCommentRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    request.validate()?;
    let post_id = path.into_inner();
    find_post(&app_state.db_pool, &post_id, &claims.sub).await?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO comments (id, post_id, user_id, content, likes_count, created_at) VALUES (?, ?, ?, ?, 0, ?)"
    )
    .bind(&id)
    .bind(&post_id)
    .bind(&claims.sub)
    .bind(request.content.trim())
    .bind(Utc::now())
    .execute(&app_state.db_pool)
    .await?;

    let comment = find_comment(&app_state.db_pool, &id, &claims.sub).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(comment)))
}

pub async fn delete_comment(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let comment_id = path.into_inner();

    let existing = find_comment(&app_state.db_pool, &comment_id, &claims.sub).await?;
    ensure_owner_or_moderator(&claims, &existing.user_id, "comments")?;

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(&comment_id)
        .execute(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Comment deleted successfully".to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use crate::auth::UserRole;
    use crate::test_support::{bearer, register_user, test_state};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn test_like_toggle_is_per_user() {
        let (state, auth) = test_state().await;
        let (_, amina) = register_user(&state, &auth, "amina", UserRole::Student).await;
        let (_, kofi) = register_user(&state, &auth, "kofi", UserRole::Student).await;
        let app = crate::test_app!(state, auth);

        let req = test::TestRequest::post()
            .uri("/api/v1/posts")
            .insert_header(bearer(&amina))
            .set_json(json!({"title": "MEXT tips", "content": "Start early"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let post_id = body["data"]["id"].as_str().unwrap().to_string();
        let like_uri = format!("/api/v1/posts/{}/like", post_id);

        let like = |token: &str| {
            test::TestRequest::post().uri(&like_uri).insert_header(bearer(token)).to_request()
        };

        let body: Value = test::call_and_read_body_json(&app, like(&amina)).await;
        assert_eq!(body["data"], json!({"liked": true, "likes_count": 1}));
        let body: Value = test::call_and_read_body_json(&app, like(&kofi)).await;
        assert_eq!(body["data"], json!({"liked": true, "likes_count": 2}));
        let body: Value = test::call_and_read_body_json(&app, like(&amina)).await;
        assert_eq!(body["data"], json!({"liked": false, "likes_count": 1}));

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/posts/{}", post_id))
            .insert_header(bearer(&kofi))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["liked_by_me"], true);
        assert_eq!(body["data"]["likes_count"], 1);
    }

    #[actix_rt::test]
    async fn test_comments_and_ownership() {
        let (state, auth) = test_state().await;
        let (_, admin) = register_user(&state, &auth, "admin", UserRole::Admin).await;
        let (_, amina) = register_user(&state, &auth, "amina", UserRole::Student).await;
        let (_, kofi) = register_user(&state, &auth, "kofi", UserRole::Student).await;
        let app = crate::test_app!(state, auth);

        let req = test::TestRequest::post()
            .uri("/api/v1/posts")
            .insert_header(bearer(&amina))
            .set_json(json!({"title": "Visa question", "content": "How long?"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let post_id = body["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{}/comments", post_id))
            .insert_header(bearer(&kofi))
            .set_json(json!({"content": "About six weeks"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let comment_id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["author_name"], "kofi");

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/comments/{}/like", comment_id))
            .insert_header(bearer(&amina))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["likes_count"], 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/posts")
            .insert_header(bearer(&amina))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["comments_count"], 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/comments/{}", comment_id))
            .insert_header(bearer(&amina))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/posts/{}", post_id))
            .insert_header(bearer(&kofi))
            .set_json(json!({"title": "Hijacked"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/posts/{}", post_id))
            .insert_header(bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{}/like", post_id))
            .insert_header(bearer(&amina))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_most_liked_sort() {
        let (state, auth) = test_state().await;
        let (_, amina) = register_user(&state, &auth, "amina", UserRole::Student).await;
        let app = crate::test_app!(state, auth);

        let mut ids = Vec::new();
        for title in ["first", "second"] {
            let req = test::TestRequest::post()
                .uri("/api/v1/posts")
                .insert_header(bearer(&amina))
                .set_json(json!({"title": title, "content": "c"}))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            ids.push(body["data"]["id"].as_str().unwrap().to_string());
        }

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{}/like", ids[0]))
            .insert_header(bearer(&amina))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/posts?sort=most_liked")
            .insert_header(bearer(&amina))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["title"], "first");
    }
}
