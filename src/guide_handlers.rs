// src/guide_handlers.rs
//! Study-abroad guides: same catalog shape as scholarships, filtered by
//! country and category.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_permission, UserRole};
use crate::catalog::sort::GuideSort;
use crate::catalog::{collect_facets, count_matches, filter_catalog, total_pages};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ApiResponse, CatalogQuery};
use crate::models::{to_json_text, CreateGuideRequest, Guide, GuideRow, UpdateGuideRequest};
use crate::AppState;

pub async fn load_guides(pool: &SqlitePool) -> ApiResult<Vec<Guide>> {
    let rows: Vec<GuideRow> = sqlx::query_as(
        r#"SELECT id, title, description, category, country, image_url, steps, created_at, updated_at
           FROM guides ORDER BY created_at DESC, id ASC"#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Guide::from).collect())
}

pub async fn find_guide(pool: &SqlitePool, id: &str) -> ApiResult<Guide> {
    let row: Option<GuideRow> = sqlx::query_as(
        r#"SELECT id, title, description, category, country, image_url, steps, created_at, updated_at
           FROM guides WHERE id = ?"#
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Guide::from).ok_or_else(|| ApiError::guide_not_found(id))
}

// ==================== PUBLIC READS ====================

pub async fn get_all_guides(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CatalogQuery>,
) -> ApiResult<HttpResponse> {
    let mut guides = load_guides(&app_state.db_pool).await?;
    GuideSort::parse(query.sort.as_deref()).apply(&mut guides);

    Ok(HttpResponse::Ok().json(ApiResponse::success(guides)))
}

/// Guides carry no level, so a level criterion never excludes one.
pub async fn search_guides(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CatalogQuery>,
) -> ApiResult<HttpResponse> {
    let mut guides = load_guides(&app_state.db_pool).await?;
    GuideSort::parse(query.sort.as_deref()).apply(&mut guides);

    let criteria = query.criteria();
    let window = query.window(app_state.config.catalog.guide_page_size);
    let pages = total_pages(count_matches(&guides, &criteria), window.page_size);
    let result = filter_catalog(&guides, &criteria, window.clamped(pages)).into_owned();

    Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
}

pub async fn get_guide_facets(
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let guides = load_guides(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(collect_facets(&guides))))
}

pub async fn get_guide(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let guide = find_guide(&app_state.db_pool, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(guide)))
}

pub async fn get_guide_categories(
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let categories = db::guide_categories(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(categories)))
}

// ==================== ADMIN CRUD ====================

pub async fn create_guide(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<CreateGuideRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = require_permission(&http_request, UserRole::can_manage_catalog)?;
    request.validate()?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"INSERT INTO guides (
            id, title, description, category, country, image_url, steps,
            created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
    )
    .bind(&id)
    .bind(request.title.trim())
    .bind(request.description.as_deref().unwrap_or_default())
    .bind(request.category.trim())
    .bind(request.country.trim())
    .bind(&request.image_url)
    .bind(to_json_text(&request.steps))
    .bind(&claims.sub)
    .bind(now)
    .bind(now)
    .execute(&app_state.db_pool)
    .await?;

    let created = find_guide(&app_state.db_pool, &id).await?;
    info!("📘 Created guide: {} ({})", created.title, created.id);

    Ok(HttpResponse::Created().json(ApiResponse::success(created)))
}

pub async fn update_guide(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdateGuideRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, UserRole::can_manage_catalog)?;
    update.validate()?;
    let guide_id = path.into_inner();

    let existing = find_guide(&app_state.db_pool, &guide_id).await?;
    let update = update.into_inner();
    let steps = update.steps.unwrap_or(existing.steps);

    sqlx::query(
        r#"
        UPDATE guides
        SET title = ?, description = ?, category = ?, country = ?, image_url = ?, steps = ?,
            updated_at = ?
        WHERE id = ?
        "#
    )
    .bind(update.title.as_deref().map(str::trim).unwrap_or(&existing.title))
    .bind(update.description.as_deref().unwrap_or(&existing.description))
    .bind(update.category.as_deref().map(str::trim).unwrap_or(&existing.category))
    .bind(update.country.as_deref().map(str::trim).unwrap_or(&existing.country))
    .bind(update.image_url.unwrap_or(existing.image_url))
    .bind(to_json_text(&steps))
    .bind(Utc::now())
    .bind(&guide_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated = find_guide(&app_state.db_pool, &guide_id).await?;
    info!("✏️ Updated guide: {} ({})", updated.title, updated.id);

    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

pub async fn delete_guide(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, UserRole::can_manage_catalog)?;
    let guide_id = path.into_inner();

    let result = sqlx::query("DELETE FROM guides WHERE id = ?")
        .bind(&guide_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::guide_not_found(&guide_id));
    }

    info!("🗑️ Deleted guide: {}", guide_id);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Guide deleted successfully".to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use crate::auth::UserRole;
    use crate::test_support::{bearer, register_user, test_state};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn test_guide_search_by_category() {
        let (state, auth) = test_state().await;
        let (_, admin) = register_user(&state, &auth, "admin", UserRole::Admin).await;
        let app = crate::test_app!(state, auth);

        for (title, category, country) in [
            ("Getting a student visa", "Visa & Immigration", "Japan"),
            ("Writing your statement", "Essay Writing", "Germany"),
            ("Residence permits", "Visa & Immigration", "Germany"),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/v1/guides")
                .insert_header(bearer(&admin))
                .set_json(json!({
                    "title": title,
                    "category": category,
                    "country": country,
                    "steps": [{"title": "Step one", "content": "Do it"}],
                }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get()
            .uri("/api/v1/public/guides/search?category=Visa%20%26%20Immigration&country=Germany&level=PhD")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total_count"], 1);
        assert_eq!(body["data"]["items"][0]["title"], "Residence permits");
        assert_eq!(body["data"]["page_size"], 12);
        assert_eq!(body["data"]["facets"]["fields"].as_array().unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn test_guide_steps_validation_and_update() {
        let (state, auth) = test_state().await;
        let (_, admin) = register_user(&state, &auth, "admin", UserRole::Admin).await;
        let app = crate::test_app!(state, auth);

        let req = test::TestRequest::post()
            .uri("/api/v1/guides")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "title": "Bad",
                "category": "Essay Writing",
                "country": "Kenya",
                "steps": [{"title": "", "content": "x"}],
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let req = test::TestRequest::post()
            .uri("/api/v1/guides")
            .insert_header(bearer(&admin))
            .set_json(json!({"title": "Good", "category": "Essay Writing", "country": "Kenya"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["steps"], json!([]));

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/guides/{}", id))
            .insert_header(bearer(&admin))
            .set_json(json!({"steps": [{"title": "Draft", "content": "Write"}]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["steps"][0]["title"], "Draft");
        assert_eq!(body["data"]["title"], "Good");
    }

    #[actix_rt::test]
    async fn test_explicit_null_clears_image_url() {
        let (state, auth) = test_state().await;
        let (_, admin) = register_user(&state, &auth, "admin", UserRole::Admin).await;
        let app = crate::test_app!(state, auth);

        let req = test::TestRequest::post()
            .uri("/api/v1/guides")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "title": "Packing list",
                "category": "Pre-Departure",
                "country": "Japan",
                "image_url": "https://img.example.org/packing.png",
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/guides/{}", id))
            .insert_header(bearer(&admin))
            .set_json(json!({"image_url": null}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["image_url"], Value::Null);
        assert_eq!(body["data"]["title"], "Packing list");
    }

    #[actix_rt::test]
    async fn test_categories_are_seeded() {
        let (state, auth) = test_state().await;
        let app = crate::test_app!(state, auth);

        let req = test::TestRequest::get().uri("/api/v1/public/guide-categories").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0], "Application Tips");
    }
}
