// src/scholarship_handlers.rs
//! Scholarship catalog: public reads, admin CRUD and per-user saved list.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{get_current_user, require_permission, UserRole};
use crate::catalog::sort::ScholarshipSort;
use crate::catalog::{collect_facets, count_matches, filter_catalog, total_pages};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ApiResponse, CatalogQuery};
use crate::models::{
    normalize_list, to_json_text, CreateScholarshipRequest, DegreeLevel, SaveState, Scholarship,
    ScholarshipRow, UpdateScholarshipRequest,
};
use crate::AppState;

// ==================== LOADING ====================

fn rows_to_scholarships(rows: Vec<ScholarshipRow>) -> Vec<Scholarship> {
    rows.into_iter()
        .filter_map(|row| match Scholarship::try_from(row) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Skipping scholarship row: {}", e);
                None
            }
        })
        .collect()
}

/// Full table, newest first.
pub async fn load_scholarships(pool: &SqlitePool) -> ApiResult<Vec<Scholarship>> {
    let rows: Vec<ScholarshipRow> = sqlx::query_as(
        r#"SELECT id, title, institution, country, level, deadline, fields, description,
                  benefits, requirements, application_url, source_url, featured,
                  created_at, updated_at
           FROM scholarships ORDER BY created_at DESC, id ASC"#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows_to_scholarships(rows))
}

pub async fn find_scholarship(pool: &SqlitePool, id: &str) -> ApiResult<Scholarship> {
    let row: Option<ScholarshipRow> = sqlx::query_as(
        r#"SELECT id, title, institution, country, level, deadline, fields, description,
                  benefits, requirements, application_url, source_url, featured,
                  created_at, updated_at
           FROM scholarships WHERE id = ?"#
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or_else(|| ApiError::scholarship_not_found(id))?;
    Scholarship::try_from(row).map_err(ApiError::InternalServerError)
}

fn parse_level(raw: &str) -> ApiResult<DegreeLevel> {
    DegreeLevel::from_str(raw.trim()).ok_or_else(|| ApiError::invalid_level(raw))
}

// ==================== PUBLIC READS ====================

/// Whole catalog with no filtering; `sort` is honoured.
pub async fn get_all_scholarships(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CatalogQuery>,
) -> ApiResult<HttpResponse> {
    let mut scholarships = load_scholarships(&app_state.db_pool).await?;
    ScholarshipSort::parse(query.sort.as_deref()).apply(&mut scholarships);

    Ok(HttpResponse::Ok().json(ApiResponse::success(scholarships)))
}

/// Runs the catalog engine over the full table. The requested page is
/// clamped into range before slicing.
pub async fn search_scholarships(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CatalogQuery>,
) -> ApiResult<HttpResponse> {
    let mut scholarships = load_scholarships(&app_state.db_pool).await?;
    ScholarshipSort::parse(query.sort.as_deref()).apply(&mut scholarships);

    let criteria = query.criteria();
    let window = query.window(app_state.config.catalog.scholarship_page_size);
    let pages = total_pages(count_matches(&scholarships, &criteria), window.page_size);
    let result = filter_catalog(&scholarships, &criteria, window.clamped(pages)).into_owned();

    Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
}

pub async fn get_scholarship_facets(
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let scholarships = load_scholarships(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(collect_facets(&scholarships))))
}

pub async fn get_scholarship(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let scholarship = find_scholarship(&app_state.db_pool, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(scholarship)))
}

// ==================== ADMIN CRUD ====================

pub async fn create_scholarship(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<CreateScholarshipRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = require_permission(&http_request, UserRole::can_manage_catalog)?;
    request.validate()?;
    let level = parse_level(&request.level)?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"INSERT INTO scholarships (
            id, title, institution, country, level, deadline, fields, description,
            benefits, requirements, application_url, source_url, featured,
            created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
    )
    .bind(&id)
    .bind(request.title.trim())
    .bind(request.institution.trim())
    .bind(request.country.trim())
    .bind(level.as_str())
    .bind(request.deadline)
    .bind(to_json_text(&normalize_list(&request.fields)))
    .bind(request.description.as_deref().unwrap_or_default())
    .bind(to_json_text(&normalize_list(&request.benefits)))
    .bind(to_json_text(&normalize_list(&request.requirements)))
    .bind(&request.application_url)
    .bind(&request.source_url)
    .bind(request.featured)
    .bind(&claims.sub)
    .bind(now)
    .bind(now)
    .execute(&app_state.db_pool)
    .await?;

    let created = find_scholarship(&app_state.db_pool, &id).await?;
    info!("🎓 Created scholarship: {} ({})", created.title, created.id);

    Ok(HttpResponse::Created().json(ApiResponse::success(created)))
}

pub async fn update_scholarship(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdateScholarshipRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, UserRole::can_manage_catalog)?;
    update.validate()?;
    let scholarship_id = path.into_inner();

    let existing = find_scholarship(&app_state.db_pool, &scholarship_id).await?;
    let update = update.into_inner();

    let level = match update.level {
        Some(ref raw) => parse_level(raw)?,
        None => existing.level,
    };
    let fields = update.fields.map(|f| normalize_list(&f)).unwrap_or(existing.fields);
    let benefits = update.benefits.map(|b| normalize_list(&b)).unwrap_or(existing.benefits);
    let requirements = update
        .requirements
        .map(|r| normalize_list(&r))
        .unwrap_or(existing.requirements);

    sqlx::query(
        r#"
        UPDATE scholarships
        SET title = ?, institution = ?, country = ?, level = ?, deadline = ?, fields = ?,
            description = ?, benefits = ?, requirements = ?, application_url = ?,
            source_url = ?, featured = ?, updated_at = ?
        WHERE id = ?
        "#
    )
    .bind(update.title.as_deref().map(str::trim).unwrap_or(&existing.title))
    .bind(update.institution.as_deref().map(str::trim).unwrap_or(&existing.institution))
    .bind(update.country.as_deref().map(str::trim).unwrap_or(&existing.country))
    .bind(level.as_str())
    .bind(update.deadline.unwrap_or(existing.deadline))
    .bind(to_json_text(&fields))
    .bind(update.description.as_deref().unwrap_or(&existing.description))
    .bind(to_json_text(&benefits))
    .bind(to_json_text(&requirements))
    .bind(update.application_url.as_deref().unwrap_or(&existing.application_url))
    .bind(update.source_url.unwrap_or(existing.source_url))
    .bind(update.featured.unwrap_or(existing.featured))
    .bind(Utc::now())
    .bind(&scholarship_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated = find_scholarship(&app_state.db_pool, &scholarship_id).await?;
    info!("✏️ Updated scholarship: {} ({})", updated.title, updated.id);

    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

pub async fn delete_scholarship(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, UserRole::can_manage_catalog)?;
    let scholarship_id = path.into_inner();

    let result = sqlx::query("DELETE FROM scholarships WHERE id = ?")
        .bind(&scholarship_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::scholarship_not_found(&scholarship_id));
    }

    info!("🗑️ Deleted scholarship: {}", scholarship_id);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Scholarship deleted successfully".to_string(),
    )))
}

// ==================== SAVED ====================

pub async fn save_scholarship(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let scholarship_id = path.into_inner();
    find_scholarship(&app_state.db_pool, &scholarship_id).await?;

    sqlx::query(
        "INSERT OR IGNORE INTO saved_scholarships (user_id, scholarship_id, created_at) VALUES (?, ?, ?)"
    )
    .bind(&claims.sub)
    .bind(&scholarship_id)
    .bind(Utc::now())
    .execute(&app_state.db_pool)
    .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(SaveState { saved: true })))
}

pub async fn unsave_scholarship(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    sqlx::query("DELETE FROM saved_scholarships WHERE user_id = ? AND scholarship_id = ?")
        .bind(&claims.sub)
        .bind(path.into_inner())
        .execute(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(SaveState { saved: false })))
}

/// Caller's saved scholarships, most recently saved first.
pub async fn get_saved_scholarships(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let rows: Vec<ScholarshipRow> = sqlx::query_as(
        r#"SELECT s.id, s.title, s.institution, s.country, s.level, s.deadline, s.fields,
                  s.description, s.benefits, s.requirements, s.application_url, s.source_url,
                  s.featured, s.created_at, s.updated_at
           FROM saved_scholarships ss
           JOIN scholarships s ON s.id = ss.scholarship_id
           WHERE ss.user_id = ?
           ORDER BY ss.created_at DESC, s.id ASC"#
    )
    .bind(&claims.sub)
    .fetch_all(&app_state.db_pool)
    .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(rows_to_scholarships(rows))))
}
