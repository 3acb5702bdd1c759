// src/auth_handlers.rs - Sign-up, sign-in, session and profile handlers

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Duration;
use std::sync::Arc;
use validator::Validate;

use crate::auth::{
    check_permission, get_current_user, revoke_token, AuthService, LoginRequest, LoginResponse,
    RegisterRequest, UpdateProfileRequest, User, UserInfo, UserRole,
};
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::AppState;

pub async fn login(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let auth_config = &app_state.config.auth;

    let mut user = User::find_by_username(&app_state.db_pool, &request.username).await
        .map_err(|_| ApiError::BadRequest("Invalid username or password".to_string()))?;

    if !user.is_active {
        return Err(ApiError::AuthError("Account is disabled".to_string()));
    }

    if user.is_locked() {
        return Err(ApiError::AuthError("Account is temporarily locked. Try again later.".to_string()));
    }

    if !auth_service.verify_password(&request.password, &user.password_hash)
        .map_err(|_| ApiError::InternalServerError("Password verification failed".to_string()))? {

        user.increment_failed_attempts(&app_state.db_pool).await?;

        if user.failed_login_attempts >= auth_config.max_login_attempts {
            user.lock_for_duration(
                &app_state.db_pool,
                Duration::minutes(auth_config.lockout_duration_minutes),
            ).await?;
            log::warn!("🔒 Account {} locked after {} failed attempts", user.username, user.failed_login_attempts);
            return Err(ApiError::AuthError(format!(
                "Account locked due to too many failed attempts. Try again in {} minutes.",
                auth_config.lockout_duration_minutes
            )));
        }

        return Err(ApiError::BadRequest("Invalid username or password".to_string()));
    }

    user.reset_failed_attempts(&app_state.db_pool).await?;
    user.update_last_login(&app_state.db_pool).await?;

    let token = auth_service.generate_token(&user)?;

    let response = LoginResponse {
        token,
        expires_in: auth_service.token_lifetime_secs(),
        user: user.clone().into(),
    };

    log::info!("User {} logged in successfully", user.username);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        response,
        "Login successful".to_string(),
    )))
}

/// Self sign-up. The very first account becomes the administrator; the count
/// and the insert share one transaction.
pub async fn register(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let mut tx = app_state.db_pool.begin().await?;

    let user_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;

    let role = if user_count.0 == 0 {
        UserRole::Admin
    } else if app_state.config.auth.allow_self_registration {
        UserRole::Student
    } else {
        return Err(ApiError::Forbidden("Self-registration is disabled".to_string()));
    };

    let taken: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
        .bind(&request.username)
        .bind(&request.email)
        .fetch_one(&mut *tx)
        .await?;
    if taken.0 > 0 {
        return Err(ApiError::BadRequest("Username or email already registered".to_string()));
    }

    let user = User::create(&mut *tx, request.into_inner(), role, &auth_service).await?;
    tx.commit().await?;

    let token = auth_service.generate_token(&user)?;

    let response = LoginResponse {
        token,
        expires_in: auth_service.token_lifetime_secs(),
        user: user.into(),
    };

    log::info!("New user registered: {} with role {}", response.user.username, response.user.role);

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        response,
        "User registered successfully".to_string(),
    )))
}

/// Sign-out: the presented token is revoked until it would have expired.
pub async fn logout(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    revoke_token(&app_state.db_pool, &claims).await?;

    log::info!("User {} signed out", claims.username);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Signed out".to_string(),
    )))
}

/// Restores a session from a stored token: identity plus the admin flag.
pub async fn get_session(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let user = User::find_by_id(&app_state.db_pool, &claims.sub).await
        .map_err(|_| ApiError::Unauthorized("Session user no longer exists".to_string()))?;

    if !user.is_active {
        return Err(ApiError::AuthError("Account is disabled".to_string()));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::from(user))))
}

pub async fn update_profile(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<UpdateProfileRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let claims = get_current_user(&http_request)?;

    let mut user = User::find_by_id(&app_state.db_pool, &claims.sub).await?;
    user.update_profile(&app_state.db_pool, request.into_inner()).await?;

    log::info!("👤 Updated profile of {}", user.username);

    Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::from(user))))
}

// ======== USER MANAGEMENT (ADMIN) ========

pub async fn get_users(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    check_permission(&claims, |role| role.can_manage_users())?;

    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&app_state.db_pool)
        .await?;

    let user_infos: Vec<UserInfo> = users.into_iter().map(|u| u.into()).collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(user_infos)))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{bearer, register_user, test_state};
    use crate::auth::UserRole;
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn test_first_user_becomes_admin() {
        let (state, auth) = test_state().await;
        let app = crate::test_app!(state, auth);

        let first = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({"username": "first", "email": "first@example.org", "password": "Scholar2026"}))
            .to_request();
        let resp = test::call_service(&app, first).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["user"]["is_admin"], true);

        let second = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({"username": "second", "email": "second@example.org", "password": "Scholar2026"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, second).await;
        assert_eq!(body["data"]["user"]["role"], "student");
        assert_eq!(body["data"]["user"]["is_admin"], false);
    }

    #[actix_rt::test]
    async fn test_duplicate_username_rejected() {
        let (state, auth) = test_state().await;
        register_user(&state, &auth, "amina", UserRole::Student).await;
        let app = crate::test_app!(state, auth);

        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({"username": "amina", "email": "other@example.org", "password": "Scholar2026"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_login_session_and_logout() {
        let (state, auth) = test_state().await;
        register_user(&state, &auth, "amina", UserRole::Student).await;
        let app = crate::test_app!(state, auth);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"username": "amina", "password": "Scholar2026"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/session")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["username"], "amina");

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/logout")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/session")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        let status = match resp {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_wrong_password_and_lockout() {
        let (state, auth) = test_state().await;
        register_user(&state, &auth, "amina", UserRole::Student).await;
        let max_attempts = state.config.auth.max_login_attempts;
        let app = crate::test_app!(state, auth);

        for attempt in 1..=max_attempts {
            let req = test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({"username": "amina", "password": "WrongPass1"}))
                .to_request();
            let status = test::call_service(&app, req).await.status();
            if attempt < max_attempts {
                assert_eq!(status, StatusCode::BAD_REQUEST);
            } else {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
            }
        }

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"username": "amina", "password": "Scholar2026"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_profile_update_and_admin_listing() {
        let (state, auth) = test_state().await;
        let (_, admin_token) = register_user(&state, &auth, "admin", UserRole::Admin).await;
        let (_, student_token) = register_user(&state, &auth, "amina", UserRole::Student).await;
        let app = crate::test_app!(state, auth);

        let req = test::TestRequest::put()
            .uri("/api/v1/auth/profile")
            .insert_header(bearer(&student_token))
            .set_json(json!({"country": " Kenya ", "field_of_study": "Medicine"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["country"], "Kenya");
        assert_eq!(body["data"]["field_of_study"], "Medicine");

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/users")
            .insert_header(bearer(&student_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/users")
            .insert_header(bearer(&admin_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }
}
