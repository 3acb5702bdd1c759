// src/client.rs
//! Typed HTTP client for the Scholarship Hub API.
//!
//! [`ApiClient`] owns the session explicitly: `sign_in`, `sign_up` and
//! `restore_session` establish it, `sign_out` tears it down. Calls that need
//! a signed-in user fail with [`ClientError::NotSignedIn`] without touching
//! the network. Request bodies are validated locally first, so a form error
//! comes back per field and is never submitted.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest, UserInfo};
use crate::catalog::sort::PostSort;
use crate::catalog::{FilterCriteria, FilterResult, PageWindow};
use crate::handlers::ApiResponse;
use crate::models::{
    ChatMessage, ChatRequest, Comment, CreateCommentRequest, CreateNoteRequest, CreatePostRequest,
    Guide, LikeState, Note, Post, SaveState, Scholarship, UpdateNoteRequest,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ==================== ERRORS ====================

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests, try again later")]
    RateLimited,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
}

/// How a view should present a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Show a transient notification; local state stays or is reverted.
    Transient,
    /// Show next to the offending form field.
    Validation,
    /// Show the empty/not-found state.
    NotFound,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation { .. } => ErrorKind::Validation,
            ClientError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Transient,
        }
    }

    /// Maps an error response of the API (`{success: false, message}`).
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }

        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| body.trim().to_string());

        match StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR) {
            StatusCode::NOT_FOUND => {
                ClientError::NotFound(message.trim_start_matches("Not Found: ").to_string())
            }
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = message
                    .strip_prefix("Validation Error: ")
                    .or_else(|| message.strip_prefix("Bad Request: "))
                    .unwrap_or(&message);
                match detail.split_once(": ") {
                    Some((field, msg)) if !field.is_empty() && !field.contains(' ') => {
                        ClientError::Validation { field: field.to_string(), message: msg.to_string() }
                    }
                    _ => ClientError::Validation { field: String::new(), message: detail.to_string() },
                }
            }
            _ => ClientError::Status { status, message },
        }
    }
}

impl From<ValidationErrors> for ClientError {
    /// Reports the first failing field in alphabetical order.
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                errs.first().map(|e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    (field.to_string(), message)
                })
            })
            .collect();
        fields.sort();

        match fields.into_iter().next() {
            Some((field, message)) => ClientError::Validation { field, message },
            None => ClientError::Validation { field: String::new(), message: errors.to_string() },
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

// ==================== SESSION ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserInfo,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }
}

// ==================== CLIENT ====================

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("scholarhub-client/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_admin)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> ClientResult<RequestBuilder> {
        let session = self.session.as_ref().ok_or(ClientError::NotSignedIn)?;
        Ok(builder.bearer_auth(&session.token))
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status.as_u16(), &body));
        }

        let envelope: ApiResponse<T> = response.json().await?;
        envelope.data.ok_or_else(|| ClientError::Status {
            status: status.as_u16(),
            message: "Response carried no data".to_string(),
        })
    }

    /// For endpoints whose envelope carries no data.
    async fn send_unit(builder: RequestBuilder) -> ClientResult<()> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_response(status.as_u16(), &body))
    }

    // ---------- session lifecycle ----------

    pub async fn sign_up(&mut self, request: RegisterRequest) -> ClientResult<&Session> {
        request.validate()?;
        let response: LoginResponse =
            Self::send(self.http.post(self.url("/auth/register")).json(&request)).await?;
        Ok(&*self.session.insert(Session { token: response.token, user: response.user }))
    }

    pub async fn sign_in(&mut self, username: &str, password: &str) -> ClientResult<&Session> {
        let request = LoginRequest { username: username.to_string(), password: password.to_string() };
        request.validate()?;
        let response: LoginResponse =
            Self::send(self.http.post(self.url("/auth/login")).json(&request)).await?;
        Ok(&*self.session.insert(Session { token: response.token, user: response.user }))
    }

    /// Re-establishes a session from a stored token. A rejected token leaves
    /// the client signed out.
    pub async fn restore_session(&mut self, token: impl Into<String>) -> ClientResult<&Session> {
        let token = token.into();
        self.session = None;
        let user: UserInfo = Self::send(
            self.http.get(self.url("/api/v1/auth/session")).bearer_auth(&token),
        )
        .await?;
        Ok(&*self.session.insert(Session { token, user }))
    }

    /// Revokes the token server-side. The local session is dropped even when
    /// the request fails.
    pub async fn sign_out(&mut self) -> ClientResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        Self::send_unit(
            self.http.post(self.url("/api/v1/auth/logout")).bearer_auth(&session.token),
        )
        .await
    }

    pub async fn update_profile(&mut self, request: UpdateProfileRequest) -> ClientResult<UserInfo> {
        request.validate()?;
        let builder = self.authed(self.http.put(self.url("/api/v1/auth/profile")).json(&request))?;
        let user: UserInfo = Self::send(builder).await?;
        if let Some(ref mut session) = self.session {
            session.user = user.clone();
        }
        Ok(user)
    }

    // ---------- catalog ----------

    pub async fn scholarships(&self) -> ClientResult<Vec<Scholarship>> {
        Self::send(self.http.get(self.url("/api/v1/public/scholarships"))).await
    }

    pub async fn scholarship(&self, id: &str) -> ClientResult<Scholarship> {
        Self::send(self.http.get(self.url(&format!("/api/v1/public/scholarships/{}", id)))).await
    }

    /// Server-side run of the filter engine.
    pub async fn search_scholarships(
        &self,
        criteria: &FilterCriteria,
        window: PageWindow,
    ) -> ClientResult<FilterResult<Scholarship>> {
        let builder = self
            .http
            .get(self.url("/api/v1/public/scholarships/search"))
            .query(&search_params(criteria, window));
        Self::send(builder).await
    }

    pub async fn guides(&self) -> ClientResult<Vec<Guide>> {
        Self::send(self.http.get(self.url("/api/v1/public/guides"))).await
    }

    pub async fn guide(&self, id: &str) -> ClientResult<Guide> {
        Self::send(self.http.get(self.url(&format!("/api/v1/public/guides/{}", id)))).await
    }

    pub async fn guide_categories(&self) -> ClientResult<Vec<String>> {
        Self::send(self.http.get(self.url("/api/v1/public/guide-categories"))).await
    }

    // ---------- saved ----------

    pub async fn saved_scholarships(&self) -> ClientResult<Vec<Scholarship>> {
        Self::send(self.authed(self.http.get(self.url("/api/v1/me/saved")))?).await
    }

    pub async fn save_scholarship(&self, id: &str) -> ClientResult<SaveState> {
        let url = self.url(&format!("/api/v1/scholarships/{}/save", id));
        Self::send(self.authed(self.http.post(url))?).await
    }

    pub async fn unsave_scholarship(&self, id: &str) -> ClientResult<SaveState> {
        let url = self.url(&format!("/api/v1/scholarships/{}/save", id));
        Self::send(self.authed(self.http.delete(url))?).await
    }

    // ---------- community ----------

    pub async fn posts(&self, sort: PostSort) -> ClientResult<Vec<Post>> {
        let sort = match sort {
            PostSort::MostRecent => "most_recent",
            PostSort::MostLiked => "most_liked",
        };
        let builder = self.http.get(self.url("/api/v1/posts")).query(&[("sort", sort)]);
        Self::send(self.authed(builder)?).await
    }

    pub async fn post(&self, id: &str) -> ClientResult<Post> {
        let url = self.url(&format!("/api/v1/posts/{}", id));
        Self::send(self.authed(self.http.get(url))?).await
    }

    pub async fn create_post(&self, request: &CreatePostRequest) -> ClientResult<Post> {
        request.validate()?;
        Self::send(self.authed(self.http.post(self.url("/api/v1/posts")).json(request))?).await
    }

    pub async fn delete_post(&self, id: &str) -> ClientResult<()> {
        let url = self.url(&format!("/api/v1/posts/{}", id));
        Self::send_unit(self.authed(self.http.delete(url))?).await
    }

    pub async fn toggle_post_like(&self, id: &str) -> ClientResult<LikeState> {
        let url = self.url(&format!("/api/v1/posts/{}/like", id));
        Self::send(self.authed(self.http.post(url))?).await
    }

    pub async fn comments(&self, post_id: &str) -> ClientResult<Vec<Comment>> {
        let url = self.url(&format!("/api/v1/posts/{}/comments", post_id));
        Self::send(self.authed(self.http.get(url))?).await
    }

    pub async fn create_comment(&self, post_id: &str, request: &CreateCommentRequest) -> ClientResult<Comment> {
        request.validate()?;
        let url = self.url(&format!("/api/v1/posts/{}/comments", post_id));
        Self::send(self.authed(self.http.post(url).json(request))?).await
    }

    pub async fn delete_comment(&self, id: &str) -> ClientResult<()> {
        let url = self.url(&format!("/api/v1/comments/{}", id));
        Self::send_unit(self.authed(self.http.delete(url))?).await
    }

    pub async fn toggle_comment_like(&self, id: &str) -> ClientResult<LikeState> {
        let url = self.url(&format!("/api/v1/comments/{}/like", id));
        Self::send(self.authed(self.http.post(url))?).await
    }

    // ---------- notes ----------

    pub async fn notes(&self) -> ClientResult<Vec<Note>> {
        Self::send(self.authed(self.http.get(self.url("/api/v1/notes")))?).await
    }

    pub async fn create_note(&self, request: &CreateNoteRequest) -> ClientResult<Note> {
        request.validate()?;
        Self::send(self.authed(self.http.post(self.url("/api/v1/notes")).json(request))?).await
    }

    pub async fn update_note(&self, id: &str, request: &UpdateNoteRequest) -> ClientResult<Note> {
        request.validate()?;
        let url = self.url(&format!("/api/v1/notes/{}", id));
        Self::send(self.authed(self.http.put(url).json(request))?).await
    }

    pub async fn delete_note(&self, id: &str) -> ClientResult<()> {
        let url = self.url(&format!("/api/v1/notes/{}", id));
        Self::send_unit(self.authed(self.http.delete(url))?).await
    }

    // ---------- assistant ----------

    /// Sends one message; returns the assistant's reply.
    pub async fn chat(&self, request: &ChatRequest) -> ClientResult<String> {
        #[derive(Deserialize)]
        struct Turn {
            response: String,
        }

        request.validate()?;
        let turn: Turn =
            Self::send(self.authed(self.http.post(self.url("/api/v1/chat")).json(request))?).await?;
        Ok(turn.response)
    }

    pub async fn chat_history(&self) -> ClientResult<Vec<ChatMessage>> {
        Self::send(self.authed(self.http.get(self.url("/api/v1/chat/history")))?).await
    }

    // ---------- translations ----------

    pub async fn translations(&self, locale: &str) -> ClientResult<BTreeMap<String, String>> {
        Self::send(self.http.get(self.url(&format!("/api/v1/public/translations/{}", locale)))).await
    }
}

fn search_params(criteria: &FilterCriteria, window: PageWindow) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", window.page.to_string()),
        ("per_page", window.page_size.to_string()),
    ];
    if !criteria.query.is_empty() {
        params.push(("q", criteria.query.clone()));
    }
    for (name, selection) in [
        ("country", &criteria.country),
        ("field", &criteria.field),
        ("level", &criteria.level),
    ] {
        if let Some(value) = selection.value() {
            params.push((name, value.to_string()));
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::test_support::{register_user, spawn_server, test_state, TEST_PASSWORD};

    #[test]
    fn test_error_mapping() {
        let err = ClientError::from_response(404, r#"{"success":false,"message":"Not Found: Note not found"}"#);
        assert!(matches!(err, ClientError::NotFound(ref m) if m == "Note not found"));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ClientError::from_response(
            422,
            r#"{"success":false,"message":"Validation Error: title: Title must be between 1 and 200 characters"}"#,
        );
        match err {
            ClientError::Validation { field, message } => {
                assert_eq!(field, "title");
                assert!(message.starts_with("Title must"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = ClientError::from_response(400, r#"{"success":false,"message":"Bad Request: Username or email already registered"}"#);
        assert!(matches!(err, ClientError::Validation { ref field, .. } if field.is_empty()));

        assert!(matches!(ClientError::from_response(429, ""), ClientError::RateLimited));
        let err = ClientError::from_response(502, "gateway down");
        assert!(matches!(err, ClientError::Status { status: 502, ref message } if message == "gateway down"));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_local_validation_reports_field() {
        let request = CreatePostRequest { title: String::new(), content: "body".into() };
        let err = ClientError::from(request.validate().unwrap_err());
        assert!(matches!(err, ClientError::Validation { ref field, .. } if field == "title"));
    }

    #[test]
    fn test_search_params_skip_sentinels() {
        let criteria = FilterCriteria::new().with_query("tokyo").with_level("PhD");
        let params = search_params(&criteria, PageWindow::new(2, 16));
        assert_eq!(
            params,
            vec![
                ("page", "2".to_string()),
                ("per_page", "16".to_string()),
                ("q", "tokyo".to_string()),
                ("level", "PhD".to_string()),
            ]
        );
    }

    #[actix_rt::test]
    async fn test_calls_without_session_fail_locally() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client.notes().await.unwrap_err();
        assert!(matches!(err, ClientError::NotSignedIn));
    }

    #[actix_rt::test]
    async fn test_session_lifecycle_against_server() {
        let (state, auth) = test_state().await;
        register_user(&state, &auth, "amina", UserRole::Student).await;
        let base_url = spawn_server(state, auth);

        let mut client = ApiClient::new(&base_url).unwrap();
        let session = client.sign_in("amina", TEST_PASSWORD).await.unwrap();
        assert_eq!(session.user.username, "amina");
        assert!(!session.is_admin());
        let token = session.token.clone();

        let note = client
            .create_note(&CreateNoteRequest { title: "Deadlines".into(), content: String::new() })
            .await
            .unwrap();
        assert_eq!(client.notes().await.unwrap(), vec![note]);

        let mut restored = ApiClient::new(&base_url).unwrap();
        restored.restore_session(token.clone()).await.unwrap();
        assert!(restored.is_signed_in());

        client.sign_out().await.unwrap();
        assert!(!client.is_signed_in());

        let mut stale = ApiClient::new(&base_url).unwrap();
        assert!(stale.restore_session(token).await.is_err());
        assert!(!stale.is_signed_in());

        assert!(client.scholarships().await.unwrap().is_empty());
        let err = client.scholarship("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
