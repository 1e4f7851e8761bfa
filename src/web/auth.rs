use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use actix_session::{Session, SessionExt};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{AppError, Result};
use crate::form::{validate_registration, RegistrationRequest};
use crate::store::{Role, User};

const USER_ID_KEY: &str = "user_id";
const EXPIRES_AT_KEY: &str = "expires_at";
const OAUTH_STATE_KEY: &str = "oauth_state";

fn session_error(e: impl std::fmt::Display) -> AppError {
    AppError::Session(e.to_string())
}

/// Starts a fresh session for `user_id` that expires after `ttl`.
///
/// The expiry lives inside the signed cookie, so a copied or replayed cookie
/// stops working on time regardless of what the browser does with Max-Age.
pub fn start_session(session: &Session, user_id: i64, ttl: Duration) -> Result<()> {
    let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    session.renew();
    session.insert(USER_ID_KEY, user_id).map_err(session_error)?;
    session
        .insert(EXPIRES_AT_KEY, Utc::now().timestamp().saturating_add(ttl))
        .map_err(session_error)?;
    Ok(())
}

/// The user id of a live session.
fn session_user_id(session: &Session) -> Result<i64> {
    let user_id = session.get::<i64>(USER_ID_KEY).map_err(session_error)?;
    let expires_at = session.get::<i64>(EXPIRES_AT_KEY).map_err(session_error)?;
    match (user_id, expires_at) {
        (Some(user_id), Some(expires_at)) if Utc::now().timestamp() < expires_at => Ok(user_id),
        (Some(user_id), _) => {
            tracing::info!(user_id, "Session expired");
            session.purge();
            Err(AppError::Unauthorized)
        }
        _ => Err(AppError::Unauthorized),
    }
}

/// The logged-in user. The role is read from the database on every request,
/// so role changes and deleted accounts take effect immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub user_id: i64,
    pub role: Role,
}

impl FromRequest for SessionUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.get_session();
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let user_id = session_user_id(&session)?;
            let state = state.ok_or_else(|| AppError::Session("application state missing".to_string()))?;

            match state.stores.users.find_by_id(user_id).await? {
                Some(user) => Ok(SessionUser {
                    user_id: user.id,
                    role: user.role,
                }),
                None => {
                    tracing::info!(user_id, "Session for a deleted user");
                    session.purge();
                    Err(AppError::Unauthorized)
                }
            }
        })
    }
}

/// A session user whose role is manager.
#[derive(Debug, Clone, Copy)]
pub struct Manager(pub SessionUser);

impl FromRequest for Manager {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = SessionUser::from_request(req, payload);
        Box::pin(async move {
            let user = user.await?;
            if user.role == Role::Manager {
                Ok(Manager(user))
            } else {
                Err(AppError::Forbidden)
            }
        })
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user_id: i64,
    role: Role,
    name: String,
}

// Registration endpoint
async fn register(
    req: web::Json<RegistrationRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let new_user = validate_registration(&req)?;
    let user = state.stores.users.create(&new_user).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User created successfully",
        "userId": user.id,
    })))
}

// Login endpoint
async fn login(
    req: web::Json<LoginRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let Some(user) = state.stores.users.find_by_email(&req.email).await? else {
        tracing::info!("Login attempt for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !state.stores.users.verify_password(&user, &req.password)? {
        tracing::info!(user_id = user.id, "Login rejected");
        return Err(AppError::InvalidCredentials);
    }

    start_session(&session, user.id, state.session_ttl)?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(HttpResponse::Ok().json(LoginResponse {
        user_id: user.id,
        role: user.role,
        name: user.display_name().to_string(),
    }))
}

async fn logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::Ok().json(serde_json::json!({"message": "Logged out"}))
}

async fn me(user: SessionUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let account = state
        .stores
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "userId": account.id,
        "role": account.role,
        "name": account.display_name(),
        "email": account.email,
    })))
}

#[derive(Deserialize)]
pub struct GoogleCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn home_for(user: &User) -> &'static str {
    match user.role {
        Role::Manager => "/manager",
        Role::Employee => "/availability",
    }
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

// Sends the browser to Google's consent page
async fn google_login(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))?;

    let (url, csrf) = google.authorize_url();
    session
        .insert(OAUTH_STATE_KEY, csrf.secret())
        .map_err(session_error)?;

    Ok(redirect(&url))
}

async fn google_callback(
    query: web::Query<GoogleCallback>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))?;

    let expected = session.get::<String>(OAUTH_STATE_KEY).map_err(session_error)?;
    session.remove(OAUTH_STATE_KEY);

    if let Some(error) = &query.error {
        tracing::info!(error = %error, "Google sign-in declined");
        return Ok(redirect("/"));
    }
    match (&expected, &query.state) {
        (Some(expected), Some(returned)) if expected == returned => {}
        _ => return Err(AppError::Validation("Invalid sign-in state".to_string())),
    }
    let code = query
        .code
        .clone()
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let profile = google.fetch_profile(code).await?;
    let user = state.stores.users.find_or_link_google(&profile).await?;
    start_session(&session, user.id, state.session_ttl)?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in with Google");

    Ok(redirect(home_for(&user)))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/logout", web::post().to(logout))
        .route("/me", web::get().to(me))
        .route("/google", web::get().to(google_login))
        .route("/google/callback", web::get().to(google_callback));
}
