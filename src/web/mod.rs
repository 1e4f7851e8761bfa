pub mod auth;
pub mod availability;
pub mod google;
pub mod manager;

use std::sync::{Mutex, PoisonError};
use std::time::Duration as StdDuration;

use actix_files::Files;
use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::time::Duration;
use actix_web::cookie::Key;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::ServerConfig;
use crate::error::{AppError, Result};
use crate::schedule::{generate_options, ScheduleOption, WeekAvailability};
use crate::store::{self, Stores};

pub use google::GoogleAuth;

pub const SESSION_COOKIE: &str = "shift_session";
pub const DEFAULT_SESSION_TTL: StdDuration = StdDuration::from_secs(3600);

/// Shared by every worker: repositories, the generator's random source and
/// login settings.
pub struct AppState {
    pub stores: Stores,
    pub session_ttl: StdDuration,
    pub google: Option<GoogleAuth>,
    rng: Mutex<StdRng>,
}

impl AppState {
    pub fn new(stores: Stores, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            stores,
            session_ttl: DEFAULT_SESSION_TTL,
            google: None,
            rng: Mutex::new(rng),
        }
    }

    pub fn with_session_ttl(mut self, ttl: StdDuration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_google(mut self, google: GoogleAuth) -> Self {
        self.google = Some(google);
        self
    }

    pub fn generate_options(&self, availability: &WeekAvailability, count: usize) -> Vec<ScheduleOption> {
        // A panic mid-generation leaves the rng in a usable state.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        generate_options(availability, count, &mut *rng)
    }
}

/// Signed cookie sessions. `ttl` only sets the cookie's Max-Age; the
/// expiry that counts is stored in the session by `auth::start_session`.
pub fn session_middleware(key: Key, secure: bool, ttl: StdDuration) -> SessionMiddleware<CookieSessionStore> {
    let max_age = Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_secure(secure)
        .session_lifecycle(PersistentSession::default().session_ttl(max_age))
        .build()
}

// HTML page handlers
async fn index() -> HttpResponse {
    let html = include_str!("../../templates/index.html");
    HttpResponse::Ok().content_type("text/html").body(html)
}

async fn availability_page() -> HttpResponse {
    let html = include_str!("../../templates/availability.html");
    HttpResponse::Ok().content_type("text/html").body(html)
}

async fn manager_page() -> HttpResponse {
    let html = include_str!("../../templates/manager.html");
    HttpResponse::Ok().content_type("text/html").body(html)
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({"message": "Route not found"}))
}

/// API routes, pages, the 404 fallback and body/query error handling.
/// Session middleware and state are added by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .service(web::scope("/api/auth").configure(auth::routes))
    .service(
        web::scope("/api/schedules")
            .configure(availability::routes)
            .configure(manager::routes),
    )
    .route("/", web::get().to(index))
    .route("/availability", web::get().to(availability_page))
    .route("/manager", web::get().to(manager_page))
    .default_service(web::route().to(not_found));
}

pub async fn start_server(config: ServerConfig) -> Result<()> {
    config.validate()?;

    let pool = store::connect(&config.database_url).await?;
    let mut app_state = AppState::new(Stores::new(pool, config.password_hash_cost), config.seed)
        .with_session_ttl(config.session_ttl);
    if let Some(google) = &config.google {
        app_state = app_state.with_google(GoogleAuth::new(google)?);
        tracing::info!(redirect_url = %google.redirect_url, "Google sign-in enabled");
    }
    let app_state = web::Data::new(app_state);
    let key = config.session_key();
    let secure = config.secure_cookies;
    let ttl = config.session_ttl;
    let static_dir = config.static_dir.clone();

    tracing::info!(host = %config.host, port = config.port, "Starting web server");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(session_middleware(key.clone(), secure, ttl))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", &static_dir))
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    const APP_JS: &str = include_str!("../../static/app.js");
    const MANAGER: &str = include_str!("../../templates/manager.html");
    const AVAILABILITY: &str = include_str!("../../templates/availability.html");

    #[test]
    fn pages_escape_employee_names_before_innerhtml() {
        assert!(APP_JS.contains("function escapeHtml"));
        assert!(APP_JS.contains("'<': '&lt;'"));
        assert!(APP_JS.contains("escapeHtml(employees[id]"));
        assert!(MANAGER.contains("${escapeHtml(name)}"));
        assert!(MANAGER.contains("${escapeHtml(w)}"));

        for page in [APP_JS, MANAGER, AVAILABILITY] {
            assert!(!page.contains(">${name}<"));
            assert!(!page.contains("<li>${w}</li>"));
        }
    }
}
