use std::collections::HashMap;

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::auth::SessionUser;
use super::AppState;
use crate::error::{AppError, Result};
use crate::form::{schedule_to_csv_string, validate_submission, AvailabilitySubmission};
use crate::schedule::WeekId;

#[derive(Deserialize)]
pub struct WeekQuery {
    pub week: WeekId,
}

async fn list_employees(_user: SessionUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let employees = state.stores.users.list_employees().await?;
    Ok(HttpResponse::Ok().json(employees))
}

// The caller's own saved availability for a week
async fn get_availability(
    user: SessionUser,
    query: web::Query<WeekQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let records = state.stores.availability.for_user(user.user_id, query.week).await?;
    Ok(HttpResponse::Ok().json(records))
}

async fn save_availability(
    user: SessionUser,
    req: web::Json<AvailabilitySubmission>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let validated = validate_submission(&req)?;
    let saved = state
        .stores
        .availability
        .save_week(user.user_id, validated.week, &validated.cells)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Availability saved successfully",
        "saved": saved,
    })))
}

async fn get_published(
    _user: SessionUser,
    query: web::Query<WeekQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let published = state.stores.schedules.published(query.week).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "week": query.week,
        "schedule_data": published.as_ref().map(|p| &p.schedule),
        "updated_at": published.as_ref().map(|p| &p.updated_at),
    })))
}

async fn export_published(
    _user: SessionUser,
    query: web::Query<WeekQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let published = state
        .stores
        .schedules
        .published(query.week)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No published schedule for week {}", query.week)))?;

    let names: HashMap<i64, String> = state
        .stores
        .users
        .list_employees()
        .await?
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect();
    let csv = schedule_to_csv_string(&published.schedule, &names)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format!("schedule-{}.csv", query.week))],
        })
        .body(csv))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/employees", web::get().to(list_employees))
        .route("/availability", web::get().to(get_availability))
        .route("/availability", web::post().to(save_availability))
        .route("/published", web::get().to(get_published))
        .route("/published.csv", web::get().to(export_published));
}
