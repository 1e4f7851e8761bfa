use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::auth::Manager;
use super::availability::WeekQuery;
use super::AppState;
use crate::error::{AppError, Result};
use crate::schedule::{
    find_duplicate_assignments, AvailabilityList, ScheduleOption, WeekAvailability, WeekId,
    OPTIONS_PER_REQUEST,
};
use crate::store::StoredOption;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManagerOptionsResponse {
    schedule_options: Vec<StoredOption>,
    employee_availability: WeekAvailability,
    availability_list: AvailabilityList,
}

#[derive(Deserialize)]
pub struct WeekBody {
    pub week: WeekId,
}

#[derive(Deserialize)]
pub struct SubmittedOption {
    pub data: ScheduleOption,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    #[serde(default)]
    pub schedules: Vec<SubmittedOption>,
    pub week: WeekId,
    pub selected_option_index: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub week: WeekId,
    pub schedule_data: ScheduleOption,
}

/// Options shown to the manager.
///
/// Once options have been saved for the week, the saved selection (or the
/// first saved option if none is flagged) comes first and stays selected,
/// next to one fresh option. Otherwise every option is fresh.
pub fn assemble_options(stored: &[StoredOption], fresh: Vec<ScheduleOption>) -> Vec<StoredOption> {
    let kept = stored.iter().find(|o| o.is_selected).or_else(|| stored.first());

    match kept {
        Some(kept) => {
            let mut options = vec![StoredOption {
                option_number: 1,
                is_selected: true,
                schedule: kept.schedule.clone(),
            }];
            options.extend(fresh.into_iter().take(OPTIONS_PER_REQUEST - 1).map(|schedule| StoredOption {
                option_number: 2,
                is_selected: false,
                schedule,
            }));
            options
        }
        None => fresh
            .into_iter()
            .zip(1..)
            .map(|(schedule, option_number)| StoredOption {
                option_number,
                is_selected: false,
                schedule,
            })
            .collect(),
    }
}

fn duplicate_warnings(option: &ScheduleOption) -> Vec<String> {
    find_duplicate_assignments(option)
        .iter()
        .map(ToString::to_string)
        .collect()
}

async fn manager_options(
    _manager: Manager,
    query: web::Query<WeekQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let week = query.week;
    let availability = state.stores.availability.week_availability(week).await?;
    let stored = state.stores.schedules.options_for_week(week).await?;
    if availability.is_empty() {
        tracing::warn!(week = %week, "No availability submitted, options will be empty");
    }

    let fresh_count = if stored.is_empty() { OPTIONS_PER_REQUEST } else { OPTIONS_PER_REQUEST - 1 };
    let fresh = state.generate_options(&availability, fresh_count);
    let schedule_options = assemble_options(&stored, fresh);

    tracing::info!(week = %week, stored = stored.len(), "Serving manager options");

    Ok(HttpResponse::Ok().json(ManagerOptionsResponse {
        schedule_options,
        availability_list: AvailabilityList::from_week(&availability),
        employee_availability: availability,
    }))
}

async fn shuffle(
    _manager: Manager,
    req: web::Json<WeekBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let availability = state.stores.availability.week_availability(req.week).await?;
    let schedule = state
        .generate_options(&availability, 1)
        .pop()
        .unwrap_or_default();

    tracing::info!(week = %req.week, filled = schedule.filled_count(), "Shuffled schedule option");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "schedule": schedule,
        "employeeAvailability": availability,
    })))
}

async fn select(
    _manager: Manager,
    req: web::Json<SelectRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    if req.schedules.is_empty() || req.selected_option_index >= req.schedules.len() {
        return Err(AppError::Validation("Invalid data format".to_string()));
    }

    let options: Vec<ScheduleOption> = req.schedules.into_iter().map(|s| s.data).collect();
    let warnings = duplicate_warnings(&options[req.selected_option_index]);
    state
        .stores
        .schedules
        .save_options(req.week, &options, req.selected_option_index)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Schedules saved successfully",
        "warnings": warnings,
    })))
}

// The saved selection, ready for final edits before publishing
async fn ready_schedule(
    _manager: Manager,
    query: web::Query<WeekQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let schedule = state.stores.schedules.selected(query.week).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "schedule_data": schedule })))
}

async fn publish(
    _manager: Manager,
    req: web::Json<PublishRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let warnings = duplicate_warnings(&req.schedule_data);
    state.stores.schedules.publish(req.week, &req.schedule_data).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Schedule published successfully",
        "warnings": warnings,
    })))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/manager-options", web::get().to(manager_options))
        .route("/shuffle", web::post().to(shuffle))
        .route("/select", web::post().to(select))
        .route("/ready-schedule", web::get().to(ready_schedule))
        .route("/publish", web::post().to(publish));
}
