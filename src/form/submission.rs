use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::schedule::{AvailabilityStatus, Day, Shift, WeekId};
use crate::store::{NewUser, Role};

/// Weekly availability form as posted by an employee:
/// `{"week": "2024-11-04", "availability": {"Monday": {"07:00-16:00": 2}}}`
#[derive(Debug, Deserialize)]
pub struct AvailabilitySubmission {
    pub week: String,
    #[serde(default)]
    pub availability: BTreeMap<String, BTreeMap<String, u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAvailability {
    pub week: WeekId,
    pub cells: Vec<(Day, Shift, AvailabilityStatus)>,
}

/// Validates an availability submission
pub fn validate_submission(req: &AvailabilitySubmission) -> Result<ValidatedAvailability> {
    if req.week.trim().is_empty() {
        return Err(AppError::Validation("Week is required".to_string()));
    }
    let week: WeekId = req.week.parse()?;

    let mut cells = Vec::new();
    for (day_key, shifts) in &req.availability {
        let day: Day = day_key.parse()?;
        for (shift_key, status) in shifts {
            let shift: Shift = shift_key.parse()?;
            let status = AvailabilityStatus::try_from(*status)?;
            cells.push((day, shift, status));
        }
    }
    cells.sort_by_key(|(day, shift, _)| (*day, *shift));

    Ok(ValidatedAvailability { week, cells })
}

/// Registration request from the login page
#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a registration and turns it into a user to insert
pub fn validate_registration(req: &RegistrationRequest) -> Result<NewUser> {
    let email = req.email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Email must contain '@'".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let role = match non_empty(&req.role) {
        Some(role) => role.parse::<Role>()?,
        None => Role::Employee,
    };

    Ok(NewUser {
        email: email.to_string(),
        password: Some(req.password.clone()),
        name: non_empty(&req.name),
        username: non_empty(&req.username),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(json: &str) -> AvailabilitySubmission {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_a_well_formed_week() {
        let req = submission(
            r#"{"week": "2024-11-04",
                "availability": {
                    "Tuesday": {"13:00-22:00": 0},
                    "Monday": {"10:00-19:00": 1, "07:00-16:00": 2}
                }}"#,
        );
        let validated = validate_submission(&req).unwrap();
        assert_eq!(validated.week.to_string(), "2024-11-04");
        assert_eq!(
            validated.cells,
            vec![
                (Day::Monday, Shift::Early, AvailabilityStatus::Preferred),
                (Day::Monday, Shift::Middle, AvailabilityStatus::Available),
                (Day::Tuesday, Shift::Late, AvailabilityStatus::CantWork),
            ]
        );
    }

    #[test]
    fn rejects_bad_week_day_shift_or_status() {
        for json in [
            r#"{"week": "", "availability": {}}"#,
            r#"{"week": "2024-11-06", "availability": {}}"#,
            r#"{"week": "2024-11-04", "availability": {"Someday": {"07:00-16:00": 1}}}"#,
            r#"{"week": "2024-11-04", "availability": {"Monday": {"08:00-17:00": 1}}}"#,
            r#"{"week": "2024-11-04", "availability": {"Monday": {"07:00-16:00": 3}}}"#,
        ] {
            let err = validate_submission(&submission(json)).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "accepted {}", json);
        }
    }

    #[test]
    fn registration_defaults_to_employee() {
        let req = RegistrationRequest {
            email: " new@example.com ".into(),
            password: "pw".into(),
            username: Some("  ".into()),
            name: Some("New Person".into()),
            role: None,
        };
        let user = validate_registration(&req).unwrap();
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.username, None);
        assert_eq!(user.name.as_deref(), Some("New Person"));
    }

    #[test]
    fn registration_requires_email_password_and_known_role() {
        let base = || RegistrationRequest {
            email: "x@example.com".into(),
            password: "pw".into(),
            username: None,
            name: None,
            role: Some("manager".into()),
        };
        assert_eq!(validate_registration(&base()).unwrap().role, Role::Manager);

        let mut missing_email = base();
        missing_email.email = "".into();
        assert!(validate_registration(&missing_email).is_err());

        let mut missing_password = base();
        missing_password.password = "".into();
        assert!(validate_registration(&missing_password).is_err());

        let mut bad_role = base();
        bad_role.role = Some("admin".into());
        assert!(validate_registration(&bad_role).is_err());
    }
}
