pub mod submission;
pub mod export;

pub use submission::{
    validate_registration, validate_submission, AvailabilitySubmission, RegistrationRequest,
    ValidatedAvailability,
};
pub use export::{export_schedule_to_file, schedule_to_csv_string, write_schedule_csv};
