#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod import_service;
pub mod result_service;
pub mod sessions;
pub mod test_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, ImportServiceError, ResultServiceError, SessionError, TestServiceError,
};
pub use import_service::{ImportReport, ImportService};
pub use result_service::ResultService;
pub use sessions::{
    CurrentQuestion, PresentedQuestion, SessionLauncher, SessionPhase, SessionStatus, TestSession,
};
pub use test_service::TestService;
