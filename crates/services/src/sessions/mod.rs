mod backend;
mod controller;
mod countdown;
mod http_backend;

// Public API of the session subsystem.
pub use crate::error::ControllerError;
pub use backend::{DrawnQuestions, ExamBackend, LocalBackend, enrich_options};
pub use controller::{
    DEFAULT_GENERATION_WAIT, DEFAULT_SESSION_SAMPLE_SIZE, ExamSessionController, ReviewEntry,
    SessionSettings, SessionView,
};
pub use http_backend::HttpBackend;
