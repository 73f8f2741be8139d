//! Admin panel services
//!
//! Everything here runs behind the protected-route gate in [`crate::auth`].

pub mod articles;
pub mod dashboard;
pub mod facilitator;
pub mod uploads;

pub use articles::ArticleEditor;
pub use dashboard::{update_appointment_status, DashboardStats};
pub use facilitator::{generate_bio, FacilitatorDraft};
pub use uploads::{ImageKind, ImageUpload, ImageUploader};
