pub mod face_registration;
pub mod face_verification;
pub mod models;
