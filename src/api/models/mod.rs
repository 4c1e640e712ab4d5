pub mod face_auth;
pub mod verification;
