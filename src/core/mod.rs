pub mod cancel;
pub mod face;
pub mod video;
