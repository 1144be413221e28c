pub mod assets;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod project;
pub mod status;
pub mod stitcher;
pub mod types;
