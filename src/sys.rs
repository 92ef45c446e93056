pub mod geometry;
pub mod headless;
pub mod storage;
pub mod style;
pub mod surface;
pub mod window;
