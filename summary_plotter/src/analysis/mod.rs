pub mod histogram;
pub mod overlay;
pub mod summary;
