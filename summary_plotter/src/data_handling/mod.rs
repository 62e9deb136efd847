pub mod columnar;
pub mod sources;
