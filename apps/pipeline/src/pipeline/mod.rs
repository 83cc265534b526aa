pub mod engine;
pub mod handlers;
pub mod ingestion;
pub mod prefilter;
pub mod result;
pub mod summary;
