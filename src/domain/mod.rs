pub mod answers;
pub mod models;
pub mod reconcile;
pub mod scoring;
pub mod statistics;
