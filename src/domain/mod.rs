pub mod error;
pub mod model;
pub mod repository;
pub mod stats;
