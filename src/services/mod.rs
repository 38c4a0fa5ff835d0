//! Retention, freshness and the collaborators they are driven by

pub mod freshness;
pub mod metadata;
pub mod resolver;
pub mod retention;
