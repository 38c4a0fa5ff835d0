//! Background tasks of the status service

pub mod status_refresh;
