//! Subscriber API protocol layer.

pub mod api;
pub mod models;
