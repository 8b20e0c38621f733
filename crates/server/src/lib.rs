//! HTTP front end for the predictor registry

pub mod api;
pub mod config;
