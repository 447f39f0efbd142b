//! Provider-specific query families and response shapes.

pub mod twitter;
