pub mod config;
pub mod geo;
pub mod model;
pub mod orbit;
pub mod predict;
pub mod refresh;
pub mod source;
pub mod sweep;
pub mod web;
