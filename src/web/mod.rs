pub mod api;
pub mod api_doc;
pub mod server;

use crate::refresh::SharedEngine;

pub use server::{router, run_server};

#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
}
