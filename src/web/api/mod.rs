pub mod error;
pub mod orbit;
pub mod predict;
