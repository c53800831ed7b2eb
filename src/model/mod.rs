mod error;
mod loader;
mod polynomial;

pub use error::ModelError;
pub use loader::PolynomialModelLoader;
pub use polynomial::{ModelPair, PolynomialDocument, PolynomialModel};
