mod handler;
mod model;

pub use handler::analyze;
pub use model::{LinguisticRequest, LinguisticResponse};
