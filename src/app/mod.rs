mod context;
mod errors;

pub use context::{AppContext, Health};
pub use errors::AppError;
