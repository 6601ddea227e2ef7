pub mod error;
pub mod money;
pub mod percentage;
pub mod session;

pub use error::{AppError, Result};
pub use session::{Operator, Role};
