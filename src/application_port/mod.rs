mod session_service;
mod user_service;

pub use session_service::*;
pub use user_service::*;
