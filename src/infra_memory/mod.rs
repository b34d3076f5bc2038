//! In-process backends. Each store keeps its records behind a single async
//! lock, so every operation is atomic with respect to concurrent callers.

mod session_store_memory;
mod user_repo_memory;

pub use session_store_memory::*;
pub use user_repo_memory::*;
