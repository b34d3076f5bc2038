mod schema;
mod session_store_mysql;
mod user_repo_mysql;
mod util;

pub use schema::*;
pub use session_store_mysql::*;
pub use user_repo_mysql::*;
