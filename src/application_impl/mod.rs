mod credential_hasher_argon2;
mod session_service_impl;
mod token_codec_jwt;
mod transport;
mod user_service_impl;

pub use credential_hasher_argon2::*;
pub use session_service_impl::*;
pub use token_codec_jwt::*;
pub use transport::*;
pub use user_service_impl::*;
