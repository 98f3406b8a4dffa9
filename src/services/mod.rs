pub mod ai;
pub mod auth;
pub mod feed;
pub mod media;
pub mod ranking;

pub use ai::AiService;
pub use auth::{PasswordService, TokenService};
pub use media::MediaService;
