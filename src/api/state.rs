use std::sync::Arc;

use crate::{
    config::Config,
    db::{Cache, MemoryStore, Store},
    services::{AiService, MediaService, PasswordService, TokenService},
};

/// Collaborators shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub passwords: PasswordService,
    pub ai: Arc<AiService>,
    pub media: Arc<MediaService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenService,
        ai: AiService,
        media: MediaService,
    ) -> Self {
        Self {
            store,
            tokens,
            passwords: PasswordService::new(),
            ai: Arc::new(ai),
            media: Arc::new(media),
        }
    }

    /// Wires the external collaborators from configuration
    pub fn from_config(store: Arc<dyn Store>, config: &Config, cache: Option<Cache>) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.access_token_expire_minutes);
        let ai = AiService::new(config.ai_settings(), cache);
        let media = MediaService::new(config.media_settings());
        Self::new(store, tokens, ai, media)
    }

    /// Fresh in-memory store with AI and media disabled
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            TokenService::new(jwt_secret, 60),
            AiService::disabled(),
            MediaService::disabled(),
        )
    }
}
