//! HTTP surface for Telegram webhook delivery

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::InboundHandler;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<dyn InboundHandler>,
    /// Expected value of the secret token header, if one was configured
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(handler: Arc<dyn InboundHandler>, webhook_secret: Option<String>) -> Self {
        Self {
            handler,
            webhook_secret,
        }
    }
}
