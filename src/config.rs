use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Minutes after creation during which the sender may still edit a message.
    pub max_edit_minutes: i64,
    /// Character budget for the frozen reply-quote preview.
    pub reply_preview_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            max_edit_minutes: 15,
            reply_preview_chars: 120,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let defaults = Self::default();

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let max_edit_minutes = env::var("MAX_EDIT_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_edit_minutes);
        if max_edit_minutes < 0 {
            return Err(crate::error::AppError::Config(
                "MAX_EDIT_MINUTES must be non-negative".into(),
            ));
        }

        let reply_preview_chars = env::var("REPLY_PREVIEW_CHARS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.reply_preview_chars);

        Ok(Self {
            port,
            max_edit_minutes,
            reply_preview_chars,
        })
    }
}
