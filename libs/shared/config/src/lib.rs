use std::env;
use tracing::warn;

/// Offset of the clinic's local wall clock from UTC when none is configured.
pub const DEFAULT_CLINIC_UTC_OFFSET_MINUTES: i32 = 330;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_api_key: String,
    pub supabase_jwt_secret: String,
    pub admin_email: String,
    pub clinic_utc_offset_minutes: i32,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_api_key: env::var("SUPABASE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_API_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_EMAIL not set, only role-based admin access is possible");
                    String::new()
                }),
            clinic_utc_offset_minutes: env::var("CLINIC_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|value| match value.parse::<i32>() {
                    Ok(minutes) if minutes.abs() < 24 * 60 => Some(minutes),
                    _ => {
                        warn!("CLINIC_UTC_OFFSET_MINUTES '{}' is not a valid offset, using default", value);
                        None
                    }
                })
                .unwrap_or(DEFAULT_CLINIC_UTC_OFFSET_MINUTES),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - falling back to in-memory storage");
        }

        config
    }

    /// True when the Supabase backend can be reached with these settings.
    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_api_key.is_empty()
    }

    pub fn is_admin_email(&self, email: Option<&str>) -> bool {
        match email {
            Some(email) => !self.admin_email.is_empty() && self.admin_email.eq_ignore_ascii_case(email),
            None => false,
        }
    }
}
