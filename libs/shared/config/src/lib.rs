use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_BOOKING_HORIZON_DAYS: u32 = 30;
pub const DEFAULT_BOOKING_COOLDOWN_DAYS: u32 = 15;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub booking_horizon_days: u32,
    pub booking_cooldown_days: u32,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: string_var("SUPABASE_URL"),
            supabase_anon_key: string_var("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: string_var("SUPABASE_JWT_SECRET"),
            booking_horizon_days: numeric_var("BOOKING_HORIZON_DAYS", DEFAULT_BOOKING_HORIZON_DAYS),
            booking_cooldown_days: numeric_var("BOOKING_COOLDOWN_DAYS", DEFAULT_BOOKING_COOLDOWN_DAYS),
            port: numeric_var("PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            booking_horizon_days: DEFAULT_BOOKING_HORIZON_DAYS,
            booking_cooldown_days: DEFAULT_BOOKING_COOLDOWN_DAYS,
            port: DEFAULT_PORT,
        }
    }
}

fn string_var(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn numeric_var<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => parse_or_default(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or_default<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    raw.trim().parse().unwrap_or_else(|_| {
        warn!("{} has invalid value '{}', using default {}", key, raw, default);
        default
    })
}
