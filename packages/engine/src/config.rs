use anyhow::{Context, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;

/// Engine configuration.
///
/// Constructed explicitly at startup and passed to each component. There is
/// no ambient global; tests build one with `EngineConfig::default()` and
/// override what they need.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum silence before the sweep flags a service as stale.
    pub max_silence: Duration,
    /// Optional floor between routine status pings. None = unenforced.
    pub min_update_interval: Option<Duration>,
    /// Open moderation records older than this surface as overdue.
    pub moderation_deadline: Duration,
    /// Default search radius for the emergency strategy.
    pub emergency_radius_km: f64,
    /// Default alert radius stamped on new services.
    pub default_alert_radius_km: f64,
    /// Weights for the smart strategy's blended score.
    pub smart_weights: SmartWeights,
    /// Bounded automatic retries for conditional-write losers.
    pub max_cas_retries: u32,
    /// Backoff between conditional-write retries.
    pub cas_backoff: std::time::Duration,
}

/// Weights for the smart strategy. Normalized before use, so they only need
/// to be relative.
#[derive(Debug, Clone, Copy)]
pub struct SmartWeights {
    pub distance: f64,
    pub text: f64,
    pub availability: f64,
}

impl SmartWeights {
    /// Equal thirds.
    pub fn balanced() -> Self {
        Self {
            distance: 1.0,
            text: 1.0,
            availability: 1.0,
        }
    }

    pub fn normalized(&self) -> (f64, f64, f64) {
        let total = self.distance + self.text + self.availability;
        if total <= 0.0 {
            let third = 1.0 / 3.0;
            return (third, third, third);
        }
        (
            self.distance / total,
            self.text / total,
            self.availability / total,
        )
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_silence: Duration::hours(12),
            min_update_interval: None,
            moderation_deadline: Duration::hours(24),
            emergency_radius_km: 5.0,
            default_alert_radius_km: 5.0,
            smart_weights: SmartWeights::balanced(),
            max_cas_retries: 3,
            cas_backoff: std::time::Duration::from_millis(25),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();

        let max_silence_hours: i64 = env_or("ENGINE_MAX_SILENCE_HOURS", 12)?;
        let moderation_deadline_hours: i64 = env_or("ENGINE_MODERATION_DEADLINE_HOURS", 24)?;
        let emergency_radius_km: f64 = env_or("ENGINE_EMERGENCY_RADIUS_KM", 5.0)?;
        let default_alert_radius_km: f64 = env_or("ENGINE_ALERT_RADIUS_KM", 5.0)?;

        let min_update_interval = match env::var("ENGINE_MIN_UPDATE_INTERVAL_MINUTES") {
            Ok(raw) => {
                let minutes: i64 = raw
                    .parse()
                    .context("ENGINE_MIN_UPDATE_INTERVAL_MINUTES must be a valid number")?;
                Some(Duration::minutes(minutes))
            }
            Err(_) => None,
        };

        Ok(Self {
            max_silence: Duration::hours(max_silence_hours),
            min_update_interval,
            moderation_deadline: Duration::hours(moderation_deadline_hours),
            emergency_radius_km,
            default_alert_radius_km,
            smart_weights: defaults.smart_weights,
            max_cas_retries: env_or("ENGINE_MAX_CAS_RETRIES", defaults.max_cas_retries)?,
            cas_backoff: defaults.cas_backoff,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a valid value")),
        Err(_) => Ok(default),
    }
}
