use serde::Deserialize;

/// Monetary value of one reward point, used to bring points-based cards onto
/// the same scale as cash-back cards. Matches the backend's constant so both
/// layers price points identically.
pub const DEFAULT_POINT_DOLLAR_VALUE: f64 = 0.015;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub wallet_base_url: String,
    pub wallet_api_token: Option<String>,
    pub overpass_url: String,
    /// Dollar value of one reward point. Overridable so a deployment has a
    /// single source of truth shared with the wallet backend.
    pub point_dollar_value: f64,
    /// Assumed transaction size for nearby-place recommendations, where no
    /// real amount exists yet.
    pub default_nearby_amount: f64,
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub groq_model: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            wallet_base_url: std::env::var("WALLET_BASE_URL")
                .map_err(|_| anyhow::anyhow!("WALLET_BASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("WALLET_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("WALLET_BASE_URL must start with http:// or https://");
                    }
                    Ok(url)
                })?,
            wallet_api_token: std::env::var("WALLET_API_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            overpass_url: std::env::var("OVERPASS_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "https://overpass-api.de/api/interpreter".to_string()),
            point_dollar_value: match std::env::var("POINT_DOLLAR_VALUE") {
                Ok(v) => {
                    let parsed: f64 = v
                        .parse()
                        .map_err(|_| anyhow::anyhow!("POINT_DOLLAR_VALUE must be a number"))?;
                    if !parsed.is_finite() || parsed < 0.0 {
                        anyhow::bail!("POINT_DOLLAR_VALUE must be non-negative and finite");
                    }
                    parsed
                }
                Err(_) => DEFAULT_POINT_DOLLAR_VALUE,
            },
            default_nearby_amount: match std::env::var("DEFAULT_NEARBY_AMOUNT") {
                Ok(v) => {
                    let parsed: f64 = v
                        .parse()
                        .map_err(|_| anyhow::anyhow!("DEFAULT_NEARBY_AMOUNT must be a number"))?;
                    if !parsed.is_finite() || parsed < 0.0 {
                        anyhow::bail!("DEFAULT_NEARBY_AMOUNT must be non-negative and finite");
                    }
                    parsed
                }
                Err(_) => 50.0,
            },
            groq_api_key: std::env::var("GROQ_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            groq_base_url: std::env::var("GROQ_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
            groq_model: std::env::var("GROQ_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "llama3-70b-8192".to_string()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Wallet Base URL: {}", config.wallet_base_url);
        tracing::debug!("Overpass URL: {}", config.overpass_url);
        tracing::debug!("Point dollar value: {}", config.point_dollar_value);
        tracing::debug!("Server Port: {}", config.port);
        if config.groq_api_key.is_some() {
            tracing::info!("Explanation model configured: {}", config.groq_model);
        } else {
            tracing::info!("GROQ_API_KEY not set, using templated explanations only");
        }

        Ok(config)
    }
}
