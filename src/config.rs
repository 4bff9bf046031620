use anyhow::Context;

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: String,
    pub model_id: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Clone)]
pub struct PlanConfig {
    /// Generator text shorter than this (trimmed, in chars) goes straight to fallback.
    pub min_response_chars: usize,
    pub include_debug: bool,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

impl LogConfig {
    pub const DEFAULT_FILTER: &'static str = "mealplan=debug,axum=info,tower_http=info";

    /// Read on its own so logging is up before the rest of the config loads.
    pub fn from_env() -> Self {
        Self {
            filter: std::env::var("RUST_LOG").unwrap_or_else(|_| Self::DEFAULT_FILTER.into()),
            json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log: LogConfig,
    pub bedrock: BedrockConfig,
    pub plan: PlanConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_parse("APP_PORT", 8080);
        let bedrock = BedrockConfig {
            region: std::env::var("BEDROCK_REGION").unwrap_or_else(|_| "us-east-1".into()),
            model_id: std::env::var("BEDROCK_MODEL_ID")
                .unwrap_or_else(|_| "us.amazon.nova-micro-v1:0".into()),
            endpoint: std::env::var("BEDROCK_ENDPOINT").ok(),
            access_key: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            max_tokens: env_parse("BEDROCK_MAX_TOKENS", 2048),
            temperature: env_parse("BEDROCK_TEMPERATURE", 0.7),
            top_p: env_parse("BEDROCK_TOP_P", 0.9),
        };
        let plan = PlanConfig {
            min_response_chars: env_parse("PLAN_MIN_RESPONSE_CHARS", 20),
            include_debug: std::env::var("PLAN_INCLUDE_DEBUG")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        };
        Ok(Self {
            database_url,
            host,
            port,
            log: LogConfig::from_env(),
            bedrock,
            plan,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
