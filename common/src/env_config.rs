use std::env;

/// Per-hour limits applied when `RATE_LIMITS` is not set.
pub const DEFAULT_RATE_LIMITS: &[(&str, u32)] = &[
    ("/api/generate-ideas", 10),
    ("/api/deep-dive", 20),
    ("/api/advisor-chat", 60),
];

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// Holds everything needed to boot the service: database connection,
/// JWT verification, bind address, logging, billing integration and the
/// centrally configured rate limits.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// File the logger mirrors console output into.
    pub log_file: String,
    /// Whether the right-most `X-Forwarded-For` hop, appended by the fronting
    /// proxy, is trusted as the client address.
    pub trust_forwarded_for: bool,
    /// Billing provider settings.
    pub billing: BillingConfig,
    /// Endpoint path to per-hour request limit.
    pub rate_limits: Vec<(String, u32)>,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) verification.
pub struct JwtConfig {
    /// The secret key used to verify JWTs.
    pub secret: String,
}

#[derive(Clone, Debug, Default)]
/// Stripe webhook secret plus the mapping from Stripe prices to subscription tiers.
pub struct BillingConfig {
    pub stripe_webhook_secret: String,
    pub spark_price_id: String,
    pub ignite_price_id: String,
    /// Deep-dive credits granted to spark subscribers each billing period.
    pub spark_deep_dive_credits: i32,
    /// Launch-kit credits granted to spark subscribers each billing period.
    pub spark_launch_kit_credits: i32,
}

impl JwtConfig {
    /// Reads `JWT_SECRET`, the key session tokens are verified with.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
        }
    }
}

impl BillingConfig {
    pub fn from_env() -> Self {
        BillingConfig {
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            spark_price_id: env::var("STRIPE_SPARK_PRICE_ID").unwrap_or_default(),
            ignite_price_id: env::var("STRIPE_IGNITE_PRICE_ID").unwrap_or_default(),
            spark_deep_dive_credits: env::var("SPARK_DEEP_DIVE_CREDITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            spark_launch_kit_credits: env::var("SPARK_LAUNCH_KIT_CREDITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for JWT verification (via `JwtConfig::from_env()`)
    ///
    /// Optional (with defaults):
    /// - `ENVIRONMENT`: "development" or "production" (default: "development")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `LOG_FILE`: Log file path (default: "launchpad.log")
    /// - `TRUST_FORWARDED_FOR`: Use the proxy's `X-Forwarded-For` hop for the client IP (default: false)
    /// - `RATE_LIMITS`: `path=limit` pairs separated by commas
    /// - Stripe settings (see `BillingConfig::from_env`)
    ///
    /// # Panics
    ///
    /// Panics if required environment variables are missing.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env_flag("ENABLE_CONSOLE_LOGGING", true),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "launchpad.log".to_string()),
            trust_forwarded_for: env_flag("TRUST_FORWARDED_FOR", false),
            billing: BillingConfig::from_env(),
            rate_limits: match env::var("RATE_LIMITS") {
                Ok(raw) => parse_rate_limits(&raw),
                Err(_) => default_rate_limits(),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

pub fn default_rate_limits() -> Vec<(String, u32)> {
    DEFAULT_RATE_LIMITS
        .iter()
        .map(|(path, limit)| (path.to_string(), *limit))
        .collect()
}

/// Parses `"/api/a=10,/api/b=20"`. Malformed pairs are skipped with a warning.
pub fn parse_rate_limits(raw: &str) -> Vec<(String, u32)> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let parsed = pair
                .split_once('=')
                .and_then(|(path, limit)| Some((path.trim(), limit.trim().parse::<u32>().ok()?)))
                .filter(|(path, _)| !path.is_empty());
            if parsed.is_none() {
                log::warn!("Ignoring malformed RATE_LIMITS entry '{}'", pair);
            }
            parsed.map(|(path, limit)| (path.to_string(), limit))
        })
        .collect()
}
