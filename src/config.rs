use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "travel-admin-dev-secret";

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub bcrypt_cost: u32,
    pub admin: Option<AdminSeed>,
    pub cors_origins: Vec<String>,
}

/// Admin credential created at startup when absent.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Config {
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminSeed {
                email,
                password,
                name: var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
            }),
            _ => None,
        };

        Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:5000"),
            data_dir: try_load("DATA_DIR", "travel_admin_data"),
            jwt_secret,
            token_ttl_secs: try_load("TOKEN_TTL_SECS", "3600"),
            bcrypt_cost: try_load("BCRYPT_COST", &crate::auth::DEFAULT_COST.to_string()),
            admin,
            cors_origins: parse_list(&try_load::<String>("CORS_ORIGINS", "*")),
        }
    }

    /// Settings for tests: fixed secret, cheap hashing, no admin seed.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            data_dir: String::new(),
            jwt_secret: "test-secret".to_string(),
            token_ttl_secs: 3600,
            bcrypt_cost: 4,
            admin: None,
            cors_origins: vec!["*".to_string()],
        }
    }
}

pub(crate) fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| ())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value ({e}), using default: {default}");
        default.parse().map_err(|_| ()).expect("Built-in default misconfigured!")
    })
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
