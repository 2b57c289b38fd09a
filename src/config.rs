use std::net::IpAddr;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    /// Hostname reported to webhook receivers in the canonical payload.
    pub hostname: String,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
    /// Multi-step correlation window in minutes. 0 disables postponement;
    /// the finalize sweep then drains every pending record it sees.
    pub postpone_duration_mins: u64,
    pub sweep_interval_secs: u64,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let host: IpAddr = env_or("FORMGATE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid FORMGATE_HOST: {e}"))?;

        let port: u16 = env_or("FORMGATE_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid FORMGATE_PORT: {e}"))?;

        let base_url = env_or("FORMGATE_BASE_URL", &format!("http://{host}:{port}"));

        let hostname = env_or("FORMGATE_HOSTNAME", "localhost");

        let max_body_size: usize = env_or("FORMGATE_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid FORMGATE_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("FORMGATE_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid FORMGATE_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("FORMGATE_LOG_LEVEL", "info");

        let postpone_duration_mins: u64 = env_or("FORMGATE_POSTPONE_DURATION_MINS", "0")
            .parse()
            .map_err(|e| format!("Invalid FORMGATE_POSTPONE_DURATION_MINS: {e}"))?;

        let sweep_interval_secs: u64 = env_or("FORMGATE_SWEEP_INTERVAL_SECS", "60")
            .parse()
            .map_err(|e| format!("Invalid FORMGATE_SWEEP_INTERVAL_SECS: {e}"))?;

        let smtp = match (
            std::env::var("FORMGATE_SMTP_HOST").ok(),
            std::env::var("FORMGATE_SMTP_PORT").ok(),
            std::env::var("FORMGATE_SMTP_USER").ok(),
            std::env::var("FORMGATE_SMTP_PASS").ok(),
            std::env::var("FORMGATE_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid FORMGATE_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            host,
            port,
            base_url,
            hostname,
            max_body_size,
            trusted_proxies,
            log_level,
            postpone_duration_mins,
            sweep_interval_secs,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
