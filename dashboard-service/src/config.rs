use anyhow::{anyhow, Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub private_key_file: String,
    pub key_id: String,
    pub token_ttl_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub dev_generate_keypair: bool,
    pub seed_admin_email: String,
    pub seed_admin_password: String,
}

pub fn load_config() -> Result<AppConfig> {
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let private_key_file =
        env::var("AUTH_PRIVATE_KEY_FILE").unwrap_or_else(|_| "private.pem".to_string());
    let key_id = env::var("AUTH_KEY_ID").unwrap_or_else(|_| "1".to_string());

    let token_ttl_secs = u64_from_env("TOKEN_TTL_SECS")
        .context("Failed to parse TOKEN_TTL_SECS")?
        .unwrap_or(3600);
    let shutdown_timeout_secs = u64_from_env("SHUTDOWN_TIMEOUT_SECS")
        .context("Failed to parse SHUTDOWN_TIMEOUT_SECS")?
        .unwrap_or(5);

    let dev_generate_keypair = bool_from_env("DEV_GENERATE_KEYPAIR").unwrap_or(false);

    let seed_admin_email =
        env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let seed_admin_password = env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());

    Ok(AppConfig {
        bind_addr,
        private_key_file,
        key_id,
        token_ttl_secs,
        shutdown_timeout_secs,
        dev_generate_keypair,
        seed_admin_email,
        seed_admin_password,
    })
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn u64_from_env(key: &str) -> Result<Option<u64>> {
    env::var(key)
        .ok()
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|err| anyhow!("Invalid {key} '{value}': {err}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_from_env_parses() {
        std::env::set_var("DASH_TEST_BOOL_TRUE", "true");
        std::env::set_var("DASH_TEST_BOOL_ONE", "1");
        std::env::set_var("DASH_TEST_BOOL_FALSE", "no");
        assert_eq!(bool_from_env("DASH_TEST_BOOL_TRUE"), Some(true));
        assert_eq!(bool_from_env("DASH_TEST_BOOL_ONE"), Some(true));
        assert_eq!(bool_from_env("DASH_TEST_BOOL_FALSE"), Some(false));
        assert_eq!(bool_from_env("DASH_TEST_BOOL_UNSET"), None);
    }

    #[test]
    fn u64_from_env_rejects_garbage() {
        std::env::set_var("DASH_TEST_U64_OK", "90");
        std::env::set_var("DASH_TEST_U64_BAD", "ninety");
        assert_eq!(u64_from_env("DASH_TEST_U64_OK").unwrap(), Some(90));
        assert_eq!(u64_from_env("DASH_TEST_U64_UNSET").unwrap(), None);
        assert!(u64_from_env("DASH_TEST_U64_BAD").is_err());
    }
}
