//! Configuration validation logic.

use super::ServerConfig;

/// Upper bound for a single egress frame.
const MAX_FRAME_MS: u64 = 1000;

pub(super) fn validate_conversation(config: &ServerConfig) -> Result<(), String> {
    if config.debounce_ms == 0 {
        return Err("DEBOUNCE_MS must be greater than zero".to_string());
    }
    if config.frame_ms == 0 || config.frame_ms > MAX_FRAME_MS {
        return Err(format!(
            "FRAME_MS must be between 1 and {MAX_FRAME_MS}, got {}",
            config.frame_ms
        ));
    }
    Ok(())
}

pub(super) fn validate_rate_limit(config: &ServerConfig) -> Result<(), String> {
    if config.rate_limit_requests_per_second == 0 {
        return Err("RATE_LIMIT_REQUESTS_PER_SECOND must be greater than zero".to_string());
    }
    if config.rate_limit_burst_size == 0 {
        return Err("RATE_LIMIT_BURST_SIZE must be greater than zero".to_string());
    }
    Ok(())
}

/// The public URL is embedded in `wss://` dial instructions, so it must be a
/// bare host (optionally with port and path).
pub(super) fn validate_server_url(server_url: &Option<String>) -> Result<(), String> {
    if let Some(url) = server_url
        && url.contains("://")
    {
        return Err(format!(
            "SERVER_URL must be a host name without scheme, got '{url}'"
        ));
    }
    Ok(())
}

pub(super) fn validate_tls(config: &ServerConfig) -> Result<(), String> {
    if let Some(tls) = &config.tls {
        if !tls.cert_path.exists() {
            return Err(format!(
                "TLS certificate not found: {}",
                tls.cert_path.display()
            ));
        }
        if !tls.key_path.exists() {
            return Err(format!("TLS key not found: {}", tls.key_path.display()));
        }
    }
    Ok(())
}
