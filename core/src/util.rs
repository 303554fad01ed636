//! Endpoint validation helpers shared by the config layer and the LLM client

use anyhow::{bail, Context, Result};

/// Reject values that cannot travel in an HTTP header
///
/// Control characters (including CR, LF and NUL) and DEL are refused.
pub fn sanitize_for_header(value: &str, field_name: &str) -> Result<String> {
    if value.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    if let Some((index, ch)) = value.char_indices().find(|(_, ch)| ch.is_control()) {
        bail!(
            "{} contains invalid character at position {} ({:#06x}). \
            Control characters, newlines and null bytes are not allowed.",
            field_name,
            index,
            ch as u32
        );
    }

    Ok(value.to_string())
}

/// Validate an API key can be sent as a bearer token
///
/// Returns the trimmed key.
pub fn validate_api_key(api_key: &str) -> Result<String> {
    let trimmed = api_key.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        bail!("API key is empty or set to 'none'");
    }

    sanitize_for_header(trimmed, "API key")?;

    format!("Bearer {}", trimmed)
        .parse::<reqwest::header::HeaderValue>()
        .with_context(|| {
            format!(
                "API key results in an invalid Authorization header (length {})",
                trimmed.len()
            )
        })?;

    Ok(trimmed.to_string())
}

/// Normalize a base URL for API requests
///
/// Trims whitespace and trailing slashes; refuses anything that is not
/// http(s) or that looks double-encoded.
pub fn sanitize_base_url(url: &str, field_name: &str) -> Result<String> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    if trimmed.contains("%2F") || trimmed.contains("%3D") || trimmed.contains("%20") {
        bail!(
            "{} appears to contain URL-encoded characters (e.g. %2F, %3D, %20). \
            Please verify the URL is not double-encoded.",
            field_name
        );
    }

    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        bail!(
            "{} must start with 'http://' or 'https://'. Got: {}",
            field_name,
            trimmed
        );
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Local endpoints (Ollama, LM Studio) accept requests without a key
pub fn requires_api_key(base_url: &str) -> bool {
    let host = base_url
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    !matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0")
}
