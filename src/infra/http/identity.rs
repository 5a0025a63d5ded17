//! Client identity for quota accounting.

use axum::http::HeaderMap;

/// Identity used when no address information is available at all.
const UNKNOWN_IDENTITY: &str = "unknown";

/// Extract the client address for rate-limit accounting.
///
/// Behind the expected reverse proxy the first `X-Forwarded-For` entry is the
/// original client; `X-Real-IP` is the common single-value variant. Absent
/// both, requests share one identity rather than bypassing the quota.
pub fn client_identity(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    UNKNOWN_IDENTITY.to_string()
}
