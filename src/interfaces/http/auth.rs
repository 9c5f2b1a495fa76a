use actix_web::http::header;
use actix_web::HttpRequest;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::AuthConfig;

/// Check HTTP Basic credentials against the configured account. With no
/// account configured every request passes.
pub fn authorize(expected: Option<&AuthConfig>, req: &HttpRequest) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match basic_credentials(req) {
        Some((username, password))
            if constant_time_eq(username.as_bytes(), expected.username.as_bytes())
                & constant_time_eq(password.as_bytes(), expected.password.as_bytes()) =>
        {
            Ok(())
        }
        Some((username, _)) => {
            warn!(username = %username, path = %req.path(), "Rejected credentials");
            Err(AppError::Unauthorized)
        }
        None => Err(AppError::Unauthorized),
    }
}

fn basic_credentials(req: &HttpRequest) -> Option<(String, String)> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Byte comparison without early exit. Only the length leaks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

pub fn basic_header_value(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}
