use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Hub-Signature";

const SIGNATURE_PREFIX: &str = "sha256=";

fn digest(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Config("Invalid HMAC secret".to_string()))?;

    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Produces `sha256=<hex>` signatures for outgoing alert bodies.
#[derive(Clone)]
pub struct HmacSigner {
    secret: String,
    header_name: String,
}

impl HmacSigner {
    pub fn new(secret: String, header_name: String) -> Self {
        Self { secret, header_name }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn sign(&self, body: &[u8]) -> Result<String> {
        Ok(format!("{}{}", SIGNATURE_PREFIX, digest(&self.secret, body)?))
    }
}

/// Checks signatures on alert bodies received by the audit server.
pub struct HmacValidator {
    secret: String,
    header_name: String,
}

impl HmacValidator {
    pub fn new(secret: String, header_name: String) -> Self {
        Self { secret, header_name }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn validate(&self, body: &[u8], signature_header: &str) -> Result<()> {
        let signature = signature_header
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or_else(|| {
                tracing::warn!("Invalid signature format. Expected 'sha256=<hex>', got: {}", signature_header);
                AppError::InvalidSignatureFormat
            })?;

        let computed = digest(&self.secret, body)?;
        let matches: bool = computed.as_bytes().ct_eq(signature.as_bytes()).into();

        if matches {
            tracing::debug!(body_len = body.len(), "Signature validation successful");
            Ok(())
        } else {
            tracing::warn!(body_len = body.len(), "Signature mismatch");
            Err(AppError::HmacValidation)
        }
    }
}
