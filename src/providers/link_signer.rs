use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::internal::DispatchError;
use crate::errors::InternalError;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PARAM: &str = "_signature";
const EXPIRES_PARAM: &str = "expires";

/// Signs and verifies time-bound query strings
///
/// The signature is a hex HMAC-SHA256 over the url-encoded parameters
/// (including `expires`) and is appended as the last parameter.
pub struct LinkSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl LinkSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    fn mac(&self) -> Result<HmacSha256, InternalError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| InternalError::crypto("hmac_init", e.to_string()))
    }

    /// Url-encoded query string for `params` with expiry and signature attached
    pub fn sign(&self, params: &[(String, String)]) -> Result<String, InternalError> {
        let expires = Utc::now().timestamp() + self.ttl.as_secs() as i64;
        self.sign_with_expiry(params, expires)
    }

    pub(crate) fn sign_with_expiry(&self, params: &[(String, String)], expires: i64) -> Result<String, InternalError> {
        let mut signed: Vec<(String, String)> = params.to_vec();
        signed.push((EXPIRES_PARAM.to_string(), expires.to_string()));

        let payload = encode(&signed)?;
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}&{}={}", payload, SIGNATURE_PARAM, signature))
    }

    /// Check a query string produced by `sign` and return its parameters
    ///
    /// `expires` and the signature are stripped from the result.
    pub fn verify(&self, query: &str) -> Result<Vec<(String, String)>, InternalError> {
        let (payload, signature) = query
            .rsplit_once(&format!("&{}=", SIGNATURE_PARAM))
            .ok_or(DispatchError::InvalidSignature)?;

        let signature = hex::decode(signature).map_err(|_| DispatchError::InvalidSignature)?;
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| DispatchError::InvalidSignature)?;

        let mut params: Vec<(String, String)> = serde_urlencoded::from_str(payload)
            .map_err(|e| InternalError::parse("signed_link", e.to_string()))?;

        let expires = params
            .iter()
            .position(|(k, _)| k == EXPIRES_PARAM)
            .map(|idx| params.remove(idx).1)
            .ok_or(DispatchError::InvalidSignature)?;
        let expires: i64 = expires.parse().map_err(|_| DispatchError::InvalidSignature)?;

        if Utc::now().timestamp() > expires {
            return Err(DispatchError::LinkExpired.into());
        }

        Ok(params)
    }
}

fn encode(params: &[(String, String)]) -> Result<String, InternalError> {
    serde_urlencoded::to_string(params).map_err(|e| InternalError::parse("signed_link", e.to_string()))
}

/// Value of the first parameter named `key`
pub fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}
