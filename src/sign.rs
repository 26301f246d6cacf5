use crate::env::ConfigurationKey::ProxySigningKey;
use crate::env::secret_value;
use base64_simd::URL_SAFE_NO_PAD;
use ring::hmac::{HMAC_SHA256, Key, sign, verify};

/// Mints and authenticates proxy tokens for remote image urls.
///
/// Signing is deterministic: the same url and key always produce the same
/// token, so signed paths stay cache-friendly. Rotating the key invalidates
/// every previously issued path.
pub struct UrlSigner {
    key: Key,
}

/// The two query values carried by a signed proxy path. Both are url-safe
/// base64 without padding and need no further escaping.
pub struct SignedToken {
    pub u: String,
    pub sig: String,
}

impl UrlSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Key::new(HMAC_SHA256, secret.as_bytes()),
        }
    }

    /// A missing or empty key yields `None` rather than a signer with a
    /// default key.
    pub fn from_env() -> Option<Self> {
        secret_value(ProxySigningKey)
            .filter(|it| !it.is_empty())
            .map(Self::new)
    }

    pub fn sign(&self, raw_url: &str) -> SignedToken {
        let u = URL_SAFE_NO_PAD.encode_to_string(raw_url.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode_to_string(sign(&self.key, u.as_bytes()).as_ref());
        SignedToken { u, sig }
    }

    /// Constant-time tag comparison. An undecodable `sig` is simply invalid.
    pub fn verify(&self, u: &str, sig: &str) -> bool {
        match URL_SAFE_NO_PAD.decode_to_vec(sig) {
            Ok(tag) => verify(&self.key, u.as_bytes(), tag.as_slice()).is_ok(),
            Err(_) => false,
        }
    }

    /// Recovers the original url from `u`. Only meaningful after a successful
    /// [`verify`](Self::verify).
    pub fn decode(&self, u: &str) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode_to_vec(u).ok()?;
        String::from_utf8(bytes).ok()
    }
}
