//! OAuth 1.0a request signing for one-legged (private application) access.
//!
//! Builds the signature base string and `Authorization` header from the
//! request method, URL and credentials. The signature itself is produced by a
//! [`SignatureMethod`]: private applications sign with [`RsaSha1`] and their
//! private key, and [`Plaintext`] covers setups that sign with the secrets.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha1::Sha1;
use url::Url;

use crate::errors::TransportError;
use crate::types::Method;
use crate::Error;

const OAUTH_VERSION: &str = "1.0";

/// Produces the `oauth_signature` value for a request.
pub trait SignatureMethod: Send + Sync {
    /// Value sent as `oauth_signature_method`, e.g. `RSA-SHA1`.
    fn name(&self) -> &str;

    /// Signs `base_string`. `key` is `encode(consumer_secret)&encode(token_secret)`.
    fn sign(&self, base_string: &str, key: &str) -> Result<String, String>;
}

/// The `PLAINTEXT` method: the signature is the signing key itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plaintext;

impl SignatureMethod for Plaintext {
    fn name(&self) -> &str {
        "PLAINTEXT"
    }

    fn sign(&self, _base_string: &str, key: &str) -> Result<String, String> {
        Ok(key.to_string())
    }
}

/// The `RSA-SHA1` method: a PKCS#1 v1.5 signature of the base string with
/// the application's private key, base64 encoded. The secrets-based signing
/// key is not used.
#[derive(Clone)]
pub struct RsaSha1 {
    key: SigningKey<Sha1>,
}

impl RsaSha1 {
    /// Loads a PEM private key in PKCS#1 (`BEGIN RSA PRIVATE KEY`) or PKCS#8
    /// (`BEGIN PRIVATE KEY`) form.
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| Error::InvalidConfig(format!("invalid RSA private key: {}", e)))?;
        Ok(Self {
            key: SigningKey::<Sha1>::new(key),
        })
    }
}

impl fmt::Debug for RsaSha1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSha1").finish_non_exhaustive()
    }
}

impl SignatureMethod for RsaSha1 {
    fn name(&self) -> &str {
        "RSA-SHA1"
    }

    fn sign(&self, base_string: &str, _key: &str) -> Result<String, String> {
        let signature = self
            .key
            .try_sign(base_string.as_bytes())
            .map_err(|e| e.to_string())?;
        Ok(STANDARD.encode(signature.to_bytes()))
    }
}

/// Consumer and token credentials.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: Option<String>,
    pub token_secret: Option<String>,
}

impl Credentials {
    /// Private-application credentials, where the consumer key doubles as the
    /// access token and the consumer secret as the token secret.
    pub fn private_app(consumer_key: &str, consumer_secret: &str) -> Self {
        Self {
            consumer_key: consumer_key.to_string(),
            consumer_secret: consumer_secret.to_string(),
            token: Some(consumer_key.to_string()),
            token_secret: Some(consumer_secret.to_string()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token", &self.token)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Signs requests with a fixed set of credentials.
///
/// Read-only after construction.
#[derive(Clone)]
pub struct OAuthSigner {
    credentials: Credentials,
    method: Arc<dyn SignatureMethod>,
}

impl OAuthSigner {
    pub fn new(credentials: Credentials, method: impl SignatureMethod + 'static) -> Self {
        Self {
            credentials,
            method: Arc::new(method),
        }
    }

    pub fn plaintext(credentials: Credentials) -> Self {
        Self::new(credentials, Plaintext)
    }

    /// `Authorization` header value for a request, with a fresh nonce and
    /// the current timestamp.
    pub fn authorization(&self, method: Method, url: &Url) -> Result<String, TransportError> {
        self.authorization_at(method, url, &nonce(), chrono::Utc::now().timestamp())
    }

    pub(crate) fn authorization_at(
        &self,
        method: Method,
        url: &Url,
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, TransportError> {
        let mut oauth = vec![
            ("oauth_consumer_key", self.credentials.consumer_key.clone()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", self.method.name().to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_version", OAUTH_VERSION.to_string()),
        ];
        if let Some(token) = &self.credentials.token {
            oauth.push(("oauth_token", token.clone()));
        }

        let base = base_string(method, url, &oauth);
        let key = format!(
            "{}&{}",
            encode(&self.credentials.consumer_secret),
            encode(self.credentials.token_secret.as_deref().unwrap_or(""))
        );
        let signature = self
            .method
            .sign(&base, &key)
            .map_err(TransportError::Signing)?;
        oauth.push(("oauth_signature", signature));
        oauth.sort_by(|a, b| a.0.cmp(b.0));

        let fields: Vec<String> = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }
}

/// Signature base string: method, base URI and the sorted, encoded union of
/// query and OAuth parameters, each encoded again and joined by `&`.
pub fn base_string(method: Method, url: &Url, oauth: &[(&str, String)]) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(oauth.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    params.sort();

    let normalized: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    let base_uri = format!("{}{}", url.origin().ascii_serialization(), url.path());

    format!(
        "{}&{}&{}",
        method.as_str(),
        encode(&base_uri),
        encode(&normalized.join("&"))
    )
}

/// RFC 3986 percent-encoding: everything but `A-Z a-z 0-9 - . _ ~`.
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
