//! OAuth 1.0a request signing (HMAC-SHA1), as required by the Tumblr v2 API
//! for user-scoped endpoints such as the dashboard.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// Consumer and access-token credentials for a single Tumblr account.
///
/// All four values are held as secrets so they never appear in `Debug` output.
#[derive(Debug)]
pub struct OAuthCredentials {
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
    pub token: SecretString,
    pub token_secret: SecretString,
}

/// Per-request values that must differ between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    pub value: String,
    pub timestamp: u64,
}

impl Nonce {
    pub fn generate() -> Self {
        let value = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self { value, timestamp }
    }
}

/// RFC 3986 percent-encoding: everything except `A-Z a-z 0-9 - . _ ~`.
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Builds the `Authorization` header value for `method url`.
///
/// Query parameters already present on `url` are folded into the signature.
pub fn authorization_header(
    credentials: &OAuthCredentials,
    method: &str,
    url: &Url,
    nonce: &Nonce,
) -> Result<String, hmac::digest::InvalidLength> {
    let timestamp = nonce.timestamp.to_string();
    let oauth_params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", credentials.consumer_key.expose_secret()),
        ("oauth_nonce", nonce.value.as_str()),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", credentials.token.expose_secret()),
        ("oauth_version", OAUTH_VERSION),
    ];

    let base = signature_base_string(method, url, &oauth_params);
    let signature = sign(
        &base,
        credentials.consumer_secret.expose_secret(),
        credentials.token_secret.expose_secret(),
    )?;

    let mut fields: Vec<String> = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect();
    fields.push(format!("oauth_signature=\"{}\"", encode(&signature)));

    Ok(format!("OAuth {}", fields.join(", ")))
}

fn signature_base_string(method: &str, url: &Url, oauth_params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(oauth_params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(base_url.as_str()),
        encode(&normalized)
    )
}

fn sign(
    base: &str,
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, hmac::digest::InvalidLength> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
