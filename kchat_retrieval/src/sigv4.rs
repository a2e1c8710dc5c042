//! AWS Signature Version 4 for JSON-protocol POST requests.
//!
//! Only what the Kendra client needs: a `POST` with an empty query string and
//! a small, fixed header set. Credentials come from the environment or the
//! shared credentials file written by `aws configure`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const ENV_PROFILE: &str = "AWS_PROFILE";
pub const ENV_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

const DEFAULT_PROFILE: &str = "default";

#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl AwsCredentials {
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Resolve credentials for this process: environment variables first,
    /// then the `AWS_PROFILE` (or `default`) section of the shared
    /// credentials file.
    #[must_use]
    pub fn load() -> Option<Self> {
        Self::resolve(|key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// `home` locates `~/.aws/credentials` unless
    /// `AWS_SHARED_CREDENTIALS_FILE` is set.
    pub fn resolve<F>(lookup: F, home: Option<PathBuf>) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(credentials) = Self::from_lookup(&lookup) {
            debug!("Using AWS credentials from environment");
            return Some(credentials);
        }

        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let path = get(ENV_SHARED_CREDENTIALS_FILE)
            .map(PathBuf::from)
            .or_else(|| home.map(|home| home.join(".aws").join("credentials")))?;
        let profile = get(ENV_PROFILE).unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        Self::from_profile_file(&path, &profile)
    }

    /// Read one profile from a shared credentials file.
    ///
    /// A missing file, a missing profile or a profile without both keys all
    /// yield `None`.
    #[must_use]
    pub fn from_profile_file(path: &Path, profile: &str) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No shared credentials at {}: {e}", path.display());
                return None;
            }
        };

        let credentials = Self::from_profile(&content, profile);
        if credentials.is_some() {
            debug!("Using AWS profile [{profile}] from {}", path.display());
        }
        credentials
    }

    fn from_profile(content: &str, profile: &str) -> Option<Self> {
        let mut in_profile = false;
        let mut values = HashMap::new();

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_profile = name.trim() == profile;
                continue;
            }
            if !in_profile {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        // File keys are the lowercase forms of the environment names.
        Self::from_lookup(|key| values.get(&key.to_ascii_lowercase()).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let credentials = Self::new(get(ENV_ACCESS_KEY_ID)?, get(ENV_SECRET_ACCESS_KEY)?);
        Some(match get(ENV_SESSION_TOKEN) {
            Some(token) => credentials.with_session_token(token),
            None => credentials,
        })
    }
}

/// Signs requests for one region and service.
#[derive(Debug, Clone)]
pub struct Signer {
    credentials: AwsCredentials,
    region: String,
    service: String,
}

impl Signer {
    #[must_use]
    pub fn new(credentials: AwsCredentials, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sign a `POST` to `path` with an empty query string.
    ///
    /// `path` must already be percent-encoded, as `Url::path` returns it.
    /// `headers` are the request headers besides `host` and the `x-amz-*`
    /// headers added here. Returns the headers the caller must attach, in
    /// addition to its own.
    #[must_use]
    pub fn sign_post(
        &self,
        host: &str,
        path: &str,
        headers: &[(&str, &str)],
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Vec<(&'static str, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut signed: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        signed.push(("host".to_string(), host.to_string()));
        signed.push(("x-amz-date".to_string(), amz_date.clone()));
        if let Some(token) = &self.credentials.session_token {
            signed.push(("x-amz-security-token".to_string(), token.clone()));
        }
        signed.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_names = signed
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical = canonical_request(
            "POST",
            if path.is_empty() { "/" } else { path },
            &signed,
            &sha256_hex(payload),
        );

        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical.as_bytes())
        );

        let key = signing_key(
            &self.credentials.secret_access_key,
            &date,
            &self.region,
            &self.service,
        );
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_names}, Signature={signature}",
            self.credentials.access_key_id
        );

        let mut out = vec![("x-amz-date", amz_date), ("authorization", authorization)];
        if let Some(token) = &self.credentials.session_token {
            out.push(("x-amz-security-token", token.clone()));
        }
        out
    }
}

/// Headers must already be lowercased, trimmed and sorted by name.
fn canonical_request(
    method: &str,
    path: &str,
    headers: &[(String, String)],
    payload_hash: &str,
) -> String {
    let canonical_headers: String = headers.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
    let signed_names = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    format!("{method}\n{path}\n\n{canonical_headers}\n{signed_names}\n{payload_hash}")
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the per-day signing key.
#[must_use]
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}
