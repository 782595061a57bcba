//! Region handling, credentials and client configuration.
//!
//! ELB is a regional service: every client is bound to exactly one region,
//! which determines both the endpoint host and the set of availability
//! zones a load balancer may be placed in.

use crate::error::{ElbError, ElbResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API version spoken by this client.
pub const DEFAULT_API_VERSION: &str = "2009-11-25";

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const DEFAULT_USER_AGENT: &str = "SortOfRemoteNG/1.0 elb-client/0.1";

/// Known availability zones per region.
const REGION_ZONES: &[(&str, &[&str])] = &[
    ("eu-west-1", &["eu-west-1a", "eu-west-1b"]),
    (
        "us-east-1",
        &["us-east-1a", "us-east-1b", "us-east-1c", "us-east-1d"],
    ),
    ("us-west-1", &["us-west-1a", "us-west-1b"]),
];

// ── Regions ─────────────────────────────────────────────────────────────

/// ELB region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElbRegion {
    /// Region code (e.g., "us-east-1").
    pub name: String,
}

impl ElbRegion {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Query endpoint: `https://elasticloadbalancing.{region}.amazonaws.com/`
    pub fn endpoint(&self) -> String {
        if self.name.starts_with("cn-") {
            format!("https://elasticloadbalancing.{}.amazonaws.com.cn/", self.name)
        } else {
            format!("https://elasticloadbalancing.{}.amazonaws.com/", self.name)
        }
    }

    /// Region codes are lowercase letters, digits and hyphens, with no
    /// leading or trailing hyphen.
    pub fn is_valid_name(&self) -> bool {
        let bytes = self.name.as_bytes();
        !bytes.is_empty()
            && bytes.first() != Some(&b'-')
            && bytes.last() != Some(&b'-')
            && bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
    }

    /// The known availability zones of this region, if we have a table for it.
    pub fn availability_zones(&self) -> Option<&'static [&'static str]> {
        REGION_ZONES
            .iter()
            .find(|(region, _)| *region == self.name)
            .map(|(_, zones)| *zones)
    }

    /// Check whether `zone` belongs to this region.
    ///
    /// Regions without a zone table accept `{region}` followed by a single
    /// lowercase letter.
    pub fn is_valid_zone(&self, zone: &str) -> bool {
        match self.availability_zones() {
            Some(zones) => zones.contains(&zone),
            None => match zone.strip_prefix(self.name.as_str()) {
                Some(suffix) => {
                    !self.name.is_empty()
                        && suffix.len() == 1
                        && suffix.bytes().all(|b| b.is_ascii_lowercase())
                }
                None => false,
            },
        }
    }
}

// ── Credentials ─────────────────────────────────────────────────────────

/// Long-term access key pair used to sign requests.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElbCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for ElbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElbCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

impl ElbCredentials {
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
        }
    }

    /// Resolve credentials from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    pub fn from_environment() -> Option<Self> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        Some(Self::new(&access_key, &secret_key))
    }
}

// ── Client configuration ────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Configuration for an [`ElbClient`](crate::elb::ElbClient).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElbConfig {
    /// Region the client talks to. Required.
    pub region: String,
    pub credentials: ElbCredentials,
    /// Custom endpoint URL (for test doubles or proxies).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Overrides the built-in availability zone table for the region.
    #[serde(default)]
    pub availability_zones: Option<Vec<String>>,
}

impl ElbConfig {
    pub fn new(access_key_id: &str, secret_access_key: &str, region: &str) -> Self {
        Self {
            region: region.to_string(),
            credentials: ElbCredentials::new(access_key_id, secret_access_key),
            endpoint_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_version: default_api_version(),
            user_agent: default_user_agent(),
            availability_zones: None,
        }
    }

    /// Build a configuration from the standard AWS environment variables.
    ///
    /// Region comes from `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`;
    /// `ELB_ENDPOINT_URL` optionally overrides the endpoint.
    pub fn from_environment() -> ElbResult<Self> {
        let credentials = ElbCredentials::from_environment().ok_or_else(|| {
            ElbError::config("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set")
        })?;
        let region = std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_default();

        let mut config = Self::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            &region,
        );
        config.endpoint_url = std::env::var("ELB_ENDPOINT_URL").ok();
        config.validate()?;
        Ok(config)
    }

    pub fn with_endpoint_url(mut self, url: &str) -> Self {
        self.endpoint_url = Some(url.to_string());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_api_version(mut self, version: &str) -> Self {
        self.api_version = version.to_string();
        self
    }

    pub fn with_availability_zones(mut self, zones: &[&str]) -> Self {
        self.availability_zones = Some(zones.iter().map(|z| z.to_string()).collect());
        self
    }

    pub fn region(&self) -> ElbRegion {
        ElbRegion::new(&self.region)
    }

    /// Endpoint the client posts to.
    pub fn endpoint(&self) -> String {
        self.endpoint_url
            .clone()
            .unwrap_or_else(|| self.region().endpoint())
    }

    /// Check `zone` against the configured zone list, or the region table.
    pub fn is_valid_zone(&self, zone: &str) -> bool {
        match self.availability_zones {
            Some(ref zones) => zones.iter().any(|z| z == zone),
            None => self.region().is_valid_zone(zone),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ElbResult<()> {
        if self.region.trim().is_empty() {
            return Err(ElbError::config("Region must be set in order to use EC2 ELB"));
        }
        if !self.region().is_valid_name() {
            return Err(ElbError::config(&format!("Invalid region '{}'", self.region)));
        }
        if self.credentials.access_key_id.is_empty() {
            return Err(ElbError::config("Access key ID is required"));
        }
        if self.credentials.secret_access_key.is_empty() {
            return Err(ElbError::config("Secret access key is required"));
        }
        if self.timeout_secs == 0 {
            return Err(ElbError::config("HTTP timeout must be greater than zero"));
        }
        if self.api_version.is_empty() {
            return Err(ElbError::config("API version is required"));
        }
        let endpoint = self.endpoint();
        let parsed = url::Url::parse(&endpoint)
            .map_err(|e| ElbError::config(&format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;
        if parsed.host_str().is_none() {
            return Err(ElbError::config(&format!(
                "Endpoint URL '{}' has no host",
                endpoint
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn region_endpoint() {
        assert_eq!(
            ElbRegion::new("eu-west-1").endpoint(),
            "https://elasticloadbalancing.eu-west-1.amazonaws.com/"
        );
        assert_eq!(
            ElbRegion::new("cn-north-1").endpoint(),
            "https://elasticloadbalancing.cn-north-1.amazonaws.com.cn/"
        );
    }

    #[test]
    fn known_zone_table() {
        let region = ElbRegion::new("us-east-1");
        assert!(region.is_valid_zone("us-east-1a"));
        assert!(region.is_valid_zone("us-east-1d"));
        assert!(!region.is_valid_zone("us-east-1e"));
        assert!(!region.is_valid_zone("us-west-1a"));
        assert!(!region.is_valid_zone("us-east-1"));
        assert!(!ElbRegion::new("eu-west-1").is_valid_zone("eu-west-1g"));
    }

    #[test]
    fn zone_pattern_for_regions_without_table() {
        let region = ElbRegion::new("ap-southeast-1");
        assert!(region.availability_zones().is_none());
        assert!(region.is_valid_zone("ap-southeast-1a"));
        assert!(!region.is_valid_zone("ap-southeast-1"));
        assert!(!region.is_valid_zone("ap-southeast-1ab"));
        assert!(!region.is_valid_zone("ap-southeast-1A"));
        assert!(!region.is_valid_zone("eu-west-1a"));
    }

    #[test]
    fn configured_zones_override_table() {
        let config = ElbConfig::new("ak", "sk", "us-east-1").with_availability_zones(&["us-east-1f"]);
        assert!(config.is_valid_zone("us-east-1f"));
        assert!(!config.is_valid_zone("us-east-1a"));
    }

    #[test]
    fn validate_requires_region() {
        let err = ElbConfig::new("ak", "sk", "").validate().unwrap_err();
        assert_eq!(err.message, "Region must be set in order to use EC2 ELB");
    }

    #[test]
    fn validate_rejects_malformed_region() {
        for region in ["evil.example.com#", "us-east-1/", "US-EAST-1", "-us-east-1", "us-east-1-", "us east 1"] {
            let err = ElbConfig::new("ak", "sk", region).validate().unwrap_err();
            assert_eq!(err.kind, crate::error::ElbErrorKind::Config);
            assert_eq!(err.message, format!("Invalid region '{}'", region));
        }
        assert!(ElbConfig::new("ak", "sk", "ap-southeast-1").validate().is_ok());
        assert!(ElbConfig::new("ak", "sk", "cn-north-1").validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_endpoint() {
        let config = ElbConfig::new("ak", "sk", "us-east-1").with_endpoint_url("not a url");
        assert!(config.validate().is_err());
        let config = ElbConfig::new("ak", "sk", "us-east-1").with_timeout_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn endpoint_override() {
        let config = ElbConfig::new("ak", "sk", "us-east-1").with_endpoint_url("http://localhost:4566/");
        assert_eq!(config.endpoint(), "http://localhost:4566/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = ElbCredentials::new("AKIDEXAMPLE", "supersecret");
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("AKIDEXAMPLE"));
        assert!(!dbg.contains("supersecret"));
    }

    #[test]
    fn deserialize_applies_defaults() {
        let json = r#"{"region":"eu-west-1","credentials":{"access_key_id":"ak","secret_access_key":"sk"}}"#;
        let config: ElbConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.endpoint_url.is_none());
    }

    #[test]
    #[serial]
    fn from_environment_reads_region_fallback() {
        std::env::set_var("AWS_ACCESS_KEY_ID", "AKIDENV");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "secretenv");
        std::env::remove_var("AWS_REGION");
        std::env::set_var("AWS_DEFAULT_REGION", "us-west-1");
        std::env::remove_var("ELB_ENDPOINT_URL");

        let config = ElbConfig::from_environment().unwrap();
        assert_eq!(config.region, "us-west-1");
        assert_eq!(config.credentials.access_key_id, "AKIDENV");

        std::env::remove_var("AWS_DEFAULT_REGION");
        let err = ElbConfig::from_environment().unwrap_err();
        assert_eq!(err.kind, crate::error::ElbErrorKind::Config);

        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    }
}
