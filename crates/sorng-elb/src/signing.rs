//! AWS query-string signature, version 2.
//!
//! ELB's 2009-11-25 query API authenticates each request with signature
//! version 2:
//!
//! 1. Add the required parameters (`AWSAccessKeyId`, `SignatureMethod`,
//!    `SignatureVersion`, `Timestamp`, `Version`)
//! 2. Build the string to sign:
//!    `POST\n{host}\n{path}\n{sorted, RFC 3986 encoded params}`
//! 3. `Signature = Base64(HMAC-SHA256(SecretAccessKey, StringToSign))`
//!
//! Reference: <https://docs.aws.amazon.com/general/latest/gr/signature-version-2.html>

use crate::error::{ElbError, ElbResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_METHOD: &str = "HmacSHA256";
pub const SIGNATURE_VERSION: &str = "2";

/// Everything except the RFC 3986 unreserved set.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Signature v2 signer bound to one access key pair and API version.
#[derive(Clone)]
pub struct QuerySigner {
    access_key_id: String,
    secret_access_key: String,
    api_version: String,
}

impl std::fmt::Debug for QuerySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySigner")
            .field("access_key_id", &self.access_key_id)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl QuerySigner {
    pub fn new(access_key_id: &str, secret_access_key: &str, api_version: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            api_version: api_version.to_string(),
        }
    }

    /// Add the required parameters and the signature to `params`.
    ///
    /// Caller-supplied values for the required keys are overwritten; any
    /// existing `Signature` is ignored when computing the new one.
    pub fn sign(
        &self,
        method: &str,
        host: &str,
        path: &str,
        params: &mut BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
    ) -> ElbResult<()> {
        self.add_required_params(params, timestamp);
        let string_to_sign = string_to_sign(method, host, path, params);
        let signature = self.compute_signature(&string_to_sign)?;
        params.insert("Signature".to_string(), signature);
        Ok(())
    }

    fn add_required_params(&self, params: &mut BTreeMap<String, String>, timestamp: DateTime<Utc>) {
        params.insert("AWSAccessKeyId".to_string(), self.access_key_id.clone());
        params.insert("SignatureMethod".to_string(), SIGNATURE_METHOD.to_string());
        params.insert("SignatureVersion".to_string(), SIGNATURE_VERSION.to_string());
        params.insert("Timestamp".to_string(), format_timestamp(timestamp));
        params.insert("Version".to_string(), self.api_version.clone());
    }

    fn compute_signature(&self, string_to_sign: &str) -> ElbResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_access_key.as_bytes())
            .map_err(|e| ElbError::config(&format!("Unusable secret access key: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

// ── Helper functions ────────────────────────────────────────────────────

/// Build the canonical string to sign.
///
/// `BTreeMap` iteration gives the byte-wise key order the service expects.
pub fn string_to_sign(
    method: &str,
    host: &str,
    path: &str,
    params: &BTreeMap<String, String>,
) -> String {
    let canonical_query = params
        .iter()
        .filter(|(k, _)| k.as_str() != "Signature")
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<String>>()
        .join("&");

    let path = if path.is_empty() { "/" } else { path };
    format!("{}\n{}\n{}\n{}", method, host.to_lowercase(), path, canonical_query)
}

/// RFC 3986 percent-encoding: only `A-Z a-z 0-9 - _ . ~` pass through.
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, QUERY_ENCODE_SET).to_string()
}

/// Build a form body / query string from parameters in key order.
pub fn build_query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<String>>()
        .join("&")
}

/// `YYYY-MM-DDTHH:MM:SSZ` in UTC.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_ts() -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(2010, 4, 24)
            .unwrap()
            .and_hms_opt(11, 17, 46)
            .unwrap()
            .and_utc()
    }

    fn signer() -> QuerySigner {
        QuerySigner::new("access_key", "secret_access_key", "2009-11-25")
    }

    #[test]
    fn uri_encode_unreserved() {
        assert_eq!(uri_encode("abcABC123-_.~"), "abcABC123-_.~");
    }

    #[test]
    fn uri_encode_reserved() {
        assert_eq!(uri_encode("hello world"), "hello%20world");
        assert_eq!(uri_encode("a/b"), "a%2Fb");
        assert_eq!(uri_encode("k=v&x"), "k%3Dv%26x");
        assert_eq!(uri_encode("2010-04-24T11:17:46Z"), "2010-04-24T11%3A17%3A46Z");
        assert_eq!(uri_encode("a+b*c!"), "a%2Bb%2Ac%21");
    }

    #[test]
    fn uri_encode_utf8_uppercase_hex() {
        assert_eq!(uri_encode("é"), "%C3%A9");
    }

    #[test]
    fn timestamp_format() {
        assert_eq!(format_timestamp(fixed_ts()), "2010-04-24T11:17:46Z");
    }

    #[test]
    fn string_to_sign_layout() {
        let mut params = BTreeMap::new();
        params.insert("Version".to_string(), "2009-11-25".to_string());
        params.insert("Action".to_string(), "DescribeLoadBalancers".to_string());
        params.insert("Signature".to_string(), "ignored".to_string());

        let s = string_to_sign("POST", "ElasticLoadBalancing.us-east-1.amazonaws.com", "/", &params);
        assert_eq!(
            s,
            "POST\nelasticloadbalancing.us-east-1.amazonaws.com\n/\nAction=DescribeLoadBalancers&Version=2009-11-25"
        );
    }

    #[test]
    fn string_to_sign_sorts_bytewise() {
        let mut params = BTreeMap::new();
        params.insert("a".to_string(), "1".to_string());
        params.insert("B".to_string(), "2".to_string());
        params.insert("AWSAccessKeyId".to_string(), "3".to_string());
        params.insert("Action".to_string(), "4".to_string());

        let s = string_to_sign("POST", "h", "/", &params);
        // Upper-case letters sort before lower-case; "AWS…" before "Action".
        assert!(s.ends_with("AWSAccessKeyId=3&Action=4&B=2&a=1"));
    }

    #[test]
    fn sign_adds_required_params() {
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "DeleteLoadBalancer".to_string());

        signer()
            .sign("POST", "elasticloadbalancing.us-east-1.amazonaws.com", "/", &mut params, fixed_ts())
            .unwrap();

        assert_eq!(params["AWSAccessKeyId"], "access_key");
        assert_eq!(params["SignatureMethod"], "HmacSHA256");
        assert_eq!(params["SignatureVersion"], "2");
        assert_eq!(params["Timestamp"], "2010-04-24T11:17:46Z");
        assert_eq!(params["Version"], "2009-11-25");
        assert!(params.contains_key("Signature"));
    }

    #[test]
    fn signature_matches_independent_hmac() {
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "DescribeLoadBalancers".to_string());
        let host = "elasticloadbalancing.us-east-1.amazonaws.com";

        signer().sign("POST", host, "/", &mut params, fixed_ts()).unwrap();

        let expected_input = format!(
            "POST\n{}\n/\nAWSAccessKeyId=access_key&Action=DescribeLoadBalancers\
             &SignatureMethod=HmacSHA256&SignatureVersion=2\
             &Timestamp=2010-04-24T11%3A17%3A46Z&Version=2009-11-25",
            host
        );
        let mut mac = HmacSha256::new_from_slice(b"secret_access_key").unwrap();
        mac.update(expected_input.as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());

        assert_eq!(params["Signature"], expected);
        // 32-byte digest → 44 base64 characters.
        assert_eq!(params["Signature"].len(), 44);
    }

    #[test]
    fn signing_is_deterministic_and_key_dependent() {
        let host = "elasticloadbalancing.eu-west-1.amazonaws.com";
        let mut a = BTreeMap::new();
        a.insert("Action".to_string(), "DescribeLoadBalancers".to_string());
        let mut b = a.clone();
        let mut c = a.clone();

        signer().sign("POST", host, "/", &mut a, fixed_ts()).unwrap();
        signer().sign("POST", host, "/", &mut b, fixed_ts()).unwrap();
        QuerySigner::new("access_key", "other", "2009-11-25")
            .sign("POST", host, "/", &mut c, fixed_ts())
            .unwrap();

        assert_eq!(a["Signature"], b["Signature"]);
        assert_ne!(a["Signature"], c["Signature"]);
    }

    #[test]
    fn resigning_ignores_previous_signature() {
        let host = "elasticloadbalancing.eu-west-1.amazonaws.com";
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "DescribeLoadBalancers".to_string());

        signer().sign("POST", host, "/", &mut params, fixed_ts()).unwrap();
        let first = params["Signature"].clone();
        signer().sign("POST", host, "/", &mut params, fixed_ts()).unwrap();
        assert_eq!(params["Signature"], first);
    }

    #[test]
    fn build_query_string_sorted() {
        let mut params = BTreeMap::new();
        params.insert("Version".to_string(), "2009-11-25".to_string());
        params.insert("Action".to_string(), "CreateLoadBalancer".to_string());
        params.insert("LoadBalancerName".to_string(), "my lb".to_string());
        assert_eq!(
            build_query_string(&params),
            "Action=CreateLoadBalancer&LoadBalancerName=my%20lb&Version=2009-11-25"
        );
    }
}
