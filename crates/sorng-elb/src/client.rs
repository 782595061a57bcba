//! Signed query-API pipeline shared by every ELB action.
//!
//! A request is a flat map of query parameters. [`QueryClient::send_request`]
//! adds the signature v2 parameters, form-encodes the map into a POST body,
//! hands it to the configured [`HttpTransport`] and returns the parsed
//! [`ElbResponse`] once it has been checked for `<Error>` elements.

use crate::config::ElbConfig;
use crate::error::{ElbError, ElbResult};
use crate::response::ElbResponse;
use crate::signing::{self, QuerySigner};
use crate::transport::{HttpRequest, HttpTransport};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Client that signs and posts query-API requests to one endpoint.
#[derive(Debug, Clone)]
pub struct QueryClient {
    transport: Arc<dyn HttpTransport>,
    signer: QuerySigner,
    /// Full endpoint URL.
    endpoint: String,
    /// Host part of the endpoint, as signed.
    host: String,
    /// Path part of the endpoint, as signed.
    path: String,
    api_version: String,
    user_agent: String,
}

impl QueryClient {
    pub fn new(config: &ElbConfig, transport: Arc<dyn HttpTransport>) -> ElbResult<Self> {
        let endpoint = config.endpoint();
        let url = url::Url::parse(&endpoint)
            .map_err(|e| ElbError::config(&format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ElbError::config(&format!(
                    "Endpoint URL '{}' has no host",
                    endpoint
                )))
            }
        };

        Ok(Self {
            transport,
            signer: QuerySigner::new(
                &config.credentials.access_key_id,
                &config.credentials.secret_access_key,
                &config.api_version,
            ),
            endpoint,
            host,
            path: url.path().to_string(),
            api_version: config.api_version.clone(),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Sign `params`, POST them and return the error-checked response.
    pub async fn send_request(
        &self,
        mut params: BTreeMap<String, String>,
    ) -> ElbResult<ElbResponse> {
        let action = params.get("Action").cloned().unwrap_or_default();
        log::debug!("ELB {} -> {}", action, self.endpoint);

        self.signer
            .sign("POST", &self.host, &self.path, &mut params, Utc::now())?;

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), self.host.clone());
        headers.insert("content-type".to_string(), FORM_CONTENT_TYPE.to_string());
        headers.insert("user-agent".to_string(), self.user_agent.clone());

        let request = HttpRequest {
            method: "POST".to_string(),
            url: self.endpoint.clone(),
            headers,
            body: signing::build_query_string(&params),
        };

        let http = self
            .transport
            .send(request)
            .await
            .map_err(|e| e.with_action(&action))?;
        let response = ElbResponse::new(http, &self.api_version)
            .map_err(|e| e.with_action(&action))?;
        log::debug!(
            "ELB {} <- HTTP {} (request id {})",
            action,
            response.status(),
            response.request_id().unwrap_or("-")
        );

        response
            .check_for_errors()
            .map_err(|e| e.with_action(&action))?;
        Ok(response)
    }
}

// ── Parameter helpers ───────────────────────────────────────────────────

/// Start a parameter map for `action`.
pub fn build_query_params(action: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("Action".to_string(), action.to_string());
    params
}

/// Add `{prefix}.member.{n}` entries (1-based).
pub fn add_members<S: AsRef<str>>(
    params: &mut BTreeMap<String, String>,
    prefix: &str,
    values: &[S],
) {
    for (i, value) in values.iter().enumerate() {
        params.insert(format!("{}.member.{}", prefix, i + 1), value.as_ref().to_string());
    }
}

/// Add `{prefix}.member.{n}.{field}` entries (1-based).
pub fn add_member_fields<S: AsRef<str>>(
    params: &mut BTreeMap<String, String>,
    prefix: &str,
    field: &str,
    values: &[S],
) {
    for (i, value) in values.iter().enumerate() {
        params.insert(
            format!("{}.member.{}.{}", prefix, i + 1, field),
            value.as_ref().to_string(),
        );
    }
}
