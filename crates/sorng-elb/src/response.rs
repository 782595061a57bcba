//! Decoded ELB responses.
//!
//! [`ElbResponse`] owns the parsed XML body of one HTTP response together
//! with its status and request ID, and knows how to turn an `<Error>`
//! element into an [`ElbError`].

use crate::error::{ElbError, ElbResult};
use crate::transport::HttpResponse;
use crate::xml::{XPath, XmlDocument};

/// Prefix bound to the ELB namespace in every query.
pub const NAMESPACE_PREFIX: &str = "elb";

/// Response namespace for an API version.
pub fn namespace_for(api_version: &str) -> String {
    format!(
        "http://elasticloadbalancing.amazonaws.com/doc/{}/",
        api_version
    )
}

/// A parsed ELB response.
#[derive(Debug, Clone)]
pub struct ElbResponse {
    status: u16,
    request_id: Option<String>,
    namespace: String,
    document: XmlDocument,
}

impl ElbResponse {
    /// Parse the body of `http`.
    ///
    /// A body that is not XML is a `Parse` error for a 2xx status and an
    /// `Http` error otherwise.
    pub fn new(http: HttpResponse, api_version: &str) -> ElbResult<Self> {
        let header_request_id = http.header("x-amzn-requestid").map(|s| s.to_string());

        let document = match XmlDocument::parse(&http.body) {
            Ok(doc) => doc,
            Err(e) if http.is_success() => return Err(e.with_status(http.status)),
            Err(_) => {
                let err = ElbError::http_status(http.status, &http.body);
                return Err(match header_request_id {
                    Some(id) => err.with_request_id(id),
                    None => err,
                });
            }
        };

        let namespace = namespace_for(api_version);
        let root = document.root();
        if root.namespace.as_deref() != Some(namespace.as_str()) {
            log::warn!(
                "ELB response <{}> is in namespace {:?}, expected {}",
                root.local_name,
                root.namespace,
                namespace
            );
        }

        let mut response = Self {
            status: http.status,
            request_id: header_request_id,
            namespace,
            document,
        };
        if response.request_id.is_none() {
            let id = response.xpath().string("//elb:RequestId");
            if !id.is_empty() {
                response.request_id = Some(id);
            }
        }
        Ok(response)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    /// XPath evaluator with `elb` bound to this response's namespace.
    pub fn xpath(&self) -> XPath<'_> {
        XPath::new(&self.document, NAMESPACE_PREFIX, &self.namespace)
    }

    /// Local name of the root element, e.g. `DescribeLoadBalancersResponse`.
    pub fn root_name(&self) -> &str {
        &self.document.root().local_name
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with the first `<Error>` in the body.
    pub fn check_for_errors(&self) -> ElbResult<()> {
        let xpath = self.xpath();

        let mut errors = xpath.nodes("//elb:Error");
        if errors.is_empty() && !self.is_success() {
            errors = xpath.nodes("//Error");
        }

        if let Some(&error) = errors.first() {
            let (code, message) = if error.namespace.is_some() {
                (
                    xpath.string_from(error, "elb:Code"),
                    xpath.string_from(error, "elb:Message"),
                )
            } else {
                (
                    xpath.string_from(error, "Code"),
                    xpath.string_from(error, "Message"),
                )
            };
            log::warn!("ELB returned error {} (HTTP {})", code, self.status);
            return Err(self.attach_request_id(ElbError::service(&code, &message, self.status)));
        }

        if !self.is_success() {
            return Err(self.attach_request_id(ElbError::http_status(
                self.status,
                &self.document.root().string_value(),
            )));
        }
        Ok(())
    }

    /// Fail unless the root element is `expected`.
    pub fn expect_type(&self, expected: &str) -> ElbResult<()> {
        let got = self.root_name();
        if got == expected {
            Ok(())
        } else {
            Err(self.attach_request_id(ElbError::unexpected_response(expected, got)))
        }
    }

    fn attach_request_id(&self, err: ElbError) -> ElbError {
        match self.request_id {
            Some(ref id) => err.with_request_id(id.clone()),
            None => err,
        }
    }
}
