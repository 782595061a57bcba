//! # sorng-elb – Amazon Elastic Load Balancing client
//!
//! Talks to the 2009-11-25 ELB query API: create, delete and describe load
//! balancers, register and deregister instances, enable and disable
//! availability zones, configure health checks and read instance health.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  ElbClient  (elb.rs)                             │
//! │  ├── input validation   (validation.rs)          │
//! │  ├── parameter assembly (Listener, members)      │
//! │  └── typed decode       (types.rs)               │
//! ├──────────────────────────────────────────────────┤
//! │  QueryClient  (client.rs)                        │
//! │  ├── QuerySigner  (signing.rs, signature v2)     │
//! │  └── HttpTransport  (transport.rs)               │
//! │       ReqwestTransport · MockTransport           │
//! ├──────────────────────────────────────────────────┤
//! │  ElbResponse  (response.rs)                      │
//! │  └── XmlDocument + XPath  (xml.rs)               │
//! │       error check · root type check              │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use sorng_elb::{ElbClient, ElbConfig, Listener};
//!
//! # async fn run() -> sorng_elb::ElbResult<()> {
//! let elb = ElbClient::new(ElbConfig::new("AKID", "secret", "us-east-1"))?;
//! let dns = elb
//!     .create_load_balancer("web", &["us-east-1a"], &[Listener::http(80, 8080)?])
//!     .await?;
//! elb.register_instances("web", &["i-1053ec67"]).await?;
//! println!("{}", dns);
//! # Ok(())
//! # }
//! ```

// ── Sub-modules ─────────────────────────────────────────────────────────

pub mod error;
pub mod config;
pub mod signing;
pub mod transport;
pub mod xml;
pub mod response;
pub mod client;

pub mod listener;
pub mod types;
pub mod validation;
pub mod elb;

// ── Re-exports for ergonomic access ─────────────────────────────────────

pub use config::{ElbConfig, ElbCredentials, ElbRegion};
pub use elb::ElbClient;
pub use error::{ElbError, ElbErrorKind, ElbResult};
pub use listener::{Listener, ListenerProtocol};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, MockTransport, ReqwestTransport};
pub use types::{
    AppCookieStickinessPolicy, HealthCheck, InstanceState, LbCookieStickinessPolicy,
    ListenerDescription, LoadBalancerDescription, Policies,
};
