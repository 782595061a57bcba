//! Listener definitions: which load balancer port forwards to which
//! instance port, and over which protocol.

use crate::error::{ElbError, ElbResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Protocols a 2009-11-25 listener can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListenerProtocol {
    Http,
    Tcp,
}

impl ListenerProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Tcp => "TCP",
        }
    }
}

impl fmt::Display for ListenerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListenerProtocol {
    type Err = ElbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP" => Ok(Self::Http),
            "TCP" => Ok(Self::Tcp),
            other => Err(ElbError::validation(&format!(
                "Protocol '{}' is not a valid Listener protocol",
                other
            ))),
        }
    }
}

/// A port mapping on a load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Listener {
    pub load_balancer_port: u16,
    pub instance_port: u16,
    pub protocol: ListenerProtocol,
}

impl Listener {
    /// Both ports must lie in `1..=65535`.
    pub fn new(
        load_balancer_port: u32,
        instance_port: u32,
        protocol: ListenerProtocol,
    ) -> ElbResult<Self> {
        Ok(Self {
            load_balancer_port: check_port(load_balancer_port)?,
            instance_port: check_port(instance_port)?,
            protocol,
        })
    }

    pub fn http(load_balancer_port: u32, instance_port: u32) -> ElbResult<Self> {
        Self::new(load_balancer_port, instance_port, ListenerProtocol::Http)
    }

    pub fn tcp(load_balancer_port: u32, instance_port: u32) -> ElbResult<Self> {
        Self::new(load_balancer_port, instance_port, ListenerProtocol::Tcp)
    }

    /// Query parameters for this listener at 1-based position `index`.
    pub fn to_params(&self, index: usize) -> BTreeMap<String, String> {
        let prefix = format!("Listeners.member.{}", index);
        let mut params = BTreeMap::new();
        params.insert(format!("{}.Protocol", prefix), self.protocol.to_string());
        params.insert(
            format!("{}.LoadBalancerPort", prefix),
            self.load_balancer_port.to_string(),
        );
        params.insert(format!("{}.InstancePort", prefix), self.instance_port.to_string());
        params
    }
}

fn check_port(port: u32) -> ElbResult<u16> {
    match u16::try_from(port) {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(ElbError::validation(&format!(
            "Invalid port: expecting a number between 1 and 65535, got {}",
            port
        ))),
    }
}
