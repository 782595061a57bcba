//! Result types returned by the ELB operations.

use crate::listener::Listener;
use serde::{Deserialize, Serialize};

/// A load balancer as returned by `DescribeLoadBalancers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerDescription {
    pub load_balancer_name: String,
    /// ISO-8601 creation time, as sent by the service.
    pub created_time: String,
    pub dns_name: String,
    pub availability_zones: Vec<String>,
    pub instances: Vec<String>,
    pub health_check: HealthCheck,
    pub listener_descriptions: Vec<ListenerDescription>,
    pub policies: Policies,
}

/// Health check settings of a load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// `PROTOCOL:port[/path]`, e.g. `TCP:80` or `HTTP:8080/ping`.
    pub target: String,
    /// Seconds between checks.
    pub interval: u32,
    /// Seconds before a check counts as failed.
    pub timeout: u32,
    pub unhealthy_threshold: u32,
    pub healthy_threshold: u32,
}

impl HealthCheck {
    pub fn new(
        target: &str,
        interval: u32,
        timeout: u32,
        unhealthy_threshold: u32,
        healthy_threshold: u32,
    ) -> Self {
        Self {
            target: target.to_string(),
            interval,
            timeout,
            unhealthy_threshold,
            healthy_threshold,
        }
    }
}

/// A listener together with the policies applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerDescription {
    pub listener: Listener,
    pub policy_names: Vec<String>,
}

/// Stickiness policies defined on a load balancer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policies {
    pub app_cookie_stickiness_policies: Vec<AppCookieStickinessPolicy>,
    pub lb_cookie_stickiness_policies: Vec<LbCookieStickinessPolicy>,
}

impl Policies {
    pub fn is_empty(&self) -> bool {
        self.app_cookie_stickiness_policies.is_empty()
            && self.lb_cookie_stickiness_policies.is_empty()
    }
}

/// Sessions follow an application-generated cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCookieStickinessPolicy {
    pub policy_name: String,
    pub cookie_name: String,
}

/// Sessions follow a load-balancer-generated cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbCookieStickinessPolicy {
    pub policy_name: String,
    /// Cookie lifetime in seconds; `None` means a session cookie.
    pub cookie_expiration_period: Option<u64>,
}

/// Health of one registered instance, from `DescribeInstanceHealth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    pub instance_id: String,
    /// `InService` or `OutOfService`.
    pub state: String,
    /// `ELB` or `Instance` when out of service, `N/A` otherwise.
    pub reason_code: String,
    pub description: String,
}

impl InstanceState {
    pub fn is_in_service(&self) -> bool {
        self.state == "InService"
    }
}
