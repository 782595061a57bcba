//! Input checks run before a request is built.

use crate::config::ElbConfig;
use crate::error::{ElbError, ElbResult};
use crate::listener::Listener;
use crate::types::HealthCheck;

const MAX_NAME_LEN: usize = 32;

/// Letters, digits and hyphens; starts alphanumeric, does not end in `-`.
pub fn is_valid_load_balancer_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= MAX_NAME_LEN
                && first.is_ascii_alphanumeric()
                && *last != b'-'
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}

pub fn validate_load_balancer_name(name: &str) -> ElbResult<()> {
    if is_valid_load_balancer_name(name) {
        Ok(())
    } else {
        Err(ElbError::validation(&format!(
            "Invalid load balancer name: '{}'",
            name
        )))
    }
}

pub fn validate_load_balancer_names<S: AsRef<str>>(names: &[S]) -> ElbResult<()> {
    names
        .iter()
        .try_for_each(|name| validate_load_balancer_name(name.as_ref()))
}

/// Trim each ID; at least one is required and none may be blank.
pub fn normalize_instance_ids<S: AsRef<str>>(ids: &[S]) -> ElbResult<Vec<String>> {
    if ids.is_empty() {
        return Err(ElbError::validation(
            "Invalid instance ID list, expecting at least one instance",
        ));
    }
    ids.iter()
        .map(|id| {
            let trimmed = id.as_ref().trim();
            if trimmed.is_empty() {
                Err(ElbError::validation(&format!(
                    "Invalid instance ID '{}'",
                    id.as_ref()
                )))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

/// At least one zone, each valid for the configured region.
pub fn validate_zones<S: AsRef<str>>(config: &ElbConfig, zones: &[S]) -> ElbResult<()> {
    if zones.is_empty() {
        return Err(ElbError::validation(
            "Invalid availability zones, expecting at least one zone",
        ));
    }
    for zone in zones {
        let zone = zone.as_ref();
        if !config.is_valid_zone(zone) {
            return Err(ElbError::validation(&format!(
                "Invalid availability zone '{}' for region '{}'",
                zone, config.region
            )));
        }
    }
    Ok(())
}

pub fn validate_listeners(listeners: &[Listener]) -> ElbResult<()> {
    if listeners.is_empty() {
        Err(ElbError::validation(
            "Invalid listener, expecting at least one listener",
        ))
    } else {
        Ok(())
    }
}

// ── Health checks ───────────────────────────────────────────────────────

pub fn validate_health_check(check: &HealthCheck) -> ElbResult<()> {
    validate_health_check_target(&check.target)?;
    check_range("interval", check.interval, 5, 300)?;
    check_range("timeout", check.timeout, 2, 60)?;
    if check.timeout >= check.interval {
        return Err(ElbError::validation(&format!(
            "Invalid health check: timeout ({}) must be less than interval ({})",
            check.timeout, check.interval
        )));
    }
    check_range("unhealthy threshold", check.unhealthy_threshold, 2, 10)?;
    check_range("healthy threshold", check.healthy_threshold, 2, 10)?;
    Ok(())
}

/// `TCP:port`, `SSL:port`, `HTTP:port/path` or `HTTPS:port/path`.
pub fn validate_health_check_target(target: &str) -> ElbResult<()> {
    let invalid = || {
        ElbError::validation(&format!(
            "Invalid health check target '{}', expecting PROTOCOL:port[/path]",
            target
        ))
    };

    let (protocol, rest) = target.split_once(':').ok_or_else(invalid)?;
    let (port, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], Some(&rest[idx..])),
        None => (rest, None),
    };
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match port.parse::<u32>() {
        Ok(p) if (1..=65535).contains(&p) => {}
        _ => return Err(invalid()),
    }

    match (protocol, path) {
        ("TCP" | "SSL", None) => Ok(()),
        ("HTTP" | "HTTPS", Some(_)) => Ok(()),
        _ => Err(invalid()),
    }
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> ElbResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ElbError::validation(&format!(
            "Invalid health check {}: expecting a number between {} and {}, got {}",
            field, min, max, value
        )))
    }
}
