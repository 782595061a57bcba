//! Elastic Load Balancing service client.
//!
//! Wraps the 2009-11-25 ELB query API. Every operation checks its input,
//! sends exactly one signed request, verifies the response root element and
//! maps the body onto the types in [`crate::types`].
//!
//! Reference: <https://docs.aws.amazon.com/elasticloadbalancing/2012-06-01/APIReference/>

use crate::client::{self, QueryClient};
use crate::config::ElbConfig;
use crate::error::{ElbError, ElbResult};
use crate::listener::{Listener, ListenerProtocol};
use crate::response::ElbResponse;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{
    AppCookieStickinessPolicy, HealthCheck, InstanceState, LbCookieStickinessPolicy,
    ListenerDescription, LoadBalancerDescription, Policies,
};
use crate::validation;
use crate::xml::{XPath, XmlElement};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// ELB client bound to one region and one set of credentials.
#[derive(Debug, Clone)]
pub struct ElbClient {
    config: ElbConfig,
    client: QueryClient,
}

impl ElbClient {
    /// Build a client that talks to the network through `reqwest`.
    pub fn new(config: ElbConfig) -> ElbResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a client on top of any transport.
    pub fn with_transport(
        config: ElbConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> ElbResult<Self> {
        config.validate()?;
        let client = QueryClient::new(&config, transport)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ElbConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    // ── Load balancers ──────────────────────────────────────────────────

    /// DescribeLoadBalancers - describe the named load balancers. Results
    /// keep the service's order. At least one name is required; use
    /// [`describe_all_load_balancers`](Self::describe_all_load_balancers)
    /// for an unfiltered listing.
    pub async fn describe_load_balancers<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> ElbResult<Vec<LoadBalancerDescription>> {
        if names.is_empty() {
            return Err(ElbError::validation(
                "Invalid load balancer name list, expecting at least one name",
            ));
        }
        validation::validate_load_balancer_names(names)?;

        let mut params = client::build_query_params("DescribeLoadBalancers");
        client::add_members(&mut params, "LoadBalancerNames", names);
        self.describe(params).await
    }

    /// DescribeLoadBalancers without a name filter.
    pub async fn describe_all_load_balancers(&self) -> ElbResult<Vec<LoadBalancerDescription>> {
        self.describe(client::build_query_params("DescribeLoadBalancers")).await
    }

    async fn describe(
        &self,
        params: BTreeMap<String, String>,
    ) -> ElbResult<Vec<LoadBalancerDescription>> {
        let response = self.send(params, "DescribeLoadBalancersResponse").await?;
        let xpath = response.xpath();
        xpath
            .nodes("//elb:LoadBalancerDescriptions/elb:member")
            .into_iter()
            .map(|member| parse_load_balancer(&xpath, member))
            .collect()
    }

    /// CreateLoadBalancer - returns the DNS name of the new load balancer.
    ///
    /// Creating a load balancer under an existing name succeeds and returns
    /// the existing DNS name.
    pub async fn create_load_balancer<S: AsRef<str>>(
        &self,
        name: &str,
        zones: &[S],
        listeners: &[Listener],
    ) -> ElbResult<String> {
        validation::validate_load_balancer_name(name)?;
        validation::validate_zones(&self.config, zones)?;
        validation::validate_listeners(listeners)?;

        let mut params = client::build_query_params("CreateLoadBalancer");
        params.insert("LoadBalancerName".to_string(), name.to_string());
        client::add_members(&mut params, "AvailabilityZones", zones);
        for (i, listener) in listeners.iter().enumerate() {
            params.extend(listener.to_params(i + 1));
        }

        let response = self.send(params, "CreateLoadBalancerResponse").await?;
        let dns_name = response.xpath().string("//elb:DNSName/text()");
        log::info!("Created load balancer {} ({})", name, dns_name);
        Ok(dns_name)
    }

    /// DeleteLoadBalancer
    pub async fn delete_load_balancer(&self, name: &str) -> ElbResult<()> {
        validation::validate_load_balancer_name(name)?;

        let mut params = client::build_query_params("DeleteLoadBalancer");
        params.insert("LoadBalancerName".to_string(), name.to_string());

        self.send(params, "DeleteLoadBalancerResponse").await?;
        log::info!("Deleted load balancer {}", name);
        Ok(())
    }

    // ── Instances ───────────────────────────────────────────────────────

    /// RegisterInstancesWithLoadBalancer - returns every instance now
    /// registered with the load balancer.
    pub async fn register_instances<S: AsRef<str>>(
        &self,
        name: &str,
        instance_ids: &[S],
    ) -> ElbResult<Vec<String>> {
        self.change_instances(
            "RegisterInstancesWithLoadBalancer",
            "RegisterInstancesWithLoadBalancerResponse",
            name,
            instance_ids,
        )
        .await
    }

    /// DeregisterInstancesFromLoadBalancer - returns the instances still
    /// registered with the load balancer.
    pub async fn deregister_instances<S: AsRef<str>>(
        &self,
        name: &str,
        instance_ids: &[S],
    ) -> ElbResult<Vec<String>> {
        self.change_instances(
            "DeregisterInstancesFromLoadBalancer",
            "DeregisterInstancesFromLoadBalancerResponse",
            name,
            instance_ids,
        )
        .await
    }

    async fn change_instances<S: AsRef<str>>(
        &self,
        action: &str,
        expected: &str,
        name: &str,
        instance_ids: &[S],
    ) -> ElbResult<Vec<String>> {
        validation::validate_load_balancer_name(name)?;
        let instance_ids = validation::normalize_instance_ids(instance_ids)?;

        let mut params = client::build_query_params(action);
        params.insert("LoadBalancerName".to_string(), name.to_string());
        client::add_member_fields(&mut params, "Instances", "InstanceId", &instance_ids);

        let response = self.send(params, expected).await?;
        Ok(string_values(
            &response
                .xpath()
                .nodes("//elb:Instances/elb:member/elb:InstanceId"),
        ))
    }

    /// DescribeInstanceHealth - health of the given instances, or of every
    /// registered instance when `instance_ids` is empty.
    pub async fn describe_instance_health<S: AsRef<str>>(
        &self,
        name: &str,
        instance_ids: &[S],
    ) -> ElbResult<Vec<InstanceState>> {
        validation::validate_load_balancer_name(name)?;

        let mut params = client::build_query_params("DescribeInstanceHealth");
        params.insert("LoadBalancerName".to_string(), name.to_string());
        if !instance_ids.is_empty() {
            let instance_ids = validation::normalize_instance_ids(instance_ids)?;
            client::add_member_fields(&mut params, "Instances", "InstanceId", &instance_ids);
        }

        let response = self.send(params, "DescribeInstanceHealthResponse").await?;
        let xpath = response.xpath();
        Ok(xpath
            .nodes("//elb:InstanceStates/elb:member")
            .into_iter()
            .map(|member| InstanceState {
                instance_id: xpath.string_from(member, "elb:InstanceId"),
                state: xpath.string_from(member, "elb:State"),
                reason_code: xpath.string_from(member, "elb:ReasonCode"),
                description: xpath.string_from(member, "elb:Description"),
            })
            .collect())
    }

    // ── Availability zones ──────────────────────────────────────────────

    /// EnableAvailabilityZonesForLoadBalancer - returns the resulting zones.
    pub async fn enable_availability_zones<S: AsRef<str>>(
        &self,
        name: &str,
        zones: &[S],
    ) -> ElbResult<Vec<String>> {
        self.change_zones(
            "EnableAvailabilityZonesForLoadBalancer",
            "EnableAvailabilityZonesForLoadBalancerResponse",
            name,
            zones,
        )
        .await
    }

    /// DisableAvailabilityZonesForLoadBalancer - returns the remaining zones.
    pub async fn disable_availability_zones<S: AsRef<str>>(
        &self,
        name: &str,
        zones: &[S],
    ) -> ElbResult<Vec<String>> {
        self.change_zones(
            "DisableAvailabilityZonesForLoadBalancer",
            "DisableAvailabilityZonesForLoadBalancerResponse",
            name,
            zones,
        )
        .await
    }

    async fn change_zones<S: AsRef<str>>(
        &self,
        action: &str,
        expected: &str,
        name: &str,
        zones: &[S],
    ) -> ElbResult<Vec<String>> {
        validation::validate_load_balancer_name(name)?;
        validation::validate_zones(&self.config, zones)?;

        let mut params = client::build_query_params(action);
        params.insert("LoadBalancerName".to_string(), name.to_string());
        client::add_members(&mut params, "AvailabilityZones", zones);

        let response = self.send(params, expected).await?;
        Ok(string_values(
            &response.xpath().nodes("//elb:AvailabilityZones/elb:member"),
        ))
    }

    // ── Health checks ───────────────────────────────────────────────────

    /// ConfigureHealthCheck - returns the health check as stored by the
    /// service.
    pub async fn configure_health_check(
        &self,
        name: &str,
        health_check: &HealthCheck,
    ) -> ElbResult<HealthCheck> {
        validation::validate_load_balancer_name(name)?;
        validation::validate_health_check(health_check)?;

        let mut params = client::build_query_params("ConfigureHealthCheck");
        params.insert("LoadBalancerName".to_string(), name.to_string());
        params.insert("HealthCheck.Target".to_string(), health_check.target.clone());
        params.insert("HealthCheck.Interval".to_string(), health_check.interval.to_string());
        params.insert("HealthCheck.Timeout".to_string(), health_check.timeout.to_string());
        params.insert(
            "HealthCheck.UnhealthyThreshold".to_string(),
            health_check.unhealthy_threshold.to_string(),
        );
        params.insert(
            "HealthCheck.HealthyThreshold".to_string(),
            health_check.healthy_threshold.to_string(),
        );

        let response = self.send(params, "ConfigureHealthCheckResponse").await?;
        let xpath = response.xpath();
        match xpath.nodes("//elb:HealthCheck").first() {
            Some(&node) => parse_health_check(&xpath, node),
            None => Err(ElbError::parse("ConfigureHealthCheckResponse has no HealthCheck element")),
        }
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn send(
        &self,
        params: BTreeMap<String, String>,
        expected: &str,
    ) -> ElbResult<ElbResponse> {
        let response = self.client.send_request(params).await?;
        response.expect_type(expected)?;
        Ok(response)
    }
}

// ── Response parsing ────────────────────────────────────────────────────

fn string_values(nodes: &[&XmlElement]) -> Vec<String> {
    nodes.iter().map(|n| n.string_value()).collect()
}

/// Parse a numeric field; an absent value reads as zero.
fn parse_number<T: FromStr + Default>(value: &str, field: &str) -> ElbResult<T> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(T::default());
    }
    value
        .parse()
        .map_err(|_| ElbError::parse(&format!("Invalid {} value '{}'", field, value)))
}

fn parse_load_balancer<'d>(
    xpath: &XPath<'d>,
    member: &'d XmlElement,
) -> ElbResult<LoadBalancerDescription> {
    let health_check = match xpath.nodes_from(member, "elb:HealthCheck").first() {
        Some(&node) => parse_health_check(xpath, node)?,
        None => HealthCheck::new("", 0, 0, 0, 0),
    };

    let listener_descriptions = xpath
        .nodes_from(member, "elb:ListenerDescriptions/elb:member")
        .into_iter()
        .map(|ld| parse_listener_description(xpath, ld))
        .collect::<ElbResult<Vec<_>>>()?;

    Ok(LoadBalancerDescription {
        load_balancer_name: xpath.string_from(member, "elb:LoadBalancerName"),
        created_time: xpath.string_from(member, "elb:CreatedTime"),
        dns_name: xpath.string_from(member, "elb:DNSName"),
        availability_zones: string_values(
            &xpath.nodes_from(member, "elb:AvailabilityZones/elb:member"),
        ),
        instances: string_values(
            &xpath.nodes_from(member, "elb:Instances/elb:member/elb:InstanceId"),
        ),
        health_check,
        listener_descriptions,
        policies: parse_policies(xpath, member)?,
    })
}

fn parse_health_check<'d>(xpath: &XPath<'d>, node: &'d XmlElement) -> ElbResult<HealthCheck> {
    Ok(HealthCheck {
        target: xpath.string_from(node, "elb:Target"),
        interval: parse_number(&xpath.string_from(node, "elb:Interval"), "Interval")?,
        timeout: parse_number(&xpath.string_from(node, "elb:Timeout"), "Timeout")?,
        unhealthy_threshold: parse_number(
            &xpath.string_from(node, "elb:UnhealthyThreshold"),
            "UnhealthyThreshold",
        )?,
        healthy_threshold: parse_number(
            &xpath.string_from(node, "elb:HealthyThreshold"),
            "HealthyThreshold",
        )?,
    })
}

fn parse_listener_description<'d>(
    xpath: &XPath<'d>,
    node: &'d XmlElement,
) -> ElbResult<ListenerDescription> {
    let lb_port: u32 = parse_number(
        &xpath.string_from(node, "elb:Listener/elb:LoadBalancerPort"),
        "LoadBalancerPort",
    )?;
    let instance_port: u32 = parse_number(
        &xpath.string_from(node, "elb:Listener/elb:InstancePort"),
        "InstancePort",
    )?;
    let protocol =
        ListenerProtocol::from_str(&xpath.string_from(node, "elb:Listener/elb:Protocol"))
            .map_err(|e| ElbError::parse(&e.message))?;
    let listener = Listener::new(lb_port, instance_port, protocol)
        .map_err(|e| ElbError::parse(&e.message))?;

    Ok(ListenerDescription {
        listener,
        policy_names: string_values(&xpath.nodes_from(node, "elb:PolicyNames/elb:member")),
    })
}

fn parse_policies<'d>(xpath: &XPath<'d>, member: &'d XmlElement) -> ElbResult<Policies> {
    let app_cookie_stickiness_policies = xpath
        .nodes_from(member, "elb:Policies/elb:AppCookieStickinessPolicies/elb:member")
        .into_iter()
        .map(|p| AppCookieStickinessPolicy {
            policy_name: xpath.string_from(p, "elb:PolicyName"),
            cookie_name: xpath.string_from(p, "elb:CookieName"),
        })
        .collect();

    let lb_cookie_stickiness_policies = xpath
        .nodes_from(member, "elb:Policies/elb:LBCookieStickinessPolicies/elb:member")
        .into_iter()
        .map(|p| -> ElbResult<LbCookieStickinessPolicy> {
            let period = xpath.string_from(p, "elb:CookieExpirationPeriod");
            Ok(LbCookieStickinessPolicy {
                policy_name: xpath.string_from(p, "elb:PolicyName"),
                cookie_expiration_period: if period.trim().is_empty() {
                    None
                } else {
                    Some(parse_number(&period, "CookieExpirationPeriod")?)
                },
            })
        })
        .collect::<ElbResult<Vec<_>>>()?;

    Ok(Policies {
        app_cookie_stickiness_policies,
        lb_cookie_stickiness_policies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ElbErrorKind;
    use crate::transport::{HttpResponse, MockTransport};

    const NS: &str = "http://elasticloadbalancing.amazonaws.com/doc/2009-11-25/";

    fn client(mock: &Arc<MockTransport>) -> ElbClient {
        let config = ElbConfig::new("access_key", "secret_access_key", "us-east-1");
        ElbClient::with_transport(config, mock.clone()).unwrap()
    }

    fn wrap(root: &str, inner: &str) -> String {
        format!(
            "<{root} xmlns=\"{NS}\">{inner}<ResponseMetadata><RequestId>req-1</RequestId></ResponseMetadata></{root}>"
        )
    }

    #[test]
    fn client_requires_region() {
        let mock = MockTransport::new();
        let config = ElbConfig::new("access_key", "secret_access_key", "");
        let err = ElbClient::with_transport(config, mock).unwrap_err();
        assert_eq!(err.kind, ElbErrorKind::Config);
        assert_eq!(err.message, "Region must be set in order to use EC2 ELB");
    }

    #[tokio::test]
    async fn invalid_input_sends_nothing() {
        let mock = MockTransport::new();
        let elb = client(&mock);

        assert!(elb.delete_load_balancer("-bad").await.unwrap_err().is_validation());
        assert!(elb.describe_load_balancers(&["ok", "not ok"]).await.is_err());
        assert!(elb
            .create_load_balancer("lb", &["eu-west-1a"], &[Listener::http(80, 80).unwrap()])
            .await
            .is_err());
        assert!(elb.create_load_balancer("lb", &["us-east-1a"], &[]).await.is_err());
        assert!(elb.register_instances("lb", &[" "]).await.is_err());
        assert!(elb.disable_availability_zones::<&str>("lb", &[]).await.is_err());
        assert!(elb
            .configure_health_check("lb", &HealthCheck::new("TCP:80", 30, 40, 2, 2))
            .await
            .is_err());

        assert_eq!(mock.request_count().await, 0);
    }

    #[tokio::test]
    async fn describe_requires_names_unless_listing_all() {
        let mock = MockTransport::new();
        let elb = client(&mock);

        let err = elb.describe_load_balancers::<&str>(&[]).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.message,
            "Invalid load balancer name list, expecting at least one name"
        );
        assert_eq!(mock.request_count().await, 0);

        mock.push_xml(&wrap(
            "DescribeLoadBalancersResponse",
            "<DescribeLoadBalancersResult><LoadBalancerDescriptions/></DescribeLoadBalancersResult>",
        ))
        .await;
        assert!(elb.describe_all_load_balancers().await.unwrap().is_empty());

        let form = mock.last_request().await.unwrap().form_params();
        assert_eq!(form["Action"], "DescribeLoadBalancers");
        assert!(!form.keys().any(|k| k.starts_with("LoadBalancerNames")));
    }

    #[tokio::test]
    async fn create_sends_zones_and_listeners() {
        let mock = MockTransport::new();
        mock.push_xml(&wrap(
            "CreateLoadBalancerResponse",
            "<CreateLoadBalancerResult><DNSName>web-1.us-east-1.elb.amazonaws.com</DNSName></CreateLoadBalancerResult>",
        ))
        .await;

        let listeners = [Listener::http(80, 8080).unwrap(), Listener::tcp(443, 443).unwrap()];
        let dns = client(&mock)
            .create_load_balancer("web", &["us-east-1a", "us-east-1c"], &listeners)
            .await
            .unwrap();
        assert_eq!(dns, "web-1.us-east-1.elb.amazonaws.com");

        let form = mock.last_request().await.unwrap().form_params();
        assert_eq!(form["Action"], "CreateLoadBalancer");
        assert_eq!(form["LoadBalancerName"], "web");
        assert_eq!(form["AvailabilityZones.member.1"], "us-east-1a");
        assert_eq!(form["AvailabilityZones.member.2"], "us-east-1c");
        assert_eq!(form["Listeners.member.1.Protocol"], "HTTP");
        assert_eq!(form["Listeners.member.1.InstancePort"], "8080");
        assert_eq!(form["Listeners.member.2.Protocol"], "TCP");
        assert_eq!(form["Listeners.member.2.LoadBalancerPort"], "443");
    }

    #[tokio::test]
    async fn instance_ids_are_trimmed_before_sending() {
        let mock = MockTransport::new();
        mock.push_xml(&wrap(
            "DeregisterInstancesFromLoadBalancerResponse",
            "<DeregisterInstancesFromLoadBalancerResult><Instances/></DeregisterInstancesFromLoadBalancerResult>",
        ))
        .await;

        let remaining = client(&mock)
            .deregister_instances("lb", &["  i-a2b10ed5  "])
            .await
            .unwrap();
        assert!(remaining.is_empty());

        let form = mock.last_request().await.unwrap().form_params();
        assert_eq!(form["Instances.member.1.InstanceId"], "i-a2b10ed5");
    }

    #[tokio::test]
    async fn health_check_params_and_echo() {
        let mock = MockTransport::new();
        mock.push_xml(&wrap(
            "ConfigureHealthCheckResponse",
            "<ConfigureHealthCheckResult><HealthCheck><Interval>30</Interval><Target>HTTP:8080/ping</Target>\
             <HealthyThreshold>10</HealthyThreshold><Timeout>5</Timeout><UnhealthyThreshold>2</UnhealthyThreshold>\
             </HealthCheck></ConfigureHealthCheckResult>",
        ))
        .await;

        let check = HealthCheck::new("HTTP:8080/ping", 30, 5, 2, 10);
        let echoed = client(&mock).configure_health_check("lb", &check).await.unwrap();
        assert_eq!(echoed, check);

        let form = mock.last_request().await.unwrap().form_params();
        assert_eq!(form["HealthCheck.Target"], "HTTP:8080/ping");
        assert_eq!(form["HealthCheck.Interval"], "30");
        assert_eq!(form["HealthCheck.Timeout"], "5");
        assert_eq!(form["HealthCheck.UnhealthyThreshold"], "2");
        assert_eq!(form["HealthCheck.HealthyThreshold"], "10");
    }

    #[tokio::test]
    async fn wrong_response_type_is_rejected() {
        let mock = MockTransport::new();
        // No request-id header, so the id comes from the body.
        mock.push_response(HttpResponse::new(
            200,
            &wrap("DeleteLoadBalancerResponse", "<DeleteLoadBalancerResult/>"),
        ))
        .await;

        let err = client(&mock)
            .enable_availability_zones("lb", &["us-east-1a"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ElbErrorKind::UnexpectedResponse);
        assert_eq!(
            err.message,
            "Unexpected response type: expected 'EnableAvailabilityZonesForLoadBalancerResponse', got 'DeleteLoadBalancerResponse'"
        );
        assert_eq!(err.request_id.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn describe_rejects_bad_listener_ports() {
        let mock = MockTransport::new();
        mock.push_xml(&wrap(
            "DescribeLoadBalancersResponse",
            "<DescribeLoadBalancersResult><LoadBalancerDescriptions><member>\
             <LoadBalancerName>lb</LoadBalancerName>\
             <ListenerDescriptions><member><Listener><Protocol>HTTP</Protocol>\
             <LoadBalancerPort>0</LoadBalancerPort><InstancePort>80</InstancePort></Listener></member></ListenerDescriptions>\
             </member></LoadBalancerDescriptions></DescribeLoadBalancersResult>",
        ))
        .await;

        let err = client(&mock).describe_all_load_balancers().await.unwrap_err();
        assert_eq!(err.kind, ElbErrorKind::Parse);
    }

    #[test]
    fn numbers_default_when_absent() {
        assert_eq!(parse_number::<u32>("", "Interval").unwrap(), 0);
        assert_eq!(parse_number::<u32>(" 30 ", "Interval").unwrap(), 30);
        assert!(parse_number::<u32>("thirty", "Interval").is_err());
    }
}
