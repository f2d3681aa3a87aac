use crate::client::{ApiResponse, Transport};
use crate::error::{Error, Result};
use crate::models::{ClusterSpec, ConfigResponse, DeploymentSpec, OrgId, Organization};
use crate::probe::{self, ProbePolicy, Readiness};
use reqwest::Method;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Accepted,
    AlreadyAbsent,
}

pub struct PipelineApi {
    transport: Box<dyn Transport>,
    endpoint: Url,
    policy: ProbePolicy,
}

impl PipelineApi {
    pub fn new(transport: Box<dyn Transport>, endpoint: &str, policy: ProbePolicy) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        Ok(PipelineApi {
            transport,
            endpoint,
            policy,
        })
    }

    fn url(&self, segments: &[&str], by_name: bool) -> String {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if by_name {
            url.set_query(Some("field=name"));
        }
        url.to_string()
    }

    fn cluster_url(&self, org: OrgId, cluster: &str, rest: &[&str]) -> String {
        let org = org.to_string();
        let mut segments = vec!["orgs", org.as_str(), "clusters", cluster];
        segments.extend_from_slice(rest);
        self.url(&segments, true)
    }

    fn probe(&self, name: &str, url: &str) -> Result<Readiness> {
        let response = self.transport.call(Method::HEAD, url, None)?;
        probe::classify(name, &response, self.policy)
    }

    pub fn list_organizations(&self) -> Result<Vec<Organization>> {
        let url = self.url(&["orgs"], true);
        let response = self.transport.call(Method::GET, &url, None)?;
        if response.status != 200 {
            return Err(Error::IdentityResolution(format!(
                "could not retrieve organizations. status: [ {} ]",
                response.status_line()
            )));
        }
        serde_json::from_str(&response.body).map_err(|e| {
            Error::IdentityResolution(format!(
                "could not parse orgs response [ {} ]: {}",
                response.body, e
            ))
        })
    }

    pub fn cluster_readiness(&self, org: OrgId, cluster: &str) -> Result<Readiness> {
        self.probe("cluster probe", &self.cluster_url(org, cluster, &[]))
    }

    pub fn helm_readiness(&self, org: OrgId, cluster: &str) -> Result<Readiness> {
        self.probe("helm probe", &self.cluster_url(org, cluster, &["deployments"]))
    }

    pub fn deployment_readiness(&self, org: OrgId, cluster: &str, release: &str) -> Result<Readiness> {
        self.probe(
            "deployment probe",
            &self.cluster_url(org, cluster, &["deployments", release]),
        )
    }

    pub fn create_cluster(&self, org: OrgId, cluster: &ClusterSpec) -> Result<()> {
        let org = org.to_string();
        let url = self.url(&["orgs", org.as_str(), "clusters"], false);
        let body = serde_json::to_string(&cluster.create_request())?;
        let response = self.transport.call(Method::POST, &url, Some(body))?;
        match response.status {
            200 | 202 => Ok(()),
            400 => Err(Error::Rejected {
                operation: "create cluster".to_string(),
                message: rejection_message(&response),
            }),
            status => Err(Error::unexpected("create cluster", status, response.body)),
        }
    }

    pub fn delete_cluster(&self, org: OrgId, cluster: &str) -> Result<DeleteOutcome> {
        let url = self.cluster_url(org, cluster, &[]);
        let response = self.transport.call(Method::DELETE, &url, None)?;
        match response.status {
            202 => Ok(DeleteOutcome::Accepted),
            404 => Ok(DeleteOutcome::AlreadyAbsent),
            status => Err(Error::unexpected("delete cluster", status, response.body)),
        }
    }

    pub fn cluster_config(&self, org: OrgId, cluster: &str) -> Result<ConfigResponse> {
        let url = self.cluster_url(org, cluster, &["config"]);
        let response = self.transport.call(Method::GET, &url, None)?;
        if response.status != 200 {
            return Err(Error::unexpected(
                "fetch cluster config",
                response.status,
                response.body,
            ));
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    pub fn install_deployment(&self, org: OrgId, cluster: &str, deployment: &DeploymentSpec) -> Result<()> {
        let url = self.cluster_url(org, cluster, &["deployments"]);
        let body = serde_json::to_string(&deployment.install_request())?;
        let response = self.transport.call(Method::POST, &url, Some(body))?;
        match response.status {
            201 => Ok(()),
            status => Err(Error::unexpected("install deployment", status, response.body)),
        }
    }

    pub fn delete_deployment(&self, org: OrgId, cluster: &str, release: &str) -> Result<DeleteOutcome> {
        let url = self.cluster_url(org, cluster, &["deployments", release]);
        let response = self.transport.call(Method::DELETE, &url, None)?;
        match response.status {
            200 => Ok(DeleteOutcome::Accepted),
            404 => Ok(DeleteOutcome::AlreadyAbsent),
            status => Err(Error::unexpected("delete deployment", status, response.body)),
        }
    }
}

pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::validation(format!("invalid endpoint {:?}: {}", endpoint, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::validation(format!(
            "endpoint must start with http:// or https://, got {:?}",
            endpoint
        )));
    }
    Ok(url)
}

fn rejection_message(response: &ApiResponse) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });
    match from_json {
        Some(message) => message,
        None if !response.body.trim().is_empty() => response.body.trim().to_string(),
        None => "cluster name already exists".to_string(),
    }
}
