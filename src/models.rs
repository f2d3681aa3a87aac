use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type OrgId = u64;

pub const DEFAULT_NODE_POOL: &str = "default-node-pool";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DesiredState {
    #[default]
    Created,
    Deleted,
    Unrecognized(String),
}

impl DesiredState {
    pub fn parse(value: &str) -> Self {
        match value {
            "created" => DesiredState::Created,
            "deleted" => DesiredState::Deleted,
            other => DesiredState::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Created => write!(f, "created"),
            DesiredState::Deleted => write!(f, "deleted"),
            DesiredState::Unrecognized(other) => write!(f, "{}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSpec {
    pub name: String,
    pub location: String,
    pub secret_id: String,
    pub profile_name: Option<String>,
    pub provider: ProviderSpec,
    pub state: DesiredState,
}

impl ClusterSpec {
    pub fn create_request(&self) -> CreateClusterRequest<'_> {
        CreateClusterRequest {
            name: &self.name,
            location: &self.location,
            cloud: self.provider.cloud(),
            secret_id: &self.secret_id,
            profile_name: self.profile_name.as_deref(),
            properties: &self.provider,
        }
    }
}

/// Body of the create-cluster call. The provider payload is nested under its
/// own name inside `properties`, next to a matching `cloud` discriminator.
#[derive(Debug, Serialize)]
pub struct CreateClusterRequest<'a> {
    pub name: &'a str,
    pub location: &'a str,
    pub cloud: &'static str,
    #[serde(rename = "secretId")]
    pub secret_id: &'a str,
    #[serde(rename = "profileName", skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<&'a str>,
    pub properties: &'a ProviderSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSpec {
    Amazon(AmazonSpec),
    Azure(AzureSpec),
    Google(GoogleSpec),
}

impl ProviderSpec {
    pub fn cloud(&self) -> &'static str {
        match self {
            ProviderSpec::Amazon(_) => "amazon",
            ProviderSpec::Azure(_) => "azure",
            ProviderSpec::Google(_) => "google",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AmazonSpec {
    #[serde(rename = "nodePools")]
    pub node_pools: BTreeMap<String, AmazonNodePool>,
    pub master: AmazonMaster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AmazonNodePool {
    #[serde(rename = "instanceType")]
    pub instance_type: String,
    #[serde(rename = "spotPrice")]
    pub spot_price: String,
    #[serde(rename = "minCount")]
    pub min_count: u32,
    #[serde(rename = "maxCount")]
    pub max_count: u32,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AmazonMaster {
    #[serde(rename = "instanceType")]
    pub instance_type: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AzureSpec {
    #[serde(rename = "resourceGroup")]
    pub resource_group: String,
    #[serde(rename = "kubernetesVersion")]
    pub kubernetes_version: String,
    #[serde(rename = "nodePools")]
    pub node_pools: BTreeMap<String, AzureNodePool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AzureNodePool {
    pub count: u32,
    #[serde(rename = "nodeInstanceType")]
    pub instance_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GoogleSpec {
    pub project: String,
    #[serde(rename = "nodeVersion")]
    pub node_version: String,
    #[serde(rename = "nodePools")]
    pub node_pools: BTreeMap<String, GoogleNodePool>,
    pub master: GoogleMaster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GoogleNodePool {
    pub count: u32,
    #[serde(rename = "nodeInstanceType")]
    pub instance_type: String,
    #[serde(rename = "serviceAccount", skip_serializing_if = "String::is_empty")]
    pub service_account: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GoogleMaster {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeploymentSpec {
    pub name: String,
    pub release_name: String,
    pub state: DesiredState,
    pub values: serde_json::Value,
}

impl DeploymentSpec {
    pub fn install_request(&self) -> InstallDeploymentRequest<'_> {
        InstallDeploymentRequest {
            name: &self.name,
            release_name: &self.release_name,
            values: &self.values,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InstallDeploymentRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "releasename")]
    pub release_name: &'a str,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub values: &'a serde_json::Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConfigResponse {
    #[serde(default)]
    pub status: i64,
    #[serde(rename = "data", default)]
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn amazon_cluster() -> ClusterSpec {
        ClusterSpec {
            name: "demo".to_string(),
            location: "eu-west-1".to_string(),
            secret_id: "s3cr3t".to_string(),
            profile_name: None,
            provider: ProviderSpec::Amazon(AmazonSpec {
                node_pools: BTreeMap::from([(
                    DEFAULT_NODE_POOL.to_string(),
                    AmazonNodePool {
                        instance_type: "m4.xlarge".to_string(),
                        spot_price: "0.2".to_string(),
                        min_count: 1,
                        max_count: 2,
                        image: "ami-16bfeb6f".to_string(),
                    },
                )]),
                master: AmazonMaster {
                    instance_type: "m4.xlarge".to_string(),
                    image: "ami-16bfeb6f".to_string(),
                },
            }),
            state: DesiredState::Created,
        }
    }

    #[test]
    fn desired_state_parses_known_values_and_keeps_unknown_ones() {
        assert_eq!(DesiredState::parse("created"), DesiredState::Created);
        assert_eq!(DesiredState::parse("deleted"), DesiredState::Deleted);
        assert_eq!(
            DesiredState::parse("Created"),
            DesiredState::Unrecognized("Created".to_string())
        );
        assert_eq!(DesiredState::parse("paused").to_string(), "paused");
    }

    #[test]
    fn create_request_nests_provider_payload_under_its_cloud_name() {
        // Arrange
        let cluster = amazon_cluster();

        // Act
        let body = serde_json::to_value(cluster.create_request()).unwrap();

        // Assert
        assert_eq!(body["cloud"], "amazon");
        assert_eq!(body["secretId"], "s3cr3t");
        assert!(body.get("profileName").is_none());
        let pool = &body["properties"]["amazon"]["nodePools"][DEFAULT_NODE_POOL];
        assert_eq!(pool["instanceType"], "m4.xlarge");
        assert_eq!(pool["maxCount"], 2);
        assert_eq!(body["properties"]["amazon"]["master"]["image"], "ami-16bfeb6f");
        assert_eq!(body["properties"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn create_request_carries_profile_name_when_set() {
        let mut cluster = amazon_cluster();
        cluster.profile_name = Some("small".to_string());

        let body = serde_json::to_value(cluster.create_request()).unwrap();

        assert_eq!(body["profileName"], "small");
    }

    #[test]
    fn google_pool_omits_empty_service_account() {
        let spec = ProviderSpec::Google(GoogleSpec {
            project: "proj".to_string(),
            node_version: "1.9.4-gke.1".to_string(),
            node_pools: BTreeMap::from([(
                DEFAULT_NODE_POOL.to_string(),
                GoogleNodePool {
                    count: 1,
                    instance_type: "n1-standard-4".to_string(),
                    service_account: String::new(),
                },
            )]),
            master: GoogleMaster {
                version: "1.9.4-gke.1".to_string(),
            },
        });

        let body = serde_json::to_value(&spec).unwrap();

        let pool = &body["google"]["nodePools"][DEFAULT_NODE_POOL];
        assert!(pool.get("serviceAccount").is_none());
        assert_eq!(pool["nodeInstanceType"], "n1-standard-4");
    }

    #[test]
    fn install_request_uses_releasename_key() {
        let deployment = DeploymentSpec {
            name: "stable/nginx".to_string(),
            release_name: "web".to_string(),
            state: DesiredState::Created,
            values: json!({"replicas": 2}),
        };

        let body = serde_json::to_value(deployment.install_request()).unwrap();

        assert_eq!(
            body,
            json!({"name": "stable/nginx", "releasename": "web", "values": {"replicas": 2}})
        );
    }

    #[test]
    fn organizations_ignore_unknown_fields() {
        let orgs: Vec<Organization> = serde_json::from_str(
            r#"[{"id":1,"createdAt":"2018-04-11T13:58:55Z","name":"org1"},{"id":2,"githubId":32848483,"name":"org2"}]"#,
        )
        .unwrap();

        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[1].id, 2);
        assert_eq!(orgs[1].name, "org2");
    }
}
