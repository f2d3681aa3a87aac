use crate::client::Credentials;
use crate::error::{Error, Result};
use crate::kubeconfig::Encoding;
use crate::models::{
    AmazonMaster, AmazonNodePool, AmazonSpec, AzureNodePool, AzureSpec, ClusterSpec,
    DeploymentSpec, DesiredState, GoogleMaster, GoogleNodePool, GoogleSpec, OrgId, ProviderSpec,
    DEFAULT_NODE_POOL,
};
use crate::probe::ProbePolicy;
use crate::reconcile::Settings;
use crate::values;
use crate::waiter::Waiter;
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_AMAZON_IMAGE: &str = "ami-16bfeb6f";
// spot price for the default region/instance type
const DEFAULT_AMAZON_SPOT_PRICE: &str = "0.2";

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    Amazon,
    Azure,
    Google,
}

impl Provider {
    pub fn default_instance_type(self) -> &'static str {
        match self {
            Provider::Amazon => "m4.xlarge",     // 4 vCPU, 16 GB RAM, general purpose
            Provider::Azure => "Standard_B4ms",  // 4 vCPU, 16 GB RAM, burstable
            Provider::Google => "n1-standard-4", // 4 vCPU, 15 GB RAM, standard
        }
    }

    pub fn default_location(self) -> &'static str {
        match self {
            Provider::Amazon => "eu-west-1",
            Provider::Azure => "eastus",
            Provider::Google => "us-central1-a",
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Pipeline step driving a cluster and its deployment to the desired state.
#[derive(Parser, Debug)]
#[command(name = "pipeline-step", version)]
pub struct Cli {
    /// Repository owner; names the organization clusters live under
    #[arg(long, env = "DRONE_REPO_OWNER", default_value = "")]
    pub repo_owner: String,

    /// Organization id; skips the lookup by repository owner
    #[arg(long, env = "PLUGIN_ORG_ID")]
    pub org_id: Option<OrgId>,

    /// Workspace dir, the kubeconfig is written to <workspace>/.kube/config
    #[arg(long, env = "PLUGIN_PATH")]
    pub workspace: Option<PathBuf>,

    #[arg(long = "drone-workspace", env = "DRONE_WORKSPACE", hide = true)]
    pub drone_workspace: Option<PathBuf>,

    /// API url
    #[arg(long, env = "PLUGIN_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long = "fallback-endpoint", env = "ENDPOINT", hide = true)]
    pub fallback_endpoint: Option<String>,

    /// API OAuth token
    #[arg(long, env = "PLUGIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long = "fallback-token", env = "TOKEN", hide = true, hide_env_values = true)]
    pub fallback_token: Option<String>,

    /// Basic auth username, used when no token is set
    #[arg(long, env = "PLUGIN_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "PLUGIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Kubernetes cluster name
    #[arg(long, env = "PLUGIN_CLUSTER_NAME", default_value = "")]
    pub cluster_name: String,

    /// Cluster location, defaults per provider
    #[arg(long, env = "PLUGIN_CLUSTER_LOCATION")]
    pub cluster_location: Option<String>,

    /// Desired cluster state (created, deleted)
    #[arg(long, env = "PLUGIN_CLUSTER_STATE", default_value = "created")]
    pub cluster_state: String,

    #[arg(
        long = "cluster-provider",
        env = "PLUGIN_CLUSTER_PROVIDER",
        value_enum,
        default_value_t = Provider::Amazon
    )]
    pub provider: Provider,

    /// Secret holding the cloud credentials
    #[arg(long, env = "PLUGIN_SECRET_ID", default_value = "")]
    pub secret_id: String,

    /// Name of the profile used to create the cluster
    #[arg(long, env = "PLUGIN_PROFILE_NAME")]
    pub profile_name: Option<String>,

    /// Node instance type, defaults per provider
    #[arg(long, env = "PLUGIN_NODE_INSTANCE_TYPE")]
    pub node_instance_type: Option<String>,

    #[arg(long, env = "PLUGIN_AMAZON_NODE_INSTANCE_TYPE", hide = true)]
    pub amazon_node_instance_type: Option<String>,

    #[arg(long, env = "PLUGIN_AZURE_NODE_INSTANCE_TYPE", hide = true)]
    pub azure_node_instance_type: Option<String>,

    #[arg(long, env = "PLUGIN_GOOGLE_INSTANCE_TYPE", hide = true)]
    pub google_instance_type: Option<String>,

    #[arg(long, env = "PLUGIN_AMAZON_NODE_IMAGE", default_value = DEFAULT_AMAZON_IMAGE)]
    pub amazon_node_image: String,

    #[arg(long, env = "PLUGIN_AMAZON_NODE_MIN_COUNT", default_value_t = 1)]
    pub amazon_node_min_count: u32,

    #[arg(long, env = "PLUGIN_AMAZON_NODE_MAX_COUNT", default_value_t = 1)]
    pub amazon_node_max_count: u32,

    #[arg(long, env = "PLUGIN_AMAZON_NODE_SPOT_PRICE", default_value = DEFAULT_AMAZON_SPOT_PRICE)]
    pub amazon_node_spot_price: String,

    #[arg(long, env = "PLUGIN_AMAZON_MASTER_IMAGE", default_value = DEFAULT_AMAZON_IMAGE)]
    pub amazon_master_image: String,

    #[arg(long, env = "PLUGIN_AMAZON_MASTER_INSTANCE_TYPE")]
    pub amazon_master_instance_type: Option<String>,

    #[arg(long, env = "PLUGIN_AZURE_RESOURCE_GROUP", default_value = "")]
    pub azure_resource_group: String,

    #[arg(long, env = "PLUGIN_AZURE_NODE_COUNT", default_value_t = 1)]
    pub azure_node_count: u32,

    #[arg(long, env = "PLUGIN_AZURE_KUBERNETES_VERSION", default_value = "1.9.2")]
    pub azure_kubernetes_version: String,

    #[arg(long, env = "PLUGIN_GOOGLE_PROJECT", default_value = "")]
    pub google_project: String,

    #[arg(long, env = "PLUGIN_GOOGLE_GKE_VERSION", default_value = "1.9.4-gke.1")]
    pub google_gke_version: String,

    #[arg(long, env = "PLUGIN_GOOGLE_NODE_COUNT", default_value_t = 1)]
    pub google_node_count: u32,

    /// Service account the cluster instances run as
    #[arg(long, env = "PLUGIN_GOOGLE_SERVICE_ACCOUNT")]
    pub google_service_account: Option<String>,

    /// Chart to deploy; no deployment is reconciled when empty
    #[arg(long, env = "PLUGIN_DEPLOYMENT_NAME", default_value = "")]
    pub deployment_name: String,

    #[arg(long, env = "PLUGIN_DEPLOYMENT_RELEASE_NAME", default_value = "")]
    pub deployment_release_name: String,

    /// Desired deployment state (created, deleted)
    #[arg(long, env = "PLUGIN_DEPLOYMENT_STATE", default_value = "created")]
    pub deployment_state: String,

    /// Deployment values as JSON; `{{ .PLUGIN_X }}` placeholders are filled from the environment
    #[arg(long, env = "PLUGIN_DEPLOYMENT_VALUES", default_value = "")]
    pub deployment_values: String,

    /// Fail if the whole run takes longer than this many seconds
    #[arg(long, env = "PLUGIN_RESOURCE_TIMEOUT", default_value_t = 2 * 60 * 60)]
    pub resource_timeout: u64,

    /// Seconds between readiness probes
    #[arg(
        long,
        env = "PLUGIN_POLL_INTERVAL",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "PLUGIN_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Treat HTTP 400 from readiness probes as fatal instead of "not ready yet"
    #[arg(long, env = "PLUGIN_STRICT_PROBES")]
    pub strict_probes: bool,

    /// Encoding of the kubeconfig returned by the API
    #[arg(
        long,
        env = "PLUGIN_KUBECONFIG_ENCODING",
        value_enum,
        default_value_t = Encoding::Auto
    )]
    pub kubeconfig_encoding: Encoding,

    /// Log level (debug, info, warn, error)
    #[arg(long, env = "PLUGIN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "PLUGIN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn endpoint(&self) -> Result<&str> {
        non_empty(&self.endpoint)
            .or(non_empty(&self.fallback_endpoint))
            .ok_or_else(|| Error::validation("endpoint is required"))
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            token: non_empty(&self.token)
                .or(non_empty(&self.fallback_token))
                .map(str::to_string),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn probe_policy(&self) -> ProbePolicy {
        if self.strict_probes {
            ProbePolicy::strict()
        } else {
            ProbePolicy::default()
        }
    }

    pub fn waiter(&self) -> Waiter {
        Waiter::new(Duration::from_secs(self.poll_interval))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            repo_owner: self.repo_owner.clone(),
            org_id: self.org_id,
            workspace: self
                .workspace
                .clone()
                .or_else(|| self.drone_workspace.clone())
                .unwrap_or_default(),
            resource_timeout: Duration::from_secs(self.resource_timeout),
            kubeconfig_encoding: self.kubeconfig_encoding,
        }
    }

    fn instance_type(&self) -> String {
        let per_provider = match self.provider {
            Provider::Amazon => &self.amazon_node_instance_type,
            Provider::Azure => &self.azure_node_instance_type,
            Provider::Google => &self.google_instance_type,
        };
        non_empty(&self.node_instance_type)
            .or(non_empty(per_provider))
            .unwrap_or(self.provider.default_instance_type())
            .to_string()
    }

    pub fn provider_spec(&self) -> ProviderSpec {
        match self.provider {
            Provider::Amazon => ProviderSpec::Amazon(AmazonSpec {
                node_pools: BTreeMap::from([(
                    DEFAULT_NODE_POOL.to_string(),
                    AmazonNodePool {
                        instance_type: self.instance_type(),
                        spot_price: self.amazon_node_spot_price.clone(),
                        min_count: self.amazon_node_min_count,
                        max_count: self.amazon_node_max_count,
                        image: self.amazon_node_image.clone(),
                    },
                )]),
                master: AmazonMaster {
                    instance_type: self
                        .amazon_master_instance_type
                        .clone()
                        .unwrap_or_else(|| self.provider.default_instance_type().to_string()),
                    image: self.amazon_master_image.clone(),
                },
            }),
            Provider::Azure => ProviderSpec::Azure(AzureSpec {
                resource_group: self.azure_resource_group.clone(),
                kubernetes_version: self.azure_kubernetes_version.clone(),
                node_pools: BTreeMap::from([(
                    DEFAULT_NODE_POOL.to_string(),
                    AzureNodePool {
                        count: self.azure_node_count,
                        instance_type: self.instance_type(),
                    },
                )]),
            }),
            Provider::Google => ProviderSpec::Google(GoogleSpec {
                project: self.google_project.clone(),
                node_version: self.google_gke_version.clone(),
                node_pools: BTreeMap::from([(
                    DEFAULT_NODE_POOL.to_string(),
                    GoogleNodePool {
                        count: self.google_node_count,
                        instance_type: self.instance_type(),
                        service_account: self.google_service_account.clone().unwrap_or_default(),
                    },
                )]),
                master: GoogleMaster {
                    version: self.google_gke_version.clone(),
                },
            }),
        }
    }

    pub fn cluster_spec(&self) -> ClusterSpec {
        ClusterSpec {
            name: self.cluster_name.clone(),
            location: self
                .cluster_location
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| self.provider.default_location().to_string()),
            secret_id: self.secret_id.clone(),
            profile_name: self.profile_name.clone().filter(|p| !p.is_empty()),
            provider: self.provider_spec(),
            state: DesiredState::parse(&self.cluster_state),
        }
    }

    pub fn deployment_spec(&self, env: &BTreeMap<String, String>) -> Result<DeploymentSpec> {
        Ok(DeploymentSpec {
            name: self.deployment_name.clone(),
            release_name: self.deployment_release_name.clone(),
            state: DesiredState::parse(&self.deployment_state),
            values: values::parse_values(&self.deployment_values, env)?,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// The parsed defaults, built without reading flags or the environment.
#[cfg(test)]
impl Cli {
    pub fn defaults() -> Cli {
        Cli {
            repo_owner: String::new(),
            org_id: None,
            workspace: None,
            drone_workspace: None,
            endpoint: None,
            fallback_endpoint: None,
            token: None,
            fallback_token: None,
            username: None,
            password: None,
            cluster_name: String::new(),
            cluster_location: None,
            cluster_state: "created".to_string(),
            provider: Provider::Amazon,
            secret_id: String::new(),
            profile_name: None,
            node_instance_type: None,
            amazon_node_instance_type: None,
            azure_node_instance_type: None,
            google_instance_type: None,
            amazon_node_image: DEFAULT_AMAZON_IMAGE.to_string(),
            amazon_node_min_count: 1,
            amazon_node_max_count: 1,
            amazon_node_spot_price: DEFAULT_AMAZON_SPOT_PRICE.to_string(),
            amazon_master_image: DEFAULT_AMAZON_IMAGE.to_string(),
            amazon_master_instance_type: None,
            azure_resource_group: String::new(),
            azure_node_count: 1,
            azure_kubernetes_version: "1.9.2".to_string(),
            google_project: String::new(),
            google_gke_version: "1.9.4-gke.1".to_string(),
            google_node_count: 1,
            google_service_account: None,
            deployment_name: String::new(),
            deployment_release_name: String::new(),
            deployment_state: "created".to_string(),
            deployment_values: String::new(),
            resource_timeout: 2 * 60 * 60,
            poll_interval: 5,
            request_timeout: 30,
            strict_probes: false,
            kubeconfig_encoding: Encoding::Auto,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}
