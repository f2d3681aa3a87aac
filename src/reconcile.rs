use crate::api::{DeleteOutcome, PipelineApi};
use crate::error::{Error, Result};
use crate::events::{Event, Observer, ResourceKind, TracingObserver};
use crate::kubeconfig::{self, Encoding};
use crate::models::{ClusterSpec, DeploymentSpec, DesiredState, OrgId};
use crate::probe::Readiness;
use crate::report::{Action, RunReport};
use crate::waiter::Waiter;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const DEFAULT_RESOURCE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Settings {
    pub repo_owner: String,
    pub org_id: Option<OrgId>,
    pub workspace: PathBuf,
    /// Budget for the whole run, shared by every wait.
    pub resource_timeout: Duration,
    pub kubeconfig_encoding: Encoding,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            repo_owner: String::new(),
            org_id: None,
            workspace: PathBuf::new(),
            resource_timeout: DEFAULT_RESOURCE_TIMEOUT,
            kubeconfig_encoding: Encoding::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Proceed,
    Stop,
}

/// A remote resource with a desired state: something that can be probed,
/// created and deleted.
trait ManagedResource {
    fn kind(&self) -> ResourceKind;
    fn name(&self) -> &str;
    fn readiness(&self, api: &PipelineApi, org: OrgId) -> Result<Readiness>;
    fn create(&self, api: &PipelineApi, org: OrgId) -> Result<()>;
    fn delete(&self, api: &PipelineApi, org: OrgId) -> Result<DeleteOutcome>;
}

struct ClusterResource<'a> {
    spec: &'a ClusterSpec,
}

impl ManagedResource for ClusterResource<'_> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Cluster
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn readiness(&self, api: &PipelineApi, org: OrgId) -> Result<Readiness> {
        api.cluster_readiness(org, &self.spec.name)
    }

    fn create(&self, api: &PipelineApi, org: OrgId) -> Result<()> {
        api.create_cluster(org, self.spec)
    }

    fn delete(&self, api: &PipelineApi, org: OrgId) -> Result<DeleteOutcome> {
        api.delete_cluster(org, &self.spec.name)
    }
}

struct DeploymentResource<'a> {
    cluster: &'a str,
    spec: &'a DeploymentSpec,
}

impl ManagedResource for DeploymentResource<'_> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Deployment
    }

    fn name(&self) -> &str {
        &self.spec.release_name
    }

    fn readiness(&self, api: &PipelineApi, org: OrgId) -> Result<Readiness> {
        api.deployment_readiness(org, self.cluster, &self.spec.release_name)
    }

    fn create(&self, api: &PipelineApi, org: OrgId) -> Result<()> {
        api.install_deployment(org, self.cluster, self.spec)
    }

    fn delete(&self, api: &PipelineApi, org: OrgId) -> Result<DeleteOutcome> {
        api.delete_deployment(org, self.cluster, &self.spec.release_name)
    }
}

pub struct Plugin {
    api: PipelineApi,
    observer: Box<dyn Observer>,
    waiter: Waiter,
    cluster: ClusterSpec,
    deployment: DeploymentSpec,
    settings: Settings,
    org_id: Option<OrgId>,
}

impl Plugin {
    pub fn new(
        api: PipelineApi,
        cluster: ClusterSpec,
        deployment: DeploymentSpec,
        settings: Settings,
    ) -> Self {
        Plugin {
            api,
            observer: Box::new(TracingObserver),
            waiter: Waiter::default(),
            cluster,
            deployment,
            org_id: settings.org_id,
            settings,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_waiter(mut self, waiter: Waiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn exec(&mut self) -> Result<RunReport> {
        self.validate()?;
        let deadline = Instant::now()
            .checked_add(self.settings.resource_timeout)
            .ok_or_else(|| {
                Error::validation(format!(
                    "resource timeout of {}s is too large",
                    self.settings.resource_timeout.as_secs()
                ))
            })?;
        let org = self.org_id()?;
        let mut report = RunReport::default();

        let cluster = ClusterResource {
            spec: &self.cluster,
        };
        let (step, action) = self.reconcile(&cluster, &self.cluster.state, org, deadline)?;
        report.record(
            ResourceKind::Cluster,
            &self.cluster.name,
            &self.cluster.state,
            action,
        );
        if step == Step::Stop {
            return Ok(report);
        }

        report.kubeconfig = Some(self.dump_kubeconfig(org)?);

        let helm = format!("helm on cluster {}", self.cluster.name);
        let attempts = self.waiter.wait_for(&helm, deadline, || {
            let readiness = self.api.helm_readiness(org, &self.cluster.name)?;
            self.observer.notify(&Event::Probed {
                kind: ResourceKind::Helm,
                name: self.cluster.name.clone(),
                readiness,
            });
            Ok(readiness)
        })?;
        self.observer.notify(&Event::Ready {
            kind: ResourceKind::Helm,
            name: self.cluster.name.clone(),
            attempts,
        });
        let helm_action = if attempts > 1 {
            Action::Awaited
        } else {
            Action::AlreadyPresent
        };
        report.record(ResourceKind::Helm, &self.cluster.name, "ready", helm_action);

        if self.deployment.name.is_empty() {
            self.observer.notify(&Event::DeploymentSkipped);
            return Ok(report);
        }

        let deployment = DeploymentResource {
            cluster: &self.cluster.name,
            spec: &self.deployment,
        };
        let (_, action) = self.reconcile(&deployment, &self.deployment.state, org, deadline)?;
        report.record(
            ResourceKind::Deployment,
            &self.deployment.release_name,
            &self.deployment.state,
            action,
        );

        Ok(report)
    }

    /// Resolves the organization owning the repository, once per run.
    pub fn org_id(&mut self) -> Result<OrgId> {
        if let Some(id) = self.org_id {
            self.observer
                .notify(&Event::OrganizationResolved { id, cached: true });
            return Ok(id);
        }

        let owner = &self.settings.repo_owner;
        let id = self
            .api
            .list_organizations()?
            .into_iter()
            .find(|org| &org.name == owner)
            .map(|org| org.id)
            .ok_or_else(|| {
                Error::IdentityResolution(format!(
                    "no organization found for repository owner {:?}",
                    owner
                ))
            })?;

        self.org_id = Some(id);
        self.observer
            .notify(&Event::OrganizationResolved { id, cached: false });
        Ok(id)
    }

    fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.cluster.name.trim().is_empty() {
            problems.push("cluster name is required");
        }
        if self.cluster.location.trim().is_empty() {
            problems.push("cluster location is required");
        }
        if self.cluster.state == DesiredState::Created
            && self.settings.workspace.as_os_str().is_empty()
        {
            problems.push("workspace path is required to write the kubeconfig");
        }
        if !self.deployment.name.is_empty() && self.deployment.release_name.trim().is_empty() {
            problems.push("deployment release name is required when a deployment is named");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(problems.join("; ")))
        }
    }

    fn reconcile(
        &self,
        resource: &dyn ManagedResource,
        desired: &DesiredState,
        org: OrgId,
        deadline: Instant,
    ) -> Result<(Step, Action)> {
        self.observer.notify(&Event::Desired {
            kind: resource.kind(),
            name: resource.name().to_string(),
            state: desired.clone(),
        });

        if let DesiredState::Unrecognized(state) = desired {
            self.observer.notify(&Event::UnrecognizedState {
                kind: resource.kind(),
                name: resource.name().to_string(),
                state: state.clone(),
            });
            return Ok((Step::Stop, Action::Ignored));
        }

        let observed = self.observe(resource, org)?;
        match (desired, observed) {
            (DesiredState::Created, Readiness::Ready) => Ok((Step::Proceed, Action::AlreadyPresent)),
            (DesiredState::Created, Readiness::Absent) => {
                resource.create(&self.api, org)?;
                self.observer.notify(&Event::CreateRequested {
                    kind: resource.kind(),
                    name: resource.name().to_string(),
                });
                self.await_ready(resource, org, deadline)?;
                Ok((Step::Proceed, Action::Created))
            }
            (DesiredState::Created, Readiness::Pending) => {
                self.await_ready(resource, org, deadline)?;
                Ok((Step::Proceed, Action::Awaited))
            }
            (DesiredState::Deleted, Readiness::Absent) => Ok((Step::Stop, Action::AlreadyAbsent)),
            (DesiredState::Deleted, _) => {
                let outcome = resource.delete(&self.api, org)?;
                let already_absent = outcome == DeleteOutcome::AlreadyAbsent;
                self.observer.notify(&Event::DeleteRequested {
                    kind: resource.kind(),
                    name: resource.name().to_string(),
                    already_absent,
                });
                let action = if already_absent {
                    Action::AlreadyAbsent
                } else {
                    Action::DeleteRequested
                };
                Ok((Step::Stop, action))
            }
            (DesiredState::Unrecognized(_), _) => Ok((Step::Stop, Action::Ignored)),
        }
    }

    fn observe(&self, resource: &dyn ManagedResource, org: OrgId) -> Result<Readiness> {
        let readiness = resource.readiness(&self.api, org)?;
        self.observer.notify(&Event::Probed {
            kind: resource.kind(),
            name: resource.name().to_string(),
            readiness,
        });
        Ok(readiness)
    }

    fn await_ready(&self, resource: &dyn ManagedResource, org: OrgId, deadline: Instant) -> Result<()> {
        let description = format!("{} {}", resource.kind(), resource.name());
        let attempts = self
            .waiter
            .wait_for(&description, deadline, || self.observe(resource, org))?;
        self.observer.notify(&Event::Ready {
            kind: resource.kind(),
            name: resource.name().to_string(),
            attempts,
        });
        Ok(())
    }

    fn dump_kubeconfig(&self, org: OrgId) -> Result<PathBuf> {
        let config = self.api.cluster_config(org, &self.cluster.name)?;
        let path = kubeconfig::write_kubeconfig(
            &self.settings.workspace,
            &config.data,
            self.settings.kubeconfig_encoding,
        )?;
        self.observer
            .notify(&Event::KubeconfigWritten { path: path.clone() });
        Ok(path)
    }
}
