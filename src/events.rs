use crate::models::{DesiredState, OrgId};
use crate::probe::Readiness;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cluster,
    Helm,
    Deployment,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cluster => write!(f, "cluster"),
            ResourceKind::Helm => write!(f, "helm"),
            ResourceKind::Deployment => write!(f, "deployment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Desired {
        kind: ResourceKind,
        name: String,
        state: DesiredState,
    },
    OrganizationResolved {
        id: OrgId,
        cached: bool,
    },
    Probed {
        kind: ResourceKind,
        name: String,
        readiness: Readiness,
    },
    CreateRequested {
        kind: ResourceKind,
        name: String,
    },
    DeleteRequested {
        kind: ResourceKind,
        name: String,
        already_absent: bool,
    },
    Ready {
        kind: ResourceKind,
        name: String,
        attempts: u32,
    },
    KubeconfigWritten {
        path: PathBuf,
    },
    UnrecognizedState {
        kind: ResourceKind,
        name: String,
        state: String,
    },
    DeploymentSkipped,
}

/// Receives reconciliation progress. The orchestrator is handed one instead of
/// logging through process-wide state.
pub trait Observer {
    fn notify(&self, event: &Event);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn notify(&self, event: &Event) {
        match event {
            Event::Desired { kind, name, state } => {
                info!(%kind, name = %name, %state, "desired state")
            }
            Event::OrganizationResolved { id, cached } => {
                debug!(org_id = id, cached, "organization resolved")
            }
            Event::Probed {
                kind,
                name,
                readiness,
            } => debug!(%kind, name = %name, %readiness, "probed"),
            Event::CreateRequested { kind, name } => {
                info!(%kind, name = %name, "creation requested")
            }
            Event::DeleteRequested {
                kind,
                name,
                already_absent: false,
            } => info!(%kind, name = %name, "deletion requested"),
            Event::DeleteRequested {
                kind,
                name,
                already_absent: true,
            } => info!(%kind, name = %name, "already gone, nothing to do"),
            Event::Ready {
                kind,
                name,
                attempts,
            } => info!(%kind, name = %name, attempts, "ready"),
            Event::KubeconfigWritten { path } => {
                debug!("export KUBECONFIG={}", path.display());
                info!("wrote .kube/config to workspace");
            }
            Event::UnrecognizedState { kind, name, state } => {
                warn!(%kind, name = %name, state = %state, "unrecognized desired state, nothing to do")
            }
            Event::DeploymentSkipped => debug!("no deployment configured"),
        }
    }
}
