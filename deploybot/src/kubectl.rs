//! The fixed set of kubectl command lines the bot issues.

use std::fmt;
use std::path::Path;

/// Workload kinds that can carry the image being deployed, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl WorkloadKind {
    pub const PROBE_ORDER: [WorkloadKind; 2] = [WorkloadKind::Deployment, WorkloadKind::StatefulSet];
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadKind::Deployment => write!(f, "deployment"),
            WorkloadKind::StatefulSet => write!(f, "statefulset"),
        }
    }
}

/// Builds kubectl command lines against a configurable binary.
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: String,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl Kubectl {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn set_image(&self, kind: WorkloadKind, app: &str, container: &str, image: &str) -> String {
        format!("{} set image {kind} {app} {container}={image}", self.binary)
    }

    pub fn get_pods(&self, app: &str) -> String {
        format!("{} get pods --selector=app={app}", self.binary)
    }

    pub fn get_statefulset_yaml(&self, app: &str) -> String {
        format!("{} get statefulsets.apps {app} -o=yaml", self.binary)
    }

    pub fn delete_file(&self, path: &Path) -> String {
        format!("{} delete -f {}", self.binary, path.display())
    }

    pub fn delete_pvcs(&self, app: &str) -> String {
        format!("{} delete pvc -l app={app}", self.binary)
    }

    pub fn apply_file(&self, path: &Path) -> String {
        format!("{} apply -f {}", self.binary, path.display())
    }
}

/// True once `kubectl get pods` lists at least one pod and every pod is
/// `Running` with all of its containers ready.
pub fn pods_ready(output: &str) -> bool {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return false;
    };
    let columns: Vec<&str> = header.split_whitespace().collect();
    let (Some(ready_col), Some(status_col)) = (
        columns.iter().position(|c| *c == "READY"),
        columns.iter().position(|c| *c == "STATUS"),
    ) else {
        return false;
    };

    let mut seen = 0;
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (Some(ready), Some(status)) = (fields.get(ready_col), fields.get(status_col)) else {
            return false;
        };
        let Some((up, total)) = ready.split_once('/') else {
            return false;
        };
        if *status != "Running" || up != total {
            return false;
        }
        seen += 1;
    }
    seen > 0
}
