//! Cluster gate for bots that share a channel across several clusters.
//!
//! Each bot owns one cluster. A command must name that cluster as its first
//! argument before anything else is interpreted.

use crate::config::ConfigError;
use crate::output;

/// Cluster identifiers end with this suffix.
pub const CLUSTER_SUFFIX: &str = "net";

/// Shortest accepted cluster identifier (one character plus the suffix).
pub const MIN_CLUSTER_NAME_LEN: usize = CLUSTER_SUFFIX.len() + 1;

/// Outcome of checking an invocation against the gate.
#[derive(Debug, PartialEq, Eq)]
pub enum GateDecision<'a> {
    /// Addressed to this cluster; carries the arguments after the cluster name.
    Proceed(&'a [String]),
    /// Addressed to a different cluster, whose bot will answer.
    Ignore,
    /// No cluster named; reply with a usage notice.
    Notice(String),
}

#[derive(Debug, Clone)]
pub struct ClusterGate {
    cluster: String,
}

impl ClusterGate {
    pub fn new(cluster: &str) -> Result<Self, ConfigError> {
        if !looks_like_cluster(cluster) {
            return Err(ConfigError::InvalidClusterName(cluster.to_string()));
        }
        Ok(Self {
            cluster: cluster.to_string(),
        })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn check<'a>(&self, command: &str, args: &'a [String]) -> GateDecision<'a> {
        match args.split_first() {
            Some((first, rest)) if *first == self.cluster => GateDecision::Proceed(rest),
            Some((first, _)) if looks_like_cluster(first) => GateDecision::Ignore,
            _ => GateDecision::Notice(output::cluster_name_notice(command, &self.cluster, args)),
        }
    }
}

fn looks_like_cluster(name: &str) -> bool {
    name.len() >= MIN_CLUSTER_NAME_LEN && name.ends_with(CLUSTER_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::args;

    #[test]
    fn rejects_malformed_cluster_names() {
        assert!(ClusterGate::new("prodnet").is_ok());
        assert!(ClusterGate::new("xnet").is_ok());
        assert!(ClusterGate::new("net").is_err());
        assert!(ClusterGate::new("production").is_err());
        assert!(ClusterGate::new("").is_err());
    }

    #[test]
    fn matching_cluster_proceeds_with_remaining_args() {
        let gate = ClusterGate::new("prodnet").unwrap();
        let a = args("prodnet myapp web repo:v1");
        assert_eq!(gate.check("deploy", &a), GateDecision::Proceed(&a[1..]));
    }

    #[test]
    fn other_cluster_is_ignored() {
        let gate = ClusterGate::new("prodnet").unwrap();
        assert_eq!(gate.check("deploy", &args("stagenet myapp")), GateDecision::Ignore);
    }

    #[test]
    fn missing_cluster_gets_a_notice() {
        let gate = ClusterGate::new("prodnet").unwrap();
        match gate.check("reset", &args("myapp")) {
            GateDecision::Notice(text) => {
                assert!(text.contains("```reset prodnet myapp\n```"), "got: {text}")
            }
            other => panic!("expected notice, got {other:?}"),
        }
        assert!(matches!(gate.check("reset", &[]), GateDecision::Notice(_)));
    }
}
