//! Named workload manifests applied during validation.

use std::fmt;

/// A manifest shipped in the workload directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workload {
    ClusterIp,
    NodePort,
    LoadBalancer,
    Ingress,
    DaemonSet,
    DnsUtils,
    LocalPathProvisioner,
}

impl Workload {
    /// File name inside the workload directory.
    #[must_use]
    pub fn manifest(self) -> &'static str {
        match self {
            Self::ClusterIp => "clusterip.yaml",
            Self::NodePort => "nodeport.yaml",
            Self::LoadBalancer => "loadbalancer.yaml",
            Self::Ingress => "ingress.yaml",
            Self::DaemonSet => "daemonset.yaml",
            Self::DnsUtils => "dnsutils.yaml",
            Self::LocalPathProvisioner => "local-path-provisioner.yaml",
        }
    }

    /// Text every replica serves from `/name.html`, or that appears in its
    /// pod names.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::ClusterIp => "test-clusterip",
            Self::NodePort => "test-nodeport",
            Self::LoadBalancer => "test-loadbalancer",
            Self::Ingress => "test-ingress",
            Self::DaemonSet => "test-daemonset",
            Self::DnsUtils => "dnsutils",
            Self::LocalPathProvisioner => "volume-test",
        }
    }

    /// Value of the `k8s-app` label on the workload's pods, if it has one.
    #[must_use]
    pub fn app_label(self) -> Option<&'static str> {
        match self {
            Self::ClusterIp => Some("nginx-app-clusterip"),
            Self::NodePort => Some("nginx-app-nodeport"),
            Self::LoadBalancer => Some("nginx-app-loadbalancer"),
            _ => None,
        }
    }

    /// Name of the service fronting the workload, if it has one.
    #[must_use]
    pub fn service(self) -> Option<&'static str> {
        match self {
            Self::ClusterIp => Some("nginx-clusterip-svc"),
            Self::NodePort => Some("nginx-nodeport-svc"),
            Self::LoadBalancer => Some("nginx-loadbalancer-svc"),
            _ => None,
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest())
    }
}
