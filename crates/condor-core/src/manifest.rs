//! Typed Deployment Manager manifest.
//!
//! The document is a tree of plain structs serialized with `serde_yaml`.
//! Field declaration order is the emitted key order, so the structs below
//! follow the key layout downstream consumers expect.

use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{ManifestError, ManifestResult};

/// A complete manifest: resources followed by outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub resources: Vec<Resource>,
    pub outputs: Vec<Output>,
}

impl Manifest {
    pub fn to_yaml(&self) -> ManifestResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Look up a declared resource by name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// All symbolic references in document order, paired with the name of
    /// the resource or output that holds them.
    pub fn references(&self) -> Vec<(&str, &Reference)> {
        let mut refs = Vec::new();
        for resource in &self.resources {
            for r in resource.properties.references() {
                refs.push((resource.name.as_str(), r));
            }
        }
        for output in &self.outputs {
            refs.push((output.name.as_str(), &output.value));
        }
        refs
    }

    /// Verify that every reference names a resource declared earlier in the
    /// document. Outputs may reference any resource.
    pub fn check_references(&self) -> ManifestResult<()> {
        let mut declared: HashSet<&str> = HashSet::new();
        for resource in &self.resources {
            for r in resource.properties.references() {
                if !declared.contains(r.resource.as_str()) {
                    return Err(ManifestError::DanglingReference {
                        from: resource.name.clone(),
                        target: r.resource.clone(),
                    });
                }
            }
            declared.insert(resource.name.as_str());
        }
        for output in &self.outputs {
            if !declared.contains(output.value.resource.as_str()) {
                return Err(ManifestError::DanglingReference {
                    from: output.name.clone(),
                    target: output.value.resource.clone(),
                });
            }
        }
        Ok(())
    }
}

// ── References ─────────────────────────────────────────────────────

/// Manifest-internal pointer, rendered as `$(ref.<resource>.<field>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub resource: String,
    /// Field path on the target, e.g. `selfLink` or
    /// `networkInterfaces[0].accessConfigs[0].natIP`.
    pub field: String,
}

impl Reference {
    pub fn new(resource: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            field: field.into(),
        }
    }

    pub fn self_link(resource: impl Into<String>) -> Self {
        Self::new(resource, "selfLink")
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$(ref.{}.{})", self.resource, self.field)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Resources ──────────────────────────────────────────────────────

/// A single `resources` entry.
///
/// `type` is derived from the properties variant so the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub properties: ResourceProperties,
}

impl Resource {
    pub fn new(name: impl Into<String>, properties: ResourceProperties) -> Self {
        Self {
            name: name.into(),
            resource_type: properties.type_name(),
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceProperties {
    Network(NetworkProperties),
    Firewall(FirewallProperties),
    Instance(InstanceProperties),
    InstanceTemplate(InstanceTemplateProperties),
    InstanceGroupManager(InstanceGroupManagerProperties),
    Autoscaler(AutoscalerProperties),
}

impl ResourceProperties {
    /// The Deployment Manager type identifier for this resource.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceProperties::Network(_) => "compute.v1.network",
            ResourceProperties::Firewall(_) => "compute.v1.firewall",
            ResourceProperties::Instance(_) => "compute.v1.instance",
            ResourceProperties::InstanceTemplate(_) => "compute.v1.instanceTemplate",
            ResourceProperties::InstanceGroupManager(_) => "compute.v1.instanceGroupManagers",
            ResourceProperties::Autoscaler(_) => "compute.v1.autoscaler",
        }
    }

    fn references(&self) -> Vec<&Reference> {
        match self {
            ResourceProperties::Network(_) => vec![],
            ResourceProperties::Firewall(p) => vec![&p.network],
            ResourceProperties::Instance(p) => p.network_interfaces.iter().map(|n| &n.network).collect(),
            ResourceProperties::InstanceTemplate(p) => p
                .properties
                .network_interfaces
                .iter()
                .map(|n| &n.network)
                .collect(),
            ResourceProperties::InstanceGroupManager(p) => vec![&p.instance_template],
            ResourceProperties::Autoscaler(p) => vec![&p.target],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkProperties {
    #[serde(rename = "IPv4Range")]
    pub ipv4_range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallProperties {
    pub network: Reference,
    pub source_ranges: Vec<String>,
    pub allowed: Vec<AllowedRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllowedRule {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<String>>,
}

impl AllowedRule {
    pub fn new(protocol: &str, ports: Option<&str>) -> Self {
        Self {
            ip_protocol: protocol.to_string(),
            ports: ports.map(|p| vec![p.to_string()]),
        }
    }
}

/// Properties of a singleton `compute.v1.instance`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProperties {
    pub zone: String,
    pub machine_type: String,
    pub disks: Vec<Disk>,
    pub network_interfaces: Vec<NetworkInterface>,
    pub service_accounts: Vec<ServiceAccount>,
    pub tags: Tags,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceTemplateProperties {
    pub project: String,
    pub properties: InstanceTemplateSpec,
}

/// The per-instance body of an instance template. Unlike a singleton
/// instance it carries no zone and takes a bare machine type name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTemplateSpec {
    pub machine_type: String,
    pub disks: Vec<Disk>,
    pub network_interfaces: Vec<NetworkInterface>,
    pub service_accounts: Vec<ServiceAccount>,
    pub tags: Tags,
    pub scheduling: Scheduling,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManagerProperties {
    pub base_instance_name: String,
    pub instance_template: Reference,
    pub target_size: ReplicaCount,
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerProperties {
    pub zone: String,
    pub target: Reference,
    pub autoscaling_policy: AutoscalingPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingPolicy {
    pub min_num_replicas: ReplicaCount,
    pub max_num_replicas: ReplicaCount,
}

// ── Instance building blocks ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub device_name: String,
    #[serde(rename = "type")]
    pub disk_type: String,
    pub boot: bool,
    pub auto_delete: bool,
    pub initialize_params: InitializeParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub source_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub network: Reference,
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub config_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceAccount {
    pub email: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tags {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scheduling {
    pub preemptible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

impl Metadata {
    /// Metadata holding a single `startup-script` entry.
    pub fn startup_script(script: String) -> Self {
        Self {
            items: vec![MetadataItem {
                key: "startup-script".to_string(),
                value: script,
            }],
        }
    }
}

// ── Outputs ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub name: String,
    pub value: Reference,
}

// ── Replica count ──────────────────────────────────────────────────

/// Worker replica count as it appears in the manifest.
///
/// Integers are emitted as bare YAML integers. Values that are not
/// integers pass through as-is; the generator does not range-check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReplicaCount(serde_yaml::Value);

impl ReplicaCount {
    /// Coerce a context value into a replica count.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        use serde_yaml::{Number, Value as Yaml};

        let yaml = match value {
            Json::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Yaml::Number(Number::from(u))
                } else if let Some(i) = n.as_i64() {
                    Yaml::Number(Number::from(i))
                } else {
                    Yaml::Number(Number::from(n.as_f64().unwrap_or_default()))
                }
            }
            Json::String(s) => match s.trim().parse::<u64>() {
                Ok(u) => Yaml::Number(Number::from(u)),
                Err(_) => Yaml::String(s.clone()),
            },
            Json::Bool(b) => Yaml::Bool(*b),
            other => Yaml::String(other.to_string()),
        };
        ReplicaCount(yaml)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.0.as_u64()
    }
}

impl From<u32> for ReplicaCount {
    fn from(count: u32) -> Self {
        ReplicaCount(serde_yaml::Value::Number(u64::from(count).into()))
    }
}

impl fmt::Display for ReplicaCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_yaml::Value::Number(n) => write!(f, "{n}"),
            serde_yaml::Value::String(s) => f.write_str(s),
            serde_yaml::Value::Bool(b) => write!(f, "{b}"),
            _ => f.write_str("~"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn network() -> Resource {
        Resource::new(
            "net",
            ResourceProperties::Network(NetworkProperties {
                ipv4_range: "10.0.0.0/8".to_string(),
            }),
        )
    }

    fn firewall(target: &str) -> Resource {
        Resource::new(
            "fw",
            ResourceProperties::Firewall(FirewallProperties {
                network: Reference::self_link(target),
                source_ranges: vec!["0.0.0.0/0".to_string()],
                allowed: vec![AllowedRule::new("ICMP", None)],
            }),
        )
    }

    #[test]
    fn test_reference_display() {
        let r = Reference::new("condor-submit", "networkInterfaces[0].accessConfigs[0].natIP");
        assert_eq!(
            r.to_string(),
            "$(ref.condor-submit.networkInterfaces[0].accessConfigs[0].natIP)"
        );
    }

    #[test]
    fn test_resource_type_follows_properties() {
        assert_eq!(network().resource_type, "compute.v1.network");
        assert_eq!(firewall("net").resource_type, "compute.v1.firewall");
    }

    #[test]
    fn test_check_references_ok() {
        let manifest = Manifest {
            resources: vec![network(), firewall("net")],
            outputs: vec![],
        };
        assert!(manifest.check_references().is_ok());
        assert_eq!(manifest.references().len(), 1);
    }

    #[test]
    fn test_check_references_forward_ref() {
        let manifest = Manifest {
            resources: vec![firewall("net"), network()],
            outputs: vec![],
        };
        let err = manifest.check_references().unwrap_err();
        assert!(matches!(err, ManifestError::DanglingReference { .. }));
        assert!(err.to_string().contains("'fw'"));
    }

    #[test]
    fn test_check_references_output_unknown() {
        let manifest = Manifest {
            resources: vec![network()],
            outputs: vec![Output {
                name: "ip".to_string(),
                value: Reference::new("missing", "natIP"),
            }],
        };
        assert!(manifest.check_references().is_err());
    }

    #[test]
    fn test_icmp_rule_omits_ports() {
        let yaml = serde_yaml::to_string(&AllowedRule::new("ICMP", None)).unwrap();
        assert_eq!(yaml.trim(), "IPProtocol: ICMP");
    }

    #[test]
    fn test_replica_count_coercion() {
        assert_eq!(ReplicaCount::from_json(&json!(3)).as_u64(), Some(3));
        assert_eq!(ReplicaCount::from_json(&json!("5")).as_u64(), Some(5));
        assert_eq!(ReplicaCount::from_json(&json!("many")).to_string(), "many");
        assert_eq!(ReplicaCount::from(7).to_string(), "7");
    }
}
