//! Manifest generator.
//!
//! Builds the cluster layout (network, firewall rules, master and submit
//! instances, compute instance template, managed instance group and
//! autoscaler) from resolved [`ClusterParams`] and serializes it to YAML.

use tracing::{debug, warn};

use crate::context::{ClusterParams, EvaluationContext};
use crate::error::ManifestResult;
use crate::manifest::*;
use crate::scripts::NodeRole;

pub const NETWORK: &str = "condor-network";
pub const SSH_FIREWALL: &str = "ssh-firewall-rule";
pub const INTERNAL_FIREWALL: &str = "all-internal-firewall-rule";
pub const MASTER: &str = "condor-master";
pub const SUBMIT: &str = "condor-submit";
pub const COMPUTE_TEMPLATE: &str = "condor-compute";
pub const COMPUTE_GROUP: &str = "condor-compute-igm";
pub const COMPUTE_AUTOSCALER: &str = "condor-compute-as";
pub const SUBMIT_IP_OUTPUT: &str = "condor-submit-host-ip";

const INTERNAL_RANGE: &str = "10.240.0.0/16";
const COMPUTE_API: &str = "https://www.googleapis.com/compute/v1";
const SOURCE_IMAGE: &str =
    "https://www.googleapis.com/compute/v1/projects/debian-cloud/global/images/debian-8-jessie-v20160606";
const LOGGING_SCOPE: &str = "https://www.googleapis.com/auth/logging.write";

/// Compatibility switches for downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Emit the output name as `condor-submit-host-ip,` (with the trailing
    /// comma) for deployments created from the older template.
    pub legacy_output_name: bool,
}

/// Render the manifest for a context.
///
/// Fails only if a required field is missing from the context.
pub fn generate_config(ctx: &EvaluationContext) -> ManifestResult<String> {
    generate_config_with(ctx, &GeneratorOptions::default())
}

pub fn generate_config_with(
    ctx: &EvaluationContext,
    options: &GeneratorOptions,
) -> ManifestResult<String> {
    let params = ClusterParams::from_context(ctx)?;
    debug!(
        zone = %params.zone,
        count = %params.count,
        project = %params.project,
        instance_type = %params.instance_type,
        "Generating condor cluster manifest"
    );

    let manifest = build_manifest(&params, options);
    manifest.check_references()?;
    manifest.to_yaml()
}

/// Assemble the structured manifest. Resources are declared before anything
/// references them.
pub fn build_manifest(params: &ClusterParams, options: &GeneratorOptions) -> Manifest {
    let output_name = if options.legacy_output_name {
        warn!("Emitting legacy output name with trailing comma");
        format!("{SUBMIT_IP_OUTPUT},")
    } else {
        SUBMIT_IP_OUTPUT.to_string()
    };

    Manifest {
        resources: vec![
            Resource::new(
                NETWORK,
                ResourceProperties::Network(NetworkProperties {
                    ipv4_range: INTERNAL_RANGE.to_string(),
                }),
            ),
            Resource::new(
                SSH_FIREWALL,
                ResourceProperties::Firewall(FirewallProperties {
                    network: Reference::self_link(NETWORK),
                    source_ranges: vec!["0.0.0.0/0".to_string()],
                    allowed: vec![AllowedRule::new("TCP", Some("22"))],
                }),
            ),
            Resource::new(
                INTERNAL_FIREWALL,
                ResourceProperties::Firewall(FirewallProperties {
                    network: Reference::self_link(NETWORK),
                    source_ranges: vec![INTERNAL_RANGE.to_string()],
                    allowed: vec![
                        AllowedRule::new("TCP", Some("0-65535")),
                        AllowedRule::new("UDP", Some("0-65535")),
                        AllowedRule::new("ICMP", None),
                    ],
                }),
            ),
            instance(MASTER, NodeRole::Master, params),
            instance(SUBMIT, NodeRole::Submit, params),
            Resource::new(
                COMPUTE_TEMPLATE,
                ResourceProperties::InstanceTemplate(InstanceTemplateProperties {
                    project: params.project.clone(),
                    properties: InstanceTemplateSpec {
                        machine_type: params.instance_type.clone(),
                        disks: boot_disk(),
                        network_interfaces: external_nat(),
                        service_accounts: logging_service_account(),
                        tags: Tags {
                            items: vec![COMPUTE_TEMPLATE.to_string()],
                        },
                        scheduling: Scheduling { preemptible: true },
                        metadata: Metadata::startup_script(
                            NodeRole::Compute.startup_script(&params.email, MASTER),
                        ),
                    },
                }),
            ),
            Resource::new(
                COMPUTE_GROUP,
                ResourceProperties::InstanceGroupManager(InstanceGroupManagerProperties {
                    base_instance_name: "condor-compute-instance".to_string(),
                    instance_template: Reference::self_link(COMPUTE_TEMPLATE),
                    target_size: params.count.clone(),
                    zone: params.zone.clone(),
                }),
            ),
            Resource::new(
                COMPUTE_AUTOSCALER,
                ResourceProperties::Autoscaler(AutoscalerProperties {
                    zone: params.zone.clone(),
                    target: Reference::self_link(COMPUTE_GROUP),
                    autoscaling_policy: AutoscalingPolicy {
                        min_num_replicas: params.count.clone(),
                        max_num_replicas: params.count.clone(),
                    },
                }),
            ),
        ],
        outputs: vec![Output {
            name: output_name,
            value: Reference::new(SUBMIT, "networkInterfaces[0].accessConfigs[0].natIP"),
        }],
    }
}

/// A singleton instance whose tag matches its resource name.
fn instance(name: &str, role: NodeRole, params: &ClusterParams) -> Resource {
    Resource::new(
        name,
        ResourceProperties::Instance(InstanceProperties {
            zone: params.zone.clone(),
            machine_type: format!(
                "{COMPUTE_API}/projects/{}/zones/{}/machineTypes/{}",
                params.project, params.zone, params.instance_type
            ),
            disks: boot_disk(),
            network_interfaces: external_nat(),
            service_accounts: logging_service_account(),
            tags: Tags {
                items: vec![name.to_string()],
            },
            metadata: Metadata::startup_script(role.startup_script(&params.email, MASTER)),
        }),
    )
}

fn boot_disk() -> Vec<Disk> {
    vec![Disk {
        device_name: "boot".to_string(),
        disk_type: "PERSISTENT".to_string(),
        boot: true,
        auto_delete: true,
        initialize_params: InitializeParams {
            source_image: SOURCE_IMAGE.to_string(),
        },
    }]
}

fn external_nat() -> Vec<NetworkInterface> {
    vec![NetworkInterface {
        network: Reference::self_link(NETWORK),
        access_configs: vec![AccessConfig {
            name: "External NAT".to_string(),
            config_type: "ONE_TO_ONE_NAT".to_string(),
        }],
    }]
}

fn logging_service_account() -> Vec<ServiceAccount> {
    vec![ServiceAccount {
        email: "default".to_string(),
        scopes: vec![LOGGING_SCOPE.to_string()],
    }]
}
