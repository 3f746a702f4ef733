use metakube_client::models::{
    AwsNodeSpec, AzureNodeSpec, CentosSpec, FlatcarSpec, NodeCloudSpec, NodeDeployment,
    NodeDeploymentSpec, NodeSpec, NodeVersionInfo, OpenstackNodeSpec, OperatingSystemSpec,
    TaintSpec, UbuntuSpec,
};

use super::format_timestamp;
use crate::schema::{
    AwsNodeConfig, AzureNodeConfig, CentosConfig, FlatcarConfig, NodeCloudConfig,
    NodeDeploymentConfig, NodeDeploymentSpecConfig, NodeDeploymentState, NodeSpecConfig,
    NodeVersionsConfig, OpenstackNodeConfig, OperatingSystemConfig, ProviderKind, TaintConfig,
    UbuntuConfig,
};

/// Creation body; `default_kubelet` is used when no kubelet version is set
pub fn expand_node_deployment(config: &NodeDeploymentConfig, default_kubelet: &str) -> NodeDeployment {
    NodeDeployment {
        name: config.name.clone(),
        spec: expand_node_deployment_spec(&config.spec, default_kubelet),
        ..Default::default()
    }
}

pub fn expand_node_deployment_spec(
    spec: &NodeDeploymentSpecConfig,
    default_kubelet: &str,
) -> NodeDeploymentSpec {
    NodeDeploymentSpec {
        replicas: spec.replicas_or_default(),
        min_replicas: spec.min_replicas,
        max_replicas: spec.max_replicas,
        template: expand_node_spec(&spec.template, default_kubelet),
        paused: None,
        dynamic_config: spec.dynamic_config,
    }
}

fn expand_node_spec(template: &NodeSpecConfig, default_kubelet: &str) -> NodeSpec {
    NodeSpec {
        cloud: expand_node_cloud(&template.cloud),
        operating_system: template
            .operating_system
            .as_ref()
            .map(expand_operating_system)
            .unwrap_or_default(),
        versions: NodeVersionInfo {
            kubelet: template.kubelet().unwrap_or(default_kubelet).to_string(),
        },
        labels: template.labels.clone(),
        taints: template
            .taints
            .iter()
            .map(|t| TaintSpec {
                key: t.key.clone(),
                value: t.value.clone(),
                effect: t.effect.clone(),
            })
            .collect(),
    }
}

fn expand_node_cloud(cloud: &NodeCloudConfig) -> NodeCloudSpec {
    NodeCloudSpec {
        aws: cloud.aws.as_ref().map(|aws| AwsNodeSpec {
            instance_type: aws.instance_type.clone(),
            disk_size: aws.disk_size,
            volume_type: aws.volume_type.clone(),
            ami: aws.ami.clone(),
            availability_zone: aws.availability_zone.clone(),
            subnet_id: aws.subnet_id.clone(),
            assign_public_ip: aws.assign_public_ip,
            tags: aws.tags.clone(),
        }),
        openstack: cloud.openstack.as_ref().map(|os| OpenstackNodeSpec {
            flavor: os.flavor.clone(),
            image: os.image.clone(),
            disk_size: os.disk_size,
            use_floating_ip: os.use_floating_ip,
            instance_ready_check_period: os.instance_ready_check_period.clone(),
            instance_ready_check_timeout: os.instance_ready_check_timeout.clone(),
            tags: os.tags.clone(),
        }),
        azure: cloud.azure.as_ref().map(|azure| AzureNodeSpec {
            size: azure.size.clone(),
            image_id: azure.image_id.clone(),
            assign_public_ip: azure.assign_public_ip,
            disk_size_gb: azure.disk_size_gb,
            os_disk_size_gb: azure.os_disk_size_gb,
            zones: azure.zones.clone(),
            tags: azure.tags.clone(),
        }),
    }
}

fn expand_operating_system(os: &OperatingSystemConfig) -> OperatingSystemSpec {
    OperatingSystemSpec {
        ubuntu: os.ubuntu.as_ref().map(|u| UbuntuSpec {
            dist_upgrade_on_boot: u.dist_upgrade_on_boot,
        }),
        flatcar: os.flatcar.as_ref().map(|f| FlatcarSpec {
            disable_auto_update: f.disable_auto_update,
        }),
        centos: os.centos.as_ref().map(|c| CentosSpec {
            dist_upgrade_on_boot: c.dist_upgrade_on_boot,
        }),
    }
}

/// Provider of a node template as reported by the API
pub fn node_cloud_kind(cloud: &NodeCloudSpec) -> Option<ProviderKind> {
    if cloud.aws.is_some() {
        Some(ProviderKind::Aws)
    } else if cloud.openstack.is_some() {
        Some(ProviderKind::Openstack)
    } else if cloud.azure.is_some() {
        Some(ProviderKind::Azure)
    } else {
        None
    }
}

pub fn flatten_node_deployment_spec(spec: &NodeDeploymentSpec) -> NodeDeploymentSpecConfig {
    NodeDeploymentSpecConfig {
        replicas: Some(spec.replicas),
        min_replicas: spec.min_replicas,
        max_replicas: spec.max_replicas,
        dynamic_config: spec.dynamic_config,
        template: flatten_node_spec(&spec.template),
    }
}

fn flatten_node_spec(template: &NodeSpec) -> NodeSpecConfig {
    NodeSpecConfig {
        cloud: flatten_node_cloud(&template.cloud),
        operating_system: flatten_operating_system(&template.operating_system),
        versions: (!template.versions.kubelet.is_empty()).then(|| NodeVersionsConfig {
            kubelet: template.versions.kubelet.clone(),
        }),
        labels: template.labels.clone(),
        taints: template
            .taints
            .iter()
            .map(|t| TaintConfig {
                key: t.key.clone(),
                value: t.value.clone(),
                effect: t.effect.clone(),
            })
            .collect(),
    }
}

fn flatten_node_cloud(cloud: &NodeCloudSpec) -> NodeCloudConfig {
    let mut out = NodeCloudConfig::default();
    if let Some(aws) = &cloud.aws {
        out.aws = Some(AwsNodeConfig {
            instance_type: aws.instance_type.clone(),
            disk_size: aws.disk_size,
            volume_type: aws.volume_type.clone(),
            ami: aws.ami.clone(),
            availability_zone: aws.availability_zone.clone(),
            subnet_id: aws.subnet_id.clone(),
            assign_public_ip: aws.assign_public_ip,
            tags: aws.tags.clone(),
        });
    } else if let Some(os) = &cloud.openstack {
        out.openstack = Some(OpenstackNodeConfig {
            flavor: os.flavor.clone(),
            image: os.image.clone(),
            disk_size: os.disk_size,
            use_floating_ip: os.use_floating_ip,
            instance_ready_check_period: os.instance_ready_check_period.clone(),
            instance_ready_check_timeout: os.instance_ready_check_timeout.clone(),
            tags: os.tags.clone(),
        });
    } else if let Some(azure) = &cloud.azure {
        out.azure = Some(AzureNodeConfig {
            size: azure.size.clone(),
            image_id: azure.image_id.clone(),
            assign_public_ip: azure.assign_public_ip,
            disk_size_gb: azure.disk_size_gb,
            os_disk_size_gb: azure.os_disk_size_gb,
            zones: azure.zones.clone(),
            tags: azure.tags.clone(),
        });
    }
    out
}

fn flatten_operating_system(os: &OperatingSystemSpec) -> Option<OperatingSystemConfig> {
    let config = if let Some(u) = &os.ubuntu {
        OperatingSystemConfig {
            ubuntu: Some(UbuntuConfig {
                dist_upgrade_on_boot: u.dist_upgrade_on_boot,
            }),
            ..Default::default()
        }
    } else if let Some(f) = &os.flatcar {
        OperatingSystemConfig {
            flatcar: Some(FlatcarConfig {
                disable_auto_update: f.disable_auto_update,
            }),
            ..Default::default()
        }
    } else if let Some(c) = &os.centos {
        OperatingSystemConfig {
            centos: Some(CentosConfig {
                dist_upgrade_on_boot: c.dist_upgrade_on_boot,
            }),
            ..Default::default()
        }
    } else {
        return None;
    };
    Some(config)
}

/// State of a node deployment in the given project and cluster
pub fn flatten_node_deployment(
    project_id: &str,
    cluster_id: &str,
    nd: &NodeDeployment,
) -> NodeDeploymentState {
    NodeDeploymentState {
        id: nd.id.clone(),
        config: NodeDeploymentConfig {
            project_id: project_id.to_string(),
            cluster_id: cluster_id.to_string(),
            name: nd.name.clone(),
            spec: flatten_node_deployment_spec(&nd.spec),
        },
        creation_timestamp: format_timestamp(nd.creation_timestamp),
        deletion_timestamp: format_timestamp(nd.deletion_timestamp),
    }
}
