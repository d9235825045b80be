//! Worker launcher.
//!
//! Starts one isolated worker task per admitted job with the job's
//! parameters injected as its container environment. Fire-and-forget
//! against the compute scheduler; the caller compensates the admission
//! counter when the launch is rejected.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, KeyValuePair, LaunchType,
    NetworkConfiguration, Tag, TaskOverride,
};
use thiserror::Error;
use tracing::{error, info};

use vodforge_models::TranscodeJob;

pub type LaunchResult = Result<(), LaunchError>;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Launch rejected: {0}")]
    Rejected(String),

    #[error("Launcher misconfigured: {0}")]
    Config(String),
}

/// Seam to the external compute scheduler.
#[async_trait]
pub trait Launch: Send + Sync {
    /// Start one worker instance for the job.
    async fn launch(&self, job: &TranscodeJob) -> LaunchResult;
}

/// Configuration for the Fargate launcher.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// ECS cluster name
    pub cluster: String,
    /// Task definition for the worker container
    pub task_definition: String,
    /// Container name inside the task definition
    pub container_name: String,
    /// VPC subnets
    pub subnets: Vec<String>,
    /// Security groups
    pub security_groups: Vec<String>,
    /// AWS region
    pub region: String,
    /// Credentials injected into the worker environment
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Temp bucket holding uploaded sources
    pub source_bucket: String,
    /// Final bucket for published renditions
    pub dest_bucket: String,
    /// Completion callback URL
    pub webhook_url: String,
    /// Public CDN domain for published artifacts
    pub cdn_domain: String,
    /// Optional thumbnail collaborator endpoint
    pub thumbnail_endpoint: Option<String>,
}

impl LauncherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, LaunchError> {
        let require = |name: &str| {
            std::env::var(name).map_err(|_| LaunchError::Config(format!("{name} not set")))
        };
        let split_list = |value: String| -> Vec<String> {
            value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        Ok(Self {
            cluster: require("ECS_CLUSTER")?,
            task_definition: require("ECS_TASK_DEFINITION")?,
            container_name: require("ECS_CONTAINER_NAME")?,
            subnets: split_list(require("ECS_SUBNETS")?),
            security_groups: split_list(require("ECS_SECURITY_GROUPS")?),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: require("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            source_bucket: require("SOURCE_BUCKET")?,
            dest_bucket: require("DEST_BUCKET")?,
            webhook_url: require("WEBHOOK_URL")?,
            cdn_domain: require("CDN_DOMAIN")?,
            thumbnail_endpoint: std::env::var("THUMBNAIL_API_ENDPOINT").ok(),
        })
    }
}

/// ECS Fargate launcher.
pub struct EcsLauncher {
    client: aws_sdk_ecs::Client,
    config: LauncherConfig,
}

impl EcsLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "vodforge",
        );

        let sdk_config = aws_sdk_ecs::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_sdk_ecs::config::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();

        Self {
            client: aws_sdk_ecs::Client::from_conf(sdk_config),
            config,
        }
    }

    fn worker_environment(&self, job: &TranscodeJob) -> Vec<KeyValuePair> {
        let mut env = vec![
            ("OBJECT_KEY", job.object_key.clone()),
            ("SOURCE_BUCKET", self.config.source_bucket.clone()),
            ("DEST_BUCKET", self.config.dest_bucket.clone()),
            ("AWS_REGION", self.config.region.clone()),
            ("AWS_ACCESS_KEY_ID", self.config.access_key_id.clone()),
            ("AWS_SECRET_ACCESS_KEY", self.config.secret_access_key.clone()),
            ("WEBHOOK_URL", self.config.webhook_url.clone()),
            ("CDN_DOMAIN", self.config.cdn_domain.clone()),
        ];
        if let Some(endpoint) = &self.config.thumbnail_endpoint {
            env.push(("THUMBNAIL_API_ENDPOINT", endpoint.clone()));
        }

        env.into_iter()
            .map(|(name, value)| KeyValuePair::builder().name(name).value(value).build())
            .collect()
    }
}

#[async_trait]
impl Launch for EcsLauncher {
    async fn launch(&self, job: &TranscodeJob) -> LaunchResult {
        let network = AwsVpcConfiguration::builder()
            .set_subnets(Some(self.config.subnets.clone()))
            .set_security_groups(Some(self.config.security_groups.clone()))
            .assign_public_ip(AssignPublicIp::Disabled)
            .build()
            .map_err(|e| LaunchError::Config(e.to_string()))?;

        let overrides = TaskOverride::builder()
            .container_overrides(
                ContainerOverride::builder()
                    .name(&self.config.container_name)
                    .set_environment(Some(self.worker_environment(job)))
                    .build(),
            )
            .build();

        self.client
            .run_task()
            .cluster(&self.config.cluster)
            .task_definition(&self.config.task_definition)
            .launch_type(LaunchType::Fargate)
            .count(1)
            .network_configuration(
                NetworkConfiguration::builder()
                    .awsvpc_configuration(network)
                    .build(),
            )
            .overrides(overrides)
            .tags(
                Tag::builder()
                    .key("Purpose")
                    .value("Video Transcoding")
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                error!(object_key = %job.object_key, "RunTask rejected: {}", e);
                LaunchError::Rejected(e.to_string())
            })?;

        info!(object_key = %job.object_key, "Worker task launched");
        Ok(())
    }
}
