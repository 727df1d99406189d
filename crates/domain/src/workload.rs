use std::collections::BTreeMap;

use ondemand_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Launch parameters handed to the compute platform for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    cluster_id: NonEmptyString,
    task_definition: NonEmptyString,
    container_name: NonEmptyString,
    subnets: Vec<String>,
    security_groups: Vec<String>,
    assign_public_ip: bool,
    environment: BTreeMap<String, String>,
}

/// Input payload for workload spec validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSpecInput {
    /// Cluster that hosts the workload task.
    pub cluster_id: String,
    /// Task definition (image, cpu, memory) registered on the platform.
    pub task_definition: String,
    /// Container receiving environment overrides.
    pub container_name: String,
    /// Subnets the task network interface is placed in.
    pub subnets: Vec<String>,
    /// Security groups attached to the task network interface.
    pub security_groups: Vec<String>,
    /// Whether the platform assigns a public address.
    pub assign_public_ip: bool,
    /// Container environment overrides.
    pub environment: BTreeMap<String, String>,
}

impl WorkloadSpec {
    /// Creates a validated workload spec.
    pub fn new(input: WorkloadSpecInput) -> AppResult<Self> {
        let WorkloadSpecInput {
            cluster_id,
            task_definition,
            container_name,
            subnets,
            security_groups,
            assign_public_ip,
            environment,
        } = input;

        let subnets = normalize_identifiers(subnets);
        let security_groups = normalize_identifiers(security_groups);

        if let Some(key) = environment.keys().find(|key| !is_valid_environment_key(key)) {
            return Err(AppError::Validation(format!(
                "invalid workload environment variable name '{key}'"
            )));
        }

        Ok(Self {
            cluster_id: NonEmptyString::new(cluster_id)?,
            task_definition: NonEmptyString::new(task_definition)?,
            container_name: NonEmptyString::new(container_name)?,
            subnets,
            security_groups,
            assign_public_ip,
            environment,
        })
    }

    /// Returns target cluster.
    #[must_use]
    pub fn cluster_id(&self) -> &NonEmptyString {
        &self.cluster_id
    }

    /// Returns task definition identifier.
    #[must_use]
    pub fn task_definition(&self) -> &NonEmptyString {
        &self.task_definition
    }

    /// Returns overridden container name.
    #[must_use]
    pub fn container_name(&self) -> &NonEmptyString {
        &self.container_name
    }

    /// Returns task subnets.
    #[must_use]
    pub fn subnets(&self) -> &[String] {
        &self.subnets
    }

    /// Returns task security groups.
    #[must_use]
    pub fn security_groups(&self) -> &[String] {
        &self.security_groups
    }

    /// Returns whether a public address is requested.
    #[must_use]
    pub fn assign_public_ip(&self) -> bool {
        self.assign_public_ip
    }

    /// Returns container environment overrides.
    #[must_use]
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
}

fn normalize_identifiers(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}

fn is_valid_environment_key(key: &str) -> bool {
    let mut characters = key.chars();
    characters
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && characters.all(|character| character.is_ascii_alphanumeric() || character == '_')
}

/// Identifies one launched task on the compute platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    cluster_id: NonEmptyString,
    task_id: NonEmptyString,
}

impl TaskHandle {
    /// Creates a validated task handle.
    pub fn new(cluster_id: impl Into<String>, task_id: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            cluster_id: NonEmptyString::new(cluster_id)?,
            task_id: NonEmptyString::new(task_id)?,
        })
    }

    /// Returns hosting cluster.
    #[must_use]
    pub fn cluster_id(&self) -> &str {
        self.cluster_id.as_str()
    }

    /// Returns platform task identifier.
    #[must_use]
    pub fn task_id(&self) -> &str {
        self.task_id.as_str()
    }
}

/// Observed platform state of a launched task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Accepted by the platform but not yet running.
    Provisioning,
    /// Containers are running.
    Running,
    /// Task has stopped.
    Stopped {
        /// Essential container exit code when reported.
        exit_code: Option<i32>,
        /// Platform stop reason when reported.
        reason: Option<String>,
    },
}

impl TaskStatus {
    /// Returns true for a stop with exit code zero.
    #[must_use]
    pub fn is_clean_exit(&self) -> bool {
        matches!(self, Self::Stopped { exit_code: Some(0), .. })
    }
}
