//! Infrastructure resources and the run's resource catalog
//!
//! A [`Resource`] is one Terraform resource block known to the installer. Its
//! [`Capability`] says whether it carries running workloads, and is fixed when
//! the resource is constructed so the drain loop never has to guess from names.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Terraform type of an ECS task definition
pub const ECS_TASK_DEFINITION_TYPE: &str = "aws_ecs_task_definition";

/// Terraform type of an ECS cluster
pub const ECS_CLUSTER_TYPE: &str = "aws_ecs_cluster";

/// Workload role of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Task definition; deregistered during drain (looked up by `family`)
    TaskDefinition,
    /// Compute cluster; its tasks are stopped during drain (looked up by `name`)
    Cluster,
    /// No workload role
    Generic,
}

impl Capability {
    /// Resolve the capability from a Terraform resource type
    pub fn from_resource_type(resource_type: &str) -> Self {
        match resource_type {
            ECS_TASK_DEFINITION_TYPE => Self::TaskDefinition,
            ECS_CLUSTER_TYPE => Self::Cluster,
            _ => Self::Generic,
        }
    }
}

/// Catalog entry as written on disk
#[derive(Debug, Clone, Deserialize)]
struct ResourceSpec {
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    capability: Option<Capability>,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
}

/// A named, typed unit of infrastructure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ResourceSpec")]
pub struct Resource {
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    category: String,
    capability: Capability,
    attributes: BTreeMap<String, serde_json::Value>,
}

impl From<ResourceSpec> for Resource {
    fn from(spec: ResourceSpec) -> Self {
        let capability = spec
            .capability
            .unwrap_or_else(|| Capability::from_resource_type(&spec.resource_type));

        Self {
            name: spec.name,
            resource_type: spec.resource_type,
            category: spec.category,
            capability,
            attributes: spec.attributes,
        }
    }
}

impl Resource {
    /// Create a resource; the capability is derived from `resource_type`
    pub fn new(
        name: impl Into<String>,
        resource_type: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        Self {
            name: name.into(),
            capability: Capability::from_resource_type(&resource_type),
            resource_type,
            category: category.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// ECS cluster resource with its `name` attribute set
    pub fn ecs_cluster(name: impl Into<String>, cluster_name: &str) -> Self {
        Self::new(name, ECS_CLUSTER_TYPE, "deploy").with_attr("name", cluster_name)
    }

    /// ECS task definition resource with its `family` attribute set
    pub fn ecs_task_definition(name: impl Into<String>, family: &str) -> Self {
        Self::new(name, ECS_TASK_DEFINITION_TYPE, "deploy").with_attr("family", family)
    }

    /// Set an input attribute
    pub fn with_attr(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Override the resolved capability
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    /// Move the resource into another category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Terraform address (`<type>.<name>`)
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    /// Logical resource name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Terraform resource type
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Installer category
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Workload role
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Raw input attribute
    pub fn attr(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Input attribute as a string, if it is one
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    pub fn is_task_definition(&self) -> bool {
        self.capability == Capability::TaskDefinition
    }

    pub fn is_cluster(&self) -> bool {
        self.capability == Capability::Cluster
    }
}

/// Resources known to the run, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceCatalog {
    resources: Vec<Resource>,
}

impl ResourceCatalog {
    /// Create a catalog from resources in declaration order
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Parse a catalog from JSON (`{"resources": [...]}`)
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalog file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
