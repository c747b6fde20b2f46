//! Resource trackers - player-defined countable resources on an actor
//!
//! Stored as the list `system.resources`. Entries carry stable ids and an
//! explicit `order`; list operations keep orders dense (`0..n`).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::value_objects::ModifierValue;
use crate::ResourceId;

/// Path of the resource list inside an actor document.
pub const RESOURCES_PATH: &str = "system.resources";

fn default_color() -> String {
    "#ffffff".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    id: ResourceId,
    name: String,
    color: String,
    value: i64,
    /// Upper bound for `value`; 0 means unbounded.
    max: i64,
    order: u32,
}

impl Resource {
    /// Lenient read of one stored entry. Every field falls back to a default;
    /// numbers stored as strings use integer-prefix parsing.
    fn from_stored(entry: &Map<String, Value>) -> Self {
        let text = |key: &str| match entry.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        let integer = |key: &str| {
            entry
                .get(key)
                .map(|raw| ModifierValue::from_json(raw).as_integer())
                .unwrap_or(0)
        };
        Self {
            id: text("id").map(ResourceId::from).unwrap_or_default(),
            name: text("name").unwrap_or_default(),
            color: text("color")
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(default_color),
            value: integer("value"),
            max: integer("max").max(0),
            order: u32::try_from(integer("order").max(0)).unwrap_or(u32::MAX),
        }
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    fn clamp(&self, value: i64) -> i64 {
        let value = value.max(0);
        if self.max > 0 {
            value.min(self.max)
        } else {
            value
        }
    }
}

/// Ordered list of an actor's resources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceList {
    resources: Vec<Resource>,
}

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lenient read of `system.resources`: non-lists become empty, invalid
    /// entries are dropped, blank ids are regenerated and orders re-densified.
    pub fn from_stored(raw: Option<&Value>) -> Self {
        let mut resources: Vec<Resource> = match raw {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(Resource::from_stored)
                .collect(),
            _ => Vec::new(),
        };
        for resource in &mut resources {
            if resource.id.is_blank() {
                resource.id = ResourceId::new();
            }
            resource.value = resource.clamp(resource.value);
        }
        resources.sort_by_key(|r| r.order);
        let mut list = Self { resources };
        list.densify();
        list
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.iter().find(|r| &r.id == id)
    }

    fn get_mut(&mut self, id: &ResourceId) -> Result<&mut Resource, DomainError> {
        self.resources
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| DomainError::not_found("Resource", id))
    }

    fn densify(&mut self) {
        for (index, resource) in self.resources.iter_mut().enumerate() {
            resource.order = index as u32;
        }
    }

    /// Append a resource starting at 0.
    pub fn add(&mut self, name: impl Into<String>, color: impl Into<String>, max: i64) -> ResourceId {
        let id = ResourceId::new();
        self.resources.push(Resource {
            id: id.clone(),
            name: name.into(),
            color: color.into(),
            value: 0,
            max: max.max(0),
            order: self.resources.len() as u32,
        });
        id
    }

    pub fn remove(&mut self, id: &ResourceId) -> Result<Resource, DomainError> {
        let index = self
            .resources
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| DomainError::not_found("Resource", id))?;
        let removed = self.resources.remove(index);
        self.densify();
        Ok(removed)
    }

    pub fn rename(&mut self, id: &ResourceId, name: impl Into<String>) -> Result<(), DomainError> {
        self.get_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_color(&mut self, id: &ResourceId, color: impl Into<String>) -> Result<(), DomainError> {
        self.get_mut(id)?.color = color.into();
        Ok(())
    }

    /// Change the bound and re-clamp the current value.
    pub fn set_max(&mut self, id: &ResourceId, max: i64) -> Result<(), DomainError> {
        let resource = self.get_mut(id)?;
        resource.max = max.max(0);
        resource.value = resource.clamp(resource.value);
        Ok(())
    }

    /// Add `delta` to a resource, clamped to `0..=max`. Returns the new value.
    pub fn apply_delta(&mut self, id: &ResourceId, delta: i64) -> Result<i64, DomainError> {
        let resource = self.get_mut(id)?;
        resource.value = resource.clamp(resource.value.saturating_add(delta));
        Ok(resource.value)
    }

    /// Move a resource to `index` (clamped to the list bounds).
    pub fn move_to(&mut self, id: &ResourceId, index: usize) -> Result<(), DomainError> {
        let from = self
            .resources
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| DomainError::not_found("Resource", id))?;
        let resource = self.resources.remove(from);
        let index = index.min(self.resources.len());
        self.resources.insert(index, resource);
        self.densify();
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.resources).unwrap_or(Value::Array(Vec::new()))
    }
}
