//! Resource manifests
//!
//! A manifest is the ordered list of resource slots a service declares.
//! Each slot is named after the configuration field holding the
//! resource's settings.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use crate::resource::Resource;

/// Whether a slot's configuration must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Absent configuration is fatal
    Required,
    /// Absent configuration leaves the slot empty
    Optional,
}

/// Constructs a fresh, unconfigured resource
pub type Factory = Box<dyn Fn() -> Box<dyn Resource> + Send + Sync>;

/// An input resource slot
pub struct InputSlot {
    /// Configuration field name
    pub name: String,
    /// Whether configuration is mandatory
    pub cardinality: Cardinality,
    factory: Factory,
}

impl InputSlot {
    /// Build an unconfigured resource for this slot
    pub fn create(&self) -> Box<dyn Resource> {
        (self.factory)()
    }
}

impl fmt::Debug for InputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSlot")
            .field("name", &self.name)
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

/// Ordered input slots, acquired before the business function runs
#[derive(Debug, Default)]
pub struct InputManifest {
    slots: Vec<InputSlot>,
}

impl InputManifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required input
    pub fn required<R, F>(self, name: impl Into<String>, factory: F) -> Self
    where
        R: Resource,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.slot(name, Cardinality::Required, factory)
    }

    /// Declare an optional input
    pub fn optional<R, F>(self, name: impl Into<String>, factory: F) -> Self
    where
        R: Resource,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.slot(name, Cardinality::Optional, factory)
    }

    fn slot<R, F>(mut self, name: impl Into<String>, cardinality: Cardinality, factory: F) -> Self
    where
        R: Resource,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.slots.push(InputSlot {
            name: name.into(),
            cardinality,
            factory: Box::new(move || Box::new(factory())),
        });
        self
    }

    /// Slots in declaration order
    pub fn slots(&self) -> &[InputSlot] {
        &self.slots
    }
}

/// An output resource slot
///
/// Outputs are built by the business function, so the slot has no factory.
#[derive(Debug, Clone)]
pub struct OutputSlot {
    /// Configuration field name
    pub name: String,
    /// Whether configuration is mandatory
    pub cardinality: Cardinality,
}

/// Ordered output slots, acquired after the business function returns
#[derive(Debug, Clone, Default)]
pub struct OutputManifest {
    slots: Vec<OutputSlot>,
}

impl OutputManifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required output
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.slots.push(OutputSlot {
            name: name.into(),
            cardinality: Cardinality::Required,
        });
        self
    }

    /// Declare an optional output
    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.slots.push(OutputSlot {
            name: name.into(),
            cardinality: Cardinality::Optional,
        });
        self
    }

    /// Slots in declaration order
    pub fn slots(&self) -> &[OutputSlot] {
        &self.slots
    }

    /// Whether `name` is a declared slot
    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }
}

/// Entered input resources, as seen by the business function
///
/// Absent optional slots are simply missing.
#[derive(Default)]
pub struct Inputs<'a> {
    resources: BTreeMap<&'a str, &'a (dyn Resource + 'static)>,
}

impl<'a> Inputs<'a> {
    pub(crate) fn insert(&mut self, name: &'a str, resource: &'a (dyn Resource + 'static)) {
        self.resources.insert(name, resource);
    }

    /// Whether the slot holds a resource
    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// The resource in slot `name`, if present and of type `T`
    pub fn get<T: Resource>(&self, name: &str) -> Option<&'a T> {
        let resource: &'a (dyn Any + 'static) = *self.resources.get(name)?;
        resource.downcast_ref::<T>()
    }
}

/// Output resources returned by the business function, keyed by slot name
#[derive(Default)]
pub struct Outputs {
    resources: Vec<(String, Box<dyn Resource>)>,
}

impl Outputs {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the resource for slot `name`
    pub fn with<R: Resource>(mut self, name: impl Into<String>, resource: R) -> Self {
        self.insert(name, Box::new(resource));
        self
    }

    /// Add a boxed resource for slot `name`, replacing any earlier one
    pub fn insert(&mut self, name: impl Into<String>, resource: Box<dyn Resource>) {
        let name = name.into();
        self.resources.retain(|(n, _)| *n != name);
        self.resources.push((name, resource));
    }

    /// Slot names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|(n, _)| n.as_str())
    }

    /// Remove and return the resource for `name`
    pub fn take(&mut self, name: &str) -> Option<Box<dyn Resource>> {
        let index = self.resources.iter().position(|(n, _)| n == name)?;
        Some(self.resources.remove(index).1)
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resources were returned
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
