// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry mapping stable serialized type names to node factories.
//!
//! The mapping is explicit and total: every archetype a graph can contain
//! is registered at startup, and the serialized name is decoupled from any
//! in-crate type name so internal renames never break saved data.

use crate::node::Node;
use indexmap::IndexMap;
use std::fmt;

type NodeFactory = Box<dyn Fn() -> Node + Send + Sync>;

/// A registered node archetype.
pub struct NodeTemplate {
    serial_name: String,
    resettable: bool,
    factory: NodeFactory,
}

impl NodeTemplate {
    /// Create a template from a stable serialized name and a factory.
    pub fn new(
        serial_name: impl Into<String>,
        factory: impl Fn() -> Node + Send + Sync + 'static,
    ) -> Self {
        Self {
            serial_name: serial_name.into(),
            resettable: false,
            factory: Box::new(factory),
        }
    }

    /// Mark the archetype as resettable: a corrupt record is replaced by a
    /// fresh default instance instead of an error placeholder.
    pub fn resettable(mut self) -> Self {
        self.resettable = true;
        self
    }

    /// The stable serialized name.
    pub fn serial_name(&self) -> &str {
        &self.serial_name
    }

    /// Whether corrupt records of this archetype reset to defaults.
    pub fn is_resettable(&self) -> bool {
        self.resettable
    }

    /// Build a fresh node instance.
    pub fn instantiate(&self) -> Node {
        let node = (self.factory)();
        debug_assert_eq!(
            node.type_name(),
            self.serial_name,
            "factory for '{}' built a '{}' node",
            self.serial_name,
            node.type_name()
        );
        node
    }
}

impl fmt::Debug for NodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTemplate")
            .field("serial_name", &self.serial_name)
            .field("resettable", &self.resettable)
            .finish_non_exhaustive()
    }
}

/// Registry of available node archetypes.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    templates: IndexMap<String, NodeTemplate>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an archetype, replacing any previous one with the same
    /// serialized name.
    pub fn register(&mut self, template: NodeTemplate) {
        self.templates
            .insert(template.serial_name().to_string(), template);
    }

    /// Look up an archetype by serialized name.
    pub fn get(&self, serial_name: &str) -> Option<&NodeTemplate> {
        self.templates.get(serial_name)
    }

    /// Build a fresh node of the named archetype.
    pub fn instantiate(&self, serial_name: &str) -> Option<Node> {
        self.get(serial_name).map(NodeTemplate::instantiate)
    }

    /// All registered archetypes.
    pub fn templates(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Scope;
    use crate::testing::inert_node;

    #[test]
    fn test_register_and_instantiate() {
        let mut registry = NodeRegistry::new();
        registry.register(NodeTemplate::new("Test.Inert", || {
            inert_node(Scope::Generic)
        }));

        assert!(registry.get("Test.Inert").is_some());
        assert!(!registry.get("Test.Inert").map(NodeTemplate::is_resettable).unwrap());
        let node = registry.instantiate("Test.Inert").unwrap();
        assert_eq!(node.type_name(), "Test.Inert");
        assert!(registry.instantiate("Test.Unknown").is_none());
    }

    #[test]
    fn test_resettable_flag() {
        let template = NodeTemplate::new("Test.Inert", || inert_node(Scope::Generic)).resettable();
        assert!(template.is_resettable());
    }
}
