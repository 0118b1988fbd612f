// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node model: ports, scopes, bindings, and the behavior hook.

use crate::serialization::{NodeEntry, RestoreError};
use crate::traversal::{NodeRun, TraversalError};
use crate::variable::{ObjectRef, Value, VarCell, VariableType};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// The reserved empty id, meaning "no link". It must never key a real
    /// node.
    pub const EMPTY: NodeId = NodeId(Uuid::nil());

    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Whether this is the reserved empty id.
    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution scope a node belongs to.
///
/// Scopes keep nodes meant for different update phases from mixing inside
/// one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    /// Runs in any scope.
    #[default]
    Generic,
    /// Fixed-step simulation update.
    Sim,
    /// Per-frame view update.
    View,
}

/// Descriptor of a host method or event a node binds to.
///
/// The invocation mechanism belongs to the binding layer; the runtime only
/// carries the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Stable binding name.
    pub name: String,
    /// Whether the binding is static (no object context).
    pub is_static: bool,
    /// Human-readable description.
    pub description: String,
}

/// Control-transfer edge to the next node to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOutput {
    /// Port name.
    pub name: String,
    /// Target node, or [`NodeId::EMPTY`] when unlinked.
    pub target: NodeId,
}

/// Data port resolved onto the stack before the node runs.
///
/// Either a constant, or a reference to another node's stack output.
#[derive(Debug, Clone, PartialEq)]
pub struct StackInput {
    /// Port name.
    pub name: String,
    /// Value kind.
    pub kind: VariableType,
    /// Constant used while the input is unlinked.
    pub constant: VarCell,
    /// Producing node, or [`NodeId::EMPTY`] for a constant input.
    pub source: NodeId,
    /// Stack-output index on the producing node.
    pub source_index: usize,
}

/// Data port produced on demand, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StackOutput {
    /// Port name.
    pub name: String,
    /// Value kind.
    pub kind: VariableType,
}

/// Named constant embedded in a node. Never linked.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeProperty {
    /// Property name.
    pub name: String,
    /// Hidden from inspection UIs.
    pub hidden: bool,
    /// The stored value.
    pub value: VarCell,
}

/// The behavior hook a node executes through.
///
/// Implementations consume their stack inputs (already resolved onto the
/// stack in reverse declaration order), perform their effect, and report
/// how many flow-output indices they pushed.
pub trait NodeBehavior {
    /// Run the node. Returns the number of flow-output indices pushed onto
    /// the stack; flow-control nodes select which outputs to activate.
    fn execute(&self, run: &mut NodeRun<'_>) -> Result<usize, TraversalError>;

    /// Lazily place stack output `index` onto the stack. Invoked by
    /// whichever downstream node references the output.
    fn place_output(
        &self,
        run: &mut NodeRun<'_>,
        kind: VariableType,
        index: usize,
    ) -> Result<(), TraversalError> {
        let _ = kind;
        Err(TraversalError::NoSuchOutput {
            node: run.node,
            index,
        })
    }

    /// Restore behavior-specific state after deserialization.
    fn on_restore(&mut self, entry: &NodeEntry) -> Result<(), RestoreError> {
        let _ = entry;
        Ok(())
    }

    /// The preserved record of a node that failed to load, if this is a
    /// placeholder.
    fn backup_entry(&self) -> Option<&NodeEntry> {
        None
    }

    /// The load error attached to a placeholder node.
    fn restore_error(&self) -> Option<&str> {
        None
    }
}

/// A node instance: declared ports plus its behavior hook.
///
/// Port counts and kinds are fixed after construction, except for nodes
/// marked as having user-defined ports.
pub struct Node {
    type_name: String,
    name: String,
    scope: Scope,
    flow_control: bool,
    has_flow_input: bool,
    user_defined_ports: bool,
    context: ObjectRef,
    binding: Option<Binding>,
    /// Flow outputs, in declaration order.
    pub flow_outputs: Vec<FlowOutput>,
    /// Stack inputs, in declaration order.
    pub stack_inputs: Vec<StackInput>,
    /// Stack outputs, in declaration order.
    pub stack_outputs: Vec<StackOutput>,
    /// Embedded properties.
    pub properties: Vec<NodeProperty>,
    behavior: Box<dyn NodeBehavior>,
}

impl Node {
    /// Create a node with no ports.
    ///
    /// `type_name` is the stable serialized archetype name; it doubles as
    /// the default display name.
    pub fn new(type_name: impl Into<String>, behavior: impl NodeBehavior + 'static) -> Self {
        let type_name = type_name.into();
        Self {
            name: type_name.clone(),
            type_name,
            scope: Scope::Generic,
            flow_control: false,
            has_flow_input: false,
            user_defined_ports: false,
            context: ObjectRef::NULL,
            binding: None,
            flow_outputs: Vec::new(),
            stack_inputs: Vec::new(),
            stack_outputs: Vec::new(),
            properties: Vec::new(),
            behavior: Box::new(behavior),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the execution scope.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Mark the node as flow-control: it must select flow outputs
    /// explicitly and is never default-followed.
    pub fn flow_control(mut self) -> Self {
        self.flow_control = true;
        self
    }

    /// Mark the node as accepting an incoming flow link.
    pub fn with_flow_input(mut self) -> Self {
        self.has_flow_input = true;
        self
    }

    /// Mark the node's port lists as user-defined; the deserializer
    /// rebuilds them from saved data instead of matching positions.
    pub fn with_user_defined_ports(mut self) -> Self {
        self.user_defined_ports = true;
        self
    }

    /// Attach a binding descriptor.
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Declare a flow output.
    pub fn with_flow_output(mut self, name: impl Into<String>) -> Self {
        self.flow_outputs.push(FlowOutput {
            name: name.into(),
            target: NodeId::EMPTY,
        });
        self
    }

    /// Declare a stack input with the default constant for its kind.
    pub fn with_stack_input(mut self, name: impl Into<String>, kind: VariableType) -> Self {
        self.stack_inputs.push(StackInput {
            name: name.into(),
            kind,
            constant: VarCell::new(kind),
            source: NodeId::EMPTY,
            source_index: 0,
        });
        self
    }

    /// Declare a stack output.
    pub fn with_stack_output(mut self, name: impl Into<String>, kind: VariableType) -> Self {
        self.stack_outputs.push(StackOutput {
            name: name.into(),
            kind,
        });
        self
    }

    /// Declare an embedded property.
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.push(NodeProperty {
            name: name.into(),
            hidden: false,
            value: VarCell::with_value(value),
        });
        self
    }

    /// Stable serialized archetype name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Whether the node selects flow outputs explicitly.
    pub fn is_flow_control(&self) -> bool {
        self.flow_control
    }

    /// Whether the node accepts an incoming flow link.
    pub fn has_flow_input(&self) -> bool {
        self.has_flow_input
    }

    /// Whether the node's port lists are user-defined.
    pub fn has_user_defined_ports(&self) -> bool {
        self.user_defined_ports
    }

    /// The host object this node operates on.
    pub fn context(&self) -> ObjectRef {
        self.context
    }

    /// Set the host object this node operates on.
    pub fn set_context(&mut self, context: ObjectRef) {
        self.context = context;
    }

    /// The attached binding descriptor, if any.
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Attach or clear the binding descriptor.
    pub fn set_binding(&mut self, binding: Option<Binding>) {
        self.binding = binding;
    }

    /// The behavior hook.
    pub fn behavior(&self) -> &dyn NodeBehavior {
        self.behavior.as_ref()
    }

    /// Mutable access to the behavior hook.
    pub fn behavior_mut(&mut self) -> &mut dyn NodeBehavior {
        self.behavior.as_mut()
    }

    /// Find a property by name.
    pub fn property(&self, name: &str) -> Option<&NodeProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Null out every link that targets `id`.
    pub fn remove_links_to(&mut self, id: NodeId) {
        for fo in &mut self.flow_outputs {
            if fo.target == id {
                fo.target = NodeId::EMPTY;
            }
        }
        for si in &mut self.stack_inputs {
            if si.source == id {
                si.source = NodeId::EMPTY;
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("flow_outputs", &self.flow_outputs)
            .field("stack_inputs", &self.stack_inputs)
            .field("stack_outputs", &self.stack_outputs)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;

    impl NodeBehavior for Inert {
        fn execute(&self, _run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
            Ok(0)
        }
    }

    #[test]
    fn test_builder_declares_ports() {
        let node = Node::new("Test.Node", Inert)
            .with_flow_input()
            .with_flow_output("out")
            .with_stack_input("value", VariableType::Int)
            .with_stack_output("result", VariableType::Float)
            .with_property("label", Value::String("x".to_string()));

        assert_eq!(node.type_name(), "Test.Node");
        assert!(node.has_flow_input());
        assert_eq!(node.flow_outputs.len(), 1);
        assert!(node.flow_outputs[0].target.is_empty());
        assert_eq!(node.stack_inputs[0].kind, VariableType::Int);
        assert_eq!(node.stack_outputs[0].kind, VariableType::Float);
        assert_eq!(
            node.property("label").map(|p| p.value.value().clone()),
            Some(Value::String("x".to_string()))
        );
    }

    #[test]
    fn test_remove_links_to_nulls_references() {
        let other = NodeId::new();
        let mut node = Node::new("Test.Node", Inert)
            .with_flow_output("out")
            .with_stack_input("value", VariableType::Int);
        node.flow_outputs[0].target = other;
        node.stack_inputs[0].source = other;

        node.remove_links_to(other);
        assert!(node.flow_outputs[0].target.is_empty());
        assert!(node.stack_inputs[0].source.is_empty());
    }

    #[test]
    fn test_empty_id_is_reserved() {
        assert!(NodeId::EMPTY.is_empty());
        assert!(!NodeId::new().is_empty());
    }
}
