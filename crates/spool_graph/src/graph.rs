// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure owning nodes and variables.

use crate::node::{Binding, Node, NodeId, Scope};
use crate::registry::NodeTemplate;
use crate::traversal::Settings;
use crate::variable::{ObjectRef, VarCell, VariableType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub Uuid);

impl GraphId {
    /// Create a new random graph ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a graph variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId(pub Uuid);

impl VariableId {
    /// Create a new random variable ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VariableId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named, typed value persisted with the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphVariable {
    /// Variable name.
    pub name: String,
    /// The stored value.
    pub value: VarCell,
}

impl GraphVariable {
    /// The variable's value kind.
    pub fn kind(&self) -> VariableType {
        self.value.kind()
    }
}

/// An owning collection of nodes and variables, keyed by stable ids.
///
/// Mutating a graph while a traversal over it is in flight is not
/// supported.
#[derive(Debug)]
pub struct Graph {
    id: GraphId,
    name: String,
    nodes: IndexMap<NodeId, Node>,
    variables: IndexMap<VariableId, GraphVariable>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GraphId::new(),
            name: name.into(),
            nodes: IndexMap::new(),
            variables: IndexMap::new(),
        }
    }

    /// The graph's id.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// The graph's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Add a node under a fresh id.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::new();
        self.insert_node_with_id(id, node);
        id
    }

    pub(crate) fn insert_node_with_id(&mut self, id: NodeId, node: Node) {
        assert!(!id.is_empty(), "the empty id must never key a real node");
        assert!(
            !self.nodes.contains_key(&id),
            "adding node with a duplicate id: {:?}",
            id
        );
        self.nodes.insert(id, node);
    }

    /// Instantiate a template and register the node under a fresh id.
    ///
    /// Validates that a static binding is not paired with an object
    /// context.
    pub fn create_node(
        &mut self,
        template: &NodeTemplate,
        context: ObjectRef,
        binding: Option<Binding>,
    ) -> Result<NodeId, GraphError> {
        if let Some(binding) = &binding {
            if binding.is_static && !context.is_null() {
                return Err(GraphError::StaticBindingWithContext {
                    binding: binding.name.clone(),
                });
            }
        }
        let mut node = template.instantiate();
        node.set_context(context);
        if binding.is_some() {
            node.set_binding(binding);
        }
        Ok(self.add_node(node))
    }

    /// Remove a node, nulling out every flow-output and stack-input link
    /// elsewhere in the graph that targeted it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        // shift_remove keeps insertion order, which serialization relies on
        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        for other in self.nodes.values_mut() {
            other.remove_links_to(id);
        }
        Ok(node)
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes with their ids, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// All node ids, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate a new variable under a fresh id.
    pub fn add_variable(&mut self, name: impl Into<String>, kind: VariableType) -> VariableId {
        let id = VariableId::new();
        self.insert_variable_with_id(
            id,
            GraphVariable {
                name: name.into(),
                value: VarCell::new(kind),
            },
        );
        id
    }

    pub(crate) fn insert_variable_with_id(&mut self, id: VariableId, variable: GraphVariable) {
        assert!(
            !self.variables.contains_key(&id),
            "adding variable with a duplicate id: {:?}",
            id
        );
        self.variables.insert(id, variable);
    }

    /// Remove a variable.
    pub fn remove_variable(&mut self, id: VariableId) -> Result<GraphVariable, GraphError> {
        self.variables
            .shift_remove(&id)
            .ok_or(GraphError::VariableNotFound(id))
    }

    /// Get a variable by id.
    pub fn variable(&self, id: VariableId) -> Option<&GraphVariable> {
        self.variables.get(&id)
    }

    /// Get a mutable variable by id.
    pub fn variable_mut(&mut self, id: VariableId) -> Option<&mut GraphVariable> {
        self.variables.get_mut(&id)
    }

    /// All variables with their ids, in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &GraphVariable)> {
        self.variables.iter().map(|(id, var)| (*id, var))
    }

    /// Link flow output `output` of `from` to `to`.
    ///
    /// Validates that both nodes exist, the port is in range, the target
    /// accepts flow, and (when scope checking is enabled) that the two
    /// connected subgraphs agree on a scope.
    pub fn connect_flow(
        &mut self,
        from: NodeId,
        output: usize,
        to: NodeId,
        settings: &Settings,
    ) -> Result<(), ConnectError> {
        let from_node = self.node(from).ok_or(ConnectError::NodeNotFound(from))?;
        if output >= from_node.flow_outputs.len() {
            return Err(ConnectError::PortOutOfRange {
                node: from,
                index: output,
            });
        }
        let to_node = self.node(to).ok_or(ConnectError::NodeNotFound(to))?;
        if !to_node.has_flow_input() {
            return Err(ConnectError::NoFlowInput(to));
        }
        if settings.enforce_scopes {
            self.check_scope_link(from, to)?;
        }
        if let Some(node) = self.nodes.get_mut(&from) {
            node.flow_outputs[output].target = to;
        }
        Ok(())
    }

    /// Unlink flow output `output` of `from`.
    pub fn disconnect_flow(&mut self, from: NodeId, output: usize) -> Result<(), ConnectError> {
        let node = self
            .nodes
            .get_mut(&from)
            .ok_or(ConnectError::NodeNotFound(from))?;
        let fo = node
            .flow_outputs
            .get_mut(output)
            .ok_or(ConnectError::PortOutOfRange {
                node: from,
                index: output,
            })?;
        fo.target = NodeId::EMPTY;
        Ok(())
    }

    /// Link stack input `input` of `to` to stack output `output` of
    /// `from`.
    ///
    /// Validates existence, port ranges, matching value kinds, and (when
    /// scope checking is enabled) subgraph scope agreement.
    pub fn connect_stack(
        &mut self,
        to: NodeId,
        input: usize,
        from: NodeId,
        output: usize,
        settings: &Settings,
    ) -> Result<(), ConnectError> {
        let from_node = self.node(from).ok_or(ConnectError::NodeNotFound(from))?;
        let out = from_node
            .stack_outputs
            .get(output)
            .ok_or(ConnectError::PortOutOfRange {
                node: from,
                index: output,
            })?;
        let to_node = self.node(to).ok_or(ConnectError::NodeNotFound(to))?;
        let inp = to_node
            .stack_inputs
            .get(input)
            .ok_or(ConnectError::PortOutOfRange {
                node: to,
                index: input,
            })?;
        if inp.kind != out.kind {
            return Err(ConnectError::TypeMismatch {
                expected: inp.kind,
                found: out.kind,
            });
        }
        if settings.enforce_scopes {
            self.check_scope_link(from, to)?;
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.stack_inputs[input].source = from;
            node.stack_inputs[input].source_index = output;
        }
        Ok(())
    }

    /// Unlink stack input `input` of `to`, reverting it to its constant.
    pub fn disconnect_stack(&mut self, to: NodeId, input: usize) -> Result<(), ConnectError> {
        let node = self
            .nodes
            .get_mut(&to)
            .ok_or(ConnectError::NodeNotFound(to))?;
        let si = node
            .stack_inputs
            .get_mut(input)
            .ok_or(ConnectError::PortOutOfRange {
                node: to,
                index: input,
            })?;
        si.source = NodeId::EMPTY;
        si.source_index = 0;
        Ok(())
    }

    /// Reject a link whose two sides sit in conflicting scopes.
    ///
    /// From each endpoint, finds the first non-generic node reachable
    /// through existing links (in either direction); the link is invalid
    /// when both sides resolve to different scopes.
    fn check_scope_link(&self, from: NodeId, to: NodeId) -> Result<(), ConnectError> {
        let mut visited = Vec::with_capacity(64);
        let Some((from_id, from_scope)) = self.find_scoped_node(from, &mut visited) else {
            return Ok(());
        };
        visited.clear();
        let Some((to_id, to_scope)) = self.find_scoped_node(to, &mut visited) else {
            return Ok(());
        };
        if from_scope == to_scope {
            return Ok(());
        }
        let name_of = |id: NodeId| {
            self.node(id)
                .map(|n| n.name().to_string())
                .unwrap_or_default()
        };
        Err(ConnectError::ScopeConflict {
            from: name_of(from_id),
            from_scope,
            to: name_of(to_id),
            to_scope,
        })
    }

    /// Walk the connected subgraph around `start` and return the first
    /// node with a non-generic scope.
    pub fn find_scoped_node(
        &self,
        start: NodeId,
        visited: &mut Vec<NodeId>,
    ) -> Option<(NodeId, Scope)> {
        if start.is_empty() || visited.contains(&start) {
            return None;
        }
        visited.push(start);

        let node = self.node(start)?;
        if node.scope() != Scope::Generic {
            return Some((start, node.scope()));
        }

        // Outgoing links.
        for fo in &node.flow_outputs {
            if let Some(found) = self.find_scoped_node(fo.target, visited) {
                return Some(found);
            }
        }
        for si in &node.stack_inputs {
            if let Some(found) = self.find_scoped_node(si.source, visited) {
                return Some(found);
            }
        }

        // Incoming links.
        let incoming: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, other)| {
                !visited.contains(id)
                    && (other.flow_outputs.iter().any(|fo| fo.target == start)
                        || other.stack_inputs.iter().any(|si| si.source == start))
            })
            .map(|(id, _)| *id)
            .collect();
        for id in incoming {
            if let Some(found) = self.find_scoped_node(id, visited) {
                return Some(found);
            }
        }

        None
    }
}

/// Error for node and variable management.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found.
    #[error("could not find node {0:?}")]
    NodeNotFound(NodeId),

    /// Variable not found.
    #[error("could not find variable {0:?}")]
    VariableNotFound(VariableId),

    /// A static binding was paired with an object context.
    #[error("adding static binding '{binding}' with an object context")]
    StaticBindingWithContext {
        /// Binding name.
        binding: String,
    },
}

/// Error when creating a link between two ports.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Node not found.
    #[error("could not find node {0:?}")]
    NodeNotFound(NodeId),

    /// Port index out of range.
    #[error("port index {index} out of range on node {node:?}")]
    PortOutOfRange {
        /// Node owning the port.
        node: NodeId,
        /// Offending port index.
        index: usize,
    },

    /// Flow link target has no flow input.
    #[error("node {0:?} does not accept flow links")]
    NoFlowInput(NodeId),

    /// Data kinds of the two ports differ.
    #[error("incompatible port kinds: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Kind declared by the input port.
        expected: VariableType,
        /// Kind declared by the output port.
        found: VariableType,
    },

    /// The two connected subgraphs resolve to different scopes.
    #[error("'{from}' is in {from_scope:?} scope, but '{to}' is in {to_scope:?} scope")]
    ScopeConflict {
        /// Name of the scoped node on the source side.
        from: String,
        /// Its scope.
        from_scope: Scope,
        /// Name of the scoped node on the target side.
        to: String,
        /// Its scope.
        to_scope: Scope,
    },
}
