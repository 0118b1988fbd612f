// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conversion between a live graph and its flat, versioned record form.
//!
//! Records are plain serde types the host can persist with any format.
//! Loading is corruption-tolerant: a record that fails to restore never
//! aborts the graph load — it is either reset to a default instance or
//! preserved verbatim inside an error placeholder so a later edit/save
//! cycle does not destroy the user's data.

use crate::graph::{Graph, GraphVariable, VariableId};
use crate::node::{Binding, Node, NodeBehavior, NodeId, StackInput, StackOutput};
use crate::registry::NodeRegistry;
use crate::traversal::{NodeRun, TraversalError};
use crate::variable::{ColorRgba, ObjectRef, Quat, Value, VarCell, VariableType, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version written into every serialized graph.
pub const SERIALIZATION_VERSION: u32 = 1;

/// Reserved archetype name of the error placeholder node.
pub const ERROR_NODE_TYPE: &str = "Error";

/// A value in record form. Object references are replaced by guids into
/// the external-object reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SerializedValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// String
    String(String),
    /// 3D vector
    Vector3(Vec3),
    /// Guid into the external-object reference table
    Object(Uuid),
    /// Guid
    Guid(Uuid),
    /// Quaternion
    Quaternion(Quat),
    /// RGBA color
    Color(ColorRgba),
}

/// Flat record form of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    /// Format version.
    pub version: u32,
    /// Graph name.
    pub name: String,
    /// Node records, in graph order.
    pub nodes: Vec<NodeRecord>,
    /// Variable records, in graph order.
    pub variables: Vec<VariableRecord>,
}

/// One node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The node's stable id. The empty id denotes a structural gap and
    /// must carry no payload.
    pub id: NodeId,
    /// The node payload.
    pub entry: NodeEntry,
}

/// Serialized payload of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    /// Stable serialized archetype name.
    pub type_name: String,
    /// Binding descriptor, for nodes that call into the host.
    pub binding: Option<Binding>,
    /// Guid of the node's object context in the reference table, or nil.
    pub target: Uuid,
    /// Embedded properties, matched by name on load.
    pub properties: Vec<PropertyEntry>,
    /// Flow outputs, matched positionally on load.
    pub flow_outputs: Vec<FlowOutputEntry>,
    /// Stack inputs, matched positionally or rebuilt for user-defined
    /// port lists.
    pub stack_inputs: Vec<StackInputEntry>,
    /// Stack outputs.
    pub stack_outputs: Vec<StackOutputEntry>,
}

impl NodeEntry {
    fn is_blank(&self) -> bool {
        self.type_name.is_empty()
            && self.binding.is_none()
            && self.target.is_nil()
            && self.properties.is_empty()
            && self.flow_outputs.is_empty()
            && self.stack_inputs.is_empty()
            && self.stack_outputs.is_empty()
    }
}

/// Serialized embedded property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEntry {
    /// Property name.
    pub name: String,
    /// Value kind.
    pub kind: VariableType,
    /// Stored value.
    pub value: SerializedValue,
}

/// Serialized flow output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowOutputEntry {
    /// Port name.
    pub name: String,
    /// Target node id, or the empty id when unlinked.
    pub target: NodeId,
}

/// Serialized stack input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackInputEntry {
    /// Port name.
    pub name: String,
    /// Value kind.
    pub kind: VariableType,
    /// Constant used while unlinked.
    pub constant: SerializedValue,
    /// Producing node, or the empty id for a constant input.
    pub source: NodeId,
    /// Stack-output index on the producing node.
    pub source_index: usize,
}

/// Serialized stack output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackOutputEntry {
    /// Port name.
    pub name: String,
    /// Value kind.
    pub kind: VariableType,
}

/// One variable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    /// The variable's stable id.
    pub id: VariableId,
    /// The variable payload.
    pub entry: VariableEntry,
}

/// Serialized payload of one graph variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    /// Variable name.
    pub name: String,
    /// Value kind.
    pub kind: VariableType,
    /// Stored value.
    pub value: SerializedValue,
}

/// Sink side of the external-object reference table.
///
/// Opaque host-object references cannot be embedded in records; the
/// serializer asks the context for a guid per referenced object and the
/// host persists the table out of band.
pub trait SerializeContext {
    /// Declare that an object is referenced and get its table guid.
    fn reference_object(&mut self, object: ObjectRef) -> Uuid;
}

/// Source side of the external-object reference table.
pub trait DeserializeContext {
    /// Resolve a table guid back to an object reference.
    fn resolve_object(&self, id: Uuid) -> ObjectRef;
}

/// A ready-made external-object reference table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectRefTable {
    entries: IndexMap<Uuid, ObjectRef>,
}

impl ObjectRefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// All table entries.
    pub fn entries(&self) -> impl Iterator<Item = (Uuid, ObjectRef)> + '_ {
        self.entries.iter().map(|(id, obj)| (*id, *obj))
    }
}

impl SerializeContext for ObjectRefTable {
    fn reference_object(&mut self, object: ObjectRef) -> Uuid {
        if let Some((id, _)) = self.entries.iter().find(|(_, o)| **o == object) {
            return *id;
        }
        let id = Uuid::new_v4();
        self.entries.insert(id, object);
        id
    }
}

impl DeserializeContext for ObjectRefTable {
    fn resolve_object(&self, id: Uuid) -> ObjectRef {
        match self.entries.get(&id) {
            Some(object) => *object,
            None => {
                tracing::warn!("unknown object reference {}; resolving to null", id);
                ObjectRef::NULL
            }
        }
    }
}

/// Error describing why one node record could not be restored.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// The serialized type name matches no registered archetype.
    #[error("failed to find archetype '{0}'")]
    UnknownType(String),

    /// More ports were saved than the archetype declares.
    #[error("{port} count mismatch: archetype declares {declared}, data has {saved}")]
    PortCountMismatch {
        /// Which port list mismatched.
        port: &'static str,
        /// Count the archetype declares.
        declared: usize,
        /// Count found in the data.
        saved: usize,
    },

    /// A saved value's kind does not match the declared port kind.
    #[error("port '{port}' is {declared:?}, data holds {saved:?}")]
    KindMismatch {
        /// Port or property name.
        port: String,
        /// Kind the archetype declares.
        declared: VariableType,
        /// Kind found in the data.
        saved: VariableType,
    },

    /// A saved property matches no declared property.
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    /// The node's behavior hook rejected the record.
    #[error("{0}")]
    Behavior(String),
}

/// Convert a live graph into its flat record form.
pub fn serialize(graph: &Graph, ctx: &mut dyn SerializeContext) -> SerializedGraph {
    let mut nodes = Vec::with_capacity(graph.node_count());
    for (id, node) in graph.nodes() {
        let entry = match node.behavior().backup_entry() {
            // Error placeholders write back the record they preserved.
            Some(backup) => backup.clone(),
            None => node_entry(node, ctx),
        };
        nodes.push(NodeRecord { id, entry });
    }

    let variables = graph
        .variables()
        .map(|(id, variable)| VariableRecord {
            id,
            entry: VariableEntry {
                name: variable.name.clone(),
                kind: variable.kind(),
                value: to_serialized(variable.value.value(), ctx),
            },
        })
        .collect();

    SerializedGraph {
        version: SERIALIZATION_VERSION,
        name: graph.name().to_string(),
        nodes,
        variables,
    }
}

fn node_entry(node: &Node, ctx: &mut dyn SerializeContext) -> NodeEntry {
    let target = if node.context().is_null() {
        Uuid::nil()
    } else {
        ctx.reference_object(node.context())
    };

    NodeEntry {
        type_name: node.type_name().to_string(),
        binding: node.binding().cloned(),
        target,
        properties: node
            .properties
            .iter()
            .map(|p| PropertyEntry {
                name: p.name.clone(),
                kind: p.value.kind(),
                value: to_serialized(p.value.value(), ctx),
            })
            .collect(),
        flow_outputs: node
            .flow_outputs
            .iter()
            .map(|fo| FlowOutputEntry {
                name: fo.name.clone(),
                target: fo.target,
            })
            .collect(),
        stack_inputs: node
            .stack_inputs
            .iter()
            .map(|si| StackInputEntry {
                name: si.name.clone(),
                kind: si.kind,
                constant: to_serialized(si.constant.value(), ctx),
                source: si.source,
                source_index: si.source_index,
            })
            .collect(),
        stack_outputs: node
            .stack_outputs
            .iter()
            .map(|so| StackOutputEntry {
                name: so.name.clone(),
                kind: so.kind,
            })
            .collect(),
    }
}

/// Rebuild a graph from its record form.
///
/// Walks records in order. A node that fails to restore is replaced — by a
/// fresh default instance when its archetype is resettable, otherwise by an
/// error placeholder preserving the record verbatim. The load itself never
/// fails.
pub fn deserialize(
    data: &SerializedGraph,
    registry: &NodeRegistry,
    ctx: &dyn DeserializeContext,
) -> Graph {
    if data.version > SERIALIZATION_VERSION {
        tracing::warn!(
            "graph '{}' was saved with a newer format (version {}, supported {})",
            data.name,
            data.version,
            SERIALIZATION_VERSION
        );
    }

    let mut graph = Graph::new(data.name.clone());

    for record in &data.variables {
        graph.insert_variable_with_id(
            record.id,
            GraphVariable {
                name: record.entry.name.clone(),
                value: VarCell::with_value(from_serialized(&record.entry.value, ctx)),
            },
        );
    }

    for record in &data.nodes {
        if record.id.is_empty() {
            // Structural gap, e.g. a prefab-override slot.
            if !record.entry.is_blank() {
                tracing::error!(
                    "node record with an empty guid carries data ('{}'); record dropped",
                    record.entry.type_name
                );
            }
            continue;
        }

        let node = match restore_node(&record.entry, registry, ctx) {
            Ok(node) => node,
            Err(err) => {
                tracing::error!("failed to restore node '{}': {}", record.entry.type_name, err);
                match registry.get(&record.entry.type_name) {
                    Some(template) if template.is_resettable() => {
                        tracing::warn!("node '{}' will be reset", record.entry.type_name);
                        template.instantiate()
                    }
                    _ => {
                        tracing::warn!(
                            "node '{}' will be replaced by an internal error node",
                            record.entry.type_name
                        );
                        error_node(record.entry.clone(), err.to_string())
                    }
                }
            }
        };
        graph.insert_node_with_id(record.id, node);
    }

    graph
}

fn restore_node(
    entry: &NodeEntry,
    registry: &NodeRegistry,
    ctx: &dyn DeserializeContext,
) -> Result<Node, RestoreError> {
    let template = registry
        .get(&entry.type_name)
        .ok_or_else(|| RestoreError::UnknownType(entry.type_name.clone()))?;
    let mut node = template.instantiate();

    if !entry.target.is_nil() {
        node.set_context(ctx.resolve_object(entry.target));
    }
    if entry.binding.is_some() {
        node.set_binding(entry.binding.clone());
    }

    // Flow outputs match positionally.
    if entry.flow_outputs.len() > node.flow_outputs.len() {
        return Err(RestoreError::PortCountMismatch {
            port: "flow output",
            declared: node.flow_outputs.len(),
            saved: entry.flow_outputs.len(),
        });
    }
    for (index, saved) in entry.flow_outputs.iter().enumerate() {
        let fo = &mut node.flow_outputs[index];
        if fo.name != saved.name {
            tracing::warn!(
                "node '{}' flow output name mismatch: expected '{}', deserialized '{}'",
                entry.type_name,
                fo.name,
                saved.name
            );
        }
        fo.target = saved.target;
    }

    if node.has_user_defined_ports() {
        // Port lists are not stable; rebuild them from the saved data,
        // keyed by the declared names.
        node.stack_inputs = entry
            .stack_inputs
            .iter()
            .map(|saved| {
                let constant = from_serialized(&saved.constant, ctx);
                if constant.kind() != saved.kind {
                    return Err(RestoreError::KindMismatch {
                        port: saved.name.clone(),
                        declared: saved.kind,
                        saved: constant.kind(),
                    });
                }
                Ok(StackInput {
                    name: saved.name.clone(),
                    kind: saved.kind,
                    constant: VarCell::with_value(constant),
                    source: saved.source,
                    source_index: saved.source_index,
                })
            })
            .collect::<Result<_, _>>()?;
        node.stack_outputs = entry
            .stack_outputs
            .iter()
            .map(|saved| StackOutput {
                name: saved.name.clone(),
                kind: saved.kind,
            })
            .collect();
    } else {
        if entry.stack_inputs.len() > node.stack_inputs.len() {
            return Err(RestoreError::PortCountMismatch {
                port: "stack input",
                declared: node.stack_inputs.len(),
                saved: entry.stack_inputs.len(),
            });
        }
        for (index, saved) in entry.stack_inputs.iter().enumerate() {
            let si = &mut node.stack_inputs[index];
            if si.name != saved.name {
                tracing::warn!(
                    "node '{}' stack input name mismatch: expected '{}', deserialized '{}'",
                    entry.type_name,
                    si.name,
                    saved.name
                );
            }
            let constant = from_serialized(&saved.constant, ctx);
            if constant.kind() != si.kind {
                return Err(RestoreError::KindMismatch {
                    port: si.name.clone(),
                    declared: si.kind,
                    saved: constant.kind(),
                });
            }
            si.constant.set(constant);
            si.source = saved.source;
            si.source_index = saved.source_index;
        }
    }

    // Properties match by name.
    for saved in &entry.properties {
        let value = from_serialized(&saved.value, ctx);
        let property = node
            .properties
            .iter_mut()
            .find(|p| p.name == saved.name)
            .ok_or_else(|| RestoreError::UnknownProperty(saved.name.clone()))?;
        if value.kind() != property.value.kind() {
            return Err(RestoreError::KindMismatch {
                port: saved.name.clone(),
                declared: property.value.kind(),
                saved: value.kind(),
            });
        }
        property.value.set(value);
    }

    node.behavior_mut().on_restore(entry)?;
    Ok(node)
}

fn to_serialized(value: &Value, ctx: &mut dyn SerializeContext) -> SerializedValue {
    match value {
        Value::Bool(v) => SerializedValue::Bool(*v),
        Value::Int(v) => SerializedValue::Int(*v),
        Value::Float(v) => SerializedValue::Float(*v),
        Value::String(v) => SerializedValue::String(v.clone()),
        Value::Vector3(v) => SerializedValue::Vector3(*v),
        Value::Object(v) => SerializedValue::Object(if v.is_null() {
            Uuid::nil()
        } else {
            ctx.reference_object(*v)
        }),
        Value::Guid(v) => SerializedValue::Guid(*v),
        Value::Quaternion(v) => SerializedValue::Quaternion(*v),
        Value::Color(v) => SerializedValue::Color(*v),
    }
}

fn from_serialized(value: &SerializedValue, ctx: &dyn DeserializeContext) -> Value {
    match value {
        SerializedValue::Bool(v) => Value::Bool(*v),
        SerializedValue::Int(v) => Value::Int(*v),
        SerializedValue::Float(v) => Value::Float(*v),
        SerializedValue::String(v) => Value::String(v.clone()),
        SerializedValue::Vector3(v) => Value::Vector3(*v),
        SerializedValue::Object(id) => Value::Object(if id.is_nil() {
            ObjectRef::NULL
        } else {
            ctx.resolve_object(*id)
        }),
        SerializedValue::Guid(v) => Value::Guid(*v),
        SerializedValue::Quaternion(v) => Value::Quaternion(*v),
        SerializedValue::Color(v) => Value::Color(*v),
    }
}

struct ErrorBehavior {
    backup: NodeEntry,
    message: String,
}

impl NodeBehavior for ErrorBehavior {
    fn execute(&self, _run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        Err(TraversalError::ErrorNode {
            message: self.message.clone(),
        })
    }

    fn backup_entry(&self) -> Option<&NodeEntry> {
        Some(&self.backup)
    }

    fn restore_error(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Build the placeholder node that preserves an unloadable record.
pub fn error_node(backup: NodeEntry, message: String) -> Node {
    let name = format!("Error ({})", backup.type_name);
    Node::new(ERROR_NODE_TYPE, ErrorBehavior { backup, message }).with_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serializable_registry, wired_test_graph};
    use crate::traversal::Settings;

    #[test]
    fn test_round_trip_preserves_records() {
        let (graph, _) = wired_test_graph();
        let mut table = ObjectRefTable::new();
        let registry = serializable_registry();

        let first = serialize(&graph, &mut table);
        let restored = deserialize(&first, &registry, &table);
        assert_eq!(restored.node_count(), graph.node_count());

        let mut table2 = table.clone();
        let second = serialize(&restored, &mut table2);
        assert_eq!(first, second);
        assert_eq!(table, table2);
    }

    #[test]
    fn test_round_trip_preserves_links_and_constants() {
        let (graph, ids) = wired_test_graph();
        let mut table = ObjectRefTable::new();
        let registry = serializable_registry();

        let records = serialize(&graph, &mut table);
        let restored = deserialize(&records, &registry, &table);

        let b = restored.node(ids.add_one).unwrap();
        assert_eq!(b.stack_inputs[0].source, ids.pass_through);
        assert_eq!(b.stack_inputs[0].source_index, 0);

        let a = restored.node(ids.pass_through).unwrap();
        assert_eq!(a.flow_outputs[0].target, ids.add_one);
        assert_eq!(a.stack_inputs[0].constant.get_as::<i32>(), 5);
        assert_eq!(a.context(), ObjectRef(42));

        let resettable = restored.node(ids.resettable).unwrap();
        assert_eq!(
            resettable.property("label").map(|p| p.value.value().clone()),
            Some(Value::String("saved".to_string()))
        );

        let (_, variable) = restored.variables().next().unwrap();
        assert_eq!(variable.name, "speed");
        assert_eq!(variable.value.get_as::<f32>(), 2.5);
    }

    #[test]
    fn test_round_trip_survives_text_form() {
        let (graph, _) = wired_test_graph();
        let mut table = ObjectRefTable::new();

        let records = serialize(&graph, &mut table);
        let text = ron::ser::to_string_pretty(&records, ron::ser::PrettyConfig::default()).unwrap();
        let parsed: SerializedGraph = ron::from_str(&text).unwrap();
        assert_eq!(records, parsed);
    }

    #[test]
    fn test_unknown_type_becomes_error_node() {
        let (graph, ids) = wired_test_graph();
        let mut table = ObjectRefTable::new();
        let registry = serializable_registry();

        let mut records = serialize(&graph, &mut table);
        let record = records
            .nodes
            .iter_mut()
            .find(|r| r.id == ids.add_one)
            .unwrap();
        record.entry.type_name = "Test.Missing".to_string();
        let original_entry = record.entry.clone();

        let restored = deserialize(&records, &registry, &table);
        assert_eq!(restored.node_count(), graph.node_count());

        let placeholder = restored.node(ids.add_one).unwrap();
        assert_eq!(placeholder.type_name(), ERROR_NODE_TYPE);
        assert_eq!(placeholder.behavior().backup_entry(), Some(&original_entry));
        assert!(placeholder.behavior().restore_error().is_some());

        // The preserved record survives the next save byte for byte.
        let mut table2 = table.clone();
        let resaved = serialize(&restored, &mut table2);
        let resaved_record = resaved.nodes.iter().find(|r| r.id == ids.add_one).unwrap();
        assert_eq!(resaved_record.entry, original_entry);
    }

    #[test]
    fn test_error_node_refuses_to_execute() {
        let (graph, ids) = wired_test_graph();
        let mut table = ObjectRefTable::new();
        let registry = serializable_registry();

        let mut records = serialize(&graph, &mut table);
        for record in &mut records.nodes {
            if record.id == ids.pass_through {
                record.entry.type_name = "Test.Missing".to_string();
            }
        }
        let restored = deserialize(&records, &registry, &table);

        let mut state = crate::traversal::RuntimeState::default();
        let mut ctx = crate::context::ExecutionContext::new(&Settings::default());
        let result = crate::traversal::traverse(
            &restored,
            &mut state,
            &mut ctx,
            ids.pass_through,
            crate::node::Scope::Sim,
        );
        assert!(matches!(result, Err(TraversalError::ErrorNode { .. })));
    }

    #[test]
    fn test_resettable_archetype_resets_on_corrupt_record() {
        let (graph, ids) = wired_test_graph();
        let mut table = ObjectRefTable::new();
        let registry = serializable_registry();

        let mut records = serialize(&graph, &mut table);
        let record = records
            .nodes
            .iter_mut()
            .find(|r| r.id == ids.resettable)
            .unwrap();
        // A property nothing declares makes the record unrestorable.
        record.entry.properties.push(PropertyEntry {
            name: "bogus".to_string(),
            kind: VariableType::Int,
            value: SerializedValue::Int(1),
        });

        let restored = deserialize(&records, &registry, &table);
        let reset = restored.node(ids.resettable).unwrap();
        assert_eq!(reset.type_name(), "Test.Resettable");
        // Fresh default instance: the saved constant and property are gone.
        assert_eq!(reset.stack_inputs[0].constant.get_as::<i32>(), 0);
        assert_eq!(
            reset.property("label").map(|p| p.value.get_as::<String>()),
            Some("default".to_string())
        );
    }

    #[test]
    fn test_empty_guid_records_are_gaps() {
        let (graph, _) = wired_test_graph();
        let mut table = ObjectRefTable::new();
        let registry = serializable_registry();

        let mut records = serialize(&graph, &mut table);
        let node_count = graph.node_count();
        // A blank gap record, and a corrupt one carrying a payload.
        records.nodes.push(NodeRecord {
            id: NodeId::EMPTY,
            entry: NodeEntry {
                type_name: String::new(),
                binding: None,
                target: Uuid::nil(),
                properties: vec![],
                flow_outputs: vec![],
                stack_inputs: vec![],
                stack_outputs: vec![],
            },
        });
        records.nodes.push(NodeRecord {
            id: NodeId::EMPTY,
            entry: NodeEntry {
                type_name: "Test.AddOne".to_string(),
                binding: None,
                target: Uuid::nil(),
                properties: vec![],
                flow_outputs: vec![],
                stack_inputs: vec![],
                stack_outputs: vec![],
            },
        });

        let restored = deserialize(&records, &registry, &table);
        assert_eq!(restored.node_count(), node_count);
    }

    #[test]
    fn test_user_defined_ports_rebuild_from_data() {
        let registry = serializable_registry();
        let mut graph = Graph::new("custom");
        let mut node = registry.instantiate("Test.Custom").unwrap();
        node.stack_inputs.push(StackInput {
            name: "arg1".to_string(),
            kind: VariableType::Int,
            constant: VarCell::with_value(Value::Int(13)),
            source: NodeId::EMPTY,
            source_index: 0,
        });
        node.stack_outputs.push(StackOutput {
            name: "out1".to_string(),
            kind: VariableType::Bool,
        });
        let id = graph.add_node(node);

        let mut table = ObjectRefTable::new();
        let records = serialize(&graph, &mut table);
        let restored = deserialize(&records, &registry, &table);

        let custom = restored.node(id).unwrap();
        assert_eq!(custom.stack_inputs.len(), 1);
        assert_eq!(custom.stack_inputs[0].name, "arg1");
        assert_eq!(custom.stack_inputs[0].constant.get_as::<i32>(), 13);
        assert_eq!(custom.stack_outputs.len(), 1);
        assert_eq!(custom.stack_outputs[0].name, "out1");
    }

    #[test]
    fn test_object_table_round_trips_references() {
        let mut table = ObjectRefTable::new();
        let id_a = table.reference_object(ObjectRef(7));
        let id_b = table.reference_object(ObjectRef(9));
        assert_ne!(id_a, id_b);
        // Referencing the same object twice reuses its guid.
        assert_eq!(table.reference_object(ObjectRef(7)), id_a);

        assert_eq!(table.resolve_object(id_a), ObjectRef(7));
        assert_eq!(table.resolve_object(id_b), ObjectRef(9));
        assert_eq!(table.resolve_object(Uuid::new_v4()), ObjectRef::NULL);
    }
}
