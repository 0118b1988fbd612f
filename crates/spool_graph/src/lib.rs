// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph execution runtime for Spool.
//!
//! A graph of typed nodes connected by flow (control) and stack (data)
//! links, executed by a depth-first traversal over a pooled operand
//! stack, with a guid-addressed serialization format that tolerates
//! corrupted or stale data.
//!
//! ## Architecture
//!
//! - [`variable`] / [`pool`] — typed values, fixed-capacity pools, handles
//! - [`stack`] — the operand stack values travel through
//! - [`node`] / [`graph`] — the node model and the owning collection
//! - [`context`] / [`traversal`] — call frames, scope enforcement, and the
//!   depth-first engine
//! - [`registry`] / [`serialization`] — archetype factories and the
//!   corruption-tolerant codec
//!
//! The host owns a [`RuntimeState`] and one [`ExecutionContext`] per
//! traversal, and drives execution through [`traverse`].

pub mod context;
pub mod graph;
pub mod node;
pub mod pool;
pub mod registry;
pub mod serialization;
pub mod stack;
pub mod traversal;
pub mod variable;

#[cfg(test)]
mod testing;

pub use context::{ExecutionContext, StackFrame};
pub use graph::{ConnectError, Graph, GraphError, GraphId, GraphVariable, VariableId};
pub use node::{Binding, Node, NodeBehavior, NodeId, Scope};
pub use pool::{VarHandle, VarPools};
pub use registry::{NodeRegistry, NodeTemplate};
pub use serialization::{deserialize, serialize, ObjectRefTable, SerializedGraph};
pub use stack::OperandStack;
pub use traversal::{traverse, NodeRun, RuntimeState, Settings, TraversalError};
pub use variable::{Value, VariableType};
