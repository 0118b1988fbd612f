// SPDX-License-Identifier: MIT OR Apache-2.0
//! Depth-first traversal over flow links.
//!
//! The engine pushes a frame per node, resolves the node's stack inputs
//! onto the operand stack, runs the behavior hook, follows the selected
//! flow outputs, and unwinds the frame. Errors propagate to the outermost
//! [`traverse`] call, which logs them and restores the context so sibling
//! traversals are unaffected.

use crate::context::ExecutionContext;
use crate::graph::Graph;
use crate::node::{Node, NodeId, Scope};
use crate::pool::VarPools;
use crate::variable::VariableType;

/// Runtime configuration for pools and traversal.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Per-kind value pool capacity.
    pub pool_capacity: usize,
    /// Whether execution scopes are enforced during traversal and
    /// connection validation.
    pub enforce_scopes: bool,
    /// Maximum flow-chain depth before a traversal is aborted.
    pub max_depth: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pool_capacity: VarPools::DEFAULT_CAPACITY,
            enforce_scopes: true,
            max_depth: 256,
        }
    }
}

/// Shared runtime state: the value pools and the settings they were built
/// from.
///
/// Owned by whatever constructs the graph subsystem and passed by
/// reference into the stack and traversal APIs.
#[derive(Debug)]
pub struct RuntimeState {
    /// The value pools backing every operand stack.
    pub pools: VarPools,
    /// Runtime configuration.
    pub settings: Settings,
}

impl RuntimeState {
    /// Create runtime state from settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            pools: VarPools::new(settings.pool_capacity),
            settings,
        }
    }

    /// Reinitialize the pools, dropping every allocated slot. Any handle
    /// issued before the reset becomes foreign.
    pub fn reset(&mut self) {
        self.pools = VarPools::new(self.settings.pool_capacity);
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

/// Error raised while traversing a graph.
///
/// Any of these aborts the traversal that raised it; independent
/// traversals are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    /// A link referenced a node the graph does not contain.
    #[error("could not find node {0:?}")]
    NodeNotFound(NodeId),

    /// The context scope was changed while frames were active.
    #[error("execution scope can't change from {current:?} to {requested:?} with stack frames present")]
    ScopeChange {
        /// Scope the context is in.
        current: Scope,
        /// Scope that was requested.
        requested: Scope,
    },

    /// A node's scope conflicts with the context scope.
    #[error("execution context was in {current:?} scope, however the next node '{node}' is in {requested:?} scope")]
    ScopeViolation {
        /// Scope the context is in.
        current: Scope,
        /// Display name of the offending node.
        node: String,
        /// The node's scope.
        requested: Scope,
    },

    /// The flow chain exceeded the configured depth limit.
    #[error("graph too deep at node {node:?} (limit {limit})")]
    GraphTooDeep {
        /// Node at which the limit was hit.
        node: NodeId,
        /// The configured limit.
        limit: u32,
    },

    /// A behavior selected a flow-output index its node does not declare.
    #[error("flow output index {index} out of range on node '{node}'")]
    FlowIndexOutOfRange {
        /// Display name of the node.
        node: String,
        /// The selected index.
        index: i32,
    },

    /// An output was pulled from a node without a live frame.
    #[error("node {0:?} is not on the call stack of the current execution context")]
    NotOnCallStack(NodeId),

    /// An output index beyond the node's declared outputs was pulled.
    #[error("node {node:?} has no stack output {index}")]
    NoSuchOutput {
        /// The producing node.
        node: NodeId,
        /// The requested output index.
        index: usize,
    },

    /// A pulled output's kind does not match the link.
    #[error("stack output {index} of node {node:?} is {found:?}, expected {expected:?}")]
    OutputTypeMismatch {
        /// The producing node.
        node: NodeId,
        /// The requested output index.
        index: usize,
        /// Kind the link expects.
        expected: VariableType,
        /// Kind the output produced.
        found: VariableType,
    },

    /// A pure data node selected a flow output.
    #[error("data node {0:?} selected a flow output")]
    DataNodeSelectedFlow(NodeId),

    /// An entry node's arguments were not on the stack.
    #[error("entry node {0:?} arguments are missing from the stack")]
    EntryArgumentsMissing(NodeId),

    /// A placeholder for a node that failed to deserialize was executed.
    #[error("executed a placeholder for a node that failed to load: {message}")]
    ErrorNode {
        /// The load error preserved on the placeholder.
        message: String,
    },

    /// Failure raised by a node behavior.
    #[error("{0}")]
    Node(String),
}

/// Everything a behavior hook can reach while running.
pub struct NodeRun<'a> {
    /// The graph being traversed.
    pub graph: &'a Graph,
    /// The traversal's execution context.
    pub ctx: &'a mut ExecutionContext,
    /// The value pools backing the operand stack.
    pub pools: &'a mut VarPools,
    /// Runtime configuration.
    pub settings: &'a Settings,
    /// Id of the node the hook belongs to.
    pub node: NodeId,
    /// Current flow-chain depth.
    pub depth: u32,
}

impl NodeRun<'_> {
    /// The node the hook belongs to.
    pub fn node_data(&self) -> Result<&Node, TraversalError> {
        self.graph
            .node(self.node)
            .ok_or(TraversalError::NodeNotFound(self.node))
    }
}

/// Execute the flow graph starting at `entry`, in `scope`.
///
/// This is the sole execution entry point for event dispatch. Errors are
/// caught here, logged, and the context is unwound to its pre-call frame
/// and stack heights before the error is returned; traversals for other
/// listeners are unaffected.
pub fn traverse(
    graph: &Graph,
    state: &mut RuntimeState,
    ctx: &mut ExecutionContext,
    entry: NodeId,
    scope: Scope,
) -> Result<(), TraversalError> {
    let frames_before = ctx.frame_count();
    let stack_before = ctx.stack().len();

    let result = match ctx.set_scope(scope) {
        Ok(()) => traverse_node(graph, &mut state.pools, &state.settings, ctx, entry, 0),
        Err(err) => Err(err),
    };

    if let Err(err) = &result {
        tracing::error!("graph '{}' traversal aborted: {}", graph.name(), err);
        while ctx.frame_count() > frames_before {
            ctx.pop_frame(&mut state.pools);
        }
        while ctx.stack().len() > stack_before {
            ctx.stack_mut().pop_discard(&mut state.pools);
        }
    }
    result
}

/// Continue a traversal inside an existing context.
///
/// For behaviors that re-enter the engine (for example a node that calls
/// a custom event elsewhere in the graph). Unlike [`traverse`] this does
/// not set the scope and does not unwind on failure; the error surfaces
/// to the enclosing [`traverse`] call, which does.
pub fn traverse_with_context(
    graph: &Graph,
    pools: &mut VarPools,
    settings: &Settings,
    ctx: &mut ExecutionContext,
    entry: NodeId,
) -> Result<(), TraversalError> {
    traverse_node(graph, pools, settings, ctx, entry, 0)
}

fn traverse_node(
    graph: &Graph,
    pools: &mut VarPools,
    settings: &Settings,
    ctx: &mut ExecutionContext,
    id: NodeId,
    depth: u32,
) -> Result<(), TraversalError> {
    if depth >= settings.max_depth {
        return Err(TraversalError::GraphTooDeep {
            node: id,
            limit: settings.max_depth,
        });
    }

    let flows = execute_node(graph, pools, settings, ctx, id, depth)?;
    let node = graph.node(id).ok_or(TraversalError::NodeNotFound(id))?;

    for _ in 0..flows {
        let index = ctx.stack_mut().pop::<i32>(pools);
        let output = usize::try_from(index)
            .ok()
            .and_then(|i| node.flow_outputs.get(i))
            .ok_or_else(|| TraversalError::FlowIndexOutOfRange {
                node: node.name().to_string(),
                index,
            })?;
        if !output.target.is_empty() {
            traverse_node(graph, pools, settings, ctx, output.target, depth + 1)?;
        }
    }

    // A plain node that selected nothing follows its only flow output by
    // default; flow-control nodes never do.
    if flows == 0 && !node.is_flow_control() && node.flow_outputs.len() == 1 {
        let target = node.flow_outputs[0].target;
        if !target.is_empty() {
            traverse_node(graph, pools, settings, ctx, target, depth + 1)?;
        }
    }

    ctx.pop_frame(pools);
    Ok(())
}

/// Push a frame for `id`, resolve its stack inputs, and run its behavior.
///
/// The frame is left on the call stack for the caller to pop. Stack inputs
/// are resolved in reverse declaration order so values land on the stack
/// in declaration order.
fn execute_node(
    graph: &Graph,
    pools: &mut VarPools,
    settings: &Settings,
    ctx: &mut ExecutionContext,
    id: NodeId,
    depth: u32,
) -> Result<usize, TraversalError> {
    let node = graph.node(id).ok_or(TraversalError::NodeNotFound(id))?;
    ctx.push_frame(graph, id)?;

    for si in node.stack_inputs.iter().rev() {
        if si.source.is_empty() {
            ctx.stack_mut().push_value(pools, si.constant.value());
        } else {
            let producer = graph
                .node(si.source)
                .ok_or(TraversalError::NodeNotFound(si.source))?;
            let mut run = NodeRun {
                graph,
                ctx: &mut *ctx,
                pools: &mut *pools,
                settings,
                node: si.source,
                depth,
            };
            producer
                .behavior()
                .place_output(&mut run, si.kind, si.source_index)?;
        }
    }

    let mut run = NodeRun {
        graph,
        ctx,
        pools,
        settings,
        node: id,
        depth,
    };
    node.behavior().execute(&mut run)
}

/// Place a stack output of the node `run.node` following the function-node
/// protocol.
///
/// Nodes with a flow input expose the outputs their original invocation
/// left on the stack; pure data nodes are executed on every request —
/// outputs are recomputed once per distinct puller, never cached.
pub fn place_function_output(
    run: &mut NodeRun<'_>,
    kind: VariableType,
    index: usize,
) -> Result<(), TraversalError> {
    let node = run.node_data()?;
    if node.has_flow_input() {
        place_live_output(run, kind, index)
    } else {
        place_data_output(run, kind, index)
    }
}

/// Place an output that is already live on the stack, between the
/// producer's frame bottom and the top.
fn place_live_output(
    run: &mut NodeRun<'_>,
    kind: VariableType,
    index: usize,
) -> Result<(), TraversalError> {
    let frame = run
        .ctx
        .last_frame_of(run.node)
        .ok_or(TraversalError::NotOnCallStack(run.node))?;
    let position = frame.stack_bottom + index;
    if position >= run.ctx.stack().len() {
        return Err(TraversalError::NoSuchOutput {
            node: run.node,
            index,
        });
    }
    let handle = run.ctx.stack().peek(position);
    if handle.kind() != kind {
        return Err(TraversalError::OutputTypeMismatch {
            node: run.node,
            index,
            expected: kind,
            found: handle.kind(),
        });
    }
    // Duplicate on top without taking extra ownership; the producing
    // frame keeps the slot alive for its whole flow chain.
    run.ctx.stack_mut().place(kind, handle);
    Ok(())
}

/// Execute a pure data node on demand and keep only the requested output.
fn place_data_output(
    run: &mut NodeRun<'_>,
    kind: VariableType,
    index: usize,
) -> Result<(), TraversalError> {
    let count = run.node_data()?.stack_outputs.len();
    if index >= count {
        return Err(TraversalError::NoSuchOutput {
            node: run.node,
            index,
        });
    }

    let flows = execute_node(
        run.graph,
        run.pools,
        run.settings,
        run.ctx,
        run.node,
        run.depth + 1,
    )?;
    if flows != 0 {
        return Err(TraversalError::DataNodeSelectedFlow(run.node));
    }

    let frame = run
        .ctx
        .last_frame_of(run.node)
        .ok_or(TraversalError::NotOnCallStack(run.node))?;
    let produced = run.ctx.stack().len() - frame.stack_bottom;
    if produced != count {
        return Err(TraversalError::Node(format!(
            "node {:?} produced {produced} stack outputs, declared {count}",
            run.node
        )));
    }

    // Drop every output except the requested one.
    for i in 0..count {
        let reverse = count - 1 - i;
        if reverse != index {
            let offset = usize::from(reverse < index);
            run.ctx.stack_mut().pop_at(run.pools, offset);
        }
    }

    let top = run.ctx.stack().len() - 1;
    let handle = run.ctx.stack().peek(top);
    if handle.kind() != kind {
        return Err(TraversalError::OutputTypeMismatch {
            node: run.node,
            index,
            expected: kind,
            found: handle.kind(),
        });
    }

    // The surviving output outlives the producer's frame; its entry stays
    // stack-owned and is consumed by the puller.
    run.ctx.pop_frame_keep_stack();
    Ok(())
}

/// Place an entry node's output: arguments the dispatcher pushed, in
/// declaration order, immediately below the entry node's frame bottom.
pub fn place_entry_output(
    run: &mut NodeRun<'_>,
    kind: VariableType,
    index: usize,
) -> Result<(), TraversalError> {
    let count = run.node_data()?.stack_outputs.len();
    if index >= count {
        return Err(TraversalError::NoSuchOutput {
            node: run.node,
            index,
        });
    }
    let frame = run
        .ctx
        .last_frame_of(run.node)
        .ok_or(TraversalError::NotOnCallStack(run.node))?;
    if frame.stack_bottom < count {
        return Err(TraversalError::EntryArgumentsMissing(run.node));
    }
    let position = frame.stack_bottom - count + index;
    let handle = run.ctx.stack().peek(position);
    if handle.kind() != kind {
        return Err(TraversalError::OutputTypeMismatch {
            node: run.node,
            index,
            expected: kind,
            found: handle.kind(),
        });
    }
    run.ctx.stack_mut().place(kind, handle);
    Ok(())
}
