// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-traversal execution context: call frames, operand stack, scope tag.

use crate::graph::{Graph, GraphId};
use crate::node::{NodeId, Scope};
use crate::pool::VarPools;
use crate::stack::OperandStack;
use crate::traversal::{Settings, TraversalError};

/// Bookkeeping record for one node on the call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame {
    /// The node this frame belongs to.
    pub node: NodeId,
    /// The graph the node lives in.
    pub graph: GraphId,
    /// Operand-stack height when the frame was pushed; the frame's
    /// minimum stack height while active.
    pub stack_bottom: usize,
}

/// State of one traversal: operand stack, frame list, and the enforced
/// execution scope.
///
/// Each traversal gets its own context, so re-entrant dispatch never
/// interleaves frame stacks.
#[derive(Debug)]
pub struct ExecutionContext {
    stack: OperandStack,
    frames: Vec<StackFrame>,
    scope: Scope,
    enforce_scopes: bool,
}

impl ExecutionContext {
    /// Create an empty context configured from `settings`.
    pub fn new(settings: &Settings) -> Self {
        Self {
            stack: OperandStack::new(),
            frames: Vec::new(),
            scope: Scope::Generic,
            enforce_scopes: settings.enforce_scopes,
        }
    }

    /// The current execution scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Change the execution scope.
    ///
    /// With scope enforcement on, the scope may only change while no
    /// frames are active.
    pub fn set_scope(&mut self, scope: Scope) -> Result<(), TraversalError> {
        if scope != self.scope {
            if self.enforce_scopes && !self.frames.is_empty() {
                return Err(TraversalError::ScopeChange {
                    current: self.scope,
                    requested: scope,
                });
            }
            self.scope = scope;
        }
        Ok(())
    }

    /// Push a frame for a node about to execute.
    ///
    /// The first frame in an empty context sets the context scope; every
    /// later node must match it unless it is scope-agnostic.
    pub fn push_frame(&mut self, graph: &Graph, id: NodeId) -> Result<StackFrame, TraversalError> {
        let node = graph.node(id).ok_or(TraversalError::NodeNotFound(id))?;
        let node_scope = node.scope();
        if self.enforce_scopes {
            if self.frames.is_empty() {
                self.scope = node_scope;
            } else if node_scope != Scope::Generic && node_scope != self.scope {
                return Err(TraversalError::ScopeViolation {
                    current: self.scope,
                    node: node.name().to_string(),
                    requested: node_scope,
                });
            }
        } else {
            self.scope = node_scope;
        }

        let frame = StackFrame {
            node: id,
            graph: graph.id(),
            stack_bottom: self.stack.len(),
        };
        self.frames.push(frame);
        Ok(frame)
    }

    /// Pop the top frame, unwinding the stack to the frame's bottom and
    /// freeing every stack-owned entry above it.
    ///
    /// Panics if no frame is active.
    pub fn pop_frame(&mut self, pools: &mut VarPools) {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => panic!("pop_frame with no active frames"),
        };
        while self.stack.len() > frame.stack_bottom {
            self.stack.pop_discard(pools);
        }
    }

    /// Pop the top frame, leaving the stack as-is. Used when a produced
    /// output must survive its producer's frame.
    ///
    /// Panics if no frame is active.
    pub fn pop_frame_keep_stack(&mut self) {
        if self.frames.pop().is_none() {
            panic!("pop_frame_keep_stack with no active frames");
        }
    }

    /// The innermost active frame.
    pub fn current_frame(&self) -> Option<StackFrame> {
        self.frames.last().copied()
    }

    /// The innermost active frame belonging to `node`.
    pub fn last_frame_of(&self, node: NodeId) -> Option<StackFrame> {
        self.frames.iter().rev().find(|f| f.node == node).copied()
    }

    /// Active frames, outermost first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Number of active frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The operand stack.
    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    /// Mutable access to the operand stack.
    pub fn stack_mut(&mut self) -> &mut OperandStack {
        &mut self.stack
    }

    /// Drop all frames and stack entries, freeing stack-owned values —
    /// including any left behind the first frame by an external
    /// dispatcher.
    pub fn clear(&mut self, pools: &mut VarPools) {
        while !self.frames.is_empty() {
            self.pop_frame(pools);
        }
        while !self.stack.is_empty() {
            self.stack.pop_discard(pools);
        }
    }

    /// Turn this empty context into a snapshot of `source`: same scope and
    /// frames, with every stack value deep-copied into a fresh pool slot.
    ///
    /// Panics if this context is not empty.
    pub fn duplicate_from(&mut self, source: &ExecutionContext, pools: &mut VarPools) {
        assert!(
            self.stack.is_empty() && self.frames.is_empty(),
            "duplicating into a non-empty execution context"
        );
        self.scope = source.scope;
        for index in 0..source.stack.len() {
            self.stack.push_copy(pools, &source.stack, index);
        }
        self.frames.extend_from_slice(&source.frames);
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}
