// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node behaviors and graph fixtures shared across the test suites.

use crate::graph::Graph;
use crate::node::{Binding, Node, NodeBehavior, NodeId, Scope};
use crate::registry::{NodeRegistry, NodeTemplate};
use crate::traversal::{
    place_entry_output, place_function_output, NodeRun, Settings, TraversalError,
};
use crate::variable::{ObjectRef, Value, VariableType};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) struct Inert;

impl NodeBehavior for Inert {
    fn execute(&self, _run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        Ok(0)
    }
}

/// A node with no ports; scope only.
pub(crate) fn inert_node(scope: Scope) -> Node {
    Node::new("Test.Inert", Inert).with_scope(scope)
}

struct RecordInt {
    log: Rc<RefCell<Vec<i32>>>,
}

impl NodeBehavior for RecordInt {
    fn execute(&self, run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        let value = run.ctx.stack_mut().pop::<i32>(run.pools);
        self.log.borrow_mut().push(value);
        Ok(0)
    }
}

/// Flow node that records its integer input.
pub(crate) fn record_node(log: &Rc<RefCell<Vec<i32>>>) -> Node {
    Node::new("Test.Record", RecordInt { log: log.clone() })
        .with_flow_input()
        .with_flow_output("out")
        .with_stack_input("value", VariableType::Int)
}

struct PassThrough;

impl NodeBehavior for PassThrough {
    fn execute(&self, run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        let value = run.ctx.stack_mut().pop::<i32>(run.pools);
        run.ctx.stack_mut().push(run.pools, value);
        Ok(0)
    }

    fn place_output(
        &self,
        run: &mut NodeRun<'_>,
        kind: VariableType,
        index: usize,
    ) -> Result<(), TraversalError> {
        place_function_output(run, kind, index)
    }
}

/// Flow node exposing its integer input as a stack output.
pub(crate) fn pass_through_node() -> Node {
    Node::new("Test.PassThrough", PassThrough)
        .with_flow_input()
        .with_flow_output("out")
        .with_stack_input("value", VariableType::Int)
        .with_stack_output("value", VariableType::Int)
}

struct AddOne;

impl NodeBehavior for AddOne {
    fn execute(&self, run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        let value = run.ctx.stack_mut().pop::<i32>(run.pools);
        run.ctx.stack_mut().push(run.pools, value + 1);
        Ok(0)
    }

    fn place_output(
        &self,
        run: &mut NodeRun<'_>,
        kind: VariableType,
        index: usize,
    ) -> Result<(), TraversalError> {
        place_function_output(run, kind, index)
    }
}

/// Flow node producing its integer input plus one.
pub(crate) fn add_one_node() -> Node {
    Node::new("Test.AddOne", AddOne)
        .with_flow_input()
        .with_flow_output("out")
        .with_stack_input("x", VariableType::Int)
        .with_stack_output("sum", VariableType::Int)
}

struct CountingDouble {
    runs: Rc<RefCell<usize>>,
}

impl NodeBehavior for CountingDouble {
    fn execute(&self, run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        *self.runs.borrow_mut() += 1;
        let value = run.ctx.stack_mut().pop::<i32>(run.pools);
        run.ctx.stack_mut().push(run.pools, value * 2);
        Ok(0)
    }

    fn place_output(
        &self,
        run: &mut NodeRun<'_>,
        kind: VariableType,
        index: usize,
    ) -> Result<(), TraversalError> {
        place_function_output(run, kind, index)
    }
}

/// Pure data node doubling its integer input, counting its executions.
pub(crate) fn counting_double_node(runs: &Rc<RefCell<usize>>) -> Node {
    Node::new("Test.Double", CountingDouble { runs: runs.clone() })
        .with_stack_input("x", VariableType::Int)
        .with_stack_output("x2", VariableType::Int)
}

struct Branch;

impl NodeBehavior for Branch {
    fn execute(&self, run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        let condition = run.ctx.stack_mut().pop::<bool>(run.pools);
        let selection: i32 = if condition { 0 } else { 1 };
        run.ctx.stack_mut().push(run.pools, selection);
        Ok(1)
    }
}

/// Flow-control node selecting its "true" or "false" output.
pub(crate) fn branch_node() -> Node {
    Node::new("Test.Branch", Branch)
        .flow_control()
        .with_flow_input()
        .with_flow_output("true")
        .with_flow_output("false")
        .with_stack_input("condition", VariableType::Bool)
}

struct Entry;

impl NodeBehavior for Entry {
    fn execute(&self, _run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        Ok(0)
    }

    fn place_output(
        &self,
        run: &mut NodeRun<'_>,
        kind: VariableType,
        index: usize,
    ) -> Result<(), TraversalError> {
        place_entry_output(run, kind, index)
    }
}

/// Entry node exposing one integer argument pushed by the dispatcher.
pub(crate) fn entry_node() -> Node {
    Node::new("Test.Entry", Entry)
        .with_flow_output("out")
        .with_stack_output("arg", VariableType::Int)
}

struct Fail;

impl NodeBehavior for Fail {
    fn execute(&self, _run: &mut NodeRun<'_>) -> Result<usize, TraversalError> {
        Err(TraversalError::Node("deliberate test failure".to_string()))
    }
}

/// Flow node whose behavior always fails.
pub(crate) fn fail_node() -> Node {
    Node::new("Test.Fail", Fail).with_flow_input()
}

/// Resettable node with one integer constant input and a label property.
pub(crate) fn resettable_node() -> Node {
    Node::new("Test.Resettable", Inert)
        .with_flow_input()
        .with_stack_input("value", VariableType::Int)
        .with_property("label", Value::String("default".to_string()))
}

/// Node with user-defined port lists, rebuilt from saved data.
pub(crate) fn custom_node() -> Node {
    Node::new("Test.Custom", Inert)
        .with_flow_input()
        .with_user_defined_ports()
}

/// Registry covering the stateless archetypes used by codec tests.
pub(crate) fn serializable_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(NodeTemplate::new("Test.PassThrough", pass_through_node));
    registry.register(NodeTemplate::new("Test.AddOne", add_one_node));
    registry.register(NodeTemplate::new("Test.Resettable", resettable_node).resettable());
    registry.register(NodeTemplate::new("Test.Custom", custom_node));
    registry
}

/// Ids of the nodes in [`wired_test_graph`].
pub(crate) struct TestGraphIds {
    pub pass_through: NodeId,
    pub add_one: NodeId,
    pub resettable: NodeId,
}

/// A small wired graph: pass-through (constant 5, host context) feeding an
/// add-one node, a resettable node, and one float variable.
pub(crate) fn wired_test_graph() -> (Graph, TestGraphIds) {
    let settings = Settings::default();
    let registry = serializable_registry();
    let mut graph = Graph::new("test");

    let pass_through = graph
        .create_node(
            registry.get("Test.PassThrough").unwrap(),
            ObjectRef(42),
            None,
        )
        .unwrap();
    let add_one = graph.add_node(add_one_node());
    let resettable = graph.add_node(resettable_node());

    graph.node_mut(pass_through).unwrap().stack_inputs[0]
        .constant
        .set(Value::Int(5));
    graph.node_mut(resettable).unwrap().stack_inputs[0]
        .constant
        .set(Value::Int(3));
    graph.node_mut(resettable).unwrap().properties[0]
        .value
        .set(Value::String("saved".to_string()));
    graph.node_mut(add_one).unwrap().set_binding(Some(Binding {
        name: "AddOne".to_string(),
        is_static: true,
        description: "x + 1".to_string(),
    }));

    graph.connect_flow(pass_through, 0, add_one, &settings).unwrap();
    graph
        .connect_stack(add_one, 0, pass_through, 0, &settings)
        .unwrap();

    let speed = graph.add_variable("speed", VariableType::Float);
    graph
        .variable_mut(speed)
        .unwrap()
        .value
        .set(Value::Float(2.5));

    (
        graph,
        TestGraphIds {
            pass_through,
            add_one,
            resettable,
        },
    )
}
