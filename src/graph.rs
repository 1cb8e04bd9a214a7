//! Module for building the energy-flow graph between components.
//!
//! Nodes are components; each directed edge carries one network carrier from a component which
//! outputs it to a component which takes it as input. Which pairs of components may be linked is
//! given by the adjacency part of the topology table.
use crate::carrier::Carrier;
use crate::component::{Component, CompileContext, ComponentVars};
use crate::id::ComponentID;
use crate::problem::{Constraint, LinExpr, Problem, VarId};
use indexmap::IndexMap;
use itertools::iproduct;
use log::{debug, warn};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fmt::Display;

/// A graph of energy flows between the components of a building
type FlowNetwork = DiGraph<ComponentID, Carrier>;

/// An entry of the adjacency matrix
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjacency {
    /// The components are explicitly connected (`1`)
    Connected,
    /// The components must not be connected (`0`)
    Forbidden,
    /// Nothing was specified (empty cell), so a connection is allowed
    Allowed,
}

/// Which pairs of components may exchange energy
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjacencyMatrix {
    entries: HashMap<(ComponentID, ComponentID), Adjacency>,
}

impl AdjacencyMatrix {
    /// Set the entry for the ordered pair `(from, to)`
    pub fn set(&mut self, from: ComponentID, to: ComponentID, adjacency: Adjacency) {
        self.entries.insert((from, to), adjacency);
    }

    /// The entry for the ordered pair `(from, to)`; missing entries allow a connection
    pub fn get(&self, from: &ComponentID, to: &ComponentID) -> Adjacency {
        self.entries
            .get(&(from.clone(), to.clone()))
            .copied()
            .unwrap_or(Adjacency::Allowed)
    }

    /// Whether energy may flow between two components in either direction.
    ///
    /// A pair is linked unless both of its entries forbid it.
    pub fn is_linked(&self, a: &ComponentID, b: &ComponentID) -> bool {
        self.get(a, b) != Adjacency::Forbidden || self.get(b, a) != Adjacency::Forbidden
    }

    /// Pairs which were marked as connected
    pub fn iter_connected(&self) -> impl Iterator<Item = (&ComponentID, &ComponentID)> {
        self.entries
            .iter()
            .filter(|(_, adjacency)| **adjacency == Adjacency::Connected)
            .map(|((from, to), _)| (from, to))
    }
}

/// A directed flow of one carrier between two components
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnergyFlow {
    /// The component delivering energy
    pub from: ComponentID,
    /// The component receiving energy
    pub to: ComponentID,
    /// The carrier
    pub carrier: Carrier,
}

impl Display for EnergyFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}->{}]", self.carrier, self.from, self.to)
    }
}

/// The structure of energy flows in a building
#[derive(Debug)]
pub struct FlowGraph {
    network: FlowNetwork,
    nodes: IndexMap<ComponentID, NodeIndex>,
}

impl FlowGraph {
    /// Infer the flows between components from their carriers and the adjacency matrix.
    ///
    /// There is an edge from A to B for carrier C if A outputs C, B takes C as input and the
    /// pair is linked in the adjacency matrix. Each such edge is created once.
    pub fn build(
        components: &IndexMap<ComponentID, Component>,
        adjacency: &AdjacencyMatrix,
    ) -> FlowGraph {
        let mut network = FlowNetwork::new();
        let nodes: IndexMap<_, _> = components
            .keys()
            .map(|id| (id.clone(), network.add_node(id.clone())))
            .collect();

        for (from, to) in iproduct!(components.values(), components.values()) {
            if from.id == to.id || !adjacency.is_linked(&from.id, &to.id) {
                continue;
            }

            let (from_node, to_node) = (nodes[&from.id], nodes[&to.id]);
            for carrier in Carrier::iter_network() {
                if !(from.outputs().contains(&carrier) && to.inputs().contains(&carrier)) {
                    continue;
                }
                let exists = network
                    .edges_connecting(from_node, to_node)
                    .any(|edge| *edge.weight() == carrier);
                if !exists {
                    network.add_edge(from_node, to_node, carrier);
                }
            }
        }

        for (a, b) in adjacency.iter_connected() {
            let (Some(&a_node), Some(&b_node)) = (nodes.get(a), nodes.get(b)) else {
                continue;
            };
            if !network.contains_edge(a_node, b_node) && !network.contains_edge(b_node, a_node) {
                warn!("Components {a} and {b} are marked as connected but share no carrier");
            }
        }

        let graph = FlowGraph { network, nodes };
        debug!(
            "Flow graph has {} components and {} flows",
            graph.network.node_count(),
            graph.network.edge_count()
        );
        graph
    }

    /// Iterate over all flows
    pub fn iter_flows(&self) -> impl Iterator<Item = EnergyFlow> + '_ {
        self.network.edge_indices().filter_map(|edge| {
            let (from, to) = self.network.edge_endpoints(edge)?;
            Some(EnergyFlow {
                from: self.network[from].clone(),
                to: self.network[to].clone(),
                carrier: self.network[edge],
            })
        })
    }

    /// Number of flows
    pub fn num_flows(&self) -> usize {
        self.network.edge_count()
    }

    /// Flows of a carrier into or out of a component
    pub fn flows_of(
        &self,
        id: &ComponentID,
        carrier: Carrier,
        direction: Direction,
    ) -> Vec<EnergyFlow> {
        let Some(&node) = self.nodes.get(id) else {
            return Vec::new();
        };

        self.network
            .edges_directed(node, direction)
            .filter(|edge| *edge.weight() == carrier)
            .map(|edge| EnergyFlow {
                from: self.network[edge.source()].clone(),
                to: self.network[edge.target()].clone(),
                carrier,
            })
            .collect()
    }
}

/// Declare a variable series for every flow and tie components' inputs and outputs to them.
///
/// For each component and network carrier, the input in every step equals the sum of inbound
/// flows and the output equals the sum of outbound flows. A port with no flows is fixed to zero,
/// with a warning.
///
/// # Returns
///
/// The variables of each flow
pub fn declare_flows(
    problem: &mut Problem,
    graph: &FlowGraph,
    components: &IndexMap<ComponentID, Component>,
    vars: &IndexMap<ComponentID, ComponentVars>,
    ctx: &CompileContext,
) -> IndexMap<EnergyFlow, Vec<VarId>> {
    let flows: IndexMap<_, _> = graph
        .iter_flows()
        .map(|flow| {
            let bound = components[&flow.from]
                .output_bound(flow.carrier)
                .min(components[&flow.to].input_bound(flow.carrier, ctx));
            let series = problem.add_time_series(
                &format!("flow_{flow}"),
                ctx.time.len(),
                0.0..=bound.max(0.0),
            );
            (flow, series)
        })
        .collect();

    for (id, component_vars) in vars {
        for (&carrier, input) in &component_vars.inputs {
            if carrier.is_network_carrier() {
                let inbound = graph.flows_of(id, carrier, Direction::Incoming);
                declare_balance(problem, id, carrier, "input", input, &inbound, &flows);
            }
        }
        for (&carrier, output) in &component_vars.outputs {
            let outbound = graph.flows_of(id, carrier, Direction::Outgoing);
            declare_balance(problem, id, carrier, "output", output, &outbound, &flows);
        }
    }

    flows
}

/// `port[t] = sum of flows[t]`
fn declare_balance(
    problem: &mut Problem,
    id: &ComponentID,
    carrier: Carrier,
    port_name: &str,
    port: &[VarId],
    connected: &[EnergyFlow],
    flows: &IndexMap<EnergyFlow, Vec<VarId>>,
) {
    if connected.is_empty() {
        warn!("Component {id}: {carrier} {port_name} is not connected to anything");
    }

    for (t, &var) in port.iter().enumerate() {
        let total = LinExpr::sum(connected.iter().map(|flow| flows[flow][t]));
        problem.add_constraint(Constraint::eq(var, total));
    }
}
