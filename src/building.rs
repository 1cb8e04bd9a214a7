//! A building's energy system and its compilation into an optimisation problem.
use crate::carrier::Carrier;
use crate::component::{CompileContext, Component, ComponentKind, ComponentVars};
use crate::finance::FinanceParameters;
use crate::graph::{AdjacencyMatrix, EnergyFlow, FlowGraph, declare_flows};
use crate::id::ComponentID;
use crate::problem::{Constraint, LinExpr, Problem, Sense, VarId};
use crate::profile::Profiles;
use crate::settings::CompileSettings;
use crate::subsidy::{
    SubsidyLevel, SubsidyRule, declare_operate_subsidies, declare_purchase_subsidies,
    purchase_subsidy_caps,
};
use crate::time_index::TimeIndex;
use crate::units::MoneyPerEnergy;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::{info, warn};
use serde::Deserialize;

/// Prices paid for energy bought from, or received for energy sold to, external networks
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnergyPrices {
    /// Price of gas
    pub gas: MoneyPerEnergy,
    /// Price of grid electricity
    pub elec: MoneyPerEnergy,
    /// Price received for electricity fed into the grid
    pub elec_feed_in: MoneyPerEnergy,
    /// Price of biomass
    pub biomass: MoneyPerEnergy,
    /// Price of hydrogen
    pub hydrogen: MoneyPerEnergy,
}

impl EnergyPrices {
    /// The price of buying a carrier from an external network
    pub fn purchase_price(&self, carrier: Carrier) -> MoneyPerEnergy {
        match carrier {
            Carrier::Gas => self.gas,
            Carrier::Elec => self.elec,
            Carrier::Biomass => self.biomass,
            Carrier::Hydrogen => self.hydrogen,
            Carrier::Heat | Carrier::Cool | Carrier::Solar => MoneyPerEnergy(0.0),
        }
    }
}

/// General information about a building
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BuildingInfo {
    /// Name of the building
    pub name: String,
    /// Floor area (m²)
    #[serde(default)]
    pub area: f64,
    /// The kind of user (e.g. `residential`), used to select subsidies
    #[serde(default = "default_category")]
    pub user: String,
    /// The kind of building (e.g. `SFH`), used to select subsidies
    #[serde(default = "default_category")]
    pub building_type: String,
}

fn default_category() -> String {
    "all".to_string()
}

/// A building's energy system, ready to be compiled
#[derive(Clone, Debug)]
pub struct Building {
    /// General information
    pub info: BuildingInfo,
    /// Components, keyed by name
    pub components: IndexMap<ComponentID, Component>,
    /// Which pairs of components may exchange energy
    pub adjacency: AdjacencyMatrix,
    /// Demand and weather profiles
    pub profiles: Profiles,
    /// Subsidy rules applying to this building
    pub subsidies: Vec<SubsidyRule>,
    /// Energy prices
    pub prices: EnergyPrices,
    /// Parameters for annualising investments
    pub finance: FinanceParameters,
    /// The time axis
    pub time: TimeIndex,
}

/// Handles to the building-level cost variables
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregateVars {
    /// Sum of the components' annualised costs
    pub annual_cost: VarId,
    /// Annual cost of operation, net of revenue
    pub operation_cost: VarId,
    /// Annual revenue from feed-in and operate subsidies
    pub total_revenue: VarId,
    /// Annual variable costs of the components
    pub other_op_cost: VarId,
}

/// A building compiled into an optimisation problem
#[derive(Debug)]
pub struct CompiledModel {
    /// The problem
    pub problem: Problem,
    /// The variables of each component
    pub components: IndexMap<ComponentID, ComponentVars>,
    /// The variables of each energy flow
    pub flows: IndexMap<EnergyFlow, Vec<VarId>>,
    /// Operate subsidy payouts of each component, per level
    pub operate_subsidies: IndexMap<ComponentID, IndexMap<SubsidyLevel, VarId>>,
    /// Building-level costs
    pub aggregates: AggregateVars,
}

impl Building {
    /// Create a building, checking that its parts fit together
    pub fn new(
        info: BuildingInfo,
        components: IndexMap<ComponentID, Component>,
        adjacency: AdjacencyMatrix,
        profiles: Profiles,
        subsidies: Vec<SubsidyRule>,
        prices: EnergyPrices,
        finance: FinanceParameters,
    ) -> Result<Self> {
        ensure!(!profiles.is_empty(), "Building {} has no profile data", info.name);
        ensure!(
            info.area >= 0.0,
            "Building {}: area must be non-negative",
            info.name
        );
        if components.is_empty() {
            warn!("Building {} has no components", info.name);
        }

        let time = TimeIndex::uniform(profiles.len());
        Ok(Self {
            info,
            components,
            adjacency,
            profiles,
            subsidies,
            prices,
            finance,
            time,
        })
    }

    /// Compile the building into an optimisation problem.
    ///
    /// The objective is the sum of annualised investment costs and annual operation costs.
    pub fn compile(&self, settings: &CompileSettings) -> Result<CompiledModel> {
        ensure!(
            self.profiles.len() == self.time.len(),
            "Profiles have {} steps but the time axis has {}",
            self.profiles.len(),
            self.time.len()
        );

        let ctx = CompileContext {
            time: &self.time,
            profiles: &self.profiles,
            finance: &self.finance,
            settings,
        };
        let graph = FlowGraph::build(&self.components, &self.adjacency);
        let mut problem = Problem::new();

        let mut vars: IndexMap<_, _> = self
            .components
            .iter()
            .map(|(id, component)| {
                let caps = purchase_subsidy_caps(&self.subsidies, component, self.info.area);
                let vars = component.declare_variables(&mut problem, &ctx, &caps);
                (id.clone(), vars)
            })
            .collect();
        let flows = declare_flows(&mut problem, &graph, &self.components, &vars, &ctx);

        for (id, component) in &self.components {
            let component_vars = &mut vars[id];
            component.declare_constraints(&mut problem, component_vars, &ctx);
            declare_purchase_subsidies(
                &mut problem,
                &self.subsidies,
                component,
                component_vars,
                self.info.area,
                settings.size_epsilon,
            );
        }

        let operate_subsidies: IndexMap<_, _> = self
            .components
            .iter()
            .map(|(id, component)| {
                let energy = self.feed_in_energy(id, &flows);
                let payouts = declare_operate_subsidies(
                    &mut problem,
                    &self.subsidies,
                    component,
                    &vars[id],
                    &energy,
                    settings,
                );
                (id.clone(), payouts)
            })
            .filter(|(_, payouts)| !payouts.is_empty())
            .collect();

        let aggregates = self.declare_aggregates(&mut problem, &vars, &operate_subsidies);
        problem.set_objective(
            LinExpr::from(aggregates.annual_cost) + aggregates.operation_cost,
            Sense::Minimise,
        );
        info!(
            "Compiled building {} into a problem with {} variables, {} constraints and {} \
             disjunctions",
            self.info.name,
            problem.num_variables(),
            problem.num_constraints(),
            problem.disjunctions().len()
        );

        Ok(CompiledModel {
            problem,
            components: vars,
            flows,
            operate_subsidies,
            aggregates,
        })
    }

    /// Annual energy a component delivers to components which feed it into the grid
    fn feed_in_energy(
        &self,
        id: &ComponentID,
        flows: &IndexMap<EnergyFlow, Vec<VarId>>,
    ) -> LinExpr {
        let mut energy = LinExpr::default();
        for (flow, series) in flows {
            if flow.from == *id && self.components[&flow.to].comp_type.is_feed_in_sink() {
                energy += self.time.weighted_sum(series);
            }
        }

        energy
    }

    /// Declare the building-level cost variables and the equations defining them
    fn declare_aggregates(
        &self,
        problem: &mut Problem,
        vars: &IndexMap<ComponentID, ComponentVars>,
        operate_subsidies: &IndexMap<ComponentID, IndexMap<SubsidyLevel, VarId>>,
    ) -> AggregateVars {
        let aggregates = AggregateVars {
            annual_cost: problem.add_continuous("annual_cost", ..),
            operation_cost: problem.add_continuous("operation_cost", ..),
            total_revenue: problem.add_continuous("total_revenue", ..),
            other_op_cost: problem.add_continuous("other_op_cost", ..),
        };

        let mut annual_cost = LinExpr::default();
        let mut purchase_cost = LinExpr::default();
        let mut revenue = LinExpr::default();
        let mut other_op_cost = LinExpr::default();
        for (id, component) in &self.components {
            let component_vars = &vars[id];
            annual_cost += component_vars.annual_cost;
            other_op_cost += component.variable_cost_expr(component_vars, &self.time);

            if component.kind() == ComponentKind::Grid {
                for (&carrier, output) in &component_vars.outputs {
                    let price = self.prices.purchase_price(carrier).value();
                    purchase_cost += self.time.weighted_sum(output) * price;
                }
            }
            let feed_in = component_vars
                .input(Carrier::Elec)
                .filter(|_| component.comp_type.is_feed_in_sink());
            if let Some(input) = feed_in {
                revenue += self.time.weighted_sum(input) * self.prices.elec_feed_in.value();
            }
        }
        for payouts in operate_subsidies.values() {
            revenue += LinExpr::sum(payouts.values().copied());
        }

        problem.add_constraint(Constraint::eq(aggregates.annual_cost, annual_cost));
        problem.add_constraint(Constraint::eq(aggregates.other_op_cost, other_op_cost));
        problem.add_constraint(Constraint::eq(aggregates.total_revenue, revenue));
        problem.add_constraint(Constraint::eq(
            aggregates.operation_cost,
            purchase_cost + aggregates.other_op_cost - aggregates.total_revenue,
        ));

        aggregates
    }
}
