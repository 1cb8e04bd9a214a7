//! Components of a building's energy system and the constraints they contribute.
//!
//! A [`Component`] holds the parameters read from input. When a building is compiled, each
//! component declares its decision variables (returned as [`ComponentVars`]) and then adds its
//! constraints, selected by its [`Behaviour`].
use crate::carrier::Carrier;
use crate::finance::{FinanceParameters, annuity_factor, operation_factor};
use crate::id::ComponentID;
use crate::problem::{Constraint, LinExpr, Problem, VarId};
use crate::profile::Profiles;
use crate::settings::CompileSettings;
use crate::subsidy::SubsidyLevel;
use crate::time_index::TimeIndex;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;

pub mod dispatchable;
pub mod investment;
pub mod registry;
pub mod storage;
use dispatchable::{CHP_LARGE, CHP_SMALL, ChpVars, declare_chp_constraints, declare_part_load};
use investment::{CostModel, annual_cost_expr, parse_price_pairs};
pub use registry::{Capabilities, ComponentKind, ComponentType};
use storage::StorageParameters;

/// Service life assumed when none is given (years)
const DEFAULT_LIFE: f64 = 20.0;

/// Conversion efficiency assumed when none is given
const DEFAULT_EFFICIENCY: f64 = 1.0;

/// Carnot efficiency of a heat pump assumed when none is given
const DEFAULT_CARNOT_EFFICIENCY: f64 = 0.4;

/// Heat pump supply temperature assumed when none is given (°C)
const DEFAULT_SUPPLY_TEMPERATURE: f64 = 55.0;

/// Upper limit on a heat pump's coefficient of performance
const MAX_COP: f64 = 10.0;

/// A row of the topology table describing one component
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentDefinition {
    /// Unique name of the component
    pub id: ComponentID,
    /// The type of component
    pub comp_type: ComponentType,
    /// Model name, used to look up properties
    pub model: String,
    /// Smallest size which may be installed
    pub min_size: f64,
    /// Largest size which may be installed
    pub max_size: f64,
    /// Size already installed in the building
    pub current_size: f64,
    /// Index of the investment cost model (0, 1 or 2)
    pub cost_model: Option<u8>,
}

/// Technical and economic properties of a component model.
///
/// Every field is optional; missing values are replaced by defaults with a warning where the
/// value matters.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ComponentProperties {
    /// The component type these properties apply to
    #[serde(default)]
    pub comp_type: String,
    /// The model these properties apply to
    #[serde(default)]
    pub model: String,
    /// Conversion efficiency
    pub efficiency: Option<f64>,
    /// Service life (years)
    pub life: Option<f64>,
    /// Annual installation effort as a fraction of investment
    pub f_inst: Option<f64>,
    /// Annual maintenance as a fraction of investment
    pub f_w: Option<f64>,
    /// Annual operation effort as a fraction of investment
    pub f_op: Option<f64>,
    /// Unit cost for cost model 0
    #[serde(rename = "only-unit-price")]
    pub only_unit_price: Option<f64>,
    /// Unit cost for cost model 1
    #[serde(rename = "fixed-unit-price")]
    pub fixed_unit_price: Option<f64>,
    /// Fixed cost for cost model 1
    #[serde(rename = "fixed-price")]
    pub fixed_price: Option<f64>,
    /// Size/price pairs for cost model 2
    #[serde(rename = "data-pair")]
    pub data_pair: Option<String>,
    /// Storage charging efficiency
    pub input_efficiency: Option<f64>,
    /// Storage discharging efficiency
    pub output_efficiency: Option<f64>,
    /// Storage minimum state of charge
    pub min_soc: Option<f64>,
    /// Storage maximum state of charge
    pub max_soc: Option<f64>,
    /// Storage initial state of charge
    pub init_soc: Option<f64>,
    /// Storage energy-to-power ratio for charging
    pub e2p_in: Option<f64>,
    /// Storage energy-to-power ratio for discharging
    pub e2p_out: Option<f64>,
    /// Lowest output when running, as a fraction of size
    pub min_part_load: Option<f64>,
    /// Heat pump efficiency relative to the Carnot cycle
    pub carnot_efficiency: Option<f64>,
    /// Heat pump supply temperature (°C)
    pub supply_temperature: Option<f64>,
    /// Operating cost per unit of output energy
    pub variable_cost: Option<f64>,
}

/// Economic parameters of a component
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Economics {
    /// Service life (years)
    pub life: f64,
    /// Annual installation effort as a fraction of investment
    pub f_inst: f64,
    /// Annual maintenance as a fraction of investment
    pub f_w: f64,
    /// Annual operation effort as a fraction of investment
    pub f_op: f64,
}

/// The specialised behaviour of a component
#[derive(Clone, Debug, PartialEq)]
pub enum Behaviour {
    /// Buys or sells energy from an external network
    Grid,
    /// Converts irradiance into its output carrier
    Solar,
    /// Converts its input into its outputs at a fixed efficiency
    Conversion,
    /// Converts electricity into heat at a temperature-dependent COP
    HeatPump {
        /// Efficiency relative to the Carnot cycle
        carnot_efficiency: f64,
        /// Supply temperature (°C)
        supply_temperature: f64,
    },
    /// Gas-fired CHP following the size-class regression
    Chp,
    /// Stores its carrier between steps
    Storage(StorageParameters),
    /// Consumes a fixed demand profile
    Consumption,
}

/// A component of a building's energy system
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    /// Unique name of the component
    pub id: ComponentID,
    /// The type of component
    pub comp_type: ComponentType,
    /// Model name
    pub model: String,
    /// Smallest size which may be installed
    pub min_size: f64,
    /// Largest size which may be installed
    pub max_size: f64,
    /// Size already installed in the building (reported only)
    pub current_size: f64,
    /// How investment depends on size
    pub cost_model: CostModel,
    /// Economic parameters
    pub economics: Economics,
    /// Conversion efficiency
    pub efficiency: f64,
    /// Lowest output when running, as a fraction of size (zero means no on/off behaviour)
    pub min_part_load: f64,
    /// Operating cost per unit of output energy
    pub variable_cost: f64,
    /// Specialised behaviour
    pub behaviour: Behaviour,
}

/// Everything a component needs to know about the building while declaring its constraints
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    /// The time axis
    pub time: &'a TimeIndex,
    /// Demand and weather profiles
    pub profiles: &'a Profiles,
    /// Parameters for annualising investments
    pub finance: &'a FinanceParameters,
    /// Compilation options
    pub settings: &'a CompileSettings,
}

/// Handles to the decision variables of a component
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentVars {
    /// Installed size
    pub size: VarId,
    /// Investment
    pub invest: VarId,
    /// Annualised cost of owning the component
    pub annual_cost: VarId,
    /// Input per carrier and step
    pub inputs: IndexMap<Carrier, Vec<VarId>>,
    /// Output per carrier and step
    pub outputs: IndexMap<Carrier, Vec<VarId>>,
    /// Purchase subsidy received at each level which has rules for this component
    pub purchase_subsidies: IndexMap<SubsidyLevel, VarId>,
    /// Electrical size of a CHP unit
    pub size_el: Option<VarId>,
    /// Energy stored at the start of each step, for storages
    pub stored_energy: Option<Vec<VarId>>,
    /// Whether the component is running in each step, for components with part-load limits
    pub status: Option<Vec<VarId>>,
}

impl ComponentVars {
    /// Input series for a carrier
    pub fn input(&self, carrier: Carrier) -> Option<&[VarId]> {
        self.inputs.get(&carrier).map(Vec::as_slice)
    }

    /// Output series for a carrier
    pub fn output(&self, carrier: Carrier) -> Option<&[VarId]> {
        self.outputs.get(&carrier).map(Vec::as_slice)
    }
}

/// Coefficient of performance of a heat pump.
///
/// # Arguments
///
/// * `carnot_efficiency` - Efficiency relative to the Carnot cycle
/// * `supply_temperature` - Supply temperature (°C)
/// * `ambient_temperature` - Source temperature (°C)
pub fn heat_pump_cop(
    carnot_efficiency: f64,
    supply_temperature: f64,
    ambient_temperature: f64,
) -> f64 {
    let supply_kelvin = supply_temperature + 273.15;
    let lift = supply_temperature - ambient_temperature;
    if lift <= 0.0 {
        return MAX_COP;
    }

    (carnot_efficiency * supply_kelvin / lift).min(MAX_COP)
}

/// Take a property value, or fall back to a default with a warning
fn property_or_default(
    value: Option<f64>,
    default: f64,
    name: &str,
    def: &ComponentDefinition,
) -> f64 {
    value.unwrap_or_else(|| {
        warn!(
            "Component {}: no {name} given for model {}; using {default}",
            def.id, def.model
        );
        default
    })
}

/// Drop a property value outside its valid range, with a warning
fn valid_property(
    value: Option<f64>,
    name: &str,
    positive: bool,
    def: &ComponentDefinition,
) -> Option<f64> {
    value.filter(|&value| {
        let valid = value.is_finite() && if positive { value > 0.0 } else { value >= 0.0 };
        if !valid {
            let requirement = if positive { "positive" } else { "non-negative" };
            warn!(
                "Component {}: {name} must be {requirement} for model {}, got {value}; ignoring",
                def.id, def.model
            );
        }
        valid
    })
}

impl ComponentProperties {
    /// A copy with every out-of-range numeric value removed, so that defaults apply instead
    fn without_invalid_values(&self, def: &ComponentDefinition) -> Self {
        let positive = |value: Option<f64>, name: &str| valid_property(value, name, true, def);
        let non_negative = |value: Option<f64>, name: &str| valid_property(value, name, false, def);
        Self {
            efficiency: positive(self.efficiency, "efficiency"),
            life: positive(self.life, "life"),
            f_inst: non_negative(self.f_inst, "f_inst"),
            f_w: non_negative(self.f_w, "f_w"),
            f_op: non_negative(self.f_op, "f_op"),
            only_unit_price: non_negative(self.only_unit_price, "only-unit-price"),
            fixed_unit_price: non_negative(self.fixed_unit_price, "fixed-unit-price"),
            fixed_price: non_negative(self.fixed_price, "fixed-price"),
            carnot_efficiency: positive(self.carnot_efficiency, "carnot_efficiency"),
            variable_cost: non_negative(self.variable_cost, "variable_cost"),
            ..self.clone()
        }
    }
}

impl Component {
    /// Create a component from its topology row and the properties of its model.
    ///
    /// Missing, out-of-range or inconsistent properties are replaced by defaults with a warning.
    /// Only an invalid size range is an error.
    pub fn new(def: ComponentDefinition, props: Option<&ComponentProperties>) -> Result<Self> {
        ensure!(
            def.min_size >= 0.0 && def.min_size <= def.max_size,
            "Component {}: sizes must satisfy 0 <= min_size <= max_size",
            def.id
        );
        let props = props.map_or_else(
            || {
                warn!(
                    "Component {}: no properties found for {} model {}; using defaults",
                    def.id, def.comp_type, def.model
                );
                ComponentProperties::default()
            },
            |props| props.without_invalid_values(&def),
        );
        let props = &props;

        let cost_model = Self::cost_model_from_properties(&def, props);
        let needs_life = def.comp_type.kind() != ComponentKind::Consumption;
        let economics = Economics {
            life: if needs_life {
                property_or_default(props.life, DEFAULT_LIFE, "life", &def)
            } else {
                props.life.unwrap_or(DEFAULT_LIFE)
            },
            f_inst: props.f_inst.unwrap_or(0.0),
            f_w: props.f_w.unwrap_or(0.0),
            f_op: props.f_op.unwrap_or(0.0),
        };
        let behaviour = Self::behaviour_from_properties(&def, props);
        let efficiency = match behaviour {
            Behaviour::Conversion | Behaviour::Solar => {
                property_or_default(props.efficiency, DEFAULT_EFFICIENCY, "efficiency", &def)
            }
            _ => props.efficiency.unwrap_or(DEFAULT_EFFICIENCY),
        };
        let min_part_load = match props.min_part_load {
            Some(value) if !(0.0..=1.0).contains(&value) => {
                warn!(
                    "Component {}: min_part_load must be between 0 and 1, got {value}; ignoring",
                    def.id
                );
                0.0
            }
            Some(value) if def.comp_type.kind() == ComponentKind::Conversion => value,
            _ => 0.0,
        };

        Ok(Self {
            id: def.id,
            comp_type: def.comp_type,
            model: def.model,
            min_size: def.min_size,
            max_size: def.max_size,
            current_size: def.current_size,
            cost_model,
            economics,
            efficiency,
            min_part_load,
            variable_cost: props.variable_cost.unwrap_or(0.0),
            behaviour,
        })
    }

    /// Pick the investment cost model, falling back to the linear model if its data is missing
    fn cost_model_from_properties(
        def: &ComponentDefinition,
        props: &ComponentProperties,
    ) -> CostModel {
        let linear = || CostModel::Linear {
            unit_cost: props.only_unit_price.unwrap_or_else(|| {
                warn!(
                    "Component {}: no only-unit-price given for model {}; investment will be free",
                    def.id, def.model
                );
                0.0
            }),
        };

        match def.cost_model.unwrap_or(0) {
            0 => linear(),
            1 => match (props.fixed_unit_price, props.fixed_price) {
                (Some(unit_cost), Some(fixed_cost)) => CostModel::FixedPlusLinear {
                    unit_cost,
                    fixed_cost,
                },
                _ => {
                    warn!(
                        "Component {}: cost model 1 needs fixed-unit-price and fixed-price; \
                         falling back to cost model 0",
                        def.id
                    );
                    linear()
                }
            },
            2 => match props.data_pair.as_deref().map(parse_price_pairs) {
                Some(Ok(pairs)) => CostModel::PricePairs(pairs),
                Some(Err(err)) => {
                    warn!(
                        "Component {}: invalid data-pair ({err:#}); falling back to cost model 0",
                        def.id
                    );
                    linear()
                }
                None => {
                    warn!(
                        "Component {}: cost model 2 needs data-pair; falling back to cost model 0",
                        def.id
                    );
                    linear()
                }
            },
            other => {
                warn!(
                    "Component {}: unknown cost model {other}; using cost model 0",
                    def.id
                );
                linear()
            }
        }
    }

    /// Work out the component's specialised behaviour from its type
    fn behaviour_from_properties(
        def: &ComponentDefinition,
        props: &ComponentProperties,
    ) -> Behaviour {
        match def.comp_type.kind() {
            ComponentKind::Grid => Behaviour::Grid,
            ComponentKind::Solar => Behaviour::Solar,
            ComponentKind::Consumption => Behaviour::Consumption,
            ComponentKind::Storage => {
                let default = StorageParameters::default();
                let get = |value: Option<f64>, default: f64, name: &str| {
                    property_or_default(value, default, name, def)
                };
                let params = StorageParameters {
                    input_efficiency: get(
                        props.input_efficiency,
                        default.input_efficiency,
                        "input_efficiency",
                    ),
                    output_efficiency: get(
                        props.output_efficiency,
                        default.output_efficiency,
                        "output_efficiency",
                    ),
                    min_soc: get(props.min_soc, default.min_soc, "min_soc"),
                    max_soc: get(props.max_soc, default.max_soc, "max_soc"),
                    init_soc: get(props.init_soc, default.init_soc, "init_soc"),
                    e2p_in: get(props.e2p_in, default.e2p_in, "e2p_in"),
                    e2p_out: get(props.e2p_out, default.e2p_out, "e2p_out"),
                };
                if let Err(err) = params.validate() {
                    warn!(
                        "Component {}: invalid storage parameters ({err:#}); using defaults",
                        def.id
                    );
                    Behaviour::Storage(default)
                } else {
                    Behaviour::Storage(params)
                }
            }
            ComponentKind::Conversion => match def.comp_type {
                ComponentType::CHP => Behaviour::Chp,
                ComponentType::HeatPump => Behaviour::HeatPump {
                    carnot_efficiency: property_or_default(
                        props.carnot_efficiency,
                        DEFAULT_CARNOT_EFFICIENCY,
                        "carnot_efficiency",
                        def,
                    ),
                    supply_temperature: property_or_default(
                        props.supply_temperature,
                        DEFAULT_SUPPLY_TEMPERATURE,
                        "supply_temperature",
                        def,
                    ),
                },
                _ => Behaviour::Conversion,
            },
        }
    }

    /// The carriers this component exchanges
    pub fn capabilities(&self) -> Capabilities {
        self.comp_type.capabilities()
    }

    /// Input carriers, in order
    pub fn inputs(&self) -> &'static [Carrier] {
        self.capabilities().inputs
    }

    /// Output carriers, in order
    pub fn outputs(&self) -> &'static [Carrier] {
        self.capabilities().outputs
    }

    /// The component's family
    pub fn kind(&self) -> ComponentKind {
        self.comp_type.kind()
    }

    /// The carrier whose output defines the component's size
    pub fn main_output(&self) -> Option<Carrier> {
        self.outputs().first().copied()
    }

    /// The largest possible output of a carrier in any step
    pub fn output_bound(&self, carrier: Carrier) -> f64 {
        match &self.behaviour {
            Behaviour::Storage(params) => params.max_output(self.max_size).min(self.max_size),
            Behaviour::Chp if carrier == Carrier::Elec => {
                CHP_LARGE.slope * self.max_size + CHP_LARGE.intercept
            }
            _ => self.max_size,
        }
    }

    /// The largest possible input of a carrier in any step
    pub fn input_bound(&self, carrier: Carrier, ctx: &CompileContext) -> f64 {
        let max_output = self.max_size;
        match &self.behaviour {
            Behaviour::Grid => max_output,
            Behaviour::Solar => {
                let max_irradiance = ctx.profiles.irradiance().into_iter().fold(0.0, f64::max);
                max_output * max_irradiance
            }
            Behaviour::Conversion if self.efficiency > 0.0 => max_output / self.efficiency,
            Behaviour::Conversion => f64::INFINITY,
            Behaviour::HeatPump {
                carnot_efficiency,
                supply_temperature,
            } => {
                let min_cop = ctx
                    .profiles
                    .temperature()
                    .into_iter()
                    .map(|temperature| {
                        heat_pump_cop(*carnot_efficiency, *supply_temperature, temperature)
                    })
                    .fold(MAX_COP, f64::min);
                if min_cop > 0.0 {
                    max_output / min_cop
                } else {
                    f64::INFINITY
                }
            }
            Behaviour::Chp => {
                let temperature = ctx.profiles.temperature();
                let min_eta = CHP_SMALL
                    .min_thermal_efficiency(&temperature)
                    .min(CHP_LARGE.min_thermal_efficiency(&temperature));
                max_output / min_eta
            }
            Behaviour::Storage(params) => params.max_input(self.max_size),
            Behaviour::Consumption => ctx
                .profiles
                .demand(carrier)
                .unwrap_or_default()
                .into_iter()
                .fold(0.0, f64::max),
        }
    }

    /// Declare the component's decision variables.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to add variables to
    /// * `ctx` - Building-wide information
    /// * `subsidy_caps` - For each subsidy level with purchase rules for this component, the
    ///   largest subsidy it could pay
    pub fn declare_variables(
        &self,
        problem: &mut Problem,
        ctx: &CompileContext,
        subsidy_caps: &IndexMap<SubsidyLevel, f64>,
    ) -> ComponentVars {
        let name = &self.id;
        let len = ctx.time.len();
        let size = problem.add_continuous(format!("{name}.size"), self.min_size..=self.max_size);
        let max_invest = self.cost_model.max_investment(self.max_size);
        let invest = problem.add_continuous(format!("{name}.invest"), 0.0..=max_invest);
        let annual_cost = problem.add_continuous(format!("{name}.annual_cost"), ..);

        let inputs = self
            .inputs()
            .iter()
            .map(|&carrier| {
                let bound = self.input_bound(carrier, ctx);
                let vars =
                    problem.add_time_series(&format!("{name}.input_{carrier}"), len, 0.0..=bound);
                (carrier, vars)
            })
            .collect();
        let outputs = self
            .outputs()
            .iter()
            .map(|&carrier| {
                let bound = self.output_bound(carrier);
                let vars =
                    problem.add_time_series(&format!("{name}.output_{carrier}"), len, 0.0..=bound);
                (carrier, vars)
            })
            .collect();
        let purchase_subsidies = subsidy_caps
            .iter()
            .map(|(&level, &cap)| {
                let var = problem.add_continuous(
                    format!("{name}.purchase_subsidy_{}", level.as_str()),
                    0.0..=cap.max(0.0),
                );
                (level, var)
            })
            .collect();

        let size_el = matches!(self.behaviour, Behaviour::Chp).then(|| {
            problem.add_continuous(
                format!("{name}.size_el"),
                0.0..=self.output_bound(Carrier::Elec),
            )
        });
        let stored_energy = match &self.behaviour {
            Behaviour::Storage(params) => Some(problem.add_time_series(
                &format!("{name}.stored_energy"),
                len,
                0.0..=params.max_soc * self.max_size,
            )),
            _ => None,
        };

        ComponentVars {
            size,
            invest,
            annual_cost,
            inputs,
            outputs,
            purchase_subsidies,
            size_el,
            stored_energy,
            status: None,
        }
    }

    /// Add all of the component's own constraints
    pub fn declare_constraints(
        &self,
        problem: &mut Problem,
        vars: &mut ComponentVars,
        ctx: &CompileContext,
    ) {
        self.declare_conversion_constraint(problem, vars, ctx);
        self.declare_max_power_constraint(problem, vars);
        self.declare_investment_constraint(problem, vars, ctx);
        self.declare_annual_cost_constraint(problem, vars, ctx);

        match &self.behaviour {
            Behaviour::Storage(params) => {
                self.declare_storage_constraints(problem, vars, params, ctx);
            }
            Behaviour::Chp => self.declare_chp_constraints(problem, vars, ctx),
            _ => {}
        }

        if self.min_part_load > 0.0 {
            vars.status = self.main_output().and_then(|carrier| {
                let output = vars.output(carrier)?;
                Some(declare_part_load(
                    problem,
                    &self.id.0,
                    vars.size,
                    output,
                    self.min_part_load,
                ))
            });
        }
    }

    /// Add the equation linking the component's inputs and outputs
    pub fn declare_conversion_constraint(
        &self,
        problem: &mut Problem,
        vars: &ComponentVars,
        ctx: &CompileContext,
    ) {
        match &self.behaviour {
            Behaviour::Grid | Behaviour::Chp | Behaviour::Storage(_) => {}
            Behaviour::Consumption => {
                for (&carrier, input) in &vars.inputs {
                    let demand = ctx.profiles.demand(carrier).unwrap_or_default();
                    for (t, &var) in input.iter().enumerate() {
                        let value = demand.get(t).copied().unwrap_or(0.0);
                        problem.add_constraint(Constraint::eq(var, value));
                    }
                }
            }
            Behaviour::Conversion => {
                self.declare_efficiency(problem, vars, |_| self.efficiency);
            }
            Behaviour::HeatPump {
                carnot_efficiency,
                supply_temperature,
            } => {
                let temperature = ctx.profiles.temperature();
                self.declare_efficiency(problem, vars, |t| {
                    heat_pump_cop(*carnot_efficiency, *supply_temperature, temperature[t])
                });
            }
            Behaviour::Solar => {
                let irradiance = ctx.profiles.irradiance();
                if let Some(solar) = vars.input(Carrier::Solar) {
                    for (t, &solar) in solar.iter().enumerate() {
                        problem.add_constraint(Constraint::le(solar, vars.size * irradiance[t]));
                    }
                }
                self.declare_efficiency(problem, vars, |_| self.efficiency);
            }
        }
    }

    /// `output[t] = input[t] * efficiency(t)` for every output, using the first input
    fn declare_efficiency<F>(&self, problem: &mut Problem, vars: &ComponentVars, efficiency: F)
    where
        F: Fn(usize) -> f64,
    {
        let Some(input) = vars.inputs.values().next() else {
            return;
        };
        for output in vars.outputs.values() {
            for (t, (&input, &output)) in input.iter().zip(output).enumerate() {
                problem.add_constraint(Constraint::eq(output, input * efficiency(t)));
            }
        }
    }

    /// `output[t] <= size` for every output and step.
    ///
    /// The electricity output of a CHP unit is limited by its electrical size instead.
    pub fn declare_max_power_constraint(&self, problem: &mut Problem, vars: &ComponentVars) {
        for (&carrier, output) in &vars.outputs {
            let limit = match vars.size_el {
                Some(size_el) if carrier == Carrier::Elec => size_el,
                _ => vars.size,
            };
            for &output in output {
                problem.add_constraint(Constraint::le(output, limit));
            }
        }
    }

    /// Add the constraints of the component's investment cost model
    pub fn declare_investment_constraint(
        &self,
        problem: &mut Problem,
        vars: &ComponentVars,
        ctx: &CompileContext,
    ) {
        self.cost_model.declare_constraints(
            problem,
            &self.id.0,
            vars.size,
            vars.invest,
            self.min_size,
            ctx.settings.size_epsilon,
        );
    }

    /// `annual_cost = annuity * (invest - subsidies) + running costs`
    pub fn declare_annual_cost_constraint(
        &self,
        problem: &mut Problem,
        vars: &ComponentVars,
        ctx: &CompileContext,
    ) {
        let subsidies: Vec<_> = vars.purchase_subsidies.values().copied().collect();
        let economics = &self.economics;
        let expr = annual_cost_expr(
            vars.invest,
            &subsidies,
            annuity_factor(economics.life, ctx.finance).value(),
            operation_factor(economics.f_inst, economics.f_w, economics.f_op).value(),
        );
        problem.add_constraint(Constraint::eq(vars.annual_cost, expr));
    }

    fn declare_storage_constraints(
        &self,
        problem: &mut Problem,
        vars: &ComponentVars,
        params: &StorageParameters,
        ctx: &CompileContext,
    ) {
        let (Some(stored), Some(input), Some(output)) = (
            vars.stored_energy.as_deref(),
            vars.inputs.values().next(),
            vars.outputs.values().next(),
        ) else {
            return;
        };

        params.declare_state_recurrence(problem, ctx.time, vars.size, stored, input, output);
        params.declare_rate_constraint(problem, vars.size, input, output);
        params.declare_capacity_bounds(problem, vars.size, stored);
    }

    fn declare_chp_constraints(
        &self,
        problem: &mut Problem,
        vars: &ComponentVars,
        ctx: &CompileContext,
    ) {
        let (Some(size_el), Some(gas), Some(heat), Some(elec)) = (
            vars.size_el,
            vars.input(Carrier::Gas),
            vars.output(Carrier::Heat),
            vars.output(Carrier::Elec),
        ) else {
            return;
        };
        let chp_vars = ChpVars {
            size: vars.size,
            size_el,
            gas,
            heat,
            elec,
        };

        declare_chp_constraints(
            problem,
            &self.id.0,
            &chp_vars,
            &ctx.profiles.temperature(),
            ctx.settings.size_epsilon,
        );
    }

    /// Annual variable operating cost, as an expression
    pub fn variable_cost_expr(&self, vars: &ComponentVars, time: &TimeIndex) -> LinExpr {
        if self.variable_cost == 0.0 {
            return LinExpr::default();
        }

        let Some(output) = self.main_output().and_then(|carrier| vars.output(carrier)) else {
            return LinExpr::default();
        };
        time.weighted_sum(output) * self.variable_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{component_definition, context_data};
    use crate::problem::Sense;
    use crate::solver::{HighsSolver, Solver};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.4, 55.0, 20.0, 0.4 * 328.15 / 35.0)]
    #[case(0.4, 50.0, 55.0, MAX_COP)] // Source warmer than supply
    #[case(0.5, 55.0, 54.0, MAX_COP)] // Capped
    fn test_heat_pump_cop(
        #[case] carnot_efficiency: f64,
        #[case] supply_temperature: f64,
        #[case] ambient_temperature: f64,
        #[case] expected: f64,
    ) {
        let cop = heat_pump_cop(carnot_efficiency, supply_temperature, ambient_temperature);
        assert_approx_eq!(f64, cop, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_new_missing_properties() {
        let def = component_definition("boiler", ComponentType::ElectricBoiler, Some(1));
        let component = Component::new(def, None).unwrap();
        assert_eq!(component.cost_model, CostModel::Linear { unit_cost: 0.0 });
        assert_eq!(component.efficiency, DEFAULT_EFFICIENCY);
        assert_eq!(component.economics.life, DEFAULT_LIFE);
    }

    #[rstest]
    #[case(Some(0), 0)]
    #[case(Some(1), 1)]
    #[case(Some(2), 2)]
    #[case(Some(7), 0)] // Unknown cost model
    #[case(None, 0)]
    fn test_new_cost_model(#[case] cost_model: Option<u8>, #[case] expected: u8) {
        let def = component_definition("boiler", ComponentType::GasBoiler, cost_model);
        let props = ComponentProperties {
            only_unit_price: Some(100.0),
            fixed_unit_price: Some(80.0),
            fixed_price: Some(500.0),
            data_pair: Some("10;900/20;1500".into()),
            ..ComponentProperties::default()
        };
        let component = Component::new(def, Some(&props)).unwrap();
        assert_eq!(component.cost_model.index(), expected);
    }

    #[test]
    fn test_new_out_of_range_properties() {
        let def = component_definition("boiler", ComponentType::ElectricBoiler, Some(0));
        let props = ComponentProperties {
            efficiency: Some(-0.5),
            life: Some(0.0),
            only_unit_price: Some(-100.0),
            f_w: Some(-0.01),
            ..ComponentProperties::default()
        };
        let component = Component::new(def, Some(&props)).unwrap();
        assert_eq!(component.efficiency, DEFAULT_EFFICIENCY);
        assert_eq!(component.economics.life, DEFAULT_LIFE);
        assert_eq!(component.economics.f_w, 0.0);
        assert_eq!(component.cost_model, CostModel::Linear { unit_cost: 0.0 });

        // Variable bounds stay consistent
        let (time, profiles, finance, settings) = context_data(&[10.0]);
        let ctx = CompileContext {
            time: &time,
            profiles: &profiles,
            finance: &finance,
            settings: &settings,
        };
        let mut problem = Problem::new();
        let vars = component.declare_variables(&mut problem, &ctx, &IndexMap::new());
        let input = vars.input(Carrier::Elec).unwrap()[0];
        assert_eq!(problem.bounds(input), (0.0, 100.0));
        assert_eq!(problem.bounds(vars.invest), (0.0, 0.0));
    }

    #[test]
    fn test_new_negative_fixed_price_falls_back() {
        let def = component_definition("boiler", ComponentType::GasBoiler, Some(1));
        let props = ComponentProperties {
            only_unit_price: Some(100.0),
            fixed_unit_price: Some(-80.0),
            fixed_price: Some(500.0),
            ..ComponentProperties::default()
        };
        let component = Component::new(def, Some(&props)).unwrap();
        assert_eq!(component.cost_model, CostModel::Linear { unit_cost: 100.0 });
    }

    #[test]
    fn test_new_invalid_sizes() {
        let mut def = component_definition("boiler", ComponentType::GasBoiler, None);
        def.min_size = 10.0;
        def.max_size = 5.0;
        assert!(Component::new(def, None).is_err());
    }

    #[test]
    fn test_new_invalid_storage_falls_back() {
        let def = component_definition("tank", ComponentType::HotWaterStorage, None);
        let props = ComponentProperties {
            min_soc: Some(0.8),
            max_soc: Some(0.2),
            ..ComponentProperties::default()
        };
        let component = Component::new(def, Some(&props)).unwrap();
        assert_eq!(
            component.behaviour,
            Behaviour::Storage(StorageParameters::default())
        );
    }

    #[test]
    fn test_electric_boiler_scenario() {
        let (time, profiles, finance, settings) = context_data(&[10.0, 10.0, 0.0]);
        let ctx = CompileContext {
            time: &time,
            profiles: &profiles,
            finance: &finance,
            settings: &settings,
        };
        let def = component_definition("boiler", ComponentType::ElectricBoiler, Some(0));
        let props = ComponentProperties {
            efficiency: Some(0.98),
            only_unit_price: Some(100.0),
            life: Some(20.0),
            ..ComponentProperties::default()
        };
        let component = Component::new(def, Some(&props)).unwrap();

        let mut problem = Problem::new();
        let mut vars = component.declare_variables(&mut problem, &ctx, &IndexMap::new());
        component.declare_constraints(&mut problem, &mut vars, &ctx);
        let heat = vars.output(Carrier::Heat).unwrap().to_vec();
        for (t, demand) in [10.0, 10.0, 0.0].into_iter().enumerate() {
            problem.add_constraint(Constraint::eq(heat[t], demand));
        }
        problem.set_objective(vars.annual_cost, Sense::Minimise);

        let solution = HighsSolver::default().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        assert_approx_eq!(f64, solution.value(vars.size), 10.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(vars.invest), 1000.0, epsilon = 1e-4);
        let input = solution.values(vars.input(Carrier::Elec).unwrap());
        for (actual, expected) in input.iter().zip([10.0 / 0.98, 10.0 / 0.98, 0.0]) {
            assert_approx_eq!(f64, *actual, expected, epsilon = 1e-6);
        }
        assert!(vars.status.is_none());
    }
}
