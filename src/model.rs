// The optimisation model, as plain data.  Building it never touches a solver, so the same
// definition can be solved with different objectives and extra bounds.
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use itertools::iproduct;

use super::config::ModelParams;
use super::errors::ModelError;
use super::network::Line;
use super::network::Segment;
use super::network::TransitNetwork;
use super::routing::SegmentDemand;
use super::time_periods::Period;
use super::time_periods::PeriodMap;


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Integer,
    Continuous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: Option<f64>,
}

/// A sum of coefficient * variable terms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> LinearExpr {
        LinearExpr{terms: vec![]}
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    /// Evaluates the expression, given a value for every variable indexed by `VarId`.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|(var, coef)| coef * values[var.0]).sum()
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<II: IntoIterator<Item = (VarId, f64)>>(iter: II) -> LinearExpr {
        LinearExpr{terms: iter.into_iter().collect()}
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEq,
    GreaterEq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// Capacity of the lines serving a segment plus unmet demand covers the segment's demand.
    Capacity { segment: Segment, period: Period },
    /// Cars in service in a period do not exceed the fleet.
    Fleet { period: Period },
    MinFrequency { line: Line, period: Period },
    MaxFrequency { line: Line, period: Period },
    /// Total unmet demand stays within the first phase's optimum.
    UnmetBound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDef {
    pub name: String,
    pub kind: ConstraintKind,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl ConstraintDef {
    /// How far the constraint is from binding.  Negative when it is violated.
    pub fn slack(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.eval(values);
        match self.sense {
            Sense::LessEq => self.rhs - lhs,
            Sense::GreaterEq => lhs - self.rhs,
        }
    }
}

impl fmt::Display for ConstraintDef {
    fn fmt(&self, ff: &mut fmt::Formatter) -> fmt::Result {
        let sense = match self.sense {
            Sense::LessEq => "<=",
            Sense::GreaterEq => ">=",
        };
        write!(ff, "{} ({} terms {} {})", self.name, self.expr.terms.len(), sense, self.rhs)
    }
}

#[derive(Debug, Clone)]
pub struct FleetModel {
    variables: Vec<VariableDef>,
    frequency_vars: BTreeMap<(Line, Period, u32), VarId>,
    unmet_vars: BTreeMap<(Segment, Period), VarId>,
    constraints: Vec<ConstraintDef>,
    round_trip_hours: BTreeMap<Line, f64>,
    periods: Vec<Period>,
    params: ModelParams,
}

impl FleetModel {
    fn add_variable(&mut self, name: String, kind: VarKind, upper: Option<f64>) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(VariableDef{name, kind, lower: 0., upper});
        id
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn constraints(&self) -> &[ConstraintDef] {
        &self.constraints
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.round_trip_hours.keys().copied()
    }

    pub fn round_trip_hours(&self, line: Line) -> Option<f64> {
        self.round_trip_hours.get(&line).copied()
    }

    pub fn frequency_var(&self, line: Line, period: Period, length: u32) -> Option<VarId> {
        self.frequency_vars.get(&(line, period, length)).copied()
    }

    pub fn frequency_vars(&self) -> impl Iterator<Item = ((Line, Period, u32), VarId)> + '_ {
        self.frequency_vars.iter().map(|(key, var)| (*key, *var))
    }

    pub fn unmet_var(&self, segment: &Segment, period: Period) -> Option<VarId> {
        self.unmet_vars.get(&(segment.clone(), period)).copied()
    }

    pub fn unmet_vars(&self) -> impl Iterator<Item = (&Segment, Period, VarId)> {
        self.unmet_vars.iter().map(|((segment, period), var)| (segment, *period, *var))
    }

    /// Sum of all unmet demand variables.
    pub fn total_unmet(&self) -> LinearExpr {
        self.unmet_vars.values().map(|var| (*var, 1.)).collect()
    }

    /// Cars in service, summed over all lines and periods: frequency * round trip * length.
    pub fn car_hours(&self) -> LinearExpr {
        self.frequency_vars.iter().map(|((line, _, length), var)| {
            (*var, self.round_trip_hours[line] * *length as f64)
        }).collect()
    }

    /// Returns a copy of the model with total unmet demand capped at `bound`.
    pub fn with_unmet_bound(&self, bound: f64) -> FleetModel {
        let mut model = self.clone();
        model.constraints.push(ConstraintDef {
            name: String::from("Stage1_Lock"),
            kind: ConstraintKind::UnmetBound,
            expr: self.total_unmet(),
            sense: Sense::LessEq,
            rhs: bound,
        });
        model
    }
}


/// Assembles the variables and constraints shared by both solve phases.
///
/// A frequency variable is created for every (line, period, train length).  An unmet demand
/// variable and a capacity constraint are created for every segment-period with positive
/// demand.  Each period gets a fleet constraint, and each (line, period) a pair of frequency
/// bounds.
pub fn build_model(demand: &SegmentDemand, network: &TransitNetwork, periods: &PeriodMap,
                   params: &ModelParams) -> Result<FleetModel, ModelError> {
    let round_trip_hours: BTreeMap<Line, f64> = network.lines().filter_map(
        |line| network.round_trip_hours(line).map(|rtt| (line, rtt))).collect();
    let mut model_periods: BTreeSet<Period> = periods.periods().collect();
    model_periods.extend(demand.iter().map(|(_, period, _)| period));
    let model_periods: Vec<Period> = model_periods.into_iter().collect();

    let mut model = FleetModel {
        variables: vec![],
        frequency_vars: BTreeMap::new(),
        unmet_vars: BTreeMap::new(),
        constraints: vec![],
        round_trip_hours,
        periods: model_periods.clone(),
        params: params.clone(),
    };

    log::debug!("create frequency variables");
    let lines: Vec<Line> = model.lines().collect();
    for (line, period, length) in iproduct!(lines.iter(), model_periods.iter(),
                                            params.train_lengths.iter()) {
        let name = format!("freq_{}_{}_{}cars", line, period, length);
        let var = model.add_variable(name, VarKind::Integer, Some(params.max_frequency as f64));
        model.frequency_vars.insert((*line, *period, *length), var);
    }

    log::debug!("create unmet demand variables and capacity constraints");
    for (segment, period, passengers) in demand.iter() {
        if !(passengers >= 0.) || !passengers.is_finite() {
            return Err(ModelError::InvalidDemand{segment: segment.clone(), period,
                                                 value: passengers});
        }
        if passengers == 0. {
            continue;
        }
        let lines_here = network.lines_on_segment(segment);
        if lines_here.is_empty() {
            return Err(ModelError::UnservedSegment{segment: segment.clone(), period});
        }
        let unmet = model.add_variable(format!("unmet_{}_{}_{}", segment.from, segment.to, period),
                                       VarKind::Continuous, None);
        model.unmet_vars.insert((segment.clone(), period), unmet);

        let mut capacity = LinearExpr::new();
        for (line, length) in iproduct!(lines_here.iter(), params.train_lengths.iter()) {
            let var = model.frequency_vars[&(*line, period, *length)];
            capacity.add_term(var, *length as f64 * params.car_capacity);
        }
        capacity.add_term(unmet, 1.);
        model.constraints.push(ConstraintDef {
            name: format!("Dem_{}_{}_{}", segment.from, segment.to, period),
            kind: ConstraintKind::Capacity{segment: segment.clone(), period},
            expr: capacity,
            sense: Sense::GreaterEq,
            rhs: passengers,
        });
    }

    log::debug!("add frequency policy constraints");
    for (line, period) in iproduct!(lines.iter(), model_periods.iter()) {
        let total_freq: LinearExpr = params.train_lengths.iter()
            .map(|length| (model.frequency_vars[&(*line, *period, *length)], 1.))
            .collect();
        model.constraints.push(ConstraintDef {
            name: format!("MaxFreq_{}_{}", line, period),
            kind: ConstraintKind::MaxFrequency{line: *line, period: *period},
            expr: total_freq.clone(),
            sense: Sense::LessEq,
            rhs: params.max_frequency as f64,
        });
        model.constraints.push(ConstraintDef {
            name: format!("MinFreq_{}_{}", line, period),
            kind: ConstraintKind::MinFrequency{line: *line, period: *period},
            expr: total_freq,
            sense: Sense::GreaterEq,
            rhs: params.min_frequency as f64,
        });
    }

    log::debug!("add fleet capacity constraints");
    for period in &model_periods {
        let cars_needed: LinearExpr = iproduct!(lines.iter(), params.train_lengths.iter())
            .map(|(line, length)| {
                let var = model.frequency_vars[&(*line, *period, *length)];
                (var, model.round_trip_hours[line] * *length as f64)
            }).collect();
        model.constraints.push(ConstraintDef {
            name: format!("FleetCap_{}", period),
            kind: ConstraintKind::Fleet{period: *period},
            expr: cars_needed,
            sense: Sense::LessEq,
            rhs: params.fleet_size,
        });
    }

    log::debug!("model has {} frequency variables, {} unmet demand variables, {} constraints",
                model.frequency_vars.len(), model.unmet_vars.len(), model.constraints.len());
    return Ok(model);
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::network::TransitNetwork;
    use super::super::test_utils::t_network_topology;
    use super::super::test_utils::single_period;

    fn demand_of(entries: &[(&str, &str, Period, f64)]) -> SegmentDemand {
        entries.iter().map(|(from, to, period, dd)| (Segment::new(from, to), *period, *dd))
            .collect()
    }

    #[test]
    fn test_variable_counts() {
        let network = TransitNetwork::from_topology(&t_network_topology()).unwrap();
        let demand = demand_of(&[("A", "B", Period::AM, 500.), ("B", "D", Period::AM, 20.),
                                 ("C", "B", Period::AM, 0.)]);
        let params = ModelParams::default();
        let model = build_model(&demand, &network, &single_period(Period::AM), &params).unwrap();
        // 3 lines x 1 period x 8 lengths
        assert_eq!(model.frequency_vars().count(), 24);
        // the zero-demand segment gets no unmet variable
        assert_eq!(model.unmet_vars().count(), 2);
        assert_eq!(model.variables().len(), 26);
        // 2 capacity, 3 x 2 frequency bounds, 1 fleet
        assert_eq!(model.constraints().len(), 9);
        let integer_count = model.variables().iter().filter(|vv| vv.kind == VarKind::Integer)
            .count();
        assert_eq!(integer_count, 24);
        assert!(model.variables().iter().all(|vv| vv.lower == 0.));
    }

    #[test]
    fn test_capacity_constraint_terms() {
        let mut topology = t_network_topology();
        topology.lines.push((Line::Yellow, vec!["A".into(), "B".into(), "D".into()]));
        topology.round_trip_hours.insert(Line::Yellow, 1.5);
        let network = TransitNetwork::from_topology(&topology).unwrap();
        let demand = demand_of(&[("A", "B", Period::PM, 1000.)]);
        let mut params = ModelParams::default();
        params.train_lengths = vec![4, 8];
        params.car_capacity = 100.;
        let model = build_model(&demand, &network, &single_period(Period::PM), &params).unwrap();

        let capacity = model.constraints().iter()
            .find(|cc| matches!(cc.kind, ConstraintKind::Capacity{..})).unwrap();
        assert_eq!(capacity.name, "Dem_A_B_PM");
        assert_eq!(capacity.sense, Sense::GreaterEq);
        assert_eq!(capacity.rhs, 1000.);
        // RED and YELLOW serve A->B, with two lengths each, plus the unmet variable
        assert_eq!(capacity.expr.terms.len(), 5);
        let red_8 = model.frequency_var(Line::Red, Period::PM, 8).unwrap();
        let yellow_4 = model.frequency_var(Line::Yellow, Period::PM, 4).unwrap();
        let unmet = model.unmet_var(&Segment::new("A", "B"), Period::PM).unwrap();
        assert!(capacity.expr.terms.contains(&(red_8, 800.)));
        assert!(capacity.expr.terms.contains(&(yellow_4, 400.)));
        assert!(capacity.expr.terms.contains(&(unmet, 1.)));
        let blue_4 = model.frequency_var(Line::Blue, Period::PM, 4).unwrap();
        assert!(!capacity.expr.terms.iter().any(|(var, _)| *var == blue_4));
    }

    #[test]
    fn test_fleet_and_frequency_constraints() {
        let network = TransitNetwork::from_topology(&t_network_topology()).unwrap();
        let demand = demand_of(&[("A", "B", Period::AM, 10.)]);
        let mut params = ModelParams::default();
        params.train_lengths = vec![3, 10];
        params.fleet_size = 77.;
        let model = build_model(&demand, &network, &single_period(Period::AM), &params).unwrap();

        let fleet = model.constraints().iter()
            .find(|cc| cc.kind == ConstraintKind::Fleet{period: Period::AM}).unwrap();
        assert_eq!(fleet.sense, Sense::LessEq);
        assert_eq!(fleet.rhs, 77.);
        assert_eq!(fleet.expr.terms.len(), 6);
        let green_10 = model.frequency_var(Line::Green, Period::AM, 10).unwrap();
        // GREEN has a round trip of 1 hour in the test topology
        assert!(fleet.expr.terms.contains(&(green_10, 10.)));

        let min_red = model.constraints().iter()
            .find(|cc| cc.kind == ConstraintKind::MinFrequency{line: Line::Red,
                                                                period: Period::AM}).unwrap();
        assert_eq!(min_red.rhs, 2.);
        assert_eq!(min_red.expr.terms.len(), 2);
        assert!(min_red.expr.terms.iter().all(|(_, coef)| *coef == 1.));
        let max_red = model.constraints().iter()
            .find(|cc| cc.kind == ConstraintKind::MaxFrequency{line: Line::Red,
                                                                period: Period::AM}).unwrap();
        assert_eq!(max_red.rhs, 12.);
    }

    #[test]
    fn test_objective_expressions() {
        let network = TransitNetwork::from_topology(&t_network_topology()).unwrap();
        let demand = demand_of(&[("A", "B", Period::AM, 10.), ("B", "A", Period::AM, 5.)]);
        let mut params = ModelParams::default();
        params.train_lengths = vec![4];
        let model = build_model(&demand, &network, &single_period(Period::AM), &params).unwrap();
        assert_eq!(model.total_unmet().terms.len(), 2);

        let mut values = vec![0.; model.variables().len()];
        values[model.frequency_var(Line::Red, Period::AM, 4).unwrap().0] = 3.;
        values[model.frequency_var(Line::Blue, Period::AM, 4).unwrap().0] = 2.;
        // RED: 3 trains x 2h x 4 cars, BLUE: 2 trains x 1.5h x 4 cars
        assert_eq!(model.car_hours().eval(&values), 36.);

        let bounded = model.with_unmet_bound(12.5);
        assert_eq!(bounded.constraints().len(), model.constraints().len() + 1);
        let lock = bounded.constraints().last().unwrap();
        assert_eq!(lock.kind, ConstraintKind::UnmetBound);
        assert_eq!(lock.rhs, 12.5);
        values[model.unmet_var(&Segment::new("A", "B"), Period::AM).unwrap().0] = 10.;
        assert_eq!(lock.slack(&values), 2.5);
    }

    #[test]
    fn test_unserved_segment() {
        let network = TransitNetwork::from_topology(&t_network_topology()).unwrap();
        let demand = demand_of(&[("A", "D", Period::AM, 10.)]);
        let result = build_model(&demand, &network, &single_period(Period::AM),
                                 &ModelParams::default());
        assert!(matches!(result, Err(ModelError::UnservedSegment{..})));

        let demand = demand_of(&[("A", "B", Period::AM, f64::NAN)]);
        let result = build_model(&demand, &network, &single_period(Period::AM),
                                 &ModelParams::default());
        assert!(matches!(result, Err(ModelError::InvalidDemand{..})));
    }
}
