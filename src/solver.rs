use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use good_lp::solvers::microlp::microlp;
use good_lp::variable;
use good_lp::Expression;
use good_lp::IntoAffineExpression;
use good_lp::ProblemVariables;
use good_lp::ResolutionError;
use good_lp::Solution;
use good_lp::SolverModel;
use good_lp::Variable;

use super::errors::Phase;
use super::errors::SolveError;
use super::model::FleetModel;
use super::model::LinearExpr;
use super::model::Sense;
use super::model::VarKind;
use super::network::Segment;
use super::schedule::Schedule;
use super::time_periods::Period;


// constraints with less slack than this at the optimum are reported as binding
static BINDING_TOLERANCE: f64 = 1e-6;

/// An optimal point of one phase: the objective value and a value for every model variable.
#[derive(Debug, Clone)]
pub struct PhaseSolution {
    pub objective: f64,
    pub values: Vec<f64>,
}

/// The result of a successful two-phase solve.
#[derive(Debug, Clone)]
pub struct LexicographicOutcome {
    /// The least total unmet demand achievable (passengers, summed over segments and periods).
    pub min_unmet_demand: f64,
    /// Total unmet demand in the fleet-minimal solution.  At most `min_unmet_demand` plus the
    /// configured epsilon.
    pub unmet_demand: f64,
    /// Cars in service summed over lines and periods (frequency * round trip * length).
    pub car_hours: f64,
    pub schedule: Schedule,
    /// Segment-periods left with unmet demand in the final solution.
    pub unmet_by_segment: Vec<(Segment, Period, f64)>,
    /// Names of constraints that are tight at the final solution.
    pub binding_constraints: Vec<String>,
}

fn to_expression(expr: &LinearExpr, lp_vars: &[Variable]) -> Expression {
    expr.terms.iter().map(|(var, coef)| *coef * lp_vars[var.0]).sum()
}

/// Hands the model to the MILP solver and minimises `objective` over it.
fn solve_milp(model: &FleetModel, objective: &LinearExpr) -> Result<PhaseSolution, ResolutionError> {
    let mut vars = ProblemVariables::new();
    let lp_vars: Vec<Variable> = model.variables().iter().map(|def| {
        let mut var_def = variable().min(def.lower).name(def.name.clone());
        if let Some(upper) = def.upper {
            var_def = var_def.max(upper);
        }
        if def.kind == VarKind::Integer {
            var_def = var_def.integer();
        }
        vars.add(var_def)
    }).collect();

    let mut problem = vars.minimise(to_expression(objective, &lp_vars)).using(microlp);
    for constraint_def in model.constraints() {
        let lhs = to_expression(&constraint_def.expr, &lp_vars);
        let rhs = constraint_def.rhs;
        problem = match constraint_def.sense {
            Sense::LessEq => problem.with(lhs.leq(rhs)),
            Sense::GreaterEq => problem.with(lhs.geq(rhs)),
        };
    }

    let solution = problem.solve()?;
    let values: Vec<f64> = lp_vars.iter().map(|var| solution.value(*var)).collect();
    return Ok(PhaseSolution{objective: objective.eval(&values), values});
}

fn to_solve_error(err: ResolutionError, phase: Phase, model: &FleetModel) -> SolveError {
    match err {
        ResolutionError::Infeasible => match phase {
            Phase::MinUnmetDemand => SolveError::Phase1Infeasible,
            Phase::MinFleetUsage => {
                let unmet_bound = model.constraints().last().map(|cc| cc.rhs).unwrap_or(0.);
                SolveError::Phase2Infeasible{unmet_bound}
            }
        },
        ResolutionError::Unbounded => SolveError::Unbounded{phase},
        other => SolveError::Solver{phase, message: other.to_string()},
    }
}

/// Minimises `objective` over `model`, giving up after `time_limit` if one is set.
///
/// With a limit, the solve runs on a worker thread.  The solver cannot be interrupted, so on
/// expiry the thread is detached: it keeps a core busy until the solve finishes, and its result
/// is dropped.  Each timed-out call leaves one such thread behind, so callers running many
/// solves in a row (e.g. every scenario) can accumulate them until they complete.
pub fn solve_phase(model: &FleetModel, objective: &LinearExpr, phase: Phase,
                   time_limit: Option<Duration>) -> Result<PhaseSolution, SolveError> {
    let limit = match time_limit {
        Some(limit) => limit,
        None => return solve_milp(model, objective).map_err(|err| to_solve_error(err, phase, model)),
    };

    let (sender, receiver) = mpsc::channel();
    let worker_model = model.clone();
    let worker_objective = objective.clone();
    let spawned = thread::Builder::new()
        .name(format!("milp-{:?}", phase))
        .spawn(move || {
            // the receiver is gone if we timed out; nothing to do then
            let _ = sender.send(solve_milp(&worker_model, &worker_objective));
        });
    if let Err(err) = spawned {
        return Err(SolveError::Solver{phase, message: format!("couldn't start solver: {}", err)});
    }

    match receiver.recv_timeout(limit) {
        Ok(result) => result.map_err(|err| to_solve_error(err, phase, model)),
        Err(RecvTimeoutError::Timeout) => Err(SolveError::TimedOut{phase, limit}),
        Err(RecvTimeoutError::Disconnected) => Err(SolveError::Solver{
            phase, message: String::from("solver thread stopped without a result")}),
    }
}

/// Runs the two phases: first the least unmet demand U*, then the fewest car-hours among
/// solutions whose unmet demand stays within U* plus epsilon.
pub fn solve_lexicographic(model: &FleetModel) -> Result<LexicographicOutcome, SolveError> {
    let params = model.params();

    log::info!("phase 1: minimising unmet demand");
    let phase1 = match solve_phase(model, &model.total_unmet(), Phase::MinUnmetDemand,
                                   params.time_limit) {
        Ok(solution) => solution,
        Err(err) => {
            log::error!("phase 1 failed: {}", err);
            return Err(err);
        }
    };
    // the solver may return tiny negative noise for a zero optimum
    let min_unmet_demand = phase1.objective.max(0.);
    log::info!("phase 1 complete: minimum unmet demand {:.1} passengers", min_unmet_demand);

    log::info!("phase 2: minimising fleet usage with unmet demand locked");
    let locked = model.with_unmet_bound(min_unmet_demand + params.unmet_epsilon);
    let phase2 = match solve_phase(&locked, &locked.car_hours(), Phase::MinFleetUsage,
                                   params.time_limit) {
        Ok(solution) => solution,
        Err(err) => {
            log::error!("phase 2 failed: {}", err);
            return Err(err);
        }
    };

    let values = &phase2.values;
    let schedule = Schedule::from_solution(&locked, values);
    let car_hours = schedule.car_hours();
    let unmet_demand = locked.total_unmet().eval(values).max(0.);
    let unmet_by_segment = locked.unmet_vars()
        .filter(|(_, _, var)| values[var.0] > BINDING_TOLERANCE)
        .map(|(segment, period, var)| (segment.clone(), period, values[var.0]))
        .collect();
    let binding_constraints = locked.constraints().iter()
        .filter(|cc| cc.slack(values).abs() < BINDING_TOLERANCE)
        .map(|cc| cc.name.clone())
        .collect::<Vec<String>>();

    log::info!("phase 2 complete: {:.1} car-hours, {:.1} passengers unmet", car_hours,
               unmet_demand);
    log::debug!("binding constraints: {:?}", binding_constraints);
    return Ok(LexicographicOutcome {
        min_unmet_demand,
        unmet_demand,
        car_hours,
        schedule,
        unmet_by_segment,
        binding_constraints,
    });
}
