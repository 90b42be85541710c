// imports of other modules from this crate
mod errors;
pub use errors::{ConfigError, LoadError, ModelError, Phase, PipelineError, SolveError};

mod time_periods;
pub use time_periods::{Period, PeriodMap};

mod network;
pub use network::{Direction, Line, Segment, SegmentInfo, TransitNetwork};

mod config_utils;

mod config;
pub use config::{DemandNormalization, DemandOptions, ModelParams, OdSource, OptConfig, Scenario,
                 TopologyConfig};

mod passengers;
pub use passengers::OdRecord;

mod my_dijkstra;

mod routing;
pub use routing::{GapReason, RoutingGap, RoutingReport, SegmentDemand, path_segments,
                  route_demand};

mod model;
pub use model::{ConstraintDef, ConstraintKind, FleetModel, LinearExpr, Sense, VarId, VarKind,
                VariableDef, build_model};

mod schedule;
pub use schedule::{LineService, Schedule, TrainAllocation};

mod solver;
pub use solver::{LexicographicOutcome, PhaseSolution, solve_lexicographic, solve_phase};

mod report;
pub use report::ScheduleTable;

mod fleet_optimizer;
pub use fleet_optimizer::{FleetOptimizer, OptimizationResult, ScenarioResult};

#[cfg(test)]
mod test_utils;
