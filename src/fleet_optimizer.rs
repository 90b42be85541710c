use std::path::Path;

use super::config::DemandOptions;
use super::config::ModelParams;
use super::config::OptConfig;
use super::config::Scenario;
use super::errors::PipelineError;
use super::model::build_model;
use super::network::TransitNetwork;
use super::passengers::OdRecord;
use super::routing::route_demand;
use super::routing::RoutingGap;
use super::routing::RoutingReport;
use super::routing::SegmentDemand;
use super::solver::solve_lexicographic;
use super::solver::LexicographicOutcome;


/// One optimisation run: the demand that went into the model and what came out.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub segment_demand: SegmentDemand,
    pub params: ModelParams,
    pub outcome: LexicographicOutcome,
}

/// The result of running one named scenario.  A failing scenario does not stop the others.
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub result: Result<OptimizationResult, PipelineError>,
}

/// Routes OD demand onto the network once, then optimises fleet allocation for the base
/// configuration or any of its scenarios.
pub struct FleetOptimizer {
    cfg: OptConfig,
    network: TransitNetwork,
    // routed at a multiplier of 1, so that each run can apply its own
    unit_routing: RoutingReport,
}

impl FleetOptimizer {
    /// Loads the config at `config_path` and the OD data it points to.  `od_override`, if given,
    /// replaces the config's OD path.
    pub fn from_cfg(config_path: &Path, od_override: Option<&Path>)
                    -> Result<FleetOptimizer, PipelineError> {
        let cfg = OptConfig::from_path(config_path)?;
        let has_headers = cfg.od_source.as_ref().map(|src| src.has_headers).unwrap_or(false);
        let records = match (od_override, &cfg.od_source) {
            (Some(path), _) => OdRecord::all_from_csv(path, has_headers)?,
            (None, Some(source)) => OdRecord::all_from_csv(&source.path, source.has_headers)?,
            (None, None) => {
                log::warn!("no OD data configured; every segment has zero demand");
                vec![]
            }
        };
        return FleetOptimizer::new(cfg, &records);
    }

    pub fn new(cfg: OptConfig, records: &[OdRecord]) -> Result<FleetOptimizer, PipelineError> {
        let network = TransitNetwork::from_topology(&cfg.topology)?;
        let unit_options = DemandOptions{multiplier: 1., ..cfg.demand.clone()};
        let unit_routing = route_demand(&network, records, &cfg.periods, &unit_options);
        log::info!("routed {} passengers, excluded {}", unit_routing.routed_passengers,
                   unit_routing.excluded_passengers());
        return Ok(FleetOptimizer{cfg, network, unit_routing});
    }

    pub fn config(&self) -> &OptConfig {
        &self.cfg
    }

    pub fn network(&self) -> &TransitNetwork {
        &self.network
    }

    pub fn routing_gaps(&self) -> &[RoutingGap] {
        &self.unit_routing.gaps
    }

    pub fn routed_passengers(&self) -> u64 {
        self.unit_routing.routed_passengers
    }

    /// Segment demand after applying `multiplier`.
    pub fn segment_demand(&self, multiplier: f64) -> SegmentDemand {
        self.unit_routing.demand.scaled(multiplier)
    }

    /// Optimises the base configuration.
    pub fn run(&self) -> Result<OptimizationResult, PipelineError> {
        return self.optimise(self.cfg.demand.multiplier, &self.cfg.params);
    }

    pub fn run_scenario(&self, scenario: &Scenario) -> Result<OptimizationResult, PipelineError> {
        log::info!("running scenario '{}'", scenario.name);
        let params = scenario.apply(&self.cfg.params)?;
        let multiplier = scenario.demand_multiplier.unwrap_or(self.cfg.demand.multiplier);
        return self.optimise(multiplier, &params);
    }

    /// Runs every configured scenario in order.
    pub fn run_scenarios(&self) -> Vec<ScenarioResult> {
        self.cfg.scenarios.iter().map(|scenario| {
            let result = self.run_scenario(scenario);
            if let Err(err) = &result {
                log::warn!("scenario '{}' failed: {}", scenario.name, err);
            }
            ScenarioResult{name: scenario.name.clone(), result}
        }).collect()
    }

    fn optimise(&self, multiplier: f64, params: &ModelParams)
                -> Result<OptimizationResult, PipelineError> {
        let segment_demand = self.segment_demand(multiplier);
        log::debug!("build model for {:.1} passengers of segment demand", segment_demand.total());
        let model = build_model(&segment_demand, &self.network, &self.cfg.periods, params)?;
        let outcome = solve_lexicographic(&model)?;
        return Ok(OptimizationResult{segment_demand, params: params.clone(), outcome});
    }
}
