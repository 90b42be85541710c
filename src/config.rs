use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use yaml_rust::Yaml;
use yaml_rust::YamlLoader;

use super::config_utils;
use super::errors::ConfigError;
use super::network::Line;
use super::time_periods::Period;
use super::time_periods::PeriodMap;


static DEFAULT_TRANSFER_PENALTY: f64 = 4.;
static DEFAULT_TRAVEL_TIME: f64 = 1.;
static DEFAULT_CAR_CAPACITY: f64 = 200.;
static DEFAULT_FLEET_SIZE: f64 = 1100.;
static DEFAULT_MIN_FREQUENCY: u32 = 2;
static DEFAULT_MAX_FREQUENCY: u32 = 12;
static DEFAULT_UNMET_EPSILON: f64 = 0.01;
static DEFAULT_TIME_LIMIT_S: f64 = 300.;
static DEFAULT_MIN_TRAIN_LENGTH: u32 = 3;
static DEFAULT_MAX_TRAIN_LENGTH: u32 = 10;


/// The static shape of the network: which stations exist and which lines visit them.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyConfig {
    pub stations: Vec<String>,
    /// Each line's stations in forward order; lines run in both directions.
    pub lines: Vec<(Line, Vec<String>)>,
    pub round_trip_hours: BTreeMap<Line, f64>,
    /// Cost of changing lines at a station, in the same units as travel times.
    pub transfer_penalty: f64,
    pub default_travel_time: f64,
    /// Per-segment travel time overrides, applied to both directions.
    pub travel_times: Vec<(String, String, f64)>,
}

/// Numeric inputs to the optimisation model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// Allowed train lengths, in cars.  Sorted and deduplicated.
    pub train_lengths: Vec<u32>,
    /// Passengers per car.
    pub car_capacity: f64,
    /// Total cars available across all lines.
    pub fleet_size: f64,
    /// Trains per hour a line must run in every period.
    pub min_frequency: u32,
    /// Trains per hour a line may run at most in any period.
    pub max_frequency: u32,
    /// Slack added to the phase 1 optimum when it is imposed as a bound in phase 2.
    pub unmet_epsilon: f64,
    /// Wall-clock limit for each solver phase.  `None` waits indefinitely.
    pub time_limit: Option<Duration>,
}

impl Default for ModelParams {
    fn default() -> ModelParams {
        ModelParams {
            train_lengths: (DEFAULT_MIN_TRAIN_LENGTH..=DEFAULT_MAX_TRAIN_LENGTH).collect(),
            car_capacity: DEFAULT_CAR_CAPACITY,
            fleet_size: DEFAULT_FLEET_SIZE,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            unmet_epsilon: DEFAULT_UNMET_EPSILON,
            time_limit: Some(Duration::from_secs_f64(DEFAULT_TIME_LIMIT_S)),
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.train_lengths.is_empty() {
            return Err(ConfigError::InvalidParameter(String::from("no train lengths given")));
        }
        if self.train_lengths.contains(&0) {
            return Err(ConfigError::InvalidParameter(String::from("train lengths must be positive")));
        }
        if !(self.car_capacity > 0.) {
            return Err(ConfigError::InvalidParameter(
                format!("car capacity must be positive, got {}", self.car_capacity)));
        }
        if !(self.fleet_size >= 0.) {
            return Err(ConfigError::InvalidParameter(
                format!("fleet size must be non-negative, got {}", self.fleet_size)));
        }
        if self.min_frequency > self.max_frequency {
            return Err(ConfigError::InvalidParameter(
                format!("min frequency {} exceeds max frequency {}", self.min_frequency,
                        self.max_frequency)));
        }
        if !(self.unmet_epsilon >= 0.) {
            return Err(ConfigError::InvalidParameter(
                format!("unmet epsilon must be non-negative, got {}", self.unmet_epsilon)));
        }
        return Ok(());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandNormalization {
    /// Divide each period's total by the number of hours in the period, giving passengers/hour.
    HourlyAverage,
    /// Keep the raw per-period totals.
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandOptions {
    pub normalization: DemandNormalization,
    pub multiplier: f64,
}

impl Default for DemandOptions {
    fn default() -> DemandOptions {
        DemandOptions{normalization: DemandNormalization::HourlyAverage, multiplier: 1.}
    }
}

/// A named set of overrides, used to stress the model under different assumptions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scenario {
    pub name: String,
    pub demand_multiplier: Option<f64>,
    pub min_frequency: Option<u32>,
    pub max_frequency: Option<u32>,
    pub car_capacity: Option<f64>,
    pub fleet_size: Option<f64>,
}

fn check_multiplier(multiplier: f64) -> Result<f64, ConfigError> {
    if !(multiplier >= 0.) || !multiplier.is_finite() {
        return Err(ConfigError::InvalidParameter(
            format!("demand multiplier must be finite and non-negative, got {}", multiplier)));
    }
    return Ok(multiplier);
}

impl Scenario {
    /// Returns `params` with this scenario's overrides applied.  Fails if the overrides, or the
    /// scenario's demand multiplier, are invalid.
    pub fn apply(&self, params: &ModelParams) -> Result<ModelParams, ConfigError> {
        if let Some(multiplier) = self.demand_multiplier {
            check_multiplier(multiplier)?;
        }
        let mut params = params.clone();
        if let Some(min_frequency) = self.min_frequency {
            params.min_frequency = min_frequency;
        }
        if let Some(max_frequency) = self.max_frequency {
            params.max_frequency = max_frequency;
        }
        if let Some(car_capacity) = self.car_capacity {
            params.car_capacity = car_capacity;
        }
        if let Some(fleet_size) = self.fleet_size {
            params.fleet_size = fleet_size;
        }
        params.validate()?;
        return Ok(params);
    }

    fn from_yaml(yaml: &Yaml) -> Result<Scenario, ConfigError> {
        let name = match config_utils::opt_str(yaml, "name")? {
            Some(name) => String::from(name),
            None => return Err(ConfigError::MissingKey(String::from("scenarios[].name"))),
        };
        return Ok(Scenario {
            name,
            demand_multiplier: config_utils::opt_f64(yaml, "demand_multiplier")?,
            min_frequency: config_utils::opt_u32(yaml, "min_frequency")?,
            max_frequency: config_utils::opt_u32(yaml, "max_frequency")?,
            car_capacity: config_utils::opt_f64(yaml, "car_capacity")?,
            fleet_size: config_utils::opt_f64(yaml, "fleet_size")?,
        });
    }
}

/// Where OD data lives and how it is laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct OdSource {
    pub path: PathBuf,
    /// With headers, columns are found by name (origin, destination, hour, count).  Without,
    /// rows follow the date, hour, origin, destination, count layout of the published exits
    /// data.
    pub has_headers: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptConfig {
    pub topology: TopologyConfig,
    pub periods: PeriodMap,
    pub params: ModelParams,
    pub demand: DemandOptions,
    pub od_source: Option<OdSource>,
    pub scenarios: Vec<Scenario>,
}

impl OptConfig {
    pub fn from_path(config_path: &Path) -> Result<OptConfig, ConfigError> {
        let file_contents = std::fs::read_to_string(config_path).map_err(
            |source| ConfigError::Io{path: config_path.to_path_buf(), source})?;
        let base_dir = match config_path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        return OptConfig::from_yaml_str(&file_contents, &base_dir);
    }

    /// Parses a config from yaml text.  Relative data paths are resolved against `base_dir`.
    pub fn from_yaml_str(contents: &str, base_dir: &Path) -> Result<OptConfig, ConfigError> {
        let docs = YamlLoader::load_from_str(contents)?;
        let yaml_cfg = match docs.first() {
            Some(doc) => doc,
            None => return Err(ConfigError::EmptyDocument),
        };

        let topology = parse_topology(yaml_cfg)?;

        let periods = if yaml_cfg["periods"].is_badvalue() {
            PeriodMap::standard()
        } else {
            let mut period_hours = vec![];
            for (name, hours) in config_utils::yaml_hash_entries(&yaml_cfg["periods"], "periods")? {
                let period: Period = name.parse()?;
                period_hours.push((period, config_utils::yaml_to_int_list(hours, "periods")?));
            }
            PeriodMap::new(period_hours)?
        };

        let params = parse_params(yaml_cfg)?;
        params.validate()?;

        let demand_cfg = &yaml_cfg["demand"];
        let mut demand = DemandOptions::default();
        let mut od_source = None;
        if !demand_cfg.is_badvalue() {
            if let Some(mode) = config_utils::opt_str(demand_cfg, "normalization")? {
                demand.normalization = match mode {
                    "hourly_average" => DemandNormalization::HourlyAverage,
                    "total" => DemandNormalization::Total,
                    _ => return Err(ConfigError::WrongType{
                        key: String::from("demand.normalization"),
                        expected: "'hourly_average' or 'total'"}),
                };
            }
            if let Some(multiplier) = config_utils::opt_f64(demand_cfg, "multiplier")? {
                demand.multiplier = check_multiplier(multiplier)?;
            }
            if let Some(path) = config_utils::opt_str(demand_cfg, "od_path")? {
                od_source = Some(OdSource {
                    path: config_utils::str_to_absolute_path(path, base_dir),
                    has_headers: config_utils::opt_bool(demand_cfg, "has_headers")?
                        .unwrap_or(false),
                });
            }
        }

        let mut scenarios = vec![];
        if !yaml_cfg["scenarios"].is_badvalue() {
            let scenario_cfgs = match yaml_cfg["scenarios"].as_vec() {
                Some(cfgs) => cfgs,
                None => return Err(ConfigError::WrongType{key: String::from("scenarios"),
                                                          expected: "a list"}),
            };
            for scenario_cfg in scenario_cfgs {
                let scenario = Scenario::from_yaml(scenario_cfg)?;
                // catch bad overrides at load time rather than mid-run
                scenario.apply(&params)?;
                scenarios.push(scenario);
            }
        }

        return Ok(OptConfig{topology, periods, params, demand, od_source, scenarios});
    }
}

fn parse_topology(yaml_cfg: &Yaml) -> Result<TopologyConfig, ConfigError> {
    if yaml_cfg["stations"].is_badvalue() {
        return Err(ConfigError::MissingKey(String::from("stations")));
    }
    let stations = config_utils::yaml_to_str_list(&yaml_cfg["stations"], "stations")?;

    if yaml_cfg["lines"].is_badvalue() {
        return Err(ConfigError::MissingKey(String::from("lines")));
    }
    let mut lines = vec![];
    for (name, stops) in config_utils::yaml_hash_entries(&yaml_cfg["lines"], "lines")? {
        let line: Line = name.parse()?;
        lines.push((line, config_utils::yaml_to_str_list(stops, "lines")?));
    }

    if yaml_cfg["round_trip_hours"].is_badvalue() {
        return Err(ConfigError::MissingKey(String::from("round_trip_hours")));
    }
    let mut round_trip_hours = BTreeMap::new();
    for (name, hours) in config_utils::yaml_hash_entries(&yaml_cfg["round_trip_hours"],
                                                         "round_trip_hours")? {
        let line: Line = name.parse()?;
        match config_utils::yaml_to_f64(hours) {
            Some(hours) => round_trip_hours.insert(line, hours),
            None => return Err(ConfigError::WrongType{key: format!("round_trip_hours.{}", name),
                                                      expected: "a number"}),
        };
    }

    let mut travel_times = vec![];
    if !yaml_cfg["travel_times"].is_badvalue() {
        let entries = match yaml_cfg["travel_times"].as_vec() {
            Some(entries) => entries,
            None => return Err(ConfigError::WrongType{key: String::from("travel_times"),
                                                      expected: "a list of [from, to, time]"}),
        };
        for entry in entries {
            let parsed = match entry.as_vec() {
                Some(triple) if triple.len() == 3 => {
                    let ends = config_utils::yaml_to_str_list(&Yaml::Array(triple[..2].to_vec()),
                                                              "travel_times");
                    match (ends, config_utils::yaml_to_f64(&triple[2])) {
                        (Ok(ends), Some(time)) => Some((ends[0].clone(), ends[1].clone(), time)),
                        _ => None,
                    }
                }
                _ => None,
            };
            match parsed {
                Some(triple) => travel_times.push(triple),
                None => return Err(ConfigError::WrongType{key: String::from("travel_times"),
                                                          expected: "a list of [from, to, time]"}),
            }
        }
    }

    let transfer_penalty = config_utils::opt_f64(yaml_cfg, "transfer_penalty")?
        .unwrap_or(DEFAULT_TRANSFER_PENALTY);
    let default_travel_time = config_utils::opt_f64(yaml_cfg, "default_travel_time")?
        .unwrap_or(DEFAULT_TRAVEL_TIME);
    if !(transfer_penalty >= 0.) || !(default_travel_time >= 0.)
        || travel_times.iter().any(|(_, _, time)| !(*time >= 0.)) {
        return Err(ConfigError::InvalidParameter(
            String::from("travel times and the transfer penalty must be non-negative")));
    }

    return Ok(TopologyConfig {
        stations,
        lines,
        round_trip_hours,
        transfer_penalty,
        default_travel_time,
        travel_times,
    });
}

fn parse_params(yaml_cfg: &Yaml) -> Result<ModelParams, ConfigError> {
    let mut params = ModelParams::default();
    let lengths_cfg = &yaml_cfg["train_lengths"];
    if !lengths_cfg.is_badvalue() {
        let mut lengths = vec![];
        for length in config_utils::yaml_to_int_list(lengths_cfg, "train_lengths")? {
            if length <= 0 || length > u32::MAX as i64 {
                return Err(ConfigError::InvalidParameter(
                    format!("train length {} is not a positive car count", length)));
            }
            lengths.push(length as u32);
        }
        lengths.sort_unstable();
        lengths.dedup();
        params.train_lengths = lengths;
    }
    if let Some(car_capacity) = config_utils::opt_f64(yaml_cfg, "car_capacity")? {
        params.car_capacity = car_capacity;
    }
    if let Some(fleet_size) = config_utils::opt_f64(yaml_cfg, "fleet_size")? {
        params.fleet_size = fleet_size;
    }
    if let Some(min_frequency) = config_utils::opt_u32(yaml_cfg, "min_frequency")? {
        params.min_frequency = min_frequency;
    }
    if let Some(max_frequency) = config_utils::opt_u32(yaml_cfg, "max_frequency")? {
        params.max_frequency = max_frequency;
    }
    if let Some(unmet_epsilon) = config_utils::opt_f64(yaml_cfg, "unmet_epsilon")? {
        params.unmet_epsilon = unmet_epsilon;
    }
    if let Some(limit_s) = config_utils::opt_f64(yaml_cfg, "solver_time_limit_s")? {
        // zero or negative disables the limit
        params.time_limit = if limit_s > 0. {Some(Duration::from_secs_f64(limit_s))} else {None};
    }
    return Ok(params);
}
