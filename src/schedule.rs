use std::collections::BTreeMap;

use super::model::FleetModel;
use super::network::Line;
use super::time_periods::Period;


// integer variables may come back a hair off a whole number
static INTEGRALITY_TOLERANCE: f64 = 1e-4;

/// Some number of trains per hour, all of one length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainAllocation {
    pub length: u32,
    pub trains_per_hour: u32,
}

/// What one line runs in one period.  Allocations are ordered longest trains first, and lengths
/// with no trains are left out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineService {
    pub allocations: Vec<TrainAllocation>,
}

impl LineService {
    pub fn total_frequency(&self) -> u32 {
        self.allocations.iter().map(|aa| aa.trains_per_hour).sum()
    }

    /// Cars passing a point in each direction per hour.
    pub fn cars_per_hour(&self) -> u32 {
        self.allocations.iter().map(|aa| aa.trains_per_hour * aa.length).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

/// The optimised service plan: for every line and period in the model, the trains it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    services: BTreeMap<(Line, Period), LineService>,
    round_trip_hours: BTreeMap<Line, f64>,
}

impl Schedule {
    /// Reads the frequency variables of a solved model.  `values` holds one value per model
    /// variable.
    pub fn from_solution(model: &FleetModel, values: &[f64]) -> Schedule {
        let mut services: BTreeMap<(Line, Period), LineService> = BTreeMap::new();
        for line in model.lines() {
            for period in model.periods() {
                services.insert((line, *period), LineService::default());
            }
        }
        for ((line, period, length), var) in model.frequency_vars() {
            let value = values[var.0];
            let trains = value.round();
            if (value - trains).abs() > INTEGRALITY_TOLERANCE {
                log::warn!("frequency of {} {} {} cars is not integral: {}", line, period,
                           length, value);
            }
            if trains < 0.5 {
                continue;
            }
            let service = services.entry((line, period)).or_default();
            service.allocations.push(TrainAllocation{length, trains_per_hour: trains as u32});
        }
        for service in services.values_mut() {
            service.allocations.sort_by(|aa, bb| bb.length.cmp(&aa.length));
        }

        let round_trip_hours = model.lines()
            .filter_map(|line| model.round_trip_hours(line).map(|rtt| (line, rtt)))
            .collect();
        return Schedule{services, round_trip_hours};
    }

    pub fn service(&self, line: Line, period: Period) -> Option<&LineService> {
        self.services.get(&(line, period))
    }

    pub fn total_frequency(&self, line: Line, period: Period) -> u32 {
        self.service(line, period).map(|ss| ss.total_frequency()).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Line, Period, &LineService)> {
        self.services.iter().map(|((line, period), service)| (*line, *period, service))
    }

    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.round_trip_hours.keys().copied()
    }

    pub fn periods(&self) -> Vec<Period> {
        let mut periods: Vec<Period> = self.services.keys().map(|(_, period)| *period).collect();
        periods.sort();
        periods.dedup();
        periods
    }

    /// Cars needed to run a period's service: each train is tied up for its line's round trip.
    pub fn cars_in_service(&self, period: Period) -> f64 {
        self.iter()
            .filter(|(_, pp, _)| *pp == period)
            .map(|(line, _, service)| {
                self.round_trip_hours[&line] * service.cars_per_hour() as f64
            })
            .sum()
    }

    /// Cars in service summed over every period.
    pub fn car_hours(&self) -> f64 {
        self.periods().iter().map(|period| self.cars_in_service(*period)).sum()
    }

    /// Whether every line runs between `min` and `max` trains per hour in every period.
    pub fn within_frequency_bounds(&self, min: u32, max: u32) -> bool {
        self.services.values().all(|ss| {
            let freq = ss.total_frequency();
            min <= freq && freq <= max
        })
    }
}
