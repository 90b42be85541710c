use std::collections::BTreeMap;

use super::config::TopologyConfig;
use super::network::Line;
use super::time_periods::Period;
use super::time_periods::PeriodMap;


/// A T-shaped network plus a disconnected island:
///
/// RED:   A <-> B <-> C
/// BLUE:        B <-> D
/// GREEN: E <-> F
///
/// Round trips are 2h on RED, 1.5h on BLUE and 1h on GREEN.
pub fn t_network_topology() -> TopologyConfig {
    fn names(stops: &[&str]) -> Vec<String> {
        stops.iter().map(|ss| String::from(*ss)).collect()
    }
    let round_trip_hours: BTreeMap<Line, f64> = [
        (Line::Red, 2.),
        (Line::Blue, 1.5),
        (Line::Green, 1.),
    ].iter().cloned().collect();
    TopologyConfig {
        stations: names(&["A", "B", "C", "D", "E", "F"]),
        lines: vec![
            (Line::Red, names(&["A", "B", "C"])),
            (Line::Blue, names(&["B", "D"])),
            (Line::Green, names(&["E", "F"])),
        ],
        round_trip_hours,
        transfer_penalty: 4.,
        default_travel_time: 1.,
        travel_times: vec![],
    }
}

/// A period map with a single one-hour period.
pub fn single_period(period: Period) -> PeriodMap {
    PeriodMap::new(vec![(period, vec![8])]).unwrap()
}
