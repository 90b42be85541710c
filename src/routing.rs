use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use rayon::prelude::*;

use super::config::DemandNormalization;
use super::config::DemandOptions;
use super::my_dijkstra::dijkstra_to_any;
use super::network::RoutingEdge;
use super::network::Segment;
use super::network::TransitNetwork;
use super::passengers::OdRecord;
use super::time_periods::Period;
use super::time_periods::PeriodMap;


/// Passenger demand on each directed segment in each period.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentDemand {
    demand: BTreeMap<(Segment, Period), f64>,
}

impl SegmentDemand {
    pub fn new() -> SegmentDemand {
        SegmentDemand{demand: BTreeMap::new()}
    }

    pub fn add(&mut self, segment: Segment, period: Period, passengers: f64) {
        *self.demand.entry((segment, period)).or_insert(0.) += passengers;
    }

    pub fn get(&self, segment: &Segment, period: Period) -> f64 {
        self.demand.get(&(segment.clone(), period)).copied().unwrap_or(0.)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Segment, Period, f64)> {
        self.demand.iter().map(|((segment, period), dd)| (segment, *period, *dd))
    }

    pub fn len(&self) -> usize {
        self.demand.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demand.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.demand.values().sum()
    }

    pub fn period_total(&self, period: Period) -> f64 {
        self.iter().filter(|(_, pp, _)| *pp == period).map(|(_, _, dd)| dd).sum()
    }

    /// Returns a copy with every entry multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> SegmentDemand {
        let demand = self.demand.iter().map(|(key, dd)| (key.clone(), dd * factor)).collect();
        SegmentDemand{demand}
    }
}

impl FromIterator<(Segment, Period, f64)> for SegmentDemand {
    fn from_iter<II: IntoIterator<Item = (Segment, Period, f64)>>(iter: II) -> SegmentDemand {
        let mut demand = SegmentDemand::new();
        for (segment, period, passengers) in iter {
            demand.add(segment, period, passengers);
        }
        demand
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapReason {
    /// The network has no path between the two stations.
    NoPath,
    /// The named station is not in the station registry.
    UnknownStation(String),
    /// The hour belongs to no period.
    UnmappedHour,
}

/// OD demand that could not be assigned to segments.  It is excluded from the segment demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingGap {
    pub origin: String,
    pub destination: String,
    pub hour: u8,
    pub passengers: u64,
    pub reason: GapReason,
}

impl fmt::Display for RoutingGap {
    fn fmt(&self, ff: &mut fmt::Formatter) -> fmt::Result {
        let reason = match &self.reason {
            GapReason::NoPath => String::from("no path"),
            GapReason::UnknownStation(station) => format!("unknown station {}", station),
            GapReason::UnmappedHour => String::from("hour outside every period"),
        };
        write!(ff, "{} -> {} at hour {} ({} passengers): {}", self.origin, self.destination,
               self.hour, self.passengers, reason)
    }
}

pub struct RoutingReport {
    pub demand: SegmentDemand,
    pub gaps: Vec<RoutingGap>,
    /// Passengers whose demand was assigned to at least one segment, before normalisation.
    pub routed_passengers: u64,
}

impl RoutingReport {
    pub fn excluded_passengers(&self) -> u64 {
        self.gaps.iter().map(|gap| gap.passengers).sum()
    }
}

/// Shortest paths between station pairs, as lists of segment indices.  `None` means unreachable.
pub type PathLookup = HashMap<(usize, usize), Option<Vec<usize>>>;

/// Finds the shortest path between two stations over the (station, line) routing graph, and
/// projects it onto the physical segments it uses.  Transfers are dropped from the result.
pub fn shortest_segment_path(network: &TransitNetwork, origin: usize, destination: usize)
                             -> Option<Vec<usize>> {
    if origin == destination {
        return Some(vec![]);
    }
    let graph = network.routing_graph();
    let (_, edges) = dijkstra_to_any(graph, network.routing_nodes_at(origin),
                                     network.routing_nodes_at(destination), |ee| ee.cost())?;
    let segments = edges.iter().filter_map(|edge| match graph.edge_weight(*edge) {
        Some(RoutingEdge::Travel{segment, ..}) => Some(*segment),
        _ => None,
    }).collect();
    return Some(segments);
}

/// Like `shortest_segment_path`, but by station code.
pub fn path_segments(network: &TransitNetwork, origin: &str, destination: &str)
                     -> Option<Vec<Segment>> {
    let origin = network.station_idx(origin)?;
    let destination = network.station_idx(destination)?;
    let path = shortest_segment_path(network, origin, destination)?;
    Some(path.iter().map(|seg_idx| network.segments()[*seg_idx].segment.clone()).collect())
}

/// Computes shortest paths for every given station pair, in parallel.
pub fn build_path_lookup(network: &TransitNetwork, pairs: &[(usize, usize)]) -> PathLookup {
    pairs.par_iter()
        .map(|&(origin, destination)|
             ((origin, destination), shortest_segment_path(network, origin, destination)))
        .collect()
}

/// Assigns OD demand to the directed segments of each pair's shortest path.
///
/// Counts are summed per (origin, destination, period), scaled by the demand multiplier and,
/// for hourly-average normalisation, divided by the period's length in hours.  Rows that
/// cannot be routed are reported as gaps; self-pairs and zero counts are ignored.
pub fn route_demand(network: &TransitNetwork, records: &[OdRecord], periods: &PeriodMap,
                    options: &DemandOptions) -> RoutingReport {
    log::debug!("aggregate {} OD records", records.len());
    let mut od_hour_counts: BTreeMap<(&str, &str, u8), u64> = BTreeMap::new();
    for record in records {
        if record.count == 0 || record.origin == record.destination {
            continue;
        }
        let key = (record.origin.as_str(), record.destination.as_str(), record.hour);
        *od_hour_counts.entry(key).or_insert(0) += record.count;
    }

    let mut gaps = vec![];
    let mut routable = vec![];
    for ((origin, destination, hour), count) in od_hour_counts {
        let gap = |reason| RoutingGap {
            origin: String::from(origin),
            destination: String::from(destination),
            hour,
            passengers: count,
            reason,
        };
        let origin_idx = match network.station_idx(origin) {
            Some(idx) => idx,
            None => {
                gaps.push(gap(GapReason::UnknownStation(String::from(origin))));
                continue;
            }
        };
        let destination_idx = match network.station_idx(destination) {
            Some(idx) => idx,
            None => {
                gaps.push(gap(GapReason::UnknownStation(String::from(destination))));
                continue;
            }
        };
        match periods.period_of(hour) {
            Some(period) => routable.push((origin_idx, destination_idx, period, hour, count)),
            None => gaps.push(gap(GapReason::UnmappedHour)),
        }
    }

    let mut pairs: Vec<(usize, usize)> = routable.iter().map(|(oo, dd, _, _, _)| (*oo, *dd))
        .collect();
    pairs.sort_unstable();
    pairs.dedup();
    log::debug!("compute shortest paths for {} OD pairs", pairs.len());
    let path_lookup = build_path_lookup(network, &pairs);

    let mut period_counts: BTreeMap<(usize, usize, Period), u64> = BTreeMap::new();
    let mut routed_passengers = 0;
    for (origin, destination, period, hour, count) in routable {
        match path_lookup.get(&(origin, destination)) {
            Some(Some(_)) => {
                *period_counts.entry((origin, destination, period)).or_insert(0) += count;
                routed_passengers += count;
            }
            _ => gaps.push(RoutingGap {
                origin: String::from(network.station_id(origin)),
                destination: String::from(network.station_id(destination)),
                hour,
                passengers: count,
                reason: GapReason::NoPath,
            }),
        }
    }

    log::debug!("assign demand to segments");
    let mut segment_loads: BTreeMap<(usize, Period), f64> = BTreeMap::new();
    for ((origin, destination, period), count) in period_counts {
        let divisor = match options.normalization {
            DemandNormalization::HourlyAverage => periods.hours_in(period).len().max(1) as f64,
            DemandNormalization::Total => 1.,
        };
        let load = count as f64 * options.multiplier / divisor;
        if let Some(Some(path)) = path_lookup.get(&(origin, destination)) {
            for seg_idx in path {
                *segment_loads.entry((*seg_idx, period)).or_insert(0.) += load;
            }
        }
    }

    let demand = segment_loads.into_iter().map(|((seg_idx, period), load)| {
        (network.segments()[seg_idx].segment.clone(), period, load)
    }).collect::<SegmentDemand>();

    for gap in &gaps {
        log::debug!("routing gap: {}", gap);
    }
    if !gaps.is_empty() {
        let excluded: u64 = gaps.iter().map(|gap| gap.passengers).sum();
        log::warn!("{} OD entries ({} passengers) could not be routed", gaps.len(), excluded);
    }
    log::info!("routing complete: demand on {} segment-periods", demand.len());
    return RoutingReport{demand, gaps, routed_passengers};
}
