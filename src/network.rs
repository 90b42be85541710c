// This file defines the rail network: the stations, the lines that visit them, and the directed
// segments between adjacent stations.  It wraps two petgraph graphs, a physical one with one node
// per station, and a routing one with one node per (station, line) pair.
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;

use super::config::TopologyConfig;
use super::errors::ConfigError;


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Line {
    Red,
    Orange,
    Yellow,
    Blue,
    Green,
}

impl Line {
    pub const ALL: [Line; 5] = [Line::Red, Line::Orange, Line::Yellow, Line::Blue, Line::Green];

    pub fn name(&self) -> &'static str {
        match self {
            Line::Red => "RED",
            Line::Orange => "ORANGE",
            Line::Yellow => "YELLOW",
            Line::Blue => "BLUE",
            Line::Green => "GREEN",
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, ff: &mut fmt::Formatter) -> fmt::Result {
        write!(ff, "{}", self.name())
    }
}

impl FromStr for Line {
    type Err = ConfigError;

    fn from_str(ss: &str) -> Result<Line, ConfigError> {
        match ss.to_ascii_uppercase().as_str() {
            "RED" => Ok(Line::Red),
            "ORANGE" => Ok(Line::Orange),
            "YELLOW" => Ok(Line::Yellow),
            "BLUE" => Ok(Line::Blue),
            "GREEN" => Ok(Line::Green),
            _ => Err(ConfigError::UnknownLine(String::from(ss))),
        }
    }
}

/// Which way a line runs relative to its configured station order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Forward,
    Reverse,
}

/// A directed pair of adjacent stations.  Segments are line-independent: a trunk segment shared
/// by several lines is a single segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment {
    pub from: String,
    pub to: String,
}

impl Segment {
    pub fn new(from: &str, to: &str) -> Segment {
        Segment{from: String::from(from), to: String::from(to)}
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, ff: &mut fmt::Formatter) -> fmt::Result {
        write!(ff, "{}->{}", self.from, self.to)
    }
}

#[derive(Debug, Clone)]
pub struct SegmentInfo {
    pub segment: Segment,
    pub from_idx: usize,
    pub to_idx: usize,
    /// Lines that run over this segment, sorted.
    pub lines: Vec<Line>,
    pub travel_time: f64,
}

#[derive(Debug, Clone)]
pub struct LineRoute {
    pub stations: Vec<usize>,
    pub round_trip_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingNode {
    pub station: usize,
    pub line: Line,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoutingEdge {
    Travel { segment: usize, time: f64 },
    Transfer { penalty: f64 },
}

impl RoutingEdge {
    pub fn cost(&self) -> f64 {
        match self {
            RoutingEdge::Travel{time, ..} => *time,
            RoutingEdge::Transfer{penalty} => *penalty,
        }
    }
}

pub type RoutingGraph = DiGraph<RoutingNode, RoutingEdge>;


pub struct TransitNetwork {
    station_ids: Vec<String>,
    station_idxs: HashMap<String, usize>,
    lines: BTreeMap<Line, LineRoute>,
    // one node per station, in declaration order, so node index == station index
    physical_graph: DiGraph<String, usize>,
    segments: Vec<SegmentInfo>,
    segment_idxs: HashMap<(usize, usize), usize>,
    routing_graph: RoutingGraph,
    routing_nodes_by_station: Vec<Vec<NodeIndex>>,
}

impl TransitNetwork {
    pub fn from_topology(topology: &TopologyConfig) -> Result<TransitNetwork, ConfigError> {
        let mut station_ids = vec![];
        let mut station_idxs = HashMap::new();
        for station in &topology.stations {
            if !station_idxs.contains_key(station) {
                station_idxs.insert(station.clone(), station_ids.len());
                station_ids.push(station.clone());
            }
        }

        // resolve each line's stations, rejecting bad sequences before anything is built
        let mut lines = BTreeMap::new();
        for (line, stops) in &topology.lines {
            if lines.contains_key(line) {
                return Err(ConfigError::DuplicateLine(*line));
            }
            if stops.len() < 2 {
                return Err(ConfigError::LineTooShort(*line));
            }
            let mut stations = vec![];
            for stop in stops {
                let idx = match station_idxs.get(stop) {
                    Some(idx) => *idx,
                    None => return Err(ConfigError::UndeclaredStation{line: *line,
                                                                         station: stop.clone()}),
                };
                if stations.contains(&idx) {
                    return Err(ConfigError::DuplicateStation{line: *line, station: stop.clone()});
                }
                stations.push(idx);
            }
            let round_trip_hours = match topology.round_trip_hours.get(line) {
                Some(rtt) if *rtt > 0. => *rtt,
                Some(rtt) => return Err(ConfigError::InvalidParameter(
                    format!("round trip time of {} must be positive, got {}", line, rtt))),
                None => return Err(ConfigError::MissingRoundTrip(*line)),
            };
            lines.insert(*line, LineRoute{stations, round_trip_hours});
        }

        // build the physical graph and the segment table
        let mut physical_graph = DiGraph::new();
        for station in &station_ids {
            physical_graph.add_node(station.clone());
        }
        let mut segments: Vec<SegmentInfo> = vec![];
        let mut segment_idxs = HashMap::new();
        for (line, route) in &lines {
            for pair in route.stations.windows(2) {
                for (from, to) in [(pair[0], pair[1]), (pair[1], pair[0])] {
                    let seg_idx = *segment_idxs.entry((from, to)).or_insert_with(|| {
                        let seg_idx = segments.len();
                        segments.push(SegmentInfo {
                            segment: Segment::new(&station_ids[from], &station_ids[to]),
                            from_idx: from,
                            to_idx: to,
                            lines: vec![],
                            travel_time: topology.default_travel_time,
                        });
                        physical_graph.add_edge(NodeIndex::new(from), NodeIndex::new(to),
                                                seg_idx);
                        seg_idx
                    });
                    let seg_lines = &mut segments[seg_idx].lines;
                    if !seg_lines.contains(line) {
                        seg_lines.push(*line);
                        seg_lines.sort();
                    }
                }
            }
        }

        for (from, to, time) in &topology.travel_times {
            let key = match (station_idxs.get(from), station_idxs.get(to)) {
                (Some(ff), Some(tt)) => (*ff, *tt),
                _ => return Err(ConfigError::UnknownSegment{from: from.clone(), to: to.clone()}),
            };
            for key in [key, (key.1, key.0)] {
                match segment_idxs.get(&key) {
                    Some(seg_idx) => segments[*seg_idx].travel_time = *time,
                    None => return Err(ConfigError::UnknownSegment{from: from.clone(),
                                                                   to: to.clone()}),
                }
            }
        }

        let (routing_graph, routing_nodes_by_station) = build_routing_graph(
            station_ids.len(), &lines, &segments, &segment_idxs, topology.transfer_penalty);

        let network = TransitNetwork {
            station_ids,
            station_idxs,
            lines,
            physical_graph,
            segments,
            segment_idxs,
            routing_graph,
            routing_nodes_by_station,
        };

        let orphans = network.orphan_stations();
        if !orphans.is_empty() {
            log::warn!("stations served by no line: {:?}", orphans);
        }
        let num_islands = network.num_islands();
        if num_islands > 1 {
            log::warn!("network is split into {} disconnected islands", num_islands);
        }
        log::debug!("built network with {} stations, {} lines, {} directed segments",
                    network.num_stations(), network.lines.len(), network.segments.len());
        return Ok(network);
    }

    pub fn num_stations(&self) -> usize {
        self.station_ids.len()
    }

    pub fn station_idx(&self, station: &str) -> Option<usize> {
        self.station_idxs.get(station).copied()
    }

    pub fn station_id(&self, station_idx: usize) -> &str {
        &self.station_ids[station_idx]
    }

    pub fn station_ids(&self) -> &[String] {
        &self.station_ids
    }

    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.lines.keys().copied()
    }

    pub fn round_trip_hours(&self, line: Line) -> Option<f64> {
        self.lines.get(&line).map(|route| route.round_trip_hours)
    }

    pub fn segments(&self) -> &[SegmentInfo] {
        &self.segments
    }

    pub fn segment_idx(&self, from: &str, to: &str) -> Option<usize> {
        let key = (self.station_idx(from)?, self.station_idx(to)?);
        self.segment_idxs.get(&key).copied()
    }

    /// Returns the lines serving the directed segment, or an empty slice if no line does.
    pub fn lines_on_segment(&self, segment: &Segment) -> &[Line] {
        match self.segment_idx(&segment.from, &segment.to) {
            Some(seg_idx) => &self.segments[seg_idx].lines,
            None => &[],
        }
    }

    /// The segments a line traverses in one direction, in travel order.
    pub fn segments_of_line(&self, line: Line, direction: Direction) -> Vec<&Segment> {
        let route = match self.lines.get(&line) {
            Some(route) => route,
            None => return vec![],
        };
        let mut stations = route.stations.clone();
        if direction == Direction::Reverse {
            stations.reverse();
        }
        stations.windows(2).filter_map(|pair| self.segment_idxs.get(&(pair[0], pair[1])))
            .map(|seg_idx| &self.segments[*seg_idx].segment)
            .collect()
    }

    /// Stations that are declared but visited by no line.
    pub fn orphan_stations(&self) -> Vec<&str> {
        self.routing_nodes_by_station.iter().enumerate()
            .filter(|(_, nodes)| nodes.is_empty())
            .map(|(idx, _)| self.station_ids[idx].as_str())
            .collect()
    }

    /// The number of connected pieces of the physical network.  Every segment exists in both
    /// directions, so strong components coincide with weak ones.
    pub fn num_islands(&self) -> usize {
        kosaraju_scc(&self.physical_graph).len()
    }

    pub fn physical_graph(&self) -> &DiGraph<String, usize> {
        &self.physical_graph
    }

    pub fn routing_graph(&self) -> &RoutingGraph {
        &self.routing_graph
    }

    pub fn routing_nodes_at(&self, station_idx: usize) -> &[NodeIndex] {
        &self.routing_nodes_by_station[station_idx]
    }
}

/// Builds the (station, line) routing graph.  Nodes are added station by station in declaration
/// order, and within a station in line order, which fixes the shortest-path tie-break.
fn build_routing_graph(num_stations: usize, lines: &BTreeMap<Line, LineRoute>,
                       segments: &[SegmentInfo], segment_idxs: &HashMap<(usize, usize), usize>,
                       transfer_penalty: f64)
                       -> (RoutingGraph, Vec<Vec<NodeIndex>>) {
    let mut lines_at_station: Vec<Vec<Line>> = vec![vec![]; num_stations];
    for (line, route) in lines {
        for station in &route.stations {
            lines_at_station[*station].push(*line);
        }
    }

    let mut graph = RoutingGraph::new();
    let mut nodes_by_station = vec![vec![]; num_stations];
    let mut node_of: HashMap<(usize, Line), NodeIndex> = HashMap::new();
    for (station, station_lines) in lines_at_station.iter().enumerate() {
        for line in station_lines {
            let node = graph.add_node(RoutingNode{station, line: *line});
            nodes_by_station[station].push(node);
            node_of.insert((station, *line), node);
        }
    }

    for (line, route) in lines {
        for pair in route.stations.windows(2) {
            for (from, to) in [(pair[0], pair[1]), (pair[1], pair[0])] {
                let seg_idx = segment_idxs[&(from, to)];
                let edge = RoutingEdge::Travel{segment: seg_idx, time: segments[seg_idx].travel_time};
                graph.add_edge(node_of[&(from, *line)], node_of[&(to, *line)], edge);
            }
        }
    }

    for nodes in &nodes_by_station {
        for from in nodes {
            for to in nodes {
                if from != to {
                    graph.add_edge(*from, *to, RoutingEdge::Transfer{penalty: transfer_penalty});
                }
            }
        }
    }

    return (graph, nodes_by_station);
}
