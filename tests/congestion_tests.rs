//! Congestion analyser behaviour: densities, bands, probability, statistics

use urban_sim::simulation::{
    edge_key, Agent, AgentRoster, CongestionAnalyzer, CongestionLevel, MapEdge, MapFile, MapNode,
    Mode, RoadGraph,
};

fn straight_map() -> MapFile {
    MapFile {
        nodes: vec![
            MapNode {
                id: "L".to_string(),
                x: 0.0,
                y: 0.0,
            },
            MapNode {
                id: "R".to_string(),
                x: 2.0,
                y: 0.0,
            },
        ],
        edges: vec![MapEdge {
            from: "L".to_string(),
            to: "R".to_string(),
            distance: 2.0,
            allowed_modes: vec![
                "car".to_string(),
                "bicycle".to_string(),
                "pedestrian".to_string(),
            ],
            one_way: false,
        }],
    }
}

fn agent_on_edge(id: &str, kind: Mode, capacity_usage: f64) -> Agent {
    let mut agent = Agent::new(
        id.to_string(),
        kind,
        "L".to_string(),
        "R".to_string(),
        60.0,
        capacity_usage,
        0.0,
    );
    agent.set_path(vec!["L".to_string(), "R".to_string()], 2.0);
    agent
}

#[test]
fn capacity_scales_with_edge_length() {
    let graph = RoadGraph::from_map(&straight_map()).unwrap();
    let analyzer = CongestionAnalyzer::new(&graph, 3.0);

    // 2-unit edge at 3.0 capacity-usage per unit of length.
    assert!((analyzer.capacity(&edge_key("L", "R")) - 6.0).abs() < 1e-9);
}

#[test]
fn density_sums_capacity_usage_of_occupants() {
    let graph = RoadGraph::from_map(&straight_map()).unwrap();
    let analyzer = CongestionAnalyzer::new(&graph, 3.0);
    let mut roster = AgentRoster::new();
    roster.add(agent_on_edge("car_1", Mode::Car, 1.0));
    roster.add(agent_on_edge("car_2", Mode::Car, 1.0));
    roster.add(agent_on_edge("bicycle_3", Mode::Bicycle, 0.5));

    let key = edge_key("L", "R");
    // 2.5 usage over capacity 6.0
    assert!((analyzer.density(&key, &roster) - 2.5 / 6.0).abs() < 1e-9);
    assert_eq!(analyzer.level(&key, &roster), CongestionLevel::Moderate);

    // The reverse edge carries nobody.
    assert_eq!(analyzer.density(&edge_key("R", "L"), &roster), 0.0);
}

#[test]
fn level_band_boundaries() {
    assert_eq!(CongestionLevel::from_density(0.0), CongestionLevel::FreeFlow);
    assert_eq!(CongestionLevel::from_density(0.19), CongestionLevel::FreeFlow);
    assert_eq!(CongestionLevel::from_density(0.2), CongestionLevel::Light);
    assert_eq!(CongestionLevel::from_density(0.4), CongestionLevel::Moderate);
    assert_eq!(CongestionLevel::from_density(0.7), CongestionLevel::Heavy);
    assert_eq!(CongestionLevel::from_density(1.0), CongestionLevel::Congested);
    assert_eq!(CongestionLevel::from_density(3.0), CongestionLevel::Congested);
}

#[test]
fn band_sample_ranges_cover_the_extended_band() {
    let (lo, _) = CongestionLevel::FreeFlow.sample_range();
    let (_, hi) = CongestionLevel::Congested.sample_range();
    assert_eq!(lo, 0.5);
    assert_eq!(hi, 6.0);
}

#[test]
fn history_is_bounded_and_mean_reflects_recent_samples() {
    let graph = RoadGraph::from_map(&straight_map()).unwrap();
    let mut analyzer = CongestionAnalyzer::new(&graph, 3.0);
    let key = edge_key("L", "R");

    for _ in 0..100 {
        analyzer.record_sample(key.clone(), 1.0);
    }
    for _ in 0..50 {
        analyzer.record_sample(key.clone(), 2.0);
    }

    // Ring of 100: 50 ones pushed out, mean of 50x1.0 + 50x2.0.
    let mean = analyzer.history_mean(&key).unwrap();
    assert!((mean - 1.5).abs() < 1e-9);
}

#[test]
fn probability_combines_density_and_history() {
    let graph = RoadGraph::from_map(&straight_map()).unwrap();
    let mut analyzer = CongestionAnalyzer::new(&graph, 3.0);
    let key = edge_key("L", "R");
    let empty = AgentRoster::new();

    // No occupants, no history.
    assert_eq!(analyzer.probability(&key, &empty), 0.0);

    // A hot history raises the probability even on an empty edge.
    for _ in 0..10 {
        analyzer.record_sample(key.clone(), 3.0);
    }
    assert!((analyzer.probability(&key, &empty) - 0.5).abs() < 1e-9);

    // A cool history cannot push it below zero.
    let cool = edge_key("R", "L");
    for _ in 0..10 {
        analyzer.record_sample(cool.clone(), 0.5);
    }
    assert_eq!(analyzer.probability(&cool, &empty), 0.0);

    // Saturated edge with a hot history clamps to 1.
    let mut roster = AgentRoster::new();
    for i in 0..10 {
        roster.add(agent_on_edge(&format!("car_{i}"), Mode::Car, 1.0));
    }
    assert_eq!(analyzer.probability(&key, &roster), 1.0);
}

#[test]
fn bottlenecks_sorted_by_density() {
    let mut map = straight_map();
    map.nodes.push(MapNode {
        id: "M".to_string(),
        x: 50.0,
        y: 80.0,
    });
    map.edges.push(MapEdge {
        from: "L".to_string(),
        to: "M".to_string(),
        distance: 2.0,
        allowed_modes: vec!["car".to_string()],
        one_way: true,
    });
    let graph = RoadGraph::from_map(&map).unwrap();
    let analyzer = CongestionAnalyzer::new(&graph, 3.0);

    let mut roster = AgentRoster::new();
    for i in 0..5 {
        roster.add(agent_on_edge(&format!("car_{i}"), Mode::Car, 1.0));
    }
    for i in 0..6 {
        let mut agent = Agent::new(
            format!("car_m{i}"),
            Mode::Car,
            "L".to_string(),
            "M".to_string(),
            60.0,
            1.0,
            0.0,
        );
        agent.set_path(vec!["L".to_string(), "M".to_string()], 2.0);
        roster.add(agent);
    }

    let bottlenecks = analyzer.bottlenecks(&graph, &roster);
    assert_eq!(bottlenecks.len(), 2);
    assert_eq!(bottlenecks[0].0, edge_key("L", "M"));
    assert_eq!(bottlenecks[1].0, edge_key("L", "R"));
    assert!(bottlenecks[0].1 >= bottlenecks[1].1);
}

#[test]
fn congestion_distribution_sums_to_one_hundred() {
    let graph = RoadGraph::from_map(&straight_map()).unwrap();
    let analyzer = CongestionAnalyzer::new(&graph, 3.0);
    let roster = AgentRoster::new();

    let stats = analyzer.global_statistics(&graph, &roster);
    let total: f64 = stats.congestion_distribution.values().sum();
    assert!((total - 100.0).abs() < 1e-6);
    assert_eq!(stats.total_edges, 2);
}

#[test]
fn edge_traffic_reports_every_directed_edge() {
    let graph = RoadGraph::from_map(&straight_map()).unwrap();
    let analyzer = CongestionAnalyzer::new(&graph, 3.0);
    let mut roster = AgentRoster::new();
    roster.add(agent_on_edge("car_1", Mode::Car, 1.0));

    let rows = analyzer.edge_traffic(&graph, &roster);
    assert_eq!(rows.len(), 2);
    let forward = rows.iter().find(|r| r.from == "L" && r.to == "R").unwrap();
    assert_eq!(forward.agent_count, 1);
    assert!(forward.density > 0.0);
    let reverse = rows.iter().find(|r| r.from == "R" && r.to == "L").unwrap();
    assert_eq!(reverse.agent_count, 0);
}
