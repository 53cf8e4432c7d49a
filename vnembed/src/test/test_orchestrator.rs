// VNEmbed: Virtual Network Embedding Engine
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Test the embedding pipeline.

use super::fixtures::*;
use crate::algorithms::{AlgorithmConfig, MigrationConfig, Orchestrator, RejectReason, Stage};
use crate::cost::RejectionCost;
use crate::ilp::{BranchAndBoundSolver, SolverError};
use crate::matcher::MatcherKind;
use crate::model::{Model, ModelConfig, NetworkId, Resources, SubstrateElement};
use crate::repair::{guest_state, GuestState};
use crate::{embed, Error};

use maplit::{btreemap, btreeset};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Substrate server hosting the virtual node with the given name.
fn host_of(model: &Model, network: NetworkId, name: &str) -> String {
    let node = model.node_by_name(network, name).unwrap();
    let host = model.node(node).unwrap().host().unwrap();
    model.node(host).unwrap().name().to_string()
}

#[test]
fn test_single_server() {
    init_logger();
    let mut model = scenario(ModelConfig::default());
    let report = embed(&mut model, *SUB, &[*VIRT], AlgorithmConfig::default()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.embedded, btreeset! {*VIRT});
    assert_eq!(report.stage, Some(Stage::SingleServer));
    assert_eq!(report.solver_calls, 1);
    assert!(report.repaired.is_empty());
    assert!(report.migrated.is_empty());

    assert_eq!(model.network(*VIRT).unwrap().host(), Some(*SUB));
    let hosts = model.hosts_of(*VIRT).unwrap();
    assert_eq!(hosts.len(), 7);
    assert!(hosts.iter().all(|(_, h)| *h == hosts[0].1));
    assert!(matches!(hosts[0].1, SubstrateElement::Node(n) if n == *SRV1 || n == *SRV2));
    // the path catalog was generated on the way
    assert_eq!(model.network(*SUB).unwrap().paths().len(), 6);
    model.validate().unwrap();
}

#[test]
fn test_pre_check() {
    let mut model = scenario(ModelConfig::default());
    let big = add_single_request(&mut model, "big", Resources::new(100, 1, 1));

    let created = Rc::new(Cell::new(0));
    let counter = created.clone();
    let mut orchestrator = Orchestrator::new(AlgorithmConfig::default(), move || {
        counter.set(counter.get() + 1);
        BranchAndBoundSolver::new(None)
    })
    .unwrap();
    let report = orchestrator.run(&mut model, *SUB, &[big]).unwrap();

    assert_eq!(report.rejected, btreemap! {big => RejectReason::InsufficientResources});
    assert!(report.embedded.is_empty());
    assert_eq!(report.stage, None);
    assert_eq!(report.solver_calls, 0);
    assert_eq!(created.get(), 0);
    assert_eq!(model.is_embedded(big), Ok(false));
}

#[test]
fn test_config_errors() {
    let config = AlgorithmConfig { stages: Vec::new(), ..Default::default() };
    assert!(matches!(config.validate(), Err(Error::Config(_))));

    let mut config = AlgorithmConfig::default();
    config.path.min_hops = 2;
    assert!(matches!(config.validate(), Err(Error::Config(_))));
    // without the rack stage, this is fine
    config.stages = vec![Stage::Incremental];
    assert_eq!(config.validate(), Ok(()));

    let config = AlgorithmConfig {
        migration: Some(MigrationConfig { max_retries: 0 }),
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(Error::Config(_))));

    for factor in [0.0, -1.0, f64::NAN, f64::INFINITY].iter() {
        let rejection_cost = RejectionCost::Dynamic { factor: *factor };
        let config = AlgorithmConfig { rejection_cost, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let result = Orchestrator::new(config, || BranchAndBoundSolver::new(None));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

#[test]
fn test_request_errors() {
    let mut model = scenario(ModelConfig::default());
    let cursor = model.event_cursor();

    // wrong kind of network
    let result = embed(&mut model, *VIRT, &[*VIRT], AlgorithmConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
    let result = embed(&mut model, *SUB, &[*SUB], AlgorithmConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
    // the model is untouched
    assert!(model.events_since(cursor).is_empty());

    // already embedded
    embed(&mut model, *SUB, &[*VIRT], AlgorithmConfig::default()).unwrap();
    let result = embed(&mut model, *SUB, &[*VIRT], AlgorithmConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(model.is_embedded(*VIRT), Ok(true));
}

#[test]
fn test_rack_fallback() {
    // the virtual servers do not fit on a single server together
    let mut model = scenario_with(
        ModelConfig::default(),
        Resources::new(3, 3, 3),
        Resources::new(4, 4, 4),
    );
    let report = embed(&mut model, *SUB, &[*VIRT], AlgorithmConfig::default()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.stage, Some(Stage::Rack));
    assert_eq!(report.solver_calls, 2);
    assert_ne!(host_of(&model, *VIRT, "vsrv1"), host_of(&model, *VIRT, "vsrv2"));
    assert_eq!(model.total_residual(*SUB), Ok(Resources::new(2, 2, 2)));
    model.validate().unwrap();
}

#[test]
fn test_two_tier() {
    init_logger();
    let (mut model, dc) = two_tier(ModelConfig::default(), Resources::new(4, 4, 4));
    let first = add_pair_request(&mut model, "first", Resources::new(3, 3, 3), 5);
    let second = add_pair_request(&mut model, "second", Resources::new(3, 3, 3), 5);
    let report = embed(&mut model, dc, &[first, second], AlgorithmConfig::default()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.embedded, btreeset! {first, second});
    assert_eq!(report.stage, Some(Stage::Rack));
    assert_eq!(report.solver_calls, 2);

    // rack of a server is given by its index: s0 and s1 are below tor0, s2 and s3 below tor1
    let rack = |server: String| server[1..].parse::<u32>().unwrap() / 2;
    for net in [first, second].iter() {
        let a = host_of(&model, *net, "a");
        let b = host_of(&model, *net, "b");
        assert_ne!(a, b);
        assert_eq!(rack(a), rack(b));
    }
    assert_eq!(model.total_residual(dc), Ok(Resources::new(4, 4, 4)));
    model.validate().unwrap();
}

/// Two-tier data center in which only `s0` and `s2` are free, and a request of two servers that
/// do not fit together, connected through a virtual switch.
fn split_racks() -> (Model, NetworkId, NetworkId) {
    let (mut model, dc) = two_tier(ModelConfig::default(), Resources::new(4, 4, 4));
    for server in ["s1", "s3"].iter() {
        let guest = add_single_request(&mut model, server, Resources::new(4, 4, 4));
        let node = model.node_by_name(guest, "a").unwrap();
        let host = model.node_by_name(dc, server).unwrap();
        model.embed_node(node, host).unwrap();
        model.embed_network(guest, dc).unwrap();
    }
    let star = model.add_virtual_network("star").unwrap();
    let x = model.add_server(star, "x", Resources::new(3, 3, 3), 0).unwrap();
    let y = model.add_server(star, "y", Resources::new(3, 3, 3), 0).unwrap();
    let vsw = model.add_switch(star, "vsw", 0).unwrap();
    model.add_link_pair(star, x, vsw, 1).unwrap();
    model.add_link_pair(star, vsw, y, 1).unwrap();
    (model, dc, star)
}

#[test]
fn test_rack_stage_stays_in_rack() {
    // x and y would fit into different racks, with the virtual switch on the core
    let (mut model, dc, star) = split_racks();
    let config = AlgorithmConfig { stages: vec![Stage::Rack], ..Default::default() };
    let report = embed(&mut model, dc, &[star], config).unwrap();
    assert_eq!(report.rejected, btreemap! {star => RejectReason::Infeasible});
    assert_eq!(report.solver_calls, 1);
    assert_eq!(model.is_embedded(star), Ok(false));

    let config =
        AlgorithmConfig { stages: vec![Stage::Rack, Stage::Incremental], ..Default::default() };
    let report = embed(&mut model, dc, &[star], config).unwrap();
    assert!(report.is_success());
    assert_eq!(report.stage, Some(Stage::Incremental));
    let hosts = btreeset! {host_of(&model, star, "x"), host_of(&model, star, "y")};
    assert_eq!(hosts, btreeset! {"s0".to_string(), "s2".to_string()});
    model.validate().unwrap();
}

#[test]
fn test_paths_follow_topology() {
    init_logger();
    let mut model = scenario(ModelConfig::default());
    embed(&mut model, *SUB, &[*VIRT], AlgorithmConfig::default()).unwrap();
    assert_eq!(model.network(*SUB).unwrap().paths().len(), 6);

    // a new server joins the substrate
    let srv3 = model.add_server(*SUB, "srv3", Resources::new(4, 4, 4), 1).unwrap();
    model.add_link_pair(*SUB, srv3, *SW, 100).unwrap();
    let pair = add_pair_request(&mut model, "pair", Resources::new(4, 4, 4), 1);
    let report = embed(&mut model, *SUB, &[pair], AlgorithmConfig::default()).unwrap();
    assert!(report.is_success());
    assert_eq!(model.network(*SUB).unwrap().paths().len(), 12);
    let hosts = btreeset! {host_of(&model, pair, "a"), host_of(&model, pair, "b")};
    assert!(hosts.contains("srv3"));

    // the paths of the pair are in use, so the catalog stays as it is
    let srv4 = model.add_server(*SUB, "srv4", Resources::new(4, 4, 4), 1).unwrap();
    model.add_link_pair(*SUB, srv4, *SW, 100).unwrap();
    let single = add_single_request(&mut model, "single", Resources::new(4, 4, 4));
    let report = embed(&mut model, *SUB, &[single], AlgorithmConfig::default()).unwrap();
    assert!(report.is_success());
    assert_eq!(model.network(*SUB).unwrap().paths().len(), 12);
    assert_eq!(host_of(&model, single, "a"), "srv4");
    model.validate().unwrap();
}

#[test]
fn test_floating_guests_of_other_substrates() {
    let mut model = scenario(ModelConfig::default());
    embed(&mut model, *SUB, &[*VIRT], AlgorithmConfig::default()).unwrap();
    let host = match model.hosts_of(*VIRT).unwrap()[0].1 {
        SubstrateElement::Node(n) => n,
        h => panic!("unexpected host {:?}", h),
    };
    model.remove_node(host).unwrap();

    // virt floats on sub, which does not stop embedding on another substrate
    let backup = model.add_substrate_network("backup").unwrap();
    model.add_server(backup, "srv", Resources::new(4, 4, 4), 0).unwrap();
    let single = add_single_request(&mut model, "single", Resources::new(1, 1, 1));
    let report = embed(&mut model, backup, &[single], AlgorithmConfig::default()).unwrap();
    assert!(report.is_success());
    assert!(report.repaired.is_empty());
    assert_eq!(guest_state(&model, *VIRT), Ok(GuestState::Floating));
    model.validate().unwrap();
}

#[test]
fn test_many_racks() {
    // 4 racks of 4 servers, each fitting a single virtual server
    init_logger();
    let (mut model, dc) = data_center(ModelConfig::default(), 4, 4, Resources::new(2, 2, 2));
    let pairs: Vec<NetworkId> = (0..6)
        .map(|i| add_pair_request(&mut model, &format!("p{}", i), Resources::new(2, 2, 2), 1))
        .collect();
    let config = AlgorithmConfig {
        stages: vec![Stage::Incremental],
        solver_time_budget: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let report = embed(&mut model, dc, &pairs, config).unwrap();

    assert!(report.is_success());
    assert_eq!(report.embedded.len(), 6);
    // every pair uses two servers of the same rack, which is the cheapest placement
    let rack = |server: String| server[1..].parse::<u32>().unwrap() / 4;
    for net in pairs.iter() {
        let a = host_of(&model, *net, "a");
        let b = host_of(&model, *net, "b");
        assert_ne!(a, b);
        assert_eq!(rack(a), rack(b));
    }
    assert_eq!(model.total_residual(dc), Ok(Resources::new(8, 8, 8)));
    model.validate().unwrap();
}

#[test]
fn test_matcher_kinds_agree() {
    let mut hosts = Vec::new();
    for matcher in [MatcherKind::Full, MatcherKind::Incremental].iter() {
        let mut model = scenario_with(
            ModelConfig::default(),
            Resources::new(3, 3, 3),
            Resources::new(4, 4, 4),
        );
        let config = AlgorithmConfig { matcher: *matcher, ..Default::default() };
        let report = embed(&mut model, *SUB, &[*VIRT], config).unwrap();
        assert!(report.is_success());
        hosts.push(model.hosts_of(*VIRT).unwrap());
    }
    assert_eq!(hosts[0], hosts[1]);
}

/// Scenario substrate with two guests `a` (on srv1) and `b` (on srv2) of demand `(1, 1, 1)`, and a
/// pending request `c` with the given demand.
fn crowded(demand: Resources) -> (Model, NetworkId, NetworkId, NetworkId) {
    let mut model = scenario(ModelConfig::default());
    let mut guests = Vec::new();
    for (name, server) in [("a", *SRV1), ("b", *SRV2)].iter() {
        let net = add_single_request(&mut model, name, Resources::new(1, 1, 1));
        let node = model.node_by_name(net, "a").unwrap();
        model.embed_node(node, *server).unwrap();
        model.embed_network(net, *SUB).unwrap();
        guests.push(net);
    }
    let c = add_single_request(&mut model, "c", demand);
    (model, guests[0], guests[1], c)
}

#[test]
fn test_migration() {
    init_logger();
    let (mut model, a, b, c) = crowded(Resources::new(4, 1, 1));
    let config = AlgorithmConfig {
        stages: vec![Stage::SingleServer],
        migration: Some(MigrationConfig::default()),
        ..Default::default()
    };
    let created = Rc::new(Cell::new(0));
    let counter = created.clone();
    let mut orchestrator = Orchestrator::new(config, move || {
        counter.set(counter.get() + 1);
        BranchAndBoundSolver::new(None)
    })
    .unwrap();
    let report = orchestrator.run(&mut model, *SUB, &[c]).unwrap();

    assert!(report.is_success());
    assert_eq!(report.migrated, vec![a]);
    assert_eq!(report.embedded, btreeset! {a, c});
    // the stage, then releasing a and b, pinning b back, and failing to pin a back
    assert_eq!(report.solver_calls, 4);
    // the migration reuses a single solver
    assert_eq!(created.get(), 2);
    assert_eq!(report.stage, None);

    // c takes the whole server, so a moves next to b
    let c_host = host_of(&model, c, "a");
    assert_ne!(c_host, host_of(&model, a, "a"));
    assert_eq!(host_of(&model, a, "a"), host_of(&model, b, "a"));
    assert_eq!(model.is_embedded(*VIRT), Ok(false));
    model.validate().unwrap();
}

#[test]
fn test_migration_exhausted() {
    let (mut model, a, b, c) = crowded(Resources::new(5, 1, 1));
    let config = AlgorithmConfig {
        stages: vec![Stage::SingleServer],
        migration: Some(MigrationConfig::default()),
        ..Default::default()
    };
    let report = embed(&mut model, *SUB, &[c], config).unwrap();

    assert_eq!(report.rejected, btreemap! {c => RejectReason::MigrationExhausted});
    assert_eq!(report.migrated, vec![a, b]);
    // the released networks are embedded again by the last attempt
    assert_eq!(report.embedded, btreeset! {a, b});
    assert_eq!(report.solver_calls, 2);
    assert_eq!(model.is_embedded(a), Ok(true));
    assert_eq!(model.is_embedded(b), Ok(true));
    assert_eq!(model.is_embedded(c), Ok(false));
    model.validate().unwrap();
}

#[test]
fn test_without_migration() {
    let (mut model, a, b, c) = crowded(Resources::new(4, 1, 1));
    let config = AlgorithmConfig { stages: vec![Stage::SingleServer], ..Default::default() };
    let report = embed(&mut model, *SUB, &[c], config).unwrap();

    assert_eq!(report.rejected, btreemap! {c => RejectReason::Infeasible});
    assert!(report.migrated.is_empty());
    assert_eq!(model.is_embedded(a), Ok(true));
    assert_eq!(model.is_embedded(b), Ok(true));
}

#[test]
fn test_repaired_networks_are_embedded_again() {
    let mut model = scenario(ModelConfig::default());
    embed(&mut model, *SUB, &[*VIRT], AlgorithmConfig::default()).unwrap();
    let host = match model.hosts_of(*VIRT).unwrap()[0].1 {
        SubstrateElement::Node(n) => n,
        h => panic!("unexpected host {:?}", h),
    };
    let survivor = if host == *SRV1 { "srv2" } else { "srv1" };

    // the host fails
    model.remove_node(host).unwrap();
    let report = embed(&mut model, *SUB, &[], AlgorithmConfig::default()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.repaired, vec![*VIRT]);
    assert_eq!(report.embedded, btreeset! {*VIRT});
    assert_eq!(host_of(&model, *VIRT, "vsrv1"), survivor);
    model.validate().unwrap();
}

#[test]
fn test_timeout() {
    let mut model = scenario(ModelConfig::default());
    let config =
        AlgorithmConfig { solver_time_budget: Some(Duration::from_secs(0)), ..Default::default() };
    assert_eq!(
        embed(&mut model, *SUB, &[*VIRT], config),
        Err(Error::SolverError(SolverError::Timeout))
    );
}
