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

//! Test the resource graph: construction, embedding, releasing and out-of-band removal.

use super::fixtures::*;
use crate::cost::{embedded_cost, Objective};
use crate::model::{
    LinkHost, Model, ModelConfig, ModelError, ModelEvent, NetworkKind, NodeId, Resources,
    SubstrateElement, VirtualElement,
};
use crate::paths::{generate_paths, PathConfig};
use crate::repair::{guest_state, repair, GuestState};

use assert_approx_eq::assert_approx_eq;
use maplit::btreeset;
use rand::prelude::*;

/// Embed every element of the scenario: vsrv1 and vsw on srv1, and vsrv2 on srv2, with the links
/// between vsw and vsrv2 on the two-hop paths.
fn embed_scenario(model: &mut Model) {
    generate_paths(model, *SUB, &PathConfig::default()).unwrap();
    model.embed_node(*VSRV1, *SRV1).unwrap();
    model.embed_node(*VSW, *SRV1).unwrap();
    model.embed_node(*VSRV2, *SRV2).unwrap();
    model.embed_link_on_node(*VSRV1_VSW, *SRV1).unwrap();
    model.embed_link_on_node(*VSW_VSRV1, *SRV1).unwrap();
    model.embed_link_on_path(*VSRV2_VSW, path(5)).unwrap();
    model.embed_link_on_path(*VSW_VSRV2, path(3)).unwrap();
    model.embed_network(*VIRT, *SUB).unwrap();
}

#[test]
fn test_lookup() {
    let mut model = scenario(ModelConfig::default());

    assert_eq!(model.network_by_name("sub"), Ok(*SUB));
    assert_eq!(model.network_by_name("virt"), Ok(*VIRT));
    assert_eq!(model.node_by_name(*SUB, "srv2"), Ok(*SRV2));
    assert_eq!(model.node_by_name(*VIRT, "vsw"), Ok(*VSW));
    assert_eq!(
        model.node_by_name(*SUB, "vsw"),
        Err(ModelError::NameNotFound("vsw".to_string()))
    );
    assert_eq!(
        model.network_by_name("foo"),
        Err(ModelError::NameNotFound("foo".to_string()))
    );

    assert_eq!(model.servers(*SUB).unwrap(), vec![*SRV1, *SRV2]);
    assert_eq!(model.switches(*SUB).unwrap(), vec![*SW]);
    assert_eq!(model.servers(*VIRT).unwrap(), vec![*VSRV1, *VSRV2]);
    assert_eq!(model.link(*SRV1_SW).unwrap().source(), *SRV1);
    assert_eq!(model.link(*SRV1_SW).unwrap().target(), *SW);
    assert_eq!(model.link(*VSW_VSRV2).unwrap().name(), "vsw->vsrv2");

    // names are unique
    assert_eq!(
        model.add_server(*SUB, "srv1", Resources::new(1, 1, 1), 1),
        Err(ModelError::DuplicateName("srv1".to_string()))
    );
    assert_eq!(
        model.add_virtual_network("sub"),
        Err(ModelError::DuplicateName("sub".to_string()))
    );
    assert_eq!(
        model.add_link(*SUB, *SRV1, *SW, 10),
        Err(ModelError::DuplicateName("srv1->sw".to_string()))
    );
    // but the same node name may be used in a different network
    assert!(model.add_server(*VIRT, "srv1", Resources::new(1, 1, 1), 0).is_ok());

    // links must stay inside their network
    assert_eq!(
        model.add_link(*SUB, *SRV1, *VSW, 10),
        Err(ModelError::WrongNetwork(VirtualElement::Node(*VSW), *SUB))
    );

    assert_eq!(
        model.substrate(*VIRT).map(|n| n.id()),
        Err(ModelError::WrongNetworkKind(*VIRT, NetworkKind::Substrate))
    );
    assert_eq!(
        model.virtual_network(*SUB).map(|n| n.id()),
        Err(ModelError::WrongNetworkKind(*SUB, NetworkKind::Virtual))
    );
    assert_eq!(
        model.node(NodeId(100)).map(|n| n.id()),
        Err(ModelError::NodeNotFound(NodeId(100)))
    );
}

#[test]
fn test_aggregates() {
    let model = scenario(ModelConfig::default());

    assert_eq!(model.network_demand(*VIRT), Ok(Resources::new(2, 2, 2)));
    assert_eq!(model.network_bandwidth(*VIRT), Ok(12));
    assert_eq!(model.network_footprint(*VIRT), Ok(18));
    assert_eq!(model.total_residual(*SUB), Ok(Resources::new(8, 8, 8)));
    assert_eq!(model.network_demand(*SUB), Ok(Resources::new(8, 8, 8)));
    assert_eq!(model.is_embedded(*VIRT), Ok(false));
    assert_eq!(model.elements(*VIRT).unwrap().len(), 7);

    // virtual elements carry no residual capacity
    assert_eq!(model.node(*VSRV1).unwrap().residual(), Resources::zero());
    assert_eq!(model.link(*VSRV1_VSW).unwrap().residual_bandwidth(), 0);
}

#[test]
fn test_embed_node() {
    let mut model = scenario(ModelConfig::default());

    model.embed_node(*VSRV1, *SRV1).unwrap();
    assert_eq!(model.node(*SRV1).unwrap().residual(), Resources::new(3, 3, 3));
    assert_eq!(model.node(*VSRV1).unwrap().host(), Some(*SRV1));
    assert_eq!(model.guest_servers(*SRV1).unwrap(), vec![*VSRV1]);
    assert_eq!(model.host_network(VirtualElement::Node(*VSRV1)), Ok(Some(*SUB)));

    // no double embedding
    assert_eq!(
        model.embed_node(*VSRV1, *SRV2),
        Err(ModelError::AlreadyEmbedded(VirtualElement::Node(*VSRV1)))
    );

    // servers only on servers
    assert_eq!(model.embed_node(*VSRV2, *SW), Err(ModelError::NodeKindMismatch(*VSRV2, *SW)));

    // switches everywhere, without consuming anything
    model.embed_node(*VSW, *SW).unwrap();
    assert_eq!(model.guest_switches(*SW).unwrap(), vec![*VSW]);
    assert_eq!(model.node(*SW).unwrap().residual(), Resources::zero());

    // hosts must be substrate nodes
    assert_eq!(
        model.embed_node(*VSRV2, *VSRV1),
        Err(ModelError::WrongNetworkKind(*VIRT, NetworkKind::Substrate))
    );
}

#[test]
fn test_insufficient_capacity() {
    let mut model =
        scenario_with(ModelConfig::default(), Resources::new(3, 1, 1), Resources::new(4, 4, 4));

    model.embed_node(*VSRV1, *SRV1).unwrap();
    assert_eq!(
        model.embed_node(*VSRV2, *SRV1),
        Err(ModelError::InsufficientCapacity(SubstrateElement::Node(*SRV1)))
    );
    // nothing changed
    assert_eq!(model.node(*SRV1).unwrap().residual(), Resources::new(1, 3, 3));
    assert_eq!(model.node(*VSRV2).unwrap().host(), None);
    model.embed_node(*VSRV2, *SRV2).unwrap();
}

#[test]
fn test_embed_link_on_node_and_link() {
    let mut model = scenario(ModelConfig::default());

    model.embed_node(*VSRV1, *SRV1).unwrap();
    model.embed_node(*VSW, *SRV1).unwrap();
    model.embed_link_on_node(*VSRV1_VSW, *SRV1).unwrap();
    assert_eq!(model.link(*VSRV1_VSW).unwrap().host(), Some(LinkHost::Node(*SRV1)));
    assert_eq!(model.node(*SRV1).unwrap().guest_links(), &btreeset! {*VSRV1_VSW});

    // the endpoints of vsrv2 -> vsw are not placed on srv1
    assert_eq!(
        model.embed_link_on_node(*VSRV2_VSW, *SRV1),
        Err(ModelError::HostMismatch(*VSRV2_VSW))
    );

    // vsrv2 on srv2 and vsw on sw, using single links
    let mut model = scenario(ModelConfig::default());
    model.embed_node(*VSRV2, *SRV2).unwrap();
    model.embed_node(*VSW, *SW).unwrap();
    model.embed_link_on_link(*VSRV2_VSW, *SRV2_SW).unwrap();
    assert_eq!(model.link(*SRV2_SW).unwrap().residual_bandwidth(), 97);
    assert_eq!(model.link(*SRV2_SW).unwrap().guests(), &btreeset! {*VSRV2_VSW});
    assert_eq!(model.host_network(VirtualElement::Link(*VSRV2_VSW)), Ok(Some(*SUB)));

    // wrong direction
    assert_eq!(
        model.embed_link_on_link(*VSW_VSRV2, *SRV2_SW),
        Err(ModelError::HostMismatch(*VSW_VSRV2))
    );
    model.embed_link_on_link(*VSW_VSRV2, *SW_SRV2).unwrap();
    assert_eq!(model.link(*SW_SRV2).unwrap().residual_bandwidth(), 97);
}

#[test]
fn test_links_on_single_links() {
    // a complete embedding built by hand, without any path catalog
    let mut model = scenario(ModelConfig::default());
    model.embed_node(*VSRV1, *SRV1).unwrap();
    model.embed_node(*VSW, *SW).unwrap();
    model.embed_node(*VSRV2, *SRV2).unwrap();
    model.embed_link_on_link(*VSRV1_VSW, *SRV1_SW).unwrap();
    model.embed_link_on_link(*VSW_VSRV1, *SW_SRV1).unwrap();
    model.embed_link_on_link(*VSRV2_VSW, *SRV2_SW).unwrap();
    model.embed_link_on_link(*VSW_VSRV2, *SW_SRV2).unwrap();
    model.embed_network(*VIRT, *SUB).unwrap();
    model.validate().unwrap();
    let cost = embedded_cost(&model, *VIRT, Objective::TotalCommunicationCostA).unwrap();
    assert_approx_eq!(12.0, cost);

    // losing a link leaves the network floating, and the repair releases it
    model.remove_link(*SW_SRV2).unwrap();
    assert_eq!(guest_state(&model, *VIRT), Ok(GuestState::Floating));
    assert_eq!(repair(&mut model, *SUB), Ok(vec![*VIRT]));
    assert_eq!(model.link(*SRV1_SW).unwrap().residual_bandwidth(), 100);
    assert_eq!(model.link(*SRV2_SW).unwrap().residual_bandwidth(), 100);
    assert!(model.link(*SRV2_SW).unwrap().guests().is_empty());
    model.validate().unwrap();
}

#[test]
fn test_embed_link_on_path() {
    for sublinks in [true, false].iter() {
        let mut model = scenario(ModelConfig { link_host_embeds_sublinks: *sublinks });
        generate_paths(&mut model, *SUB, &PathConfig::default()).unwrap();

        let p = path(3);
        assert_eq!(model.path(p).unwrap().nodes(), &[*SRV1, *SW, *SRV2]);
        assert_eq!(model.path(p).unwrap().links(), &[*SRV1_SW, *SW_SRV2]);

        model.embed_node(*VSRV1, *SRV1).unwrap();
        model.embed_node(*VSW, *SRV2).unwrap();
        model.embed_link_on_path(*VSRV1_VSW, p).unwrap();

        assert_eq!(model.path(p).unwrap().residual_bandwidth(), 97);
        assert_eq!(model.path(p).unwrap().guests(), &btreeset! {*VSRV1_VSW});
        let expected = if *sublinks { 97 } else { 100 };
        assert_eq!(model.link(*SRV1_SW).unwrap().residual_bandwidth(), expected);
        assert_eq!(model.link(*SW_SRV2).unwrap().residual_bandwidth(), expected);
        assert_eq!(model.link(*SRV2_SW).unwrap().residual_bandwidth(), 100);

        // the path in the other direction does not match
        assert_eq!(
            model.embed_link_on_path(*VSW_VSRV1, p),
            Err(ModelError::HostMismatch(*VSW_VSRV1))
        );

        model.unembed_network(*VIRT).unwrap();
        assert_eq!(model.path(p).unwrap().residual_bandwidth(), 100);
        assert_eq!(model.link(*SRV1_SW).unwrap().residual_bandwidth(), 100);
        model.validate().unwrap();
    }
}

#[test]
fn test_embed_network() {
    let mut model = scenario(ModelConfig::default());
    generate_paths(&mut model, *SUB, &PathConfig::default()).unwrap();

    model.embed_node(*VSRV1, *SRV1).unwrap();
    model.embed_node(*VSW, *SRV1).unwrap();
    model.embed_node(*VSRV2, *SRV2).unwrap();
    assert_eq!(model.embed_network(*VIRT, *SUB), Err(ModelError::ElementsNotHosted(*VIRT)));
    assert_eq!(model.is_embedded(*VIRT), Ok(false));

    model.embed_link_on_node(*VSRV1_VSW, *SRV1).unwrap();
    model.embed_link_on_node(*VSW_VSRV1, *SRV1).unwrap();
    model.embed_link_on_path(*VSRV2_VSW, path(5)).unwrap();
    model.embed_link_on_path(*VSW_VSRV2, path(3)).unwrap();
    model.embed_network(*VIRT, *SUB).unwrap();

    assert_eq!(model.is_embedded(*VIRT), Ok(true));
    assert_eq!(model.network(*VIRT).unwrap().host(), Some(*SUB));
    assert_eq!(model.network(*SUB).unwrap().guests(), &btreeset! {*VIRT});
    assert_eq!(
        model.embed_network(*VIRT, *SUB),
        Err(ModelError::AlreadyEmbedded(VirtualElement::Network(*VIRT)))
    );
    assert_eq!(model.hosts_of(*VIRT).unwrap().len(), 7);
    model.validate().unwrap();

    assert_eq!(model.node(*SRV1).unwrap().residual(), Resources::new(3, 3, 3));
    assert_eq!(model.node(*SRV2).unwrap().residual(), Resources::new(3, 3, 3));
    assert_eq!(model.link(*SRV1_SW).unwrap().residual_bandwidth(), 97);
    assert_eq!(model.link(*SRV2_SW).unwrap().residual_bandwidth(), 97);
}

#[test]
fn test_unembed_network() {
    let mut model = scenario(ModelConfig::default());
    embed_scenario(&mut model);

    model.unembed_network(*VIRT).unwrap();
    assert_eq!(model.is_embedded(*VIRT), Ok(false));
    assert!(model.hosts_of(*VIRT).unwrap().is_empty());
    assert!(model.network(*SUB).unwrap().guests().is_empty());
    assert_eq!(model.total_residual(*SUB), Ok(Resources::new(8, 8, 8)));
    for l in model.network(*SUB).unwrap().links() {
        assert_eq!(model.link(*l).unwrap().residual_bandwidth(), 100);
    }
    for p in model.network(*SUB).unwrap().paths() {
        let p = model.path(*p).unwrap();
        assert_eq!(p.residual_bandwidth(), p.bandwidth());
    }
    model.validate().unwrap();

    // releasing again does nothing
    let cursor = model.event_cursor();
    model.unembed_network(*VIRT).unwrap();
    assert!(model.events_since(cursor).is_empty());

    // and the network can be embedded again
    embed_scenario_again(&mut model);
    model.validate().unwrap();
}

fn embed_scenario_again(model: &mut Model) {
    model.embed_node(*VSRV1, *SRV2).unwrap();
    model.embed_node(*VSRV2, *SRV2).unwrap();
    model.embed_node(*VSW, *SRV2).unwrap();
    let links: Vec<_> = model.network(*VIRT).unwrap().links().iter().cloned().collect();
    for l in links {
        model.embed_link_on_node(l, *SRV2).unwrap();
    }
    model.embed_network(*VIRT, *SUB).unwrap();
}

#[test]
fn test_remove_substrate_node() {
    let mut model = scenario(ModelConfig::default());
    embed_scenario(&mut model);

    model.remove_node(*SRV2).unwrap();
    assert!(model.node(*SRV2).is_err());
    assert!(model.link(*SRV2_SW).is_err());
    assert!(model.link(*SW_SRV2).is_err());
    // only paths between sw and srv1 survive
    assert_eq!(model.network(*SUB).unwrap().paths().len(), 2);
    assert_eq!(model.node(*VSRV2).unwrap().host(), None);
    assert_eq!(model.link(*VSW_VSRV2).unwrap().host(), None);

    // the network is floating, which is valid until the repair
    model.validate().unwrap();
    assert_eq!(guest_state(&model, *VIRT), Ok(GuestState::Floating));
    assert_eq!(repair(&mut model, *SUB), Ok(vec![*VIRT]));
    model.validate().unwrap();
    assert_eq!(model.node(*SRV1).unwrap().residual(), Resources::new(4, 4, 4));
    assert_eq!(model.link(*SRV1_SW).unwrap().residual_bandwidth(), 100);
}

#[test]
fn test_validate_partial_embedding() {
    let mut model = scenario(ModelConfig::default());
    model.embed_node(*VSRV1, *SRV1).unwrap();
    // a network without a host must not keep hosted elements
    assert!(matches!(model.validate(), Err(ModelError::ConsistencyViolation(_))));
    model.unembed_network(*VIRT).unwrap();
    model.validate().unwrap();
}

#[test]
fn test_remove_virtual_elements() {
    let mut model = scenario(ModelConfig::default());
    embed_scenario(&mut model);

    model.remove_link(*VSW_VSRV2).unwrap();
    assert_eq!(model.path(path(3)).unwrap().residual_bandwidth(), 100);
    assert_eq!(model.link(*SW_SRV2).unwrap().residual_bandwidth(), 100);
    model.validate().unwrap();

    model.remove_network(*VIRT).unwrap();
    assert!(model.network(*VIRT).is_err());
    assert!(model.network(*SUB).unwrap().guests().is_empty());
    assert_eq!(model.total_residual(*SUB), Ok(Resources::new(8, 8, 8)));
    assert!(model.take_orphans().is_empty());
    model.validate().unwrap();
}

#[test]
fn test_remove_substrate_network() {
    let mut model = scenario(ModelConfig::default());
    embed_scenario(&mut model);

    model.remove_network(*SUB).unwrap();
    assert!(model.network(*SUB).is_err());
    assert_eq!(model.is_embedded(*VIRT), Ok(false));
    assert!(model.hosts_of(*VIRT).unwrap().is_empty());
    assert_eq!(model.take_orphans(), btreeset! {*VIRT});
    assert!(model.take_orphans().is_empty());
    model.validate().unwrap();
}

#[test]
fn test_event_log() {
    let mut model = scenario(ModelConfig::default());
    let cursor = model.event_cursor();
    assert!(model.events_since(cursor).is_empty());

    let srv3 = model.add_server(*SUB, "srv3", Resources::new(1, 1, 1), 1).unwrap();
    model.embed_node(*VSRV1, srv3).unwrap();
    assert_eq!(
        model.events_since(cursor),
        &[
            ModelEvent::NodeAdded(*SUB, srv3),
            ModelEvent::Embedded(*VIRT, VirtualElement::Node(*VSRV1))
        ]
    );
    assert!(model.events_since(cursor)[0].is_structural());
    assert!(!model.events_since(cursor)[1].is_structural());
    assert_eq!(model.events_since(cursor)[1].network(), *VIRT);

    // the cursor beyond the end yields nothing
    assert!(model.events_since(model.event_cursor() + 10).is_empty());
}

#[test]
fn test_residual_conservation() {
    let capacity = Resources::new(8, 8, 8);
    let (mut model, dc) = two_tier(ModelConfig::default(), capacity);
    let mut rng = StdRng::seed_from_u64(42);

    let requests: Vec<_> = (0..6)
        .map(|i| {
            let demand = Resources::new(
                rng.gen_range(1, 5),
                rng.gen_range(1, 5),
                rng.gen_range(1, 5),
            );
            add_single_request(&mut model, &format!("req{}", i), demand)
        })
        .collect();
    let servers = model.servers(dc).unwrap();

    for _ in 0..100 {
        let req = *requests.choose(&mut rng).unwrap();
        if model.is_embedded(req).unwrap() {
            model.unembed_network(req).unwrap();
        } else {
            let server = *servers.choose(&mut rng).unwrap();
            let node = *model.network(req).unwrap().nodes().iter().next().unwrap();
            if model.embed_node(node, server).is_ok() {
                model.embed_network(req, dc).unwrap();
            }
        }

        model.validate().unwrap();
        let used: Resources = requests
            .iter()
            .filter(|r| model.is_embedded(**r).unwrap())
            .map(|r| model.network_demand(*r).unwrap())
            .sum();
        let total = Resources::new(32, 32, 32);
        assert_eq!(model.total_residual(dc).unwrap() + used, total);
    }
}
