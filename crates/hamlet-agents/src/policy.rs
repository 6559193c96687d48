//! The decision policy engine.
//!
//! Given a fully-resolved snapshot of an agent, its player body, the map,
//! and the other free players, [`decide`] selects exactly one [`Intent`]
//! for this tick. The engine is a pure function of its inputs plus the
//! supplied random source -- no clocks, no queries, no global state --
//! which is what makes it unit-testable with seeded generators.
//!
//! Priority order:
//!
//! 1. A player with no pathfinding intent either wanders (when inside an
//!    activity or conversation cooldown window) or starts a random
//!    activity from the catalogue.
//! 2. A player already walking may seek a conversation candidate (unless
//!    cooldowns forbid it), then one random draw picks between a
//!    world-object discovery (disabled by default) and the trade check;
//!    a failed trade check falls through to the invite outcome.
//!
//! The invite outcome with an absent invitee is the explicit "nothing
//! further" resolution -- the caller always gets an intent to report, so
//! a dispatched operation is never left unresolved.

use rand::Rng;

use hamlet_types::{Activity, Agent, DiscoveryKind, Player, PlayerId, Size, Tile, WorldMap};

use crate::activities::ActivitySpec;
use crate::config::PolicyConfig;
use crate::cooldown;

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// Placement proposal for a discovered world object.
///
/// Only the geometry is decided here; naming and sprite generation need
/// external calls and belong to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPlan {
    /// Whether the object is a building or an item.
    pub kind: DiscoveryKind,
    /// Top-left placement tile, clamped so the footprint stays on the map.
    pub place: Tile,
    /// Footprint in tiles.
    pub size: Size,
}

/// A proposed inventory hand-off to a nearby player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeProposal {
    /// The receiving player.
    pub to: PlayerId,
    /// Index into the giver's ordered inventory.
    pub item_index: usize,
}

/// The single decision produced by one [`decide`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Walk to a random destination away from the map edges.
    Wander {
        /// The chosen destination tile.
        destination: Tile,
    },
    /// Perform a timed activity from the catalogue.
    Activity {
        /// The chosen activity with its expiry stamped.
        activity: Activity,
    },
    /// Propose discovering a new world object (disabled by default).
    Discover {
        /// Geometry of the proposed object.
        plan: DiscoveryPlan,
    },
    /// Hand an inventory item to a nearby player.
    Trade {
        /// The proposed hand-off.
        proposal: TradeProposal,
    },
    /// Resolve the tick with an optional conversation invite.
    Invite {
        /// The player to invite, or `None` when no candidate is eligible.
        invitee: Option<PlayerId>,
    },
}

// ---------------------------------------------------------------------------
// Decision entry point
// ---------------------------------------------------------------------------

/// Select the agent's next intent.
///
/// Pure given `(agent, player, map, other_free_players, now, config)` and
/// the random source. Exactly one intent is returned per call.
pub fn decide(
    agent: &Agent,
    player: &Player,
    map: &WorldMap,
    other_free_players: &[Player],
    now: u64,
    config: &PolicyConfig,
    rng: &mut impl Rng,
) -> Intent {
    // Don't try to start a new conversation if we were just in one.
    let just_left_conversation =
        cooldown::within(now, agent.last_conversation, config.conversation_cooldown_ms);
    // Don't try again if we recently tried to find someone to invite.
    let recently_attempted_invite =
        cooldown::within(now, agent.last_invite_attempt, config.conversation_cooldown_ms);
    let recent_activity = player
        .activity
        .as_ref()
        .is_some_and(|a| now < a.until.saturating_add(config.activity_cooldown_ms));

    // Standing still: the only question is wander vs. activity.
    if player.pathfinding.is_none() {
        if recent_activity || just_left_conversation {
            return Intent::Wander {
                destination: wander_destination(map, rng),
            };
        }
        return match random_activity(&config.activities, now, rng) {
            Some(activity) => Intent::Activity { activity },
            // Empty catalogue: wandering is always available.
            None => Intent::Wander {
                destination: wander_destination(map, rng),
            },
        };
    }

    // Already walking: maybe line up a conversation for arrival.
    let invitee = if just_left_conversation || recently_attempted_invite {
        None
    } else {
        find_conversation_candidate(player, other_free_players)
    };

    if rng.random::<f64>() < config.discovery_probability {
        return Intent::Discover {
            plan: discovery_plan(map, rng),
        };
    }

    if let Some(proposal) = evaluate_trade(player, other_free_players, config, rng) {
        return Intent::Trade { proposal };
    }

    Intent::Invite { invitee }
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// Pick a wander destination at least one tile from every map edge.
///
/// The destination is uniform over `[1, width-2] x [1, height-2]`.
/// Degenerate maps (width or height below 3) collapse to the center tile.
pub fn wander_destination(map: &WorldMap, rng: &mut impl Rng) -> Tile {
    let x = if map.width > 2 {
        rng.random_range(1..map.width.saturating_sub(1))
    } else {
        map.width / 2
    };
    let y = if map.height > 2 {
        rng.random_range(1..map.height.saturating_sub(1))
    } else {
        map.height / 2
    };
    Tile { x, y }
}

/// Draw a random activity from the catalogue and stamp its expiry.
///
/// Returns `None` for an empty catalogue.
fn random_activity(
    catalogue: &[ActivitySpec],
    now: u64,
    rng: &mut impl Rng,
) -> Option<Activity> {
    if catalogue.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..catalogue.len());
    catalogue.get(idx).map(|spec| Activity {
        description: spec.description.clone(),
        emoji: spec.emoji.clone(),
        until: now.saturating_add(spec.duration_ms),
    })
}

/// Find the closest free player to invite into a conversation.
///
/// The snapshot already carries everything this needs: the original
/// candidate query reads only the acting player and the free-player list.
/// Pairwise conversation-history exclusions are the store's concern and
/// are applied before the snapshot is taken.
pub fn find_conversation_candidate(
    player: &Player,
    other_free_players: &[Player],
) -> Option<PlayerId> {
    other_free_players
        .iter()
        .map(|other| (other.id, other.position.distance(&player.position)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Evaluate whether the player should hand an item to a nearby player.
///
/// A trade is proposed only when the inventory is non-empty, the closest
/// free player is within `trade_distance` (Manhattan), and the
/// `trade_probability` draw succeeds. The traded item index is drawn
/// uniformly over the inventory.
pub fn evaluate_trade(
    player: &Player,
    other_free_players: &[Player],
    config: &PolicyConfig,
    rng: &mut impl Rng,
) -> Option<TradeProposal> {
    if player.inventory.is_empty() {
        return None;
    }
    let (nearest, distance) = other_free_players
        .iter()
        .map(|other| (other, other.position.manhattan_distance(&player.position)))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;
    if distance > config.trade_distance {
        return None;
    }
    if rng.random::<f64>() >= config.trade_probability {
        return None;
    }
    let item_index = rng.random_range(0..player.inventory.len());
    Some(TradeProposal {
        to: nearest.id,
        item_index,
    })
}

/// Propose geometry for a discovered world object.
///
/// Buildings get a random 3-6 tile footprint, items a single tile. The
/// placement starts from a wander destination and is clamped so the
/// whole footprint stays on the map.
pub fn discovery_plan(map: &WorldMap, rng: &mut impl Rng) -> DiscoveryPlan {
    let kind = if rng.random::<f64>() < 0.5 {
        DiscoveryKind::Building
    } else {
        DiscoveryKind::Item
    };
    let size = match kind {
        DiscoveryKind::Building => Size {
            w: rng.random_range(3..7),
            h: rng.random_range(3..7),
        },
        DiscoveryKind::Item => Size { w: 1, h: 1 },
    };
    let base = wander_destination(map, rng);
    DiscoveryPlan {
        kind,
        place: Tile {
            x: base.x.min(map.width.saturating_sub(size.w)),
            y: base.y.min(map.height.saturating_sub(size.h)),
        },
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use hamlet_types::{AgentId, InventoryItem, Pathfinding, Point};

    const NOW: u64 = 1_700_000_000_000;

    fn test_map() -> WorldMap {
        WorldMap {
            width: 64,
            height: 48,
            tile_dim: 32,
        }
    }

    fn test_player(x: f64, y: f64) -> Player {
        Player {
            id: PlayerId::new(),
            position: Point { x, y },
            pathfinding: None,
            activity: None,
            inventory: Vec::new(),
        }
    }

    fn walking_player(x: f64, y: f64) -> Player {
        Player {
            pathfinding: Some(Pathfinding {
                destination: Tile { x: 5, y: 5 },
            }),
            ..test_player(x, y)
        }
    }

    fn test_agent(player_id: PlayerId) -> Agent {
        Agent {
            id: AgentId::new(),
            player_id,
            last_conversation: None,
            last_invite_attempt: None,
            in_progress_operation: None,
        }
    }

    #[test]
    fn wander_destination_stays_off_the_edges() {
        let map = test_map();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = wander_destination(&map, &mut rng);
            assert!(d.x >= 1 && d.x <= map.width - 2, "x={} out of range", d.x);
            assert!(d.y >= 1 && d.y <= map.height - 2, "y={} out of range", d.y);
        }
    }

    #[test]
    fn just_left_conversation_forces_wander() {
        // lastConversation one millisecond ago, cooldown 60s, standing
        // still: the decision must be wander, never an activity.
        let player = test_player(10.0, 10.0);
        let mut agent = test_agent(player.id);
        agent.last_conversation = Some(NOW - 1);
        let config = PolicyConfig::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let intent = decide(&agent, &player, &test_map(), &[], NOW, &config, &mut rng);
            assert!(matches!(intent, Intent::Wander { .. }), "got {intent:?}");
        }
    }

    #[test]
    fn recent_activity_forces_wander() {
        let mut player = test_player(10.0, 10.0);
        player.activity = Some(Activity {
            description: String::from("reading a book"),
            emoji: String::from("\u{1f4d6}"),
            // Ended just now; the activity cooldown still applies.
            until: NOW - 1,
        });
        let agent = test_agent(player.id);
        let mut rng = StdRng::seed_from_u64(7);
        let intent = decide(
            &agent,
            &player,
            &test_map(),
            &[],
            NOW,
            &PolicyConfig::default(),
            &mut rng,
        );
        assert!(matches!(intent, Intent::Wander { .. }));
    }

    #[test]
    fn idle_player_starts_an_activity() {
        let player = test_player(10.0, 10.0);
        let agent = test_agent(player.id);
        let mut rng = StdRng::seed_from_u64(3);
        let intent = decide(
            &agent,
            &player,
            &test_map(),
            &[],
            NOW,
            &PolicyConfig::default(),
            &mut rng,
        );
        assert!(matches!(intent, Intent::Activity { .. }), "got {intent:?}");
        if let Intent::Activity { activity } = intent {
            assert!(activity.until > NOW);
            assert!(!activity.description.is_empty());
        }
    }

    #[test]
    fn empty_catalogue_falls_back_to_wander() {
        let player = test_player(10.0, 10.0);
        let agent = test_agent(player.id);
        let config = PolicyConfig {
            activities: Vec::new(),
            ..PolicyConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let intent = decide(&agent, &player, &test_map(), &[], NOW, &config, &mut rng);
        assert!(matches!(intent, Intent::Wander { .. }));
    }

    #[test]
    fn walking_player_without_neighbors_resolves_with_empty_invite() {
        let player = walking_player(10.0, 10.0);
        let agent = test_agent(player.id);
        let mut rng = StdRng::seed_from_u64(11);
        let intent = decide(
            &agent,
            &player,
            &test_map(),
            &[],
            NOW,
            &PolicyConfig::default(),
            &mut rng,
        );
        assert_eq!(intent, Intent::Invite { invitee: None });
    }

    #[test]
    fn recent_invite_attempt_suppresses_candidate_search() {
        let player = walking_player(10.0, 10.0);
        let mut agent = test_agent(player.id);
        agent.last_invite_attempt = Some(NOW - 1);
        let neighbor = test_player(11.0, 10.0);
        let mut rng = StdRng::seed_from_u64(11);
        let config = PolicyConfig {
            // Keep the trade branch quiet so the invite outcome shows.
            trade_probability: 0.0,
            ..PolicyConfig::default()
        };
        let intent = decide(
            &agent,
            &player,
            &test_map(),
            &[neighbor],
            NOW,
            &config,
            &mut rng,
        );
        assert_eq!(intent, Intent::Invite { invitee: None });
    }

    #[test]
    fn candidate_search_picks_the_closest_free_player() {
        let player = test_player(10.0, 10.0);
        let near = test_player(12.0, 10.0);
        let far = test_player(40.0, 40.0);
        let found =
            find_conversation_candidate(&player, &[far.clone(), near.clone()]);
        assert_eq!(found, Some(near.id));
    }

    #[test]
    fn trade_requires_a_candidate_within_manhattan_range() {
        let mut player = test_player(10.0, 10.0);
        player.inventory = vec![InventoryItem {
            name: String::from("clay pot"),
            image_url: None,
        }];
        let config = PolicyConfig {
            trade_probability: 1.0,
            ..PolicyConfig::default()
        };

        // Distance 2 (Manhattan): always trades at probability 1.
        let near = test_player(11.0, 11.0);
        let mut rng = StdRng::seed_from_u64(5);
        let proposal = evaluate_trade(&player, &[near.clone()], &config, &mut rng);
        assert_eq!(proposal.map(|p| p.to), Some(near.id));
        assert_eq!(proposal.map(|p| p.item_index), Some(0));

        // Distance 4: out of range, never trades.
        let far = test_player(12.0, 12.0);
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(evaluate_trade(&player, &[far], &config, &mut rng), None);
    }

    #[test]
    fn empty_inventory_never_trades() {
        let player = test_player(10.0, 10.0);
        let near = test_player(10.5, 10.0);
        let config = PolicyConfig {
            trade_probability: 1.0,
            ..PolicyConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(evaluate_trade(&player, &[near], &config, &mut rng), None);
    }

    #[test]
    fn discovery_disabled_by_default() {
        let mut player = walking_player(10.0, 10.0);
        player.inventory = vec![InventoryItem {
            name: String::from("clay pot"),
            image_url: None,
        }];
        let agent = test_agent(player.id);
        let neighbor = test_player(11.0, 10.0);
        let config = PolicyConfig::default();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let intent = decide(
                &agent,
                &player,
                &test_map(),
                &[neighbor.clone()],
                NOW,
                &config,
                &mut rng,
            );
            assert!(
                !matches!(intent, Intent::Discover { .. }),
                "discovery fired with probability zero"
            );
        }
    }

    #[test]
    fn discovery_fires_when_enabled_and_stays_on_the_map() {
        let player = walking_player(10.0, 10.0);
        let agent = test_agent(player.id);
        let map = test_map();
        let config = PolicyConfig {
            discovery_probability: 1.0,
            ..PolicyConfig::default()
        };
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let intent = decide(&agent, &player, &map, &[], NOW, &config, &mut rng);
            assert!(matches!(intent, Intent::Discover { .. }), "got {intent:?}");
            if let Intent::Discover { plan } = intent {
                assert!(plan.place.x + plan.size.w <= map.width);
                assert!(plan.place.y + plan.size.h <= map.height);
                if plan.kind == DiscoveryKind::Item {
                    assert_eq!(plan.size, Size { w: 1, h: 1 });
                } else {
                    assert!((3..7).contains(&plan.size.w));
                    assert!((3..7).contains(&plan.size.h));
                }
            }
        }
    }

    #[test]
    fn degenerate_map_collapses_to_center() {
        let map = WorldMap {
            width: 1,
            height: 2,
            tile_dim: 32,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let d = wander_destination(&map, &mut rng);
        assert_eq!(d, Tile { x: 0, y: 1 });
    }
}
