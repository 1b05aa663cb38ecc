#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative state of buildable objects and the players who build them.
//!
//! The world is driven exclusively through [`apply`]; read access goes through
//! the functions in [`query`].

mod build_points;
pub mod config;
mod construction;
mod damage;
mod debris;
mod lifecycle;
mod objects;
mod placement;
mod players;
mod repair;

use std::{collections::BTreeMap, time::Duration};

use outpost_core::{Command, Event, PlayerId, RemovalReason, Zone};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

pub use config::{ConfigError, ObjectCatalog, ObjectSpec, PlacementTuning, Tuning, WorldConfig};

use crate::{debris::DebrisField, objects::ObjectArena, objects::TeamRoster, players::Player};

/// Represents the authoritative world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    clock: Duration,
    think_accumulator: Duration,
    tick_index: u64,
    objects: ObjectArena,
    rosters: TeamRoster,
    players: BTreeMap<PlayerId, Player>,
    zones: Vec<Zone>,
    debris: DebrisField,
    rng: ChaCha8Rng,
}

impl World {
    /// Creates an empty world using the built-in configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates an empty world using the provided configuration.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            clock: Duration::ZERO,
            think_accumulator: Duration::ZERO,
            tick_index: 0,
            objects: ObjectArena::default(),
            rosters: TeamRoster::default(),
            players: BTreeMap::new(),
            zones: Vec::new(),
            debris: DebrisField::default(),
            rng,
        }
    }

    fn advance_time(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced { dt });

        for object in self.objects.ids() {
            if self.objects.get(object).is_some_and(|ghost| ghost.is_placing()) {
                self.update_placement(object, out_events);
            }
        }

        // Every think sees the clock at its own step.
        let interval = self.config.tuning.think_interval();
        let mut remaining = dt;
        while self.think_accumulator + remaining >= interval {
            let step = interval - self.think_accumulator;
            remaining -= step;
            self.clock = self.clock.saturating_add(step);
            self.think_accumulator = Duration::ZERO;
            self.think(interval.as_secs_f32(), out_events);
        }
        self.clock = self.clock.saturating_add(remaining);
        self.think_accumulator += remaining;
    }

    fn connect_player(&mut self, player: Player, out_events: &mut Vec<Event>) {
        let max_metal = self.config.tuning.max_metal;
        let player = Player {
            metal: player.metal.min(max_metal),
            ..player
        };
        if self.players.insert(player.id, player).is_some() {
            warn!(player = ?player.id, "player reconnected without disconnecting");
        }
        info!(player = ?player.id, team = player.team.get(), metal = player.metal, "player connected");
        out_events.push(Event::PlayerConnected {
            player: player.id,
            team: player.team,
        });
    }

    fn disconnect_player(&mut self, player: PlayerId, out_events: &mut Vec<Event>) {
        if self.players.remove(&player).is_none() {
            warn!(?player, "disconnect for an unknown player");
            return;
        }

        let owned: Vec<_> = self
            .objects
            .iter()
            .filter(|object| object.builder == Some(player))
            .map(|object| (object.id, object.is_placing()))
            .collect();
        for (object, placing) in owned {
            if placing {
                self.destroy_object(object, RemovalReason::PlacementCancelled, out_events);
            } else if let Some(object) = self.objects.get_mut(object) {
                object.builder = None;
            }
        }

        info!(?player, "player disconnected");
        out_events.push(Event::PlayerDisconnected { player });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConnectPlayer {
            player,
            team,
            metal,
            origin,
            yaw,
        } => world.connect_player(
            Player {
                id: player,
                team,
                metal,
                origin,
                yaw,
            },
            out_events,
        ),
        Command::MovePlayer {
            player,
            origin,
            yaw,
        } => match world.players.get_mut(&player) {
            Some(current) => {
                current.origin = origin;
                current.yaw = yaw;
            }
            None => warn!(?player, "move for an unknown player"),
        },
        Command::DisconnectPlayer { player } => world.disconnect_player(player, out_events),
        Command::AddZone { zone } => {
            debug!(?zone, "zone added");
            world.zones.push(zone);
        }
        Command::Tick { dt } => world.advance_time(dt, out_events),
        Command::SpawnMapObject {
            kind,
            team,
            builder,
            origin,
            yaw,
        } => {
            let _ = world.spawn_map_object(kind, team, builder, origin, yaw, out_events);
        }
        Command::StartPlacement { builder, kind } => {
            let _ = world.start_placement(builder, kind, out_events);
        }
        Command::UpdatePlacement { object } => world.update_placement(object, out_events),
        Command::RotatePlacement { object } => world.rotate_placement(object, out_events),
        Command::StopPlacement { object } => world.stop_placement(object, out_events),
        Command::StartBuilding { object } => {
            if let Err(reason) = world.start_building(object, out_events) {
                debug!(?object, %reason, "build rejected");
                out_events.push(Event::BuildRejected { object, reason });
            }
        }
        Command::DamageObject { object, damage } => {
            let _ = world.take_damage(object, damage, out_events);
        }
        Command::RepairObject { object, amount } => {
            let _ = world.repair(object, amount, out_events);
        }
        Command::RepairHit { object, repairer } => world.record_repair_hit(object, repairer),
        Command::WrenchHit { object, player } => {
            if !world.wrench_hit(object, player, out_events) {
                debug!(?object, ?player, "wrench hit had no effect");
            }
        }
        Command::DismantleObject { object, player } => {
            if !world.dismantle(object, player, out_events) {
                warn!(?object, ?player, "dismantle refused");
            }
        }
        Command::DetonateObject { object } => world.detonate(object, out_events),
        Command::SetObjectHealth { object, max_health } => {
            world.set_object_health(object, max_health, out_events);
        }
        Command::AddObjectHealth { object, amount } => {
            world.add_object_health(object, amount, out_events);
        }
        Command::RemoveObjectHealth { object, amount } => {
            world.remove_object_health(object, amount, out_events);
        }
        Command::AttachObject {
            child,
            parent,
            point,
        } => {
            if let Err(reason) = world.attach_object_to_object(child, parent, point, out_events) {
                debug!(?child, ?parent, point, %reason, "attachment rejected");
                out_events.push(Event::AttachRejected {
                    child,
                    parent,
                    point,
                    reason,
                });
            }
        }
        Command::DetachObject { child } => {
            if !world.detach_object_from_object(child, out_events) {
                warn!(?child, "detach requested for an object without a build point");
            }
        }
        Command::ReplaceBuildPoints { object, points } => {
            world.replace_build_points(object, &points, out_events);
        }
        Command::CollectDebris { debris, player } => {
            world.collect_debris(debris, player, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec3;
    use outpost_core::{
        DebrisId, ObjectId, ObjectKind, ObjectPhase, ObjectSnapshot, ObjectView, PlayerId,
        PlayerSnapshot, TeamId,
    };

    use super::{objects::BuildableObject, World, WorldConfig};

    /// Captures the state of a single object.
    #[must_use]
    pub fn object(world: &World, id: ObjectId) -> Option<ObjectSnapshot> {
        world.objects.get(id).map(snapshot)
    }

    /// Captures a read-only view of every object in deterministic order.
    #[must_use]
    pub fn object_view(world: &World) -> ObjectView {
        ObjectView::from_snapshots(world.objects.iter().map(snapshot).collect())
    }

    fn snapshot(object: &BuildableObject) -> ObjectSnapshot {
        let percent_constructed = match object.phase {
            ObjectPhase::Placing => 0.0,
            ObjectPhase::Building => object.construction.percent(),
            ObjectPhase::Active => 1.0,
        };
        ObjectSnapshot {
            id: object.id,
            kind: object.kind,
            phase: object.phase,
            team: object.team,
            builder: object.builder,
            origin: object.origin,
            yaw: object.yaw,
            health: object.replicated_health(),
            precise_health: object.health,
            max_health: object.max_health,
            percent_constructed,
            placement_ok: object.placement_ok,
            disabled: object.disabled,
            has_sapper: object.has_sapper,
            visible: object.visible,
            can_be_dismantled: object.can_be_dismantled,
            desired_rotations: object.desired_rotations,
            attachment: object.parent,
            children: object.children(),
            build_bounds: object.build_bounds,
        }
    }

    /// Committed objects owned by `team`, ordered by identifier.
    #[must_use]
    pub fn team_roster(world: &World, team: TeamId) -> Vec<ObjectId> {
        world.rosters.members(team).collect()
    }

    /// Current repair multiplier of an object, counting only live repairers.
    #[must_use]
    pub fn repair_multiplier(world: &World, id: ObjectId) -> Option<f32> {
        world
            .objects
            .get(id)
            .map(|object| object.repairers.peek_multiplier(world.clock))
    }

    /// Captures the state of a connected player.
    #[must_use]
    pub fn player(world: &World, id: PlayerId) -> Option<PlayerSnapshot> {
        world.players.get(&id).map(|player| player.snapshot())
    }

    /// Every connected player ordered by identifier.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerSnapshot> {
        world.players.values().map(|player| player.snapshot()).collect()
    }

    /// Metal charged for committing an object of `kind`.
    #[must_use]
    pub fn object_cost(world: &World, kind: ObjectKind) -> u32 {
        world.config.catalog.spec(kind).cost
    }

    /// Reports whether `player` holds enough metal to commit an object of `kind`.
    #[must_use]
    pub fn can_afford(world: &World, player: PlayerId, kind: ObjectKind) -> bool {
        world
            .players
            .get(&player)
            .is_some_and(|player| player.can_afford(object_cost(world, kind)))
    }

    /// Uncollected debris ordered by identifier.
    #[must_use]
    pub fn debris(world: &World) -> Vec<DebrisSnapshot> {
        world
            .debris
            .iter()
            .map(|(id, piece)| DebrisSnapshot {
                id,
                metal: piece.metal,
                origin: piece.origin,
                velocity: piece.velocity,
            })
            .collect()
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_count(world: &World) -> u64 {
        world.tick_index
    }

    /// Configuration the world runs with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Immutable representation of an uncollected debris fragment.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct DebrisSnapshot {
        /// Identifier of the fragment.
        pub id: DebrisId,
        /// Metal refunded when the fragment is collected.
        pub metal: u32,
        /// Position the fragment was thrown from.
        pub origin: Vec3,
        /// Launch velocity of the fragment.
        pub velocity: Vec3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use outpost_core::{ObjectId, ObjectKind, TeamId};

    fn connect(world: &mut World, metal: u32, events: &mut Vec<Event>) -> PlayerId {
        let player = PlayerId::new(1);
        apply(
            world,
            Command::ConnectPlayer {
                player,
                team: TeamId::new(2),
                metal,
                origin: Vec3::ZERO,
                yaw: 0.0,
            },
            events,
        );
        player
    }

    #[test]
    fn tick_advances_clock_and_counts_ticks() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(250),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::TimeAdvanced {
                dt: Duration::from_millis(250)
            }]
        );
        assert_eq!(query::clock(&world), Duration::from_millis(250));
        assert_eq!(query::tick_count(&world), 1);
    }

    #[test]
    fn connecting_caps_wallet() {
        let mut world = World::new();
        let mut events = Vec::new();
        let player = connect(&mut world, 5000, &mut events);

        let snapshot = query::player(&world, player).expect("player connected");
        assert_eq!(snapshot.metal, world.config.tuning.max_metal);
        assert!(events.contains(&Event::PlayerConnected {
            player,
            team: TeamId::new(2)
        }));
    }

    #[test]
    fn disconnect_discards_ghosts_and_orphans_buildings() {
        let mut world = World::new();
        let mut events = Vec::new();
        let player = connect(&mut world, 200, &mut events);
        apply(
            &mut world,
            Command::SpawnMapObject {
                kind: ObjectKind::Dispenser,
                team: TeamId::new(2),
                builder: Some(player),
                origin: Vec3::new(500.0, 0.0, 0.0),
                yaw: 0.0,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::StartPlacement {
                builder: Some(player),
                kind: ObjectKind::SentryGun,
            },
            &mut events,
        );
        events.clear();

        apply(&mut world, Command::DisconnectPlayer { player }, &mut events);

        let objects = query::object_view(&world).into_vec();
        assert_eq!(objects.len(), 1, "ghost removed, dispenser kept");
        assert_eq!(objects[0].kind, ObjectKind::Dispenser);
        assert_eq!(objects[0].builder, None);
        assert!(events.contains(&Event::ObjectRemoved {
            object: ObjectId::new(1, 0),
            reason: RemovalReason::PlacementCancelled,
        }));
        assert_eq!(events.last(), Some(&Event::PlayerDisconnected { player }));
        assert!(query::player(&world, player).is_none());
    }

    #[test]
    fn thinks_run_on_fixed_interval() {
        let mut world = World::new();
        let mut events = Vec::new();
        for _ in 0..3 {
            apply(
                &mut world,
                Command::Tick {
                    dt: Duration::from_millis(40),
                },
                &mut events,
            );
        }
        assert_eq!(world.think_accumulator, Duration::from_millis(20));
    }
}
