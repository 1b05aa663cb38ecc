//! Object lifecycle: placement ghosts, construction, activation and destruction.

use glam::Vec3;
use outpost_core::{
    BuildError, DamageInfo, DamageType, Event, ObjectId, ObjectKind, ObjectPhase, PlayerId,
    RemovalReason, TeamId, BUILD_ROTATION_STEPS,
};
use tracing::{debug, info, warn};

use crate::{
    build_points::layout, construction::ConstructionTimer, objects::BuildableObject, World,
};

impl World {
    /// Creates a placement ghost for `builder`.
    pub(crate) fn start_placement(
        &mut self,
        builder: Option<PlayerId>,
        kind: ObjectKind,
        out_events: &mut Vec<Event>,
    ) -> ObjectId {
        let spec = self.config.catalog.spec(kind);
        let margin = self.config.tuning.placement.build_margin;
        let build_bounds = spec.bounds.inflated(Vec3::new(margin, margin, 0.0));
        let points = layout(&spec.build_points);
        let max_health = spec.max_health;
        let repeatable = spec.repeatable;

        let player = builder.and_then(|id| self.players.get(&id)).copied();
        let team = player.map(|player| player.team);
        if builder.is_some() && player.is_none() {
            warn!(?builder, kind = kind.name(), "placement started for unknown builder");
        }

        let object = self.objects.insert_with(|id| {
            let mut ghost =
                BuildableObject::ghost(id, kind, team, builder, build_bounds, max_health, points);
            if let Some(player) = player {
                ghost.origin = player.origin;
                ghost.yaw = player.yaw;
            }
            ghost
        });

        debug!(?object, ?builder, kind = kind.name(), "placement started");
        out_events.push(Event::PlacementStarted {
            object,
            builder,
            kind,
            repeatable,
        });
        self.update_placement(object, out_events);
        object
    }

    pub(crate) fn rotate_placement(&mut self, object: ObjectId, out_events: &mut Vec<Event>) {
        let Some(ghost) = self.objects.get_mut(object).filter(|ghost| ghost.is_placing()) else {
            warn!(?object, "rotate requested for an object that is not being placed");
            return;
        };
        ghost.desired_rotations = (ghost.desired_rotations + 1) % BUILD_ROTATION_STEPS;
        out_events.push(Event::PlacementRotated {
            object,
            rotations: ghost.desired_rotations,
        });
    }

    pub(crate) fn stop_placement(&mut self, object: ObjectId, out_events: &mut Vec<Event>) {
        if !self
            .objects
            .get(object)
            .is_some_and(BuildableObject::is_placing)
        {
            warn!(?object, "stop requested for an object that is not being placed");
            return;
        }
        debug!(?object, "placement cancelled");
        self.destroy_object(object, RemovalReason::PlacementCancelled, out_events);
    }

    /// Commits a ghost: charges the builder and begins construction.
    pub(crate) fn start_building(
        &mut self,
        object: ObjectId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), BuildError> {
        let ghost = self.objects.get(object).ok_or(BuildError::MissingObject)?;
        if !ghost.is_placing() {
            return Err(BuildError::NotPlacing);
        }
        if !ghost.placement_ok {
            return Err(BuildError::InvalidPlacement);
        }
        if let Some(target) = ghost.snap_target {
            let seat_open = self
                .objects
                .get(target.parent)
                .and_then(|parent| parent.points.get(target.point))
                .is_some_and(|point| point.is_free() && point.accepts(ghost.kind));
            if !seat_open {
                return Err(BuildError::InvalidPlacement);
            }
        }
        let Some(builder) = ghost.builder else {
            return Err(BuildError::InvalidPlacement);
        };
        let kind = ghost.kind;
        let snap_target = ghost.snap_target;

        let spec = self.config.catalog.spec(kind);
        let cost = spec.cost;
        let construction_time = self.config.tuning.construction_time(spec.build_time);
        let start_health = self.config.tuning.construction_start_health;

        let Some(player) = self.players.get_mut(&builder) else {
            return Err(BuildError::InvalidPlacement);
        };
        let available = player.metal;
        if !player.deduct(cost) {
            info!(?object, cost, available, "not enough resources to build");
            self.destroy_object(object, RemovalReason::InsufficientResources, out_events);
            return Err(BuildError::InsufficientResources { cost, available });
        }
        let team = player.team;
        if cost > 0 {
            out_events.push(Event::MetalSpent {
                player: builder,
                amount: cost,
            });
        }

        self.rosters.register(team, object);
        if let Some(ghost) = self.objects.get_mut(object) {
            ghost.phase = ObjectPhase::Building;
            ghost.team = Some(team);
            ghost.health = start_health;
            ghost.construction = ConstructionTimer::new(construction_time);
            ghost.visible = true;
            ghost.snap_target = None;
        }

        info!(?object, kind = kind.name(), construction_time, "construction started");
        out_events.push(Event::BuildingStarted {
            object,
            kind,
            builder: Some(builder),
            construction_time,
        });
        self.sync_health(object, out_events);

        if let Some(target) = snap_target {
            if let Err(reason) =
                self.attach_object_to_object(object, target.parent, target.point, out_events)
            {
                warn!(?object, %reason, "snapped build point refused the new object");
            }
        }

        if self
            .objects
            .get(object)
            .is_some_and(|object| object.construction.is_finished())
        {
            self.finish_building(object, out_events);
        }
        Ok(())
    }

    /// Marks construction complete and spawns template attachments. Idempotent.
    pub(crate) fn finish_building(&mut self, object: ObjectId, out_events: &mut Vec<Event>) {
        let Some(building) = self.objects.get_mut(object).filter(|o| o.is_building()) else {
            return;
        };
        building.phase = ObjectPhase::Active;
        building.construction.complete();
        let kind = building.kind;

        info!(?object, kind = kind.name(), "construction finished");
        out_events.push(Event::ConstructionFinished { object });

        let attachments = self.config.catalog.spec(kind).spawn_on_finish.clone();
        for attachment in attachments {
            if self
                .spawn_entity_on_build_point(object, attachment, out_events)
                .is_none()
            {
                warn!(?object, attachment = attachment.name(), "no build point for template attachment");
            }
        }
    }

    /// Creates an active, fully healthy object registered on its team's roster.
    pub(crate) fn create_finished_object(
        &mut self,
        kind: ObjectKind,
        team: Option<TeamId>,
        builder: Option<PlayerId>,
        origin: Vec3,
        yaw: f32,
        out_events: &mut Vec<Event>,
    ) -> ObjectId {
        let spec = self.config.catalog.spec(kind);
        let margin = self.config.tuning.placement.build_margin;
        let build_bounds = spec.bounds.inflated(Vec3::new(margin, margin, 0.0));
        let points = layout(&spec.build_points);
        let max_health = spec.max_health;

        let object = self.objects.insert_with(|id| {
            let mut object =
                BuildableObject::ghost(id, kind, team, builder, build_bounds, max_health, points);
            object.phase = ObjectPhase::Building;
            object.origin = origin;
            object.yaw = yaw;
            object.health = max_health as f32;
            object.placement_ok = true;
            object.can_be_dismantled = false;
            object
        });
        if let Some(team) = team {
            self.rosters.register(team, object);
        }
        self.sync_health(object, out_events);
        self.finish_building(object, out_events);
        object
    }

    /// Spawns a map-placed object that skips placement and construction.
    pub(crate) fn spawn_map_object(
        &mut self,
        kind: ObjectKind,
        team: TeamId,
        builder: Option<PlayerId>,
        origin: Vec3,
        yaw: f32,
        out_events: &mut Vec<Event>,
    ) -> ObjectId {
        let object =
            self.create_finished_object(kind, Some(team), builder, origin, yaw, out_events);
        info!(?object, kind = kind.name(), team = team.get(), "map object spawned");
        object
    }

    /// Runs one fixed think for every object.
    pub(crate) fn think(&mut self, seconds: f32, out_events: &mut Vec<Event>) {
        for object in self.objects.ids() {
            let Some(current) = self.objects.get(object) else {
                continue;
            };
            if current.dying || current.disabled {
                continue;
            }
            let phase = current.phase;
            let draining = current.parent.is_some() && self.is_hostile_kind(current.kind);
            match phase {
                ObjectPhase::Placing => {}
                ObjectPhase::Building => self.building_think(object, seconds, out_events),
                ObjectPhase::Active if draining => self.sapper_think(object, seconds, out_events),
                ObjectPhase::Active => {}
            }
        }
    }

    fn building_think(&mut self, object: ObjectId, seconds: f32, out_events: &mut Vec<Event>) {
        let Some(building) = self.objects.get(object) else {
            return;
        };
        let start = self.config.tuning.construction_start_health;
        let total = building.construction.total();
        if total <= 0.0 {
            self.finish_building(object, out_events);
            return;
        }
        let amount = (building.max_health as f32 - start) / total * seconds;
        let _ = self.repair(object, amount, out_events);
    }

    /// Drains the host of a finished sapper.
    fn sapper_think(&mut self, sapper: ObjectId, seconds: f32, out_events: &mut Vec<Event>) {
        let per_second = self.config.tuning.sapper_damage_per_second;
        let Some(current) = self.objects.get(sapper) else {
            return;
        };
        let Some(host) = current.parent.map(|attachment| attachment.parent) else {
            return;
        };
        if per_second <= 0.0 {
            return;
        }

        let mut damage = DamageInfo::new(per_second * seconds, DamageType::CRUSH).with_inflictor(sapper);
        if let Some(owner) = current.builder {
            damage = damage.from_player(owner);
        }
        if let Some(team) = current.team {
            damage = damage.from_team(team);
        }
        let _ = self.take_damage(host, damage, out_events);
    }

    /// Edge-triggered change of the disabled flag.
    pub(crate) fn set_disabled(
        &mut self,
        object: ObjectId,
        disabled: bool,
        out_events: &mut Vec<Event>,
    ) {
        let Some(current) = self.objects.get_mut(object) else {
            return;
        };
        if current.disabled == disabled {
            return;
        }
        current.disabled = disabled;
        if disabled {
            debug!(?object, "object disabled");
            out_events.push(Event::ObjectDisabled { object });
        } else {
            debug!(?object, "object re-enabled");
            out_events.push(Event::ObjectReenabled { object });
        }
    }

    pub(crate) fn update_disabled_state(&mut self, object: ObjectId, out_events: &mut Vec<Event>) {
        let Some(has_sapper) = self.objects.get(object).map(|object| object.has_sapper) else {
            return;
        };
        self.set_disabled(object, has_sapper, out_events);
    }

    /// Destroys an object with an explosion, crediting `damage` for the kill.
    pub(crate) fn killed(&mut self, object: ObjectId, damage: DamageInfo, out_events: &mut Vec<Event>) {
        let Some(victim) = self.objects.get_mut(object) else {
            return;
        };
        if victim.dying {
            return;
        }
        victim.dying = true;
        let (kind, team, builder, has_sapper) =
            (victim.kind, victim.team, victim.builder, victim.has_sapper);
        let position = victim.world_center();
        let origin = victim.origin;

        let assister = if has_sapper && !damage.damage_type.contains(DamageType::CRUSH) {
            self.hostile_children(object)
                .into_iter()
                .find_map(|sapper| self.objects.get(sapper).and_then(|sapper| sapper.builder))
        } else {
            None
        };

        info!(
            ?object,
            kind = kind.name(),
            attacker = ?damage.attacker,
            assister = ?assister,
            "object destroyed"
        );
        out_events.push(Event::ObjectDestroyed {
            object,
            kind,
            team,
            builder,
            attacker: damage.attacker,
            assister,
        });

        let spec = self.config.catalog.spec(kind);
        if spec.explode_sound.is_some() || spec.explode_effect.is_some() {
            out_events.push(Event::EffectPlayed {
                object,
                sound: spec.explode_sound.clone(),
                particle: spec.explode_effect.clone(),
                position,
            });
        }
        let (metal, count) = (spec.metal_in_gibs, spec.gib_count);
        self.spawn_gibs(origin, metal, count, out_events);

        self.destroy_object(object, RemovalReason::Destroyed, out_events);
    }

    /// Takes down a committed object at its builder's request.
    ///
    /// Returns `false` and leaves the world untouched when `player` may not take it down.
    pub(crate) fn dismantle(
        &mut self,
        object: ObjectId,
        player: PlayerId,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let allowed = self.objects.get(object).is_some_and(|target| {
            target.can_be_dismantled
                && !target.dying
                && !target.is_placing()
                && target.builder == Some(player)
        });
        if !allowed {
            return false;
        }
        info!(?object, ?player, "object dismantled");
        self.destroy_object(object, RemovalReason::Dismantled, out_events);
        true
    }

    /// Destroys an object without crediting an attacker.
    pub(crate) fn detonate(&mut self, object: ObjectId, out_events: &mut Vec<Event>) {
        if !self.objects.contains(object) {
            warn!(?object, "detonate requested for an unknown object");
            return;
        }
        self.killed(object, DamageInfo::new(0.0, DamageType::empty()).with_inflictor(object), out_events);
    }

    /// Removes an object from the world together with everything built on it.
    pub(crate) fn destroy_object(
        &mut self,
        object: ObjectId,
        reason: RemovalReason,
        out_events: &mut Vec<Event>,
    ) {
        let parent_alive = self
            .objects
            .get(object)
            .and_then(|current| current.parent)
            .and_then(|attachment| self.objects.get(attachment.parent))
            .is_some_and(|parent| !parent.dying);
        if parent_alive {
            let _ = self.detach_object_from_object(object, out_events);
        }
        self.remove_subtree(object, reason, out_events);
    }

    fn remove_subtree(&mut self, object: ObjectId, reason: RemovalReason, out_events: &mut Vec<Event>) {
        let Some(mut removed) = self.objects.remove(object) else {
            return;
        };
        if let Some(team) = removed.team {
            self.rosters.unregister(team, object);
        }
        if let Some(attachment) = removed.parent.take() {
            if let Some(point) = self
                .objects
                .get_mut(attachment.parent)
                .and_then(|parent| parent.points.get_mut(attachment.point))
            {
                if point.occupant == Some(object) {
                    point.occupant = None;
                }
            }
        }
        out_events.push(Event::ObjectRemoved { object, reason });

        for point in &mut removed.points {
            if let Some(child) = point.occupant.take() {
                if let Some(child) = self.objects.get_mut(child) {
                    child.parent = None;
                }
                self.remove_subtree(child, RemovalReason::ParentDestroyed, out_events);
            }
        }
    }

    /// Emits `ObjectHealthChanged` when the replicated health moved.
    pub(crate) fn sync_health(&mut self, object: ObjectId, out_events: &mut Vec<Event>) {
        let Some(current) = self.objects.get_mut(object) else {
            return;
        };
        let health = current.replicated_health();
        if health != current.reported_health {
            current.reported_health = health;
            out_events.push(Event::ObjectHealthChanged { object, health });
        }
    }
}
