//! Object storage: a generational arena plus per-team rosters.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use outpost_core::{Aabb, Attachment, ObjectId, ObjectKind, ObjectPhase, PlayerId, TeamId};

use crate::{build_points::BuildPoint, construction::ConstructionTimer, repair::RepairLedger};

/// Authoritative state of a single buildable object.
#[derive(Clone, Debug)]
pub(crate) struct BuildableObject {
    pub(crate) id: ObjectId,
    pub(crate) kind: ObjectKind,
    pub(crate) team: Option<TeamId>,
    pub(crate) builder: Option<PlayerId>,
    pub(crate) origin: Vec3,
    pub(crate) yaw: f32,
    pub(crate) phase: ObjectPhase,
    pub(crate) health: f32,
    pub(crate) max_health: u32,
    /// Integer health last announced through `ObjectHealthChanged`.
    pub(crate) reported_health: u32,
    pub(crate) construction: ConstructionTimer,
    pub(crate) disabled: bool,
    pub(crate) dying: bool,
    pub(crate) placement_ok: bool,
    pub(crate) visible: bool,
    pub(crate) desired_rotations: u8,
    /// Bounds relative to the origin, inflated by the build margin.
    pub(crate) build_bounds: Aabb,
    /// Build point occupied by this object. Written only by the attach mutators.
    pub(crate) parent: Option<Attachment>,
    /// Build point an attachment ghost currently snaps to.
    pub(crate) snap_target: Option<Attachment>,
    pub(crate) points: Vec<BuildPoint>,
    pub(crate) repairers: RepairLedger,
    pub(crate) has_sapper: bool,
    /// Cleared for map-placed objects and the attachments they spawn.
    pub(crate) can_be_dismantled: bool,
}

impl BuildableObject {
    /// Creates a fresh placement ghost.
    pub(crate) fn ghost(
        id: ObjectId,
        kind: ObjectKind,
        team: Option<TeamId>,
        builder: Option<PlayerId>,
        build_bounds: Aabb,
        max_health: u32,
        points: Vec<BuildPoint>,
    ) -> Self {
        Self {
            id,
            kind,
            team,
            builder,
            origin: Vec3::ZERO,
            yaw: 0.0,
            phase: ObjectPhase::Placing,
            health: 0.0,
            max_health,
            reported_health: 0,
            construction: ConstructionTimer::idle(),
            disabled: false,
            dying: false,
            placement_ok: false,
            visible: true,
            desired_rotations: 0,
            build_bounds,
            parent: None,
            snap_target: None,
            points,
            repairers: RepairLedger::default(),
            has_sapper: false,
            can_be_dismantled: true,
        }
    }

    pub(crate) fn is_placing(&self) -> bool {
        self.phase == ObjectPhase::Placing
    }

    pub(crate) fn is_building(&self) -> bool {
        self.phase == ObjectPhase::Building
    }

    /// Objects occupying this object's build points, in point order.
    pub(crate) fn children(&self) -> Vec<ObjectId> {
        self.points.iter().filter_map(|point| point.occupant).collect()
    }

    /// Replicated health, rounded up from the precise value.
    pub(crate) fn replicated_health(&self) -> u32 {
        self.health.max(0.0).ceil() as u32
    }

    /// Centre of the object's bounds in world space.
    pub(crate) fn world_center(&self) -> Vec3 {
        self.build_bounds.translated(self.origin).center()
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    object: Option<BuildableObject>,
}

/// Generational arena owning every object.
#[derive(Clone, Debug, Default)]
pub(crate) struct ObjectArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ObjectArena {
    /// Stores the object produced by `create`, handing it the allocated identifier.
    pub(crate) fn insert_with(
        &mut self,
        create: impl FnOnce(ObjectId) -> BuildableObject,
    ) -> ObjectId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            let id = ObjectId::new(index, slot.generation);
            slot.object = Some(create(id));
            return id;
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        let id = ObjectId::new(index, 0);
        self.slots.push(Slot {
            generation: 0,
            object: Some(create(id)),
        });
        id
    }

    pub(crate) fn get(&self, id: ObjectId) -> Option<&BuildableObject> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.object.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut BuildableObject> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.object.as_mut())
    }

    pub(crate) fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<BuildableObject> {
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())?;
        let object = slot.object.take()?;
        self.free.push(id.index());
        Some(object)
    }

    /// Live objects in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &BuildableObject> {
        self.slots.iter().filter_map(|slot| slot.object.as_ref())
    }

    /// Identifiers of every live object, captured so callers may mutate while walking them.
    pub(crate) fn ids(&self) -> Vec<ObjectId> {
        self.iter().map(|object| object.id).collect()
    }
}

/// Committed objects grouped by owning team.
#[derive(Clone, Debug, Default)]
pub(crate) struct TeamRoster {
    teams: BTreeMap<TeamId, BTreeSet<ObjectId>>,
}

impl TeamRoster {
    pub(crate) fn register(&mut self, team: TeamId, object: ObjectId) {
        let _ = self.teams.entry(team).or_default().insert(object);
    }

    pub(crate) fn unregister(&mut self, team: TeamId, object: ObjectId) {
        if let Some(members) = self.teams.get_mut(&team) {
            let _ = members.remove(&object);
            if members.is_empty() {
                let _ = self.teams.remove(&team);
            }
        }
    }

    pub(crate) fn members(&self, team: TeamId) -> impl Iterator<Item = ObjectId> + '_ {
        self.teams.get(&team).into_iter().flatten().copied()
    }

    /// Objects of every team other than `team`.
    pub(crate) fn enemies_of(&self, team: TeamId) -> impl Iterator<Item = ObjectId> + '_ {
        self.teams
            .iter()
            .filter(move |(other, _)| **other != team)
            .flat_map(|(_, members)| members.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: ObjectId) -> BuildableObject {
        BuildableObject::ghost(
            id,
            ObjectKind::Dispenser,
            Some(TeamId::new(1)),
            None,
            Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            150,
            Vec::new(),
        )
    }

    #[test]
    fn stale_handles_do_not_alias_reused_slots() {
        let mut arena = ObjectArena::default();
        let first = arena.insert_with(object);
        assert!(arena.remove(first).is_some());

        let second = arena.insert_with(object);
        assert_eq!(first.index(), second.index(), "slot is reused");
        assert_ne!(first, second);
        assert!(arena.get(first).is_none(), "stale handle resolves to nothing");
        assert!(arena.get(second).is_some());
        assert!(arena.remove(first).is_none());
    }

    #[test]
    fn ids_follow_slot_order() {
        let mut arena = ObjectArena::default();
        let a = arena.insert_with(object);
        let b = arena.insert_with(object);
        let c = arena.insert_with(object);
        let _ = arena.remove(b);
        assert_eq!(arena.ids(), vec![a, c]);
    }

    #[test]
    fn roster_separates_teams() {
        let mut roster = TeamRoster::default();
        let red = TeamId::new(1);
        let blue = TeamId::new(2);
        roster.register(red, ObjectId::new(0, 0));
        roster.register(blue, ObjectId::new(1, 0));
        roster.register(blue, ObjectId::new(2, 0));

        assert_eq!(roster.members(red).collect::<Vec<_>>(), vec![ObjectId::new(0, 0)]);
        assert_eq!(roster.enemies_of(red).count(), 2);

        roster.unregister(blue, ObjectId::new(1, 0));
        roster.unregister(blue, ObjectId::new(2, 0));
        assert_eq!(roster.members(blue).count(), 0);
        assert_eq!(roster.enemies_of(red).count(), 0);
    }

    #[test]
    fn replicated_health_rounds_up() {
        let mut ghost = object(ObjectId::new(0, 0));
        ghost.health = 0.1;
        assert_eq!(ghost.replicated_health(), 1);
        ghost.health = 149.2;
        assert_eq!(ghost.replicated_health(), 150);
        ghost.health = -3.0;
        assert_eq!(ghost.replicated_health(), 0);
    }
}
