//! Placement validation for ghosts that follow their builder.
//!
//! Free-standing objects are projected in front of the builder and checked
//! against world zones. Attachments snap to the nearest acceptable build point
//! the builder can see.

use glam::Vec3;
use outpost_core::{Aabb, Attachment, Event, ObjectId, ObjectKind, TeamId, Zone};
use tracing::{debug, warn};

use crate::{
    config::PlacementTuning,
    objects::BuildableObject,
    players::{hull_at, radius_2d, Player, HULL_HALF_WIDTH},
    World,
};

/// Result of projecting a free-standing ghost in front of its builder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Estimate {
    pub(crate) origin: Vec3,
    pub(crate) valid: bool,
}

/// Build point an attachment ghost would be built on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SnapTarget {
    pub(crate) attachment: Attachment,
    pub(crate) position: Vec3,
    pub(crate) yaw: f32,
    pub(crate) distance: f32,
}

/// Reports whether a no-build zone restricts `kind` for `team`.
pub(crate) fn zone_prevents_build(zone: &Zone, kind: ObjectKind, team: Option<TeamId>) -> bool {
    match zone {
        Zone::NoBuild {
            team: restricted,
            exempt,
            ..
        } => restricted.map_or(true, |restricted| Some(restricted) == team) && !exempt.contains(&kind),
        _ => false,
    }
}

fn point_in_no_build(zones: &[Zone], point: Vec3, kind: ObjectKind, team: Option<TeamId>) -> bool {
    zones.iter().any(|zone| match zone {
        Zone::NoBuild { bounds, .. } => bounds.contains(point) && zone_prevents_build(zone, kind, team),
        _ => false,
    })
}

fn point_in_respawn_room(zones: &[Zone], point: Vec3) -> bool {
    zones.iter().any(|zone| match zone {
        Zone::RespawnRoom { bounds } => bounds.contains(point),
        _ => false,
    })
}

fn crosses_respawn_visualizer(zones: &[Zone], start: Vec3, end: Vec3) -> bool {
    zones.iter().any(|zone| match zone {
        Zone::RespawnVisualizer { bounds } => bounds.segment_entry(start, end).is_some(),
        _ => false,
    })
}

fn sight_blocked(zones: &[Zone], eye: Vec3, target: Vec3) -> bool {
    zones.iter().any(|zone| match zone {
        Zone::Solid { bounds } => bounds
            .segment_entry(eye, target)
            .is_some_and(|fraction| fraction < 1.0),
        _ => false,
    })
}

fn hull_is_clear(zones: &[Zone], hull: &Aabb) -> bool {
    !zones.iter().any(|zone| match zone {
        Zone::Solid { bounds } => bounds.intersects(hull),
        _ => false,
    })
}

/// Ring of eight probe offsets around a building, clockwise from the back left.
const RING: [(f32, f32); 8] = [
    (-1.0, -1.0),
    (0.0, -1.0),
    (1.0, -1.0),
    (1.0, 0.0),
    (1.0, 1.0),
    (0.0, 1.0),
    (-1.0, 1.0),
    (-1.0, 0.0),
];

/// Reports whether building at `origin` leaves every open neighbour reachable.
///
/// Eight player hulls are probed around the object. The placement blocks
/// movement when open probes split into more than one connected arc of the
/// ring, or when no probe is open at all.
pub(crate) fn leaves_passage(zones: &[Zone], origin: Vec3, build_bounds: &Aabb) -> bool {
    let half_build = (build_bounds.maxs - build_bounds.mins) * 0.5;
    let clear: Vec<bool> = RING
        .iter()
        .map(|(x, y)| {
            let probe = origin
                + Vec3::new(
                    x * (half_build.x + HULL_HALF_WIDTH),
                    y * (half_build.y + HULL_HALF_WIDTH),
                    0.0,
                );
            hull_is_clear(zones, &hull_at(probe))
        })
        .collect();

    let Some(first) = clear.iter().position(|open| *open) else {
        return false;
    };

    let mut visited = [false; 8];
    let mut pending = vec![first];
    while let Some(node) = pending.pop() {
        if visited[node] || !clear[node] {
            continue;
        }
        visited[node] = true;
        pending.push((node + 7) % 8);
        pending.push((node + 1) % 8);
    }

    clear
        .iter()
        .zip(visited.iter())
        .all(|(open, reached)| !open || *reached)
}

/// Projects a free-standing ghost in front of `builder` and validates the spot.
pub(crate) fn estimate_build_position(
    zones: &[Zone],
    tuning: &PlacementTuning,
    builder: &Player,
    kind: ObjectKind,
    build_bounds: &Aabb,
) -> Estimate {
    let forward = builder.forward();
    let distance = radius_2d(build_bounds) + radius_2d(&hull_at(Vec3::ZERO)) + tuning.safety_buffer;
    let center = builder.center();
    let candidate = center + forward * distance;
    let origin = Vec3::new(candidate.x, candidate.y, builder.origin.z);

    let valid = !point_in_no_build(zones, candidate, kind, Some(builder.team))
        && !point_in_respawn_room(zones, candidate)
        && !crosses_respawn_visualizer(
            zones,
            center,
            candidate + forward * (distance + tuning.far_edge_extension),
        )
        && (!tuning.test_player_block || leaves_passage(zones, origin, build_bounds));

    Estimate { origin, valid }
}

impl World {
    /// Nearest free build point `ghost` may snap to, as seen by `builder`.
    pub(crate) fn find_snap_target(&self, ghost: &BuildableObject, builder: &Player) -> Option<SnapTarget> {
        let tuning = &self.config.tuning.placement;
        let hostile = self.is_hostile_kind(ghost.kind);
        let candidates: Vec<ObjectId> = if hostile {
            self.rosters.enemies_of(builder.team).collect()
        } else {
            self.rosters.members(builder.team).collect()
        };
        let eye = builder.eye();

        let mut nearest = tuning.initial_snap_distance;
        let mut best = None;
        for parent_id in candidates {
            let Some(parent) = self.objects.get(parent_id) else {
                continue;
            };
            if parent_id == ghost.id || parent.is_placing() || parent.dying {
                continue;
            }
            for (index, point) in parent.points.iter().enumerate() {
                if !point.accepts(ghost.kind) || !point.is_free() {
                    continue;
                }
                let position = point.world_position(parent.origin, parent.yaw);
                if !builder.in_view_cone(position, tuning.view_cone_cosine) {
                    continue;
                }
                if sight_blocked(&self.zones, eye, position) {
                    continue;
                }
                let distance = (position - builder.origin).length();
                if distance < nearest.min(point.max_snap_distance) {
                    nearest = distance;
                    best = Some(SnapTarget {
                        attachment: Attachment {
                            parent: parent_id,
                            point: index,
                        },
                        position,
                        yaw: parent.yaw,
                        distance,
                    });
                }
            }
        }
        best
    }

    /// Re-evaluates where a ghost stands and whether it may be built there.
    pub(crate) fn update_placement(&mut self, object: ObjectId, out_events: &mut Vec<Event>) {
        let Some(ghost) = self.objects.get(object) else {
            warn!(?object, "placement update for an unknown object");
            return;
        };
        if !ghost.is_placing() {
            return;
        }
        let builder = ghost.builder.and_then(|id| self.players.get(&id)).copied();
        let attachment = self.config.catalog.spec(ghost.kind).attachment;

        let (valid, origin, yaw, snap, visible) = match builder {
            None => (false, ghost.origin, ghost.yaw, None, ghost.visible),
            Some(builder) if attachment => match self.find_snap_target(ghost, &builder) {
                Some(target) => (true, target.position, target.yaw, Some(target), true),
                None => (false, builder.center(), ghost.yaw, None, false),
            },
            Some(builder) => {
                let estimate = estimate_build_position(
                    &self.zones,
                    &self.config.tuning.placement,
                    &builder,
                    ghost.kind,
                    &ghost.build_bounds,
                );
                let yaw = builder.yaw + 90.0 * f32::from(ghost.desired_rotations);
                (estimate.valid, estimate.origin, yaw, None, true)
            }
        };

        let Some(ghost) = self.objects.get_mut(object) else {
            return;
        };
        ghost.origin = origin;
        ghost.yaw = yaw;
        ghost.visible = visible;
        ghost.snap_target = snap.map(|target| target.attachment);
        if let Some(target) = snap {
            debug!(?object, parent = ?target.attachment.parent, point = target.attachment.point, distance = target.distance, "ghost snapped");
        }
        if ghost.placement_ok != valid {
            ghost.placement_ok = valid;
            out_events.push(Event::PlacementValidityChanged { object, valid });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outpost_core::PlayerId;

    fn builder() -> Player {
        Player {
            id: PlayerId::new(1),
            team: TeamId::new(1),
            metal: 200,
            origin: Vec3::ZERO,
            yaw: 0.0,
        }
    }

    fn sentry_bounds() -> Aabb {
        Aabb::new(Vec3::new(-24.0, -24.0, 0.0), Vec3::new(24.0, 24.0, 66.0))
    }

    fn estimate(zones: &[Zone]) -> Estimate {
        estimate_build_position(
            zones,
            &PlacementTuning::default(),
            &builder(),
            ObjectKind::SentryGun,
            &sentry_bounds(),
        )
    }

    #[test]
    fn open_ground_is_buildable_in_front_of_builder() {
        let result = estimate(&[]);
        assert!(result.valid);
        let expected = radius_2d(&sentry_bounds()) + radius_2d(&hull_at(Vec3::ZERO)) + 4.0;
        assert!((result.origin.x - expected).abs() < 1e-3);
        assert_eq!(result.origin.y, 0.0);
        assert_eq!(result.origin.z, 0.0);
    }

    #[test]
    fn no_build_zone_respects_team_and_exemptions() {
        let bounds = Aabb::new(Vec3::new(0.0, -200.0, -10.0), Vec3::new(400.0, 200.0, 200.0));
        let everyone = Zone::NoBuild {
            bounds,
            team: None,
            exempt: Vec::new(),
        };
        assert!(!estimate(&[everyone]).valid);

        let other_team = Zone::NoBuild {
            bounds,
            team: Some(TeamId::new(2)),
            exempt: Vec::new(),
        };
        assert!(estimate(&[other_team]).valid, "zone restricts a different team");

        let exempt = Zone::NoBuild {
            bounds,
            team: None,
            exempt: vec![ObjectKind::SentryGun],
        };
        assert!(estimate(&[exempt]).valid, "sentries are exempt");
    }

    #[test]
    fn respawn_room_and_visualizer_block_placement() {
        let room = Zone::RespawnRoom {
            bounds: Aabb::new(Vec3::new(0.0, -200.0, -10.0), Vec3::new(400.0, 200.0, 200.0)),
        };
        assert!(!estimate(&[room]).valid);

        let expected = radius_2d(&sentry_bounds()) + radius_2d(&hull_at(Vec3::ZERO)) + 4.0;
        let wall_x = expected + 6.0;
        let visualizer = Zone::RespawnVisualizer {
            bounds: Aabb::new(Vec3::new(wall_x, -200.0, -10.0), Vec3::new(wall_x + 1.0, 200.0, 200.0)),
        };
        assert!(!estimate(&[visualizer]).valid, "far edge crosses the visualizer");

        let distant = Zone::RespawnVisualizer {
            bounds: Aabb::new(Vec3::new(1000.0, -200.0, -10.0), Vec3::new(1001.0, 200.0, 200.0)),
        };
        assert!(estimate(&[distant]).valid);
    }

    #[test]
    fn corridor_placement_that_splits_the_ring_blocks_players() {
        let origin = Vec3::new(200.0, 0.0, 0.0);
        let bounds = sentry_bounds();
        assert!(leaves_passage(&[], origin, &bounds), "open field keeps every probe connected");

        // Walls north and south of the spot leave only the east and west probes open.
        let walls = [
            Zone::Solid {
                bounds: Aabb::new(Vec3::new(0.0, 40.0, 0.0), Vec3::new(400.0, 200.0, 200.0)),
            },
            Zone::Solid {
                bounds: Aabb::new(Vec3::new(0.0, -200.0, 0.0), Vec3::new(400.0, -40.0, 200.0)),
            },
        ];
        assert!(!leaves_passage(&walls, origin, &bounds));

        let boxed_in = [Zone::Solid {
            bounds: Aabb::new(Vec3::new(0.0, -300.0, 0.0), Vec3::new(400.0, 300.0, 200.0)),
        }];
        assert!(!leaves_passage(&boxed_in, origin, &bounds), "no open probe at all");
    }

    #[test]
    fn zone_filter_ignores_other_zone_types() {
        let room = Zone::RespawnRoom {
            bounds: Aabb::new(Vec3::ZERO, Vec3::ONE),
        };
        assert!(!zone_prevents_build(&room, ObjectKind::Dispenser, None));
    }
}
