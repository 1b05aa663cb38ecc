//! Debris thrown by destroyed objects and the metal it refunds.

use std::collections::BTreeMap;

use glam::Vec3;
use outpost_core::{DebrisId, Event, PlayerId};
use rand::Rng;
use tracing::{debug, warn};

use crate::World;

/// Fragment lying in the world until a player collects it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Debris {
    pub(crate) metal: u32,
    pub(crate) origin: Vec3,
    pub(crate) velocity: Vec3,
}

/// Uncollected debris keyed by identifier.
#[derive(Clone, Debug, Default)]
pub(crate) struct DebrisField {
    pieces: BTreeMap<DebrisId, Debris>,
    next_id: u32,
}

impl DebrisField {
    fn insert(&mut self, debris: Debris) -> DebrisId {
        let id = DebrisId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let _ = self.pieces.insert(id, debris);
        id
    }

    fn take(&mut self, id: DebrisId) -> Option<Debris> {
        self.pieces.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (DebrisId, &Debris)> {
        self.pieces.iter().map(|(id, debris)| (*id, debris))
    }
}

/// Random launch velocity: mostly upward, with a speed inside `min..=max` capped at `cap`.
pub(crate) fn launch_velocity(rng: &mut impl Rng, min: f32, max: f32, cap: f32) -> Vec3 {
    let direction = Vec3::new(
        rng.gen_range(-0.5..=0.5),
        rng.gen_range(-0.5..=0.5),
        rng.gen_range(0.75..=1.25),
    )
    .normalize_or_zero();
    let (low, high) = (min.min(max), min.max(max));
    let velocity = direction * rng.gen_range(low..=high);
    if velocity.length() > cap {
        velocity.normalize_or_zero() * cap
    } else {
        velocity
    }
}

impl World {
    /// Throws `count` fragments sharing `metal` from `origin`.
    pub(crate) fn spawn_gibs(
        &mut self,
        origin: Vec3,
        metal: u32,
        count: u32,
        out_events: &mut Vec<Event>,
    ) {
        if count == 0 {
            return;
        }
        let per_gib = metal / count;
        let tuning = &self.config.tuning;
        let (min, max, cap) = (tuning.gib_min_speed, tuning.gib_max_speed, tuning.gib_speed_cap);

        for _ in 0..count {
            let velocity = launch_velocity(&mut self.rng, min, max, cap);
            let debris = self.debris.insert(Debris {
                metal: per_gib,
                origin,
                velocity,
            });
            out_events.push(Event::DebrisSpawned {
                debris,
                metal: per_gib,
                origin,
                velocity,
            });
        }
        debug!(count, per_gib, "debris spawned");
    }

    /// Moves the metal of a fragment into a player's wallet.
    pub(crate) fn collect_debris(
        &mut self,
        debris: DebrisId,
        player: PlayerId,
        out_events: &mut Vec<Event>,
    ) {
        let max_metal = self.config.tuning.max_metal;
        let Some(wallet) = self.players.get_mut(&player) else {
            warn!(?player, ?debris, "debris pickup by an unknown player");
            return;
        };
        let Some(piece) = self.debris.take(debris) else {
            warn!(?player, ?debris, "debris pickup of a missing fragment");
            return;
        };
        let credited = wallet.refund(piece.metal, max_metal);
        out_events.push(Event::DebrisCollected {
            debris,
            player,
            metal: credited,
        });
        if credited > 0 {
            out_events.push(Event::MetalRefunded {
                player,
                amount: credited,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn launch_velocity_points_upward_within_speed_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..256 {
            let velocity = launch_velocity(&mut rng, 100.0, 450.0, 800.0);
            let speed = velocity.length();
            assert!(velocity.z > 0.0, "fragments are thrown upward");
            assert!((100.0 - 1e-3..=450.0 + 1e-3).contains(&speed), "speed {speed} out of range");
        }
    }

    #[test]
    fn launch_speed_is_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let velocity = launch_velocity(&mut rng, 900.0, 1200.0, 800.0);
        assert!((velocity.length() - 800.0).abs() < 1e-2);
    }

    #[test]
    fn field_hands_out_unique_ids() {
        let mut field = DebrisField::default();
        let piece = Debris {
            metal: 10,
            origin: Vec3::ZERO,
            velocity: Vec3::Z,
        };
        let a = field.insert(piece);
        let b = field.insert(piece);
        assert_ne!(a, b);
        assert_eq!(field.take(a), Some(piece));
        assert_eq!(field.take(a), None);
        assert_eq!(field.iter().count(), 1);
    }
}
