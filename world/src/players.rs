//! Connected players: wallets, hulls and view direction.

use glam::{Vec2, Vec3};
use outpost_core::{Aabb, PlayerId, PlayerSnapshot, TeamId};

/// Half width of the standing player hull.
pub(crate) const HULL_HALF_WIDTH: f32 = 24.0;
/// Height of the standing player hull.
pub(crate) const HULL_HEIGHT: f32 = 82.0;
/// Height of the player's eyes above their feet.
pub(crate) const EYE_HEIGHT: f32 = 68.0;

/// Player standing in for the engine's player table.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Player {
    pub(crate) id: PlayerId,
    pub(crate) team: TeamId,
    pub(crate) metal: u32,
    pub(crate) origin: Vec3,
    pub(crate) yaw: f32,
}

impl Player {
    pub(crate) fn can_afford(&self, cost: u32) -> bool {
        self.metal >= cost
    }

    /// Removes `cost` metal, refusing partial payment.
    pub(crate) fn deduct(&mut self, cost: u32) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.metal -= cost;
        true
    }

    /// Adds metal up to `max_metal`, returning the amount actually credited.
    pub(crate) fn refund(&mut self, amount: u32, max_metal: u32) -> u32 {
        let credited = max_metal.saturating_sub(self.metal).min(amount);
        self.metal += credited;
        credited
    }

    /// Horizontal unit vector the player faces.
    pub(crate) fn forward(&self) -> Vec3 {
        let (sin, cos) = self.yaw.to_radians().sin_cos();
        Vec3::new(cos, sin, 0.0)
    }

    /// Centre of the player's hull.
    pub(crate) fn center(&self) -> Vec3 {
        self.origin + Vec3::new(0.0, 0.0, HULL_HEIGHT * 0.5)
    }

    pub(crate) fn eye(&self) -> Vec3 {
        self.origin + Vec3::new(0.0, 0.0, EYE_HEIGHT)
    }

    /// Reports whether `target` lies inside the player's horizontal view cone.
    pub(crate) fn in_view_cone(&self, target: Vec3, cosine: f32) -> bool {
        let to_target = (target - self.eye()).truncate();
        if to_target.length_squared() <= f32::EPSILON {
            return true;
        }
        to_target.normalize().dot(self.forward().truncate()) > cosine
    }

    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            team: self.team,
            metal: self.metal,
            origin: self.origin,
            yaw: self.yaw,
        }
    }
}

/// Standing hull of a player whose feet rest at `origin`.
pub(crate) fn hull_at(origin: Vec3) -> Aabb {
    Aabb::new(
        origin + Vec3::new(-HULL_HALF_WIDTH, -HULL_HALF_WIDTH, 0.0),
        origin + Vec3::new(HULL_HALF_WIDTH, HULL_HALF_WIDTH, HULL_HEIGHT),
    )
}

/// Horizontal radius of a hull centred on its origin.
pub(crate) fn radius_2d(bounds: &Aabb) -> f32 {
    Vec2::new(
        bounds.mins.x.abs().max(bounds.maxs.x.abs()),
        bounds.mins.y.abs().max(bounds.maxs.y.abs()),
    )
    .length()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(metal: u32, yaw: f32) -> Player {
        Player {
            id: PlayerId::new(1),
            team: TeamId::new(2),
            metal,
            origin: Vec3::ZERO,
            yaw,
        }
    }

    #[test]
    fn deduct_refuses_partial_payment() {
        let mut wallet = player(10, 0.0);
        assert!(!wallet.deduct(20));
        assert_eq!(wallet.metal, 10);
        assert!(wallet.deduct(10));
        assert_eq!(wallet.metal, 0);
    }

    #[test]
    fn refund_is_capped_by_wallet_size() {
        let mut wallet = player(190, 0.0);
        assert_eq!(wallet.refund(25, 200), 10);
        assert_eq!(wallet.metal, 200);
        assert_eq!(wallet.refund(5, 200), 0);
    }

    #[test]
    fn forward_follows_yaw_in_degrees() {
        let east = player(0, 0.0).forward();
        assert!((east - Vec3::X).length() < 1e-5);
        let north = player(0, 90.0).forward();
        assert!((north - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn view_cone_rejects_points_behind() {
        let builder = player(0, 0.0);
        assert!(builder.in_view_cone(Vec3::new(100.0, 10.0, 0.0), 0.5));
        assert!(!builder.in_view_cone(Vec3::new(-100.0, 0.0, 0.0), 0.5));
        assert!(!builder.in_view_cone(Vec3::new(10.0, 100.0, 0.0), 0.5));
    }

    #[test]
    fn hull_radius_uses_largest_extent() {
        let radius = radius_2d(&hull_at(Vec3::ZERO));
        assert!((radius - (2.0_f32 * 24.0 * 24.0).sqrt()).abs() < 1e-4);
    }
}
