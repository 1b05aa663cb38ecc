//! Repair, construction assistance and wrench strikes.
//!
//! Each object owns a [`RepairLedger`] of players that recently helped it.
//! Every live entry doubles the amount of each repair.

use std::{collections::BTreeMap, time::Duration};

use outpost_core::{DamageInfo, DamageType, Event, ObjectId, PlayerId};
use tracing::{debug, warn};

use crate::World;

/// Expiry timestamps of the players currently helping with an object.
#[derive(Clone, Debug, Default)]
pub(crate) struct RepairLedger {
    expiries: BTreeMap<PlayerId, Duration>,
}

impl RepairLedger {
    /// Inserts or refreshes `repairer`, keeping it live until `now + window`.
    pub(crate) fn record(&mut self, repairer: PlayerId, now: Duration, window: Duration) {
        let _ = self.expiries.insert(repairer, now + window);
    }

    /// Purges expired repairers and returns `2^live`.
    pub(crate) fn multiplier(&mut self, now: Duration) -> f32 {
        self.expiries.retain(|_, expiry| *expiry >= now);
        multiplier_for(self.expiries.len())
    }

    /// Multiplier that [`RepairLedger::multiplier`] would return, without purging.
    pub(crate) fn peek_multiplier(&self, now: Duration) -> f32 {
        multiplier_for(self.expiries.values().filter(|expiry| **expiry >= now).count())
    }
}

impl World {
    /// Repairs or helps construct `object` by `amount`, scaled by its repair multiplier.
    ///
    /// Returns `true` once the object is finished and at full health.
    pub(crate) fn repair(&mut self, object: ObjectId, amount: f32, out_events: &mut Vec<Event>) -> bool {
        let now = self.clock;
        let start_health = self.config.tuning.construction_start_health;
        let Some(target) = self.objects.get_mut(object) else {
            return false;
        };
        if target.dying || target.is_placing() || target.disabled {
            return false;
        }
        let amount = amount * target.repairers.multiplier(now);
        if amount <= 0.0 {
            return false;
        }

        let max_health = target.max_health as f32;
        let before = target.health;
        let finished = if target.is_building() {
            let total = target.construction.total();
            let rate = if total > 0.0 {
                (max_health - start_health) / total
            } else {
                0.0
            };
            let done = if rate > 0.0 {
                target.construction.advance(amount / rate)
            } else {
                target.construction.complete();
                true
            };
            target.health = (target.health + amount).min(max_health);
            Some(done)
        } else {
            if target.health >= max_health {
                return true;
            }
            target.health = (target.health + amount).min(max_health);
            None
        };
        let restored = target.health - before;
        let full = target.health >= max_health;

        if restored > 0.0 {
            out_events.push(Event::ObjectRepaired {
                object,
                amount: restored,
            });
        }
        self.sync_health(object, out_events);

        match finished {
            Some(true) => {
                self.finish_building(object, out_events);
                true
            }
            Some(false) => false,
            None => full,
        }
    }

    /// Refreshes `repairer` in the ledger of `object`.
    pub(crate) fn record_repair_hit(&mut self, object: ObjectId, repairer: PlayerId) {
        let now = self.clock;
        let window = Duration::from_secs_f32(self.config.tuning.repair_window.max(0.0));
        let Some(target) = self
            .objects
            .get_mut(object)
            .filter(|target| !target.dying && !target.is_placing())
        else {
            warn!(?object, ?repairer, "repair hit on an object that cannot be repaired");
            return;
        };
        target.repairers.record(repairer, now, window);
        debug!(?object, ?repairer, "repair hit recorded");
    }

    /// Resolves a wrench strike by `player` on a friendly object.
    ///
    /// Sapped objects have their hostile attachments beaten off, objects under
    /// construction gain a repairer and finished objects get a paid repair.
    pub(crate) fn wrench_hit(
        &mut self,
        object: ObjectId,
        player: PlayerId,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let Some(wielder) = self.players.get(&player).copied() else {
            warn!(?player, "wrench hit from an unknown player");
            return false;
        };
        let Some(target) = self.objects.get(object) else {
            warn!(?object, "wrench hit on an unknown object");
            return false;
        };
        if target.dying || target.is_placing() {
            return false;
        }
        if target.team != Some(wielder.team) {
            debug!(?object, ?player, "wrench hit on an enemy object ignored");
            return false;
        }

        if target.has_sapper {
            let damage = DamageInfo::new(self.config.tuning.wrench_sapper_damage, DamageType::CLUB)
                .from_player(player)
                .from_team(wielder.team);
            let mut did_work = false;
            for sapper in self.hostile_children(object) {
                did_work |= self.take_damage(sapper, damage, out_events) > 0.0;
            }
            return did_work;
        }

        if target.is_building() {
            self.record_repair_hit(object, player);
            return true;
        }

        self.paid_repair(object, player, out_events)
    }

    /// Heals a finished object in exchange for the wielder's metal.
    fn paid_repair(&mut self, object: ObjectId, player: PlayerId, out_events: &mut Vec<Event>) -> bool {
        let max_heal = self.config.tuning.wrench_max_heal;
        let metal_per_health = self.config.tuning.wrench_metal_per_health;
        let health_per_metal = self.config.tuning.wrench_health_per_metal;

        let Some(target) = self.objects.get(object) else {
            return false;
        };
        let missing = target.max_health.saturating_sub(target.replicated_health());
        let heal = max_heal.min(missing);
        let cost = (heal as f32 * metal_per_health).ceil() as u32;
        if cost == 0 {
            return false;
        }

        let Some(wallet) = self.players.get_mut(&player) else {
            return false;
        };
        let cost = cost.min(wallet.metal);
        if cost == 0 || !wallet.deduct(cost) {
            return false;
        }
        out_events.push(Event::MetalSpent {
            player,
            amount: cost,
        });

        let Some(target) = self.objects.get_mut(object) else {
            return false;
        };
        let before = target.health;
        target.health = (target.health + (cost * health_per_metal) as f32).min(target.max_health as f32);
        let restored = target.health - before;
        if restored > 0.0 {
            out_events.push(Event::ObjectRepaired {
                object,
                amount: restored,
            });
        }
        self.sync_health(object, out_events);
        true
    }
}

fn multiplier_for(live: usize) -> f32 {
    2.0_f32.powi(i32::try_from(live).unwrap_or(i32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(1);

    #[test]
    fn single_repairer_expires_after_window() {
        let mut ledger = RepairLedger::default();
        ledger.record(PlayerId::new(1), Duration::ZERO, WINDOW);
        assert_eq!(ledger.multiplier(Duration::from_millis(500)), 2.0);
        assert_eq!(ledger.multiplier(Duration::from_millis(1500)), 1.0);
    }

    #[test]
    fn repeated_hits_refresh_instead_of_stacking() {
        let mut ledger = RepairLedger::default();
        let repairer = PlayerId::new(1);
        ledger.record(repairer, Duration::ZERO, WINDOW);
        ledger.record(repairer, Duration::from_millis(800), WINDOW);
        assert_eq!(ledger.multiplier(Duration::from_millis(900)), 2.0);
        assert_eq!(ledger.multiplier(Duration::from_millis(1700)), 2.0);
        assert_eq!(ledger.multiplier(Duration::from_millis(1900)), 1.0);
    }

    #[test]
    fn every_live_repairer_doubles_the_rate() {
        let mut ledger = RepairLedger::default();
        for id in 1..=3 {
            ledger.record(PlayerId::new(id), Duration::ZERO, WINDOW);
        }
        assert_eq!(ledger.peek_multiplier(Duration::from_millis(100)), 8.0);
        assert_eq!(ledger.multiplier(Duration::from_millis(100)), 8.0);
    }
}
