//! Damage resolution, including redirection onto attached objects.

use outpost_core::{DamageInfo, DamageType, Event, ObjectId, TeamId};
use tracing::{debug, warn};

use crate::World;

impl World {
    fn attacker_team(&self, damage: &DamageInfo) -> Option<TeamId> {
        damage
            .attacker
            .and_then(|attacker| self.players.get(&attacker))
            .map(|player| player.team)
            .or(damage.attacker_team)
    }

    /// Applies `damage` to `object` and returns the damage it absorbed.
    pub(crate) fn take_damage(
        &mut self,
        object: ObjectId,
        damage: DamageInfo,
        out_events: &mut Vec<Event>,
    ) -> f32 {
        self.apply_damage(object, damage, false, out_events)
    }

    fn apply_damage(
        &mut self,
        object: ObjectId,
        damage: DamageInfo,
        ignore_teams: bool,
        out_events: &mut Vec<Event>,
    ) -> f32 {
        let Some(target) = self.objects.get(object) else {
            return 0.0;
        };
        if target.dying || target.is_placing() || damage.amount <= 0.0 {
            return 0.0;
        }

        if !ignore_teams && target.team.is_some() && self.attacker_team(&damage) == target.team {
            return self.redirect_friendly_fire(object, damage, out_events);
        }

        let child_factor = self.config.tuning.child_damage_factor;
        let damage_factor = self.config.tuning.damage_factor;
        let incoming = damage.amount;
        let mut amount = incoming;
        if target.parent.is_some() && !self.is_hostile_kind(target.kind) {
            amount *= child_factor;
        }
        if damage_factor != 0.0 {
            amount *= damage_factor;
        }
        if amount <= 0.0 {
            return 0.0;
        }
        let scale = amount / incoming;

        let mut absorbed = 0.0;
        if self.first_friendly_child(object).is_some() && target.health - amount < 1.0 {
            let soaked = (target.health - 1.0).max(0.0);
            let excess = amount - soaked;
            absorbed += self.reduce_health(object, soaked, damage, out_events);

            let (handled, leftover) =
                self.pass_damage_onto_children(object, damage, excess, out_events);
            if handled {
                return incoming;
            }
            absorbed += excess - leftover;
            amount = leftover;
        }

        if amount > 0.0 {
            absorbed += self.reduce_health(object, amount, damage, out_events);
        }

        if self
            .objects
            .get(object)
            .is_some_and(|target| target.health <= 0.0)
        {
            self.killed(object, damage, out_events);
        }
        absorbed / scale
    }

    /// Teammates cannot hurt an object; their damage lands on whatever is attached to it.
    fn redirect_friendly_fire(
        &mut self,
        object: ObjectId,
        damage: DamageInfo,
        out_events: &mut Vec<Event>,
    ) -> f32 {
        let hostile = self.hostile_children(object);
        if !hostile.is_empty() {
            return hostile
                .into_iter()
                .map(|child| self.apply_damage(child, damage, false, out_events))
                .sum();
        }
        if self.first_friendly_child(object).is_some() {
            debug!(?object, amount = damage.amount, "friendly fire redirected onto attachments");
            let (_, leftover) =
                self.pass_damage_onto_children(object, damage, damage.amount, out_events);
            return damage.amount - leftover;
        }
        0.0
    }

    /// Forwards `amount` onto friendly children, doubled and freed of blast damage.
    ///
    /// Moves on to the next child only while children die. Returns whether a
    /// surviving child took the hit, and otherwise the damage left over in the
    /// caller's units.
    pub(crate) fn pass_damage_onto_children(
        &mut self,
        object: ObjectId,
        damage: DamageInfo,
        amount: f32,
        out_events: &mut Vec<Event>,
    ) -> (bool, f32) {
        let child_factor = self.config.tuning.child_damage_factor;
        let scale = if child_factor != 0.0 {
            2.0 / child_factor
        } else {
            2.0
        };
        let mut remaining = amount * scale;
        let mut forwarded = damage.with_amount(remaining);
        forwarded.damage_type = damage.damage_type & !DamageType::BLAST;

        while remaining > 0.0 {
            let Some(child) = self.first_friendly_child(object) else {
                break;
            };
            let taken = self.apply_damage(child, forwarded.with_amount(remaining), true, out_events);
            let child_survived = self
                .objects
                .get(child)
                .is_some_and(|child| !child.dying);
            if child_survived {
                return (true, 0.0);
            }
            remaining -= taken;
        }
        (false, remaining.max(0.0) / scale)
    }

    /// Lowers health by up to `amount`, returning the health actually removed.
    fn reduce_health(
        &mut self,
        object: ObjectId,
        amount: f32,
        damage: DamageInfo,
        out_events: &mut Vec<Event>,
    ) -> f32 {
        let Some(target) = self.objects.get_mut(object) else {
            return 0.0;
        };
        let before = target.health;
        target.health -= amount;
        let removed = before - target.health.max(0.0);
        if amount > 0.0 {
            out_events.push(Event::ObjectDamaged {
                object,
                amount,
                attacker: damage.attacker,
            });
        }
        self.sync_health(object, out_events);
        removed
    }

    /// Overrides the maximum health and fully heals the object.
    pub(crate) fn set_object_health(
        &mut self,
        object: ObjectId,
        max_health: u32,
        out_events: &mut Vec<Event>,
    ) {
        let Some(target) = self.objects.get_mut(object).filter(|target| !target.dying) else {
            warn!(?object, "health override for an unknown object");
            return;
        };
        target.max_health = max_health;
        target.health = max_health as f32;
        self.sync_health(object, out_events);
        if max_health == 0 {
            self.killed(object, DamageInfo::new(0.0, DamageType::empty()), out_events);
        }
    }

    pub(crate) fn add_object_health(&mut self, object: ObjectId, amount: u32, out_events: &mut Vec<Event>) {
        let Some(target) = self
            .objects
            .get_mut(object)
            .filter(|target| !target.dying && !target.is_placing())
        else {
            return;
        };
        let before = target.health;
        target.health = (target.health + amount as f32).min(target.max_health as f32);
        let restored = target.health - before;
        if restored > 0.0 {
            out_events.push(Event::ObjectRepaired {
                object,
                amount: restored,
            });
        }
        self.sync_health(object, out_events);
    }

    pub(crate) fn remove_object_health(
        &mut self,
        object: ObjectId,
        amount: u32,
        out_events: &mut Vec<Event>,
    ) {
        let Some(target) = self.objects.get(object) else {
            return;
        };
        if target.dying || target.is_placing() {
            return;
        }
        let damage = DamageInfo::new(amount as f32, DamageType::empty());
        let _ = self.reduce_health(object, amount as f32, damage, out_events);
        if self
            .objects
            .get(object)
            .is_some_and(|target| target.health <= 0.0)
        {
            self.killed(object, damage, out_events);
        }
    }
}
