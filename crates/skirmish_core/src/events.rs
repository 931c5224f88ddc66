//! Gameplay events emitted during a tick.
//!
//! These events can be used by the game layer to trigger effects,
//! sounds, announcements, statistics, etc. The core never depends on
//! anyone consuming them.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Tick};
use crate::field_effect::FieldCategory;
use crate::math::{fixed_serde, Fixed};

/// A notable thing that happened in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Health was removed from a target.
    Damaged {
        /// Entity that took damage.
        target: EntityId,
        /// Projectile, beam or field that dealt it.
        source: EntityId,
        /// Damage dealt.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
    },
    /// An entity was destroyed by damage.
    Destroyed {
        /// Entity destroyed.
        id: EntityId,
        /// Ordinance or field responsible.
        by: EntityId,
    },
    /// A projectile stopped (impact or blocked).
    ProjectileSpent {
        /// Projectile id.
        id: EntityId,
    },
    /// A beam was fired.
    BeamFired {
        /// Beam id.
        id: EntityId,
        /// Entity the beam struck, if any.
        hit: Option<EntityId>,
    },
    /// An area effect was created.
    FieldSpawned {
        /// Field effect id.
        id: EntityId,
        /// Effect category.
        category: FieldCategory,
    },
}

/// Events generated during one simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick the events belong to.
    pub tick: Tick,
    /// Events in the order they happened.
    pub events: Vec<GameEvent>,
}

impl TickEvents {
    /// Empty record for a tick.
    #[must_use]
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            events: Vec::new(),
        }
    }

    /// Record an event.
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Record damage, plus destruction when it was lethal.
    pub fn damage(&mut self, target: EntityId, source: EntityId, amount: Fixed, killed: bool) {
        self.push(GameEvent::Damaged {
            target,
            source,
            amount,
        });
        if killed {
            self.push(GameEvent::Destroyed {
                id: target,
                by: source,
            });
        }
    }

    /// Ids destroyed this tick.
    #[must_use]
    pub fn destroyed(&self) -> Vec<EntityId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Destroyed { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Total damage dealt this tick.
    #[must_use]
    pub fn total_damage(&self) -> Fixed {
        self.events
            .iter()
            .map(|e| match e {
                GameEvent::Damaged { amount, .. } => *amount,
                _ => Fixed::ZERO,
            })
            .sum()
    }

    /// Damage dealt to one target this tick.
    #[must_use]
    pub fn damage_to(&self, target: EntityId) -> Fixed {
        self.events
            .iter()
            .map(|e| match e {
                GameEvent::Damaged {
                    target: t, amount, ..
                } if *t == target => *amount,
                _ => Fixed::ZERO,
            })
            .sum()
    }

    /// Check if nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lethal_damage_records_destruction() {
        let mut events = TickEvents::new(3);
        events.damage(7, 100, Fixed::from_num(10), false);
        events.damage(8, 100, Fixed::from_num(5), true);
        assert_eq!(events.destroyed(), vec![8]);
        assert_eq!(events.total_damage(), Fixed::from_num(15));
        assert_eq!(events.damage_to(7), Fixed::from_num(10));
        assert_eq!(events.events.len(), 3);
    }
}
