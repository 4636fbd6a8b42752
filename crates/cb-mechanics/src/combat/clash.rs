//! The clash tie-break.
//!
//! A tied attack pauses normal resolution. Both sides roll a d20 plus the
//! same stat's modifier; the winning stat's category picks a consequence
//! from a [`ClashTable`]. The table is a plain lookup so encounters can
//! swap or extend consequences without touching the contest.

use std::collections::BTreeMap;
use std::fmt;

use cb_core::{Battlefield, CombatantId, Facing, Pool, Position, Stat, StatCategory};
use serde::{Deserialize, Serialize};

use crate::config::{ClashTiePolicy, EngineConfig};
use crate::dice::DiceRoller;
use crate::error::MechResult;

/// Rerolls allowed under [`ClashTiePolicy::Reroll`] before the attacker
/// takes the tie anyway.
pub const MAX_REROLLS: u32 = 16;

/// Everything a consequence may touch.
#[derive(Debug)]
pub struct ClashScene<'a> {
    /// The battlefield.
    pub field: &'a mut Battlefield,
    /// Engine tunables.
    pub config: &'a EngineConfig,
    /// Who won the contest.
    pub winner: CombatantId,
    /// Who lost it.
    pub loser: CombatantId,
    /// Narrative lines produced by the consequence.
    pub log: Vec<String>,
}

impl ClashScene<'_> {
    fn names(&self) -> MechResult<(String, String)> {
        Ok((
            self.field.require(self.winner)?.name.clone(),
            self.field.require(self.loser)?.name.clone(),
        ))
    }

    fn positions(&self) -> MechResult<(Position, Position)> {
        Ok((
            self.field.require(self.winner)?.position,
            self.field.require(self.loser)?.position,
        ))
    }

    /// Move the winner and turn it toward the loser.
    fn relocate_winner(&mut self, to: Position) -> MechResult<()> {
        self.field.place(self.winner, to)?;
        let (winner_pos, loser_pos) = self.positions()?;
        self.field.require_mut(self.winner)?.facing = Facing::toward(winner_pos, loser_pos);
        Ok(())
    }
}

/// A consequence function.
pub type ClashEffectFn = fn(&mut ClashScene<'_>) -> MechResult<()>;

/// A named consequence.
#[derive(Clone, Copy)]
pub struct ClashEffect {
    /// Name used in reports.
    pub name: &'static str,
    /// What happens.
    pub apply: ClashEffectFn,
}

impl fmt::Debug for ClashEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClashEffect").field("name", &self.name).finish()
    }
}

/// Stat category to consequence.
#[derive(Debug, Clone)]
pub struct ClashTable {
    effects: BTreeMap<StatCategory, ClashEffect>,
}

impl Default for ClashTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ClashTable {
    /// A table with no consequences.
    pub fn empty() -> Self {
        Self {
            effects: BTreeMap::new(),
        }
    }

    /// The built-in consequences.
    pub fn standard() -> Self {
        Self::empty()
            .with(StatCategory::Power, "shove", shove)
            .with(StatCategory::Agility, "swap", swap_places)
            .with(StatCategory::Insight, "outflank", outflank)
            .with(StatCategory::Vitality, "jolt", jolt)
            .with(StatCategory::Will, "slip behind", slip_behind)
    }

    /// Add or replace a consequence, builder style.
    pub fn with(mut self, category: StatCategory, name: &'static str, apply: ClashEffectFn) -> Self {
        self.insert(category, ClashEffect { name, apply });
        self
    }

    /// Add or replace a consequence.
    pub fn insert(&mut self, category: StatCategory, effect: ClashEffect) {
        self.effects.insert(category, effect);
    }

    /// The consequence for a category.
    pub fn lookup(&self, category: StatCategory) -> Option<&ClashEffect> {
        self.effects.get(&category)
    }
}

/// Power: the loser is driven back a cell and the winner follows.
fn shove(scene: &mut ClashScene<'_>) -> MechResult<()> {
    let (winner, loser) = scene.names()?;
    let (from, at) = scene.positions()?;
    let (dx, dy) = from.direction_to(at);
    let dest = at.offset(dx, dy);
    if scene.field.is_free(dest) {
        scene.field.place(scene.loser, dest)?;
        scene.relocate_winner(at)?;
        scene.log.push(format!("{winner} drives {loser} back to {dest}."));
    } else {
        scene.log.push(format!("{loser} holds their ground against {winner}."));
    }
    Ok(())
}

/// Agility: the two trade places.
fn swap_places(scene: &mut ClashScene<'_>) -> MechResult<()> {
    let (winner, loser) = scene.names()?;
    scene.field.swap(scene.winner, scene.loser)?;
    let (w, l) = scene.positions()?;
    scene.field.require_mut(scene.winner)?.facing = Facing::toward(w, l);
    scene.log.push(format!("{winner} twists past {loser}, trading places."));
    Ok(())
}

/// Insight: the winner slides to a free cell next to the loser, preferring
/// one opposite an ally so the loser ends up flanked.
fn outflank(scene: &mut ClashScene<'_>) -> MechResult<()> {
    let (winner, loser) = scene.names()?;
    let (from, at) = scene.positions()?;
    let allies: Vec<Position> = scene
        .field
        .allies_of(scene.winner)
        .iter()
        .map(|c| c.position)
        .filter(|p| p.is_adjacent(at))
        .collect();
    let free: Vec<Position> = at
        .neighbors()
        .into_iter()
        .filter(|&cell| cell != from && scene.field.is_free(cell))
        .collect();
    let opposite = |cell: Position| allies.iter().any(|a| a.x + cell.x == 2 * at.x && a.y + cell.y == 2 * at.y);
    let pick = free
        .iter()
        .copied()
        .find(|&cell| opposite(cell))
        .or_else(|| free.iter().copied().min_by_key(|cell| cell.distance(from)));
    match pick {
        Some(cell) => {
            scene.relocate_winner(cell)?;
            scene.log.push(format!("{winner} reads {loser} and slips to {cell}."));
        }
        None => scene.log.push(format!("{winner} finds no opening around {loser}.")),
    }
    Ok(())
}

/// Vitality: a flat composure hit instead of repositioning.
fn jolt(scene: &mut ClashScene<'_>) -> MechResult<()> {
    let (winner, loser) = scene.names()?;
    let lost = scene
        .field
        .require_mut(scene.loser)?
        .damage_pool(Pool::Cmp, scene.config.clash_damage);
    scene.log.push(format!("{winner} overpowers {loser}: {lost} CMP lost."));
    Ok(())
}

/// Willpower: the winner steps directly behind the loser.
fn slip_behind(scene: &mut ClashScene<'_>) -> MechResult<()> {
    let (winner, loser) = scene.names()?;
    let (from, at) = scene.positions()?;
    let (dx, dy) = from.direction_to(at);
    let dest = at.offset(dx, dy);
    if scene.field.is_free(dest) {
        scene.relocate_winner(dest)?;
        scene.log.push(format!("{winner} steps behind {loser} to {dest}."));
    } else {
        scene.log.push(format!("{winner} cannot get behind {loser}."));
    }
    Ok(())
}

/// A clash waiting for its stat contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingClash {
    /// Who made the tied attack.
    pub attacker: CombatantId,
    /// Who defended.
    pub defender: CombatantId,
    /// Stat the attack used; the default contest stat.
    pub stat: Stat,
}

/// Result of a clash contest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClashReport {
    /// Contest stat.
    pub stat: Stat,
    /// Winner.
    pub winner: CombatantId,
    /// Loser.
    pub loser: CombatantId,
    /// Attacker's final total.
    pub attacker_total: i32,
    /// Defender's final total.
    pub defender_total: i32,
    /// Ties rerolled before a winner emerged.
    pub rerolls: u32,
    /// Name of the consequence applied, if the table had one.
    pub consequence: Option<&'static str>,
    /// Narrative lines.
    pub log: Vec<String>,
}

/// Run the stat contest and apply the winning category's consequence.
pub fn contest(
    field: &mut Battlefield,
    dice: &mut dyn DiceRoller,
    config: &EngineConfig,
    table: &ClashTable,
    pending: PendingClash,
    stat: Stat,
) -> MechResult<ClashReport> {
    let attacker_mod = field.require(pending.attacker)?.modifier(stat);
    let defender_mod = field.require(pending.defender)?.modifier(stat);

    let mut rerolls = 0;
    let (attacker_total, defender_total) = loop {
        let a = dice.d20() as i32 + attacker_mod;
        let d = dice.d20() as i32 + defender_mod;
        if a != d || config.clash_tie == ClashTiePolicy::AttackerWins || rerolls >= MAX_REROLLS {
            break (a, d);
        }
        rerolls += 1;
    };
    let (winner, loser) = if attacker_total >= defender_total {
        (pending.attacker, pending.defender)
    } else {
        (pending.defender, pending.attacker)
    };

    let mut log = vec![format!(
        "Clash on {stat}: {} {attacker_total} vs {} {defender_total}. {} wins!",
        field.require(pending.attacker)?.name,
        field.require(pending.defender)?.name,
        field.require(winner)?.name,
    )];
    tracing::debug!(%stat, attacker_total, defender_total, rerolls, "clash contest");

    let effect = table.lookup(stat.category()).copied();
    if let Some(effect) = effect {
        let mut scene = ClashScene {
            field,
            config,
            winner,
            loser,
            log: Vec::new(),
        };
        (effect.apply)(&mut scene)?;
        log.append(&mut scene.log);
    }

    Ok(ClashReport {
        stat,
        winner,
        loser,
        attacker_total,
        defender_total,
        rerolls,
        consequence: effect.map(|e| e.name),
        log,
    })
}
