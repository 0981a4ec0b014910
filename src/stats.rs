//! Aggregations the dashboard computes over a batch of match records.
//!
//! Grouped results keep first-seen order before sorting, and sorts are
//! stable, so ties resolve by first appearance in the input.

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Landings shorter than this count as early deaths (seconds)
pub const EARLY_DEATH_SECONDS: u32 = 120;
/// Share of matches a zone needs to count as a hot drop
pub const HOT_DROP_SHARE: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponStat {
    pub weapon: String,
    pub avg_kills: f64,
    pub usage: usize,
    pub total_kills: u64,
}

/// Pick/win report used for weapon balancing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponBalance {
    pub weapon: String,
    pub picks: usize,
    pub wins: usize,
    /// Percent of all matches
    pub pick_rate: f64,
    /// Percent of this weapon's matches
    pub win_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurvivalCategory {
    pub category: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneStat {
    pub zone: String,
    /// Percent of matches finishing first
    pub win_rate: f64,
    /// Minutes
    pub avg_survival: f64,
    pub avg_placement: f64,
    pub avg_kills: f64,
    pub total_matches: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeShare {
    pub archetype: Archetype,
    pub count: usize,
    pub percentage: f64,
}

/// Console/JSON summary printed after a batch is generated
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_matches: usize,
    pub archetypes: Vec<ArchetypeShare>,
    pub weapons: Vec<WeaponBalance>,
    /// Landings tagged with a zone other than the safe zone
    pub hot_drop_landings: usize,
    pub early_deaths: usize,
}

impl BatchSummary {
    pub fn from_matches(matches: &[MatchRecord]) -> Self {
        Self {
            total_matches: matches.len(),
            archetypes: archetype_distribution(matches),
            weapons: weapon_balance(matches),
            hot_drop_landings: matches
                .iter()
                .filter(|m| m.landing_zone.zone_name != SAFE_ZONE)
                .count(),
            early_deaths: matches
                .iter()
                .filter(|m| m.time_survived < EARLY_DEATH_SECONDS)
                .count(),
        }
    }

    pub fn hot_drop_rate(&self) -> f64 {
        percentage(self.hot_drop_landings, self.total_matches)
    }

    pub fn early_death_rate(&self) -> f64 {
        percentage(self.early_deaths, self.total_matches)
    }
}

/// Every aggregate the dashboard renders, computed in one pass over a batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_matches: usize,
    pub weapons: Vec<WeaponStat>,
    pub weapon_balance: Vec<WeaponBalance>,
    pub survival: Vec<SurvivalCategory>,
    pub zones: Vec<ZoneStat>,
    pub landing_zones: Vec<String>,
    pub hot_drop_zones: Vec<String>,
    pub archetypes: Vec<ArchetypeShare>,
    /// Archetypes re-derived from movement and kill distance
    pub observed_playstyles: Vec<ArchetypeShare>,
}

impl DashboardStats {
    pub fn from_matches(matches: &[MatchRecord]) -> Self {
        Self {
            total_matches: matches.len(),
            weapons: weapon_stats(matches),
            weapon_balance: weapon_balance(matches),
            survival: survival_categories(matches),
            zones: zone_stats(matches),
            landing_zones: landing_zones(matches),
            hot_drop_zones: hot_drop_zones(matches),
            archetypes: archetype_distribution(matches),
            observed_playstyles: observed_playstyles(matches),
        }
    }
}

/// Average kills per weapon, best first
pub fn weapon_stats(matches: &[MatchRecord]) -> Vec<WeaponStat> {
    let mut stats: Vec<WeaponStat> = group_first_seen(matches, |m| m.weapon_used.as_str())
        .into_iter()
        .map(|(weapon, group)| {
            let total_kills: u64 = group.iter().map(|m| m.kills as u64).sum();
            WeaponStat {
                weapon: weapon.to_string(),
                avg_kills: round_to(total_kills as f64 / group.len() as f64, 2),
                usage: group.len(),
                total_kills,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.avg_kills.total_cmp(&a.avg_kills));
    stats
}

/// Pick and win rates per weapon, most picked first
pub fn weapon_balance(matches: &[MatchRecord]) -> Vec<WeaponBalance> {
    let mut balance: Vec<WeaponBalance> = group_first_seen(matches, |m| m.weapon_used.as_str())
        .into_iter()
        .map(|(weapon, group)| {
            let picks = group.len();
            let wins = group.iter().filter(|m| m.weapon_won).count();
            WeaponBalance {
                weapon: weapon.to_string(),
                picks,
                wins,
                pick_rate: percentage(picks, matches.len()),
                win_rate: percentage(wins, picks),
            }
        })
        .collect();

    balance.sort_by(|a, b| b.picks.cmp(&a.picks));
    balance
}

/// Four fixed survival buckets, always reported in the same order
pub fn survival_categories(matches: &[MatchRecord]) -> Vec<SurvivalCategory> {
    let labels = ["Died <2min", "Survived 2-15min", "Survived 15-25min", "Survived >25min"];
    let mut counts = [0usize; 4];

    for m in matches {
        let minutes = m.time_survived as f64 / 60.0;
        let bucket = if minutes < 2.0 {
            0
        } else if minutes < 15.0 {
            1
        } else if minutes < 25.0 {
            2
        } else {
            3
        };
        counts[bucket] += 1;
    }

    labels
        .iter()
        .zip(counts)
        .map(|(label, count)| SurvivalCategory {
            category: label.to_string(),
            count,
            percentage: percentage(count, matches.len()),
        })
        .collect()
}

/// Per-zone outcome averages, busiest zone first
pub fn zone_stats(matches: &[MatchRecord]) -> Vec<ZoneStat> {
    let mut stats: Vec<ZoneStat> = group_first_seen(matches, |m| m.landing_zone.zone_name.as_str())
        .into_iter()
        .map(|(zone, group)| {
            let n = group.len() as f64;
            let wins = group.iter().filter(|m| m.final_placement == 1).count();
            let survival: f64 = group.iter().map(|m| m.time_survived as f64).sum();
            let placement: f64 = group.iter().map(|m| m.final_placement as f64).sum();
            let kills: f64 = group.iter().map(|m| m.kills as f64).sum();

            ZoneStat {
                zone: zone.to_string(),
                win_rate: round_to(wins as f64 / n * 100.0, 2),
                avg_survival: round_to(survival / n / 60.0, 1),
                avg_placement: round_to(placement / n, 1),
                avg_kills: round_to(kills / n, 2),
                total_matches: group.len(),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.total_matches.cmp(&a.total_matches));
    stats
}

/// Zone names by landing frequency
pub fn landing_zones(matches: &[MatchRecord]) -> Vec<String> {
    let mut zones = group_first_seen(matches, |m| m.landing_zone.zone_name.as_str());
    zones.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    zones.into_iter().map(|(zone, _)| zone.to_string()).collect()
}

/// Zones drawing at least a tenth of all landings (safe zone excluded)
pub fn hot_drop_zones(matches: &[MatchRecord]) -> Vec<String> {
    let threshold = matches.len() as f64 * HOT_DROP_SHARE;

    group_first_seen(matches, |m| m.landing_zone.zone_name.as_str())
        .into_iter()
        .filter(|(zone, group)| group.len() as f64 >= threshold && *zone != SAFE_ZONE)
        .map(|(zone, _)| zone.to_string())
        .collect()
}

/// Archetype counts in table order, including archetypes with no matches
pub fn archetype_distribution(matches: &[MatchRecord]) -> Vec<ArchetypeShare> {
    shares(matches.iter().map(|m| m.player_archetype), matches.len())
}

/// Playstyle shares classified from behavior rather than the recorded label
pub fn observed_playstyles(matches: &[MatchRecord]) -> Vec<ArchetypeShare> {
    let classified = matches
        .iter()
        .map(|m| Archetype::classify(m.movement_distance, m.avg_kill_distance));
    shares(classified, matches.len())
}

fn shares(archetypes: impl Iterator<Item = Archetype>, total: usize) -> Vec<ArchetypeShare> {
    let mut counts: HashMap<Archetype, usize> = HashMap::new();
    for archetype in archetypes {
        *counts.entry(archetype).or_insert(0) += 1;
    }

    Archetype::ALL
        .iter()
        .map(|&archetype| {
            let count = counts.get(&archetype).copied().unwrap_or(0);
            ArchetypeShare {
                archetype,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect()
}

fn group_first_seen<'a, F>(matches: &'a [MatchRecord], key: F) -> Vec<(&'a str, Vec<&'a MatchRecord>)>
where
    F: Fn(&'a MatchRecord) -> &'a str,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&MatchRecord>)> = Vec::new();

    for m in matches {
        let k = key(m);
        match index.get(k) {
            Some(&i) => groups[i].1.push(m),
            None => {
                index.insert(k, groups.len());
                groups.push((k, vec![m]));
            }
        }
    }

    groups
}

/// Percentage rounded to one decimal; zero when the denominator is empty
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(count as f64 / total as f64 * 100.0, 1)
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}
