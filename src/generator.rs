use crate::error::Result;
use crate::types::*;
use rand::Rng;
use std::f64::consts::PI;

/// Early-death survival window (seconds)
const EARLY_DEATH: (u32, u32) = (10, 120);
/// Survival window for players who outlive a hot drop
const HOT_LATE_SURVIVAL: (u32, u32) = (300, 1800);
/// Survival window for quiet landings
const COLD_SURVIVAL: (u32, u32) = (180, 1800);
const HOT_EARLY_DEATH_PROB: f64 = 0.70;
const COLD_EARLY_DEATH_PROB: f64 = 0.15;

/// Survival ceilings (exclusive) and the placement range each maps to
const PLACEMENT_TIERS: [(u32, (u32, u32)); 3] = [(120, (60, 100)), (600, (20, 60)), (1200, (5, 25))];
const LATE_GAME_PLACEMENT: (u32, u32) = (1, 10);

const DAMAGE_PER_KILL: u32 = 400;

/// Landing point with the zone it was deliberately aimed at, if any
#[derive(Clone, Debug, PartialEq)]
pub struct Landing {
    pub x: u32,
    pub y: u32,
    pub zone: Option<String>,
}

/// Placement outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub placement: u32,
    pub won: bool,
}

/// Procedural match generator over a validated set of reference tables
#[derive(Clone, Debug)]
pub struct TelemetryGenerator {
    meta: Meta,
    config: GeneratorConfig,
    /// Preferred weapon names resolved to weapon table indices, per archetype
    preferred: Vec<Vec<usize>>,
}

impl TelemetryGenerator {
    pub fn new(meta: Meta, config: GeneratorConfig) -> Result<Self> {
        meta.validate()?;
        config.validate()?;

        let preferred = meta
            .archetypes
            .iter()
            .map(|a| {
                a.preferred_weapons
                    .iter()
                    .filter_map(|name| meta.weapons.iter().position(|w| &w.name == name))
                    .collect()
            })
            .collect();

        Ok(Self {
            meta,
            config,
            preferred,
        })
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate `config.batch_size` records
    pub fn generate_batch(&self, rng: &mut impl Rng) -> Vec<MatchRecord> {
        self.generate_matches(self.config.batch_size, rng)
    }

    /// Generate `count` independent records; ids are numbered from 1
    pub fn generate_matches(&self, count: usize, rng: &mut impl Rng) -> Vec<MatchRecord> {
        let _span = tracing::debug_span!("generate_matches", count).entered();

        let matches: Vec<MatchRecord> = (1..=count).map(|i| self.generate_match(i, rng)).collect();

        tracing::debug!(generated = matches.len(), "Batch complete");
        matches
    }

    /// Sample one record. Steps run in dependency order; later steps read earlier outputs.
    pub fn generate_match(&self, index: usize, rng: &mut impl Rng) -> MatchRecord {
        let archetype_index = self.select_archetype_index(rng);
        let archetype = &self.meta.archetypes[archetype_index];
        let landing = self.generate_landing(rng);
        let weapon = self.select_weapon(archetype_index, rng);
        let time_survived = self.generate_survival_time(&landing, archetype, rng);
        let placement = self.generate_placement(time_survived, weapon, rng);
        let kills = self.generate_kills(weapon, time_survived, archetype.archetype, rng);
        let damage_dealt = self.generate_damage(kills, time_survived, rng);
        let movement_distance = self.generate_movement_distance(archetype, rng);
        let avg_kill_distance = self.generate_kill_distance(archetype, rng);
        let headshot_rate = self.generate_headshot_rate(archetype, rng);

        let zone_name = match landing.zone {
            Some(zone) => zone,
            None => self.nearest_zone(landing.x as f64, landing.y as f64).to_string(),
        };

        MatchRecord {
            match_id: self.config.id_strategy.format(index),
            landing_zone: LandingZone {
                x: landing.x,
                y: landing.y,
                zone_name,
            },
            weapon_used: weapon.name.clone(),
            weapon_category: weapon.category,
            final_placement: placement.placement,
            weapon_won: placement.won,
            time_survived,
            damage_dealt,
            kills,
            player_archetype: archetype.archetype,
            movement_distance: movement_distance as f64,
            avg_kill_distance,
            headshot_rate,
        }
    }

    /// Weighted pick over the archetype table
    fn select_archetype_index(&self, rng: &mut impl Rng) -> usize {
        weighted_index(self.meta.archetypes.iter().map(|a| a.weight), rng)
    }

    /// Hot landings are sampled uniformly by angle and radius inside a random zone,
    /// so they cluster toward the center.
    pub fn generate_landing(&self, rng: &mut impl Rng) -> Landing {
        let map_size = self.meta.map_size;

        if rng.gen_bool(self.config.hot_drop_probability) {
            let zone = &self.meta.zones[rng.gen_range(0..self.meta.zones.len())];
            let angle = rng.gen::<f64>() * 2.0 * PI;
            let radius = rng.gen::<f64>() * zone.radius;
            Landing {
                x: to_map_coord(zone.x + radius * angle.cos(), map_size),
                y: to_map_coord(zone.y + radius * angle.sin(), map_size),
                zone: Some(zone.name.clone()),
            }
        } else {
            let max = map_size.round() as u32;
            Landing {
                x: rng.gen_range(0..=max),
                y: rng.gen_range(0..=max),
                zone: None,
            }
        }
    }

    /// Preferred list first, general weighted pool otherwise
    pub fn select_weapon(&self, archetype_index: usize, rng: &mut impl Rng) -> &WeaponProfile {
        let preferred = &self.preferred[archetype_index];

        if rng.gen_bool(self.config.preferred_weapon_probability) && !preferred.is_empty() {
            let index = preferred[rng.gen_range(0..preferred.len())];
            return &self.meta.weapons[index];
        }

        let index = weighted_index(self.meta.weapons.iter().map(|w| w.weight), rng);
        &self.meta.weapons[index]
    }

    /// Survival in seconds, scaled by the archetype's modifier
    pub fn generate_survival_time(&self, landing: &Landing, archetype: &ArchetypeProfile, rng: &mut impl Rng) -> u32 {
        let hot = self.hot_drop_at(landing.x as f64, landing.y as f64).is_some();

        let base = if hot {
            if rng.gen_bool(HOT_EARLY_DEATH_PROB) {
                sample_inclusive(EARLY_DEATH, rng)
            } else {
                sample_inclusive(HOT_LATE_SURVIVAL, rng)
            }
        } else if rng.gen_bool(COLD_EARLY_DEATH_PROB) {
            sample_inclusive(EARLY_DEATH, rng)
        } else {
            sample_inclusive(COLD_SURVIVAL, rng)
        };

        (base as f64 * archetype.survival_modifier).round() as u32
    }

    /// Placement tier from survival time; top-5 finishes may convert to a win
    pub fn generate_placement(&self, time_survived: u32, weapon: &WeaponProfile, rng: &mut impl Rng) -> Placement {
        let range = PLACEMENT_TIERS
            .iter()
            .find(|(ceiling, _)| time_survived < *ceiling)
            .map(|(_, range)| *range)
            .unwrap_or(LATE_GAME_PLACEMENT);

        let placement = sample_inclusive(range, rng);
        let won = placement == 1 || (rng.gen::<f64>() < weapon.win_rate_modifier / 3.0 && placement <= 5);

        Placement {
            placement: if won { 1 } else { placement },
            won,
        }
    }

    pub fn generate_kills(&self, weapon: &WeaponProfile, time_survived: u32, archetype: Archetype, rng: &mut impl Rng) -> u32 {
        let time_factor = (time_survived as f64 / 600.0).min(2.0);
        let random_factor = uniform(0.5, 1.5, rng);
        let kills = weapon.avg_kill_rate * time_factor * random_factor * archetype.kill_bonus();

        kills.round().max(0.0) as u32
    }

    /// Flat damage per kill plus up to half a point per second survived
    pub fn generate_damage(&self, kills: u32, time_survived: u32, rng: &mut impl Rng) -> u32 {
        let extra = rng.gen_range(0..=time_survived / 2);
        kills.saturating_mul(DAMAGE_PER_KILL).saturating_add(extra)
    }

    pub fn generate_movement_distance(&self, archetype: &ArchetypeProfile, rng: &mut impl Rng) -> u32 {
        sample_inclusive(archetype.movement_range, rng)
    }

    pub fn generate_kill_distance(&self, archetype: &ArchetypeProfile, rng: &mut impl Rng) -> f64 {
        let (lo, hi) = archetype.kill_distance_range;
        uniform(lo, hi, rng).round().clamp(lo.ceil(), hi.floor())
    }

    pub fn generate_headshot_rate(&self, archetype: &ArchetypeProfile, rng: &mut impl Rng) -> f64 {
        let jitter = self.config.headshot_jitter;
        (archetype.headshot_rate + uniform(-jitter, jitter, rng)).clamp(0.0, 1.0)
    }

    /// First zone in table order whose disk contains the point
    pub fn hot_drop_at(&self, x: f64, y: f64) -> Option<&HotDropZone> {
        self.meta.zones.iter().find(|zone| zone.contains(x, y))
    }

    /// Name of the nearest zone center (first wins on ties), or the safe zone
    /// label when every center is farther than `safe_zone_distance`.
    pub fn nearest_zone(&self, x: f64, y: f64) -> &str {
        let mut nearest: Option<(&HotDropZone, f64)> = None;
        for zone in &self.meta.zones {
            let distance = zone.distance_to(x, y);
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((zone, distance));
            }
        }

        match nearest {
            Some((zone, distance)) if distance <= self.config.safe_zone_distance => &zone.name,
            _ => SAFE_ZONE,
        }
    }
}

/// Cumulative-weight subtraction walk; falls back to the first entry if
/// floating-point rounding exhausts the table.
pub fn weighted_index<I>(weights: I, rng: &mut impl Rng) -> usize
where
    I: Iterator<Item = f64> + Clone,
{
    let total: f64 = weights.clone().sum();
    let mut remaining = rng.gen::<f64>() * total;

    for (i, weight) in weights.enumerate() {
        remaining -= weight;
        if remaining <= 0.0 {
            return i;
        }
    }

    0
}

fn sample_inclusive((lo, hi): (u32, u32), rng: &mut impl Rng) -> u32 {
    rng.gen_range(lo..=hi)
}

/// Uniform real in [lo, hi); returns `lo` when the range is empty
fn uniform(lo: f64, hi: f64, rng: &mut impl Rng) -> f64 {
    lo + rng.gen::<f64>() * (hi - lo)
}

fn to_map_coord(v: f64, map_size: f64) -> u32 {
    v.round().clamp(0.0, map_size.round()) as u32
}
