use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};

/// Zone label for landings that are not near any hot drop
pub const SAFE_ZONE: &str = "Safe Zone";

/// Behavioral player profile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Rusher,
    Sniper,
    Camper,
}

impl Archetype {
    pub const ALL: [Archetype; 3] = [Archetype::Rusher, Archetype::Sniper, Archetype::Camper];

    /// Kill multiplier applied on top of the weapon's kill rate
    pub fn kill_bonus(&self) -> f64 {
        match self {
            Archetype::Rusher => 1.3,
            Archetype::Sniper => 1.0,
            Archetype::Camper => 0.7,
        }
    }

    /// Classify observed behavior (movement in meters, average kill distance in meters)
    pub fn classify(movement: f64, avg_kill_distance: f64) -> Self {
        if movement > 3000.0 && avg_kill_distance < 30.0 {
            return Archetype::Rusher;
        }
        if movement < 1500.0 && avg_kill_distance > 100.0 {
            return Archetype::Sniper;
        }
        if movement < 1000.0 {
            return Archetype::Camper;
        }

        if avg_kill_distance > 100.0 {
            Archetype::Sniper
        } else {
            Archetype::Rusher
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Rusher => "Rusher",
            Archetype::Sniper => "Sniper",
            Archetype::Camper => "Camper",
        }
    }
}

/// Weapon class
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponCategory {
    AR,
    SMG,
    SR,
    DMR,
}

impl WeaponCategory {
    /// Resolve a category from a weapon name, falling back to name patterns
    /// and finally to AR for anything unrecognised.
    pub fn classify(weapon_name: &str) -> Self {
        match weapon_name {
            "M416" | "AKM" | "SCAR-L" | "M16A4" | "Groza" => return WeaponCategory::AR,
            "UMP45" | "Vector" | "Uzi" => return WeaponCategory::SMG,
            "AWM" | "Kar98k" | "M24" => return WeaponCategory::SR,
            "SKS" | "Mini14" | "SLR" => return WeaponCategory::DMR,
            _ => {}
        }

        let name = weapon_name.to_lowercase();
        let has = |patterns: &[&str]| patterns.iter().any(|p| name.contains(p));
        if has(&["ump", "vector", "uzi"]) {
            WeaponCategory::SMG
        } else if has(&["awm", "kar", "m24"]) {
            WeaponCategory::SR
        } else if has(&["sks", "mini", "slr"]) {
            WeaponCategory::DMR
        } else {
            WeaponCategory::AR
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeaponCategory::AR => "AR",
            WeaponCategory::SMG => "SMG",
            WeaponCategory::SR => "SR",
            WeaponCategory::DMR => "DMR",
        }
    }
}

/// Hot drop danger tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneTier {
    Extreme,
    High,
    Medium,
}

/// Archetype reference entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    #[serde(rename = "type")]
    pub archetype: Archetype,
    /// Relative selection weight
    pub weight: f64,
    /// Weapons this archetype reaches for first
    pub preferred_weapons: Vec<String>,
    /// Movement distance range in meters (inclusive)
    pub movement_range: (u32, u32),
    /// Average kill distance range in meters
    pub kill_distance_range: (f64, f64),
    /// Multiplier on sampled survival time
    pub survival_modifier: f64,
    /// Base headshot rate in [0, 1]
    pub headshot_rate: f64,
}

/// Weapon reference entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub name: String,
    /// Relative selection weight in the general pool
    pub weight: f64,
    pub avg_kill_rate: f64,
    /// Win-rate modifier in [0, 1]; a third of it is the chance a top-5 finish converts to a win
    pub win_rate_modifier: f64,
    pub category: WeaponCategory,
}

/// High-density landing area
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HotDropZone {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub tier: ZoneTier,
}

impl HotDropZone {
    pub fn new(name: &str, x: f64, y: f64, radius: f64, tier: ZoneTier) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
            radius,
            tier,
        }
    }

    /// Euclidean distance from the zone center
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt()
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.distance_to(x, y) <= self.radius
    }
}

/// Landing point on the map
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandingZone {
    pub x: u32,
    pub y: u32,
    pub zone_name: String,
}

/// One simulated (or fetched) player match outcome
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub landing_zone: LandingZone,
    pub weapon_used: String,
    pub weapon_category: WeaponCategory,
    /// Placement in [1, 100]
    pub final_placement: u32,
    pub weapon_won: bool,
    /// Seconds
    pub time_survived: u32,
    pub damage_dealt: u32,
    pub kills: u32,
    pub player_archetype: Archetype,
    /// Meters
    pub movement_distance: f64,
    /// Meters
    pub avg_kill_distance: f64,
    /// Fraction in [0, 1]
    pub headshot_rate: f64,
}

/// Origin tag consumed by the dashboard's source badge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Real,
    Mock,
    Dynamic,
}

/// Reference tables the generator samples from.
/// Swapping these (e.g. for a balance patch) needs no code changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Map edge length; coordinates live in [0, map_size]
    pub map_size: f64,
    pub archetypes: Vec<ArchetypeProfile>,
    pub weapons: Vec<WeaponProfile>,
    pub zones: Vec<HotDropZone>,
}

impl Default for Meta {
    fn default() -> Self {
        let preferred = |names: &[&str]| -> Vec<String> { names.iter().map(|n| n.to_string()).collect() };
        let weapon = |name: &str, weight: f64, avg_kill_rate: f64, win_rate_modifier: f64, category: WeaponCategory| WeaponProfile {
            name: name.to_string(),
            weight,
            avg_kill_rate,
            win_rate_modifier,
            category,
        };

        Self {
            map_size: 8000.0,
            archetypes: vec![
                ArchetypeProfile {
                    archetype: Archetype::Rusher,
                    weight: 40.0,
                    preferred_weapons: preferred(&["UMP45", "Vector", "M416"]),
                    movement_range: (3000, 5000),
                    kill_distance_range: (5.0, 25.0),
                    survival_modifier: 0.7,
                    headshot_rate: 0.15,
                },
                ArchetypeProfile {
                    archetype: Archetype::Sniper,
                    weight: 30.0,
                    preferred_weapons: preferred(&["Kar98k", "AWM", "M416"]),
                    movement_range: (800, 1800),
                    kill_distance_range: (120.0, 300.0),
                    survival_modifier: 1.2,
                    headshot_rate: 0.35,
                },
                ArchetypeProfile {
                    archetype: Archetype::Camper,
                    weight: 30.0,
                    preferred_weapons: preferred(&["M416", "SCAR-L", "AKM"]),
                    movement_range: (400, 1200),
                    kill_distance_range: (30.0, 100.0),
                    survival_modifier: 1.5,
                    headshot_rate: 0.20,
                },
            ],
            weapons: vec![
                weapon("M416", 35.0, 2.5, 0.50, WeaponCategory::AR),
                weapon("UMP45", 15.0, 1.8, 0.30, WeaponCategory::SMG),
                weapon("SCAR-L", 20.0, 2.1, 0.45, WeaponCategory::AR),
                weapon("AKM", 7.0, 2.3, 0.55, WeaponCategory::AR),
                weapon("Kar98k", 10.0, 3.2, 0.60, WeaponCategory::SR),
                weapon("Vector", 8.0, 1.6, 0.25, WeaponCategory::SMG),
                weapon("AWM", 5.0, 4.5, 0.80, WeaponCategory::SR),
            ],
            zones: vec![
                HotDropZone::new("Pochinki", 4800.0, 4800.0, 400.0, ZoneTier::Extreme),
                HotDropZone::new("School", 3500.0, 2800.0, 300.0, ZoneTier::Extreme),
                HotDropZone::new("Military Base", 6500.0, 2000.0, 500.0, ZoneTier::High),
                HotDropZone::new("Georgopol", 1500.0, 6500.0, 400.0, ZoneTier::High),
                HotDropZone::new("Rozhok", 4200.0, 5200.0, 300.0, ZoneTier::Medium),
            ],
        }
    }
}

impl Meta {
    pub fn from_json(json: &str) -> Result<Self> {
        let meta: Meta = serde_json::from_str(json)?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn weapon(&self, name: &str) -> Option<&WeaponProfile> {
        self.weapons.iter().find(|w| w.name == name)
    }

    /// Check every table entry against the ranges the generator relies on
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TelemetryError::InvalidMeta(msg));

        if !(self.map_size.is_finite() && self.map_size > 0.0) {
            return invalid(format!("map_size must be positive, got {}", self.map_size));
        }
        if self.archetypes.is_empty() {
            return invalid("archetype table is empty".to_string());
        }
        if self.weapons.is_empty() {
            return invalid("weapon table is empty".to_string());
        }
        if self.zones.is_empty() {
            return invalid("zone table is empty".to_string());
        }

        for a in &self.archetypes {
            let name = a.archetype.as_str();
            if !positive(a.weight) {
                return invalid(format!("{name}: weight must be positive"));
            }
            if a.movement_range.0 == 0 {
                return invalid(format!("{name}: movement_range must start above zero"));
            }
            if a.movement_range.0 > a.movement_range.1 {
                return invalid(format!("{name}: movement_range is inverted"));
            }
            let (lo, hi) = a.kill_distance_range;
            if !(lo.is_finite() && hi.is_finite() && lo >= 0.0 && lo <= hi) {
                return invalid(format!("{name}: kill_distance_range must satisfy 0 <= min <= max"));
            }
            // Kill distances are whole meters
            if lo.ceil() > hi.floor() {
                return invalid(format!("{name}: kill_distance_range contains no whole meter"));
            }
            if !positive(a.survival_modifier) {
                return invalid(format!("{name}: survival_modifier must be positive"));
            }
            if !(0.0..=1.0).contains(&a.headshot_rate) {
                return invalid(format!("{name}: headshot_rate must be in [0, 1]"));
            }
            if let Some(missing) = a.preferred_weapons.iter().find(|w| self.weapon(w).is_none()) {
                return invalid(format!("{name}: preferred weapon '{missing}' is not in the weapon table"));
            }
        }

        for w in &self.weapons {
            if !positive(w.weight) {
                return invalid(format!("{}: weight must be positive", w.name));
            }
            if !positive(w.avg_kill_rate) {
                return invalid(format!("{}: avg_kill_rate must be positive", w.name));
            }
            if !(0.0..=1.0).contains(&w.win_rate_modifier) {
                return invalid(format!("{}: win_rate_modifier must be in [0, 1]", w.name));
            }
        }

        for z in &self.zones {
            if !positive(z.radius) {
                return invalid(format!("{}: radius must be positive", z.name));
            }
            let on_map = |v: f64| v.is_finite() && (0.0..=self.map_size).contains(&v);
            if !on_map(z.x) || !on_map(z.y) {
                return invalid(format!("{}: center lies outside the map", z.name));
            }
        }

        Ok(())
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// How match ids are assembled (index is 1-based)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdStrategy {
    /// `{prefix}{index}` zero-padded to `width` digits, e.g. `match_001`
    Sequential { prefix: String, width: usize },
    /// `{prefix}-{millis}-{index}`, unique across repeated on-demand calls
    Timestamped { prefix: String, millis: u64 },
}

impl IdStrategy {
    pub fn format(&self, index: usize) -> String {
        match self {
            IdStrategy::Sequential { prefix, width } => {
                format!("{prefix}{index:0width$}", width = *width)
            }
            IdStrategy::Timestamped { prefix, millis } => format!("{prefix}-{millis}-{index}"),
        }
    }
}

/// Generator tuning; each call site picks its variant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Records produced by `generate_batch`
    pub batch_size: usize,
    pub id_strategy: IdStrategy,
    /// Headshot jitter half-width; rate gets base + U(-j, j)
    pub headshot_jitter: f64,
    /// Chance a player lands inside a hot drop
    pub hot_drop_probability: f64,
    /// Chance the weapon comes from the archetype's preferred list
    pub preferred_weapon_probability: f64,
    /// Beyond this distance from every zone center a landing is a safe zone
    pub safe_zone_distance: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::mock_script()
    }
}

impl GeneratorConfig {
    /// Batch-once artifact written for the dashboard's static mock data
    pub fn mock_script() -> Self {
        Self {
            batch_size: 500,
            id_strategy: IdStrategy::Sequential {
                prefix: "match_".to_string(),
                width: 3,
            },
            headshot_jitter: 0.05,
            hot_drop_probability: 0.4,
            preferred_weapon_probability: 0.7,
            safe_zone_distance: 1000.0,
        }
    }

    /// On-demand batch served over HTTP, ids stamped with the request time
    pub fn api_route(now_millis: u64) -> Self {
        Self {
            id_strategy: IdStrategy::Timestamped {
                prefix: "dynamic".to_string(),
                millis: now_millis,
            },
            headshot_jitter: 0.1,
            ..Self::mock_script()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let probability = |v: f64| (0.0..=1.0).contains(&v);
        if !probability(self.hot_drop_probability) {
            return Err(TelemetryError::Config("hot_drop_probability must be in [0, 1]".to_string()));
        }
        if !probability(self.preferred_weapon_probability) {
            return Err(TelemetryError::Config(
                "preferred_weapon_probability must be in [0, 1]".to_string(),
            ));
        }
        if !(self.headshot_jitter.is_finite() && self.headshot_jitter >= 0.0) {
            return Err(TelemetryError::Config("headshot_jitter must be non-negative".to_string()));
        }
        if !(self.safe_zone_distance.is_finite() && self.safe_zone_distance >= 0.0) {
            return Err(TelemetryError::Config("safe_zone_distance must be non-negative".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_meta_is_valid() {
        let meta = Meta::default();
        assert!(meta.validate().is_ok());
        assert_eq!(meta.archetypes.len(), 3);
        assert_eq!(meta.weapons.len(), 7);
        assert_eq!(meta.zones.len(), 5);
    }

    #[test]
    fn test_meta_rejects_unknown_preferred_weapon() {
        let mut meta = Meta::default();
        meta.archetypes[0].preferred_weapons.push("Crossbow".to_string());

        let err = meta.validate().unwrap_err();
        assert!(err.to_string().contains("Crossbow"));
    }

    #[test]
    fn test_meta_rejects_non_positive_weight() {
        let mut meta = Meta::default();
        meta.weapons[2].weight = 0.0;
        assert!(meta.validate().is_err());

        let mut meta = Meta::default();
        meta.archetypes[1].weight = f64::NAN;
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_meta_rejects_zero_movement_floor() {
        let mut meta = Meta::default();
        for archetype in &mut meta.archetypes {
            archetype.movement_range = (0, 0);
        }
        let err = meta.validate().unwrap_err();
        assert!(err.to_string().contains("movement_range"));

        meta.archetypes.iter_mut().for_each(|a| a.movement_range = (1, 1));
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn test_meta_rejects_kill_distance_without_whole_meter() {
        let mut meta = Meta::default();
        meta.archetypes[0].kill_distance_range = (5.4, 5.6);
        let err = meta.validate().unwrap_err();
        assert!(err.to_string().contains("kill_distance_range"));

        meta.archetypes[0].kill_distance_range = (5.4, 6.0);
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn test_meta_rejects_zone_off_map() {
        let mut meta = Meta::default();
        meta.zones[0].x = 9000.0;
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_meta_json_uses_table_field_names() {
        let json = serde_json::to_value(Meta::default()).unwrap();
        assert_eq!(json["archetypes"][0]["type"], "Rusher");
        assert_eq!(json["archetypes"][0]["movement_range"], serde_json::json!([3000, 5000]));
        assert_eq!(json["zones"][2]["tier"], "high");

        let back = Meta::from_json(&json.to_string()).unwrap();
        assert_eq!(back, Meta::default());
    }

    #[test]
    fn test_zone_containment_is_inclusive() {
        let zone = HotDropZone::new("Test", 100.0, 100.0, 50.0, ZoneTier::Medium);
        assert!(zone.contains(150.0, 100.0));
        assert!(!zone.contains(150.5, 100.0));
        assert_eq!(zone.distance_to(103.0, 104.0), 5.0);
    }

    #[test]
    fn test_id_strategies() {
        let sequential = GeneratorConfig::mock_script().id_strategy;
        assert_eq!(sequential.format(7), "match_007");
        assert_eq!(sequential.format(1234), "match_1234");

        let stamped = GeneratorConfig::api_route(1_700_000_000_000).id_strategy;
        assert_eq!(stamped.format(3), "dynamic-1700000000000-3");
    }

    #[test]
    fn test_variant_configs_differ_only_where_expected() {
        let script = GeneratorConfig::mock_script();
        let route = GeneratorConfig::api_route(0);
        assert_eq!(script.headshot_jitter, 0.05);
        assert_eq!(route.headshot_jitter, 0.1);
        assert_eq!(script.batch_size, route.batch_size);
        assert_eq!(script.hot_drop_probability, route.hot_drop_probability);
        assert!(script.validate().is_ok());
        assert!(route.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_probability() {
        let config = GeneratorConfig {
            hot_drop_probability: 1.5,
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_archetype_classification() {
        assert_eq!(Archetype::classify(4000.0, 10.0), Archetype::Rusher);
        assert_eq!(Archetype::classify(1200.0, 200.0), Archetype::Sniper);
        assert_eq!(Archetype::classify(600.0, 50.0), Archetype::Camper);
        assert_eq!(Archetype::classify(2500.0, 150.0), Archetype::Sniper);
        assert_eq!(Archetype::classify(2500.0, 50.0), Archetype::Rusher);
    }

    #[test]
    fn test_weapon_category_lookup_and_patterns() {
        assert_eq!(WeaponCategory::classify("SLR"), WeaponCategory::DMR);
        assert_eq!(WeaponCategory::classify("Item_Weapon_UMP_C"), WeaponCategory::SMG);
        assert_eq!(WeaponCategory::classify("WeapKar98k_C"), WeaponCategory::SR);
        assert_eq!(WeaponCategory::classify("WeapMini14_C"), WeaponCategory::DMR);
        assert_eq!(WeaponCategory::classify("Punch"), WeaponCategory::AR);
        assert_eq!(WeaponCategory::classify("Uzi").as_str(), "SMG");
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&WeaponCategory::SMG).unwrap(), "\"SMG\"");
        assert_eq!(serde_json::to_string(&DataSource::Dynamic).unwrap(), "\"dynamic\"");
        assert_eq!(serde_json::to_string(&Archetype::Camper).unwrap(), "\"Camper\"");
    }
}
