//! Synthetic battle-royale match telemetry.
//!
//! The wasm engine and the generator build by default. The HTTP server,
//! CLI and snapshot archive sit behind the `native` feature, and so do
//! their tests: run `cargo test --features native` (or `cargo test-all`)
//! to cover everything.

pub mod document;
pub mod error;
pub mod generator;
pub mod stats;
pub mod types;

#[cfg(feature = "native")]
pub mod archive;
#[cfg(feature = "native")]
pub mod config;
#[cfg(feature = "native")]
pub mod server;

pub use document::{TelemetryDocument, TelemetryMetadata};
pub use error::{Result, TelemetryError};
pub use generator::TelemetryGenerator;
pub use stats::{BatchSummary, DashboardStats};
pub use types::{Archetype, DataSource, GeneratorConfig, MatchRecord, Meta, WeaponCategory};

use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(context: &str, e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, e))
}

/// WASM-exposed telemetry generator
#[wasm_bindgen]
pub struct TelemetryEngine {
    meta: Meta,
    rng: StdRng,
}

#[wasm_bindgen]
impl TelemetryEngine {
    /// Create an engine over the built-in Erangel tables
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> TelemetryEngine {
        TelemetryEngine {
            meta: Meta::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with balance-patch tables
    pub fn new_with_meta(seed: u64, meta_json: &str) -> std::result::Result<TelemetryEngine, JsValue> {
        let meta = Meta::from_json(meta_json).map_err(|e| js_error("Meta parse error", e))?;
        Ok(TelemetryEngine {
            meta,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Mock artifact JSON: sequential ids, versioned envelope
    pub fn generate(&mut self, count: usize) -> std::result::Result<String, JsValue> {
        let matches = self.generate_with(GeneratorConfig::mock_script(), count)?;
        TelemetryDocument::mock(matches)
            .to_json()
            .map_err(|e| js_error("Serialization error", e))
    }

    /// Current tables as JSON
    pub fn get_meta(&self) -> String {
        serde_json::to_string(&self.meta).unwrap_or_default()
    }

    /// Built-in tables as JSON, a starting point for balance patches
    pub fn get_default_meta() -> String {
        serde_json::to_string(&Meta::default()).unwrap_or_default()
    }

    /// Summary of a match array or a full telemetry document
    pub fn summarize(matches_json: &str) -> std::result::Result<String, JsValue> {
        let matches = parse_matches(matches_json).map_err(|e| js_error("Matches parse error", e))?;
        serde_json::to_string(&BatchSummary::from_matches(&matches)).map_err(|e| js_error("Serialization error", e))
    }

    /// Weapon, zone, survival and playstyle aggregates for the dashboard
    pub fn dashboard_stats(matches_json: &str) -> std::result::Result<String, JsValue> {
        let matches = parse_matches(matches_json).map_err(|e| js_error("Matches parse error", e))?;
        serde_json::to_string(&DashboardStats::from_matches(&matches)).map_err(|e| js_error("Serialization error", e))
    }
}

/// Playstyle for raw telemetry: movement and average kill distance in meters
#[wasm_bindgen]
pub fn classify_playstyle(movement: f64, avg_kill_distance: f64) -> String {
    Archetype::classify(movement, avg_kill_distance).as_str().to_string()
}

/// Weapon category for a raw item name such as `WeapHK416_C`
#[wasm_bindgen]
pub fn classify_weapon(weapon_name: &str) -> String {
    WeaponCategory::classify(weapon_name).as_str().to_string()
}

// Reads the JS clock; wasm only
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl TelemetryEngine {
    /// Dynamic batch JSON stamped with the browser clock
    pub fn generate_dynamic(&mut self, count: usize) -> std::result::Result<String, JsValue> {
        let now = js_sys::Date::new_0();
        let config = GeneratorConfig::api_route(now.get_time() as u64);
        let matches = self.generate_with(config, count)?;

        let summary = BatchSummary::from_matches(&matches);
        let counts: Vec<String> = summary
            .archetypes
            .iter()
            .map(|a| format!("{}={}", a.archetype.as_str(), a.count))
            .collect();
        web_sys::console::log_1(&format!("Generated {} matches ({})", matches.len(), counts.join(", ")).into());

        let generated_at: String = now.to_iso_string().into();
        TelemetryDocument::dynamic(matches, generated_at)
            .to_json()
            .map_err(|e| js_error("Serialization error", e))
    }
}

impl TelemetryEngine {
    fn generate_with(&mut self, config: GeneratorConfig, count: usize) -> std::result::Result<Vec<MatchRecord>, JsValue> {
        let generator = TelemetryGenerator::new(self.meta.clone(), config).map_err(|e| js_error("Generator error", e))?;
        Ok(generator.generate_matches(count, &mut self.rng))
    }
}

fn parse_matches(json: &str) -> Result<Vec<MatchRecord>> {
    match serde_json::from_str::<Vec<MatchRecord>>(json) {
        Ok(matches) => Ok(matches),
        Err(_) => Ok(TelemetryDocument::from_json(json)?.matches),
    }
}

/// Generate the same seeded batch under two balance tables and summarize both
#[wasm_bindgen]
pub fn compare_metas(
    meta_a_json: &str,
    meta_b_json: &str,
    count: usize,
    seed: u64,
) -> std::result::Result<String, JsValue> {
    let meta_a = Meta::from_json(meta_a_json).map_err(|e| js_error("Meta A parse error", e))?;
    let meta_b = Meta::from_json(meta_b_json).map_err(|e| js_error("Meta B parse error", e))?;

    let summarize = |meta: Meta| -> std::result::Result<BatchSummary, JsValue> {
        let generator =
            TelemetryGenerator::new(meta, GeneratorConfig::mock_script()).map_err(|e| js_error("Generator error", e))?;
        let matches = generator.generate_matches(count, &mut StdRng::seed_from_u64(seed));
        Ok(BatchSummary::from_matches(&matches))
    };

    let comparison = serde_json::json!({
        "meta_a": summarize(meta_a)?,
        "meta_b": summarize(meta_b)?,
    });

    serde_json::to_string(&comparison).map_err(|e| js_error("Serialization error", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_generate_mock_document() {
        let mut engine = TelemetryEngine::new(42);
        let json = engine.generate(20).unwrap();
        let doc = TelemetryDocument::from_json(&json).unwrap();

        assert_eq!(doc.matches.len(), 20);
        assert_eq!(doc.version.as_deref(), Some("2.0"));
        assert_eq!(doc.matches[0].match_id, "match_001");
        assert_eq!(doc.matches[19].match_id, "match_020");
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = TelemetryEngine::new(7).generate(50).unwrap();
        let b = TelemetryEngine::new(7).generate(50).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_consecutive_batches_differ() {
        let mut engine = TelemetryEngine::new(7);
        let first = engine.generate(50).unwrap();
        let second = engine.generate(50).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_new_with_meta() {
        let mut meta = Meta::default();
        meta.zones.truncate(1);
        let json = serde_json::to_string(&meta).unwrap();

        let engine = TelemetryEngine::new_with_meta(1, &json).unwrap_or_else(|_| panic!("valid meta"));
        let back: Meta = serde_json::from_str(&engine.get_meta()).unwrap();
        assert_eq!(back.zones.len(), 1);
    }

    #[test]
    fn test_default_meta_parses() {
        let meta = Meta::from_json(&TelemetryEngine::get_default_meta()).unwrap();
        assert_eq!(meta, Meta::default());
    }

    #[test]
    fn test_summarize_accepts_array_or_document() {
        let mut engine = TelemetryEngine::new(3);
        let doc_json = engine.generate(30).unwrap();
        let doc = TelemetryDocument::from_json(&doc_json).unwrap();
        let array_json = serde_json::to_string(&doc.matches).unwrap();

        let from_doc: BatchSummary =
            serde_json::from_str(&TelemetryEngine::summarize(&doc_json).unwrap_or_default()).unwrap();
        let from_array: BatchSummary =
            serde_json::from_str(&TelemetryEngine::summarize(&array_json).unwrap_or_default()).unwrap();

        assert_eq!(from_doc.total_matches, 30);
        assert_eq!(from_doc, from_array);
    }

    #[test]
    fn test_dashboard_stats_from_document() {
        let mut engine = TelemetryEngine::new(9);
        let doc_json = engine.generate(200).unwrap();

        let json = TelemetryEngine::dashboard_stats(&doc_json).unwrap_or_default();
        let stats: DashboardStats = serde_json::from_str(&json).unwrap();

        assert_eq!(stats.total_matches, 200);
        assert_eq!(stats.survival.iter().map(|c| c.count).sum::<usize>(), 200);
        assert_eq!(stats.zones.iter().map(|z| z.total_matches).sum::<usize>(), 200);
        assert_eq!(stats.weapons.iter().map(|w| w.usage).sum::<usize>(), 200);
        assert_eq!(stats.observed_playstyles.iter().map(|a| a.count).sum::<usize>(), 200);
        assert_eq!(stats.landing_zones.len(), stats.zones.len());
        assert!(stats.hot_drop_zones.iter().all(|z| z != "Safe Zone"));
    }

    #[test]
    fn test_classifiers() {
        assert_eq!(classify_playstyle(4200.0, 12.0), "Rusher");
        assert_eq!(classify_playstyle(900.0, 180.0), "Sniper");
        assert_eq!(classify_playstyle(700.0, 60.0), "Camper");
        assert_eq!(classify_weapon("WeapHK416_C"), "AR");
        assert_eq!(classify_weapon("WeapAWM_C"), "SR");
        assert_eq!(classify_weapon("SKS"), "DMR");
    }

    #[test]
    fn test_parse_matches_rejects_garbage() {
        assert!(parse_matches("{\"not\": \"telemetry\"}").is_err());
    }

    #[test]
    fn test_compare_metas() {
        let meta_a = Meta::default();
        let mut meta_b = Meta::default();
        for weapon in &mut meta_b.weapons {
            weapon.weight = if weapon.name == "AWM" { 1000.0 } else { 1.0 };
        }
        for archetype in &mut meta_b.archetypes {
            archetype.preferred_weapons.clear();
        }

        let json = compare_metas(
            &serde_json::to_string(&meta_a).unwrap(),
            &serde_json::to_string(&meta_b).unwrap(),
            200,
            11,
        )
        .unwrap_or_default();
        let comparison: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(comparison["meta_a"]["total_matches"], 200);
        assert_eq!(comparison["meta_b"]["weapons"][0]["weapon"], "AWM");
    }
}
