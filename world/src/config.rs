//! Tunable constants and the per-kind object catalogue.
//!
//! Every field carries a default so a configuration file only needs to list
//! the values it overrides. Catalog entries missing from a file fall back to
//! the built-in entry for that kind.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use glam::Vec3;
use outpost_core::{Aabb, BuildPointSpec, ObjectKind, UnknownObjectKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a world configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read world config at {path}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration contents are not valid TOML for [`WorldConfig`].
    #[error("failed to parse world config")]
    Parse(#[from] toml::de::Error),
}

/// Complete configuration of a world.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Global gameplay constants.
    pub tuning: Tuning,
    /// Per-kind object definitions.
    pub catalog: ObjectCatalog,
    /// Seed of the random generator driving debris velocities.
    pub seed: u64,
}

impl WorldConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

/// Global gameplay constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Interval between object thinks in milliseconds.
    pub think_interval_ms: u64,
    /// Health a freshly committed object starts constructing from.
    pub construction_start_health: f32,
    /// Caps construction times at `fast_build_cap` when enabled.
    pub fast_build: bool,
    /// Longest construction time allowed while fast build is enabled.
    pub fast_build_cap: f32,
    /// Factor applied to all damage taken by objects; zero disables it.
    pub damage_factor: f32,
    /// Factor applied to damage taken by friendly objects built on other objects.
    pub child_damage_factor: f32,
    /// Seconds a repair hit keeps contributing to the repair multiplier.
    pub repair_window: f32,
    /// Damage dealt to hostile attachments by a wrench strike.
    pub wrench_sapper_damage: f32,
    /// Largest heal a single paid wrench repair performs.
    pub wrench_max_heal: u32,
    /// Metal charged per point of health restored by a wrench.
    pub wrench_metal_per_health: f32,
    /// Health restored per unit of metal spent on a wrench repair.
    pub wrench_health_per_metal: u32,
    /// Crush damage per second a finished sapper deals to its host.
    pub sapper_damage_per_second: f32,
    /// Slowest launch speed of a debris fragment.
    pub gib_min_speed: f32,
    /// Fastest launch speed of a debris fragment before capping.
    pub gib_max_speed: f32,
    /// Hard cap applied to debris launch speed.
    pub gib_speed_cap: f32,
    /// Most metal a player wallet can hold.
    pub max_metal: u32,
    /// Constants consulted by the placement validator.
    pub placement: PlacementTuning,
}

impl Tuning {
    /// Interval between object thinks, never shorter than a millisecond.
    #[must_use]
    pub fn think_interval(&self) -> Duration {
        Duration::from_millis(self.think_interval_ms.max(1))
    }

    /// Construction time of an object whose catalogue build time is `build_time`.
    #[must_use]
    pub fn construction_time(&self, build_time: f32) -> f32 {
        let build_time = build_time.max(0.0);
        if self.fast_build {
            build_time.min(self.fast_build_cap)
        } else {
            build_time
        }
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            think_interval_ms: 100,
            construction_start_health: 0.1,
            fast_build: false,
            fast_build_cap: 2.0,
            damage_factor: 0.0,
            child_damage_factor: 0.25,
            repair_window: 1.0,
            wrench_sapper_damage: 65.0,
            wrench_max_heal: 100,
            wrench_metal_per_health: 0.2,
            wrench_health_per_metal: 5,
            sapper_damage_per_second: 25.0,
            gib_min_speed: 100.0,
            gib_max_speed: 450.0,
            gib_speed_cap: 800.0,
            max_metal: 200,
            placement: PlacementTuning::default(),
        }
    }
}

/// Constants consulted by the placement validator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementTuning {
    /// Horizontal margin added around object bounds when placing.
    pub build_margin: f32,
    /// Gap kept between the builder's hull and the object's bounds.
    pub safety_buffer: f32,
    /// Distance past the candidate origin probed for spawn room visualizers.
    pub far_edge_extension: f32,
    /// Cosine of the half angle of the builder's view cone.
    pub view_cone_cosine: f32,
    /// Starting distance of the nearest build point search.
    pub initial_snap_distance: f32,
    /// Rejects free-standing placements that cut off player movement.
    pub test_player_block: bool,
}

impl Default for PlacementTuning {
    fn default() -> Self {
        Self {
            build_margin: 4.0,
            safety_buffer: 4.0,
            far_edge_extension: 8.0,
            view_cone_cosine: 0.5,
            initial_snap_distance: 9999.0,
            test_player_block: false,
        }
    }
}

/// Definition of a single object kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSpec {
    /// Metal charged when construction begins.
    pub cost: u32,
    /// Seconds of construction without repairers.
    pub build_time: f32,
    /// Maximum health once constructed.
    pub max_health: u32,
    /// Collision bounds relative to the origin.
    pub bounds: Aabb,
    /// Metal shared between the debris fragments thrown on destruction.
    pub metal_in_gibs: u32,
    /// Number of debris fragments thrown on destruction.
    pub gib_count: u32,
    /// Must be built onto another object's build point.
    pub attachment: bool,
    /// Attaches to enemy objects and disables them.
    pub hostile: bool,
    /// Lets the builder place another object of this kind right after committing.
    pub repeatable: bool,
    /// Sound played when the object explodes.
    pub explode_sound: Option<String>,
    /// Particle system spawned when the object explodes.
    pub explode_effect: Option<String>,
    /// Ordered build point layout.
    pub build_points: Vec<BuildPointSpec>,
    /// Attachments spawned onto the object's build points once constructed.
    pub spawn_on_finish: Vec<ObjectKind>,
}

impl Default for ObjectSpec {
    fn default() -> Self {
        Self {
            cost: 100,
            build_time: 10.0,
            max_health: 150,
            bounds: Aabb::new(Vec3::new(-16.0, -16.0, 0.0), Vec3::new(16.0, 16.0, 48.0)),
            metal_in_gibs: 0,
            gib_count: 0,
            attachment: false,
            hostile: false,
            repeatable: false,
            explode_sound: None,
            explode_effect: None,
            build_points: Vec::new(),
            spawn_on_finish: Vec::new(),
        }
    }
}

impl ObjectSpec {
    /// Built-in definition of the provided kind.
    #[must_use]
    pub fn builtin(kind: ObjectKind) -> Self {
        let sapper_point = |height: f32| {
            BuildPointSpec::new(Vec3::new(0.0, 0.0, height), vec![ObjectKind::Sapper], 128.0)
        };
        let upgrade_point =
            |height: f32| BuildPointSpec::new(Vec3::new(0.0, 0.0, height), vec![ObjectKind::Shield], 96.0);

        match kind {
            ObjectKind::SentryGun => Self {
                cost: 130,
                build_time: 10.0,
                max_health: 150,
                bounds: Aabb::new(Vec3::new(-20.0, -20.0, 0.0), Vec3::new(20.0, 20.0, 66.0)),
                metal_in_gibs: 65,
                gib_count: 5,
                explode_sound: Some("Building_Sentry.Explode".to_owned()),
                explode_effect: Some("ExplosionCore_buildings".to_owned()),
                build_points: vec![sapper_point(40.0), upgrade_point(66.0)],
                ..Self::default()
            },
            ObjectKind::Dispenser => Self {
                cost: 100,
                build_time: 20.0,
                max_health: 150,
                bounds: Aabb::new(Vec3::new(-24.0, -24.0, 0.0), Vec3::new(24.0, 24.0, 55.0)),
                metal_in_gibs: 50,
                gib_count: 5,
                explode_sound: Some("Building_Dispenser.Explode".to_owned()),
                explode_effect: Some("ExplosionCore_buildings".to_owned()),
                build_points: vec![sapper_point(30.0), upgrade_point(55.0)],
                ..Self::default()
            },
            ObjectKind::TeleporterEntrance | ObjectKind::TeleporterExit => Self {
                cost: 125,
                build_time: 20.0,
                max_health: 150,
                bounds: Aabb::new(Vec3::new(-28.0, -28.0, 0.0), Vec3::new(28.0, 28.0, 12.0)),
                metal_in_gibs: 62,
                gib_count: 4,
                explode_sound: Some("Building_Teleporter.Explode".to_owned()),
                explode_effect: Some("ExplosionCore_buildings".to_owned()),
                build_points: vec![sapper_point(12.0)],
                ..Self::default()
            },
            ObjectKind::Sapper => Self {
                cost: 0,
                build_time: 1.0,
                max_health: 100,
                bounds: Aabb::new(Vec3::new(-6.0, -6.0, 0.0), Vec3::new(6.0, 6.0, 12.0)),
                attachment: true,
                hostile: true,
                repeatable: true,
                explode_sound: Some("Weapon_Sapper.Timer".to_owned()),
                ..Self::default()
            },
            ObjectKind::Shield => Self {
                cost: 50,
                build_time: 4.0,
                max_health: 150,
                bounds: Aabb::new(Vec3::new(-12.0, -12.0, 0.0), Vec3::new(12.0, 12.0, 24.0)),
                metal_in_gibs: 25,
                gib_count: 2,
                attachment: true,
                explode_effect: Some("ExplosionCore_MidAir".to_owned()),
                ..Self::default()
            },
        }
    }
}

/// Definitions for every [`ObjectKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, ObjectSpec>",
    into = "BTreeMap<String, ObjectSpec>"
)]
pub struct ObjectCatalog {
    entries: BTreeMap<ObjectKind, ObjectSpec>,
}

impl ObjectCatalog {
    /// Definition of the provided kind.
    #[must_use]
    pub fn spec(&self, kind: ObjectKind) -> &ObjectSpec {
        // `From` fills every kind, so the map lookup always succeeds.
        &self.entries[&kind]
    }

    /// Replaces the definition of one kind.
    pub fn set(&mut self, kind: ObjectKind, spec: ObjectSpec) {
        let _ = self.entries.insert(kind, spec);
    }

    /// Mutable access to the definition of one kind.
    pub fn spec_mut(&mut self, kind: ObjectKind) -> &mut ObjectSpec {
        self.entries
            .entry(kind)
            .or_insert_with(|| ObjectSpec::builtin(kind))
    }
}

impl Default for ObjectCatalog {
    fn default() -> Self {
        Self::from(BTreeMap::new())
    }
}

impl From<BTreeMap<ObjectKind, ObjectSpec>> for ObjectCatalog {
    fn from(mut entries: BTreeMap<ObjectKind, ObjectSpec>) -> Self {
        for kind in ObjectKind::ALL {
            let _ = entries
                .entry(kind)
                .or_insert_with(|| ObjectSpec::builtin(kind));
        }
        Self { entries }
    }
}

impl TryFrom<BTreeMap<String, ObjectSpec>> for ObjectCatalog {
    type Error = UnknownObjectKind;

    fn try_from(raw: BTreeMap<String, ObjectSpec>) -> Result<Self, Self::Error> {
        let entries = raw
            .into_iter()
            .map(|(name, spec)| Ok((name.parse::<ObjectKind>()?, spec)))
            .collect::<Result<BTreeMap<_, _>, UnknownObjectKind>>()?;
        Ok(Self::from(entries))
    }
}

impl From<ObjectCatalog> for BTreeMap<String, ObjectSpec> {
    fn from(catalog: ObjectCatalog) -> Self {
        catalog
            .entries
            .into_iter()
            .map(|(kind, spec)| (kind.name().to_owned(), spec))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = WorldConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, WorldConfig::default());
        assert_eq!(config.tuning.think_interval(), Duration::from_millis(100));
    }

    #[test]
    fn overrides_merge_with_builtin_catalog() {
        let config = WorldConfig::from_toml_str(
            r#"
            seed = 7

            [tuning]
            fast_build = true

            [tuning.placement]
            test_player_block = true

            [catalog.dispenser]
            cost = 20
            build_time = 1.0
            "#,
        )
        .expect("config parses");

        assert_eq!(config.seed, 7);
        assert!(config.tuning.fast_build);
        assert!(config.tuning.placement.test_player_block);
        assert_eq!(config.tuning.placement.build_margin, 4.0);
        assert_eq!(config.catalog.spec(ObjectKind::Dispenser).cost, 20);
        assert_eq!(config.catalog.spec(ObjectKind::Dispenser).build_time, 1.0);
        assert_eq!(
            config.catalog.spec(ObjectKind::SentryGun),
            &ObjectSpec::builtin(ObjectKind::SentryGun),
            "kinds absent from the file keep their built-in definition"
        );
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        let error = WorldConfig::from_toml_str("[catalog.catapult]\ncost = 1\n")
            .expect_err("unknown kind must fail");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn fast_build_caps_construction_time() {
        let mut tuning = Tuning::default();
        assert_eq!(tuning.construction_time(10.0), 10.0);
        tuning.fast_build = true;
        assert_eq!(tuning.construction_time(10.0), 2.0);
        assert_eq!(tuning.construction_time(1.5), 1.5);
    }

    #[test]
    fn missing_file_reports_path() {
        let error = WorldConfig::load("/nonexistent/outpost.toml").expect_err("missing file");
        assert!(error.to_string().contains("/nonexistent/outpost.toml"));
    }
}
