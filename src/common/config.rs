use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use strum::EnumIter;

use super::collections::HashMap;
use crate::actor::pressure_barrier::ActionMode;
use crate::model::canonicalize_id;

pub const TRAY_ZONE: &str = "tray";
pub const HOT_CORNER_ZONE: &str = "hot_corner";

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".config").join("trayd").join("config.toml")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub heuristics: HeuristicsSettings,
    #[serde(default)]
    pub tray: TraySettings,
    /// Gesture zones by name. Zones missing from the file keep their
    /// defaults; set `action = "none"` to switch one off.
    #[serde(default)]
    pub pressure: HashMap<String, PressureZoneSettings>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "yes")]
    pub animate: bool,
    #[serde(rename = "animation_duration_ms", default = "default_animation_duration")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub animation_duration: Duration,
    #[serde(default = "default_animation_fps")]
    pub animation_fps: f64,
    #[serde(default)]
    pub animation_easing: AnimationEasing,
    /// Enable hot-reloading of the config file when it changes
    #[serde(default = "yes")]
    pub hot_reload: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            animate: true,
            animation_duration: default_animation_duration(),
            animation_fps: default_animation_fps(),
            animation_easing: AnimationEasing::default(),
            hot_reload: true,
        }
    }
}

impl Settings {
    /// Duration of surface transitions, zero when animations are off.
    pub fn transition_duration(&self) -> Duration {
        if self.animate { self.animation_duration } else { Duration::ZERO }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !(self.animation_fps > 0.0) {
            issues.push(format!(
                "settings.animation_fps must be positive (got {})",
                self.animation_fps
            ));
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, Copy, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum AnimationEasing {
    EaseInOut,
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    #[default]
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
}

/// Generic notification policy plus per-application overrides.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct NotificationSettings {
    #[serde(default = "yes")]
    pub show_banners: bool,
    #[serde(rename = "timeout_ms", default = "default_notification_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
    /// Keyed by application id. Keys are canonicalized before lookup.
    #[serde(default)]
    pub applications: HashMap<String, ApplicationOverride>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            show_banners: true,
            timeout: default_notification_timeout(),
            applications: HashMap::default(),
        }
    }
}

impl NotificationSettings {
    pub fn application(&self, app_id: &str) -> Option<&ApplicationOverride> {
        let canonical = canonicalize_id(app_id);
        self.applications
            .iter()
            .find(|(key, _)| canonicalize_id(key) == canonical)
            .map(|(_, value)| value)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.timeout.is_zero() {
            issues.push("notifications.timeout_ms must be positive".to_string());
        }
        for (app_id, rule) in &self.applications {
            if canonicalize_id(app_id).trim_matches('-').is_empty() {
                issues.push(format!("notifications.applications has an empty app id: {app_id:?}"));
            }
            if rule.timeout.is_some_and(|t| t.is_zero()) {
                issues.push(format!(
                    "notifications.applications.{app_id:?}.timeout_ms must be positive"
                ));
            }
        }
        issues
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ApplicationOverride {
    pub enable: Option<bool>,
    pub enable_sound: Option<bool>,
    pub show_banners: Option<bool>,
    pub force_expanded: Option<bool>,
    #[serde(rename = "timeout_ms")]
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub timeout: Option<Duration>,
}

/// Which screen edge the banner slides in from. The pointer approaching
/// this edge counts as moving toward the banner.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorEdge {
    Top,
    #[default]
    Bottom,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct HeuristicsSettings {
    /// Idle time above which a newly shown notification waits for the user
    /// to come back before it may expire.
    #[serde(rename = "idle_threshold_ms", default = "default_idle_threshold")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub idle_threshold: Duration,
    #[serde(rename = "became_active_timeout_ms", default = "default_became_active_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub became_active_timeout: Duration,
    #[serde(default = "default_approach_dead_zone")]
    pub approach_dead_zone_px: f64,
    #[serde(rename = "approach_grace_ms", default = "default_approach_grace")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub approach_grace: Duration,
    #[serde(rename = "hide_timeout_ms", default = "default_hide_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub hide_timeout: Duration,
    #[serde(rename = "longer_hide_timeout_ms", default = "default_longer_hide_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub longer_hide_timeout: Duration,
    #[serde(default = "default_pointer_left_threshold")]
    pub pointer_left_threshold_px: f64,
    #[serde(default)]
    pub anchor_edge: AnchorEdge,
}

impl Default for HeuristicsSettings {
    fn default() -> Self {
        Self {
            idle_threshold: default_idle_threshold(),
            became_active_timeout: default_became_active_timeout(),
            approach_dead_zone_px: default_approach_dead_zone(),
            approach_grace: default_approach_grace(),
            hide_timeout: default_hide_timeout(),
            longer_hide_timeout: default_longer_hide_timeout(),
            pointer_left_threshold_px: default_pointer_left_threshold(),
            anchor_edge: AnchorEdge::default(),
        }
    }
}

impl HeuristicsSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, value) in [
            ("idle_threshold_ms", self.idle_threshold),
            ("became_active_timeout_ms", self.became_active_timeout),
            ("approach_grace_ms", self.approach_grace),
            ("hide_timeout_ms", self.hide_timeout),
            ("longer_hide_timeout_ms", self.longer_hide_timeout),
        ] {
            if value.is_zero() {
                issues.push(format!("heuristics.{name} must be positive"));
            }
        }
        if self.approach_dead_zone_px < 0.0 {
            issues.push("heuristics.approach_dead_zone_px must not be negative".to_string());
        }
        if self.pointer_left_threshold_px < 0.0 {
            issues.push("heuristics.pointer_left_threshold_px must not be negative".to_string());
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TraySettings {
    /// Whether pushing against the tray barrier opens the tray.
    #[serde(default = "yes")]
    pub barrier_enabled: bool,
}

impl Default for TraySettings {
    fn default() -> Self { Self { barrier_enabled: true } }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoneAction {
    OpenTray,
    ToggleOverview,
    #[default]
    None,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct PressureZoneSettings {
    pub threshold: f64,
    #[serde(rename = "window_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub window: Duration,
    /// Upper bound on what a single sample may contribute.
    pub sample_cap: Option<f64>,
    #[serde(default)]
    pub action: ZoneAction,
    #[serde(default = "default_action_modes")]
    pub action_modes: ActionMode,
}

impl PressureZoneSettings {
    pub fn validate(&self, name: &str) -> Vec<String> {
        let mut issues = Vec::new();
        if !(self.threshold > 0.0) {
            issues.push(format!(
                "pressure.{name}.threshold must be positive (got {})",
                self.threshold
            ));
        }
        if self.window.is_zero() {
            issues.push(format!("pressure.{name}.window_ms must be positive"));
        }
        if let Some(cap) = self.sample_cap
            && !(cap > 0.0)
        {
            issues.push(format!("pressure.{name}.sample_cap must be positive (got {cap})"));
        }
        issues
    }
}

fn yes() -> bool { true }

fn default_animation_duration() -> Duration { Duration::from_millis(200) }

fn default_animation_fps() -> f64 { 60.0 }

fn default_notification_timeout() -> Duration { Duration::from_millis(4000) }

fn default_idle_threshold() -> Duration { Duration::from_millis(1000) }

fn default_became_active_timeout() -> Duration { Duration::from_millis(2000) }

fn default_approach_dead_zone() -> f64 { 10.0 }

fn default_approach_grace() -> Duration { Duration::from_millis(1000) }

fn default_hide_timeout() -> Duration { Duration::from_millis(200) }

fn default_longer_hide_timeout() -> Duration { Duration::from_millis(600) }

fn default_pointer_left_threshold() -> f64 { 20.0 }

fn default_action_modes() -> ActionMode { ActionMode::NORMAL | ActionMode::OVERVIEW }

fn default_pressure_zones() -> HashMap<String, PressureZoneSettings> {
    let mut zones = HashMap::default();
    zones.insert(TRAY_ZONE.to_string(), PressureZoneSettings {
        threshold: 250.0,
        window: Duration::from_millis(1000),
        sample_cap: Some(15.0),
        action: ZoneAction::OpenTray,
        action_modes: default_action_modes(),
    });
    zones.insert(HOT_CORNER_ZONE.to_string(), PressureZoneSettings {
        threshold: 100.0,
        window: Duration::from_millis(1000),
        sample_cap: Some(15.0),
        action: ZoneAction::ToggleOverview,
        action_modes: default_action_modes(),
    });
    zones
}

impl Default for Config {
    fn default() -> Self {
        Config {
            settings: Settings::default(),
            notifications: NotificationSettings::default(),
            heuristics: HeuristicsSettings::default(),
            tray: TraySettings::default(),
            pressure: default_pressure_zones(),
        }
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path`, falling back to the defaults when it does not exist.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Config::default()) }
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.settings.validate());
        issues.extend(self.notifications.validate());
        issues.extend(self.heuristics.validate());
        for (name, zone) in &self.pressure {
            if name.is_empty() {
                issues.push("pressure zone names must not be empty".to_string());
            }
            issues.extend(zone.validate(name));
        }
        issues
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let mut config = match toml::from_str::<Config>(buf) {
            Ok(config) => config,
            Err(e) => bail!("{e}"),
        };
        for (name, zone) in default_pressure_zones() {
            config.pressure.entry(name).or_insert(zone);
        }
        Ok(config)
    }
}
