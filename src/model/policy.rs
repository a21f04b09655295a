use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::config::NotificationSettings;

/// Effective settings for one source, resolved from the generic settings and
/// the source application's override.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NotificationPolicy {
    pub enabled: bool,
    pub sound_enabled: bool,
    pub show_banners: bool,
    pub force_expanded: bool,
    pub timeout: Duration,
}

impl NotificationPolicy {
    pub fn generic(settings: &NotificationSettings) -> Self {
        NotificationPolicy {
            enabled: true,
            sound_enabled: true,
            show_banners: settings.show_banners,
            force_expanded: false,
            timeout: settings.timeout,
        }
    }

    /// `show_banners` can only be narrowed by an application, never widened
    /// past the master switch.
    pub fn resolve(settings: &NotificationSettings, app_id: Option<&str>) -> Self {
        let generic = Self::generic(settings);
        let Some(rule) = app_id.and_then(|id| settings.application(id)) else {
            return generic;
        };
        NotificationPolicy {
            enabled: rule.enable.unwrap_or(true),
            sound_enabled: rule.enable_sound.unwrap_or(true),
            show_banners: generic.show_banners && rule.show_banners.unwrap_or(true),
            force_expanded: rule.force_expanded.unwrap_or(false),
            timeout: rule.timeout.unwrap_or(generic.timeout),
        }
    }
}

/// Lowercases `id` and maps it onto `[a-z0-9-]`, collapsing runs of `-`.
pub fn canonicalize_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for ch in id.chars().flat_map(char::to_lowercase) {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() { ch } else { '-' };
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::config::Config;

    #[test]
    fn test_canonicalize_id() {
        assert_eq!(canonicalize_id("org.gnome.Evolution"), "org-gnome-evolution");
        assert_eq!(canonicalize_id("Foo  Bar__Baz"), "foo-bar-baz");
        assert_eq!(canonicalize_id("already-fine-42"), "already-fine-42");
        assert_eq!(canonicalize_id("Ünïcode"), "-n-code");
    }

    #[test]
    fn test_unknown_application_gets_generic_policy() {
        let settings = NotificationSettings::default();
        let policy = NotificationPolicy::resolve(&settings, Some("org.example.unknown"));
        assert_eq!(policy, NotificationPolicy::generic(&settings));
        assert_eq!(policy.timeout, Duration::from_millis(4000));
        assert!(policy.show_banners);
    }

    #[test]
    fn test_master_switches_and_with_application() {
        let config = Config::parse(
            r#"
            [notifications]
            show_banners = false

            [notifications.applications."org.example.Mail"]
            show_banners = true
            enable_sound = false
            force_expanded = true
            timeout_ms = 8000
            "#,
        )
        .unwrap();
        let policy = NotificationPolicy::resolve(&config.notifications, Some("org.example.mail"));
        assert_eq!(policy, NotificationPolicy {
            enabled: true,
            sound_enabled: false,
            show_banners: false,
            force_expanded: true,
            timeout: Duration::from_millis(8000),
        });
    }
}
