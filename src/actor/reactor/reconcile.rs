//! The decision half of the state machine.
//!
//! [`reconcile`] looks at one [`Inputs`] snapshot and says which transitions
//! should start. It never touches a surface; the reactor applies the plan and
//! calls it again until nothing is left to do.

use super::managers::PopupTarget;
use super::surfaces::SurfaceState;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    pub banner: SurfaceState,
    pub tray: SurfaceState,
    pub popup: SurfaceState,
    pub dim: SurfaceState,

    /// The queue has a head that suppression lets through.
    pub queue_showable: bool,
    /// The queue head is critical.
    pub head_urgent: bool,
    /// The queue head was posted for feedback while a fullscreen window
    /// covers the banner's display.
    pub head_feedback_hidden: bool,
    pub session_has_notifications: bool,

    pub has_banner_notification: bool,
    pub banner_critical: bool,
    pub banner_focused: bool,
    pub banner_expanded: bool,
    pub banner_timer_armed: bool,
    pub banner_removed: bool,
    pub close_requested: bool,
    pub user_active: bool,
    pub pointer_in_tray: bool,

    pub tray_summoned: bool,
    pub keyboard_visible: bool,

    pub popup_requested: Option<PopupTarget>,
    pub popup_shown: Option<PopupTarget>,
    pub requested_stack_empty: bool,
    /// The requested popup belongs to the source of the notification on the
    /// banner.
    pub requested_source_on_banner: bool,
}

impl Inputs {
    pub fn notifications_pending(&self) -> bool {
        self.queue_showable && self.session_has_notifications
    }

    /// The retract timer ran out and nothing is holding the banner open.
    pub fn notification_expired(&self) -> bool {
        !self.banner_timer_armed
            && !self.banner_critical
            && !self.banner_focused
            && !self.pointer_in_tray
    }

    pub fn notification_locked_out(&self) -> bool {
        !self.session_has_notifications && self.has_banner_notification
    }

    pub fn notification_must_close(&self) -> bool {
        self.banner_removed
            || self.notification_locked_out()
            || (self.notification_expired() && self.user_active)
            || self.close_requested
            || self.head_feedback_hidden
    }

    pub fn notification_pinned(&self) -> bool { self.pointer_in_tray && !self.banner_removed }

    pub fn can_show_notification(&self) -> bool {
        self.notifications_pending() && self.tray == SurfaceState::Hidden
    }

    pub fn must_hide_tray(&self) -> bool {
        (self.notifications_pending() && self.head_urgent)
            || self.banner != SurfaceState::Hidden
            || !self.session_has_notifications
    }

    pub fn tray_should_be_visible(&self) -> bool {
        self.tray_summoned && !self.keyboard_visible && !self.must_hide_tray()
    }

    pub fn wrong_popup(&self) -> bool {
        self.popup_requested.is_some() && self.popup_requested != self.popup_shown
    }

    pub fn popup_can_show(&self) -> bool {
        self.popup_requested.is_some()
            && !self.requested_source_on_banner
            && self.tray == SurfaceState::Shown
            && !self.requested_stack_empty
    }

    pub fn popup_must_hide(&self) -> bool {
        self.popup_requested.is_none()
            || self.tray != SurfaceState::Shown
            || self.wrong_popup()
            || self.must_hide_tray()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ShowBanner,
    /// A removed notification is cut away without animating.
    HideBanner { animate: bool },
    ExpandBanner,
    FocusBanner,
    ShowTray,
    HideTray,
    ShowPopup,
    HidePopup,
    ShowDim,
    HideDim,
}

/// Whether each surface should end up visible once in-flight transitions
/// settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Desired {
    pub banner: bool,
    pub tray: bool,
    pub popup: bool,
    pub dim: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub actions: Vec<Action>,
    pub desired: Desired,
}

impl Plan {
    pub fn is_empty(&self) -> bool { self.actions.is_empty() }
}

/// Decides the transitions to start, surface by surface in a fixed order.
/// Later surfaces see the in-flight states earlier ones were just given.
/// Nothing is ever started on a surface that is showing or hiding.
pub fn reconcile(inputs: &Inputs) -> Plan {
    let mut i = inputs.clone();
    let mut plan = Plan::default();

    match i.banner {
        SurfaceState::Hidden if i.can_show_notification() => {
            plan.actions.push(Action::ShowBanner);
            i.banner = SurfaceState::Showing;
        }
        SurfaceState::Shown if i.notification_must_close() => {
            plan.actions.push(Action::HideBanner { animate: !i.banner_removed });
            i.banner = SurfaceState::Hiding;
        }
        SurfaceState::Shown if i.notification_pinned() && !i.banner_expanded => {
            plan.actions.push(Action::ExpandBanner);
        }
        SurfaceState::Shown if i.notification_pinned() && !i.banner_focused => {
            plan.actions.push(Action::FocusBanner);
        }
        _ => {}
    }
    plan.desired.banner = i.banner.visible();

    let tray_should_be_visible = i.tray_should_be_visible();

    let tray_visible = i.tray.visible();
    if !i.tray.in_flight() {
        if !tray_visible && tray_should_be_visible {
            plan.actions.push(Action::ShowTray);
            i.tray = SurfaceState::Showing;
        } else if tray_visible && !tray_should_be_visible {
            plan.actions.push(Action::HideTray);
            i.tray = SurfaceState::Hiding;
        }
    }
    plan.desired.tray = tray_should_be_visible;

    match i.popup {
        SurfaceState::Hidden if i.popup_can_show() => {
            plan.actions.push(Action::ShowPopup);
            i.popup = SurfaceState::Showing;
        }
        SurfaceState::Shown if i.popup_must_hide() => {
            plan.actions.push(Action::HidePopup);
            i.popup = SurfaceState::Hiding;
        }
        _ => {}
    }
    plan.desired.popup = i.popup.visible() || (i.wrong_popup() && i.popup_can_show());

    let dim_visible = i.dim.visible();
    if !i.dim.in_flight() {
        if !dim_visible && tray_should_be_visible {
            plan.actions.push(Action::ShowDim);
        } else if dim_visible && !tray_should_be_visible {
            plan.actions.push(Action::HideDim);
        }
    }
    plan.desired.dim = tray_should_be_visible;

    plan
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use slotmap::KeyData;

    use super::*;
    use crate::actor::reactor::PopupKind;
    use crate::model::SourceId;

    fn target(n: u64, kind: PopupKind) -> PopupTarget {
        PopupTarget { source: SourceId::from(KeyData::from_ffi(n | (1 << 32))), kind }
    }

    fn idle() -> Inputs { Inputs { session_has_notifications: true, ..Default::default() } }

    fn shown_banner() -> Inputs {
        Inputs {
            banner: SurfaceState::Shown,
            has_banner_notification: true,
            banner_timer_armed: true,
            ..idle()
        }
    }

    fn open_tray() -> Inputs {
        Inputs {
            tray: SurfaceState::Shown,
            dim: SurfaceState::Shown,
            tray_summoned: true,
            ..idle()
        }
    }

    #[test]
    fn nothing_to_do_when_idle() {
        assert!(reconcile(&idle()).is_empty());
    }

    #[test]
    fn pending_notification_shows_only_with_tray_hidden() {
        let inputs = Inputs { queue_showable: true, ..idle() };
        assert_eq!(reconcile(&inputs).actions, vec![Action::ShowBanner]);

        let inputs = Inputs { queue_showable: true, ..open_tray() };
        assert!(!reconcile(&inputs).actions.contains(&Action::ShowBanner));
    }

    #[test]
    fn pending_requires_the_session_to_allow_notifications() {
        let inputs = Inputs { queue_showable: true, session_has_notifications: false, ..idle() };
        assert!(!inputs.notifications_pending());
        assert!(reconcile(&inputs).is_empty());
    }

    #[test]
    fn expiry_alone_does_not_close_before_the_user_is_active() {
        let inputs = Inputs { banner_timer_armed: false, ..shown_banner() };
        assert!(inputs.notification_expired());
        assert!(!inputs.notification_must_close());

        let inputs = Inputs { user_active: true, ..inputs };
        assert_eq!(reconcile(&inputs).actions, vec![Action::HideBanner { animate: true }]);
    }

    #[test]
    fn critical_focused_or_hovered_never_expire() {
        let base = Inputs { banner_timer_armed: false, user_active: true, ..shown_banner() };
        for inputs in [
            Inputs { banner_critical: true, ..base.clone() },
            Inputs { banner_focused: true, ..base.clone() },
            Inputs { pointer_in_tray: true, banner_expanded: true, banner_focused: true, ..base.clone() },
        ] {
            assert!(!inputs.notification_must_close(), "{inputs:?}");
        }
    }

    #[test]
    fn removal_hides_without_animation() {
        let inputs = Inputs { banner_removed: true, pointer_in_tray: true, ..shown_banner() };
        assert!(!inputs.notification_pinned());
        assert_eq!(reconcile(&inputs).actions, vec![Action::HideBanner { animate: false }]);
    }

    #[test]
    fn lock_out_closes_the_banner_and_hides_the_tray() {
        let inputs = Inputs { session_has_notifications: false, ..shown_banner() };
        assert!(inputs.notification_locked_out());
        assert!(inputs.must_hide_tray());
        assert_eq!(reconcile(&inputs).actions, vec![Action::HideBanner { animate: true }]);
    }

    #[test]
    fn feedback_head_under_fullscreen_closes_the_banner() {
        let inputs = Inputs { head_feedback_hidden: true, ..shown_banner() };
        assert!(inputs.notification_must_close());
    }

    #[test]
    fn hover_expands_then_focuses() {
        let inputs = Inputs { pointer_in_tray: true, ..shown_banner() };
        assert_eq!(reconcile(&inputs).actions, vec![Action::ExpandBanner]);
        let inputs = Inputs { banner_expanded: true, ..inputs };
        assert_eq!(reconcile(&inputs).actions, vec![Action::FocusBanner]);
        let inputs = Inputs { banner_focused: true, ..inputs };
        assert!(reconcile(&inputs).is_empty());
    }

    #[test]
    fn summoned_tray_and_dim_show_together() {
        let inputs = Inputs { tray_summoned: true, ..idle() };
        let plan = reconcile(&inputs);
        assert_eq!(plan.actions, vec![Action::ShowTray, Action::ShowDim]);
        assert_eq!(plan.desired, Desired { tray: true, dim: true, ..Default::default() });
    }

    #[test]
    fn keyboard_keeps_the_tray_down() {
        let inputs = Inputs { keyboard_visible: true, ..open_tray() };
        assert_eq!(reconcile(&inputs).actions, vec![Action::HideTray, Action::HideDim]);
    }

    #[test]
    fn banner_in_any_phase_forces_the_tray_down() {
        for banner in [SurfaceState::Showing, SurfaceState::Shown, SurfaceState::Hiding] {
            let inputs = Inputs { banner, has_banner_notification: true, banner_timer_armed: true, ..open_tray() };
            assert!(inputs.must_hide_tray());
            assert!(reconcile(&inputs).actions.contains(&Action::HideTray));
        }
    }

    #[test]
    fn urgent_pending_notification_forces_the_tray_down() {
        let inputs = Inputs { queue_showable: true, head_urgent: true, ..open_tray() };
        assert_eq!(reconcile(&inputs).actions, vec![Action::HideTray, Action::HideDim]);

        let inputs = Inputs { queue_showable: true, ..open_tray() };
        assert!(reconcile(&inputs).is_empty());
    }

    #[test]
    fn in_flight_surfaces_are_left_alone() {
        let inputs = Inputs {
            tray: SurfaceState::Showing,
            dim: SurfaceState::Showing,
            keyboard_visible: true,
            banner: SurfaceState::Hiding,
            queue_showable: true,
            ..idle()
        };
        assert!(reconcile(&inputs).is_empty());
    }

    #[test]
    fn popup_needs_a_shown_tray() {
        let request = Some(target(1, PopupKind::Stack));
        let inputs = Inputs { popup_requested: request, tray: SurfaceState::Showing, tray_summoned: true, ..idle() };
        assert!(!inputs.popup_can_show());

        let inputs = Inputs { popup_requested: request, ..open_tray() };
        assert_eq!(reconcile(&inputs).actions, vec![Action::ShowPopup]);
    }

    #[test]
    fn popup_skips_empty_stacks_and_the_banner_source() {
        let request = Some(target(1, PopupKind::Stack));
        let inputs = Inputs { popup_requested: request, requested_stack_empty: true, ..open_tray() };
        assert!(reconcile(&inputs).is_empty());
        let inputs = Inputs { popup_requested: request, requested_source_on_banner: true, ..open_tray() };
        assert!(reconcile(&inputs).is_empty());
    }

    #[test]
    fn a_different_request_hides_the_popup_before_reshowing() {
        let inputs = Inputs {
            popup: SurfaceState::Shown,
            popup_shown: Some(target(1, PopupKind::Stack)),
            popup_requested: Some(target(1, PopupKind::Menu)),
            ..open_tray()
        };
        assert!(inputs.wrong_popup());
        let plan = reconcile(&inputs);
        assert_eq!(plan.actions, vec![Action::HidePopup]);
        assert!(plan.desired.popup);
    }

    #[test]
    fn clearing_the_request_hides_the_popup() {
        let inputs = Inputs {
            popup: SurfaceState::Shown,
            popup_shown: Some(target(1, PopupKind::Stack)),
            ..open_tray()
        };
        assert_eq!(reconcile(&inputs).actions, vec![Action::HidePopup]);
    }

    #[test]
    fn the_right_popup_stays() {
        let shown = Some(target(2, PopupKind::Stack));
        let inputs = Inputs { popup: SurfaceState::Shown, popup_shown: shown, popup_requested: shown, ..open_tray() };
        assert!(reconcile(&inputs).is_empty());
    }
}
