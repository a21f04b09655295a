use tracing::{debug, info, trace, warn};

use crate::actor::broadcast::BroadcastEvent;
use crate::actor::pressure_barrier::{
    BarrierError, BarrierHit, BarrierId, BarrierSpec, PressureBarrier, PressureOutcome,
};
use crate::actor::reactor::managers::PressureZone;
use crate::actor::reactor::{Reactor, ReactorError, TrayEventHandler};
use crate::common::config::{PressureZoneSettings, ZoneAction};

pub struct PressureEventHandler;

impl PressureEventHandler {
    /// Brings the zones in line with the config. Zones whose settings did
    /// not change keep their detector and any pressure built up on it; the
    /// others are rebuilt with the segments they had.
    pub fn sync_zones(reactor: &mut Reactor) {
        let zones = &mut reactor.pressure_manager.zones;
        let wanted = &reactor.config.pressure;
        zones.retain(|name, _| wanted.contains_key(name));

        for (name, settings) in wanted {
            if zones.get(name).is_some_and(|zone| zone.settings == *settings) {
                continue;
            }
            let specs = zones.remove(name).map(|zone| zone.specs).unwrap_or_default();
            match Self::build_zone(settings, specs) {
                Ok(zone) => {
                    debug!(zone = %name, action = ?settings.action, "pressure zone ready");
                    zones.insert(name.clone(), zone);
                }
                Err(e) => warn!(zone = %name, "disabling pressure zone: {e}"),
            }
        }
    }

    fn build_zone(
        settings: &PressureZoneSettings,
        specs: Vec<BarrierSpec>,
    ) -> Result<PressureZone, BarrierError> {
        let mut barrier = PressureBarrier::from_settings(settings)?;
        if settings.action == ZoneAction::OpenTray {
            // Pushes made while another client grabs the pointer (a drag,
            // an open menu) are not meant for the tray.
            barrier.set_event_filter(|hit| hit.grabbed);
        }
        for spec in &specs {
            barrier.add_barrier(*spec)?;
        }
        Ok(PressureZone { barrier, settings: settings.clone(), specs })
    }

    fn zone<'a>(reactor: &'a mut Reactor, name: &str) -> Result<&'a mut PressureZone, ReactorError> {
        reactor
            .pressure_manager
            .zones
            .get_mut(name)
            .ok_or_else(|| ReactorError::UnknownZone(name.to_string()))
    }

    pub fn handle_barriers_changed(
        reactor: &mut Reactor,
        name: &str,
        barriers: Vec<BarrierSpec>,
    ) -> Result<(), ReactorError> {
        let zone = Self::zone(reactor, name)?;
        if let Err(e) = zone.barrier.replace_barriers(&barriers) {
            warn!(zone = name, "keeping the previous barriers: {e}");
            return Err(e.into());
        }
        zone.specs = barriers;
        debug!(zone = name, count = zone.specs.len(), "barriers replaced");
        Ok(())
    }

    pub fn handle_barrier_hit(
        reactor: &mut Reactor,
        name: &str,
        barrier: BarrierId,
        hit: &BarrierHit,
    ) -> Result<(), ReactorError> {
        let mode = reactor.session.action_mode;
        let zone = Self::zone(reactor, name)?;
        let outcome = zone.barrier.on_hit(barrier, hit, mode)?;
        trace!(zone = name, ?outcome, "barrier hit");
        if outcome == PressureOutcome::Triggered {
            let action = zone.action();
            Self::trigger(reactor, name, action);
        }
        Ok(())
    }

    pub fn handle_barrier_left(reactor: &mut Reactor, name: &str) -> Result<(), ReactorError> {
        Self::zone(reactor, name)?.barrier.on_left();
        Ok(())
    }

    fn trigger(reactor: &mut Reactor, name: &str, action: ZoneAction) {
        info!(zone = name, ?action, "pressure barrier triggered");
        reactor.broadcast(BroadcastEvent::PressureTriggered { zone: name.to_string() });
        match action {
            ZoneAction::OpenTray => {
                if reactor.session.suppression.fullscreen {
                    debug!("not opening the tray over a fullscreen window");
                } else if !reactor.config.tray.barrier_enabled {
                    debug!("tray barrier disabled");
                } else {
                    TrayEventHandler::handle_open(reactor);
                }
            }
            ZoneAction::ToggleOverview => reactor.broadcast(BroadcastEvent::OverviewToggleRequested),
            ZoneAction::None => {}
        }
    }
}
