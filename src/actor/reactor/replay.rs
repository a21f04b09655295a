use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
#[cfg(test)]
use tempfile::NamedTempFile;
use tracing::warn;

use super::{Collaborators, Event, Reactor};
use crate::actor::broadcast::BroadcastEvent;
use crate::actor;
use crate::common::config::Config;
use crate::sys::pointer::SharedPointer;
use crate::sys::surface::HeadlessSurface;
use crate::sys::timer::ManualTimers;

/// Writes the config and then every event the reactor handles, one RON value
/// per line.
#[derive(Default)]
pub struct Record {
    file: Option<File>,
    #[cfg(test)]
    temp: Option<NamedTempFile>,
}

impl Record {
    pub fn new(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = path
            .map(|path| File::create(path).with_context(|| format!("creating {}", path.display())))
            .transpose()?;
        Ok(Self {
            file,
            #[cfg(test)]
            temp: None,
        })
    }

    #[cfg(test)]
    pub fn new_for_test(temp: NamedTempFile) -> Self { Self { file: None, temp: Some(temp) } }

    fn file(&mut self) -> Option<&mut File> {
        #[cfg(test)]
        return self.file.as_mut().or(self.temp.as_mut().map(|temp| temp.as_file_mut()));
        #[cfg(not(test))]
        self.file.as_mut()
    }

    pub(super) fn start(&mut self, config: &Config) { self.write_line(config) }

    pub(super) fn on_event(&mut self, event: &Event) { self.write_line(event) }

    /// A failed write stops the recording rather than the reactor.
    fn write_line(&mut self, value: &impl Serialize) {
        let Some(file) = self.file() else { return };
        let result = ron::ser::to_string(value)
            .map_err(anyhow::Error::from)
            .and_then(|line| writeln!(file, "{line}").map_err(anyhow::Error::from));
        if let Err(e) = result {
            warn!("stopping recording: {e}");
            self.file = None;
            #[cfg(test)]
            {
                self.temp = None;
            }
        }
    }
}

/// Feeds a recording back through a reactor with headless surfaces and
/// hand-driven timers. Everything the reactor broadcasts is passed to
/// `on_broadcast`.
pub fn replay(path: &Path, mut on_broadcast: impl FnMut(BroadcastEvent)) -> anyhow::Result<()> {
    let file = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let mut lines = file.lines();
    let config: Config = ron::de::from_str(&lines.next().context("empty record file")??)?;

    let pointer = SharedPointer::default();
    let collaborators = Collaborators {
        banner: Box::new(HeadlessSurface::new()),
        tray: Box::new(HeadlessSurface::new()),
        popup: Box::new(HeadlessSurface::new()),
        dim: Box::new(HeadlessSurface::new()),
        timers: Box::new(ManualTimers::new()),
        pointer: Box::new(pointer.clone()),
    };
    let (broadcast_tx, mut broadcast_rx) = actor::channel();
    let mut reactor = Reactor::new(config, collaborators, broadcast_tx, Record::default());

    for line in lines {
        let event: Event = ron::de::from_str(&line?)?;
        if let Event::PointerMoved(point) = &event {
            pointer.set(*point);
        }
        reactor.handle_event(event);
        for event in broadcast_rx.drain() {
            on_broadcast(event);
        }
    }
    Ok(())
}
