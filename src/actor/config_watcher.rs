use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;
use std::{fs, thread};

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, DebouncedEvent, DebouncedEventKind, new_debouncer};
use tracing::{debug, info, trace, warn};

use crate::actor::reactor::{self, Event};
use crate::common::collections::HashSet;
use crate::common::config::Config;

const DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches the config file and hands every successfully parsed change to
/// the reactor while hot reload is on.
pub struct ConfigWatcher {
    file: PathBuf,
    real_file: Option<PathBuf>,
    real_file_id: Option<(u64, u64)>,
    events_tx: reactor::Sender,
    enabled: bool,
}

impl ConfigWatcher {
    pub fn new(events_tx: reactor::Sender, config: &Config, config_path: PathBuf) -> Self {
        let real_file = fs::canonicalize(&config_path).ok();
        let real_file_id = real_file
            .as_ref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| (m.dev(), m.ino()));
        ConfigWatcher {
            file: config_path,
            real_file,
            real_file_id,
            events_tx,
            enabled: config.settings.hot_reload,
        }
    }

    pub fn spawn(self) -> std::io::Result<()> {
        thread::Builder::new().name("config-watcher".to_string()).spawn(move || {
            if let Err(e) = self.run() {
                warn!("config-watcher: error: {e:?}");
            }
        })?;
        Ok(())
    }

    fn run(mut self) -> notify::Result<()> {
        let (tx, rx) = mpsc::channel::<DebouncedEvent>();
        let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for e in events {
                    if e.kind == DebouncedEventKind::Any {
                        let _ = tx.send(e);
                    }
                }
            }
        })?;

        let mut parents: HashSet<PathBuf> = HashSet::default();
        if let Some(p) = self.file.parent() {
            parents.insert(p.to_path_buf());
        }
        if let Some(real) = &self.real_file
            && let Some(p) = real.parent()
        {
            parents.insert(p.to_path_buf());
        }
        for dir in &parents {
            debouncer.watcher().watch(dir, RecursiveMode::NonRecursive)?;
            info!("watching {:?}", dir);
        }

        while let Ok(event) = rx.recv() {
            if !self.is_relevant(&event) {
                continue;
            }
            trace!("change detected (debounced): {:?} {:?}", event.kind, event.path);
            if !self.reload() {
                break;
            }
        }
        Ok(())
    }

    /// Returns `false` once the reactor is gone.
    fn reload(&mut self) -> bool {
        let config = match Config::read(&self.file) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring config change: {e}");
                return true;
            }
        };
        let issues = config.validate();
        if !issues.is_empty() {
            warn!(?issues, "ignoring invalid config change");
            return true;
        }
        // Turning hot reload back on always goes through.
        let was_enabled = self.enabled;
        self.enabled = config.settings.hot_reload;
        if !was_enabled && !self.enabled {
            debug!("hot reload disabled, not applying change");
            return true;
        }
        info!("config reloaded");
        self.events_tx.try_send(Event::ConfigUpdated(Box::new(config))).is_ok()
    }

    fn is_relevant(&self, event: &DebouncedEvent) -> bool {
        if event.path == self.file {
            return true;
        }

        if let Some(real) = &self.real_file {
            if event.path == *real {
                return true;
            }

            if let Ok(ev_real) = fs::canonicalize(&event.path)
                && ev_real == *real
            {
                return true;
            }

            if let Ok(meta) = fs::metadata(&event.path)
                && let Some((dev, ino)) = self.real_file_id
                && meta.dev() == dev
                && meta.ino() == ino
            {
                return true;
            }
        }

        event.path.file_name().is_some_and(|n| Some(n) == self.file.file_name())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::actor;

    #[test]
    fn it_forwards_valid_changes_and_skips_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        let (tx, mut rx) = actor::channel();
        let mut watcher = ConfigWatcher::new(tx, &Config::default(), path.clone());

        fs::write(&path, "[settings]\nanimation_fps = 0.0\n").unwrap();
        assert!(watcher.reload());
        assert!(rx.drain().is_empty());

        fs::write(&path, "[settings\n").unwrap();
        assert!(watcher.reload());
        assert!(rx.drain().is_empty());

        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[tray]\nbarrier_enabled = false").unwrap();
        drop(file);
        assert!(watcher.reload());
        match rx.drain().as_slice() {
            [Event::ConfigUpdated(config)] => assert!(!config.tray.barrier_enabled),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn disabled_hot_reload_only_listens_for_reenabling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[settings]\nhot_reload = false\n").unwrap();
        let (tx, mut rx) = actor::channel();
        let config = Config::read(&path).unwrap();
        let mut watcher = ConfigWatcher::new(tx, &config, path.clone());

        fs::write(&path, "[settings]\nhot_reload = false\nanimate = false\n").unwrap();
        assert!(watcher.reload());
        assert!(rx.drain().is_empty());

        fs::write(&path, "[settings]\nhot_reload = true\n").unwrap();
        assert!(watcher.reload());
        assert_eq!(rx.drain().len(), 1);
    }

    #[test]
    fn matches_the_file_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        let (tx, _rx) = actor::channel();
        let watcher = ConfigWatcher::new(tx, &Config::default(), path.clone());
        let event = |path: PathBuf| DebouncedEvent { path, kind: DebouncedEventKind::Any };
        assert!(watcher.is_relevant(&event(path)));
        assert!(!watcher.is_relevant(&event(dir.path().join("other.toml"))));
    }
}
