//! Wires loaders, navigation and rendering together.
//!
//! Every user intent goes through [`Controller::dispatch`]. Loads run on
//! worker threads and report back over a channel; [`Controller::pump`]
//! applies whatever has arrived. Each navigation bumps a generation counter
//! so a slow response for a record the user already left is dropped instead
//! of painting over the newer one.

use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};

use crate::{
    answer::Verdict,
    error::ViewerError,
    gallery::{self, ImageDisplayState},
    manifest::{load_manifest, ManifestEntry},
    nav::NavigationState,
    record::{load_record, Record},
    render::RecordView,
    source::Fetcher,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectFolder(String),
    SelectRecord(String),
    Step(isize),
    CheckAnswer(String),
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug)]
enum Completion {
    Manifest {
        generation: u64,
        result: Result<Vec<ManifestEntry>, ViewerError>,
    },
    Record {
        generation: u64,
        path: String,
        result: Result<Record, ViewerError>,
    },
    Image {
        generation: u64,
        index: usize,
        state: ImageDisplayState,
    },
}

pub struct Controller {
    fetcher: Arc<dyn Fetcher>,
    manifest_locator: String,
    image_base: String,
    phase: Phase,
    nav: Option<NavigationState>,
    view: Option<RecordView>,
    in_flight: Option<String>,
    generation: u64,
    pending: usize,
    renders: u64,
    last_loaded: Option<DateTime<Local>>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl Controller {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        manifest_locator: impl Into<String>,
        image_base: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            fetcher,
            manifest_locator: manifest_locator.into(),
            image_base: image_base.into(),
            phase: Phase::Loading,
            nav: None,
            view: None,
            in_flight: None,
            generation: 0,
            pending: 0,
            renders: 0,
            last_loaded: None,
            tx,
            rx,
        }
    }

    /// Kick off the manifest load. Call once after construction.
    pub fn start(&mut self) {
        self.request_manifest();
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn nav(&self) -> Option<&NavigationState> {
        self.nav.as_ref()
    }

    pub fn view(&self) -> Option<&RecordView> {
        self.view.as_ref()
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    /// Increments once per completed record render; the UI clears its answer input on change.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.pending == 0
    }

    pub fn resolve(&self, locator: &str) -> String {
        self.fetcher.resolve(locator)
    }

    /// Returns the verdict for `CheckAnswer`, `None` for everything else.
    pub fn dispatch(&mut self, action: Action) -> Option<Verdict> {
        tracing::debug!(?action, "dispatch");
        match action {
            Action::SelectFolder(folder) => {
                let Some(nav) = self.nav.as_mut() else {
                    return None;
                };
                let target = nav.select_folder(&folder).map(|e| e.json_path.clone());
                self.generation += 1;
                match target {
                    Some(path) => self.request_record(path),
                    None => {
                        // nothing to show for an empty folder
                        self.view = None;
                        self.in_flight = None;
                        self.phase = Phase::Ready;
                    }
                }
            }
            Action::SelectRecord(path) => {
                let target = self
                    .nav
                    .as_mut()
                    .and_then(|nav| nav.select_record(&path))
                    .map(|e| e.json_path.clone());
                if let Some(path) = target {
                    self.generation += 1;
                    self.request_record(path);
                }
            }
            Action::Step(offset) => {
                let target = self
                    .nav
                    .as_mut()
                    .and_then(|nav| nav.step(offset))
                    .map(|e| e.json_path.clone());
                if let Some(path) = target {
                    self.generation += 1;
                    self.request_record(path);
                }
            }
            Action::CheckAnswer(input) => {
                return self.view.as_mut().map(|v| v.answer.check(&input));
            }
            Action::Reload => {
                self.nav = None;
                self.view = None;
                self.in_flight = None;
                self.request_manifest();
            }
        }
        None
    }

    /// Apply every completion that has arrived. Returns whether anything changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(c) => {
                    self.pending = self.pending.saturating_sub(1);
                    self.apply(c);
                    changed = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Block until all outstanding work has reported back. `false` on timeout.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(c) => {
                    self.pending -= 1;
                    self.apply(c);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false
                }
            }
        }
        true
    }

    pub fn status_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(nav) = &self.nav {
            match (nav.position(), nav.folder()) {
                (Some(pos), Some(folder)) => {
                    parts.push(format!("{}/{} · {}", pos + 1, nav.len(), folder))
                }
                (None, Some(folder)) => parts.push(format!("0/0 · {}", folder)),
                _ => {}
            }
        }
        if let Some(path) = &self.in_flight {
            parts.push(format!("loading {}", path));
        } else if let Some(at) = self.last_loaded {
            parts.push(format!("loaded {}", at.format("%H:%M:%S")));
        }
        parts.join(" | ")
    }

    fn request_manifest(&mut self) {
        self.generation += 1;
        self.phase = Phase::Loading;
        let generation = self.generation;
        let fetcher = Arc::clone(&self.fetcher);
        let locator = self.manifest_locator.clone();
        let tx = self.tx.clone();
        self.pending += 1;
        thread::spawn(move || {
            let result = load_manifest(fetcher.as_ref(), &locator);
            let _ = tx.send(Completion::Manifest { generation, result });
        });
    }

    fn request_record(&mut self, path: String) {
        let generation = self.generation;
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        self.in_flight = Some(path.clone());
        self.pending += 1;
        thread::spawn(move || {
            let result = load_record(fetcher.as_ref(), &path);
            let _ = tx.send(Completion::Record {
                generation,
                path,
                result,
            });
        });
    }

    fn request_images(&mut self) {
        let Some(gallery) = self.view.as_ref().and_then(|v| v.gallery.as_ref()) else {
            return;
        };
        let paths: Vec<String> = gallery.slots.iter().map(|s| s.local_path.clone()).collect();
        for (index, path) in paths.into_iter().enumerate() {
            let generation = self.generation;
            let fetcher = Arc::clone(&self.fetcher);
            let tx = self.tx.clone();
            self.pending += 1;
            thread::spawn(move || {
                let state = gallery::classify(&path, fetcher.fetch(&path));
                let _ = tx.send(Completion::Image {
                    generation,
                    index,
                    state,
                });
            });
        }
    }

    /// Manifest failures leave nothing to browse; record failures keep the selectors and last view.
    fn fail(&mut self, e: ViewerError) {
        if e.is_fatal() {
            tracing::error!(error = %e, "manifest load failed");
            self.nav = None;
            self.view = None;
            self.phase = Phase::Error(format!("Init error: {}", e));
        } else {
            tracing::warn!(error = %e, "record load failed");
            self.phase = Phase::Error(e.to_string());
        }
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Manifest { generation, result } => {
                if generation != self.generation {
                    tracing::debug!(generation, "dropping stale manifest");
                    return;
                }
                match result {
                    Ok(entries) => {
                        let nav = NavigationState::new(entries);
                        let first = nav.folders().first().cloned();
                        self.nav = Some(nav);
                        self.phase = Phase::Ready;
                        if let Some(folder) = first {
                            self.dispatch(Action::SelectFolder(folder));
                        }
                    }
                    Err(e) => self.fail(e),
                }
            }
            Completion::Record {
                generation,
                path,
                result,
            } => {
                if generation != self.generation {
                    tracing::debug!(generation, %path, "dropping stale record");
                    return;
                }
                self.in_flight = None;
                match result {
                    Ok(record) => {
                        self.view = Some(RecordView::render(&path, &record, &self.image_base));
                        self.phase = Phase::Ready;
                        self.renders += 1;
                        self.last_loaded = Some(Local::now());
                        self.request_images();
                    }
                    Err(e) => self.fail(e),
                }
            }
            Completion::Image {
                generation,
                index,
                state,
            } => {
                if generation != self.generation {
                    return;
                }
                tracing::info!(index, ?state, "image resolved");
                if let Some(g) = self.view.as_mut().and_then(|v| v.gallery.as_mut()) {
                    g.resolve(index, state);
                }
            }
        }
    }
}
