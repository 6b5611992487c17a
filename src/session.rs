use crate::catalog::Catalog;
use crate::render::{render_model, Palette, RenderModel};
use crate::selection::{set_selection, SelectionState};
use crate::toggle::{toggle, ToggleState};
use crate::types::MarkerId;
use dashmap::DashMap;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Event {
    SelectionChanged(HashSet<String>),
    MarkerClicked(MarkerId),
}

/// One user's view of the map. Selection and toggles never affect each
/// other: deselecting a region leaves its toggled markers toggled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub selection: SelectionState,
    pub toggles: ToggleState,
}

impl Session {
    pub fn apply(self, event: Event) -> Session {
        match event {
            Event::SelectionChanged(regions) => Session {
                selection: set_selection(regions),
                toggles: self.toggles,
            },
            Event::MarkerClicked(marker_id) => Session {
                selection: self.selection,
                toggles: toggle(marker_id, self.toggles),
            },
        }
    }

    pub fn render(&self, catalog: &Catalog, palette: &Palette) -> RenderModel {
        render_model(catalog, &self.selection, &self.toggles, palette)
    }
}

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry {
    session: Session,
    last_seen: Instant,
}

/// Live sessions keyed by id. Nothing is shared between entries, and each
/// transition holds the entry's lock for its whole duration. A session that
/// has been idle for longer than the TTL behaves as if it never existed.
pub struct SessionStore {
    sessions: DashMap<Uuid, Entry>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn create(&self) -> Uuid {
        let now = Instant::now();
        self.expire_idle_at(now);

        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            Entry {
                session: Session::default(),
                last_seen: now,
            },
        );
        debug!(%id, "session created");
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<Session> {
        let now = Instant::now();
        let mut entry = self.live_entry(id, now)?;
        entry.last_seen = now;
        Some(entry.session.clone())
    }

    /// Applies `event` and returns the resulting snapshot, or `None` for an
    /// unknown or expired session.
    pub fn transition(&self, id: &Uuid, event: Event) -> Option<Session> {
        let now = Instant::now();
        let mut entry = self.live_entry(id, now)?;
        let current = std::mem::take(&mut entry.session);
        entry.session = current.apply(event);
        entry.last_seen = now;
        Some(entry.session.clone())
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(%id, "session discarded");
        }
        removed
    }

    pub fn expire_idle_at(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| !is_expired(entry.last_seen, now, self.ttl));
        let expired = before.saturating_sub(self.sessions.len());
        if expired > 0 {
            debug!(expired, "idle sessions discarded");
        }
        expired
    }

    pub fn expire_idle(&self) -> usize {
        self.expire_idle_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    fn live_entry(
        &self,
        id: &Uuid,
        now: Instant,
    ) -> Option<dashmap::mapref::one::RefMut<'_, Uuid, Entry>> {
        let entry = self.sessions.get_mut(id)?;
        if is_expired(entry.last_seen, now, self.ttl) {
            drop(entry);
            self.remove(id);
            return None;
        }
        Some(entry)
    }
}

fn is_expired(last_seen: Instant, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(last_seen) >= ttl
}
