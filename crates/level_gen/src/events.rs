//! Event types and sinks for observing level generation.
//!
//! This module defines [`GenerationEvent`] and a set of sinks and adapters to emit,
//! collect, or forward events while a [`crate::level::LevelGenerator`] builds a level.
use crate::carve::ClusterShape;
use crate::content::RoomType;
use crate::grid::Point;

/// Describes events emitted while generating a level.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// Emitted when generation of a level starts.
    LevelStarted {
        /// Requested level number.
        level_number: u32,
        /// Edge length of the square grid.
        grid_size: usize,
    },

    /// Emitted once the connection point chain has settled.
    ConnectionPointsGenerated {
        /// Ordered connection points, start first.
        points: Vec<Point>,
    },

    /// Emitted after the walkers of a cluster stopped and its grid was gathered.
    ClusterCarved {
        /// Cluster id.
        cluster: u64,
        /// Shape class that decided the walker setup.
        shape: ClusterShape,
        /// Number of carved interior cells.
        size: usize,
    },

    /// Emitted after a cluster's numbering was reconciled.
    ClusterReconciled {
        /// Cluster id.
        cluster: u64,
        /// Flagged dead ends after reconciliation.
        dead_ends: usize,
        /// Largest distance bordering the end connection point.
        main_path_length: i32,
    },

    /// Emitted when a room receives its content.
    RoomPlaced {
        /// Id of the owning cluster, `None` for connection point rooms.
        cluster: Option<u64>,
        /// Grid position of the room.
        point: Point,
        /// Type of the placed content.
        room_type: RoomType,
    },

    /// Emitted when a dead end replaces an unreachable End room.
    EndPromoted {
        /// Former End point, now a normal room.
        from: Point,
        /// Dead end promoted to End.
        to: Point,
    },

    /// Non-fatal warning generated during generation.
    Warning {
        /// Context string (e.g. cluster id, item id).
        context: String,
        /// Human-readable message.
        message: String,
    },

    /// Emitted when the level is complete.
    LevelFinished {
        /// Requested level number.
        level_number: u32,
        /// Number of rooms in the level.
        rooms: usize,
        /// Number of clusters in the level.
        clusters: usize,
    },
}

/// Discriminant of [`GenerationEvent`], used to filter before building an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationEventKind {
    LevelStarted,
    ConnectionPointsGenerated,
    ClusterCarved,
    ClusterReconciled,
    RoomPlaced,
    EndPromoted,
    Warning,
    LevelFinished,
}

impl GenerationEvent {
    pub fn kind(&self) -> GenerationEventKind {
        match self {
            GenerationEvent::LevelStarted { .. } => GenerationEventKind::LevelStarted,
            GenerationEvent::ConnectionPointsGenerated { .. } => {
                GenerationEventKind::ConnectionPointsGenerated
            }
            GenerationEvent::ClusterCarved { .. } => GenerationEventKind::ClusterCarved,
            GenerationEvent::ClusterReconciled { .. } => GenerationEventKind::ClusterReconciled,
            GenerationEvent::RoomPlaced { .. } => GenerationEventKind::RoomPlaced,
            GenerationEvent::EndPromoted { .. } => GenerationEventKind::EndPromoted,
            GenerationEvent::Warning { .. } => GenerationEventKind::Warning,
            GenerationEvent::LevelFinished { .. } => GenerationEventKind::LevelFinished,
        }
    }
}

/// A generic event sink that accepts [`GenerationEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: GenerationEvent);

    /// Whether events of `kind` should be built and sent at all.
    #[inline]
    fn wants(&self, _kind: GenerationEventKind) -> bool {
        true
    }

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = GenerationEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: GenerationEvent) {}

    #[inline]
    fn wants(&self, _kind: GenerationEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(GenerationEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(GenerationEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(GenerationEvent),
{
    #[inline]
    fn send(&mut self, event: GenerationEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects events in a `Vec`, optionally only some kinds.
#[derive(Default)]
pub struct VecSink {
    events: Vec<GenerationEvent>,
    only: Option<Vec<GenerationEventKind>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
            only: None,
        }
    }

    /// Collects only events of the given kinds.
    pub fn only(kinds: impl IntoIterator<Item = GenerationEventKind>) -> Self {
        Self {
            events: Vec::new(),
            only: Some(kinds.into_iter().collect()),
        }
    }

    pub fn into_inner(self) -> Vec<GenerationEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[GenerationEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of collected events of `kind`.
    pub fn count(&self, kind: GenerationEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: GenerationEvent) {
        if self.wants(event.kind()) {
            self.events.push(event);
        }
    }

    fn wants(&self, kind: GenerationEventKind) -> bool {
        self.only.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: GenerationEvent) {
        let kind = event.kind();
        let mut targets: Vec<usize> = (0..self.sinks.len())
            .filter(|i| self.sinks[*i].wants(kind))
            .collect();
        let Some(last) = targets.pop() else {
            return;
        };
        for i in targets {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last].send(event);
    }

    fn wants(&self, kind: GenerationEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}

/// Minimal adapter trait for types that can expose an [`EventSink`].
pub trait AsEventSink {
    fn as_event_sink(&mut self) -> &mut dyn EventSink;
}

impl AsEventSink for VecSink {
    fn as_event_sink(&mut self) -> &mut dyn EventSink {
        self
    }
}
