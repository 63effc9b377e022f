//! Diagnostics collected while selecting contexts and synthesizing bodies.
//!
//! Body synthesis never fails on imprecise input; it degrades and leaves a note here
//! instead. The log is shared by every selector and interpreter of a
//! [`ReflectionEngine`](crate::ReflectionEngine) and can be inspected after an
//! analysis or ignored.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event
//! - [`EventLog`] - Append-only collection with query and summary helpers
//! - [`EventBuilder`] - Fluent API that records the event when dropped
//! - [`ReflectionStats`] - Counters derived from a log
//!
//! # Example
//!
//! ```rust,ignore
//! use reflectir::events::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ManySubtypes)
//!     .node(&node)
//!     .message("Cone(Lplugins/Plugin) expands to 11 types");
//!
//! assert_eq!(log.precision_warnings().count(), 1);
//! println!("{}", log.summary());
//! ```

use std::{collections::HashMap, fmt};

use tracing::warn;

use crate::{
    context::{CgNode, Context},
    types::MethodRef,
};

/// Categories of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    // Precision warnings
    /// A type cone had no concrete member.
    NoSubtypes,
    /// A type cone had more concrete members than the configured bound.
    ManySubtypes,
    /// A cone over `java.io.Serializable` was not expanded.
    IgnoredSerializable,

    // Engine activity
    /// A synthetic body was built and cached.
    BodySynthesized,
    /// A cached body was evicted.
    BodyInvalidated,
    /// A factory context learned a new type.
    TypeRecorded,
    /// A selector produced a context.
    ContextSelected,

    /// Informational message.
    Info,
    /// Warning (something unexpected but recoverable).
    Warning,
    /// Error (something failed).
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoSubtypes => "cone without subtypes",
            Self::ManySubtypes => "cone above bound",
            Self::IgnoredSerializable => "serializable cone ignored",
            Self::BodySynthesized => "body synthesized",
            Self::BodyInvalidated => "body invalidated",
            Self::TypeRecorded => "type recorded",
            Self::ContextSelected => "context selected",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns true for events that report lost analysis precision.
    #[must_use]
    pub fn is_precision_warning(&self) -> bool {
        matches!(
            self,
            Self::NoSubtypes | Self::ManySubtypes | Self::IgnoredSerializable
        )
    }

    /// Returns true if this is a diagnostic event (info/warning/error).
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// The method whose body or call site the event concerns.
    pub method: Option<MethodRef>,
    /// The context of that method, if any.
    pub context: Option<Context>,
    /// Human-readable description.
    pub message: String,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            method: None,
            context: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "[{}] {}: {}", self.kind, method, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the builder is
/// dropped; precision warnings are also emitted through `tracing::warn!` at that point.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    method: Option<MethodRef>,
    context: Option<Context>,
    message: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            method: None,
            context: None,
            message: None,
        }
    }

    /// Sets method and context from a call-graph node.
    pub fn node(mut self, node: &CgNode) -> Self {
        self.method = Some(node.method.clone());
        self.context = Some(node.context.clone());
        self
    }

    /// Sets only the method.
    pub fn method(mut self, method: &MethodRef) -> Self {
        self.method = Some(method.clone());
        self
    }

    /// Sets only the context.
    pub fn context(mut self, context: &Context) -> Self {
        self.context = Some(context.clone());
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        let event = Event {
            kind: self.kind,
            method: self.method.take(),
            context: self.context.take(),
            message,
        };

        if event.kind.is_precision_warning() {
            warn!(kind = %event.kind, method = ?event.method, "{}", event.message);
        }
        self.log.events.push(event);
    }
}

/// Collection of events from context selection and body synthesis.
///
/// Events can be appended concurrently from multiple threads through shared
/// references (`&self`).
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let new_log = Self::new();
        for (_, event) in &self.events {
            new_log.events.push(event.clone());
        }
        new_log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning message.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Records an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Error, message));
    }

    /// Appends clones of all events of `other`.
    pub fn merge(&self, other: &EventLog) {
        for (_, event) in &other.events {
            self.events.push(event.clone());
        }
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Returns an iterator over events for a specific method.
    pub fn filter_method<'a>(&'a self, method: &'a MethodRef) -> impl Iterator<Item = &'a Event> + 'a {
        self.iter().filter(move |e| e.method.as_ref() == Some(method))
    }

    /// Returns an iterator over events that report lost precision.
    pub fn precision_warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_precision_warning())
    }

    /// Returns an iterator over warning events.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for (_, event) in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Generates a human-readable summary of all events.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut counts: Vec<(EventKind, usize)> = self.count_by_kind().into_iter().collect();
        counts.sort();
        counts
            .iter()
            .map(|(kind, count)| format!("{count} {}", kind.description()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = Box<dyn Iterator<Item = &'a Event> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let log = Self::new();
        for event in iter {
            log.events.push(event);
        }
        log
    }
}

/// Counters derived from an [`EventLog`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectionStats {
    /// Bodies built.
    pub bodies_synthesized: usize,
    /// Cached bodies evicted by new factory types.
    pub bodies_invalidated: usize,
    /// New types recorded against factory contexts.
    pub types_recorded: usize,
    /// Contexts produced by selectors.
    pub contexts_selected: usize,
    /// Precision warnings of all kinds.
    pub precision_warnings: usize,
}

impl ReflectionStats {
    /// Computes statistics from an event log.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let counts = log.count_by_kind();
        let get = |kind: EventKind| counts.get(&kind).copied().unwrap_or(0);

        Self {
            bodies_synthesized: get(EventKind::BodySynthesized),
            bodies_invalidated: get(EventKind::BodyInvalidated),
            types_recorded: get(EventKind::TypeRecorded),
            contexts_selected: get(EventKind::ContextSelected),
            precision_warnings: get(EventKind::NoSubtypes)
                + get(EventKind::ManySubtypes)
                + get(EventKind::IgnoredSerializable),
        }
    }
}

impl fmt::Display for ReflectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bodies ({} invalidated), {} types recorded, {} contexts, {} precision warnings",
            self.bodies_synthesized,
            self.bodies_invalidated,
            self.types_recorded,
            self.contexts_selected,
            self.precision_warnings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::well_known;

    #[test]
    fn test_builder_records_on_drop() {
        let log = EventLog::new();
        let node = CgNode::new(well_known::class_new_instance(), Context::Everywhere);
        log.record(EventKind::NoSubtypes).node(&node).message("Cone(LA) is empty");
        log.record(EventKind::BodySynthesized).method(&node.method);
        log.info("done");

        assert_eq!(log.len(), 3);
        assert!(log.has(EventKind::NoSubtypes));
        assert_eq!(log.precision_warnings().count(), 1);
        assert_eq!(log.filter_method(&node.method).count(), 2);
        let synthesized = log.filter_kind(EventKind::BodySynthesized).next();
        assert_eq!(
            synthesized.map(|e| e.message.as_str()),
            Some("body synthesized")
        );
    }

    #[test]
    fn test_summary_and_stats() {
        let log = EventLog::new();
        assert_eq!(log.summary(), "no events");

        log.record(EventKind::BodySynthesized);
        log.record(EventKind::BodySynthesized);
        log.record(EventKind::ManySubtypes);
        assert_eq!(log.summary(), "1 cone above bound, 2 body synthesized");

        let stats = ReflectionStats::from_log(&log);
        assert_eq!(stats.bodies_synthesized, 2);
        assert_eq!(stats.precision_warnings, 1);
    }

    #[test]
    fn test_concurrent_appends() {
        let log = EventLog::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        log.record(EventKind::TypeRecorded);
                    }
                });
            }
        });
        assert_eq!(log.count_kind(EventKind::TypeRecorded), 100);
    }
}
