use std::collections::HashMap;

pub use tp_lang::Scope;

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// Typed value carried inside an [`Event`] field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Number of concrete field scopes. Slots are ordered by AUTO lookup
/// priority: payload first, packet header last.
const SCOPE_COUNT: usize = 6;

fn scope_slot(scope: Scope) -> Option<usize> {
    match scope {
        Scope::Auto => None,
        Scope::Payload => Some(0),
        Scope::EventContext => Some(1),
        Scope::StreamContext => Some(2),
        Scope::EventHeader => Some(3),
        Scope::PacketContext => Some(4),
        Scope::PacketHeader => Some(5),
    }
}

/// An immutable snapshot of one decoded trace event.
///
/// Fields live in one of six scopes; lookup without an explicit scope walks
/// the scopes in AUTO order and returns the first hit.
#[derive(Debug, Clone)]
pub struct Event {
    pub timestamp: u64,
    pub name: String,
    pub cpu_id: u32,
    scopes: [HashMap<String, FieldValue>; SCOPE_COUNT],
}

impl Event {
    pub fn new(timestamp: u64, name: impl Into<String>, cpu_id: u32) -> Self {
        Self {
            timestamp,
            name: name.into(),
            cpu_id,
            scopes: Default::default(),
        }
    }

    /// Builder-style field insertion. `Scope::Auto` stores into the payload
    /// scope, for decoders that carry no scope information.
    pub fn with_field(mut self, scope: Scope, name: impl Into<String>, value: FieldValue) -> Self {
        self.set_field(scope, name, value);
        self
    }

    pub fn set_field(&mut self, scope: Scope, name: impl Into<String>, value: FieldValue) {
        let slot = scope_slot(scope).unwrap_or(0);
        self.scopes[slot].insert(name.into(), value);
    }

    /// AUTO lookup: first scope containing `name` wins.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.scopes.iter().find_map(|scope| scope.get(name))
    }

    /// Scoped lookup. `Scope::Auto` falls back to [`field`](Self::field);
    /// an explicit scope is searched exclusively.
    pub fn field_in_scope(&self, scope: Scope, name: &str) -> Option<&FieldValue> {
        match scope_slot(scope) {
            None => self.field(name),
            Some(slot) => self.scopes[slot].get(name),
        }
    }

    pub fn field_i64(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(FieldValue::as_i64)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_str)
    }
}

// ---------------------------------------------------------------------------
// Match context
// ---------------------------------------------------------------------------

/// Context a predicate is evaluated against: one event, borrowed.
///
/// End predicates are evaluated with two of these, the current event and the
/// period's begin snapshot.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub event: &'a Event,
}

impl<'a> MatchContext<'a> {
    pub fn new(event: &'a Event) -> Self {
        Self { event }
    }
}
