//! # Events
//!
//! The recorded log is a flat sequence of events. An event's identity is
//! its position: the length of the log when it was appended.
//!
//! Three tags are understood by the history indices. Everything else is
//! content, carried as an opaque payload `P` and handed to whoever draws it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Position of an event in the log (0-based, never reused)
pub type EventIndex = usize;

/// One recorded action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<P> {
    /// Wall-clock time the action was recorded (milliseconds)
    pub time: f64,

    #[serde(flatten)]
    pub kind: EventKind<P>,
}

impl<P> Event<P> {
    pub fn new(time: f64, kind: EventKind<P>) -> Self {
        Self { time, kind }
    }

    pub fn goto(time: f64, target: EventIndex) -> Self {
        Self::new(time, EventKind::Goto(target))
    }

    pub fn mode_patch(time: f64, patch: ModePatch) -> Self {
        Self::new(time, EventKind::ModePatch(patch))
    }

    pub fn gesture_start(time: f64, payload: P) -> Self {
        Self::new(time, EventKind::GestureStart(payload))
    }

    pub fn stroke(time: f64, payload: P) -> Self {
        Self::new(time, EventKind::Stroke(payload))
    }

    pub fn gesture_end(time: f64, payload: P) -> Self {
        Self::new(time, EventKind::GestureEnd(payload))
    }
}

/// What an event does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "payload", rename_all = "kebab-case")]
pub enum EventKind<P> {
    /// Move the logical cursor to an earlier event index
    Goto(EventIndex),

    /// Change the active settings; never touches the raster
    ModePatch(ModePatch),

    /// Content that opens a gesture; an undo stop-point
    GestureStart(P),

    /// Content inside a gesture
    Stroke(P),

    /// Content that closes a gesture; a checkpoint opportunity
    GestureEnd(P),
}

impl<P> EventKind<P> {
    pub fn is_navigation(&self) -> bool {
        matches!(self, EventKind::Goto(_))
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, EventKind::GestureStart(_))
    }

    pub fn closes_gesture(&self) -> bool {
        matches!(self, EventKind::GestureEnd(_))
    }

    /// The payload forwarded to the content handler, if any
    pub fn content(&self) -> Option<&P> {
        match self {
            EventKind::GestureStart(p) | EventKind::Stroke(p) | EventKind::GestureEnd(p) => Some(p),
            EventKind::Goto(_) | EventKind::ModePatch(_) => None,
        }
    }

    /// Short name used in logs
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::Goto(_) => "goto",
            EventKind::ModePatch(_) => "mode-patch",
            EventKind::GestureStart(_) => "gesture-start",
            EventKind::Stroke(_) => "stroke",
            EventKind::GestureEnd(_) => "gesture-end",
        }
    }
}

/// Active settings (brush, tool, color...) as of some event index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mode(pub Map<String, Value>);

/// JSON merge patch (RFC 7386) applied to a [`Mode`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModePatch(pub Map<String, Value>);

impl Mode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Return a new mode with `patch` merged in
    pub fn patched(&self, patch: &ModePatch) -> Mode {
        let mut fields = self.0.clone();
        merge_object(&mut fields, &patch.0);
        Mode(fields)
    }
}

impl ModePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), Value::Null);
        self
    }
}

fn merge_object(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(inner) => {
                let slot = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(existing) = slot {
                    merge_object(existing, inner);
                }
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}
