//! In-memory event capture for logging assertions
//!
//! [`TestCapture`] is both the subscriber layer and the handle tests query:
//! clones share one event buffer. All tests of a binary share the global
//! subscriber, so assertions filter by `op`, `event` and `table_id` instead
//! of relying on order.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use super::schema::{FIELD_COMPONENT, FIELD_ERR_CODE, FIELD_EVENT, FIELD_OP, FIELD_TABLE_ID};

/// One recorded event: its level and every field rendered as text
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn table_id(&self) -> Option<&str> {
        self.field(FIELD_TABLE_ID)
    }

    pub fn component(&self) -> Option<&str> {
        self.field(FIELD_COMPONENT)
    }

    pub fn err_code(&self) -> Option<&str> {
        self.field(FIELD_ERR_CODE)
    }

    fn is(&self, op: &str, event: &str) -> bool {
        self.op() == Some(op) && self.event() == Some(event)
    }
}

// Integers and bools fall through to `record_debug`, whose output matches `Display`
struct Fields<'a>(&'a mut BTreeMap<String, String>);

impl Visit for Fields<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

/// Shared event buffer, installable as a subscriber layer
#[derive(Clone, Default)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for TestCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut Fields(&mut fields));
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            fields,
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(captured);
        }
    }
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events of `op` named `event`, on any table
    pub fn find(&self, op: &str, event: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.is(op, event))
    }

    /// Events of `op` named `event` on `table_id`
    pub fn find_on(&self, op: &str, event: &str, table_id: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.is(op, event) && e.table_id() == Some(table_id))
    }

    pub fn count_events(&self, predicate: impl Fn(&CapturedEvent) -> bool) -> usize {
        self.matching(predicate).len()
    }

    /// # Panics
    ///
    /// Panics when no event of `op` named `event` was recorded
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        assert!(
            !self.find(op, event).is_empty(),
            "no {} event for op {} among {} captured",
            event,
            op,
            self.events().len()
        );
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn matching(&self, predicate: impl Fn(&CapturedEvent) -> bool) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| predicate(e)).cloned().collect())
            .unwrap_or_default()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture as the global subscriber once and return its handle
///
/// Do not combine with [`super::init`] in the same test binary.
///
/// ```
/// use sqlproxy_core::log_op_start;
/// use sqlproxy_core::logging_facility::init_test_capture;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_operation", "root");
/// assert_eq!(capture.find_on("doc_operation", "start", "root").len(), 1);
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let capture = TestCapture::default();
            tracing_subscriber::registry().with(capture.clone()).init();
            capture
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(op: &str, name: &str, table_id: &str) -> CapturedEvent {
        CapturedEvent {
            level: Level::INFO,
            fields: BTreeMap::from([
                (FIELD_OP.to_string(), op.to_string()),
                (FIELD_EVENT.to_string(), name.to_string()),
                (FIELD_TABLE_ID.to_string(), table_id.to_string()),
            ]),
        }
    }

    #[test]
    fn test_queries_filter_by_op_event_and_table() {
        let capture = TestCapture::default();
        capture.events.lock().unwrap().extend([
            event("drop", "start", "a"),
            event("drop", "end", "a"),
            event("drop", "end", "b"),
            event("create_map", "start", "a__1"),
        ]);

        assert_eq!(capture.find("drop", "end").len(), 2);
        assert_eq!(capture.find_on("drop", "end", "b").len(), 1);
        assert_eq!(capture.count_events(|e| e.table_id() == Some("a")), 2);
        assert_eq!(capture.events()[3].err_code(), None);

        capture.clear();
        assert!(capture.events().is_empty());
    }

    #[test]
    fn test_layer_records_every_field_as_text() {
        let capture = TestCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(op = "put", count = 3u64, ok = true, "written");
        });

        let events = capture.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::WARN);
        assert_eq!(events[0].op(), Some("put"));
        assert_eq!(events[0].field("count"), Some("3"));
        assert_eq!(events[0].field("ok"), Some("true"));
        assert_eq!(events[0].field("message"), Some("written"));
    }
}
