#![forbid(unsafe_code)]
#![cfg(feature = "tracing")]

//! Span instrumentation of compile, layout and draw.
//!
//!   cargo test -p weft-template --features tracing --test tracing_tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

use weft_render::buffer::CellBuffer;
use weft_template::prelude::*;

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

/// Records every span created while installed.
struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields,
        });
    }
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedSpan>) {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCapture {
        spans: spans.clone(),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    let out = tracing::subscriber::with_default(subscriber, f);
    let captured = spans.lock().unwrap().clone();
    (out, captured)
}

fn names(spans: &[CapturedSpan]) -> Vec<&str> {
    spans.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn compile_emits_span() {
    let (result, spans) = capture(|| compile(col(["a", "b"])));
    assert!(result.is_ok());
    assert!(names(&spans).contains(&"template_compile"), "{spans:?}");
}

#[test]
fn failed_compile_still_spans() {
    let (result, spans) = capture(|| compile(Progress::new("text")));
    assert!(result.is_err());
    assert!(names(&spans).contains(&"template_compile"));
}

#[test]
fn execute_emits_layout_then_draw() {
    let items = Live::new(vec![0.25f64, 0.75]);
    let mut template =
        compile(ForEach::new(&items, |el: &Elem<f64>| Progress::new(el.ratio(|v| *v)))).unwrap();
    let mut buf = CellBuffer::new(20, 4);

    let ((), spans) = capture(|| template.execute(&mut buf, 20, 4));
    let names = names(&spans);
    let layout = names.iter().position(|n| *n == "template_layout");
    let draw = names.iter().position(|n| *n == "template_draw");
    assert!(layout.is_some(), "{names:?}");
    assert!(draw.is_some(), "{names:?}");
    assert!(layout < draw);

    let layout = spans.iter().find(|s| s.name == "template_layout").unwrap();
    assert_eq!(layout.fields.get("width").map(String::as_str), Some("20"));
    assert_eq!(layout.fields.get("height").map(String::as_str), Some("4"));
}

#[test]
fn draw_span_carries_frame_number() {
    let mut template = compile(Text::new("x")).unwrap();
    let mut buf = CellBuffer::new(4, 1);
    template.execute(&mut buf, 4, 1);

    let ((), spans) = capture(|| template.execute(&mut buf, 4, 1));
    let draw = spans.iter().find(|s| s.name == "template_draw").unwrap();
    assert_eq!(draw.fields.get("frame").map(String::as_str), Some("2"));
}
