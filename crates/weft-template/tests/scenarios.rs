//! End-to-end compile, layout and draw scenarios.

use weft_core::geometry::Rect;
use weft_render::buffer::CellBuffer;
use weft_render::diff::DirtyRuns;
use weft_template::prelude::*;
use weft_template::{CompileError, bind};

fn render(template: &mut Template, w: u16, h: u16) -> CellBuffer {
    let mut buf = CellBuffer::new(w, h);
    template.execute(&mut buf, w, h);
    buf
}

fn rows(buf: &CellBuffer) -> Vec<String> {
    (0..buf.height()).map(|y| buf.row_text(y)).collect()
}

struct Cpu {
    name: String,
    load: f64,
}

struct Rack {
    cells: Vec<f64>,
}

fn grid(racks: &Live<Vec<Rack>>, width: u16) -> ForEach {
    ForEach::new(racks, move |rack: &Elem<Rack>| {
        ForEach::new(rack.items(|r: &Rack| r.cells.as_slice()), move |cell: &Elem<f64>| {
            Progress::new(cell.ratio(|v| *v)).width(width)
        })
    })
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_a_column_of_text() {
    let mut template = compile(col(["Hello", "World"])).unwrap();
    let buf = render(&mut template, 20, 4);
    assert!(buf.row_text(0).starts_with('H'));
    assert!(buf.row_text(1).starts_with('W'));
}

#[test]
fn scenario_b_for_each_over_static_strings() {
    let mut template = compile(ForEach::new(
        vec!["AAA", "BBB", "CCC"],
        |el: &Elem<&'static str>| Text::new(el.as_text()),
    ))
    .unwrap();
    let buf = render(&mut template, 10, 5);
    assert_eq!(rows(&buf)[..3], ["AAA", "BBB", "CCC"]);
    assert_eq!(template.stats().elements_drawn, 3);
}

#[test]
fn scenario_c_three_by_three_progress_grid() {
    let racks = Live::new(
        (0..3)
            .map(|_| Rack {
                cells: vec![0.25, 0.5, 1.0],
            })
            .collect::<Vec<_>>(),
    );
    let mut template = compile(grid(&racks, 8)).unwrap();
    assert_eq!(template.plan_name(), "grid");
    let buf = render(&mut template, 30, 5);
    for y in 0..3 {
        assert_eq!(buf.row_text(y), "██░░░░░░████░░░░████████");
    }
    assert_eq!(buf.row_text(3), "");
}

#[test]
fn scenario_d_row_gap() {
    let mut template = compile(row(["AAA", "BBB"]).gap(1)).unwrap();
    let buf = render(&mut template, 10, 1);
    assert_eq!(buf.get(4, 0).and_then(|c| c.content.as_char()), Some('B'));
    assert_eq!(buf.row_text(0), "AAA BBB");
}

#[test]
fn scenario_e_for_each_inherits_row_axis() {
    let mut template = compile(
        row([ForEach::new(vec![0.5f64, 0.5, 0.5], |el: &Elem<f64>| {
            Progress::new(el.ratio(|v| *v)).width(5)
        })])
        .gap(1),
    )
    .unwrap();
    let buf = render(&mut template, 20, 2);
    assert_eq!(buf.row_text(0), "██░░░██░░░██░░░");
    assert_eq!(buf.row_text(1), "");
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn static_leaves_land_on_their_rows() {
    for n in [1usize, 5, 12] {
        let labels: Vec<String> = (0..n).map(|i| format!("leaf {i}")).collect();
        let mut template = compile(col(labels.iter().map(String::as_str))).unwrap();
        let first = render(&mut template, 12, 16);
        for (i, label) in labels.iter().enumerate() {
            assert_eq!(&first.row_text(i as u16), label);
        }
        let second = render(&mut template, 12, 16);
        assert_eq!(first, second);
    }
}

#[test]
fn length_changes_without_recompiling() {
    let names = Live::new(vec![String::from("a")]);
    let mut template =
        compile(ForEach::new(&names, |el: &Elem<String>| Text::new(el.as_text()))).unwrap();
    let mut buf = CellBuffer::new(8, 6);

    for len in [1usize, 4, 0, 6, 2] {
        names.set((0..len).map(|i| format!("n{i}")).collect());
        template.execute(&mut buf, 8, 6);
        assert_eq!(template.stats().elements_drawn, len as u64);
        for y in 0..6u16 {
            let expected = if (y as usize) < len { format!("n{y}") } else { String::new() };
            assert_eq!(buf.row_text(y), expected);
        }
    }
}

#[test]
fn viewport_shows_a_window() {
    let items = Live::new((0..50).map(|i| format!("item {i}")).collect::<Vec<_>>());
    let mut template =
        compile(ForEach::new(&items, |el: &Elem<String>| Text::new(el.as_text()))).unwrap();
    template.viewport_offset = 10;
    template.viewport_height = 5;
    let buf = render(&mut template, 12, 8);
    assert_eq!(
        rows(&buf),
        vec!["item 10", "item 11", "item 12", "item 13", "item 14", "", "", ""]
    );
    assert_eq!(template.stats().elements_drawn, 5);
}

#[test]
fn viewport_past_the_end_clamps() {
    let items = Live::new(vec![String::from("x"); 3]);
    let mut template =
        compile(ForEach::new(&items, |el: &Elem<String>| Text::new(el.as_text()))).unwrap();
    template.viewport_offset = 2;
    template.viewport_height = 10;
    let buf = render(&mut template, 4, 4);
    assert_eq!(rows(&buf), vec!["x", "", "", ""]);

    template.viewport_offset = 99;
    let buf = render(&mut template, 4, 4);
    assert!(rows(&buf).iter().all(String::is_empty));
}

#[test]
fn execute_is_idempotent() {
    let cpus = Live::new(vec![
        Cpu { name: "cpu0".into(), load: 0.3 },
        Cpu { name: "cpu1".into(), load: 0.9 },
    ]);
    let mut template = compile(col([
        Widget::from(Text::new("load")),
        ForEach::new(&cpus, |cpu: &Elem<Cpu>| {
            row([
                Widget::from(Text::new(cpu.text(|c: &Cpu| c.name.as_str())).width(5)),
                Progress::new(cpu.ratio(|c: &Cpu| c.load)).width(10).into(),
            ])
        })
        .into(),
    ]))
    .unwrap();
    let mut buf = CellBuffer::new(20, 4);
    template.execute(&mut buf, 20, 4);
    let first = buf.clone();
    buf.clear_dirty();
    template.execute(&mut buf, 20, 4);
    assert!(buf.content_eq(&first));
    assert_eq!(buf.dirty_row_count(), 0);
    assert!(DirtyRuns::compute(&first, &buf).is_empty());
    assert_eq!(buf.row_text(1), "cpu0 ███░░░░░░░");
    assert_eq!(buf.row_text(2), "cpu1 █████████░");
}

#[test]
fn element_index_is_bindable() {
    let items = Live::new(vec!['a', 'b', 'c']);
    let mut template = compile(ForEach::new(&items, |el: &Elem<char>| {
        row([
            Widget::from(Text::new(el.index()).width(2)),
            Text::new(el.display(|c: &char| c.to_ascii_uppercase())).into(),
        ])
    }))
    .unwrap();
    let buf = render(&mut template, 6, 3);
    assert_eq!(rows(&buf), vec!["0 A", "1 B", "2 C"]);
}

#[test]
fn external_bindings_are_read_every_frame() {
    struct App {
        title: String,
        progress: f64,
    }
    let app = Live::new(App { title: "idle".into(), progress: 0.0 });
    let mut template = compile(col([
        Widget::from(Text::new(bind::text(&app, |a: &App| a.title.as_str()))),
        Progress::new(bind::ratio(&app, |a: &App| a.progress)).width(4).into(),
    ]))
    .unwrap();
    let mut buf = CellBuffer::new(8, 2);
    template.execute(&mut buf, 8, 2);
    assert_eq!(rows(&buf), vec!["idle", "░░░░"]);

    app.update(|a| {
        a.title = "busy".into();
        a.progress = 0.75;
    });
    template.execute(&mut buf, 8, 2);
    assert_eq!(rows(&buf), vec!["busy", "███░"]);
}

#[test]
fn uniform_and_variable_height_elements() {
    struct Entry {
        title: String,
        notes: Vec<String>,
    }
    let entries = Live::new(vec![
        Entry { title: "one".into(), notes: vec!["a".into()] },
        Entry { title: "two".into(), notes: vec![] },
        Entry { title: "three".into(), notes: vec!["b".into(), "c".into()] },
    ]);

    // Variable: each entry is its title plus one line per note, all sharing
    // the entry's left padding.
    let mut variable = compile(ForEach::new(&entries, |entry: &Elem<Entry>| {
        col([
            Widget::from(Text::new(entry.text(|e: &Entry| e.title.as_str()))),
            ForEach::new(entry.items(|e: &Entry| e.notes.as_slice()), |note: &Elem<String>| {
                Text::new(note.as_text())
            })
            .axis(Axis::Vertical)
            .into(),
        ])
        .padding(weft_core::geometry::Sides::new(0, 0, 0, 1))
    }))
    .unwrap();
    let buf = render(&mut variable, 10, 8);
    assert_eq!(
        rows(&buf),
        vec![" one", " a", " two", " three", " b", " c", "", ""]
    );

    // Uniform: every entry is exactly two rows.
    let mut uniform = compile(ForEach::new(&entries, |entry: &Elem<Entry>| {
        col([
            Widget::from(Text::new(entry.text(|e: &Entry| e.title.as_str())).width(5)),
            Progress::new(entry.ratio(|e: &Entry| e.notes.len() as f64 / 2.0)).width(2).into(),
        ])
    }))
    .unwrap();
    let buf = render(&mut uniform, 10, 8);
    assert_eq!(
        rows(&buf),
        vec!["one", "█░", "two", "░░", "three", "██", "", ""]
    );
}

#[test]
fn reallocated_collection_is_reread() {
    let items = Live::new(Vec::<String>::with_capacity(1));
    items.update(|v| v.push(String::from("first")));
    let mut template =
        compile(ForEach::new(&items, |el: &Elem<String>| Text::new(el.as_text()))).unwrap();
    let mut buf = CellBuffer::new(10, 40);
    template.execute(&mut buf, 10, 40);
    assert_eq!(buf.row_text(0), "first");

    // Grow far past capacity so the backing storage moves.
    items.update(|v| {
        v.extend((1..33).map(|i| format!("item {i}")));
        v.shrink_to_fit();
    });
    template.execute(&mut buf, 10, 40);
    assert_eq!(buf.row_text(0), "first");
    assert_eq!(buf.row_text(32), "item 32");
    assert_eq!(template.stats().elements_drawn, 33);

    // Replace the vector outright.
    items.set(vec![String::from("fresh")]);
    template.execute(&mut buf, 10, 40);
    assert_eq!(buf.row_text(0), "fresh");
    assert_eq!(buf.row_text(1), "");
}

#[test]
fn custom_widgets_draw_with_element_scope() {
    let values = Live::new(vec![3u16, 1, 4]);
    let mut template = compile(ForEach::new(&values, |_: &Elem<u16>| {
        Custom::new()
            .measure(|avail| weft_core::geometry::Size::new(avail.width.min(6), 1))
            .draw(|buf, area, scope| {
                let n = scope.get::<u16>().copied().unwrap_or(0);
                let stars = "*".repeat(usize::from(n));
                let text = format!("{}{stars}", scope.index());
                buf.write_str(area.x, area.y, &text, area.width, Default::default());
            })
    }))
    .unwrap();
    let buf = render(&mut template, 10, 3);
    assert_eq!(rows(&buf), vec!["0***", "1*", "2****"]);
}

#[test]
fn drawing_clips_to_area() {
    let mut template = compile(col(["abcdefgh", "ijklmnop", "qrstuvwx"])).unwrap();
    let mut buf = CellBuffer::new(10, 4);
    template.layout(10, 4);
    template.draw(&mut buf, Rect::new(2, 1, 4, 2));
    assert_eq!(rows(&buf), vec!["", "  abcd", "  ijkl", ""]);
}

#[test]
fn culling_skips_off_screen_elements() {
    let items = Live::new((0..1000).map(|i| i.to_string()).collect::<Vec<_>>());
    let mut template =
        compile(ForEach::new(&items, |el: &Elem<String>| Text::new(el.as_text()))).unwrap();
    let buf = render(&mut template, 6, 10);
    assert_eq!(buf.row_text(9), "9");
    assert_eq!(template.stats().elements_drawn, 10);
}

// ============================================================================
// Compile errors
// ============================================================================

#[test]
fn compile_errors_name_the_node() {
    let err = compile(col([ForEach::new("x", |_: &Elem<u8>| Text::new("y"))])).unwrap_err();
    assert_eq!(
        err,
        CompileError::NotACollection { path: "root/for_each[0]".into(), found: "static value" }
    );
    assert_eq!(
        err.to_string(),
        "root/for_each[0]: ForEach source must be a collection, found static value"
    );

    let err = compile(row([Text::new(vec![1u8])])).unwrap_err();
    assert!(matches!(err, CompileError::ExpectedValue { .. }));

    let err = compile(Progress::new("half")).unwrap_err();
    assert!(matches!(err, CompileError::KindMismatch { .. }));

    let err = compile(Custom::new().draw(|_, _, _| {})).unwrap_err();
    assert_eq!(err, CompileError::MissingCallback { path: "root".into(), callback: "measure" });

    let err = compile(ForEach::new(vec![1u64], |_: &Elem<u32>| Text::new("n"))).unwrap_err();
    assert!(matches!(err, CompileError::ElementTypeMismatch { collection: "u64", builder: "u32", .. }));
}

#[test]
fn fields_cannot_cross_element_boundaries() {
    let racks = Live::new(vec![Rack { cells: vec![0.5] }]);
    let err = compile(ForEach::new(&racks, |rack: &Elem<Rack>| {
        let count = rack.display(|r: &Rack| r.cells.len());
        ForEach::new(rack.items(|r: &Rack| r.cells.as_slice()), move |_: &Elem<f64>| {
            Text::new(count)
        })
    }))
    .unwrap_err();
    assert!(matches!(err, CompileError::ForeignElementField { .. }));
}
