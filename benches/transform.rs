use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use trailing_breaks::{Fragment, Node, Schema, add_trailing_breaks, basic, remove_trailing_breaks};

/// A document of `size` blocks: every third paragraph empty, every fifth
/// ending in a hard break, the rest plain text, with a quote every tenth.
fn create_doc(schema: &Schema, size: usize) -> Node {
    let hard_break = schema.node("hard_break", None, Fragment::empty()).unwrap();
    let blocks: Vec<Node> = (0..size)
        .map(|i| {
            let paragraph = if i % 3 == 0 {
                schema.node("paragraph", None, Fragment::empty()).unwrap()
            } else if i % 5 == 0 {
                let text = schema.text("line").unwrap();
                schema
                    .node("paragraph", None, vec![text, hard_break.clone()])
                    .unwrap()
            } else {
                let text = schema.text(&format!("paragraph number {i}")).unwrap();
                schema.node("paragraph", None, text).unwrap()
            };
            if i % 10 == 0 {
                schema.node("blockquote", None, paragraph).unwrap()
            } else {
                paragraph
            }
        })
        .collect();
    schema.node("doc", None, blocks).unwrap()
}

/// Same shape, but no paragraph needs a marker.
fn create_settled_doc(schema: &Schema, size: usize) -> Node {
    let blocks: Vec<Node> = (0..size)
        .map(|i| {
            let text = schema.text(&format!("paragraph number {i}")).unwrap();
            schema.node("paragraph", None, text).unwrap()
        })
        .collect();
    schema.node("doc", None, blocks).unwrap()
}

fn bench_add(c: &mut Criterion) {
    let schema = basic::schema().unwrap();
    let mut group = c.benchmark_group("add_trailing_breaks");

    for size in [10usize, 100, 1_000, 10_000] {
        let doc = create_doc(&schema, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| black_box(add_trailing_breaks(doc)));
        });
    }

    group.finish();
}

fn bench_add_noop(c: &mut Criterion) {
    let schema = basic::schema().unwrap();
    let mut group = c.benchmark_group("add_trailing_breaks_noop");

    for size in [10usize, 100, 1_000, 10_000] {
        let doc = create_settled_doc(&schema, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| black_box(add_trailing_breaks(doc)));
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let schema = basic::schema().unwrap();
    let mut group = c.benchmark_group("remove_trailing_breaks");

    for size in [10usize, 100, 1_000, 10_000] {
        let doc = add_trailing_breaks(&create_doc(&schema, size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| black_box(remove_trailing_breaks(doc)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_add, bench_add_noop, bench_remove);
criterion_main!(benches);
