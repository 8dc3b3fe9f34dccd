use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use eg_walker::list::ListCRDT;
use trace_testdata::{find_editing_trace, load_editing_trace, EditingTrace};

fn apply_trace(trace: &EditingTrace) -> ListCRDT {
    let mut doc = ListCRDT::new(0);
    for edit in &trace.edits {
        if edit.is_insert {
            doc.local_insert(edit.pos, &edit.content);
        } else {
            doc.local_delete(edit.pos, 1);
        }
    }
    doc
}

fn local_edit_benchmarks(c: &mut Criterion) {
    let Some(path) = find_editing_trace() else {
        eprintln!("editing-trace.json not found; skipping trace benchmarks");
        return;
    };
    let trace = load_editing_trace(path);

    let mut group = c.benchmark_group("trace");
    group.throughput(Throughput::Elements(trace.edits.len() as u64));

    group.bench_function("apply_local", |b| {
        b.iter(|| {
            let doc = apply_trace(&trace);
            assert_eq!(doc.len(), trace.final_text.chars().count());
            black_box(doc.len());
        })
    });

    group.finish();
}

criterion_group!(benches, local_edit_benchmarks);
criterion_main!(benches);
