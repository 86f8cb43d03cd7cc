use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pubweave_model::{Element, Node, RecordTypeTable, Schema};
use pubweave_overlay::{compute_overlays, OverlayEnv};

fn wide_document(paragraphs: usize) -> Element {
    let mut doc = Element::new("doc");
    for i in 0..paragraphs {
        doc = doc.with_child(Node::Element(
            Element::new("paragraph").with_child(Node::text(format!("paragraph number {}", i))),
        ));
        if i % 10 == 0 {
            doc = doc.with_child(Node::Element(
                Element::new("heading")
                    .with_attr("level", 2)
                    .with_child(Node::text("section")),
            ));
        }
    }
    doc
}

fn recompute_overlays(c: &mut Criterion) {
    let schema = Schema::default_document_schema().unwrap();
    let record_types = RecordTypeTable::from_types(vec![]).unwrap();
    let doc = wide_document(500);
    let env = OverlayEnv {
        parent_pub_id: "root",
        record_types: &record_types,
    };

    c.bench_function("recompute_overlays_500_blocks", |b| {
        b.iter(|| compute_overlays(black_box(&schema), black_box(&doc), black_box(&env)))
    });
}

criterion_group!(benches, recompute_overlays);
criterion_main!(benches);
