use std::hint::black_box;

use codspeed_criterion_compat::{
    BenchmarkId, Criterion, Throughput, criterion_group, criterion_main,
};
use text_size::TextSize;
use wattle_text::{SourceText, TextChange};

fn benchmark_parser(c: &mut Criterion) {
    let inputs = vec![
        ("Simple", "<greeting kind=\"warm\" />".to_string()),
        (
            "Medium",
            r#"
            <page title="report">
                <header level="1">Quarterly numbers</header>
                <section id="intro">
                    Some opening text with <em>emphasis</em> inside.
                </section>
                <section id="body">
                    <table rows="3" cols="4" />
                </section>
            </page>
            "#
            .to_string(),
        ),
        ("Deep", {
            let mut text = String::new();
            for _ in 0..64 {
                text.push_str("<layer kind=\"nested\">");
            }
            text.push_str("core");
            for _ in 0..64 {
                text.push_str("</layer>");
            }
            text
        }),
    ];

    let mut group = c.benchmark_group("Parser Benchmark");

    for (name, input) in &inputs {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", name), input, |b, input| {
            let text = SourceText::from(input.as_str());
            b.iter(|| black_box(wattle_parse::parse(&text, &[])));
        });
    }

    // One-character edit in the middle, reparsed incrementally.
    let (_, medium) = &inputs[1];
    let old_text = SourceText::from(medium.as_str());
    let old = wattle_parse::parse(&old_text, &[]);
    let offset = TextSize::new(medium.find("numbers").unwrap() as u32);
    let new_text = old_text.with_changes(&[TextChange::insert(offset, "x")]).unwrap();
    group.throughput(Throughput::Bytes(medium.len() as u64));
    group.bench_function("reparse_single_edit", |b| {
        b.iter(|| black_box(wattle_parse::reparse(&old, &new_text, &[])));
    });

    group.finish();
}

criterion_group!(benches, benchmark_parser);
criterion_main!(benches);
