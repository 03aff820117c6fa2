use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizforge_core::parser::{parse_import, ImportFormat};

fn generate_json(n: usize) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"question": "Question {i}?", "answers": ["a{i}", "b{i}", "c{i}", "d{i}"], "correctAnswer": {}, "group": "G{}"}}"#,
                i % 4,
                i % 5
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

fn generate_csv(n: usize) -> String {
    let mut s = String::from("Question,A,B,C,D,Correct,Group\n");
    for i in 0..n {
        s.push_str(&format!(
            "\"Question {i}?\",a{i},b{i},c{i},d{i},{},G{}\n",
            ["A", "B", "C", "D"][i % 4],
            i % 5
        ));
    }
    s
}

fn generate_text(n: usize) -> String {
    let mut s = String::new();
    for i in 0..n {
        s.push_str(&format!(
            "Question {i}?\nA) a{i}\nB) b{i}\nC) c{i}\nD) d{i}\nCorrect: {}\nGroup: G{}\n\n",
            i % 4,
            i % 5
        ));
    }
    s
}

fn bench_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_import");

    for n in [10, 500] {
        let json = generate_json(n);
        let csv = generate_csv(n);
        let text = generate_text(n);

        group.bench_function(format!("json_{n}"), |b| {
            b.iter(|| parse_import(black_box(&json), ImportFormat::Json))
        });
        group.bench_function(format!("csv_{n}"), |b| {
            b.iter(|| parse_import(black_box(&csv), ImportFormat::Csv))
        });
        group.bench_function(format!("text_{n}"), |b| {
            b.iter(|| parse_import(black_box(&text), ImportFormat::Text))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_formats);
criterion_main!(benches);
