use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use method_query::generator::QueryGenerator;
use method_query::lexer::Lexer;
use method_query::parser::Parser;
use method_query::result::Argument;
use method_query::sql_compiler::{Dialect, SqlCompiler, Window};
use method_query::MethodCompiler;

const TEST_CASES: [(&str, &str); 3] = [
    ("simple", "findByName"),
    ("medium", "findByNameOrTitleAndAgeBetweenOrderByAgeDesc"),
    (
        "complex",
        "findByNotAddress_CityContainingIgnoreCaseAndStatusInOrOrangeIsNullAndBrandStartingWithOrAndersonNotLikeOrderByLastNameDescFirstName",
    ),
];

fn benchmark_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_performance");

    for (name, method) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("tokenize", name), &method, |b, &method| {
            b.iter(|| {
                let tokens: Vec<_> = Lexer::new(black_box(method)).collect();
                black_box(tokens)
            })
        });
    }

    group.finish();
}

fn benchmark_parser(c: &mut Criterion) {
    let parser = Parser::default();
    let mut group = c.benchmark_group("parser_performance");

    for (name, method) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("parse", name), &method, |b, &method| {
            b.iter(|| black_box(parser.parse(black_box(method)).expect("method should parse")))
        });
    }

    group.finish();
}

fn benchmark_generator(c: &mut Criterion) {
    let generator = QueryGenerator::default();
    let mut group = c.benchmark_group("generator_performance");

    for (name, method) in TEST_CASES {
        let tree = Parser::default().parse(method).expect("method should parse");
        group.bench_with_input(BenchmarkId::new("generate", name), &tree, |b, tree| {
            b.iter(|| black_box(generator.generate(&tree.predicate, "Person", Some(&tree.order))))
        });
    }

    group.finish();
}

fn benchmark_sql_lowering(c: &mut Criterion) {
    let compiler = MethodCompiler::new();
    let sql = SqlCompiler::new();
    let mut group = c.benchmark_group("sql_lowering");

    for (name, method) in TEST_CASES {
        let compiled = compiler.compile(method, "Person").expect("method should compile");
        let arguments: Vec<Argument> = compiled
            .parameters
            .iter()
            .map(|p| if p.collection { Argument::list(["a", "b"]) } else { Argument::value("a") })
            .collect();
        group.bench_with_input(BenchmarkId::new("postgres", name), &compiled, |b, compiled| {
            b.iter(|| {
                let select = sql
                    .select_statement(compiled, &arguments, &compiled.tree.order, Window::default())
                    .expect("arguments match the parameters");
                black_box(Dialect::Postgres.build(&select))
            })
        });
    }

    group.finish();
}

fn benchmark_end_to_end(c: &mut Criterion) {
    let compiler = MethodCompiler::new();
    let mut group = c.benchmark_group("end_to_end_performance");

    for (name, method) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("full_pipeline", name), &method, |b, &method| {
            b.iter(|| black_box(compiler.compile(black_box(method), "Person").expect("method should compile")))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_lexer,
    benchmark_parser,
    benchmark_generator,
    benchmark_sql_lowering,
    benchmark_end_to_end
);
criterion_main!(benches);
