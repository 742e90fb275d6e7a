use RustedExprDAG::symbolic::symbolic_engine::Expr;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

// a chain of `depth` nested functions of x
fn deep_subexpression(x: &Expr, depth: usize) -> Expr {
    (0..depth).fold(x.clone(), |acc, i| {
        if i % 2 == 0 { (&acc * 0.9 + 0.1).sin() } else { acc.square().atan() }
    })
}

// `width` terms, all using the same deep subexpression node
fn shared_dag(x: &Expr, y: &Expr, width: usize, depth: usize) -> Expr {
    let shared = deep_subexpression(x, depth);
    Expr::sum((0..width).map(|i| &(&shared * (i as f64 + 1.0)) * y))
}

// the same formula with the deep subexpression rebuilt for every term
fn unfolded_tree(x: &Expr, y: &Expr, width: usize, depth: usize) -> Expr {
    Expr::sum((0..width).map(|i| &(&deep_subexpression(x, depth) * (i as f64 + 1.0)) * y))
}

fn bench_evaluation(c: &mut Criterion) {
    let x = Expr::variable("x", 0.3);
    let y = Expr::variable("y", 1.7);
    let shared = shared_dag(&x, &y, 50, 40);
    let unfolded = unfolded_tree(&x, &y, 50, 40);
    let mut group = c.benchmark_group("evaluation");
    group.bench_function("shared DAG", |b| b.iter(|| black_box(&shared).evaluate()));
    group.bench_function("unfolded tree", |b| b.iter(|| black_box(&unfolded).evaluate()));
    group.finish();
}

fn bench_derivative(c: &mut Criterion) {
    let x = Expr::variable("x", 0.3);
    let y = Expr::variable("y", 1.7);
    c.bench_function("build and evaluate derivative", |b| {
        b.iter(|| {
            let f = shared_dag(&x, &y, 20, 20);
            black_box(f.derivative(&x).evaluate())
        })
    });
}

fn bench_share_common_subexpressions(c: &mut Criterion) {
    let x = Expr::variable("x", 0.3);
    let y = Expr::variable("y", 1.7);
    let unfolded = unfolded_tree(&x, &y, 20, 20);
    c.bench_function("share common subexpressions", |b| {
        b.iter(|| black_box(&unfolded).share_common_subexpressions())
    });
}

criterion_group!(
    benches,
    bench_evaluation,
    bench_derivative,
    bench_share_common_subexpressions
);
criterion_main!(benches);
