use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use stage::mesh::obj;

// (n+1)^2 positions, n^2 quads sharing every interior corner
fn grid_source(n: usize) -> String {
    let mut source = String::new();
    for y in 0..=n {
        for x in 0..=n {
            source.push_str(&format!("v {}.5 {}.25 -{}.125\n", x, y, x + y));
            source.push_str(&format!("vt 0.{} 0.{}\n", x % 10, y % 10));
        }
    }
    source.push_str("vn 0 0 1\n");
    let at = |x: usize, y: usize| y * (n + 1) + x + 1;
    for y in 0..n {
        for x in 0..n {
            let (a, b, c, d) = (at(x, y), at(x + 1, y), at(x + 1, y + 1), at(x, y + 1));
            source.push_str(&format!("f {a}/{a}/1 {b}/{b}/1 {c}/{c}/1 {d}/{d}/1\n"));
        }
    }
    source
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Import grid");
    for n in [16, 64, 256] {
        let source = grid_source(n);
        group.bench_with_input(BenchmarkId::new("scan", n), &source, |bencher, source| {
            bencher.iter(|| std::hint::black_box(obj::scan(source)))
        });
        let raw = obj::scan(&source).unwrap();
        group.bench_with_input(BenchmarkId::new("deduplicate", n), &raw, |bencher, raw| {
            bencher.iter(|| std::hint::black_box(obj::deduplicate(raw)))
        });
        group.bench_with_input(BenchmarkId::new("import", n), &source, |bencher, source| {
            bencher.iter(|| std::hint::black_box(obj::import(source)))
        });
    }
    group.finish();

    let sources: Vec<String> = (0..8).map(|_| grid_source(64)).collect();
    c.bench_function("Import 8 grids in parallel", |bencher| {
        bencher.iter(|| std::hint::black_box(obj::import_all(&sources)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
