// benches/spectral_benchmarks.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spectral_zeta_engine::precision::{PrecisionCtx, Real};
use spectral_zeta_engine::special;
use spectral_zeta_engine::spectrum::{Operator, Spectrum};
use spectral_zeta_engine::tail::TailScheme;
use spectral_zeta_engine::{heat, zeta};

fn benchmark_spectral_sums(c: &mut Criterion) {
    let ctx = PrecisionCtx::new(40).unwrap();
    let sphere = Spectrum::on_sphere(Operator::ScalarLaplacian);

    c.bench_function("zeta_partial_2000_modes", |b| {
        let s = Real::from_i64(2, ctx);
        b.iter(|| zeta::zeta_partial(black_box(&sphere), black_box(&s), 2000));
    });

    c.bench_function("tail_scheme_400_terms", |b| {
        let scheme = TailScheme::for_spectrum(&sphere).unwrap();
        b.iter(|| scheme.evaluate(black_box(400), ctx).unwrap());
    });

    c.bench_function("heat_trace_t_tenth", |b| {
        let t = Real::from_ratio_i64(1, 10, ctx);
        b.iter(|| heat::heat_trace(black_box(&sphere), black_box(&t), true).unwrap());
    });
}

fn benchmark_special_functions(c: &mut Criterion) {
    let ctx = PrecisionCtx::new(60).unwrap();

    c.bench_function("bessel_k1_ascending_branch", |b| {
        let x = Real::from_ratio_i64(3, 2, ctx);
        b.iter(|| special::bessel_k1(black_box(&x)));
    });

    c.bench_function("bessel_k1_asymptotic_branch", |b| {
        let x = Real::from_i64(90, ctx);
        b.iter(|| special::bessel_k1(black_box(&x)));
    });

    c.bench_function("exp_unit_argument", |b| {
        let x = Real::one(ctx);
        b.iter(|| special::exp(black_box(&-&x)));
    });
}

criterion_group!(
    benches,
    benchmark_spectral_sums,
    benchmark_special_functions
);
criterion_main!(benches);
