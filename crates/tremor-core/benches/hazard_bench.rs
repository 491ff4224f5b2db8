// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Hazard Calculation Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for the exceedance hot path and a small
//! end-to-end classical calculation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tremor_core::{poe, HazardCalculator, Truncation};
use tremor_gmm::{GmmKind, GroundMotionModel};
use tremor_logictree::{Branch, BranchSet, GmmTree, LogicTree, SourceModel};
use tremor_source::{FaultGeometry, FaultSource, FloatingParams, Mfd, SeismicSource, SourceKind};
use tremor_types::{CalculationConfig, Imt, ImtLevels, Point, Site};

const ASC: &str = "Active Shallow Crust";

fn fault() -> SeismicSource {
    SeismicSource::new(
        "fault",
        ASC,
        SourceKind::SimpleFault(FaultSource {
            geometry: FaultGeometry::Simple {
                trace: vec![Point::surface(0.0, 0.0), Point::surface(0.0, 0.5)],
                upper_seismogenic_depth: 0.0,
                lower_seismogenic_depth: 15.0,
                dip: 60.0,
            },
            params: FloatingParams {
                rake: 90.0,
                mfd: Mfd::TruncatedGr {
                    a_val: 3.5,
                    b_val: 1.0,
                    min_mag: 5.0,
                    max_mag: 7.0,
                },
                msr: Default::default(),
                rupture_aspect_ratio: 1.5,
            },
        }),
    )
}

fn calculator(num_sites: u32) -> HazardCalculator {
    let sites = (0..num_sites)
        .map(|i| Site::new(i, 0.05 + 0.02 * i as f64, 0.25, 760.0))
        .collect();
    let levels = (0..20).map(|i| 0.005 * 1.4f64.powi(i)).collect();
    let config = CalculationConfig::new(
        sites,
        ImtLevels::new(vec![(Imt::Pga, levels)]).expect("levels"),
    );
    let models = BranchSet::new(
        "sm",
        vec![Branch::new("base", 1.0, SourceModel::new("base", vec![fault()]))],
    );
    let bjf: GroundMotionModel = GmmKind::BooreEtAl1997.into();
    let gmms = GmmTree::default().with_trt(
        ASC,
        BranchSet::new("gmm", vec![Branch::new("bjf97", 1.0, bjf)]),
    );
    HazardCalculator::new(config, LogicTree::new(models, gmms))
}

// ── exceedance::poe ─────────────────────────────────────────────────

fn bench_poe(c: &mut Criterion) {
    let t = Truncation::Symmetric(3.0);
    c.bench_function("poe_truncated", |b| {
        b.iter(|| poe(black_box(-2.0), black_box(-2.3), black_box(0.6), t))
    });
}

// ── HazardCalculator::run ───────────────────────────────────────────

fn bench_classical_10_sites(c: &mut Criterion) {
    let calc = calculator(10);
    c.bench_function("classical_fault_10sites", |b| b.iter(|| calc.run()));
}

criterion_group!(benches, bench_poe, bench_classical_10_sites);
criterion_main!(benches);
