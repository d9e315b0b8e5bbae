use common::{ProductId, TransportType};
use criterion::{Criterion, criterion_group, criterion_main};
use logistics::geo::centroid;
use logistics::{CostCalculator, DistanceEstimator, GeoPoint, StaticCatalog, haversine_km};
use store::{InMemoryLogisticsStore, ProductLine, ReferenceData};

fn bench_haversine(c: &mut Criterion) {
    let caba = GeoPoint {
        lat: -34.6037,
        lon: -58.3816,
    };
    let cordoba = GeoPoint {
        lat: -31.4201,
        lon: -64.1888,
    };

    c.bench_function("geo/haversine", |b| {
        b.iter(|| haversine_km(std::hint::black_box(caba), std::hint::black_box(cordoba)));
    });
}

fn bench_centroid(c: &mut Criterion) {
    let points: Vec<GeoPoint> = (0..64)
        .map(|i| GeoPoint {
            lat: -34.0 + f64::from(i) * 0.01,
            lon: -58.0 - f64::from(i) * 0.01,
        })
        .collect();

    c.bench_function("geo/centroid_64", |b| {
        b.iter(|| centroid(std::hint::black_box(&points)));
    });
}

fn bench_distance_lookup(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryLogisticsStore::with_reference_data(&ReferenceData::builtin());
    let estimator = DistanceEstimator::new(store);

    c.bench_function("geo/distance_km_shared_postal_code", |b| {
        b.iter(|| rt.block_on(estimator.distance_km("B1708", "H3500ABC")));
    });
}

fn bench_quote(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryLogisticsStore::with_reference_data(&ReferenceData::builtin());
    let calculator = CostCalculator::new(DistanceEstimator::new(store), StaticCatalog::new());
    let lines: Vec<ProductLine> = (1..=5)
        .map(|id| ProductLine {
            product_id: ProductId::new(id),
            quantity: 2,
        })
        .collect();

    c.bench_function("cost/quote_5_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                calculator
                    .quote("X5000", Some(TransportType::Rail), &lines)
                    .await
                    .unwrap()
            })
        });
    });
}

criterion_group!(
    benches,
    bench_haversine,
    bench_centroid,
    bench_distance_lookup,
    bench_quote
);
criterion_main!(benches);
