use criterion::*;
use zernike_recon::{Builder, FromBuilder, Reconstructor, SpotGeometry};

#[inline]
fn reconstruct(recon: &Reconstructor, raw_x: &[f64], raw_y: &[f64]) -> f64 {
    recon.update("bench", raw_x, raw_y).unwrap();
    recon.current_coefficients().coefficients[0]
}

fn raw_centroids(geometry: &SpotGeometry) -> (Vec<f64>, Vec<f64>) {
    let cal = std::iter::once((0f64, 0f64)).chain(geometry.positions().iter().map(|&p| p.into()));
    let input = cal.clone().map(|(x, y)| (x + 1e-2, y - 1e-2));
    cal.chain(input).unzip()
}

pub fn reconstruction_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruction");
    for n_side in [2usize, 8, 16, 32] {
        let geometry = SpotGeometry::square_grid_in_pupil(n_side);
        let recon = Reconstructor::builder()
            .spot_geometry(geometry.clone())
            .n_modes(20)
            .build()
            .unwrap();
        let (raw_x, raw_y) = raw_centroids(&geometry);
        group.bench_with_input(
            BenchmarkId::new("Update & convert", geometry.n_spots()),
            &n_side,
            |b, _| b.iter(|| reconstruct(&recon, black_box(&raw_x), black_box(&raw_y))),
        );
        group.bench_with_input(
            BenchmarkId::new("Setup", geometry.n_spots()),
            &n_side,
            |b, _| {
                b.iter(|| {
                    Reconstructor::builder()
                        .spot_geometry(geometry.clone())
                        .n_modes(20)
                        .build()
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, reconstruction_benchmark);
criterion_main!(benches);
