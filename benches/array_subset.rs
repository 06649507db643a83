use criterion::{
    criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration,
    Throughput,
};
use chunkarray::array_subset::ArraySubset;

fn array_subset_indices_iterator(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut group = c.benchmark_group("array_subset_indices_iterator");
    group.plot_config(plot_config);

    for array_subset_size in [8, 32, 128].iter() {
        let array_subset = ArraySubset::new_with_shape(vec![*array_subset_size; 3]);
        group.throughput(Throughput::Elements(array_subset.num_elements()));
        group.bench_function(BenchmarkId::new("iter", array_subset_size), |b| {
            b.iter(|| array_subset.iter_indices().for_each(|_| {}));
        });
    }
    group.finish();
}

fn array_subset_bytes(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut group = c.benchmark_group("array_subset_bytes");
    group.plot_config(plot_config);

    let array_shape = vec![256u64; 3];
    let bytes_array = vec![0u8; 256 * 256 * 256];
    let mut bytes_array_out = bytes_array.clone();
    for array_subset_size in [8, 32, 128].iter() {
        // Offset so the subset does not start on a contiguous boundary
        let array_subset =
            ArraySubset::new_with_start_shape(vec![5; 3], vec![*array_subset_size; 3]).unwrap();
        let bytes_subset = vec![1u8; array_subset.num_elements_usize()];
        group.throughput(Throughput::Bytes(array_subset.num_elements()));
        group.bench_function(BenchmarkId::new("extract", array_subset_size), |b| {
            b.iter(|| {
                array_subset
                    .extract_bytes(&bytes_array, &array_shape, 1)
                    .unwrap()
            });
        });
        group.bench_function(BenchmarkId::new("store", array_subset_size), |b| {
            b.iter(|| {
                array_subset
                    .store_bytes(&bytes_subset, &mut bytes_array_out, &array_shape, 1)
                    .unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, array_subset_indices_iterator, array_subset_bytes);
criterion_main!(benches);
