use criterion::{Criterion, black_box, criterion_group, criterion_main};

use rust_fgsm::{Classifier, ParameterSet};

fn classifier() -> Classifier {
    let params = ParameterSet::new_with_seed([784, 128, 64, 32, 10], 0).expect("valid sizes");
    Classifier::from_parameters(params)
}

fn forward_bench(c: &mut Criterion) {
    let clf = classifier();
    let input = vec![0.1_f32; 784];

    c.bench_function("forward_784_128_64_32_10", |b| {
        b.iter(|| {
            let state = clf.forward(black_box(&input)).unwrap();
            black_box(state);
        })
    });
}

fn gradient_bench(c: &mut Criterion) {
    let clf = classifier();
    let input = vec![0.1_f32; 784];
    let state = clf.forward(&input).unwrap();

    c.bench_function("gradient_with_state_784_128_64_32_10", |b| {
        b.iter(|| {
            let d_x = clf.gradient_with_state(black_box(&state), 3).unwrap();
            black_box(d_x);
        })
    });
}

fn attack_bench(c: &mut Criterion) {
    let clf = classifier();
    let input = vec![0.1_f32; 784];

    c.bench_function("attack_784_128_64_32_10", |b| {
        b.iter(|| {
            let x_adv = clf.attack(black_box(&input), 3).unwrap();
            black_box(x_adv);
        })
    });
}

criterion_group!(benches, forward_bench, gradient_bench, attack_bench);
criterion_main!(benches);
