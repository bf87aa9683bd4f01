use std::{cell::RefCell, num::NonZeroUsize, rc::Rc};

use machine_learning::{
    MlErr,
    arch::{Model, Sequential, layers::Layer, loss::SparseCrossEntropy},
    dataset::Dataset,
    optimization::{Adam, GradientDescent},
    training::ModelTrainer,
};
use ndarray::array;
use rand::{SeedableRng, rngs::StdRng};

const CLASSES: usize = 10;

fn classifier(recurrent: Layer, units: usize) -> Sequential {
    let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(42)));
    let layers = [recurrent, Layer::dense((units, CLASSES)), Layer::softmax()];
    Sequential::initialized(layers, &rng).unwrap()
}

/// Successor pairs of the sequence `1, 2, 3, 1, 2, 3, ...`.
fn cyclic_pairs() -> Dataset {
    let seq: Vec<f32> = (0..12).map(|i| (i % 3 + 1) as f32).collect();
    let data = seq.windows(2).flat_map(|w| [w[0], w[1]]).collect();
    Dataset::new(data, 1, 1).unwrap()
}

fn fits_a_cycle(recurrent: Layer, units: usize) {
    let model = classifier(recurrent, units);
    let optimizer = Adam::with_learning_rate(model.size(), 0.05);
    let mut trainer = ModelTrainer::new(
        model,
        optimizer,
        SparseCrossEntropy::new(),
        NonZeroUsize::new(32).unwrap(),
        true,
        StdRng::seed_from_u64(1),
    );

    let mut seen = Vec::new();
    let losses = trainer
        .fit(
            &mut cyclic_pairs(),
            NonZeroUsize::new(200).unwrap(),
            |epoch, loss| seen.push((epoch, loss)),
        )
        .unwrap();

    assert_eq!(losses.len(), 200);
    assert_eq!(seen.len(), 200);
    assert_eq!(seen[0].0, 0);
    assert_eq!(seen[199], (199, losses[199]));
    assert!(losses[199] < losses[0]);

    let y = trainer.predict(array![[1.], [2.], [3.]].view()).unwrap();
    for (row, expected) in y.rows().into_iter().zip([2, 3, 1]) {
        let best = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(best, expected);
    }
}

#[test]
fn simple_rnn_learns_a_cycle() {
    fits_a_cycle(Layer::simple_rnn(1, 10), 10);
}

#[test]
fn lstm_learns_a_cycle() {
    fits_a_cycle(Layer::lstm(1, 10), 10);
}

#[test]
fn gru_learns_a_cycle() {
    fits_a_cycle(Layer::gru(1, 10), 10);
}

#[test]
fn a_single_epoch_reports_a_single_loss() {
    let model = classifier(Layer::lstm(1, 4), 4);
    let optimizer = Adam::with_learning_rate(model.size(), 0.001);
    let mut trainer = ModelTrainer::new(
        model,
        optimizer,
        SparseCrossEntropy::new(),
        NonZeroUsize::new(1).unwrap(),
        false,
        StdRng::seed_from_u64(1),
    );

    let losses = trainer
        .fit(&mut cyclic_pairs(), NonZeroUsize::MIN, |_, _| {})
        .unwrap();

    assert_eq!(losses.len(), 1);
    assert!(losses[0].is_finite() && losses[0] > 0.);
}

#[test]
fn exploding_updates_are_reported_as_divergence() {
    let model = classifier(Layer::simple_rnn(1, 4), 4);
    let mut trainer = ModelTrainer::new(
        model,
        GradientDescent::new(f32::INFINITY),
        SparseCrossEntropy::new(),
        NonZeroUsize::new(1).unwrap(),
        false,
        StdRng::seed_from_u64(1),
    );

    let result = trainer.fit(&mut cyclic_pairs(), NonZeroUsize::new(5).unwrap(), |_, _| {});
    assert!(matches!(result, Err(MlErr::Diverged { epoch: 1 })));
}
