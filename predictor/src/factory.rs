use std::{cell::RefCell, num::NonZeroUsize, rc::Rc};

use log::debug;
use machine_learning::{
    MlErr,
    arch::{Model, Sequential, layers::Layer, loss::SparseCrossEntropy},
    dataset::Dataset,
    optimization::Adam,
    training::ModelTrainer,
};
use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Architecture, Configuration, PredictorErr, Result,
    classifier::{Classifier, ClassifierFactory},
    digit::NUM_CLASSES,
};

/// Every timestep carries a single scalar.
const INPUT_WIDTH: usize = 1;

type Trainer = ModelTrainer<Sequential, Adam, SparseCrossEntropy, StdRng>;

/// Builds recurrent digit classifiers: a recurrent layer followed by a dense layer with a
/// softmax over the ten digits, trained with Adam against sparse cross-entropy.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelFactory;

impl ModelFactory {
    /// Returns a new `ModelFactory`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a freshly initialized classifier.
    ///
    /// # Arguments
    /// * `config` - The configuration of the classifier.
    ///
    /// # Returns
    /// The classifier or a configuration error.
    pub fn build(&self, config: &Configuration) -> Result<RecurrentClassifier> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let trainer_rng = StdRng::from_rng(&mut rng);
        let rng = Rc::new(RefCell::new(rng));

        let units = config.hidden_units.get();
        let recurrent = match config.architecture {
            Architecture::SimpleRnn => Layer::simple_rnn(INPUT_WIDTH, units),
            Architecture::Lstm => Layer::lstm(INPUT_WIDTH, units),
            Architecture::Gru => Layer::gru(INPUT_WIDTH, units),
        };
        let layers = [recurrent, Layer::dense((units, NUM_CLASSES)), Layer::softmax()];

        let model = initialize(layers, &rng)?;
        let optimizer = Adam::with_learning_rate(model.size(), config.learning_rate);

        debug!(
            architecture:% = config.architecture,
            units = units,
            params = model.size();
            "built a new classifier"
        );

        let trainer = ModelTrainer::new(
            model,
            optimizer,
            SparseCrossEntropy::new(),
            config.batch_size,
            config.shuffle,
            trainer_rng,
        );

        Ok(RecurrentClassifier { trainer })
    }
}

/// Samples the initial parameters of `layers`. Failing to do so means the layers can't be built
/// out of the configuration.
fn initialize<I>(layers: I, rng: &Rc<RefCell<StdRng>>) -> Result<Sequential>
where
    I: IntoIterator<Item = Layer>,
{
    Sequential::initialized(layers, rng)
        .map_err(|e| PredictorErr::InvalidConfig(format!("cannot build the model: {e}")))
}

impl ClassifierFactory for ModelFactory {
    fn new_classifier(&self, config: &Configuration) -> Result<Box<dyn Classifier>> {
        Ok(Box::new(self.build(config)?))
    }
}

/// A recurrent classifier that reads every input as a sequence of a single timestep.
pub struct RecurrentClassifier {
    trainer: Trainer,
}

impl RecurrentClassifier {
    /// Returns the current parameters of the underlying model.
    pub fn params(&self) -> &[f32] {
        self.trainer.model().params()
    }
}

impl Classifier for RecurrentClassifier {
    fn fit(
        &mut self,
        inputs: &[f32],
        targets: &[usize],
        epochs: NonZeroUsize,
        on_epoch_end: &mut dyn FnMut(usize, f32),
    ) -> Result<()> {
        if inputs.len() != targets.len() {
            return Err(MlErr::SizeMismatch {
                what: "targets",
                got: targets.len(),
                expected: inputs.len(),
            }
            .into());
        }

        let mut data = Vec::with_capacity(inputs.len() * (INPUT_WIDTH + 1));
        for (&x, &y) in inputs.iter().zip(targets) {
            if y >= NUM_CLASSES {
                return Err(MlErr::InvalidTarget {
                    class: y,
                    classes: NUM_CLASSES,
                }
                .into());
            }

            data.extend([x, y as f32]);
        }

        let mut dataset = Dataset::new(data, INPUT_WIDTH, 1)?;
        self.trainer.fit(&mut dataset, epochs, on_epoch_end)?;
        Ok(())
    }

    fn predict(&mut self, input: f32) -> Result<Vec<f32>> {
        let x = Array2::from_elem((1, INPUT_WIDTH), input);
        let y = self.trainer.predict(x.view())?;
        Ok(y.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, PredictorErr};

    fn config(architecture: Architecture) -> Configuration {
        Configuration::new(architecture, 6, 2).unwrap().with_seed(9)
    }

    #[test]
    fn untrained_models_predict_distributions() {
        for arch in [Architecture::SimpleRnn, Architecture::Lstm, Architecture::Gru] {
            let mut model = ModelFactory.build(&config(arch)).unwrap();

            for input in [0., 4.5, 9.] {
                let probs = model.predict(input).unwrap();
                assert_eq!(probs.len(), NUM_CLASSES);
                assert!((probs.iter().sum::<f32>() - 1.).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn seeded_builds_start_equal_but_train_apart() {
        let config = config(Architecture::Gru);
        let mut a = ModelFactory.build(&config).unwrap();
        let b = ModelFactory.build(&config).unwrap();
        assert_eq!(a.params(), b.params());

        a.fit(&[3.], &[7], NonZeroUsize::MIN, &mut |_, _| {}).unwrap();
        assert_ne!(a.params(), b.params());
    }

    #[test]
    fn unseeded_builds_differ() {
        let config = Configuration::new(Architecture::Lstm, 4, 1).unwrap();
        let a = ModelFactory.build(&config).unwrap();
        let b = ModelFactory.build(&config).unwrap();

        assert_ne!(a.params(), b.params());
    }

    #[test]
    fn fit_reports_every_epoch() {
        let mut model = ModelFactory.build(&config(Architecture::Lstm)).unwrap();
        let mut epochs = Vec::new();

        model
            .fit(
                &[3., 7.],
                &[7, 1],
                NonZeroUsize::new(4).unwrap(),
                &mut |epoch, loss| epochs.push((epoch, loss)),
            )
            .unwrap();

        let indices: Vec<_> = epochs.iter().map(|&(e, _)| e).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
        assert!(epochs.iter().all(|&(_, loss)| loss.is_finite()));
    }

    #[test]
    fn out_of_range_targets_are_rejected() {
        let mut model = ModelFactory.build(&config(Architecture::SimpleRnn)).unwrap();
        let err = model
            .fit(&[1.], &[10], NonZeroUsize::MIN, &mut |_, _| {})
            .unwrap_err();

        assert!(matches!(
            err,
            PredictorErr::Training(MlErr::InvalidTarget { class: 10, .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Training);
    }

    #[test]
    fn unbuildable_layers_are_a_configuration_error() {
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(0)));
        let err = initialize([Layer::dense((0, 0))], &rng).err().unwrap();

        assert!(matches!(err, PredictorErr::InvalidConfig(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn invalid_learning_rate_fails_the_build() {
        let mut config = config(Architecture::Lstm);
        config.learning_rate = 0.;

        let err = ModelFactory.build(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
