use std::{num::NonZeroUsize, sync::Arc};

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

use crate::{
    Configuration, Digit, ModelFactory, Prediction, PredictorErr, Result, TracePoint,
    TrainingEvent, TrainingTrace,
    classifier::{Classifier, ClassifierFactory},
};

/// The state shared between the trainer and its in-flight training pass.
struct Session {
    /// Bumped on every reset, a pass started under another generation is stale.
    generation: u64,
    /// `None` while a pass owns the model.
    model: Option<Box<dyn Classifier>>,
    sequence: Vec<Digit>,
    trace: TrainingTrace,
    committed_trace: TrainingTrace,
    prediction: Option<Prediction>,
    training: bool,
}

impl Session {
    fn new(model: Box<dyn Classifier>) -> Self {
        Self {
            generation: 0,
            model: Some(model),
            sequence: Vec::new(),
            trace: Vec::new(),
            committed_trace: Vec::new(),
            prediction: None,
            training: false,
        }
    }
}

/// Everything a training pass needs, moved into the blocking pool.
struct Pass {
    generation: u64,
    inputs: Vec<f32>,
    targets: Vec<usize>,
    epochs: NonZeroUsize,
    last: Digit,
}

/// How a training pass ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// The pass finished and its trace and prediction are now the session's.
    Committed(Prediction),
    /// The session was reset while training, the result was discarded.
    Superseded,
}

/// A handle to a training pass running in the background.
#[derive(Debug)]
pub struct Retraining {
    handle: JoinHandle<Result<Outcome>>,
}

impl Retraining {
    /// Waits until the training pass ends.
    ///
    /// # Returns
    /// How the pass ended, or the error that made it fail.
    pub async fn wait(self) -> Result<Outcome> {
        self.handle
            .await
            .map_err(|e| PredictorErr::TaskFailed(e.to_string()))?
    }
}

/// Retrains a classifier over the whole history of observed digits every time a new one
/// arrives, and predicts the digit that comes next.
pub struct IncrementalTrainer<F: ClassifierFactory = ModelFactory> {
    factory: F,
    config: Configuration,
    shared: Arc<Mutex<Session>>,
    events: Option<UnboundedSender<TrainingEvent>>,
}

impl IncrementalTrainer<ModelFactory> {
    /// Creates a new `IncrementalTrainer` with a recurrent classifier.
    ///
    /// # Arguments
    /// * `config` - The configuration of the classifier.
    ///
    /// # Returns
    /// A new trainer or a configuration error.
    pub fn new(config: Configuration) -> Result<Self> {
        Self::with_factory(ModelFactory, config)
    }
}

impl<F: ClassifierFactory> IncrementalTrainer<F> {
    /// Creates a new `IncrementalTrainer` that builds its classifiers through `factory`.
    pub fn with_factory(factory: F, config: Configuration) -> Result<Self> {
        config.validate()?;
        let model = factory.new_classifier(&config)?;

        Ok(Self {
            factory,
            config,
            shared: Arc::new(Mutex::new(Session::new(model))),
            events: None,
        })
    }

    /// Publishes the session's progress through `events`.
    pub fn with_events(mut self, events: UnboundedSender<TrainingEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Discards the model and everything observed, starting over with a new model.
    ///
    /// A pass in flight keeps running but its results are thrown away.
    ///
    /// # Returns
    /// A configuration error, in which case the session is left untouched.
    pub fn reconfigure(&mut self, config: Configuration) -> Result<()> {
        config.validate()?;
        let model = self.factory.new_classifier(&config)?;

        let mut session = self.shared.lock();
        if session.training {
            warn!(generation = session.generation; "discarding the training pass in flight");
        }

        session.generation += 1;
        session.model = Some(model);
        session.sequence.clear();
        session.trace.clear();
        session.committed_trace.clear();
        session.prediction = None;
        session.training = false;
        drop(session);

        info!(
            architecture:% = config.architecture,
            units = config.hidden_units.get(),
            epochs = config.epochs_per_step.get();
            "session reset"
        );

        self.config = config.clone();
        emit(self.events.as_ref(), TrainingEvent::Reset(config));
        Ok(())
    }

    /// Appends `digit` to the sequence and, once there are at least two digits, retrains the
    /// classifier over every adjacent pair in the background. Must be called within a tokio
    /// runtime.
    ///
    /// # Returns
    /// A handle to the training pass, `None` if there's nothing to train on yet, or an input
    /// error if a pass is still running, in which case the digit is not recorded.
    pub fn observe(&self, digit: Digit) -> Result<Option<Retraining>> {
        let mut session = self.shared.lock();
        if session.training {
            return Err(PredictorErr::TrainingInProgress);
        }

        let model = match session.model.take() {
            Some(model) => model,
            None => self.factory.new_classifier(&self.config)?,
        };

        session.sequence.push(digit);
        session.trace.clear();

        if session.sequence.len() < 2 {
            session.model = Some(model);
            return Ok(None);
        }

        let (inputs, targets): (Vec<f32>, Vec<usize>) = session
            .sequence
            .windows(2)
            .map(|w| (w[0].as_input(), w[1].index()))
            .unzip();

        session.training = true;
        let pass = Pass {
            generation: session.generation,
            inputs,
            targets,
            epochs: self.config.epochs_per_step,
            last: digit,
        };
        drop(session);

        debug!(pairs = pass.inputs.len(), digit = digit.get(); "starting a training pass");
        emit(
            self.events.as_ref(),
            TrainingEvent::Started {
                pairs: pass.inputs.len(),
                epochs: pass.epochs.get(),
            },
        );

        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            let generation = pass.generation;
            let pass_shared = Arc::clone(&shared);
            let pass_events = events.clone();

            let joined = tokio::task::spawn_blocking(move || {
                run_pass(model, pass, &pass_shared, pass_events.as_ref())
            })
            .await;

            settle(&shared, generation, joined, events.as_ref())
        });

        Ok(Some(Retraining { handle }))
    }

    /// Returns the digits observed since the last reset.
    pub fn sequence(&self) -> Vec<Digit> {
        self.shared.lock().sequence.clone()
    }

    /// Returns the prediction of the last successful pass, if any.
    pub fn prediction(&self) -> Option<Prediction> {
        self.shared.lock().prediction
    }

    /// Returns the losses of the current pass so far, or of the last one if none is running.
    pub fn trace(&self) -> TrainingTrace {
        self.shared.lock().trace.clone()
    }

    /// Returns whether a training pass is running.
    pub fn is_training(&self) -> bool {
        self.shared.lock().training
    }

    /// Returns the configuration the current model was built with.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }
}

/// Trains `model` over the pass' pairs and predicts what follows its last digit, publishing
/// every epoch's loss while the pass is current.
///
/// # Returns
/// The model, always, along with the prediction or the error that stopped the pass.
fn run_pass(
    mut model: Box<dyn Classifier>,
    pass: Pass,
    shared: &Mutex<Session>,
    events: Option<&UnboundedSender<TrainingEvent>>,
) -> (Box<dyn Classifier>, Result<Prediction>) {
    let Pass {
        generation,
        inputs,
        targets,
        epochs,
        last,
    } = pass;

    let mut on_epoch_end = |epoch: usize, loss: f32| {
        let point = TracePoint {
            epoch: epoch + 1,
            loss,
        };

        let mut session = shared.lock();
        if session.generation != generation {
            return;
        }

        session.trace.push(point);
        drop(session);

        info!(epoch = point.epoch, loss = loss; "epoch finished");
        emit(events, TrainingEvent::Epoch(point));
    };

    let result = model
        .fit(&inputs, &targets, epochs, &mut on_epoch_end)
        .and_then(|_| model.predict(last.as_input()))
        .and_then(|probs| Prediction::from_distribution(&probs));

    (model, result)
}

/// Commits the result of a finished pass unless the session moved on since it started.
fn settle(
    shared: &Mutex<Session>,
    generation: u64,
    joined: std::result::Result<(Box<dyn Classifier>, Result<Prediction>), tokio::task::JoinError>,
    events: Option<&UnboundedSender<TrainingEvent>>,
) -> Result<Outcome> {
    let mut session = shared.lock();
    if session.generation != generation {
        debug!(generation = generation; "discarding a superseded training pass");
        return Ok(Outcome::Superseded);
    }

    session.training = false;

    let (model, result) = match joined {
        Ok(finished) => finished,
        Err(e) => {
            // The model went down with the task, the next observation builds a new one.
            session.trace = session.committed_trace.clone();
            drop(session);

            warn!("training task failed: {e}");
            emit(events, TrainingEvent::Failed(e.to_string()));
            return Err(PredictorErr::TaskFailed(e.to_string()));
        }
    };

    match result {
        Ok(prediction) => {
            session.model = Some(model);
            session.committed_trace = session.trace.clone();
            session.prediction = Some(prediction);
            drop(session);

            info!(next:% = prediction.predicted_class(); "predicted the next digit");
            emit(events, TrainingEvent::Predicted(prediction));
            Ok(Outcome::Committed(prediction))
        }
        Err(e) => {
            // The weights may be left diverged, the next observation builds a new model.
            drop(model);
            session.trace = session.committed_trace.clone();
            drop(session);

            warn!("training pass failed: {e}");
            emit(events, TrainingEvent::Failed(e.to_string()));
            Err(e)
        }
    }
}

fn emit(events: Option<&UnboundedSender<TrainingEvent>>, event: TrainingEvent) {
    let Some(tx) = events else {
        return;
    };

    if tx.send(event).is_err() {
        debug!("nobody is listening for training events");
    }
}
