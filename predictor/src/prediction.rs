use machine_learning::MlErr;

use crate::{Digit, Result, digit::NUM_CLASSES};

/// The loss measured at the end of an epoch. Epochs are counted from 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub epoch: usize,
    pub loss: f32,
}

/// The losses of the epochs of a training pass, in order.
pub type TrainingTrace = Vec<TracePoint>;

/// The most likely next digit, together with the probability of every digit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    predicted_class: Digit,
    class_probabilities: [f32; NUM_CLASSES],
}

impl Prediction {
    /// Creates a new `Prediction` out of a distribution over the digits.
    ///
    /// Ties are broken in favour of the lowest digit.
    ///
    /// # Returns
    /// The prediction or an error if `probs` doesn't hold exactly one entry per digit.
    pub fn from_distribution(probs: &[f32]) -> Result<Self> {
        let class_probabilities: [f32; NUM_CLASSES] =
            probs.try_into().map_err(|_| MlErr::SizeMismatch {
                what: "class probabilities",
                got: probs.len(),
                expected: NUM_CLASSES,
            })?;

        let mut best = 0;
        for (i, &p) in class_probabilities.iter().enumerate() {
            if p > class_probabilities[best] {
                best = i;
            }
        }

        Ok(Self {
            predicted_class: Digit::try_from(best)?,
            class_probabilities,
        })
    }

    /// Returns the most likely next digit.
    pub fn predicted_class(&self) -> Digit {
        self.predicted_class
    }

    /// Returns the probability of each digit, indexed by digit.
    pub fn class_probabilities(&self) -> &[f32; NUM_CLASSES] {
        &self.class_probabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_most_likely_digit() {
        let probs = [0.1, 0.1, 0.8, 0., 0., 0., 0., 0., 0., 0.];
        let prediction = Prediction::from_distribution(&probs).unwrap();

        assert_eq!(prediction.predicted_class().get(), 2);
        assert_eq!(prediction.class_probabilities(), &probs);
    }

    #[test]
    fn ties_go_to_the_lowest_digit() {
        let mut probs = [0.; NUM_CLASSES];
        probs[4] = 0.5;
        probs[7] = 0.5;

        let prediction = Prediction::from_distribution(&probs).unwrap();
        assert_eq!(prediction.predicted_class().get(), 4);

        let uniform = [0.1; NUM_CLASSES];
        let prediction = Prediction::from_distribution(&uniform).unwrap();
        assert_eq!(prediction.predicted_class().get(), 0);
    }

    #[test]
    fn needs_one_probability_per_digit() {
        assert!(Prediction::from_distribution(&[0.5, 0.5]).is_err());
        assert!(Prediction::from_distribution(&[0.; 11]).is_err());
    }
}
