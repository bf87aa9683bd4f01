use std::{fmt, str::FromStr};

use crate::{PredictorErr, Result};

/// The amount of distinct digits, which is also the amount of classes a model predicts.
pub const NUM_CLASSES: usize = 10;

/// A single decimal digit, `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digit(u8);

impl Digit {
    /// Creates a new `Digit`.
    ///
    /// # Returns
    /// The digit or an input error if `value` is greater than 9.
    pub fn new(value: u8) -> Result<Self> {
        if usize::from(value) >= NUM_CLASSES {
            return Err(PredictorErr::InvalidDigit(value));
        }

        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Returns the class index of this digit.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Returns the digit as the scalar a model consumes.
    pub fn as_input(self) -> f32 {
        f32::from(self.0)
    }
}

impl TryFrom<u8> for Digit {
    type Error = PredictorErr;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<usize> for Digit {
    type Error = PredictorErr;

    fn try_from(value: usize) -> Result<Self> {
        let value = u8::try_from(value).unwrap_or(u8::MAX);
        Self::new(value)
    }
}

impl FromStr for Digit {
    type Err = PredictorErr;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let value = s
            .parse::<u8>()
            .map_err(|_| PredictorErr::InvalidCommand(s.to_string()))?;

        Self::new(value)
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_single_digits_are_accepted() {
        for value in 0..=9u8 {
            assert_eq!(Digit::try_from(value).unwrap().get(), value);
        }

        assert!(matches!(Digit::new(10), Err(PredictorErr::InvalidDigit(10))));
        assert!(Digit::try_from(300usize).is_err());
    }

    #[test]
    fn parses_from_text() {
        assert_eq!("7".parse::<Digit>().unwrap(), Digit::new(7).unwrap());
        assert_eq!(" 0\n".parse::<Digit>().unwrap().index(), 0);
        assert!(matches!(
            "12".parse::<Digit>(),
            Err(PredictorErr::InvalidDigit(12))
        ));
        assert!(matches!(
            "seven".parse::<Digit>(),
            Err(PredictorErr::InvalidCommand(_))
        ));
    }
}
