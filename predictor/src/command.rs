use std::{num::NonZeroUsize, str::FromStr};

use crate::{Architecture, Configuration, Digit, PredictorErr, Result};

/// A line of input of the terminal driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Observe(Digit),
    Architecture(Architecture),
    Units(NonZeroUsize),
    Epochs(NonZeroUsize),
    Show,
    Quit,
}

impl Command {
    /// Returns the configuration this command asks for, or `None` if it doesn't change the
    /// configuration.
    pub fn reconfigured(&self, current: &Configuration) -> Option<Configuration> {
        let mut config = current.clone();

        match *self {
            Self::Architecture(architecture) => config.architecture = architecture,
            Self::Units(units) => config.hidden_units = units,
            Self::Epochs(epochs) => config.epochs_per_step = epochs,
            Self::Observe(_) | Self::Show | Self::Quit => return None,
        }

        Some(config)
    }
}

fn positive(name: &str, arg: Option<&str>) -> Result<NonZeroUsize> {
    arg.and_then(|arg| arg.parse().ok())
        .ok_or_else(|| PredictorErr::InvalidConfig(format!("{name} must be a positive integer")))
}

impl FromStr for Command {
    type Err = PredictorErr;

    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let Some(head) = words.next() else {
            return Err(PredictorErr::InvalidCommand(String::new()));
        };
        let arg = words.next();

        if words.next().is_some() {
            return Err(PredictorErr::InvalidCommand(s.trim().to_string()));
        }

        match (head.to_ascii_lowercase().as_str(), arg) {
            ("show", None) => Ok(Self::Show),
            ("quit" | "exit", None) => Ok(Self::Quit),
            ("arch", Some(arg)) => Ok(Self::Architecture(arg.parse()?)),
            ("units", arg) => Ok(Self::Units(positive("units", arg)?)),
            ("epochs", arg) => Ok(Self::Epochs(positive("epochs", arg)?)),
            (_, None) => Ok(Self::Observe(head.parse()?)),
            _ => Err(PredictorErr::InvalidCommand(s.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn parses_every_command() {
        assert_eq!(
            "4".parse::<Command>().unwrap(),
            Command::Observe(Digit::new(4).unwrap())
        );
        assert_eq!(
            "arch gru".parse::<Command>().unwrap(),
            Command::Architecture(Architecture::Gru)
        );
        assert_eq!(
            "units 16".parse::<Command>().unwrap(),
            Command::Units(NonZeroUsize::new(16).unwrap())
        );
        assert_eq!(
            "  epochs 3 ".parse::<Command>().unwrap(),
            Command::Epochs(NonZeroUsize::new(3).unwrap())
        );
        assert_eq!("SHOW".parse::<Command>().unwrap(), Command::Show);
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn bad_input_is_classified() {
        let kind = |s: &str| s.parse::<Command>().unwrap_err().kind();

        assert_eq!(kind("units 0"), ErrorKind::Configuration);
        assert_eq!(kind("epochs"), ErrorKind::Configuration);
        assert_eq!(kind("arch cnn"), ErrorKind::Configuration);
        assert_eq!(kind("10"), ErrorKind::Input);
        assert_eq!(kind("hello"), ErrorKind::Input);
        assert_eq!(kind("show me"), ErrorKind::Input);
        assert_eq!(kind(""), ErrorKind::Input);
    }

    #[test]
    fn only_settings_reconfigure() {
        let current = Configuration::default();
        let units = NonZeroUsize::new(3).unwrap();

        let config = Command::Units(units).reconfigured(&current).unwrap();
        assert_eq!(config.hidden_units, units);
        assert_eq!(config.architecture, current.architecture);

        let config = Command::Architecture(Architecture::Gru)
            .reconfigured(&current)
            .unwrap();
        assert_eq!(config.architecture, Architecture::Gru);

        assert!(Command::Show.reconfigured(&current).is_none());
        assert!(
            Command::Observe(Digit::new(1).unwrap())
                .reconfigured(&current)
                .is_none()
        );
    }
}
