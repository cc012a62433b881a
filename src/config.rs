use argh::FromArgs;

use crate::{error::ArgError, par::Scheduler};

/// Radix sort of non-negative integers by `base` worker units and one coordinator.
#[derive(FromArgs, Debug)]
pub struct Args {
    /// scheduler running the units: 'raw' (default) or 'rayon'
    #[argh(option, default = "Scheduler::Raw")]
    pub scheduler: Scheduler,

    /// base, then the number of values, then the values themselves
    #[argh(positional, greedy)]
    pub args: Vec<String>,
}

/// Validated run parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortConfig {
    pub base: usize,
    pub values: Vec<u64>,
    pub scheduler: Scheduler,
}

impl Args {
    /// Checks `<base> <count> <value>...` and converts it. Fails before anything is allocated
    /// for the sort itself.
    pub fn into_config(self) -> Result<SortConfig, ArgError> {
        let [base, count, values @ ..] = self.args.as_slice() else {
            return Err(ArgError::NotEnoughArguments);
        };
        if values.is_empty() {
            return Err(ArgError::NotEnoughArguments);
        }

        let base: i64 = base.parse().map_err(|_| ArgError::BaseNotANumber)?;
        if base <= 1 {
            return Err(ArgError::BaseTooSmall);
        }
        let base = usize::try_from(base).map_err(|_| ArgError::BaseNotANumber)?;

        let count: i64 = count.parse().map_err(|_| ArgError::SizeNotANumber)?;
        if count <= 0 {
            return Err(ArgError::SizeNotPositive);
        }
        let count = usize::try_from(count).map_err(|_| ArgError::SizeNotANumber)?;
        if count != values.len() {
            return Err(ArgError::SizeMismatch {
                expected: count,
                actual: values.len(),
            });
        }

        let values = values
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let value: i64 = raw.parse().map_err(|_| ArgError::ValueNotANumber {
                    index,
                    value: raw.clone(),
                })?;
                if value < 0 {
                    return Err(ArgError::NegativeValue { index, value });
                }
                Ok(value as u64)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SortConfig {
            base,
            values,
            scheduler: self.scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<SortConfig, ArgError> {
        Args::from_args(&["phased_radix"], args)
            .expect("argh accepts any positional list")
            .into_config()
    }

    #[test]
    fn parses_a_valid_invocation() {
        let config = parse(&["10", "5", "54", "21", "32", "3", "10"]).unwrap();
        assert_eq!(config.base, 10);
        assert_eq!(config.values, vec![54, 21, 32, 3, 10]);
        assert_eq!(config.scheduler, Scheduler::Raw);
    }

    #[test]
    fn scheduler_option_comes_first() {
        let config = parse(&["--scheduler", "rayon", "2", "1", "0"]).unwrap();
        assert_eq!(config.scheduler, Scheduler::Rayon);
        assert!(
            Args::from_args(&["phased_radix"], &["--scheduler", "forte", "2", "1", "0"]).is_err()
        );
    }

    #[test]
    fn negative_values_reach_validation() {
        assert_eq!(
            parse(&["10", "2", "4", "-3"]),
            Err(ArgError::NegativeValue {
                index: 1,
                value: -3
            })
        );
    }

    #[test]
    fn reports_each_argument_error() {
        assert_eq!(parse(&[]), Err(ArgError::NotEnoughArguments));
        assert_eq!(parse(&["10", "1"]), Err(ArgError::NotEnoughArguments));
        assert_eq!(parse(&["ten", "1", "1"]), Err(ArgError::BaseNotANumber));
        assert_eq!(parse(&["1", "1", "1"]), Err(ArgError::BaseTooSmall));
        assert_eq!(parse(&["10", "x", "1"]), Err(ArgError::SizeNotANumber));
        assert_eq!(parse(&["10", "0", "1"]), Err(ArgError::SizeNotPositive));
        assert_eq!(
            parse(&["10", "3", "1", "2"]),
            Err(ArgError::SizeMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            parse(&["10", "2", "1", "2x"]),
            Err(ArgError::ValueNotANumber {
                index: 1,
                value: "2x".to_string()
            })
        );
        assert_eq!(
            parse(&["10", "1", "99999999999999999999"]),
            Err(ArgError::ValueNotANumber {
                index: 0,
                value: "99999999999999999999".to_string()
            })
        );
    }
}
