use std::str::FromStr;

use crate::error::SortError;

pub mod par_raw;
pub mod par_rayon;

/// A named, independently scheduled execution unit. It receives nothing but what its closure
/// captures.
pub struct Unit<'env, R> {
    pub name: String,
    pub task: Box<dyn FnOnce() -> R + Send + 'env>,
}

impl<'env, R> Unit<'env, R> {
    pub fn new(name: impl Into<String>, task: impl FnOnce() -> R + Send + 'env) -> Self {
        Self {
            name: name.into(),
            task: Box::new(task),
        }
    }
}

// Every unit blocks on the others, so each needs a thread of its own for the whole run. That
// rules out the work-stealing join schedulers: only backends that can dedicate a thread per unit
// are offered.
#[derive(PartialEq, Eq, Default, Clone, Copy, Debug)]
#[repr(u32)]
pub enum Scheduler {
    /// One scoped OS thread per unit.
    #[default]
    Raw = 0,
    /// A dedicated rayon pool with a thread per unit.
    Rayon = 1,
}

impl FromStr for Scheduler {
    type Err = String;

    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "rayon" => Ok(Self::Rayon),
            _ => Err(format!(
                "Unknown scheduler: '{s}', valid schedulers: 'raw', 'rayon'"
            )),
        }
    }
}

impl Scheduler {
    pub fn from(value: u32) -> Self {
        match value {
            0 => Scheduler::Raw,
            1 => Scheduler::Rayon,
            _ => panic!("invalid scheduler enum value: {value}"),
        }
    }

    /// Runs every unit concurrently and returns their results in unit order.
    ///
    /// If a unit cannot be started, `abort` is called so the units already running can unwind,
    /// and the spawn error is returned once they have.
    pub fn run_units<'env, R>(
        self,
        units: Vec<Unit<'env, R>>,
        abort: &(dyn Fn() + Sync),
    ) -> Result<Vec<R>, SortError>
    where
        R: Send + 'env,
    {
        crate::scope_print_major!("run_units");
        match self {
            Scheduler::Raw => par_raw::run_units(units, abort),
            Scheduler::Rayon => par_rayon::run_units(units, abort),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn parses_scheduler_names() {
        assert_eq!("raw".parse::<Scheduler>(), Ok(Scheduler::Raw));
        assert_eq!("rayon".parse::<Scheduler>(), Ok(Scheduler::Rayon));
        assert!("forte".parse::<Scheduler>().is_err());
        assert_eq!(Scheduler::from(Scheduler::Rayon as u32), Scheduler::Rayon);
    }

    // Units that all block on one another only finish if each got its own thread.
    fn all_units_run_concurrently(scheduler: Scheduler) {
        let count = 12;
        let barrier = Barrier::new(count);
        let units = (0..count)
            .map(|i| {
                let barrier = &barrier;
                Unit::new(format!("unit-{i}"), move || {
                    barrier.wait();
                    i * 2
                })
            })
            .collect();
        let results = scheduler.run_units(units, &|| ()).unwrap();
        assert_eq!(results, (0..count).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn raw_runs_units_concurrently() {
        all_units_run_concurrently(Scheduler::Raw);
    }

    #[test]
    fn rayon_runs_units_concurrently() {
        all_units_run_concurrently(Scheduler::Rayon);
    }

    #[test]
    fn panics_are_reported_per_unit() {
        for scheduler in [Scheduler::Raw, Scheduler::Rayon] {
            let units = vec![
                Unit::new("fine", || 1),
                Unit::new("broken", || -> i32 { panic!("unit failure") }),
            ];
            match scheduler.run_units(units, &|| ()) {
                Err(SortError::UnitPanicked { unit }) => assert_eq!(unit, "broken"),
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }
}
