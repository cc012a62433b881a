use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::mpsc::channel,
};

use crate::{error::SortError, par::Unit};

/// Runs the units on a dedicated rayon pool with a thread for every unit, plus one for the
/// thread that owns the scope.
///
/// The global pool is never used: its size is unrelated to the unit count and blocked units
/// would starve each other on it.
pub fn run_units<'env, R>(
    units: Vec<Unit<'env, R>>,
    _abort: &(dyn Fn() + Sync),
) -> Result<Vec<R>, SortError>
where
    R: Send + 'env,
{
    if units.is_empty() {
        return Ok(Vec::new());
    }

    let len = units.len();
    let names: Vec<String> = units.iter().map(|u| u.name.clone()).collect();
    // Threads are started up front, so a spawn failure surfaces here before any unit runs.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(len + 1)
        .thread_name(|i| format!("phased-radix-pool-{i}"))
        .build()?;

    let (tx, rx) = channel();
    pool.scope(|s| {
        for (i, Unit { task, .. }) in units.into_iter().enumerate() {
            let tx = tx.clone();
            s.spawn(move |_| {
                let result = catch_unwind(AssertUnwindSafe(task));
                // The receiver outlives the scope, a lost send shows up as a missing result.
                let _ = tx.send((i, result));
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<R>> = (0..len).map(|_| None).collect();
    let mut panicked = None;
    for (i, result) in rx.iter() {
        match result {
            Ok(r) => slots[i] = Some(r),
            Err(_) => {
                panicked.get_or_insert(i);
            }
        }
    }
    if let Some(i) = panicked {
        return Err(SortError::UnitPanicked {
            unit: names[i].clone(),
        });
    }

    slots
        .into_iter()
        .zip(names)
        .map(|(slot, unit)| slot.ok_or(SortError::MissingResult { unit }))
        .collect()
}
