use std::thread;

use crate::{error::SortError, par::Unit};

/// Spawns one named scoped thread per unit. The scope joins every thread before returning, so
/// no unit outlives the facilities it borrows.
pub fn run_units<'env, R>(
    units: Vec<Unit<'env, R>>,
    abort: &(dyn Fn() + Sync),
) -> Result<Vec<R>, SortError>
where
    R: Send + 'env,
{
    if units.is_empty() {
        return Ok(Vec::new());
    }

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(units.len());
        let mut spawn_error = None;
        for Unit { name, task } in units {
            match thread::Builder::new().name(name.clone()).spawn_scoped(s, task) {
                Ok(handle) => handles.push((name, handle)),
                Err(source) => {
                    abort();
                    spawn_error = Some(SortError::Spawn { unit: name, source });
                    break;
                }
            }
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut panicked = None;
        for (name, handle) in handles {
            match handle.join() {
                Ok(result) => results.push(result),
                Err(_) => {
                    panicked.get_or_insert(SortError::UnitPanicked { unit: name });
                }
            }
        }

        match (spawn_error, panicked) {
            (Some(err), _) | (None, Some(err)) => Err(err),
            (None, None) => Ok(results),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_run_units_preserves_order() {
        for unit_count in 1..24 {
            let ran = AtomicU32::new(0);
            let units = (0..unit_count)
                .map(|i| {
                    let ran = &ran;
                    Unit::new(format!("unit-{i}"), move || {
                        ran.fetch_add(1, Ordering::Relaxed);
                        i
                    })
                })
                .collect();
            let results = run_units(units, &|| ()).unwrap();
            assert_eq!(results, (0..unit_count).collect::<Vec<_>>());
            assert_eq!(ran.load(Ordering::Relaxed), unit_count as u32);
        }
    }

    #[test]
    fn test_thread_names_follow_units() {
        let units = vec![Unit::new("radix-worker-3", || {
            thread::current().name().map(str::to_owned)
        })];
        let results = run_units(units, &|| ()).unwrap();
        assert_eq!(results[0].as_deref(), Some("radix-worker-3"));
    }
}
