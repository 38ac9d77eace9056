//! Pipeline state walker
//!
//! Visits a runtime's step states in index order and picks out the steps
//! whose carrier slot is in use. Stateless steps (`None`) and steps without
//! a carrier slot are skipped.

use fitvault_core::domain::carrier::Carrier;
use fitvault_core::domain::step::{CarrierSlot, StepState};

/// `(index, carrier)` for every step holding an attached carrier
///
/// Lazy and side-effect free; call again to restart.
pub fn model_steps(steps: &[Option<StepState>]) -> impl Iterator<Item = (usize, &Carrier)> + '_ {
    steps
        .iter()
        .enumerate()
        .filter_map(|(idx, step)| step.as_ref().and_then(StepState::carrier).map(|c| (idx, c)))
}

/// Indices of steps whose carrier slot is a placeholder
pub fn placeholder_steps(steps: &[Option<StepState>]) -> Vec<usize> {
    steps
        .iter()
        .enumerate()
        .filter(|(_, step)| step.as_ref().is_some_and(StepState::is_placeholder))
        .map(|(idx, _)| idx)
        .collect()
}

/// Calls `visit` on the slot of every step holding an attached carrier,
/// in index order; the first error stops the walk
pub fn for_each_model_step_mut<E, F>(steps: &mut [Option<StepState>], mut visit: F) -> Result<(), E>
where
    F: FnMut(usize, &mut CarrierSlot) -> Result<(), E>,
{
    for (idx, step) in steps.iter_mut().enumerate() {
        let Some(slot) = step.as_mut().and_then(|s| s.carrier.as_mut()) else {
            continue;
        };
        if matches!(slot, CarrierSlot::Attached(_)) {
            visit(idx, slot)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps() -> Vec<Option<StepState>> {
        vec![
            None,
            Some(StepState::new().with_value("mean", vec![0.0])),
            Some(StepState::new().with_carrier(Carrier::new("a.AutoEncoder"))),
            Some(StepState {
                carrier: Some(CarrierSlot::Placeholder),
                ..StepState::default()
            }),
            Some(StepState::new().with_carrier(Carrier::new("a.VAE"))),
        ]
    }

    #[test]
    fn test_model_steps_in_order() {
        let steps = steps();
        let found: Vec<(usize, &str)> = model_steps(&steps).map(|(i, c)| (i, c.type_name())).collect();
        assert_eq!(found, vec![(2, "AutoEncoder"), (4, "VAE")]);

        // Restartable
        assert_eq!(model_steps(&steps).count(), 2);
    }

    #[test]
    fn test_placeholder_steps() {
        assert_eq!(placeholder_steps(&steps()), vec![3]);
    }

    #[test]
    fn test_mutating_walk_stops_on_error() {
        let mut steps = steps();
        let mut visited = Vec::new();

        let result: Result<(), String> = for_each_model_step_mut(&mut steps, |idx, slot| {
            visited.push(idx);
            *slot = CarrierSlot::Placeholder;
            Err(format!("stop at {}", idx))
        });

        assert_eq!(result, Err("stop at 2".to_string()));
        assert_eq!(visited, vec![2]);
        assert_eq!(placeholder_steps(&steps), vec![2, 3]);
    }

    #[test]
    fn test_empty_pipeline() {
        assert_eq!(model_steps(&[]).count(), 0);
        assert!(placeholder_steps(&[]).is_empty());
    }
}
