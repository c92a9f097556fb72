//! Cosine-annealing learning-rate schedule.

use std::f32::consts::PI;

/// Cosine annealing from `eta_max` down to `eta_min` over `t_max` epochs.
///
/// `lr(e) = eta_min + 0.5 * (eta_max - eta_min) * (1 + cos(pi * e / t_max))`
///
/// A pure function of the epoch index; it holds no mutable state and is
/// independent of every other callback.
#[derive(Clone, Copy, Debug)]
pub struct CosineAnnealingSchedule {
    eta_min: f32,
    eta_max: f32,
    t_max: usize,
}

impl CosineAnnealingSchedule {
    pub fn new(eta_min: f32, eta_max: f32, t_max: usize) -> Self {
        assert!(t_max > 0, "schedule horizon must be positive");
        Self {
            eta_min,
            eta_max,
            t_max,
        }
    }

    /// Learning rate at an epoch. Epochs past the horizon stay at
    /// `eta_min`.
    pub fn lr_at(&self, epoch: usize) -> f32 {
        if epoch >= self.t_max {
            return self.eta_min;
        }
        let progress = epoch as f32 / self.t_max as f32;
        self.eta_min + 0.5 * (self.eta_max - self.eta_min) * (1.0 + (PI * progress).cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn boundary_values() {
        let schedule = CosineAnnealingSchedule::new(1e-6, 1e-3, 30);
        assert_relative_eq!(schedule.lr_at(0), 1e-3, epsilon = 1e-9);
        assert_relative_eq!(schedule.lr_at(30), 1e-6, epsilon = 1e-9);
    }

    #[test]
    fn matches_closed_form_at_sample_epochs() {
        let (eta_min, eta_max, t_max) = (1e-6f32, 1e-3f32, 30usize);
        let schedule = CosineAnnealingSchedule::new(eta_min, eta_max, t_max);

        for epoch in [1usize, 7, 15, 22, 29] {
            let expected = eta_min
                + 0.5 * (eta_max - eta_min)
                    * (1.0 + (PI * epoch as f32 / t_max as f32).cos());
            assert_relative_eq!(schedule.lr_at(epoch), expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn midpoint_is_the_mean() {
        let schedule = CosineAnnealingSchedule::new(0.0, 1.0, 10);
        assert_relative_eq!(schedule.lr_at(5), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn past_horizon_clamps_to_min() {
        let schedule = CosineAnnealingSchedule::new(1e-6, 1e-3, 10);
        assert_relative_eq!(schedule.lr_at(50), 1e-6);
    }

    #[test]
    fn nonincreasing_over_the_horizon() {
        let schedule = CosineAnnealingSchedule::new(1e-6, 1e-3, 30);
        let mut prev = schedule.lr_at(0);
        for epoch in 1..=30 {
            let lr = schedule.lr_at(epoch);
            assert!(lr <= prev + 1e-12, "lr increased at epoch {epoch}");
            prev = lr;
        }
    }
}
