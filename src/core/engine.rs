use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::error::ProjectionError;
use super::types::{ContributionPlan, OutcomeSet, ReturnStats, SimulationParams};

// Row-major: one row per year, one column per simulation.
#[derive(Debug, Clone)]
pub struct ReturnMatrix {
    years: usize,
    simulations: usize,
    draws: Vec<f64>,
}

impl ReturnMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let years = rows.len();
        let simulations = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|row| row.len() == simulations));
        Self {
            years,
            simulations,
            draws: rows.into_iter().flatten().collect(),
        }
    }

    pub fn years(&self) -> usize {
        self.years
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }

    pub fn year(&self, year: usize) -> &[f64] {
        let start = year * self.simulations;
        &self.draws[start..start + self.simulations]
    }
}

pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn draw_returns<R: Rng + ?Sized>(
    stats: &ReturnStats,
    years: u32,
    simulations: u32,
    rng: &mut R,
) -> Result<ReturnMatrix, ProjectionError> {
    let invalid = || ProjectionError::InvalidDistribution {
        mean: stats.mean,
        std_dev: stats.std_dev,
    };
    if !stats.mean.is_finite() || !stats.std_dev.is_finite() || stats.std_dev < 0.0 {
        return Err(invalid());
    }
    let normal = Normal::new(stats.mean, stats.std_dev).map_err(|_| invalid())?;

    let years = years as usize;
    let simulations = simulations as usize;
    let draws = (0..years * simulations)
        .map(|_| normal.sample(rng))
        .collect();
    Ok(ReturnMatrix {
        years,
        simulations,
        draws,
    })
}

pub fn compound(matrix: &ReturnMatrix, principal: f64, plan: &ContributionPlan) -> OutcomeSet {
    match plan {
        ContributionPlan::LumpSum => {
            let mut growth = vec![1.0; matrix.simulations];
            for year in 0..matrix.years {
                for (factor, r) in growth.iter_mut().zip(matrix.year(year)) {
                    *factor *= 1.0 + r;
                }
            }
            OutcomeSet::new(growth.into_iter().map(|g| principal * g).collect())
        }
        ContributionPlan::Periodic { .. } => {
            let yearly_contribution = plan.annual_contribution();
            // contributions land before that year's growth
            let mut running = vec![principal; matrix.simulations];
            for year in 0..matrix.years {
                for (value, r) in running.iter_mut().zip(matrix.year(year)) {
                    *value += yearly_contribution;
                    *value *= 1.0 + r;
                }
            }
            OutcomeSet::new(running)
        }
    }
}

pub fn project<R: Rng + ?Sized>(
    stats: &ReturnStats,
    params: &SimulationParams,
    rng: &mut R,
) -> Result<OutcomeSet, ProjectionError> {
    let matrix = draw_returns(stats, params.years, params.simulations, rng)?;
    Ok(compound(&matrix, params.principal, &params.contribution))
}
