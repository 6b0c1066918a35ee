//! # Ensemble of Lorenz trajectories
//!
//! `N` initial states are drawn uniformly from the cube `[-w, w]^3` with a seeded ChaCha8
//! generator, every state is integrated over the same time grid and the resulting
//! trajectories are stored as 3 x len(grid) matrices (one column per sample).
//! The solves are independent, so they can run on the rayon thread pool; the order of the
//! result does not depend on that choice.
use crate::config::EnsembleConfig;
use crate::error::LorenzError;
use crate::numerical::DOPRI_dense::DOPRI5;
use crate::numerical::lorenz::SystemParameters;
use log::info;
use nalgebra::{DMatrix, DMatrixView, DVector, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::time::Instant;

/// fixed, shared sample times
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// `samples` evenly spaced points over [t_start, t_end], both ends included
    pub fn linspace(t_start: f64, t_end: f64, samples: usize) -> Result<Self, LorenzError> {
        if samples == 0 {
            return Err(LorenzError::InvalidConfig(
                "time grid needs at least one sample".to_string(),
            ));
        }
        if !(t_end >= t_start) {
            return Err(LorenzError::InvalidConfig(format!(
                "time window [{}, {}] is empty",
                t_start, t_end
            )));
        }
        let times = if samples == 1 {
            vec![t_start]
        } else {
            let step = (t_end - t_start) / (samples - 1) as f64;
            let mut times: Vec<f64> = (0..samples).map(|i| t_start + step * i as f64).collect();
            times[samples - 1] = t_end;
            times
        };
        Ok(TimeGrid { times })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.times
    }

    pub fn start(&self) -> f64 {
        self.times[0]
    }

    pub fn end(&self) -> f64 {
        self.times[self.times.len() - 1]
    }
}

/// uniform i.i.d. draws over [-half_width, half_width]^3, trajectory-major (x, y, z of the
/// first state, then of the second...)
pub fn sample_initial_states(n: usize, seed: u64, half_width: f64) -> Vec<Vector3<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let x: f64 = rng.random();
            let y: f64 = rng.random();
            let z: f64 = rng.random();
            Vector3::new(x, y, z).map(|u| -half_width + 2.0 * half_width * u)
        })
        .collect()
}

/// positions of one solution at every grid sample, 3 rows x len(grid) columns
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    points: DMatrix<f64>,
}

impl Trajectory {
    pub fn from_points(points: DMatrix<f64>) -> Self {
        assert_eq!(points.nrows(), 3, "trajectory points must have 3 rows (x,y,z)");
        Trajectory { points }
    }

    pub fn len(&self) -> usize {
        self.points.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.points.ncols() == 0
    }

    pub fn points(&self) -> &DMatrix<f64> {
        &self.points
    }

    pub fn point(&self, i: usize) -> Vector3<f64> {
        Vector3::new(
            self.points[(0, i)],
            self.points[(1, i)],
            self.points[(2, i)],
        )
    }

    /// first `i` samples; asking for more than the trajectory holds is an error, never a
    /// silent truncation
    pub fn prefix(&self, i: usize) -> Result<DMatrixView<'_, f64>, LorenzError> {
        if i > self.len() {
            return Err(LorenzError::FrameOutOfRange {
                frame: i,
                len: self.len(),
            });
        }
        Ok(self.points.columns(0, i))
    }

    /// last point of the prefix of length `i`, None for an empty prefix
    pub fn head(&self, i: usize) -> Result<Option<Vector3<f64>>, LorenzError> {
        let prefix = self.prefix(i)?;
        Ok(match prefix.ncols() {
            0 => None,
            k => Some(self.point(k - 1)),
        })
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|v| v.is_finite())
    }
}

/// integrate one initial state over the grid with the adaptive dense-output solver
pub fn integrate_trajectory(
    params: SystemParameters,
    y0: &Vector3<f64>,
    grid: &TimeGrid,
    rtol: f64,
    atol: f64,
) -> Result<Trajectory, LorenzError> {
    let y0 = DVector::from_column_slice(y0.as_slice());
    let mut solver = DOPRI5::new(params.rhs(), grid.start(), y0, grid.end(), rtol, atol)?;
    let points = solver.solve_at(grid.as_slice())?;
    Ok(Trajectory::from_points(points))
}

/// complete output of the generator, read-only afterwards
#[derive(Debug, Clone)]
pub struct Ensemble {
    pub params: SystemParameters,
    pub time_grid: TimeGrid,
    pub initial_states: Vec<Vector3<f64>>,
    pub trajectories: Vec<Trajectory>,
}

impl Ensemble {
    pub fn generate(config: &EnsembleConfig) -> Result<Self, LorenzError> {
        config.validate()?;
        let start = Instant::now();
        let time_grid = TimeGrid::linspace(config.t_start, config.t_end, config.samples)?;
        let initial_states =
            sample_initial_states(config.n_trajectories, config.seed, config.half_width);
        let params = config.params;
        let (rtol, atol) = (config.rtol, config.atol);
        let trajectories: Vec<Trajectory> = if config.parallel {
            initial_states
                .par_iter()
                .map(|y0| integrate_trajectory(params, y0, &time_grid, rtol, atol))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            initial_states
                .iter()
                .map(|y0| integrate_trajectory(params, y0, &time_grid, rtol, atol))
                .collect::<Result<Vec<_>, _>>()?
        };
        info!(
            "{} trajectories x {} samples integrated in {} ms",
            trajectories.len(),
            time_grid.len(),
            start.elapsed().as_millis()
        );
        Ok(Ensemble {
            params,
            time_grid,
            initial_states,
            trajectories,
        })
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// number of samples in every trajectory
    pub fn samples(&self) -> usize {
        self.time_grid.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let grid = TimeGrid::linspace(0.0, 4.0, 1310).unwrap();
        assert_eq!(grid.len(), 1310);
        assert_eq!(grid.start(), 0.0);
        assert_eq!(grid.end(), 4.0);
        assert_relative_eq!(grid.as_slice()[1], 4.0 / 1309.0, epsilon = 1e-15);
        assert!(grid.as_slice().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_linspace_rejects_bad_windows() {
        assert!(TimeGrid::linspace(0.0, 1.0, 0).is_err());
        assert!(TimeGrid::linspace(1.0, 0.0, 5).is_err());
        assert!(TimeGrid::linspace(0.0, f64::NAN, 5).is_err());
        assert_eq!(TimeGrid::linspace(2.0, 3.0, 1).unwrap().as_slice(), &[2.0]);
    }

    #[test]
    fn test_initial_states_inside_cube_and_reproducible() {
        let a = sample_initial_states(200, 1, 15.0);
        let b = sample_initial_states(200, 1, 15.0);
        assert_eq!(a, b);
        for s in a.iter() {
            assert!(s.iter().all(|c| (-15.0..15.0).contains(c)));
        }
        // roughly centred
        let mean: f64 = a.iter().map(|s| s.sum()).sum::<f64>() / 600.0;
        assert!(mean.abs() < 2.0);
    }

    #[test]
    fn test_prefix_and_head() {
        let points = DMatrix::from_fn(3, 4, |r, c| (10 * c + r) as f64);
        let traj = Trajectory::from_points(points);
        assert_eq!(traj.prefix(0).unwrap().ncols(), 0);
        assert_eq!(traj.head(0).unwrap(), None);
        assert_eq!(traj.prefix(3).unwrap().ncols(), 3);
        assert_eq!(traj.head(3).unwrap(), Some(Vector3::new(20.0, 21.0, 22.0)));
        assert_eq!(traj.prefix(4).unwrap().ncols(), 4);
        assert_eq!(
            traj.prefix(5).unwrap_err(),
            LorenzError::FrameOutOfRange { frame: 5, len: 4 }
        );
    }
}
