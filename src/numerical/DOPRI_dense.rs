//! # Dormand-Prince 5(4) solver with dense output
//!
//! Explicit embedded Runge-Kutta pair of orders 5 and 4 (the RK45 of SciPy, DOPRI5 of Hairer).
//! The step size is chosen so that the local error estimate, measured in the mixed
//! `atol + rtol*|y|` RMS norm, stays below one. After every accepted step a quartic
//! interpolant is available between the old and the new point; it is used to report the
//! solution at exactly the requested sample times regardless of where the adaptive steps land.
//!
//! The right hand side is any `Fn(f64, &DVector<f64>) -> DVector<f64>`. It is evaluated at
//! trial points of rejected steps as well, so it has to be a pure function of its arguments.
//!
//! ```rust, ignore
//! let fun = |_t: f64, y: &DVector<f64>| DVector::from_vec(vec![y[1], -y[0]]);
//! let mut solver = DOPRI5::new(fun, 0.0, DVector::from_vec(vec![1.0, 0.0]), 3.0, 1e-8, 1e-10)?;
//! let t_eval: Vec<f64> = (0..31).map(|i| i as f64 * 0.1).collect();
//! let y = solver.solve_at(&t_eval)?; // 2 x 31, one column per sample
//! ```
use crate::error::LorenzError;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use std::fmt::Display;

const N_STAGES: usize = 6;
/// order of the embedded error estimator, step control exponent is -1/(order+1)
const ERROR_ESTIMATOR_ORDER: f64 = 4.0;
const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

// Butcher tableau of Dormand-Prince
const C: [f64; N_STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];
const A: [[f64; 5]; N_STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
];
const B: [f64; N_STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];
// difference between the 5th and the 4th order weights, last entry is the FSAL stage
const E: [f64; N_STAGES + 1] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];
// coefficients of the quartic continuous extension, rows are stages, columns powers of x
const P: [[f64; 4]; N_STAGES + 1] = [
    [
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    [0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    [
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    [
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    [
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    [
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Running,
    Finished,
    Failed,
}

impl Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolverStatus::Running => "running",
            SolverStatus::Finished => "finished",
            SolverStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// RMS norm
pub fn norm(vector: &DVector<f64>) -> f64 {
    vector.norm() / (vector.len() as f64).sqrt()
}

/// local interpolant valid on [t_old, t]
#[derive(Debug, Clone)]
pub struct DenseOutput {
    pub t_old: f64,
    pub t: f64,
    h: f64,
    y_old: DVector<f64>,
    /// n x 4
    Q: DMatrix<f64>,
}

impl DenseOutput {
    pub fn eval(&self, t: f64) -> DVector<f64> {
        let x = (t - self.t_old) / self.h;
        let p = DVector::from_vec(vec![x, x * x, x * x * x, x * x * x * x]);
        &self.y_old + self.h * (&self.Q * p)
    }
}

pub struct DOPRI5<F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    fun: F,
    pub t0: f64,
    pub y0: DVector<f64>,
    t_bound: f64,
    rtol: f64,
    atol: f64,
    max_step: f64,
    pub t: f64,
    pub y: DVector<f64>,
    t_old: f64,
    y_old: DVector<f64>,
    f: DVector<f64>,
    h_abs: Option<f64>,
    h_previous: f64,
    K: Vec<DVector<f64>>,
    status: SolverStatus,
    nfev: usize,
    n_accepted: usize,
    n_rejected: usize,
}

impl<F> DOPRI5<F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    /// forward integration from `t0` to `t_bound`
    pub fn new(
        fun: F,
        t0: f64,
        y0: DVector<f64>,
        t_bound: f64,
        rtol: f64,
        atol: f64,
    ) -> Result<Self, LorenzError> {
        if t_bound < t0 {
            return Err(LorenzError::InvalidConfig(format!(
                "t_bound = {} is before t0 = {}",
                t_bound, t0
            )));
        }
        if atol < 0.0 {
            return Err(LorenzError::InvalidConfig(
                "`atol` must not be negative".to_string(),
            ));
        }
        let rtol = if rtol < 100.0 * f64::EPSILON {
            warn!(
                "`rtol` = {} is too small, setting `rtol = 100 * EPSILON`",
                rtol
            );
            100.0 * f64::EPSILON
        } else {
            rtol
        };
        let n = y0.len();
        let f = fun(t0, &y0);
        Ok(DOPRI5 {
            fun,
            t0,
            y0: y0.clone(),
            t_bound,
            rtol,
            atol,
            max_step: f64::INFINITY,
            t: t0,
            y: y0.clone(),
            t_old: t0,
            y_old: y0,
            f,
            h_abs: None,
            h_previous: 0.0,
            K: vec![DVector::zeros(n); N_STAGES + 1],
            status: SolverStatus::Running,
            nfev: 1,
            n_accepted: 0,
            n_rejected: 0,
        })
    }

    pub fn set_max_step(&mut self, max_step: f64) -> Result<(), LorenzError> {
        if max_step <= 0.0 {
            return Err(LorenzError::InvalidConfig(
                "`max_step` must be positive".to_string(),
            ));
        }
        self.max_step = max_step;
        Ok(())
    }

    pub fn set_first_step(&mut self, first_step: f64) -> Result<(), LorenzError> {
        if first_step <= 0.0 || first_step > (self.t_bound - self.t0).abs() {
            return Err(LorenzError::InvalidConfig(format!(
                "`first_step` = {} must be positive and inside the integration interval",
                first_step
            )));
        }
        self.h_abs = Some(first_step);
        Ok(())
    }

    pub fn get_status(&self) -> SolverStatus {
        self.status
    }

    /// (function evaluations, accepted steps, rejected steps)
    pub fn statistics(&self) -> (usize, usize, usize) {
        (self.nfev, self.n_accepted, self.n_rejected)
    }

    /// empirical initial step (Hairer, Norsett, Wanner, sec. II.4)
    fn select_initial_step(&mut self) -> f64 {
        let interval_length = (self.t_bound - self.t0).abs();
        if self.y.len() == 0 {
            return f64::INFINITY;
        }
        if interval_length == 0.0 {
            return 0.0;
        }
        let scale = self.y.map(|y_i| self.atol + y_i.abs() * self.rtol);
        let d0 = norm(&self.y.component_div(&scale));
        let d1 = norm(&self.f.component_div(&scale));
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let h0 = h0.min(interval_length);
        let y1 = &self.y + h0 * &self.f;
        let f1 = (self.fun)(self.t + h0, &y1);
        self.nfev += 1;
        let d2 = norm(&(f1 - &self.f).component_div(&scale)) / h0;
        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            f64::max(1e-6, h0 * 1e-3)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (ERROR_ESTIMATOR_ORDER + 1.0))
        };
        [100.0 * h0, h1, interval_length, self.max_step]
            .into_iter()
            .fold(f64::INFINITY, f64::min)
    }

    /// one explicit stage sweep of size h from (t, y); fills K and returns y_new
    fn rk_step(&mut self, h: f64) -> DVector<f64> {
        let t = self.t;
        self.K[0] = self.f.clone();
        for s in 1..N_STAGES {
            let mut y_stage = self.y.clone();
            for j in 0..s {
                y_stage += (A[s][j] * h) * &self.K[j];
            }
            self.K[s] = (self.fun)(t + C[s] * h, &y_stage);
        }
        let mut y_new = self.y.clone();
        for j in 0..N_STAGES {
            y_new += (B[j] * h) * &self.K[j];
        }
        self.K[N_STAGES] = (self.fun)(t + h, &y_new);
        self.nfev += N_STAGES;
        y_new
    }

    fn estimate_error_norm(&self, h: f64, scale: &DVector<f64>) -> f64 {
        let mut err = DVector::zeros(self.y.len());
        for j in 0..=N_STAGES {
            err += (E[j] * h) * &self.K[j];
        }
        norm(&err.component_div(scale))
    }

    /// advance by one accepted step, or fail
    pub fn step(&mut self) -> Result<(), LorenzError> {
        if self.status != SolverStatus::Running {
            return Ok(());
        }
        if self.t == self.t_bound || self.y.len() == 0 {
            self.t_old = self.t;
            self.t = self.t_bound;
            self.status = SolverStatus::Finished;
            return Ok(());
        }
        let mut h_abs = match self.h_abs {
            Some(h) => h,
            None => self.select_initial_step(),
        };
        let min_step = 10.0 * (self.t.abs() * f64::EPSILON).max(f64::MIN_POSITIVE);
        h_abs = h_abs.min(self.max_step).max(min_step);

        let mut step_rejected = false;
        let exponent = -1.0 / (ERROR_ESTIMATOR_ORDER + 1.0);
        let (t_new, y_new) = loop {
            if h_abs < min_step {
                self.status = SolverStatus::Failed;
                return Err(LorenzError::StepSizeTooSmall {
                    t: self.t,
                    h: h_abs,
                });
            }
            let mut t_new = self.t + h_abs;
            if t_new > self.t_bound {
                t_new = self.t_bound;
            }
            let h = t_new - self.t;
            h_abs = h.abs();

            let y_new = self.rk_step(h);
            let scale = self.y.zip_map(&y_new, |a, b| {
                self.atol + a.abs().max(b.abs()) * self.rtol
            });
            let error_norm = self.estimate_error_norm(h, &scale);

            if error_norm < 1.0 {
                let mut factor = if error_norm == 0.0 {
                    MAX_FACTOR
                } else {
                    MAX_FACTOR.min(SAFETY * error_norm.powf(exponent))
                };
                if step_rejected {
                    factor = factor.min(1.0);
                }
                self.h_previous = h;
                h_abs *= factor;
                break (t_new, y_new);
            } else {
                // NaN error norms land here as well and shrink the step until it collapses
                h_abs *= MIN_FACTOR.max(SAFETY * error_norm.powf(exponent));
                step_rejected = true;
                self.n_rejected += 1;
            }
        };
        self.n_accepted += 1;
        self.h_abs = Some(h_abs);
        self.t_old = self.t;
        self.y_old = std::mem::replace(&mut self.y, y_new);
        self.t = t_new;
        self.f = self.K[N_STAGES].clone();
        if self.t >= self.t_bound {
            self.status = SolverStatus::Finished;
        }
        Ok(())
    }

    /// interpolant over the last accepted step
    pub fn dense_output(&self) -> DenseOutput {
        let n = self.y.len();
        let mut Q = DMatrix::zeros(n, 4);
        for (j, k_j) in self.K.iter().enumerate() {
            for p in 0..4 {
                if P[j][p] != 0.0 {
                    let mut col = Q.column_mut(p);
                    col += P[j][p] * k_j;
                }
            }
        }
        DenseOutput {
            t_old: self.t_old,
            t: self.t,
            h: self.h_previous,
            y_old: self.y_old.clone(),
            Q,
        }
    }

    /// integrate up to `t_bound` and return the solution at every `t_eval` point as columns of
    /// an n x t_eval.len() matrix. Points must be non-decreasing and inside [t0, t_bound]
    pub fn solve_at(&mut self, t_eval: &[f64]) -> Result<DMatrix<f64>, LorenzError> {
        if t_eval.windows(2).any(|w| w[1] < w[0]) {
            return Err(LorenzError::InvalidConfig(
                "sample times must be sorted".to_string(),
            ));
        }
        if let (Some(first), Some(last)) = (t_eval.first(), t_eval.last()) {
            if *first < self.t0 || *last > self.t_bound {
                return Err(LorenzError::InvalidConfig(format!(
                    "sample times [{}, {}] are outside of [{}, {}]",
                    first, last, self.t0, self.t_bound
                )));
            }
        }
        let n = self.y0.len();
        let mut result = DMatrix::zeros(n, t_eval.len());
        let mut idx = 0;
        while idx < t_eval.len() && t_eval[idx] <= self.t {
            result.set_column(idx, &self.y);
            idx += 1;
        }
        while idx < t_eval.len() && self.status == SolverStatus::Running {
            self.step()?;
            if self.t_old == self.t {
                break;
            }
            let dense = self.dense_output();
            while idx < t_eval.len() && t_eval[idx] <= self.t {
                if t_eval[idx] == self.t {
                    result.set_column(idx, &self.y);
                } else {
                    result.set_column(idx, &dense.eval(t_eval[idx]));
                }
                idx += 1;
            }
        }
        // zero-length interval: every remaining sample sits on t0
        while idx < t_eval.len() {
            result.set_column(idx, &self.y);
            idx += 1;
        }
        debug!(
            "DOPRI5 {} at t = {}: nfev = {}, accepted = {}, rejected = {}",
            self.status, self.t, self.nfev, self.n_accepted, self.n_rejected
        );
        Ok(result)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| a + (b - a) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn test_exponential_decay_at_samples() {
        // y' = -y, y(0) = 1, exact y = exp(-t)
        let fun = |_t: f64, y: &DVector<f64>| -y.clone();
        let t_eval = linspace(0.0, 2.0, 41);
        let mut solver =
            DOPRI5::new(fun, 0.0, DVector::from_vec(vec![1.0]), 2.0, 1e-9, 1e-12).unwrap();
        let y = solver.solve_at(&t_eval).unwrap();
        assert_eq!(y.shape(), (1, 41));
        assert_eq!(solver.get_status(), SolverStatus::Finished);
        for (i, t) in t_eval.iter().enumerate() {
            assert_relative_eq!(y[(0, i)], (-t).exp(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_harmonic_oscillator_dense_output() {
        // y1' = y2, y2' = -y1, exact (cos t, -sin t); samples fall between the adaptive steps
        let fun = |_t: f64, y: &DVector<f64>| DVector::from_vec(vec![y[1], -y[0]]);
        let t_eval = linspace(0.0, 10.0, 1001);
        let mut solver =
            DOPRI5::new(fun, 0.0, DVector::from_vec(vec![1.0, 0.0]), 10.0, 1e-8, 1e-10).unwrap();
        let y = solver.solve_at(&t_eval).unwrap();
        let (_nfev, accepted, _rejected) = solver.statistics();
        assert!(accepted < 1000, "dense output should need fewer steps than samples");
        for (i, t) in t_eval.iter().enumerate() {
            assert_relative_eq!(y[(0, i)], t.cos(), epsilon = 1e-5);
            assert_relative_eq!(y[(1, i)], -t.sin(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_first_sample_is_initial_state() {
        let fun = |_t: f64, y: &DVector<f64>| DVector::from_vec(vec![10.0 * (y[1] - y[0]), 0.0]);
        let y0 = DVector::from_vec(vec![0.1234567, -7.654321]);
        let mut solver = DOPRI5::new(fun, 0.0, y0.clone(), 1.0, 1e-8, 1e-8).unwrap();
        let y = solver.solve_at(&[0.0, 0.5, 1.0]).unwrap();
        assert_eq!(y.column(0).clone_owned(), y0);
    }

    #[test]
    fn test_last_sample_hits_t_bound_exactly() {
        let fun = |t: f64, _y: &DVector<f64>| DVector::from_vec(vec![2.0 * t]);
        let mut solver =
            DOPRI5::new(fun, 0.0, DVector::from_vec(vec![0.0]), 3.0, 1e-8, 1e-10).unwrap();
        let y = solver.solve_at(&[1.0, 3.0]).unwrap();
        assert_eq!(solver.t, 3.0);
        assert_relative_eq!(y[(0, 0)], 1.0, epsilon = 1e-9);
        assert_relative_eq!(y[(0, 1)], 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_blow_up_reports_failure() {
        // y' = y^2, y(0) = 1 explodes at t = 1
        let fun = |_t: f64, y: &DVector<f64>| DVector::from_vec(vec![y[0] * y[0]]);
        let mut solver =
            DOPRI5::new(fun, 0.0, DVector::from_vec(vec![1.0]), 2.0, 1e-8, 1e-8).unwrap();
        let res = solver.solve_at(&[0.0, 0.5, 2.0]);
        assert!(matches!(res, Err(LorenzError::StepSizeTooSmall { .. })));
        assert_eq!(solver.get_status(), SolverStatus::Failed);
    }

    #[test]
    fn test_rejects_bad_input() {
        let fun = |_t: f64, y: &DVector<f64>| y.clone();
        assert!(DOPRI5::new(fun, 1.0, DVector::from_vec(vec![1.0]), 0.0, 1e-6, 1e-6).is_err());
        assert!(DOPRI5::new(fun, 0.0, DVector::from_vec(vec![1.0]), 1.0, 1e-6, -1.0).is_err());
        let mut solver = DOPRI5::new(fun, 0.0, DVector::from_vec(vec![1.0]), 1.0, 1e-6, 1e-6).unwrap();
        assert!(solver.set_max_step(0.0).is_err());
        assert!(solver.set_first_step(5.0).is_err());
        assert!(solver.solve_at(&[0.5, 0.2]).is_err());
        assert!(solver.solve_at(&[0.0, 1.5]).is_err());
    }

    #[test]
    fn test_zero_length_interval() {
        let fun = |_t: f64, y: &DVector<f64>| y.clone();
        let mut solver =
            DOPRI5::new(fun, 0.0, DVector::from_vec(vec![2.0]), 0.0, 1e-6, 1e-6).unwrap();
        let y = solver.solve_at(&[0.0, 0.0]).unwrap();
        assert_eq!(y[(0, 0)], 2.0);
        assert_eq!(y[(0, 1)], 2.0);
    }
}
