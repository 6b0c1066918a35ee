/// Lorenz vector field and its classical parameters
pub mod lorenz;
/// SOLVER OF NON-STIFF IVP
/// explicit Dormand-Prince 5(4) with adaptive step and dense output at prescribed sample points
///  Example#1
/// ```rust, ignore
///     let fun = |_t: f64, y: &DVector<f64>| -y.clone();
///     let t_eval = vec![0.0, 0.5, 1.0];
///     let mut solver = DOPRI5::new(fun, 0.0, DVector::from_vec(vec![1.0]), 1.0, 1e-8, 1e-8)?;
///     let y = solver.solve_at(&t_eval)?; // 1 x 3 matrix, one column per sample
/// ```
pub mod DOPRI_dense;
/// seeded initial states, shared time grid and the batch solve of the whole ensemble
pub mod ensemble;
mod ensemble_tests;
