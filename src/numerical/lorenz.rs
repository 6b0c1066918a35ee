//! Lorenz system: x' = σ(y-x), y' = x(ρ-z)-y, z' = xy-βz
use nalgebra::{DVector, Vector3};

/// constants of the vector field, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemParameters {
    pub sigma: f64,
    pub beta: f64,
    pub rho: f64,
}

impl Default for SystemParameters {
    /// classical chaotic set σ=10, β=8/3, ρ=28
    fn default() -> Self {
        SystemParameters {
            sigma: 10.0,
            beta: 8.0 / 3.0,
            rho: 28.0,
        }
    }
}

impl SystemParameters {
    pub fn new(sigma: f64, beta: f64, rho: f64) -> Self {
        SystemParameters { sigma, beta, rho }
    }

    /// time derivative of the state (x, y, z)
    pub fn derivative(&self, state: &Vector3<f64>) -> Vector3<f64> {
        let (x, y, z) = (state[0], state[1], state[2]);
        Vector3::new(
            self.sigma * (y - x),
            x * (self.rho - z) - y,
            x * y - self.beta * z,
        )
    }

    /// right hand side in the form the IVP solver expects. The system is autonomous so `t` is ignored
    pub fn rhs(self) -> impl Fn(f64, &DVector<f64>) -> DVector<f64> + Send + Sync + Copy {
        move |_t: f64, y: &DVector<f64>| {
            let d = self.derivative(&Vector3::new(y[0], y[1], y[2]));
            DVector::from_column_slice(d.as_slice())
        }
    }

    /// non-trivial equilibria C± = (±sqrt(β(ρ-1)), ±sqrt(β(ρ-1)), ρ-1)
    pub fn equilibria(&self) -> [Vector3<f64>; 3] {
        let r = (self.beta * (self.rho - 1.0)).max(0.0).sqrt();
        [
            Vector3::zeros(),
            Vector3::new(r, r, self.rho - 1.0),
            Vector3::new(-r, -r, self.rho - 1.0),
        ]
    }
}
