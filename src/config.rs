//! All run parameters of the demo. There is no file or command line surface: the values
//! below are the constants of the animation, grouped and checked once before any work starts.
use crate::Utils::colormaps::Colormap;
use crate::error::LorenzError;
use crate::numerical::lorenz::SystemParameters;

/// parameters of the Trajectory Generator
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleConfig {
    pub n_trajectories: usize,
    pub seed: u64,
    pub params: SystemParameters,
    /// initial states are uniform over [-half_width, half_width]^3
    pub half_width: f64,
    pub t_start: f64,
    pub t_end: f64,
    pub samples: usize,
    pub rtol: f64,
    pub atol: f64,
    /// solve trajectories on the rayon pool
    pub parallel: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        EnsembleConfig {
            n_trajectories: 50,
            seed: 1,
            params: SystemParameters::default(),
            half_width: 15.0,
            t_start: 0.0,
            t_end: 4.0,
            samples: 1310,
            // same as the LSODA defaults of odepack
            rtol: 1.49012e-8,
            atol: 1.49012e-8,
            parallel: true,
        }
    }
}

impl EnsembleConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_trajectories(mut self, n: usize) -> Self {
        self.n_trajectories = n;
        self
    }

    pub fn with_window(mut self, t_start: f64, t_end: f64, samples: usize) -> Self {
        self.t_start = t_start;
        self.t_end = t_end;
        self.samples = samples;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), LorenzError> {
        if self.n_trajectories == 0 {
            return Err(LorenzError::InvalidConfig(
                "ensemble must hold at least one trajectory".to_string(),
            ));
        }
        if self.samples == 0 {
            return Err(LorenzError::InvalidConfig(
                "time grid needs at least one sample".to_string(),
            ));
        }
        if !(self.half_width.is_finite() && self.half_width >= 0.0) {
            return Err(LorenzError::InvalidConfig(format!(
                "half width of the initial cube must be finite and non-negative, got {}",
                self.half_width
            )));
        }
        if !(self.t_start.is_finite() && self.t_end.is_finite() && self.t_end >= self.t_start) {
            return Err(LorenzError::InvalidConfig(format!(
                "integration window [{}, {}] is invalid",
                self.t_start, self.t_end
            )));
        }
        if !(self.rtol > 0.0) || !(self.atol >= 0.0) {
            return Err(LorenzError::InvalidConfig(format!(
                "tolerances must be rtol > 0, atol >= 0, got rtol = {}, atol = {}",
                self.rtol, self.atol
            )));
        }
        Ok(())
    }
}

/// how the trail polylines are stroked
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrailStyle {
    Solid,
    /// dash-dot-dot
    Dashed,
    Dotted,
}

/// axis-aligned box shown on screen; each axis is stretched to the same extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
    pub z: (f64, f64),
}

impl Default for ViewBounds {
    fn default() -> Self {
        ViewBounds {
            x: (-25.0, 25.0),
            y: (-35.0, 35.0),
            z: (5.0, 55.0),
        }
    }
}

/// parameters of the Frame Renderer
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    pub total_frames: usize,
    pub frame_interval_ms: u64,
    /// go back to the empty scene after the last frame
    pub repeat: bool,
    /// degrees per frame for both elevation and azimuth
    pub rotation_rate: f64,
    /// camera angles (elevation, azimuth) in degrees before the first frame
    pub initial_view: (f64, f64),
    pub opacity_base: f64,
    pub opacity_slope: f64,
    pub background: [f32; 3],
    pub colormap: Colormap,
    pub trail_style: TrailStyle,
    pub view_bounds: ViewBounds,
    /// seed of the per-track styling draws
    pub style_seed: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            total_frames: 1010,
            frame_interval_ms: 8,
            repeat: true,
            rotation_rate: 0.2,
            initial_view: (30.0, 0.0),
            opacity_base: 0.1,
            opacity_slope: 0.0006,
            background: [0.02, 0.0, 0.08],
            colormap: Colormap::GnBu,
            trail_style: TrailStyle::Dashed,
            view_bounds: ViewBounds::default(),
            style_seed: 1,
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> Result<(), LorenzError> {
        if self.frame_interval_ms == 0 {
            return Err(LorenzError::InvalidConfig(
                "frame interval must be positive".to_string(),
            ));
        }
        let b = &self.view_bounds;
        for (name, (lo, hi)) in [("x", b.x), ("y", b.y), ("z", b.z)] {
            if !(hi > lo) {
                return Err(LorenzError::InvalidConfig(format!(
                    "view bounds on {} are empty: [{}, {}]",
                    name, lo, hi
                )));
            }
        }
        if !self.rotation_rate.is_finite()
            || !self.opacity_base.is_finite()
            || !self.opacity_slope.is_finite()
        {
            return Err(LorenzError::InvalidConfig(
                "camera and opacity coefficients must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LorenzConfig {
    pub ensemble: EnsembleConfig,
    pub animation: AnimationConfig,
}

impl LorenzConfig {
    /// checks both halves and that playback never runs past the computed samples
    pub fn validate(&self) -> Result<(), LorenzError> {
        self.ensemble.validate()?;
        self.animation.validate()?;
        if self.animation.total_frames > self.ensemble.samples {
            return Err(LorenzError::InvalidConfig(format!(
                "{} frames requested but trajectories only hold {} samples",
                self.animation.total_frames, self.ensemble.samples
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LorenzConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ensemble.n_trajectories, 50);
        assert_eq!(config.ensemble.samples, 1310);
        assert_eq!(config.animation.total_frames, 1010);
        assert_eq!(config.animation.frame_interval_ms, 8);
    }

    #[test]
    fn test_frames_bounded_by_samples() {
        let mut config = LorenzConfig::default();
        config.animation.total_frames = config.ensemble.samples + 1;
        assert!(matches!(config.validate(), Err(LorenzError::InvalidConfig(_))));
        config.animation.total_frames = config.ensemble.samples;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_ensemble_values() {
        assert!(EnsembleConfig::default().with_trajectories(0).validate().is_err());
        assert!(EnsembleConfig::default().with_window(1.0, 0.0, 10).validate().is_err());
        assert!(EnsembleConfig::default().with_window(0.0, 1.0, 0).validate().is_err());
        let mut config = EnsembleConfig::default();
        config.rtol = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_animation_values() {
        let mut config = AnimationConfig::default();
        config.frame_interval_ms = 0;
        assert!(config.validate().is_err());
        let mut config = AnimationConfig::default();
        config.view_bounds.z = (5.0, 5.0);
        assert!(config.validate().is_err());
    }
}
