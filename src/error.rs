//! error type shared by the generator and the renderer
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LorenzError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// adaptive step collapsed below the resolution of `t`
    #[error("required step size is less than spacing between numbers: t = {t}, h = {h}")]
    StepSizeTooSmall { t: f64, h: f64 },
    #[error("frame {frame} is beyond the trajectory length {len}")]
    FrameOutOfRange { frame: usize, len: usize },
}
