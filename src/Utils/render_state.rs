//! # Render state of the ensemble animation
//!
//! Everything the window shows is derived from one `RenderState` value that the per-frame
//! update receives explicitly: a `VisualTrack` (trail + leading marker) per trajectory and a
//! `CameraState`. The playback cadence is a `PlaybackClock` that only counts frames; wall
//! clock pacing is left to the window loop.
//!
//! Frame `i` shows, for each trajectory, the first `i` samples as the trail and the last of
//! them as the marker. Trail opacity grows as `base + slope*i` and is clamped to [0, 1], the
//! camera turns by `-rate*i` degrees in elevation and azimuth.
use crate::Utils::colormaps::Colormap;
use crate::config::{AnimationConfig, ViewBounds};
use crate::error::LorenzError;
use crate::numerical::ensemble::Ensemble;
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// line width class of a trail, 1, 2 or 3 points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailWidth {
    Thin,
    Medium,
    Thick,
}

impl TrailWidth {
    pub fn from_points(points: u32) -> Self {
        match points {
            0 | 1 => TrailWidth::Thin,
            2 => TrailWidth::Medium,
            _ => TrailWidth::Thick,
        }
    }

    pub fn points(&self) -> f32 {
        match self {
            TrailWidth::Thin => 1.0,
            TrailWidth::Medium => 2.0,
            TrailWidth::Thick => 3.0,
        }
    }
}

/// display attributes and current geometry of one trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct VisualTrack {
    pub color: [f32; 3],
    pub width: TrailWidth,
    pub trail_alpha: f32,
    /// marker diameter in points
    pub marker_size: f32,
    pub marker_alpha: f32,
    /// number of leading samples drawn as the trail
    pub visible: usize,
    pub marker: Option<Vector3<f64>>,
}

/// One track per color. Widths and opacities come from their own ChaCha8 stream so that
/// styling never perturbs the initial states drawn with the same seed.
pub fn style_tracks(n: usize, colormap: Colormap, seed: u64) -> Vec<VisualTrack> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(1);
    let colors = colormap.colors(n);
    let trails: Vec<(TrailWidth, f32)> = (0..n)
        .map(|_| {
            let width = TrailWidth::from_points(rng.random_range(1..=3));
            let alpha: f32 = rng.random_range(0.3..1.0);
            (width, alpha)
        })
        .collect();
    let markers: Vec<(f32, f32)> = (0..n)
        .map(|_| {
            let size = rng.random_range(2..=6) as f32;
            let alpha: f32 = rng.random_range(0.65..1.0);
            (size, alpha)
        })
        .collect();
    colors
        .into_iter()
        .zip(trails)
        .zip(markers)
        .map(|((color, (width, trail_alpha)), (marker_size, marker_alpha))| VisualTrack {
            color,
            width,
            trail_alpha,
            marker_size,
            marker_alpha,
            visible: 0,
            marker: None,
        })
        .collect()
}

/// `base + slope*frame` clamped to the valid opacity range
pub fn trail_opacity(frame: usize, base: f64, slope: f64) -> f32 {
    (base + slope * frame as f64).clamp(0.0, 1.0) as f32
}

/// map a data point into the [-1, 1]^3 box spanned by the view bounds
pub fn to_view_box(bounds: &ViewBounds, p: &Vector3<f64>) -> [f32; 3] {
    let map = |v: f64, (lo, hi): (f64, f64)| (2.0 * (v - lo) / (hi - lo) - 1.0) as f32;
    [map(p[0], bounds.x), map(p[1], bounds.y), map(p[2], bounds.z)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// angles follow the frame index
    AutoRotate,
    /// angles follow the mouse
    Manual,
}

/// viewing angles in degrees and the distance of the eye from the box centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub elevation: f64,
    pub azimuth: f64,
    pub distance: f64,
}

impl CameraState {
    pub fn new(elevation: f64, azimuth: f64) -> Self {
        CameraState {
            elevation,
            azimuth,
            distance: 4.0,
        }
    }

    /// linear in the frame index
    pub fn set_frame(&mut self, frame: usize, rate: f64) {
        self.elevation = -rate * frame as f64;
        self.azimuth = -rate * frame as f64;
    }

    /// eye position relative to the box centre, z up
    pub fn eye(&self) -> [f32; 3] {
        let (el, az) = (self.elevation.to_radians(), self.azimuth.to_radians());
        [
            (self.distance * el.cos() * az.cos()) as f32,
            (self.distance * el.cos() * az.sin()) as f32,
            (self.distance * el.sin()) as f32,
        ]
    }

    /// up direction orthogonal to the line of sight; keeps the view continuous when the
    /// elevation passes through the poles
    pub fn up(&self) -> [f32; 3] {
        let (el, az) = (self.elevation.to_radians(), self.azimuth.to_radians());
        [
            (-el.sin() * az.cos()) as f32,
            (-el.sin() * az.sin()) as f32,
            el.cos() as f32,
        ]
    }
}

/// every mutable thing the renderer touches between frames
#[derive(Debug, Clone)]
pub struct RenderState {
    pub tracks: Vec<VisualTrack>,
    pub camera: CameraState,
    pub camera_mode: CameraMode,
    /// last frame applied, None before the first one. The camera keeps `initial_view`
    /// until then
    pub frame: Option<usize>,
    rotation_rate: f64,
    opacity_base: f64,
    opacity_slope: f64,
}

impl RenderState {
    pub fn new(n_tracks: usize, config: &AnimationConfig) -> Self {
        let (elevation, azimuth) = config.initial_view;
        RenderState {
            tracks: style_tracks(n_tracks, config.colormap, config.style_seed),
            camera: CameraState::new(elevation, azimuth),
            camera_mode: CameraMode::AutoRotate,
            frame: None,
            rotation_rate: config.rotation_rate,
            opacity_base: config.opacity_base,
            opacity_slope: config.opacity_slope,
        }
    }

    /// empty trails, no markers
    pub fn reset(&mut self) {
        for track in self.tracks.iter_mut() {
            track.visible = 0;
            track.marker = None;
        }
        self.frame = None;
    }

    /// apply frame `i`
    pub fn update(&mut self, ensemble: &Ensemble, i: usize) -> Result<(), LorenzError> {
        if self.tracks.len() != ensemble.len() {
            return Err(LorenzError::InvalidConfig(format!(
                "{} visual tracks for {} trajectories",
                self.tracks.len(),
                ensemble.len()
            )));
        }
        let alpha = trail_opacity(i, self.opacity_base, self.opacity_slope);
        for (track, trajectory) in self.tracks.iter_mut().zip(ensemble.trajectories.iter()) {
            let prefix = trajectory.prefix(i)?;
            track.visible = prefix.ncols();
            track.marker = trajectory.head(i)?;
            track.trail_alpha = alpha;
        }
        if self.camera_mode == CameraMode::AutoRotate {
            self.camera.set_frame(i, self.rotation_rate);
        }
        self.frame = Some(i);
        Ok(())
    }

    /// switch between automatic rotation and mouse control, keeping the current angles
    pub fn toggle_camera_mode(&mut self) -> CameraMode {
        self.camera_mode = match self.camera_mode {
            CameraMode::AutoRotate => CameraMode::Manual,
            CameraMode::Manual => CameraMode::AutoRotate,
        };
        self.camera_mode
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Frame(usize),
    /// back to the empty scene, the next event is frame 0
    Reset,
    Finished,
}

/// monotonically advancing frame counter, optionally wrapping
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    total_frames: usize,
    repeat: bool,
    next: usize,
    paused: bool,
    finished: bool,
}

impl PlaybackClock {
    pub fn new(total_frames: usize, repeat: bool) -> Self {
        PlaybackClock {
            total_frames,
            repeat,
            next: 0,
            paused: false,
            finished: false,
        }
    }

    pub fn advance(&mut self) -> PlaybackEvent {
        if self.finished {
            return PlaybackEvent::Finished;
        }
        if self.next < self.total_frames {
            let frame = self.next;
            self.next += 1;
            PlaybackEvent::Frame(frame)
        } else if self.repeat {
            self.next = 0;
            PlaybackEvent::Reset
        } else {
            self.finished = true;
            PlaybackEvent::Finished
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
