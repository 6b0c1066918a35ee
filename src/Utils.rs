//! different utility modules used by the animation
/// tiny module to set up terminal and file logging
pub mod logger;
/// sequential colormaps used to color the ensemble
pub mod colormaps;
/// per-frame state of trails, markers, camera and playback; no windowing involved
pub mod render_state;
/// Bevy window that plays the ensemble animation
pub mod animation_3d;
