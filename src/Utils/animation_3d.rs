//! # 3D Ensemble Animation Module for Bevy
//!
//! Plays a precomputed `Ensemble` in a Bevy window: one fading trail and one leading marker
//! per trajectory, drawn every frame with gizmos, while the camera turns around the scene.
//!
//! ## Features
//! - trails grow by one sample per animation frame, their opacity rises with the frame index
//! - automatic camera rotation synchronized with playback, or mouse control
//! - fixed view box, axes hidden, dark background
//! - repeat or stop after the last frame
//!
//! ## Usage
//!
//! ```rust, ignore
//! use RustedLorenz::config::LorenzConfig;
//! use RustedLorenz::numerical::ensemble::Ensemble;
//! use RustedLorenz::Utils::animation_3d::create_ensemble_animation;
//!
//! let config = LorenzConfig::default();
//! let ensemble = Ensemble::generate(&config.ensemble)?;
//! create_ensemble_animation(ensemble, config.animation)?; // blocks until the window is closed
//! ```
//!
//! ## Controls
//! - **Space**: pause / resume playback
//! - **R**: switch between automatic rotation and mouse camera
//! - **Left mouse drag** (mouse camera): rotate around the scene
//! - **Mouse scroll** (mouse camera): zoom in/out

use crate::Utils::render_state::{
    CameraMode, PlaybackClock, PlaybackEvent, RenderState, TrailWidth, to_view_box,
};
use crate::config::{AnimationConfig, TrailStyle};
use crate::error::LorenzError;
use crate::numerical::ensemble::Ensemble;
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use log::{error, info};
use std::time::Duration;

/// screen pixels per point of line width / marker size
const PX_PER_POINT: f32 = 1.4;
/// marker radius in view-box units per point of marker size
const MARKER_RADIUS_PER_POINT: f32 = 0.004;

/// gizmo groups for the three trail widths; a gizmo group has a single line width
#[derive(Default, Reflect, GizmoConfigGroup)]
struct ThinTrail;
#[derive(Default, Reflect, GizmoConfigGroup)]
struct MediumTrail;
#[derive(Default, Reflect, GizmoConfigGroup)]
struct ThickTrail;

/// precomputed trajectories, read-only for the lifetime of the window
#[derive(Resource)]
struct EnsembleData(Ensemble);

#[derive(Resource)]
struct AnimationSettings(AnimationConfig);

/// trails, markers and camera angles
#[derive(Resource)]
struct SceneState(RenderState);

/// frame counter and the wall clock interval that drives it
#[derive(Resource)]
struct Playback {
    clock: PlaybackClock,
    timer: Timer,
}

/// Creates and runs the ensemble animation. Blocks until the window is closed
///
/// # Arguments
/// * `ensemble` - trajectories produced by `Ensemble::generate`
/// * `config` - playback, camera and styling parameters
pub fn create_ensemble_animation(
    ensemble: Ensemble,
    config: AnimationConfig,
) -> Result<(), LorenzError> {
    config.validate()?;
    if config.total_frames > ensemble.samples() {
        return Err(LorenzError::InvalidConfig(format!(
            "{} frames requested but trajectories only hold {} samples",
            config.total_frames,
            ensemble.samples()
        )));
    }
    let [r, g, b] = config.background;
    let state = RenderState::new(ensemble.len(), &config);
    let playback = Playback {
        clock: PlaybackClock::new(config.total_frames, config.repeat),
        timer: Timer::new(
            Duration::from_millis(config.frame_interval_ms),
            TimerMode::Repeating,
        ),
    };
    info!(
        "playing {} trajectories, {} frames every {} ms",
        ensemble.len(),
        config.total_frames,
        config.frame_interval_ms
    );
    info!("Controls: Space pause, R camera mode, left-click drag to rotate, scroll to zoom");

    let exit = App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Lorenz ensemble".to_string(),
                        ..default()
                    }),
                    ..default()
                })
                // the global logger is simplelog
                .disable::<LogPlugin>(),
        )
        .init_gizmo_group::<ThinTrail>()
        .init_gizmo_group::<MediumTrail>()
        .init_gizmo_group::<ThickTrail>()
        .insert_resource(ClearColor(Color::srgb(r, g, b)))
        .insert_resource(EnsembleData(ensemble))
        .insert_resource(AnimationSettings(config))
        .insert_resource(SceneState(state))
        .insert_resource(playback)
        .add_systems(Startup, (setup_scene, configure_trail_gizmos))
        .add_systems(
            Update,
            (
                keyboard_controls,
                advance_playback,
                camera_controller,
                draw_ensemble,
            )
                .chain(),
        )
        .run();
    if let AppExit::Error(code) = exit {
        error!("animation window exited with code {}", code);
    }
    Ok(())
}

/// Bevy startup system: camera at the initial view
fn setup_scene(mut commands: Commands, scene: Res<SceneState>) {
    commands.spawn((Camera3d::default(), camera_transform(&scene.0)));
}

/// line width and dash pattern of each trail group
fn configure_trail_gizmos(
    mut config_store: ResMut<GizmoConfigStore>,
    settings: Res<AnimationSettings>,
) {
    let style = match settings.0.trail_style {
        TrailStyle::Solid => GizmoLineStyle::Solid,
        // long gaps between short dashes, close to a dash-dot-dot stroke
        TrailStyle::Dashed => GizmoLineStyle::Dashed {
            gap_scale: 5.0,
            line_scale: 2.0,
        },
        TrailStyle::Dotted => GizmoLineStyle::Dotted,
    };
    let widths = [
        TrailWidth::Thin.points(),
        TrailWidth::Medium.points(),
        TrailWidth::Thick.points(),
    ];
    let (config, _) = config_store.config_mut::<ThinTrail>();
    config.line.width = widths[0] * PX_PER_POINT;
    config.line.style = style;
    let (config, _) = config_store.config_mut::<MediumTrail>();
    config.line.width = widths[1] * PX_PER_POINT;
    config.line.style = style;
    let (config, _) = config_store.config_mut::<ThickTrail>();
    config.line.width = widths[2] * PX_PER_POINT;
    config.line.style = style;
}

/// Space pauses, R toggles the camera mode
fn keyboard_controls(
    keys: Res<ButtonInput<KeyCode>>,
    mut playback: ResMut<Playback>,
    mut scene: ResMut<SceneState>,
) {
    if keys.just_pressed(KeyCode::Space) {
        let paused = playback.clock.toggle_pause();
        info!("playback {}", if paused { "paused" } else { "resumed" });
    }
    if keys.just_pressed(KeyCode::KeyR) {
        let mode = scene.0.toggle_camera_mode();
        info!("camera mode: {:?}", mode);
    }
}

/// Bevy system that advances the frame index on the fixed interval and applies each frame
fn advance_playback(
    time: Res<Time>,
    mut playback: ResMut<Playback>,
    mut scene: ResMut<SceneState>,
    data: Res<EnsembleData>,
    mut exit: MessageWriter<AppExit>,
) {
    if playback.clock.is_paused() || playback.clock.is_finished() {
        return;
    }
    playback.timer.tick(time.delta());
    // several frames are due when the window loop runs slower than the interval
    for _ in 0..playback.timer.times_finished_this_tick() {
        match playback.clock.advance() {
            PlaybackEvent::Frame(i) => {
                if let Err(e) = scene.0.update(&data.0, i) {
                    error!("frame {} failed: {}", i, e);
                    exit.write(AppExit::error());
                    return;
                }
            }
            PlaybackEvent::Reset => scene.0.reset(),
            PlaybackEvent::Finished => {
                info!("playback finished");
                return;
            }
        }
    }
}

/// Bevy system that places the camera; with the mouse camera, drag rotates and scroll zooms
fn camera_controller(
    mut mouse_motion: MessageReader<MouseMotion>,
    mut scroll_events: MessageReader<MouseWheel>,
    mouse_input: Res<ButtonInput<MouseButton>>,
    mut scene: ResMut<SceneState>,
    mut camera_query: Query<&mut Transform, With<Camera3d>>,
) {
    if scene.0.camera_mode == CameraMode::Manual {
        let camera = &mut scene.0.camera;
        if mouse_input.pressed(MouseButton::Left) {
            for motion in mouse_motion.read() {
                camera.azimuth -= (motion.delta.x * 0.5) as f64;
                camera.elevation += (motion.delta.y * 0.5) as f64;
            }
        }
        for scroll in scroll_events.read() {
            camera.distance *= 1.0 - (scroll.y * 0.1) as f64;
            camera.distance = camera.distance.clamp(1.5, 20.0);
        }
    }
    // drop events that arrived while not dragging / in automatic mode
    mouse_motion.clear();
    scroll_events.clear();

    for mut transform in camera_query.iter_mut() {
        *transform = camera_transform(&scene.0);
    }
}

fn camera_transform(state: &RenderState) -> Transform {
    let eye = Vec3::from_array(state.camera.eye());
    let up = Vec3::from_array(state.camera.up());
    Transform::from_translation(eye).looking_at(Vec3::ZERO, up)
}

/// Bevy system that draws every visible trail and marker
fn draw_ensemble(
    mut thin: Gizmos<ThinTrail>,
    mut medium: Gizmos<MediumTrail>,
    mut thick: Gizmos<ThickTrail>,
    mut markers: Gizmos,
    scene: Res<SceneState>,
    data: Res<EnsembleData>,
    settings: Res<AnimationSettings>,
) {
    let bounds = &settings.0.view_bounds;
    for (track, trajectory) in scene.0.tracks.iter().zip(data.0.trajectories.iter()) {
        let Ok(prefix) = trajectory.prefix(track.visible) else {
            continue;
        };
        let [r, g, b] = track.color;
        if prefix.ncols() >= 2 {
            let line_color = Color::srgba(r, g, b, track.trail_alpha);
            let positions = prefix.column_iter().map(|p| {
                Vec3::from_array(to_view_box(bounds, &p.fixed_rows::<3>(0).into_owned()))
            });
            match track.width {
                TrailWidth::Thin => thin.linestrip(positions, line_color),
                TrailWidth::Medium => medium.linestrip(positions, line_color),
                TrailWidth::Thick => thick.linestrip(positions, line_color),
            }
        }
        if let Some(head) = track.marker {
            let position = Vec3::from_array(to_view_box(bounds, &head));
            markers.sphere(
                Isometry3d::from_translation(position),
                track.marker_size * MARKER_RADIUS_PER_POINT,
                Color::srgba(r, g, b, track.marker_alpha),
            );
        }
    }
}
