#[cfg(test)]
mod tests {
    use crate::Utils::render_state::RenderState;
    use crate::config::{AnimationConfig, EnsembleConfig, LorenzConfig};
    use crate::numerical::ensemble::{Ensemble, TimeGrid, integrate_trajectory};
    use crate::numerical::lorenz::SystemParameters;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn small_config(seed: u64) -> EnsembleConfig {
        EnsembleConfig::default()
            .with_seed(seed)
            .with_trajectories(3)
            .with_window(0.0, 1.0, 5)
    }

    #[test]
    fn test_small_ensemble_shape_and_finiteness() {
        // seed 1, N = 3, 5 samples over [0, 1]: a 3 x 5 x 3 block of finite numbers
        let ensemble = Ensemble::generate(&small_config(1)).unwrap();
        assert_eq!(ensemble.len(), 3);
        assert_eq!(ensemble.samples(), 5);
        for (trajectory, y0) in ensemble.trajectories.iter().zip(ensemble.initial_states.iter()) {
            assert_eq!(trajectory.points().shape(), (3, 5));
            assert!(trajectory.is_finite());
            assert_eq!(trajectory.point(0), *y0);
        }
    }

    #[test]
    fn test_small_ensemble_frame_two() {
        let ensemble = Ensemble::generate(&small_config(1)).unwrap();
        let mut state = RenderState::new(ensemble.len(), &AnimationConfig::default());
        state.update(&ensemble, 2).unwrap();
        for (track, trajectory) in state.tracks.iter().zip(ensemble.trajectories.iter()) {
            assert_eq!(trajectory.prefix(2).unwrap().ncols(), 2);
            assert_eq!(track.visible, 2);
            assert_eq!(track.marker, Some(trajectory.point(1)));
        }
    }

    #[test]
    fn test_same_seed_same_ensemble() {
        let a = Ensemble::generate(&small_config(7)).unwrap();
        let b = Ensemble::generate(&small_config(7)).unwrap();
        assert_eq!(a.initial_states, b.initial_states);
        assert_eq!(a.trajectories, b.trajectories);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = Ensemble::generate(&small_config(1)).unwrap();
        let b = Ensemble::generate(&small_config(2)).unwrap();
        assert_ne!(a.initial_states, b.initial_states);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let config = EnsembleConfig::default()
            .with_trajectories(8)
            .with_window(0.0, 2.0, 200);
        let parallel = Ensemble::generate(&config.clone().with_parallel(true)).unwrap();
        let sequential = Ensemble::generate(&config.with_parallel(false)).unwrap();
        assert_eq!(parallel.trajectories, sequential.trajectories);
    }

    #[test]
    fn test_default_ensemble_lengths_and_attractor() {
        let config = LorenzConfig::default();
        let ensemble = Ensemble::generate(&config.ensemble).unwrap();
        assert_eq!(ensemble.len(), 50);
        for trajectory in ensemble.trajectories.iter() {
            assert_eq!(trajectory.len(), 1310);
            assert!(trajectory.is_finite());
            // after t = 4 every orbit has been pulled onto the bounded attractor
            let last = trajectory.point(trajectory.len() - 1);
            assert!(last[0].abs() < 30.0 && last[1].abs() < 40.0);
            assert!(last[2] > -1.0 && last[2] < 60.0);
        }
        // every frame of the default animation is within the samples
        let mut state = RenderState::new(ensemble.len(), &config.animation);
        state.update(&ensemble, config.animation.total_frames - 1).unwrap();
    }

    #[test]
    fn test_refined_tolerance_agrees_on_short_window() {
        // chaos amplifies differences, so compare over a window shorter than a Lyapunov time
        let params = SystemParameters::default();
        let grid = TimeGrid::linspace(0.0, 0.5, 51).unwrap();
        let y0 = Vector3::new(1.0, 1.0, 1.0);
        let coarse = integrate_trajectory(params, &y0, &grid, 1e-8, 1e-10).unwrap();
        let fine = integrate_trajectory(params, &y0, &grid, 1e-12, 1e-14).unwrap();
        for i in 0..grid.len() {
            let (a, b) = (coarse.point(i), fine.point(i));
            for k in 0..3 {
                assert_relative_eq!(a[k], b[k], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_equilibrium_stays_put() {
        let params = SystemParameters::default();
        let grid = TimeGrid::linspace(0.0, 4.0, 100).unwrap();
        let c_plus = params.equilibria()[1];
        let trajectory = integrate_trajectory(params, &c_plus, &grid, 1e-10, 1e-12).unwrap();
        let last = trajectory.point(99);
        assert_relative_eq!((last - c_plus).norm(), 0.0, epsilon = 1e-6);
    }
}
