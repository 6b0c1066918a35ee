#![allow(non_snake_case)]
use RustedLorenz::Utils::animation_3d::create_ensemble_animation;
use RustedLorenz::Utils::logger::init_logger;
use RustedLorenz::config::LorenzConfig;
use RustedLorenz::error::LorenzError;
use RustedLorenz::numerical::ensemble::Ensemble;
use log::{error, info};
use simplelog::LevelFilter;

fn run(config: LorenzConfig) -> Result<(), LorenzError> {
    config.validate()?;
    info!(
        "integrating {} Lorenz trajectories (seed {}) over [{}, {}] at {} samples",
        config.ensemble.n_trajectories,
        config.ensemble.seed,
        config.ensemble.t_start,
        config.ensemble.t_end,
        config.ensemble.samples
    );
    let ensemble = Ensemble::generate(&config.ensemble)?;
    create_ensemble_animation(ensemble, config.animation)
}

fn main() {
    init_logger(LevelFilter::Info, None);
    if let Err(e) = run(LorenzConfig::default()) {
        error!("{}", e);
        std::process::exit(1);
    }
}
