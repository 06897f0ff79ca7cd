use anyhow::Result;
use quanta::Clock;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trace_ghost::camera::{
    step_playback_speed, DirectUrl, FailedSource, FrameSource, MediaStore, ReferencePlayer,
    ThreadedCamera,
};
use trace_ghost::config::Config;
use trace_ghost::error::StreamError;
use trace_ghost::ghost::{GhostSettings, PracticeSettings};
use trace_ghost::pose::{BlazePoseLoader, PoseExtractor};
use trace_ghost::render::{Key, MinifbRenderer};
use trace_ghost::session::PracticeSession;
use trace_ghost::storage::SettingsStore;
use trace_ghost::tracker::{DetectionRate, TickOutcome};

const CONFIG_PATH: &str = "config.toml";

fn report(stream: &str, error: &StreamError) {
    error!(stream, "{error} ({})", error.remediation());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_or_default(CONFIG_PATH);
    let store = SettingsStore::from_config(&config.storage);
    let practice = PracticeSettings::load(&store, config.detection.rate);
    let ghost = GhostSettings::load(&store);
    info!(rate = %practice.fps, ghost = ghost.enabled, opacity = ghost.opacity, "settings loaded");

    // カメラ
    let (width, height);
    let mut camera: Box<dyn FrameSource> = match ThreadedCamera::start(&config.camera) {
        Ok(camera) => {
            (width, height) = camera.resolution();
            Box::new(camera)
        }
        Err(e) => {
            report("user", &e);
            (width, height) = (config.camera.width, config.camera.height);
            Box::new(FailedSource::new(e))
        }
    };

    // 参照動画
    let mut unavailable = FailedSource::new(StreamError::ReferencePlayback(
        "no reference video".to_string(),
    ));
    let mut player = match DirectUrl::new(config.reference.url.clone())
        .resolve("reference")
        .map_err(|e| StreamError::ReferencePlayback(format!("{e:#}")))
        .and_then(|url| ReferencePlayer::open(&url, config.reference.playback_rate))
    {
        Ok(player) => Some(player),
        Err(e) => {
            report("reference", &e);
            unavailable = FailedSource::new(e);
            None
        }
    };

    let extractor = PoseExtractor::new(BlazePoseLoader::new(config.model.clone()));
    let mut session = PracticeSession::new(extractor, Clock::new(), &config, practice, ghost);
    if let Err(e) = session.initialize_model() {
        report("model", &e);
    }

    let mut renderer = MinifbRenderer::new(
        "Trace",
        width as usize,
        height as usize,
        config.display.refresh_hz,
    )?;
    info!(
        "G: ghost, [ ]: opacity, 1/2/3: 15/30/60 fps, Space: play/pause, Home: restart, \
         Left/Right: seek, -/=: speed, R: retry model, Esc: quit"
    );

    let mut reported_camera = false;
    let mut reported_reference = false;

    while renderer.is_open() {
        for key in renderer.pressed_keys() {
            handle_key(key, &mut session, &store);
            if let Some(player) = &player {
                handle_playback_key(key, player);
            }
        }

        let reference: &mut dyn FrameSource = match player.as_mut() {
            Some(player) => player,
            None => &mut unavailable,
        };
        let (user_outcome, reference_outcome) =
            session.poll_detection(camera.as_mut(), reference);
        if matches!(user_outcome, TickOutcome::Waiting(_))
            && matches!(reference_outcome, TickOutcome::Waiting(_) | TickOutcome::Unchanged)
        {
            thread::sleep(session.yield_hint());
        }

        if !reported_camera {
            if let Some(e) = camera.error() {
                report("user", &e);
                reported_camera = true;
            }
        }
        if !reported_reference {
            if let Some(e) = reference.error() {
                report("reference", &e);
                reported_reference = true;
            }
        }

        let frame = session.render_tick(width as f32);
        let camera_frame = camera.frame();
        renderer.draw(camera_frame.as_ref(), &frame, session.ghost_settings())?;
    }

    session.stop();
    let (user, reference) = session.stats();
    info!(
        user_detections = user.detections,
        reference_detections = reference.detections,
        detect_errors = session.detect_errors(),
        "shutting down"
    );
    Ok(())
}

fn handle_playback_key(key: Key, player: &ReferencePlayer) {
    match key {
        Key::Space => {
            let paused = player.toggle_pause();
            info!(paused, "reference playback");
        }
        Key::Home => player.restart(),
        Key::Left => player.step(false),
        Key::Right => player.step(true),
        Key::Minus => player.set_playback_rate(step_playback_speed(player.playback_rate(), -1)),
        Key::Equal => player.set_playback_rate(step_playback_speed(player.playback_rate(), 1)),
        _ => {}
    }
}

fn handle_key(key: Key, session: &mut PracticeSession<BlazePoseLoader>, store: &SettingsStore) {
    match key {
        Key::G | Key::LeftBracket | Key::RightBracket => {
            let mut ghost = session.ghost_settings().clone();
            match key {
                Key::G => ghost.toggle(),
                Key::LeftBracket => ghost.adjust_opacity(-1),
                _ => ghost.adjust_opacity(1),
            }
            session.set_ghost_settings(ghost);
            if let Err(e) = session.ghost_settings().save(store) {
                warn!("failed to save ghost settings: {e:#}");
            }
        }
        Key::Key1 | Key::Key2 | Key::Key3 => {
            let rate = match key {
                Key::Key1 => DetectionRate::Hz15,
                Key::Key2 => DetectionRate::Hz30,
                _ => DetectionRate::Hz60,
            };
            session.set_rate(rate);
            info!(%rate, "detection rate changed");
            if let Err(e) = session.practice_settings().save(store) {
                warn!("failed to save practice settings: {e:#}");
            }
        }
        Key::R => match session.retry_model() {
            Ok(()) => info!("pose model reloaded"),
            Err(e) => report("model", &e),
        },
        _ => {}
    }
}
