use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

use ecovision::capture::FileSink;
use ecovision::common::Position;
use ecovision::config::Configuration;
use ecovision::coordinator::SessionCoordinatorBuilder;
use ecovision::detect;
use ecovision::error::AppError;
use ecovision::game::GameState;
use ecovision::location::{LocationTracker, StaticProvider, WatchOptions};
use ecovision::media::test_pattern::TestPatternDevice;

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let configuration = Configuration::load()?;

    let detector = match detect::load_detector(&configuration.detection).await {
        Ok(detector) => detector,
        Err(e) => {
            tracing::error!("Error loading AI model: {}", e);
            return Err(e.into());
        }
    };

    let state = Arc::new(GameState::new(configuration.game.daily_challenge_goal));
    let tracker = LocationTracker::start(
        Arc::new(StaticProvider::new(
            Position::new(
                configuration.location.static_latitude,
                configuration.location.static_longitude,
            ),
            Duration::from_millis(configuration.location.resample_ms),
        )),
        WatchOptions {
            high_accuracy: configuration.location.high_accuracy,
        },
    );
    let sink = Arc::new(FileSink::new(configuration.capture.output_dir.clone()));

    let mut coordinator = SessionCoordinatorBuilder::new(configuration)
        .device(Arc::new(TestPatternDevice::new()))
        .detector(detector)
        .state(Arc::clone(&state))
        .positions(tracker.subscribe())
        .capture_sink(sink)
        .build()?;

    // Render notifications the way the UI collaborator would.
    let mut notifications = coordinator.subscribe_notifications();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            tracing::info!("{} Tip: {}", notification.message, notification.tip);
        }
    });

    if tracker.latest().is_none() {
        tracing::info!("Waiting for location...");
    }
    coordinator.start().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!(
        "Shutting down: score {}, {} items registered",
        state.score(),
        state.detected_items_count()
    );
    coordinator.stop().await;
    Ok(())
}
