//! Scripted session: queue the samples, play locally, move playback to a
//! cast receiver and back.
//!
//! Run with `RUST_LOG=pmoplayer=debug` to see backend events. An optional
//! first argument names a YAML config file.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use pmoplayer::backend::{SimulatedCastPlayer, SimulatedLocalPlayer, event_channel};
use pmoplayer::{ChannelListener, DragReorder, PlayerConfig, QueueCoordinator};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = PlayerConfig::load(config_path.as_deref())?;

    let (tx, rx) = event_channel();
    let (listener, positions) = ChannelListener::new();
    let local = SimulatedLocalPlayer::new(tx.clone());
    let remote = SimulatedCastPlayer::new(tx);
    let (engine, receiver) = (local.driver(), remote.driver());
    let mut coordinator = QueueCoordinator::new(local, remote, rx, listener, &config)?;

    println!("Queue:");
    for sample in config.samples() {
        println!("  + {}", sample);
        coordinator.add_item(sample)?;
    }

    coordinator.select_queue_item(1)?;
    engine.set_position(Duration::from_secs(42));
    coordinator.process_events()?;

    println!("\nCast session starts...");
    receiver.connect_session();
    coordinator.process_events()?;
    println!(
        "  active backend: {}, receiver queue: {} items",
        coordinator.active_backend(),
        receiver.queue().len()
    );

    let mut drag = DragReorder::new();
    drag.on_move(0, 1);
    drag.on_move(1, 2);
    println!("\nDrag 0 -> 2: {:?}", drag.finish(&mut coordinator)?);

    receiver.finish_current_item();
    coordinator.process_events()?;

    println!("\nCast session ends...");
    receiver.disconnect_session();
    coordinator.process_events()?;
    println!("  active backend: {}", coordinator.active_backend());

    println!("\nQueue position changes:");
    for change in positions.try_iter() {
        println!("  {:?} -> {:?}", change.previous, change.current);
    }

    coordinator.release()?;
    Ok(())
}
