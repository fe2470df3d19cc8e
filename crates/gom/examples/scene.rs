//! Scene Demo
//!
//! A tiny scene driven for a few frames:
//! - A `Gravity` system pulls every falling entity down each update
//! - Entities come and go, and a deferred batch watch reports each frame's
//!   changes once per tick
//! - A `wait_for` future resolves when the first crate lands
//!
//! Run with: RUST_LOG=debug cargo run -p gom --example scene

use gom::prelude::*;
use std::cell::Cell;
use tracing::info;

const LANDED: &str = "crate:landed";

struct Gravity {
    accel: f64,
}

impl NodeBehavior for Gravity {
    fn init(&self, node: &GameNode) {
        info!(id = ?node.id(), accel = self.accel, "gravity online");
    }
}

struct Falling {
    height: Cell<f64>,
    speed: Cell<f64>,
}

impl Falling {
    fn at(height: f64) -> Self {
        Self {
            height: Cell::new(height),
            speed: Cell::new(0.0),
        }
    }
}

impl NodeBehavior for Falling {
    fn update(&self, node: &GameNode, dt: f64) {
        let Some(gravity) = node
            .stage()
            .and_then(|stage| stage.system::<Gravity>())
            .and_then(|system| system.behavior_rc::<Gravity>())
        else {
            return;
        };

        self.speed.set(self.speed.get() + gravity.accel * dt);
        let height = (self.height.get() - self.speed.get() * dt).max(0.0);
        self.height.set(height);

        if height == 0.0 {
            info!(id = ?node.id(), "landed");
            node.set_disabled(true);
            if let Some(stage) = node.stage() {
                stage.notify(LANDED, NodeEvent::Node(node.clone()));
            }
        }
    }

    fn connected(&self, node: &GameNode) {
        info!(id = ?node.id(), height = self.height.get(), "spawned");
    }

    fn disconnected(&self, node: &GameNode) {
        info!(id = ?node.id(), "despawned");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let game = Game::new();
    let stage = Stage::with_id("level-1");
    stage
        .systems()
        .add(GameNode::with_id("gravity", Gravity { accel: 9.8 }));
    game.add_stage(&stage);

    stage.watchable().watch_batch(|batch| {
        let events: Vec<&str> = batch.keys().map(EventType::as_str).collect();
        info!(?events, "stage changed this frame");
    });

    let first_landing = stage.watchable().wait_for(LANDED, None);

    let low = GameNode::with_id("crate-low", Falling::at(1.0));
    let high = GameNode::with_id("crate-high", Falling::at(20.0));
    stage.entities().add(low.clone()).add(high.clone());

    let dt = 1.0 / 10.0;
    for _ in 0..10 {
        game.tick(dt);
    }

    match pollster::block_on(first_landing) {
        Ok(event) => info!(id = ?event.node().and_then(GameNode::id), "first landing"),
        Err(err) => info!(%err, "no landing"),
    }

    high.remove();
    game.tick(dt);

    info!(
        frame = game.frame(),
        elapsed = game.elapsed(),
        entities = stage.entities().len(),
        "done"
    );
}
