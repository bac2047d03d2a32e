//! Periodic fan-out of registry state to exercise rooms.
//!
//! Every tick publishes, for each exercise, its `count` and `status`, then
//! `tips` when there are any, then one `cycle_complete` per milestone
//! raised since the previous tick. State is resent in full each tick; no
//! diffing is done.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use repcoach_core::Milestone;
use repcoach_protocol::ServerMessage;

use crate::registry::{RegistryError, RegistryHandle, TickReport};
use crate::rooms::{RoomKey, RoomManager};

/// Default broadcast period
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(500);

pub struct BroadcastDispatcher {
    registry: RegistryHandle,
    rooms: RoomManager,
    period: Duration,
}

impl BroadcastDispatcher {
    pub fn new(registry: RegistryHandle, rooms: RoomManager, period: Duration) -> Self {
        Self {
            registry,
            rooms,
            period,
        }
    }

    /// Ticks until cancelled or the registry stops.
    pub async fn run(self, cancel_token: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = self.period.as_millis() as u64, "Broadcast dispatcher started");

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Broadcast dispatcher shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        debug!(error = %e, "Broadcast dispatcher stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Runs one broadcast pass over every registry entry.
    pub async fn tick(&self) -> Result<(), RegistryError> {
        let reports = self.registry.drain_tick().await?;
        for report in &reports {
            self.publish_report(report).await;
        }
        Ok(())
    }

    async fn publish_report(&self, report: &TickReport) {
        let snap = &report.snapshot;
        let exercise = snap.exercise.as_str();
        let room = RoomKey::Exercise(snap.exercise);

        let mut messages = vec![
            ServerMessage::count(exercise, snap.reps),
            ServerMessage::status(exercise, &snap.status),
        ];
        if !snap.tips.is_empty() {
            messages.push(ServerMessage::tips(exercise, snap.tips.clone()));
        }
        for milestone in &report.milestones {
            match milestone {
                Milestone::CycleComplete { cycles } => {
                    messages.push(ServerMessage::cycle_complete(exercise, *cycles));
                }
            }
        }

        for msg in &messages {
            let delivery = self.rooms.publish(&room, msg).await;
            if delivery.dropped > 0 {
                debug!(
                    exercise = %exercise,
                    kind = msg.kind(),
                    dropped = delivery.dropped,
                    "Dropped broadcast for slow subscribers"
                );
            }
        }
        trace!(exercise = %exercise, messages = messages.len(), "Published tick");
    }
}
