use std::sync::Arc;

use log::info;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::server::Server;

/// Drives every room's timer, one `Server::tick` per period, until the task is dropped.
pub async fn run(server: Arc<Server>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick fires immediately
    ticker.tick().await;
    info!("Tick scheduler running every {:?}", period);

    loop {
        ticker.tick().await;
        server.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ClientMessage, ServerMessage};
    use crate::room::{Phase, TimerSettings};
    use crate::sink::DiscardSink;

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_counts_down_once_per_period() {
        let server = Arc::new(Server::new(
            TimerSettings {
                work_secs: 3,
                break_secs: 2,
            },
            Arc::new(DiscardSink),
        ));
        let (id, mut rx) = server.connect().await;
        server
            .handle_message(
                &id,
                ClientMessage::Join {
                    room_id: "r1".to_string(),
                    username: "alice".to_string(),
                    peer_id: None,
                },
            )
            .await;
        server
            .handle_message(&id, ClientMessage::ToggleTimer { room_id: "r1".to_string() })
            .await;
        while rx.try_recv().is_ok() {}

        let driver = tokio::spawn(run(Arc::clone(&server), Duration::from_secs(1)));

        let mut syncs = Vec::new();
        let mut snapshots = Vec::new();
        while syncs.len() < 4 {
            let text = rx.recv().await.unwrap();
            match serde_json::from_str::<ServerMessage>(&text).unwrap() {
                ServerMessage::TimerSync { timer } => syncs.push(timer),
                ServerMessage::UpdateRoom { room } => snapshots.push(room),
                other @ ServerMessage::Connected { .. } => panic!("unexpected {other:?}"),
            }
        }
        driver.abort();

        // Counts down 3 -> 0, switches to BREAK (2s) and stops there.
        assert_eq!(syncs, vec![2, 1, 2, 2]);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].phase, Phase::Break);
        assert!(!snapshots[0].running);
    }
}
