use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    PlayerUpdate,
    GameState,
}

/// Repeating outbound-update schedule. Only posts `UpdateKind`s into the session queue;
/// the driver does the sending.
pub struct UpdateTimer {
    handle: JoinHandle<()>,
}

impl UpdateTimer {
    pub fn start(
        player_period: Duration,
        game_state_period: Option<Duration>,
        due: UnboundedSender<UpdateKind>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut player = ticker(player_period);
            let mut game_state = game_state_period.map(ticker);
            // Both intervals fire immediately; skip that first tick.
            player.tick().await;
            if let Some(game_state) = game_state.as_mut() {
                game_state.tick().await;
            }

            loop {
                let kind = tokio::select! {
                    _ = player.tick() => UpdateKind::PlayerUpdate,
                    _ = next_tick(&mut game_state) => UpdateKind::GameState,
                };
                if due.send(kind).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Stops the schedule. Consumes the timer so it cannot be cancelled twice.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for UpdateTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn posts_both_kinds_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = UpdateTimer::start(
            Duration::from_millis(10),
            Some(Duration::from_millis(35)),
            tx,
        );

        let mut saw_player = false;
        let mut saw_state = false;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !(saw_player && saw_state) && tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
                Ok(Some(UpdateKind::PlayerUpdate)) => saw_player = true,
                Ok(Some(UpdateKind::GameState)) => saw_state = true,
                _ => break,
            }
        }
        assert!(saw_player && saw_state);

        timer.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        while rx.try_recv().is_ok() {}
        let after = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(matches!(after, Ok(None)));
    }

    #[tokio::test]
    async fn guests_only_send_player_updates() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = UpdateTimer::start(Duration::from_millis(5), None, tx);
        for _ in 0..5 {
            let kind = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
            assert!(matches!(kind, Ok(Some(UpdateKind::PlayerUpdate))));
        }
    }
}
