use crate::controller::TaskListController;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// 一定間隔で残り時間を再計算するタイマー
///
/// `TaskListController::start_countdown` からのみ生成される。`stop` で停止し、
/// 停止せずに破棄した場合はタスクを中断する。
pub struct CountdownTimer {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl CountdownTimer {
    pub(crate) fn spawn(
        controller: TaskListController,
        period: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            // 遅れたティックはまとめて実行しない（毎回現在時刻から計算し直すため）
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => controller.refresh_countdowns(Utc::now()),
                    _ = &mut stop_rx => break,
                }
            }
            debug!("カウントダウンタイマー停止");
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            running,
        }
    }

    /// タイマーを停止し、タスクの終了を待つ
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // 受信側が既に終了していても問題ない
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("カウントダウンタイマーの終了待ちに失敗: {}", e);
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.running.store(false, Ordering::SeqCst);
    }
}
