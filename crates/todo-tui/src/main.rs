mod actions;
mod app;
mod form;
mod terminal;
mod ui;

use actions::{dispatch, Command, Outcome};
use anyhow::Context;
use app::App;
use chrono::Utc;
use crossterm::event::{self, Event, KeyEventKind};
use infrastructure::{DynamoDbClient, DynamoTaskStore, InMemoryTaskStore, TaskStore};
use shared::{init_tracing, Config, StoreBackend};
use std::sync::Arc;
use std::time::Duration;
use task_list::TaskListController;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("設定の読み込みに失敗")?;
    init_tracing(&config).map_err(|e| anyhow::anyhow!("ロガーの初期化に失敗: {e}"))?;

    info!(
        environment = %config.environment,
        backend = config.store_backend.as_str(),
        table = %config.dynamodb_table,
        "To-Do リストを起動"
    );

    let store = build_store(&config).await?;
    let controller = TaskListController::new(store);

    let mut app = App::new(config.confirm_delete);
    match controller.load().await {
        Ok(count) => info!(count, "タスク一覧を取得"),
        Err(e) => {
            error!(error = %e, "タスク一覧の取得に失敗");
            app.error(format!("Could not load tasks: {e}"));
        }
    }

    let timer = controller.start_countdown(config.tick_interval);

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = Handle::current();
    let ui_controller = controller.clone();
    let result = tokio::task::spawn_blocking(move || run_ui(app, ui_controller, handle, tx, rx))
        .await
        .context("画面スレッドが異常終了")?;

    if let Some(timer) = timer {
        timer.stop().await;
    }
    info!("To-Do リストを終了");
    result
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn TaskStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("メモリ上のストアを使用します（終了時に内容は失われます）");
            Ok(Arc::new(InMemoryTaskStore::new()))
        }
        StoreBackend::DynamoDb => {
            let db = DynamoDbClient::new(config).await;
            // ローカル接続時はテーブルが無ければ作る
            if config.dynamodb_endpoint.is_some() {
                db.ensure_table()
                    .await
                    .context("tasks テーブルの準備に失敗")?;
            }
            Ok(Arc::new(DynamoTaskStore::new(db)))
        }
    }
}

fn run_ui(
    mut app: App,
    controller: TaskListController,
    handle: Handle,
    tx: UnboundedSender<Outcome>,
    mut rx: UnboundedReceiver<Outcome>,
) -> anyhow::Result<()> {
    let mut tui = terminal::setup().context("端末の初期化に失敗")?;
    let result = event_loop(&mut tui, &mut app, &controller, &handle, &tx, &mut rx);
    terminal::restore(&mut tui).context("端末の復元に失敗")?;
    result
}

fn event_loop(
    tui: &mut terminal::Tui,
    app: &mut App,
    controller: &TaskListController,
    handle: &Handle,
    tx: &UnboundedSender<Outcome>,
    rx: &mut UnboundedReceiver<Outcome>,
) -> anyhow::Result<()> {
    loop {
        while let Ok(outcome) = rx.try_recv() {
            app.apply_outcome(outcome);
        }

        let views = controller.views(Utc::now());
        app.clamp_selection(views.len());
        tui.draw(|frame| ui::draw(frame, app, &views))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key, &views) {
            Some(Command::Quit) => return Ok(()),
            Some(command) => {
                handle.spawn(dispatch(controller.clone(), command, tx.clone()));
            }
            None => {}
        }
    }
}
