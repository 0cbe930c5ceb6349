use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};

use crate::{
    backend::{self, MonitorSignal, RealtimeMonitor},
    cli::{Cli, Command},
    domain, infra, ui,
    usecases::{
        self, bootstrap,
        context::AppContext,
        contracts::DmApi,
        controller::ViewController,
    },
};

/// How often the controller is offered a chance to run the DM poll; the
/// configured poll interval decides whether a fetch actually happens.
const TICK_PERIOD: Duration = Duration::from_millis(500);

pub fn run(cli: Cli) -> Result<()> {
    match cli.command_or_default() {
        Command::Run => {
            let context = bootstrap::bootstrap(cli.config.as_deref())?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime.block_on(run_dashboard(context))
        }
    }
}

async fn run_dashboard(context: AppContext) -> Result<()> {
    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        backend = backend::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let listen_addr: SocketAddr = context.config.ui.listen_addr.parse().map_err(|source| {
        infra::error::AppError::InvalidListenAddr {
            value: context.config.ui.listen_addr.clone(),
            source,
        }
    })?;
    let poll_interval = Duration::from_millis(context.config.sync.dm_poll_interval_ms);

    let mut controller = ViewController::new(context.backend.clone(), poll_interval);
    controller.initialize().await;
    let controller = Arc::new(Mutex::new(controller));

    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let _monitor = RealtimeMonitor::start(context.backend.base_url(), signal_tx)?;
    spawn_signal_pump(Arc::clone(&controller), signal_rx);
    spawn_poll_ticker(Arc::clone(&controller), context.backend.clone());

    ui::server::serve(listen_addr, controller).await
}

fn spawn_signal_pump(
    controller: Arc<Mutex<ViewController<backend::HttpBackend>>>,
    mut signal_rx: mpsc::UnboundedReceiver<MonitorSignal>,
) {
    tokio::spawn(async move {
        while let Some(signal) = signal_rx.recv().await {
            let mut controller = controller.lock().await;
            match signal {
                MonitorSignal::Event(event) => controller.on_realtime(event),
                MonitorSignal::Status(status) => controller.set_connection_status(status),
            }
        }
    });
}

/// The poll fetch runs with the controller unlocked so a slow platform API
/// never blocks the dashboard handlers; the fetch ticket makes the deferred
/// apply safe against navigation races.
fn spawn_poll_ticker(
    controller: Arc<Mutex<ViewController<backend::HttpBackend>>>,
    api: backend::HttpBackend,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TICK_PERIOD);
        loop {
            ticker.tick().await;
            let request = controller.lock().await.begin_dm_poll(Instant::now());
            if let Some(request) = request {
                let result = api.list_dm_messages(&request.dm_id).await;
                controller.lock().await.finish_dm_poll(&request.ticket, result);
            }
        }
    });
}
