//! Coordinator tests against an in-memory host and socket.

use super::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::TimeZone;

use crate::backend::{BackendError, Host, HostError, MonitoringStats, TradeExecuted};
use crate::domain::{ArbitrageOpportunity, LocalBotState, TradingMode};
use crate::notification::DesktopNotifier;
use crate::settings::{SettingKey, SettingsData, SettingsError, document};
use crate::state::{ConnectivityPolicy, SessionCache};
use crate::storage::{KeyValueStore, MemoryStorage};

// ==================== Fakes ====================

#[derive(Default)]
struct FakeHost {
    settings: Mutex<Option<String>>,
    running: AtomicBool,
    fail_start: AtomicBool,
    fail_read: AtomicBool,
    fail_write: AtomicBool,
    backend_exited: AtomicBool,
    notifications: Mutex<Vec<(String, String)>>,
    executed: Mutex<Vec<String>>,
}

impl FakeHost {
    fn with_settings(content: &str) -> Self {
        let host = Self::default();
        *host.settings.lock().unwrap() = Some(content.to_string());
        host
    }

    fn document(&self) -> SettingsData {
        document::parse(self.settings.lock().unwrap().as_deref().unwrap_or("")).settings
    }
}

#[async_trait]
impl Host for FakeHost {
    async fn start_python_backend(&self) -> Result<String, HostError> {
        Ok("Python backend started successfully".to_string())
    }

    async fn stop_python_backend(&self) -> Result<String, HostError> {
        Ok("Python backend stopped".to_string())
    }

    async fn backend_running(&self) -> bool {
        !self.backend_exited.load(Ordering::SeqCst)
    }

    async fn start_arbitrage_bot(&self) -> Result<String, HostError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(HostError::Command("python not found".to_string()));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok("Arbitrage bot started".to_string())
    }

    async fn stop_arbitrage_bot(&self) -> Result<String, HostError> {
        self.running.store(false, Ordering::SeqCst);
        Ok("Arbitrage bot stopped".to_string())
    }

    async fn get_arbitrage_bot_status(&self) -> Result<bool, HostError> {
        Ok(self.running.load(Ordering::SeqCst))
    }

    async fn execute_trade(&self, opportunity: &ArbitrageOpportunity) -> Result<String, HostError> {
        self.executed.lock().unwrap().push(opportunity.id.clone());
        Ok(format!("Trade {} sent to bot", opportunity.id))
    }

    async fn toggle_safe_mode(&self) -> Result<bool, HostError> {
        if self.fail_read.load(Ordering::SeqCst) {
            return Err(HostError::Command("Failed to toggle safe mode".to_string()));
        }
        let mut settings = self.document();
        let value = settings.toggle_safe_mode();
        let existing = self.settings.lock().unwrap().clone();
        let content = document::format(&settings, existing.as_deref());
        *self.settings.lock().unwrap() = Some(content);
        Ok(value)
    }

    async fn show_notification(&self, title: &str, body: &str) -> Result<(), HostError> {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }

    async fn read_settings_file(&self) -> Result<String, HostError> {
        if self.fail_read.load(Ordering::SeqCst) {
            let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
            return Err(HostError::Settings(SettingsError::Io(denied)));
        }
        self.settings
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HostError::Settings(SettingsError::NotFound(".env".into())))
    }

    async fn write_settings_file(&self, content: &str) -> Result<(), HostError> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(HostError::Command("read-only file system".to_string()));
        }
        *self.settings.lock().unwrap() = Some(content.to_string());
        Ok(())
    }

    async fn read_monitoring_stats(&self) -> Result<MonitoringStats, HostError> {
        Ok(MonitoringStats {
            scans: 12,
            ..MonitoringStats::default()
        })
    }
}

#[derive(Default)]
struct FakeSink {
    connected: AtomicBool,
    fail: AtomicBool,
    emitted: Mutex<Vec<String>>,
}

impl FakeSink {
    fn names(&self) -> Vec<String> {
        self.emitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for FakeSink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn emit(&self, event: &ClientEvent) -> Result<(), BackendError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::NotConnected);
        }
        self.emitted.lock().unwrap().push(event.name().to_string());
        Ok(())
    }
}

struct Harness {
    app: App,
    host: Arc<FakeHost>,
    sink: Arc<FakeSink>,
    storage: Arc<MemoryStorage>,
}

const SETTINGS: &str = "# trading\nSIMULATION_MODE=true\nEXECUTION_MODE=false\nSAFE_MODE=true\nRPC_URL=https://base.example\n";

async fn harness_with(policy: ConnectivityPolicy, host: FakeHost) -> Harness {
    let host = Arc::new(host);
    let sink = Arc::new(FakeSink::default());
    let storage = Arc::new(MemoryStorage::new());

    let mut config = Config::default();
    config.app.connectivity_policy = policy;

    let control = BotControl::new(host.clone(), SessionCache::new(storage.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new(false));
    let mut app = App::new(&config, control, sink.clone(), notifier);
    app.init().await;

    Harness {
        app,
        host,
        sink,
        storage,
    }
}

async fn harness() -> Harness {
    harness_with(ConnectivityPolicy::AllModes, FakeHost::with_settings(SETTINGS)).await
}

fn now() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
}

async fn connect(h: &mut Harness) {
    h.sink.connected.store(true, Ordering::SeqCst);
    h.app.handle_server_event(ServerEvent::Connected).await;
}

fn opportunity(id: &str, profit_pct: f64) -> ArbitrageOpportunity {
    ArbitrageOpportunity {
        id: id.to_string(),
        pair: "WETH/USDC".to_string(),
        buy_dex: "Uniswap".to_string(),
        sell_dex: "Aerodrome".to_string(),
        buy_price: 1.0,
        sell_price: 1.003,
        profit_pct,
        profit_usd: 5.0,
        volume: 20_000.0,
        timestamp: 1_700_000_000_000,
    }
}

// ==================== Startup ====================

#[tokio::test]
async fn test_init_loads_local_state_from_settings() {
    let h = harness().await;

    let local = h.app.state().local.as_ref().unwrap();
    assert_eq!(local.mode, TradingMode::Simulation);
    assert!(local.safe_mode);
    assert!(!local.is_running);
    assert!(h.app.state().settings.simulation_mode);
    assert!(h.storage.get("bot_state").await.unwrap().is_some());
}

#[tokio::test]
async fn test_launch_backend_reports_connect_delay() {
    let mut h = harness().await;

    let delay = h.app.launch_backend().await;

    assert_eq!(delay, Config::default().backend.connect_delay);
    assert_eq!(h.app.state().backend, BackendStatus::Running);
}

// ==================== Bot control ====================

#[tokio::test]
async fn test_start_requires_connection_under_all_modes() {
    let mut h = harness().await;

    let err = h.app.handle_command(Command::Start, now()).await.unwrap_err();

    assert!(matches!(err, AppError::Blocked("Backend connection required")));
    assert!(!h.host.running.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_start_offline_in_simulation_under_live_only() {
    let mut h = harness_with(ConnectivityPolicy::LiveOnly, FakeHost::with_settings(SETTINGS)).await;

    h.app.handle_command(Command::Start, now()).await.unwrap();

    let local = h.app.state().local.as_ref().unwrap();
    assert!(local.is_running);
    assert_eq!(local.last_start_time, Some(now().timestamp_millis()));
    // Not connected, so nothing is emitted.
    assert!(h.sink.names().is_empty());
}

#[tokio::test]
async fn test_start_connected_emits_and_resets_session() {
    let mut h = harness().await;
    connect(&mut h).await;

    h.app.handle_command(Command::Start, now()).await.unwrap();

    assert!(h.host.running.load(Ordering::SeqCst));
    assert_eq!(
        h.sink.names(),
        vec!["get_settings", "sync_bot_state", "start_bot"]
    );
    let session = h.storage.get("bot_session_data").await.unwrap().unwrap();
    assert!(session.contains("\"sessionTrades\":0"));
    assert!(h.app.state().notice.as_ref().unwrap().outcome.success);
}

#[tokio::test]
async fn test_failed_start_reverts_optimistic_update() {
    let host = FakeHost::with_settings(SETTINGS);
    host.fail_start.store(true, Ordering::SeqCst);
    let mut h = harness_with(ConnectivityPolicy::AllModes, host).await;
    connect(&mut h).await;

    h.app.handle_command(Command::Start, now()).await.unwrap();

    assert!(!h.app.state().local.as_ref().unwrap().is_running);
    let notice = h.app.state().notice.as_ref().unwrap();
    assert!(!notice.outcome.success);
    assert!(notice.outcome.message.starts_with("Failed to start bot:"));
    assert!(!h.sink.names().contains(&"start_bot".to_string()));
}

#[tokio::test]
async fn test_stop_emits_stop_bot() {
    let mut h = harness().await;
    connect(&mut h).await;
    h.app.handle_command(Command::Start, now()).await.unwrap();

    h.app.handle_command(Command::Stop, now()).await.unwrap();

    assert!(!h.host.running.load(Ordering::SeqCst));
    assert!(!h.app.state().local.as_ref().unwrap().is_running);
    assert_eq!(h.sink.names().last().unwrap(), "stop_bot");
}

// ==================== Toggles ====================

#[tokio::test]
async fn test_toggle_mode_rewrites_settings_document() {
    let mut h = harness().await;
    connect(&mut h).await;

    h.app.handle_command(Command::ToggleMode, now()).await.unwrap();

    let saved = h.host.document();
    assert!(!saved.simulation_mode);
    assert!(saved.execution_mode);
    let content = h.host.settings.lock().unwrap().clone().unwrap();
    assert!(content.contains("# trading"));
    assert!(content.contains("RPC_URL=https://base.example"));

    assert_eq!(h.app.state().local.as_ref().unwrap().mode, TradingMode::Live);
    assert!(!h.app.state().settings.simulation_mode);
    assert!(!h.app.form().saved().simulation_mode);
    assert_eq!(h.sink.names().last().unwrap(), "toggle_mode");
    assert_eq!(
        h.app.state().notice.as_ref().unwrap().outcome.message,
        "Switched to live mode"
    );
}

#[tokio::test]
async fn test_toggle_mode_failure_keeps_previous_mode() {
    let host = FakeHost::with_settings(SETTINGS);
    host.fail_write.store(true, Ordering::SeqCst);
    let mut h = harness_with(ConnectivityPolicy::AllModes, host).await;
    connect(&mut h).await;

    h.app.handle_command(Command::ToggleMode, now()).await.unwrap();

    assert_eq!(
        h.app.state().local.as_ref().unwrap().mode,
        TradingMode::Simulation
    );
    assert!(!h.app.state().notice.as_ref().unwrap().outcome.success);
    assert!(!h.sink.names().contains(&"toggle_mode".to_string()));
}

#[tokio::test]
async fn test_toggles_blocked_while_running() {
    let mut h = harness().await;
    connect(&mut h).await;
    h.app.handle_command(Command::Start, now()).await.unwrap();

    assert!(matches!(
        h.app.handle_command(Command::ToggleMode, now()).await,
        Err(AppError::Blocked(_))
    ));
    assert!(matches!(
        h.app.handle_command(Command::ToggleSafeMode, now()).await,
        Err(AppError::Blocked(_))
    ));
}

#[tokio::test]
async fn test_toggle_safe_mode() {
    let mut h = harness().await;
    connect(&mut h).await;

    h.app.handle_command(Command::ToggleSafeMode, now()).await.unwrap();

    assert!(!h.app.state().local.as_ref().unwrap().safe_mode);
    assert!(!h.host.document().safe_mode);
    assert_eq!(
        h.app.state().notice.as_ref().unwrap().outcome.message,
        "Safe mode disabled"
    );
    assert_eq!(h.sink.names().last().unwrap(), "toggle_safe_mode");
}

// ==================== Connectivity ====================

#[tokio::test]
async fn test_connection_loss_stops_running_bot() {
    let mut h = harness().await;
    connect(&mut h).await;
    h.app.handle_command(Command::Start, now()).await.unwrap();

    h.sink.connected.store(false, Ordering::SeqCst);
    h.app.handle_server_event(ServerEvent::Disconnected).await;

    assert!(!h.host.running.load(Ordering::SeqCst));
    let local = h.app.state().local.as_ref().unwrap();
    assert!(!local.is_running);
    assert!(!h.app.state().effective(now()).status.is_running);
}

#[tokio::test]
async fn test_network_offline_command_stops_bot() {
    let mut h = harness().await;
    connect(&mut h).await;
    h.app.handle_command(Command::Start, now()).await.unwrap();

    h.app.handle_command(Command::Offline, now()).await.unwrap();

    assert!(!h.app.state().local.as_ref().unwrap().is_running);
    assert!(!h.app.state().connectivity.network_online);
}

#[tokio::test]
async fn test_reconnect_syncs_local_state() {
    let mut h = harness().await;
    connect(&mut h).await;
    h.sink.connected.store(false, Ordering::SeqCst);
    h.app.handle_server_event(ServerEvent::Disconnected).await;

    connect(&mut h).await;

    let names = h.sink.names();
    assert_eq!(
        names,
        vec!["get_settings", "sync_bot_state", "get_settings", "sync_bot_state"]
    );
}

// ==================== Trades and opportunities ====================

#[tokio::test]
async fn test_profitable_trade_notifies_and_persists_session() {
    let mut h = harness().await;

    h.app
        .handle_server_event(ServerEvent::TradeExecuted(TradeExecuted { profit: 2.5 }))
        .await;
    h.app
        .handle_server_event(ServerEvent::TradeExecuted(TradeExecuted { profit: -1.0 }))
        .await;

    let notifications = h.host.notifications.lock().unwrap().clone();
    assert_eq!(
        notifications,
        vec![("Trade Executed!".to_string(), "Profit: $2.50".to_string())]
    );
    let local = h.app.state().local.as_ref().unwrap();
    assert_eq!(local.session_trades, 2);
    assert_eq!(local.session_profit, 1.5);
    let session = h.storage.get("bot_session_data").await.unwrap().unwrap();
    assert!(session.contains("\"sessionTrades\":2"));
}

#[tokio::test]
async fn test_execute_emits_selected_opportunity() {
    let mut h = harness().await;
    connect(&mut h).await;
    h.app.handle_command(Command::Start, now()).await.unwrap();
    h.app
        .handle_server_event(ServerEvent::Opportunity(opportunity("low", 0.5)))
        .await;
    h.app
        .handle_server_event(ServerEvent::Opportunity(opportunity("high", 2.0)))
        .await;

    h.app.handle_command(Command::Execute(1), now()).await.unwrap();

    assert_eq!(h.sink.names().last().unwrap(), "execute_trade");
    assert!(h.host.executed.lock().unwrap().is_empty());
    let message = &h.app.state().notice.as_ref().unwrap().outcome.message;
    assert!(message.contains("2.00%"));
}

#[tokio::test]
async fn test_execute_falls_back_to_host_when_emit_fails() {
    let mut h = harness().await;
    connect(&mut h).await;
    h.app.handle_command(Command::Start, now()).await.unwrap();
    h.app
        .handle_server_event(ServerEvent::Opportunity(opportunity("only", 1.0)))
        .await;
    h.sink.fail.store(true, Ordering::SeqCst);

    h.app.handle_command(Command::Execute(1), now()).await.unwrap();

    assert_eq!(*h.host.executed.lock().unwrap(), vec!["only".to_string()]);
}

#[tokio::test]
async fn test_execute_blocked_when_stopped() {
    let mut h = harness().await;
    connect(&mut h).await;

    let err = h.app.handle_command(Command::Execute(1), now()).await.unwrap_err();

    assert!(matches!(err, AppError::Blocked(_)));
}

#[tokio::test]
async fn test_simulation_ticks_until_backend_feeds() {
    let mut h = harness().await;

    assert!(h.app.tick_simulation(now()));
    assert_eq!(h.app.state().opportunities.len(), 1);

    h.app
        .handle_server_event(ServerEvent::Opportunity(opportunity("real", 1.0)))
        .await;
    assert!(!h.app.tick_simulation(now()));
}

// ==================== Settings form ====================

#[tokio::test]
async fn test_save_is_local_first_then_emits() {
    let mut h = harness().await;
    connect(&mut h).await;

    h.app
        .handle_command(Command::Edit(SettingKey::MinProfitPct, "2.5".into()), now())
        .await
        .unwrap();
    h.app.handle_command(Command::Save, now()).await.unwrap();

    assert_eq!(h.host.document().min_profit_pct, 2.5);
    assert_eq!(h.app.state().settings.min_profit_pct, 2.5);
    assert!(!h.app.form().is_dirty());
    assert_eq!(h.sink.names().last().unwrap(), "update_settings");
}

#[tokio::test]
async fn test_save_offline_still_writes_file() {
    let mut h = harness().await;

    h.app
        .handle_command(Command::Set(SettingKey::SimulationMode, "false".into()), now())
        .await
        .unwrap();
    h.app.handle_command(Command::Save, now()).await.unwrap();

    let saved = h.host.document();
    assert!(!saved.simulation_mode);
    assert!(saved.execution_mode);
    assert_eq!(h.app.state().local.as_ref().unwrap().mode, TradingMode::Live);
    assert!(h.sink.names().is_empty());
}

#[tokio::test]
async fn test_invalid_commit_sets_failed_notice() {
    let mut h = harness().await;

    h.app
        .handle_command(Command::Edit(SettingKey::MaxSlippage, "lots".into()), now())
        .await
        .unwrap();
    h.app
        .handle_command(Command::Commit(SettingKey::MaxSlippage), now())
        .await
        .unwrap();

    assert!(!h.app.state().notice.as_ref().unwrap().outcome.success);
    assert!(!h.app.form().is_dirty());
}

#[tokio::test]
async fn test_unreadable_settings_are_left_alone() {
    let host = FakeHost::with_settings(SETTINGS);
    let mut h = harness_with(ConnectivityPolicy::AllModes, host).await;
    connect(&mut h).await;
    h.host.fail_read.store(true, Ordering::SeqCst);

    h.app
        .handle_command(Command::Set(SettingKey::SafeMode, "false".into()), now())
        .await
        .unwrap();
    h.app.handle_command(Command::Save, now()).await.unwrap();

    assert!(!h.app.state().notice.as_ref().unwrap().outcome.success);
    assert!(h.app.form().is_dirty());
    assert!(!h.sink.names().contains(&"update_settings".to_string()));

    h.app.handle_command(Command::ToggleMode, now()).await.unwrap();
    h.app.handle_command(Command::ToggleSafeMode, now()).await.unwrap();

    let local = h.app.state().local.as_ref().unwrap();
    assert_eq!(local.mode, TradingMode::Simulation);
    assert!(local.safe_mode);
    assert!(!h.app.state().notice.as_ref().unwrap().outcome.success);
    assert_eq!(h.host.settings.lock().unwrap().as_deref(), Some(SETTINGS));
}

#[tokio::test]
async fn test_save_without_document_writes_template() {
    let mut h = harness_with(ConnectivityPolicy::AllModes, FakeHost::default()).await;

    h.app.handle_command(Command::Save, now()).await.unwrap();

    assert!(h.app.state().notice.as_ref().unwrap().outcome.success);
    let content = h.host.settings.lock().unwrap().clone().unwrap();
    assert!(content.starts_with("# Arbitrage Bot Configuration"));
}

#[tokio::test]
async fn test_settings_data_refreshes_clean_form_only() {
    let mut h = harness().await;
    let mut incoming = SettingsData::default();
    incoming.position_size_usd = 25.0;

    h.app
        .handle_server_event(ServerEvent::SettingsData(incoming.clone()))
        .await;
    assert_eq!(h.app.form().draft().position_size_usd, 25.0);

    h.app
        .handle_command(Command::Edit(SettingKey::PositionSizeUsd, "7".into()), now())
        .await
        .unwrap();
    incoming.position_size_usd = 30.0;
    h.app
        .handle_server_event(ServerEvent::SettingsData(incoming))
        .await;
    assert_eq!(h.app.form().input(SettingKey::PositionSizeUsd).unwrap().text(), "7");
}

// ==================== Misc ====================

#[tokio::test]
async fn test_tab_quit_and_frames() {
    let mut h = harness().await;

    assert!(h.app.frame(now()).is_some());
    assert!(h.app.frame(now()).is_none());

    h.app.handle_command(Command::Tab(Tab::Info), now()).await.unwrap();
    assert_eq!(h.app.state().active_tab, Tab::Info);
    assert!(h.app.frame(now()).unwrap().contains("Quick Start Guide"));

    h.app.handle_command(Command::Quit, now()).await.unwrap();
    assert!(h.app.should_quit());
}

#[tokio::test]
async fn test_poll_stats_and_process_exit() {
    let mut h = harness_with(ConnectivityPolicy::LiveOnly, FakeHost::with_settings(SETTINGS)).await;
    h.app.poll_stats().await;
    assert_eq!(h.app.state().stats.as_ref().unwrap().scans, 12);

    h.app.handle_command(Command::Start, now()).await.unwrap();
    h.host.running.store(false, Ordering::SeqCst);
    h.app.refresh_bot_process().await;

    assert!(!h.app.state().local.as_ref().unwrap().is_running);
}

#[tokio::test]
async fn test_backend_exit_is_noticed() {
    let mut h = harness().await;
    h.app.launch_backend().await;
    assert_eq!(h.app.state().backend, BackendStatus::Running);

    h.app.refresh_backend_process().await;
    assert_eq!(h.app.state().backend, BackendStatus::Running);

    h.host.backend_exited.store(true, Ordering::SeqCst);
    h.app.refresh_backend_process().await;

    assert_eq!(h.app.state().backend, BackendStatus::Stopped);
    assert_eq!(
        h.app.state().logs.latest().unwrap().message,
        "Backend process exited"
    );
}

#[tokio::test]
async fn test_init_warns_when_bot_was_left_running() {
    let mut h = harness().await;
    let previous = LocalBotState {
        is_running: true,
        ..LocalBotState::default()
    };
    SessionCache::new(h.storage.clone())
        .save_bot_state(&previous)
        .await
        .unwrap();

    h.app.init().await;

    assert!(!h.app.state().local.as_ref().unwrap().is_running);
    let latest = h.app.state().logs.latest().unwrap();
    assert_eq!(latest.level, LogLevel::Warning);
    assert!(latest.message.starts_with("Bot was running"));
}
