//! Application coordinator.
//!
//! Owns the [`AppState`] and the settings form. Server events, host log lines,
//! stdin commands and timers all arrive in one `select!` loop, so state is
//! only ever touched from this task.

mod command;
mod control;
mod error;
mod simulation;

pub use command::{Command, HELP};
pub use control::BotControl;
pub use error::AppError;
pub use simulation::MockOpportunities;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::{ClientEvent, EventSink, ServerEvent};
use crate::config::{Config, PollingConfig};
use crate::domain::{CommandOutcome, LocalBotState, LogEntry, LogLevel};
use crate::notification::{ConnectionData, ErrorData, Event, Notifier, ShutdownData, StartupData};
use crate::state::{
    AppState, Applied, BackendStatus, Connectivity, ConnectivityChange, Effect, Tab, classify,
    on_connectivity_change,
};
use crate::view::{self, SettingsForm, opportunities};

/// Log source for entries the client itself writes.
const APP_LOG_SOURCE: &str = "app";

/// Connect delay after a failed backend launch.
const FALLBACK_CONNECT_DELAY: Duration = Duration::from_secs(1);

pub struct App {
    state: AppState,
    form: SettingsForm,
    control: BotControl,
    sink: Arc<dyn EventSink>,
    notifier: Arc<dyn Notifier>,
    polling: PollingConfig,
    backend_url: String,
    connect_delay: Duration,
    mock: MockOpportunities,
    last_frame: String,
    quit: bool,
}

impl App {
    pub fn new(
        config: &Config,
        control: BotControl,
        sink: Arc<dyn EventSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: AppState::new(config.app.connectivity_policy),
            form: SettingsForm::default(),
            control,
            sink,
            notifier,
            polling: config.polling.clone(),
            backend_url: config.backend.url.clone(),
            connect_delay: config.backend.connect_delay,
            mock: MockOpportunities::new(Utc::now().timestamp_millis() as u64),
            last_frame: String::new(),
            quit: false,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn form(&self) -> &SettingsForm {
        &self.form
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Loads the local bot state and the settings document.
    pub async fn init(&mut self) {
        let cached = self.control.cached_state().await;
        let local = self.control.get_bot_status().await;
        if cached.is_some_and(|c| c.is_running) && !local.is_running {
            warn!("bot was running when the client last exited");
            self.log(
                LogLevel::Warning,
                "Bot was running when the client last exited; start it again to resume",
            );
        }
        info!(
            running = local.is_running,
            mode = %local.mode,
            safe_mode = local.safe_mode,
            "local bot state loaded"
        );
        self.control.save_state(&local).await;
        self.state.local = Some(local);

        let settings = self.control.load_settings().await;
        self.form.load(settings.clone());
        self.state.settings = settings;
    }

    /// Starts the backend process. Returns how long to wait before connecting.
    pub async fn launch_backend(&mut self) -> Duration {
        self.state.backend = BackendStatus::Starting;
        match self.control.host().start_python_backend().await {
            Ok(message) => {
                info!(result = %message, "backend launched");
                self.state.backend = BackendStatus::Running;
                self.log(LogLevel::Success, message);
                self.connect_delay
            }
            Err(e) => {
                warn!(error = %e, "failed to start backend, connecting anyway");
                self.state.backend = BackendStatus::Stopped;
                self.log(LogLevel::Error, format!("Failed to start backend: {}", e));
                self.notifier.send_async(Event::error(ErrorData {
                    component: "backend".to_string(),
                    message: "Failed to start backend".to_string(),
                    error: Some(e.to_string()),
                }));
                FALLBACK_CONNECT_DELAY
            }
        }
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.state
            .push_log(LogEntry::new(level, message).with_source(APP_LOG_SOURCE));
    }

    fn report(&mut self, outcome: CommandOutcome) {
        let level = if outcome.success {
            LogLevel::Success
        } else {
            LogLevel::Error
        };
        self.log(level, outcome.message.clone());
        self.state.notify(outcome);
    }

    /// Emits when connected; a failed emit is logged only.
    async fn emit(&self, event: ClientEvent) -> bool {
        if !self.sink.is_connected() {
            return false;
        }
        match self.sink.emit(&event).await {
            Ok(()) => true,
            Err(e) => {
                warn!(event = event.name(), error = %e, "emit failed");
                false
            }
        }
    }

    fn local_mut(&mut self) -> Result<&mut LocalBotState, AppError> {
        self.state
            .local
            .as_mut()
            .ok_or(AppError::Blocked("Bot state unknown"))
    }

    async fn persist_local(&self) {
        if let Some(local) = &self.state.local {
            self.control.save_state(local).await;
        }
    }

    pub async fn handle_server_event(&mut self, event: ServerEvent) {
        let settings_event = matches!(
            event,
            ServerEvent::SettingsData(_) | ServerEvent::SettingsUpdated(_)
        );

        match self.state.apply(event) {
            Applied::Connectivity { previous, next } => {
                self.on_connectivity(previous, next).await;
            }
            Applied::TradeExecuted { profit } => self.on_trade(profit).await,
            Applied::Updated => {
                if settings_event && !self.form.is_dirty() {
                    self.form.load(self.state.settings.clone());
                }
            }
        }
    }

    async fn on_trade(&mut self, profit: f64) {
        if profit > 0.0 {
            let body = format!("Profit: ${:.2}", profit);
            if let Err(e) = self
                .control
                .host()
                .show_notification("Trade Executed!", &body)
                .await
            {
                debug!(error = %e, "trade notification failed");
            }
        }

        let level = if profit >= 0.0 {
            LogLevel::Success
        } else {
            LogLevel::Warning
        };
        self.log(level, format!("Trade executed, profit ${:.2}", profit));

        if let Some(local) = self.state.local.clone() {
            self.control
                .update_session_stats(local.session_trades, local.session_profit)
                .await;
            self.control.save_state(&local).await;
        }
    }

    async fn on_connectivity(&mut self, previous: Connectivity, next: Connectivity) {
        let change = classify(previous, next);
        match change {
            ConnectivityChange::Unchanged => return,
            ConnectivityChange::Restored => {
                info!(url = %self.backend_url, "backend reachable");
                self.log(LogLevel::Success, "Connected to backend");
                self.emit(ClientEvent::GetSettings).await;
            }
            ConnectivityChange::Lost => {
                warn!(url = %self.backend_url, "backend unreachable");
                self.log(LogLevel::Warning, "Disconnected from backend");
            }
        }
        self.notifier.send_async(Event::connection(ConnectionData {
            connected: change == ConnectivityChange::Restored,
            url: self.backend_url.clone(),
        }));

        let Some(local) = self.state.local.clone() else {
            return;
        };
        let (updated, effects) = on_connectivity_change(&local, previous, next, self.state.policy);
        self.state.local = Some(updated.clone());

        for effect in effects {
            match effect {
                Effect::SyncBotState(_) => {
                    self.control
                        .sync_with_server(self.sink.as_ref(), &updated)
                        .await;
                }
                Effect::StopBot => {
                    let outcome = self.control.stop_bot_local().await;
                    if !outcome.success {
                        warn!(message = %outcome.message, "stop after connection loss failed");
                    }
                    self.log(LogLevel::Warning, "Connection lost, bot stopped");
                    self.notifier.send_async(Event::shutdown(ShutdownData {
                        reason: "Backend connection lost".to_string(),
                        uptime: Duration::from_secs(local.uptime(Utc::now())),
                        session_trades: local.session_trades,
                        session_profit: local.session_profit,
                    }));
                }
            }
        }
        self.control.save_state(&updated).await;
    }

    /// Runs one user command. Failures that are the user's to fix come back
    /// as errors; everything else is reported through the notice line.
    pub async fn handle_command(
        &mut self,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let effective = self.state.effective(now);
        let blocked = |fallback: &'static str| {
            AppError::Blocked(effective.blocked_reason.unwrap_or(fallback))
        };

        match command {
            Command::Start | Command::Stop => {
                if !effective.controls.start_stop {
                    return Err(blocked("Bot control unavailable"));
                }
                if command == Command::Start {
                    self.start_bot(now).await
                } else {
                    self.stop_bot(now).await
                }
            }
            Command::ToggleMode => {
                if !effective.controls.toggle_mode {
                    return Err(blocked("Stop the bot before switching modes"));
                }
                self.toggle_mode().await
            }
            Command::ToggleSafeMode => {
                if !effective.controls.toggle_safe_mode {
                    return Err(blocked("Stop the bot before changing safe mode"));
                }
                self.toggle_safe_mode().await
            }
            Command::Execute(n) => {
                if !effective.controls.execute_trade {
                    return Err(AppError::Blocked(
                        "Bot must be running and connected to execute trades",
                    ));
                }
                self.execute(n).await
            }
            Command::Tab(tab) => {
                if self.state.active_tab == Tab::Settings && tab != Tab::Settings {
                    self.form.blur();
                }
                self.state.active_tab = tab;
                Ok(())
            }
            Command::Set(key, value) => Ok(self.form.set(key, &value)?),
            Command::Edit(key, text) => Ok(self.form.edit(key, &text)?),
            Command::Commit(key) => {
                if self.form.commit(key)?.is_none() {
                    self.state.notify(CommandOutcome::failed(format!(
                        "Invalid value for {}, reverted",
                        key
                    )));
                }
                Ok(())
            }
            Command::Save => {
                self.save_settings().await;
                Ok(())
            }
            Command::Reset => {
                self.form.reset();
                self.state.notify(CommandOutcome::ok("Changes discarded"));
                Ok(())
            }
            Command::Online | Command::Offline => {
                let applied = self.state.set_network_online(command == Command::Online);
                if let Applied::Connectivity { previous, next } = applied {
                    self.on_connectivity(previous, next).await;
                }
                Ok(())
            }
            Command::Help => {
                self.state.notify(CommandOutcome::ok(HELP));
                Ok(())
            }
            Command::Quit => {
                self.quit = true;
                Ok(())
            }
        }
    }

    async fn start_bot(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        let previous = self.local_mut()?.clone();
        {
            let local = self.local_mut()?;
            local.is_running = true;
            local.last_start_time = Some(now.timestamp_millis());
            local.session_trades = 0;
            local.session_profit = 0.0;
        }

        let outcome = self.control.start_bot_local(now).await;
        if outcome.success {
            self.emit(ClientEvent::StartBot).await;
            self.notifier.send_async(Event::startup(StartupData {
                mode: previous.mode,
                safe_mode: previous.safe_mode,
            }));
            self.persist_local().await;
        } else {
            self.state.local = Some(previous);
            self.notifier.send_async(Event::error(ErrorData {
                component: "bot".to_string(),
                message: outcome.message.clone(),
                error: None,
            }));
        }
        self.report(outcome);
        Ok(())
    }

    async fn stop_bot(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        let previous = self.local_mut()?.clone();
        self.local_mut()?.is_running = false;

        let outcome = self.control.stop_bot_local().await;
        if outcome.success {
            self.emit(ClientEvent::StopBot).await;
            self.notifier.send_async(Event::shutdown(ShutdownData {
                reason: "Stopped by user".to_string(),
                uptime: Duration::from_secs(previous.uptime(now)),
                session_trades: previous.session_trades,
                session_profit: previous.session_profit,
            }));
            self.persist_local().await;
        } else {
            self.state.local = Some(previous);
        }
        self.report(outcome);
        Ok(())
    }

    async fn toggle_mode(&mut self) -> Result<(), AppError> {
        let previous = self.local_mut()?.mode;
        self.local_mut()?.mode = previous.toggled();

        let toggled = self.control.toggle_trading_mode().await;
        let mode = toggled.value.unwrap_or(previous);
        self.local_mut()?.mode = mode;

        if toggled.value.is_some() {
            self.state.settings.set_simulation_mode(mode.is_simulation());
            self.sync_form();
            self.emit(ClientEvent::ToggleMode(mode)).await;
            self.persist_local().await;
        }
        self.report(toggled.outcome);
        Ok(())
    }

    async fn toggle_safe_mode(&mut self) -> Result<(), AppError> {
        let previous = self.local_mut()?.safe_mode;
        self.local_mut()?.safe_mode = !previous;

        let toggled = self.control.toggle_safe_mode().await;
        let safe_mode = toggled.value.unwrap_or(previous);
        self.local_mut()?.safe_mode = safe_mode;

        if toggled.value.is_some() {
            self.state.settings.safe_mode = safe_mode;
            self.sync_form();
            self.emit(ClientEvent::ToggleSafeMode(safe_mode)).await;
            self.persist_local().await;
        }
        self.report(toggled.outcome);
        Ok(())
    }

    /// Pulls toggles made outside the form into it, unless it has edits.
    fn sync_form(&mut self) {
        if !self.form.is_dirty() {
            self.form.load(self.state.settings.clone());
        }
    }

    async fn execute(&mut self, n: usize) -> Result<(), AppError> {
        let opportunity = opportunities::select(&self.state, n)
            .ok_or_else(|| AppError::InvalidCommand(format!("no opportunity #{}", n)))?;
        let summary = format!(
            "{} {} → {} ({:.2}%)",
            opportunity.pair, opportunity.buy_dex, opportunity.sell_dex, opportunity.profit_pct
        );

        let outcome = if self
            .emit(ClientEvent::ExecuteTrade(opportunity.clone()))
            .await
        {
            CommandOutcome::ok(format!("Trade requested: {}", summary))
        } else {
            match self.control.host().execute_trade(&opportunity).await {
                Ok(message) => CommandOutcome::ok(message),
                Err(e) => CommandOutcome::failed(format!("Failed to execute trade: {}", e)),
            }
        };
        self.report(outcome);
        Ok(())
    }

    /// Writes the settings file first, then tells the backend.
    async fn save_settings(&mut self) {
        let values = self.form.values();
        let outcome = self.control.save_settings(&values).await;

        if outcome.success {
            self.form.mark_saved();
            self.state.settings = values.clone();
            if let Some(local) = self.state.local.as_mut() {
                local.mode = values.mode();
                local.safe_mode = values.safe_mode;
            }
            self.persist_local().await;
            self.emit(ClientEvent::UpdateSettings(values)).await;
        }
        self.report(outcome);
    }

    pub async fn poll_stats(&mut self) {
        match self.control.host().read_monitoring_stats().await {
            Ok(stats) => self.state.stats = Some(stats),
            Err(e) => debug!(error = %e, "monitoring stats unavailable"),
        }
    }

    /// Adds a mock opportunity while simulating without a backend feed.
    pub fn tick_simulation(&mut self, now: DateTime<Utc>) -> bool {
        let simulation = self
            .state
            .local
            .as_ref()
            .is_some_and(|l| l.mode.is_simulation());
        if !simulation || self.state.backend_feeds_opportunities {
            return false;
        }
        let opportunity = self.mock.next(now);
        self.state.push_opportunity(opportunity);
        true
    }

    /// Notices a launched backend process that exited on its own.
    pub async fn refresh_backend_process(&mut self) {
        if self.state.backend != BackendStatus::Running {
            return;
        }
        if !self.control.host().backend_running().await {
            self.state.backend = BackendStatus::Stopped;
            self.log(LogLevel::Error, "Backend process exited");
            self.notifier.send_async(Event::error(ErrorData {
                component: "backend".to_string(),
                message: "Backend process exited".to_string(),
                error: None,
            }));
        }
    }

    /// Notices a bot process that exited on its own.
    pub async fn refresh_bot_process(&mut self) {
        let believed_running = self.state.local.as_ref().is_some_and(|l| l.is_running);
        if !believed_running {
            return;
        }
        match self.control.host().get_arbitrage_bot_status().await {
            Ok(false) => {
                if let Some(local) = self.state.local.as_mut() {
                    local.is_running = false;
                }
                self.log(LogLevel::Warning, "Bot process exited");
                self.persist_local().await;
            }
            Ok(true) => {}
            Err(e) => debug!(error = %e, "bot status check failed"),
        }
    }

    /// The screen, or None when it has not changed since the last call.
    pub fn frame(&mut self, now: DateTime<Utc>) -> Option<String> {
        let frame = view::render(&self.state, &self.form, now);
        if frame == self.last_frame {
            return None;
        }
        self.last_frame = frame.clone();
        Some(frame)
    }

    fn draw(&mut self, now: DateTime<Utc>) {
        if let Some(frame) = self.frame(now) {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{}{}", view::CLEAR_SCREEN, frame);
            let _ = stdout.flush();
        }
    }

    async fn handle_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let now = Utc::now();
        let result = match line.parse::<Command>() {
            Ok(command) => self.handle_command(command, now).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            debug!(error = %e, line = %line, "command rejected");
            self.state.notify(CommandOutcome::failed(e.to_string()));
        }
    }

    /// Runs until `quit`, ctrl-c or the server event channel closes.
    pub async fn run(
        &mut self,
        mut events: mpsc::UnboundedReceiver<ServerEvent>,
        mut logs: mpsc::UnboundedReceiver<LogEntry>,
    ) {
        let mut stats_timer = tokio::time::interval(self.polling.stats_interval);
        let mut opportunity_timer = tokio::time::interval(self.polling.opportunity_refresh);
        let mut render_timer = tokio::time::interval(self.polling.reconcile_interval);

        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        let mut logs_open = true;

        info!(
            stats_interval = ?self.polling.stats_interval,
            opportunity_refresh = ?self.polling.opportunity_refresh,
            reconcile_interval = ?self.polling.reconcile_interval,
            "entering main loop"
        );

        self.draw(Utc::now());

        while !self.quit {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_server_event(event).await,
                    None => {
                        warn!("server event channel closed");
                        break;
                    }
                },
                entry = logs.recv(), if logs_open => match entry {
                    Some(entry) => self.state.push_log(entry),
                    None => logs_open = false,
                },
                line = stdin.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => self.handle_line(&line).await,
                    Ok(None) => {
                        debug!("stdin closed");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        stdin_open = false;
                    }
                },
                _ = stats_timer.tick() => self.poll_stats().await,
                _ = opportunity_timer.tick() => {
                    self.tick_simulation(Utc::now());
                }
                _ = render_timer.tick() => {
                    self.refresh_backend_process().await;
                    self.refresh_bot_process().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received");
                    break;
                }
            }
            self.draw(Utc::now());
        }
    }

    /// Saves the local state and stops the processes this client started.
    pub async fn shutdown(&mut self) {
        self.persist_local().await;

        if self.state.local.as_ref().is_some_and(|l| l.is_running) {
            let outcome = self.control.stop_bot_local().await;
            info!(result = %outcome.message, "bot stop on exit");
        }
        match self.control.host().stop_python_backend().await {
            Ok(message) => info!(result = %message, "backend stop on exit"),
            Err(e) => warn!(error = %e, "failed to stop backend"),
        }
        if let Err(e) = self.notifier.close().await {
            debug!(error = %e, "notifier close failed");
        }
    }
}

#[cfg(test)]
mod tests;
