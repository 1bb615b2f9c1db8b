//! Host commands: child processes, the settings file, notifications and the
//! monitoring stats file.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use super::stats::{MonitoringStats, StatsLocator};
use crate::config::{BotProcessConfig, Config, LaunchConfig};
use crate::domain::{ArbitrageOpportunity, LogEntry};
use crate::notification::{Event, NotificationError, Notifier};
use crate::settings::{SettingsError, SettingsFile, SettingsStore};

/// Log source for lines from the bot process.
pub const BOT_LOG_SOURCE: &str = "bot";
/// Log source for lines from the backend server process.
pub const BACKEND_LOG_SOURCE: &str = "backend";

/// Host command error.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to start {what}: {source}")]
    Spawn {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to stop {what}: {source}")]
    Kill {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("arbitrage bot is not running")]
    BotNotRunning,
    #[error("failed to send command to bot: {0}")]
    BotIo(#[source] std::io::Error),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("notification failed: {0}")]
    Notification(#[from] NotificationError),
    #[error("{0}")]
    Command(String),
    #[error("monitoring stats not found (tried {0:?})")]
    StatsNotFound(Vec<PathBuf>),
}

/// Commands the client asks of its host.
#[async_trait]
pub trait Host: Send + Sync {
    async fn start_python_backend(&self) -> Result<String, HostError>;
    async fn stop_python_backend(&self) -> Result<String, HostError>;
    /// False once a launched backend has exited. A backend this host did not
    /// launch counts as running.
    async fn backend_running(&self) -> bool;

    async fn start_arbitrage_bot(&self) -> Result<String, HostError>;
    async fn stop_arbitrage_bot(&self) -> Result<String, HostError>;
    async fn get_arbitrage_bot_status(&self) -> Result<bool, HostError>;

    /// Forwards an opportunity to the running bot.
    async fn execute_trade(&self, opportunity: &ArbitrageOpportunity) -> Result<String, HostError>;
    /// Flips SAFE_MODE in the settings file, returning the new value.
    async fn toggle_safe_mode(&self) -> Result<bool, HostError>;
    async fn show_notification(&self, title: &str, body: &str) -> Result<(), HostError>;

    async fn read_settings_file(&self) -> Result<String, HostError>;
    async fn write_settings_file(&self, content: &str) -> Result<(), HostError>;
    async fn read_monitoring_stats(&self) -> Result<MonitoringStats, HostError>;
}

/// Program and arguments used to launch the backend server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub bundled: bool,
}

impl LaunchPlan {
    /// Prefers the bundled executable in `base_dir`, else the python script.
    pub fn resolve(launch: &LaunchConfig, base_dir: &Path) -> Self {
        let exe_name = if cfg!(target_os = "windows") {
            format!("{}.exe", launch.bundled_executable)
        } else {
            launch.bundled_executable.clone()
        };
        let bundled = base_dir.join(&exe_name);

        if bundled.is_file() {
            Self {
                program: bundled,
                args: Vec::new(),
                bundled: true,
            }
        } else {
            Self {
                program: PathBuf::from(&launch.python),
                args: vec![launch.script.clone()],
                bundled: false,
            }
        }
    }
}

struct BotProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

/// Host backed by real child processes and files.
///
/// Children are spawned with `kill_on_drop`, so dropping the host ends them.
pub struct LocalHost {
    launch: LaunchConfig,
    bot: BotProcessConfig,
    settings: SettingsStore,
    stats: StatsLocator,
    notifier: Arc<dyn Notifier>,
    backend_process: Mutex<Option<Child>>,
    bot_process: Mutex<Option<BotProcess>>,
    logs_tx: mpsc::UnboundedSender<LogEntry>,
}

impl LocalHost {
    /// Creates the host and the channel its process output is published on.
    pub fn new(
        config: &Config,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, mpsc::UnboundedReceiver<LogEntry>) {
        let (logs_tx, logs_rx) = mpsc::unbounded_channel();
        let host = Self {
            launch: config.backend.launch.clone(),
            bot: config.backend.bot.clone(),
            settings: SettingsStore::new(&config.storage.settings_path),
            stats: StatsLocator::new(&config.storage.stats_file, &config.storage.stats_dirs),
            notifier,
            backend_process: Mutex::new(None),
            bot_process: Mutex::new(None),
            logs_tx,
        };
        (host, logs_rx)
    }

    /// Replaces the stats search path.
    pub fn with_stats_locator(mut self, stats: StatsLocator) -> Self {
        self.stats = stats;
        self
    }

    fn forward_output<R>(&self, reader: R, source: &'static str)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let tx = self.logs_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(entry) = LogEntry::from_bot_line(&line, source) {
                            if tx.send(entry).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(source = source, error = %e, "process output closed");
                        break;
                    }
                }
            }
        });
    }

    fn spawn_piped(
        &self,
        mut command: Command,
        what: &'static str,
        source: &'static str,
        stdin: bool,
    ) -> Result<Child, HostError> {
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin { Stdio::piped() } else { Stdio::null() })
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|source| HostError::Spawn { what, source })?;

        if let Some(stdout) = child.stdout.take() {
            self.forward_output(stdout, source);
        }
        if let Some(stderr) = child.stderr.take() {
            self.forward_output(stderr, source);
        }
        Ok(child)
    }
}

/// True while the child has not exited.
fn is_alive(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(None))
}

#[async_trait]
impl Host for LocalHost {
    async fn start_python_backend(&self) -> Result<String, HostError> {
        if !self.launch.enabled {
            return Ok("Backend launch disabled, using external backend".to_string());
        }

        let mut guard = self.backend_process.lock().await;
        if let Some(child) = guard.as_mut() {
            if is_alive(child) {
                return Ok("Python backend is already running".to_string());
            }
        }

        let plan = LaunchPlan::resolve(&self.launch, Path::new("."));
        let mut command = Command::new(&plan.program);
        command.args(&plan.args);

        let what = if plan.bundled {
            "bundled backend"
        } else {
            "Python backend"
        };
        let child = self.spawn_piped(command, what, BACKEND_LOG_SOURCE, false)?;

        info!(program = %plan.program.display(), pid = ?child.id(), "backend process started");
        *guard = Some(child);

        Ok("Python backend started successfully".to_string())
    }

    async fn stop_python_backend(&self) -> Result<String, HostError> {
        let mut guard = self.backend_process.lock().await;
        match guard.take() {
            Some(mut child) => {
                child.kill().await.map_err(|source| HostError::Kill {
                    what: "Python backend",
                    source,
                })?;
                info!("backend process stopped");
                Ok("Python backend stopped".to_string())
            }
            None => Ok("Python backend was not running".to_string()),
        }
    }

    async fn backend_running(&self) -> bool {
        if !self.launch.enabled {
            return true;
        }
        let mut guard = self.backend_process.lock().await;
        let alive = guard.as_mut().is_some_and(is_alive);
        if !alive {
            *guard = None;
        }
        alive
    }

    async fn start_arbitrage_bot(&self) -> Result<String, HostError> {
        let mut guard = self.bot_process.lock().await;
        if let Some(process) = guard.as_mut() {
            if is_alive(&mut process.child) {
                return Ok("Arbitrage bot is already running".to_string());
            }
        }

        let mut command = Command::new(&self.bot.program);
        command.args(&self.bot.args);
        let mut child = self.spawn_piped(command, "arbitrage bot", BOT_LOG_SOURCE, true)?;
        let stdin = child.stdin.take();
        let pid = child.id();

        info!(program = %self.bot.program, pid = ?pid, "arbitrage bot started");
        *guard = Some(BotProcess { child, stdin });

        Ok(match pid {
            Some(pid) => format!("Arbitrage bot started (pid {})", pid),
            None => "Arbitrage bot started".to_string(),
        })
    }

    async fn stop_arbitrage_bot(&self) -> Result<String, HostError> {
        let mut guard = self.bot_process.lock().await;
        match guard.take() {
            Some(mut process) => {
                process.child.kill().await.map_err(|source| HostError::Kill {
                    what: "arbitrage bot",
                    source,
                })?;
                info!("arbitrage bot stopped");
                Ok("Arbitrage bot stopped".to_string())
            }
            None => Ok("Arbitrage bot was not running".to_string()),
        }
    }

    async fn get_arbitrage_bot_status(&self) -> Result<bool, HostError> {
        let mut guard = self.bot_process.lock().await;
        let running = match guard.as_mut() {
            Some(process) => match process.child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    warn!(status = %status, "arbitrage bot exited");
                    false
                }
                Err(e) => return Err(HostError::Command(format!("bot status unavailable: {}", e))),
            },
            None => false,
        };
        if !running {
            *guard = None;
        }
        Ok(running)
    }

    async fn execute_trade(&self, opportunity: &ArbitrageOpportunity) -> Result<String, HostError> {
        let mut guard = self.bot_process.lock().await;
        let process = guard.as_mut().ok_or(HostError::BotNotRunning)?;
        let stdin = process.stdin.as_mut().ok_or(HostError::BotNotRunning)?;

        let mut line = json!({ "command": "execute_trade", "opportunity": opportunity }).to_string();
        line.push('\n');

        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(HostError::BotIo)?;
        stdin.flush().await.map_err(HostError::BotIo)?;

        debug!(id = %opportunity.id, pair = %opportunity.pair, "trade forwarded to bot");
        Ok(format!("Trade {} sent to bot", opportunity.id))
    }

    async fn toggle_safe_mode(&self) -> Result<bool, HostError> {
        let toggled = self.settings.toggle_safe_mode().await;
        toggled
            .value
            .ok_or_else(|| HostError::Command(toggled.outcome.message))
    }

    async fn show_notification(&self, title: &str, body: &str) -> Result<(), HostError> {
        self.notifier.send(&Event::message(title, body)).await?;
        Ok(())
    }

    async fn read_settings_file(&self) -> Result<String, HostError> {
        Ok(self.settings.read_raw().await?)
    }

    async fn write_settings_file(&self, content: &str) -> Result<(), HostError> {
        Ok(self.settings.write_raw(content).await?)
    }

    async fn read_monitoring_stats(&self) -> Result<MonitoringStats, HostError> {
        self.stats.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogLevel;
    use crate::notification::{DesktopNotifier, MultiNotifier};
    use std::time::Duration;
    use tempfile::TempDir;

    fn host_with(dir: &TempDir, bot: BotProcessConfig) -> (LocalHost, mpsc::UnboundedReceiver<LogEntry>) {
        let mut config = Config::default();
        config.storage.settings_path = dir.path().join(".env").to_string_lossy().into_owned();
        config.backend.bot = bot;
        let notifier: Arc<dyn Notifier> = Arc::new(MultiNotifier::new(vec![Arc::new(
            DesktopNotifier::new(false),
        )]));
        let (host, rx) = LocalHost::new(&config, notifier);
        let host = host.with_stats_locator(StatsLocator::with_dirs(
            "monitoring_stats.json",
            vec![dir.path().to_path_buf()],
        ));
        (host, rx)
    }

    fn shell(script: &str) -> BotProcessConfig {
        BotProcessConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    async fn next_log(rx: &mut mpsc::UnboundedReceiver<LogEntry>) -> LogEntry {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for log line")
            .expect("log channel closed")
    }

    fn sample_opportunity() -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            id: "opp-1".into(),
            pair: "WETH/USDC".into(),
            buy_dex: "Uniswap".into(),
            sell_dex: "Sushiswap".into(),
            buy_price: 1800.0,
            sell_price: 1810.0,
            profit_pct: 0.55,
            profit_usd: 9.9,
            volume: 5000.0,
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_launch_plan_prefers_bundled_executable() {
        let dir = TempDir::new().unwrap();
        let launch = LaunchConfig::default();

        let plan = LaunchPlan::resolve(&launch, dir.path());
        assert!(!plan.bundled);
        assert_eq!(plan.program, PathBuf::from("python"));
        assert_eq!(plan.args, vec!["../websocket_server.py".to_string()]);

        let exe = if cfg!(target_os = "windows") {
            "arbitrage-bot-server.exe"
        } else {
            "arbitrage-bot-server"
        };
        std::fs::write(dir.path().join(exe), "").unwrap();

        let plan = LaunchPlan::resolve(&launch, dir.path());
        assert!(plan.bundled);
        assert!(plan.args.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bot_output_becomes_log_entries() {
        let dir = TempDir::new().unwrap();
        let (host, mut rx) = host_with(
            &dir,
            shell(r#"echo '✅ Trade executed'; echo '{"level":"warning","message":"gas spike","source":"gas"}'; sleep 5"#),
        );

        let started = host.start_arbitrage_bot().await.unwrap();
        assert!(started.starts_with("Arbitrage bot started"));
        assert!(host.get_arbitrage_bot_status().await.unwrap());

        let first = next_log(&mut rx).await;
        assert_eq!(first.level, LogLevel::Success);
        assert_eq!(first.source.as_deref(), Some(BOT_LOG_SOURCE));

        let second = next_log(&mut rx).await;
        assert_eq!(second.level, LogLevel::Warning);
        assert_eq!(second.source.as_deref(), Some("gas"));

        assert_eq!(host.stop_arbitrage_bot().await.unwrap(), "Arbitrage bot stopped");
        assert!(!host.get_arbitrage_bot_status().await.unwrap());
        assert_eq!(
            host.stop_arbitrage_bot().await.unwrap(),
            "Arbitrage bot was not running"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_trade_writes_command_line() {
        let dir = TempDir::new().unwrap();
        let (host, mut rx) = host_with(&dir, shell(r#"read line; echo "got $line"; sleep 5"#));
        host.start_arbitrage_bot().await.unwrap();

        host.execute_trade(&sample_opportunity()).await.unwrap();

        let echoed = next_log(&mut rx).await;
        assert!(echoed.message.starts_with("got {"));
        assert!(echoed.message.contains(r#""command":"execute_trade""#));
        assert!(echoed.message.contains(r#""buyDex":"Uniswap""#));

        host.stop_arbitrage_bot().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exited_bot_reports_not_running() {
        let dir = TempDir::new().unwrap();
        let (host, _rx) = host_with(&dir, shell("exit 0"));
        host.start_arbitrage_bot().await.unwrap();

        let mut running = true;
        for _ in 0..50 {
            running = host.get_arbitrage_bot_status().await.unwrap();
            if !running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!running);
    }

    #[tokio::test]
    async fn test_execute_trade_without_bot() {
        let dir = TempDir::new().unwrap();
        let (host, _rx) = host_with(&dir, shell("true"));

        let err = host.execute_trade(&sample_opportunity()).await.unwrap_err();

        assert!(matches!(err, HostError::BotNotRunning));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let (host, _rx) = host_with(
            &dir,
            BotProcessConfig {
                program: "/definitely/not/a/program".into(),
                args: Vec::new(),
            },
        );

        let err = host.start_arbitrage_bot().await.unwrap_err();

        assert!(matches!(err, HostError::Spawn { what: "arbitrage bot", .. }));
    }

    #[tokio::test]
    async fn test_settings_file_commands() {
        let dir = TempDir::new().unwrap();
        let (host, _rx) = host_with(&dir, shell("true"));

        assert!(matches!(
            host.read_settings_file().await,
            Err(HostError::Settings(SettingsError::NotFound(_)))
        ));

        host.write_settings_file("# mine\nSAFE_MODE=true\n").await.unwrap();
        assert!(!host.toggle_safe_mode().await.unwrap());

        let content = host.read_settings_file().await.unwrap();
        assert!(content.starts_with("# mine\nSAFE_MODE=false\n"));
    }

    #[tokio::test]
    async fn test_toggle_safe_mode_keeps_unreadable_document() {
        let dir = TempDir::new().unwrap();
        let (host, _rx) = host_with(&dir, shell("true"));
        let path = dir.path().join(".env");
        let original = b"PRIVATE_KEY=0xdeadbeef\n# caf\xE9\nMIN_PROFIT_PCT=3.5\n".to_vec();
        std::fs::write(&path, &original).unwrap();

        let err = host.toggle_safe_mode().await.unwrap_err();

        assert!(matches!(err, HostError::Command(_)));
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }

    fn backend_host(dir: &TempDir, launch: LaunchConfig) -> LocalHost {
        let (host, _rx) = host_with(dir, shell("true"));
        LocalHost { launch, ..host }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_backend_running_notices_exit() {
        let dir = TempDir::new().unwrap();
        let host = backend_host(
            &dir,
            LaunchConfig {
                bundled_executable: "no-such-server".to_string(),
                python: "true".to_string(),
                ..LaunchConfig::default()
            },
        );

        host.start_python_backend().await.unwrap();

        let mut running = true;
        for _ in 0..50 {
            running = host.backend_running().await;
            if !running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!running);
    }

    #[tokio::test]
    async fn test_external_backend_counts_as_running() {
        let dir = TempDir::new().unwrap();
        let host = backend_host(
            &dir,
            LaunchConfig {
                enabled: false,
                ..LaunchConfig::default()
            },
        );

        assert_eq!(
            host.start_python_backend().await.unwrap(),
            "Backend launch disabled, using external backend"
        );
        assert!(host.backend_running().await);
    }

    #[tokio::test]
    async fn test_stop_backend_when_not_started() {
        let dir = TempDir::new().unwrap();
        let (host, _rx) = host_with(&dir, shell("true"));

        assert!(!host.backend_running().await);
        assert_eq!(
            host.stop_python_backend().await.unwrap(),
            "Python backend was not running"
        );
        assert!(host.show_notification("Hi", "there").await.is_ok());
    }

    #[tokio::test]
    async fn test_read_monitoring_stats() {
        let dir = TempDir::new().unwrap();
        let (host, _rx) = host_with(&dir, shell("true"));
        std::fs::write(
            dir.path().join("monitoring_stats.json"),
            r#"{"scans": 7, "trades_executed": 2}"#,
        )
        .unwrap();

        let stats = host.read_monitoring_stats().await.unwrap();

        assert_eq!(stats.scans, 7);
        assert_eq!(stats.trades_executed, 2);
    }
}
