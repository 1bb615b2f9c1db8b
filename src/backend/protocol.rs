//! Engine.IO v4 / Socket.IO v5 text framing and the typed event set.
//!
//! A frame is an Engine.IO packet type digit followed by its payload. Socket.IO
//! rides inside Engine.IO `message` packets, so an event on the default
//! namespace looks like `42["status",{"isRunning":true,...}]`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{ArbitrageOpportunity, BotStatus, TradingMode};
use crate::settings::SettingsData;
use crate::state::BotStateSync;

/// Protocol decoding error.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown packet type: {0}")]
    UnknownType(char),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("bad {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Engine.IO open handshake.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds.
    #[serde(default)]
    pub ping_interval: u64,
    /// Milliseconds.
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let payload = chars.as_str();

        match kind {
            '0' => serde_json::from_str(payload)
                .map(EnginePacket::Open)
                .map_err(|e| ProtocolError::Malformed(format!("open handshake: {}", e))),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(payload.to_string())),
            '3' => Ok(EnginePacket::Pong(payload.to_string())),
            '4' => Ok(EnginePacket::Message(payload.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(_) => "0".to_string(),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// Socket.IO packet carried in an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack,
    ConnectError(Value),
}

impl SocketPacket {
    /// Decodes a packet on any namespace; namespaces and ack ids are skipped.
    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        let mut chars = payload.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let mut rest = chars.as_str();

        if rest.starts_with('/') {
            rest = match rest.find(',') {
                Some(idx) => &rest[idx + 1..],
                None => "",
            };
        }
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

        let body = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(rest)
                    .map_err(|e| ProtocolError::Malformed(e.to_string()))?,
            )
        };

        match kind {
            '0' => Ok(SocketPacket::Connect(body)),
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let Some(Value::Array(mut items)) = body else {
                    return Err(ProtocolError::Malformed("event without array body".into()));
                };
                if items.is_empty() {
                    return Err(ProtocolError::Malformed("event without name".into()));
                }
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(ProtocolError::Malformed(format!(
                            "event name is not a string: {}",
                            other
                        )));
                    }
                };
                Ok(SocketPacket::Event { name, args: items })
            }
            '3' => Ok(SocketPacket::Ack),
            '4' => Ok(SocketPacket::ConnectError(body.unwrap_or(Value::Null))),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }

    /// Full frame (Engine.IO prefix included) for this packet.
    pub fn to_frame(&self) -> String {
        let inner = match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{}", auth),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("2{}", Value::Array(items))
            }
            SocketPacket::Ack => "3".to_string(),
            SocketPacket::ConnectError(body) => format!("4{}", body),
        };
        EnginePacket::Message(inner).encode()
    }
}

/// Events the client emits.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    GetSettings,
    UpdateSettings(SettingsData),
    StartBot,
    StopBot,
    ExecuteTrade(ArbitrageOpportunity),
    ToggleMode(TradingMode),
    ToggleSafeMode(bool),
    SyncBotState(BotStateSync),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::GetSettings => "get_settings",
            ClientEvent::UpdateSettings(_) => "update_settings",
            ClientEvent::StartBot => "start_bot",
            ClientEvent::StopBot => "stop_bot",
            ClientEvent::ExecuteTrade(_) => "execute_trade",
            ClientEvent::ToggleMode(_) => "toggle_mode",
            ClientEvent::ToggleSafeMode(_) => "toggle_safe_mode",
            ClientEvent::SyncBotState(_) => "sync_bot_state",
        }
    }

    /// Event arguments in the shape the backend handlers read.
    pub fn args(&self) -> Vec<Value> {
        match self {
            ClientEvent::GetSettings | ClientEvent::StartBot | ClientEvent::StopBot => Vec::new(),
            ClientEvent::UpdateSettings(settings) => vec![json!(settings)],
            ClientEvent::ExecuteTrade(opportunity) => vec![json!({ "opportunity": opportunity })],
            ClientEvent::ToggleMode(mode) => vec![json!({ "mode": mode })],
            ClientEvent::ToggleSafeMode(safe_mode) => vec![json!({ "safeMode": safe_mode })],
            ClientEvent::SyncBotState(sync) => vec![json!(sync)],
        }
    }

    pub fn to_packet(&self) -> SocketPacket {
        SocketPacket::Event {
            name: self.name().to_string(),
            args: self.args(),
        }
    }

    pub fn to_frame(&self) -> String {
        self.to_packet().to_frame()
    }
}

/// `trade_executed` payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeExecuted {
    #[serde(default)]
    pub profit: f64,
}

/// `settings_updated` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdated {
    pub success: bool,
    #[serde(default)]
    pub settings: Option<SettingsData>,
    #[serde(default)]
    pub message: String,
}

/// Events the client handles. `Connected` and `Disconnected` are synthesized
/// from Socket.IO connect/disconnect packets and transport loss.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected,
    Disconnected,
    Status(BotStatus),
    Opportunity(ArbitrageOpportunity),
    Opportunities(Vec<ArbitrageOpportunity>),
    TradeExecuted(TradeExecuted),
    SettingsData(SettingsData),
    SettingsUpdated(SettingsUpdated),
}

impl ServerEvent {
    /// Maps a named event to a typed one. Unknown names yield `Ok(None)`.
    pub fn from_event(name: &str, args: Vec<Value>) -> Result<Option<Self>, ProtocolError> {
        fn first<T: serde::de::DeserializeOwned>(
            name: &str,
            args: Vec<Value>,
        ) -> Result<T, ProtocolError> {
            let value = args.into_iter().next().unwrap_or(Value::Null);
            serde_json::from_value(value).map_err(|source| ProtocolError::Payload {
                event: name.to_string(),
                source,
            })
        }

        let event = match name {
            "status" => ServerEvent::Status(first(name, args)?),
            "opportunity" => ServerEvent::Opportunity(first(name, args)?),
            "opportunities" => ServerEvent::Opportunities(first(name, args)?),
            "trade_executed" => ServerEvent::TradeExecuted(first(name, args)?),
            "settings_data" => ServerEvent::SettingsData(first(name, args)?),
            "settings_updated" => ServerEvent::SettingsUpdated(first(name, args)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_open_handshake() {
        let frame = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        match EnginePacket::decode(frame).unwrap() {
            EnginePacket::Open(h) => {
                assert_eq!(h.sid, "abc");
                assert_eq!(h.ping_interval, 25000);
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_ping_answered_with_pong() {
        let ping = EnginePacket::decode("2").unwrap();
        assert_eq!(ping, EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
        assert_eq!(EnginePacket::Pong("upgrade".into()).encode(), "3upgrade");
    }

    #[test]
    fn test_decode_unknown_and_empty() {
        assert!(matches!(EnginePacket::decode(""), Err(ProtocolError::Empty)));
        assert!(matches!(
            EnginePacket::decode("9"),
            Err(ProtocolError::UnknownType('9'))
        ));
    }

    #[test]
    fn test_decode_status_event() {
        let frame = r#"42["status",{"isRunning":true,"mode":"live","safeMode":true,"totalProfit":1.5,"totalTrades":2,"uptime":30}]"#;
        let EnginePacket::Message(payload) = EnginePacket::decode(frame).unwrap() else {
            panic!("expected message");
        };
        let SocketPacket::Event { name, args } = SocketPacket::decode(&payload).unwrap() else {
            panic!("expected event");
        };

        let event = ServerEvent::from_event(&name, args).unwrap().unwrap();

        match event {
            ServerEvent::Status(status) => {
                assert!(status.is_running);
                assert_eq!(status.mode, TradingMode::Live);
                assert_eq!(status.uptime, 30);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_connect_with_namespace_and_sid() {
        let packet = SocketPacket::decode(r#"0/admin,{"sid":"x"}"#).unwrap();
        assert!(matches!(packet, SocketPacket::Connect(Some(_))));
        assert_eq!(SocketPacket::decode("0").unwrap(), SocketPacket::Connect(None));
    }

    #[test]
    fn test_decode_event_with_ack_id() {
        let packet = SocketPacket::decode(r#"212["trade_executed",{"profit":3.25}]"#).unwrap();
        let SocketPacket::Event { name, args } = packet else {
            panic!("expected event");
        };
        let event = ServerEvent::from_event(&name, args).unwrap();
        assert_eq!(
            event,
            Some(ServerEvent::TradeExecuted(TradeExecuted { profit: 3.25 }))
        );
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert_eq!(
            ServerEvent::from_event("heartbeat", vec![json!({})]).unwrap(),
            None
        );
    }

    #[test]
    fn test_bad_payload_names_event() {
        let err = ServerEvent::from_event("status", vec![json!("nope")]).unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn test_settings_updated_failure_without_settings() {
        let event = ServerEvent::from_event(
            "settings_updated",
            vec![json!({"success": false, "settings": null, "message": "Failed to save settings"})],
        )
        .unwrap()
        .unwrap();
        let ServerEvent::SettingsUpdated(update) = event else {
            panic!("expected settings_updated");
        };
        assert!(!update.success);
        assert!(update.settings.is_none());
    }

    #[test]
    fn test_client_event_frames() {
        assert_eq!(ClientEvent::StartBot.to_frame(), r#"42["start_bot"]"#);
        assert_eq!(
            ClientEvent::ToggleMode(TradingMode::Live).to_frame(),
            r#"42["toggle_mode",{"mode":"live"}]"#
        );
        assert_eq!(
            ClientEvent::ToggleSafeMode(false).to_frame(),
            r#"42["toggle_safe_mode",{"safeMode":false}]"#
        );
    }

    #[test]
    fn test_update_settings_sends_flat_settings() {
        let frame = ClientEvent::UpdateSettings(SettingsData::default()).to_frame();
        assert!(frame.starts_with(r#"42["update_settings",{"#));
        assert!(frame.contains(r#""SIMULATION_MODE":true"#));
        assert!(frame.contains(r#""FLASH_LOAN_AMOUNT_USD":100000.0"#));
    }

    #[test]
    fn test_sync_bot_state_frame() {
        let sync = BotStateSync {
            is_running: false,
            mode: TradingMode::Simulation,
            safe_mode: true,
            session_trades: 1,
            session_profit: 0.5,
        };
        let frame = ClientEvent::SyncBotState(sync).to_frame();
        let payload: Value = serde_json::from_str(frame.strip_prefix("42").unwrap()).unwrap();
        assert_eq!(
            payload,
            json!([
                "sync_bot_state",
                {
                    "isRunning": false,
                    "mode": "simulation",
                    "safeMode": true,
                    "sessionTrades": 1,
                    "sessionProfit": 0.5
                }
            ])
        );
    }

    #[test]
    fn test_namespace_connect_frame() {
        assert_eq!(SocketPacket::Connect(None).to_frame(), "40");
    }
}
