//! Client-side state: feeds, the bot-state reconciler, the session cache and
//! the container that ties them together.

mod feed;
mod reconcile;
mod session;
mod store;

pub use feed::{BoundedFeed, LOG_CAPACITY, OPPORTUNITY_CAPACITY};
pub use reconcile::{
    BotStateSync, Connectivity, ConnectivityChange, ConnectivityPolicy, ControlAvailability,
    Effect, EffectiveStatus, classify, on_connectivity_change, reconcile,
};
pub use session::{BOT_STATE_KEY, SESSION_DATA_KEY, SessionCache};
pub use store::{AppState, Applied, BackendStatus, Notice, Tab};
