//! Alert notifications: debouncing, per-device state and push delivery

pub mod debounce;
pub mod delivery;
pub mod dispatcher;
pub mod expo;
pub mod push;
pub mod registry;

pub use debounce::{DEFAULT_REALERT_INTERVAL, DebounceState, MetricStates, NotificationDebouncer};
pub use delivery::{DeliveryReport, deliver};
pub use dispatcher::{AlertDispatcher, build_message};
pub use expo::{ExpoPushClient, ExpoTokenFormat, is_expo_push_token};
pub use push::{PushMessage, PushPriority, PushService, PushTicket, TicketStatus, TokenValidator};
pub use registry::{DeviceRegistry, RegisteredDevice};
