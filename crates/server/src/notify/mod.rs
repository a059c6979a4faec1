//! Notification fan-out.
//!
//! - `event` - alert and broadcast payloads
//! - `recipients` - admin allow-list, recipient set and resolver
//! - `transport` - mail transport seam and SMTP implementation
//! - `dispatch` - sequential, paced delivery with per-recipient tracking
//! - `service` - the pipeline tying them together

pub mod dispatch;
pub mod event;
pub mod recipients;
pub mod service;
pub mod transport;

pub use dispatch::{DispatchResult, Dispatcher, FixedRate, SendPacer};
pub use event::{AlertEvent, BroadcastEvent, Contact, Event};
pub use recipients::{AdminAllowList, RecipientResolver, RecipientSet};
pub use service::NotificationService;
pub use transport::{MailTransport, RenderedMessage, SmtpMailer};
