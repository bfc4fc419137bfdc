//! # Questboard Core Library
//!
//! Business logic for Questboard, a per-user checklist of recurring game
//! chores. All operations are exposed through the [`QuestBoard`] facade so
//! that the `questboard` CLI and its scheduler daemon stay thin.
//!
//! ## Architecture
//!
//! - **Catalog**: games with daily tasks, weekly tasks and time-bounded events
//! - **Ledger**: presence-set of completion records keyed by period
//! - **Period keying**: maps "now" to the daily, weekly or event key a check is stored under
//! - **Lifecycle**: expires events and promotes their daily tasks
//! - **Streaks**: once-per-day counter gated on all daily tasks
//! - **Storage**: JSON-file or SQLite documents with timestamped backups, TOML configuration
//!
//! ## Key Components
//!
//! - [`QuestBoard`]: service facade owning catalog, ledger, users and stores
//! - [`Catalog`]: admin-editable quest catalog
//! - [`Ledger`]: completion records
//! - [`Config`]: application configuration
//! - [`NotificationSink`]: outbound message delivery

pub mod board;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod jobs;
pub mod ledger;
pub mod lifecycle;
pub mod notify;
pub mod period;
pub mod render;
pub mod storage;
pub mod streak;
pub mod users;
pub mod view;

pub use board::QuestBoard;
pub use catalog::{Catalog, Event, EventTask, Game};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, NotifyError, StorageError};
pub use jobs::{Job, JobReport};
pub use ledger::{CompletionLookup, CompletionRecord, Ledger, LedgerState, UserId};
pub use lifecycle::{ExpiringEvent, RefreshReport};
pub use notify::{DeliveryReport, LogSink, MemorySink, NotificationSink, WebhookSink};
pub use period::{EventTaskKind, Period};
pub use storage::{Config, DocumentStore, Stores};
pub use streak::{DoneOutcome, StreakPolicy};
pub use users::{UserRecord, Users};
pub use view::{EventChecklist, GameChecklist, GameOverview, GameProgress};
