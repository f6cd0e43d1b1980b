//! Client for the task service sync endpoint
//!
//! ## Protocol
//!
//! Every call is a single POST carrying a sync token and an optional batch of
//! commands:
//! 1. Send `*` (full sync) or the last token the server returned
//! 2. The server applies the commands and reports a status per command UUID
//! 3. The response holds every entity changed since the token, a new token
//!    and the permanent IDs assigned to temp IDs
//! 4. The client folds the response into its snapshot
//!
//! ## Usage
//!
//! ```ignore
//! let transport = HttpTransport::new(&config.base_url)?.with_auth_token(token);
//! let client = SyncClient::new(Arc::new(transport));
//! client.full_sync(&cancel).await?;
//! let item = client.add_task(&cancel, AddItemArgs::new("Buy milk")).await?;
//! ```

mod client;
mod command;
mod diff;
mod error;
mod merge;
mod snapshot;
mod transport;

pub use client::{SyncClient, SyncPhase};
pub use command::{
    AddItemArgs, AddLabelArgs, AddProjectArgs, Command, CommandArgs, DuePatch, TargetArgs,
    UpdateItemArgs, UpdateProjectArgs,
};
pub use diff::{
    diff, equal_label_sets, DueDateInput, FixedTimeZone, ItemForm, SystemTimeZone,
    TimeZoneProvider,
};
pub use error::{SyncError, SyncResult};
pub use merge::{merge, replace};
pub use snapshot::Snapshot;
pub use transport::{
    Authenticator, CommandStatus, HttpTransport, ResourceType, ServerError, StaticToken,
    SyncRequest, SyncResponse, Transport, FULL_SYNC_TOKEN,
};
