//! Bulk operations against the Alma REST API.
//!
//! The engine resolves a set to its members with concurrent paginated reads,
//! then fans one job per member out over a bounded worker pool. Every call goes
//! through [`AlmaClient::send`], which retries connection failures with linear
//! backoff, enforces a per-call timeout and reports the server's remaining-call
//! count to a shared [`CallBudget`]. Once that count reaches the threshold the
//! whole run is cancelled.
//!
//! ```no_run
//! use almatoolkit::{AlmaClient, ClientConfig, RunRuntime, SetRef, sets};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::new("my-api-key");
//! let runtime = RunRuntime::new(config.threshold, true);
//! let client = AlmaClient::new(config, runtime.budget())?;
//! let cancel = runtime.budget().token().clone();
//!
//! let set = client.resolve_set(&cancel, &SetRef::Name("Weeding 2020".into())).await?;
//! sets::LOGICAL_ITEMS.check(&set)?;
//! let members = client.fetch_all_members(&cancel, &set).await;
//! println!("{} members, {} errors", members.succeeded.len(), members.failure_count());
//!
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod callnumber;
pub mod client;
pub mod conf;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod holdings;
pub mod items;
pub mod model;
pub mod requests;
pub mod runtime;
pub mod sets;

pub use budget::{BudgetState, CallBudget, CancelReason};
pub use client::{AlmaClient, ApiRequest, ClientConfig};
pub use dispatch::{NoProgress, ProgressObserver, WorkScope};
pub use error::{ApiError, BulkOutcome};
pub use holdings::{CleanupReport, FieldChange};
pub use items::{ScanLocation, ScannedItem};
pub use model::{
    CodeTable, Department, Holding, HoldingListMember, Item, Library, Member, Set, SetContent,
    SetKind, UserRequest,
};
pub use requests::{CancelReport, RequestFilter, RequestOutcome};
pub use runtime::RunRuntime;
pub use sets::{SetRef, SetRequirement};
