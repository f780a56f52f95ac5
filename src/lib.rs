#[macro_use]
extern crate horrorshow;
#[macro_use]
extern crate serde_derive;

mod auth;
mod cli;
mod conversion;
mod converter;
mod pages;
mod record;
mod static_files;
mod store;
mod web_server;

pub use auth::{is_authorized, AdminCredentials, Authenticator};
pub use cli::Args;
pub use conversion::{run_conversion, ConvertError, ConvertRequest};
pub use converter::{convert, drop_empty_lines, strip_markdown};
pub use record::{ConversionOptions, ConversionRecord, TimestampSource, PASTED_FILENAME};
pub use store::memory::MemoryStore;
pub use store::sqlite::SqliteStore;
pub use store::{sort_newest_first, Listing, RecordStore, StoreError, Stores, CONVERSIONS};
pub use web_server::{build_app, State};
