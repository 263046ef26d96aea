//! clinv-report: read-only views over the inventory
//!
//! Views return [`Sheet`]s; rendering and the CSV export live here too.

mod dump;
pub mod error;
pub mod export;
pub mod sheet;
pub mod views;

pub use error::ReportError;
pub use export::{book, write_book};
pub use sheet::Sheet;
pub use views::{
    Printout, active, labels, list, monitor, print, score, search, unassigned, unused,
};
