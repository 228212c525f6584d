//! DAP2 wire objects shared by the OPeNDAP client crates.
//!
//! The grammar parser and the HTTP transport live outside this workspace.
//! They hand the client fully parsed objects of the types defined here:
//!
//! - [`Dds`]: the structural declaration of a dataset. A DataDDS (the body of
//!   a `.dods` response) uses the same type with the values filled in.
//! - [`Das`]: the flat collection of attribute tables.
//! - [`Transport`]: the blocking request/response seam the client drives.

pub mod das;
pub mod dds;
pub mod error;
pub mod escape;
pub mod transport;

pub use das::{AttrKind, AttributeEntry, AttributeTable, AttributeValue, Das};
pub use dds::{ArrayDim, ArrayValues, DeclKind, Declaration, Dds, PrimitiveKind, PrimitiveVector};
pub use error::{TransportError, TransportResult};
pub use escape::{escape_dap, unescape_dap, unquote_attribute};
pub use transport::Transport;
