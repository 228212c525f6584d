//! Maps DAP2 (OPeNDAP) datasets onto a typed, hierarchical data model.
//!
//! Opening a dataset fetches its structural declaration (DDS) and attribute
//! tables (DAS), mirrors the declaration in a [`DescriptorTree`], merges the
//! attributes into it and builds a [`Model`] of groups, shared dimensions,
//! variables, structures, sequences and grids. Reads turn a data response
//! (DataDDS) into shaped [`ArrayData`].
//!
//! ```ignore
//! use dods_client::{DodsConfig, DodsDataset};
//!
//! let mut dataset = DodsDataset::open("http://server/data/sst.nc", transport, DodsConfig::default())?;
//! let sst = dataset.require_entity("sst")?;
//! let data = dataset.read(sst)?;
//! ```
//!
//! Any number of entities read together through
//! [`DodsDataset::read_arrays`] cost one request.

pub mod array;
pub mod attributes;
pub mod batch;
pub mod builder;
pub mod config;
pub mod constraint;
pub mod convert;
pub mod dataset;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod preload;
pub mod regroup;

pub use array::{ArrayData, StructureArray};
pub use attributes::{merge_das, AttributeRecord, ReservedDims};
pub use batch::{BatchReader, RequestId, ResponseSlot};
pub use builder::ModelBuilder;
pub use config::DodsConfig;
pub use constraint::{parse_expression, parse_projection, IndexRange, Projection};
pub use convert::DataConverter;
pub use dataset::{CancelFlag, DatasetLocation, DodsDataset};
pub use descriptor::{DescriptorTree, NodeId, WireKind};
pub use error::{DodsError, Result};
pub use model::{
    Attribute, AttributeValues, DataKind, DimId, Dimension, Entity, EntityId, EntityKind, Group,
    GroupId, Model,
};
pub use regroup::regroup;
