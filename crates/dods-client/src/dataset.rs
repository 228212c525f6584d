//! The dataset facade: open a DAP2 dataset, inspect its model, read data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dap_wire::{Das, Transport};
use tracing::{debug, info, warn};

use crate::array::ArrayData;
use crate::attributes::merge_das;
use crate::batch::BatchReader;
use crate::builder::ModelBuilder;
use crate::config::DodsConfig;
use crate::constraint::{batch_expression, parse_expression, section_projection, IndexRange};
use crate::descriptor::DescriptorTree;
use crate::error::{DodsError, Result};
use crate::model::{Attribute, AttributeValues, Entity, EntityId, EntityKind, GroupId, Model};
use crate::preload::{mark_caching, preload_candidates};
use crate::regroup::regroup;

/// Cooperative cancellation shared between a caller and an `open()` in progress.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DodsError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A dataset URL split into its canonical name, transport URL and constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLocation {
    /// Canonical `dods:` (or `file:`) location.
    pub location: String,
    /// URL handed to the transport.
    pub transport_url: String,
    /// Constraint embedded after `?`, without the `?`.
    pub constraint: Option<String>,
}

impl DatasetLocation {
    /// `http:` and `https:` map to `dods:`, `dods:` is fetched over `http:`,
    /// `file:` is kept. Other schemes are rejected.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let (base, constraint) = match url.split_once('?') {
            Some((base, ce)) if !ce.trim().is_empty() => (base, Some(ce.trim().to_string())),
            Some((base, _)) => (base, None),
            None => (url, None),
        };

        let (location, transport_url) = if let Some(rest) = base.strip_prefix("https:") {
            (format!("dods:{}", rest), base.to_string())
        } else if let Some(rest) = base.strip_prefix("http:") {
            (format!("dods:{}", rest), base.to_string())
        } else if let Some(rest) = base.strip_prefix("dods:") {
            (base.to_string(), format!("http:{}", rest))
        } else if base.starts_with("file:") {
            (base.to_string(), base.to_string())
        } else {
            return Err(DodsError::InvalidLocation(format!(
                "'{}' is not an http:, https:, dods: or file: URL",
                url
            )));
        };

        Ok(Self {
            location,
            transport_url,
            constraint,
        })
    }
}

/// An open DAP2 dataset.
///
/// Reads take `&mut self`: cached data is attached to entities as reads
/// complete, so one dataset serves one caller at a time.
pub struct DodsDataset<T: Transport> {
    location: DatasetLocation,
    transport: T,
    config: DodsConfig,
    tree: DescriptorTree,
    model: Model,
    diagnostics: Vec<DodsError>,
}

impl<T: Transport> DodsDataset<T> {
    /// Open a dataset: fetch its DDS and DAS, build the model, preload.
    pub fn open(url: &str, transport: T, config: DodsConfig) -> Result<Self> {
        Self::open_with_cancel(url, transport, config, &CancelFlag::new())
    }

    /// As [`DodsDataset::open`], checking `cancel` between construction phases.
    pub fn open_with_cancel(url: &str, mut transport: T, config: DodsConfig, cancel: &CancelFlag) -> Result<Self> {
        config.validate().map_err(DodsError::InvalidConfig)?;
        let location = DatasetLocation::parse(url)?;
        info!(location = %location.location, "Opening dataset");

        let dds = transport.fetch_dds(&location.transport_url)?;
        cancel.check()?;

        let mut diagnostics = Vec::new();
        let das = match transport.fetch_das(&location.transport_url) {
            Ok(das) => das,
            Err(e) => {
                warn!(location = %location.location, error = %e, "Could not fetch attributes, continuing without them");
                diagnostics.push(DodsError::Transport(e));
                Das::default()
            }
        };
        cancel.check()?;

        let mut tree = DescriptorTree::from_dds_recovering(&dds);
        let reserved = merge_das(&mut tree, &das);
        diagnostics.append(&mut tree.diagnostics);

        let (mut model, built) = ModelBuilder::new(&tree, &config)
            .with_cancel(cancel)
            .build(&reserved)?;
        diagnostics.extend(built);

        if config.use_groups {
            regroup(&mut model, &tree);
        }

        let mut dataset = Self {
            location,
            transport,
            config,
            tree,
            model,
            diagnostics,
        };
        dataset.apply_url_constraint()?;
        cancel.check()?;

        if dataset.config.preload {
            dataset.preload()?;
        }

        info!(
            location = %dataset.location.location,
            entities = dataset.model.entity_count(),
            diagnostics = dataset.diagnostics.len(),
            "Dataset open"
        );
        Ok(dataset)
    }

    /// Attach each projection of the URL constraint to the entity it names.
    fn apply_url_constraint(&mut self) -> Result<()> {
        let constraint = match &self.location.constraint {
            Some(ce) => ce.clone(),
            None => return Ok(()),
        };
        for projection in parse_expression(&constraint)? {
            let names = projection.names();
            let target = self
                .model
                .entities()
                .find(|(_, e)| self.tree.encoded_path(e.descriptor) == names)
                .map(|(id, _)| id);
            match target {
                Some(id) => {
                    let entity = self.model.entity_mut(id);
                    entity.ce = Some(projection.to_string());
                    entity.caching = true;
                    debug!(entity = %entity.name, ce = %projection, "Attached URL constraint");
                }
                None => {
                    warn!(projection = %projection, "URL constraint names no variable");
                    self.diagnostics
                        .push(DodsError::NotFound(format!("URL constraint '{}'", projection)));
                }
            }
        }
        Ok(())
    }

    fn preload(&mut self) -> Result<()> {
        let candidates = preload_candidates(&self.model, &self.config);
        if candidates.is_empty() {
            return Ok(());
        }
        mark_caching(&mut self.model, &candidates);
        debug!(count = candidates.len(), "Preloading entities");
        self.read_arrays(&candidates)?;
        Ok(())
    }

    fn reader(&mut self) -> BatchReader<'_, T> {
        BatchReader::new(
            &mut self.transport,
            &self.location.transport_url,
            &self.tree,
            &mut self.model,
            &self.config,
        )
    }

    /// Read several entities with a single request.
    pub fn read_arrays(&mut self, ids: &[EntityId]) -> Result<Vec<Option<ArrayData>>> {
        let mut reader = self.reader();
        let result = reader.read(ids);
        let misses = reader.into_diagnostics();
        self.diagnostics.extend(misses);
        result
    }

    /// Read one entity; `None` if the server returned no data for it.
    pub fn read(&mut self, id: EntityId) -> Result<Option<ArrayData>> {
        Ok(self.read_arrays(&[id])?.into_iter().next().flatten())
    }

    /// Read a section of one entity.
    ///
    /// `ranges` holds either the leaf's ranges only, or one list per
    /// structure level from the outermost ancestor down.
    pub fn read_section(&mut self, id: EntityId, ranges: &[Vec<IndexRange>]) -> Result<Option<ArrayData>> {
        let projection = section_projection(&self.tree, &self.model, id, ranges)?;
        let expression = batch_expression(&[projection.to_string()]);
        self.read_expression(id, &expression)
    }

    /// Read one entity with a caller-supplied constraint expression.
    pub fn read_with_ce(&mut self, id: EntityId, ce: &str) -> Result<Option<ArrayData>> {
        parse_expression(ce)?;
        let expression = if ce.starts_with('?') {
            ce.to_string()
        } else {
            format!("?{}", ce)
        };
        self.read_expression(id, &expression)
    }

    fn read_expression(&mut self, id: EntityId, expression: &str) -> Result<Option<ArrayData>> {
        let mut reader = self.reader();
        let result = reader.read_expression(id, expression);
        let misses = reader.into_diagnostics();
        self.diagnostics.extend(misses);
        result
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        self.model.entity(id)
    }

    /// Entity by full name (`grp/var`, `struct.member`).
    pub fn find_entity(&self, full_name: &str) -> Option<EntityId> {
        self.model.find_entity(full_name)
    }

    /// As [`DodsDataset::find_entity`], failing with `NotFound`.
    pub fn require_entity(&self, full_name: &str) -> Result<EntityId> {
        self.find_entity(full_name)
            .ok_or_else(|| DodsError::NotFound(full_name.to_string()))
    }

    /// Problems recovered while opening and reading.
    pub fn diagnostics(&self) -> &[DodsError] {
        &self.diagnostics
    }

    pub fn location(&self) -> &DatasetLocation {
        &self.location
    }

    pub fn config(&self) -> &DodsConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// CDL-style listing of the model.
    pub fn describe(&self) -> String {
        let mut out = format!("netcdf {} {{\n", self.location.location);
        self.describe_group(self.model.root(), 1, &mut out);
        out.push_str("}\n");
        out
    }

    fn describe_group(&self, id: GroupId, depth: usize, out: &mut String) {
        let model = &self.model;
        let group = model.group(id);
        let pad = "  ".repeat(depth);

        if !group.dims.is_empty() {
            out.push_str(&format!("{}dimensions:\n", pad));
            for d in &group.dims {
                let dim = model.dim(*d);
                let name = dim.name.as_deref().unwrap_or("");
                if dim.unlimited {
                    out.push_str(&format!("{}  {} = UNLIMITED ; // ({} currently)\n", pad, name, dim.length));
                } else {
                    out.push_str(&format!("{}  {} = {} ;\n", pad, name, dim.length));
                }
            }
        }

        if !group.entities.is_empty() {
            out.push_str(&format!("{}variables:\n", pad));
            for e in &group.entities {
                self.describe_entity(*e, depth + 1, out);
            }
        }

        for child in &group.groups {
            out.push_str(&format!("\n{}group: {} {{\n", pad, model.group(*child).name));
            self.describe_group(*child, depth + 1, out);
            out.push_str(&format!("{}}}\n", pad));
        }

        if !group.attributes.is_empty() {
            out.push_str(&format!("\n{}// global attributes:\n", pad));
            for attribute in &group.attributes {
                out.push_str(&format!("{}  :{} = {} ;\n", pad, attribute.name, cdl_values(attribute)));
            }
        }
    }

    fn describe_entity(&self, id: EntityId, depth: usize, out: &mut String) {
        let model = &self.model;
        let entity = model.entity(id);
        let pad = "  ".repeat(depth);
        let dims: Vec<String> = entity
            .dims
            .iter()
            .map(|d| {
                let dim = model.dim(*d);
                match (&dim.name, dim.variable_length) {
                    (_, true) => "*".to_string(),
                    (Some(name), _) => name.clone(),
                    (None, _) => dim.length.to_string(),
                }
            })
            .collect();
        let shape = if dims.is_empty() {
            String::new()
        } else {
            format!("({})", dims.join(", "))
        };

        match &entity.kind {
            EntityKind::Structure { members } | EntityKind::Sequence { members } => {
                let keyword = if matches!(entity.kind, EntityKind::Sequence { .. }) {
                    "sequence"
                } else {
                    "structure"
                };
                out.push_str(&format!("{}{} {{\n", pad, keyword));
                for m in members {
                    self.describe_entity(*m, depth + 1, out);
                }
                out.push_str(&format!("{}}} {}{} ;\n", pad, entity.name, shape));
            }
            _ => {
                let unsigned = if entity.unsigned { "unsigned " } else { "" };
                out.push_str(&format!(
                    "{}{}{} {}{} ;\n",
                    pad,
                    unsigned,
                    entity.data_kind.cdl_name(),
                    entity.name,
                    shape
                ));
            }
        }
        for attribute in &entity.attributes {
            out.push_str(&format!(
                "{}  {}:{} = {} ;\n",
                pad,
                entity.name,
                attribute.name,
                cdl_values(attribute)
            ));
        }
    }
}

fn cdl_values(attribute: &Attribute) -> String {
    match &attribute.values {
        AttributeValues::Str(v) => v
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect::<Vec<_>>()
            .join(", "),
        other => (0..other.len())
            .filter_map(|i| attribute.numeric_value(i))
            .map(|x| x.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    }
}
