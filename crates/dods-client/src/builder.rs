//! Builds the typed model from a merged descriptor tree.
//!
//! Each level is built in three phases: primitive variables first, then
//! structures and sequences, then grids, so the coordinate variables a grid
//! refers to already exist when the grid is built.

use tracing::{debug, warn};

use crate::attributes::ReservedDims;
use crate::config::DodsConfig;
use crate::dataset::CancelFlag;
use crate::descriptor::{DescriptorTree, NodeId, WireKind};
use crate::error::{DodsError, Result};
use crate::model::{
    merge_attribute, Attribute, AttributeValues, DataKind, DimId, Dimension, Entity, EntityId,
    EntityKind, GroupId, Model,
};

/// Attribute naming the fixed string length of a Char variable.
pub const STRLEN_ATTRIBUTE: &str = "DODS.strlen";
/// Attribute naming the trailing dimension of a Char variable.
pub const DIMNAME_ATTRIBUTE: &str = "DODS.dimName";
pub const COORDINATE_AXES: &str = "_CoordinateAxes";
pub const CF_COORDINATES: &str = "coordinates";

/// Data kind and unsigned flag for a primitive wire kind.
pub fn map_primitive(kind: WireKind) -> Option<(DataKind, bool)> {
    let mapped = match kind {
        WireKind::Byte => (DataKind::Byte, true),
        WireKind::Int16 => (DataKind::Short, false),
        WireKind::UInt16 => (DataKind::Short, true),
        WireKind::Int32 => (DataKind::Int, false),
        WireKind::UInt32 => (DataKind::Int, true),
        WireKind::Float32 => (DataKind::Float, false),
        WireKind::Float64 => (DataKind::Double, false),
        WireKind::String | WireKind::Url => (DataKind::String, false),
        WireKind::Structure | WireKind::Sequence | WireKind::Grid => return None,
    };
    Some(mapped)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Primitives,
    Constructors,
    Grids,
}

impl Phase {
    fn accepts(self, kind: Option<WireKind>) -> bool {
        match (self, kind) {
            (Phase::Grids, Some(WireKind::Grid)) => true,
            (Phase::Constructors, Some(WireKind::Structure | WireKind::Sequence)) => true,
            (Phase::Primitives, Some(k)) => k.is_primitive(),
            _ => false,
        }
    }
}

/// One-shot builder from descriptor tree to [`Model`].
pub struct ModelBuilder<'a> {
    tree: &'a DescriptorTree,
    config: &'a DodsConfig,
    cancel: Option<&'a CancelFlag>,
    model: Model,
    diagnostics: Vec<DodsError>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(tree: &'a DescriptorTree, config: &'a DodsConfig) -> Self {
        Self {
            tree,
            config,
            cancel: None,
            model: Model::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Check `cancel` after every top-level entity.
    pub fn with_cancel(mut self, cancel: &'a CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the model and return it with the diagnostics recorded on the way.
    pub fn build(mut self, reserved: &ReservedDims) -> Result<(Model, Vec<DodsError>)> {
        let tree = self.tree;
        let root = self.model.root();
        for record in &tree.node(tree.root()).attributes {
            let attribute = Attribute::from_record(record);
            merge_attribute(&mut self.model.group_mut(root).attributes, attribute);
        }

        self.build_level(tree.top_level(), root, true)?;
        self.apply_reserved(reserved);

        debug!(
            entities = self.model.entity_count(),
            diagnostics = self.diagnostics.len(),
            "Built dataset model"
        );
        Ok((self.model, self.diagnostics))
    }

    fn check_cancel(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.is_cancelled() => Err(DodsError::Cancelled),
            _ => Ok(()),
        }
    }

    fn build_level(&mut self, nodes: &[NodeId], group: GroupId, top: bool) -> Result<()> {
        let tree = self.tree;
        for phase in [Phase::Primitives, Phase::Constructors, Phase::Grids] {
            for &node in nodes {
                if !phase.accepts(tree.node(node).kind) {
                    continue;
                }
                self.build_entity(node, group, None)?;
                if top {
                    self.check_cancel()?;
                }
            }
        }
        Ok(())
    }

    fn build_entity(&mut self, node: NodeId, group: GroupId, parent: Option<EntityId>) -> Result<Option<EntityId>> {
        let kind = match self.tree.node(node).kind {
            Some(kind) => kind,
            None => return Ok(None),
        };
        match kind {
            WireKind::Structure => self.build_structure(node, group, parent),
            WireKind::Sequence => self.build_sequence(node, group, parent),
            WireKind::Grid => self.build_grid(node, group, parent),
            _ => Ok(self.build_variable(node, group, parent)),
        }
    }

    fn resolve_dim(&mut self, group: GroupId, name: Option<&str>, size: usize) -> DimId {
        match name {
            Some(n) if self.config.use_groups && n.contains('/') => {
                let root = self.model.root();
                let target = self.model.make_relative_group(root, n, true);
                let local = n.rsplit('/').next().unwrap_or(n);
                self.model.resolve_dim(target, Some(local), size)
            }
            _ => self.model.resolve_dim(group, name, size),
        }
    }

    fn declared_dims(&mut self, node: NodeId, group: GroupId) -> Vec<DimId> {
        let tree = self.tree;
        tree.node(node)
            .dims()
            .iter()
            .map(|d| self.resolve_dim(group, d.name.as_deref(), d.size))
            .collect()
    }

    fn new_entity(
        &self,
        node: NodeId,
        group: GroupId,
        parent: Option<EntityId>,
        data_kind: DataKind,
        dims: Vec<DimId>,
        kind: EntityKind,
    ) -> Entity {
        let descriptor = self.tree.node(node);
        let mut attributes = Vec::new();
        for record in &descriptor.attributes {
            merge_attribute(&mut attributes, Attribute::from_record(record));
        }
        Entity {
            name: descriptor.clear_name.clone(),
            dods_name: self.tree.path_names(node).join("."),
            parent_structure: parent,
            group,
            data_kind,
            dims,
            unsigned: false,
            attributes,
            caching: false,
            cached: None,
            descriptor: node,
            kind,
            ce: None,
        }
    }

    /// Fixed string length declared for a String variable, if any.
    fn strlen(&self, node: NodeId) -> Option<usize> {
        let record = self.tree.node(node).attribute(STRLEN_ATTRIBUTE)?;
        match record.values.first().and_then(|v| v.parse::<usize>().ok()) {
            Some(len) if len > 0 => Some(len),
            _ => {
                warn!(
                    variable = %self.tree.node(node).clear_name,
                    values = ?record.values,
                    "Ignoring unusable string length"
                );
                None
            }
        }
    }

    fn build_variable(&mut self, node: NodeId, group: GroupId, parent: Option<EntityId>) -> Option<EntityId> {
        let tree = self.tree;
        let descriptor = tree.node(node);
        let (mut data_kind, unsigned) = match descriptor.kind.and_then(map_primitive) {
            Some(mapped) => mapped,
            None => {
                warn!(name = %descriptor.clear_name, kind = ?descriptor.kind, "No mapping for declaration, skipping");
                return None;
            }
        };

        let mut dims = self.declared_dims(node, group);
        if data_kind == DataKind::String {
            if let Some(strlen) = self.strlen(node) {
                let dim_name = descriptor
                    .attribute(DIMNAME_ATTRIBUTE)
                    .and_then(|a| a.values.first())
                    .filter(|n| !n.is_empty())
                    .cloned();
                dims.push(self.resolve_dim(group, dim_name.as_deref(), strlen));
                data_kind = DataKind::Char;
            }
        }

        let kind = if dims.is_empty() { EntityKind::Scalar } else { EntityKind::Array };
        let mut entity = self.new_entity(node, group, parent, data_kind, dims, kind);
        entity.unsigned = unsigned;
        Some(self.model.add_entity(entity))
    }

    fn build_members(&mut self, node: NodeId, group: GroupId, owner: EntityId) -> Result<Vec<EntityId>> {
        let tree = self.tree;
        let mut members = Vec::new();
        for &child in &tree.node(node).children {
            if let Some(member) = self.build_entity(child, group, Some(owner))? {
                members.push(member);
            }
        }
        Ok(members)
    }

    fn build_structure(&mut self, node: NodeId, group: GroupId, parent: Option<EntityId>) -> Result<Option<EntityId>> {
        let tree = self.tree;
        let descriptor = tree.node(node);

        if self.config.use_groups && parent.is_none() && !descriptor.is_array() {
            let promoted = match self.model.find_child_group(group, &descriptor.clear_name) {
                Some(g) => g,
                None => self.model.add_group(group, descriptor.clear_name.clone()),
            };
            for record in &descriptor.attributes {
                merge_attribute(
                    &mut self.model.group_mut(promoted).attributes,
                    Attribute::from_record(record),
                );
            }
            debug!(name = %descriptor.clear_name, "Promoted structure to group");
            self.build_level(&descriptor.children, promoted, false)?;
            return Ok(None);
        }

        let dims = self.declared_dims(node, group);
        let kind = if dims.is_empty() { EntityKind::Scalar } else { EntityKind::Array };
        let entity = self.new_entity(node, group, parent, DataKind::Structure, dims, kind);
        let id = self.model.add_entity(entity);
        let members = self.build_members(node, group, id)?;
        self.model.entity_mut(id).kind = EntityKind::Structure { members };
        Ok(Some(id))
    }

    fn build_sequence(&mut self, node: NodeId, group: GroupId, parent: Option<EntityId>) -> Result<Option<EntityId>> {
        let dims = vec![self.model.variable_length_dim()];
        let entity = self.new_entity(node, group, parent, DataKind::Structure, dims, EntityKind::Scalar);
        let id = self.model.add_entity(entity);
        let members = self.build_members(node, group, id)?;
        self.model.entity_mut(id).kind = EntityKind::Sequence { members };
        Ok(Some(id))
    }

    /// Existing variable a grid map can reuse: same name, same owner, not a constructor.
    fn find_existing_map(&self, group: GroupId, parent: Option<EntityId>, name: &str) -> Option<EntityId> {
        self.model
            .entities()
            .find(|(_, e)| {
                e.name == name
                    && e.group == group
                    && e.parent_structure == parent
                    && e.data_kind != DataKind::Structure
                    && !e.dims.is_empty()
            })
            .map(|(id, _)| id)
    }

    /// Rewrite the first dimension to the shared dimension named after the variable.
    fn make_coordinate(&mut self, id: EntityId) {
        let entity = self.model.entity(id);
        let first = match entity.dims.first() {
            Some(d) => *d,
            None => return,
        };
        let (name, group) = (entity.name.clone(), entity.group);
        let length = self.model.dim(first).length;
        let shared = self.model.coordinate_dim(group, &name, length);
        self.model.entity_mut(id).dims[0] = shared;
    }

    fn build_grid(&mut self, node: NodeId, group: GroupId, parent: Option<EntityId>) -> Result<Option<EntityId>> {
        let tree = self.tree;
        let descriptor = tree.node(node);
        let (array, map_nodes) = match descriptor.children.split_first() {
            Some((array, maps)) => (*array, maps),
            None => {
                warn!(name = %descriptor.clear_name, "Grid without array, skipping");
                return Ok(None);
            }
        };
        let (data_kind, unsigned) = match descriptor.element_kind.and_then(map_primitive) {
            Some(mapped) => mapped,
            None => {
                warn!(name = %descriptor.clear_name, "Grid array has no primitive mapping, skipping");
                return Ok(None);
            }
        };

        let mut maps = Vec::new();
        for &map_node in map_nodes {
            let map_name = &tree.node(map_node).clear_name;
            let coordinate = match self.find_existing_map(group, parent, map_name) {
                Some(existing) => existing,
                None => match self.build_variable(map_node, group, parent) {
                    Some(built) => built,
                    None => continue,
                },
            };
            self.make_coordinate(coordinate);
            maps.push(coordinate);
        }

        let array_dims = tree.node(array).dims();
        let maps_match = maps.len() == array_dims.len()
            && maps.iter().zip(array_dims).all(|(m, d)| {
                self.model
                    .entity(*m)
                    .dims
                    .first()
                    .map(|first| self.model.dim(*first).length == d.size)
                    .unwrap_or(false)
            });
        let dims: Vec<DimId> = if maps_match {
            maps.iter().map(|m| self.model.entity(*m).dims[0]).collect()
        } else {
            if !maps.is_empty() {
                warn!(grid = %descriptor.clear_name, "Grid maps disagree with array shape, using array dimensions");
            }
            self.declared_dims(array, group)
        };

        let mut entity = self.new_entity(node, group, parent, data_kind, dims, EntityKind::Grid { maps: maps.clone() });
        entity.unsigned = unsigned;
        for record in &tree.node(array).attributes {
            merge_attribute(&mut entity.attributes, Attribute::from_record(record));
        }
        let map_names: Vec<String> = maps.iter().map(|m| self.model.entity(*m).name.clone()).collect();
        add_coordinate_axes(&mut entity.attributes, &map_names);

        Ok(Some(self.model.add_entity(entity)))
    }

    fn apply_reserved(&mut self, reserved: &ReservedDims) {
        if let Some(name) = &reserved.unlimited {
            let local = name.rsplit('/').next().unwrap_or(name);
            let matching: Vec<DimId> = self
                .model
                .groups()
                .flat_map(|(_, g)| g.dims.iter().copied())
                .filter(|d| {
                    let dim = self.model.dim(*d);
                    dim.shared && dim.name.as_deref() == Some(local)
                })
                .collect();
            if matching.is_empty() {
                let msg = format!("unlimited dimension '{}' is not declared", name);
                warn!(reason = %msg, "Ignoring unlimited dimension");
                self.diagnostics.push(DodsError::malformed_reserved(msg));
            }
            for d in matching {
                self.model.dim_mut(d).unlimited = true;
            }
        }

        let root = self.model.root();
        for (name, length) in &reserved.extra {
            self.model.add_group_dim(
                root,
                Dimension {
                    name: Some(name.clone()),
                    length: *length,
                    shared: false,
                    unlimited: false,
                    variable_length: false,
                },
            );
        }
    }
}

/// Set `_CoordinateAxes` to the grid maps combined with any declared axes
/// and CF `coordinates`, without duplicates.
fn add_coordinate_axes(attributes: &mut Vec<Attribute>, map_names: &[String]) {
    let mut axes: Vec<String> = Vec::new();
    if let Some(existing) = attributes.iter().find(|a| a.name == COORDINATE_AXES) {
        push_tokens(&existing.string_value(), &mut axes);
    }
    push_tokens(&map_names.join(" "), &mut axes);
    if let Some(cf) = attributes.iter().find(|a| a.name == CF_COORDINATES) {
        push_tokens(&cf.string_value(), &mut axes);
    }
    if axes.is_empty() {
        return;
    }

    attributes.retain(|a| a.name != COORDINATE_AXES);
    attributes.push(Attribute::new(COORDINATE_AXES, AttributeValues::Str(vec![axes.join(" ")])));
}

fn push_tokens(source: &str, axes: &mut Vec<String>) {
    for token in source.split_whitespace() {
        if !axes.iter().any(|a| a == token) {
            axes.push(token.to_string());
        }
    }
}
