//! Descriptor tree: an arena mirroring the constructor nesting of a DDS.
//!
//! The tree is built twice per dataset lifetime in different roles. At open
//! time it is built from the shape-only DDS in recovering mode and kept as
//! the arena every model entity points into. For each read a short-lived
//! tree is built strictly from the DataDDS and used only to locate the
//! response declarations that answer each request.

use dap_wire::{escape::unescape_dap, DeclKind, Declaration, Dds, PrimitiveKind};
use tracing::{debug, warn};

use crate::attributes::AttributeRecord;
use crate::error::{DodsError, Result};

/// Index of a node in a [`DescriptorTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind tag of a descriptor node.
///
/// Arrays carry their element kind plus an [`ArrayDescriptor`]; there is no
/// separate array tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
    String,
    Url,
    Structure,
    Sequence,
    Grid,
}

impl WireKind {
    fn from_primitive(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Byte => Self::Byte,
            PrimitiveKind::Int16 => Self::Int16,
            PrimitiveKind::UInt16 => Self::UInt16,
            PrimitiveKind::Int32 => Self::Int32,
            PrimitiveKind::UInt32 => Self::UInt32,
            PrimitiveKind::Float32 => Self::Float32,
            PrimitiveKind::Float64 => Self::Float64,
            PrimitiveKind::String => Self::String,
            PrimitiveKind::Url => Self::Url,
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Structure | Self::Sequence | Self::Grid)
    }
}

/// One declared dimension, names unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dim {
    pub name: Option<String>,
    pub size: usize,
}

/// Dimension list attached to array nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDescriptor {
    pub dims: Vec<Dim>,
}

/// One step from a declaration to one of its nested declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginStep {
    /// Top-level declaration, structure member or sequence member.
    Member(usize),
    /// Element template of an array.
    Template,
    GridArray,
    GridMap(usize),
}

/// One wire declaration.
#[derive(Debug, Clone)]
pub struct DescriptorNode {
    pub clear_name: String,
    pub encoded_name: String,
    /// `None` only for the synthetic root.
    pub kind: Option<WireKind>,
    /// Same as `kind` except for grids, whose element is the array's element.
    pub element_kind: Option<WireKind>,
    pub array: Option<ArrayDescriptor>,
    /// Parent's `all_dims` followed by this node's own dimensions.
    pub all_dims: Vec<Dim>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub attributes: Vec<AttributeRecord>,
    pub seq: usize,
    pub materialized: bool,
    /// Path from the DDS top level to the declaration this node came from.
    pub origin: Vec<OriginStep>,
}

impl DescriptorNode {
    fn root() -> Self {
        Self {
            clear_name: String::new(),
            encoded_name: String::new(),
            kind: None,
            element_kind: None,
            array: None,
            all_dims: Vec::new(),
            children: Vec::new(),
            parent: None,
            attributes: Vec::new(),
            seq: 0,
            materialized: false,
            origin: Vec::new(),
        }
    }

    /// Own dimensions; empty unless the node is an array.
    pub fn dims(&self) -> &[Dim] {
        self.array.as_ref().map(|a| a.dims.as_slice()).unwrap_or(&[])
    }

    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }

    /// Sequences and arrays of structures hold one member list per instance.
    pub fn is_row_container(&self) -> bool {
        match self.kind {
            Some(WireKind::Sequence) => true,
            Some(WireKind::Structure) => self.is_array(),
            _ => false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeRecord> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Arena of descriptor nodes under a synthetic, kind-less root.
#[derive(Debug, Clone)]
pub struct DescriptorTree {
    nodes: Vec<DescriptorNode>,
    root: NodeId,
    /// Constructs dropped while building in recovering mode.
    pub diagnostics: Vec<DodsError>,
}

impl DescriptorTree {
    /// Build strictly: any unsupported array element fails the build.
    pub fn from_dds(dds: &Dds) -> Result<Self> {
        Self::build(dds, true)
    }

    /// Build, dropping unsupported declarations and recording diagnostics.
    pub fn from_dds_recovering(dds: &Dds) -> Self {
        match Self::build(dds, false) {
            Ok(tree) => tree,
            // Recovering mode never returns an error.
            Err(e) => {
                let mut tree = Self::empty();
                tree.diagnostics.push(e);
                tree
            }
        }
    }

    fn empty() -> Self {
        Self {
            nodes: vec![DescriptorNode::root()],
            root: NodeId(0),
            diagnostics: Vec::new(),
        }
    }

    fn build(dds: &Dds, strict: bool) -> Result<Self> {
        let mut tree = Self::empty();
        for (i, decl) in dds.declarations.iter().enumerate() {
            tree.visit(decl, tree.root, vec![OriginStep::Member(i)], strict)?;
        }
        tree.assign_sequence_numbers();
        debug!(
            dataset = %dds.name,
            nodes = tree.nodes.len() - 1,
            dropped = tree.diagnostics.len(),
            "Built descriptor tree"
        );
        Ok(tree)
    }

    fn push(&mut self, decl_name: &str, kind: WireKind, parent: NodeId, origin: Vec<OriginStep>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let all_dims = self.nodes[parent.0].all_dims.clone();
        self.nodes.push(DescriptorNode {
            clear_name: unescape_dap(decl_name),
            encoded_name: decl_name.to_string(),
            kind: Some(kind),
            element_kind: Some(kind),
            array: None,
            all_dims,
            children: Vec::new(),
            parent: Some(parent),
            attributes: Vec::new(),
            seq: 0,
            materialized: false,
            origin,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    fn unsupported(&mut self, strict: bool, msg: String) -> Result<Option<NodeId>> {
        if strict {
            return Err(DodsError::unsupported(msg));
        }
        warn!(reason = %msg, "Skipping unsupported declaration");
        self.diagnostics.push(DodsError::unsupported(msg));
        Ok(None)
    }

    fn visit(
        &mut self,
        decl: &Declaration,
        parent: NodeId,
        origin: Vec<OriginStep>,
        strict: bool,
    ) -> Result<Option<NodeId>> {
        match &decl.kind {
            DeclKind::List { .. } => {
                let msg = format!("list type '{}' is not supported", decl.name);
                warn!(reason = %msg, "Skipping list declaration");
                self.diagnostics.push(DodsError::unsupported(msg));
                Ok(None)
            }

            DeclKind::Primitive { kind, .. } => {
                Ok(Some(self.push(&decl.name, WireKind::from_primitive(*kind), parent, origin)))
            }

            DeclKind::Array { dims, template, .. } => {
                if dims.iter().any(|d| d.size == 0) {
                    debug!(name = %decl.name, "Skipping zero-size array");
                    return Ok(None);
                }
                let dims: Vec<Dim> = dims
                    .iter()
                    .map(|d| Dim {
                        name: d.name.as_deref().map(unescape_dap),
                        size: d.size,
                    })
                    .collect();

                let id = match &template.kind {
                    DeclKind::Primitive { kind, .. } => {
                        self.push(&decl.name, WireKind::from_primitive(*kind), parent, origin)
                    }
                    DeclKind::Structure { members } => {
                        let id = self.push(&decl.name, WireKind::Structure, parent, origin.clone());
                        self.attach_array(id, dims.clone());
                        for (j, member) in members.iter().enumerate() {
                            let mut path = origin.clone();
                            path.extend([OriginStep::Template, OriginStep::Member(j)]);
                            self.visit(member, id, path, strict)?;
                        }
                        return Ok(Some(id));
                    }
                    _ => {
                        let msg = format!(
                            "array '{}' of {} elements is not supported",
                            decl.name,
                            template.type_name()
                        );
                        return self.unsupported(strict, msg);
                    }
                };
                self.attach_array(id, dims);
                Ok(Some(id))
            }

            DeclKind::Structure { members } | DeclKind::Sequence { members, .. } => {
                let kind = if matches!(decl.kind, DeclKind::Sequence { .. }) {
                    WireKind::Sequence
                } else {
                    WireKind::Structure
                };
                let id = self.push(&decl.name, kind, parent, origin.clone());
                for (j, member) in members.iter().enumerate() {
                    let mut path = origin.clone();
                    path.push(OriginStep::Member(j));
                    self.visit(member, id, path, strict)?;
                }
                Ok(Some(id))
            }

            DeclKind::Grid { array, maps } => {
                let element = match &array.kind {
                    DeclKind::Array { template, .. } => match template.kind {
                        DeclKind::Primitive { kind, .. } => WireKind::from_primitive(kind),
                        _ => {
                            let msg = format!("grid '{}' has a non-primitive array", decl.name);
                            return self.unsupported(strict, msg);
                        }
                    },
                    _ => {
                        let msg = format!("grid '{}' has no array part", decl.name);
                        return self.unsupported(strict, msg);
                    }
                };

                let id = self.push(&decl.name, WireKind::Grid, parent, origin.clone());
                self.nodes[id.0].element_kind = Some(element);

                let mut path = origin.clone();
                path.push(OriginStep::GridArray);
                if self.visit(array, id, path, strict)?.is_none() {
                    // Empty projection: drop the whole grid so child 0 stays the array.
                    debug!(name = %decl.name, "Skipping grid with empty array");
                    self.detach_last(parent, id);
                    return Ok(None);
                }
                for (k, map) in maps.iter().enumerate() {
                    let mut path = origin.clone();
                    path.push(OriginStep::GridMap(k));
                    self.visit(map, id, path, strict)?;
                }
                Ok(Some(id))
            }
        }
    }

    fn attach_array(&mut self, id: NodeId, dims: Vec<Dim>) {
        let node = &mut self.nodes[id.0];
        node.all_dims.extend(dims.iter().cloned());
        node.array = Some(ArrayDescriptor { dims });
    }

    /// Remove `id`, the most recently pushed node, together with its descendants.
    fn detach_last(&mut self, parent: NodeId, id: NodeId) {
        self.nodes[parent.0].children.retain(|c| *c != id);
        self.nodes.truncate(id.0);
    }

    fn assign_sequence_numbers(&mut self) {
        let mut next = 0;
        let children = self.nodes[self.root.0].children.clone();
        for child in children {
            self.number_post_order(child, &mut next);
        }
        self.nodes[self.root.0].seq = next;
    }

    fn number_post_order(&mut self, id: NodeId, next: &mut usize) {
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.number_post_order(child, next);
        }
        self.nodes[id.0].seq = *next;
        *next += 1;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &DescriptorNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut DescriptorNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Top-level nodes in document order.
    pub fn top_level(&self) -> &[NodeId] {
        &self.nodes[self.root.0].children
    }

    /// All non-root nodes in arena (pre-order) order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DescriptorNode)> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, n)| (NodeId(i), n))
    }

    /// Child of `parent` with the given unescaped name.
    pub fn find_child(&self, parent: NodeId, clear_name: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].clear_name == clear_name)
    }

    fn find_encoded_child(&self, parent: NodeId, encoded: &str, skip_done: bool) -> Option<NodeId> {
        self.nodes[parent.0].children.iter().copied().find(|c| {
            let node = &self.nodes[c.0];
            node.encoded_name == encoded && !(skip_done && node.materialized)
        })
    }

    /// Node ids from the top-level ancestor down to `id` inclusive.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if c == self.root {
                break;
            }
            chain.push(c);
            current = self.nodes[c.0].parent;
        }
        chain.reverse();
        chain
    }

    /// Unescaped names from the top level down to `id`.
    pub fn path_names(&self, id: NodeId) -> Vec<String> {
        self.lineage(id)
            .into_iter()
            .map(|c| self.nodes[c.0].clear_name.clone())
            .collect()
    }

    /// Encoded names from the top level down to `id`.
    pub fn encoded_path(&self, id: NodeId) -> Vec<String> {
        self.lineage(id)
            .into_iter()
            .map(|c| self.nodes[c.0].encoded_name.clone())
            .collect()
    }

    /// Find the node answering an encoded name path and mark it materialized.
    ///
    /// The last segment skips nodes already materialized so repeated names
    /// pair up in order. When the full path does not match, shorter suffixes
    /// are tried from the top level, since servers may omit a structure
    /// wrapper around projected members.
    pub fn find_counterpart(&mut self, path: &[String]) -> Option<NodeId> {
        let found = (0..path.len()).find_map(|start| self.find_path(&path[start..]));
        if let Some(id) = found {
            self.nodes[id.0].materialized = true;
        }
        found
    }

    fn find_path(&self, path: &[String]) -> Option<NodeId> {
        let mut current = self.root;
        for (i, name) in path.iter().enumerate() {
            let last = i + 1 == path.len();
            current = self.find_encoded_child(current, name, last)?;
        }
        if current == self.root {
            None
        } else {
            Some(current)
        }
    }

    /// Follow a node's origin back into the declaration tree it was built from.
    pub fn resolve_origin<'d>(&self, dds: &'d Dds, id: NodeId) -> Option<&'d Declaration> {
        let origin = &self.nodes[id.0].origin;
        let (first, rest) = origin.split_first()?;
        let mut decl = match first {
            OriginStep::Member(i) => dds.declarations.get(*i)?,
            _ => return None,
        };
        for step in rest {
            decl = match (step, &decl.kind) {
                (OriginStep::Member(j), DeclKind::Structure { members })
                | (OriginStep::Member(j), DeclKind::Sequence { members, .. }) => members.get(*j)?,
                (OriginStep::Template, DeclKind::Array { template, .. }) => template,
                (OriginStep::GridArray, DeclKind::Grid { array, .. }) => array,
                (OriginStep::GridMap(k), DeclKind::Grid { maps, .. }) => maps.get(*k)?,
                _ => return None,
            };
        }
        Some(decl)
    }
}
