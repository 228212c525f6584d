//! The typed dataset model: groups, shared dimensions, entities, attributes.
//!
//! Everything lives in arenas owned by [`Model`]; cross references are plain
//! indices so parents never own their children twice.

use dap_wire::AttrKind;
use tracing::warn;

use crate::array::ArrayData;
use crate::attributes::AttributeRecord;
use crate::descriptor::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimId(usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Data kind of an entity after type mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Byte,
    Short,
    Int,
    Float,
    Double,
    Char,
    String,
    Structure,
}

impl DataKind {
    /// Bytes per element on the wire, used for preload sizing.
    pub fn element_size(&self) -> usize {
        match self {
            Self::Byte | Self::Char => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Double => 8,
            Self::String | Self::Structure => 1,
        }
    }

    pub fn cdl_name(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::String => "String",
            Self::Structure => "Structure",
        }
    }
}

/// A dimension. Named dimensions registered on a group are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: Option<String>,
    pub length: usize,
    pub shared: bool,
    pub unlimited: bool,
    /// Length unknown until data arrives (sequences).
    pub variable_length: bool,
}

/// Typed attribute values; unsigned wire types are widened.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValues {
    Byte(Vec<u8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Str(Vec<String>),
}

impl AttributeValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Name as attached; shortened when group assignment relocates it.
    pub name: String,
    /// Name as merged from the DAS, possibly a dotted or slashed path.
    pub dods_name: String,
    pub values: AttributeValues,
}

fn parse_all<T: std::str::FromStr>(values: &[String]) -> Option<Vec<T>> {
    values.iter().map(|v| v.parse::<T>().ok()).collect()
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: AttributeValues) -> Self {
        let name = name.into();
        Self {
            dods_name: name.clone(),
            name,
            values,
        }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, AttributeValues::Str(vec![value.into()]))
    }

    /// Parse a merged record into typed values.
    ///
    /// Numeric text that does not parse is kept as strings.
    pub fn from_record(record: &AttributeRecord) -> Self {
        let v = &record.values;
        let parsed = match record.kind {
            AttrKind::Byte => parse_all::<u8>(v)
                .or_else(|| parse_all::<i8>(v).map(|b| b.into_iter().map(|x| x as u8).collect()))
                .map(AttributeValues::Byte),
            AttrKind::Int16 => parse_all::<i16>(v).map(AttributeValues::Short),
            AttrKind::UInt16 => parse_all::<u16>(v)
                .map(|u| AttributeValues::Int(u.into_iter().map(i32::from).collect())),
            AttrKind::Int32 => parse_all::<i32>(v).map(AttributeValues::Int),
            AttrKind::UInt32 => parse_all::<u32>(v)
                .map(|u| AttributeValues::Long(u.into_iter().map(i64::from).collect())),
            AttrKind::Float32 => parse_all::<f32>(v).map(AttributeValues::Float),
            AttrKind::Float64 => parse_all::<f64>(v).map(AttributeValues::Double),
            AttrKind::String | AttrKind::Url => Some(AttributeValues::Str(v.clone())),
        };
        let values = parsed.unwrap_or_else(|| {
            warn!(
                attribute = %record.name,
                kind = ?record.kind,
                "Numeric attribute does not parse, keeping it as text"
            );
            AttributeValues::Str(v.clone())
        });
        Self::new(record.name.clone(), values)
    }

    /// All values joined as text.
    pub fn string_value(&self) -> String {
        match &self.values {
            AttributeValues::Str(v) => v.join(" "),
            other => (0..other.len())
                .filter_map(|i| self.numeric_value(i))
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn numeric_value(&self, index: usize) -> Option<f64> {
        match &self.values {
            AttributeValues::Byte(v) => v.get(index).map(|&x| x as f64),
            AttributeValues::Short(v) => v.get(index).map(|&x| x as f64),
            AttributeValues::Int(v) => v.get(index).map(|&x| x as f64),
            AttributeValues::Long(v) => v.get(index).map(|&x| x as f64),
            AttributeValues::Float(v) => v.get(index).map(|&x| x as f64),
            AttributeValues::Double(v) => v.get(index).copied(),
            AttributeValues::Str(v) => v.get(index).and_then(|s| s.trim().parse().ok()),
        }
    }
}

/// Entity variants. Members and maps are owned by index.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Scalar,
    Array,
    Structure { members: Vec<EntityId> },
    /// First dimension is variable length.
    Sequence { members: Vec<EntityId> },
    /// Shape and data kind come from the grid's array; `maps` are coordinate variables.
    Grid { maps: Vec<EntityId> },
}

#[derive(Debug, Clone)]
pub struct Entity {
    /// Short name within its group or structure.
    pub name: String,
    /// Full unescaped wire name (dotted for members and grid parts).
    pub dods_name: String,
    pub parent_structure: Option<EntityId>,
    pub group: GroupId,
    pub data_kind: DataKind,
    pub dims: Vec<DimId>,
    pub unsigned: bool,
    pub attributes: Vec<Attribute>,
    pub caching: bool,
    pub cached: Option<ArrayData>,
    /// Node in the open-time descriptor tree this entity was built from.
    pub descriptor: NodeId,
    pub kind: EntityKind,
    /// Projection supplied in the dataset URL.
    pub ce: Option<String>,
}

impl Entity {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn members(&self) -> &[EntityId] {
        match &self.kind {
            EntityKind::Structure { members } | EntityKind::Sequence { members } => members,
            _ => &[],
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub parent: Option<GroupId>,
    pub groups: Vec<GroupId>,
    pub entities: Vec<EntityId>,
    pub attributes: Vec<Attribute>,
    pub dims: Vec<DimId>,
}

impl Group {
    fn new(name: impl Into<String>, parent: Option<GroupId>) -> Self {
        Self {
            name: name.into(),
            parent,
            groups: Vec::new(),
            entities: Vec::new(),
            attributes: Vec::new(),
            dims: Vec::new(),
        }
    }
}

/// Add an attribute unless one of that name is already present.
pub fn merge_attribute(list: &mut Vec<Attribute>, attribute: Attribute) {
    if !list.iter().any(|a| a.name == attribute.name) {
        list.push(attribute);
    }
}

/// The mapped dataset.
#[derive(Debug, Clone)]
pub struct Model {
    groups: Vec<Group>,
    entities: Vec<Entity>,
    dims: Vec<Dimension>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Self {
            groups: vec![Group::new("", None)],
            entities: Vec::new(),
            dims: Vec::new(),
        }
    }

    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn group_mut(&mut self, id: GroupId) -> &mut Group {
        &mut self.groups[id.0]
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn dim(&self, id: DimId) -> &Dimension {
        &self.dims[id.0]
    }

    pub fn dim_mut(&mut self, id: DimId) -> &mut Dimension {
        &mut self.dims[id.0]
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().enumerate().map(|(i, e)| (EntityId(i), e))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entities not owned by a structure, in creation order.
    pub fn top_level(&self) -> Vec<EntityId> {
        self.entities()
            .filter(|(_, e)| e.parent_structure.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &Group)> {
        self.groups.iter().enumerate().map(|(i, g)| (GroupId(i), g))
    }

    /// Register an entity; top-level entities are listed on their group.
    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        if entity.parent_structure.is_none() {
            self.groups[entity.group.0].entities.push(id);
        }
        self.entities.push(entity);
        id
    }

    pub fn add_group(&mut self, parent: GroupId, name: impl Into<String>) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups.push(Group::new(name, Some(parent)));
        self.groups[parent.0].groups.push(id);
        id
    }

    pub fn find_child_group(&self, parent: GroupId, name: &str) -> Option<GroupId> {
        self.groups[parent.0]
            .groups
            .iter()
            .copied()
            .find(|g| self.groups[g.0].name == name)
    }

    /// Resolve a slash path relative to `from`, creating missing groups.
    ///
    /// With `ignore_last` the final segment is treated as a leaf name and
    /// not turned into a group.
    pub fn make_relative_group(&mut self, from: GroupId, path: &str, ignore_last: bool) -> GroupId {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if ignore_last {
            segments.pop();
        }
        let mut current = from;
        for segment in segments {
            current = match self.find_child_group(current, segment) {
                Some(g) => g,
                None => self.add_group(current, segment),
            };
        }
        current
    }

    /// Slash-joined path of a group, empty for the root.
    pub fn group_path(&self, id: GroupId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(g) = current {
            let group = &self.groups[g.0];
            if group.parent.is_some() {
                names.push(group.name.clone());
            }
            current = group.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Group path, then structure chain: `grp/sub/struct.member`.
    pub fn full_name(&self, id: EntityId) -> String {
        let mut chain = vec![self.entities[id.0].name.clone()];
        let mut current = self.entities[id.0].parent_structure;
        while let Some(p) = current {
            chain.push(self.entities[p.0].name.clone());
            current = self.entities[p.0].parent_structure;
        }
        chain.reverse();
        let local = chain.join(".");

        let top = self.top_structure(id);
        let prefix = self.group_path(self.entities[top.0].group);
        if prefix.is_empty() {
            local
        } else {
            format!("{}/{}", prefix, local)
        }
    }

    fn top_structure(&self, id: EntityId) -> EntityId {
        let mut current = id;
        while let Some(p) = self.entities[current.0].parent_structure {
            current = p;
        }
        current
    }

    /// Entity by full name, e.g. `lat`, `grp/temp`, `station.id`.
    pub fn find_entity(&self, full_name: &str) -> Option<EntityId> {
        self.entities()
            .map(|(id, _)| id)
            .find(|id| self.full_name(*id) == full_name)
    }

    /// Structure ancestors of an entity, outermost first, excluding itself.
    pub fn ancestors(&self, id: EntityId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut current = self.entities[id.0].parent_structure;
        while let Some(p) = current {
            chain.push(p);
            current = self.entities[p.0].parent_structure;
        }
        chain.reverse();
        chain
    }

    pub fn shape(&self, id: EntityId) -> Vec<usize> {
        self.entities[id.0]
            .dims
            .iter()
            .map(|d| self.dims[d.0].length)
            .collect()
    }

    /// Element count; zero if any dimension is variable length.
    pub fn size(&self, id: EntityId) -> usize {
        self.shape(id).iter().product()
    }

    /// Look up or create a dimension in `group`.
    ///
    /// A named dimension reuses the group's shared dimension of the same
    /// name and length; the same name with another length yields a new
    /// non-shared named dimension. Unnamed dimensions are always anonymous.
    pub fn resolve_dim(&mut self, group: GroupId, name: Option<&str>, length: usize) -> DimId {
        let name = match name {
            Some(n) if !n.is_empty() => n,
            _ => return self.push_dim(None, length, false),
        };

        let same_name = self.groups[group.0]
            .dims
            .iter()
            .copied()
            .find(|d| self.dims[d.0].shared && self.dims[d.0].name.as_deref() == Some(name));
        match same_name {
            Some(d) if self.dims[d.0].length == length => d,
            Some(_) => self.push_dim(Some(name), length, false),
            None => {
                let d = self.push_dim(Some(name), length, true);
                self.groups[group.0].dims.push(d);
                d
            }
        }
    }

    /// Shared dimension `(name, length)` in `group` for a coordinate variable.
    ///
    /// A shared dimension of that name with another length is replaced on the
    /// group; entities already using it keep it.
    pub fn coordinate_dim(&mut self, group: GroupId, name: &str, length: usize) -> DimId {
        let existing = self.groups[group.0]
            .dims
            .iter()
            .copied()
            .find(|d| self.dims[d.0].shared && self.dims[d.0].name.as_deref() == Some(name));
        if let Some(d) = existing {
            if self.dims[d.0].length == length {
                return d;
            }
            warn!(
                dimension = %name,
                old = self.dims[d.0].length,
                new = length,
                "Replacing shared dimension with conflicting length"
            );
            self.groups[group.0].dims.retain(|x| *x != d);
        }
        let d = self.push_dim(Some(name), length, true);
        self.groups[group.0].dims.push(d);
        d
    }

    /// Synthetic variable-length dimension of a sequence.
    pub fn variable_length_dim(&mut self) -> DimId {
        let d = self.push_dim(None, 0, false);
        self.dims[d.0].variable_length = true;
        d
    }

    /// Register a dimension on a group as-is (extra dimensions).
    pub fn add_group_dim(&mut self, group: GroupId, dimension: Dimension) -> DimId {
        let id = DimId(self.dims.len());
        self.dims.push(dimension);
        self.groups[group.0].dims.push(id);
        id
    }

    fn push_dim(&mut self, name: Option<&str>, length: usize, shared: bool) -> DimId {
        let id = DimId(self.dims.len());
        self.dims.push(Dimension {
            name: name.map(str::to_string),
            length,
            shared,
            unlimited: false,
            variable_length: false,
        });
        id
    }

    /// Move a top-level entity to another group.
    pub fn move_entity(&mut self, id: EntityId, to: GroupId) {
        let from = self.entities[id.0].group;
        if from == to {
            return;
        }
        self.groups[from.0].entities.retain(|e| *e != id);
        self.groups[to.0].entities.push(id);
        self.entities[id.0].group = to;
    }

    /// A rank-1 entity whose only dimension is shared and named after it.
    pub fn is_coordinate_variable(&self, id: EntityId) -> bool {
        let entity = &self.entities[id.0];
        let rank_ok = match entity.data_kind {
            DataKind::Char => entity.dims.len() == 2,
            DataKind::Structure => false,
            _ => entity.dims.len() == 1,
        };
        if !rank_ok {
            return false;
        }
        let dim = &self.dims[entity.dims[0].0];
        dim.shared && dim.name.as_deref() == Some(entity.name.as_str())
    }
}
