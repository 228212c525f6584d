//! Structural declarations (DDS) and their data-bearing form (DataDDS).
//!
//! A DDS and a DataDDS share one representation. Declarations parsed from a
//! `.dds` response carry no values; declarations parsed from a `.dods`
//! response carry them in [`DeclKind::Primitive::value`],
//! [`DeclKind::Array::values`] and [`DeclKind::Sequence::rows`].

/// A parsed dataset declaration: `Dataset { ... } name;`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dds {
    /// Dataset name from the trailing `} name;`.
    pub name: String,
    /// Top-level declarations in document order.
    pub declarations: Vec<Declaration>,
}

impl Dds {
    /// Create a DDS from its top-level declarations.
    pub fn new(name: impl Into<String>, declarations: Vec<Declaration>) -> Self {
        Self {
            name: name.into(),
            declarations,
        }
    }

    /// Find a top-level declaration by its encoded name.
    pub fn find(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }
}

/// Primitive DAP2 base types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
    String,
    Url,
}

impl PrimitiveKind {
    /// The keyword used for this type in a DDS.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::String => "String",
            Self::Url => "Url",
        }
    }
}

/// One `[name = size]` clause of an array declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDim {
    /// Encoded dimension name, if the declaration named it.
    pub name: Option<String>,
    pub size: usize,
}

impl ArrayDim {
    pub fn named(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: Some(name.into()),
            size,
        }
    }

    pub fn anonymous(size: usize) -> Self {
        Self { name: None, size }
    }
}

/// A single declared entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Encoded (DAP-escaped) name.
    pub name: String,
    pub kind: DeclKind,
}

/// The shape of a declaration and, for DataDDS, its values.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// A scalar primitive; `value` holds exactly one element when present.
    Primitive {
        kind: PrimitiveKind,
        value: Option<PrimitiveVector>,
    },
    /// An array whose element is described by `template`.
    Array {
        dims: Vec<ArrayDim>,
        template: Box<Declaration>,
        values: Option<ArrayValues>,
    },
    Structure {
        members: Vec<Declaration>,
    },
    /// A sequence; `rows` holds one member list per returned instance.
    Sequence {
        members: Vec<Declaration>,
        rows: Vec<Vec<Declaration>>,
    },
    Grid {
        array: Box<Declaration>,
        maps: Vec<Declaration>,
    },
    /// The DAP2 `List` constructor.
    List {
        template: Box<Declaration>,
    },
}

/// Values of an array in a DataDDS.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    /// Row-major primitive values.
    Primitive(PrimitiveVector),
    /// One member list per element of an array of structures.
    Structures(Vec<Vec<Declaration>>),
}

/// A flat vector of primitive values as decoded from XDR.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveVector {
    Byte(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

impl PrimitiveVector {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The base type the values were decoded as.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Byte(_) => PrimitiveKind::Byte,
            Self::Int16(_) => PrimitiveKind::Int16,
            Self::UInt16(_) => PrimitiveKind::UInt16,
            Self::Int32(_) => PrimitiveKind::Int32,
            Self::UInt32(_) => PrimitiveKind::UInt32,
            Self::Float32(_) => PrimitiveKind::Float32,
            Self::Float64(_) => PrimitiveKind::Float64,
            Self::String(_) => PrimitiveKind::String,
        }
    }
}

impl Declaration {
    /// A scalar primitive without a value.
    pub fn primitive(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self {
            name: name.into(),
            kind: DeclKind::Primitive { kind, value: None },
        }
    }

    /// An array of primitives without values.
    pub fn array(name: impl Into<String>, kind: PrimitiveKind, dims: Vec<ArrayDim>) -> Self {
        let name = name.into();
        Self {
            kind: DeclKind::Array {
                dims,
                template: Box::new(Self::primitive(name.clone(), kind)),
                values: None,
            },
            name,
        }
    }

    pub fn structure(name: impl Into<String>, members: Vec<Declaration>) -> Self {
        Self {
            name: name.into(),
            kind: DeclKind::Structure { members },
        }
    }

    /// An array whose elements are structures with the given members.
    pub fn structure_array(
        name: impl Into<String>,
        dims: Vec<ArrayDim>,
        members: Vec<Declaration>,
    ) -> Self {
        let name = name.into();
        Self {
            kind: DeclKind::Array {
                dims,
                template: Box::new(Self::structure(name.clone(), members)),
                values: None,
            },
            name,
        }
    }

    pub fn sequence(name: impl Into<String>, members: Vec<Declaration>) -> Self {
        Self {
            name: name.into(),
            kind: DeclKind::Sequence {
                members,
                rows: Vec::new(),
            },
        }
    }

    pub fn grid(name: impl Into<String>, array: Declaration, maps: Vec<Declaration>) -> Self {
        Self {
            name: name.into(),
            kind: DeclKind::Grid {
                array: Box::new(array),
                maps,
            },
        }
    }

    /// Attach values to a primitive scalar or primitive array.
    pub fn with_values(mut self, data: PrimitiveVector) -> Self {
        match &mut self.kind {
            DeclKind::Primitive { value, .. } => *value = Some(data),
            DeclKind::Array { values, .. } => *values = Some(ArrayValues::Primitive(data)),
            _ => {}
        }
        self
    }

    /// Attach per-element member lists to an array of structures.
    pub fn with_instances(mut self, instances: Vec<Vec<Declaration>>) -> Self {
        if let DeclKind::Array { values, .. } = &mut self.kind {
            *values = Some(ArrayValues::Structures(instances));
        }
        self
    }

    /// Attach returned rows to a sequence.
    pub fn with_rows(mut self, data: Vec<Vec<Declaration>>) -> Self {
        if let DeclKind::Sequence { rows, .. } = &mut self.kind {
            *rows = data;
        }
        self
    }

    /// Type keyword as it would appear in a DDS.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            DeclKind::Primitive { kind, .. } => kind.type_name(),
            DeclKind::Array { template, .. } => template.type_name(),
            DeclKind::Structure { .. } => "Structure",
            DeclKind::Sequence { .. } => "Sequence",
            DeclKind::Grid { .. } => "Grid",
            DeclKind::List { .. } => "List",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_template_takes_array_name() {
        let decl = Declaration::array("sst", PrimitiveKind::Float32, vec![ArrayDim::named("lat", 3)]);
        match decl.kind {
            DeclKind::Array { template, .. } => assert_eq!(template.name, "sst"),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_with_values_on_structure_is_ignored() {
        let decl = Declaration::structure("s", vec![])
            .with_values(PrimitiveVector::Int32(vec![1]));
        assert_eq!(decl.kind, DeclKind::Structure { members: vec![] });
    }

    #[test]
    fn test_type_name_of_array_is_element_type() {
        let decl = Declaration::array("v", PrimitiveKind::UInt16, vec![ArrayDim::anonymous(2)]);
        assert_eq!(decl.type_name(), "UInt16");
    }
}
