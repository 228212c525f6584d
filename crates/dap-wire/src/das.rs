//! Attribute tables (DAS).

/// The attribute response of a dataset: a flat, ordered list of named tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Das {
    pub tables: Vec<AttributeTable>,
}

impl Das {
    pub fn new(tables: Vec<AttributeTable>) -> Self {
        Self { tables }
    }

    /// Find a top-level table by name.
    pub fn table(&self, name: &str) -> Option<&AttributeTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Attribute types as declared in a DAS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
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

impl AttrKind {
    /// Parse a DAS type keyword (case-insensitive).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "byte" => Some(Self::Byte),
            "int16" => Some(Self::Int16),
            "uint16" => Some(Self::UInt16),
            "int32" => Some(Self::Int32),
            "uint32" => Some(Self::UInt32),
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            "string" => Some(Self::String),
            "url" => Some(Self::Url),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::String | Self::Url)
    }
}

/// A named table of attributes; tables nest through container entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeTable {
    pub name: String,
    pub entries: Vec<AttributeEntry>,
}

impl AttributeTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Builder-style: add a typed attribute with raw text values.
    pub fn with(mut self, name: impl Into<String>, kind: AttrKind, values: &[&str]) -> Self {
        self.entries.push(AttributeEntry {
            name: name.into(),
            value: AttributeValue::Values {
                kind,
                values: values.iter().map(|s| s.to_string()).collect(),
            },
        });
        self
    }

    /// Builder-style: add a nested container.
    pub fn with_container(mut self, table: AttributeTable) -> Self {
        self.entries.push(AttributeEntry {
            name: table.name.clone(),
            value: AttributeValue::Container(table),
        });
        self
    }

    /// Find an entry by name.
    pub fn get(&self, name: &str) -> Option<&AttributeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// One entry of an attribute table.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEntry {
    pub name: String,
    pub value: AttributeValue,
}

/// Either a list of values or a nested table.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Raw value text exactly as it appeared on the wire (strings still quoted).
    Values { kind: AttrKind, values: Vec<String> },
    Container(AttributeTable),
}

impl AttributeEntry {
    /// First raw value of a non-container entry.
    pub fn first_value(&self) -> Option<&str> {
        match &self.value {
            AttributeValue::Values { values, .. } => values.first().map(String::as_str),
            AttributeValue::Container(_) => None,
        }
    }
}
