//! Attaches DAS attribute tables to descriptor nodes.
//!
//! Table names are matched against the descriptor tree in this order:
//! reserved global tables, an exact top-level name, a dotted path. Tables
//! that match nothing land on the root under their full dotted names so the
//! group-assignment pass can still relocate them.

use dap_wire::{escape::unescape_dap, unquote_attribute, AttrKind, AttributeTable, AttributeValue, Das};
use tracing::{debug, error, warn};

use crate::descriptor::{DescriptorTree, NodeId};
use crate::error::DodsError;

/// Tables whose entries are dataset-global attributes.
pub const GLOBAL_TABLES: [&str; 2] = ["NC_GLOBAL", "HDF_GLOBAL"];
/// Reserved table carrying `Unlimited_Dimension`.
pub const DODS_EXTRA: &str = "DODS_EXTRA";
/// Reserved table declaring extra dimensions as `name = length`.
pub const EXTRA_DIMENSION: &str = "EXTRA_DIMENSION";
pub const UNLIMITED_DIMENSION: &str = "Unlimited_Dimension";

/// A merged attribute; numeric values stay text until the model builder parses them.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    pub name: String,
    pub kind: AttrKind,
    pub values: Vec<String>,
}

/// Dimension declarations intercepted from reserved tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservedDims {
    pub unlimited: Option<String>,
    pub extra: Vec<(String, usize)>,
}

/// Merge every table of a DAS into the tree.
///
/// Malformed reserved declarations and unresolved tables are recorded on
/// `tree.diagnostics`; nothing here fails.
pub fn merge_das(tree: &mut DescriptorTree, das: &Das) -> ReservedDims {
    let mut reserved = ReservedDims::default();
    for table in &das.tables {
        merge_table(tree, table, &mut reserved);
    }
    debug!(tables = das.tables.len(), "Merged attribute tables");
    reserved
}

/// Merge one top-level table. Merging the same table again changes nothing.
pub fn merge_table(tree: &mut DescriptorTree, table: &AttributeTable, reserved: &mut ReservedDims) {
    let root = tree.root();
    match table.name.as_str() {
        DODS_EXTRA => read_dods_extra(tree, table, reserved),
        EXTRA_DIMENSION => read_extra_dimensions(tree, table, reserved),
        name if GLOBAL_TABLES.contains(&name) => attach_table(tree, root, table),
        name => {
            let clear = unescape_dap(name);
            if let Some(node) = tree.find_child(root, &clear) {
                attach_table(tree, node, table);
            } else if let Some((node, suffix)) = resolve_dotted(tree, &clear) {
                match suffix {
                    None => attach_table(tree, node, table),
                    Some(suffix) => attach_named(tree, node, &suffix, table),
                }
            } else {
                warn!(table = %clear, "Attribute table matches no variable, keeping it global");
                tree.diagnostics
                    .push(DodsError::AttributeResolutionMiss(clear.clone()));
                attach_flattened(tree, root, &clear, table);
            }
        }
    }
}

/// Walk dot-separated segments as child lookups.
///
/// Returns the deepest node reached and the unresolved remainder, if any.
/// The first segment must resolve.
fn resolve_dotted(tree: &DescriptorTree, name: &str) -> Option<(NodeId, Option<String>)> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() < 2 {
        return None;
    }
    let mut current = tree.root();
    for (i, segment) in segments.iter().enumerate() {
        match tree.find_child(current, segment) {
            Some(child) => current = child,
            None if i == 0 => return None,
            None => return Some((current, Some(segments[i..].join(".")))),
        }
    }
    Some((current, None))
}

/// Attach a table's entries to `node`; containers recurse into matching children.
fn attach_table(tree: &mut DescriptorTree, node: NodeId, table: &AttributeTable) {
    for entry in &table.entries {
        let name = unescape_dap(&entry.name);
        match &entry.value {
            AttributeValue::Values { kind, values } => {
                merge_record(tree, node, record(name, *kind, values));
            }
            AttributeValue::Container(inner) => match tree.find_child(node, &name) {
                Some(child) => attach_table(tree, child, inner),
                None => attach_flattened(tree, node, &name, inner),
            },
        }
    }
}

/// Attach entries of a table whose trailing segment(s) did not resolve.
///
/// The suffix names the attribute: an entry called exactly like the suffix
/// keeps that name, every other entry is prefixed with it.
fn attach_named(tree: &mut DescriptorTree, node: NodeId, suffix: &str, table: &AttributeTable) {
    for entry in &table.entries {
        let name = unescape_dap(&entry.name);
        let full = if name == suffix {
            name
        } else {
            format!("{}.{}", suffix, name)
        };
        match &entry.value {
            AttributeValue::Values { kind, values } => merge_record(tree, node, record(full, *kind, values)),
            AttributeValue::Container(inner) => attach_flattened(tree, node, &full, inner),
        }
    }
}

/// Attach entries as `prefix.entry`, flattening nested containers.
fn attach_flattened(tree: &mut DescriptorTree, node: NodeId, prefix: &str, table: &AttributeTable) {
    for entry in &table.entries {
        let full = format!("{}.{}", prefix, unescape_dap(&entry.name));
        match &entry.value {
            AttributeValue::Values { kind, values } => merge_record(tree, node, record(full, *kind, values)),
            AttributeValue::Container(inner) => attach_flattened(tree, node, &full, inner),
        }
    }
}

fn record(name: String, kind: AttrKind, values: &[String]) -> AttributeRecord {
    let values = values
        .iter()
        .map(|v| {
            if kind.is_numeric() {
                v.trim().to_string()
            } else {
                unquote_attribute(v)
            }
        })
        .collect();
    AttributeRecord { name, kind, values }
}

/// Union values into an existing record of the same name, or add it.
fn merge_record(tree: &mut DescriptorTree, node: NodeId, incoming: AttributeRecord) {
    let attributes = &mut tree.node_mut(node).attributes;
    match attributes.iter_mut().find(|a| a.name == incoming.name) {
        Some(existing) => {
            for value in incoming.values {
                if !existing.values.contains(&value) {
                    existing.values.push(value);
                }
            }
        }
        None => attributes.push(incoming),
    }
}

fn read_dods_extra(tree: &mut DescriptorTree, table: &AttributeTable, reserved: &mut ReservedDims) {
    for entry in &table.entries {
        if entry.name != UNLIMITED_DIMENSION {
            warn!(attribute = %entry.name, "Unknown DODS_EXTRA attribute");
            continue;
        }
        let value = entry
            .first_value()
            .map(unquote_attribute)
            .filter(|v| !v.is_empty());
        match value {
            Some(name) => reserved.unlimited = Some(name),
            None => {
                let msg = format!("{} has no dimension name", UNLIMITED_DIMENSION);
                error!(reason = %msg, "Ignoring unlimited dimension");
                tree.diagnostics.push(DodsError::malformed_reserved(msg));
            }
        }
    }
}

fn read_extra_dimensions(tree: &mut DescriptorTree, table: &AttributeTable, reserved: &mut ReservedDims) {
    for entry in &table.entries {
        let name = unescape_dap(&entry.name);
        let length = entry
            .first_value()
            .map(unquote_attribute)
            .and_then(|v| v.parse::<usize>().ok());
        match length {
            Some(length) => {
                if !reserved.extra.iter().any(|(n, _)| *n == name) {
                    reserved.extra.push((name, length));
                }
            }
            None => {
                let msg = format!(
                    "extra dimension '{}' has non-numeric length {:?}",
                    name,
                    entry.first_value()
                );
                error!(reason = %msg, "Skipping extra dimension");
                tree.diagnostics.push(DodsError::malformed_reserved(msg));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dap_wire::{ArrayDim, Declaration, Dds, PrimitiveKind};

    fn tree() -> DescriptorTree {
        DescriptorTree::from_dds(&Dds::new(
            "d",
            vec![
                Declaration::array("myvar", PrimitiveKind::Float32, vec![ArrayDim::named("x", 2)]),
                Declaration::structure(
                    "station",
                    vec![Declaration::primitive("id", PrimitiveKind::Int32)],
                ),
            ],
        ))
        .unwrap()
    }

    fn attr<'a>(tree: &'a DescriptorTree, node: NodeId, name: &str) -> Option<&'a AttributeRecord> {
        tree.node(node).attribute(name)
    }

    #[test]
    fn test_global_table_goes_to_root() {
        let mut t = tree();
        let das = Das::new(vec![AttributeTable::new("NC_GLOBAL").with("title", AttrKind::String, &["\"Test\""])]);
        merge_das(&mut t, &das);
        let title = attr(&t, t.root(), "title").unwrap();
        assert_eq!(title.values, vec!["Test"]);
    }

    #[test]
    fn test_dotted_table_names_attribute() {
        let mut t = tree();
        let das = Das::new(vec![AttributeTable::new("myvar.units").with("units", AttrKind::String, &["\"m\""])]);
        merge_das(&mut t, &das);
        let myvar = t.find_child(t.root(), "myvar").unwrap();
        assert_eq!(attr(&t, myvar, "units").unwrap().values, vec!["m"]);
        assert!(t.node(t.root()).attributes.is_empty());
        assert!(t.diagnostics.is_empty());
    }

    #[test]
    fn test_container_recurses_into_members() {
        let mut t = tree();
        let das = Das::new(vec![AttributeTable::new("station")
            .with("long_name", AttrKind::String, &["\"Station\""])
            .with_container(AttributeTable::new("id").with("missing", AttrKind::Int32, &["-1"]))]);
        merge_das(&mut t, &das);
        let station = t.find_child(t.root(), "station").unwrap();
        let id = t.find_child(station, "id").unwrap();
        assert_eq!(attr(&t, id, "missing").unwrap().values, vec!["-1"]);
        assert!(attr(&t, station, "long_name").is_some());
    }

    #[test]
    fn test_unmatched_container_is_flattened() {
        let mut t = tree();
        let das = Das::new(vec![AttributeTable::new("myvar")
            .with_container(AttributeTable::new("DODS").with("strlen", AttrKind::Int32, &["8"]))]);
        merge_das(&mut t, &das);
        let myvar = t.find_child(t.root(), "myvar").unwrap();
        assert_eq!(attr(&t, myvar, "DODS.strlen").unwrap().values, vec!["8"]);
    }

    #[test]
    fn test_unresolved_table_kept_global_with_full_names() {
        let mut t = tree();
        let das = Das::new(vec![AttributeTable::new("grp/other").with("units", AttrKind::String, &["\"K\""])]);
        merge_das(&mut t, &das);
        assert!(attr(&t, t.root(), "grp/other.units").is_some());
        assert!(matches!(t.diagnostics[0], DodsError::AttributeResolutionMiss(_)));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut once = tree();
        let mut twice = tree();
        let table = AttributeTable::new("myvar")
            .with("valid_range", AttrKind::Float32, &["0", "10"])
            .with("units", AttrKind::String, &["\"m\""]);
        let mut reserved = ReservedDims::default();
        merge_table(&mut once, &table, &mut reserved);
        merge_table(&mut twice, &table, &mut reserved);
        merge_table(&mut twice, &table, &mut reserved);

        let a = once.find_child(once.root(), "myvar").unwrap();
        let b = twice.find_child(twice.root(), "myvar").unwrap();
        assert_eq!(once.node(a).attributes, twice.node(b).attributes);
    }

    #[test]
    fn test_reserved_tables_intercepted() {
        let mut t = tree();
        let das = Das::new(vec![
            AttributeTable::new(DODS_EXTRA).with(UNLIMITED_DIMENSION, AttrKind::String, &["\"time\""]),
            AttributeTable::new(EXTRA_DIMENSION)
                .with("nv", AttrKind::Int32, &["2"])
                .with("bad", AttrKind::String, &["\"two\""]),
        ]);
        let reserved = merge_das(&mut t, &das);
        assert_eq!(reserved.unlimited.as_deref(), Some("time"));
        assert_eq!(reserved.extra, vec![("nv".to_string(), 2)]);
        assert_eq!(t.diagnostics.len(), 1);
        assert!(matches!(t.diagnostics[0], DodsError::MalformedReservedAttribute(_)));
        assert!(t.node(t.root()).attributes.is_empty());
    }
}
