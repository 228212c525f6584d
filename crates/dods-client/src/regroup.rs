//! Relocates slash- and dot-qualified names into a nested group tree.
//!
//! Servers flatten hierarchical datasets by encoding the group path in
//! variable names (`grp/sub/temp`) and the owning variable in attribute
//! names (`temp.units`). This pass undoes that encoding on a built model.

use tracing::debug;

use crate::descriptor::DescriptorTree;
use crate::model::{merge_attribute, Attribute, EntityId, EntityKind, GroupId, Model};

/// A name split as `prefix/var.name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamePieces {
    pub prefix: Option<String>,
    pub var: Option<String>,
    pub name: String,
}

/// Split a name at its last slash and, after that, its last dot.
pub fn parse_name(full: &str) -> NamePieces {
    let slash = full.rfind('/');
    let dot = full.rfind('.');
    let mut pieces = match (slash, dot) {
        (None, None) => NamePieces {
            name: full.to_string(),
            ..Default::default()
        },
        (Some(s), None) => NamePieces {
            prefix: Some(full[..s].to_string()),
            var: None,
            name: full[s + 1..].to_string(),
        },
        (None, Some(d)) => NamePieces {
            prefix: None,
            var: Some(full[..d].to_string()),
            name: full[d + 1..].to_string(),
        },
        (Some(s), Some(d)) if s > d => NamePieces {
            prefix: Some(full[..s].to_string()),
            var: None,
            name: full[s + 1..].to_string(),
        },
        (Some(s), Some(d)) => NamePieces {
            prefix: Some(full[..s].to_string()),
            var: Some(full[s + 1..d].to_string()),
            name: full[d + 1..].to_string(),
        },
    };
    if pieces.prefix.as_deref() == Some("") {
        pieces.prefix = None;
    }
    if pieces.var.as_deref() == Some("") {
        pieces.var = None;
    }
    pieces
}

fn split_prefix(name: &str) -> (Option<&str>, &str) {
    match name.rfind('/') {
        Some(i) if i > 0 => (Some(&name[..i]), &name[i + 1..]),
        Some(i) => (None, &name[i + 1..]),
        None => (None, name),
    }
}

fn variable_path(pieces: &NamePieces) -> Option<String> {
    let var = pieces.var.as_deref()?;
    Some(match pieces.prefix.as_deref() {
        Some(prefix) => format!("{}/{}", prefix.trim_start_matches('/'), var),
        None => var.to_string(),
    })
}

/// Run group assignment over a freshly built model.
pub fn regroup(model: &mut Model, tree: &DescriptorTree) {
    let moved_entities = relocate_entities(model, tree);
    let moved_globals = relocate_global_attributes(model);
    let moved_variable_attrs = relocate_variable_attributes(model);
    debug!(
        entities = moved_entities,
        global_attributes = moved_globals,
        variable_attributes = moved_variable_attrs,
        "Assigned groups"
    );
}

/// Move top-level entities into the group named by their slash prefix.
///
/// For a grid, a prefix on the grid name wins over one on its array.
fn relocate_entities(model: &mut Model, tree: &DescriptorTree) -> usize {
    let mut moved = 0;
    for id in model.top_level() {
        let entity = model.entity(id);
        let (own_prefix, local) = split_prefix(&entity.name);
        let prefix = match (&entity.kind, own_prefix) {
            (_, Some(p)) => Some(p.to_string()),
            (EntityKind::Grid { .. }, None) => tree
                .node(entity.descriptor)
                .children
                .first()
                .and_then(|array| split_prefix(&tree.node(*array).clear_name).0)
                .map(str::to_string),
            _ => None,
        };
        let prefix = match prefix {
            Some(p) => p,
            None => continue,
        };
        let local = local.to_string();
        let from = entity.group;

        let target = model.make_relative_group(from, &prefix, false);
        model.entity_mut(id).name = local;
        model.move_entity(id, target);
        moved += 1;
    }
    moved
}

fn relocate_global_attributes(model: &mut Model) -> usize {
    let root = model.root();
    let attributes = std::mem::take(&mut model.group_mut(root).attributes);
    let mut kept = Vec::new();
    let mut moved = 0;

    for mut attribute in attributes {
        let pieces = parse_name(&attribute.dods_name);
        if let Some(path) = variable_path(&pieces) {
            if let Some(target) = model.find_entity(&path) {
                attribute.name = pieces.name;
                merge_attribute(&mut model.entity_mut(target).attributes, attribute);
                moved += 1;
                continue;
            }
        } else if pieces.prefix.is_some() {
            let group: GroupId = model.make_relative_group(root, &attribute.dods_name, true);
            attribute.name = pieces.name;
            merge_attribute(&mut model.group_mut(group).attributes, attribute);
            moved += 1;
            continue;
        }
        kept.push(attribute);
    }

    model.group_mut(root).attributes = kept;
    moved
}

fn relocate_variable_attributes(model: &mut Model) -> usize {
    let mut moved = 0;
    let ids: Vec<EntityId> = model.entities().map(|(id, _)| id).collect();
    for id in ids {
        let attributes = std::mem::take(&mut model.entity_mut(id).attributes);
        let mut kept: Vec<Attribute> = Vec::new();
        for mut attribute in attributes {
            let pieces = parse_name(&attribute.dods_name);
            let target = variable_path(&pieces)
                .and_then(|path| model.find_entity(&path))
                .filter(|t| *t != id);
            match target {
                Some(target) => {
                    attribute.name = pieces.name;
                    merge_attribute(&mut model.entity_mut(target).attributes, attribute);
                    moved += 1;
                }
                None => kept.push(attribute),
            }
        }
        model.entity_mut(id).attributes = kept;
    }
    moved
}
