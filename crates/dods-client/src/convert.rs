//! Converts response declarations into shaped [`ArrayData`].
//!
//! Unsigned wire types are widened so their values read back unsigned:
//! Byte as `u8`, UInt16 as `i32`, UInt32 as `i64`.

use dap_wire::{escape::unescape_dap, ArrayValues, DeclKind, Declaration, PrimitiveVector};
use ndarray::ArrayD;
use tracing::{debug, trace};

use crate::array::{shaped, ArrayData, StructureArray};
use crate::config::DodsConfig;
use crate::error::{DodsError, Result};
use crate::model::{DataKind, EntityId, EntityKind, Model};

/// Flat primitive values to a typed array of the given shape.
pub fn convert_vector(values: &PrimitiveVector, shape: &[usize]) -> Result<ArrayData> {
    let data = match values {
        PrimitiveVector::Byte(v) => ArrayData::Byte(shaped(shape, v.clone())?),
        PrimitiveVector::Int16(v) => ArrayData::Short(shaped(shape, v.clone())?),
        PrimitiveVector::UInt16(v) => {
            ArrayData::Int(shaped(shape, v.iter().map(|&x| i32::from(x)).collect())?)
        }
        PrimitiveVector::Int32(v) => ArrayData::Int(shaped(shape, v.clone())?),
        PrimitiveVector::UInt32(v) => {
            ArrayData::Long(shaped(shape, v.iter().map(|&x| i64::from(x)).collect())?)
        }
        PrimitiveVector::Float32(v) => ArrayData::Float(shaped(shape, v.clone())?),
        PrimitiveVector::Float64(v) => ArrayData::Double(shaped(shape, v.clone())?),
        PrimitiveVector::String(v) => ArrayData::String(shaped(shape, v.clone())?),
    };
    Ok(data)
}

/// Join runs of `width` single-character strings back into strings.
///
/// A run ends early at the first empty string.
fn merge_single_chars(strings: &[String], width: usize, name: &str) -> Result<Vec<String>> {
    if width == 0 || strings.len() % width != 0 {
        return Err(DodsError::conversion(format!(
            "'{}': {} single-character strings cannot be merged into strings of length {}",
            name,
            strings.len(),
            width
        )));
    }
    Ok(strings
        .chunks(width)
        .map(|run| run.iter().take_while(|s| !s.is_empty()).map(String::as_str).collect::<String>())
        .collect())
}

/// Shape of `shape` with its trailing axis divided by `width`, or flat when it does not divide.
fn merged_shape(shape: &[usize], width: usize, count: usize) -> Vec<usize> {
    match shape.split_last() {
        Some((last, outer)) if width > 0 && last % width == 0 => {
            outer.iter().copied().chain(std::iter::once(last / width)).collect()
        }
        _ => vec![count],
    }
}

/// Converts response declarations for the entities of one model.
pub struct DataConverter<'a> {
    model: &'a Model,
    config: &'a DodsConfig,
}

impl<'a> DataConverter<'a> {
    pub fn new(model: &'a Model, config: &'a DodsConfig) -> Self {
        Self { model, config }
    }

    /// Convert one declaration carrying data.
    ///
    /// `entity` is the model entity the declaration answers; it decides
    /// text handling and how structure members are matched.
    pub fn convert(&self, decl: &Declaration, entity: Option<EntityId>) -> Result<ArrayData> {
        match &decl.kind {
            DeclKind::Primitive { value, .. } => {
                let values = value.as_ref().ok_or_else(|| missing_data(decl))?;
                let data = convert_vector(values, &[])?;
                self.apply_text(data, entity, &decl.name)
            }

            DeclKind::Array { dims, template, values } => {
                let shape: Vec<usize> = dims.iter().map(|d| d.size).collect();
                match values.as_ref().ok_or_else(|| missing_data(decl))? {
                    ArrayValues::Primitive(values) => {
                        let data = convert_vector(values, &shape)?;
                        self.apply_text(data, entity, &decl.name)
                    }
                    ArrayValues::Structures(instances) => {
                        let members = match &template.kind {
                            DeclKind::Structure { members } => members,
                            _ => {
                                return Err(DodsError::conversion(format!(
                                    "'{}' carries structure instances but is not an array of structures",
                                    decl.name
                                )))
                            }
                        };
                        let rows = instances
                            .iter()
                            .map(|row| self.convert_row(row, entity))
                            .collect::<Result<Vec<_>>>()?;
                        if rows.len() != shape.iter().product::<usize>() {
                            return Err(DodsError::conversion(format!(
                                "'{}' has {} instances for shape {:?}",
                                decl.name,
                                rows.len(),
                                shape
                            )));
                        }
                        Ok(ArrayData::Structure(StructureArray {
                            shape,
                            member_names: member_names(members),
                            rows,
                        }))
                    }
                }
            }

            DeclKind::Structure { members } => {
                if let Some(array) = self.wrapped_grid_array(members, entity) {
                    debug!(structure = %decl.name, "Unwrapping grid array from structure");
                    return self.convert(array, entity);
                }
                let row = self.convert_row(members, entity)?;
                Ok(ArrayData::Structure(StructureArray {
                    shape: Vec::new(),
                    member_names: member_names(members),
                    rows: vec![row],
                }))
            }

            DeclKind::Sequence { members, rows } => {
                trace!(sequence = %decl.name, rows = rows.len(), "Converting sequence rows");
                let converted = rows
                    .iter()
                    .map(|row| self.convert_row(row, entity))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ArrayData::Structure(StructureArray {
                    shape: vec![converted.len()],
                    member_names: member_names(members),
                    rows: converted,
                }))
            }

            DeclKind::Grid { array, .. } => self.convert(array, entity),

            DeclKind::List { .. } => Err(DodsError::unsupported(format!(
                "list type '{}' cannot be converted",
                decl.name
            ))),
        }
    }

    /// A grid requested through its array may come back wrapped in a structure.
    fn wrapped_grid_array<'d>(
        &self,
        members: &'d [Declaration],
        entity: Option<EntityId>,
    ) -> Option<&'d Declaration> {
        let entity = self.model.entity(entity?);
        if !matches!(entity.kind, EntityKind::Grid { .. }) {
            return None;
        }
        members
            .iter()
            .find(|m| unescape_dap(&m.name) == entity.name && matches!(m.kind, DeclKind::Array { .. }))
            .or_else(|| members.first().filter(|m| matches!(m.kind, DeclKind::Array { .. })))
    }

    fn member_entity(&self, owner: Option<EntityId>, clear_name: &str) -> Option<EntityId> {
        let owner = self.model.entity(owner?);
        owner
            .members()
            .iter()
            .copied()
            .find(|m| self.model.entity(*m).name == clear_name)
    }

    fn convert_row(&self, members: &[Declaration], owner: Option<EntityId>) -> Result<Vec<ArrayData>> {
        members
            .iter()
            .map(|member| {
                let entity = self.member_entity(owner, &unescape_dap(&member.name));
                self.convert(member, entity)
            })
            .collect()
    }

    fn apply_text(&self, data: ArrayData, entity: Option<EntityId>, name: &str) -> Result<ArrayData> {
        let strings = match data {
            ArrayData::String(strings) => strings,
            other => return Ok(other),
        };
        let kind = entity.map(|id| self.model.entity(id).data_kind);

        match kind {
            Some(DataKind::Char) => {
                let width = entity
                    .and_then(|id| self.model.shape(id).last().copied())
                    .unwrap_or(1);
                self.strings_to_chars(strings, width, name)
            }
            Some(DataKind::String) if self.config.collapse_single_char_strings => {
                let width = strings.shape().last().copied().unwrap_or(0);
                if width > 0 && strings.iter().all(|s| s.chars().count() <= 1) {
                    let flat: Vec<String> = strings.iter().cloned().collect();
                    let merged = merge_single_chars(&flat, width, name)?;
                    let shape = merged_shape(strings.shape(), width, merged.len());
                    return Ok(ArrayData::String(shaped(&shape, merged)?));
                }
                Ok(ArrayData::String(strings))
            }
            _ => Ok(ArrayData::String(strings)),
        }
    }

    /// Pack strings into a character array with a trailing axis of `width`.
    ///
    /// Servers that split text into single characters get their text merged
    /// back along that axis instead. A scalar is always padded.
    fn strings_to_chars(&self, strings: ArrayD<String>, width: usize, name: &str) -> Result<ArrayData> {
        let single = strings.ndim() > 0 && !strings.is_empty() && strings.iter().all(|s| s.chars().count() <= 1);
        if single && width > 1 {
            let flat: Vec<String> = strings.iter().cloned().collect();
            let merged = merge_single_chars(&flat, width, name)?;
            debug!(variable = %name, strings = merged.len(), width, "Merged single-character strings");
            let shape = merged_shape(strings.shape(), width, merged.len());
            return Ok(ArrayData::String(shaped(&shape, merged)?));
        }

        let mut shape = strings.shape().to_vec();
        shape.push(width);
        let mut chars = Vec::with_capacity(strings.len() * width);
        for s in strings.iter() {
            let mut count = 0;
            for c in s.chars().take(width) {
                chars.push(c);
                count += 1;
            }
            chars.extend(std::iter::repeat('\0').take(width - count));
        }
        Ok(ArrayData::Char(shaped(&shape, chars)?))
    }
}

fn missing_data(decl: &Declaration) -> DodsError {
    DodsError::conversion(format!("response declaration '{}' carries no data", decl.name))
}

fn member_names(members: &[Declaration]) -> Vec<String> {
    members.iter().map(|m| unescape_dap(&m.name)).collect()
}
