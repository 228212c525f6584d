//! Shaped, typed values produced by a read.

use ndarray::{ArrayD, IxDyn};

use crate::error::{DodsError, Result};
use crate::model::DataKind;

/// Converted data of one entity.
///
/// Unsigned wire types arrive already widened: Byte as `u8`, UInt16 as
/// `Int`, UInt32 as `Long`.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Byte(ArrayD<u8>),
    Short(ArrayD<i16>),
    Int(ArrayD<i32>),
    Long(ArrayD<i64>),
    Float(ArrayD<f32>),
    Double(ArrayD<f64>),
    Char(ArrayD<char>),
    String(ArrayD<String>),
    Structure(StructureArray),
}

/// Row-oriented structured data: one row per instance, one value per member.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureArray {
    pub shape: Vec<usize>,
    pub member_names: Vec<String>,
    pub rows: Vec<Vec<ArrayData>>,
}

impl StructureArray {
    /// Index of a member by clear name.
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.member_names.iter().position(|n| n == name)
    }

    /// Values of one member across all rows.
    pub fn column(&self, name: &str) -> Option<Vec<&ArrayData>> {
        let idx = self.member_index(name)?;
        Some(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }
}

/// Shape a flat vector, reporting a mismatch as a conversion error.
pub(crate) fn shaped<T>(shape: &[usize], values: Vec<T>) -> Result<ArrayD<T>> {
    let count = values.len();
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| {
        DodsError::conversion(format!(
            "{} values do not fit shape {:?}: {}",
            count, shape, e
        ))
    })
}

fn stack_typed<T: Clone>(parts: Vec<ArrayD<T>>, outer: &[usize]) -> Result<ArrayD<T>> {
    let inner: Vec<usize> = parts.first().map(|p| p.shape().to_vec()).unwrap_or_default();
    let uniform = parts.iter().all(|p| p.shape() == inner.as_slice());
    let values: Vec<T> = parts.iter().flat_map(|p| p.iter().cloned()).collect();

    if uniform && outer.iter().product::<usize>() == parts.len() {
        let shape: Vec<usize> = outer.iter().chain(inner.iter()).copied().collect();
        shaped(&shape, values)
    } else {
        // Ragged parts, as produced by nested sequences.
        let len = values.len();
        shaped(&[len], values)
    }
}

macro_rules! stack_variant {
    ($variant:ident, $parts:expr, $outer:expr) => {{
        let mut typed = Vec::with_capacity($parts.len());
        for part in $parts {
            match part {
                ArrayData::$variant(a) => typed.push(a),
                other => {
                    return Err(DodsError::conversion(format!(
                        "cannot stack {} with {}",
                        stringify!($variant),
                        other.kind_name()
                    )))
                }
            }
        }
        ArrayData::$variant(stack_typed(typed, $outer)?)
    }};
}

impl ArrayData {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Byte(a) => a.shape(),
            Self::Short(a) => a.shape(),
            Self::Int(a) => a.shape(),
            Self::Long(a) => a.shape(),
            Self::Float(a) => a.shape(),
            Self::Double(a) => a.shape(),
            Self::Char(a) => a.shape(),
            Self::String(a) => a.shape(),
            Self::Structure(s) => &s.shape,
        }
    }

    /// Number of elements (rows for structured data).
    pub fn len(&self) -> usize {
        match self {
            Self::Structure(s) => s.rows.len(),
            other => other.shape().iter().product(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Char(_) => "char",
            Self::String(_) => "String",
            Self::Structure(_) => "Structure",
        }
    }

    /// Numeric values in row-major order, or `None` for text and structures.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        let values = match self {
            Self::Byte(a) => a.iter().map(|&v| v as f64).collect(),
            Self::Short(a) => a.iter().map(|&v| v as f64).collect(),
            Self::Int(a) => a.iter().map(|&v| v as f64).collect(),
            Self::Long(a) => a.iter().map(|&v| v as f64).collect(),
            Self::Float(a) => a.iter().map(|&v| v as f64).collect(),
            Self::Double(a) => a.iter().copied().collect(),
            _ => return None,
        };
        Some(values)
    }

    /// String values in row-major order; Char data is read along its last axis.
    pub fn to_strings(&self) -> Option<Vec<String>> {
        match self {
            Self::String(a) => Some(a.iter().cloned().collect()),
            Self::Char(a) => {
                let width = a.shape().last().copied().unwrap_or(1).max(1);
                let chars: Vec<char> = a.iter().copied().collect();
                Some(
                    chars
                        .chunks(width)
                        .map(|c| c.iter().collect::<String>().trim_end_matches('\0').to_string())
                        .collect(),
                )
            }
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&StructureArray> {
        match self {
            Self::Structure(s) => Some(s),
            _ => None,
        }
    }

    /// Join per-row parts into one array with `outer` as the leading axes.
    ///
    /// Parts of differing shapes are flattened into a single axis.
    pub fn stack(parts: Vec<ArrayData>, outer: &[usize]) -> Result<ArrayData> {
        let first = match parts.first() {
            Some(first) => first,
            None => return Err(DodsError::conversion("no values to stack")),
        };

        let stacked = match first {
            Self::Byte(_) => stack_variant!(Byte, parts, outer),
            Self::Short(_) => stack_variant!(Short, parts, outer),
            Self::Int(_) => stack_variant!(Int, parts, outer),
            Self::Long(_) => stack_variant!(Long, parts, outer),
            Self::Float(_) => stack_variant!(Float, parts, outer),
            Self::Double(_) => stack_variant!(Double, parts, outer),
            Self::Char(_) => stack_variant!(Char, parts, outer),
            Self::String(_) => stack_variant!(String, parts, outer),
            Self::Structure(s) => {
                let member_names = s.member_names.clone();
                let inner = s.shape.clone();
                let uniform = parts.iter().all(|p| p.shape() == inner.as_slice())
                    && outer.iter().product::<usize>() == parts.len();
                let mut rows = Vec::new();
                for part in parts {
                    match part {
                        Self::Structure(s) => rows.extend(s.rows),
                        other => {
                            return Err(DodsError::conversion(format!(
                                "cannot stack Structure with {}",
                                other.kind_name()
                            )))
                        }
                    }
                }
                let shape = if uniform {
                    outer.iter().chain(inner.iter()).copied().collect()
                } else {
                    vec![rows.len()]
                };
                Self::Structure(StructureArray {
                    shape,
                    member_names,
                    rows,
                })
            }
        };
        Ok(stacked)
    }

    /// An empty one-dimensional array of the variant a read of `kind` yields.
    pub fn empty(kind: DataKind, unsigned: bool) -> ArrayData {
        let empty = || IxDyn(&[0]);
        match (kind, unsigned) {
            (DataKind::Byte, _) => Self::Byte(ArrayD::from_elem(empty(), 0)),
            (DataKind::Short, false) => Self::Short(ArrayD::from_elem(empty(), 0)),
            (DataKind::Short, true) | (DataKind::Int, false) => Self::Int(ArrayD::from_elem(empty(), 0)),
            (DataKind::Int, true) => Self::Long(ArrayD::from_elem(empty(), 0)),
            (DataKind::Float, _) => Self::Float(ArrayD::from_elem(empty(), 0.0)),
            (DataKind::Double, _) => Self::Double(ArrayD::from_elem(empty(), 0.0)),
            (DataKind::Char, _) => Self::Char(ArrayD::from_elem(empty(), '\0')),
            (DataKind::String, _) => Self::String(ArrayD::from_elem(empty(), String::new())),
            (DataKind::Structure, _) => Self::Structure(StructureArray {
                shape: vec![0],
                member_names: Vec::new(),
                rows: Vec::new(),
            }),
        }
    }

    /// Pull a (possibly nested) member out of structured data.
    ///
    /// Rows are flattened into the leading axes of the result. A sequence
    /// with no rows yields [`ArrayData::empty`] for the member's `kind`.
    pub fn extract_member(self, path: &[String], kind: DataKind, unsigned: bool) -> Result<ArrayData> {
        let (name, rest) = match path.split_first() {
            Some(split) => split,
            None => return Ok(self),
        };

        let structure = match self {
            Self::Structure(s) => s,
            other => {
                return Err(DodsError::conversion(format!(
                    "cannot select member '{}' of {} data",
                    name,
                    other.kind_name()
                )))
            }
        };
        let idx = structure.member_index(name).ok_or_else(|| {
            DodsError::conversion(format!("structured data has no member '{}'", name))
        })?;

        let parts: Vec<ArrayData> = structure
            .rows
            .into_iter()
            .filter_map(|mut row| {
                if idx < row.len() {
                    Some(row.swap_remove(idx))
                } else {
                    None
                }
            })
            .collect();

        if parts.is_empty() {
            return Ok(Self::empty(kind, unsigned));
        }

        Self::stack(parts, &structure.shape)?.extract_member(rest, kind, unsigned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(shape: &[usize], values: Vec<i32>) -> ArrayData {
        ArrayData::Int(shaped(shape, values).unwrap())
    }

    #[test]
    fn test_shape_mismatch_is_conversion_error() {
        let err = shaped(&[2, 2], vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, DodsError::Conversion(_)));
    }

    #[test]
    fn test_stack_uniform_parts() {
        let parts = vec![ints(&[2], vec![1, 2]), ints(&[2], vec![3, 4]), ints(&[2], vec![5, 6])];
        let stacked = ArrayData::stack(parts, &[3]).unwrap();
        assert_eq!(stacked.shape(), &[3, 2]);
        assert_eq!(stacked.to_f64_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_stack_ragged_parts_flattens() {
        let parts = vec![ints(&[1], vec![1]), ints(&[3], vec![2, 3, 4])];
        let stacked = ArrayData::stack(parts, &[2]).unwrap();
        assert_eq!(stacked.shape(), &[4]);
    }

    #[test]
    fn test_stack_mixed_variants_fails() {
        let parts = vec![
            ints(&[], vec![1]),
            ArrayData::Float(shaped(&[], vec![1.0]).unwrap()),
        ];
        assert!(ArrayData::stack(parts, &[2]).is_err());
    }

    #[test]
    fn test_extract_member_from_rows() {
        let data = ArrayData::Structure(StructureArray {
            shape: vec![2],
            member_names: vec!["a".into(), "b".into()],
            rows: vec![
                vec![ints(&[], vec![1]), ints(&[], vec![10])],
                vec![ints(&[], vec![2]), ints(&[], vec![20])],
            ],
        });
        let b = data.extract_member(&["b".to_string()], DataKind::Int, false).unwrap();
        assert_eq!(b.shape(), &[2]);
        assert_eq!(b.to_f64_vec().unwrap(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_extract_member_without_rows_keeps_kind() {
        let empty_rows = || {
            ArrayData::Structure(StructureArray {
                shape: vec![0],
                member_names: vec!["n".into()],
                rows: Vec::new(),
            })
        };
        let n = empty_rows().extract_member(&["n".to_string()], DataKind::Int, false).unwrap();
        assert!(matches!(n, ArrayData::Int(_)));
        assert_eq!(n.shape(), &[0]);

        let wide = empty_rows().extract_member(&["n".to_string()], DataKind::Int, true).unwrap();
        assert!(matches!(wide, ArrayData::Long(_)));

        let text = empty_rows().extract_member(&["n".to_string()], DataKind::String, false).unwrap();
        assert!(text.to_strings().unwrap().is_empty());
    }

    #[test]
    fn test_char_to_strings_trims_padding() {
        let chars = ArrayData::Char(shaped(&[2, 3], vec!['a', 'b', '\0', 'x', 'y', 'z']).unwrap());
        assert_eq!(chars.to_strings().unwrap(), vec!["ab".to_string(), "xyz".to_string()]);
    }
}
