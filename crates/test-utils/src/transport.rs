//! An in-memory [`Transport`] that records every request.

use dap_wire::{
    ArrayDim, ArrayValues, DeclKind, Declaration, Das, Dds, PrimitiveVector, Transport, TransportError,
    TransportResult,
};

/// Serves one canned dataset.
///
/// Data responses contain the top-level declarations named by the first
/// segment of each projection, once each, in request order. Bracket
/// ranges on top-level arrays and grids are applied; nested projections
/// get the whole top-level declaration.
#[derive(Debug, Clone)]
pub struct MockTransport {
    dds: Dds,
    data: Dds,
    das: Das,
    omitted: Vec<String>,
    fail_das: bool,
    fail_next_data: Option<TransportError>,
    /// Every constraint expression received, in order.
    pub data_requests: Vec<String>,
    pub dds_calls: usize,
    pub das_calls: usize,
}

impl MockTransport {
    /// Serve `data` (a DDS with values) and `das`.
    pub fn new(data: Dds, das: Das) -> Self {
        Self {
            dds: strip_values(&data),
            data,
            das,
            omitted: Vec::new(),
            fail_das: false,
            fail_next_data: None,
            data_requests: Vec::new(),
            dds_calls: 0,
            das_calls: 0,
        }
    }

    /// Leave a top-level declaration out of every data response.
    pub fn omitting(mut self, name: &str) -> Self {
        self.omitted.push(name.to_string());
        self
    }

    /// Fail every DAS request.
    pub fn without_das(mut self) -> Self {
        self.fail_das = true;
        self
    }

    /// Fail the next data request with `error`.
    pub fn fail_next_data(&mut self, error: TransportError) {
        self.fail_next_data = Some(error);
    }

    /// Number of data requests so far.
    pub fn data_calls(&self) -> usize {
        self.data_requests.len()
    }

    fn respond(&self, ce: &str) -> TransportResult<Dds> {
        let mut served: Vec<String> = Vec::new();
        let mut declarations = Vec::new();
        for projection in split_projections(ce.trim_start_matches('?')) {
            let (name, ranges, nested) = split_projection(projection)?;
            if served.contains(&name) || self.omitted.contains(&name) {
                continue;
            }
            let decl = match self.data.find(&name) {
                Some(decl) => decl,
                None => return Err(TransportError::NotFound(format!("no variable '{}'", name))),
            };
            let decl = if nested || ranges.is_empty() {
                decl.clone()
            } else {
                slice_declaration(decl, &ranges)?
            };
            served.push(name);
            declarations.push(decl);
        }
        Ok(Dds::new(self.data.name.clone(), declarations))
    }
}

impl Transport for MockTransport {
    fn fetch_dds(&mut self, _url: &str) -> TransportResult<Dds> {
        self.dds_calls += 1;
        Ok(self.dds.clone())
    }

    fn fetch_das(&mut self, url: &str) -> TransportResult<Das> {
        self.das_calls += 1;
        if self.fail_das {
            return Err(TransportError::NotFound(format!("{}.das", url)));
        }
        Ok(self.das.clone())
    }

    fn fetch_data(&mut self, _url: &str, ce: &str) -> TransportResult<Dds> {
        self.data_requests.push(ce.to_string());
        if let Some(error) = self.fail_next_data.take() {
            return Err(error);
        }
        self.respond(ce)
    }
}

/// The DDS a server would send for `data`: same declarations, no values.
pub fn strip_values(data: &Dds) -> Dds {
    Dds::new(data.name.clone(), data.declarations.iter().map(strip_declaration).collect())
}

fn strip_declaration(decl: &Declaration) -> Declaration {
    let kind = match &decl.kind {
        DeclKind::Primitive { kind, .. } => DeclKind::Primitive {
            kind: *kind,
            value: None,
        },
        DeclKind::Array { dims, template, .. } => DeclKind::Array {
            dims: dims.clone(),
            template: Box::new(strip_declaration(template)),
            values: None,
        },
        DeclKind::Structure { members } => DeclKind::Structure {
            members: members.iter().map(strip_declaration).collect(),
        },
        DeclKind::Sequence { members, .. } => DeclKind::Sequence {
            members: members.iter().map(strip_declaration).collect(),
            rows: Vec::new(),
        },
        DeclKind::Grid { array, maps } => DeclKind::Grid {
            array: Box::new(strip_declaration(array)),
            maps: maps.iter().map(strip_declaration).collect(),
        },
        DeclKind::List { template } => DeclKind::List {
            template: Box::new(strip_declaration(template)),
        },
    };
    Declaration {
        name: decl.name.clone(),
        kind,
    }
}

fn split_projections(ce: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in ce.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&ce[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&ce[start..]);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Top-level name, its ranges as (start, stride, end), and whether the
/// projection goes below the top level.
fn split_projection(projection: &str) -> TransportResult<(String, Vec<(usize, usize, usize)>, bool)> {
    let end = projection.find(|c: char| c == '.' || c == '[').unwrap_or(projection.len());
    let name = projection[..end].to_string();
    let rest = &projection[end..];
    let first_segment = match rest.find('.') {
        Some(dot) => &rest[..dot],
        None => rest,
    };
    let nested = rest.contains('.');

    let mut ranges = Vec::new();
    for clause in first_segment.split('[').filter(|c| !c.is_empty()) {
        let inner = clause.trim_end_matches(']');
        let numbers: Vec<usize> = inner
            .split(':')
            .map(|n| n.parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| TransportError::malformed(format!("bad range [{}]", inner)))?;
        let range = match numbers.as_slice() {
            [i] => (*i, 1, *i),
            [a, b] => (*a, 1, *b),
            [a, s, b] => (*a, *s, *b),
            _ => return Err(TransportError::malformed(format!("bad range [{}]", inner))),
        };
        ranges.push(range);
    }
    Ok((name, ranges, nested))
}

fn slice_declaration(decl: &Declaration, ranges: &[(usize, usize, usize)]) -> TransportResult<Declaration> {
    match &decl.kind {
        DeclKind::Array { .. } => slice_array(decl, ranges),
        DeclKind::Grid { array, maps } => {
            let array = slice_array(array, ranges)?;
            let maps = maps
                .iter()
                .zip(ranges)
                .map(|(map, range)| slice_array(map, std::slice::from_ref(range)))
                .collect::<TransportResult<Vec<_>>>()?;
            Ok(Declaration {
                name: decl.name.clone(),
                kind: DeclKind::Grid {
                    array: Box::new(array),
                    maps,
                },
            })
        }
        _ => Ok(decl.clone()),
    }
}

fn slice_array(decl: &Declaration, ranges: &[(usize, usize, usize)]) -> TransportResult<Declaration> {
    let (dims, template, values) = match &decl.kind {
        DeclKind::Array {
            dims,
            template,
            values: Some(ArrayValues::Primitive(values)),
        } => (dims, template, values),
        _ => return Ok(decl.clone()),
    };
    if ranges.len() != dims.len() {
        return Err(TransportError::malformed(format!(
            "'{}' has {} dimensions, got {} ranges",
            decl.name,
            dims.len(),
            ranges.len()
        )));
    }

    let mut indices = vec![0usize];
    let mut new_dims = Vec::with_capacity(dims.len());
    for (dim, &(start, stride, end)) in dims.iter().zip(ranges) {
        if end >= dim.size || stride == 0 || start > end {
            return Err(TransportError::malformed(format!(
                "range [{}:{}:{}] outside '{}'",
                start, stride, end, decl.name
            )));
        }
        let picked: Vec<usize> = (start..=end).step_by(stride).collect();
        indices = indices
            .iter()
            .flat_map(|base| picked.iter().map(move |p| base * dim.size + p))
            .collect();
        new_dims.push(ArrayDim {
            name: dim.name.clone(),
            size: picked.len(),
        });
    }

    Ok(Declaration {
        name: decl.name.clone(),
        kind: DeclKind::Array {
            dims: new_dims,
            template: template.clone(),
            values: Some(ArrayValues::Primitive(select(values, &indices))),
        },
    })
}

fn select(values: &PrimitiveVector, indices: &[usize]) -> PrimitiveVector {
    fn pick<T: Clone>(v: &[T], indices: &[usize]) -> Vec<T> {
        indices.iter().map(|&i| v[i].clone()).collect()
    }
    match values {
        PrimitiveVector::Byte(v) => PrimitiveVector::Byte(pick(v, indices)),
        PrimitiveVector::Int16(v) => PrimitiveVector::Int16(pick(v, indices)),
        PrimitiveVector::UInt16(v) => PrimitiveVector::UInt16(pick(v, indices)),
        PrimitiveVector::Int32(v) => PrimitiveVector::Int32(pick(v, indices)),
        PrimitiveVector::UInt32(v) => PrimitiveVector::UInt32(pick(v, indices)),
        PrimitiveVector::Float32(v) => PrimitiveVector::Float32(pick(v, indices)),
        PrimitiveVector::Float64(v) => PrimitiveVector::Float64(pick(v, indices)),
        PrimitiveVector::String(v) => PrimitiveVector::String(pick(v, indices)),
    }
}
