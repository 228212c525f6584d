//! Batched data reads: one constraint expression, one round trip.
//!
//! Requests are paired with response nodes through an explicit
//! [`RequestId`] to [`ResponseSlot`] map built per batch. Pairing is by
//! encoded name path; descriptor sequence numbers only order the request.

use std::collections::HashMap;

use dap_wire::{Dds, Transport};
use tracing::{debug, error};

use crate::array::ArrayData;
use crate::config::DodsConfig;
use crate::constraint::{batch_expression, full_projection};
use crate::convert::DataConverter;
use crate::descriptor::{DescriptorTree, NodeId};
use crate::error::{DodsError, Result};
use crate::model::{EntityId, Model};

/// Position of a request within one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(usize);

impl RequestId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a request's data sits in the response tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSlot {
    Found(NodeId),
    Missing,
}

/// Executes reads for one dataset.
pub struct BatchReader<'a, T: Transport> {
    transport: &'a mut T,
    url: &'a str,
    tree: &'a DescriptorTree,
    model: &'a mut Model,
    config: &'a DodsConfig,
    diagnostics: Vec<DodsError>,
}

impl<'a, T: Transport> BatchReader<'a, T> {
    pub fn new(
        transport: &'a mut T,
        url: &'a str,
        tree: &'a DescriptorTree,
        model: &'a mut Model,
        config: &'a DodsConfig,
    ) -> Self {
        Self {
            transport,
            url,
            tree,
            model,
            config,
            diagnostics: Vec::new(),
        }
    }

    /// Correlation misses recorded so far.
    pub fn into_diagnostics(self) -> Vec<DodsError> {
        self.diagnostics
    }

    /// Read entities, one result per requested id in request order.
    ///
    /// Cached data is answered locally. Everything else is fetched with a
    /// single transport call; a `None` slot means the response did not
    /// contain that entity. Entities flagged for caching keep their data
    /// once the whole batch has converted.
    pub fn read(&mut self, ids: &[EntityId]) -> Result<Vec<Option<ArrayData>>> {
        let mut results: Vec<Option<ArrayData>> = vec![None; ids.len()];
        let mut fetch: Vec<EntityId> = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            match &self.model.entity(*id).cached {
                Some(cached) => results[i] = Some(cached.clone()),
                None if !fetch.contains(id) => fetch.push(*id),
                None => {}
            }
        }
        if fetch.is_empty() {
            debug!(requested = ids.len(), "All requested entities cached");
            return Ok(results);
        }

        let tree = self.tree;
        fetch.sort_by_key(|id| tree.node(self.model.entity(*id).descriptor).seq);
        let projections = fetch
            .iter()
            .map(|id| match &self.model.entity(*id).ce {
                Some(ce) => Ok(ce.clone()),
                None => full_projection(tree, &*self.model, *id).map(|p| p.to_string()),
            })
            .collect::<Result<Vec<_>>>()?;
        let expression = batch_expression(&projections);

        let fetched = self.execute(&fetch, &expression)?;

        for id in &fetch {
            let entity = self.model.entity_mut(*id);
            if entity.caching {
                if let Some(Some(data)) = fetched.get(id) {
                    entity.cached = Some(data.clone());
                }
            }
        }
        for (i, id) in ids.iter().enumerate() {
            if results[i].is_none() {
                results[i] = fetched.get(id).cloned().flatten();
            }
        }
        Ok(results)
    }

    /// Fetch one entity with a caller-built expression; nothing is cached.
    pub fn read_expression(&mut self, id: EntityId, expression: &str) -> Result<Option<ArrayData>> {
        let mut fetched = self.execute(&[id], expression)?;
        Ok(fetched.remove(&id).flatten())
    }

    fn execute(&mut self, requests: &[EntityId], expression: &str) -> Result<HashMap<EntityId, Option<ArrayData>>> {
        debug!(url = %self.url, expression = %expression, requests = requests.len(), "Fetching data");
        let response = self.transport.fetch_data(self.url, expression)?;
        let mut response_tree = DescriptorTree::from_dds(&response)?;

        let mut slots: HashMap<RequestId, ResponseSlot> = HashMap::with_capacity(requests.len());
        for (i, id) in requests.iter().enumerate() {
            let path = self.tree.encoded_path(self.model.entity(*id).descriptor);
            let slot = match response_tree.find_counterpart(&path) {
                Some(node) => ResponseSlot::Found(node),
                None => ResponseSlot::Missing,
            };
            slots.insert(RequestId(i), slot);
        }

        let model: &Model = &*self.model;
        let converter = DataConverter::new(model, self.config);
        let mut converted = HashMap::with_capacity(requests.len());
        for (i, id) in requests.iter().enumerate() {
            let data = match slots.get(&RequestId(i)) {
                Some(ResponseSlot::Found(node)) => {
                    Some(convert_slot(&converter, model, &response, &response_tree, *node, *id)?)
                }
                _ => {
                    let name = model.full_name(*id);
                    error!(entity = %name, expression = %expression, "Response has no data for requested entity");
                    self.diagnostics.push(DodsError::CorrelationMiss(format!(
                        "response to '{}' has no data for '{}'",
                        expression, name
                    )));
                    None
                }
            };
            converted.insert(*id, data);
        }
        Ok(converted)
    }
}

/// Convert the response node answering entity `id`.
///
/// Members of sequences and structure arrays carry no values of their own;
/// the outermost row container is converted and the member pulled out of it.
fn convert_slot(
    converter: &DataConverter<'_>,
    model: &Model,
    response: &Dds,
    response_tree: &DescriptorTree,
    node: NodeId,
    id: EntityId,
) -> Result<ArrayData> {
    let lineage = response_tree.lineage(node);
    let ancestors = &lineage[..lineage.len().saturating_sub(1)];
    let container = ancestors
        .iter()
        .position(|n| response_tree.node(*n).is_row_container());

    let resolve = |n: NodeId| {
        response_tree.resolve_origin(response, n).ok_or_else(|| {
            DodsError::conversion(format!(
                "response node '{}' has no declaration",
                response_tree.node(n).encoded_name
            ))
        })
    };

    match container {
        None => converter.convert(resolve(node)?, Some(id)),
        Some(at) => {
            let mut chain = model.ancestors(id);
            chain.push(id);
            let owner = chain
                .len()
                .checked_sub(lineage.len() - at)
                .map(|i| chain[i]);
            let data = converter.convert(resolve(lineage[at])?, owner)?;
            let path: Vec<String> = lineage[at + 1..]
                .iter()
                .map(|n| response_tree.node(*n).clear_name.clone())
                .collect();
            let entity = model.entity(id);
            data.extract_member(&path, entity.data_kind, entity.unsigned)
        }
    }
}
