//! Which entities are fetched and cached at open time.

use crate::config::DodsConfig;
use crate::model::{DataKind, EntityId, Model};

/// Approximate byte size of an entity's data.
pub fn byte_size(model: &Model, id: EntityId) -> usize {
    model.size(id) * model.entity(id).data_kind.element_size()
}

/// Top-level entities worth fetching eagerly: coordinate variables under the
/// byte threshold, strings, and anything already flagged for caching.
pub fn preload_candidates(model: &Model, config: &DodsConfig) -> Vec<EntityId> {
    model
        .top_level()
        .into_iter()
        .filter(|id| {
            let entity = model.entity(*id);
            if entity.cached.is_some() {
                return false;
            }
            entity.caching
                || entity.data_kind == DataKind::String
                || (model.is_coordinate_variable(*id) && byte_size(model, *id) < config.coord_preload_size)
        })
        .collect()
}

/// Flag entities as cache-worthy so the next read stores their data.
pub fn mark_caching(model: &mut Model, ids: &[EntityId]) {
    for id in ids {
        model.entity_mut(*id).caching = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::merge_das;
    use crate::builder::ModelBuilder;
    use crate::descriptor::DescriptorTree;
    use dap_wire::{ArrayDim, Das, Declaration, Dds, PrimitiveKind};

    fn build(dds: &Dds) -> Model {
        let mut tree = DescriptorTree::from_dds(dds).unwrap();
        let reserved = merge_das(&mut tree, &Das::default());
        let config = DodsConfig::default();
        ModelBuilder::new(&tree, &config).build(&reserved).unwrap().0
    }

    fn names(model: &Model, ids: &[EntityId]) -> Vec<String> {
        ids.iter().map(|id| model.full_name(*id)).collect()
    }

    #[test]
    fn test_small_coordinates_and_strings_selected() {
        let dds = Dds::new(
            "d",
            vec![
                Declaration::array("time", PrimitiveKind::Float64, vec![ArrayDim::named("time", 10)]),
                Declaration::array("temp", PrimitiveKind::Float32, vec![ArrayDim::named("time", 10)]),
                Declaration::primitive("station", PrimitiveKind::String),
            ],
        );
        let model = build(&dds);
        let picked = preload_candidates(&model, &DodsConfig::default());
        assert_eq!(names(&model, &picked), vec!["time", "station"]);
    }

    #[test]
    fn test_threshold_excludes_large_coordinates() {
        let dds = Dds::new(
            "d",
            vec![Declaration::array("lon", PrimitiveKind::Float64, vec![ArrayDim::named("lon", 10_000)])],
        );
        let model = build(&dds);
        let lon = model.find_entity("lon").unwrap();
        assert_eq!(byte_size(&model, lon), 80_000);
        assert!(preload_candidates(&model, &DodsConfig::default()).is_empty());

        let generous = DodsConfig {
            coord_preload_size: 100_000,
            ..Default::default()
        };
        assert_eq!(preload_candidates(&model, &generous), vec![lon]);
    }

    #[test]
    fn test_caching_flag_selects_and_cached_data_skips() {
        let dds = Dds::new(
            "d",
            vec![Declaration::array("big", PrimitiveKind::Int32, vec![ArrayDim::named("n", 100_000)])],
        );
        let mut model = build(&dds);
        let big = model.find_entity("big").unwrap();
        assert!(preload_candidates(&model, &DodsConfig::default()).is_empty());

        mark_caching(&mut model, &[big]);
        assert_eq!(preload_candidates(&model, &DodsConfig::default()), vec![big]);

        model.entity_mut(big).cached = Some(crate::array::ArrayData::Int(ndarray::ArrayD::zeros(ndarray::IxDyn(&[0]))));
        assert!(preload_candidates(&model, &DodsConfig::default()).is_empty());
    }
}
