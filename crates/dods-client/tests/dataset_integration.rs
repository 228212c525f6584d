//! End-to-end tests: open canned datasets through the recording mock
//! transport, inspect the model, read data.

use dap_wire::{
    ArrayDim, AttrKind, AttributeTable, Das, Declaration, Dds, PrimitiveKind, PrimitiveVector, TransportError,
};
use dods_client::{
    ArrayData, AttributeValues, CancelFlag, DataKind, DodsConfig, DodsDataset, DodsError, EntityKind,
    IndexRange,
};
use test_utils::{
    assert_approx_eq, assert_values_approx_eq, char_dataset, create_axis, grouped_dataset, hs_grid_dataset, init_test_logging, mixed_dataset,
    MockTransport, HS_LAT, HS_LON,
};

const URL: &str = "http://test.server/opendap/waves.nc";

fn open_hs(config: DodsConfig) -> DodsDataset<MockTransport> {
    init_test_logging();
    let (data, das) = hs_grid_dataset();
    DodsDataset::open(URL, MockTransport::new(data, das), config).expect("Failed to open dataset")
}

fn open_mixed() -> DodsDataset<MockTransport> {
    init_test_logging();
    let (data, das) = mixed_dataset();
    DodsDataset::open(URL, MockTransport::new(data, das), DodsConfig::default().with_preload(false))
        .expect("Failed to open dataset")
}

fn read_named<T: dap_wire::Transport>(dataset: &mut DodsDataset<T>, name: &str) -> ArrayData {
    let id = dataset.require_entity(name).expect("entity should exist");
    dataset
        .read(id)
        .expect("read should succeed")
        .expect("response should contain the entity")
}

// =============================================================================
// Model construction
// =============================================================================

#[test]
fn test_grid_shares_dimensions_with_coordinates() {
    let dataset = open_hs(DodsConfig::default());
    let model = dataset.model();

    let hs = dataset.require_entity("hs").unwrap();
    let lat = dataset.require_entity("lat").unwrap();
    let lon = dataset.require_entity("lon").unwrap();

    assert_eq!(model.shape(hs), vec![HS_LAT, HS_LON]);
    assert_eq!(model.entity(hs).data_kind, DataKind::Float);
    assert_eq!(model.entity(hs).dims[0], model.entity(lat).dims[0]);
    assert_eq!(model.entity(hs).dims[1], model.entity(lon).dims[0]);
    assert!(model.is_coordinate_variable(lat));

    match &model.entity(hs).kind {
        EntityKind::Grid { maps } => assert_eq!(maps, &vec![lat, lon]),
        other => panic!("expected grid, got {:?}", other),
    }

    // Grid maps reuse the top-level variables instead of duplicating them
    let lat_count = model.entities().filter(|(_, e)| e.name == "lat").count();
    assert_eq!(lat_count, 1);
}

#[test]
fn test_attributes_merged_onto_model() {
    let dataset = open_hs(DodsConfig::default());
    let model = dataset.model();

    let root = model.group(model.root());
    let title = root.attributes.iter().find(|a| a.name == "title").unwrap();
    assert_eq!(title.values, AttributeValues::Str(vec!["Significant wave height".to_string()]));
    let version = root.attributes.iter().find(|a| a.name == "version").unwrap();
    assert_approx_eq!(version.numeric_value(0).unwrap(), 1.5, 1e-6);

    let hs = dataset.entity(dataset.require_entity("hs").unwrap());
    assert_eq!(hs.attribute("units").unwrap().string_value(), "m");
    assert_eq!(hs.attribute("_FillValue").unwrap().numeric_value(0), Some(-999.0));
    assert_eq!(hs.attribute("_CoordinateAxes").unwrap().string_value(), "lat lon");

    let lat = dataset.entity(dataset.require_entity("lat").unwrap());
    assert_eq!(lat.attribute("units").unwrap().string_value(), "degrees_north");
}

#[test]
fn test_nested_attribute_containers() {
    let dataset = open_mixed();
    let station = dataset.entity(dataset.require_entity("station").unwrap());
    assert_eq!(station.attribute("long_name").unwrap().string_value(), "Buoy");

    let id = dataset.entity(dataset.require_entity("station.id").unwrap());
    assert_eq!(id.attribute("missing_value").unwrap().values, AttributeValues::Int(vec![-1]));

    let u16 = dataset.entity(dataset.require_entity("u16").unwrap());
    assert!(u16.unsigned);
    assert_eq!(u16.attribute("valid_max").unwrap().values, AttributeValues::Int(vec![65_535]));
}

#[test]
fn test_global_table_and_dotted_attribute_table() {
    init_test_logging();
    let data = Dds::new(
        "d",
        vec![
            Declaration::array("myvar", PrimitiveKind::Float32, vec![ArrayDim::named("x", 2)])
                .with_values(PrimitiveVector::Float32(vec![1.0, 2.0])),
            Declaration::primitive("other", PrimitiveKind::Int32).with_values(PrimitiveVector::Int32(vec![1])),
        ],
    );
    let das = Das::new(vec![
        AttributeTable::new("NC_GLOBAL")
            .with("title", AttrKind::String, &["\"demo\""])
            .with("history", AttrKind::String, &["\"created\""]),
        AttributeTable::new("myvar.units").with("units", AttrKind::String, &["\"K\""]),
    ]);
    let dataset = DodsDataset::open(URL, MockTransport::new(data, das), DodsConfig::default()).unwrap();
    let model = dataset.model();

    let globals: Vec<&str> = model
        .group(model.root())
        .attributes
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(globals, vec!["title", "history"]);

    let myvar = dataset.entity(dataset.require_entity("myvar").unwrap());
    assert_eq!(myvar.attributes.len(), 1);
    assert_eq!(myvar.attribute("units").unwrap().string_value(), "K");
    assert!(dataset.entity(dataset.require_entity("other").unwrap()).attributes.is_empty());
    assert!(dataset.diagnostics().is_empty());
}

#[test]
fn test_char_variables_get_string_length_dimension() {
    let (data, das) = char_dataset();
    let dataset = DodsDataset::open(URL, MockTransport::new(data, das), DodsConfig::default()).unwrap();
    let model = dataset.model();

    let names = dataset.require_entity("names").unwrap();
    assert_eq!(model.entity(names).data_kind, DataKind::Char);
    assert_eq!(model.shape(names), vec![4, 8]);
    let strlen_dim = model.dim(model.entity(names).dims[1]);
    assert_eq!(strlen_dim.name.as_deref(), Some("name_len"));

    // Char variables are not strings, so nothing is preloaded
    assert_eq!(dataset.transport().data_calls(), 0);
}

// =============================================================================
// Reading
// =============================================================================

#[test]
fn test_small_coordinates_preloaded_in_one_request() {
    let mut dataset = open_hs(DodsConfig::default());
    assert_eq!(dataset.transport().data_calls(), 1);
    assert_eq!(dataset.transport().data_requests[0], "?lat[0:1:99],lon[0:1:199]");

    let lat = dataset.require_entity("lat").unwrap();
    assert!(dataset.entity(lat).cached.is_some());

    let data = read_named(&mut dataset, "lat");
    assert_eq!(data.shape(), &[HS_LAT]);
    let expected: Vec<f64> = create_axis(-49.5, 1.0, HS_LAT).into_iter().map(f64::from).collect();
    assert_values_approx_eq!(data.to_f64_vec().unwrap(), expected, 1e-4);

    // Served from cache
    assert_eq!(dataset.transport().data_calls(), 1);
}

#[test]
fn test_preload_disabled() {
    let dataset = open_hs(DodsConfig::default().with_preload(false));
    assert_eq!(dataset.transport().data_calls(), 0);
    let lat = dataset.require_entity("lat").unwrap();
    assert!(dataset.entity(lat).cached.is_none());
}

#[test]
fn test_read_grid_values() {
    let mut dataset = open_hs(DodsConfig::default());
    let data = read_named(&mut dataset, "hs");
    assert_eq!(data.shape(), &[HS_LAT, HS_LON]);

    assert!(matches!(data, ArrayData::Float(_)));

    // Verify pattern: value = col * 1000 + row
    let values = data.to_f64_vec().unwrap();
    for (row, col) in [(0, 0), (3, 7), (HS_LAT - 1, HS_LON - 1)] {
        let expected = (col * 1000 + row) as f64;
        assert_approx_eq!(values[row * HS_LON + col], expected, 1e-3);
    }
    assert_eq!(dataset.transport().data_requests.last().unwrap(), "?hs[0:1:99][0:1:199]");
}

#[test]
fn test_read_section_of_grid() {
    let mut dataset = open_hs(DodsConfig::default());
    let hs = dataset.require_entity("hs").unwrap();
    let ranges = vec![vec![IndexRange::new(0, 1, 1).unwrap(), IndexRange::new(5, 1, 7).unwrap()]];

    let data = dataset.read_section(hs, &ranges).unwrap().unwrap();
    assert_eq!(data.shape(), &[2, 3]);
    assert_eq!(
        data.to_f64_vec().unwrap(),
        vec![5000.0, 6000.0, 7000.0, 5001.0, 6001.0, 7001.0]
    );
    assert_eq!(dataset.transport().data_requests.last().unwrap(), "?hs[0:1:1][5:1:7]");

    // Sections are never cached
    assert!(dataset.entity(hs).cached.is_none());
}

#[test]
fn test_read_section_out_of_bounds() {
    let mut dataset = open_hs(DodsConfig::default());
    let hs = dataset.require_entity("hs").unwrap();
    let calls = dataset.transport().data_calls();
    let ranges = vec![vec![IndexRange::full(HS_LAT + 1), IndexRange::full(HS_LON)]];

    let err = dataset.read_section(hs, &ranges).unwrap_err();
    assert!(matches!(err, DodsError::InvalidConstraint(_)));
    assert_eq!(dataset.transport().data_calls(), calls);
}

#[test]
fn test_read_with_caller_expression() {
    let mut dataset = open_hs(DodsConfig::default().with_preload(false));
    let lon = dataset.require_entity("lon").unwrap();
    let data = dataset.read_with_ce(lon, "lon[10:10:30]").unwrap().unwrap();
    assert_eq!(data.shape(), &[3]);
    assert_eq!(dataset.transport().data_requests[0], "?lon[10:10:30]");

    let err = dataset.read_with_ce(lon, "lon[0:1:9]&lon>3").unwrap_err();
    assert!(matches!(err, DodsError::InvalidConstraint(_)));
}

#[test]
fn test_unsigned_values_are_widened() {
    let mut dataset = open_mixed();

    match read_named(&mut dataset, "b") {
        ArrayData::Byte(values) => assert_eq!(values.iter().copied().collect::<Vec<_>>(), vec![0, 1, 200, 255]),
        other => panic!("expected byte data, got {}", other.kind_name()),
    }
    match read_named(&mut dataset, "u16") {
        ArrayData::Int(values) => {
            assert_eq!(values.iter().copied().collect::<Vec<_>>(), vec![0, 1, 40_000, 65_535])
        }
        other => panic!("expected int data, got {}", other.kind_name()),
    }
    match read_named(&mut dataset, "u32") {
        ArrayData::Long(values) => assert_eq!(
            values.iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 3_000_000_000, 4_294_967_295]
        ),
        other => panic!("expected long data, got {}", other.kind_name()),
    }
}

#[test]
fn test_read_structure_members() {
    let mut dataset = open_mixed();

    let temp = read_named(&mut dataset, "station.temp");
    assert_eq!(temp.shape(), &[2]);
    assert_eq!(temp.to_f64_vec().unwrap(), vec![12.5, 13.0]);
    assert_eq!(dataset.transport().data_requests[0], "?station.temp[0:1:1]");

    let station = read_named(&mut dataset, "station");
    let structure = station.as_structure().expect("structured data");
    assert_eq!(structure.member_names, vec!["id".to_string(), "temp".to_string()]);
    assert_eq!(structure.rows.len(), 1);
}

#[test]
fn test_read_sequence_member() {
    let mut dataset = open_mixed();
    let depth = read_named(&mut dataset, "obs.depth");
    assert_eq!(depth.shape(), &[3]);
    assert_eq!(depth.to_f64_vec().unwrap(), vec![0.0, 10.0, 20.0]);
    // Sequences take no index ranges
    assert_eq!(dataset.transport().data_requests[0], "?obs.depth");

    let obs = read_named(&mut dataset, "obs");
    let rows = obs.as_structure().unwrap();
    assert_eq!(rows.shape, vec![3]);
    assert_eq!(rows.column("flag").unwrap().len(), 3);
}

#[test]
fn test_empty_sequence_member_keeps_its_type() {
    init_test_logging();
    let obs = Declaration::sequence("obs", vec![Declaration::primitive("n", PrimitiveKind::Int32)]).with_rows(Vec::new());
    let data = Dds::new("empty", vec![obs]);
    let mut dataset = DodsDataset::open(
        URL,
        MockTransport::new(data, Das::default()),
        DodsConfig::default().with_preload(false),
    )
    .unwrap();

    let id = dataset.require_entity("obs.n").unwrap();
    assert_eq!(dataset.entity(id).data_kind, DataKind::Int);
    let n = read_named(&mut dataset, "obs.n");
    assert!(matches!(n, ArrayData::Int(_)));
    assert_eq!(n.shape(), &[0]);
}

#[test]
fn test_read_array_of_structures_member() {
    let mut dataset = open_mixed();
    let z = read_named(&mut dataset, "profiles.z");
    assert_eq!(z.shape(), &[2]);
    assert_eq!(z.to_f64_vec().unwrap(), vec![-1.0, -2.0]);
    assert_eq!(dataset.transport().data_requests[0], "?profiles[0:1:1].z");
}

#[test]
fn test_batched_read_matches_individual_reads() {
    let names = ["b", "count", "station.temp", "obs.flag"];

    let mut batched = open_mixed();
    let ids: Vec<_> = names.iter().map(|n| batched.require_entity(n).unwrap()).collect();
    let together = batched.read_arrays(&ids).unwrap();
    assert_eq!(batched.transport().data_calls(), 1);

    let mut single = open_mixed();
    let separate: Vec<_> = names
        .iter()
        .map(|n| {
            let id = single.require_entity(n).unwrap();
            single.read(id).unwrap()
        })
        .collect();
    assert_eq!(single.transport().data_calls(), names.len());

    assert_eq!(together, separate);
}

#[test]
fn test_batch_requests_follow_declaration_order() {
    let mut dataset = open_hs(DodsConfig::default());
    let level = dataset.require_entity("level").unwrap();
    let hs = dataset.require_entity("hs").unwrap();
    let lat = dataset.require_entity("lat").unwrap();

    let results = dataset.read_arrays(&[level, lat, hs]).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().to_f64_vec().unwrap(), vec![3.0]);
    assert_eq!(results[1].as_ref().unwrap().shape(), &[HS_LAT]);
    assert_eq!(results[2].as_ref().unwrap().shape(), &[HS_LAT, HS_LON]);

    // lat came from cache, the rest went out in declaration order
    assert_eq!(dataset.transport().data_requests.last().unwrap(), "?hs[0:1:99][0:1:199],level");
}

#[test]
fn test_missing_entity_yields_empty_slot() {
    init_test_logging();
    let (data, das) = mixed_dataset();
    let transport = MockTransport::new(data, das).omitting("count");
    let mut dataset = DodsDataset::open(URL, transport, DodsConfig::default().with_preload(false)).unwrap();

    let count = dataset.require_entity("count").unwrap();
    let b = dataset.require_entity("b").unwrap();
    let results = dataset.read_arrays(&[count, b]).unwrap();

    assert!(results[0].is_none());
    assert!(results[1].is_some());
    assert!(dataset
        .diagnostics()
        .iter()
        .any(|d| matches!(d, DodsError::CorrelationMiss(msg) if msg.contains("count"))));
}

#[test]
fn test_transport_failure_during_preload_fails_open() {
    init_test_logging();
    let (data, das) = hs_grid_dataset();
    let mut transport = MockTransport::new(data, das);
    transport.fail_next_data(TransportError::Timeout("no answer".into()));

    let result = DodsDataset::open(URL, transport, DodsConfig::default());
    assert!(matches!(result, Err(DodsError::Transport(TransportError::Timeout(_)))));
}

#[test]
fn test_transport_failure_is_fatal_to_uncached_read() {
    init_test_logging();
    let (data, das) = hs_grid_dataset();
    let mut transport = MockTransport::new(data, das);
    transport.fail_next_data(TransportError::connection("refused"));
    let mut dataset = DodsDataset::open(URL, transport, DodsConfig::default().with_preload(false)).unwrap();

    let hs = dataset.require_entity("hs").unwrap();
    let lat = dataset.require_entity("lat").unwrap();
    let err = dataset.read_arrays(&[hs, lat]).unwrap_err();
    assert!(matches!(err, DodsError::Transport(TransportError::Connection(_))));
    assert!(dataset.entity(lat).cached.is_none());

    // The transport recovers for the next request
    assert!(dataset.read(lat).unwrap().is_some());
}

#[test]
fn test_cached_data_survives_transport_failure() {
    let mut dataset = open_hs(DodsConfig::default());
    dataset
        .transport_mut()
        .fail_next_data(TransportError::connection("refused"));

    // lat was preloaded, so no request is needed
    let lat = dataset.require_entity("lat").unwrap();
    assert!(dataset.read(lat).unwrap().is_some());
    assert_eq!(dataset.transport().data_calls(), 1);

    let hs = dataset.require_entity("hs").unwrap();
    assert!(dataset.read(hs).is_err());
}

// =============================================================================
// Text
// =============================================================================

#[test]
fn test_single_characters_merged_into_strings() {
    let (data, das) = char_dataset();
    let mut dataset = DodsDataset::open(URL, MockTransport::new(data, das), DodsConfig::default()).unwrap();

    let codes = read_named(&mut dataset, "codes");
    assert_eq!(codes.shape(), &[2]);
    assert_eq!(codes.to_strings().unwrap(), vec!["abcd".to_string(), "wxyz".to_string()]);
}

#[test]
fn test_unmergeable_characters_fail_conversion() {
    let (data, das) = char_dataset();
    let mut dataset = DodsDataset::open(URL, MockTransport::new(data, das), DodsConfig::default()).unwrap();

    // 4 single characters cannot fill strings of length 8
    let names = dataset.require_entity("names").unwrap();
    let err = dataset.read(names).unwrap_err();
    assert!(matches!(err, DodsError::Conversion(_)));
}

#[test]
fn test_full_strings_padded_to_char_array() {
    let (data, das) = char_dataset();
    let mut dataset = DodsDataset::open(URL, MockTransport::new(data, das), DodsConfig::default()).unwrap();

    let label = read_named(&mut dataset, "label");
    assert_eq!(label.shape(), &[4, 5]);
    assert_eq!(
        label.to_strings().unwrap(),
        vec!["alpha".to_string(), "b".to_string(), "gamma".to_string(), "delta".to_string()]
    );
}

#[test]
fn test_short_scalar_string_read_as_padded_chars() {
    for value in ["a", ""] {
        let data = Dds::new(
            "text",
            vec![test_utils::scalar("s", PrimitiveVector::String(vec![value.to_string()]))],
        );
        let das = Das::new(vec![AttributeTable::new("s").with_container(
            AttributeTable::new("DODS").with("strlen", AttrKind::Int32, &["4"]),
        )]);
        let mut dataset = DodsDataset::open(URL, MockTransport::new(data, das), DodsConfig::default()).unwrap();
        let id = dataset.require_entity("s").unwrap();
        assert_eq!(dataset.entity(id).data_kind, DataKind::Char);

        let s = read_named(&mut dataset, "s");
        assert!(matches!(s, ArrayData::Char(_)));
        assert_eq!(s.shape(), &[4]);
        assert_eq!(s.to_strings().unwrap(), vec![value.to_string()]);
    }
}

// =============================================================================
// Open-time behavior
// =============================================================================

#[test]
fn test_groups_from_slash_names() {
    init_test_logging();
    let (data, das) = grouped_dataset();
    let mut dataset = DodsDataset::open(
        URL,
        MockTransport::new(data, das),
        DodsConfig::default().with_groups(true),
    )
    .unwrap();

    let temp = dataset.require_entity("grp/temp").unwrap();
    let entity = dataset.entity(temp);
    assert_eq!(entity.name, "temp");
    assert_eq!(dataset.model().group_path(entity.group), "grp");
    assert_eq!(entity.attribute("units").unwrap().string_value(), "K");
    assert_eq!(entity.attribute("long_name").unwrap().string_value(), "temperature");

    let group = dataset.model().group(entity.group);
    assert_eq!(group.attributes.iter().find(|a| a.name == "institution").unwrap().string_value(), "lab");

    assert!(dataset.find_entity("grp/sub/depth").is_some());
    assert!(dataset.find_entity("meta/version").is_some());
    assert!(dataset.find_entity("meta").is_none());

    let root = dataset.model().group(dataset.model().root());
    assert!(root.attributes.iter().any(|a| a.name == "title"));
    assert!(!root.attributes.iter().any(|a| a.name.contains('/')));

    // Reads still use the wire name
    let data = read_named(&mut dataset, "grp/temp");
    assert_eq!(data.to_f64_vec().unwrap(), vec![280.0, 281.5, 283.0]);
    assert_eq!(dataset.transport().data_requests[0], "?grp/temp[0:1:2]");
}

#[test]
fn test_slash_names_kept_flat_without_groups() {
    let (data, das) = grouped_dataset();
    let dataset = DodsDataset::open(URL, MockTransport::new(data, das), DodsConfig::default()).unwrap();
    let model = dataset.model();
    assert_eq!(model.groups().count(), 1);
    let temp = model
        .entities()
        .find(|(_, e)| e.name == "grp/temp")
        .map(|(id, _)| id)
        .unwrap();
    assert_eq!(model.entity(temp).group, model.root());
    assert!(dataset.find_entity("meta.version").is_some());
}

#[test]
fn test_url_constraint_attached_and_preloaded() {
    init_test_logging();
    let (data, das) = hs_grid_dataset();
    let url = format!("{}?lat[0:1:9]", URL);
    let mut dataset = DodsDataset::open(&url, MockTransport::new(data, das), DodsConfig::default()).unwrap();

    assert_eq!(dataset.location().location, "dods://test.server/opendap/waves.nc");
    assert_eq!(dataset.location().transport_url, URL);

    let lat = dataset.require_entity("lat").unwrap();
    assert_eq!(dataset.entity(lat).ce.as_deref(), Some("lat[0:1:9]"));
    assert_eq!(dataset.transport().data_requests[0], "?lat[0:1:9],lon[0:1:199]");

    let data = dataset.read(lat).unwrap().unwrap();
    assert_eq!(data.shape(), &[10]);
    assert_eq!(dataset.transport().data_calls(), 1);
}

#[test]
fn test_url_constraint_naming_nothing_is_diagnosed() {
    let (data, das) = hs_grid_dataset();
    let url = format!("{}?nothing[0:1:1]", URL);
    let dataset = DodsDataset::open(&url, MockTransport::new(data, das), DodsConfig::default()).unwrap();
    assert!(dataset
        .diagnostics()
        .iter()
        .any(|d| matches!(d, DodsError::NotFound(msg) if msg.contains("nothing"))));
}

#[test]
fn test_missing_das_recovered() {
    init_test_logging();
    let (data, das) = hs_grid_dataset();
    let transport = MockTransport::new(data, das).without_das();
    let dataset = DodsDataset::open(URL, transport, DodsConfig::default()).unwrap();

    assert!(matches!(dataset.diagnostics()[0], DodsError::Transport(TransportError::NotFound(_))));
    let hs = dataset.entity(dataset.require_entity("hs").unwrap());
    assert!(hs.attribute("units").is_none());
    assert_eq!(dataset.transport().das_calls, 1);
}

#[test]
fn test_cancelled_open() {
    let (data, das) = hs_grid_dataset();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = DodsDataset::open_with_cancel(URL, MockTransport::new(data, das), DodsConfig::default(), &cancel);
    assert!(matches!(result, Err(DodsError::Cancelled)));
}

#[test]
fn test_invalid_config_rejected() {
    let (data, das) = hs_grid_dataset();
    let config = DodsConfig {
        coord_preload_size: 0,
        ..Default::default()
    };
    let result = DodsDataset::open(URL, MockTransport::new(data, das), config);
    assert!(matches!(result, Err(DodsError::InvalidConfig(_))));
}

#[test]
fn test_unknown_scheme_rejected_before_fetching() {
    let (data, das) = hs_grid_dataset();
    let result = DodsDataset::open("ftp://test.server/waves.nc", MockTransport::new(data, das), DodsConfig::default());
    assert!(matches!(result, Err(DodsError::InvalidLocation(_))));
}

#[test]
fn test_describe_lists_model() {
    let dataset = open_hs(DodsConfig::default());
    let cdl = dataset.describe();
    assert!(cdl.starts_with("netcdf dods://test.server/opendap/waves.nc {"));
    assert!(cdl.contains("lat = 100 ;"));
    assert!(cdl.contains("float hs(lat, lon) ;"));
    assert!(cdl.contains("hs:units = \"m\" ;"));
    assert!(cdl.contains(":title = \"Significant wave height\" ;"));
}
