//! Canned DAP2 datasets for tests.
//!
//! Each fixture returns the dataset as a DataDDS (declarations with values
//! filled in) plus its DAS. [`crate::MockTransport`] derives the shape-only
//! DDS from the DataDDS.

use dap_wire::{ArrayDim, AttrKind, AttributeTable, Das, Declaration, Dds, PrimitiveKind, PrimitiveVector};

use crate::generators::{create_axis, create_hashed_bytes, create_test_grid};

/// Latitude count of the wave height grid.
pub const HS_LAT: usize = 100;
/// Longitude count of the wave height grid.
pub const HS_LON: usize = 200;

/// A Float32 array with values.
pub fn float_array(name: &str, dims: Vec<ArrayDim>, values: Vec<f32>) -> Declaration {
    Declaration::array(name, PrimitiveKind::Float32, dims).with_values(PrimitiveVector::Float32(values))
}

/// A String array with values.
pub fn string_array(name: &str, dim: ArrayDim, values: &[&str]) -> Declaration {
    Declaration::array(name, PrimitiveKind::String, vec![dim])
        .with_values(PrimitiveVector::String(values.iter().map(|s| s.to_string()).collect()))
}

/// A scalar with its value.
pub fn scalar(name: &str, value: PrimitiveVector) -> Declaration {
    Declaration::primitive(name, value.kind()).with_values(value)
}

/// A table holding one quoted string attribute.
pub fn string_attribute(table: &str, name: &str, value: &str) -> AttributeTable {
    AttributeTable::new(table).with(name, AttrKind::String, &[format!("\"{}\"", value).as_str()])
}

/// Wave height on a lat/lon grid whose maps are also top-level variables.
///
/// `hs[row][col] == col * 1000 + row`.
pub fn hs_grid_dataset() -> (Dds, Das) {
    let lat_values = create_axis(-49.5, 1.0, HS_LAT);
    let lon_values = create_axis(0.0, 1.8, HS_LON);
    let lat = || float_array("lat", vec![ArrayDim::named("lat", HS_LAT)], lat_values.clone());
    let lon = || float_array("lon", vec![ArrayDim::named("lon", HS_LON)], lon_values.clone());

    let hs = Declaration::grid(
        "hs",
        float_array(
            "hs",
            vec![ArrayDim::named("lat", HS_LAT), ArrayDim::named("lon", HS_LON)],
            create_test_grid(HS_LON, HS_LAT),
        ),
        vec![lat(), lon()],
    );

    let dds = Dds::new(
        "waves",
        vec![
            lat(),
            lon(),
            hs,
            scalar("level", PrimitiveVector::Int32(vec![3])),
        ],
    );
    let das = Das::new(vec![
        AttributeTable::new("NC_GLOBAL")
            .with("title", AttrKind::String, &["\"Significant wave height\""])
            .with("version", AttrKind::Float32, &["1.5"]),
        AttributeTable::new("hs")
            .with("units", AttrKind::String, &["\"m\""])
            .with("_FillValue", AttrKind::Float32, &["-999"]),
        string_attribute("lat", "units", "degrees_north"),
        string_attribute("lon", "units", "degrees_east"),
    ]);
    (dds, das)
}

/// Unsigned arrays, a scalar, a structure, a sequence and an array of structures.
pub fn mixed_dataset() -> (Dds, Das) {
    let n = || vec![ArrayDim::named("n", 4)];
    let station = Declaration::structure(
        "station",
        vec![
            scalar("id", PrimitiveVector::Int32(vec![7])),
            Declaration::array("temp", PrimitiveKind::Float64, vec![ArrayDim::anonymous(2)])
                .with_values(PrimitiveVector::Float64(vec![12.5, 13.0])),
        ],
    );

    let obs_members = vec![
        Declaration::primitive("depth", PrimitiveKind::Float32),
        Declaration::primitive("flag", PrimitiveKind::Byte),
    ];
    let obs_rows: Vec<Vec<Declaration>> = (0..3)
        .map(|i| {
            vec![
                scalar("depth", PrimitiveVector::Float32(vec![i as f32 * 10.0])),
                scalar("flag", PrimitiveVector::Byte(vec![i as u8])),
            ]
        })
        .collect();
    let obs = Declaration::sequence("obs", obs_members).with_rows(obs_rows);

    let profiles = Declaration::structure_array(
        "profiles",
        vec![ArrayDim::named("profile", 2)],
        vec![Declaration::primitive("z", PrimitiveKind::Float32)],
    )
    .with_instances(vec![
        vec![scalar("z", PrimitiveVector::Float32(vec![-1.0]))],
        vec![scalar("z", PrimitiveVector::Float32(vec![-2.0]))],
    ]);

    let dds = Dds::new(
        "mixed",
        vec![
            Declaration::array("b", PrimitiveKind::Byte, n())
                .with_values(PrimitiveVector::Byte(vec![0, 1, 200, 255])),
            Declaration::array("u16", PrimitiveKind::UInt16, n())
                .with_values(PrimitiveVector::UInt16(vec![0, 1, 40_000, 65_535])),
            Declaration::array("u32", PrimitiveKind::UInt32, n())
                .with_values(PrimitiveVector::UInt32(vec![0, 1, 3_000_000_000, u32::MAX])),
            Declaration::array("noise", PrimitiveKind::Byte, n())
                .with_values(PrimitiveVector::Byte(create_hashed_bytes(4, 7))),
            scalar("count", PrimitiveVector::Int32(vec![42])),
            station,
            obs,
            profiles,
        ],
    );
    let das = Das::new(vec![
        AttributeTable::new("station")
            .with("long_name", AttrKind::String, &["\"Buoy\""])
            .with_container(AttributeTable::new("id").with("missing_value", AttrKind::Int32, &["-1"])),
        AttributeTable::new("u16").with("valid_max", AttrKind::UInt16, &["65535"]),
    ]);
    (dds, das)
}

/// String variables that carry fixed-width text.
///
/// `codes` arrives as single characters that merge into two 4-character
/// strings; `names` arrives as 4 single characters against a width of 8.
pub fn char_dataset() -> (Dds, Das) {
    let dds = Dds::new(
        "text",
        vec![
            string_array("names", ArrayDim::named("station", 4), &["a", "b", "c", "d"]),
            string_array("codes", ArrayDim::named("n", 8), &["a", "b", "c", "d", "w", "x", "y", "z"]),
            string_array("label", ArrayDim::named("station", 4), &["alpha", "b", "gamma", "delta"]),
        ],
    );
    let strlen = |var: &str, len: &str, dim: &str| {
        AttributeTable::new(var).with_container(
            AttributeTable::new("DODS")
                .with("strlen", AttrKind::Int32, &[len])
                .with("dimName", AttrKind::String, &[format!("\"{}\"", dim).as_str()]),
        )
    };
    let das = Das::new(vec![
        strlen("names", "8", "name_len"),
        strlen("codes", "4", "code_len"),
        strlen("label", "5", "label_len"),
    ]);
    (dds, das)
}

/// Slash-qualified names meant for group assignment.
pub fn grouped_dataset() -> (Dds, Das) {
    let dds = Dds::new(
        "grouped",
        vec![
            float_array("grp/temp", vec![ArrayDim::named("x", 3)], vec![280.0, 281.5, 283.0]),
            scalar("grp/sub/depth", PrimitiveVector::Int32(vec![12])),
            Declaration::structure("meta", vec![scalar("version", PrimitiveVector::Int32(vec![2]))]),
        ],
    );
    let das = Das::new(vec![
        AttributeTable::new("NC_GLOBAL")
            .with("title", AttrKind::String, &["\"grouped\""])
            .with("grp/institution", AttrKind::String, &["\"lab\""])
            .with("grp/temp.long_name", AttrKind::String, &["\"temperature\""]),
        string_attribute("grp/temp", "units", "K"),
    ]);
    (dds, das)
}
