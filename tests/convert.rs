use std::{collections::BTreeSet, path::Path};

use netcdf::AttributeValue;
use rosetta_convert::{
    plan::VariableRole, ConversionRequest, ConvertError, Converter, RosettaConfig, Template,
};
use tempfile::TempDir;

fn converter(dir: &TempDir) -> Converter {
    Converter::new(RosettaConfig { download_dir: dir.path().to_path_buf(), ..Default::default() })
}

fn request(data: &str, template: &str, id: &str) -> ConversionRequest {
    ConversionRequest::from_template_file(data.as_ref(), template.as_ref(), Some(id.to_string()))
        .unwrap()
}

fn text_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn variable_names(file: &netcdf::File) -> BTreeSet<String> {
    file.variables().map(|v| v.name()).collect()
}

#[test]
fn test_relative_time_track() {
    let dir = TempDir::new().unwrap();
    let req = request("tests/data/track.csv", "tests/data/track.template.json", "track-1");
    let out = converter(&dir).convert(&req).unwrap();

    assert_eq!(out.rows, 100);
    assert_eq!(out.netcdf, dir.path().join("track-1").join("track.nc"));

    let file = netcdf::open(&out.netcdf).unwrap();
    let dims: Vec<_> = file.dimensions().map(|d| (d.name(), d.len())).collect();
    assert_eq!(dims, vec![("time".to_string(), 100)]);

    let expected: BTreeSet<String> = ["time", "lat", "lon", "temperature", "Rosetta"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(variable_names(&file), expected);

    match file.attribute("Conventions").unwrap().value().unwrap() {
        AttributeValue::Str(s) => assert_eq!(s, "CF-1.6"),
        other => panic!("unexpected {other:?}"),
    }
    match file.attribute("featureType").unwrap().value().unwrap() {
        AttributeValue::Str(s) => assert_eq!(s, "trajectory"),
        other => panic!("unexpected {other:?}"),
    }

    let temp = file.variable("temperature").unwrap();
    assert_eq!(text_attr(&temp, "coordinates").as_deref(), Some("time lat lon"));
    assert!(matches!(
        temp.attribute_value("_columnId").unwrap().unwrap(),
        AttributeValue::Int(3)
    ));
    let values = temp.get_values::<f32, _>(..).unwrap();
    assert_eq!(values.len(), 100);
    assert!((values[1] - 12.1).abs() < 1e-6);

    let lat = file.variable("lat").unwrap();
    assert_eq!(text_attr(&lat, "standard_name").as_deref(), Some("latitude"));
    assert_eq!(text_attr(&lat, "axis").as_deref(), Some("Y"));
}

#[test]
fn test_decomposed_time_station() {
    let dir = TempDir::new().unwrap();
    let req = request("tests/data/station.txt", "tests/data/station.template.json", "station-1");
    let out = converter(&dir).convert(&req).unwrap();
    assert_eq!(out.rows, 100);

    let file = netcdf::open(&out.netcdf).unwrap();
    let dims: Vec<_> = file.dimensions().map(|d| (d.name(), d.len())).collect();
    assert_eq!(dims, vec![("time".to_string(), 100)]);

    let names = variable_names(&file);
    for n in ["latitude", "longitude", "altitude", "station_id", "time", "date", "time_2", "Water_Temp", "Rosetta"] {
        assert!(names.contains(n), "missing {n}");
    }

    for component in ["date", "time_2"] {
        let var = file.variable(component).unwrap();
        assert_eq!(text_attr(&var, "timeRelatedVariable").as_deref(), Some("true"));
    }

    let station = file.variable("station_id").unwrap();
    assert_eq!(text_attr(&station, "cf_role").as_deref(), Some("timeseries_id"));

    let lon = file.variable("longitude").unwrap();
    assert_eq!(text_attr(&lon, "units").as_deref(), Some("degrees_east"));
    let lon_value = lon.get_values::<f32, _>(..).unwrap();
    assert!((lon_value[0] - 70.651).abs() < 1e-4);

    let time = file.variable("time").unwrap();
    assert_eq!(
        text_attr(&time, "units").as_deref(),
        Some("seconds since 1970-01-01T00:00:00Z")
    );
    let secs = time.get_values::<f64, _>(..).unwrap();
    assert_eq!(secs[0], 1_704_067_200.0);
    assert_eq!(secs[1] - secs[0], 3600.0);

    let temp = file.variable("Water_Temp").unwrap();
    assert_eq!(
        text_attr(&temp, "coordinates").as_deref(),
        Some("time latitude longitude altitude")
    );
}

#[test]
fn test_synthetic_time_is_stable() {
    let dir = TempDir::new().unwrap();
    let conv = converter(&dir);
    let req = request("tests/data/station.txt", "tests/data/station.template.json", "again");
    let first = conv.prepare(&req).unwrap();
    let second = conv.prepare(&req).unwrap();
    assert_eq!(first.plan.dimensions, second.plan.dimensions);

    let synthetic: Vec<_> = first
        .plan
        .variables
        .iter()
        .filter(|v| v.role == VariableRole::SyntheticTime)
        .collect();
    assert_eq!(synthetic.len(), 1);
    assert_eq!(synthetic[0].data.len(), 100);
}

#[test]
fn test_written_template_replays_attributes() {
    let dir = TempDir::new().unwrap();
    let req = request("tests/data/track.csv", "tests/data/track.template.json", "replay");
    let out = converter(&dir).convert(&req).unwrap();

    let reloaded = Template::load(&out.template).unwrap();
    let original = &req.template;

    let globals = |t: &Template| t.global_entries().into_iter().collect::<BTreeSet<_>>();
    assert_eq!(globals(original), globals(&reloaded));

    let columns = |t: &Template| {
        t.column_declarations()
            .unwrap()
            .into_iter()
            .flat_map(|c| c.attributes.into_iter().map(move |a| (c.column_id, a)))
            .collect::<BTreeSet<_>>()
    };
    assert_eq!(columns(original), columns(&reloaded));
    assert_eq!(reloaded.rosetta_version, env!("CARGO_PKG_VERSION"));

    // replaying the saved template gives the same plan
    let replay = ConversionRequest::from_template_file(
        "tests/data/track.csv".as_ref(),
        &out.template,
        Some("replay-2".into()),
    )
    .unwrap();
    let conv = converter(&dir);
    let a = conv.prepare(&req).unwrap().plan;
    let b = conv.prepare(&replay).unwrap().plan;
    assert_eq!(a.dimensions, b.dimensions);
    assert_eq!(a.attributes, b.attributes);
    let names = |p: &rosetta_convert::plan::DatasetPlan| {
        p.variables.iter().map(|v| v.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&a), names(&b));
}

#[test]
fn test_audit_variable_holds_payload() {
    let dir = TempDir::new().unwrap();
    let req = request("tests/data/track.csv", "tests/data/track.template.json", "audit");
    let out = converter(&dir).convert(&req).unwrap();
    let file = netcdf::open(&out.netcdf).unwrap();
    let audit = file.variable("Rosetta").unwrap();
    let payload = audit.get_string(..).unwrap();
    assert_eq!(payload, req.client_payload);
}

#[test]
fn test_ncml_matches_netcdf_schema() {
    let dir = TempDir::new().unwrap();
    let req = request("tests/data/station.txt", "tests/data/station.template.json", "ncml");
    let out = converter(&dir).convert(&req).unwrap();

    let xml = std::fs::read_to_string(out.ncml.as_ref().unwrap()).unwrap();
    let file = netcdf::open(&out.netcdf).unwrap();
    for name in variable_names(&file) {
        assert!(xml.contains(&format!("<variable name=\"{name}\"")), "{name} missing from NcML");
    }
    assert!(xml.contains("<dimension name=\"time\" length=\"100\" />"));
    assert!(xml.contains("<attribute name=\"timeRelatedVariable\" value=\"true\" />"));
}

#[test]
fn test_ragged_file_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let mut template = Template::load(Path::new("tests/data/track.template.json")).unwrap();
    template.header_line_numbers = vec![0];
    template.variable_info_list.truncate(3);
    let req = ConversionRequest {
        transaction_id: "ragged".into(),
        data_file: "tests/data/ragged.csv".into(),
        client_payload: template.to_json().unwrap(),
        template,
    };
    match converter(&dir).convert(&req).unwrap_err() {
        ConvertError::Parse { line, expected, found, delimiter } => {
            assert_eq!(line, 3);
            assert_eq!(expected, 3);
            assert_eq!(found, 2);
            assert_eq!(delimiter, "Comma");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!dir.path().join("ragged").exists());
}

#[test]
fn test_missing_feature_type_fails_before_io() {
    let dir = TempDir::new().unwrap();
    let mut template = Template::load(Path::new("tests/data/track.template.json")).unwrap();
    template.cf_type = None;
    template.platform = None;
    let req = ConversionRequest {
        transaction_id: "no-cf".into(),
        data_file: "tests/data/track.csv".into(),
        client_payload: String::new(),
        template,
    };
    assert!(matches!(
        converter(&dir).convert(&req),
        Err(ConvertError::MissingConfiguration(_))
    ));
    assert!(!dir.path().join("no-cf").exists());
}

#[test]
fn test_unknown_attribute_type_fails() {
    let dir = TempDir::new().unwrap();
    let mut template = Template::load(Path::new("tests/data/track.template.json")).unwrap();
    template.global_metadata[2].value_type = "LONG".into();
    let req = ConversionRequest {
        transaction_id: "bad-type".into(),
        data_file: "tests/data/track.csv".into(),
        client_payload: String::new(),
        template,
    };
    assert!(matches!(
        converter(&dir).convert(&req),
        Err(ConvertError::UnknownType { .. })
    ));
}

#[test]
fn test_colliding_names_are_suffixed() {
    let dir = TempDir::new().unwrap();
    let mut template = Template::load(Path::new("tests/data/track.template.json")).unwrap();
    template.variable_info_list[1].name = "Water Temp".into();
    template.variable_info_list[1].coordinate_variable = false;
    template.variable_info_list[2].name = "water_temp".into();
    template.variable_info_list[2].coordinate_variable = false;
    let req = ConversionRequest {
        transaction_id: "dupes".into(),
        data_file: "tests/data/track.csv".into(),
        client_payload: String::new(),
        template,
    };
    let plan = converter(&dir).prepare(&req).unwrap().plan;
    assert!(plan.variable("Water_Temp").is_some());
    assert!(plan.variable("water_temp_2").is_some());
}

#[test]
fn test_uncreatable_output_dir_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "occupied").unwrap();
    let conv = Converter::new(RosettaConfig {
        download_dir: blocker.join("downloads"),
        ..Default::default()
    });
    let req = request("tests/data/track.csv", "tests/data/track.template.json", "blocked");
    match conv.convert(&req).unwrap_err() {
        ConvertError::Io { path, .. } => {
            assert_eq!(path, blocker.join("downloads").join("blocked"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_out_of_range_column_id_is_rejected() {
    let dir = TempDir::new().unwrap();
    for id in [usize::MAX, i32::MAX as usize + 1] {
        let mut template = Template::load(Path::new("tests/data/track.template.json")).unwrap();
        template.variable_info_list[3].column_id = id;
        let req = ConversionRequest {
            transaction_id: "huge-id".into(),
            data_file: "tests/data/track.csv".into(),
            client_payload: String::new(),
            template,
        };
        assert!(matches!(
            converter(&dir).convert(&req),
            Err(ConvertError::InvalidConfiguration(_))
        ));
    }
    assert!(!dir.path().join("huge-id").exists());
}

#[test]
fn test_written_template_stores_delimiter_symbol() {
    let dir = TempDir::new().unwrap();
    let req = request("tests/data/station.txt", "tests/data/station.template.json", "symbol");
    let out = converter(&dir).convert(&req).unwrap();
    let written = Template::load(&out.template).unwrap();
    assert_eq!(req.template.delimiter, "Whitespace");
    assert_eq!(written.delimiter, " ");
    assert_eq!(written.delimiter(), req.template.delimiter());
    assert_eq!(written.cf_type.as_deref(), Some("timeSeries"));
}
