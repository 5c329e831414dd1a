use std::collections::{BTreeMap, BTreeSet, VecDeque};

use wirepack::{DataSet, FieldSchema, ObjectSerialiser};
use wirepack_buffers::{Reader, Writer};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Mode {
    #[default]
    Idle,
    Running,
    Failed,
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "Idle",
            Mode::Running => "Running",
            Mode::Failed => "Failed",
        }
    }

    fn parse(s: &str) -> Option<Mode> {
        Some(match s {
            "Idle" => Mode::Idle,
            "Running" => Mode::Running,
            "Failed" => Mode::Failed,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Anchor {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Telemetry {
    enabled: bool,
    tiny: i8,
    small: i16,
    id: i32,
    big: i64,
    ratio: f32,
    gain: f64,
    label: String,
    limit: Option<i32>,
    samples: Vec<f64>,
    tags: Vec<String>,
    recent: VecDeque<i32>,
    codes: BTreeSet<i64>,
    attrs: BTreeMap<String, i64>,
    mode: Mode,
    curve: DataSet,
    origin: Anchor,
    extra: Option<Anchor>,
}

fn anchor_fields() -> Vec<FieldSchema> {
    vec![
        FieldSchema::scalar("x", |a: &Anchor| a.x, |a: &mut Anchor, v| a.x = v),
        FieldSchema::scalar("y", |a: &Anchor| a.y, |a: &mut Anchor, v| a.y = v),
    ]
}

fn telemetry_schema() -> FieldSchema {
    FieldSchema::record(
        "Telemetry",
        vec![
            FieldSchema::scalar(
                "enabled",
                |t: &Telemetry| t.enabled,
                |t: &mut Telemetry, v| t.enabled = v,
            ),
            FieldSchema::scalar("tiny", |t: &Telemetry| t.tiny, |t: &mut Telemetry, v| {
                t.tiny = v
            }),
            FieldSchema::scalar("small", |t: &Telemetry| t.small, |t: &mut Telemetry, v| {
                t.small = v
            }),
            FieldSchema::scalar("id", |t: &Telemetry| t.id, |t: &mut Telemetry, v| t.id = v),
            FieldSchema::scalar("big", |t: &Telemetry| t.big, |t: &mut Telemetry, v| {
                t.big = v
            }),
            FieldSchema::scalar("ratio", |t: &Telemetry| t.ratio, |t: &mut Telemetry, v| {
                t.ratio = v
            }),
            FieldSchema::scalar("gain", |t: &Telemetry| t.gain, |t: &mut Telemetry, v| {
                t.gain = v
            }),
            FieldSchema::scalar(
                "label",
                |t: &Telemetry| t.label.clone(),
                |t: &mut Telemetry, v| t.label = v,
            ),
            FieldSchema::nullable(
                "limit",
                |t: &Telemetry| t.limit,
                |t: &mut Telemetry, v| t.limit = v,
            ),
            FieldSchema::array(
                "samples",
                |t: &Telemetry| t.samples.clone(),
                |t: &mut Telemetry, v| t.samples = v,
            ),
            FieldSchema::sequence(
                "tags",
                |t: &Telemetry| t.tags.clone(),
                |t: &mut Telemetry, v: Vec<String>| t.tags = v,
            ),
            FieldSchema::sequence(
                "recent",
                |t: &Telemetry| t.recent.clone(),
                |t: &mut Telemetry, v: VecDeque<i32>| t.recent = v,
            ),
            FieldSchema::set(
                "codes",
                |t: &Telemetry| t.codes.clone(),
                |t: &mut Telemetry, v: BTreeSet<i64>| t.codes = v,
            ),
            FieldSchema::map(
                "attrs",
                |t: &Telemetry| t.attrs.clone(),
                |t: &mut Telemetry, v: BTreeMap<String, i64>| t.attrs = v,
            ),
            FieldSchema::enumeration(
                "mode",
                Mode::name,
                Mode::parse,
                |t: &Telemetry| t.mode,
                |t: &mut Telemetry, v| t.mode = v,
            ),
            FieldSchema::data_set(
                "curve",
                |t: &Telemetry| t.curve.clone(),
                |t: &mut Telemetry, v| t.curve = v,
            ),
            FieldSchema::nested(
                "origin",
                anchor_fields(),
                |t: &Telemetry| &t.origin,
                |t: &mut Telemetry| &mut t.origin,
            ),
            FieldSchema::optional(
                "extra",
                anchor_fields(),
                |t: &Telemetry| t.extra.as_ref(),
                |t: &mut Telemetry| &mut t.extra,
            ),
        ],
    )
}

fn serialiser() -> ObjectSerialiser {
    let mut s = ObjectSerialiser::new();
    s.register_type::<Telemetry>(telemetry_schema());
    s
}

fn round_trip(serialiser: &mut ObjectSerialiser, value: &Telemetry) -> Telemetry {
    let mut writer = Writer::new();
    serialiser.serialise_object(&mut writer, value).unwrap();
    let bytes = writer.flush();
    let mut decoded = Telemetry::default();
    serialiser
        .deserialise_object(&mut Reader::new(&bytes), &mut decoded)
        .unwrap();
    decoded
}

fn rich_value() -> Telemetry {
    Telemetry {
        enabled: true,
        tiny: -7,
        small: -300,
        id: 42,
        big: 1 << 40,
        ratio: 0.5,
        gain: -2.25,
        label: "sensor-1".into(),
        limit: Some(100),
        samples: vec![0.0, 1.5, -3.25],
        tags: vec!["alpha".into(), "beta".into()],
        recent: VecDeque::from(vec![3, 2, 1]),
        codes: BTreeSet::from([10, 20, 30]),
        attrs: BTreeMap::from([("retries".to_owned(), 3i64), ("limit".to_owned(), -1i64)]),
        mode: Mode::Running,
        curve: DataSet {
            name: "ramp".into(),
            x: vec![0.0, 1.0],
            y: vec![0.0, 9.0],
        },
        origin: Anchor { x: 1.0, y: -1.0 },
        extra: Some(Anchor { x: 0.5, y: 0.25 }),
    }
}

#[test]
fn full_round_trip_matrix() {
    let mut serialiser = serialiser();
    let original = rich_value();
    assert_eq!(round_trip(&mut serialiser, &original), original);
}

#[test]
fn default_value_round_trip() {
    let mut serialiser = serialiser();
    let original = Telemetry::default();
    assert_eq!(round_trip(&mut serialiser, &original), original);
}

#[test]
fn empty_containers_round_trip() {
    let mut serialiser = serialiser();
    let original = Telemetry {
        label: "empty".into(),
        ..Telemetry::default()
    };
    let decoded = round_trip(&mut serialiser, &original);
    assert!(decoded.samples.is_empty());
    assert!(decoded.tags.is_empty());
    assert!(decoded.codes.is_empty());
    assert!(decoded.attrs.is_empty());
    assert_eq!(decoded, original);
}

#[test]
fn nullable_scalar_null_overwrites_present_target() {
    // a wire null is a value, not an absent field: it must clear the target
    let mut serialiser = serialiser();
    let source = Telemetry {
        limit: None,
        ..rich_value()
    };
    let mut writer = Writer::new();
    serialiser.serialise_object(&mut writer, &source).unwrap();
    let bytes = writer.flush();

    let mut target = Telemetry {
        limit: Some(9),
        ..Telemetry::default()
    };
    serialiser
        .deserialise_object(&mut Reader::new(&bytes), &mut target)
        .unwrap();
    assert_eq!(target.limit, None);
}

#[test]
fn absent_optional_composite_stays_absent() {
    let mut serialiser = serialiser();
    let original = Telemetry {
        extra: None,
        ..rich_value()
    };
    let decoded = round_trip(&mut serialiser, &original);
    assert_eq!(decoded.extra, None);
    assert_eq!(decoded, original);
}

#[test]
fn repeated_round_trips_reuse_one_serialiser() {
    // the shared match cache must stay correct across many calls
    let mut serialiser = serialiser();
    for i in 0..5 {
        let mut value = rich_value();
        value.id = i;
        assert_eq!(round_trip(&mut serialiser, &value), value);
    }
    assert!(serialiser.cache().len() > 0);
}
