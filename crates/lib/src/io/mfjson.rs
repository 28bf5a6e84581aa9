//! OGC Moving Features JSON encoding of temporal values: emission into
//! `serde_json` trees and parsing back.

use serde_json::{json, Map, Value};

use tempora_core::datum::Datum;
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::geo::GeoPoint;
use tempora_core::temporal::{
    Bbox, TInstant, TInstantSet, TSequence, TSequenceSet, Temporal, TemporalOps,
};
use tempora_core::timestamp::TimestampTz;
use tempora_core::types::{Interp, TempType};

fn round_to(value: f64, precision: usize) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

fn datetime_out(t: TimestampTz) -> String {
    t.to_datetime().to_rfc3339()
}

fn datetime_in(text: &str) -> TemporalResult<TimestampTz> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|dt| TimestampTz::from_micros(dt.timestamp_micros()))
        .map_err(|_| TemporalError::parse(format!("invalid datetime {text:?}"), 0))
}

fn mfjson_type(temptype: TempType) -> TemporalResult<&'static str> {
    Ok(match temptype {
        TempType::Tbool => "MovingBoolean",
        TempType::Tint | TempType::Tfloat => "MovingFloat",
        TempType::Ttext => "MovingText",
        TempType::Tgeompoint | TempType::Tgeogpoint => "MovingPoint",
        other => {
            return Err(TemporalError::mismatch(format!(
                "{} has no MF-JSON form",
                <&'static str>::from(other)
            )));
        }
    })
}

fn value_key(temptype: TempType) -> &'static str {
    if temptype.is_spatial() {
        "coordinates"
    } else {
        "values"
    }
}

fn value_out(value: &Datum, precision: usize) -> TemporalResult<Value> {
    Ok(match value {
        Datum::Bool(v) => json!(v),
        Datum::Int(v) => json!(v),
        Datum::Float(v) => json!(round_to(*v, precision)),
        Datum::Text(v) => json!(v.as_str()),
        Datum::Geom(p) | Datum::Geog(p) => match p.z {
            Some(z) => json!([
                round_to(p.x, precision),
                round_to(p.y, precision),
                round_to(z, precision)
            ]),
            None => json!([round_to(p.x, precision), round_to(p.y, precision)]),
        },
        other => {
            return Err(TemporalError::mismatch(format!(
                "{} has no MF-JSON form",
                <&'static str>::from(other.basetype())
            )));
        }
    })
}

fn interpolation_name(temp: &Temporal) -> &'static str {
    match temp.interp() {
        Interp::Discrete => "Discrete",
        Interp::Step => "Step",
        Interp::Linear => "Linear",
    }
}

fn instants_object(
    instants: &[TInstant],
    temptype: TempType,
    precision: usize,
    lower_inc: Option<bool>,
    upper_inc: Option<bool>,
) -> TemporalResult<Map<String, Value>> {
    let mut object = Map::new();
    let values = instants
        .iter()
        .map(|inst| value_out(inst.value(), precision))
        .collect::<TemporalResult<Vec<_>>>()?;
    let datetimes: Vec<Value> = instants
        .iter()
        .map(|inst| json!(datetime_out(inst.timestamp())))
        .collect();
    object.insert(value_key(temptype).to_string(), Value::Array(values));
    object.insert("datetimes".to_string(), Value::Array(datetimes));
    if let Some(lower_inc) = lower_inc {
        object.insert("lower_inc".to_string(), json!(lower_inc));
    }
    if let Some(upper_inc) = upper_inc {
        object.insert("upper_inc".to_string(), json!(upper_inc));
    }
    Ok(object)
}

/// Emit a temporal value as MF-JSON. `with_bbox` adds the bounding box
/// and period; `srs` adds a named CRS.
pub fn temporal_as_mfjson(
    temp: &Temporal,
    precision: usize,
    with_bbox: bool,
    srs: Option<&str>,
) -> TemporalResult<String> {
    let temptype = temp.temptype();
    let mut root = Map::new();
    root.insert("type".to_string(), json!(mfjson_type(temptype)?));
    if let Some(srs) = srs {
        root.insert(
            "crs".to_string(),
            json!({"type": "Name", "properties": {"name": srs}}),
        );
    }

    match temp {
        Temporal::Instant(inst) => {
            let body = instants_object(
                std::slice::from_ref(inst),
                temptype,
                precision,
                None,
                None,
            )?;
            root.extend(body);
        }
        Temporal::InstantSet(iset) => {
            root.extend(instants_object(iset.instants(), temptype, precision, None, None)?);
        }
        Temporal::Sequence(seq) => {
            root.extend(instants_object(
                seq.instants(),
                temptype,
                precision,
                Some(seq.lower_inc()),
                Some(seq.upper_inc()),
            )?);
        }
        Temporal::SequenceSet(ss) => {
            let sequences = ss
                .sequences()
                .iter()
                .map(|seq| {
                    instants_object(
                        seq.instants(),
                        temptype,
                        precision,
                        Some(seq.lower_inc()),
                        Some(seq.upper_inc()),
                    )
                    .map(Value::Object)
                })
                .collect::<TemporalResult<Vec<_>>>()?;
            root.insert("sequences".to_string(), Value::Array(sequences));
        }
    }
    root.insert("interpolation".to_string(), json!(interpolation_name(temp)));

    if with_bbox {
        match temp.bbox() {
            Bbox::STBox(stbox) => {
                if let Some(dims) = stbox.space() {
                    let bbox = match dims.z {
                        Some((zmin, zmax)) => json!([
                            dims.xmin, dims.ymin, zmin, dims.xmax, dims.ymax, zmax
                        ]),
                        None => json!([dims.xmin, dims.ymin, dims.xmax, dims.ymax]),
                    };
                    root.insert("bbox".to_string(), bbox);
                }
            }
            Bbox::TBox(tbox) => {
                if let Some(span) = tbox.x() {
                    if let (Some(lo), Some(hi)) = (span.lower.as_number(), span.upper.as_number())
                    {
                        root.insert("bbox".to_string(), json!([lo, hi]));
                    }
                }
            }
            Bbox::Period(_) => {}
        }
        let period = temp.time_span();
        if let (Some(begin), Some(end)) =
            (period.lower.as_timestamp(), period.upper.as_timestamp())
        {
            root.insert(
                "period".to_string(),
                json!({"begin": datetime_out(begin), "end": datetime_out(end)}),
            );
        }
    }

    serde_json::to_string(&Value::Object(root))
        .map_err(|e| TemporalError::parse(format!("cannot serialize: {e}"), 0))
}

/*************************** parsing ***************************/

fn value_in(value: &Value, temptype: TempType) -> TemporalResult<Datum> {
    let invalid = || TemporalError::parse("invalid MF-JSON value", 0);
    match temptype {
        TempType::Tbool => value.as_bool().map(Datum::Bool).ok_or_else(invalid),
        TempType::Tint => value
            .as_i64()
            .map(|v| Datum::Int(v as i32))
            .ok_or_else(invalid),
        TempType::Tfloat => value.as_f64().map(Datum::Float).ok_or_else(invalid),
        TempType::Ttext => value
            .as_str()
            .map(Datum::text)
            .ok_or_else(invalid),
        TempType::Tgeompoint | TempType::Tgeogpoint => {
            let coords = value.as_array().ok_or_else(invalid)?;
            let nums: Vec<f64> = coords
                .iter()
                .map(|c| c.as_f64().ok_or_else(invalid))
                .collect::<TemporalResult<_>>()?;
            let point = match nums.len() {
                2 => GeoPoint {
                    x: nums[0],
                    y: nums[1],
                    z: None,
                    srid: 0,
                    geodetic: temptype == TempType::Tgeogpoint,
                },
                3 => GeoPoint {
                    x: nums[0],
                    y: nums[1],
                    z: Some(nums[2]),
                    srid: 0,
                    geodetic: temptype == TempType::Tgeogpoint,
                },
                _ => return Err(invalid()),
            };
            Ok(if temptype == TempType::Tgeogpoint {
                Datum::Geog(point)
            } else {
                Datum::Geom(point)
            })
        }
        _ => Err(invalid()),
    }
}

fn instants_in(object: &Value, temptype: TempType) -> TemporalResult<Vec<TInstant>> {
    let invalid = |msg: &str| TemporalError::parse(msg.to_string(), 0);
    let values = object
        .get(value_key(temptype))
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing values"))?;
    let datetimes = object
        .get("datetimes")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing datetimes"))?;
    if values.len() != datetimes.len() {
        return Err(invalid("values and datetimes differ in length"));
    }
    values
        .iter()
        .zip(datetimes)
        .map(|(value, datetime)| {
            let datum = value_in(value, temptype)?;
            let t = datetime_in(
                datetime
                    .as_str()
                    .ok_or_else(|| invalid("datetime is not a string"))?,
            )?;
            TInstant::new(temptype, datum, t)
        })
        .collect()
}

/// Parse an MF-JSON document into a temporal value of the given type.
pub fn temporal_from_mfjson(text: &str, temptype: TempType) -> TemporalResult<Temporal> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| TemporalError::parse(format!("invalid JSON: {e}"), e.column()))?;

    let interp = match root.get("interpolation").and_then(Value::as_str) {
        Some("Linear") => Interp::Linear,
        Some("Step") => Interp::Step,
        _ => Interp::Discrete,
    };

    if let Some(sequences) = root.get("sequences").and_then(Value::as_array) {
        let parsed = sequences
            .iter()
            .map(|object| {
                let instants = instants_in(object, temptype)?;
                let lower_inc = object
                    .get("lower_inc")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                let upper_inc = object
                    .get("upper_inc")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                let seq_interp = if interp == Interp::Discrete {
                    Interp::default_for(temptype)
                } else {
                    interp
                };
                if instants.len() == 1 {
                    TSequence::new(instants, seq_interp, true, true)
                } else {
                    TSequence::new(instants, seq_interp, lower_inc, upper_inc)
                }
            })
            .collect::<TemporalResult<Vec<_>>>()?;
        return Ok(Temporal::SequenceSet(TSequenceSet::new(parsed)?));
    }

    let instants = instants_in(&root, temptype)?;
    match interp {
        Interp::Discrete => Ok(match instants.len() {
            1 => Temporal::Instant(instants.into_iter().next().unwrap()),
            _ => Temporal::InstantSet(TInstantSet::new(instants)?),
        }),
        _ => {
            let lower_inc = root
                .get("lower_inc")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            let upper_inc = root
                .get("upper_inc")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if instants.len() == 1 {
                return Ok(Temporal::Sequence(TSequence::new(
                    instants,
                    interp,
                    true,
                    true,
                )?));
            }
            Ok(Temporal::Sequence(TSequence::new(
                instants, interp, lower_inc, upper_inc,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    fn point_seq() -> Temporal {
        Temporal::Sequence(
            TSequence::new(
                vec![
                    TInstant::new(
                        TempType::Tgeompoint,
                        Datum::Geom(GeoPoint::new_2d(1.0, 2.0, 0)),
                        ts("2000-01-01"),
                    )
                    .unwrap(),
                    TInstant::new(
                        TempType::Tgeompoint,
                        Datum::Geom(GeoPoint::new_2d(3.0, 4.0, 0)),
                        ts("2000-01-02"),
                    )
                    .unwrap(),
                ],
                Interp::Linear,
                true,
                true,
            )
            .unwrap(),
        )
    }

    #[test]
    fn moving_point_round_trip() {
        let temp = point_seq();
        let text = temporal_as_mfjson(&temp, 6, false, None).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["type"], "MovingPoint");
        assert_eq!(parsed["interpolation"], "Linear");
        assert_eq!(parsed["coordinates"][0], json!([1.0, 2.0]));

        let back = temporal_from_mfjson(&text, TempType::Tgeompoint).unwrap();
        assert_eq!(back, temp);
    }

    #[test]
    fn moving_float_with_bbox_and_crs() {
        let temp = Temporal::Sequence(
            TSequence::tfloat_linear(&[(1.5, ts("2000-01-01")), (2.5, ts("2000-01-02"))])
                .unwrap(),
        );
        let text = temporal_as_mfjson(&temp, 3, true, Some("EPSG:4326")).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["type"], "MovingFloat");
        assert_eq!(parsed["bbox"], json!([1.5, 2.5]));
        assert_eq!(parsed["crs"]["properties"]["name"], "EPSG:4326");
        assert!(parsed["period"]["begin"].as_str().unwrap().starts_with("2000-01-01"));

        let back = temporal_from_mfjson(&text, TempType::Tfloat).unwrap();
        assert_eq!(back, temp);
    }

    #[test]
    fn discrete_values_become_instant_sets() {
        let temp = Temporal::InstantSet(
            TInstantSet::new(vec![
                TInstant::tfloat(1.0, ts("2000-01-01")),
                TInstant::tfloat(2.0, ts("2000-01-02")),
            ])
            .unwrap(),
        );
        let text = temporal_as_mfjson(&temp, 6, false, None).unwrap();
        let back = temporal_from_mfjson(&text, TempType::Tfloat).unwrap();
        assert_eq!(back, temp);
    }

    #[test]
    fn sequence_sets_nest() {
        let ss = Temporal::SequenceSet(
            TSequenceSet::new(vec![
                TSequence::tfloat_linear(&[(1.0, ts("2000-01-01")), (2.0, ts("2000-01-02"))])
                    .unwrap(),
                TSequence::tfloat_linear(&[(5.0, ts("2000-01-05")), (6.0, ts("2000-01-06"))])
                    .unwrap(),
            ])
            .unwrap(),
        );
        let text = temporal_as_mfjson(&ss, 6, false, None).unwrap();
        let back = temporal_from_mfjson(&text, TempType::Tfloat).unwrap();
        assert_eq!(back, ss);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        temporal_from_mfjson("{", TempType::Tfloat).unwrap_err();
        temporal_from_mfjson("{\"type\": \"MovingFloat\"}", TempType::Tfloat).unwrap_err();
    }
}
