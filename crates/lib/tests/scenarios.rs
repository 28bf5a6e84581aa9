//! End-to-end scenarios crossing the parsing, algebra, aggregation and
//! analytics layers.

use pretty_assertions::assert_eq;

use tempora_core::datum::Datum;
use tempora_core::span::Span;
use tempora_core::spanset::SpanSet;
use tempora_core::temporal::{TemporalOps, Temporal};
use tempora_core::timestamp::TimestampTz;
use tempora_core::types::{BaseType, TempType};
use tempora_helpers::CancelToken;
use tempora_lib::aggregate::{tagg_finalfn, tmin_transfn};
use tempora_lib::analytics::{frechet_distance, simplify_dp};
use tempora_lib::io::text::{span_in, spanset_in, temporal_in, temporal_out};

fn ts(s: &str) -> TimestampTz {
    TimestampTz::parse(s).unwrap()
}

#[test]
fn float_span_topology_from_text() {
    let a = span_in("[1.0, 5.0)", BaseType::Float).unwrap();
    let b = span_in("(3.0, 7.0]", BaseType::Float).unwrap();

    assert!(!a.contains(&b).unwrap());
    assert!(a.overlaps(&b).unwrap());
    assert!(!a.adjacent(&b).unwrap());
    assert_eq!(
        a.intersection(&b).unwrap().unwrap(),
        span_in("(3.0, 5.0)", BaseType::Float).unwrap()
    );
    let union = a.union(&b).unwrap();
    assert_eq!(union, span_in("[1.0, 7.0]", BaseType::Float).unwrap());
    assert!(union.contains(&a).unwrap() && union.contains(&b).unwrap());
    assert_eq!(a.distance(&b).unwrap(), 0.0);

    assert_eq!(a.intersection(&a).unwrap().unwrap(), a);
}

#[test]
fn restriction_inserts_a_crossing_and_merges_back() {
    let t = temporal_in(
        "[1@2000-01-01 00:00:00+00, 5@2000-01-05 00:00:00+00]",
        TempType::Tfloat,
    )
    .unwrap();

    // restrict_at(T, 3.0) is the single interpolated instant.
    let at = t.at_value(&Datum::Float(3.0)).unwrap().unwrap();
    assert_eq!(at.num_instants(), 1);
    assert_eq!(at.start_timestamp(), ts("2000-01-03"));
    assert_eq!(at.value_at(ts("2000-01-03")), Some(Datum::Float(3.0)));

    // T == merge(at(T, P), minus(T, P)) for any period set P.
    let periods = spanset_in(
        "{[2000-01-01 12:00:00+00, 2000-01-02 12:00:00+00), [2000-01-04 00:00:00+00, 2000-01-06 00:00:00+00)}",
        BaseType::Timestamp,
    )
    .unwrap();
    let inside = t.at_period_set(&periods).unwrap().unwrap();
    let outside = t.minus_period_set(&periods).unwrap().unwrap();
    let merged = inside.merge(&outside).unwrap();
    for probe in [
        "2000-01-01 00:00:00+00",
        "2000-01-01 18:00:00+00",
        "2000-01-02 12:00:00+00",
        "2000-01-03 00:00:00+00",
        "2000-01-04 00:00:00+00",
        "2000-01-05 00:00:00+00",
    ] {
        assert_eq!(merged.value_at(ts(probe)), t.value_at(ts(probe)), "at {probe}");
    }
    assert_eq!(merged.time_span(), t.time_span());
}

#[test]
fn value_at_of_a_restriction_matches_the_original() {
    let t = temporal_in(
        "[1@2000-01-01 00:00:00+00, 5@2000-01-05 00:00:00+00, 2@2000-01-08 00:00:00+00]",
        TempType::Tfloat,
    )
    .unwrap();
    let period = Span::period(ts("2000-01-02"), ts("2000-01-06"), true, true).unwrap();
    let clipped = t.at_period(&period).unwrap().unwrap();
    for probe in ["2000-01-02", "2000-01-04", "2000-01-05", "2000-01-06"] {
        assert_eq!(clipped.value_at(ts(probe)), t.value_at(ts(probe)), "at {probe}");
    }
}

#[test]
fn bbox_covers_every_observation() {
    let t = temporal_in(
        "{1@2000-01-01, 7@2000-01-03, 3@2000-01-06}",
        TempType::Tint,
    )
    .unwrap();
    let bbox = t.bbox();
    let span = bbox.value_span().unwrap();
    let period = bbox.period().unwrap();
    for inst in t.instants() {
        assert!(span.contains_value(inst.value()).unwrap());
        assert!(period
            .contains_value(&Datum::Timestamp(inst.timestamp()))
            .unwrap());
    }
    // And it is tight.
    assert_eq!(span, &Span::int(1, 7, true, true).unwrap());
}

#[test]
fn tmin_aggregation_scenario() {
    // Scenario: two overlapping step tints folded through the skiplist.
    let t1 = temporal_in(
        "Interp=Step;[2@2000-01-01 00:00:00+00, 5@2000-01-03 00:00:00+00, 2@2000-01-04 00:00:00+00]",
        TempType::Tfloat,
    )
    .unwrap();
    let t2 = temporal_in(
        "Interp=Step;[3@2000-01-02 00:00:00+00, 1@2000-01-03 00:00:00+00]",
        TempType::Tfloat,
    )
    .unwrap();

    let state = tmin_transfn(None, &t1).unwrap();
    let state = tmin_transfn(Some(state), &t2).unwrap();
    let result = tagg_finalfn(Some(state)).unwrap().unwrap();

    assert_eq!(result.value_at(ts("2000-01-01")), Some(Datum::Float(2.0)));
    assert_eq!(result.value_at(ts("2000-01-02")), Some(Datum::Float(2.0)));
    assert_eq!(result.value_at(ts("2000-01-03")), Some(Datum::Float(1.0)));
    assert_eq!(
        result.value_at(ts("2000-01-03 12:00:00+00")),
        Some(Datum::Float(5.0))
    );
    assert_eq!(result.value_at(ts("2000-01-04")), Some(Datum::Float(2.0)));
}

#[test]
fn dp_simplification_scenario() {
    let t = temporal_in(
        "[0@2000-01-01 00:00:00+00, 1@2000-01-02 00:00:00+00, 0@2000-01-03 00:00:00+00]",
        TempType::Tfloat,
    )
    .unwrap();
    let token = CancelToken::ignored();

    let kept = simplify_dp(&t, 0.5, true, &token).unwrap();
    assert_eq!(kept, t);

    let simplified = simplify_dp(&t, 2.0, true, &token).unwrap();
    assert_eq!(simplified.num_instants(), 2);
    assert_eq!(
        temporal_out(&simplified, 15),
        "[0@2000-01-01 00:00:00+00, 0@2000-01-03 00:00:00+00]"
    );
}

#[test]
fn self_similarity_is_zero_through_text() {
    let t = temporal_in(
        "[1@2000-01-01 00:00:00+00, 4@2000-01-02 00:00:00+00, 2@2000-01-03 00:00:00+00]",
        TempType::Tfloat,
    )
    .unwrap();
    assert_eq!(frechet_distance(&t, &t, &CancelToken::ignored()).unwrap(), 0.0);
}

#[test]
fn ever_always_with_bbox_prefilter() {
    let t = temporal_in(
        "[1@2000-01-01 00:00:00+00, 5@2000-01-05 00:00:00+00]",
        TempType::Tfloat,
    )
    .unwrap();
    // 3 is attained mid-segment under linear interpolation.
    assert!(t.ever_eq(&Datum::Float(3.0)).unwrap());
    assert!(!t.ever_eq(&Datum::Float(9.0)).unwrap());
    assert!(!t.always_eq(&Datum::Float(3.0)).unwrap());
    assert!(t
        .always_cmp(tempora_core::temporal::CmpOp::Le, &Datum::Float(5.0))
        .unwrap());

    let time = t.time();
    assert_eq!(
        time,
        SpanSet::from_span(Span::period(ts("2000-01-01"), ts("2000-01-05"), true, true).unwrap())
    );
}
