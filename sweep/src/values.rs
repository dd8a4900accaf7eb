use serde_json::{Number, Value as JsonValue};

use crate::error::SweepError;

/// Generates one sweep axis's value list, either from an explicit
/// `manual_values` list or from a `(start, end, increment)` triple. See
/// `spec.md` §4.6.
pub fn generate_axis(
    start: Option<f64>,
    end: Option<f64>,
    increment: Option<f64>,
    manual_values: Option<&[JsonValue]>,
) -> Result<Vec<JsonValue>, SweepError> {
    if let Some(values) = manual_values {
        if !values.is_empty() {
            return Ok(values.to_vec());
        }
    }

    let (start, end, increment) = match (start, end, increment) {
        (Some(s), Some(e), Some(i)) => (s, e, i),
        _ => {
            return Err(SweepError::InvalidAxis(
                "a sweep axis needs either manual_values or start/end/increment".to_string(),
            ))
        }
    };
    if increment == 0.0 {
        return Err(SweepError::InvalidAxis("increment must be nonzero".to_string()));
    }

    // Orient the increment toward `end` regardless of the sign the caller
    // supplied, so `start=20, end=10, increment=5` still walks downward.
    let oriented = if end >= start { increment.abs() } else { -increment.abs() };
    let steps = ((end - start) / oriented + 1e-10).floor() + 1.0;
    if !steps.is_finite() || steps < 1.0 {
        return Err(SweepError::InvalidAxis("sweep axis produced no steps".to_string()));
    }
    let steps = steps as usize;

    let snap_to_integer = start.fract() == 0.0 && end.fract() == 0.0 && increment.fract() == 0.0;
    let mut values = Vec::with_capacity(steps);
    for i in 0..steps {
        let v = start + (i as f64) * oriented;
        values.push(if snap_to_integer {
            JsonValue::Number(Number::from(v.round() as i64))
        } else {
            Number::from_f64(v).map(JsonValue::Number).unwrap_or(JsonValue::Null)
        });
    }
    Ok(values)
}

/// Builds the Cartesian product of `primary` (inner loop) and `secondary`
/// (outer loop) axis values, per `spec.md` §4.6 ("secondary axis iterates
/// outer; primary iterates inner"). Without a secondary axis, each primary
/// value is its own scenario.
pub fn scenarios(primary: &[JsonValue], secondary: Option<&[JsonValue]>) -> Vec<(JsonValue, Option<JsonValue>)> {
    match secondary {
        None => primary.iter().map(|p| (p.clone(), None)).collect(),
        Some(secondary) => secondary
            .iter()
            .flat_map(|s| primary.iter().map(move |p| (p.clone(), Some(s.clone()))))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_triple_snaps_to_integers() {
        let values = generate_axis(Some(10.0), Some(20.0), Some(10.0), None).unwrap();
        assert_eq!(values, vec![json!(10), json!(20)]);
    }

    #[test]
    fn descending_range_orients_increment() {
        let values = generate_axis(Some(20.0), Some(10.0), Some(5.0), None).unwrap();
        assert_eq!(values, vec![json!(20), json!(15), json!(10)]);
    }

    #[test]
    fn fractional_triple_keeps_floats() {
        let values = generate_axis(Some(0.0), Some(1.0), Some(0.5), None).unwrap();
        assert_eq!(values, vec![json!(0.0), json!(0.5), json!(1.0)]);
    }

    #[test]
    fn manual_values_are_used_verbatim() {
        let manual = vec![json!(1), json!(5), json!(9)];
        let values = generate_axis(None, None, None, Some(&manual)).unwrap();
        assert_eq!(values, manual);
    }

    #[test]
    fn secondary_axis_iterates_outer() {
        let primary = vec![json!(1), json!(2)];
        let secondary = vec![json!("a"), json!("b")];
        let combined = scenarios(&primary, Some(&secondary));
        assert_eq!(
            combined,
            vec![
                (json!(1), Some(json!("a"))),
                (json!(2), Some(json!("a"))),
                (json!(1), Some(json!("b"))),
                (json!(2), Some(json!("b"))),
            ]
        );
    }

    #[test]
    fn missing_triple_and_manual_is_an_error() {
        assert!(generate_axis(None, None, None, None).is_err());
    }
}
