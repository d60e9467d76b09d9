use serde::{Deserialize, Deserializer, Serialize};

/// One dwell row. Item names are case-folded at matrix build time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DwellEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, alias = "item_name")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub dwell_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    #[serde(default, alias = "item_name")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub click_count: i64,
}

/// Accepts integers, floats (truncated) or null.
fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).map(|v| v as i64).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ClickEvent, DwellEvent};

    #[test]
    fn dwell_rows_tolerate_missing_and_null_fields() {
        let rows: Vec<DwellEvent> = serde_json::from_value(json!([
            {"session_id": "s1", "name": "DoWhy", "dwell_ms": 1200},
            {"session_id": null, "name": "EconML", "dwell_ms": null},
            {"item_name": "CausalML", "dwell_ms": 350.7}
        ]))
        .expect("dwell rows");

        assert_eq!(rows[0].dwell_ms, 1200);
        assert_eq!(rows[1].session_id, None);
        assert_eq!(rows[1].dwell_ms, 0);
        assert_eq!(rows[2].name.as_deref(), Some("CausalML"));
        assert_eq!(rows[2].dwell_ms, 350);
    }

    #[test]
    fn click_rows_default_count_to_zero() {
        let row: ClickEvent = serde_json::from_value(json!({"name": "DoWhy"})).expect("click row");
        assert_eq!(row.click_count, 0);
    }
}
