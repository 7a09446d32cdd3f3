use primemover_kernel::reporter::Reporter;

/// Render one [`Reporter`] snapshot as JSON (spec §6: `int | float | string |
/// null`). Statistics are boxed `dyn Any`; a value this renderer doesn't
/// know how to downcast is dropped rather than failing the whole snapshot,
/// since an unrelated reporter's novel statistic type shouldn't break
/// every other reporter's output.
pub fn snapshot_json(reporter: &dyn Reporter) -> serde_json::Value {
    let mut statistics = serde_json::Map::new();
    for (key, value) in reporter.statistics() {
        let rendered = if let Some(v) = value.downcast_ref::<i64>() {
            serde_json::Value::from(*v)
        } else if let Some(v) = value.downcast_ref::<u64>() {
            serde_json::Value::from(*v)
        } else if let Some(v) = value.downcast_ref::<f64>() {
            serde_json::Value::from(*v)
        } else if let Some(v) = value.downcast_ref::<String>() {
            serde_json::Value::from(v.clone())
        } else if let Some(v) = value.downcast_ref::<bool>() {
            serde_json::Value::from(*v)
        } else {
            serde_json::Value::Null
        };
        statistics.insert(key, rendered);
    }
    serde_json::json!({
        "name": reporter.name(),
        "type": reporter.kind(),
        "statistics": statistics,
    })
}

/// Render every reporter's snapshot as a single JSON array, in the order
/// given.
pub fn render_json(reporters: &[&dyn Reporter]) -> serde_json::Value {
    serde_json::Value::Array(reporters.iter().map(|r| snapshot_json(*r)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use primemover_kernel::reporter::Statistics;

    struct Counter(u64);

    impl Reporter for Counter {
        fn name(&self) -> &str {
            "counter"
        }
        fn kind(&self) -> &str {
            "Counter"
        }
        fn statistics(&self) -> Statistics {
            let mut stats: Statistics = Statistics::new();
            stats.insert("value".to_string(), Box::new(self.0));
            stats
        }
    }

    #[test]
    fn renders_a_snapshot_array() {
        let counter = Counter(42);
        let reporters: Vec<&dyn Reporter> = vec![&counter];
        let json = render_json(&reporters);
        assert_eq!(json[0]["name"], "counter");
        assert_eq!(json[0]["type"], "Counter");
        assert_eq!(json[0]["statistics"]["value"], 42);
    }

    struct Opaque;

    impl Reporter for Opaque {
        fn name(&self) -> &str {
            "opaque"
        }
        fn kind(&self) -> &str {
            "Unknown"
        }
        fn statistics(&self) -> Statistics {
            let mut stats: Statistics = Statistics::new();
            stats.insert("thing".to_string(), Box::new(std::time::Instant::now()));
            stats
        }
    }

    #[test]
    fn undowncastable_statistic_renders_as_json_null() {
        let json = snapshot_json(&Opaque);
        assert!(json["statistics"]["thing"].is_null());
    }
}
