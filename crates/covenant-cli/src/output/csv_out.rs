use serde_json::Value;
use std::io;

use super::{plain, result_of};

const RECORD_FIELDS: [&str; 10] = [
    "covenant_id",
    "loan_id",
    "period_id",
    "period_end_date",
    "threshold",
    "calculated_value",
    "headroom_absolute",
    "headroom_percentage",
    "status",
    "cure_deadline",
];

/// Write output as CSV to stdout: one row per covenant test for batch runs,
/// two-column field/value otherwise.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let result = result_of(value);

    for row in csv_rows(result) {
        let _ = wtr.write_record(&row);
    }

    let _ = wtr.flush();
}

fn csv_rows(result: &Value) -> Vec<Vec<String>> {
    let mut rows = Vec::new();

    match result {
        Value::Object(map) => {
            if let Some(Value::Array(records)) = map.get("records") {
                rows.push(RECORD_FIELDS.iter().map(|f| f.to_string()).collect());
                for record in records {
                    rows.push(
                        RECORD_FIELDS
                            .iter()
                            .map(|f| {
                                record
                                    .get(*f)
                                    .or_else(|| record["result"].get(*f))
                                    .map(plain)
                                    .unwrap_or_default()
                            })
                            .collect(),
                    );
                }
            } else {
                rows.push(vec!["field".into(), "value".into()]);
                for (key, val) in map {
                    rows.push(vec![key.clone(), plain(val)]);
                }
            }
        }
        other => rows.push(vec![plain(other)]),
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_rows_flatten_result() {
        let result = json!({
            "records": [{
                "covenant_id": "cov-1",
                "loan_id": "loan-acme",
                "period_id": "q4",
                "period_end_date": "2024-12-31",
                "threshold": "1.25",
                "result": {
                    "calculated_value": "1.3725",
                    "headroom_absolute": "0.1225",
                    "headroom_percentage": "9.8",
                    "status": "warning"
                }
            }]
        });
        let rows = csv_rows(&result);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "covenant_id");
        assert_eq!(rows[1][8], "warning");
        assert_eq!(rows[1][9], "");
    }

    #[test]
    fn test_single_result_rows() {
        let rows = csv_rows(&json!({ "status": "breach" }));
        assert_eq!(rows, vec![vec!["field", "value"], vec!["status", "breach"]]);
    }
}
