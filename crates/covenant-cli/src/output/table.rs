use colored::Colorize;
use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{plain, result_of};

const RECORD_COLUMNS: [(&str, &str); 7] = [
    ("Covenant", "covenant_name"),
    ("Loan", "loan_id"),
    ("Period End", "period_end_date"),
    ("Value", "calculated_value"),
    ("Threshold", "threshold"),
    ("Headroom %", "headroom_percentage"),
    ("Status", "status"),
];

/// Format output as tables: one row per covenant test for batch runs, a
/// field/value table for a single evaluation.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    match result.get("records") {
        Some(Value::Array(records)) => print_batch(result, records),
        _ => print_fields(result),
    }

    if let Some(Value::Array(alerts)) = value.get("alerts") {
        if !alerts.is_empty() {
            println!("\nAlerts:");
            for alert in alerts {
                let severity = plain(&alert["severity"]);
                let line = format!("  [{}] {}", severity, plain(&alert["message"]));
                if severity == "high" {
                    println!("{}", line.red());
                } else {
                    println!("{}", line.yellow());
                }
            }
        }
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_fields(result: &Value) {
    let Value::Object(map) = result else {
        println!("{}", plain(result));
        return;
    };

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &plain(val)]);
    }
    println!("{}", Table::from(builder));

    if let Some(status) = map.get("status").and_then(Value::as_str) {
        println!("\nStatus: {}", colour_status(status));
    }
}

fn print_batch(result: &Value, records: &[Value]) {
    if records.is_empty() {
        println!("(no covenant tests recorded)");
    } else {
        let mut builder = Builder::default();
        builder.push_record(RECORD_COLUMNS.iter().map(|(header, _)| *header));
        for record in records {
            builder.push_record(RECORD_COLUMNS.iter().map(|(_, key)| record_cell(record, key)));
        }
        println!("{}", Table::from(builder));
    }

    if let Some(Value::Array(failures)) = result.get("failures") {
        if !failures.is_empty() {
            let mut builder = Builder::default();
            builder.push_record(["Covenant", "Period", "Kind", "Reason"]);
            for f in failures {
                builder.push_record([
                    plain(&f["covenant_id"]),
                    plain(&f["period_id"]),
                    plain(&f["kind"]),
                    plain(&f["message"]),
                ]);
            }
            println!("\nFailed tests:\n{}", Table::from(builder));
        }
    }

    println!(
        "\n{} compliant, {} warning, {} breach, {} failed",
        plain(&result["compliant_count"]).green(),
        plain(&result["warning_count"]).yellow(),
        plain(&result["breach_count"]).red(),
        result["failures"].as_array().map_or(0, Vec::len),
    );
}

/// Cells come from the record itself or its nested `result`.
fn record_cell(record: &Value, key: &str) -> String {
    record
        .get(key)
        .or_else(|| record.get("result").and_then(|r| r.get(key)))
        .map(plain)
        .unwrap_or_default()
}

fn colour_status(status: &str) -> String {
    match status {
        "compliant" => status.green().to_string(),
        "warning" => status.yellow().to_string(),
        "breach" => status.red().bold().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_cell_reads_nested_result() {
        let record = json!({
            "covenant_name": "Max Total Leverage",
            "threshold": "4.0",
            "result": { "status": "warning", "headroom_percentage": "4.0" }
        });
        assert_eq!(record_cell(&record, "covenant_name"), "Max Total Leverage");
        assert_eq!(record_cell(&record, "status"), "warning");
        assert_eq!(record_cell(&record, "headroom_percentage"), "4.0");
        assert_eq!(record_cell(&record, "loan_id"), "");
    }
}
