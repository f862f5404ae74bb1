use serde_json::Value;

use super::{plain, result_of};

/// Print just the headline answer: the status of a single test, or the
/// status counts of a batch run.
pub fn print_minimal(value: &Value) {
    println!("{}", headline(result_of(value)));
}

fn headline(result: &Value) -> String {
    if let Some(status) = result.get("status") {
        return plain(status);
    }

    if result.get("records").is_some() {
        let failed = result["failures"].as_array().map_or(0, Vec::len);
        return format!(
            "compliant={} warning={} breach={} failed={}",
            plain(&result["compliant_count"]),
            plain(&result["warning_count"]),
            plain(&result["breach_count"]),
            failed,
        );
    }

    plain(result)
}
