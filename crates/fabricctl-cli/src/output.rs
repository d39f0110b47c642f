use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;
use fabricctl_reconcile::ReconcileOutcome;

pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).unwrap());
        }
        OutputFormat::Table => print_as_table(value),
    }
}

/// Pass result: a colored changed/unchanged line, then the converged record.
pub fn print_outcome(outcome: &ReconcileOutcome, check: bool, format: OutputFormat) {
    if outcome.changed {
        if check {
            print_success("Would change (check mode, nothing transmitted)");
        } else {
            print_success("Changed");
        }
    } else {
        println!("{} No change", "=".cyan());
    }
    match serde_json::to_value(outcome) {
        Ok(value) => print_value(&value, format),
        Err(e) => print_error(&format!("Failed to render outcome: {e}")),
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn print_as_table(value: &Value) {
    match value {
        Value::Array(records) => {
            if records.is_empty() {
                println!("No entries found.");
                return;
            }
            let columns = scalar_columns(records);
            let mut builder = Builder::default();
            builder.push_record(columns.iter().map(String::as_str));
            for record in records {
                builder.push_record(columns.iter().map(|c| cell(record, c)));
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
        Value::Object(fields) => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, val) in fields {
                builder.push_record([key.clone(), scalar_repr(val)]);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
        other => println!("{other}"),
    }
}

/// Column set for a record listing: scalar keys of the first record, in
/// document order.
fn scalar_columns(records: &[Value]) -> Vec<String> {
    records
        .first()
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter(|(_, v)| !v.is_object() && !v.is_array())
                .map(|(k, _)| k.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn cell(record: &Value, column: &str) -> String {
    record.get(column).map(scalar_repr).unwrap_or_default()
}

fn scalar_repr(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Array(a) => format!("[{} entries]", a.len()),
        Value::Object(_) => "{...}".to_string(),
        other => other.to_string(),
    }
}
