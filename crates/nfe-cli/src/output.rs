//! Record renderers.

use nfe_core::invoice::convert::{parse_brl_amount, parse_emission_timestamp};
use nfe_core::models::record::{FieldResult, InvoiceRecord};

/// Output format for a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty JSON, sorted keys
    Json,
    /// One row per field or composite part
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn format_record(record: &InvoiceRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(record.to_json_pretty()?),
        OutputFormat::Csv => format_csv(record),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

/// Typed reading of a captured value: ISO timestamp for the emission date,
/// plain decimal for amounts.
fn typed_value(field: &str, value: &str) -> Option<String> {
    if field == "invoice_creation" {
        return parse_emission_timestamp(value)
            .ok()
            .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string());
    }

    let looks_numeric = value.contains(',')
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '%' | ' '));
    if looks_numeric {
        parse_brl_amount(value).ok().map(|d| d.to_string())
    } else {
        None
    }
}

fn rows(record: &InvoiceRecord) -> Vec<(String, String, Option<String>)> {
    let mut rows = Vec::new();
    for (field, result) in record.iter() {
        match result {
            FieldResult::Scalar(s) => rows.push((field.to_string(), String::new(), s.value.clone())),
            FieldResult::Composite(c) => {
                for (part, sub) in &c.parts {
                    rows.push((field.to_string(), part.clone(), sub.value.clone()));
                }
            }
        }
    }
    rows
}

fn format_csv(record: &InvoiceRecord) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["field", "part", "value", "typed"])?;

    for (field, part, value) in rows(record) {
        let typed = value.as_deref().and_then(|v| typed_value(&field, v)).unwrap_or_default();
        wtr.write_record([field.as_str(), part.as_str(), value.as_deref().unwrap_or(""), typed.as_str()])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(record: &InvoiceRecord) -> String {
    let mut output = String::new();

    match record.city() {
        Some(city) => output.push_str(&format!("Layout: {}\n\n", city)),
        None => {
            output.push_str("No layout resolved; nothing extracted.\n");
            return output;
        }
    }

    for (field, result) in record.iter() {
        match result {
            FieldResult::Scalar(s) => {
                if s.raw.is_none() {
                    continue;
                }
                let value = s.value.as_deref().unwrap_or("-");
                match typed_value(field, value) {
                    Some(typed) if typed != value => {
                        output.push_str(&format!("{}: {} ({})\n", field, value, typed))
                    }
                    _ => output.push_str(&format!("{}: {}\n", field, value)),
                }
            }
            FieldResult::Composite(c) => {
                output.push_str(&format!("{}:\n", field));
                for (part, sub) in &c.parts {
                    output.push_str(&format!("  {}: {}\n", part, sub.value.as_deref().unwrap_or("-")));
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfe_core::models::record::{CompositeField, LocaleVariant, ScalarField};

    fn sample() -> InvoiceRecord {
        let mut builder = InvoiceRecord::builder();
        builder.city(LocaleVariant::SaoPaulo);
        builder.set(
            "invoice_creation",
            FieldResult::Scalar(ScalarField::captured(
                Some("05/03/2021 14:32:10".into()),
                "Data e Hora de Emissão 05/03/2021 14:32:10",
            )),
        );
        builder.set(
            "invoice_value_raw",
            FieldResult::Scalar(ScalarField::captured(Some("1.234,56".into()), "Valor 1.234,56")),
        );
        builder.set(
            "invoice_client",
            FieldResult::Composite(
                CompositeField::new("Tomador")
                    .with_part("zip_code", Some("01305-000".into()))
                    .with_part("email", None),
            ),
        );
        builder.build()
    }

    #[test]
    fn test_typed_values() {
        assert_eq!(typed_value("invoice_value_raw", "1.234,56").as_deref(), Some("1234.56"));
        assert_eq!(
            typed_value("invoice_creation", "05/03/2021 14:32:10").as_deref(),
            Some("2021-03-05T14:32:10")
        );
        assert_eq!(typed_value("invoice_service", "02800 - Análise"), None);
    }

    #[test]
    fn test_csv_has_row_per_part() {
        let csv = format_record(&sample(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "field,part,value,typed");
        assert!(lines.contains(&"invoice_client,email,,"));
        assert!(lines.contains(&"invoice_client,zip_code,01305-000,"));
        assert!(lines.contains(&"invoice_value_raw,,\"1.234,56\",1234.56"));
    }

    #[test]
    fn test_text_summary() {
        let text = format_record(&sample(), OutputFormat::Text).unwrap();

        assert!(text.starts_with("Layout: SP\n"));
        assert!(text.contains("invoice_value_raw: 1.234,56 (1234.56)\n"));
        assert!(text.contains("  email: -\n"));
        assert!(!text.contains("invoice_city"));
    }

    #[test]
    fn test_empty_record_renders() {
        let empty = InvoiceRecord::default();
        assert_eq!(format_record(&empty, OutputFormat::Json).unwrap(), "{}");
        assert!(format_record(&empty, OutputFormat::Text).unwrap().starts_with("No layout"));
    }
}
