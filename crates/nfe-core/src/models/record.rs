//! Invoice record data structures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field holding the resolved municipality token.
pub const CITY_FIELD: &str = "invoice_city";

/// Supported municipal invoice layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocaleVariant {
    /// Rio de Janeiro layout.
    #[serde(rename = "RJ")]
    RioDeJaneiro,
    /// São Paulo layout.
    #[serde(rename = "SP")]
    SaoPaulo,
}

impl LocaleVariant {
    /// Resolve the layout from an opaque document hint.
    ///
    /// The hint is searched for the `SP` token first, then `RJ`. Matching is
    /// case-sensitive so lower-case words in a file name never select a layout.
    pub fn from_hint(hint: &str) -> Option<Self> {
        if hint.contains("SP") {
            Some(Self::SaoPaulo)
        } else if hint.contains("RJ") {
            Some(Self::RioDeJaneiro)
        } else {
            None
        }
    }

    /// Token written into the `invoice_city` field.
    pub fn token(&self) -> &'static str {
        match self {
            Self::RioDeJaneiro => "RJ",
            Self::SaoPaulo => "SP",
        }
    }
}

impl fmt::Display for LocaleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Single captured value with the block it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarField {
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ScalarField {
    /// Value without a source block (used for the city token).
    pub fn bare(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            raw: None,
        }
    }

    pub fn captured(value: Option<String>, raw: impl Into<String>) -> Self {
        Self {
            value,
            raw: Some(raw.into()),
        }
    }
}

/// One named part of a composite capture.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubField {
    pub value: Option<String>,
}

/// Several named values captured from one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeField {
    #[serde(flatten)]
    pub parts: BTreeMap<String, SubField>,
    pub raw: String,
}

impl CompositeField {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            parts: BTreeMap::new(),
            raw: raw.into(),
        }
    }

    pub fn with_part(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.parts.insert(name.into(), SubField { value });
        self
    }

    /// Value of one part, `None` when absent or not captured.
    pub fn part(&self, name: &str) -> Option<&str> {
        self.parts.get(name).and_then(|p| p.value.as_deref())
    }
}

/// Result stored for one field of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldResult {
    Scalar(ScalarField),
    Composite(CompositeField),
}

impl FieldResult {
    /// Block that produced this result, if any.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => s.raw.as_deref(),
            Self::Composite(c) => Some(c.raw.as_str()),
        }
    }

    /// Scalar value, `None` for composites and unmatched captures.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => s.value.as_deref(),
            Self::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeField> {
        match self {
            Self::Composite(c) => Some(c),
            Self::Scalar(_) => None,
        }
    }
}

/// Structured extraction result for one document.
///
/// Keys are kept sorted so serialized output is stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceRecord {
    fields: BTreeMap<String, FieldResult>,
}

impl InvoiceRecord {
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldResult> {
        self.fields.get(field)
    }

    /// Scalar value of a field.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldResult::value)
    }

    /// Value of a part of a composite field.
    pub fn part(&self, field: &str, part: &str) -> Option<&str> {
        self.get(field)
            .and_then(FieldResult::as_composite)
            .and_then(|c| c.part(part))
    }

    /// Locale token recorded in the city field.
    pub fn city(&self) -> Option<&str> {
        self.value(CITY_FIELD)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldResult)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Accumulates field results while blocks are processed.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    fields: BTreeMap<String, FieldResult>,
}

impl RecordBuilder {
    /// Record the layout token.
    pub fn city(&mut self, locale: LocaleVariant) -> &mut Self {
        self.fields.insert(
            CITY_FIELD.to_string(),
            FieldResult::Scalar(ScalarField::bare(locale.token())),
        );
        self
    }

    /// Store a result, replacing any earlier result for the same field.
    pub fn set(&mut self, field: impl Into<String>, result: FieldResult) -> &mut Self {
        self.fields.insert(field.into(), result);
        self
    }

    pub fn build(self) -> InvoiceRecord {
        InvoiceRecord {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_locale_from_hint() {
        assert_eq!(LocaleVariant::from_hint("NFSe_SP_0042"), Some(LocaleVariant::SaoPaulo));
        assert_eq!(LocaleVariant::from_hint("nota-RJ-2021"), Some(LocaleVariant::RioDeJaneiro));
        assert_eq!(LocaleVariant::from_hint("RJ_but_SP"), Some(LocaleVariant::SaoPaulo));
        assert_eq!(LocaleVariant::from_hint("invoice_sp_rj"), None);
        assert_eq!(LocaleVariant::from_hint(""), None);
    }

    #[test]
    fn test_locale_resolution_is_deterministic() {
        for hint in ["abcSPdef", "xRJx", "unknown"] {
            let first = LocaleVariant::from_hint(hint);
            for _ in 0..5 {
                assert_eq!(LocaleVariant::from_hint(hint), first);
            }
        }
    }

    #[test]
    fn test_record_serializes_sorted_with_composites() {
        let mut builder = InvoiceRecord::builder();
        builder.set(
            "invoice_num",
            FieldResult::Scalar(ScalarField::captured(Some("123".into()), "Numero da Nota 123")),
        );
        builder.city(LocaleVariant::RioDeJaneiro);
        builder.set(
            "invoice_client",
            FieldResult::Composite(
                CompositeField::new("Tomador de Serviços CEP: 20000-000")
                    .with_part("zip_code", Some("20000-000".into()))
                    .with_part("email", None),
            ),
        );
        let record = builder.build();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "invoice_city": {"value": "RJ"},
                "invoice_client": {
                    "email": {"value": null},
                    "raw": "Tomador de Serviços CEP: 20000-000",
                    "zip_code": {"value": "20000-000"}
                },
                "invoice_num": {"value": "123", "raw": "Numero da Nota 123"}
            })
        );

        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["invoice_city", "invoice_client", "invoice_num"]);
    }

    #[test]
    fn test_record_deserializes_both_shapes() {
        let json = r#"{
            "invoice_city": {"value": "SP"},
            "invoice_provider": {"doc_number": {"value": "12.345.678/0001-90"}, "raw": "Prestador"}
        }"#;
        let record: InvoiceRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.city(), Some("SP"));
        assert_eq!(record.part("invoice_provider", "doc_number"), Some("12.345.678/0001-90"));
        assert_eq!(record.get("invoice_provider").and_then(FieldResult::raw), Some("Prestador"));
    }

    #[test]
    fn test_builder_overwrites_same_field() {
        let mut builder = InvoiceRecord::builder();
        builder.set("invoice_num", FieldResult::Scalar(ScalarField::captured(Some("1".into()), "a")));
        builder.set("invoice_num", FieldResult::Scalar(ScalarField::captured(Some("2".into()), "b")));
        let record = builder.build();

        assert_eq!(record.len(), 1);
        assert_eq!(record.value("invoice_num"), Some("2"));
    }
}
