//! Field rule tables for the supported municipal layouts.

pub mod patterns;
mod rio;
mod sao_paulo;

use regex::Regex;
use std::collections::HashSet;

use crate::error::ExtractionError;
use crate::models::record::{CompositeField, FieldResult, LocaleVariant, ScalarField};

use super::Result;
use patterns::first_value;

/// Threshold for eight-letter labels, where a single misread character
/// already drops the score to 87.5.
pub const SHORT_LABEL_THRESHOLD: f64 = 85.0;

/// How a value is pulled out of a block once its label matched.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// First match of the pattern.
    First(&'static Regex),
    /// First match of `value` in the text following the first `anchor`.
    After {
        anchor: &'static Regex,
        value: &'static Regex,
    },
    /// Ordered alternatives; the first one that matches wins.
    FirstOf(&'static [Regex]),
}

impl Extraction {
    pub fn apply(&self, text: &str) -> Option<String> {
        match self {
            Extraction::First(pattern) => first_value(pattern, text),
            Extraction::After { anchor, value } => {
                let tail = &text[anchor.find(text)?.end()..];
                first_value(value, tail)
            }
            Extraction::FirstOf(patterns) => patterns.iter().find_map(|p| first_value(p, text)),
        }
    }
}

/// Shape of the result a rule produces.
#[derive(Debug, Clone)]
pub enum Capture {
    Scalar(Extraction),
    /// Named parts captured independently from the same block.
    Composite(Vec<(&'static str, Extraction)>),
}

/// One labelled field of an invoice layout.
#[derive(Debug, Clone)]
pub struct FieldRule {
    /// Record key the result is stored under.
    pub field: &'static str,
    /// Lower-case label phrases; any of them may fire the rule.
    pub labels: &'static [&'static str],
    /// Overrides the engine-wide label threshold.
    pub threshold: Option<f64>,
    pub capture: Capture,
}

impl FieldRule {
    pub fn scalar(field: &'static str, labels: &'static [&'static str], extraction: Extraction) -> Self {
        Self {
            field,
            labels,
            threshold: None,
            capture: Capture::Scalar(extraction),
        }
    }

    pub fn composite(
        field: &'static str,
        labels: &'static [&'static str],
        parts: Vec<(&'static str, Extraction)>,
    ) -> Self {
        Self {
            field,
            labels,
            threshold: None,
            capture: Capture::Composite(parts),
        }
    }

    /// Replace the engine-wide threshold for this rule only.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Build the field result from the block that fired the rule.
    ///
    /// Missing captures become null values; the block is always attached.
    pub fn capture(&self, block: &str) -> FieldResult {
        match &self.capture {
            Capture::Scalar(extraction) => {
                FieldResult::Scalar(ScalarField::captured(extraction.apply(block), block))
            }
            Capture::Composite(parts) => FieldResult::Composite(
                parts
                    .iter()
                    .fold(CompositeField::new(block), |field, (name, extraction)| {
                        field.with_part(*name, extraction.apply(block))
                    }),
            ),
        }
    }
}

/// Rule table for a layout.
pub fn rules_for(locale: LocaleVariant) -> &'static [FieldRule] {
    match locale {
        LocaleVariant::RioDeJaneiro => rio::RULES.as_slice(),
        LocaleVariant::SaoPaulo => sao_paulo::RULES.as_slice(),
    }
}

/// Check a rule table for entries that could never fire or would collide.
pub fn validate(rules: &[FieldRule]) -> Result<()> {
    let invalid = |field: &str, reason: &str| ExtractionError::InvalidRule {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let mut fields = HashSet::new();
    for rule in rules {
        if rule.labels.is_empty() {
            return Err(invalid(rule.field, "no label phrases"));
        }
        if let Some(label) = rule.labels.iter().find(|l| l.to_lowercase() != **l) {
            return Err(invalid(rule.field, &format!("label {label:?} is not lower-case")));
        }
        if let Some(t) = rule.threshold {
            if !(0.0..100.0).contains(&t) {
                return Err(invalid(rule.field, "threshold outside 0..100"));
            }
        }
        if let Capture::Composite(parts) = &rule.capture {
            let mut names = HashSet::new();
            if parts.is_empty() {
                return Err(invalid(rule.field, "composite without parts"));
            }
            if let Some((name, _)) = parts.iter().find(|(name, _)| !names.insert(*name) || *name == "raw") {
                return Err(invalid(rule.field, &format!("part {name:?} is duplicated or reserved")));
            }
        }
        if !fields.insert(rule.field) {
            return Err(invalid(rule.field, "field defined twice"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tables_are_valid() {
        validate(rules_for(LocaleVariant::RioDeJaneiro)).unwrap();
        validate(rules_for(LocaleVariant::SaoPaulo)).unwrap();
    }

    #[test]
    fn test_validate_rejects_upper_case_label() {
        static LABELS: &[&str] = &["Valor da Nota"];
        let rule = FieldRule::scalar("invoice_value_raw", LABELS, Extraction::First(&patterns::AMOUNT));

        assert!(matches!(
            validate(&[rule]),
            Err(ExtractionError::InvalidRule { field, .. }) if field == "invoice_value_raw"
        ));
    }

    #[test]
    fn test_after_extraction_reads_past_anchor() {
        let extraction = Extraction::After {
            anchor: &patterns::NET_VALUE_LABEL,
            value: &patterns::AMOUNT_BEFORE_SPACE,
        };

        assert_eq!(
            extraction.apply("Valor Total 9,99 Valor Líquido R$ 1.000,00 fim"),
            Some("1.000,00".into())
        );
        assert_eq!(extraction.apply("Valor Total 9,99 fim"), None);
    }

    #[test]
    fn test_composite_parts_fail_independently() {
        static LABELS: &[&str] = &["tomador de serviços"];
        let rule = FieldRule::composite(
            "invoice_client",
            LABELS,
            vec![
                ("zip_code", Extraction::First(&patterns::ZIP_CODE)),
                ("email", Extraction::First(&patterns::EMAIL)),
            ],
        );

        let block = "TOMADOR DE SERVIÇOS CEP: 01310-100 sem email";
        let result = rule.capture(block);
        let composite = result.as_composite().unwrap();

        assert_eq!(composite.part("zip_code"), Some("01310-100"));
        assert_eq!(composite.part("email"), None);
        assert!(composite.parts.contains_key("email"));
        assert_eq!(result.raw(), Some(block));
    }
}
