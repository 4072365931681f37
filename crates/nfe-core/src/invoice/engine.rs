//! Locale-dispatched, label-driven field extraction.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::models::config::ExtractionConfig;
use crate::models::record::{InvoiceRecord, LocaleVariant};

use super::blocks::TextBlock;
use super::fuzzy::partial_ratio;
use super::rules::{rules_for, FieldRule};

/// A rule that fired on a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub field: String,
    /// Position of the block in the block sequence.
    pub block_index: usize,
    /// Best label score for the block.
    pub score: f64,
}

/// Result of running the rule engine over one document.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub record: InvoiceRecord,
    /// Blocks the record was built from, in processing order.
    pub raw_blocks: Vec<String>,
    /// Every rule firing, including ones later overwritten.
    pub matches: Vec<RuleMatch>,
    pub processing_time_ms: u64,
}

impl ExtractionResult {
    fn empty() -> Self {
        Self {
            record: InvoiceRecord::default(),
            raw_blocks: Vec::new(),
            matches: Vec::new(),
            processing_time_ms: 0,
        }
    }
}

/// Applies a layout's rule table to normalized text blocks.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    threshold: f64,
}

impl RuleEngine {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            threshold: config.label_threshold,
        }
    }

    /// Set the default label threshold (0-100).
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Best score of any of the rule's labels against a lower-cased block.
    pub fn label_score(&self, rule: &FieldRule, lowered: &str) -> f64 {
        rule.labels
            .iter()
            .map(|label| partial_ratio(lowered, label))
            .fold(0.0, f64::max)
    }

    /// Build the record for a document.
    ///
    /// Without a locale nothing is extracted and the record is empty. With a
    /// locale the city field is always present. Blocks are processed in
    /// order and a later firing of a rule replaces the earlier result.
    pub fn extract(&self, locale: Option<LocaleVariant>, blocks: &[TextBlock]) -> ExtractionResult {
        let Some(locale) = locale else {
            debug!("No locale resolved, skipping extraction");
            return ExtractionResult::empty();
        };

        let start = Instant::now();
        let rules = rules_for(locale);
        let mut builder = InvoiceRecord::builder();
        builder.city(locale);

        let mut raw_blocks = Vec::with_capacity(blocks.len());
        let mut matches = Vec::new();

        for (block_index, block) in blocks.iter().enumerate() {
            raw_blocks.push(block.content.clone());
            let lowered = block.content.to_lowercase();

            for rule in rules {
                let score = self.label_score(rule, &lowered);
                trace!("{} scored {:.1} on block {}", rule.field, score, block_index);

                if score > rule.threshold.unwrap_or(self.threshold) {
                    debug!(
                        "Rule {} fired on block {} (region {}, score {:.1})",
                        rule.field, block_index, block.source_region, score
                    );
                    builder.set(rule.field, rule.capture(&block.content));
                    matches.push(RuleMatch {
                        field: rule.field.to_string(),
                        block_index,
                        score,
                    });
                }
            }
        }

        let record = builder.build();
        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} fields for {} from {} blocks in {}ms",
            record.len(),
            locale,
            blocks.len(),
            processing_time_ms
        );

        ExtractionResult {
            record,
            raw_blocks,
            matches,
            processing_time_ms,
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::blocks::BlockNormalizer;
    use crate::models::record::FieldResult;
    use pretty_assertions::assert_eq;

    fn run(locale: LocaleVariant, texts: &[&str]) -> ExtractionResult {
        let blocks = BlockNormalizer::default().blocks(texts.iter().enumerate().map(|(i, t)| (i + 1, *t)));
        RuleEngine::default().extract(Some(locale), &blocks)
    }

    #[test]
    fn test_note_number() {
        let result = run(LocaleVariant::RioDeJaneiro, &["Numero da Nota 123456 emitida"]);

        assert_eq!(result.record.value("invoice_num"), Some("123456"));
        assert_eq!(
            result.record.get("invoice_num").and_then(FieldResult::raw),
            Some("Numero da Nota 123456 emitida")
        );
        assert_eq!(result.record.city(), Some("RJ"));
    }

    #[test]
    fn test_emission_timestamp() {
        let result = run(LocaleVariant::RioDeJaneiro, &["Data e Hora de Emissão 05/03/2021 14:32:10"]);
        assert_eq!(result.record.value("invoice_creation"), Some("05/03/2021 14:32:10"));
    }

    #[test]
    fn test_unaccented_label_variant_fires() {
        let result = run(LocaleVariant::SaoPaulo, &["DATA E HORA DE EMISSAO\n05/03/2021 14:32:10"]);
        assert_eq!(result.record.value("invoice_creation"), Some("05/03/2021 14:32:10"));
    }

    #[test]
    fn test_short_block_is_ignored() {
        let result = run(LocaleVariant::SaoPaulo, &["SP", "inss"]);

        assert!(result.raw_blocks.is_empty());
        assert!(result.matches.is_empty());
        assert_eq!(result.record.len(), 1);
        assert_eq!(result.record.city(), Some("SP"));
    }

    #[test]
    fn test_amount_stays_text() {
        let result = run(LocaleVariant::RioDeJaneiro, &["Valor da Nota 1.234,56"]);

        let value = result.record.get("invoice_value_raw").unwrap();
        assert_eq!(value.value(), Some("1.234,56"));
        assert_eq!(
            serde_json::to_value(value).unwrap(),
            serde_json::json!({"value": "1.234,56", "raw": "Valor da Nota 1.234,56"})
        );
    }

    #[test]
    fn test_unmatched_capture_keeps_raw() {
        let result = run(LocaleVariant::RioDeJaneiro, &["Valor da Nota indisponível"]);

        let field = result.record.get("invoice_value_raw").unwrap();
        assert_eq!(field.value(), None);
        assert_eq!(field.raw(), Some("Valor da Nota indisponível"));
    }

    #[test]
    fn test_last_match_wins() {
        let result = run(
            LocaleVariant::RioDeJaneiro,
            &["Numero da Nota 111", "outro bloco qualquer", "Numero da Nota 222"],
        );

        assert_eq!(result.record.value("invoice_num"), Some("222"));
        let fired: Vec<usize> = result
            .matches
            .iter()
            .filter(|m| m.field == "invoice_num")
            .map(|m| m.block_index)
            .collect();
        assert_eq!(fired, vec![0, 2]);
    }

    #[test]
    fn test_unknown_locale_extracts_nothing() {
        let blocks = BlockNormalizer::default().blocks(vec![(1, "Numero da Nota 123456")]);
        let result = RuleEngine::default().extract(None, &blocks);

        assert!(result.record.is_empty());
        assert!(result.raw_blocks.is_empty());
    }

    #[test]
    fn test_rio_provider_composite() {
        let block = "PRESTADOR DE SERVIÇOS\nCPF/CNPJ: 12.345.678/0001-90 Inscrição Municipal: 0.123.456-7 \
                     Inscrição Estadual: 99.999.99-9 Nome/Razão Social: ACME SERVICOS LTDA Nome Fantasia: ACME \
                     Tel.: (21) 2222-3333 Endereço: Av. Rio Branco, 1 - Centro CEP: 20090-003 \
                     Município: Rio de Janeiro UF: RJ E-mail: contato@acme.com.br";
        let result = run(LocaleVariant::RioDeJaneiro, &[block]);

        let record = &result.record;
        assert_eq!(record.part("invoice_provider", "doc_number"), Some("12.345.678/0001-90"));
        assert_eq!(record.part("invoice_provider", "city_number"), Some("0.123.456-7"));
        assert_eq!(record.part("invoice_provider", "state_number"), Some("99.999.99-9"));
        assert_eq!(record.part("invoice_provider", "main_name"), Some("ACME SERVICOS LTDA"));
        assert_eq!(record.part("invoice_provider", "sec_name"), Some("ACME"));
        assert_eq!(record.part("invoice_provider", "phone"), Some("(21) 2222-3333"));
        assert_eq!(record.part("invoice_provider", "address"), Some("Av. Rio Branco, 1 - Centro"));
        assert_eq!(record.part("invoice_provider", "zip_code"), Some("20090-003"));
        assert_eq!(record.part("invoice_provider", "city"), Some("Rio de Janeiro"));
        assert_eq!(record.part("invoice_provider", "state"), Some("RJ"));
        // no whitespace after the address, so the lazy capture never closes
        assert_eq!(record.part("invoice_provider", "email"), None);
        assert!(!record.contains("invoice_client"));
    }

    #[test]
    fn test_sao_paulo_client_composite() {
        let block = "TOMADOR DE SERVIÇOS Nome/Razão Social: BETA COMERCIO S.A. CPF/CNPJ: 123.456.789-09 \
                     Inscrição Municipal: 1.234.567-8 Endereço: R. Augusta, 500 CEP: 01305-000 \
                     Município: São Paulo UF: SP E-mail: fin@beta.com.br ";
        let result = run(LocaleVariant::SaoPaulo, &[block]);

        let record = &result.record;
        assert_eq!(record.part("invoice_client", "main_name"), Some("BETA COMERCIO S.A."));
        assert_eq!(record.part("invoice_client", "doc_number"), Some("123.456.789-09"));
        assert_eq!(record.part("invoice_client", "city_number"), Some("1.234.567-8"));
        assert_eq!(record.part("invoice_client", "address"), Some("R. Augusta, 500"));
        assert_eq!(record.part("invoice_client", "zip_code"), Some("01305-000"));
        assert_eq!(record.part("invoice_client", "city"), Some("São Paulo"));
        assert_eq!(record.part("invoice_client", "state"), Some("SP"));
        assert_eq!(record.part("invoice_client", "email"), Some("fin@beta.com.br"));
    }

    #[test]
    fn test_description_and_net_value() {
        let block = "DISCRIMINAÇÃO DOS SERVIÇOS Consultoria mensal Pedido de Compra: PO-7781 \
                     referente a março Valor Líquido R$ 9.876,54 obrigado";
        let result = run(LocaleVariant::SaoPaulo, &[block]);

        assert_eq!(result.record.part("invoice_description", "order_number"), Some("PO-7781"));
        assert_eq!(result.record.value("invoice_value_liq"), Some("9.876,54"));
        assert_eq!(result.record.get("invoice_value_liq").and_then(FieldResult::raw), Some(block));
    }

    #[test]
    fn test_order_number_prefers_specific_caption() {
        let block = "Discriminacao dos Servicos Pedido: 1 Ordem de Compra: 4500001 itens";
        let result = run(LocaleVariant::RioDeJaneiro, &[block]);

        assert_eq!(result.record.part("invoice_description", "order_number"), Some("4500001"));
    }

    #[test]
    fn test_sao_paulo_taxes() {
        let result = run(
            LocaleVariant::SaoPaulo,
            &[
                "INSS (R$) 12,50",
                "COFINS (R$) 1.030,00",
                "Código do Serviço 02800 - Análise de sistemas",
                "Município da Prestação do Serviço São Paulo",
            ],
        );

        assert_eq!(result.record.value("invoice_tax_inss"), Some("12,50"));
        assert_eq!(result.record.value("invoice_tax_cofins"), Some("1.030,00"));
        assert_eq!(result.record.value("invoice_service"), Some("02800 - Análise de sistemas"));
        assert_eq!(result.record.value("invoice_tax_service_city"), Some("São Paulo"));
    }

    #[test]
    fn test_threshold_override() {
        let blocks = BlockNormalizer::default().blocks(vec![(1, "Numaro da Nota 77")]);

        let strict = RuleEngine::default().with_threshold(99.0).extract(Some(LocaleVariant::RioDeJaneiro), &blocks);
        assert!(!strict.record.contains("invoice_num"));

        let lenient = RuleEngine::default().extract(Some(LocaleVariant::RioDeJaneiro), &blocks);
        assert_eq!(lenient.record.value("invoice_num"), Some("77"));
    }

    #[test]
    fn test_short_label_rule_tolerates_one_misread() {
        let blocks = BlockNormalizer::default().blocks(vec![(1, "Aliqvota 5,00 %")]);

        // 87.5 clears the rule's own threshold but not the engine-wide one
        let rule = rules_for(LocaleVariant::RioDeJaneiro)
            .iter()
            .find(|r| r.field == "invoice_aliq_tax")
            .unwrap();
        let engine = RuleEngine::default();
        assert_eq!(engine.label_score(rule, "aliqvota 5,00 %"), 87.5);

        let result = engine.extract(Some(LocaleVariant::RioDeJaneiro), &blocks);
        assert_eq!(result.record.value("invoice_aliq_tax"), Some("5,00 %"));

        let strict = RuleEngine::default().with_threshold(99.0);
        let result = strict.extract(Some(LocaleVariant::SaoPaulo), &blocks);
        assert_eq!(result.record.value("invoice_tax_aliq"), Some("5,00 %"));

        let blocks = BlockNormalizer::default().blocks(vec![(1, "Numaro 5,00 %")]);
        let result = engine.extract(Some(LocaleVariant::RioDeJaneiro), &blocks);
        assert!(!result.record.contains("invoice_aliq_tax"));
    }
}
