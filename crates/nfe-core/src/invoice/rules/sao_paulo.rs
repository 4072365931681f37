//! São Paulo NFS-e layout.

use lazy_static::lazy_static;

use super::patterns::*;
use super::{Extraction, FieldRule, SHORT_LABEL_THRESHOLD};

use Extraction::First;

static DESCRIPTION_LABELS: &[&str] = &["discriminação dos serviços", "discriminacao dos servicos"];

lazy_static! {
    pub(super) static ref RULES: Vec<FieldRule> = vec![
        FieldRule::scalar("invoice_num", &["numero da nota", "número da nota"], First(&INTEGER)),
        FieldRule::scalar(
            "invoice_creation",
            &["data e hora de emissão", "data e hora de emissao"],
            First(&TIMESTAMP),
        ),
        FieldRule::scalar(
            "invoice_verif_cod",
            &["código de verificação", "codigo de verificacao"],
            First(&VERIFICATION_CODE),
        ),
        FieldRule::composite(
            "invoice_provider",
            &["prestador de serviços", "prestador de servicos"],
            vec![
                ("doc_number", First(&DOC_NUMBER)),
                ("city_number", First(&MUNICIPAL_REGISTRATION_LOOSE)),
                ("main_name", First(&LEGAL_NAME_GREEDY_ADDRESS)),
                ("address", First(&ADDRESS_LOOSE)),
                ("zip_code", First(&ZIP_CODE)),
                ("city", First(&CITY_LOOSE)),
                ("state", First(&STATE)),
            ],
        ),
        FieldRule::composite(
            "invoice_client",
            &["tomador de serviços", "tomador de servicos"],
            vec![
                ("main_name", First(&LEGAL_NAME_GREEDY_DOC)),
                ("doc_number", First(&DOC_NUMBER)),
                ("city_number", First(&MUNICIPAL_SUFFIX)),
                ("address", First(&ADDRESS_OCR)),
                ("zip_code", First(&ZIP_CODE)),
                ("city", First(&CITY_LOOSE)),
                ("state", First(&STATE)),
                ("email", First(&EMAIL)),
            ],
        ),
        FieldRule::composite(
            "invoice_description",
            DESCRIPTION_LABELS,
            vec![("order_number", Extraction::FirstOf(ORDER_NUMBER_CAPTIONS.as_slice()))],
        ),
        FieldRule::scalar(
            "invoice_value_liq",
            DESCRIPTION_LABELS,
            Extraction::After { anchor: &NET_VALUE_LABEL, value: &AMOUNT_BEFORE_SPACE },
        ),
        FieldRule::scalar(
            "invoice_value_raw",
            &["valor total do serviço", "valor total do servico"],
            First(&AMOUNT),
        ),
        FieldRule::scalar("invoice_tax_inss", &["inss"], First(&AMOUNT)),
        FieldRule::scalar("invoice_tax_irrf", &["irrf"], First(&AMOUNT)),
        FieldRule::scalar("invoice_tax_csll", &["csll"], First(&AMOUNT)),
        FieldRule::scalar("invoice_tax_cofins", &["cofins"], First(&AMOUNT)),
        FieldRule::scalar("invoice_tax_pis-pasep", &["pis/pasep"], First(&AMOUNT)),
        FieldRule::scalar(
            "invoice_service",
            &["código do serviço", "código do servico", "codigo do servico"],
            First(&SERVICE_CODE),
        ),
        FieldRule::scalar(
            "invoice_tax_deductions",
            &["valor total das deduções", "valor total das deducoes"],
            First(&AMOUNT),
        ),
        FieldRule::scalar(
            "invoice_tax_calc_base",
            &["base de cálculo", "base de calculo"],
            First(&AMOUNT),
        ),
        FieldRule::scalar("invoice_tax_aliq", &["aliquota", "alíquota"], First(&PERCENTAGE))
            .with_threshold(SHORT_LABEL_THRESHOLD),
        FieldRule::scalar("invoice_tax_iss", &["valor de iss"], First(&AMOUNT)),
        FieldRule::scalar("invoice_tax_credit", &["crédito (r$)", "credito (r$)"], First(&AMOUNT)),
        FieldRule::scalar(
            "invoice_tax_service_city",
            &["município da prestação do serviço", "municipio da prestacao do servico"],
            First(&SERVICE_CITY),
        ),
        FieldRule::scalar(
            "invoice_tax_work_num",
            &["número inscrição da obra", "numero inscricao da obra"],
            First(&WORK_REGISTRATION),
        ),
        FieldRule::scalar(
            "invoice_tax_tribute_value",
            &["valor aproximado dos tributos / fonte"],
            First(&AMOUNT),
        ),
    ];
}
