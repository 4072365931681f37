//! Rio de Janeiro NFS-e layout.

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
                ("city_number", First(&MUNICIPAL_REGISTRATION)),
                ("state_number", First(&STATE_REGISTRATION)),
                ("main_name", First(&LEGAL_NAME_BEFORE_TRADE_NAME)),
                ("sec_name", First(&TRADE_NAME)),
                ("phone", First(&PHONE)),
                ("address", First(&ADDRESS)),
                ("zip_code", First(&ZIP_CODE)),
                ("city", First(&CITY)),
                ("state", First(&STATE)),
                ("email", First(&EMAIL)),
            ],
        ),
        FieldRule::composite(
            "invoice_client",
            &["tomador de serviços", "tomador de servicos"],
            vec![
                ("doc_number", First(&DOC_NUMBER)),
                ("city_number", First(&MUNICIPAL_SUFFIX)),
                ("state_number", First(&STATE_REGISTRATION_LOOSE)),
                ("main_name", First(&LEGAL_NAME_BEFORE_ADDRESS)),
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
        FieldRule::scalar("invoice_value_raw", &["valor da nota"], First(&AMOUNT)),
        FieldRule::scalar(
            "invoice_service",
            &["serviço prestado", "servico prestado"],
            First(&SERVICE_ITEM_CODE),
        ),
        FieldRule::scalar("invoice_deduc", &["deduções", "deducoes"], First(&AMOUNT)),
        FieldRule::scalar("invoice_discount", &["desconto incond."], First(&AMOUNT)),
        FieldRule::scalar(
            "invoice_calc_base_tax",
            &["base de cálculo", "base de calculo"],
            First(&AMOUNT),
        ),
        FieldRule::scalar("invoice_aliq_tax", &["aliquota", "alíquota"], First(&PERCENTAGE))
            .with_threshold(SHORT_LABEL_THRESHOLD),
        FieldRule::scalar("invoice_iss_tax", &["valor de iss"], First(&AMOUNT)),
        FieldRule::scalar(
            "invoice_iptu_credit",
            &["crédito p/ iptu", "credito p/ iptu"],
            First(&AMOUNT),
        ),
    ];
}
