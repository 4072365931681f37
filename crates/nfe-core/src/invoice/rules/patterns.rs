//! Capture patterns for NFS-e field extraction.
//!
//! Patterns that capture a value next to an anchor consume the anchor and
//! expose the value as the named group `v`; otherwise the whole match is the
//! value.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Typed tokens
    pub static ref INTEGER: Regex = Regex::new(r"\d+").unwrap();

    pub static ref TIMESTAMP: Regex = Regex::new(
        r"\d{2}/\d{2}/\d{4}\s\d{2}:\d{2}:\d{2}"
    ).unwrap();

    // Brazilian amounts: 1.234,56
    pub static ref AMOUNT: Regex = Regex::new(
        r"(?:0|[1-9]\d{0,2}(?:\.\d{3})*),\d{2}"
    ).unwrap();

    pub static ref AMOUNT_BEFORE_SPACE: Regex = Regex::new(
        r"(?P<v>(?:0|[1-9]\d{0,2}(?:\.\d{3})*),\d{2})\s"
    ).unwrap();

    pub static ref PERCENTAGE: Regex = Regex::new(
        r"(?:0|[1-9]\d{0,2}(?:\.\d{3})*),\d{2}(?:\s?%)?"
    ).unwrap();

    // Header tokens
    pub static ref VERIFICATION_CODE: Regex = Regex::new(
        r"\s(?P<v>[\w|]+-[\w|]+)"
    ).unwrap();

    pub static ref SERVICE_ITEM_CODE: Regex = Regex::new(
        r"Prestado\s(?P<v>\d+\.\d+\.\d.*)"
    ).unwrap();

    pub static ref SERVICE_CODE: Regex = Regex::new(
        r"\s(?P<v>\d+.*)"
    ).unwrap();

    pub static ref SERVICE_CITY: Regex = Regex::new(
        r" do Servi[cç]o\s(?P<v>.*)"
    ).unwrap();

    pub static ref WORK_REGISTRATION: Regex = Regex::new(
        r"da Obra\s(?P<v>.*)"
    ).unwrap();

    pub static ref NET_VALUE_LABEL: Regex = Regex::new(
        r"(?i)valor l[ií]quido"
    ).unwrap();

    // Party identity (CPF or CNPJ)
    pub static ref DOC_NUMBER: Regex = Regex::new(
        r"CPF/CNPJ:\s(?P<v>[0-9]{3}\.?[0-9]{3}\.?[0-9]{3}-?[0-9]{2}|[0-9]{2}\.?[0-9]{3}\.?[0-9]{3}/?[0-9]{4}\s?-?\s?[0-9]{2})\s"
    ).unwrap();

    pub static ref MUNICIPAL_REGISTRATION: Regex = Regex::new(
        r"Inscrição Municipal:\s(?P<v>.*?)\s"
    ).unwrap();

    pub static ref MUNICIPAL_REGISTRATION_LOOSE: Regex = Regex::new(
        r"Inscri[cç][aã]o Municipal:\s(?P<v>.*?)\s"
    ).unwrap();

    pub static ref MUNICIPAL_SUFFIX: Regex = Regex::new(
        r"\sMunicipal:\s(?P<v>.*?)\s"
    ).unwrap();

    pub static ref STATE_REGISTRATION: Regex = Regex::new(
        r"Inscrição Estadual:\s(?P<v>.*?)\s"
    ).unwrap();

    pub static ref STATE_REGISTRATION_LOOSE: Regex = Regex::new(
        r"Inscriç[aã]o Estadual:\s(?P<v>.*?)\s"
    ).unwrap();

    pub static ref LEGAL_NAME_BEFORE_TRADE_NAME: Regex = Regex::new(
        r"Nome/Raz[aã]o Social:\s(?P<v>.*?)\sNome Fantasia"
    ).unwrap();

    pub static ref LEGAL_NAME_BEFORE_ADDRESS: Regex = Regex::new(
        r"Nome/Raz[aã]o Social:\s(?P<v>.*?)\sEndere[cç]o:"
    ).unwrap();

    pub static ref LEGAL_NAME_GREEDY_ADDRESS: Regex = Regex::new(
        r"Nome/[A-zÀ-ÿ]+?\sSocial.\s(?P<v>.*)\sEndere[cç]o"
    ).unwrap();

    pub static ref LEGAL_NAME_GREEDY_DOC: Regex = Regex::new(
        r"Nome/[A-zÀ-ÿ]+?\sSocial.\s(?P<v>.*)\sCPF/CNPJ."
    ).unwrap();

    pub static ref TRADE_NAME: Regex = Regex::new(
        r"Nome Fantasia:\s(?P<v>.*?)\sTel"
    ).unwrap();

    pub static ref PHONE: Regex = Regex::new(
        r"Tel\.:\s(?P<v>\(?\d{2}\)?\s?-?\d{4}(?:\s|-)?\d{4})\s"
    ).unwrap();

    pub static ref ADDRESS: Regex = Regex::new(
        r"Endereço:\s(?P<v>.*?)\sCEP"
    ).unwrap();

    pub static ref ADDRESS_LOOSE: Regex = Regex::new(
        r"Endere[cç]o:\s(?P<v>.*?)\sCEP"
    ).unwrap();

    // OCR often reads the cedilla as a "g"
    pub static ref ADDRESS_OCR: Regex = Regex::new(
        r"Endere[cçg]o:\s(?P<v>.*?)\sCEP"
    ).unwrap();

    pub static ref ZIP_CODE: Regex = Regex::new(
        r"CEP:\s(?P<v>\d{5}-\d{3})"
    ).unwrap();

    pub static ref CITY: Regex = Regex::new(
        r"Município:\s(?P<v>.*?)\sUF"
    ).unwrap();

    pub static ref CITY_LOOSE: Regex = Regex::new(
        r"Munic[ií]pio:\s(?P<v>.*?)\sUF"
    ).unwrap();

    pub static ref STATE: Regex = Regex::new(
        r"UF:\s(?P<v>.*?)\s"
    ).unwrap();

    pub static ref EMAIL: Regex = Regex::new(
        r"E-mail:\s(?P<v>.*?)\s"
    ).unwrap();

    // Purchase-order captions, most specific first
    pub static ref ORDER_NUMBER_CAPTIONS: Vec<Regex> = [
        "nº do pedido",
        "ordem de compra",
        "pedido de compra",
        "pedido do pedido",
        "pedido oc",
        "pedido",
    ]
    .iter()
    .map(|caption| Regex::new(&format!(r"(?i:{caption}):\s(?P<v>.*?)\s")).unwrap())
    .collect();
}

/// Value of the first match: group `v` when the pattern has one, else the
/// whole match.
pub fn first_value(pattern: &Regex, text: &str) -> Option<String> {
    let caps = pattern.captures(text)?;
    let m = caps.name("v").or_else(|| caps.get(0))?;
    Some(m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_amounts() {
        assert_eq!(first_value(&AMOUNT, "Valor da Nota R$ 1.234,56"), Some("1.234,56".into()));
        assert_eq!(first_value(&AMOUNT, "0,00 e 10,00"), Some("0,00".into()));
        assert_eq!(first_value(&AMOUNT, "sem valor"), None);
        assert_eq!(first_value(&AMOUNT_BEFORE_SPACE, " 12,30x 45,60 "), Some("45,60".into()));
        assert_eq!(first_value(&PERCENTAGE, "Aliquota 5,00 % ISS"), Some("5,00 %".into()));
        assert_eq!(first_value(&PERCENTAGE, "Aliquota 2,00"), Some("2,00".into()));
    }

    #[test]
    fn test_header_tokens() {
        assert_eq!(
            first_value(&TIMESTAMP, "Data e Hora de Emissão 05/03/2021 14:32:10"),
            Some("05/03/2021 14:32:10".into())
        );
        assert_eq!(
            first_value(&VERIFICATION_CODE, "Código de Verificação ABCD-1234"),
            Some("ABCD-1234".into())
        );
        assert_eq!(
            first_value(&SERVICE_ITEM_CODE, "Serviço Prestado 01.07.01 - Suporte técnico"),
            Some("01.07.01 - Suporte técnico".into())
        );
        assert_eq!(
            first_value(&SERVICE_CODE, "Código do Serviço 02800 - Análise"),
            Some("02800 - Análise".into())
        );
    }

    #[test]
    fn test_identity_captures() {
        let block = "PRESTADOR DE SERVIÇOS CPF/CNPJ: 12.345.678/0001-90 Inscrição Municipal: 0.123.456-7 \
                     Nome/Razão Social: ACME LTDA Nome Fantasia: ACME Tel.: (21) 2222-3333 \
                     Endereço: Rua A, 10 CEP: 20000-000 Município: Rio de Janeiro UF: RJ E-mail: a@b.com ";

        assert_eq!(first_value(&DOC_NUMBER, block), Some("12.345.678/0001-90".into()));
        assert_eq!(first_value(&MUNICIPAL_REGISTRATION, block), Some("0.123.456-7".into()));
        assert_eq!(first_value(&LEGAL_NAME_BEFORE_TRADE_NAME, block), Some("ACME LTDA".into()));
        assert_eq!(first_value(&TRADE_NAME, block), Some("ACME".into()));
        assert_eq!(first_value(&PHONE, block), Some("(21) 2222-3333".into()));
        assert_eq!(first_value(&ADDRESS, block), Some("Rua A, 10".into()));
        assert_eq!(first_value(&ZIP_CODE, block), Some("20000-000".into()));
        assert_eq!(first_value(&CITY, block), Some("Rio de Janeiro".into()));
        assert_eq!(first_value(&STATE, block), Some("RJ".into()));
        assert_eq!(first_value(&EMAIL, block), Some("a@b.com".into()));
    }

    #[test]
    fn test_order_captions_are_case_insensitive() {
        let caption = &ORDER_NUMBER_CAPTIONS[1];
        assert_eq!(first_value(caption, "ORDEM DE COMPRA: 4500012345 ref"), Some("4500012345".into()));
        assert_eq!(ORDER_NUMBER_CAPTIONS.len(), 6);
    }
}
