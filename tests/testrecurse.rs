//! Regression tests checking that entity recursion and entity-driven
//! amplification are rejected without expanding the payload.

use fluxml::{
    error::XmlParserErrors,
    parser::{XmlParserCtxt, XmlParserOption, xml_ctxt_read_memory, xml_read_memory},
    sax::SilentSaxHandler,
};

fn parse(doc: &str, options: i32) -> XmlParserErrors {
    let mut sax = SilentSaxHandler;
    xml_read_memory(doc.as_bytes().to_vec(), options, &mut sax)
}

fn parse_with_ctxt(doc: &str, options: i32) -> (XmlParserErrors, i32) {
    let mut sax = SilentSaxHandler;
    let mut ctxt = XmlParserCtxt::new_sax_parser(Some(&mut sax));
    let code = xml_ctxt_read_memory(&mut ctxt, doc.as_bytes().to_vec(), options);
    (code, ctxt.err_no)
}

fn billion_laughs(levels: usize) -> String {
    let mut doc = String::from("<!DOCTYPE lolz [\n<!ENTITY lol \"lollollollollol\">\n");
    for i in 1..=levels {
        let prev = if i == 1 {
            "&lol;".repeat(10)
        } else {
            format!("&lol{};", i - 1).repeat(10)
        };
        doc.push_str(&format!("<!ENTITY lol{i} \"{prev}\">\n"));
    }
    doc.push_str(&format!("]><lolz>&lol{levels};</lolz>"));
    doc
}

#[test]
fn billion_laughs_is_rejected() {
    let doc = billion_laughs(9);
    let (code, err_no) = parse_with_ctxt(&doc, XmlParserOption::XmlParseNoEnt as i32);
    assert!(!code.is_ok());
    assert_eq!(err_no, XmlParserErrors::XmlErrEntityLoop as i32);
}

#[test]
fn billion_laughs_in_attribute_is_rejected() {
    // Attribute values substitute entities even without the NoEnt option.
    let mut doc = String::from("<!DOCTYPE lolz [\n<!ENTITY lol \"lollollollollol\">\n");
    for i in 1..=9usize {
        let prev = if i == 1 {
            "&lol;".repeat(10)
        } else {
            format!("&lol{};", i - 1).repeat(10)
        };
        doc.push_str(&format!("<!ENTITY lol{i} \"{prev}\">\n"));
    }
    doc.push_str("]><lolz attr=\"&lol9;\"/>");
    let (code, err_no) = parse_with_ctxt(&doc, 0);
    assert!(!code.is_ok());
    assert_eq!(err_no, XmlParserErrors::XmlErrEntityLoop as i32);
}

#[test]
fn direct_self_reference_is_rejected() {
    let doc = "<!DOCTYPE d [<!ENTITY e \"&e;\">]><d>&e;</d>";
    let (code, err_no) = parse_with_ctxt(doc, XmlParserOption::XmlParseNoEnt as i32);
    assert!(!code.is_ok());
    assert_eq!(err_no, XmlParserErrors::XmlErrEntityLoop as i32);
}

#[test]
fn indirect_reference_cycle_is_rejected() {
    let doc = "<!DOCTYPE d [<!ENTITY a \"&b;\"><!ENTITY b \"&a;\">]><d>&a;</d>";
    let (code, err_no) = parse_with_ctxt(doc, XmlParserOption::XmlParseNoEnt as i32);
    assert!(!code.is_ok());
    assert_eq!(err_no, XmlParserErrors::XmlErrEntityLoop as i32);
}

#[test]
fn benign_expansion_is_accepted() {
    // Well below both the fixed floor and the linearity factor.
    let doc = "<!DOCTYPE d [\
        <!ENTITY base \"_123456789_123456789_123456789_123456789\">\
        <!ENTITY mid \"&base;&base;&base;&base;\">\
        ]><d>&mid;&mid;&mid;&mid;</d>";
    assert!(parse(doc, XmlParserOption::XmlParseNoEnt as i32).is_ok());
}

#[test]
fn deep_nesting_is_bounded_without_huge() {
    let mut doc = String::new();
    for i in 0..300 {
        doc.push_str(&format!("<e{i}>"));
    }
    for i in (0..300).rev() {
        doc.push_str(&format!("</e{i}>"));
    }
    assert!(!parse(&doc, 0).is_ok());
    assert!(parse(&doc, XmlParserOption::XmlParseHuge as i32).is_ok());
}

#[test]
fn entity_referencing_undeclared_in_standalone_document_fails() {
    let doc = "<?xml version=\"1.0\" standalone=\"yes\"?><d>&nope;</d>";
    assert!(!parse(doc, 0).is_ok());
}
