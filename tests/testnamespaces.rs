//! Namespace resolution, reserved-binding checks, attribute uniqueness by
//! resolved identity, and attribute-value normalization.

use std::cell::RefCell;

use fluxml::{
    error::XmlParserErrors,
    parser::{XmlParserCtxt, xml_ctxt_read_memory},
    sax::{SaxAttribute, SaxNamespace, XmlSaxHandler},
};

#[derive(Default)]
struct NsSink {
    starts: RefCell<Vec<(String, Option<String>, Option<String>)>>,
    ends: RefCell<Vec<String>>,
    attributes: RefCell<Vec<(String, Option<String>, String)>>,
}

impl XmlSaxHandler for NsSink {
    fn start_element_ns(
        &mut self,
        local_name: &str,
        prefix: Option<&str>,
        uri: Option<&str>,
        _namespaces: &[SaxNamespace],
        attributes: &[SaxAttribute],
    ) {
        self.starts.borrow_mut().push((
            local_name.to_owned(),
            prefix.map(|p| p.to_owned()),
            uri.map(|u| u.to_owned()),
        ));
        for attr in attributes {
            self.attributes.borrow_mut().push((
                attr.local_name.to_string(),
                attr.uri.as_deref().map(|u| u.to_owned()),
                attr.value.clone(),
            ));
        }
    }

    fn end_element_ns(&mut self, local_name: &str, _prefix: Option<&str>, _uri: Option<&str>) {
        self.ends.borrow_mut().push(local_name.to_owned());
    }
}

fn parse(doc: &str) -> (NsSink, XmlParserErrors, bool, bool, i32) {
    let mut sink = NsSink::default();
    let (code, well_formed, ns_well_formed, err_no) = {
        let mut ctxt = XmlParserCtxt::new_sax_parser(Some(&mut sink));
        let code = xml_ctxt_read_memory(&mut ctxt, doc.as_bytes().to_vec(), 0);
        (code, ctxt.well_formed, ctxt.ns_well_formed, ctxt.err_no)
    };
    (sink, code, well_formed, ns_well_formed, err_no)
}

#[test]
fn prefixes_resolve_to_their_uris() {
    let (sink, code, ..) =
        parse("<p:root xmlns:p=\"urn:one\"><p:child/></p:root>");
    assert!(code.is_ok());
    let starts = sink.starts.borrow();
    assert_eq!(starts.len(), 2);
    for (_, prefix, uri) in starts.iter() {
        assert_eq!(prefix.as_deref(), Some("p"));
        assert_eq!(uri.as_deref(), Some("urn:one"));
    }
}

#[test]
fn inner_binding_shadows_outer() {
    let doc = "<p:a xmlns:p=\"urn:outer\">\
               <p:b xmlns:p=\"urn:inner\"><p:c/></p:b>\
               <p:d/>\
               </p:a>";
    let (sink, code, ..) = parse(doc);
    assert!(code.is_ok());
    let starts = sink.starts.borrow();
    let uris: Vec<_> = starts.iter().map(|(_, _, uri)| uri.as_deref()).collect();
    assert_eq!(
        uris,
        [
            Some("urn:outer"),
            Some("urn:inner"),
            Some("urn:inner"),
            Some("urn:outer"),
        ]
    );
}

#[test]
fn default_namespace_applies_to_elements_not_attributes() {
    let (sink, code, ..) = parse("<a xmlns=\"urn:d\" x=\"1\"/>");
    assert!(code.is_ok());
    let starts = sink.starts.borrow();
    assert_eq!(starts[0].2.as_deref(), Some("urn:d"));
    let attributes = sink.attributes.borrow();
    // unprefixed attributes live in no namespace
    assert_eq!(attributes[0].1, None);
}

#[test]
fn duplicate_attribute_by_resolved_identity_is_fatal() {
    // Two prefixes bound to the same URI, same local name.
    let doc = "<d xmlns:a=\"urn:x\" xmlns:b=\"urn:x\" a:k=\"1\" b:k=\"2\"/>";
    let (_, code, well_formed, _, err_no) = parse(doc);
    assert!(!code.is_ok());
    assert!(!well_formed);
    assert_eq!(err_no, XmlParserErrors::XmlErrAttributeRedefined as i32);
}

#[test]
fn literal_duplicate_attribute_is_fatal() {
    let (_, code, well_formed, _, err_no) = parse("<d k=\"1\" k=\"2\"/>");
    assert!(!code.is_ok());
    assert!(!well_formed);
    assert_eq!(err_no, XmlParserErrors::XmlErrAttributeRedefined as i32);
}

#[test]
fn same_local_name_in_distinct_namespaces_is_fine() {
    let doc = "<d xmlns:a=\"urn:x\" xmlns:b=\"urn:y\" a:k=\"1\" b:k=\"2\"/>";
    let (_, code, well_formed, ns_well_formed, _) = parse(doc);
    assert!(code.is_ok());
    assert!(well_formed && ns_well_formed);
}

#[test]
fn xml_prefix_must_keep_its_reserved_uri() {
    let (_, _, well_formed, ns_well_formed, _) =
        parse("<d xmlns:xml=\"urn:wrong\"/>");
    assert!(well_formed);
    assert!(!ns_well_formed);

    // the correct URI is accepted
    let (_, code, _, ns_ok, _) =
        parse("<d xmlns:xml=\"http://www.w3.org/XML/1998/namespace\"/>");
    assert!(code.is_ok());
    assert!(ns_ok);
}

#[test]
fn reserved_uris_cannot_move_to_other_prefixes() {
    let (_, _, _, ns_well_formed, _) =
        parse("<d xmlns:p=\"http://www.w3.org/XML/1998/namespace\"/>");
    assert!(!ns_well_formed);

    let (_, _, _, ns_ok, _) = parse("<d xmlns:p=\"http://www.w3.org/2000/xmlns/\"/>");
    assert!(!ns_ok);
}

#[test]
fn xmlns_prefix_cannot_be_declared() {
    let (_, _, _, ns_well_formed, _) =
        parse("<d xmlns:xmlns=\"urn:nope\"/>");
    assert!(!ns_well_formed);
}

#[test]
fn end_tag_mismatch_recovers_with_balanced_events() {
    let (sink, code, well_formed, _, err_no) = parse("<a><b></c></a>");
    assert!(!code.is_ok());
    assert!(!well_formed);
    assert_eq!(err_no, XmlParserErrors::XmlErrTagNameMismatch as i32);
    // the innermost open element is closed anyway, keeping stacks balanced
    assert_eq!(*sink.ends.borrow(), ["b", "a"]);
}

#[test]
fn declared_attribute_values_are_normalized() {
    let doc = "<!DOCTYPE d [<!ATTLIST d t NMTOKENS #IMPLIED c CDATA #IMPLIED>]>\
               <d t=\"  a   b  \" c=\"  a   b  \"/>";
    let (sink, code, ..) = parse(doc);
    assert!(code.is_ok());
    let attributes = sink.attributes.borrow();
    let get = |name: &str| {
        attributes
            .iter()
            .find(|(n, ..)| n == name)
            .map(|(.., v)| v.clone())
            .unwrap()
    };
    // tokenized: collapse runs and trim; CDATA: blanks each become a space
    assert_eq!(get("t"), "a b");
    assert_eq!(get("c"), "  a   b  ");
}

#[test]
fn defaulted_attributes_are_merged_with_their_namespace() {
    let doc = "<!DOCTYPE d [<!ATTLIST d p:x CDATA \"v\">]>\
               <d xmlns:p=\"urn:p\"/>";
    let (sink, code, ..) = parse(doc);
    assert!(code.is_ok());
    let attributes = sink.attributes.borrow();
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].0, "x");
    assert_eq!(attributes[0].1.as_deref(), Some("urn:p"));
    assert_eq!(attributes[0].2, "v");
}

#[test]
fn explicit_attribute_overrides_the_default() {
    let doc = "<!DOCTYPE d [<!ATTLIST d a CDATA \"default\">]><d a=\"explicit\"/>";
    let (sink, code, ..) = parse(doc);
    assert!(code.is_ok());
    let attributes = sink.attributes.borrow();
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].2, "explicit");
}
