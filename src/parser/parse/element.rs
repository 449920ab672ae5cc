use std::rc::Rc;

use crate::{
    XML_NS_NAMESPACE, XML_XML_NAMESPACE,
    error::XmlParserErrors,
    parser::{
        XML_PARSER_MAX_DEPTH, XmlParserCtxt, XmlParserInputState, XmlParserOption,
        xml_err_attribute_dup, xml_fatal_err, xml_fatal_err_msg, xml_fatal_err_msg_int,
        xml_fatal_err_msg_str_int_str, xml_is_blank_char, xml_is_char, xml_ns_err, xml_ns_warn,
    },
    sax::SaxAttribute,
};

use super::{parse_name, parse_qname};

/// Crude RFC 3986 scheme check, enough to warn on relative namespace names
/// without dragging in a full URI parser.
fn uri_is_absolute(uri: &str) -> bool {
    let Some((scheme, _)) = uri.split_once(':') else {
        return false;
    };
    !scheme.is_empty()
        && scheme.as_bytes()[0].is_ascii_alphabetic()
        && scheme
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
}

/// Parse the start of an XML element. Returns -1 in case of error, 0 if an
/// opening tag was parsed, 1 if an empty element was parsed.
///
/// Always consumes '<'.
#[doc(alias = "xmlParseElementStart")]
pub(crate) fn parse_element_start(ctxt: &mut XmlParserCtxt) -> i32 {
    let ns_nr = ctxt.ns_tab.len();

    if ctxt.name_tab.len() > XML_PARSER_MAX_DEPTH
        && ctxt.options & XmlParserOption::XmlParseHuge as i32 == 0
    {
        let max_depth = XML_PARSER_MAX_DEPTH as i32;
        xml_fatal_err_msg_int!(
            ctxt,
            XmlParserErrors::XmlErrInternalError,
            "Excessive depth in document: {} use the huge option\n",
            max_depth
        );
        ctxt.halt();
        return -1;
    }

    if ctxt.space_tab.is_empty() || ctxt.space() == -2 {
        ctxt.space_push(-1);
    } else {
        ctxt.space_push(ctxt.space());
    }

    let line = ctxt.input().map_or(0, |input| input.line);
    let tag = parse_start_tag2(ctxt);
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return -1;
    }
    let Some((name, prefix, uri)) = tag else {
        ctxt.space_pop();
        return -1;
    };
    let pushed_ns = ctxt.ns_tab.len() - ns_nr;
    ctxt.name_ns_push(
        Rc::clone(&name),
        prefix.clone(),
        uri.clone(),
        line,
        pushed_ns,
    );

    // Check for an Empty Element.
    if ctxt.content_bytes().starts_with(b"/>") {
        ctxt.advance(2);
        if ctxt.disable_sax == 0 {
            if let Some(sax) = ctxt.sax.as_deref_mut() {
                sax.end_element_ns(&name, prefix.as_deref(), uri.as_deref());
            }
        }
        ctxt.name_ns_pop();
        ctxt.space_pop();
        if ns_nr != ctxt.ns_tab.len() {
            ctxt.ns_pop(ctxt.ns_tab.len() - ns_nr);
        }
        return 1;
    }
    if ctxt.current_byte() == b'>' {
        ctxt.advance(1);
    } else {
        xml_fatal_err_msg_str_int_str!(
            ctxt,
            XmlParserErrors::XmlErrGtRequired,
            "Couldn't find end of Start Tag {} line {}\n",
            &*name,
            line
        );

        // end of parsing of this node.
        ctxt.name_ns_pop();
        ctxt.space_pop();
        if ns_nr != ctxt.ns_tab.len() {
            ctxt.ns_pop(ctxt.ns_tab.len() - ns_nr);
        }
        return -1;
    }

    0
}

/// Parse a start tag. Always consumes '<'.
///
/// ```text
/// [40] STag ::= '<' Name (S Attribute)* S? '>'
///
/// [ WFC: Unique Att Spec ]
/// No attribute name may appear more than once in the same start-tag or
/// empty-element tag.
///
/// [44] EmptyElemTag ::= '<' Name (S Attribute)* S? '/>'
///
/// With namespace:
/// [NS 8] STag ::= '<' QName (S Attribute)* S? '>'
/// [NS 10] EmptyElement ::= '<' QName (S Attribute)* S? '/>'
/// ```
///
/// Namespace-declaration pseudo-attributes are resolved here: they bind
/// prefixes for this element's scope and are reported through the
/// `namespaces` slice of `start_element_ns`, never as attributes.
///
/// Returns (Name, Prefix, URI)
#[doc(alias = "xmlParseStartTag2")]
pub(crate) fn parse_start_tag2(
    ctxt: &mut XmlParserCtxt,
) -> Option<(Rc<str>, Option<Rc<str>>, Option<Rc<str>>)> {
    if ctxt.current_byte() != b'<' {
        return None;
    }
    ctxt.advance(1);

    let inputid = ctxt.input().map(|input| input.id);
    let mut nb_ns = 0usize;

    let (prefix, localname) = parse_qname(ctxt);
    let Some(localname) = localname else {
        xml_fatal_err_msg(
            ctxt,
            XmlParserErrors::XmlErrNameRequired,
            "StartTag: invalid element name\n",
        );
        return None;
    };

    // Now parse the attributes, it ends up with the ending
    //
    // (S Attribute)* S?
    ctxt.skip_blanks();
    ctxt.grow();

    let mut atts: Vec<SaxAttribute> = vec![];

    while ctxt.current_byte() != b'>'
        && (ctxt.current_byte() != b'/' || ctxt.nth_byte(1) != b'>')
        && xml_is_char(ctxt.current_byte() as u32)
        && !matches!(ctxt.instate, XmlParserInputState::XmlParserEOF)
    {
        let Some((aprefix, attname, attvalue)) =
            ctxt.parse_attribute2(prefix.as_deref(), &localname)
        else {
            xml_fatal_err(
                ctxt,
                XmlParserErrors::XmlErrInternalError,
                Some("xmlParseStartTag: problem parsing attributes\n"),
            );
            break;
        };

        'next_attr: {
            let Some(attvalue) = attvalue else {
                break 'next_attr;
            };

            if attname.as_ref() == "xmlns" && aprefix.is_none() {
                // the default namespace declaration
                let url = attvalue;
                if !url.is_empty() {
                    if !uri_is_absolute(&url) {
                        xml_ns_warn!(
                            ctxt,
                            XmlParserErrors::XmlWarNsURIRelative,
                            "xmlns: URI {} is not absolute\n",
                            url
                        );
                    }
                    if url == XML_XML_NAMESPACE {
                        xml_ns_err!(
                            ctxt,
                            XmlParserErrors::XmlNsErrXmlNamespace,
                            "xml namespace URI cannot be the default namespace\n"
                        );
                        break 'next_attr;
                    }
                    if url == XML_NS_NAMESPACE {
                        xml_ns_err!(
                            ctxt,
                            XmlParserErrors::XmlNsErrXmlNamespace,
                            "reuse of the xmlns namespace name is forbidden\n"
                        );
                        break 'next_attr;
                    }
                }

                // check that it's not a defined namespace
                if ctxt
                    .ns_tab
                    .iter()
                    .rev()
                    .take(nb_ns)
                    .any(|(pre, _)| pre.is_none())
                {
                    xml_err_attribute_dup(ctxt, None, &attname);
                } else if ctxt.ns_push(None, &url) > 0 {
                    nb_ns += 1;
                }
            } else if aprefix.as_deref() == Some("xmlns") {
                // a prefix binding
                let url = attvalue;
                if attname.as_ref() == "xml" {
                    if url != XML_XML_NAMESPACE {
                        xml_ns_err!(
                            ctxt,
                            XmlParserErrors::XmlNsErrXmlNamespace,
                            "xml namespace prefix mapped to wrong URI\n"
                        );
                    }
                    // Do not keep the implicit binding
                    break 'next_attr;
                }
                if url == XML_XML_NAMESPACE {
                    xml_ns_err!(
                        ctxt,
                        XmlParserErrors::XmlNsErrXmlNamespace,
                        "xml namespace URI mapped to wrong prefix\n"
                    );
                    break 'next_attr;
                }
                if attname.as_ref() == "xmlns" {
                    xml_ns_err!(
                        ctxt,
                        XmlParserErrors::XmlNsErrXmlNamespace,
                        "redefinition of the xmlns prefix is forbidden\n"
                    );
                    break 'next_attr;
                }
                if url == XML_NS_NAMESPACE {
                    xml_ns_err!(
                        ctxt,
                        XmlParserErrors::XmlNsErrXmlNamespace,
                        "reuse of the xmlns namespace name is forbidden\n"
                    );
                    break 'next_attr;
                }
                if url.is_empty() {
                    xml_ns_err!(
                        ctxt,
                        XmlParserErrors::XmlNsErrEmpty,
                        "xmlns:{}: Empty XML namespace is not allowed\n",
                        &*attname
                    );
                    break 'next_attr;
                }
                if ctxt.pedantic && !uri_is_absolute(&url) {
                    xml_ns_warn!(
                        ctxt,
                        XmlParserErrors::XmlWarNsURIRelative,
                        "xmlns:{}: URI {} is not absolute\n",
                        &*attname,
                        url
                    );
                }
                // check that it's not a defined namespace
                if ctxt
                    .ns_tab
                    .iter()
                    .rev()
                    .take(nb_ns)
                    .any(|(pre, _)| pre.as_deref() == Some(attname.as_ref()))
                {
                    xml_err_attribute_dup(ctxt, aprefix.as_deref(), &attname);
                } else if ctxt.ns_push(Some(&attname), &url) > 0 {
                    nb_ns += 1;
                }
            } else {
                // Add the pair to atts
                atts.push(SaxAttribute {
                    local_name: attname,
                    prefix: aprefix,
                    uri: None,
                    value: attvalue,
                });
            }
        }

        ctxt.grow();
        if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
            break;
        }
        if ctxt.current_byte() == b'>'
            || (ctxt.current_byte() == b'/' && ctxt.nth_byte(1) == b'>')
        {
            break;
        }
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "attributes construct error\n",
            );
            break;
        }
        ctxt.grow();
    }

    if ctxt.input().map(|input| input.id) != inputid {
        xml_fatal_err(
            ctxt,
            XmlParserErrors::XmlErrInternalError,
            Some("Unexpected change of input\n"),
        );
        return None;
    }

    // The attributes defaulting
    let atts_default = std::mem::take(&mut ctxt.atts_default);
    let elem_full: Rc<str> = if let Some(prefix) = prefix.as_deref() {
        Rc::from(format!("{prefix}:{localname}").as_str())
    } else {
        Rc::clone(&localname)
    };
    if let Some(defaults) = atts_default.get(&elem_full) {
        for def in defaults {
            // special work for namespaces defaulted defs
            if def.name.as_ref() == "xmlns" && def.prefix.is_none() {
                // check that it's not a defined namespace
                if ctxt.ns_tab.iter().any(|(pre, _)| pre.is_none()) {
                    continue;
                }
                if ctxt.ns_lookup(None).as_deref() != Some(def.value.as_str())
                    && ctxt.ns_push(None, &def.value) > 0
                {
                    nb_ns += 1;
                }
            } else if def.prefix.as_deref() == Some("xmlns") {
                // check that it's not a defined namespace
                if ctxt
                    .ns_tab
                    .iter()
                    .any(|(pre, _)| pre.as_deref() == Some(def.name.as_ref()))
                {
                    continue;
                }
                if ctxt.ns_lookup(Some(&def.name)).as_deref() != Some(def.value.as_str())
                    && ctxt.ns_push(Some(&def.name), &def.value) > 0
                {
                    nb_ns += 1;
                }
            } else {
                // check that it's not a defined attribute
                if atts
                    .iter()
                    .any(|att| att.local_name == def.name && att.prefix == def.prefix)
                {
                    continue;
                }
                atts.push(SaxAttribute {
                    local_name: Rc::clone(&def.name),
                    prefix: def.prefix.clone(),
                    uri: None,
                    value: def.value.clone(),
                });
            }
        }
    }
    ctxt.atts_default = atts_default;

    // The attributes checkings
    for i in 0..atts.len() {
        // The default namespace does not apply to attribute names.
        let nsname = if let Some(pre) = atts[i].prefix.clone() {
            let nsname = ctxt.ns_lookup(Some(&pre));
            if nsname.is_none() {
                let loc = Rc::clone(&atts[i].local_name);
                xml_ns_err!(
                    ctxt,
                    XmlParserErrors::XmlNsErrUndefinedNamespace,
                    "Namespace prefix {} for {} on {} is not defined\n",
                    &*pre,
                    &*loc,
                    &*localname
                );
            }
            atts[i].uri = nsname;
            atts[i].uri.clone()
        } else {
            None
        };
        // [ WFC: Unique Att Spec ]
        // No attribute name may appear more than once in the same
        // start-tag or empty-element tag.
        // As extended by the Namespace in XML REC.
        for j in 0..i {
            if atts[i].local_name == atts[j].local_name {
                if atts[i].prefix == atts[j].prefix {
                    let pre = atts[i].prefix.clone();
                    let loc = Rc::clone(&atts[i].local_name);
                    xml_err_attribute_dup(ctxt, pre.as_deref(), &loc);
                    break;
                }
                if nsname
                    .as_deref()
                    .is_some_and(|a| Some(a) == atts[j].uri.as_deref())
                {
                    let pre = atts[i].prefix.clone();
                    let loc = Rc::clone(&atts[i].local_name);
                    xml_err_attribute_dup(ctxt, pre.as_deref(), &loc);
                    break;
                }
            }
        }
    }

    let uri = ctxt.ns_lookup(prefix.as_deref());
    if let Some(prefix) = prefix.as_deref() {
        if uri.is_none() {
            xml_ns_err!(
                ctxt,
                XmlParserErrors::XmlNsErrUndefinedNamespace,
                "Namespace prefix {} on {} is not defined\n",
                prefix,
                &*localname
            );
        }
    }

    // SAX: Start of Element !
    if ctxt.disable_sax == 0 {
        let XmlParserCtxt { sax, ns_tab, .. } = ctxt;
        if let Some(sax) = sax.as_deref_mut() {
            sax.start_element_ns(
                &localname,
                prefix.as_deref(),
                uri.as_deref(),
                &ns_tab[ns_tab.len() - nb_ns..],
                &atts,
            );
        }
    }

    Some((localname, prefix, uri))
}

/// Parse the end of an XML element. Always consumes '</'.
#[doc(alias = "xmlParseElementEnd")]
pub(crate) fn parse_element_end(ctxt: &mut XmlParserCtxt) {
    if ctxt.name_tab.is_empty() {
        if ctxt.content_bytes().starts_with(b"</") {
            ctxt.advance(2);
        }
        return;
    }

    // parse the end of tag: '</' should be here.
    parse_end_tag2(ctxt);
    ctxt.name_ns_pop();
}

/// Parse an XML name and compares it to the innermost open element
/// (specialized for endtag parsing).
///
/// The accelerated path does a direct byte comparison against the input;
/// it only falls back to the full tokenizer when the comparison fails or
/// the name is cut by the buffer end.
#[doc(alias = "xmlParseNameAndCompare")]
fn parse_name_and_compare(ctxt: &mut XmlParserCtxt) -> Result<(), Option<Rc<str>>> {
    ctxt.grow();
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return Err(None);
    }

    let Some(expected) = ctxt.name_tab.last().map(|tag| Rc::clone(&tag.name)) else {
        return Err(None);
    };
    let input = ctxt.content_bytes();
    let count = input
        .iter()
        .copied()
        .zip(expected.bytes())
        .take_while(|(i, o)| i == o)
        .count();
    if count == expected.len()
        && input
            .get(count)
            .is_some_and(|&b| b == b'>' || xml_is_blank_char(b as u32))
    {
        // success
        ctxt.advance(count);
        return Ok(());
    }
    // failure (or end of input buffer), check with full function
    let ret = parse_name(ctxt);
    // strings coming from the dictionary, direct compare possible
    if ret.as_ref().is_some_and(|ret| Rc::ptr_eq(ret, &expected)) {
        return Ok(());
    }
    Err(ret)
}

/// Parse an XML QName and compares it to the innermost open element
/// (specialized for endtag parsing).
#[doc(alias = "xmlParseQNameAndCompare")]
fn parse_qname_and_compare(ctxt: &mut XmlParserCtxt) -> Result<(), Option<Rc<str>>> {
    ctxt.grow();
    let Some((expected, Some(exp_prefix))) = ctxt
        .name_tab
        .last()
        .map(|tag| (Rc::clone(&tag.name), tag.prefix.clone()))
    else {
        return Err(None);
    };
    if ctxt
        .content_bytes()
        .strip_prefix(exp_prefix.as_bytes())
        .and_then(|input| input.strip_prefix(b":"))
        .and_then(|input| input.strip_prefix(expected.as_bytes()))
        .and_then(|input| input.first())
        .is_some_and(|&b| b == b'>' || xml_is_blank_char(b as u32))
    {
        // success
        let len = exp_prefix.len() + 1 + expected.len();
        ctxt.advance(len);
        return Ok(());
    }

    // all strings come from the dictionary, equality can be done directly
    let (pre, ret) = parse_qname(ctxt);
    if ret.as_ref().is_some_and(|ret| Rc::ptr_eq(ret, &expected))
        && pre.as_deref() == Some(exp_prefix.as_ref())
    {
        return Ok(());
    }
    Err(ret)
}

/// Parse an end tag. Always consumes '</'.
///
/// ```text
/// [42] ETag ::= '</' Name S? '>'
///
/// With namespace
/// [NS 9] ETag ::= '</' QName S? '>'
/// ```
///
/// A mismatched name is reported as a fatal error but the innermost open
/// element is still closed, so a recovering parse keeps its stacks
/// balanced.
#[doc(alias = "xmlParseEndTag2")]
pub(crate) fn parse_end_tag2(ctxt: &mut XmlParserCtxt) {
    ctxt.grow();
    if !ctxt.content_bytes().starts_with(b"</") {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrLtSlashRequired, None);
        return;
    }
    ctxt.advance(2);

    let has_prefix = ctxt.name_tab.last().is_some_and(|tag| tag.prefix.is_some());
    let name = if has_prefix {
        parse_qname_and_compare(ctxt)
    } else {
        parse_name_and_compare(ctxt)
    };

    // We should definitely be at the ending "S? '>'" part
    ctxt.grow();
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return;
    }
    ctxt.skip_blanks();
    if ctxt.current_byte() != b'>' {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrGtRequired, None);
    } else {
        ctxt.advance(1);
    }

    // [ WFC: Element Type Match ]
    // The Name in an element's end-tag must match the element type in the start-tag.
    let Some(tag) = ctxt.name_tab.last().cloned() else {
        return;
    };
    if let Err(name) = name {
        let name = name.as_deref().unwrap_or("unparsable");
        let disable_sax = ctxt.disable_sax;
        xml_fatal_err_msg_str_int_str!(
            ctxt,
            XmlParserErrors::XmlErrTagNameMismatch,
            "Opening and ending tag mismatch: {} line {} and {}\n",
            &*tag.name,
            tag.line,
            name
        );
        // The innermost open element is closed anyway, keep the balancing
        // end events flowing so the consumer sees matched pairs.
        ctxt.disable_sax = disable_sax;
    }

    // SAX: End of Tag
    if ctxt.disable_sax == 0 {
        if let Some(sax) = ctxt.sax.as_deref_mut() {
            sax.end_element_ns(&tag.name, tag.prefix.as_deref(), tag.uri.as_deref());
        }
    }

    ctxt.space_pop();
    if tag.ns_nr != 0 {
        ctxt.ns_pop(tag.ns_nr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::XmlParserInput;

    fn ctxt_with_input(content: &str) -> XmlParserCtxt<'static> {
        let mut ctxt = XmlParserCtxt::new_sax_parser(None);
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt
    }

    #[test]
    fn start_tag_binds_namespaces() {
        let mut ctxt = ctxt_with_input("<a:root xmlns:a='urn:a' attr='v'>");
        let (name, prefix, uri) = parse_start_tag2(&mut ctxt).unwrap();
        assert_eq!(name.as_ref(), "root");
        assert_eq!(prefix.as_deref(), Some("a"));
        assert_eq!(uri.as_deref(), Some("urn:a"));
        assert_eq!(ctxt.ns_tab.len(), 1);
        assert!(ctxt.well_formed);
    }

    #[test]
    fn undefined_prefix_is_a_namespace_error() {
        let mut ctxt = ctxt_with_input("<x:root>");
        let (_, _, uri) = parse_start_tag2(&mut ctxt).unwrap();
        assert_eq!(uri, None);
        assert!(!ctxt.ns_well_formed);
        assert!(ctxt.well_formed);
    }

    #[test]
    fn duplicate_attribute_is_fatal() {
        let mut ctxt = ctxt_with_input("<r a='1' a='2'>");
        parse_start_tag2(&mut ctxt);
        assert!(!ctxt.well_formed);
        assert_eq!(
            ctxt.err_no,
            XmlParserErrors::XmlErrAttributeRedefined as i32
        );
    }

    #[test]
    fn duplicate_by_resolved_identity_is_rejected() {
        // Same local name through two prefixes bound to one URI. This is
        // as fatal as a literal duplicate.
        let mut ctxt =
            ctxt_with_input("<r xmlns:a='urn:x' xmlns:b='urn:x' a:id='1' b:id='2'>");
        parse_start_tag2(&mut ctxt);
        assert!(!ctxt.well_formed);
        assert_eq!(
            ctxt.err_no,
            XmlParserErrors::XmlErrAttributeRedefined as i32
        );
    }

    #[test]
    fn xml_prefix_reservations_are_enforced() {
        let mut ctxt = ctxt_with_input("<r xmlns:xml='urn:wrong'>");
        parse_start_tag2(&mut ctxt);
        assert!(!ctxt.ns_well_formed);

        let mut ctxt = ctxt_with_input("<r xmlns:xmlns='urn:x'>");
        parse_start_tag2(&mut ctxt);
        assert!(!ctxt.ns_well_formed);

        // binding xml to the correct URI is redundant but not an error
        let mut ctxt =
            ctxt_with_input("<r xmlns:xml='http://www.w3.org/XML/1998/namespace'>");
        parse_start_tag2(&mut ctxt);
        assert!(ctxt.ns_well_formed);
        assert!(ctxt.ns_tab.is_empty());
    }

    #[test]
    fn empty_prefixed_binding_is_rejected() {
        let mut ctxt = ctxt_with_input("<r xmlns:p=''>");
        parse_start_tag2(&mut ctxt);
        assert!(!ctxt.ns_well_formed);
        assert_eq!(ctxt.err_no, XmlParserErrors::XmlNsErrEmpty as i32);
    }

    #[test]
    fn element_start_detects_empty_element() {
        let mut ctxt = ctxt_with_input("<r/>");
        assert_eq!(parse_element_start(&mut ctxt), 1);
        assert!(ctxt.name_tab.is_empty());
        assert!(ctxt.space_tab.is_empty());

        let mut ctxt = ctxt_with_input("<r>");
        assert_eq!(parse_element_start(&mut ctxt), 0);
        assert_eq!(ctxt.name_tab.len(), 1);
    }

    #[test]
    fn end_tag_mismatch_still_closes_the_element() {
        let mut ctxt = ctxt_with_input("<a></b>");
        ctxt.recovery = true;
        assert_eq!(parse_element_start(&mut ctxt), 0);
        parse_element_end(&mut ctxt);
        assert_eq!(
            ctxt.err_no,
            XmlParserErrors::XmlErrTagNameMismatch as i32
        );
        assert!(ctxt.name_tab.is_empty());
        assert!(ctxt.content_bytes().is_empty());
    }
}
