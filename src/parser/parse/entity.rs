use crate::{
    entity::{XML_ENT_CHECKED, XML_ENT_EXPANDING},
    error::XmlParserErrors,
    parser::{
        XML_MAX_HUGE_LENGTH, XML_MAX_TEXT_LENGTH, XML_SUBSTITUTE_PEREF, XML_SUBSTITUTE_REF,
        XmlParserCtxt, XmlParserInputState, XmlParserOption, xml_fatal_err, xml_fatal_err_msg,
        xml_fatal_err_msg_int, xml_is_char, xml_warning_msg,
    },
};

use super::{
    parse_string_char_ref, parse_string_entity_ref, parse_string_name, parse_string_pereference,
};

#[doc(alias = "xmlStringDecodeEntitiesInt")]
pub(super) fn string_decode_entities_int(
    ctxt: &mut XmlParserCtxt,
    mut s: &str,
    what: i32,
    end: char,
    end2: char,
    end3: char,
    check: bool,
) -> Option<String> {
    if (ctxt.depth > 40 && ctxt.options & XmlParserOption::XmlParseHuge as i32 == 0)
        || ctxt.depth > 100
    {
        xml_fatal_err_msg(
            ctxt,
            XmlParserErrors::XmlErrEntityLoop,
            "Maximum entity nesting depth exceeded",
        );
        return None;
    }

    // allocate a translation buffer.
    let mut buffer = String::new();
    // OK loop until we reach one of the ending chars or a size limit.
    // we are operating on already parsed values.
    while let Some(c) = s.chars().next().filter(|&c| {
        c != end
            && c != end2
            && c != end3
            && !matches!(ctxt.instate, XmlParserInputState::XmlParserEOF)
    }) {
        if s.starts_with("&#") {
            let (Some(val), rem) = parse_string_char_ref(ctxt, s) else {
                return None;
            };
            buffer.push(val);
            s = rem;
        } else if c == '&' && what & XML_SUBSTITUTE_REF != 0 {
            let (ent, rem) = parse_string_entity_ref(ctxt, s);
            s = rem;
            if let Some(ent) = ent.as_deref().filter(|ent| ent.is_predefined()) {
                if let Some(content) = ent.content.as_deref() {
                    buffer.push_str(content);
                } else {
                    xml_fatal_err_msg(
                        ctxt,
                        XmlParserErrors::XmlErrInternalError,
                        "predefined entity has no content\n",
                    );
                    return None;
                }
            } else if let Some(ent) = ent.as_ref().filter(|ent| ent.content.is_some()) {
                // content checked just above
                let content = ent.content.clone().unwrap_or_default();
                if check && !ctxt.parser_entity_check(content.len() as u64) {
                    return None;
                }

                if ent.has_flag(XML_ENT_EXPANDING) {
                    xml_fatal_err(ctxt, XmlParserErrors::XmlErrEntityLoop, None);
                    ctxt.halt();
                    return None;
                }

                ent.set_flag(XML_ENT_EXPANDING);
                ctxt.depth += 1;
                let rep =
                    string_decode_entities_int(ctxt, &content, what, '\0', '\0', '\0', check);
                ctxt.depth -= 1;
                ent.clear_flag(XML_ENT_EXPANDING);

                let rep = rep?;
                if !ent.has_flag(XML_ENT_CHECKED) {
                    ent.expanded_size.set(rep.len() as u64);
                    ent.set_flag(XML_ENT_CHECKED);
                }
                buffer.push_str(&rep);
            } else if let Some(ent) = ent {
                // 4.4.7 Bypassed: keep the reference as is
                buffer.push('&');
                buffer.push_str(&ent.name);
                buffer.push(';');
            }
        } else if c == '%' && what & XML_SUBSTITUTE_PEREF != 0 {
            let (ent, rem) = parse_string_pereference(ctxt, s);
            s = rem;
            if let Some(ent) = ent {
                let Some(content) = ent.content.clone() else {
                    // Note: external parsed entities will not be loaded,
                    // it is not required for a non-validating parser to
                    // complete external PEReferences coming from the
                    // internal subset
                    xml_warning_msg!(
                        ctxt,
                        XmlParserErrors::XmlErrEntityProcessing,
                        "not validating will not read content for PE entity {}\n",
                        &*ent.name
                    );
                    continue;
                };

                if check && !ctxt.parser_entity_check(content.len() as u64) {
                    return None;
                }

                if ent.has_flag(XML_ENT_EXPANDING) {
                    xml_fatal_err(ctxt, XmlParserErrors::XmlErrEntityLoop, None);
                    ctxt.halt();
                    return None;
                }

                ent.set_flag(XML_ENT_EXPANDING);
                ctxt.depth += 1;
                let rep =
                    string_decode_entities_int(ctxt, &content, what, '\0', '\0', '\0', check);
                ctxt.depth -= 1;
                ent.clear_flag(XML_ENT_EXPANDING);

                let rep = rep?;
                buffer.push_str(&rep);
            }
        } else {
            buffer.push(c);
            s = &s[c.len_utf8()..];
        }
    }
    Some(buffer)
}

/// Parse a value for ENTITY declarations
///
/// ```text
/// [9] EntityValue ::= '"' ([^%&"] | PEReference | Reference)* '"' | "'" ([^%&'] | PEReference | Reference)* "'"
/// ```
///
/// If successfully parsed, return (substituted EntityValue, EntityValue without substituted),
/// otherwise return `(None, None)`.
#[doc(alias = "xmlParseEntityValue")]
pub(crate) fn parse_entity_value(ctxt: &mut XmlParserCtxt) -> (Option<String>, Option<String>) {
    let max_length = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        XML_MAX_HUGE_LENGTH
    } else {
        XML_MAX_TEXT_LENGTH
    };

    if !matches!(ctxt.current_byte(), b'"' | b'\'') {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrEntityNotStarted, None);
        return (None, None);
    }

    let stop = ctxt.current_byte() as char;

    // The content of the entity definition is copied in a buffer.
    let mut buf = String::new();

    ctxt.instate = XmlParserInputState::XmlParserEntityValue;
    let Some(inputid) = ctxt.input().map(|input| input.id) else {
        return (None, None);
    };
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return (None, None);
    }
    ctxt.skip_char();

    // NOTE: 4.4.5 Included in Literal
    // When a parameter entity reference appears in a literal entity
    // value, ... a single or double quote character in the replacement
    // text is always treated as a normal data character and will not
    // terminate the literal.
    // In practice it means we stop the loop only when back at parsing
    // the initial entity and the quote is found
    loop {
        let Some((c, clen)) = ctxt.current_char() else {
            break;
        };
        if !xml_is_char(c as u32)
            || (c == stop && ctxt.input().is_some_and(|input| input.id == inputid))
            || matches!(ctxt.instate, XmlParserInputState::XmlParserEOF)
        {
            break;
        }
        buf.push(c);
        ctxt.advance_with_line_handling(clen);

        if buf.len() > max_length {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrEntityNotFinished,
                "entity value too long\n",
            );
            return (None, None);
        }
    }
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return (None, None);
    }
    if ctxt.current_byte() as char != stop {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrEntityNotFinished, None);
        return (None, None);
    }
    ctxt.skip_char();

    // Raise problem w.r.t. '&' and '%' being used in non-entities
    // reference constructs. Note Charref will be handled in
    // xmlStringDecodeEntities()
    let mut cur = buf.as_str();
    while let Some(pos) = cur.find(['&', '%']) {
        cur = &cur[pos..];
        if cur.starts_with("&#") {
            cur = &cur[1..];
            continue;
        }

        let tmp = cur.as_bytes()[0];
        // trim the head of '&' or '%'
        cur = &cur[1..];
        let (name, rem) = parse_string_name(ctxt, cur);
        cur = rem;

        if name.is_none() || !cur.starts_with(';') {
            xml_fatal_err_msg_int!(
                ctxt,
                XmlParserErrors::XmlErrEntityCharError,
                "EntityValue: '{}' forbidden except for entities references\n",
                tmp as i32
            );
            return (None, None);
        }

        if tmp == b'%' && ctxt.in_subset == 1 && ctxt.input_tab.len() == 1 {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrEntityPEInternal, None);
            return (None, None);
        }

        // trim the head of ';'
        cur = &cur[1..];
    }

    // Then PEReference entities are substituted.
    //
    // NOTE: 4.4.7 Bypassed
    // When a general entity reference appears in the EntityValue in
    // an entity declaration, it is bypassed and left as is.
    // so XML_SUBSTITUTE_REF is not set here.
    ctxt.depth += 1;
    let ret = string_decode_entities_int(ctxt, &buf, XML_SUBSTITUTE_PEREF, '\0', '\0', '\0', true);
    ctxt.depth -= 1;

    (ret, Some(buf))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        entity::{XmlEntitiesTable, XmlEntity, XmlEntityType},
        parser::XmlParserInput,
    };

    fn ctxt_with_input(content: &str) -> XmlParserCtxt<'static> {
        let mut ctxt = XmlParserCtxt::new_sax_parser(None);
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt
    }

    fn declare(table: &mut XmlEntitiesTable, name: &str, etype: XmlEntityType, content: &str) {
        table.add(XmlEntity::new(
            Rc::from(name),
            etype,
            Some(content.to_owned()),
            None,
            None,
        ));
    }

    #[test]
    fn decode_without_references_copies_the_input() {
        let mut ctxt = ctxt_with_input("");
        let decoded = string_decode_entities_int(
            &mut ctxt,
            "plain text, nothing to do",
            XML_SUBSTITUTE_REF,
            '\0',
            '\0',
            '\0',
            false,
        )
        .unwrap();
        assert_eq!(decoded, "plain text, nothing to do");
    }

    #[test]
    fn decode_substitutes_nested_entities() {
        let mut ctxt = ctxt_with_input("");
        declare(
            &mut ctxt.ent_tab,
            "inner",
            XmlEntityType::InternalGeneralEntity,
            "deep",
        );
        declare(
            &mut ctxt.ent_tab,
            "outer",
            XmlEntityType::InternalGeneralEntity,
            "[&inner;]",
        );
        let decoded = string_decode_entities_int(
            &mut ctxt,
            "a &outer; b",
            XML_SUBSTITUTE_REF,
            '\0',
            '\0',
            '\0',
            false,
        )
        .unwrap();
        assert_eq!(decoded, "a [deep] b");
    }

    #[test]
    fn decode_rejects_self_reference() {
        let mut ctxt = ctxt_with_input("");
        declare(
            &mut ctxt.ent_tab,
            "myself",
            XmlEntityType::InternalGeneralEntity,
            "see &myself;",
        );
        assert!(
            string_decode_entities_int(
                &mut ctxt,
                "&myself;",
                XML_SUBSTITUTE_REF,
                '\0',
                '\0',
                '\0',
                false,
            )
            .is_none()
        );
        assert_eq!(ctxt.err_no, XmlParserErrors::XmlErrEntityLoop as i32);
    }

    #[test]
    fn decode_keeps_char_refs_and_predefined() {
        let mut ctxt = ctxt_with_input("");
        let decoded = string_decode_entities_int(
            &mut ctxt,
            "1 &#x31; &amp; &#38;",
            XML_SUBSTITUTE_REF,
            '\0',
            '\0',
            '\0',
            false,
        )
        .unwrap();
        assert_eq!(decoded, "1 1 & &");
    }

    #[test]
    fn entity_value_rejects_bare_percent_in_internal_subset() {
        let mut ctxt = ctxt_with_input("\"a % b\"");
        ctxt.in_subset = 1;
        let (decoded, raw) = parse_entity_value(&mut ctxt);
        assert_eq!(decoded, None);
        assert_eq!(raw, None);
        assert!(!ctxt.well_formed);
    }

    #[test]
    fn entity_value_bypasses_general_entities() {
        let mut ctxt = ctxt_with_input("'x &unknown; y'");
        ctxt.in_subset = 1;
        ctxt.has_external_subset = true;
        let (decoded, raw) = parse_entity_value(&mut ctxt);
        assert_eq!(decoded.as_deref(), Some("x &unknown; y"));
        assert_eq!(raw.as_deref(), Some("x &unknown; y"));
    }
}
