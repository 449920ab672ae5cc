use std::rc::Rc;

use crate::{
    entity::{
        XML_ENT_CHECKED_LT, XML_ENT_CONTAINS_LT, XML_ENT_EXPANDING, XmlEntity, XmlEntityType,
        xml_get_predefined_entity,
    },
    error::XmlParserErrors,
    parser::{
        XmlParserCtxt, XmlParserInput, XmlParserInputState, xml_err_msg_str, xml_fatal_err,
        xml_fatal_err_msg, xml_fatal_err_msg_int, xml_fatal_err_msg_str, xml_is_char,
        xml_warning_msg,
    },
};

use super::{parse_name, parse_string_name};

/// Parse a numeric character reference. Always consumes '&'.
///
/// ```text
/// [66] CharRef ::= '&#' [0-9]+ ';' | '&#x' [0-9a-fA-F]+ ';'
///
/// [ WFC: Legal Character ]
/// Characters referred to using character references must match the production for Char.
/// ```
///
/// Returns the value parsed, None in case of error
#[doc(alias = "xmlParseCharRef")]
pub(crate) fn parse_char_ref(ctxt: &mut XmlParserCtxt) -> Option<char> {
    let mut val = 0u32;

    // Using RAW/CUR/NEXT is okay since we are working on ASCII range here
    if ctxt.current_byte() == b'&' && ctxt.nth_byte(1) == b'#' && ctxt.nth_byte(2) == b'x' {
        ctxt.advance(3);
        while ctxt.current_byte() != b';' {
            if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
                return None;
            }
            let cur = ctxt.current_byte();
            if cur.is_ascii_digit() {
                val = val * 16 + (cur - b'0') as u32;
            } else if cur.is_ascii_hexdigit() {
                val = val * 16 + (cur.to_ascii_lowercase() - b'a') as u32 + 10;
            } else {
                xml_fatal_err(ctxt, XmlParserErrors::XmlErrInvalidHexCharRef, None);
                val = 0;
                break;
            }
            val = val.min(0x110000);
            ctxt.skip_char();
        }
        if ctxt.current_byte() == b';' {
            ctxt.advance(1);
        }
    } else if ctxt.current_byte() == b'&' && ctxt.nth_byte(1) == b'#' {
        ctxt.advance(2);
        while ctxt.current_byte() != b';' {
            if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
                return None;
            }
            let cur = ctxt.current_byte();
            if cur.is_ascii_digit() {
                val = val * 10 + (cur - b'0') as u32;
            } else {
                xml_fatal_err(ctxt, XmlParserErrors::XmlErrInvalidDecCharRef, None);
                val = 0;
                break;
            }
            val = val.min(0x110000);
            ctxt.skip_char();
        }
        if ctxt.current_byte() == b';' {
            ctxt.advance(1);
        }
    } else {
        if ctxt.current_byte() == b'&' {
            ctxt.advance(1);
        }
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrInvalidCharRef, None);
    }

    // [ WFC: Legal Character ]
    // Characters referred to using character references must match the
    // production for Char.
    if val >= 0x110000 {
        xml_fatal_err_msg_int!(
            ctxt,
            XmlParserErrors::XmlErrInvalidChar,
            "xmlParseCharRef: character reference {} out of bounds\n",
            val as i32
        );
    } else if xml_is_char(val) {
        return char::from_u32(val);
    } else {
        xml_fatal_err_msg_int!(
            ctxt,
            XmlParserErrors::XmlErrInvalidChar,
            "xmlParseCharRef: invalid XmlChar value {}\n",
            val as i32
        );
    }
    None
}

/// Parse Reference declarations, variant parsing from a string rather
/// than an an input flow.
///
/// ```text
/// [66] CharRef ::= '&#' [0-9]+ ';' | '&#x' [0-9a-fA-F]+ ';'
///
/// [ WFC: Legal Character ]
/// Characters referred to using character references must match the production for Char.
/// ```
///
/// Returns the value parsed and the remainder of the string.
#[doc(alias = "xmlParseStringCharRef")]
pub(super) fn parse_string_char_ref<'a>(
    ctxt: &mut XmlParserCtxt,
    s: &'a str,
) -> (Option<char>, &'a str) {
    let mut val = 0;

    let mut ptr = s;
    if let Some(rem) = ptr.strip_prefix("&#x") {
        ptr = rem;
        if let Some((dig, rem)) = ptr
            .split_once(';')
            .filter(|(dig, _)| !dig.is_empty() && dig.bytes().all(|b| b.is_ascii_hexdigit()))
        {
            val = u32::from_str_radix(dig, 16).unwrap_or(0x110000);
            ptr = rem;
        } else {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrInvalidHexCharRef, None);
        }
    } else if let Some(rem) = ptr.strip_prefix("&#") {
        ptr = rem;
        if let Some((dig, rem)) = ptr
            .split_once(';')
            .filter(|(dig, _)| !dig.is_empty() && dig.bytes().all(|b| b.is_ascii_digit()))
        {
            val = dig.parse::<u32>().unwrap_or(0x110000);
            ptr = rem;
        } else {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrInvalidDecCharRef, None);
        }
    } else {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrInvalidCharRef, None);
        return (None, s);
    }

    // [ WFC: Legal Character ]
    // Characters referred to using character references must match the
    // production for Char.
    if val >= 0x110000 {
        xml_fatal_err_msg_int!(
            ctxt,
            XmlParserErrors::XmlErrInvalidChar,
            "xmlParseStringCharRef: character reference {} out of bounds\n",
            val as i32
        );
    } else if xml_is_char(val) {
        return (char::from_u32(val), ptr);
    } else {
        xml_fatal_err_msg_int!(
            ctxt,
            XmlParserErrors::XmlErrInvalidChar,
            "xmlParseStringCharRef: invalid xmlChar value {}\n",
            val as i32
        );
    }
    (None, ptr)
}

/// Apply the well-formedness checks shared by the stream and string
/// entity-reference parsers once `name` has been resolved to `ent`.
fn check_entity_ref(ctxt: &mut XmlParserCtxt, ent: Option<&Rc<XmlEntity>>, name: &str) {
    // [ WFC: Entity Declared ]
    // In a document without any DTD, a document with only an
    // internal DTD subset which contains no parameter entity
    // references, or a document with "standalone='yes'", the
    // Name given in the entity reference must match that in an
    // entity declaration, except that well-formed documents
    // need not declare any of the following entities: amp, lt,
    // gt, apos, quot.
    // The declaration of a parameter entity must precede any
    // reference to it.
    // Similarly, the declaration of a general entity must
    // precede any reference to it which appears in a default
    // value in an attribute-list declaration. Note that if
    // entities are declared in the external subset or in
    // external parameter entities, a non-validating processor
    // is not obligated to read and process their declarations;
    // for such documents, the rule that an entity must be
    // declared is a well-formedness constraint only if
    // standalone='yes'.
    if let Some(ent) = ent {
        if matches!(ent.etype, XmlEntityType::ExternalGeneralUnparsedEntity) {
            // [ WFC: Parsed Entity ]
            // An entity reference must not contain the name of an unparsed entity
            xml_fatal_err_msg_str!(
                ctxt,
                XmlParserErrors::XmlErrUnparsedEntity,
                "Entity reference to unparsed entity {}\n",
                name
            );
        } else if matches!(ctxt.instate, XmlParserInputState::XmlParserAttributeValue)
            && matches!(ent.etype, XmlEntityType::ExternalGeneralParsedEntity)
        {
            // [ WFC: No External Entity References ]
            // Attribute values cannot contain direct or indirect
            // entity references to external entities.
            xml_fatal_err_msg_str!(
                ctxt,
                XmlParserErrors::XmlErrEntityIsExternal,
                "Attribute references external entity '{}'\n",
                name
            );
        } else if matches!(ctxt.instate, XmlParserInputState::XmlParserAttributeValue)
            && !matches!(ent.etype, XmlEntityType::InternalPredefinedEntity)
        {
            // [ WFC: No < in Attribute Values ]
            // The replacement text of any entity referred to directly or
            // indirectly in an attribute value (other than "&lt;") must not contain a <.
            if !ent.has_flag(XML_ENT_CHECKED_LT) {
                if ent.content.as_deref().is_some_and(|c| c.contains('<')) {
                    ent.set_flag(XML_ENT_CONTAINS_LT);
                }
                ent.set_flag(XML_ENT_CHECKED_LT);
            }
            if ent.has_flag(XML_ENT_CONTAINS_LT) {
                xml_fatal_err_msg_str!(
                    ctxt,
                    XmlParserErrors::XmlErrLtInAttribute,
                    "'<' in entity '{}' is not allowed in attributes values\n",
                    name
                );
            }
        } else if ent.is_parameter() {
            // Internal check, no parameter entities here ...
            xml_fatal_err_msg_str!(
                ctxt,
                XmlParserErrors::XmlErrEntityIsParameter,
                "Attempt to reference the parameter entity '{}'\n",
                name
            );
        }
    } else if ctxt.standalone == 1 || (!ctxt.has_external_subset && !ctxt.has_perefs) {
        xml_fatal_err_msg_str!(
            ctxt,
            XmlParserErrors::XmlErrUndeclaredEntity,
            "Entity '{}' not defined\n",
            name
        );
    } else {
        xml_err_msg_str!(
            ctxt,
            XmlParserErrors::XmlWarUndeclaredEntity,
            "Entity '{}' not defined\n",
            name
        );
    }
}

/// Parse an entity reference. Always consumes '&'.
///
/// ```text
/// [68] EntityRef ::= '&' Name ';'
/// ```
///
/// Returns the entity if found, or None otherwise.
#[doc(alias = "xmlParseEntityRef")]
pub(crate) fn parse_entity_ref(ctxt: &mut XmlParserCtxt) -> Option<Rc<XmlEntity>> {
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return None;
    }

    if ctxt.current_byte() != b'&' {
        return None;
    }
    ctxt.skip_char();
    let Some(name) = parse_name(ctxt) else {
        xml_fatal_err_msg(
            ctxt,
            XmlParserErrors::XmlErrNameRequired,
            "xmlParseEntityRef: no name\n",
        );
        return None;
    };
    if ctxt.current_byte() != b';' {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrEntityRefSemicolMissing, None);
        return None;
    }
    ctxt.skip_char();

    // Predefined entities override any extra definition
    if let Some(ent) = xml_get_predefined_entity(&name) {
        return Some(ent);
    }

    let ent = ctxt.ent_tab.get(&name);
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return None;
    }
    check_entity_ref(ctxt, ent.as_ref(), &name);
    if ent.is_none() && ctxt.in_subset == 0 && ctxt.disable_sax == 0 {
        // surface the unresolved reference so the consumer can decide
        if let Some(sax) = ctxt.sax.as_deref_mut() {
            sax.reference(&name);
        }
    }

    // [ WFC: No Recursion ]
    // A parsed entity must not contain a recursive reference
    // to itself, either directly or indirectly.
    // Done somewhere else
    ent
}

/// Parse ENTITY references declarations, but this version parses it from
/// a string value.
///
/// ```text
/// [68] EntityRef ::= '&' Name ';'
/// ```
///
/// Returns the entity if found and the remainder of the string.
#[doc(alias = "xmlParseStringEntityRef")]
pub(super) fn parse_string_entity_ref<'a>(
    ctxt: &mut XmlParserCtxt,
    s: &'a str,
) -> (Option<Rc<XmlEntity>>, &'a str) {
    let Some(ptr) = s.strip_prefix('&') else {
        return (None, s);
    };

    let (Some(name), rem) = parse_string_name(ctxt, ptr) else {
        xml_fatal_err_msg(
            ctxt,
            XmlParserErrors::XmlErrNameRequired,
            "xmlParseStringEntityRef: no name\n",
        );
        return (None, ptr);
    };
    let Some(ptr) = rem.strip_prefix(';') else {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrEntityRefSemicolMissing, None);
        return (None, rem);
    };

    // Predefined entities override any extra definition
    if let Some(ent) = xml_get_predefined_entity(&name) {
        return (Some(ent), ptr);
    }

    let ent = ctxt.ent_tab.get(&name);
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return (None, s);
    }
    check_entity_ref(ctxt, ent.as_ref(), &name);

    (ent, ptr)
}

/// Parse PEReference declarations, but this version parses it from
/// a string value.
///
/// ```text
/// [69] PEReference ::= '%' Name ';'
/// ```
///
/// Returns the entity if found and the remainder of the string.
#[doc(alias = "xmlParseStringPEReference")]
pub(super) fn parse_string_pereference<'a>(
    ctxt: &mut XmlParserCtxt,
    s: &'a str,
) -> (Option<Rc<XmlEntity>>, &'a str) {
    let Some(ptr) = s.strip_prefix('%') else {
        return (None, s);
    };
    let (Some(name), rem) = parse_string_name(ctxt, ptr) else {
        xml_fatal_err_msg(
            ctxt,
            XmlParserErrors::XmlErrNameRequired,
            "xmlParseStringPEReference: no name\n",
        );
        return (None, ptr);
    };
    let Some(ptr) = rem.strip_prefix(';') else {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrEntityRefSemicolMissing, None);
        return (None, rem);
    };

    let entity = ctxt.pe_tab.get(&name);
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return (None, ptr);
    }
    if let Some(entity) = entity.as_deref() {
        // Internal checking in case the entity quest barfed
        if !entity.is_parameter() {
            xml_warning_msg!(
                ctxt,
                XmlParserErrors::XmlWarUndeclaredEntity,
                "%{}; is not a parameter entity\n",
                name
            );
        }
    } else if ctxt.standalone == 1 || (!ctxt.has_external_subset && !ctxt.has_perefs) {
        xml_fatal_err_msg_str!(
            ctxt,
            XmlParserErrors::XmlErrUndeclaredEntity,
            "PEReference: %{}; not found\n",
            name
        );
    } else {
        // [ VC: Entity Declared ]
        // In a document with an external subset or external
        // parameter entities with "standalone='no'", ...
        // ... The declaration of a parameter entity must
        // precede any reference to it...
        xml_warning_msg!(
            ctxt,
            XmlParserErrors::XmlWarUndeclaredEntity,
            "PEReference: %{}; not found\n",
            name
        );
    }
    ctxt.has_perefs = true;
    (entity, ptr)
}

impl XmlParserCtxt<'_> {
    /// Parse a parameter-entity reference and push its replacement text as
    /// a new input stream. Always consumes '%'.
    ///
    /// ```text
    /// [69] PEReference ::= '%' Name ';'
    ///
    /// [ WFC: No Recursion ]
    /// A parsed entity must not contain a recursive
    /// reference to itself, either directly or indirectly.
    ///
    /// [ WFC: In DTD ]
    /// Parameter-entity references may only appear in the DTD.
    /// ```
    #[doc(alias = "xmlParsePEReference")]
    pub(crate) fn parse_pe_reference(&mut self) {
        if self.current_byte() != b'%' {
            return;
        }
        self.skip_char();
        let Some(name) = parse_name(self) else {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrPERefNoName,
                "PEReference: no name\n",
            );
            return;
        };
        if self.current_byte() != b';' {
            xml_fatal_err(self, XmlParserErrors::XmlErrPERefSemicolMissing, None);
            return;
        }
        self.skip_char();

        let Some(ent) = self.pe_tab.get(&name) else {
            // [ WFC: Entity Declared ]
            // In a document without any DTD, a document with only an
            // internal DTD subset which contains no parameter entity
            // references, or a document with "standalone='yes'", ...
            // ... The declaration of a parameter entity must precede
            // any reference to it...
            if self.standalone == 1 || (!self.has_external_subset && !self.has_perefs) {
                xml_fatal_err_msg_str!(
                    self,
                    XmlParserErrors::XmlErrUndeclaredEntity,
                    "PEReference: %{}; not found\n",
                    &*name
                );
            } else {
                xml_warning_msg!(
                    self,
                    XmlParserErrors::XmlWarUndeclaredEntity,
                    "PEReference: %{}; not found\n",
                    &*name
                );
            }
            self.has_perefs = true;
            return;
        };
        self.has_perefs = true;

        if !ent.is_parameter() {
            xml_warning_msg!(
                self,
                XmlParserErrors::XmlWarUndeclaredEntity,
                "%{}; is not a parameter entity\n",
                &*name
            );
            return;
        }
        if ent.content.is_none() {
            // External parameter entities are not fetched; declarations
            // they would carry are simply not seen.
            xml_warning_msg!(
                self,
                XmlParserErrors::XmlErrEntityProcessing,
                "PEReference: %{}; not loaded\n",
                &*name
            );
            return;
        }
        if ent.has_flag(XML_ENT_EXPANDING) {
            xml_fatal_err(self, XmlParserErrors::XmlErrEntityLoop, None);
            self.halt();
            return;
        }
        if !self.parser_entity_check(0) {
            return;
        }
        ent.set_flag(XML_ENT_EXPANDING);
        let id = self.next_input_id();
        let input = XmlParserInput::from_entity(Rc::clone(&ent), id);
        if self.push_input(input) < 0 {
            ent.clear_flag(XML_ENT_EXPANDING);
        }
    }

    /// Parse and handle an entity reference in content. Always consumes '&'.
    ///
    /// ```text
    /// [67] Reference ::= EntityRef | CharRef
    /// ```
    ///
    /// A character reference is delivered as character data. A general
    /// entity is either expanded by pushing its replacement text as a new
    /// input stream (when entity substitution is on), or surfaced through
    /// the `reference` callback.
    #[doc(alias = "xmlParseReference")]
    pub(crate) fn parse_reference(&mut self) {
        if self.current_byte() != b'&' {
            return;
        }

        // Simple case of a CharRef
        if self.nth_byte(1) == b'#' {
            let Some(c) = parse_char_ref(self) else {
                return;
            };
            let mut buf = [0u8; 4];
            let out = c.encode_utf8(&mut buf);
            if self.disable_sax == 0 {
                if let Some(sax) = self.sax.as_deref_mut() {
                    sax.characters(out);
                }
            }
            return;
        }

        let Some(ent) = parse_entity_ref(self) else {
            return;
        };
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return;
        }

        // The predefined entities are always substituted.
        if ent.is_predefined() {
            if let Some(content) = ent.content.clone() {
                if self.disable_sax == 0 {
                    if let Some(sax) = self.sax.as_deref_mut() {
                        sax.characters(&content);
                    }
                }
            }
            return;
        }

        // Charge the fixed per-reference cost even before deciding whether
        // to expand; the produced bytes are charged when the stream is
        // popped.
        if !self.parser_entity_check(0) {
            return;
        }

        if !self.replace_entities {
            if self.disable_sax == 0 {
                if let Some(sax) = self.sax.as_deref_mut() {
                    sax.reference(&ent.name);
                }
            }
            return;
        }

        if ent.content.is_none() {
            // external entity whose content was never loaded
            return;
        }

        // [ WFC: No Recursion ]
        // A parsed entity must not contain a recursive reference
        // to itself, either directly or indirectly.
        if ent.has_flag(XML_ENT_EXPANDING) {
            xml_fatal_err(self, XmlParserErrors::XmlErrEntityLoop, None);
            self.halt();
            return;
        }
        ent.set_flag(XML_ENT_EXPANDING);
        let id = self.next_input_id();
        let input = XmlParserInput::from_entity(Rc::clone(&ent), id);
        if self.push_input(input) < 0 {
            ent.clear_flag(XML_ENT_EXPANDING);
        }
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
    fn char_refs() {
        let mut ctxt = ctxt_with_input("&#65;&#x41;&#x26;");
        assert_eq!(parse_char_ref(&mut ctxt), Some('A'));
        assert_eq!(parse_char_ref(&mut ctxt), Some('A'));
        assert_eq!(parse_char_ref(&mut ctxt), Some('&'));
    }

    #[test]
    fn invalid_char_ref_is_fatal() {
        let mut ctxt = ctxt_with_input("&#x0;");
        assert_eq!(parse_char_ref(&mut ctxt), None);
        assert!(!ctxt.well_formed);
    }

    #[test]
    fn string_char_ref() {
        let mut ctxt = ctxt_with_input("");
        let (c, rem) = parse_string_char_ref(&mut ctxt, "&#xE9;rest");
        assert_eq!(c, Some('\u{e9}'));
        assert_eq!(rem, "rest");
    }

    #[test]
    fn predefined_refs_resolve_without_declaration() {
        let mut ctxt = ctxt_with_input("&amp;");
        let ent = parse_entity_ref(&mut ctxt).unwrap();
        assert!(ent.is_predefined());
        assert_eq!(ent.content.as_deref(), Some("&"));
        assert!(ctxt.well_formed);
    }

    #[test]
    fn undeclared_entity_is_fatal_without_dtd() {
        let mut ctxt = ctxt_with_input("&nope;");
        assert!(parse_entity_ref(&mut ctxt).is_none());
        assert!(!ctxt.well_formed);
        assert_eq!(
            ctxt.err_no,
            XmlParserErrors::XmlErrUndeclaredEntity as i32
        );
    }

    #[test]
    fn undeclared_entity_downgrades_with_external_subset() {
        let mut ctxt = ctxt_with_input("&nope;");
        ctxt.has_external_subset = true;
        assert!(parse_entity_ref(&mut ctxt).is_none());
        assert!(ctxt.well_formed);
        assert_eq!(ctxt.err_no, XmlParserErrors::XmlWarUndeclaredEntity as i32);
    }
}
