use crate::{
    error::{XmlError, XmlErrorDomain, XmlErrorLevel, XmlParserErrors},
    parser::{XmlParserCtxt, XmlParserInputState, XmlParserOption},
};

impl XmlParserCtxt<'_> {
    /// Build a diagnostic record at the current position, remember it as the
    /// last error and dispatch it to the matching SAX error callback.
    ///
    /// All the reporting macros funnel through here.
    pub(crate) fn raise_error(
        &mut self,
        domain: XmlErrorDomain,
        code: XmlParserErrors,
        level: XmlErrorLevel,
        str1: Option<String>,
        str2: Option<String>,
        str3: Option<String>,
        int1: i32,
        msg: &str,
    ) {
        if matches!(level, XmlErrorLevel::XmlErrWarning)
            && self.options & XmlParserOption::XmlParseNoWarning as i32 != 0
        {
            return;
        }
        if !matches!(level, XmlErrorLevel::XmlErrWarning)
            && self.options & XmlParserOption::XmlParseNoError as i32 != 0
        {
            return;
        }
        let (line, column) = self
            .input()
            .map_or((0, 0), |input| (input.line, input.col));
        let error = XmlError {
            domain,
            code,
            level,
            message: msg.to_owned(),
            line,
            column,
            str1,
            str2,
            str3,
            int1,
        };
        if let Some(sax) = self.sax.as_deref_mut() {
            match level {
                XmlErrorLevel::XmlErrWarning => sax.warning(&error),
                XmlErrorLevel::XmlErrFatal => sax.fatal_error(&error),
                _ => sax.error(&error),
            }
        }
        self.last_error = error;
    }
}

/// Handle a fatal parser error, i.e. violating Well-Formedness constraints
#[doc(alias = "xmlFatalErr")]
pub(crate) fn xml_fatal_err(ctxt: &mut XmlParserCtxt, error: XmlParserErrors, info: Option<&str>) {
    if ctxt.disable_sax != 0 && matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return;
    }
    let errmsg = match error {
        XmlParserErrors::XmlErrInvalidHexCharRef => "CharRef: invalid hexadecimal value",
        XmlParserErrors::XmlErrInvalidDecCharRef => "CharRef: invalid decimal value",
        XmlParserErrors::XmlErrInvalidCharRef => "CharRef: invalid value",
        XmlParserErrors::XmlErrInternalError => "internal error",
        XmlParserErrors::XmlErrPERefAtEOF => "PEReference at end of document",
        XmlParserErrors::XmlErrPERefInProlog => "PEReference in prolog",
        XmlParserErrors::XmlErrPERefInEpilog => "PEReference in epilog",
        XmlParserErrors::XmlErrPERefNoName => "PEReference: no name",
        XmlParserErrors::XmlErrPERefSemicolMissing => "PEReference: expecting ';'",
        XmlParserErrors::XmlErrEntityLoop => "Detected an entity reference loop",
        XmlParserErrors::XmlErrEntityNotStarted => "EntityValue: \" or ' expected",
        XmlParserErrors::XmlErrEntityNotFinished => "EntityValue: \" or ' expected",
        XmlParserErrors::XmlErrAttributeNotStarted => "AttValue: \" or ' expected",
        XmlParserErrors::XmlErrLtInAttribute => "Unescaped '<' not allowed in attributes values",
        XmlParserErrors::XmlErrLiteralNotStarted => "SystemLiteral \" or ' expected",
        XmlParserErrors::XmlErrLiteralNotFinished => {
            "Unfinished System or Public ID \" or ' expected"
        }
        XmlParserErrors::XmlErrMisplacedCDATAEnd => "Sequence ']]>' not allowed in content",
        XmlParserErrors::XmlErrURIRequired => "SYSTEM or PUBLIC, the URI is missing",
        XmlParserErrors::XmlErrPubidRequired => "PUBLIC, the Public Identifier is missing",
        XmlParserErrors::XmlErrHyphenInComment => "Comment must not contain '--' (double-hyphen)",
        XmlParserErrors::XmlErrPINotStarted => "xmlParsePI : no target name",
        XmlParserErrors::XmlErrReservedXmlName => "Invalid PI name",
        XmlParserErrors::XmlErrNotationNotStarted => "NOTATION: Name expected here",
        XmlParserErrors::XmlErrNotationNotFinished => "'>' required to close NOTATION declaration",
        XmlParserErrors::XmlErrValueRequired => "Entity value required",
        XmlParserErrors::XmlErrURIFragment => "Fragment not allowed",
        XmlParserErrors::XmlErrAttlistNotStarted => "'(' required to start ATTLIST enumeration",
        XmlParserErrors::XmlErrNmtokenRequired => "NmToken expected in ATTLIST enumeration",
        XmlParserErrors::XmlErrAttlistNotFinished => "')' required to finish ATTLIST enumeration",
        XmlParserErrors::XmlErrMixedNotStarted => "MixedContentDecl : '|' or ')*' expected",
        XmlParserErrors::XmlErrPCDATARequired => "MixedContentDecl : '#PCDATA' expected",
        XmlParserErrors::XmlErrElemcontentNotStarted => "ContentDecl : Name or '(' expected",
        XmlParserErrors::XmlErrElemcontentNotFinished => "ContentDecl : ',' '|' or ')' expected",
        XmlParserErrors::XmlErrPERefInIntSubset => {
            "PEReference: forbidden within markup decl in internal subset"
        }
        XmlParserErrors::XmlErrGtRequired => "expected '>'",
        XmlParserErrors::XmlErrCondsecInvalid => "XmlConditionalSection invalid",
        XmlParserErrors::XmlErrCondsecInvalidKeyword => {
            "Content error in the conditional section"
        }
        XmlParserErrors::XmlErrExtSubsetNotFinished => "Content error in the external subset",
        XmlParserErrors::XmlErrCondsecNotFinished => "XmlConditionalSection not finished",
        XmlParserErrors::XmlErrXMLDeclNotStarted => "Text declaration '<?xml' required",
        XmlParserErrors::XmlErrXMLDeclNotFinished => "parsing XML declaration: '?>' expected",
        XmlParserErrors::XmlErrExtEntityStandalone => {
            "external parsed entities cannot be standalone"
        }
        XmlParserErrors::XmlErrEntityRefSemicolMissing => "EntityRef: expecting ';'",
        XmlParserErrors::XmlErrDoctypeNotFinished => "DOCTYPE improperly terminated",
        XmlParserErrors::XmlErrLtSlashRequired => "EndTag: '</' not found",
        XmlParserErrors::XmlErrEqualRequired => "expected '='",
        XmlParserErrors::XmlErrStringNotClosed => "String not closed expecting \" or '",
        XmlParserErrors::XmlErrStringNotStarted => "String not started expecting ' or \"",
        XmlParserErrors::XmlErrEncodingName => "Invalid XML encoding name",
        XmlParserErrors::XmlErrStandaloneValue => "standalone accepts only 'yes' or 'no'",
        XmlParserErrors::XmlErrDocumentEmpty => "Document is empty",
        XmlParserErrors::XmlErrDocumentEnd => "Extra content at the end of the document",
        XmlParserErrors::XmlErrNotWellBalanced => "chunk is not well balanced",
        XmlParserErrors::XmlErrExtraContent => "extra content at the end of well balanced chunk",
        XmlParserErrors::XmlErrVersionMissing => "Malformed declaration expecting version",
        XmlParserErrors::XmlErrNameTooLong => "Name too long",
        XmlParserErrors::XmlErrInvalidEncoding => "Invalid bytes in character encoding",
        _ => "Unregistered error message",
    };
    ctxt.err_no = error as i32;
    let msg = if let Some(info) = info {
        format!("{errmsg}: {info}\n")
    } else {
        format!("{errmsg}\n")
    };
    ctxt.raise_error(
        XmlErrorDomain::XmlFromParser,
        error,
        XmlErrorLevel::XmlErrFatal,
        info.map(|info| info.to_owned()),
        None,
        None,
        0,
        &msg,
    );
    ctxt.well_formed = false;
    if !ctxt.recovery {
        ctxt.disable_sax = 1;
    }
}

/// Handle a fatal parser error, i.e. violating Well-Formedness constraints
#[doc(alias = "xmlFatalErrMsg")]
pub(crate) fn xml_fatal_err_msg(ctxt: &mut XmlParserCtxt, error: XmlParserErrors, msg: &str) {
    if ctxt.disable_sax != 0 && matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return;
    }
    ctxt.err_no = error as i32;
    ctxt.raise_error(
        XmlErrorDomain::XmlFromParser,
        error,
        XmlErrorLevel::XmlErrFatal,
        None,
        None,
        None,
        0,
        msg,
    );
    ctxt.well_formed = false;
    if !ctxt.recovery {
        ctxt.disable_sax = 1;
    }
}

/// Handle a fatal parser error, i.e. violating Well-Formedness constraints
#[doc(alias = "xmlFatalErrMsgStr")]
macro_rules! xml_fatal_err_msg_str {
    ($ctxt:expr, $error:expr, $msg:literal) =>  {
        $crate::parser::xml_fatal_err_msg_str!(@inner $ctxt, $error, $msg.to_owned(), None);
    };
    ($ctxt:expr, $error:expr, $msg:literal, $val:expr) =>  {
        let msg = format!($msg, $val);
        $crate::parser::xml_fatal_err_msg_str!(@inner $ctxt, $error, msg, Some($val.to_owned()));
    };
    (@inner $ctxt:expr, $error:expr, $msg:expr, $val:expr) => {
        let ctxt: &mut $crate::parser::XmlParserCtxt = $ctxt;
        if ctxt.disable_sax == 0
            || !matches!(ctxt.instate, $crate::parser::XmlParserInputState::XmlParserEOF)
        {
            ctxt.err_no = $error as i32;
            ctxt.raise_error(
                $crate::error::XmlErrorDomain::XmlFromParser,
                $error,
                $crate::error::XmlErrorLevel::XmlErrFatal,
                $val,
                None,
                None,
                0,
                &$msg,
            );
            ctxt.well_formed = false;
            if !ctxt.recovery {
                ctxt.disable_sax = 1;
            }
        }
    };
}
pub(crate) use xml_fatal_err_msg_str;

/// Handle a fatal parser error, i.e. violating Well-Formedness constraints
#[doc(alias = "xmlFatalErrMsgInt")]
macro_rules! xml_fatal_err_msg_int {
    ($ctxt:expr, $error:expr, $msg:literal, $val:expr) => {
        let ctxt: &mut $crate::parser::XmlParserCtxt = $ctxt;
        if ctxt.disable_sax == 0
            || !matches!(ctxt.instate, $crate::parser::XmlParserInputState::XmlParserEOF)
        {
            ctxt.err_no = $error as i32;
            let msg = format!($msg, $val);
            ctxt.raise_error(
                $crate::error::XmlErrorDomain::XmlFromParser,
                $error,
                $crate::error::XmlErrorLevel::XmlErrFatal,
                None,
                None,
                None,
                $val,
                &msg,
            );
            ctxt.well_formed = false;
            if !ctxt.recovery {
                ctxt.disable_sax = 1;
            }
        }
    };
}
pub(crate) use xml_fatal_err_msg_int;

/// Handle a fatal parser error, i.e. violating Well-Formedness constraints
#[doc(alias = "xmlFatalErrMsgStrIntStr")]
macro_rules! xml_fatal_err_msg_str_int_str {
    ($ctxt:expr, $error:expr, $msg:literal, $str1:expr, $val:expr) => {
        let msg = format!($msg, $str1, $val);
        $crate::parser::xml_fatal_err_msg_str_int_str!(
            @inner $ctxt, $error, msg, Some($str1.to_owned()), $val, None
        );
    };
    ($ctxt:expr, $error:expr, $msg:literal, $str1:expr, $val:expr, $str2:expr) => {
        let msg = format!($msg, $str1, $val, $str2);
        $crate::parser::xml_fatal_err_msg_str_int_str!(
            @inner $ctxt, $error, msg, Some($str1.to_owned()), $val, Some($str2.to_owned())
        );
    };
    (@inner $ctxt:expr, $error:expr, $msg:expr, $str1:expr, $val:expr, $str2:expr) => {
        let ctxt: &mut $crate::parser::XmlParserCtxt = $ctxt;
        if ctxt.disable_sax == 0
            || !matches!(ctxt.instate, $crate::parser::XmlParserInputState::XmlParserEOF)
        {
            ctxt.err_no = $error as i32;
            ctxt.raise_error(
                $crate::error::XmlErrorDomain::XmlFromParser,
                $error,
                $crate::error::XmlErrorLevel::XmlErrFatal,
                $str1,
                $str2,
                None,
                $val,
                &$msg,
            );
            ctxt.well_formed = false;
            if !ctxt.recovery {
                ctxt.disable_sax = 1;
            }
        }
    };
}
pub(crate) use xml_fatal_err_msg_str_int_str;

/// Handle a non fatal parser error
#[doc(alias = "xmlErrMsgStr")]
macro_rules! xml_err_msg_str {
    ($ctxt:expr, $error:expr, $msg:literal) => {
        $crate::parser::xml_err_msg_str!(@inner $ctxt, $error, $msg.to_owned(), None);
    };
    ($ctxt:expr, $error:expr, $msg:literal, $val:expr) => {
        let msg = format!($msg, $val);
        $crate::parser::xml_err_msg_str!(@inner $ctxt, $error, msg, Some($val.to_owned()));
    };
    (@inner $ctxt:expr, $error:expr, $msg:expr, $val:expr) => {
        let ctxt: &mut $crate::parser::XmlParserCtxt = $ctxt;
        if ctxt.disable_sax == 0
            || !matches!(ctxt.instate, $crate::parser::XmlParserInputState::XmlParserEOF)
        {
            ctxt.err_no = $error as i32;
            ctxt.raise_error(
                $crate::error::XmlErrorDomain::XmlFromParser,
                $error,
                $crate::error::XmlErrorLevel::XmlErrError,
                $val,
                None,
                None,
                0,
                &$msg,
            );
        }
    };
}
pub(crate) use xml_err_msg_str;

/// Handle a warning.
#[doc(alias = "xmlWarningMsg")]
macro_rules! xml_warning_msg {
    ($ctxt:expr, $error:expr, $msg:literal) => {
        $crate::parser::xml_warning_msg!(@inner $ctxt, $error, $msg.to_owned(), None, None);
    };
    ($ctxt:expr, $error:expr, $msg:literal, $str1:expr) => {
        let msg = format!($msg, $str1);
        $crate::parser::xml_warning_msg!(@inner $ctxt, $error, msg, Some($str1.to_owned()), None);
    };
    ($ctxt:expr, $error:expr, $msg:literal, $str1:expr, $str2:expr) => {
        let msg = format!($msg, $str1, $str2);
        $crate::parser::xml_warning_msg!(
            @inner $ctxt, $error, msg, Some($str1.to_owned()), Some($str2.to_owned())
        );
    };
    (@inner $ctxt:expr, $error:expr, $msg:expr, $str1:expr, $str2:expr) => {
        let ctxt: &mut $crate::parser::XmlParserCtxt = $ctxt;
        if ctxt.disable_sax == 0
            || !matches!(ctxt.instate, $crate::parser::XmlParserInputState::XmlParserEOF)
        {
            ctxt.raise_error(
                $crate::error::XmlErrorDomain::XmlFromParser,
                $error,
                $crate::error::XmlErrorLevel::XmlErrWarning,
                $str1,
                $str2,
                None,
                0,
                &$msg,
            );
        }
    };
}
pub(crate) use xml_warning_msg;

/// Handle a namespace error, i.e. violating Namespaces in XML constraints
#[doc(alias = "xmlNsErr")]
macro_rules! xml_ns_err {
    ($ctxt:expr, $error:expr, $msg:literal) => {
        $crate::parser::xml_ns_err!(@inner $ctxt, $error, $msg.to_owned(), None, None, None);
    };
    ($ctxt:expr, $error:expr, $msg:literal, $info1:expr) => {
        let msg = format!($msg, $info1);
        $crate::parser::xml_ns_err!(
            @inner $ctxt, $error, msg, Some($info1.to_owned()), None, None
        );
    };
    ($ctxt:expr, $error:expr, $msg:literal, $info1:expr, $info2:expr) => {
        let msg = format!($msg, $info1, $info2);
        $crate::parser::xml_ns_err!(
            @inner $ctxt, $error, msg, Some($info1.to_owned()), Some($info2.to_owned()), None
        );
    };
    ($ctxt:expr, $error:expr, $msg:literal, $info1:expr, $info2:expr, $info3:expr) => {
        let msg = format!($msg, $info1, $info2, $info3);
        $crate::parser::xml_ns_err!(
            @inner $ctxt, $error, msg,
            Some($info1.to_owned()), Some($info2.to_owned()), Some($info3.to_owned())
        );
    };
    (@inner $ctxt:expr, $error:expr, $msg:expr, $info1:expr, $info2:expr, $info3:expr) => {
        let ctxt: &mut $crate::parser::XmlParserCtxt = $ctxt;
        if ctxt.disable_sax == 0
            || !matches!(ctxt.instate, $crate::parser::XmlParserInputState::XmlParserEOF)
        {
            ctxt.err_no = $error as i32;
            ctxt.raise_error(
                $crate::error::XmlErrorDomain::XmlFromNamespace,
                $error,
                $crate::error::XmlErrorLevel::XmlErrError,
                $info1,
                $info2,
                $info3,
                0,
                &$msg,
            );
            ctxt.ns_well_formed = false;
        }
    };
}
pub(crate) use xml_ns_err;

/// Handle a namespace warning
#[doc(alias = "xmlNsWarn")]
macro_rules! xml_ns_warn {
    ($ctxt:expr, $error:expr, $msg:literal, $info1:expr) => {
        let msg = format!($msg, $info1);
        $crate::parser::xml_ns_warn!(
            @inner $ctxt, $error, msg, Some($info1.to_owned()), None
        );
    };
    ($ctxt:expr, $error:expr, $msg:literal, $info1:expr, $info2:expr) => {
        let msg = format!($msg, $info1, $info2);
        $crate::parser::xml_ns_warn!(
            @inner $ctxt, $error, msg, Some($info1.to_owned()), Some($info2.to_owned())
        );
    };
    (@inner $ctxt:expr, $error:expr, $msg:expr, $info1:expr, $info2:expr) => {
        let ctxt: &mut $crate::parser::XmlParserCtxt = $ctxt;
        if ctxt.disable_sax == 0
            || !matches!(ctxt.instate, $crate::parser::XmlParserInputState::XmlParserEOF)
        {
            ctxt.raise_error(
                $crate::error::XmlErrorDomain::XmlFromNamespace,
                $error,
                $crate::error::XmlErrorLevel::XmlErrWarning,
                $info1,
                $info2,
                None,
                0,
                &$msg,
            );
        }
    };
}
pub(crate) use xml_ns_warn;

/// Handle a redefinition of attribute error
#[doc(alias = "xmlErrAttributeDup")]
pub(crate) fn xml_err_attribute_dup(
    ctxt: &mut XmlParserCtxt,
    prefix: Option<&str>,
    localname: &str,
) {
    if ctxt.disable_sax != 0 && matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return;
    }
    ctxt.err_no = XmlParserErrors::XmlErrAttributeRedefined as i32;
    if let Some(prefix) = prefix {
        let msg = format!("Attribute {prefix}:{localname} redefined\n");
        ctxt.raise_error(
            XmlErrorDomain::XmlFromParser,
            XmlParserErrors::XmlErrAttributeRedefined,
            XmlErrorLevel::XmlErrFatal,
            Some(prefix.to_owned()),
            Some(localname.to_owned()),
            None,
            0,
            &msg,
        );
    } else {
        let msg = format!("Attribute {localname} redefined\n");
        ctxt.raise_error(
            XmlErrorDomain::XmlFromParser,
            XmlParserErrors::XmlErrAttributeRedefined,
            XmlErrorLevel::XmlErrFatal,
            Some(localname.to_owned()),
            None,
            None,
            0,
            &msg,
        );
    }
    ctxt.well_formed = false;
    if !ctxt.recovery {
        ctxt.disable_sax = 1;
    }
}
