use std::borrow::Cow;

/// Parse an XML qualified name string
///
/// ```text
/// [NS 5] QName ::= (Prefix ':')? LocalPart
///
/// [NS 6] Prefix ::= NCName
///
/// [NS 7] LocalPart ::= NCName
/// ```
///
/// Returns `None` if the name doesn't have a prefix.
/// Otherwise, returns `Some((Prefix, LocalPart))`.
///
/// # Note
/// This function does not perform validation.
#[doc(alias = "xmlSplitQName2")]
pub fn split_qname2(name: &str) -> Option<(&str, &str)> {
    // nasty but valid
    if name.starts_with(':') {
        return None;
    }

    // we are not trying to validate but just to cut, and yes it will
    // work even if this is as set of UTF-8 encoded chars
    name.split_once(':')
}

/// Builds the QName `"prefix:ncname"`.
///
/// If `prefix` is `Some` and not empty, return `Cow::Owned(QName)`.
/// Otherwise, return `Cow::Borrowed(ncname)`.
#[doc(alias = "xmlBuildQName")]
pub fn build_qname<'a>(ncname: &'a str, prefix: Option<&str>) -> Cow<'a, str> {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return Cow::Borrowed(ncname);
    };
    Cow::Owned(format!("{prefix}:{ncname}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_splitting() {
        assert_eq!(split_qname2("a:b"), Some(("a", "b")));
        assert_eq!(split_qname2("ab"), None);
        assert_eq!(split_qname2(":b"), None);
    }

    #[test]
    fn qname_building() {
        assert!(matches!(build_qname("b", Some("a")), Cow::Owned(ref s) if s == "a:b"));
        assert!(matches!(build_qname("b", None), Cow::Borrowed("b")));
        assert!(matches!(build_qname("b", Some("")), Cow::Borrowed("b")));
    }
}
