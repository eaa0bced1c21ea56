/// Expand `${VAR}` and `${VAR:-fallback}` in raw config text.
///
/// Unset variables without a fallback, and unterminated placeholders, are
/// kept verbatim so the parser reports them in context.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };
        match (name.is_empty(), lookup(name), fallback) {
            (false, Some(value), _) => out.push_str(&value),
            (false, None, Some(fallback)) => out.push_str(fallback),
            _ => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        (name == "CHATLAY_TEST_PORT").then(|| "8080".to_string())
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_with("port = ${CHATLAY_TEST_PORT}", lookup),
            "port = 8080"
        );
    }

    #[test]
    fn uses_fallback_for_unset_var() {
        assert_eq!(
            substitute_with("bind = \"${CHATLAY_TEST_BIND:-0.0.0.0}\"", lookup),
            "bind = \"0.0.0.0\""
        );
        assert_eq!(
            substitute_with("${CHATLAY_TEST_PORT:-1}", lookup),
            "8080"
        );
    }

    #[test]
    fn leaves_unknown_and_malformed_placeholders() {
        assert_eq!(substitute_with("${NOPE}", lookup), "${NOPE}");
        assert_eq!(substitute_with("${}", lookup), "${}");
        assert_eq!(substitute_with("a ${OPEN", lookup), "a ${OPEN");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain $text"), "plain $text");
    }
}
