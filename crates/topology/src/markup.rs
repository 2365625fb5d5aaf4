/// Drops inline `<...>` markup tags from a station name and trims the rest.
///
/// An unterminated `<` is kept as literal text.
pub fn strip_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        out.push_str(&rest[..open]);
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_color_tags() {
        assert_eq!(strip_markup("<color=#ff0000>Central</color>"), "Central");
        assert_eq!(strip_markup("North <b>Gate</b> "), "North Gate");
    }

    #[test]
    fn keeps_unterminated_bracket() {
        assert_eq!(strip_markup("A < B"), "A < B");
        assert_eq!(strip_markup("plain"), "plain");
    }
}
