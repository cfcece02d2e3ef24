//! Identifier sanitization and item-name canonicalization (§4.5).

/// Strip `:`, `(`, `)`; replace `-` and space with `_`. Applied to variable
/// names and constraint names alike before they reach LP text.
pub fn sanitize_identifier(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, ':' | '(' | ')'))
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// Case-folded lookup of `name` against a set of known canonical names.
/// Returns the canonical spelling if a case-insensitive match exists,
/// otherwise `None`.
pub fn canonical_match<'a>(
    known: impl IntoIterator<Item = &'a str>,
    name: &str,
) -> Option<&'a str> {
    known.into_iter().find(|k| k.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_replaces_separators() {
        assert_eq!(sanitize_identifier("Iron Ore"), "Iron_Ore");
        assert_eq!(sanitize_identifier("Alternate: Wet Concrete"), "Alternate_Wet_Concrete");
        assert_eq!(sanitize_identifier("Smelter(Iron)"), "SmelterIron");
        assert_eq!(sanitize_identifier("Coal-Power"), "Coal_Power");
    }

    #[test]
    fn canonical_match_is_case_insensitive() {
        let known = ["Concrete", "Iron Ore", "MWm"];
        assert_eq!(canonical_match(known, "concrete"), Some("Concrete"));
        assert_eq!(canonical_match(known, "IRON ORE"), Some("Iron Ore"));
        assert_eq!(canonical_match(known, "Water"), None);
    }
}
