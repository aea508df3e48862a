/// Upper-cases the first character, used to canonicalise titles.
pub fn capfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect()
    }
}

pub fn pluralize(word: &str) -> String {
    if word.ends_with('y') && !word.ends_with("ay") && !word.ends_with("ey") && !word.ends_with("oy") {
        format!("{}ies", &word[..word.len() - 1])
    } else if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh") {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// True if the first character is upper case.
pub fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod test {
    use crate::text::{capfirst, is_capitalized, pluralize};

    #[test]
    fn capfirst_works(){
        assert_eq!("Paris", capfirst("paris"));
        assert_eq!("ÉCole", capfirst("éCole"));
        assert_eq!("", capfirst(""));
    }

    #[test]
    fn pluralize_works(){
        assert_eq!("articles", pluralize("article"));
        assert_eq!("entries", pluralize("entry"));
        assert_eq!("boxes", pluralize("box"));
        assert_eq!("days", pluralize("day"));
    }

    #[test]
    fn capitalization(){
        assert!(is_capitalized("Paris"));
        assert!(!is_capitalized("paris"));
        assert!(!is_capitalized(""));
    }
}
