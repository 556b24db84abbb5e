//! Host-side selector hygiene: normalization for dedup comparisons and the
//! degradation ladder used when a recorded selector no longer resolves.

use once_cell::sync::Lazy;
use regex::Regex;

/// Class tokens within a selector string (`.foo-bar`).
static CLASS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[A-Za-z][\w-]*").expect("class token pattern"));

/// `#id` fragment anywhere in a selector string.
static ID_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[A-Za-z][\w-]*").expect("id fragment pattern"));

/// Leading tag token of a simple selector.
static LEADING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][\w-]*").expect("leading tag pattern"));

/// State and animation classes frameworks toggle at runtime.
const STATE_CLASSES: &[&str] = &[
    "active",
    "hover",
    "focus",
    "focused",
    "selected",
    "checked",
    "open",
    "opened",
    "show",
    "shown",
    "visible",
    "hidden",
    "collapsed",
    "expanded",
    "disabled",
    "loading",
];

/// True for class tokens that churn at runtime: `is-*`/`has-*` state
/// prefixes, bare state words, animation classes, and hashed build tokens.
fn is_dynamic_class(token: &str) -> bool {
    if token.starts_with("is-") || token.starts_with("has-") {
        return true;
    }
    if STATE_CLASSES.contains(&token) {
        return true;
    }
    if token.starts_with("animat") || token.starts_with("transition") {
        return true;
    }
    // Hashed build artifacts: long, all hex, at least one digit.
    token.len() >= 6
        && token.chars().all(|c| c.is_ascii_hexdigit())
        && token.chars().any(|c| c.is_ascii_digit())
}

/// Strip known-dynamic class fragments so two observations of the same
/// element compare equal even when its state classes changed in between.
pub fn normalize(selector: &str) -> String {
    CLASS_TOKEN
        .replace_all(selector, |caps: &regex::Captures<'_>| {
            let token = &caps[0][1..];
            if is_dynamic_class(token) {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .trim()
        .to_string()
}

/// Selectors equal after normalization are treated as the same target.
pub fn equivalent(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Progressively widened versions of a selector, strongest first: the
/// recorded form, its normalized form, an id-only selector extracted from
/// the string, then the bare tag name. Duplicates and empties are dropped.
pub fn degrade(selector: &str) -> Vec<String> {
    let mut ladder: Vec<String> = Vec::with_capacity(4);

    let mut push = |candidate: String, ladder: &mut Vec<String>| {
        if !candidate.is_empty() && !ladder.contains(&candidate) {
            ladder.push(candidate);
        }
    };

    push(selector.trim().to_string(), &mut ladder);
    push(normalize(selector), &mut ladder);
    if let Some(id) = ID_FRAGMENT.find(selector) {
        push(id.as_str().to_string(), &mut ladder);
    }
    if let Some(tag) = LEADING_TAG.find(selector.trim()) {
        push(tag.as_str().to_lowercase(), &mut ladder);
    }

    ladder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_state_classes() {
        assert_eq!(
            normalize("button.submit-btn.is-loading"),
            "button.submit-btn"
        );
        assert_eq!(normalize("div.menu.has-children.open"), "div.menu");
        assert_eq!(normalize("span.badge"), "span.badge");
    }

    #[test]
    fn keeps_prefixed_lookalikes() {
        // "opener-link" must not be mistaken for the "open" state class.
        assert_eq!(normalize("a.opener-link"), "a.opener-link");
        assert_eq!(normalize("div.showcase"), "div.showcase");
    }

    #[test]
    fn strips_hashed_tokens() {
        assert_eq!(normalize("div.card.a3f29bc1"), "div.card");
        // All-letter words that happen to be hex stay put.
        assert_eq!(normalize("div.facade"), "div.facade");
    }

    #[test]
    fn equivalence_ignores_transient_classes() {
        assert!(equivalent(
            "button.submit-btn.is-loading",
            "button.submit-btn"
        ));
        assert!(!equivalent("button.submit-btn", "button.cancel-btn"));
    }

    #[test]
    fn degradation_ladder_widens() {
        let ladder = degrade("form#login > button.submit-btn.is-busy");
        assert_eq!(
            ladder,
            vec![
                "form#login > button.submit-btn.is-busy".to_string(),
                "form#login > button.submit-btn".to_string(),
                "#login".to_string(),
                "form".to_string(),
            ]
        );
    }

    #[test]
    fn degradation_of_plain_id_is_single_entry() {
        assert_eq!(degrade("#search"), vec!["#search".to_string()]);
    }

    #[test]
    fn degradation_of_bare_tag() {
        assert_eq!(degrade("button"), vec!["button".to_string()]);
    }
}
