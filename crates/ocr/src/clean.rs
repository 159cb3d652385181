use std::sync::OnceLock;

use regex::Regex;

fn re_excess_newlines() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\n{3,}").expect("invalid regex"))
}

/// Strip control characters (tab, newline and carriage return survive),
/// collapse runs of 3+ newlines down to 2, and trim.
pub fn clean_text(raw: &str) -> String {
    let without_ctrl: String = raw.chars().filter(|&c| !is_stripped_control(c)).collect();
    re_excess_newlines()
        .replace_all(&without_ctrl, "\n\n")
        .trim()
        .to_string()
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}')
}
