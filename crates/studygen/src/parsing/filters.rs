//! Edge-case predicates applied to parsed records

use once_cell::sync::Lazy;
use regex::Regex;

static TABLE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Table \d+\.\d+").expect("table reference pattern is valid")
});

/// Text from the multiple-choice example embedded in the test prompt
const PROMPT_EXAMPLE_MARKER: &str = "a primary color";

/// Mentions a numbered table ("Table 4.12") the reader cannot see
pub fn has_table_reference(text: &str) -> bool {
    TABLE_REFERENCE.is_match(text)
}

/// Net parenthesis balance: opens minus closes
fn paren_balance(text: &str) -> i64 {
    text.chars().fold(0, |balance, c| match c {
        '(' => balance + 1,
        ')' => balance - 1,
        _ => balance,
    })
}

/// Lettered options like `A) ... B) ...` leave more closing parentheses than
/// opening ones
pub fn has_multiple_choice_markup(text: &str) -> bool {
    paren_balance(text) < 0
}

/// The generator echoed the prompt's own example question
pub fn echoes_prompt_example(question: &str) -> bool {
    question.contains(PROMPT_EXAMPLE_MARKER)
}

/// Put each lettered option on its own line.
///
/// A newline goes in front of the character preceding every unmatched `)`,
/// so `"Pick one: A) x B) y"` becomes `"Pick one: \nA) x \nB) y"`. Matched
/// pairs such as `(see above)` are left alone.
pub fn split_lettered_options(question: &str) -> String {
    let chars: Vec<char> = question.chars().collect();
    let mut breaks = vec![false; chars.len()];
    let mut open = 0usize;

    for (i, c) in chars.iter().enumerate() {
        match c {
            '(' => open += 1,
            ')' if open > 0 => open -= 1,
            ')' => breaks[i.saturating_sub(1)] = true,
            _ => {}
        }
    }

    let mut out = String::with_capacity(question.len() + 8);
    for (c, newline_before) in chars.into_iter().zip(breaks) {
        if newline_before {
            out.push('\n');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_reference() {
        assert!(has_table_reference("As shown in Table 4.12, enzymes..."));
        assert!(has_table_reference("Table 1.1"));
        assert!(!has_table_reference("Table 4 lists the enzymes"));
        assert!(!has_table_reference("table 4.12"));
        assert!(!has_table_reference("Tables 4.12"));
    }

    #[test]
    fn test_multiple_choice_markup() {
        assert!(has_multiple_choice_markup("Which? A) Red B) Blue"));
        assert!(!has_multiple_choice_markup("Is water (H2O) wet?"));
        assert!(!has_multiple_choice_markup("Is the sky blue?"));
        // One unmatched close is enough
        assert!(has_multiple_choice_markup("(a) and b)"));
    }

    #[test]
    fn test_prompt_echo() {
        assert!(echoes_prompt_example(
            "Which of the following is not a primary color? A) Red B) Yellow"
        ));
        assert!(!echoes_prompt_example("Which colour is primary?"));
    }

    #[test]
    fn test_split_lettered_options() {
        assert_eq!(
            split_lettered_options("Which gas? A) Oxygen B) Nitrogen C) Argon"),
            "Which gas? \nA) Oxygen \nB) Nitrogen \nC) Argon"
        );
        assert_eq!(
            split_lettered_options("Water (H2O) is? A) wet B) dry"),
            "Water (H2O) is? \nA) wet \nB) dry"
        );
        assert_eq!(split_lettered_options("No options"), "No options");
        assert_eq!(split_lettered_options(")"), "\n)");
    }
}
