//! Shell-style word splitting.
//!
//! Dependency-report parsing (GNU make `.d` files and MSVC `/showIncludes`
//! prefixes) and response-file expansion both need to split a line of text
//! into words the way a POSIX shell would, without invoking an actual shell.

/// Split a string into words using POSIX-shell-like quoting and escaping
/// rules: backslash escapes the next character, single and double quotes
/// group whitespace, and unquoted whitespace (space, tab, newline, carriage
/// return, form feed) separates words.
pub fn split_shell_string(input: &str) -> Vec<String> {
    let mut cur_quote: Option<char> = None;
    let mut is_escaped = false;

    let mut acc = Vec::new();
    let mut token: Option<String> = None;

    for c in input.chars() {
        if is_escaped {
            if c == '\n' && cur_quote.is_none() {
                // line continuation outside quotes: drop it
            } else if c == '\n' {
                // inside a quote the backslash isn't a continuation; keep both
                let t = token.get_or_insert_with(String::new);
                t.push('\\');
                t.push('\n');
            } else {
                token.get_or_insert_with(String::new).push(c);
            }
            is_escaped = false;
        } else if c == '\\' {
            is_escaped = true;
        } else if let Some(q) = cur_quote {
            if c == q {
                cur_quote = None;
            } else {
                token.get_or_insert_with(String::new).push(c);
            }
        } else if c == '"' || c == '\'' {
            cur_quote = Some(c);
            token.get_or_insert_with(String::new);
        } else if matches!(c, '\t' | ' ' | '\n' | '\r' | '\x0c') {
            if let Some(t) = token.take() {
                acc.push(t);
            }
        } else {
            token.get_or_insert_with(String::new).push(c);
        }
    }

    if let Some(t) = token {
        acc.push(t);
    }

    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split_shell_string("a b c"), vec!["a", "b", "c"]);
        assert_eq!(split_shell_string("  a   b  "), vec!["a", "b"]);
    }

    #[test]
    fn empty_string_yields_nothing() {
        assert!(split_shell_string("").is_empty());
        assert!(split_shell_string("   ").is_empty());
    }

    #[test]
    fn double_quotes_group_whitespace() {
        assert_eq!(
            split_shell_string(r#"a "b c" d"#),
            vec!["a", "b c", "d"]
        );
    }

    #[test]
    fn single_quotes_group_whitespace() {
        assert_eq!(split_shell_string("a 'b c' d"), vec!["a", "b c", "d"]);
    }

    #[test]
    fn backslash_escapes_next_char() {
        assert_eq!(split_shell_string(r"a\ b"), vec!["a b"]);
        assert_eq!(split_shell_string(r#"\""#), vec!["\""]);
    }

    #[test]
    fn trailing_backslash_newline_is_continuation() {
        assert_eq!(split_shell_string("a\\\nb"), vec!["ab"]);
    }

    #[test]
    fn backslash_newline_inside_quotes_is_not_a_continuation() {
        assert_eq!(split_shell_string("'a\\\nb'"), vec!["a\\\nb"]);
    }

    #[test]
    fn empty_quoted_token_is_preserved() {
        assert_eq!(split_shell_string("\"\""), vec![""]);
    }
}
