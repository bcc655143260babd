//! Parses the leading SQL-comment directive block of a migration file.
//!
//! Purely textual — this must never attempt to lex SQL. A directive block is
//! the contiguous run of lines at the top of the file, each beginning with
//! `--` once leading tabs are stripped. Parsing stops at the first line that
//! isn't a comment.

use crate::migration::EnvRegex;

pub fn parse(query: &str) -> (bool, Option<EnvRegex>) {
    let mut allow_error = false;
    let mut env_regex = None;

    for line in query.lines() {
        let stripped = line.trim_start_matches('\t');
        if !stripped.starts_with("--") {
            break;
        }

        let body: String = stripped.chars().filter(|c| *c != ' ' && *c != '-').collect();
        for pair in body.split(',') {
            let Some((key, value)) = pair.split_once(':') else {
                continue;
            };
            match key {
                "allow_error" => {
                    if value == "true" || value == "1" {
                        allow_error = true;
                    }
                }
                "require_env" => {
                    let (negated, pattern) = match value.strip_prefix('!') {
                        Some(rest) => (true, rest.to_string()),
                        None => (false, value.to_string()),
                    };
                    if !pattern.is_empty() {
                        env_regex = Some(EnvRegex { pattern, negated });
                    }
                }
                _ => {}
            }
        }
    }

    (allow_error, env_regex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_allow_error_true() {
        let (allow_error, _) = parse("-- allow_error: true\nSELECT 1;");
        assert!(allow_error);
    }

    #[test]
    fn parses_allow_error_numeric() {
        let (allow_error, _) = parse("--allow_error:1\nSELECT 1;");
        assert!(allow_error);
    }

    #[test]
    fn parses_require_env_negation() {
        let (_, env) = parse("-- require_env: !master\nSELECT 1;");
        let env = env.expect("env directive");
        assert_eq!(env.pattern, "master");
        assert!(env.negated);
    }

    #[test]
    fn parses_require_env_positive() {
        let (_, env) = parse("-- require_env: dev.*\nSELECT 1;");
        let env = env.expect("env directive");
        assert_eq!(env.pattern, "dev.*");
        assert!(!env.negated);
    }

    #[test]
    fn combines_multiple_directives_on_one_comma_separated_line() {
        let (allow_error, env) = parse("-- allow_error:true, require_env:!master\nSELECT 1;");
        assert!(allow_error);
        assert_eq!(env.unwrap().pattern, "master");
    }

    #[test]
    fn stops_at_first_non_comment_line() {
        let (allow_error, _) = parse("SELECT 1;\n-- allow_error: true\n");
        assert!(!allow_error);
    }

    #[test]
    fn ignores_unknown_keys() {
        let (allow_error, env) = parse("-- author: alice\nSELECT 1;");
        assert!(!allow_error);
        assert!(env.is_none());
    }

    #[test]
    fn unknown_leading_tabs_are_stripped_before_matching() {
        let (allow_error, _) = parse("\t-- allow_error: true\nSELECT 1;");
        assert!(allow_error);
    }
}
