//! SQL text rewriting done before statements reach SQLite.
//!
//! Two things happen here:
//!
//! - DuckDB style `FROM`-first queries (`from t select a`, `from t where ...`,
//!   or a bare `from t`) are rewritten into standard `SELECT ... FROM ...`.
//! - Named relation bindings are prepended as common table expressions so the
//!   query sees each relation under its binding name.
//!
//! Rewriting works on the token stream with escapes preserved, so literals and
//! quoted identifiers round trip unchanged. Comments are replaced with line
//! breaks before any splicing.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

use crate::errors::Result;

/// Keywords that end a `FROM` clause written first.
const FROM_CLAUSE_END: &[Keyword] = &[
    Keyword::SELECT,
    Keyword::WHERE,
    Keyword::GROUP,
    Keyword::HAVING,
    Keyword::WINDOW,
    Keyword::QUALIFY,
    Keyword::ORDER,
    Keyword::LIMIT,
    Keyword::OFFSET,
    Keyword::UNION,
    Keyword::EXCEPT,
    Keyword::INTERSECT,
];

/// Keywords that end a select list.
const SELECT_LIST_END: &[Keyword] = &[
    Keyword::FROM,
    Keyword::WHERE,
    Keyword::GROUP,
    Keyword::HAVING,
    Keyword::WINDOW,
    Keyword::QUALIFY,
    Keyword::ORDER,
    Keyword::LIMIT,
    Keyword::OFFSET,
    Keyword::UNION,
    Keyword::EXCEPT,
    Keyword::INTERSECT,
];

/// Quote an identifier for SQLite.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Rewrite a `FROM`-first query into standard SQL. Any other statement is
/// returned with surrounding whitespace and trailing semicolons removed.
pub fn rewrite_from_first(sql: &str) -> Result<String> {
    let tokens = trim_tokens(tokenize(sql)?);

    let first = match next_significant(&tokens, 0) {
        Some(idx) if is_keyword(&tokens[idx], Keyword::FROM) => idx,
        _ => return Ok(concat(&tokens)),
    };

    let from_start = first + 1;
    let from_end = find_top_level(&tokens, from_start, FROM_CLAUSE_END).unwrap_or(tokens.len());
    let from_clause = concat(&tokens[from_start..from_end]);

    let out = match tokens.get(from_end) {
        Some(tok) if is_keyword(tok, Keyword::SELECT) => {
            let list_start = from_end + 1;
            let list_end =
                find_top_level(&tokens, list_start, SELECT_LIST_END).unwrap_or(tokens.len());
            let select_list = concat(&tokens[list_start..list_end]);
            let tail = concat(&tokens[list_end..]);
            format!("SELECT {select_list} FROM {from_clause} {tail}")
        }
        _ => {
            let tail = concat(&tokens[from_end..]);
            format!("SELECT * FROM {from_clause} {tail}")
        }
    };

    Ok(out.trim().to_string())
}

/// Prepend `bindings` to a query as common table expressions.
///
/// Each binding is `(name, storage)`: the relation stored in table `storage`
/// becomes visible as `name`. A query that already starts with `WITH` has the
/// bindings spliced in front of its own expressions.
pub fn bind_relations(sql: &str, bindings: &[(&str, &str)]) -> Result<String> {
    if bindings.is_empty() {
        return Ok(sql.to_string());
    }

    let ctes = bindings
        .iter()
        .map(|(name, storage)| {
            format!(
                "{} AS (SELECT * FROM {})",
                quote_ident(name),
                quote_ident(storage)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let tokens = tokenize(sql)?;
    let with_idx = match next_significant(&tokens, 0) {
        Some(idx) if is_keyword(&tokens[idx], Keyword::WITH) => idx,
        _ => return Ok(format!("WITH {ctes} {sql}")),
    };

    let mut rest = with_idx + 1;
    let mut head = "WITH";
    if let Some(idx) = next_significant(&tokens, rest) {
        if is_keyword(&tokens[idx], Keyword::RECURSIVE) {
            head = "WITH RECURSIVE";
            rest = idx + 1;
        }
    }

    Ok(format!("{head} {ctes}, {}", concat(&tokens[rest..])))
}

fn tokenize(sql: &str) -> Result<Vec<Token>> {
    let dialect = SQLiteDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .with_unescape(false)
        .tokenize()?;

    // A spliced clause must never end inside a comment.
    Ok(tokens
        .into_iter()
        .map(|tok| match tok {
            Token::Whitespace(
                Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_),
            ) => Token::Whitespace(Whitespace::Newline),
            tok => tok,
        })
        .collect())
}

/// Drop leading/trailing whitespace and trailing semicolons.
fn trim_tokens(mut tokens: Vec<Token>) -> Vec<Token> {
    while matches!(
        tokens.last(),
        Some(Token::Whitespace(_) | Token::SemiColon | Token::EOF)
    ) {
        tokens.pop();
    }
    let start = next_significant(&tokens, 0).unwrap_or(tokens.len());
    tokens.split_off(start)
}

fn concat(tokens: &[Token]) -> String {
    let s: String = tokens.iter().map(|t| t.to_string()).collect();
    s.trim().to_string()
}

fn is_keyword(tok: &Token, keyword: Keyword) -> bool {
    matches!(tok, Token::Word(w) if w.keyword == keyword && w.quote_style.is_none())
}

fn next_significant(tokens: &[Token], start: usize) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, t)| !matches!(t, Token::Whitespace(_)))
        .map(|(idx, _)| idx)
}

/// Position of the first token outside any parentheses matching one of
/// `keywords`.
fn find_top_level(tokens: &[Token], start: usize, keywords: &[Keyword]) -> Option<usize> {
    let mut depth = 0_usize;
    for (idx, tok) in tokens.iter().enumerate().skip(start) {
        match tok {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Word(w) if depth == 0 && w.quote_style.is_none() => {
                if keywords.contains(&w.keyword) {
                    return Some(idx);
                }
            }
            _ => (),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_from() {
        assert_eq!("SELECT * FROM t", rewrite_from_first("from t").unwrap());
        assert_eq!("SELECT * FROM t", rewrite_from_first("  from t ;").unwrap());
    }

    #[test]
    fn from_then_select() {
        assert_eq!(
            "SELECT a + 1 as a FROM t",
            rewrite_from_first("from t select a + 1 as a").unwrap()
        );
    }

    #[test]
    fn from_then_select_with_clauses() {
        assert_eq!(
            "SELECT a, count(*) FROM t group by a order by a limit 3",
            rewrite_from_first("from t select a, count(*) group by a order by a limit 3").unwrap()
        );
    }

    #[test]
    fn from_then_where() {
        assert_eq!(
            "SELECT * FROM t where a > 1",
            rewrite_from_first("from t where a > 1").unwrap()
        );
    }

    #[test]
    fn from_join_then_select() {
        assert_eq!(
            "SELECT t.a FROM t join u using (a)",
            rewrite_from_first("from t join u using (a) select t.a").unwrap()
        );
    }

    #[test]
    fn nested_select_is_ignored() {
        assert_eq!(
            "SELECT (select max(b) from u) as m FROM t",
            rewrite_from_first("from t select (select max(b) from u) as m").unwrap()
        );
    }

    #[test]
    fn literals_round_trip() {
        assert_eq!(
            "SELECT 'it''s from' as s FROM t",
            rewrite_from_first("from t select 'it''s from' as s").unwrap()
        );
    }

    #[test]
    fn line_comment_after_from_clause() {
        assert_eq!(
            "SELECT * FROM t where a > 1",
            rewrite_from_first("from t -- c\nwhere a > 1").unwrap()
        );
    }

    #[test]
    fn line_comment_after_select_list() {
        assert_eq!(
            "SELECT a FROM t where a > 1",
            rewrite_from_first("from t select a -- c\nwhere a > 1").unwrap()
        );
    }

    #[test]
    fn leading_and_block_comments() {
        assert_eq!(
            "SELECT a FROM t where a > 1",
            rewrite_from_first("-- keep the big ones\nfrom t /* all of t */ select a\nwhere a > 1 -- done\n")
                .unwrap()
        );
    }

    #[test]
    fn comments_in_regular_query() {
        let sql = rewrite_from_first("select a -- first\nfrom t -- last\n").unwrap();
        assert!(!sql.contains("--"), "{sql}");
        assert!(sql.starts_with("select a"), "{sql}");
        assert!(sql.ends_with("from t"), "{sql}");
    }

    #[test]
    fn regular_query_untouched() {
        assert_eq!(
            "select count(*) from a",
            rewrite_from_first(" select count(*) from a; ").unwrap()
        );
    }

    #[test]
    fn bind_plain_query() {
        let sql = bind_relations("select * from a", &[("a", "_rel_1")]).unwrap();
        assert_eq!(
            r#"WITH "a" AS (SELECT * FROM "_rel_1") select * from a"#,
            sql
        );
    }

    #[test]
    fn bind_into_existing_with() {
        let sql = bind_relations(
            "with recursive x(n) as (select 1) select * from x, a",
            &[("a", "_rel_1"), ("b", "_rel_2")],
        )
        .unwrap();
        assert_eq!(
            r#"WITH RECURSIVE "a" AS (SELECT * FROM "_rel_1"), "b" AS (SELECT * FROM "_rel_2"), x(n) as (select 1) select * from x, a"#,
            sql
        );
    }

    #[test]
    fn bind_into_with_after_comment() {
        let sql = bind_relations(
            "with x as (select 1) -- c\nselect * from x, a",
            &[("a", "_rel_1")],
        )
        .unwrap();
        assert!(!sql.contains("--"), "{sql}");
        assert!(sql.ends_with("select * from x, a"), "{sql}");
    }

    #[test]
    fn quoting() {
        assert_eq!(r#""a""b""#, quote_ident(r#"a"b"#));
    }
}
