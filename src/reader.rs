// ABOUTME: Reader module turning source text into values using nom combinators

use nom::{
    branch::alt,
    character::complete::{char, digit1, multispace1, one_of},
    combinator::{map_res, value},
    multi::many0,
    IResult, Parser,
};

use crate::error::EvalError;
use crate::value::Value;

/// Characters that terminate an atom
fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '\'' | '`' | ',' | '"' | ';')
}

/// Parse a line comment (from `;` to end of line)
fn parse_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = char(';')(input)?;
    let end = input.find('\n').unwrap_or(input.len());
    Ok((&input[end..], ()))
}

/// Skip whitespace (space, tab, CR, LF) and comments
fn ws_and_comments(input: &str) -> IResult<&str, ()> {
    many0(alt((value((), multispace1), parse_comment)))
        .map(|_| ())
        .parse(input)
}

/// Parse an unsigned 64-bit number: [0-9]+
fn parse_number(input: &str) -> IResult<&str, Value> {
    map_res(digit1, |digits: &str| digits.parse::<u64>().map(Value::Num)).parse(input)
}

/// Parse an atom: any run of non-delimiter characters.
///
/// Number literals are tried first, so an atom never starts with a digit.
/// Atoms starting with `:` are keywords; `&rest` and operator names like
/// `+` and `cons?` all land here.
fn parse_atom(input: &str) -> IResult<&str, Value> {
    // A digit-led run only reaches this parser when the number parser
    // rejected it (u64 overflow); surface that as a hard failure instead
    // of swallowing the digits as an atom.
    if input.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::MapRes,
        )));
    }
    let end = input
        .char_indices()
        .find(|&(_, c)| !is_atom_char(c))
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    if end == 0 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeWhile1,
        )));
    }
    Ok((&input[end..], Value::atom(&input[..end])))
}

/// Parse a string with escape sequences \n \t \" \\
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('"')(input)?;
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&input[i + 1..], Value::string(out))),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            _ => out.push(c),
        }
    }
    // Unterminated string
    Err(nom::Err::Failure(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse a quoted term: 'x -> Quote(x)
fn parse_quote(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('\'')(input)?;
    let (input, term) = parse_expr(input)?;
    Ok((input, Value::quoted(term)))
}

/// Parse a quasiquoted term: `x or ~x -> (quasi-quote x)
fn parse_quasiquote(input: &str) -> IResult<&str, Value> {
    let (input, _) = one_of("`~")(input)?;
    let (input, term) = parse_expr(input)?;
    Ok((
        input,
        Value::list_from_vec(vec![Value::atom("quasi-quote"), term]),
    ))
}

/// Parse an unquoted term: ,x -> (unquote x)
fn parse_unquote(input: &str) -> IResult<&str, Value> {
    let (input, _) = char(',')(input)?;
    let (input, term) = parse_expr(input)?;
    Ok((
        input,
        Value::list_from_vec(vec![Value::atom("unquote"), term]),
    ))
}

/// A lone `.` token inside a list marks a dotted tail. A `.` followed by
/// atom characters (`.5`, `.foo`) is an ordinary atom, not a marker.
fn strip_dot_token(input: &str) -> Option<&str> {
    let rest = input.strip_prefix('.')?;
    match rest.chars().next() {
        Some(c) if is_atom_char(c) => None,
        _ => Some(rest),
    }
}

/// Parse a list: (term*), or (term+ . term) for a dotted tail.
/// The empty list is Nil.
fn parse_list(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('(')(input)?;
    let mut items = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = ws_and_comments(remaining)?;
        if let Ok((rest, _)) = char::<_, nom::error::Error<_>>(')')(rest) {
            return Ok((rest, Value::list_from_vec(items)));
        }
        if let Some(rest) = strip_dot_token(rest) {
            if items.is_empty() {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Tag,
                )));
            }
            // Exactly one tail term, then the closing paren
            let (rest, tail) = parse_expr(rest).map_err(|e| match e {
                nom::Err::Error(e) => nom::Err::Failure(e),
                other => other,
            })?;
            let (rest, _) = ws_and_comments(rest)?;
            let rest = match char::<_, nom::error::Error<_>>(')')(rest) {
                Ok((rest, _)) => rest,
                Err(_) => {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        rest,
                        nom::error::ErrorKind::Char,
                    )))
                }
            };
            let mut chain = tail;
            for item in items.into_iter().rev() {
                chain = Value::cons(item, chain);
            }
            return Ok((rest, chain));
        }
        let (rest, term) = parse_expr(rest)?;
        items.push(term);
        remaining = rest;
    }
}

/// Main term parser
fn parse_expr(input: &str) -> IResult<&str, Value> {
    let (input, _) = ws_and_comments(input)?;
    alt((
        parse_quote,
        parse_quasiquote,
        parse_unquote,
        parse_list,
        parse_number,
        parse_string,
        parse_atom,
    ))
    .parse(input)
}

/// Line and column of the first unconsumed character
fn position(source: &str, rest: &str) -> (usize, usize) {
    let offset = source.len() - rest.len();
    let consumed = &source[..offset];
    let line = consumed.matches('\n').count() + 1;
    let col = consumed
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0)
        + 1;
    (line, col)
}

fn parse_error(source: &str, rest: &str, message: &str) -> EvalError {
    let (line, col) = position(source, rest);
    EvalError::Parse {
        line,
        col,
        message: message.to_string(),
    }
}

/// Read every top-level form out of a source buffer.
pub fn read_str(source: &str) -> Result<Vec<Value>, EvalError> {
    let mut forms = Vec::new();
    let mut rest = source;
    loop {
        if let Ok((r, _)) = ws_and_comments(rest) {
            rest = r;
        }
        if rest.is_empty() {
            return Ok(forms);
        }
        match parse_expr(rest) {
            Ok((r, term)) => {
                forms.push(term);
                rest = r;
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let message = match e.code {
                    nom::error::ErrorKind::MapRes => "number literal out of range",
                    _ => "unexpected token",
                };
                return Err(parse_error(source, e.input, message));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(parse_error(source, "", "unexpected end of input"));
            }
        }
    }
}
