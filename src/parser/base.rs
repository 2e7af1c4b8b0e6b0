//! Leaf token parsers for the store-type grammar.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{pair, preceded},
};

/// Parse an identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

/// Parse a dotted path: `a.b.c`.
pub fn parse_path(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        parse_identifier,
        many0(preceded(char('.'), parse_identifier)),
    ))
    .parse(input)
}

pub fn parse_unsigned(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>()).parse(input)
}

pub fn parse_signed(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })
    .parse(input)
}

/// Parse a `'...'` or `"..."` string literal with backslash escapes.
pub fn parse_string_literal(input: &str) -> IResult<&str, String> {
    let (rest, delim) = alt((char('\''), char('"'))).parse(input)?;
    take_quoted(input, rest, delim)
}

/// Parse a backtick-quoted identifier.
pub fn parse_quoted_identifier(input: &str) -> IResult<&str, String> {
    let (rest, delim) = char('`').parse(input)?;
    take_quoted(input, rest, delim)
}

/// Parse a column/element name, plain or backtick-quoted.
pub fn parse_name(input: &str) -> IResult<&str, String> {
    alt((
        parse_quoted_identifier,
        map(parse_identifier, str::to_string),
    ))
    .parse(input)
}

/// Parse `name<ws>rest`, returning the name and the unparsed remainder.
pub fn parse_named_prefix(input: &str) -> IResult<&str, String> {
    let (rest, name) = parse_name(input)?;
    let (rest, _) = multispace1(rest)?;
    Ok((rest, name))
}

/// Parse `key = <unsigned>` with a case-insensitive key.
pub fn parse_setting<'a>(key: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, u64> {
    move |input: &'a str| {
        let (rest, _) = tag_no_case(key).parse(input)?;
        let (rest, _) = (multispace0, char('='), multispace0).parse(rest)?;
        parse_unsigned(rest)
    }
}

fn take_quoted<'a>(original: &'a str, body: &'a str, delim: char) -> IResult<&'a str, String> {
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == delim {
            return Ok((&body[i + c.len_utf8()..], out));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '0')) => out.push('\0'),
                Some((_, other)) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    Err(nom::Err::Error(Error::new(original, ErrorKind::Char)))
}

/// Run `parser` over the whole (trimmed) input; trailing content fails.
pub fn complete<'a, O, P>(input: &'a str, mut parser: P) -> Option<O>
where
    P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    match parser.parse(input.trim()) {
        Ok((rest, out)) if rest.trim().is_empty() => Some(out),
        _ => None,
    }
}
