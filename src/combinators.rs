/*!
 * Parser Combinators
 *
 * A small monadic parser-combinator toolkit over `&[u8]`. Every parser is a
 * pure function from an input slice to `Option<(T, remainder)>` — success
 * carries the parsed value and the unconsumed suffix, failure carries
 * nothing and must leave the input untouched so callers are free to try an
 * alternative from the same starting point.
 *
 * `Parser<T>` is backed by `Rc<dyn Fn>` rather than a bare function pointer:
 * combinators like `or_else` and `many` need to run the same parser against
 * the same input more than once, which a plain `fn` can't express once
 * closures capture state (e.g. a recursive RESP expression parser — see
 * `protocol::expr_parser`).
 */

use std::rc::Rc;

/// A parser of `T`: given an input slice, either fails (`None`) or succeeds
/// with a parsed `T` and the remaining, unconsumed slice.
pub struct Parser<T>(Rc<dyn for<'a> Fn(&'a [u8]) -> Option<(T, &'a [u8])>>);

impl<T> Parser<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a [u8]) -> Option<(T, &'a [u8])> + 'static,
        T: 'static,
    {
        Parser(Rc::new(f))
    }

    pub fn run<'a>(&self, input: &'a [u8]) -> Option<(T, &'a [u8])> {
        (self.0)(input)
    }
}

impl<T> Clone for Parser<T> {
    fn clone(&self) -> Self {
        Parser(Rc::clone(&self.0))
    }
}

/// Consumes nothing, always yields `value`.
pub fn pure<T: Clone + 'static>(value: T) -> Parser<T> {
    Parser::new(move |input: &[u8]| Some((value.clone(), input)))
}

/// Runs `p`; on success, runs `f(value)` to get a new parser and continues
/// it over the remainder. The monadic bind.
pub fn bind<A: 'static, B: 'static, F>(p: Parser<A>, f: F) -> Parser<B>
where
    F: Fn(A) -> Parser<B> + 'static,
{
    Parser::new(move |input: &[u8]| {
        let (a, rest) = p.run(input)?;
        f(a).run(rest)
    })
}

/// Maps a parser's result without consuming any more input.
pub fn fmap<A: 'static, B: 'static, F>(f: F, p: Parser<A>) -> Parser<B>
where
    F: Fn(A) -> B + 'static,
{
    Parser::new(move |input: &[u8]| {
        let (a, rest) = p.run(input)?;
        Some((f(a), rest))
    })
}

/// Sequences `p` then `q`, yielding both results as a pair.
pub fn and_then<A: 'static, B: 'static>(p: Parser<A>, q: Parser<B>) -> Parser<(A, B)> {
    Parser::new(move |input: &[u8]| {
        let (a, rest) = p.run(input)?;
        let (b, rest2) = q.run(rest)?;
        Some(((a, b), rest2))
    })
}

/// Sequences `p` then `q`, keeping only `p`'s result.
pub fn first<A: 'static, B: 'static>(p: Parser<A>, q: Parser<B>) -> Parser<A> {
    Parser::new(move |input: &[u8]| {
        let (a, rest) = p.run(input)?;
        let (_, rest2) = q.run(rest)?;
        Some((a, rest2))
    })
}

/// Sequences `p` then `q`, keeping only `q`'s result.
pub fn second<A: 'static, B: 'static>(p: Parser<A>, q: Parser<B>) -> Parser<B> {
    Parser::new(move |input: &[u8]| {
        let (_, rest) = p.run(input)?;
        q.run(rest)
    })
}

/// Tries `p`; on failure, tries `q` against the original input. Neither
/// attempt commits input on failure, so `q` always starts fresh.
pub fn or_else<T: 'static>(p: Parser<T>, q: Parser<T>) -> Parser<T> {
    Parser::new(move |input: &[u8]| p.run(input).or_else(|| q.run(input)))
}

/// Never fails: yields `Some(value)` if `p` succeeds, `None` (consuming
/// nothing) otherwise.
pub fn maybe<T: 'static>(p: Parser<T>) -> Parser<Option<T>> {
    Parser::new(move |input: &[u8]| match p.run(input) {
        Some((v, rest)) => Some((Some(v), rest)),
        None => Some((None, input)),
    })
}

/// Zero or more `p`, stopping at the first failure.
///
/// A parser that succeeds without consuming input would loop here forever;
/// that's a logic error in the parser being repeated, not a recoverable
/// parse failure, so it panics instead of spinning.
pub fn many<T: 'static>(p: Parser<T>) -> Parser<Vec<T>> {
    Parser::new(move |input: &[u8]| {
        let mut results = Vec::new();
        let mut rest = input;
        loop {
            match p.run(rest) {
                None => break,
                Some((v, next)) => {
                    assert!(
                        next.len() != rest.len(),
                        "many: inner parser succeeded without consuming input"
                    );
                    results.push(v);
                    rest = next;
                }
            }
        }
        Some((results, rest))
    })
}

/// One or more `p`; fails if `p` doesn't match at least once.
pub fn one_or_more<T: 'static>(p: Parser<T>) -> Parser<Vec<T>> {
    Parser::new(move |input: &[u8]| {
        let (first, mut rest) = p.run(input)?;
        let mut results = vec![first];
        loop {
            match p.run(rest) {
                None => break,
                Some((v, next)) => {
                    assert!(
                        next.len() != rest.len(),
                        "one_or_more: inner parser succeeded without consuming input"
                    );
                    results.push(v);
                    rest = next;
                }
            }
        }
        Some((results, rest))
    })
}

/// Parses a count with `count_parser`, then exactly that many `item`s.
/// Fails (without partial results) if any item fails to parse.
pub fn repeat_n<T: 'static>(count_parser: Parser<u64>, item: Parser<T>) -> Parser<Vec<T>> {
    Parser::new(move |input: &[u8]| {
        let (n, mut rest) = count_parser.run(input)?;
        let mut results = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let (v, next) = item.run(rest)?;
            results.push(v);
            rest = next;
        }
        Some((results, rest))
    })
}

/// Zero or more `item`, stopping as soon as `term` matches. Yields the
/// collected items alongside `term`'s result. Fails if the input runs out
/// before `term` ever matches.
pub fn repeat_terminated<T: 'static, P: 'static>(
    item: Parser<T>,
    term: Parser<P>,
) -> Parser<(Vec<T>, P)> {
    Parser::new(move |input: &[u8]| {
        let mut results = Vec::new();
        let mut rest = input;
        loop {
            if rest.is_empty() {
                return None;
            }
            if let Some((t, next)) = term.run(rest) {
                return Some(((results, t), next));
            }
            let (v, next) = item.run(rest)?;
            results.push(v);
            rest = next;
        }
    })
}

/// Matches one specific byte.
pub fn parse_char(expected: u8) -> Parser<u8> {
    Parser::new(move |input: &[u8]| match input.first() {
        Some(&b) if b == expected => Some((b, &input[1..])),
        _ => None,
    })
}

/// Matches any single byte; only fails on an empty input.
pub fn parse_any_char() -> Parser<u8> {
    Parser::new(|input: &[u8]| input.split_first().map(|(&b, rest)| (b, rest)))
}

/// Matches a fixed byte-string literal exactly.
pub fn parse_terminal(expected: &'static [u8]) -> Parser<&'static [u8]> {
    Parser::new(move |input: &[u8]| {
        if input.starts_with(expected) {
            Some((expected, &input[expected.len()..]))
        } else {
            None
        }
    })
}

/// Matches one ASCII digit, yielding its numeric value (0-9).
pub fn parse_digit() -> Parser<u8> {
    Parser::new(|input: &[u8]| match input.first() {
        Some(&b) if b.is_ascii_digit() => Some((b - b'0', &input[1..])),
        _ => None,
    })
}

/// One or more ASCII digits, base 10, unsigned.
pub fn parse_uint() -> Parser<u64> {
    Parser::new(|input: &[u8]| {
        let mut len = 0;
        while len < input.len() && input[len].is_ascii_digit() {
            len += 1;
        }
        if len == 0 {
            return None;
        }
        let mut acc: u64 = 0;
        for &b in &input[..len] {
            acc = acc * 10 + (b - b'0') as u64;
        }
        Some((acc, &input[len..]))
    })
}

/// An optional leading `+`/`-` followed by `parse_uint`.
pub fn parse_int() -> Parser<i64> {
    Parser::new(|input: &[u8]| {
        let (negative, rest) = match input.first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };
        let (magnitude, rest) = parse_uint().run(rest)?;
        let value = if negative {
            -(magnitude as i64)
        } else {
            magnitude as i64
        };
        Some((value, rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_consumes_nothing() {
        let p = pure(42);
        assert_eq!(p.run(b"abc"), Some((42, &b"abc"[..])));
    }

    #[test]
    fn or_else_tries_alternatives_from_original_input() {
        let p = or_else(parse_char(b'a'), parse_char(b'b'));
        assert_eq!(p.run(b"bcd"), Some((b'b', &b"cd"[..])));
        assert!(p.run(b"xyz").is_none());
    }

    #[test]
    fn maybe_never_fails() {
        let p = maybe(parse_char(b'a'));
        assert_eq!(p.run(b"xyz"), Some((None, &b"xyz"[..])));
        assert_eq!(p.run(b"abc"), Some((Some(b'a'), &b"bc"[..])));
    }

    #[test]
    fn many_collects_zero_or_more() {
        let p = many(parse_char(b'a'));
        assert_eq!(p.run(b"aaab"), Some((vec![b'a', b'a', b'a'], &b"b"[..])));
        assert_eq!(p.run(b"xyz"), Some((vec![], &b"xyz"[..])));
    }

    #[test]
    #[should_panic(expected = "without consuming input")]
    fn many_panics_on_zero_consumption_success() {
        let zero_width = maybe(parse_char(b'z'));
        let _ = many(zero_width).run(b"abc");
    }

    #[test]
    fn one_or_more_requires_at_least_one() {
        let p = one_or_more(parse_digit());
        assert!(p.run(b"abc").is_none());
        assert_eq!(p.run(b"12a"), Some((vec![1, 2], &b"a"[..])));
    }

    #[test]
    fn repeat_n_reads_exact_count() {
        let p = repeat_n(parse_uint(), parse_any_char());
        assert_eq!(p.run(b"3abcd"), Some((vec![b'a', b'b', b'c'], &b"d"[..])));
        assert!(p.run(b"3ab").is_none());
    }

    #[test]
    fn repeat_terminated_stops_at_terminator() {
        let p = repeat_terminated(parse_any_char(), parse_terminal(b"\r\n"));
        assert_eq!(
            p.run(b"hi\r\nrest"),
            Some(((vec![b'h', b'i'], &b"\r\n"[..]), &b"rest"[..]))
        );
        assert!(p.run(b"no-terminator").is_none());
    }

    #[test]
    fn parse_uint_and_int() {
        assert_eq!(parse_uint().run(b"123x"), Some((123, &b"x"[..])));
        assert!(parse_uint().run(b"x").is_none());
        assert_eq!(parse_int().run(b"-17x"), Some((-17, &b"x"[..])));
        assert_eq!(parse_int().run(b"+9x"), Some((9, &b"x"[..])));
        assert_eq!(parse_int().run(b"9x"), Some((9, &b"x"[..])));
    }

    #[test]
    fn first_and_second_keep_one_side() {
        let p = first(parse_char(b'a'), parse_char(b'b'));
        assert_eq!(p.run(b"ab c"), Some((b'a', &b" c"[..])));
        let q = second(parse_char(b'a'), parse_char(b'b'));
        assert_eq!(q.run(b"ab c"), Some((b'b', &b" c"[..])));
    }

    #[test]
    fn fmap_transforms_result() {
        let p = fmap(|d: u8| d * 2, parse_digit());
        assert_eq!(p.run(b"4x"), Some((8, &b"x"[..])));
    }

    #[test]
    fn bind_sequences_dependent_parsers() {
        let p = bind(parse_uint(), |n| repeat_n(pure(n), parse_any_char()));
        assert_eq!(p.run(b"2ab"), Some((vec![b'a', b'b'], &b""[..])));
    }
}
