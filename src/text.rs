// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Loading programs from their usual comma-separated text form
//!
//! ```
//! assert_eq!(intcode::text::parse_program("1,0,0,3,\n99\n"), Ok(vec![1, 0, 0, 3, 99]));
//! ```

use chumsky::prelude::*;

type RichErr<'a> = extra::Err<Rich<'a, char>>;

fn word<'a>() -> impl Parser<'a, &'a str, i64, RichErr<'a>> + Clone {
    just('-')
        .or_not()
        .then(text::int(10))
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<i64>()
                .map_err(|e| Rich::custom(span, format!("error parsing {s} as i64: {e}")))
        })
        .labelled("integer")
}

fn program<'a>() -> impl Parser<'a, &'a str, Vec<i64>, RichErr<'a>> {
    word()
        .padded()
        .separated_by(just(',').labelled("comma"))
        .allow_trailing()
        .at_least(1)
        .collect()
        .then_ignore(end())
}

/// Parse comma-separated integers, allowing whitespace and newlines around them and an optional
/// trailing comma. On failure, returns every error encountered along with its span.
pub fn parse_program(src: &str) -> Result<Vec<i64>, Vec<Rich<'_, char>>> {
    program().parse(src).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aoc_style() {
        assert_eq!(
            parse_program("1,9,10,3,2,3,11,0,99,30,40,50\n"),
            Ok(vec![1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50])
        );
    }

    #[test]
    fn whitespace_and_signs() {
        assert_eq!(
            parse_program("  109, -1,\n\t204 ,-34,\n99,\n"),
            Ok(vec![109, -1, 204, -34, 99])
        );
        assert_eq!(
            parse_program("104,1125899906842624,99"),
            Ok(vec![104, 1125899906842624, 99])
        );
    }

    #[test]
    fn rejects_garbage() {
        let errs = parse_program("1,2,x,4").unwrap_err();
        assert_eq!(errs[0].span().start, 4);

        assert!(parse_program("1,,2").is_err());
        assert!(parse_program("").is_err());
        assert!(parse_program("- 1").is_err());
    }

    #[test]
    fn rejects_overflow() {
        let errs = parse_program("1,99999999999999999999").unwrap_err();
        assert_eq!(errs[0].span().start, 2);
    }
}
