//! Route precedence.
//!
//! Every template gets a [`PrecedenceKey`]; keys order ascending, and a
//! smaller key means a more specific template that must be attempted first.
//! The key is a place-value encoding of per-segment digits read left to
//! right:
//!
//! | Segment                  | digit |
//! |--------------------------|-------|
//! | literal                  | 1     |
//! | complex (multi-part)     | 2     |
//! | constrained parameter    | 3     |
//! | unconstrained parameter  | 4     |
//! | catch-all                | 5     |
//!
//! The first segment's digit is the integer component; later segments fill
//! the fractional component one decimal place at a time, so `a/b` (1.1)
//! beats `a/{x}` (1.4) and any literal beats a catch-all. Trailing optional
//! segments and defaulted parameters add small increments below the last
//! place, making `{a}/{b}` slightly more specific than `{a}/{b?}`. Ties are
//! broken by ordinal comparison of the canonical template text.

use std::cmp::Ordering;

use crate::template::{RouteSegment, RouteTemplate};

/// How many fractional decimal places segment digits occupy. Segments past
/// this depth all land in the last place; templates that deep are ordered
/// by the tie-break.
const FRACTION_PLACES: u32 = 15;

/// The ordering key assigned to one route template.
///
/// Lower keys sort first and win the match. Keys are computed once at
/// build time and are immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecedenceKey {
    integer: u32,
    fraction: u64,
    text: String,
}

impl PrecedenceKey {
    /// Computes the key for `template`.
    ///
    /// `constrained` names the parameters that carry at least one
    /// constraint (inline or out-of-band); `defaulted` counts parameters
    /// that have a default from any source.
    pub fn compute(template: &RouteTemplate, constrained: &[String], defaulted: usize) -> Self {
        let segments = template.segments();

        let integer = segments
            .first()
            .map_or(0, |s| u32::from(segment_digit(s, constrained)));

        let mut fraction: u64 = 0;
        for (index, segment) in segments.iter().enumerate().skip(1) {
            let digit = u64::from(segment_digit(segment, constrained));
            let place = (index as u32).min(FRACTION_PLACES);
            fraction += digit * 10u64.pow(FRACTION_PLACES + 3 - place);
        }

        let trailing_optionals = segments
            .iter()
            .rev()
            .take_while(|s| s.is_optional_parameter())
            .count() as u64;
        fraction += trailing_optionals * 10 + defaulted as u64;

        Self {
            integer,
            fraction,
            text: template.text().to_string(),
        }
    }

    /// The canonical template text used as the tie-break.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `true` when two keys are indistinguishable, which makes the routes
    /// duplicates.
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.integer == other.integer
            && self.fraction == other.fraction
            && self.text == other.text
    }
}

impl PartialOrd for PrecedenceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrecedenceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.integer
            .cmp(&other.integer)
            .then_with(|| self.fraction.cmp(&other.fraction))
            .then_with(|| self.text.cmp(&other.text))
    }
}

fn segment_digit(segment: &RouteSegment, constrained: &[String]) -> u8 {
    if !segment.is_simple() {
        return 2;
    }
    match segment.single_parameter() {
        None => 1,
        Some(p) if p.is_catch_all => 5,
        Some(p) => {
            let has_constraint = !p.inline_constraints.is_empty()
                || constrained.iter().any(|c| c.eq_ignore_ascii_case(&p.name));
            if has_constraint {
                3
            } else {
                4
            }
        }
    }
}
