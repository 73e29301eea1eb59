//! Reading-order sorting of page tokens.
//!
//! Extractors hand tokens over in arbitrary order. Sorting by the top-left
//! extent of each quadrilateral (min y, then min x) gives the sequence a reader
//! would follow on a single-column page. Rotation and multi-column layouts are
//! not modeled.

use crate::interface::{Point, Token};
use std::cmp::Ordering;

/// Sort key of a token: `(min_y, min_x)` over its corners.
///
/// `None` when the token has no usable geometry (no corners, or only
/// non-finite coordinates).
pub fn sort_key(corners: &[Point]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut any = false;

    for p in corners.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        any = true;
    }

    any.then_some((min_y, min_x))
}

/// Return the tokens of a page in reading order.
///
/// The sort is stable. Tokens without a valid sort key keep their relative
/// order and are placed after every positioned token.
pub fn order(tokens: &[Token]) -> Vec<&Token> {
    let mut keyed: Vec<(Option<(f64, f64)>, &Token)> = tokens
        .iter()
        .map(|t| (sort_key(&t.corners), t))
        .collect();

    let unpositioned = keyed.iter().filter(|(k, _)| k.is_none()).count();
    if unpositioned > 0 {
        tracing::warn!(unpositioned, "tokens without usable geometry placed after positioned tokens");
    }

    keyed.sort_by(|(a, _), (b, _)| compare_keys(*a, *b));
    keyed.into_iter().map(|(_, t)| t).collect()
}

fn compare_keys(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Ordering {
    match (a, b) {
        (Some((ay, ax)), Some((by, bx))) => ay.total_cmp(&by).then(ax.total_cmp(&bx)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words<'a>(tokens: &[&'a Token]) -> Vec<&'a str> {
        tokens.iter().map(|t| t.word.as_str()).collect()
    }

    #[test]
    fn test_orders_top_to_bottom_then_left_to_right() {
        let tokens = vec![
            Token::from_rect("c", 0.0, 20.0, 5.0, 25.0),
            Token::from_rect("b", 10.0, 0.0, 15.0, 5.0),
            Token::from_rect("a", 0.0, 0.0, 5.0, 5.0),
        ];
        assert_eq!(words(&order(&tokens)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_uses_min_over_all_corners() {
        // Skewed quad: its top-right corner sits higher than the other token.
        let skewed = Token::new(
            "skewed",
            vec![
                Point::new(50.0, 12.0),
                Point::new(60.0, 3.0),
                Point::new(60.0, 20.0),
                Point::new(50.0, 20.0),
            ],
        );
        let flat = Token::from_rect("flat", 0.0, 5.0, 10.0, 10.0);
        let tokens = vec![flat, skewed];
        assert_eq!(words(&order(&tokens)), vec!["skewed", "flat"]);
    }

    #[test]
    fn test_ties_are_stable() {
        let tokens = vec![
            Token::from_rect("first", 0.0, 0.0, 1.0, 1.0),
            Token::from_rect("second", 0.0, 0.0, 1.0, 1.0),
        ];
        assert_eq!(words(&order(&tokens)), vec!["first", "second"]);
    }

    #[test]
    fn test_degenerate_and_malformed_geometry() {
        let point = Token::new("dot", vec![Point::new(3.0, 3.0); 4]);
        let empty = Token::new("nowhere", Vec::new());
        let nan = Token::new("nan", vec![Point::new(f64::NAN, f64::NAN); 4]);
        let top = Token::from_rect("top", 0.0, 0.0, 1.0, 1.0);
        let tokens = vec![empty, point, nan, top];

        assert_eq!(words(&order(&tokens)), vec!["top", "dot", "nowhere", "nan"]);
        assert_eq!(sort_key(&[]), None);
        assert_eq!(sort_key(&[Point::new(2.0, 7.0)]), Some((7.0, 2.0)));
    }
}
