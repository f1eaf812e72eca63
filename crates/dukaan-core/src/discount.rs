//! # Discount Stepper
//!
//! Button-driven negotiation: each press of "−" takes the bill down toward
//! the next clean hundred, at most ₹25 at a time.
//!
//! ```text
//! subtotal ₹1540
//!   next → discount 25  (total 1515)
//!   next → discount 40  (total 1500, stopped on the hundred)
//!   next → discount 65  (total 1475, full step from a hundred)
//! ```
//!
//! Stepping back reconstructs the step size from a uniform `+25` lookahead of
//! the current total, not from the forward history. For some intermediate
//! states `prev_discount` is therefore not the exact inverse of
//! `next_discount`; the checkout screen relies on this exact behaviour.

use crate::money::Money;

/// Clean-number boundary the stepper rounds toward.
const BOUNDARY: Money = Money::from_rupees(100);

/// Largest single step.
const STEP: Money = Money::from_rupees(25);

fn step_for(total: Money) -> Money {
    let remainder = total.rem_floor(BOUNDARY);
    if remainder.is_positive() {
        remainder.min(STEP)
    } else {
        STEP
    }
}

/// Discount after one forward press.
///
/// A bill that is already at or below zero is left unchanged.
pub fn next_discount(subtotal: Money, current: Money) -> Money {
    let total = subtotal - current;
    if !total.is_positive() {
        return current;
    }
    current + step_for(total)
}

/// Discount after one backward press. Never negative.
pub fn prev_discount(subtotal: Money, current: Money) -> Money {
    if !current.is_positive() {
        return Money::zero();
    }
    let lookahead = subtotal - current + STEP;
    if lookahead > subtotal {
        return Money::zero();
    }
    (current - step_for(lookahead)).max(Money::zero())
}

/// Clamps a typed-in discount into `[0, subtotal]`.
pub fn clamp_discount(amount: Money, subtotal: Money) -> Money {
    amount.max(Money::zero()).min(subtotal.max(Money::zero()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs(rupees: i64) -> Money {
        Money::from_rupees(rupees)
    }

    #[test]
    fn test_next_stops_on_hundred() {
        assert_eq!(next_discount(rs(1540), rs(0)), rs(25));
        assert_eq!(next_discount(rs(1540), rs(25)), rs(40));
    }

    #[test]
    fn test_next_takes_full_step_from_hundred() {
        assert_eq!(next_discount(rs(1500), rs(0)), rs(25));
        assert_eq!(next_discount(rs(1540), rs(40)), rs(65));
    }

    #[test]
    fn test_next_is_noop_at_zero_total() {
        assert_eq!(next_discount(rs(100), rs(100)), rs(100));
        assert_eq!(next_discount(rs(0), rs(0)), rs(0));
    }

    #[test]
    fn test_next_with_paise_remainder() {
        assert_eq!(
            next_discount(Money::from_paise(150_050), Money::zero()),
            Money::from_paise(50)
        );
    }

    #[test]
    fn test_three_forward_three_back_returns_to_zero() {
        let subtotal = rs(1540);
        let mut discount = Money::zero();
        for _ in 0..3 {
            discount = next_discount(subtotal, discount);
        }
        assert_eq!(discount, rs(65));

        let mut back = Vec::new();
        for _ in 0..3 {
            discount = prev_discount(subtotal, discount);
            back.push(discount);
        }
        assert_eq!(back, vec![rs(40), rs(15), rs(0)]);
    }

    #[test]
    fn test_prev_floors_at_zero() {
        assert_eq!(prev_discount(rs(1540), rs(0)), rs(0));
        assert_eq!(prev_discount(rs(1540), rs(-10)), rs(0));
        assert_eq!(prev_discount(rs(1540), rs(10)), rs(0));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_discount(rs(-5), rs(300)), rs(0));
        assert_eq!(clamp_discount(rs(500), rs(300)), rs(300));
        assert_eq!(clamp_discount(rs(120), rs(300)), rs(120));
        assert_eq!(clamp_discount(rs(10), rs(0)), rs(0));
    }
}
