use anyhow::{anyhow, bail, Result};
use num_traits::ToPrimitive;

pub type RationalNumber = num_rational::Ratio<u64>;

/// Parse `"num/den"` (or a bare integer) into a rational, as written in configuration
pub fn rational_number_from_str(text: &str) -> Result<RationalNumber> {
    let parse = |s: &str| {
        s.trim().parse::<u64>().map_err(|e| anyhow!("Cannot parse rational '{text}': {e}"))
    };
    match text.split_once('/') {
        Some((num, den)) => {
            let den = parse(den)?;
            if den == 0 {
                bail!("Rational '{text}' has zero denominator");
            }
            Ok(RationalNumber::new(parse(num)?, den))
        }
        None => Ok(RationalNumber::from_integer(parse(text)?)),
    }
}

/// `value × ratio`, rounded up, without intermediate overflow
pub fn mul_ceil(value: u64, ratio: &RationalNumber) -> Result<u64> {
    let num = value as u128 * *ratio.numer() as u128;
    let den = *ratio.denom() as u128;
    num.div_ceil(den).to_u64().ok_or_else(|| anyhow!("Overflow computing {value} × {ratio}"))
}

/// `value × ratio`, rounded down, without intermediate overflow
pub fn mul_floor(value: u64, ratio: &RationalNumber) -> Result<u64> {
    let num = value as u128 * *ratio.numer() as u128;
    let den = *ratio.denom() as u128;
    (num / den).to_u64().ok_or_else(|| anyhow!("Overflow computing {value} × {ratio}"))
}

/// `yes / (yes + no) >= threshold`, with `0/0` failing
pub fn fraction_at_least(yes: u64, no: u64, threshold: &RationalNumber) -> bool {
    let total = yes as u128 + no as u128;
    if total == 0 {
        return false;
    }
    yes as u128 * *threshold.denom() as u128 >= *threshold.numer() as u128 * total
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_fractions() -> Result<()> {
        assert_eq!(rational_number_from_str("51/100")?, RationalNumber::new(51, 100));
        assert_eq!(rational_number_from_str("6/10")?, RationalNumber::new(3, 5));
        assert_eq!(rational_number_from_str(" 1 ")?, RationalNumber::from_integer(1));
        assert!(rational_number_from_str("1/0").is_err());
        assert!(rational_number_from_str("half").is_err());
        Ok(())
    }

    #[test_case(180_000, (150, 100) => 270_000; "collateral percentage")]
    #[test_case(1, (2, 3) => 1; "rounds up")]
    #[test_case(0, (2, 3) => 0; "zero")]
    fn ceiling_multiplication(value: u64, (n, d): (u64, u64)) -> u64 {
        mul_ceil(value, &RationalNumber::new(n, d)).unwrap()
    }

    #[test_case(3, 1, (3, 4) => true; "exactly on threshold")]
    #[test_case(2, 1, (3, 4) => false; "below threshold")]
    #[test_case(0, 0, (1, 2) => false; "no votes fails")]
    #[test_case(1, 0, (1, 1) => true; "unanimous")]
    fn threshold_comparison(yes: u64, no: u64, (n, d): (u64, u64)) -> bool {
        fraction_at_least(yes, no, &RationalNumber::new(n, d))
    }
}
