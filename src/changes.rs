use anyhow::{ensure, Result};

/// Default minimum absolute percentage move worth recording.
pub const DEFAULT_THRESHOLD: f64 = 5.0;

/// A significant price movement against the most recent prior record.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub old_price: f64,
    pub new_price: f64,
    pub change_amount: f64,
    pub change_percentage: f64,
    pub is_increase: bool,
}

/// Compare a new price against the most recent prior one.
///
/// `Ok(None)` means nothing to record: either there is no prior price (first
/// observation for this commodity) or the move is below the threshold. A
/// change exactly at the threshold counts as significant. A non-positive
/// prior price is a data-integrity error; tokenization rejects non-positive
/// prices, so one in history means the store was corrupted out-of-band.
pub fn evaluate(
    old_price: Option<f64>,
    new_price: f64,
    threshold: f64,
) -> Result<Option<PriceChange>> {
    let Some(old_price) = old_price else {
        return Ok(None);
    };
    ensure!(
        old_price > 0.0,
        "non-positive prior price {} in history",
        old_price
    );

    let change_amount = new_price - old_price;
    let change_percentage = round2(change_amount / old_price * 100.0);
    if change_percentage.abs() < threshold {
        return Ok(None);
    }

    Ok(Some(PriceChange {
        old_price,
        new_price,
        change_amount,
        change_percentage,
        is_increase: new_price > old_price,
    }))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_is_silent() {
        // 4% on a 5% threshold.
        assert_eq!(evaluate(Some(100.00), 104.00, 5.0).unwrap(), None);
    }

    #[test]
    fn above_threshold_records_increase() {
        let change = evaluate(Some(100.00), 106.00, 5.0).unwrap().unwrap();
        assert!(change.is_increase);
        assert_eq!(change.change_percentage, 6.00);
        assert_eq!(change.change_amount, 6.00);
    }

    #[test]
    fn decrease_flagged() {
        let change = evaluate(Some(200.00), 180.00, 5.0).unwrap().unwrap();
        assert!(!change.is_increase);
        assert_eq!(change.change_percentage, -10.00);
        assert_eq!(change.change_amount, -20.00);
    }

    #[test]
    fn exactly_at_threshold_is_significant() {
        let change = evaluate(Some(100.00), 105.00, 5.0).unwrap();
        assert!(change.is_some());
        assert_eq!(change.unwrap().change_percentage, 5.00);
    }

    #[test]
    fn no_prior_price_is_silent() {
        assert_eq!(evaluate(None, 342.72, 5.0).unwrap(), None);
    }

    #[test]
    fn monotone_in_threshold() {
        // Significant at T implies significant at every T' < T.
        let pct_move = evaluate(Some(100.00), 107.50, 7.5).unwrap();
        assert!(pct_move.is_some());
        for lower in [7.0, 5.0, 2.5, 0.5] {
            assert!(evaluate(Some(100.00), 107.50, lower).unwrap().is_some());
        }
    }

    #[test]
    fn percentage_rounded_to_two_decimals() {
        // 1/3 price jump: 33.333...% rounds to 33.33.
        let change = evaluate(Some(3.00), 4.00, 5.0).unwrap().unwrap();
        assert_eq!(change.change_percentage, 33.33);
    }

    #[test]
    fn non_positive_prior_is_an_error() {
        assert!(evaluate(Some(0.0), 10.00, 5.0).is_err());
        assert!(evaluate(Some(-1.0), 10.00, 5.0).is_err());
    }
}
