use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One reward tier currently flagged as sold out on the pledge page.
///
/// `identifier` is the only join key between polls. Prices and descriptions
/// can repeat across distinct tiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RewardRecord {
    /// Displayed price token, verbatim (ASCII only), e.g. `$75.00`.
    pub price: String,
    /// `id` of the tier's selector control.
    pub identifier: String,
    /// Tier title with whitespace collapsed.
    pub description: String,
}

impl RewardRecord {
    /// A record without an identifier can never be matched across polls.
    pub fn is_usable(&self) -> bool {
        !self.identifier.is_empty()
    }

    /// Displayed price as a fixed-point amount, if it parses.
    pub fn amount(&self) -> Option<Amount> {
        self.price.parse().ok()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("no digits in amount: {0:?}")]
    NoDigits(String),

    #[error("more than two decimal places in amount: {0:?}")]
    TooPrecise(String),

    #[error("ambiguous separator in amount (use 1,250.00 not 1.250): {0:?}")]
    Ambiguous(String),

    #[error("amount out of range: {0:?}")]
    Overflow(String),
}

/// A pledge amount in integer cents.
///
/// Currency symbols, letters and `,` thousands separators are ignored, so
/// `$1,250.00`, `1250` and `US$ 1250.0` are all the same amount. `.` is
/// always the decimal point; a fraction of exactly three digits (`1.250`)
/// reads as a European thousands group and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> u64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let (whole, frac) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };
        if frac.contains('.') {
            return Err(AmountError::NoDigits(s.to_string()));
        }
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::NoDigits(s.to_string()));
        }

        if frac.len() == 3 {
            return Err(AmountError::Ambiguous(s.to_string()));
        }

        let frac = frac.trim_end_matches('0');
        if frac.len() > 2 {
            return Err(AmountError::TooPrecise(s.to_string()));
        }

        let overflow = || AmountError::Overflow(s.to_string());
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac: u64 = format!("{frac:0<2}").parse().map_err(|_| overflow())?;

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .map(Amount)
            .ok_or_else(overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
