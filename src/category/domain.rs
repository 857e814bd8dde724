//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::CategoryId, user::UserID};

/// The maximum number of characters in a category title.
pub const MAX_TITLE_LENGTH: usize = 255;

/// A validated, non-empty category title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryTitle(String);

impl CategoryTitle {
    /// Create a category title.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryTitle] if `title` is
    /// empty or only whitespace, or [Error::CategoryTitleTooLong] if it has
    /// more than [MAX_TITLE_LENGTH] characters.
    pub fn new(title: &str) -> Result<Self, Error> {
        let title = title.trim();

        if title.is_empty() {
            Err(Error::EmptyCategoryTitle)
        } else if title.chars().count() > MAX_TITLE_LENGTH {
            Err(Error::CategoryTitleTooLong(MAX_TITLE_LENGTH))
        } else {
            Ok(Self(title.to_string()))
        }
    }

    /// Create a category title without validation.
    ///
    /// The caller should ensure that the string is not empty and not longer
    /// than [MAX_TITLE_LENGTH] characters.
    pub fn new_unchecked(title: &str) -> Self {
        Self(title.to_string())
    }
}

impl AsRef<str> for CategoryTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryTitle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryTitle::new(s)
    }
}

impl Display for CategoryTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monthly spending limit with exactly two decimal places.
///
/// Budgets are stored as a `DECIMAL(10, 2)`: at most eight digits before the
/// decimal point and two after. Values with fewer decimal places are padded,
/// so `1234.5` becomes `1234.50`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct MonthlyBudget(Decimal);

impl MonthlyBudget {
    /// The number of digits after the decimal point.
    pub const DECIMAL_PLACES: u32 = 2;
    /// The total number of digits a budget may have.
    pub const MAX_DIGITS: u32 = 10;

    /// Create a monthly budget from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidMonthlyBudget] if `amount` is negative, has
    /// more than two decimal places or more than eight integer digits.
    pub fn new(amount: Decimal) -> Result<Self, Error> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(Error::InvalidMonthlyBudget(format!(
                "{amount} is negative"
            )));
        }

        Self::within_column_limits(amount)
    }

    // Rows written before budgets were validated may hold negative amounts,
    // so reads only enforce what the column itself can hold.
    fn within_column_limits(amount: Decimal) -> Result<Self, Error> {
        if amount.scale() > Self::DECIMAL_PLACES {
            return Err(Error::InvalidMonthlyBudget(format!(
                "{amount} has more than {} decimal places",
                Self::DECIMAL_PLACES
            )));
        }

        let max_integer_digits = Self::MAX_DIGITS - Self::DECIMAL_PLACES;
        if amount.trunc().abs() >= Decimal::from(10_i64.pow(max_integer_digits)) {
            return Err(Error::InvalidMonthlyBudget(format!(
                "{amount} has more than {max_integer_digits} digits before the decimal point"
            )));
        }

        let mut amount = if amount.is_zero() {
            Decimal::ZERO
        } else {
            amount
        };
        amount.rescale(Self::DECIMAL_PLACES);

        Ok(Self(amount))
    }

    /// The budget as a decimal with exactly two decimal places.
    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl FromStr for MonthlyBudget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str_exact(s.trim())
            .map_err(|error| Error::InvalidMonthlyBudget(format!("\"{s}\": {error}")))?;

        MonthlyBudget::new(amount)
    }
}

impl TryFrom<Decimal> for MonthlyBudget {
    type Error = Error;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        MonthlyBudget::new(amount)
    }
}

impl From<MonthlyBudget> for Decimal {
    fn from(budget: MonthlyBudget) -> Self {
        budget.0
    }
}

impl Display for MonthlyBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for MonthlyBudget {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

// A DECIMAL column has NUMERIC affinity, so SQLite hands back an INTEGER or a
// REAL for values written as text. Two decimal places survive the trip
// through f64, rounding recovers them.
impl FromSql for MonthlyBudget {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let amount = match value {
            ValueRef::Integer(integer) => Decimal::from(integer),
            ValueRef::Real(real) => Decimal::try_from(real)
                .map_err(|error| FromSqlError::Other(Box::new(error)))?
                .round_dp(Self::DECIMAL_PLACES),
            ValueRef::Text(text) => {
                let text =
                    std::str::from_utf8(text).map_err(|error| FromSqlError::Other(Box::new(error)))?;
                Decimal::from_str_exact(text)
                    .map_err(|error| FromSqlError::Other(Box::new(error)))?
            }
            _ => return Err(FromSqlError::InvalidType),
        };

        MonthlyBudget::within_column_limits(amount)
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A colour in the hex form `#RRGGBB`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryColor(String);

impl CategoryColor {
    /// Create a category colour.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidColor] if `color` is not a `#` followed by
    /// exactly six hexadecimal digits.
    pub fn new(color: &str) -> Result<Self, Error> {
        let color = color.trim();

        match color.strip_prefix('#') {
            Some(hex) if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
                Ok(Self(color.to_string()))
            }
            _ => Err(Error::InvalidColor(color.to_string())),
        }
    }

    /// Create a category colour without validation.
    pub fn new_unchecked(color: &str) -> Self {
        Self(color.to_string())
    }
}

impl AsRef<str> for CategoryColor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryColor::new(s)
    }
}

impl Display for CategoryColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A per-user spending category with a monthly budget, e.g. 'Groceries'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display title.
    pub title: CategoryTitle,
    /// How much the user plans to spend in this category each month.
    pub monthly_budget: MonthlyBudget,
    /// The colour used when displaying the category.
    pub color: CategoryColor,
    /// The user that owns the category.
    pub user_id: UserID,
}

/// The details needed to create a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    /// The display title.
    pub title: CategoryTitle,
    /// How much the user plans to spend in this category each month.
    pub monthly_budget: MonthlyBudget,
    /// The colour used when displaying the category.
    pub color: CategoryColor,
    /// The user that will own the category.
    pub user_id: UserID,
}
