use serde::{Deserialize, Serialize};

use crate::{types::*, CovenantError, CovenantResult};

/// Raw figures reported for one financial period.
///
/// Every figure is optional: `None` means "not supplied", which is not the
/// same thing as zero. The evaluator rejects a missing figure it needs rather
/// than assuming a value for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialFigures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_expense: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_charges: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_assets: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_liabilities: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_worth: Option<Money>,
}

/// Names a single figure in `FinancialFigures`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FigureField {
    Revenue,
    Ebitda,
    TotalDebt,
    InterestExpense,
    FixedCharges,
    CurrentAssets,
    CurrentLiabilities,
    NetWorth,
}

impl FigureField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Ebitda => "ebitda",
            Self::TotalDebt => "total_debt",
            Self::InterestExpense => "interest_expense",
            Self::FixedCharges => "fixed_charges",
            Self::CurrentAssets => "current_assets",
            Self::CurrentLiabilities => "current_liabilities",
            Self::NetWorth => "net_worth",
        }
    }
}

impl std::fmt::Display for FigureField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FinancialFigures {
    pub fn get(&self, field: FigureField) -> Option<Money> {
        match field {
            FigureField::Revenue => self.revenue,
            FigureField::Ebitda => self.ebitda,
            FigureField::TotalDebt => self.total_debt,
            FigureField::InterestExpense => self.interest_expense,
            FigureField::FixedCharges => self.fixed_charges,
            FigureField::CurrentAssets => self.current_assets,
            FigureField::CurrentLiabilities => self.current_liabilities,
            FigureField::NetWorth => self.net_worth,
        }
    }

    /// Fetch a figure that `covenant` cannot be tested without.
    pub fn require(&self, field: FigureField, covenant: &str) -> CovenantResult<Money> {
        self.get(field).ok_or_else(|| CovenantError::MissingInput {
            covenant: covenant.to_string(),
            field: field.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_absent_fields_deserialize_as_missing() {
        let figures: FinancialFigures =
            serde_json::from_str(r#"{"ebitda":"12450000","total_debt":null}"#).unwrap();
        assert_eq!(figures.ebitda, Some(dec!(12_450_000)));
        assert_eq!(figures.total_debt, None);
        assert_eq!(figures.net_worth, None);
    }

    #[test]
    fn test_zero_is_not_missing() {
        let figures = FinancialFigures {
            interest_expense: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert_eq!(
            figures.require(FigureField::InterestExpense, "interest_coverage").unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_require_names_missing_field() {
        let figures = FinancialFigures::default();
        let err = figures.require(FigureField::TotalDebt, "leverage").unwrap_err();
        match err {
            CovenantError::MissingInput { covenant, field } => {
                assert_eq!(covenant, "leverage");
                assert_eq!(field, "total_debt");
            }
            other => panic!("Expected MissingInput, got {other:?}"),
        }
    }
}
