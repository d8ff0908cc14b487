//! Per-year cash-flow figures shared by both scorecards.

use crate::config::ScoringConfig;
use crate::resolver::{
    Snapshot, resolve, resolve_deferred_tax, resolve_depletion_and_amortization,
    resolve_other_non_cash, resolve_working_capital_change,
};

/// Flow figures resolved from one annual snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearFlows {
    /// Cash change net of financing; `None` when the year has no cash-change tag
    pub net_cash_flow: Option<f64>,
    /// Owner earnings; `None` when the year has no net income
    pub owner_earnings: Option<f64>,
    /// Net income
    pub net_income: Option<f64>,
    /// Capital expenditures (0 when untagged)
    pub capex: f64,
    /// Dividends paid (0 when untagged)
    pub dividends: f64,
    /// Common stock repurchases (0 when untagged)
    pub stock_repurchase: f64,
    /// Stock proceeds minus repurchases
    pub net_stock_issuance: f64,
    /// Preferred proceeds minus repurchases
    pub net_preferred_issuance: f64,
}

impl YearFlows {
    /// Resolve every flow figure for one year.
    pub fn resolve(snapshot: &Snapshot, config: &ScoringConfig) -> Self {
        let chains = &config.chains;
        let zero = |chain: &[String]| resolve(snapshot, chain, Some(0.0)).unwrap_or(0.0);

        let stock_repurchase = zero(&chains.stock_repurchase);
        let net_stock_issuance = zero(&chains.stock_proceeds) - stock_repurchase;
        let net_preferred_issuance =
            zero(&chains.preferred_proceeds) - zero(&chains.preferred_repurchase);

        let net_cash_flow = resolve(snapshot, &chains.cash_change, None).map(|cash_change| {
            let net_debt_issuance = zero(&chains.debt_proceeds) - zero(&chains.debt_repayments);
            cash_change - (net_debt_issuance + net_stock_issuance + net_preferred_issuance)
        });

        let capex = zero(&chains.capex);
        let net_income = resolve(snapshot, &chains.net_income, None);
        let owner_earnings = net_income.map(|ni| {
            ni + resolve_depletion_and_amortization(snapshot, chains)
                + resolve_deferred_tax(snapshot, chains)
                + resolve_other_non_cash(snapshot, chains)
                - capex
                + resolve_working_capital_change(snapshot, &config.working_capital)
        });

        Self {
            net_cash_flow,
            owner_earnings,
            net_income,
            capex,
            dividends: zero(&chains.dividends),
            stock_repurchase,
            net_stock_issuance,
            net_preferred_issuance,
        }
    }
}

/// Running mean over the years that contribute a value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Average {
    total: f64,
    count: usize,
}

impl Average {
    /// Add a contributing year.
    pub fn push(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    /// Add a year only if it contributes.
    pub fn push_opt(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.push(v);
        }
    }

    /// Mean, or `None` with no contributing years.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }

    /// Number of contributing years.
    pub const fn count(&self) -> usize {
        self.count
    }
}

/// `numerator / denominator`, unavailable for a zero denominator.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn snapshot(pairs: &[(&str, f64)]) -> Snapshot {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn test_owner_earnings_formula() {
        let config = ScoringConfig::default();
        let snap = snapshot(&[
            ("NetIncomeLoss", 100.0),
            ("AmortizationOfIntangibleAssets", 10.0),
            ("DeferredIncomeTaxExpenseBenefit", 5.0),
            ("OtherNoncashIncomeExpense", 2.0),
            ("PaymentsToAcquirePropertyPlantAndEquipment", 30.0),
            ("IncreaseDecreaseInInventories", 7.0),
        ]);
        let flows = YearFlows::resolve(&snap, &config);
        // 100 + 10 + 5 + 2 - 30 - 7
        assert_relative_eq!(flows.owner_earnings.unwrap(), 80.0);
        assert_eq!(flows.net_cash_flow, None);
    }

    #[test]
    fn test_net_cash_flow_strips_financing() {
        let config = ScoringConfig::default();
        let snap = snapshot(&[
            ("CashAndCashEquivalentsPeriodIncreaseDecrease", 50.0),
            ("ProceedsFromIssuanceOfLongTermDebt", 40.0),
            ("RepaymentsOfLongTermDebt", 10.0),
            ("ProceedsFromIssuanceOfCommonStock", 5.0),
            ("PaymentsForRepurchaseOfCommonStock", 25.0),
            ("ProceedsFromIssuanceOfPreferredStockAndPreferenceStock", 3.0),
        ]);
        let flows = YearFlows::resolve(&snap, &config);
        // 50 - (30 - 20 + 3)
        assert_relative_eq!(flows.net_cash_flow.unwrap(), 37.0);
        assert_eq!(flows.owner_earnings, None);
        assert_relative_eq!(flows.stock_repurchase, 25.0);
    }

    #[test]
    fn test_average_and_ratio() {
        let mut avg = Average::default();
        assert_eq!(avg.mean(), None);
        avg.push(1.0);
        avg.push_opt(None);
        avg.push_opt(Some(3.0));
        assert_eq!(avg.count(), 2);
        assert_eq!(avg.mean(), Some(2.0));

        assert_eq!(ratio(1.0, 0.0), None);
        assert_eq!(ratio(1.0, 4.0), Some(0.25));
    }
}
