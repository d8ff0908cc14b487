//! Scoring configuration.
//!
//! Concept fallback chains and the working-capital group table are plain data.
//! [`ScoringConfig::default`] carries the built-in US-GAAP tables; a JSON file
//! can replace any part of them.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;
use tally_data::BalancePolarity;

/// An ordered list of equivalent concept names, most preferred first.
pub type ConceptChain = Vec<String>;

fn chain(names: &[&str]) -> ConceptChain {
    names.iter().map(|n| (*n).to_string()).collect()
}

/// Fallback chains for every canonical line item the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptChains {
    /// Directly tagged stockholders' equity
    pub equity: ConceptChain,
    /// Members' or partners' equity for non-corporate registrants
    pub members_equity: ConceptChain,
    /// Total assets
    pub assets: ConceptChain,
    /// Total liabilities
    pub liabilities: ConceptChain,
    /// Total liabilities and equity
    pub liabilities_and_equity: ConceptChain,
    /// Non-controlling interest (direct, then VIE)
    pub noncontrolling_interest: ConceptChain,
    /// Redeemable non-controlling interest, subtracted in addition
    pub redeemable_noncontrolling_interest: ConceptChain,
    /// Long-term debt
    pub debt: ConceptChain,
    /// Retained earnings or accumulated deficit
    pub retained_earnings: ConceptChain,
    /// Goodwill
    pub goodwill: ConceptChain,
    /// Intangible assets excluding goodwill
    pub intangibles: ConceptChain,
    /// Net income
    pub net_income: ConceptChain,
    /// Period change in cash and equivalents
    pub cash_change: ConceptChain,
    /// Proceeds from issuing debt
    pub debt_proceeds: ConceptChain,
    /// Repayments of debt
    pub debt_repayments: ConceptChain,
    /// Dividends paid
    pub dividends: ConceptChain,
    /// Proceeds from issuing common stock
    pub stock_proceeds: ConceptChain,
    /// Common stock repurchases
    pub stock_repurchase: ConceptChain,
    /// Proceeds from issuing preferred stock
    pub preferred_proceeds: ConceptChain,
    /// Preferred stock repurchases
    pub preferred_repurchase: ConceptChain,
    /// Capital expenditures
    pub capex: ConceptChain,
    /// Aggregate deferred income tax
    pub deferred_tax: ConceptChain,
    /// Deferred tax components summed when the aggregate is absent
    pub deferred_tax_components: ConceptChain,
    /// Depletion
    pub depletion: ConceptChain,
    /// Amortization of intangible assets
    pub amortization: ConceptChain,
    /// Combined depreciation, depletion and amortization
    pub depreciation_and_amortization: ConceptChain,
    /// Depreciation only
    pub depreciation: ConceptChain,
    /// Aggregate other non-cash income/expense
    pub other_noncash: ConceptChain,
    /// Other non-cash expense component
    pub other_noncash_expense: ConceptChain,
    /// Other non-cash income component
    pub other_noncash_income: ConceptChain,
    /// Shares outstanding
    pub shares: ConceptChain,
    /// Revenue
    pub revenue: ConceptChain,
    /// Cost of goods sold
    pub cost_of_goods: ConceptChain,
    /// Gross profit
    pub gross_profit: ConceptChain,
    /// Operating income
    pub operating_income: ConceptChain,
    /// Interest expense
    pub interest_expense: ConceptChain,
}

impl Default for ConceptChains {
    fn default() -> Self {
        Self {
            equity: chain(&[
                "StockholdersEquity",
                "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
            ]),
            members_equity: chain(&["MembersEquity", "PartnersCapital"]),
            assets: chain(&["Assets"]),
            liabilities: chain(&["Liabilities"]),
            liabilities_and_equity: chain(&["LiabilitiesAndStockholdersEquity"]),
            noncontrolling_interest: chain(&[
                "MinorityInterest",
                "NoncontrollingInterestInVariableInterestEntity",
            ]),
            redeemable_noncontrolling_interest: chain(&[
                "RedeemableNoncontrollingInterestEquityCarryingAmount",
            ]),
            debt: chain(&[
                "LongTermDebtAndCapitalLeaseObligations",
                "LongTermDebt",
                "LongTermDebtNoncurrent",
            ]),
            retained_earnings: chain(&["RetainedEarningsAccumulatedDeficit"]),
            goodwill: chain(&["Goodwill"]),
            intangibles: chain(&["IntangibleAssetsNetExcludingGoodwill"]),
            net_income: chain(&[
                "NetIncomeLoss",
                "IncomeLossFromContinuingOperations",
                "ProfitLoss",
            ]),
            cash_change: chain(&[
                "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalentsPeriodIncreaseDecreaseIncludingExchangeRateEffect",
                "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalentsPeriodIncreaseDecreaseExcludingExchangeRateEffect",
                "CashAndCashEquivalentsPeriodIncreaseDecrease",
            ]),
            debt_proceeds: chain(&[
                "ProceedsFromIssuanceOfLongTermDebt",
                "ProceedsFromIssuanceOfSeniorLongTermDebt",
                "ProceedsFromIssuanceOfDebt",
                "ProceedsFromConvertibleDebt",
            ]),
            debt_repayments: chain(&[
                "RepaymentsOfLongTermDebt",
                "RepaymentsOfDebt",
                "RepaymentsOfConvertibleDebt",
                "RepaymentsOfNotesPayable",
                "RepaymentsOfSeniorDebt",
            ]),
            dividends: chain(&[
                "PaymentsOfDividends",
                "PaymentsOfDividendsCommonStock",
                "Dividends",
                "DividendsCommonStockCash",
            ]),
            stock_proceeds: chain(&[
                "ProceedsFromIssuanceOfCommonStock",
                "ProceedsFromStockOptionsExercised",
            ]),
            stock_repurchase: chain(&[
                "PaymentsForRepurchaseOfCommonStock",
                "PaymentsForRepurchaseOfEquity",
            ]),
            preferred_proceeds: chain(&["ProceedsFromIssuanceOfPreferredStockAndPreferenceStock"]),
            preferred_repurchase: chain(&[
                "PaymentsForRepurchaseOfPreferredStockAndPreferenceStock",
            ]),
            capex: chain(&["PaymentsToAcquirePropertyPlantAndEquipment"]),
            deferred_tax: chain(&[
                "DeferredIncomeTaxExpenseBenefit",
                "DeferredIncomeTaxesAndTaxCredits",
            ]),
            deferred_tax_components: chain(&[
                "DeferredFederalIncomeTaxExpenseBenefit",
                "DeferredForeignIncomeTaxExpenseBenefit",
                "DeferredStateAndLocalIncomeTaxExpenseBenefit",
            ]),
            depletion: chain(&["Depletion"]),
            amortization: chain(&["AmortizationOfIntangibleAssets"]),
            depreciation_and_amortization: chain(&[
                "DepreciationDepletionAndAmortization",
                "DepreciationAndAmortization",
            ]),
            depreciation: chain(&["Depreciation"]),
            other_noncash: chain(&["OtherNoncashIncomeExpense"]),
            other_noncash_expense: chain(&["OtherNoncashExpense"]),
            other_noncash_income: chain(&["OtherNoncashIncome"]),
            shares: chain(&[
                "CommonStockSharesOutstanding",
                "WeightedAverageNumberOfSharesOutstandingBasic",
                "EntityCommonStockSharesOutstanding",
            ]),
            revenue: chain(&[
                "Revenues",
                "RevenueFromContractWithCustomerExcludingAssessedTax",
                "SalesRevenueNet",
                "RevenueFromContractWithCustomerIncludingAssessedTax",
            ]),
            cost_of_goods: chain(&[
                "CostOfGoodsAndServicesSold",
                "CostOfRevenue",
                "CostOfGoodsSold",
            ]),
            gross_profit: chain(&["GrossProfit"]),
            operating_income: chain(&["OperatingIncomeLoss"]),
            interest_expense: chain(&["InterestExpense", "InterestExpenseDebt"]),
        }
    }
}

impl ConceptChains {
    /// Chains read by the value scorecard (and by the moat scorecard too).
    pub fn value_chains(&self) -> Vec<(&'static str, &ConceptChain)> {
        vec![
            ("equity", &self.equity),
            ("members_equity", &self.members_equity),
            ("assets", &self.assets),
            ("liabilities", &self.liabilities),
            ("liabilities_and_equity", &self.liabilities_and_equity),
            ("noncontrolling_interest", &self.noncontrolling_interest),
            (
                "redeemable_noncontrolling_interest",
                &self.redeemable_noncontrolling_interest,
            ),
            ("debt", &self.debt),
            ("retained_earnings", &self.retained_earnings),
            ("goodwill", &self.goodwill),
            ("intangibles", &self.intangibles),
            ("net_income", &self.net_income),
            ("cash_change", &self.cash_change),
            ("debt_proceeds", &self.debt_proceeds),
            ("debt_repayments", &self.debt_repayments),
            ("dividends", &self.dividends),
            ("stock_proceeds", &self.stock_proceeds),
            ("stock_repurchase", &self.stock_repurchase),
            ("preferred_proceeds", &self.preferred_proceeds),
            ("preferred_repurchase", &self.preferred_repurchase),
            ("capex", &self.capex),
            ("deferred_tax", &self.deferred_tax),
            ("deferred_tax_components", &self.deferred_tax_components),
            ("depletion", &self.depletion),
            ("amortization", &self.amortization),
            (
                "depreciation_and_amortization",
                &self.depreciation_and_amortization,
            ),
            ("depreciation", &self.depreciation),
            ("other_noncash", &self.other_noncash),
            ("other_noncash_expense", &self.other_noncash_expense),
            ("other_noncash_income", &self.other_noncash_income),
            ("shares", &self.shares),
        ]
    }

    /// Chains only the moat scorecard reads.
    pub fn moat_chains(&self) -> Vec<(&'static str, &ConceptChain)> {
        vec![
            ("revenue", &self.revenue),
            ("cost_of_goods", &self.cost_of_goods),
            ("gross_profit", &self.gross_profit),
            ("operating_income", &self.operating_income),
            ("interest_expense", &self.interest_expense),
        ]
    }
}

/// One line-item group in the working-capital table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingCapitalGroup {
    /// Stable group name, referenced by `superseded_by`
    pub name: String,
    /// `Credit` groups are negated, `Debit` groups kept as reported
    pub polarity: BalancePolarity,
    /// Alternative concepts for the same item, most preferred first
    pub concepts: ConceptChain,
    /// Earlier groups that subsume this one; if any of them contributed, this
    /// group is skipped
    #[serde(default)]
    pub superseded_by: Vec<String>,
}

impl WorkingCapitalGroup {
    fn new(
        name: &str,
        polarity: BalancePolarity,
        concepts: &[&str],
        superseded_by: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            polarity,
            concepts: concepts
                .iter()
                .map(|c| format!("IncreaseDecreaseIn{c}"))
                .collect(),
            superseded_by: chain(superseded_by),
        }
    }
}

/// Working-capital change configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingCapitalTable {
    /// Company-level aggregate concepts; when present the groups are skipped
    pub aggregate: ConceptChain,
    /// Line-item groups in evaluation order
    pub groups: Vec<WorkingCapitalGroup>,
}

impl Default for WorkingCapitalTable {
    fn default() -> Self {
        use BalancePolarity::{Credit, Debit};
        let g = WorkingCapitalGroup::new;

        Self {
            aggregate: chain(&[
                "IncreaseDecreaseInOperatingCapital",
                "IncreaseDecreaseInOtherOperatingCapitalNet",
            ]),
            groups: vec![
                g(
                    "receivables_and_other_operating_assets",
                    Credit,
                    &["AccountsReceivableAndOtherOperatingAssets"],
                    &[],
                ),
                g(
                    "receivables",
                    Credit,
                    &[
                        "Receivables",
                        "AccountsAndOtherReceivables",
                        "AccountsAndNotesReceivable",
                    ],
                    &["receivables_and_other_operating_assets"],
                ),
                g(
                    "accounts_receivable",
                    Credit,
                    &["AccountsReceivable"],
                    &["receivables_and_other_operating_assets", "receivables"],
                ),
                g(
                    "other_receivables",
                    Credit,
                    &["OtherReceivables"],
                    &["receivables_and_other_operating_assets", "receivables"],
                ),
                g("inventories", Credit, &["Inventories"], &[]),
                g(
                    "accrued_and_other_operating_liabilities",
                    Debit,
                    &["AccruedLiabilitiesAndOtherOperatingLiabilities"],
                    &[],
                ),
                g(
                    "payables_and_accrued",
                    Debit,
                    &[
                        "AccountsPayableAndAccruedLiabilities",
                        "OtherAccountsPayableAndAccruedLiabilities",
                    ],
                    &["accrued_and_other_operating_liabilities"],
                ),
                g(
                    "accounts_payable",
                    Debit,
                    &["AccountsPayable", "AccountsPayableTrade"],
                    &["payables_and_accrued"],
                ),
                g(
                    "accrued_liabilities",
                    Debit,
                    &["AccruedLiabilities", "OtherAccruedLiabilities"],
                    &[
                        "accrued_and_other_operating_liabilities",
                        "payables_and_accrued",
                    ],
                ),
                g(
                    "prepaid_and_other_assets",
                    Credit,
                    &["PrepaidDeferredExpenseAndOtherAssets"],
                    &[],
                ),
                g(
                    "prepaid_expense",
                    Credit,
                    &["PrepaidExpense"],
                    &["prepaid_and_other_assets"],
                ),
                g("deferred_revenue", Debit, &["DeferredRevenue"], &[]),
                g(
                    "contract_liability",
                    Debit,
                    &["ContractWithCustomerLiability"],
                    &["deferred_revenue"],
                ),
                g("contract_asset", Credit, &["ContractWithCustomerAsset"], &[]),
                g(
                    "other_operating_assets",
                    Credit,
                    &["OtherOperatingAssets"],
                    &["receivables_and_other_operating_assets"],
                ),
                g(
                    "other_current_assets",
                    Credit,
                    &["OtherCurrentAssets"],
                    &[
                        "receivables_and_other_operating_assets",
                        "other_operating_assets",
                    ],
                ),
                g(
                    "other_noncurrent_assets",
                    Credit,
                    &["OtherNoncurrentAssets"],
                    &["other_operating_assets"],
                ),
                g(
                    "other_operating_liabilities",
                    Debit,
                    &["OtherOperatingLiabilities"],
                    &["accrued_and_other_operating_liabilities"],
                ),
                g(
                    "other_current_liabilities",
                    Debit,
                    &["OtherCurrentLiabilities"],
                    &[
                        "accrued_and_other_operating_liabilities",
                        "other_operating_liabilities",
                    ],
                ),
                g(
                    "other_noncurrent_liabilities",
                    Debit,
                    &["OtherNoncurrentLiabilities"],
                    &[
                        "accrued_and_other_operating_liabilities",
                        "other_operating_liabilities",
                    ],
                ),
                g(
                    "accrued_income_taxes_payable",
                    Debit,
                    &["AccruedIncomeTaxesPayable"],
                    &[],
                ),
                g(
                    "self_insurance_reserve",
                    Debit,
                    &["SelfInsuranceReserve"],
                    &[],
                ),
                g(
                    "operating_lease_liability",
                    Debit,
                    &["OperatingLeaseLiability"],
                    &[],
                ),
                g(
                    "employee_related_liabilities",
                    Debit,
                    &["EmployeeRelatedLiabilities"],
                    &[],
                ),
                g("interest_payable", Debit, &["InterestPayableNet"], &[]),
                g(
                    "income_taxes_receivable",
                    Credit,
                    &["IncomeTaxesReceivable"],
                    &[],
                ),
            ],
        }
    }
}

impl WorkingCapitalTable {
    /// Check that the table is well formed.
    ///
    /// A group may only be superseded by groups declared before it, and each
    /// concept may belong to at most one group.
    pub fn validate(&self) -> Result<()> {
        if self.aggregate.is_empty() {
            return Err(ConfigError::EmptyChain("working_capital.aggregate".to_string()));
        }

        let mut declared: Vec<&str> = Vec::with_capacity(self.groups.len());
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for group in &self.groups {
            if !matches!(group.polarity, BalancePolarity::Credit | BalancePolarity::Debit) {
                return Err(ConfigError::InvalidPolarity(group.name.clone()));
            }
            if group.concepts.is_empty() {
                return Err(ConfigError::EmptyChain(format!(
                    "working_capital.{}",
                    group.name
                )));
            }
            if declared.contains(&group.name.as_str()) {
                return Err(ConfigError::DuplicateGroup(group.name.clone()));
            }
            for earlier in &group.superseded_by {
                if !declared.contains(&earlier.as_str()) {
                    return Err(ConfigError::UnknownSupersedingGroup {
                        group: group.name.clone(),
                        superseded_by: earlier.clone(),
                    });
                }
            }
            for concept in &group.concepts {
                if let Some(first) = owners.insert(concept.as_str(), group.name.as_str()) {
                    return Err(ConfigError::DuplicateConcept {
                        concept: concept.clone(),
                        first: first.to_string(),
                        second: group.name.clone(),
                    });
                }
            }
            declared.push(group.name.as_str());
        }

        Ok(())
    }

    /// Every concept the table may read.
    pub fn concept_names(&self) -> impl Iterator<Item = &String> {
        self.aggregate
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.concepts.iter()))
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Concept fallback chains
    pub chains: ConceptChains,
    /// Working-capital group table
    pub working_capital: WorkingCapitalTable,
    /// Annual period ends kept for the value scorecard (default: 5)
    pub value_window_years: usize,
    /// Annual period ends kept for the moat scorecard (default: 8)
    pub moat_window_years: usize,
    /// Timeout for upstream fetches, in seconds (default: 120)
    pub fetch_timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            chains: ConceptChains::default(),
            working_capital: WorkingCapitalTable::default(),
            value_window_years: 5,
            moat_window_years: 8,
            fetch_timeout_secs: 120,
        }
    }
}

impl ScoringConfig {
    /// Load and validate a configuration from a JSON file. Missing fields take
    /// their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        tracing::debug!(
            groups = config.working_capital.groups.len(),
            value_window = config.value_window_years,
            moat_window = config.moat_window_years,
            "Loaded scoring config"
        );
        Ok(config)
    }

    /// Validate chains, windows and the working-capital table.
    pub fn validate(&self) -> Result<()> {
        for (name, chain) in self
            .chains
            .value_chains()
            .into_iter()
            .chain(self.chains.moat_chains())
        {
            if chain.is_empty() {
                return Err(ConfigError::EmptyChain(name.to_string()));
            }
        }
        if self.value_window_years == 0 {
            return Err(ConfigError::EmptyWindow("value_window_years"));
        }
        if self.moat_window_years == 0 {
            return Err(ConfigError::EmptyWindow("moat_window_years"));
        }
        self.working_capital.validate()
    }

    /// Upstream fetch timeout.
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Sorted, de-duplicated concept names the value scorecard reads.
    pub fn value_concept_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for (_, chain) in self.chains.value_chains() {
            names.extend(chain.iter().cloned());
        }
        names.extend(self.working_capital.concept_names().cloned());
        names.into_iter().collect()
    }

    /// Sorted, de-duplicated concept names the moat scorecard reads.
    pub fn moat_concept_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.value_concept_names().into_iter().collect();
        for (_, chain) in self.chains.moat_chains() {
            names.extend(chain.iter().cloned());
        }
        names.into_iter().collect()
    }
}
