//! Closed vocabularies for the categorical churn features.
//!
//! Every categorical value that reaches a scorer is one of the variants below. Raw text is
//! canonicalized into a token first and anything outside the vocabulary collapses onto the
//! field's fallback variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fixed, closed set of tokens for one categorical field.
pub trait Vocabulary: Sized + Copy + PartialEq + 'static {
    /// Field name as it appears in raw records.
    const FIELD: &'static str;
    /// Variant assigned to any token outside the vocabulary.
    const FALLBACK: Self;
    /// Every variant, in encoding order.
    const ALL: &'static [Self];

    /// Canonical token for this variant.
    fn as_str(self) -> &'static str;

    /// Look up a variant by its canonical token.
    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|variant| variant.as_str() == token)
    }

    /// Canonicalize a raw value, substituting the fallback for unknown tokens.
    fn canonicalize(value: &Value) -> Self {
        Self::from_token(&canonical_token(value)).unwrap_or(Self::FALLBACK)
    }

    /// Position of this variant inside [`Vocabulary::ALL`].
    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|variant| *variant == self)
            .unwrap_or(0)
    }
}

/// Account contract length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    MonthToMonth,
    OneYear,
    TwoYear,
}

impl Vocabulary for ContractType {
    const FIELD: &'static str = "contract_type";
    const FALLBACK: Self = Self::MonthToMonth;
    const ALL: &'static [Self] = &[Self::MonthToMonth, Self::OneYear, Self::TwoYear];

    fn as_str(self) -> &'static str {
        match self {
            Self::MonthToMonth => "month_to_month",
            Self::OneYear => "one_year",
            Self::TwoYear => "two_year",
        }
    }
}

/// Internet service tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternetService {
    #[serde(rename = "dsl")]
    Dsl,
    #[serde(rename = "fiber")]
    Fiber,
    #[serde(rename = "none")]
    NoService,
}

impl Vocabulary for InternetService {
    const FIELD: &'static str = "internet_service";
    const FALLBACK: Self = Self::NoService;
    const ALL: &'static [Self] = &[Self::Dsl, Self::Fiber, Self::NoService];

    fn as_str(self) -> &'static str {
        match self {
            Self::Dsl => "dsl",
            Self::Fiber => "fiber",
            Self::NoService => "none",
        }
    }
}

/// Billing payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    ElectronicCheck,
    MailedCheck,
    BankTransfer,
    CreditCard,
}

impl Vocabulary for PaymentMethod {
    const FIELD: &'static str = "payment_method";
    const FALLBACK: Self = Self::ElectronicCheck;
    const ALL: &'static [Self] = &[
        Self::ElectronicCheck,
        Self::MailedCheck,
        Self::BankTransfer,
        Self::CreditCard,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::ElectronicCheck => "electronic_check",
            Self::MailedCheck => "mailed_check",
            Self::BankTransfer => "bank_transfer",
            Self::CreditCard => "credit_card",
        }
    }
}

/// Stringify a raw value, then trim, lowercase and replace `-` and spaces with `_`.
///
/// Non-string values are rendered the way a dynamically typed producer would print them:
/// `null` becomes `None` and booleans become `True`/`False`, so `null` canonicalizes to `none`.
pub fn canonical_token(value: &Value) -> String {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    };
    text.trim().to_lowercase().replace(['-', ' '], "_")
}
