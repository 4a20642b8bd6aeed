//! Mock payment gateway.
//!
//! Simulates a card processor: it validates card format (Luhn checksum,
//! expiry, CVV) and approves anything well-formed. No money moves. The
//! order engine treats its verdict as authoritative for "is this paid".

use chrono::{Datelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Card brand inferred from the number prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardType {
    Visa,
    Mastercard,
    AmericanExpress,
    Discover,
    Unknown,
}

impl CardType {
    pub fn detect(digits: &str) -> Self {
        if digits.starts_with('4') {
            Self::Visa
        } else if matches!(digits.get(..2), Some("51" | "52" | "53" | "54" | "55")) {
            Self::Mastercard
        } else if matches!(digits.get(..2), Some("34" | "37")) {
            Self::AmericanExpress
        } else if digits.starts_with("6011") {
            Self::Discover
        } else {
            Self::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Visa => "Visa",
            Self::Mastercard => "Mastercard",
            Self::AmericanExpress => "American Express",
            Self::Discover => "Discover",
            Self::Unknown => "Unknown",
        }
    }

    fn cvv_length(self) -> usize {
        // Amex uses 4-digit CVVs, everyone else 3.
        if self == Self::AmericanExpress {
            4
        } else {
            3
        }
    }
}

/// Card details submitted with an order.
#[derive(Clone, Debug, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry_month: u32,
    pub expiry_year: u32,
    pub cvv: String,
    pub cardholder_name: String,
}

/// Successful authorization. `transaction_id` and `authorization_code` are
/// synthesized; no settlement occurs.
#[derive(Clone, Debug, Serialize)]
pub struct PaymentReceipt {
    pub success: bool,
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub card_type: String,
    pub last_four: String,
    pub authorization_code: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentDecline {
    pub reason: String,
}

impl PaymentDecline {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for PaymentDecline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// Explicit gateway configuration, passed to the constructor.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub currency: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockGateway {
    config: GatewayConfig,
}

impl MockGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Authorize `amount` against the given card.
    pub fn authorize(
        &self,
        card: &CardDetails,
        amount: Decimal,
    ) -> std::result::Result<PaymentReceipt, PaymentDecline> {
        let now = Utc::now();
        self.authorize_at(card, amount, now.year() as u32, now.month())
    }

    fn authorize_at(
        &self,
        card: &CardDetails,
        amount: Decimal,
        current_year: u32,
        current_month: u32,
    ) -> std::result::Result<PaymentReceipt, PaymentDecline> {
        let (card_type, last_four) = validate_card_number(&card.card_number)?;
        validate_expiry(card.expiry_month, card.expiry_year, current_year, current_month)?;
        validate_cvv(&card.cvv, card_type)?;
        if amount <= Decimal::ZERO {
            return Err(PaymentDecline::new("Invalid amount"));
        }

        let transaction_id = format!(
            "TXN_{}",
            &Uuid::new_v4().simple().to_string().to_uppercase()[..12]
        );
        let authorization_code = format!("AUTH_{}", rand::thread_rng().gen_range(100_000..=999_999));

        Ok(PaymentReceipt {
            success: true,
            transaction_id,
            amount,
            currency: self.config.currency.clone(),
            card_type: card_type.label().to_string(),
            last_four,
            authorization_code,
            message: "Payment processed successfully".to_string(),
        })
    }
}

/// Normalize and validate a card number, returning the detected brand and
/// the last four digits.
fn validate_card_number(raw: &str) -> std::result::Result<(CardType, String), PaymentDecline> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentDecline::new("Card number must contain only digits"));
    }
    if digits.len() < 13 || digits.len() > 19 {
        return Err(PaymentDecline::new("Invalid card number length"));
    }
    if !luhn_valid(&digits) {
        return Err(PaymentDecline::new("Invalid card number"));
    }

    let card_type = CardType::detect(&digits);
    let last_four = digits[digits.len() - 4..].to_string();
    Ok((card_type, last_four))
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

fn validate_expiry(
    month: u32,
    year: u32,
    current_year: u32,
    current_month: u32,
) -> std::result::Result<(), PaymentDecline> {
    if !(1..=12).contains(&month) {
        return Err(PaymentDecline::new("Invalid expiry month"));
    }
    // Two-digit years are taken as 20xx.
    let year = if year < 100 { year + 2000 } else { year };
    if year < current_year || (year == current_year && month < current_month) {
        return Err(PaymentDecline::new("Card has expired"));
    }
    Ok(())
}

fn validate_cvv(cvv: &str, card_type: CardType) -> std::result::Result<(), PaymentDecline> {
    if cvv.is_empty() || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentDecline::new("CVV must be numeric"));
    }
    let expected = card_type.cvv_length();
    if cvv.len() != expected {
        return Err(PaymentDecline::new(format!(
            "CVV must be {} digits for {}",
            expected,
            card_type.label()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str, month: u32, year: u32, cvv: &str) -> CardDetails {
        CardDetails {
            card_number: number.to_string(),
            expiry_month: month,
            expiry_year: year,
            cvv: cvv.to_string(),
            cardholder_name: "Test Holder".to_string(),
        }
    }

    fn gateway() -> MockGateway {
        MockGateway::new(GatewayConfig::default())
    }

    #[test]
    fn test_visa_is_approved() {
        let receipt = gateway()
            .authorize_at(
                &card("4532015112830366", 12, 2030, "123"),
                Decimal::new(5000, 2),
                2026,
                8,
            )
            .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.card_type, "Visa");
        assert_eq!(receipt.last_four, "0366");
        assert!(receipt.transaction_id.starts_with("TXN_"));
        assert!(receipt.authorization_code.starts_with("AUTH_"));
        assert_eq!(receipt.amount, Decimal::new(5000, 2));
    }

    #[test]
    fn test_luhn_failure_is_declined() {
        // One digit off a valid Visa number breaks the checksum.
        let err = gateway()
            .authorize_at(&card("4532015112830367", 12, 2030, "123"), Decimal::ONE, 2026, 8)
            .unwrap_err();
        assert_eq!(err.reason, "Invalid card number");
    }

    #[test]
    fn test_luhn_checksum() {
        assert!(luhn_valid("4532015112830366"));
        assert!(luhn_valid("6011111111111117"));
        assert!(!luhn_valid("1234567812345678"));
        assert!(!luhn_valid("4532015112830367"));
    }

    #[test]
    fn test_spaces_and_dashes_are_stripped() {
        let receipt = gateway()
            .authorize_at(
                &card("4532 0151-1283 0366", 1, 2031, "123"),
                Decimal::ONE,
                2026,
                8,
            )
            .unwrap();
        assert_eq!(receipt.last_four, "0366");
    }

    #[test]
    fn test_non_digit_card_is_declined() {
        let err = gateway()
            .authorize_at(&card("4532abcd11283036", 12, 2030, "123"), Decimal::ONE, 2026, 8)
            .unwrap_err();
        assert_eq!(err.reason, "Card number must contain only digits");
    }

    #[test]
    fn test_card_length_bounds() {
        let err = gateway()
            .authorize_at(&card("411111111111", 12, 2030, "123"), Decimal::ONE, 2026, 8)
            .unwrap_err();
        assert_eq!(err.reason, "Invalid card number length");
    }

    #[test]
    fn test_card_type_detection() {
        assert_eq!(CardType::detect("4532015112830366"), CardType::Visa);
        assert_eq!(CardType::detect("5555555555554444"), CardType::Mastercard);
        assert_eq!(CardType::detect("378282246310005"), CardType::AmericanExpress);
        assert_eq!(CardType::detect("6011111111111117"), CardType::Discover);
        assert_eq!(CardType::detect("9999999999999999"), CardType::Unknown);
    }

    #[test]
    fn test_amex_requires_four_digit_cvv() {
        let g = gateway();
        let err = g
            .authorize_at(&card("378282246310005", 12, 2030, "123"), Decimal::ONE, 2026, 8)
            .unwrap_err();
        assert_eq!(err.reason, "CVV must be 4 digits for American Express");

        assert!(g
            .authorize_at(&card("378282246310005", 12, 2030, "1234"), Decimal::ONE, 2026, 8)
            .is_ok());
    }

    #[test]
    fn test_two_digit_year_is_normalized() {
        assert!(validate_expiry(12, 30, 2026, 8).is_ok());
        assert!(validate_expiry(12, 24, 2026, 8).is_err());
    }

    #[test]
    fn test_expiry_rules() {
        assert!(validate_expiry(0, 2030, 2026, 8).is_err());
        assert!(validate_expiry(13, 2030, 2026, 8).is_err());
        // Earlier month of the current year has expired; the current month
        // itself is still valid.
        assert!(validate_expiry(7, 2026, 2026, 8).is_err());
        assert!(validate_expiry(8, 2026, 2026, 8).is_ok());
        assert!(validate_expiry(1, 2025, 2026, 8).is_err());
    }

    #[test]
    fn test_zero_amount_is_declined() {
        let err = gateway()
            .authorize_at(&card("4532015112830366", 12, 2030, "123"), Decimal::ZERO, 2026, 8)
            .unwrap_err();
        assert_eq!(err.reason, "Invalid amount");
    }
}
