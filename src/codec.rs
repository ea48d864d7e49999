//! Scannable Code Payloads
//!
//! Wire format (a JSON object):
//!
//! ```text
//! {"type": "receive", "userId", "name", "phoneNumber"}
//! {"type": "payment", "merchantName", "amount"?, "reference"?}
//! ```
//!
//! Scanned input is untrusted: [`decode`] validates every field and returns
//! [`DecodeError::InvalidFormat`] for anything it does not recognise. Unknown
//! extra fields are ignored. Decoding has no side effects; the caller decides
//! what to do with the payload.
//!
//! `amount` is a JSON integer for whole shillings and an exact decimal string
//! (`"1299.5"`) otherwise; [`decode`] accepts either form, plus plain JSON
//! floats from other producers. [`encode`] refuses any payload that [`decode`]
//! would reject or normalise, so `decode(encode(x)) == x` whenever `encode`
//! succeeds.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::str::FromStr;
use thiserror::Error;

use crate::core_types::{Recipient, UserId, is_valid_phone_number};
use crate::money::CURRENCY_DECIMALS;
use crate::session::UserProfile;

/// Scanned strings longer than this are rejected before parsing.
pub const MAX_PAYLOAD_LEN: usize = 4096;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid code format: {0}")]
    InvalidFormat(String),
}

impl DecodeError {
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::InvalidFormat(_) => "INVALID_FORMAT",
        }
    }
}

fn invalid(reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidFormat(reason.into())
}

// ============================================================================
// Payload types
// ============================================================================

/// "Send money to me"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveIntent {
    pub user_id: UserId,
    pub name: String,
    pub phone_number: String,
}

impl ReceiveIntent {
    /// The code the logged-in user shows to get paid.
    pub fn for_user(user: &UserProfile) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.display_name(),
            phone_number: user.phone_number.clone(),
        }
    }

    pub fn to_recipient(&self) -> Recipient {
        Recipient::new(
            self.user_id.clone(),
            self.name.clone(),
            self.phone_number.clone(),
        )
    }
}

/// "Pay this merchant". The amount is only a suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub merchant_name: String,
    /// Major units (KES)
    pub amount: Option<Decimal>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodePayload {
    Receive(ReceiveIntent),
    Payment(PaymentIntent),
}

impl CodePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            CodePayload::Receive(_) => "receive",
            CodePayload::Payment(_) => "payment",
        }
    }
}

impl From<ReceiveIntent> for CodePayload {
    fn from(intent: ReceiveIntent) -> Self {
        CodePayload::Receive(intent)
    }
}

impl From<PaymentIntent> for CodePayload {
    fn from(intent: PaymentIntent) -> Self {
        CodePayload::Payment(intent)
    }
}

// ============================================================================
// Encode
// ============================================================================

pub fn encode(payload: &CodePayload) -> Result<String, DecodeError> {
    let value = match payload {
        CodePayload::Receive(intent) => {
            canonical("userId", intent.user_id.as_str())?;
            canonical("name", &intent.name)?;
            canonical("phoneNumber", &intent.phone_number)?;
            if !is_valid_phone_number(&intent.phone_number) {
                return Err(invalid("phoneNumber is malformed"));
            }
            json!({
                "type": "receive",
                "userId": intent.user_id.as_str(),
                "name": intent.name,
                "phoneNumber": intent.phone_number,
            })
        }
        CodePayload::Payment(intent) => {
            canonical("merchantName", &intent.merchant_name)?;
            let mut value = json!({
                "type": "payment",
                "merchantName": intent.merchant_name,
            });
            if let Some(amount) = intent.amount {
                value["amount"] = amount_to_json(check_amount(amount)?);
            }
            if let Some(reference) = &intent.reference {
                canonical("reference", reference)?;
                value["reference"] = Value::from(reference.as_str());
            }
            value
        }
    };

    let encoded = value.to_string();
    if encoded.len() > MAX_PAYLOAD_LEN {
        return Err(invalid("payload too long"));
    }
    Ok(encoded)
}

/// Non-empty and already trimmed, as `decode` would return it.
fn canonical(field: &str, value: &str) -> Result<(), DecodeError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{} is empty", field)));
    }
    if value.trim() != value {
        return Err(invalid(format!("{} has surrounding whitespace", field)));
    }
    Ok(())
}

/// Whole amounts go out as integers, fractional ones as exact strings.
fn amount_to_json(amount: Decimal) -> Value {
    if amount.scale() == 0
        && let Ok(whole) = u64::try_from(amount.mantissa())
    {
        return Value::from(whole);
    }
    Value::from(amount.to_string())
}

// ============================================================================
// Decode
// ============================================================================

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawPayload {
    Receive(RawReceive),
    Payment(RawPayment),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceive {
    user_id: String,
    name: String,
    phone_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayment {
    merchant_name: String,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    reference: Option<String>,
}

pub fn decode(raw: &str) -> Result<CodePayload, DecodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(invalid("empty payload"));
    }
    if raw.len() > MAX_PAYLOAD_LEN {
        return Err(invalid("payload too long"));
    }

    let parsed: RawPayload = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed {
        RawPayload::Receive(receive) => validate_receive(receive).map(CodePayload::Receive),
        RawPayload::Payment(payment) => validate_payment(payment).map(CodePayload::Payment),
    }
}

fn required(field: &str, value: String) -> Result<String, DecodeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(format!("{} is empty", field)));
    }
    Ok(trimmed.to_string())
}

fn validate_receive(raw: RawReceive) -> Result<ReceiveIntent, DecodeError> {
    let user_id = required("userId", raw.user_id)?;
    let name = required("name", raw.name)?;
    let phone_number = required("phoneNumber", raw.phone_number)?;
    if !is_valid_phone_number(&phone_number) {
        return Err(invalid("phoneNumber is malformed"));
    }
    Ok(ReceiveIntent {
        user_id: UserId::new(user_id),
        name,
        phone_number,
    })
}

fn validate_payment(raw: RawPayment) -> Result<PaymentIntent, DecodeError> {
    let merchant_name = required("merchantName", raw.merchant_name)?;
    let amount = match raw.amount {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_code_amount(&value)?),
    };
    let reference = raw
        .reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    Ok(PaymentIntent {
        merchant_name,
        amount,
        reference,
    })
}

/// Accepts `1500`, `1500.5` or `"1500.50"`. Must be positive with at most
/// two decimal places.
fn parse_code_amount(value: &Value) -> Result<Decimal, DecodeError> {
    let amount = match value {
        Value::Number(n) => match n.as_u64() {
            Some(whole) => Decimal::from(whole),
            None => Decimal::from_str(&n.to_string())
                .map_err(|_| invalid("amount is not a decimal number"))?,
        },
        Value::String(s) => {
            Decimal::from_str(s.trim()).map_err(|_| invalid("amount is not numeric"))?
        }
        _ => return Err(invalid("amount is not numeric")),
    };

    check_amount(amount)
}

/// Positive with at most two decimal places; returned normalised.
fn check_amount(amount: Decimal) -> Result<Decimal, DecodeError> {
    if amount <= Decimal::ZERO {
        return Err(invalid("amount must be positive"));
    }
    let amount = amount.normalize();
    if amount.scale() > CURRENCY_DECIMALS {
        return Err(invalid("amount has too many decimal places"));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::sample_user;

    fn receive() -> ReceiveIntent {
        ReceiveIntent {
            user_id: UserId::from("u-2"),
            name: "Otieno Odhiambo".into(),
            phone_number: "0798765432".into(),
        }
    }

    #[test]
    fn test_receive_round_trip() {
        let payload = CodePayload::from(receive());
        assert_eq!(decode(&encode(&payload).unwrap()).unwrap(), payload);
    }

    #[test]
    fn test_payment_round_trip() {
        let cases = [
            PaymentIntent {
                merchant_name: "Mama Mboga".into(),
                amount: None,
                reference: None,
            },
            PaymentIntent {
                merchant_name: "Java House".into(),
                amount: Some(Decimal::from(450)),
                reference: Some("TBL-12".into()),
            },
            PaymentIntent {
                merchant_name: "Naivas".into(),
                amount: Some(Decimal::new(129_950, 2)),
                reference: None,
            },
        ];
        for intent in cases {
            let payload = CodePayload::Payment(intent);
            assert_eq!(decode(&encode(&payload).unwrap()).unwrap(), payload);
        }
    }

    #[test]
    fn test_generated_amounts_round_trip_exactly() {
        let mut minor: i64 = 1;
        let mut amounts = vec![
            Decimal::new(1, 2),
            Decimal::new(10, 2),
            Decimal::new(999_999, 2),
            Decimal::new(12_345_678_901_234_567, 2),
            Decimal::new(900_719_925_474_099_301, 2),
            Decimal::from(u32::MAX),
        ];
        for _ in 0..500 {
            minor = minor
                .wrapping_mul(6_364_136_223_846_793)
                .wrapping_add(1_442_695_040_888_963)
                & i64::MAX;
            amounts.push(Decimal::new(minor % 100_000_000_000_000_000 + 1, 2));
        }
        for amount in amounts {
            let payload = CodePayload::Payment(PaymentIntent {
                merchant_name: "Naivas".into(),
                amount: Some(amount),
                reference: Some("INV-7".into()),
            });
            let decoded = decode(&encode(&payload).unwrap()).unwrap();
            assert_eq!(decoded, payload, "amount {}", amount);
        }
    }

    #[test]
    fn test_fractional_amount_encoded_as_exact_string() {
        let payload = CodePayload::Payment(PaymentIntent {
            merchant_name: "Naivas".into(),
            amount: Some(Decimal::new(12_345_678_901_234_567, 2)),
            reference: None,
        });
        let value: Value = serde_json::from_str(&encode(&payload).unwrap()).unwrap();
        assert_eq!(value["amount"], json!("123456789012345.67"));

        let whole = CodePayload::Payment(PaymentIntent {
            merchant_name: "Naivas".into(),
            amount: Some(Decimal::new(45_000, 2)),
            reference: None,
        });
        let value: Value = serde_json::from_str(&encode(&whole).unwrap()).unwrap();
        assert_eq!(value["amount"], json!(450));
    }

    #[test]
    fn test_encode_rejects_what_decode_would_change() {
        let payment = |merchant: &str, amount: Option<Decimal>, reference: Option<&str>| {
            CodePayload::Payment(PaymentIntent {
                merchant_name: merchant.into(),
                amount,
                reference: reference.map(String::from),
            })
        };
        let cases = [
            payment(" Naivas", None, None),
            payment("", None, None),
            payment("Naivas", Some(Decimal::new(5, 3)), None),
            payment("Naivas", Some(Decimal::ZERO), None),
            payment("Naivas", Some(Decimal::from(-5)), None),
            payment("Naivas", None, Some("")),
            payment("Naivas", None, Some("TBL-12 ")),
            payment(&"x".repeat(MAX_PAYLOAD_LEN), None, None),
            CodePayload::Receive(ReceiveIntent {
                phone_number: "call me".into(),
                ..receive()
            }),
            CodePayload::Receive(ReceiveIntent {
                name: "Otieno ".into(),
                ..receive()
            }),
        ];
        for payload in cases {
            assert!(
                matches!(encode(&payload), Err(DecodeError::InvalidFormat(_))),
                "encoded {:?}",
                payload
            );
        }
    }

    #[test]
    fn test_wire_shape_matches_scanner() {
        let encoded = encode(&CodePayload::Receive(receive())).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value,
            json!({"type": "receive", "userId": "u-2", "name": "Otieno Odhiambo", "phoneNumber": "0798765432"})
        );
    }

    #[test]
    fn test_not_json_is_invalid_format() {
        assert!(matches!(decode("not json"), Err(DecodeError::InvalidFormat(_))));
        assert!(matches!(decode(""), Err(DecodeError::InvalidFormat(_))));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::InvalidFormat(_))));
    }

    #[test]
    fn test_unknown_type_is_invalid_format() {
        assert!(matches!(
            decode(r#"{"type":"unknown"}"#),
            Err(DecodeError::InvalidFormat(_))
        ));
        assert!(matches!(
            decode(r#"{"userId":"u-2","name":"x","phoneNumber":"0798765432"}"#),
            Err(DecodeError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_or_malformed_fields() {
        let cases = [
            r#"{"type":"receive","name":"Otieno","phoneNumber":"0798765432"}"#,
            r#"{"type":"receive","userId":"","name":"Otieno","phoneNumber":"0798765432"}"#,
            r#"{"type":"receive","userId":"u-2","name":"Otieno","phoneNumber":"call me"}"#,
            r#"{"type":"payment"}"#,
            r#"{"type":"payment","merchantName":"Naivas","amount":"lots"}"#,
            r#"{"type":"payment","merchantName":"Naivas","amount":-5}"#,
            r#"{"type":"payment","merchantName":"Naivas","amount":0}"#,
            r#"{"type":"payment","merchantName":"Naivas","amount":1.005}"#,
            r#"{"type":"payment","merchantName":"Naivas","amount":true}"#,
        ];
        for raw in cases {
            assert!(
                matches!(decode(raw), Err(DecodeError::InvalidFormat(_))),
                "accepted {}",
                raw
            );
        }
    }

    #[test]
    fn test_extra_fields_ignored_and_string_amount_accepted() {
        let decoded = decode(
            r#"{"type":"payment","merchantName":"Naivas","amount":"250.50","till":"55123","v":2}"#,
        )
        .unwrap();
        assert_eq!(
            decoded,
            CodePayload::Payment(PaymentIntent {
                merchant_name: "Naivas".into(),
                amount: Some(Decimal::new(25_050, 2)),
                reference: None,
            })
        );
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let raw = format!(
            r#"{{"type":"payment","merchantName":"{}"}}"#,
            "x".repeat(MAX_PAYLOAD_LEN)
        );
        assert!(decode(&raw).is_err());
    }

    #[test]
    fn test_receive_intent_for_user() {
        let intent = ReceiveIntent::for_user(&sample_user());
        assert_eq!(intent.name, "Wanjiru Kamau");
        assert_eq!(intent.to_recipient().phone_number, "0712345678");
        assert_eq!(intent.user_id, UserId::from("u-1"));
    }
}
