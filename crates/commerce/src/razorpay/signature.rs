//! Checkout signature verification.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::RazorpayError;

type HmacSha256 = Hmac<Sha256>;

/// Verify the signature Razorpay Checkout returns after a payment.
///
/// The signature is the hex HMAC-SHA256 of `"{order_id}|{payment_id}"` keyed
/// with the API key secret. Comparison is constant time.
///
/// # Errors
///
/// Returns `RazorpayError::InvalidSignature` if the signature is malformed or
/// does not match.
pub fn verify_payment_signature(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), RazorpayError> {
    let expected = hex::decode(signature.trim()).map_err(|_| RazorpayError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(key_secret.expose_secret().as_bytes())
        .map_err(|_| RazorpayError::InvalidSignature)?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    mac.verify_slice(&expected)
        .map_err(|_| RazorpayError::InvalidSignature)
}

/// Sign `"{order_id}|{payment_id}"` the way Razorpay Checkout does.
#[must_use]
pub fn sign(key_secret: &SecretString, order_id: &str, payment_id: &str) -> String {
    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha256::new_from_slice(key_secret.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("rzp_test_secret_value")
    }

    #[test]
    fn test_valid_signature_is_accepted() {
        let signature = sign(&secret(), "order_Abc123", "pay_Xyz789");
        assert_eq!(signature.len(), 64);
        assert!(verify_payment_signature(&secret(), "order_Abc123", "pay_Xyz789", &signature).is_ok());
    }

    #[test]
    fn test_signature_for_other_payment_is_rejected() {
        let signature = sign(&secret(), "order_Abc123", "pay_Other");
        let result = verify_payment_signature(&secret(), "order_Abc123", "pay_Xyz789", &signature);
        assert!(matches!(result, Err(RazorpayError::InvalidSignature)));
    }

    #[test]
    fn test_signature_with_wrong_secret_is_rejected() {
        let signature = sign(&SecretString::from("another"), "order_Abc123", "pay_Xyz789");
        let result = verify_payment_signature(&secret(), "order_Abc123", "pay_Xyz789", &signature);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_signature_is_rejected() {
        for bad in ["", "not-hex", "abcd"] {
            let result = verify_payment_signature(&secret(), "order_Abc123", "pay_Xyz789", bad);
            assert!(matches!(result, Err(RazorpayError::InvalidSignature)), "{bad}");
        }
    }
}
