//! Payment form validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    dto::orders::PayOrderRequest, error::AppError, status::PaymentMethod, store::NewPayment,
};

pub const MOBILE_MONEY_PREFIX: &str = "+237";

// ASCII word characters only.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.+-]+@[A-Za-z0-9_]+\.[A-Za-z0-9_]+$").expect("Invalid regex")
});
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8,12}$").expect("Invalid regex"));
static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{16}$").expect("Invalid regex"));
static EXPIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/[0-9]{2}$").expect("Invalid regex"));
static CVV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3,4}$").expect("Invalid regex"));

pub(crate) fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

pub(crate) fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Checks the checkout form and reduces it to what may be stored: the
/// mobile number gets its country prefix, a card keeps only its last four
/// digits. Expiry and CVV are checked and dropped.
pub fn validate_payment(form: &PayOrderRequest) -> Result<NewPayment, AppError> {
    let full_name = required(&form.full_name, "full_name")?;
    let address = required(&form.address, "address")?;
    let city = required(&form.city, "city")?;
    let postal_code = required(&form.postal_code, "postal_code")?;

    let email = form.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("invalid email".into()));
    }

    let mut phone = None;
    let mut card_last4 = None;

    if form.method.is_mobile_money() {
        let digits = form.phone.as_deref().unwrap_or_default().trim();
        if !PHONE_RE.is_match(digits) {
            return Err(AppError::BadRequest(
                "phone must be 8 to 12 digits".into(),
            ));
        }
        phone = Some(format!("{MOBILE_MONEY_PREFIX}{digits}"));
    } else if form.method == PaymentMethod::Card {
        let number: String = form
            .card_number
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if !CARD_RE.is_match(&number) {
            return Err(AppError::BadRequest("card number must be 16 digits".into()));
        }
        let expiry = form.card_expiry.as_deref().unwrap_or_default().trim();
        if !EXPIRY_RE.is_match(expiry) {
            return Err(AppError::BadRequest("card expiry must be MM/YY".into()));
        }
        let cvv = form.card_cvv.as_deref().unwrap_or_default().trim();
        if !CVV_RE.is_match(cvv) {
            return Err(AppError::BadRequest("cvv must be 3 or 4 digits".into()));
        }
        card_last4 = Some(number[number.len() - 4..].to_string());
    }

    Ok(NewPayment {
        full_name,
        address,
        city,
        postal_code,
        email,
        method: form.method,
        phone,
        card_last4,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(method: PaymentMethod) -> PayOrderRequest {
        PayOrderRequest {
            full_name: "Awa Ngono".into(),
            address: "Rue 1.234".into(),
            city: "Douala".into(),
            postal_code: "00237".into(),
            email: "awa.ngono@mail.cm".into(),
            method,
            phone: None,
            card_number: None,
            card_expiry: None,
            card_cvv: None,
        }
    }

    #[test]
    fn mobile_money_phone_is_prefixed() {
        let mut f = form(PaymentMethod::OrangeMoney);
        f.phone = Some("699112233".into());
        let payment = validate_payment(&f).unwrap();
        assert_eq!(payment.phone.as_deref(), Some("+237699112233"));
        assert!(payment.card_last4.is_none());
    }

    #[test]
    fn mobile_money_rejects_short_or_non_numeric_phone() {
        let mut f = form(PaymentMethod::MobileMoney);
        f.phone = Some("6991".into());
        assert!(matches!(validate_payment(&f), Err(AppError::BadRequest(_))));
        f.phone = Some("69911a233".into());
        assert!(matches!(validate_payment(&f), Err(AppError::BadRequest(_))));
        f.phone = None;
        assert!(matches!(validate_payment(&f), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn card_keeps_last_four_digits_only() {
        let mut f = form(PaymentMethod::Card);
        f.card_number = Some("4111 1111 1111 1234".into());
        f.card_expiry = Some("09/27".into());
        f.card_cvv = Some("123".into());
        let payment = validate_payment(&f).unwrap();
        assert_eq!(payment.card_last4.as_deref(), Some("1234"));
        assert!(payment.phone.is_none());
    }

    #[test]
    fn card_rejects_bad_expiry_and_cvv() {
        let mut f = form(PaymentMethod::Card);
        f.card_number = Some("4111111111111234".into());
        f.card_expiry = Some("13/27".into());
        f.card_cvv = Some("123".into());
        assert!(matches!(validate_payment(&f), Err(AppError::BadRequest(_))));

        f.card_expiry = Some("12/27".into());
        f.card_cvv = Some("12".into());
        assert!(matches!(validate_payment(&f), Err(AppError::BadRequest(_))));

        f.card_cvv = Some("1234".into());
        f.card_number = Some("4111 1111 1111".into());
        assert!(matches!(validate_payment(&f), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_blank_fields_and_bad_email() {
        let mut f = form(PaymentMethod::OrangeMoney);
        f.phone = Some("699112233".into());
        f.city = "   ".into();
        assert!(matches!(validate_payment(&f), Err(AppError::BadRequest(_))));

        let mut f = form(PaymentMethod::OrangeMoney);
        f.phone = Some("699112233".into());
        f.email = "awa@mail".into();
        assert!(matches!(validate_payment(&f), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn email_accepts_ascii_word_characters_only() {
        let mut f = form(PaymentMethod::OrangeMoney);
        f.phone = Some("699112233".into());
        f.email = "first_last+shop@mail.cm".into();
        assert!(validate_payment(&f).is_ok());

        for email in ["élodie@mail.cm", "awa@maïl.cm", "awa@mail.ćm"] {
            f.email = email.into();
            assert!(
                matches!(validate_payment(&f), Err(AppError::BadRequest(_))),
                "{email}"
            );
        }
    }
}
