//! Validation and sanitization shared by the backend and its tests

use rust_decimal::Decimal;
use std::borrow::Cow;
use validator::ValidationError;

/// Tags a product description may keep; everything else is stripped
pub const ALLOWED_DESCRIPTION_TAGS: [&str; 5] = ["b", "i", "u", "p", "br"];

/// Prices are stored as NUMERIC(10, 2)
const MAX_PRICE_SCALE: u32 = 2;
const MAX_PRICE_INTEGER_DIGITS: u32 = 8;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

// ============================================================================
// Field validators
// ============================================================================

/// Validate a unit price: non-negative, at most two decimal places, fits NUMERIC(10, 2)
pub fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(error("price", "Price cannot be negative"));
    }
    if price.normalize().scale() > MAX_PRICE_SCALE {
        return Err(error("price", "Price can have at most 2 decimal places"));
    }
    if price.trunc() >= Decimal::from(10i64.pow(MAX_PRICE_INTEGER_DIGITS)) {
        return Err(error("price", "Price is too large"));
    }
    Ok(())
}

/// Validate a username: 3-150 characters of letters, digits and `@.+-_`
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(3..=150).contains(&len) {
        return Err(error("username", "Username must be 3-150 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        return Err(error(
            "username",
            "Username may only contain letters, digits and @/./+/-/_",
        ));
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(error("password", "Password must be at least 8 characters"));
    }
    Ok(())
}

// ============================================================================
// Sanitization
// ============================================================================

/// Strip every tag from `input` except the allowed description tags.
///
/// Allowed tags lose their attributes (`<p class="x">` becomes `<p>`), other
/// tags are removed while their text content is kept. A `<` that does not
/// open a tag is escaped.
pub fn sanitize_description(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        match tag_end(candidate) {
            Some(end) if looks_like_tag(&candidate[1..end]) => {
                if let Some(tag) = allowed_tag(&candidate[1..end]) {
                    out.push_str(&tag);
                }
                rest = &candidate[end + 1..];
            }
            _ => {
                out.push_str("&lt;");
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Index of the `>` closing the tag that opens `candidate`. A `>` inside a
/// quoted attribute value does not end the tag.
fn tag_end(candidate: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut after_equals = false;

    for (i, c) in candidate.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '>' => return Some(i),
            None if after_equals && (c == '"' || c == '\'') => quote = Some(c),
            None => {}
        }
        if !c.is_whitespace() {
            after_equals = quote.is_none() && c == '=';
        }
    }

    None
}

fn looks_like_tag(inner: &str) -> bool {
    let name = inner.strip_prefix('/').unwrap_or(inner);
    name.chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '!')
        .unwrap_or(false)
}

/// Rebuild an allowed tag without attributes, or `None` if it must be dropped
fn allowed_tag(inner: &str) -> Option<String> {
    let (closing, body) = match inner.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, inner),
    };
    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    if !ALLOWED_DESCRIPTION_TAGS.contains(&name.as_str()) {
        return None;
    }

    match (closing, name.as_str()) {
        (true, "br") => None,
        (true, _) => Some(format!("</{}>", name)),
        (false, _) => Some(format!("<{}>", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_price_validation() {
        assert!(validate_price(&dec("0")).is_ok());
        assert!(validate_price(&dec("2000")).is_ok());
        assert!(validate_price(&dec("19.99")).is_ok());
        assert!(validate_price(&dec("19.990")).is_ok());
        assert!(validate_price(&dec("-1")).is_err());
        assert!(validate_price(&dec("1.005")).is_err());
        assert!(validate_price(&dec("100000000")).is_err());
        assert!(validate_price(&dec("99999999.99")).is_ok());
    }

    #[test]
    fn test_username_validation() {
        assert!(validate_username("employee01").is_ok());
        assert!(validate_username("first.last@site").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("AdminAdmin#013").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_sanitize_keeps_allowed_tags() {
        assert_eq!(
            sanitize_description("<b>bold</b> and <i>italic</i><br/>"),
            "<b>bold</b> and <i>italic</i><br>"
        );
    }

    #[test]
    fn test_sanitize_strips_attributes_and_unknown_tags() {
        assert_eq!(
            sanitize_description("<p class=\"x\" onclick=\"evil()\">Hi</p><script>alert(1)</script>"),
            "<p>Hi</p>alert(1)"
        );
        assert_eq!(sanitize_description("<a href=\"x\">link</a>"), "link");
    }

    #[test]
    fn test_sanitize_skips_angle_brackets_in_quoted_attributes() {
        assert_eq!(
            sanitize_description("<p title=\"a>b\" onclick=\"x\">Hi</p>"),
            "<p>Hi</p>"
        );
        assert_eq!(sanitize_description("<i data-x='1>0'>ok</i>"), "<i>ok</i>");
        assert_eq!(sanitize_description("<b>it's</b> \"quoted\""), "<b>it's</b> \"quoted\"");
    }

    #[test]
    fn test_sanitize_escapes_stray_angle_brackets() {
        assert_eq!(sanitize_description("1 < 2 and 3 > 2"), "1 &lt; 2 and 3 > 2");
        assert_eq!(sanitize_description("plain text"), "plain text");
    }
}
