use validator::Validate;

pub fn validate<T: Validate>(val: &T) -> Result<(), validator::ValidationErrors> {
    val.validate()
}

/// Flattens validator output into a single human-readable line.
pub fn describe(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Canonical form used for denylist and duplicate matching: ASCII alphanumerics, uppercased.
pub fn normalize_national_id(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Digits only, with the `+84` country prefix folded into the domestic leading zero.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed.starts_with('+') {
        if let Some(rest) = digits.strip_prefix("84") {
            return format!("0{}", rest);
        }
    }
    digits
}

/// Social profile links must be absolute http(s) URLs.
pub fn check_social_link(link: &str) -> Result<(), String> {
    match url::Url::parse(link) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(parsed) => Err(format!(
            "Social link {} uses unsupported scheme {}",
            link,
            parsed.scheme()
        )),
        Err(e) => Err(format!("Social link {} is not a valid URL: {}", link, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_id_ignores_formatting_and_case() {
        assert_eq!(normalize_national_id("001-203 004x"), "001203004X");
        assert_eq!(normalize_national_id(" ab.12 "), "AB12");
    }

    #[test]
    fn phone_folds_country_prefix() {
        assert_eq!(normalize_phone("+84 912 345 678"), "0912345678");
        assert_eq!(normalize_phone("0912.345.678"), "0912345678");
        assert_eq!(normalize_phone("84912345678"), "84912345678");
    }

    #[test]
    fn social_links_must_be_http() {
        assert!(check_social_link("https://facebook.com/nguyen.a").is_ok());
        assert!(check_social_link("ftp://example.com/x").is_err());
        assert!(check_social_link("not a url").is_err());
    }
}
