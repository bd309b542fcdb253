use chrono::{DateTime, Utc};

/// Substitute `{{key}}` placeholders with the supplied variables.
///
/// Single left-to-right pass: substituted values are appended, never
/// re-scanned, so rendering is idempotent even when a value itself contains
/// a placeholder marker. Unrecognized placeholders stay verbatim so an
/// incomplete variable set degrades gracefully instead of failing a call.
pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let key = &after_open[..end];
                match variables.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after_open[end + 2..];
            }
            None => {
                // dangling open marker, keep the tail as-is
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Human wording for appointment dates in scripts and messages, with the
/// fallback used when a patient has no appointment on file.
pub fn format_appointment_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => date.format("%A, %B %-d at %-I:%M %p").to_string(),
        None => "your upcoming appointment".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn substitutes_known_placeholders() {
        let out = render(
            "Hi {{patient_name}}, see Dr. {{doctor_name}}",
            &[("patient_name", "Ana"), ("doctor_name", "Lee")],
        );
        assert_eq!(out, "Hi Ana, see Dr. Lee");
    }

    #[test]
    fn leaves_unknown_placeholders_verbatim() {
        let out = render(
            "Welcome to {{clinic_name}}, {{patient_name}}",
            &[("patient_name", "Ana")],
        );
        assert_eq!(out, "Welcome to {{clinic_name}}, Ana");
    }

    #[test]
    fn does_not_rescan_substituted_values() {
        let out = render("{{a}}", &[("a", "{{b}}"), ("b", "never")]);
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn keeps_dangling_open_marker() {
        let out = render("Hello {{patient_name", &[("patient_name", "Ana")]);
        assert_eq!(out, "Hello {{patient_name");
    }

    #[test]
    fn repeated_placeholder_is_replaced_everywhere() {
        let out = render("{{x}} and {{x}}", &[("x", "1")]);
        assert_eq!(out, "1 and 1");
    }

    #[test]
    fn formats_appointment_date_with_fallback() {
        assert_eq!(
            format_appointment_date(None),
            "your upcoming appointment"
        );
        let date = Utc.with_ymd_and_hms(2025, 3, 3, 14, 30, 0).unwrap();
        assert_eq!(
            format_appointment_date(Some(date)),
            "Monday, March 3 at 2:30 PM"
        );
    }
}
