use wm_domain::CheckType;

/// Translates a raw collaborator/infra error into the curated, user-visible
/// phrase an operator sees on a failed queue item (spec §7). Matching is
/// keyword-based against the lowercased error text, in the same order the
/// system this was modeled on checked them, falling back to a check-type
/// specific message and finally a generic one.
pub fn to_user_friendly(raw: &str, check_type: CheckType) -> String {
    let lower = raw.to_ascii_lowercase();

    if lower.contains("connection") || lower.contains("timeout") {
        return "Unable to connect to the website. Please check if the website is accessible and try again.".to_string();
    }
    if lower.contains("dns") || lower.contains("name resolution") {
        return "Website domain could not be found. Please verify the website URL is correct.".to_string();
    }
    if lower.contains("ssl") || lower.contains("certificate") {
        return "SSL certificate issue detected. The website may have security certificate problems.".to_string();
    }
    if lower.contains("permission") || lower.contains("forbidden") || lower.contains("403") {
        return "Access denied to the website. The website may be blocking automated requests.".to_string();
    }
    if lower.contains("not found") || lower.contains("404") {
        return "Website page not found. The requested page may have been moved or deleted.".to_string();
    }
    if lower.contains("server error") || lower.contains("500") {
        return "Website server error. The website may be experiencing technical difficulties.".to_string();
    }
    if lower.contains("rate limit") || lower.contains("too many requests") {
        return "Too many requests to the website. Please wait a moment before trying again.".to_string();
    }

    match check_type {
        CheckType::Visual => {
            "Visual check failed. Unable to capture website screenshots. This may be due to website restrictions or technical issues.".to_string()
        }
        CheckType::Crawl => {
            "Crawl check failed. Unable to analyze website content. The website may be blocking automated crawlers.".to_string()
        }
        CheckType::Performance => {
            "Performance check failed. Unable to analyze website performance. The performance analysis service may be unavailable.".to_string()
        }
        CheckType::Blur => {
            "Blur detection failed. Unable to analyze images for blur. This may be due to image access restrictions.".to_string()
        }
        CheckType::Baseline => {
            "Baseline creation failed. Unable to create baseline images. This may be due to website access restrictions.".to_string()
        }
        CheckType::Full => {
            "Check failed due to an unexpected error. Please try again or contact support if the issue persists.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_map_to_the_connectivity_phrase() {
        let msg = to_user_friendly("Connection refused by host", CheckType::Crawl);
        assert!(msg.starts_with("Unable to connect"));
    }

    #[test]
    fn dns_errors_take_precedence_over_check_type_fallback() {
        let msg = to_user_friendly("dns resolution failed", CheckType::Visual);
        assert!(msg.contains("domain could not be found"));
    }

    #[test]
    fn unmatched_errors_fall_back_to_the_check_type_message() {
        let msg = to_user_friendly("something exploded", CheckType::Blur);
        assert!(msg.contains("Blur detection failed"));
    }

    #[test]
    fn unmatched_full_check_errors_use_the_generic_fallback() {
        let msg = to_user_friendly("something exploded", CheckType::Full);
        assert!(msg.contains("unexpected error"));
    }

    #[test]
    fn rate_limit_errors_are_recognized() {
        let msg = to_user_friendly("429 Too Many Requests", CheckType::Performance);
        assert!(msg.contains("Too many requests"));
    }
}
