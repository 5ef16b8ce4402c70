//! User-agent string parsing
//!
//! Extracts browser, OS, and device class from raw user-agent strings for the
//! session-management UI. Total over its input domain: empty or unrecognized
//! strings degrade to "Unknown" sentinels, never errors. Display concern only,
//! not security-critical.

use serde::Serialize;

pub const UNKNOWN_BROWSER: &str = "Unknown Browser";
pub const UNKNOWN_OS: &str = "Unknown OS";

/// Coarse device class derived from a user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

/// Parsed user-agent fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser: String,
    pub os: String,
    pub device: DeviceType,
    pub device_model: Option<String>,
    pub device_vendor: Option<String>,
}

/// Parse a raw user-agent string.
///
/// Match order matters: Chrome-family agents also contain "Safari", and Edge
/// and Opera also contain "Chrome", so the more specific tokens are checked
/// first.
pub fn parse_user_agent(ua: &str) -> UserAgentInfo {
    let browser = detect_browser(ua);
    let os = detect_os(ua);
    let device = detect_device(ua);
    let (device_vendor, device_model) = detect_vendor_model(ua);

    UserAgentInfo {
        browser: browser.to_string(),
        os: os.to_string(),
        device,
        device_model,
        device_vendor,
    }
}

fn detect_browser(ua: &str) -> &'static str {
    if ua.contains("Edg/") || ua.contains("EdgiOS/") || ua.contains("EdgA/") {
        "Edge"
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("SamsungBrowser/") {
        "Samsung Internet"
    } else if ua.contains("Firefox/") || ua.contains("FxiOS/") {
        "Firefox"
    } else if ua.contains("CriOS/") || ua.contains("Chrome/") {
        "Chrome"
    } else if ua.contains("Safari/") && ua.contains("Version/") {
        "Safari"
    } else if ua.contains("MSIE") || ua.contains("Trident/") {
        "Internet Explorer"
    } else {
        UNKNOWN_BROWSER
    }
}

fn detect_os(ua: &str) -> &'static str {
    if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPod") {
        "iOS"
    } else if ua.contains("iPad") {
        "iPadOS"
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("CrOS") {
        "Chrome OS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        UNKNOWN_OS
    }
}

fn detect_device(ua: &str) -> DeviceType {
    if ua.contains("iPad") || ua.contains("Tablet") {
        DeviceType::Tablet
    } else if ua.contains("iPhone") || ua.contains("iPod") || ua.contains("Mobile") {
        DeviceType::Mobile
    } else if ua.contains("Android") {
        // Android without the Mobile token is a tablet by convention
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

fn detect_vendor_model(ua: &str) -> (Option<String>, Option<String>) {
    if ua.contains("iPhone") {
        return (Some("Apple".to_string()), Some("iPhone".to_string()));
    }
    if ua.contains("iPad") {
        return (Some("Apple".to_string()), Some("iPad".to_string()));
    }

    // Android agents carry the model between the last "; " and " Build/"
    if ua.contains("Android") {
        if let Some(model) = android_model(ua) {
            let vendor = android_vendor(&model);
            return (vendor, Some(model));
        }
    }

    (None, None)
}

fn android_model(ua: &str) -> Option<String> {
    let build_idx = ua.find(" Build/")?;
    let prefix = &ua[..build_idx];
    let start = prefix.rfind("; ")? + 2;
    let model = prefix[start..].trim();
    if model.is_empty() {
        None
    } else {
        Some(model.to_string())
    }
}

fn android_vendor(model: &str) -> Option<String> {
    if model.starts_with("SM-") || model.starts_with("Galaxy") {
        Some("Samsung".to_string())
    } else if model.starts_with("Pixel") {
        Some("Google".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const CHROME_PIXEL: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8 Build/UD1A.230803.041) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";

    #[test]
    fn test_chrome_on_windows() {
        let info = parse_user_agent(CHROME_WINDOWS);
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.os, "Windows");
        assert_eq!(info.device, DeviceType::Desktop);
        assert_eq!(info.device_model, None);
    }

    #[test]
    fn test_safari_on_mac() {
        let info = parse_user_agent(SAFARI_MAC);
        assert_eq!(info.browser, "Safari");
        assert_eq!(info.os, "macOS");
        assert_eq!(info.device, DeviceType::Desktop);
    }

    #[test]
    fn test_firefox_on_linux() {
        let info = parse_user_agent(FIREFOX_LINUX);
        assert_eq!(info.browser, "Firefox");
        assert_eq!(info.os, "Linux");
        assert_eq!(info.device, DeviceType::Desktop);
    }

    #[test]
    fn test_edge_wins_over_chrome() {
        let info = parse_user_agent(EDGE_WINDOWS);
        assert_eq!(info.browser, "Edge");
    }

    #[test]
    fn test_iphone() {
        let info = parse_user_agent(SAFARI_IPHONE);
        assert_eq!(info.browser, "Safari");
        assert_eq!(info.os, "iOS");
        assert_eq!(info.device, DeviceType::Mobile);
        assert_eq!(info.device_vendor.as_deref(), Some("Apple"));
        assert_eq!(info.device_model.as_deref(), Some("iPhone"));
    }

    #[test]
    fn test_ipad_is_tablet() {
        let info = parse_user_agent(SAFARI_IPAD);
        assert_eq!(info.device, DeviceType::Tablet);
        assert_eq!(info.device_model.as_deref(), Some("iPad"));
    }

    #[test]
    fn test_android_model_and_vendor() {
        let info = parse_user_agent(CHROME_PIXEL);
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.os, "Android");
        assert_eq!(info.device, DeviceType::Mobile);
        assert_eq!(info.device_model.as_deref(), Some("Pixel 8"));
        assert_eq!(info.device_vendor.as_deref(), Some("Google"));
    }

    #[test]
    fn test_empty_input_degrades_to_sentinels() {
        let info = parse_user_agent("");
        assert_eq!(info.browser, UNKNOWN_BROWSER);
        assert_eq!(info.os, UNKNOWN_OS);
        assert_eq!(info.device, DeviceType::Desktop);
        assert_eq!(info.device_model, None);
        assert_eq!(info.device_vendor, None);
    }

    #[test]
    fn test_garbage_input_degrades_to_sentinels() {
        let info = parse_user_agent("curl/8.4.0");
        assert_eq!(info.browser, UNKNOWN_BROWSER);
        assert_eq!(info.os, UNKNOWN_OS);
        assert_eq!(info.device, DeviceType::Desktop);
    }
}
