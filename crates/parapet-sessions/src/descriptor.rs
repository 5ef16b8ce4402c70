//! Session descriptor building
//!
//! Turns persisted session records into the human-readable device descriptors
//! shown in the active-sessions UI. Derived, read-only views: recomputed on
//! every request, never persisted. Every function here is total.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user_agent::{parse_user_agent, DeviceType};

/// Thirty days; past this cutoff relative phrases stop reading well
/// ("47 days ago") and we switch to an absolute date.
const RELATIVE_CUTOFF_SECS: i64 = 30 * 24 * 60 * 60;

pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// A persisted session as returned by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Icon class for a session's device, as rendered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceIcon {
    Desktop,
    Mobile,
    Tablet,
}

/// Derived display view over a [`SessionRecord`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSession {
    pub id: Uuid,
    pub token: String,
    pub device_name: String,
    pub device_icon: DeviceIcon,
    pub browser: String,
    pub os: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub signed_in: String,
    pub is_current_device: bool,
}

/// Map a parsed device type onto its UI icon. Total, no failure case.
pub fn device_icon(device: DeviceType) -> DeviceIcon {
    match device {
        DeviceType::Mobile => DeviceIcon::Mobile,
        DeviceType::Tablet => DeviceIcon::Tablet,
        DeviceType::Desktop => DeviceIcon::Desktop,
    }
}

/// Human-readable device name.
///
/// Precedence: vendor + model ("Apple iPhone") > model alone > "{browser} {os}".
pub fn device_name(
    browser: &str,
    os: &str,
    model: Option<&str>,
    vendor: Option<&str>,
) -> String {
    match (vendor, model) {
        (Some(vendor), Some(model)) => format!("{} {}", vendor, model),
        (None, Some(model)) => model.to_string(),
        _ => format!("{} {}", browser, os),
    }
}

/// Three-tier session timestamp formatting.
///
/// Under a minute → "Just now"; under thirty days → a relative phrase with an
/// "ago" suffix; older → an absolute "MMM d, yyyy" date.
pub fn format_session_time(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - t).num_seconds();

    if elapsed < 60 {
        return "Just now".to_string();
    }

    if elapsed < RELATIVE_CUTOFF_SECS {
        let (count, unit) = if elapsed < 3600 {
            (elapsed / 60, "minute")
        } else if elapsed < 86_400 {
            (elapsed / 3600, "hour")
        } else if elapsed < 7 * 86_400 {
            (elapsed / 86_400, "day")
        } else {
            (elapsed / (7 * 86_400), "week")
        };
        let plural = if count == 1 { "" } else { "s" };
        return format!("{} {}{} ago", count, unit, plural);
    }

    t.format("%b %-d, %Y").to_string()
}

/// [`format_session_time`] against the current wall clock.
pub fn format_session_time_now(t: DateTime<Utc>) -> String {
    format_session_time(t, Utc::now())
}

/// The session's IP address verbatim, or a sentinel. No geolocation.
pub fn format_location(ip: Option<&str>) -> String {
    match ip {
        Some(ip) if !ip.is_empty() => ip.to_string(),
        _ => UNKNOWN_LOCATION.to_string(),
    }
}

/// Build the display descriptor for one session.
///
/// `is_current_device` is strict token equality against the caller's own
/// session token; an absent token marks every session as not-current.
pub fn parse_session(session: &SessionRecord, current_token: Option<&str>) -> ParsedSession {
    let ua = parse_user_agent(session.user_agent.as_deref().unwrap_or_default());

    ParsedSession {
        id: session.id,
        token: session.token.clone(),
        device_name: device_name(
            &ua.browser,
            &ua.os,
            ua.device_model.as_deref(),
            ua.device_vendor.as_deref(),
        ),
        device_icon: device_icon(ua.device),
        browser: ua.browser,
        os: ua.os,
        location: format_location(session.ip_address.as_deref()),
        created_at: session.created_at,
        signed_in: format_session_time_now(session.created_at),
        is_current_device: current_token == Some(session.token.as_str()),
    }
}

/// Display ordering: the current device first, the rest newest-first.
pub fn sort_sessions(sessions: &mut [ParsedSession]) {
    sessions.sort_by(|a, b| {
        b.is_current_device
            .cmp(&a.is_current_device)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
