//! Parapet Sessions Library
//!
//! Session/device descriptor building and the two-factor enrollment flow,
//! plus the trait modelling the external identity/session provider that both
//! delegate their privileged operations to.

pub mod descriptor;
pub mod provider;
pub mod two_factor;
pub mod user_agent;

// Re-export commonly used types
pub use descriptor::{
    device_icon, device_name, format_location, format_session_time, format_session_time_now,
    parse_session, sort_sessions, DeviceIcon, ParsedSession, SessionRecord,
};
pub use provider::{AuthProvider, AuthProviderError, TwoFactorSetup};
pub use two_factor::{
    transition, BackupCodesGate, Enrollment, EnrollmentError, EnrollmentEvent, EnrollmentState,
};
pub use user_agent::{parse_user_agent, DeviceType, UserAgentInfo};
