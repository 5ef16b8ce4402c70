//! Two-factor enrollment state machine
//!
//! Enrollment walks four steps: password verification, QR/setup-key display,
//! TOTP code verification, and backup-code acknowledgement. The transitions
//! are a pure function over a sum type; the only side effects (the two
//! provider calls) happen in the [`Enrollment`] driver, on the 1→2 and 3→4
//! transitions. Nothing here is persisted: the provider owns the secret and
//! backup codes once step 3 succeeds.

use std::sync::Arc;

use thiserror::Error;

use crate::provider::{AuthProvider, AuthProviderError, TwoFactorSetup};

/// Enrollment step, as a tagged union carrying exactly the data each step needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentState {
    /// Step 1: waiting for the user's password.
    AwaitingPassword,
    /// Step 2: QR code / setup key on display, waiting for acknowledgement.
    AwaitingQrAck {
        totp_uri: String,
        backup_codes: Vec<String>,
    },
    /// Step 3: waiting for the first TOTP code.
    AwaitingCode {
        totp_uri: String,
        backup_codes: Vec<String>,
        code: String,
    },
    /// Step 4, terminal: backup codes shown; only an explicit close leaves it.
    Completed { backup_codes: Vec<String> },
}

/// Events driving the enrollment machine.
#[derive(Debug, Clone)]
pub enum EnrollmentEvent {
    /// Provider accepted the password and produced TOTP material.
    SetupReady(TwoFactorSetup),
    /// Provider rejected the password.
    SetupRejected,
    /// User acknowledged the QR code.
    Continue,
    /// User went back to the QR code; the entered code is discarded.
    Back,
    /// User edited the code field.
    CodeChanged(String),
    /// Provider accepted the TOTP code.
    CodeAccepted,
    /// Provider rejected the TOTP code; only the code field is cleared.
    CodeRejected,
    /// Modal dismissed mid-flow. Ignored once completed: the user must
    /// acknowledge the backup codes via an explicit close.
    Dismiss,
    /// Explicit close from the terminal step; resets to the initial state.
    Close,
}

impl EnrollmentState {
    pub fn step(&self) -> u8 {
        match self {
            EnrollmentState::AwaitingPassword => 1,
            EnrollmentState::AwaitingQrAck { .. } => 2,
            EnrollmentState::AwaitingCode { .. } => 3,
            EnrollmentState::Completed { .. } => 4,
        }
    }

    /// Whether the modal may be dismissed from this state.
    pub fn can_dismiss(&self) -> bool {
        !matches!(self, EnrollmentState::Completed { .. })
    }
}

/// Pure transition function. Unlisted (state, event) pairs are no-ops,
/// returning the state unchanged.
pub fn transition(state: EnrollmentState, event: EnrollmentEvent) -> EnrollmentState {
    use EnrollmentEvent as E;
    use EnrollmentState as S;

    match (state, event) {
        (S::AwaitingPassword, E::SetupReady(setup)) => S::AwaitingQrAck {
            totp_uri: setup.totp_uri,
            backup_codes: setup.backup_codes,
        },
        (S::AwaitingPassword, E::SetupRejected) => S::AwaitingPassword,

        (
            S::AwaitingQrAck {
                totp_uri,
                backup_codes,
            },
            E::Continue,
        ) => S::AwaitingCode {
            totp_uri,
            backup_codes,
            code: String::new(),
        },

        (
            S::AwaitingCode {
                totp_uri,
                backup_codes,
                ..
            },
            E::Back,
        ) => S::AwaitingQrAck {
            totp_uri,
            backup_codes,
        },
        (
            S::AwaitingCode {
                totp_uri,
                backup_codes,
                ..
            },
            E::CodeChanged(code),
        ) => S::AwaitingCode {
            totp_uri,
            backup_codes,
            code,
        },
        (S::AwaitingCode { backup_codes, .. }, E::CodeAccepted) => S::Completed { backup_codes },
        (
            S::AwaitingCode {
                totp_uri,
                backup_codes,
                ..
            },
            E::CodeRejected,
        ) => S::AwaitingCode {
            totp_uri,
            backup_codes,
            code: String::new(),
        },

        (state @ S::Completed { .. }, E::Dismiss) => state,
        (state, E::Dismiss) if state.can_dismiss() => S::AwaitingPassword,
        (S::Completed { .. }, E::Close) => S::AwaitingPassword,

        (state, _) => state,
    }
}

/// Errors surfaced by the enrollment driver.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// Field-level: the password was rejected; the flow stays on step 1.
    #[error("Invalid password")]
    InvalidPassword,

    /// Transient: the TOTP code was rejected; the code field is cleared and
    /// the flow stays on step 3.
    #[error("Failed to verify code")]
    CodeVerification,

    /// The event is not valid in the current step.
    #[error("invalid enrollment step")]
    InvalidStep,

    #[error(transparent)]
    Provider(AuthProviderError),
}

/// Drives one user's enrollment, owning the state and performing the two
/// provider side effects at the right transitions.
pub struct Enrollment<P: AuthProvider + ?Sized> {
    provider: Arc<P>,
    token: String,
    state: EnrollmentState,
}

impl<P: AuthProvider + ?Sized> Enrollment<P> {
    pub fn new(provider: Arc<P>, token: impl Into<String>) -> Self {
        Self {
            provider,
            token: token.into(),
            state: EnrollmentState::AwaitingPassword,
        }
    }

    pub fn state(&self) -> &EnrollmentState {
        &self.state
    }

    /// Step 1 → 2: verify the password with the provider.
    pub async fn submit_password(&mut self, password: &str) -> Result<(), EnrollmentError> {
        if !matches!(self.state, EnrollmentState::AwaitingPassword) {
            return Err(EnrollmentError::InvalidStep);
        }

        match self.provider.enable_two_factor(&self.token, password).await {
            Ok(setup) => {
                self.state = transition(
                    std::mem::replace(&mut self.state, EnrollmentState::AwaitingPassword),
                    EnrollmentEvent::SetupReady(setup),
                );
                Ok(())
            }
            Err(AuthProviderError::InvalidCredentials) => {
                self.state = transition(
                    std::mem::replace(&mut self.state, EnrollmentState::AwaitingPassword),
                    EnrollmentEvent::SetupRejected,
                );
                Err(EnrollmentError::InvalidPassword)
            }
            Err(e) => Err(EnrollmentError::Provider(e)),
        }
    }

    /// Step 2 → 3.
    pub fn acknowledge_qr(&mut self) -> Result<(), EnrollmentError> {
        if !matches!(self.state, EnrollmentState::AwaitingQrAck { .. }) {
            return Err(EnrollmentError::InvalidStep);
        }
        self.apply(EnrollmentEvent::Continue);
        Ok(())
    }

    /// Step 3 → 2, discarding the entered code.
    pub fn back_to_qr(&mut self) -> Result<(), EnrollmentError> {
        if !matches!(self.state, EnrollmentState::AwaitingCode { .. }) {
            return Err(EnrollmentError::InvalidStep);
        }
        self.apply(EnrollmentEvent::Back);
        Ok(())
    }

    /// Step 3 → 4: verify the TOTP code with the provider. On rejection only
    /// the code field is cleared; the rest of the flow state survives.
    pub async fn submit_code(&mut self, code: &str) -> Result<(), EnrollmentError> {
        if !matches!(self.state, EnrollmentState::AwaitingCode { .. }) {
            return Err(EnrollmentError::InvalidStep);
        }
        self.apply(EnrollmentEvent::CodeChanged(code.to_string()));

        match self.provider.verify_totp(&self.token, code).await {
            Ok(()) => {
                self.apply(EnrollmentEvent::CodeAccepted);
                Ok(())
            }
            Err(AuthProviderError::InvalidCredentials) => {
                self.apply(EnrollmentEvent::CodeRejected);
                Err(EnrollmentError::CodeVerification)
            }
            Err(e) => {
                self.apply(EnrollmentEvent::CodeRejected);
                Err(EnrollmentError::Provider(e))
            }
        }
    }

    /// Dismiss mid-flow; a no-op once completed.
    pub fn dismiss(&mut self) {
        self.apply(EnrollmentEvent::Dismiss);
    }

    /// Explicit close from the terminal step. Returns true when the caller
    /// should refresh the session so the UI reflects "2FA enabled".
    pub fn close(&mut self) -> bool {
        let was_completed = matches!(self.state, EnrollmentState::Completed { .. });
        self.apply(EnrollmentEvent::Close);
        was_completed
    }

    fn apply(&mut self, event: EnrollmentEvent) {
        let state = std::mem::replace(&mut self.state, EnrollmentState::AwaitingPassword);
        self.state = transition(state, event);
    }
}

/// Backup-code viewing gate: the simpler parallel machine. Password re-entry
/// unlocks a one-shot view; there is no back-transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupCodesGate {
    Locked,
    Viewing { codes: Vec<String> },
}

impl BackupCodesGate {
    pub fn new() -> Self {
        BackupCodesGate::Locked
    }

    /// Unlock with the password via the provider. Stays locked on rejection.
    pub async fn unlock<P: AuthProvider + ?Sized>(
        &mut self,
        provider: &P,
        token: &str,
        password: &str,
    ) -> Result<(), EnrollmentError> {
        if !matches!(self, BackupCodesGate::Locked) {
            return Err(EnrollmentError::InvalidStep);
        }

        match provider.backup_codes(token, password).await {
            Ok(codes) => {
                *self = BackupCodesGate::Viewing { codes };
                Ok(())
            }
            Err(AuthProviderError::InvalidCredentials) => Err(EnrollmentError::InvalidPassword),
            Err(e) => Err(EnrollmentError::Provider(e)),
        }
    }

    pub fn close(&mut self) {
        *self = BackupCodesGate::Locked;
    }
}

impl Default for BackupCodesGate {
    fn default() -> Self {
        Self::new()
    }
}
