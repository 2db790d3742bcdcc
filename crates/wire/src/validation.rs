//! Schema Validator
//!
//! Structural checks applied to a decoded frame before anything downstream
//! trusts it. Checks run in a fixed order and the first failure wins:
//!
//! 1. Protocol version
//! 2. Message kind membership
//! 3. Per-kind payload ceiling
//! 4. Clock drift (the tighter of the envelope bound and the kind's own bound)
//! 5. Kind-specific substructure
//!
//! Validation is pure: it never mutates state and may be repeated on the same
//! frame.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::frame::WireFrame;
use crate::kind::MessageKind;
use crate::payload::{
    ChatPayload, GameMessage, HeartbeatPayload, KeyExchangePayload, KeyExchangeResponsePayload,
    SignalPayload, TopologyPayload, MAX_CHAT_TEXT_LEN,
};
use crate::{MAX_MESSAGE_ID_LEN, PROTOCOL_VERSION};

/// Validator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Maximum allowed |now - frame.timestamp| for the envelope (seconds)
    pub max_clock_drift_secs: u64,
    /// Maximum allowed drift for the timestamp inside a signal payload (seconds)
    pub signal_inner_drift_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_clock_drift_secs: 3600,     // 1 hour
            signal_inner_drift_secs: 86400, // 24 hours
        }
    }
}

/// Stateless frame validator.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    config: ValidatorConfig,
}

impl SchemaValidator {
    /// Create a validator with explicit configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate `frame` against the local clock reading `now` (unix seconds).
    pub fn validate(&self, frame: &WireFrame, now: u64) -> ValidationResult<()> {
        if frame.version != PROTOCOL_VERSION {
            return Err(ValidationError::InvalidVersion(frame.version));
        }

        let kind = frame.kind;
        if !kind.is_known() {
            return Err(ValidationError::InvalidKind(kind.to_byte()));
        }

        let max = kind.max_payload();
        if frame.payload.len() > max {
            return Err(ValidationError::PayloadTooLarge {
                kind,
                size: frame.payload.len(),
                max,
            });
        }

        let max_drift = self.drift_bound(kind);
        check_drift(frame.timestamp, now, max_drift)?;

        if frame.id.len() > MAX_MESSAGE_ID_LEN {
            return Err(malformed(kind, "message id exceeds 64 bytes"));
        }

        self.check_substructure(kind, &frame.payload, now)
    }

    /// Drift bound applied to the envelope timestamp of `kind`.
    pub fn drift_bound(&self, kind: MessageKind) -> u64 {
        kind.max_clock_drift()
            .map_or(self.config.max_clock_drift_secs, |bound| {
                bound.min(self.config.max_clock_drift_secs)
            })
    }

    fn check_substructure(&self, kind: MessageKind, payload: &[u8], now: u64) -> ValidationResult<()> {
        match kind {
            MessageKind::Signal => {
                let signal = SignalPayload::decode(payload).map_err(|e| malformed(kind, e))?;
                check_drift(signal.timestamp, now, self.config.signal_inner_drift_secs)
            }
            MessageKind::Chat => {
                let declared = ChatPayload::declared_text_len(payload).map_err(|e| malformed(kind, e))?;
                if declared > MAX_CHAT_TEXT_LEN {
                    return Err(malformed(
                        kind,
                        format!("declared text length {declared} exceeds {MAX_CHAT_TEXT_LEN}"),
                    ));
                }
                ChatPayload::decode(payload).map(drop).map_err(|e| malformed(kind, e))
            }
            MessageKind::Game => GameMessage::decode(payload).map(drop).map_err(|e| malformed(kind, e)),
            MessageKind::System => std::str::from_utf8(payload)
                .map(drop)
                .map_err(|_| malformed(kind, "system notice is not valid UTF-8")),
            MessageKind::KeyExchange => KeyExchangePayload::decode(payload)
                .map(drop)
                .map_err(|e| malformed(kind, e)),
            MessageKind::KeyExchangeResponse => KeyExchangeResponsePayload::decode(payload)
                .map(drop)
                .map_err(|e| malformed(kind, e)),
            MessageKind::Heartbeat => HeartbeatPayload::decode(payload)
                .map(drop)
                .map_err(|e| malformed(kind, e)),
            MessageKind::Topology => TopologyPayload::decode(payload)
                .map(drop)
                .map_err(|e| malformed(kind, e)),
            MessageKind::Unknown(b) => Err(ValidationError::InvalidKind(b)),
        }
    }
}

fn check_drift(timestamp: u32, now: u64, max_drift: u64) -> ValidationResult<()> {
    if now.abs_diff(u64::from(timestamp)) > max_drift {
        return Err(ValidationError::TimestampOutOfRange {
            timestamp,
            now,
            max_drift,
        });
    }
    Ok(())
}

fn malformed(kind: MessageKind, reason: impl ToString) -> ValidationError {
    ValidationError::MalformedSubstructure {
        kind,
        reason: reason.to_string(),
    }
}
