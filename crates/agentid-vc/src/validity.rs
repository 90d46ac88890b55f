//! # Temporal validity
//!
//! A credential expires at `issuanceDate + token_ttl`. It is still valid at
//! exactly that instant and expired one tick later.
//!
//! `token_ttl` may be any JSON number. Integers are whole seconds; floats
//! are honored to the millisecond. A TTL that is zero or negative means the
//! credential was never valid. A TTL above [`MAX_TOKEN_TTL_SECS`], or one
//! whose expiry falls outside the calendar, is malformed.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use thiserror::Error;

use agentid_core::Timestamp;

use crate::credential::Credential;

/// Longest lifetime a credential may carry: ten years.
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    #[error("credential expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    #[error("malformed temporal data: {0}")]
    Malformed(String),
}

enum Lifetime {
    NonPositive,
    Bounded(Duration),
}

fn too_long(n: &serde_json::Number) -> TemporalError {
    TemporalError::Malformed(format!(
        "token_ttl {n} exceeds the maximum of {MAX_TOKEN_TTL_SECS} seconds"
    ))
}

fn lifetime(ttl: Option<&Value>) -> Result<Lifetime, TemporalError> {
    let n = match ttl {
        Some(Value::Number(n)) => n,
        Some(other) => {
            return Err(TemporalError::Malformed(format!(
                "token_ttl must be numeric, got {other}"
            )))
        }
        None => return Err(TemporalError::Malformed("token_ttl is missing".into())),
    };

    if let Some(secs) = n.as_i64() {
        return match secs {
            s if s <= 0 => Ok(Lifetime::NonPositive),
            s if s > MAX_TOKEN_TTL_SECS => Err(too_long(n)),
            s => Ok(Lifetime::Bounded(Duration::seconds(s))),
        };
    }
    if n.as_u64().is_some() {
        return Err(too_long(n));
    }
    match n.as_f64() {
        Some(secs) if secs <= 0.0 => Ok(Lifetime::NonPositive),
        Some(secs) if secs > MAX_TOKEN_TTL_SECS as f64 => Err(too_long(n)),
        Some(secs) => Ok(Lifetime::Bounded(Duration::milliseconds(
            (secs * 1000.0).round() as i64,
        ))),
        None => Err(TemporalError::Malformed(format!("token_ttl {n} is not representable"))),
    }
}

/// Check expiry against the current clock.
pub fn check_ttl(credential: &Credential) -> Result<(), TemporalError> {
    check_ttl_at(credential, Utc::now())
}

/// Check expiry as of `now`.
pub fn check_ttl_at(credential: &Credential, now: DateTime<Utc>) -> Result<(), TemporalError> {
    let issued = Timestamp::parse_lenient(&credential.issuance_date)
        .map_err(|e| TemporalError::Malformed(e.to_string()))?;
    let issued = *issued.as_datetime();

    let expires_at = match lifetime(credential.metadata().token_ttl.as_ref())? {
        Lifetime::NonPositive => return Err(TemporalError::Expired { expired_at: issued }),
        Lifetime::Bounded(ttl) => issued.checked_add_signed(ttl).ok_or_else(|| {
            TemporalError::Malformed(format!("expiry of credential issued {issued} overflows"))
        })?,
    };

    if now > expires_at {
        Err(TemporalError::Expired { expired_at: expires_at })
    } else {
        Ok(())
    }
}
