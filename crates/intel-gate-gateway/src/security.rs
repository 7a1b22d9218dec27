// crates/intel-gate-gateway/src/security.rs
// ============================================================================
// Module: Gateway Security Helpers
// Description: Constant-time comparison and key fingerprinting.
// Purpose: Provide side-channel resistant handling of API key material.
// Dependencies: sha2, subtle
// ============================================================================

//! ## Overview
//! Exposes constant-time equality helpers for secret values such as API keys
//! and a fingerprint helper so audit events can reference a key without
//! logging it.

use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constant-Time Comparisons
// ============================================================================

/// Compares two byte slices in constant time.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compares two strings in constant time.
#[must_use]
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

// ============================================================================
// SECTION: Fingerprinting
// ============================================================================

/// Returns the lowercase hex SHA-256 fingerprint of a key.
#[must_use]
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
