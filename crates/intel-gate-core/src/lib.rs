// crates/intel-gate-core/src/lib.rs
// ============================================================================
// Module: Intel Gate Core Library
// Description: Public API surface for the Intel Gate core.
// Purpose: Expose the intelligence data model, sanitizer, and bundle builder.
// Dependencies: crate::{audience, bundle, identifiers, manifest, object, sanitize, tlp}
// ============================================================================

//! ## Overview
//! Intel Gate core provides the typed STIX 2.1 data model for the
//! dissemination pipeline: intelligence objects, audience profiles, TLP
//! markings, bundle assembly, and source sanitization. It is transport- and
//! storage-agnostic; the export and gateway crates integrate through these
//! types rather than through untyped JSON maps.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audience;
pub mod bundle;
pub mod identifiers;
pub mod manifest;
pub mod object;
pub mod sanitize;
pub mod tlp;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audience::AudienceProfile;
pub use audience::AuthTier;
pub use bundle::Bundle;
pub use bundle::BundleBuilder;
pub use bundle::BundleOutcome;
pub use bundle::SkippedObject;
pub use identifiers::AudienceId;
pub use identifiers::ObjectId;
pub use manifest::ShareManifest;
pub use object::ExternalReference;
pub use object::IndicatorObject;
pub use object::IntelObject;
pub use object::ObjectError;
pub use object::ObjectKind;
pub use object::ObservableObject;
pub use object::Provenance;
pub use object::ReportObject;
pub use sanitize::INTERNAL_LABEL_PREFIX;
pub use sanitize::sanitize;
pub use tlp::MarkingDefinition;
pub use tlp::TlpLevel;
