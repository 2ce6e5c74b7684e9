//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Role bound to a single health center
pub const ROLE_USER: &str = "user";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "admin";

/// Role value written by the original browser application for center users
pub const LEGACY_ROLE_USER: &str = "usuario";

// =============================================================================
// Identifiers
// =============================================================================

/// Prefix of every generated user id
pub const USER_ID_PREFIX: &str = "usr_";

/// Prefix of the id given to the seeded administrator
pub const DEFAULT_ADMIN_ID_PREFIX: &str = "usr_admin_default_";

/// Length of the random base-36 suffix of a user id
pub const USER_ID_SUFFIX_LENGTH: usize = 9;

// =============================================================================
// Bootstrap
// =============================================================================

/// Username of the administrator seeded into an empty store
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Documented bootstrap password. Rotate it right after the first login.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Sentinel center carried by administrators
pub const ADMIN_CENTER: &str = "ADMINISTRACIÓN";

// =============================================================================
// Demand records
// =============================================================================

/// Minimum product description length
pub const MIN_PRODUCT_LENGTH: usize = 3;

/// Minimum service type length
pub const MIN_SERVICE_TYPE_LENGTH: usize = 2;

/// Coverage reported when nothing was requested
pub const FULL_COVERAGE: f64 = 100.0;

/// Number of critical products listed per facility summary
pub const TOP_CRITICAL_PRODUCTS: usize = 5;

/// Facility label used for records without a facility
pub const UNSPECIFIED_FACILITY: &str = "Unspecified";
