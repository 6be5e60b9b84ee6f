//! Constants for eval URI validation and resolution.

use std::time::Duration;

/// The URI scheme.
pub const SCHEME: &str = "eval";

/// Long spelling of the scheme, accepted on parse and rendered as [`SCHEME`]
/// in canonical forms.
pub const SCHEME_LONG: &str = "evaluation";

/// The single authority supported in strict mode.
pub const DEFAULT_AUTHORITY: &str = "//localhost";

/// Device used whenever a URI omits the device segment.
pub const DEFAULT_DEVICE: &str = "@DefaultEvaluator";

/// Database name recorded when a legacy URI omits the `db=` segment.
pub const DEFAULT_DATABASE: &str = "_DefaultEvalDB";

/// Polling period applied when an attribute is resolved without one.
pub const DEFAULT_POLLING_PERIOD: Duration = Duration::from_millis(3000);
