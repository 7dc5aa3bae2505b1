/// Router Module Index
///
/// Organizes the routing surface into security-segregated modules so access
/// control is applied explicitly at the module level rather than scattered
/// per handler.

/// Routes accessible to all clients (sign-in flows and published content).
pub mod public;

/// Routes requiring a resolved Principal; role-specific checks stay inside
/// the handlers.
pub mod authenticated;

/// Routes restricted to the 'admin' role. Authentication happens at the
/// router layer; the admin role check happens inside each handler.
pub mod admin;
