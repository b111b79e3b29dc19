/// Router Module Index
///
/// Routing is split by access level so each group gets its access control
/// applied once, as a layer, in `create_router`.

/// Routes accessible to anyone, signed in or not. Read-only catalog access.
pub mod public;

/// Routes that need a resolved `AuthUser`.
pub mod authenticated;

/// Routes restricted to the 'admin' role. Nested under `/admin`.
pub mod admin;
