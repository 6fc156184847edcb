/// Router Module Index
///
/// Organizes the application's routing logic into access-policy-segregated
/// modules. Each module's route table is wrapped by exactly one guard policy
/// layer, so the policy governing every endpoint is visible at the router
/// level rather than buried in handler bodies.
pub mod admin;
pub mod authenticated;
pub mod public;
