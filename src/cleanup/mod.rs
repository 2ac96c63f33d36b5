// Staging package lifecycle: pure decision logic plus endpoint probing.

pub mod model;      // Packages, versions, context, results
pub mod guard;      // Preserve flag / commit marker
pub mod context;    // PR vs main vs unknown
pub mod locator;    // Endpoint probing
pub mod selector;   // Staging match + retention
