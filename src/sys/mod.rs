// 🛡️ Zero-Trust Architecture: every external process sits behind a trait.

pub mod traits;     // Global contracts
pub mod secrets;    // Token hygiene (RegistryToken) and stderr scrubbing
pub mod gh;         // GitHub Packages via the gh CLI
pub mod git;        // Latest commit message
pub mod cleanup;    // Deletion executor
