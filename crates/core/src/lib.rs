//! Barbershop domain logic.
//!
//! Pure building blocks shared by the job pipeline and the HTTP layer:
//! error types, the job record, image preprocessing, data-root path
//! resolution, the synthesis tool's command-line contract and the
//! subprocess runner used to invoke it.

pub mod error;
pub mod job;
pub mod paths;
pub mod preprocess;
pub mod subprocess;
pub mod synthesis;
pub mod types;
