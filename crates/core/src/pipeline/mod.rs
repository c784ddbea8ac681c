//! Astrometry pipeline.
//!
//! A run performs four steps in order:
//!
//! 1. **Reference solve**: the star detector runs on the reference image and
//!    writes the star table beside it.
//! 2. **Header merge**: every frame of every filter is copied to
//!    `<filter>/WCS/wcs<n>.fits` with the reference-only keywords added.
//! 3. **Refinement**: the WCS fitter runs on each merged frame against the
//!    filter's copy of the star table.
//! 4. **Sorting**: refined frames move into `accurate_WCS`.
//!
//! Tool failures during refinement are recorded in the report unless
//! `refine.strict` is set; every other failure aborts the run.

mod error;
mod runner;
mod types;

pub use error::PipelineError;
pub use runner::{perform_astrometry, AstrometryPipeline};
pub use types::{AstrometryReport, FilterReport, MergedImage, ReferenceSolve, RefinementOutcome};
