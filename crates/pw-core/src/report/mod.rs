//! Situation reports: the enrichment seam and the per-frame cache.

pub mod cache;
pub mod digest;
pub mod requester;

pub use cache::{ReportCache, ReportSnapshot, ReportStatus, ReportTicket};
pub use digest::ReportDigest;
pub use requester::{
    EnrichmentError, FrameRiskAttributes, ReportRequester, SituationReport,
    TemplateReportRequester,
};
