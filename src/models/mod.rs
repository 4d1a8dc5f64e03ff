mod submission;
mod website;

pub use submission::{Submission, SubmissionMetadata};
pub use website::Website;
