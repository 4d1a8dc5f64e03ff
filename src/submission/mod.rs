pub mod fields;
pub mod metadata;
pub mod parser;
pub mod pipeline;
