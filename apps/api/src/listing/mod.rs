// Listing generation engine.
// Implements: section drafting, page assembly, scoring, fix-instruction
// translation and the bounded refinement loop.
// All model calls go through llm_client via the ContentOracle.

pub mod assembler;
pub mod evaluation;
pub mod handlers;
pub mod options;
pub mod oracle;
pub mod prompts;
pub mod property;
pub mod refinement;
pub mod sections;
pub mod translator;
