//! Scoring Pipeline Module
//!
//! One linear pass per request, no state carried between requests:
//!
//! ```text
//! Validate → Synthesize → Score(efficiency) → Attribute → GenerateInsights
//!          → Score(suitability) → Classify(action) → Assemble
//! ```
//!
//! Validate is the only stage that fails the request. Every later stage
//! substitutes a well-defined fallback:
//!
//! | Stage | Fallback |
//! |---|---|
//! | Attribute | rule-based map, then an explicit error marker |
//! | GenerateInsights | rule-based templates, then a one-line summary |
//! | Score(suitability) | `Unknown` |

mod coordinator;

pub use coordinator::ScoringPipeline;
