//! Selection, marking and merge algorithms.
//!
//! - **Boundaries**: outlines of face subsets and group partitions
//! - **Fillets**: group scoring and fillet-aware selection expansion
//! - **Live selection**: incremental expansion driven by paint events
//! - **Marking**: sharp and seam flags derived from groups and selections
//! - **Seams**: UV island merging and cylinder seam search
//! - **Overlap**: spatial overlap tests and merge planning
//! - **Similarity**: finding copies of a reference mesh

pub mod boundary;
pub mod fillet;
pub mod live;
pub mod mark;
pub mod overlap;
pub mod seam;
pub mod similar;
