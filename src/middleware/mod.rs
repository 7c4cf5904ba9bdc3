pub mod edge;

pub use edge::{decide, edge_gate, EdgeDecision};
