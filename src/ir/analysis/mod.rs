//! Module and function analyses

mod call_graph;
mod structured_control_flow;

pub use self::call_graph::CallGraph;
pub use self::structured_control_flow::StructuredControlFlow;
