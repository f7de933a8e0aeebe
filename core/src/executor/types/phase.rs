use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Identifier of a phase in a workflow graph.
///
/// Phase identifiers come from a finite set known when the graph is built,
/// typically a fieldless enum. `&'static str` works too, which keeps tests
/// short.
pub trait PhaseId: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> PhaseId for T where T: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {}
