//! One user turn against the agent
//!
//! The driver pulls the completion stream, the accumulator assembles the
//! answer, and a [`DisplaySink`] receives live output for the UI.

mod accumulator;
mod driver;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

#[allow(unused_imports)] // Public API re-exports
pub use accumulator::{Accumulator, ChunkError, CURSOR};
#[allow(unused_imports)] // Public API re-exports
pub use driver::{drive_turn, run_turn, ServiceFault, Transcript, TurnOutcome};

use crate::trace::DisplayFragment;

/// UI collaborator receiving live output for one turn
pub trait DisplaySink: Send {
    /// Answer so far, with the streaming cursor appended
    fn partial_answer(&mut self, text: &str);

    /// A trace panel or warning, in arrival order
    fn fragment(&mut self, fragment: &DisplayFragment);

    /// Final answer once the stream has ended
    fn final_answer(&mut self, text: &str);
}
