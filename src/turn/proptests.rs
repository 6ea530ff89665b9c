//! Property-based tests for answer assembly
//!
//! - Chunk-only streams assemble to the concatenation of their texts
//! - Trace records interleaved with chunks never alter the answer
//! - Every fragment the sink sees is also in the transcript

use super::testing::{rationale_record, stream_of, RecordingSink};
use super::*;
use crate::event::chunk_record;
use crate::telemetry::SpanContext;
use futures::executor::block_on;
use proptest::prelude::*;
use serde_json::Value;

fn arb_chunks() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zA-Z0-9 .,!?éü日本]{0,12}", 0..12)
}

fn run(records: Vec<Value>) -> (Transcript, RecordingSink) {
    let mut sink = RecordingSink::default();
    let ctx = SpanContext::new("proptest");
    let outcome = block_on(drive_turn(
        stream_of(records.into_iter().map(Ok).collect()),
        &mut sink,
        None,
        &ctx,
    ))
    .expect("chunk and trace records never fail the turn");
    (outcome.transcript().clone(), sink)
}

proptest! {
    #[test]
    fn prop_answer_is_concatenation_of_chunks(chunks in arb_chunks()) {
        let records = chunks.iter().map(|c| chunk_record(c)).collect();
        let (transcript, _) = run(records);
        prop_assert_eq!(transcript.answer, chunks.concat());
        prop_assert!(transcript.fragments.is_empty());
    }

    #[test]
    fn prop_traces_do_not_alter_answer(
        chunks in arb_chunks(),
        rationales in proptest::collection::vec("[a-z ]{1,20}", 0..6),
    ) {
        let mut records: Vec<Value> = chunks.iter().map(|c| chunk_record(c)).collect();
        for (i, text) in rationales.iter().enumerate() {
            let at = (i * 3).min(records.len());
            records.insert(at, rationale_record(text));
        }
        let (transcript, sink) = run(records);
        prop_assert_eq!(transcript.answer, chunks.concat());
        prop_assert_eq!(transcript.fragments.len(), rationales.len());
        prop_assert_eq!(sink.fragments(), transcript.fragments);
    }
}
