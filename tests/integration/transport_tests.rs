//! Frame transport behaviour over a scripted byte link: resync, one frame
//! per poll, response envelopes and the link counters.

use heatctl::config::PidTuning;
use heatctl::control::pid::{PidController, cmd};
use heatctl::error::CommandError;
use heatctl::rpc::engine::{FrameTransport, PollOutcome};
use heatctl::rpc::frame::{FrameHeader, HEADER_SIZE, MAGIC, encode_frame};
use heatctl::rpc::router::{CommandRouter, Dispatch};

use crate::mock_hw::{Host, MockLink};

const PID_OBJECT: u8 = 2;
const LINK_TIMEOUT_MS: u32 = 2_000;

fn raw_frame(seq: u8, object_id: u8, command_id: u8, flags: u8, payload: &[u8]) -> Vec<u8> {
    let header = FrameHeader {
        length: 0,
        seq,
        object_id,
        command_id,
        flags,
    };
    let mut buf = [0u8; 128];
    let n = encode_frame(&header, payload, &mut buf).expect("frame fits");
    buf[..n].to_vec()
}

/// One poll with a PID bound at [`PID_OBJECT`].
fn poll_once<const RX: usize, const TX: usize>(
    link: &mut FrameTransport<MockLink, RX, TX>,
    pid: &mut PidController,
    now_ms: u32,
) -> PollOutcome {
    let mut router: CommandRouter<'_, 4> = CommandRouter::new();
    router.bind(PID_OBJECT, pid);
    link.poll(&mut router, now_ms)
}

fn setup() -> (FrameTransport<MockLink>, PidController, Host) {
    (
        FrameTransport::new(MockLink::new(), LINK_TIMEOUT_MS),
        PidController::new(&PidTuning::default()),
        Host::new(),
    )
}

#[test]
fn junk_before_marker_is_skipped() {
    let (mut link, mut pid, mut host) = setup();
    let (seq, req) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);

    link.transport_mut().push(&[0x01, 0x02, 0xEF, 0xBE, 0x33]);
    link.transport_mut().push(&req);

    match poll_once(&mut link, &mut pid, 0) {
        PollOutcome::Responded { seq: s, dispatch, .. } => {
            assert_eq!(s, seq);
            assert_eq!(dispatch, Dispatch::Handled(Ok(40)));
        }
        other => panic!("expected a response, got {other:?}"),
    }
    let stats = link.stats();
    assert_eq!(stats.bad_magic, 1);
    assert_eq!(stats.resync_drops, 5);
    assert_eq!(stats.frames_received, 1);

    let out = link.transport_mut().take_outbound();
    let resp = host.responses(&out);
    assert_eq!(resp.len(), 1);
    assert_eq!(resp[0].payload.len(), 40);
}

#[test]
fn one_frame_per_poll() {
    let (mut link, mut pid, mut host) = setup();
    let (first, a) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);
    let (second, b) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);
    link.transport_mut().push(&a);
    link.transport_mut().push(&b);

    let seq_of = |outcome: PollOutcome| match outcome {
        PollOutcome::Responded { seq, .. } => seq,
        other => panic!("expected a response, got {other:?}"),
    };

    assert_eq!(seq_of(poll_once(&mut link, &mut pid, 0)), first);
    assert_eq!(link.buffered(), b.len());
    assert_eq!(seq_of(poll_once(&mut link, &mut pid, 1)), second);
    assert_eq!(link.buffered(), 0);
    assert_eq!(poll_once(&mut link, &mut pid, 2), PollOutcome::NoFrame);
    assert_eq!(link.stats().frames_sent, 2);
}

#[test]
fn partial_header_waits_for_more_bytes() {
    let (mut link, mut pid, mut host) = setup();
    let (_, req) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);

    link.transport_mut().push(&req[..7]);
    assert_eq!(poll_once(&mut link, &mut pid, 0), PollOutcome::NoFrame);
    assert_eq!(link.buffered(), 7);
    assert_eq!(link.stats().resync_drops, 0);

    link.transport_mut().push(&req[7..]);
    assert!(matches!(
        poll_once(&mut link, &mut pid, 1),
        PollOutcome::Responded { .. }
    ));
}

#[test]
fn partial_reads_reassemble() {
    let (mut link, mut pid, mut host) = setup();
    link.transport_mut().read_chunk = Some(3);
    let (seq, req) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);
    link.transport_mut().push(&req);

    // The drain loop is bounded per poll, so a chunked frame may need
    // more than one call.
    let mut answered = None;
    for now in 0..4 {
        if let PollOutcome::Responded { seq, .. } = poll_once(&mut link, &mut pid, now) {
            answered = Some(seq);
            break;
        }
    }
    assert_eq!(answered, Some(seq));
}

#[test]
fn impossible_length_drops_one_byte_then_resyncs() {
    let (mut link, mut pid, mut host) = setup();
    let mut bogus = MAGIC.to_le_bytes().to_vec();
    bogus.extend_from_slice(&5u16.to_le_bytes());
    bogus.extend_from_slice(&[0, 0, 0, 0]);
    let (seq, req) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);

    link.transport_mut().push(&bogus);
    link.transport_mut().push(&req);

    assert_eq!(poll_once(&mut link, &mut pid, 0), PollOutcome::Rejected);
    assert_eq!(link.stats().bad_length, 1);
    assert_eq!(link.buffered(), bogus.len() - 1 + req.len());

    match poll_once(&mut link, &mut pid, 1) {
        PollOutcome::Responded { seq: s, .. } => assert_eq!(s, seq),
        other => panic!("expected a response, got {other:?}"),
    }
    assert_eq!(link.stats().resync_drops, bogus.len() as u32 - 1);
}

#[test]
fn response_echoes_envelope_fields() {
    let (mut link, mut pid, mut host) = setup();
    link.transport_mut()
        .push(&raw_frame(0x42, PID_OBJECT, cmd::READ_STATUS, 0x81, &[]));

    poll_once(&mut link, &mut pid, 0);
    let out = link.transport_mut().take_outbound();
    let resp = host.responses(&out);
    let h = resp[0].header;
    assert_eq!(h.seq, 0x42);
    assert_eq!(h.object_id, PID_OBJECT);
    assert_eq!(h.command_id, cmd::READ_STATUS);
    assert_eq!(h.flags, 0x81);
    assert_eq!(h.length as usize, HEADER_SIZE + 40);
}

#[test]
fn handler_error_gets_empty_response() {
    let (mut link, mut pid, mut host) = setup();
    let (seq, req) = host.request(PID_OBJECT, cmd::SET_KP, &[0, 0, 0]);
    link.transport_mut().push(&req);

    let outcome = poll_once(&mut link, &mut pid, 0);
    assert_eq!(
        outcome,
        PollOutcome::Responded {
            seq,
            object_id: PID_OBJECT,
            command_id: cmd::SET_KP,
            dispatch: Dispatch::Handled(Err(CommandError::PayloadLength {
                expected: 4,
                actual: 3
            })),
        }
    );
    assert_eq!(link.stats().handler_errors, 1);
    assert!(pid.pending().is_empty());

    let out = link.transport_mut().take_outbound();
    let resp = host.responses(&out);
    assert_eq!(resp[0].header.length as usize, HEADER_SIZE);
    assert!(resp[0].payload.is_empty());
}

#[test]
fn unbound_object_still_answered() {
    let (mut link, mut pid, mut host) = setup();
    let (_, req) = host.request(3, cmd::READ_STATUS, &[]);
    link.transport_mut().push(&req);

    assert!(matches!(
        poll_once(&mut link, &mut pid, 0),
        PollOutcome::Responded {
            dispatch: Dispatch::NoHandler,
            ..
        }
    ));
    assert_eq!(link.stats().no_handler, 1);
    assert_eq!(link.stats().frames_sent, 1);
}

#[test]
fn full_buffer_is_discarded_on_overflow() {
    let mut link: FrameTransport<MockLink, 32, 64> = FrameTransport::new(MockLink::new(), LINK_TIMEOUT_MS);
    let mut pid = PidController::new(&PidTuning::default());
    link.transport_mut().push(&[0x55; 40]);

    assert_eq!(poll_once(&mut link, &mut pid, 0), PollOutcome::NoFrame);
    assert_eq!(link.stats().overflows, 1);
    assert_eq!(link.stats().resync_drops, 8);
    assert_eq!(link.buffered(), 0);
}

#[test]
fn status_refused_when_transmit_buffer_too_small() {
    // A 32-byte transmit buffer leaves 22 bytes for the 40-byte record.
    let mut link: FrameTransport<MockLink, 64, 32> = FrameTransport::new(MockLink::new(), LINK_TIMEOUT_MS);
    let mut pid = PidController::new(&PidTuning::default());
    let mut host = Host::new();
    let (_, req) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);
    link.transport_mut().push(&req);

    assert!(matches!(
        poll_once(&mut link, &mut pid, 0),
        PollOutcome::Responded {
            dispatch: Dispatch::Handled(Err(CommandError::BufferTooSmall { needed: 40, .. })),
            ..
        }
    ));
    assert_eq!(link.stats().frames_sent, 1);
}

#[test]
fn link_liveness_follows_valid_frames() {
    let (mut link, mut pid, mut host) = setup();
    assert!(!link.link_ok(0));

    let (_, req) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);
    link.transport_mut().push(&req);
    poll_once(&mut link, &mut pid, 1_000);

    assert!(link.link_ok(1_000 + LINK_TIMEOUT_MS - 1));
    assert!(!link.link_ok(1_000 + LINK_TIMEOUT_MS));

    // Junk alone does not refresh liveness.
    link.transport_mut().push(&[0x11; 16]);
    poll_once(&mut link, &mut pid, 2_500);
    assert!(!link.link_ok(3_000));
}

#[test]
fn input_drain_is_bounded_per_poll() {
    let (mut link, mut pid, mut host) = setup();
    link.transport_mut().read_chunk = Some(1);
    let (seq, req) = host.request(PID_OBJECT, cmd::READ_STATUS, &[]);
    link.transport_mut().push(&req);

    // Eight one-byte reads leave the tail of the header for the next poll.
    assert_eq!(poll_once(&mut link, &mut pid, 0), PollOutcome::NoFrame);
    assert_eq!(link.buffered(), 8);

    match poll_once(&mut link, &mut pid, 1) {
        PollOutcome::Responded { seq: s, .. } => assert_eq!(s, seq),
        other => panic!("expected a response, got {other:?}"),
    }
}
