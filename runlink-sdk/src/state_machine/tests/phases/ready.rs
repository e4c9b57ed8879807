use mockall::predicate::eq;

use runlink_core::{message::Order, Phase};

use crate::state_machine::{
    io::MockIO,
    tests::utils::machine,
    Command,
    ParticipantError,
    Ready,
    StateMachine,
    Step,
    TransitionOutcome,
};

#[tokio::test]
async fn start_order_begins_the_section() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(Some(Order::Start)));
    io.expect_on_start().times(1).return_const(());
    io.expect_notify_phase()
        .with(eq(Phase::Running))
        .times(1)
        .return_const(());

    let (phase, _handle) = machine(Ready, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Running(_))
    ));
}

#[tokio::test]
async fn abort_order_returns_to_manual() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(Some(Order::Abort)));
    io.expect_notify_phase()
        .with(eq(Phase::Manual))
        .times(1)
        .return_const(());

    let (phase, _handle) = machine(Ready, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Manual(_))
    ));
}

#[tokio::test]
async fn to_buffered_is_a_violation() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(None));

    let (phase, handle) = machine(Ready, io);
    handle.send(Command::ToBuffered).unwrap();
    let err = phase.step().await.unwrap_err();
    assert!(matches!(
        err,
        ParticipantError::BufferedOutsideManual { phase: Phase::Ready }
    ));
}
