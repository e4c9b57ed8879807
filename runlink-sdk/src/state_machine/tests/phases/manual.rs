use mockall::predicate::eq;

use runlink_core::{
    message::{Order, Report},
    Phase,
};

use crate::state_machine::{
    io::MockIO,
    tests::utils::machine,
    Command,
    Manual,
    ParticipantError,
    StateMachine,
    Step,
    TransitionOutcome,
};

#[tokio::test]
async fn to_buffered_arms_the_device() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(None));
    io.expect_notify_phase()
        .with(eq(Phase::Ready))
        .times(1)
        .return_const(());

    let (phase, handle) = machine(Manual, io);
    handle.send(Command::ToBuffered).unwrap();
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Ready(_))
    ));
}

#[tokio::test]
async fn greet_re_registers_the_device() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(Some(Order::Greet)));
    io.expect_send_report()
        .with(eq(Report::Hello {
            name: "d1".parse().unwrap(),
        }))
        .times(1)
        .returning(|_| Ok(()));

    let (phase, _handle) = machine(Manual, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Pending(StateMachine::Manual(_))
    ));
}

#[tokio::test]
async fn stale_exit_changes_nothing() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(Some(Order::Exit)));

    let (phase, _handle) = machine(Manual, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Pending(StateMachine::Manual(_))
    ));
}

#[tokio::test]
async fn start_order_is_a_violation() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(Some(Order::Start)));

    let (phase, _handle) = machine(Manual, io);
    let err = phase.step().await.unwrap_err();
    assert!(matches!(
        err,
        ParticipantError::UnexpectedOrder {
            order: Order::Start,
            phase: Phase::Manual,
        }
    ));
}
