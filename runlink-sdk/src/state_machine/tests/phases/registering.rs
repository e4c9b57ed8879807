use mockall::predicate::eq;

use runlink_core::{
    message::{Order, Report},
    Phase,
};

use crate::state_machine::{
    io::MockIO,
    tests::utils::machine,
    Command,
    Registering,
    StateMachine,
    Step,
    TransitionOutcome,
};

fn hello() -> Report {
    Report::Hello {
        name: "d1".parse().unwrap(),
    }
}

#[tokio::test]
async fn echo_completes_the_handshake() {
    let mut io = MockIO::new();
    io.expect_send_report()
        .with(eq(hello()))
        .times(1)
        .returning(|_| Ok(()));
    io.expect_poll_order().returning(|_| {
        Ok(Some(Order::Hello {
            name: "d1".parse().unwrap(),
        }))
    });
    io.expect_notify_registered().times(1).return_const(());
    io.expect_notify_phase()
        .with(eq(Phase::Manual))
        .times(1)
        .return_const(());

    let (phase, _handle) = machine(Registering::new(), io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Manual(_))
    ));
}

#[tokio::test]
async fn foreign_echo_is_ignored() {
    let mut io = MockIO::new();
    io.expect_send_report().times(1).returning(|_| Ok(()));
    io.expect_poll_order().returning(|_| {
        Ok(Some(Order::Hello {
            name: "d2".parse().unwrap(),
        }))
    });
    io.expect_notify_registered().times(0);

    let (phase, _handle) = machine(Registering::new(), io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Pending(StateMachine::Registering(_))
    ));
}

#[tokio::test]
async fn greet_triggers_a_resend() {
    let mut io = MockIO::new();
    // One `hello` on entry, a second one for the `greet`.
    io.expect_send_report()
        .with(eq(hello()))
        .times(2)
        .returning(|_| Ok(()));
    io.expect_poll_order().returning(|_| Ok(Some(Order::Greet)));

    let (phase, _handle) = machine(Registering::new(), io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Pending(StateMachine::Registering(_))
    ));
}

#[tokio::test]
async fn shutdown_cuts_the_handshake_short() {
    let mut io = MockIO::new();
    io.expect_send_report().times(1).returning(|_| Ok(()));
    io.expect_poll_order().returning(|_| Ok(None));

    let (phase, handle) = machine(Registering::new(), io);
    handle.send(Command::Shutdown).unwrap();
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Shutdown(_))
    ));
}
