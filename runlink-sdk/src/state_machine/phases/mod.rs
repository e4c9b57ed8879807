mod finished;
mod manual;
mod ready;
mod registering;
mod running;
mod shutdown;

pub(crate) use self::{
    finished::Finished,
    manual::Manual,
    ready::Ready,
    registering::Registering,
    running::Running,
    shutdown::Shutdown,
};
